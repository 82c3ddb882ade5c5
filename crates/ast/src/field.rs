//! Field-name normalization (§4.C).
//!
//! Applied at every field-bearing parse so that `price.keyword` and
//! `price.text` address the same underlying field as `price`.

/// Trims a trailing `.keyword` or `.text` suffix from a field name.
///
/// Only one suffix is stripped: `a.keyword.text` is not a realistic input
/// and is left as-is rather than stripped recursively.
pub fn normalize_field(field: &str) -> String {
    for suffix in [".keyword", ".text"] {
        if let Some(stripped) = field.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    field.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_keyword_suffix() {
        assert_eq!(normalize_field("category.keyword"), "category");
    }

    #[test]
    fn strips_text_suffix() {
        assert_eq!(normalize_field("title.text"), "title");
    }

    #[test]
    fn leaves_unsuffixed_fields_alone() {
        assert_eq!(normalize_field("price"), "price");
    }

    #[test]
    fn does_not_strip_to_empty_string() {
        assert_eq!(normalize_field(".keyword"), ".keyword");
    }
}
