//! Error taxonomy for the query-execution core
//!
//! All errors raised across parsing, optimization, scripting, and execution
//! are represented by the single [`Error`] enum so callers can match on a
//! closed set of kinds regardless of which component produced them (§7).
//!
//! # Categories
//!
//! | Category | Variants | Surfaced as |
//! |----------|----------|-------------|
//! | Parse | `MultipleQueryTypes`, `UnknownQueryType`, `MissingRequiredField`, `InvalidValueType`, `Base64Decode`, `InnerQueryFailed` | 400 Bad Request |
//! | Execution | `IndexReadFailed`, `Cancelled`, `DeadlineExceeded` | fatal |
//! | Script | `UnsupportedExpression`, `UnsupportedMethod`, `InvalidRegex`, `DateParseFailure` | non-fatal in filter/score, fatal in update |
//! | Two-phase | `IndexReadFailed` (child/parent auxiliary search) | fatal |
//!
//! `DocumentNotFound` is intentionally absent from this enum's fatal path:
//! per §7 it is swallowed per-document during iteration, never surfaced as a
//! request-level error.

use thiserror::Error;

/// Result type alias used throughout the query-execution core.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the query-execution core (§7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // ==================== Parse errors ====================
    /// The top-level DSL object did not contain exactly one recognised keyword.
    #[error("multiple query types in request: {0:?}")]
    MultipleQueryTypes(Vec<String>),

    /// The top-level keyword is not in the closed list of §6.1.
    #[error("unknown query type: {0}")]
    UnknownQueryType(String),

    /// A required field was missing for the named query kind.
    #[error("missing required field `{field}` for `{kind}`")]
    MissingRequiredField {
        /// DSL keyword being parsed.
        kind: String,
        /// Name of the missing field.
        field: String,
    },

    /// A field held a JSON value of the wrong shape for its query kind.
    #[error("invalid value type for `{field}`: {reason}")]
    InvalidValueType {
        /// Field whose value failed to parse.
        field: String,
        /// Human-readable description of the mismatch.
        reason: String,
    },

    /// Base64 decoding failed while parsing a `wrapper` query.
    #[error("base64 decode failed: {0}")]
    Base64Decode(String),

    /// An inner query (nested, function_score, wrapper, pinned, ...) failed
    /// to parse; the cause is boxed to avoid infinite enum recursion.
    #[error("inner query failed: {0}")]
    InnerQueryFailed(Box<Error>),

    // ==================== Execution errors ====================
    /// The underlying `IndexReader` failed to service a read.
    #[error("index read failed: {0}")]
    IndexReadFailed(String),

    /// The request's cancellation token was observed to be cancelled.
    #[error("search cancelled")]
    Cancelled,

    /// The request's deadline elapsed before execution completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    // ==================== Script errors ====================
    /// The script source contains a construct outside the supported subset.
    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    /// A method call target a type/method combination that is not implemented.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// A regular expression passed to `matches`/`replaceAll` failed to compile.
    #[error("invalid regex: {0}")]
    InvalidRegex(String),

    /// A `Date.parse`/`SimpleDateFormat` call could not parse its input.
    #[error("date parse failure: {0}")]
    DateParseFailure(String),
}

impl Error {
    /// True for errors that should abort the whole request rather than be
    /// downgraded to a per-document skip or neutral-element fallback.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::IndexReadFailed(_) | Error::Cancelled | Error::DeadlineExceeded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_matches_spec_section_7() {
        assert!(Error::IndexReadFailed("boom".into()).is_fatal());
        assert!(Error::Cancelled.is_fatal());
        assert!(Error::DeadlineExceeded.is_fatal());
        assert!(!Error::UnsupportedExpression("x".into()).is_fatal());
        assert!(!Error::MultipleQueryTypes(vec!["a".into(), "b".into()]).is_fatal());
    }

    #[test]
    fn inner_query_failed_boxes_cause() {
        let cause = Error::UnknownQueryType("frobnicate".into());
        let wrapped = Error::InnerQueryFailed(Box::new(cause.clone()));
        match wrapped {
            Error::InnerQueryFailed(boxed) => assert_eq!(*boxed, cause),
            _ => panic!("expected InnerQueryFailed"),
        }
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = Error::MissingRequiredField {
            kind: "has_child".into(),
            field: "type".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing required field `type` for `has_child`"
        );
    }
}
