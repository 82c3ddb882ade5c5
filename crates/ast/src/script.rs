//! Script source wrapper (§3.2).

use qx_core::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_lang() -> String {
    "painless".to_string()
}

/// A Painless-compatible script: source text plus bound parameters.
///
/// `lang` is carried through but not dispatched on further by this core —
/// every script is evaluated by the single Painless-subset interpreter in
/// `qx-script` regardless of its declared language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Painless-like source text (§4.F grammar).
    pub source: String,
    /// Declared script language. Defaults to `"painless"`.
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Named parameters bound into the script's `params` scope.
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

impl Script {
    /// Builds a script from bare source with no bound parameters.
    pub fn new(source: impl Into<String>) -> Self {
        Script {
            source: source.into(),
            lang: default_lang(),
            params: HashMap::new(),
        }
    }

    /// Attach parameters.
    pub fn with_params(mut self, params: HashMap<String, Value>) -> Self {
        self.params = params;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lang_is_painless() {
        let script = Script::new("doc['x'].value");
        assert_eq!(script.lang, "painless");
        assert!(script.params.is_empty());
    }

    #[test]
    fn deserializes_without_explicit_lang() {
        let json = serde_json::json!({"source": "1 + 1"});
        let script: Script = serde_json::from_value(json).unwrap();
        assert_eq!(script.lang, "painless");
    }
}
