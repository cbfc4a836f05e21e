use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Environment variable snapshot used for `${VAR}` substitution.
pub type EnvironmentVariables = IndexMap<String, String>;

/// Where a values binding came from, for diagnostics only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ValuesLocation {
    /// File or URL.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ValuesLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }
}

/// A resolved value together with the location of the holder that supplied it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct LocatedValue {
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ValuesLocation>,
}

/// A ranked source of key/value bindings.
///
/// Holders supplied later in a list have higher precedence than earlier ones
/// when merged or consulted by lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct ValuesHolder {
    /// Arbitrarily nested values object.
    pub values: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ValuesLocation>,

    /// Names that must resolve to a binding for the suite to be runnable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl ValuesHolder {
    pub fn new(values: serde_json::Value, location: Option<ValuesLocation>) -> Self {
        Self {
            values,
            location,
            required: Vec::new(),
        }
    }

    /// Parses a holder from JSON file contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the contents are not valid JSON.
    pub fn parse(
        contents: &str,
        location: Option<ValuesLocation>,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(contents)?, location))
    }
}

/// Policy for required names that have no resolvable binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredPolicy {
    /// Report every violation; resolution of other names continues.
    #[default]
    Continue,
    /// Stop checking at the first violation.
    Halt,
}

/// Options governing expression evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Permits richer expression syntax, reserved for values known not to
    /// originate from untrusted external sources.
    pub trusted: bool,

    /// Holder object name substituted for `@` in reference expressions.
    pub ref_holder: Option<String>,

    /// Environment variables for `${VAR}` substitution.
    pub env: EnvironmentVariables,

    pub required_policy: RequiredPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_parse() {
        let holder = ValuesHolder::parse(
            r#"{ "baseUrl": "http://localhost:3000", "movies": { "year": 1931 } }"#,
            Some(ValuesLocation::new("test/values/localhost.json")),
        )
        .unwrap();
        assert_eq!(
            holder.values["movies"]["year"],
            serde_json::Value::from(1931)
        );
        assert_eq!(
            holder.location.unwrap().path,
            "test/values/localhost.json"
        );
    }

    #[test]
    fn test_holder_parse_bad_json() {
        assert!(ValuesHolder::parse("not json", None).is_err());
    }
}
