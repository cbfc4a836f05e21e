use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single declarative HTTP request within a suite.
///
/// Any of the string fields may contain `${...}` expressions, resolved
/// against merged values before execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Request {
    /// Name of the request, taken from its key in the suite document.
    #[serde(default)]
    pub name: String,

    pub method: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// An ordered collection of requests parsed from one `.ply.yaml` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct RequestSuite {
    /// Name of the suite, relative to the suite base directory.
    pub name: String,

    /// File path (or URL) the suite was loaded from.
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<Request>,

    /// Raw document contents, retained only when the loader is asked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RequestSuite {
    /// Returns the named request, if present.
    pub fn request(&self, name: &str) -> Option<&Request> {
        self.requests.iter().find(|request| request.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_yaml() {
        let yaml = r#"
        method: GET
        url: ${baseUrl}/movies
        headers:
          Accept: application/json
        "#;
        let request: Request = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "${baseUrl}/movies");
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.body, None);
    }
}
