use std::sync::LazyLock;

use ply_core::value::EnvironmentVariables;
use regex::Regex;

/// A single `${...}` token at the very start of a string. Embedded
/// occurrences elsewhere do not trigger substitution.
static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$\{(.+?)\}").unwrap());

/// Returns a deep clone of the value tree with environment substitution
/// applied to every string leaf.
///
/// A string beginning with `${VAR}` becomes the environment variable's value
/// if defined; otherwise the `|| fallback` text (either inside the braces,
/// as in `${PORT || 8080}`, or trailing after the token), trimmed; otherwise
/// null. The input is never mutated: the same holder may be substituted
/// repeatedly with different environment snapshots.
pub fn substitute_env_vars(
    values: &serde_json::Value,
    env: &EnvironmentVariables,
) -> serde_json::Value {
    match values {
        serde_json::Value::String(s) => match ENV_TOKEN.captures(s) {
            Some(_) => match substitute(s, env) {
                Some(replacement) => serde_json::Value::String(replacement),
                None => serde_json::Value::Null,
            },
            None => values.clone(),
        },
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), substitute_env_vars(value, env)))
                .collect(),
        ),
        serde_json::Value::Array(items) => serde_json::Value::Array(
            items.iter().map(|item| substitute_env_vars(item, env)).collect(),
        ),
        _ => values.clone(),
    }
}

fn substitute(val: &str, env: &EnvironmentVariables) -> Option<String> {
    let captures = ENV_TOKEN.captures(val)?;
    let token = captures.get(0)?;
    let inner = captures.get(1)?.as_str();

    let (name, inline_fallback) = match inner.find("||") {
        Some(pos) => (inner[..pos].trim(), Some(inner[pos + 2..].trim())),
        None => (inner.trim(), None),
    };

    if let Some(value) = env.get(name) {
        return Some(value.clone());
    }
    if let Some(fallback) = inline_fallback {
        return Some(fallback.to_owned());
    }
    // Fallback may also trail the token: `${PORT} || 8080`.
    if let Some(fallback) = val[token.end()..].trim().strip_prefix("||") {
        return Some(fallback.trim().to_owned());
    }
    None
}
