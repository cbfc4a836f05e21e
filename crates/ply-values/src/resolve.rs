use crate::expression::{find_expressions, is_regex};

/// Outcome of evaluating one expression against a values context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Expression resolved to a concrete value.
    Value(String),
    /// No binding for the expression in the given context.
    Unresolved,
    /// Expression text requires evaluation outside the safe subset and was
    /// refused. Only this single expression fails; a resolution pass over
    /// many expressions continues.
    Restricted,
}

impl Resolution {
    pub fn value(self) -> Option<String> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Evaluates an expression string against a values context.
///
/// The whole string may be a single `${...}` token, or a template mixing
/// literal text with embedded tokens; in the template case every token must
/// resolve. Evaluation is restricted to property and array-index lookups
/// plus literal interpolation in every mode. Expression files can originate
/// from third-party repositories, so there is deliberately no evaluation
/// path that executes expression text, regardless of the `trusted` flag.
/// `trusted` only controls how unparseable expression text is reported:
/// untrusted input yields [`Resolution::Restricted`], trusted input plain
/// [`Resolution::Unresolved`].
pub fn resolve_expression(
    expression: &str,
    context: &serde_json::Value,
    trusted: bool,
) -> Resolution {
    // Regex-flavored expressions are match patterns, not value lookups.
    if is_regex(expression) {
        return Resolution::Unresolved;
    }

    let tokens = find_expressions(expression);
    match tokens.as_slice() {
        [] => Resolution::Unresolved,
        [token] if token.text == expression => {
            evaluate(&expression[2..expression.len() - 1], context, trusted)
        }
        tokens => {
            let mut out = String::new();
            let mut pos = 0;
            for token in tokens {
                out.push_str(&expression[pos..token.start]);
                match evaluate(&token.text[2..token.text.len() - 1], context, trusted) {
                    Resolution::Value(value) => out.push_str(&value),
                    other => return other,
                }
                pos = token.end + 1;
            }
            out.push_str(&expression[pos..]);
            Resolution::Value(out)
        }
    }
}

fn evaluate(inner: &str, context: &serde_json::Value, trusted: bool) -> Resolution {
    if inner.starts_with('~') || inner.starts_with('@') {
        // Regex tokens are match patterns; unrewritten reference tokens
        // need a live execution context. Neither is a value lookup.
        return Resolution::Unresolved;
    }
    let Some(segments) = parse_path(inner) else {
        // Not a plain lookup path. Trusted callers simply get no value;
        // untrusted input is reported as refused.
        return if trusted {
            Resolution::Unresolved
        } else {
            Resolution::Restricted
        };
    };

    let mut value = context;
    for segment in &segments {
        value = match segment {
            Segment::Name(name) => match value.as_object().and_then(|map| map.get(name)) {
                Some(value) => value,
                None => return Resolution::Unresolved,
            },
            Segment::Index(index) => match value.as_array().and_then(|items| items.get(*index)) {
                Some(value) => value,
                None => return Resolution::Unresolved,
            },
        };
    }

    match value {
        serde_json::Value::Null => Resolution::Unresolved,
        serde_json::Value::String(s) => Resolution::Value(s.clone()),
        other => match serde_json::to_string(other) {
            Ok(json) => Resolution::Value(json),
            Err(_) => Resolution::Unresolved,
        },
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Name(String),
    Index(usize),
}

/// Parses `name`, `name.sub`, `name[0]`, `name['key']`, `name["key"]` and
/// combinations thereof. Returns `None` for anything else.
fn parse_path(inner: &str) -> Option<Vec<Segment>> {
    let mut chars = inner.chars().peekable();
    let mut segments = vec![Segment::Name(parse_ident(&mut chars)?)];

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                segments.push(Segment::Name(parse_ident(&mut chars)?));
            }
            '[' => {
                chars.next();
                match chars.peek() {
                    Some(&quote @ ('\'' | '"')) => {
                        chars.next();
                        let mut key = String::new();
                        loop {
                            match chars.next() {
                                Some(c) if c == quote => break,
                                Some(c) => key.push(c),
                                None => return None,
                            }
                        }
                        segments.push(Segment::Name(key));
                    }
                    _ => {
                        let mut digits = String::new();
                        while let Some(&c) = chars.peek() {
                            if c.is_ascii_digit() {
                                digits.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        if digits.is_empty() {
                            return None;
                        }
                        segments.push(Segment::Index(digits.parse().ok()?));
                    }
                }
                if chars.next() != Some(']') {
                    return None;
                }
            }
            _ => return None,
        }
    }
    Some(segments)
}

fn parse_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    match chars.peek() {
        Some(&c) if c.is_alphabetic() || c == '_' || c == '$' => {
            ident.push(c);
            chars.next();
        }
        _ => return None,
    }
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' || c == '$' || c == '-' {
            ident.push(c);
            chars.next();
        } else {
            break;
        }
    }
    Some(ident)
}
