use std::sync::LazyLock;

use indexmap::IndexSet;
use ply_core::flow::Flow;
use ply_core::request::Request;
use regex::Regex;

/// Non-greedy `${...}` token.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{.+?\}").unwrap());

/// A `${...}` placeholder found in a larger text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub text: String,
    /// Byte offset of the leading `$`.
    pub start: usize,
    /// Byte offset of the closing brace (inclusive).
    pub end: usize,
}

/// Extracts every non-overlapping `${...}` match in the line, with offsets.
pub fn find_expressions(line: &str) -> Vec<Expression> {
    EXPRESSION
        .find_iter(line)
        .map(|m| Expression {
            text: m.as_str().to_owned(),
            start: m.start(),
            end: m.end() - 1,
        })
        .collect()
}

/// True iff the whole input is exactly one `${...}` wrapper. Stricter than
/// "contains an expression".
pub fn is_expression(input: &str) -> bool {
    input.starts_with("${") && input.ends_with('}')
}

/// Wraps a bare name into expression syntax.
pub fn to_expression(input: &str) -> String {
    format!("${{{input}}}")
}

/// Regex-flavored expression: `${~pattern}`.
pub fn is_regex(expression: &str) -> bool {
    expression.starts_with("${~")
}

/// Reference expression: `${@field}` or `${@[0]}`, resolved against a named
/// holder object rather than the generic value space.
pub fn is_ref(expression: &str) -> bool {
    expression.starts_with("${@")
}

/// Rewrites reference markers so the expression evaluates against `holder`:
/// `${@[` becomes `${holder[` and `${@` becomes `${holder.`.
pub fn replace_refs(expression: &str, holder: &str) -> String {
    expression
        .replace("${@[", &format!("${{{holder}["))
        .replace("${@", &format!("${{{holder}."))
}

/// All `${...}` tokens in the content, in order of occurrence.
pub fn expressions_in(content: &str) -> Vec<String> {
    EXPRESSION
        .find_iter(content)
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// An object whose text fields are scanned for expressions.
#[derive(Debug, Clone, Copy)]
pub enum ExpressionHolder<'a> {
    Request(&'a Request),
    Flow(&'a Flow),
}

impl ExpressionHolder<'_> {
    /// Every expression occurring in the holder's whitelisted fields,
    /// deduplicated in first-seen order. Reference (`@`) expressions are
    /// excluded: they need a live execution context rather than static
    /// value resolution.
    pub fn expressions(&self) -> Vec<String> {
        match self {
            Self::Request(request) => request_expressions(request, false),
            Self::Flow(flow) => flow_expressions(flow),
        }
    }
}

/// Expressions in a request's method, url, header values, and body.
///
/// Reference expressions are included only when `with_refs` is set.
pub fn request_expressions(request: &Request, with_refs: bool) -> Vec<String> {
    let mut expressions = expressions_in(&request.method);
    expressions.extend(expressions_in(&request.url));
    for value in request.headers.values() {
        expressions.extend(expressions_in(value));
    }
    if let Some(body) = &request.body {
        expressions.extend(expressions_in(body));
    }
    dedup(expressions, with_refs)
}

/// Expressions declared or used by a flow: one per `values` attribute row
/// name, plus every expression in step and subflow attribute values.
pub fn flow_expressions(flow: &Flow) -> Vec<String> {
    let mut expressions: Vec<String> = Vec::new();

    if let Some(rows) = flow.attributes.get(ply_core::flow::attr::VALUES) {
        if let Ok(rows) = serde_json::from_str::<Vec<Vec<String>>>(rows) {
            for row in rows.iter().filter(|row| !row.is_empty()) {
                expressions.push(to_expression(&row[0]));
            }
        }
    }

    for step in &flow.steps {
        for value in step.attributes.values() {
            expressions.extend(expressions_in(value));
        }
    }
    for subflow in &flow.subflows {
        for value in subflow.attributes.values() {
            expressions.extend(expressions_in(value));
        }
        for step in &subflow.steps {
            for value in step.attributes.values() {
                expressions.extend(expressions_in(value));
            }
        }
    }

    dedup(expressions, false)
}

fn dedup(expressions: Vec<String>, with_refs: bool) -> Vec<String> {
    let set: IndexSet<String> = expressions
        .into_iter()
        .filter(|expr| with_refs || !is_ref(expr))
        .collect();
    set.into_iter().collect()
}
