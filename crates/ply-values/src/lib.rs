mod env;
mod expression;
mod resolve;
mod values;

pub use env::substitute_env_vars;
pub use expression::{
    expressions_in, find_expressions, flow_expressions, is_expression, is_ref, is_regex,
    replace_refs, request_expressions, to_expression, Expression, ExpressionHolder,
};
pub use resolve::{resolve_expression, Resolution};
pub use values::{RequiredViolation, Values};
