use std::borrow::Cow;
use std::collections::HashMap;

use ply_core::value::{EvalOptions, LocatedValue, RequiredPolicy, ValuesHolder, ValuesLocation};

use crate::env::substitute_env_vars;
use crate::expression::{is_expression, is_ref, replace_refs, to_expression};
use crate::resolve::{resolve_expression, Resolution};

/// A required value name with no resolvable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredViolation {
    pub name: String,
    /// Location of the holder that declared the requirement.
    pub location: Option<ValuesLocation>,
}

/// Merged view over an ordered list of value sources, with environment
/// substitution applied.
///
/// Holders supplied later have higher precedence: their keys override
/// earlier holders' keys in the merged snapshot, and they are consulted
/// first during point lookup, which short-circuits on the first hit.
pub struct Values {
    /// Holders in lookup order: highest precedence first.
    holders: Vec<ValuesHolder>,
    /// Environment-substituted value tree per holder, same order.
    substituted: Vec<serde_json::Value>,
    options: EvalOptions,
    /// Memoized lookups. An entry holding `None` is a cached miss, distinct
    /// from an absent entry (never looked up).
    located: HashMap<String, Option<LocatedValue>>,
    merged: Option<serde_json::Value>,
}

impl Values {
    pub fn new(holders: Vec<ValuesHolder>, options: EvalOptions) -> Self {
        // Reverse so that later-supplied holders are consulted first.
        let holders: Vec<ValuesHolder> = holders.into_iter().rev().collect();
        let substituted = holders
            .iter()
            .map(|holder| substitute_env_vars(&holder.values, &options.env))
            .collect();
        Self {
            holders,
            substituted,
            options,
            located: HashMap::new(),
            merged: None,
        }
    }

    /// Resolves a single expression, returning the value and the location of
    /// the holder that supplied it. Results (including misses) are memoized
    /// per expression string for the lifetime of this instance.
    pub fn get_value(&mut self, expression: &str) -> Option<LocatedValue> {
        if let Some(cached) = self.located.get(expression) {
            return cached.clone();
        }
        let found = self.find_value(expression);
        self.located.insert(expression.to_owned(), found.clone());
        found
    }

    fn find_value(&self, expression: &str) -> Option<LocatedValue> {
        let mut expr: Cow<'_, str> = if is_expression(expression) {
            Cow::Borrowed(expression)
        } else {
            Cow::Owned(to_expression(expression))
        };
        if is_ref(&expr) {
            // Reference expressions need a named holder object to stand in
            // for '@'; without one they cannot resolve statically.
            let holder = self.options.ref_holder.as_deref()?;
            expr = Cow::Owned(replace_refs(&expr, holder));
        }

        for (holder, values) in self.holders.iter().zip(&self.substituted) {
            if let Resolution::Value(value) = resolve_expression(&expr, values, self.options.trusted)
            {
                return Some(LocatedValue {
                    value,
                    location: holder.location.clone(),
                });
            }
        }
        None
    }

    /// Returns the merged value space: every holder deep-merged, lowest
    /// precedence first so later-supplied holders overwrite earlier ones.
    /// Computed once and cached.
    pub fn merged(&mut self) -> &serde_json::Value {
        if self.merged.is_none() {
            let mut merged = serde_json::Value::Object(serde_json::Map::new());
            for values in self.substituted.iter().rev() {
                deep_merge(&mut merged, values.clone());
            }
            self.merged = Some(merged);
        }
        self.merged.as_ref().unwrap() // just populated above
    }

    /// Required names (from every holder) that have no resolvable binding.
    ///
    /// Under [`RequiredPolicy::Continue`] all violations are accumulated;
    /// under [`RequiredPolicy::Halt`] checking stops at the first. A
    /// violation never aborts resolution of unrelated expressions.
    pub fn required_violations(&mut self) -> Vec<RequiredViolation> {
        let declared: Vec<(String, Option<ValuesLocation>)> = self
            .holders
            .iter()
            .flat_map(|holder| {
                holder
                    .required
                    .iter()
                    .map(|name| (name.clone(), holder.location.clone()))
            })
            .collect();

        let mut violations = Vec::new();
        for (name, location) in declared {
            if self.get_value(&to_expression(&name)).is_none() {
                violations.push(RequiredViolation { name, location });
                if self.options.required_policy == RequiredPolicy::Halt {
                    break;
                }
            }
        }
        violations
    }
}

/// Key-by-key recursive merge for objects; any other overlay value replaces
/// the base wholesale, arrays included.
fn deep_merge(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
