use error_stack::ResultExt as _;
use ply_core::flow::{attr, Flow};
use ply_core::value::{EvalOptions, ValuesHolder, ValuesLocation};
use ply_values::{is_expression, resolve_expression, to_expression, Resolution};

use crate::error::{LoadError, Result};
use crate::files::FileAccess;

/// Loads values holders from files and from flow value declarations.
pub struct ValuesLoader<'a> {
    files: &'a dyn FileAccess,
    options: EvalOptions,
}

impl<'a> ValuesLoader<'a> {
    pub fn new(files: &'a dyn FileAccess, options: EvalOptions) -> Self {
        Self { files, options }
    }

    /// Loads the given values files (or URLs) into holders, in order, so
    /// that files listed later take precedence. A missing or malformed file
    /// is logged and skipped.
    pub async fn load_file_values(&self, values_files: &[String]) -> Result<Vec<ValuesHolder>> {
        let mut holders = Vec::with_capacity(values_files.len());
        for values_file in values_files {
            match self.files.read_text_file(values_file).await? {
                Some(contents) => {
                    match ValuesHolder::parse(
                        &contents,
                        Some(ValuesLocation::new(values_file.clone())),
                    ) {
                        Ok(holder) => holders.push(holder),
                        Err(err) => {
                            tracing::error!("skipping values file {values_file}: {err}");
                        }
                    }
                }
                None => tracing::error!("values file does not exist: {values_file}"),
            }
        }
        Ok(holders)
    }

    /// Evaluated values declared by the flow's `values` attribute rows.
    ///
    /// Each row is `[name, value?, required?, requiredIf?]`. A value that is
    /// an expression is resolved against the eval context. A row is required
    /// when its `required` cell is `"true"`, unless a `requiredIf` expression
    /// is present, in which case that expression's resolution decides.
    ///
    /// # Errors
    ///
    /// Fails if the `values` attribute is not a valid JSON row array.
    pub fn read_flow_values(
        &self,
        flow: &Flow,
        eval_context: Option<&serde_json::Value>,
    ) -> Result<ValuesHolder> {
        let mut flow_values = serde_json::Map::new();
        let mut required = Vec::new();

        if let Some(rows) = flow.attributes.get(attr::VALUES) {
            let rows: Vec<Vec<String>> = serde_json::from_str(rows).change_context_lazy(|| {
                LoadError::BadValuesDocument {
                    path: flow.path.clone(),
                }
            })?;
            let empty = serde_json::Value::Object(serde_json::Map::new());
            let context = eval_context.unwrap_or(&empty);

            for row in rows.iter().filter(|row| !row.is_empty()) {
                let name = &row[0];
                if let Some(value) = row.get(1).filter(|v| !v.is_empty()) {
                    let value = if is_expression(value) {
                        resolve_expression(value, context, self.options.trusted).value()
                    } else {
                        Some(value.clone())
                    };
                    if let Some(value) = value {
                        flow_values.insert(name.clone(), serde_json::Value::String(value));
                    }
                }
                if self.is_required(row, context) {
                    required.push(name.clone());
                }
            }
        }

        let mut holder = ValuesHolder::new(
            serde_json::Value::Object(flow_values),
            Some(ValuesLocation::new(flow.path.clone())),
        );
        holder.required = required;
        Ok(holder)
    }

    fn is_required(&self, row: &[String], context: &serde_json::Value) -> bool {
        if let Some(expr) = row.get(3).filter(|v| !v.is_empty()) {
            let expr = if is_expression(expr) {
                expr.clone()
            } else {
                to_expression(expr)
            };
            return matches!(
                resolve_expression(&expr, context, self.options.trusted),
                Resolution::Value(value) if value == "true"
            );
        }
        row.get(2).map(String::as_str) == Some("true")
    }
}
