use error_stack::ResultExt as _;
use ply_core::flow::{attr, Flow, Step};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// A value declared by a flow's `values` attribute rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowValue {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Expression which, when it evaluates to `"true"`, makes the value
    /// required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<String>,
}

/// A return mapping declared by a flow's `return` attribute rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlowReturn {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

/// Interface of a flow when embedded as a subflow: the values it expects and
/// the returns it produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubflowSpec {
    /// Id of the embedding (subflow-typed) step.
    pub step_id: String,

    /// Flow path from the step's `subflow` attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subflow: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<FlowValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Vec<FlowReturn>>,
}

/// Builds the spec for a subflow-typed step against the flow it embeds.
///
/// # Errors
///
/// Fails if the embedded flow's `values` or `return` attribute is not a valid
/// JSON row array.
pub fn subflow_spec(step: &Step, subflow: &Flow) -> Result<SubflowSpec> {
    let mut spec = SubflowSpec {
        step_id: step.id.clone(),
        subflow: step.attributes.get(attr::SUBFLOW).cloned(),
        values: None,
        returns: None,
    };

    if let Some(rows) = subflow.attributes.get(attr::VALUES) {
        let rows = parse_rows(rows, attr::VALUES, &subflow.path)?;
        let mut values: Vec<FlowValue> = rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| FlowValue {
                name: row[0].clone(),
                value: cell(row, 1),
                required: cell(row, 2).map(|v| v == "true"),
                required_if: cell(row, 3),
            })
            .collect();
        values.sort_by(|v1, v2| v1.name.cmp(&v2.name));
        if !values.is_empty() {
            spec.values = Some(values);
        }
    }

    if let Some(rows) = subflow.attributes.get(attr::RETURN) {
        let rows = parse_rows(rows, attr::RETURN, &subflow.path)?;
        let mut returns: Vec<FlowReturn> = rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| FlowReturn {
                name: row[0].clone(),
                expression: cell(row, 1),
            })
            .collect();
        returns.sort_by(|r1, r2| r1.name.cmp(&r2.name));
        if !returns.is_empty() {
            spec.returns = Some(returns);
        }
    }

    Ok(spec)
}

fn parse_rows(rows: &str, attribute: &str, path: &str) -> Result<Vec<Vec<String>>> {
    serde_json::from_str(rows).change_context_lazy(|| AnalysisError::MalformedAttribute {
        attribute: attribute.to_owned(),
        path: path.to_owned(),
    })
}

fn cell(row: &[String], index: usize) -> Option<String> {
    row.get(index).filter(|v| !v.is_empty()).cloned()
}

/// Looks up a step by URL-style fragment: either a bare step id in the main
/// flow, or `subflowId.stepId` within a subflow.
pub fn step_for_fragment<'a>(flow: &'a Flow, fragment: &str) -> Option<&'a Step> {
    match fragment.find('.') {
        Some(dot) if dot > 0 && dot < fragment.len() - 1 => {
            let subflow = flow.subflows.iter().find(|sub| sub.id == fragment[..dot])?;
            subflow.steps.iter().find(|step| step.id == fragment[dot + 1..])
        }
        _ => flow.steps.iter().find(|step| step.id == fragment),
    }
}

/// All subflow-typed steps in the flow's main graph and its subflows.
pub fn subflow_steps(flow: &Flow) -> Vec<&Step> {
    let mut steps: Vec<&Step> = flow
        .steps
        .iter()
        .filter(|step| step.path.ends_with("subflow"))
        .collect();
    for subflow in &flow.subflows {
        steps.extend(subflow.steps.iter().filter(|step| step.path.ends_with("subflow")));
    }
    steps
}
