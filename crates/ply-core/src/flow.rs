use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Step `path` value that marks the entry step of a flow or subflow.
pub const START_PATH: &str = "start";

/// Attribute keys the loader and analysis layers understand.
///
/// Attribute maps are open-ended (the visual editor stores arbitrary keys),
/// but these are the ones consumed by this crate's collaborators.
pub mod attr {
    /// Subflow lifecycle phase: `"Before"` or `"After"`.
    pub const WHEN: &str = "when";
    /// Flow path referenced by a subflow-typed step.
    pub const SUBFLOW: &str = "subflow";
    /// JSON row array of declared flow values.
    pub const VALUES: &str = "values";
    /// JSON row array of subflow return mappings.
    pub const RETURN: &str = "return";
}

/// Free-form string attributes attached to flows, steps, links, and subflows.
pub type Attributes = IndexMap<String, String>;

/// A declaratively defined graph of steps and links representing an
/// orchestrated test scenario.
///
/// Flows are parsed from `.ply.flow` YAML documents. After normalization,
/// `steps` holds only the steps reachable from the unique start step, in
/// traversal order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
pub struct Flow {
    /// Name of the flow, relative to the suite base directory.
    #[serde(default)]
    pub name: String,

    /// File path (or URL) the flow was loaded from.
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    /// The steps of the flow's main graph.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,

    /// Auxiliary step graphs, each with its own start step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subflows: Vec<Subflow>,

    /// Raw document contents, retained only when the loader is asked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Flow {
    /// Parses a flow from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or cannot be deserialized into a Flow.
    pub fn from_yaml_string(yaml: &str) -> serde_yaml_ng::Result<Self> {
        serde_yaml_ng::from_str(yaml)
    }

    /// Serializes the flow to a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot be serialized to YAML.
    pub fn to_yaml_string(&self) -> serde_yaml_ng::Result<String> {
        serde_yaml_ng::to_string(self)
    }

    /// Returns the flow's unique start step, if it has one.
    pub fn start_step(&self) -> Option<&Step> {
        self.steps.iter().find(|step| step.path == START_PATH)
    }
}

/// A single node in a flow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Step {
    /// Identifier, unique within the owning step collection.
    pub id: String,

    pub name: String,

    /// Logical kind identifier. The value `"start"` marks the entry step;
    /// for custom steps this is the module path of the implementation.
    pub path: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    /// Outbound edges to other steps in the same collection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// Directed edge from its containing step to another step in the same
/// step collection. Links may form cycles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Link {
    pub id: String,

    /// Id of the target step.
    pub to: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<LinkEvent>,

    /// Step result that selects this link during execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Step outcome event that triggers a link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum LinkEvent {
    Finish,
    Error,
    Cancel,
    Delay,
    Resume,
}

/// An auxiliary step graph attached to a flow, tagged to run Before, After,
/// or alongside the main flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Subflow {
    /// Identifier, unique among the flow's subflows.
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: Attributes,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

impl Subflow {
    /// Lifecycle phase from the `when` attribute. `None` means the subflow
    /// runs alongside the main flow.
    pub fn phase(&self) -> Option<SubflowPhase> {
        match self.attributes.get(attr::WHEN).map(String::as_str) {
            Some("Before") => Some(SubflowPhase::Before),
            Some("After") => Some(SubflowPhase::After),
            _ => None,
        }
    }

    /// Returns the subflow's unique start step, if it has one.
    pub fn start_step(&self) -> Option<&Step> {
        self.steps.iter().find(|step| step.path == START_PATH)
    }
}

/// Execution-order class of a subflow relative to the flow's main steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubflowPhase {
    Before,
    After,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_from_yaml() {
        let yaml = r#"
        steps:
          - id: s1
            name: Start
            path: start
            links:
              - id: l1
                to: s2
                event: Finish
          - id: s2
            name: Get Movies
            path: request
        subflows:
          - id: f1
            name: Before All
            attributes: { when: Before }
            steps: []
        "#;
        let flow = Flow::from_yaml_string(yaml).unwrap();
        similar_asserts::assert_serde_eq!(
            flow,
            Flow {
                name: String::new(),
                path: String::new(),
                attributes: Attributes::new(),
                steps: vec![
                    Step {
                        id: "s1".to_owned(),
                        name: "Start".to_owned(),
                        path: "start".to_owned(),
                        attributes: Attributes::new(),
                        links: vec![Link {
                            id: "l1".to_owned(),
                            to: "s2".to_owned(),
                            attributes: Attributes::new(),
                            event: Some(LinkEvent::Finish),
                            result: None,
                        }],
                    },
                    Step {
                        id: "s2".to_owned(),
                        name: "Get Movies".to_owned(),
                        path: "request".to_owned(),
                        attributes: Attributes::new(),
                        links: vec![],
                    },
                ],
                subflows: vec![Subflow {
                    id: "f1".to_owned(),
                    name: "Before All".to_owned(),
                    attributes: [(attr::WHEN.to_owned(), "Before".to_owned())]
                        .into_iter()
                        .collect(),
                    steps: vec![],
                }],
                source: None,
            }
        );
        assert_eq!(flow.start_step().map(|s| s.id.as_str()), Some("s1"));
    }

    #[test]
    fn test_subflow_phase() {
        let mut subflow = Subflow {
            id: "f1".to_owned(),
            name: "f1".to_owned(),
            attributes: Attributes::new(),
            steps: vec![],
        };
        assert_eq!(subflow.phase(), None);

        subflow
            .attributes
            .insert(attr::WHEN.to_owned(), "Before".to_owned());
        assert_eq!(subflow.phase(), Some(SubflowPhase::Before));

        subflow
            .attributes
            .insert(attr::WHEN.to_owned(), "After".to_owned());
        assert_eq!(subflow.phase(), Some(SubflowPhase::After));

        subflow
            .attributes
            .insert(attr::WHEN.to_owned(), "Sometime".to_owned());
        assert_eq!(subflow.phase(), None);
    }
}
