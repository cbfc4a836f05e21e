use std::sync::LazyLock;

use error_stack::{report, ResultExt as _};
use ply_core::flow::Flow;
use regex::Regex;

use crate::error::{LoadError, Result};
use crate::files::{relative_name, FileAccess, ListOptions};

static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n").unwrap());

/// Loader behavior options.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Retain raw document contents on loaded suites.
    pub suite_source: bool,
}

/// Loads `.ply.flow` YAML documents into normalized [`Flow`]s.
pub struct FlowLoader<'a> {
    files: &'a dyn FileAccess,
    options: LoadOptions,
}

impl<'a> FlowLoader<'a> {
    pub fn new(files: &'a dyn FileAccess, options: LoadOptions) -> Self {
        Self { files, options }
    }

    /// Loads every flow under the base directory. A malformed document is
    /// logged and skipped so it does not abort loading of the rest.
    pub async fn load_flows(&self, base: &str) -> Result<Vec<Flow>> {
        let files = self
            .files
            .file_list(
                base,
                &ListOptions {
                    recursive: true,
                    patterns: vec!["**/*.ply.flow".to_owned()],
                },
            )
            .await?;

        let mut flows = Vec::with_capacity(files.len());
        for (path, contents) in &files {
            match self.read_flow(base, path, contents) {
                Ok(flow) => flows.push(flow),
                Err(err) => tracing::error!("skipping flow {path}: {err:?}"),
            }
        }
        Ok(flows)
    }

    /// Loads a single flow, returning `None` if the file does not exist.
    pub async fn load_flow(&self, base: &str, path: &str) -> Result<Option<Flow>> {
        match self.files.read_text_file(path).await? {
            Some(contents) => Ok(Some(self.read_flow(base, path, &contents)?)),
            None => Ok(None),
        }
    }

    fn read_flow(&self, base: &str, path: &str, contents: &str) -> Result<Flow> {
        let doc: serde_yaml_ng::Value =
            serde_yaml_ng::from_str(contents).change_context_lazy(|| LoadError::BadFlowDocument {
                path: path.to_owned(),
            })?;
        if !doc.is_mapping() {
            return Err(report!(LoadError::BadFlowDocument {
                path: path.to_owned(),
            }));
        }
        let raw: Flow =
            serde_yaml_ng::from_value(doc).change_context_lazy(|| LoadError::BadFlowDocument {
                path: path.to_owned(),
            })?;

        let mut flow = Flow {
            name: relative_name(base, path),
            path: path.to_owned(),
            attributes: raw.attributes,
            steps: raw.steps,
            subflows: raw.subflows,
            source: None,
        };

        // Editor step names can embed newlines; collapse for display/logs.
        for step in &mut flow.steps {
            step.name = collapse_newlines(&step.name);
        }
        for subflow in &mut flow.subflows {
            subflow.name = collapse_newlines(&subflow.name);
            for step in &mut subflow.steps {
                step.name = collapse_newlines(&step.name);
            }
        }

        let mut flow = ply_analysis::normalize(flow);
        if self.options.suite_source {
            flow.source = Some(contents.to_owned());
        }
        Ok(flow)
    }
}

fn collapse_newlines(name: &str) -> String {
    NEWLINES.replace_all(name, " ").into_owned()
}
