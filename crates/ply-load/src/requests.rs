use error_stack::{report, ResultExt as _};
use indexmap::IndexMap;
use ply_core::request::{Request, RequestSuite};

use crate::error::{LoadError, Result};
use crate::files::{relative_name, FileAccess, ListOptions};
use crate::flows::LoadOptions;

/// Loads `.ply.yaml` request suite documents.
pub struct RequestLoader<'a> {
    files: &'a dyn FileAccess,
    options: LoadOptions,
}

impl<'a> RequestLoader<'a> {
    pub fn new(files: &'a dyn FileAccess, options: LoadOptions) -> Self {
        Self { files, options }
    }

    /// Loads every request suite under the base directory. A malformed
    /// document is logged and skipped.
    pub async fn load_request_suites(&self, base: &str) -> Result<Vec<RequestSuite>> {
        let files = self
            .files
            .file_list(
                base,
                &ListOptions {
                    recursive: true,
                    patterns: vec![
                        "**/*.ply.yaml".to_owned(),
                        "**/*.ply.yml".to_owned(),
                        "**/*.ply".to_owned(),
                    ],
                },
            )
            .await?;

        let mut suites = Vec::with_capacity(files.len());
        for (path, contents) in &files {
            match self.read_request_suite(base, path, contents) {
                Ok(suite) => suites.push(suite),
                Err(err) => tracing::error!("skipping request suite {path}: {err:?}"),
            }
        }
        Ok(suites)
    }

    /// Loads a single suite, returning `None` if the file does not exist.
    pub async fn load_request_suite(
        &self,
        base: &str,
        path: &str,
    ) -> Result<Option<RequestSuite>> {
        match self.files.read_text_file(path).await? {
            Some(contents) => Ok(Some(self.read_request_suite(base, path, &contents)?)),
            None => Ok(None),
        }
    }

    fn read_request_suite(&self, base: &str, path: &str, contents: &str) -> Result<RequestSuite> {
        let doc: serde_yaml_ng::Value = serde_yaml_ng::from_str(contents).change_context_lazy(
            || LoadError::BadRequestDocument {
                path: path.to_owned(),
            },
        )?;
        if !doc.is_mapping() {
            return Err(report!(LoadError::BadRequestDocument {
                path: path.to_owned(),
            }));
        }
        // Suite documents map request name to request.
        let requests_by_name: IndexMap<String, Request> = serde_yaml_ng::from_value(doc)
            .change_context_lazy(|| LoadError::BadRequestDocument {
                path: path.to_owned(),
            })?;

        let requests = requests_by_name
            .into_iter()
            .map(|(name, mut request)| {
                request.name = name;
                request
            })
            .collect();

        Ok(RequestSuite {
            name: relative_name(base, path),
            path: path.to_owned(),
            requests,
            source: self.options.suite_source.then(|| contents.to_owned()),
        })
    }
}
