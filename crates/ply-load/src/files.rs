use std::path::PathBuf;

use async_trait::async_trait;
use error_stack::{report, ResultExt as _};
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;

use crate::error::{LoadError, Result};

/// Options for [`FileAccess::file_list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub recursive: bool,
    /// Glob patterns; a file is listed if it matches any of them.
    /// Empty means list everything.
    pub patterns: Vec<String>,
}

/// Boundary for retrieving suite documents.
///
/// The local filesystem implementation lives here; remote backends (GitHub
/// REST, a cloned git working copy) plug in behind this trait. Callers must
/// not issue overlapping operations against a shared git checkout; that
/// serialization is the caller's responsibility, not this trait's.
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Reads a text file, returning `None` if it does not exist.
    async fn read_text_file(&self, path: &str) -> Result<Option<String>>;

    /// Lists files under `dir` matching the options, mapping each path to
    /// its contents. Paths are keyed relative to the access root, using
    /// forward slashes, in sorted order.
    async fn file_list(&self, dir: &str, options: &ListOptions)
        -> Result<IndexMap<String, String>>;
}

/// [`FileAccess`] over the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileAccess;

#[async_trait]
impl FileAccess for LocalFileAccess {
    async fn read_text_file(&self, path: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(report!(err).change_context(LoadError::Io {
                path: path.to_owned(),
            })),
        }
    }

    async fn file_list(
        &self,
        dir: &str,
        options: &ListOptions,
    ) -> Result<IndexMap<String, String>> {
        let globs = build_globs(&options.patterns)?;

        let mut pending: Vec<PathBuf> = vec![PathBuf::from(dir)];
        let mut paths: Vec<String> = Vec::new();
        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await.change_context_lazy(|| {
                LoadError::Io {
                    path: current.display().to_string(),
                }
            })?;
            while let Some(entry) = entries.next_entry().await.change_context_lazy(|| {
                LoadError::Io {
                    path: current.display().to_string(),
                }
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.change_context_lazy(|| LoadError::Io {
                    path: path.display().to_string(),
                })?;
                if file_type.is_dir() {
                    if options.recursive {
                        pending.push(path);
                    }
                } else {
                    let normalized = path.to_string_lossy().replace('\\', "/");
                    if matches(&globs, &normalized) {
                        paths.push(normalized);
                    }
                }
            }
        }
        paths.sort();

        let mut files = IndexMap::with_capacity(paths.len());
        for path in paths {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .change_context_lazy(|| LoadError::Io { path: path.clone() })?;
            files.insert(path, contents);
        }
        Ok(files)
    }
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).change_context_lazy(|| LoadError::Pattern {
            pattern: pattern.clone(),
        })?;
        builder.add(glob);
    }
    Ok(Some(builder.build().change_context_lazy(|| {
        LoadError::Pattern {
            pattern: patterns.join(", "),
        }
    })?))
}

fn matches(globs: &Option<GlobSet>, path: &str) -> bool {
    match globs {
        Some(globs) => globs.is_match(path),
        None => true,
    }
}

/// Strips the base directory prefix, yielding the suite-relative name.
pub(crate) fn relative_name(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    path.strip_prefix(base)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(path)
        .to_owned()
}
