//! Collects the current content of the files under review.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AdapterError;

pub const NO_MATCHES: &str = "No matching files found.";
const FILE_SEPARATOR: &str = "\n\n---\n\n";

#[async_trait]
pub trait ContentCollector: Send + Sync {
    /// Render every file matching `patterns` under `base`.
    ///
    /// Each file becomes `### File: {relative path}\n\n{content}`; files are
    /// joined by a horizontal rule. Returns [`NO_MATCHES`] when nothing was read.
    async fn collect(&self, patterns: &[String], base: &Path) -> Result<String, AdapterError>;
}

/// [`ContentCollector`] that expands glob patterns on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobFileReader;

impl GlobFileReader {
    fn expand(patterns: &[String], base: &Path) -> Result<Vec<PathBuf>, AdapterError> {
        let escaped_base = PathBuf::from(glob::Pattern::escape(&base.to_string_lossy()));
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for pattern in patterns {
            let full = escaped_base.join(pattern);
            let matches = glob::glob(&full.to_string_lossy()).map_err(|e| AdapterError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            for entry in matches {
                match entry {
                    Ok(path) if path.is_file() => {
                        if seen.insert(path.clone()) {
                            paths.push(path);
                        }
                    }
                    Ok(path) => debug!("skipping non-file match {}", path.display()),
                    Err(e) => warn!("Could not read {}: {}", e.path().display(), e.error()),
                }
            }
        }
        Ok(paths)
    }
}

/// An empty base means the working directory.
fn resolve_base(base: &Path) -> &Path {
    if base.as_os_str().is_empty() {
        Path::new(".")
    } else {
        base
    }
}

#[async_trait]
impl ContentCollector for GlobFileReader {
    async fn collect(&self, patterns: &[String], base: &Path) -> Result<String, AdapterError> {
        let base = resolve_base(base);
        let paths = Self::expand(patterns, base)?;
        let mut sections = Vec::with_capacity(paths.len());

        for path in paths {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    let relative = path.strip_prefix(base).unwrap_or(&path);
                    sections.push(format!("### File: {}\n\n{}", relative.display(), content));
                }
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }

        if sections.is_empty() {
            return Ok(NO_MATCHES.to_string());
        }
        Ok(sections.join(FILE_SEPARATOR))
    }
}
