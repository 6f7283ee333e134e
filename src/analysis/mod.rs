//! Repository analysis tools: dependency versions, issue triage and README checks.

pub mod doc_consistency;
pub mod issue_prioritizer;
pub mod version_hunter;

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AnalysisError;

pub use doc_consistency::{check_docs, DocReport, Finding, FindingKind};
pub use issue_prioritizer::{load_issues, prioritize, Issue, PriorityWeights, ScoredIssue, Tier};
pub use version_hunter::{hunt_versions, Requirement, VersionConflict, VersionReport};

/// Files under `root` whose name matches `file_pattern`, in path order.
///
/// Hidden directories and virtualenvs are skipped.
pub(crate) fn find_files(root: &Path, file_pattern: &str) -> Result<Vec<PathBuf>, AnalysisError> {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let pattern = format!("{}/**/{}", base.trim_end_matches('/'), file_pattern);

    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable path");
                continue;
            }
        };
        if is_ignored(root, &path) || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn is_ignored(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        name.starts_with('.') || name == "node_modules" || name == "venv"
    })
}

/// Read a whole file, tagging I/O errors with the path.
pub fn read_file(path: &Path) -> Result<String, AnalysisError> {
    fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Path relative to `root` with forward slashes, for reports.
pub(crate) fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_files_and_skips_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/api")).unwrap();
        fs::create_dir_all(root.join(".venv")).unwrap();
        fs::write(root.join("requirements.txt"), "").unwrap();
        fs::write(root.join("app/api/requirements-dev.txt"), "").unwrap();
        fs::write(root.join(".venv/requirements.txt"), "").unwrap();

        let found: Vec<String> = find_files(root, "requirements*.txt")
            .unwrap()
            .iter()
            .map(|p| display_path(root, p))
            .collect();
        assert_eq!(found, vec!["app/api/requirements-dev.txt", "requirements.txt"]);
    }

    #[test]
    fn read_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issues.json");
        fs::write(&path, "[]").unwrap();
        assert_eq!(read_file(&path).unwrap(), "[]");

        let missing = dir.path().join("missing.json");
        match read_file(&missing).unwrap_err() {
            AnalysisError::Io { path, .. } => assert!(path.ends_with("missing.json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
