//! Collects pinned package versions from `requirements*.txt` files and
//! reports packages pinned differently across the tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::{display_path, find_files, read_file};
use crate::errors::AnalysisError;

fn requirement_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z0-9][A-Za-z0-9._-]*)\s*(?:\[[^\]]*\])?\s*(?:(==|>=|<=|~=|!=|>|<)\s*([A-Za-z0-9.*+!_-]+))?",
        )
        .expect("requirement pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Requirement {
    /// Lowercase name with `_` replaced by `-`
    pub package: String,
    pub operator: Option<String>,
    pub version: Option<String>,
    pub file: String,
    pub line: usize,
}

impl Requirement {
    pub fn is_pinned(&self) -> bool {
        self.operator.as_deref() == Some("==")
    }
}

/// A package pinned to more than one exact version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionConflict {
    pub package: String,
    /// Version -> files pinning it
    pub versions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionReport {
    pub files: Vec<String>,
    pub requirements: Vec<Requirement>,
    pub conflicts: Vec<VersionConflict>,
    pub unpinned: Vec<Requirement>,
}

/// Parse one requirements line. Comments, blanks, options and URLs yield `None`.
pub fn parse_line(line: &str) -> Option<(String, Option<String>, Option<String>)> {
    let line = line.split('#').next().unwrap_or_default();
    let line = line.split(';').next().unwrap_or_default().trim();
    if line.is_empty() || line.starts_with('-') || line.contains("://") {
        return None;
    }

    let caps = requirement_pattern().captures(line)?;
    let package = caps[1].to_lowercase().replace('_', "-");
    let operator = caps.get(2).map(|m| m.as_str().to_string());
    let version = caps.get(3).map(|m| m.as_str().to_string());
    Some((package, operator, version))
}

pub fn parse_requirements(text: &str, file: &str) -> Vec<Requirement> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            parse_line(line).map(|(package, operator, version)| Requirement {
                package,
                operator,
                version,
                file: file.to_string(),
                line: index + 1,
            })
        })
        .collect()
}

/// Scan every `requirements*.txt` below `root`.
pub fn hunt_versions(root: &Path) -> Result<VersionReport, AnalysisError> {
    let mut report = VersionReport::default();

    for path in find_files(root, "requirements*.txt")? {
        let file = display_path(root, &path);
        let text = read_file(&path)?;
        let parsed = parse_requirements(&text, &file);
        tracing::debug!(file = %file, requirements = parsed.len(), "Parsed requirements");
        report.files.push(file);
        report.requirements.extend(parsed);
    }

    report.conflicts = find_conflicts(&report.requirements);
    report.unpinned = report
        .requirements
        .iter()
        .filter(|r| r.operator.is_none())
        .cloned()
        .collect();

    tracing::info!(
        files = report.files.len(),
        requirements = report.requirements.len(),
        conflicts = report.conflicts.len(),
        "Version scan finished"
    );
    Ok(report)
}

pub fn find_conflicts(requirements: &[Requirement]) -> Vec<VersionConflict> {
    let mut pins: BTreeMap<&str, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for req in requirements.iter().filter(|r| r.is_pinned()) {
        if let Some(version) = &req.version {
            let files = pins
                .entry(req.package.as_str())
                .or_default()
                .entry(version.clone())
                .or_default();
            if !files.contains(&req.file) {
                files.push(req.file.clone());
            }
        }
    }

    pins.into_iter()
        .filter(|(_, versions)| versions.len() > 1)
        .map(|(package, versions)| VersionConflict {
            package: package.to_string(),
            versions,
        })
        .collect()
}
