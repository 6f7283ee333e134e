//! README checks: title, setup section, and whether the files the
//! instructions mention actually exist next to the README.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::{display_path, find_files, read_file};
use crate::errors::AnalysisError;

struct Patterns {
    setup: Regex,
    script: Regex,
    pip_requirements: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        setup: Regex::new(r"(?im)^##+\s+.*(setup|getting started|how to|installation)")
            .expect("setup pattern is valid"),
        script: Regex::new(r"(?:streamlit\s+run|\bpython3?)\s+([\w./-]+\.py)\b")
            .expect("script pattern is valid"),
        pip_requirements: Regex::new(r"pip3?\s+install\s+-r\s+([\w./-]+)")
            .expect("pip pattern is valid"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingTitle,
    MissingSetupSection,
    MissingScript,
    MissingRequirements,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub path: String,
    pub kind: FindingKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocReport {
    pub readmes: Vec<String>,
    pub findings: Vec<Finding>,
    pub summary: BTreeMap<FindingKind, usize>,
}

/// Check one README's text against the directory that holds it.
pub fn check_readme(text: &str, dir: &Path, path: &str) -> Vec<Finding> {
    let patterns = patterns();
    let mut findings = Vec::new();
    let mut finding = |kind, message: String| {
        findings.push(Finding {
            path: path.to_string(),
            kind,
            message,
        })
    };

    if !text.lines().any(|line| line.starts_with("# ")) {
        finding(FindingKind::MissingTitle, "No top-level '# ' heading".to_string());
    }
    if !patterns.setup.is_match(text) {
        finding(
            FindingKind::MissingSetupSection,
            "No setup, installation or getting started section".to_string(),
        );
    }

    let scripts: BTreeSet<&str> = patterns
        .script
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    for script in scripts {
        if !dir.join(script).is_file() {
            finding(
                FindingKind::MissingScript,
                format!("Run command refers to missing file '{}'", script),
            );
        }
    }

    let mut requirement_files: BTreeSet<&str> = patterns
        .pip_requirements
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if text.contains("requirements.txt") {
        requirement_files.insert("requirements.txt");
    }
    for file in requirement_files {
        if !dir.join(file).is_file() {
            finding(
                FindingKind::MissingRequirements,
                format!("Mentions '{}' but the file does not exist", file),
            );
        }
    }

    findings
}

/// Check every `README.md` below `root`.
pub fn check_docs(root: &Path) -> Result<DocReport, AnalysisError> {
    let mut report = DocReport::default();

    for readme in find_files(root, "README.md")? {
        let path = display_path(root, &readme);
        let dir = readme.parent().unwrap_or(root);
        let text = read_file(&readme)?;
        report.findings.extend(check_readme(&text, dir, &path));
        report.readmes.push(path);
    }

    for finding in &report.findings {
        *report.summary.entry(finding.kind).or_default() += 1;
    }

    tracing::info!(
        readmes = report.readmes.len(),
        findings = report.findings.len(),
        "Doc check finished"
    );
    Ok(report)
}
