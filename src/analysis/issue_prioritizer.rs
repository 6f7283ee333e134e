//! Scores open issues by labels, keywords, engagement and age.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, deserialize_with = "label_names")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub comments: u32,
    #[serde(default)]
    pub reactions: u32,
    #[serde(default)]
    pub age_days: u32,
}

/// Labels may be plain strings or GitHub-style `{ "name": ... }` objects.
fn label_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Name(String),
        Object { name: String },
    }

    let labels = Vec::<Label>::deserialize(deserializer)?;
    Ok(labels
        .into_iter()
        .map(|label| match label {
            Label::Name(name) | Label::Object { name } => name,
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        };
        f.write_str(name)
    }
}

/// Knobs of the scoring formula.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityWeights {
    /// Lowercase label -> weight; unknown labels weigh nothing
    pub labels: BTreeMap<String, f64>,
    pub keywords: Vec<String>,
    pub keyword_weight: f64,
    pub comment_weight: f64,
    pub reaction_weight: f64,
    /// Days per point of age bonus
    pub age_period_days: f64,
    pub max_age_bonus: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        let labels = [
            ("security", 5.0),
            ("bug", 3.0),
            ("performance", 2.0),
            ("enhancement", 1.0),
            ("documentation", 0.5),
        ]
        .into_iter()
        .map(|(label, weight)| (label.to_string(), weight))
        .collect();

        Self {
            labels,
            keywords: ["crash", "broken", "error", "fail", "security", "vulnerability"]
                .into_iter()
                .map(String::from)
                .collect(),
            keyword_weight: 1.5,
            comment_weight: 0.5,
            reaction_weight: 0.3,
            age_period_days: 30.0,
            max_age_bonus: 3.0,
            high_threshold: 8.0,
            medium_threshold: 4.0,
        }
    }
}

impl PriorityWeights {
    pub fn tier(&self, score: f64) -> Tier {
        if score >= self.high_threshold {
            Tier::High
        } else if score >= self.medium_threshold {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub score: f64,
    pub tier: Tier,
}

pub fn priority_score(issue: &Issue, weights: &PriorityWeights) -> f64 {
    let label_score: f64 = issue
        .labels
        .iter()
        .filter_map(|label| weights.labels.get(&label.trim().to_lowercase()))
        .sum();

    let text = format!("{} {}", issue.title, issue.body).to_lowercase();
    let hits = weights
        .keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count();

    let age_bonus = if weights.age_period_days > 0.0 {
        (issue.age_days as f64 / weights.age_period_days).min(weights.max_age_bonus)
    } else {
        0.0
    };

    let score = label_score
        + hits as f64 * weights.keyword_weight
        + issue.comments as f64 * weights.comment_weight
        + issue.reactions as f64 * weights.reaction_weight
        + age_bonus;
    (score * 100.0).round() / 100.0
}

/// Score and sort: highest score first, lower issue number on ties.
pub fn prioritize(issues: Vec<Issue>, weights: &PriorityWeights) -> Vec<ScoredIssue> {
    let mut scored: Vec<ScoredIssue> = issues
        .into_iter()
        .map(|issue| {
            let score = priority_score(&issue, weights);
            ScoredIssue {
                tier: weights.tier(score),
                score,
                issue,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.issue.number.cmp(&b.issue.number))
    });
    scored
}

/// Parse a JSON array of issues.
pub fn load_issues(json: &str) -> Result<Vec<Issue>, AnalysisError> {
    serde_json::from_str(json).map_err(|err| AnalysisError::InvalidIssues(err.to_string()))
}
