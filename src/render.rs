//! Result rendering: turn a finished run into tabs, metrics and markdown.

use std::fmt::Write as _;

use serde::Serialize;

use crate::fetch::ExtractedRecord;
use crate::models::pipeline::PipelineRun;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab {
    pub title: String,
    pub body: String,
}

/// Everything shown to the user after a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub title: String,
    pub metrics: Vec<Metric>,
    pub tabs: Vec<Tab>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// One tab per stage, titled from the stage name.
    pub fn from_run(title: impl Into<String>, run: &PipelineRun) -> Self {
        let mut report = Self::new(title);
        for output in run.outputs() {
            report.tabs.push(Tab {
                title: tab_title(&output.stage),
                body: output.text.trim().to_string(),
            });
        }
        report
    }

    pub fn metric(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.metrics.push(Metric {
            label: label.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn tab(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.tabs.push(Tab {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    /// Replace the body of the tab with the given title, if present.
    pub fn replace_tab(&mut self, title: &str, body: impl Into<String>) -> bool {
        match self.tabs.iter_mut().find(|t| t.title == title) {
            Some(tab) => {
                tab.body = body.into();
                true
            }
            None => false,
        }
    }
}

/// `"market_analysis"` -> `"Market Analysis"`.
pub fn tab_title(stage: &str) -> String {
    stage
        .split(|c| c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", report.title);

    if !report.metrics.is_empty() {
        out.push('\n');
        out.push_str("| Metric | Value |\n|---|---|\n");
        for metric in &report.metrics {
            let _ = writeln!(out, "| {} | {} |", metric.label, metric.value);
        }
    }

    for tab in &report.tabs {
        let _ = write!(out, "\n## {}\n\n{}\n", tab.title, tab.body);
    }
    out
}

/// Bullet cards for records; the first field is the card heading.
pub fn render_records(records: &[ExtractedRecord], fields: &[&str]) -> String {
    if records.is_empty() {
        return "_No records found._".to_string();
    }
    let Some((heading, rest)) = fields.split_first() else {
        return String::new();
    };

    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "### {}. {}", i + 1, record.field_or_placeholder(heading));
        for field in rest {
            let _ = writeln!(out, "- **{}**: {}", tab_title(field), record.field_or_placeholder(field));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn titles_are_humanised() {
        assert_eq!(tab_title("market_analysis"), "Market Analysis");
        assert_eq!(tab_title("debt-plan"), "Debt Plan");
        assert_eq!(tab_title("x__y"), "X Y");
    }

    #[test]
    fn markdown_has_metrics_table_and_sections() {
        let report = Report::new("Coach")
            .metric("Monthly income", "$5000")
            .tab("Budget", "Spend less.");
        let md = render_markdown(&report);
        assert!(md.starts_with("# Coach\n"));
        assert!(md.contains("| Monthly income | $5000 |"));
        assert!(md.contains("\n## Budget\n\nSpend less.\n"));

        let bare = render_markdown(&Report::new("Empty"));
        assert_eq!(bare, "# Empty\n");
    }

    #[test]
    fn record_cards_use_placeholders() {
        let records = vec![serde_json::from_value::<ExtractedRecord>(json!({
            "address": "1 Main St",
            "price": "$300,000"
        }))
        .unwrap()];
        let md = render_records(&records, &["address", "price", "bedrooms"]);
        assert!(md.starts_with("### 1. 1 Main St\n"));
        assert!(md.contains("- **Price**: $300,000"));
        assert!(md.contains("- **Bedrooms**: N/A"));
        assert_eq!(render_records(&[], &["address"]), "_No records found._");
    }
}
