//! Prompt templates filled from the pipeline context.
//!
//! Supported placeholders:
//! - `{criteria.<field>}`: a criteria value, `"not specified"` when absent
//! - `{stage.<name>}`: text of an earlier stage
//! - `{previous}`: text of the most recent stage, empty before the first

use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::stage::PipelineContext;
use crate::errors::StageError;

const NOT_SPECIFIED: &str = "not specified";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([a-z_]+)(?:\.([A-Za-z0-9_\-]+))?\}").expect("placeholder pattern is valid")
    })
}

/// A prompt with `{placeholder}` slots.
///
/// # Example
/// ```rust
/// use llmpipeline::models::prompt::PromptTemplate;
/// use llmpipeline::models::stage::PipelineContext;
/// use llmpipeline::Criteria;
///
/// let template = PromptTemplate::new("Homes in {criteria.city} under {criteria.max_price}");
/// let ctx = PipelineContext::new(Criteria::new().with("city", "Austin"));
/// assert_eq!(template.render(&ctx).unwrap(), "Homes in Austin under not specified");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Placeholders in order of appearance, e.g. `"criteria.city"`.
    pub fn placeholders(&self) -> Vec<String> {
        placeholder_pattern()
            .captures_iter(&self.text)
            .map(|caps| caps[0].trim_matches(|c| c == '{' || c == '}').to_string())
            .collect()
    }

    pub fn render(&self, ctx: &PipelineContext) -> Result<String, StageError> {
        let mut failure = None;
        let rendered = placeholder_pattern().replace_all(&self.text, |caps: &Captures| {
            match resolve(caps, ctx) {
                Some(value) => value,
                None => {
                    if failure.is_none() {
                        failure = Some(caps[0].trim_matches(|c| c == '{' || c == '}').to_string());
                    }
                    String::new()
                }
            }
        });

        match failure {
            Some(name) => Err(StageError::UnresolvedPlaceholder(name)),
            None => Ok(rendered.into_owned()),
        }
    }
}

fn resolve(caps: &Captures, ctx: &PipelineContext) -> Option<String> {
    let kind = &caps[1];
    let key = caps.get(2).map(|m| m.as_str());

    match (kind, key) {
        ("criteria", Some(field)) => Some(ctx.criteria().text_or(field, NOT_SPECIFIED)),
        ("stage", Some(stage)) => ctx.output(stage).map(|o| o.text.clone()),
        ("previous", None) => Some(ctx.previous().map(|o| o.text.clone()).unwrap_or_default()),
        _ => None,
    }
}

impl From<&str> for PromptTemplate {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for PromptTemplate {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
