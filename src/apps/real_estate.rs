//! Real-estate agent team: listing extraction, market analysis, valuation.

use std::sync::Arc;

use crate::agents::{FetchAgent, LlmAgent};
use crate::criteria::Criteria;
use crate::errors::PipelineResult;
use crate::fetch::{DataFetcher, ExtractedRecord, ExtractionSchema, FetchRequest, FieldType, SEARCH_RESULT_FIELDS};
use crate::generate::ChatModel;
use crate::models::pipeline::{Pipeline, PipelineRun};
use crate::progress::ProgressReporter;
use crate::render::{render_records, tab_title, Report};

pub const PROPERTY_SEARCH: &str = "property_search";
pub const MARKET_ANALYSIS: &str = "market_analysis";
pub const PROPERTY_VALUATION: &str = "property_valuation";

/// Fields requested for every listing, heading first.
pub const PROPERTY_FIELDS: &[&str] = &[
    "address",
    "price",
    "bedrooms",
    "bathrooms",
    "square_feet",
    "property_type",
    "description",
    "listing_url",
    "agent_contact",
];

const REQUIRED: &[&str] = &["city", "state"];

const MARKET_INSTRUCTIONS: &str = "You are a real estate market analyst. Be concise and \
    concrete: cite neighbourhoods, price trends and inventory. Do not invent listings.";

const VALUATION_INSTRUCTIONS: &str = "You are a property valuation expert. For each listing, \
    say whether the asking price looks fair, high or low for the market and why, then give an \
    overall buying recommendation.";

const MARKET_PROMPT: &str = "Analyse the housing market in {criteria.city}, {criteria.state} \
    for a buyer looking at {criteria.property_type} homes priced between {criteria.min_price} \
    and {criteria.max_price} with at least {criteria.bedrooms} bedrooms.\n\n\
    Listings found:\n{stage.property_search}";

const VALUATION_PROMPT: &str = "Buyer wants: {criteria.special_features}.\n\n\
    Listings:\n{stage.property_search}\n\nMarket analysis:\n{stage.market_analysis}\n\n\
    Value each listing and recommend the best options.";

/// `"San Antonio"` -> `"san-antonio"`.
fn slug(text: &str, sep: char) -> String {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

/// Search-result URLs on the major listing sites for the criteria's city and state.
pub fn listing_urls(criteria: &Criteria) -> PipelineResult<Vec<String>> {
    criteria.require(REQUIRED)?;
    let city = criteria.text_or("city", "");
    let state = criteria.text_or("state", "");

    let city_dash = slug(&city, '-').to_lowercase();
    let city_underscore = slug(&city, '_');
    let state_lower = state.trim().to_lowercase();
    let state_upper = state.trim().to_uppercase();

    Ok(vec![
        format!("https://www.zillow.com/{}-{}/", city_dash, state_lower),
        format!(
            "https://www.realtor.com/realestateandhomes-search/{}_{}",
            city_underscore, state_upper
        ),
        format!("https://www.trulia.com/{}/{}/", state_upper, city_underscore),
        format!("https://www.homes.com/{}-{}/", city_dash, state_lower),
    ])
}

pub fn property_schema() -> ExtractionSchema {
    ExtractionSchema::new()
        .field("address", FieldType::String, true)
        .field("price", FieldType::String, true)
        .field("bedrooms", FieldType::Integer, false)
        .field("bathrooms", FieldType::Number, false)
        .field("square_feet", FieldType::Integer, false)
        .field("property_type", FieldType::String, false)
        .field("description", FieldType::String, false)
        .field("listing_url", FieldType::String, false)
        .field("agent_contact", FieldType::String, false)
        .collection("properties")
}

pub fn extraction_prompt(criteria: &Criteria) -> String {
    let mut prompt = format!(
        "Extract up to 10 {} listings for sale in {}, {}",
        criteria.text_or("property_type", "residential"),
        criteria.text_or("city", ""),
        criteria.text_or("state", ""),
    );
    let min = criteria.number_or("min_price", 0.0);
    let max = criteria.number_or("max_price", 0.0);
    if max > 0.0 {
        prompt.push_str(&format!(" priced between ${:.0} and ${:.0}", min, max));
    }
    if let Some(beds) = filled(criteria, "bedrooms") {
        prompt.push_str(&format!(" with at least {} bedrooms", beds));
    }
    if let Some(baths) = filled(criteria, "bathrooms") {
        prompt.push_str(&format!(" and at least {} bathrooms", baths));
    }
    let features = criteria.list("special_features");
    if !features.is_empty() {
        prompt.push_str(&format!(". Prefer homes with: {}", features.join(", ")));
    }
    prompt.push_str(". Include the full address, asking price and listing URL for each.");
    prompt
}

/// Short web-search query for search fetchers, e.g.
/// `"3 bedroom condo homes for sale in Austin, TX under $400000"`.
pub fn search_query(criteria: &Criteria) -> String {
    let mut query = String::new();
    if let Some(beds) = filled(criteria, "bedrooms") {
        query.push_str(&format!("{} bedroom ", beds));
    }
    query.push_str(&format!(
        "{} homes for sale in {}, {}",
        criteria.text_or("property_type", "residential"),
        criteria.text_or("city", ""),
        criteria.text_or("state", ""),
    ));
    let max = criteria.number_or("max_price", 0.0);
    if max > 0.0 {
        query.push_str(&format!(" under ${:.0}", max));
    }
    query
}

fn filled(criteria: &Criteria, field: &str) -> Option<String> {
    let value = criteria.text_or(field, "");
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Card fields for the fetched records: listing fields for extracted
/// listings, search-result fields when no record has an address.
pub fn record_fields(records: &[ExtractedRecord]) -> &'static [&'static str] {
    if records.is_empty() || records.iter().any(|r| r.field("address").is_some()) {
        PROPERTY_FIELDS
    } else {
        SEARCH_RESULT_FIELDS
    }
}

/// The three-stage real-estate team.
pub struct RealEstateTeam {
    model: Arc<dyn ChatModel>,
    fetcher: Arc<dyn DataFetcher>,
}

impl RealEstateTeam {
    pub fn new(model: Arc<dyn ChatModel>, fetcher: Arc<dyn DataFetcher>) -> Self {
        Self { model, fetcher }
    }

    pub fn pipeline(&self) -> PipelineResult<Pipeline> {
        let search = FetchAgent::new(PROPERTY_SEARCH, self.fetcher.clone(), |criteria| {
            Ok(FetchRequest::new(extraction_prompt(criteria))
                .with_urls(listing_urls(criteria)?)
                .with_query(search_query(criteria))
                .with_schema(property_schema()))
        });

        let market = LlmAgent::new(MARKET_ANALYSIS, self.model.clone())
            .with_instructions(MARKET_INSTRUCTIONS)
            .with_prompt(MARKET_PROMPT)
            .with_temperature(0.3);

        let valuation = LlmAgent::new(PROPERTY_VALUATION, self.model.clone())
            .with_instructions(VALUATION_INSTRUCTIONS)
            .with_prompt(VALUATION_PROMPT)
            .with_temperature(0.3);

        Pipeline::new("real_estate")
            .with_stage(Box::new(search))?
            .with_stage(Box::new(market))?
            .with_stage(Box::new(valuation))
    }

    /// Check the criteria, then run all three stages.
    pub async fn run(
        &self,
        criteria: Criteria,
        progress: &dyn ProgressReporter,
    ) -> PipelineResult<PipelineRun> {
        criteria.require(REQUIRED)?;
        self.pipeline()?.run(criteria, progress).await
    }
}

/// Report with listing cards in place of the raw JSON tab.
pub fn report(run: &PipelineRun) -> Report {
    let criteria = run.criteria();
    let location = format!(
        "{}, {}",
        criteria.text_or("city", "?"),
        criteria.text_or("state", "?")
    );
    let found = run.output(PROPERTY_SEARCH).map(|o| o.records.len()).unwrap_or(0);

    let mut report = Report::from_run(format!("Properties in {}", location), run)
        .metric("Location", &location)
        .metric("Properties found", found);

    let max = criteria.number_or("max_price", 0.0);
    if max > 0.0 {
        report = report.metric(
            "Budget",
            format!("${:.0} - ${:.0}", criteria.number_or("min_price", 0.0), max),
        );
    }

    if let Some(search) = run.output(PROPERTY_SEARCH) {
        let cards = render_records(&search.records, record_fields(&search.records));
        report.replace_tab(&tab_title(PROPERTY_SEARCH), cards);
    }
    report
}
