//! Search and filter criteria collected from the user.
//!
//! Criteria are a flat, ordered map of field names to values. The only rule
//! enforced is presence: a field is either there or the caller falls back to
//! a default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CriteriaError;

/// A single criteria value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriteriaValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl CriteriaValue {
    fn is_blank(&self) -> bool {
        match self {
            CriteriaValue::Text(s) => s.trim().is_empty(),
            CriteriaValue::List(items) => items.is_empty(),
            CriteriaValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CriteriaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriteriaValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CriteriaValue::Number(n) => write!(f, "{}", n),
            CriteriaValue::Text(s) => f.write_str(s),
            CriteriaValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for CriteriaValue {
    fn from(value: &str) -> Self {
        CriteriaValue::Text(value.to_string())
    }
}

impl From<String> for CriteriaValue {
    fn from(value: String) -> Self {
        CriteriaValue::Text(value)
    }
}

impl From<f64> for CriteriaValue {
    fn from(value: f64) -> Self {
        CriteriaValue::Number(value)
    }
}

impl From<u32> for CriteriaValue {
    fn from(value: u32) -> Self {
        CriteriaValue::Number(value as f64)
    }
}

impl From<Vec<String>> for CriteriaValue {
    fn from(value: Vec<String>) -> Self {
        CriteriaValue::List(value)
    }
}

/// Flat mapping of field name to value.
///
/// # Example
/// ```rust
/// use llmpipeline::Criteria;
///
/// let criteria = Criteria::new()
///     .with("city", "Austin")
///     .with("max_price", 450_000.0);
///
/// assert!(criteria.require(&["city"]).is_ok());
/// assert_eq!(criteria.number_or("bedrooms", 2.0), 2.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    fields: BTreeMap<String, CriteriaValue>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<CriteriaValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<CriteriaValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&CriteriaValue> {
        self.fields.get(field)
    }

    /// Text form of a field, or `default` when it is absent or blank.
    pub fn text_or(&self, field: &str, default: &str) -> String {
        match self.fields.get(field) {
            Some(value) if !value.is_blank() => value.to_string(),
            _ => default.to_string(),
        }
    }

    /// Numeric value of a field; numeric text is parsed, anything else falls back.
    pub fn number_or(&self, field: &str, default: f64) -> f64 {
        match self.fields.get(field) {
            Some(CriteriaValue::Number(n)) => *n,
            Some(CriteriaValue::Text(s)) => s.trim().replace(',', "").parse().unwrap_or(default),
            _ => default,
        }
    }

    /// List value of a field. A text value becomes a one-item list.
    pub fn list(&self, field: &str) -> Vec<String> {
        match self.fields.get(field) {
            Some(CriteriaValue::List(items)) => items.clone(),
            Some(CriteriaValue::Text(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Check that every field is present and not blank.
    pub fn require(&self, fields: &[&str]) -> Result<(), CriteriaError> {
        for field in fields {
            match self.fields.get(*field) {
                Some(value) if !value.is_blank() => {}
                _ => return Err(CriteriaError::Missing(field.to_string())),
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CriteriaValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Form fields of the real-estate search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySearch {
    pub city: String,
    pub state: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub property_type: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub special_features: Vec<String>,
}

impl From<PropertySearch> for Criteria {
    fn from(search: PropertySearch) -> Self {
        let mut criteria = Criteria::new()
            .with("city", search.city)
            .with("state", search.state);
        if let Some(min) = search.min_price {
            criteria.set("min_price", min);
        }
        if let Some(max) = search.max_price {
            criteria.set("max_price", max);
        }
        if let Some(kind) = search.property_type {
            criteria.set("property_type", kind);
        }
        if let Some(beds) = search.bedrooms {
            criteria.set("bedrooms", beds);
        }
        if let Some(baths) = search.bathrooms {
            criteria.set("bathrooms", baths);
        }
        if !search.special_features.is_empty() {
            criteria.set("special_features", search.special_features);
        }
        criteria
    }
}

/// Form fields of the financial coach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub monthly_income: f64,
    #[serde(default)]
    pub dependants: u32,
    /// Monthly spending per category, e.g. `("Housing", 1500.0)`.
    #[serde(default)]
    pub expenses: Vec<(String, f64)>,
    #[serde(default)]
    pub debts: Vec<crate::apps::debt::Debt>,
    #[serde(default)]
    pub extra_debt_payment: f64,
}

impl From<&FinancialProfile> for Criteria {
    fn from(profile: &FinancialProfile) -> Self {
        let total_expenses: f64 = profile.expenses.iter().map(|(_, amount)| amount).sum();
        let expenses = profile
            .expenses
            .iter()
            .map(|(category, amount)| format!("{}: ${:.2}", category, amount))
            .collect::<Vec<_>>();
        let debts = profile
            .debts
            .iter()
            .map(|d| {
                format!(
                    "{}: ${:.2} at {:.2}% APR, minimum ${:.2}",
                    d.name, d.balance, d.rate, d.min_payment
                )
            })
            .collect::<Vec<_>>();

        Criteria::new()
            .with("monthly_income", profile.monthly_income)
            .with("dependants", profile.dependants)
            .with("total_expenses", total_expenses)
            .with("expenses", expenses)
            .with("debts", debts)
            .with("extra_debt_payment", profile.extra_debt_payment)
    }
}
