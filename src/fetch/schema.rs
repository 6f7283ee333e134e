//! Extraction schema hints and the loosely-typed records that come back.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Placeholder shown for absent fields.
pub const PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    StringArray,
}

impl FieldType {
    fn to_json(self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
        }
    }
}

/// A JSON-schema hint sent to an extraction API to bias its output shape.
///
/// The schema is never checked against what comes back.
///
/// # Example
/// ```rust
/// use llmpipeline::fetch::{ExtractionSchema, FieldType};
///
/// let schema = ExtractionSchema::new()
///     .field("address", FieldType::String, true)
///     .field("price", FieldType::String, true)
///     .collection("properties");
///
/// let json = schema.to_json();
/// assert_eq!(json["properties"]["properties"]["type"], "array");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractionSchema {
    fields: Vec<(String, FieldType)>,
    required: Vec<String>,
    collection: Option<String>,
}

impl ExtractionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldType, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.fields.push((name, kind));
        self
    }

    /// Wrap the record schema as an array of objects under `key`.
    pub fn collection(mut self, key: impl Into<String>) -> Self {
        self.collection = Some(key.into());
        self
    }

    pub fn collection_key(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn to_json(&self) -> Value {
        let mut properties = Map::new();
        for (name, kind) in &self.fields {
            properties.insert(name.clone(), kind.to_json());
        }
        let record = json!({
            "type": "object",
            "properties": properties,
            "required": self.required,
        });

        match &self.collection {
            Some(key) => {
                let mut wrapper = Map::new();
                wrapper.insert(key.clone(), json!({ "type": "array", "items": record }));
                json!({
                    "type": "object",
                    "properties": wrapper,
                    "required": [key],
                })
            }
            None => record,
        }
    }
}

/// One record returned by an extraction or search API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedRecord(pub Map<String, Value>);

impl ExtractedRecord {
    /// Field rendered as text; `None` when absent, null or blank.
    pub fn field(&self, name: &str) -> Option<String> {
        let text = match self.0.get(name)? {
            Value::Null => return None,
            Value::String(s) => s.trim().to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn field_or_placeholder(&self, name: &str) -> String {
        self.field(name).unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Find the records inside an API's `data` payload.
///
/// The collection key is used when present, a bare array is taken as-is and
/// a lone object becomes one record. Non-object entries are dropped.
pub fn locate_records(data: &Value, collection: Option<&str>) -> Vec<ExtractedRecord> {
    let items: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match collection.and_then(|key| map.get(key)) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => vec![data],
        },
        _ => Vec::new(),
    };

    let total = items.len();
    let records: Vec<ExtractedRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(ExtractedRecord(map.clone())),
            _ => None,
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            dropped = total - records.len(),
            "Dropped non-object entries from extraction result"
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_required_fields() {
        let schema = ExtractionSchema::new()
            .field("title", FieldType::String, true)
            .field("tags", FieldType::StringArray, false);
        let json = schema.to_json();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], json!(["title"]));
        assert_eq!(json["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn missing_fields_get_placeholder() {
        let record: ExtractedRecord = serde_json::from_value(json!({
            "address": "12 Elm St",
            "price": null,
            "description": "  ",
            "bedrooms": 3,
            "features": ["pool", "garage"]
        }))
        .unwrap();

        assert_eq!(record.field_or_placeholder("address"), "12 Elm St");
        assert_eq!(record.field_or_placeholder("price"), PLACEHOLDER);
        assert_eq!(record.field_or_placeholder("description"), PLACEHOLDER);
        assert_eq!(record.field_or_placeholder("agent"), PLACEHOLDER);
        assert_eq!(record.field_or_placeholder("bedrooms"), "3");
        assert_eq!(record.field_or_placeholder("features"), "pool, garage");
    }

    #[test]
    fn records_are_found_under_collection_key() {
        let data = json!({ "properties": [{ "address": "a" }, "junk", { "address": "b" }] });
        let records = locate_records(&data, Some("properties"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].field("address").as_deref(), Some("b"));

        let single = locate_records(&json!({ "address": "c" }), Some("properties"));
        assert_eq!(single.len(), 1);

        let bare = locate_records(&json!([{ "x": 1 }]), None);
        assert_eq!(bare.len(), 1);

        assert!(locate_records(&json!("text"), None).is_empty());
    }
}
