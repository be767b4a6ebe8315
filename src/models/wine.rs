use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Display, str::FromStr};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Weight applied when a wine's tag link carries none
pub const DEFAULT_TAG_WEIGHT: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    #[default]
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!("unknown stock status '{}'", other)),
        }
    }
}

/// A weighted link between a wine and a catalog tag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct WineTag {
    #[validate(length(min = 1, message = "Required"))]
    pub tag_id: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "Must be positive"))]
    pub weight: Option<u32>,
}

impl WineTag {
    pub fn new(tag_id: impl Into<String>, weight: u32) -> Self {
        Self {
            tag_id: tag_id.into(),
            weight: Some(weight),
        }
    }

    /// Effective weight, falling back to [`DEFAULT_TAG_WEIGHT`].
    pub fn weight(&self) -> u32 {
        self.weight.unwrap_or(DEFAULT_TAG_WEIGHT)
    }
}

/// A wine in a tenant's inventory
///
/// Validation expects the name to be trimmed already.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "unique_tag_ids", skip_on_field_errors = false))]
pub struct Wine {
    /// `None` until the wine has been stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Required"))]
    pub tenant_id: String,
    #[validate(length(min = 1, message = "Must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub grape: String,
    /// Free text: "2019", "NV", "2015-2017"...
    #[serde(default)]
    pub vintage: String,
    #[validate(range(min = 0.0, message = "Must be a non-negative number"))]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    #[validate(nested)]
    pub tags: Vec<WineTag>,
}

/// A wine links each catalog tag at most once
fn unique_tag_ids(wine: &Wine) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for link in &wine.tags {
        if !seen.insert(link.tag_id.as_str()) {
            return Err(ValidationError::new("duplicate_tag")
                .with_message(format!("Duplicate tag '{}'", link.tag_id).into()));
        }
    }
    Ok(())
}

impl Wine {
    pub fn is_in_stock(&self) -> bool {
        self.stock_status == StockStatus::InStock
    }
}

/// A wine annotated with its match score for one pairing request.
///
/// Only ever built by the pairing engine; never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredWine {
    #[serde(flatten)]
    pub wine: Wine,
    pub score: i64,
    #[serde(rename = "matchReasons")]
    pub match_reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weight_defaults_to_five() {
        let link: WineTag = serde_json::from_str(r#"{"tag_id":"spice"}"#).unwrap();
        assert_eq!(link.weight, None);
        assert_eq!(link.weight(), 5);
        assert_eq!(WineTag::new("spice", 8).weight(), 8);
    }

    #[test]
    fn test_stock_status_round_trip() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"out_of_stock\""
        );
        assert_eq!("in_stock".parse::<StockStatus>(), Ok(StockStatus::InStock));
        assert!("sold".parse::<StockStatus>().is_err());
    }

    #[test]
    fn test_scored_wine_flattens_wine_fields() {
        let scored = ScoredWine {
            wine: Wine {
                id: None,
                tenant_id: "palate".into(),
                name: "Riesling Kabinett".into(),
                grape: "Riesling".into(),
                vintage: "2021".into(),
                price: 19.0,
                description: String::new(),
                stock_status: StockStatus::InStock,
                tags: vec![],
            },
            score: 10,
            match_reasons: vec!["Citrus".into()],
        };
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["name"], "Riesling Kabinett");
        assert_eq!(json["score"], 10);
        assert_eq!(json["matchReasons"][0], "Citrus");
        assert!(json.get("id").is_none());
    }
}
