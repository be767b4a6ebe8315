//! Schema checks for documents coming from the dashboard.
//!
//! serde stops at the first problem, but callers need every failing field,
//! so the raw menu JSON is walked first and only deserialized once it is
//! clean. Typed records such as [`Wine`](super::Wine) derive
//! [`validator::Validate`] instead, and their errors are flattened into the
//! same [`FieldError`] paths.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use uuid::Uuid;
use validator::{ValidationErrors, ValidationErrorsKind};

use super::menu::{PairingTier, RestaurantMenu};

/// One failing field, addressed by a JSON-ish path
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

struct Checker {
    issues: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, path: &str, message: &str) {
        self.issues.push(FieldError::new(path, message));
    }

    fn field<'a>(&mut self, obj: &'a Map<String, Value>, path: &str, key: &str) -> Option<&'a Value> {
        let value = obj.get(key);
        if value.is_none() {
            self.push(&join(path, key), "Required");
        }
        value
    }

    fn object<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.push(path, "Expected object");
        }
        obj
    }

    fn string(&mut self, obj: &Map<String, Value>, path: &str, key: &str) {
        if let Some(value) = self.field(obj, path, key) {
            if !value.is_string() {
                self.push(&join(path, key), "Expected string");
            }
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, path: &str, key: &str) {
        match obj.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => self.push(&join(path, key), "Expected string"),
        }
    }

    fn optional_string_array(&mut self, obj: &Map<String, Value>, path: &str, key: &str) {
        match obj.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Array(values)) => {
                for (i, value) in values.iter().enumerate() {
                    if !value.is_string() {
                        self.push(&format!("{}[{}]", join(path, key), i), "Expected string");
                    }
                }
            }
            Some(_) => self.push(&join(path, key), "Expected array"),
        }
    }

    fn array<'a>(&mut self, obj: &'a Map<String, Value>, path: &str, key: &str) -> &'a [Value] {
        match self.field(obj, path, key) {
            Some(Value::Array(values)) => values,
            Some(_) => {
                self.push(&join(path, key), "Expected array");
                &[]
            }
            None => &[],
        }
    }

    fn menu(&mut self, root: &Value) {
        let Some(root) = self.object(root, "$") else {
            return;
        };
        self.string(root, "", "restaurantName");
        for (ci, category) in self.array(root, "", "menu").iter().enumerate() {
            let path = format!("menu[{}]", ci);
            let Some(category) = self.object(category, &path) else {
                continue;
            };
            self.string(category, &path, "category");
            for (ii, item) in self.array(category, &path, "items").iter().enumerate() {
                self.item(item, &format!("{}.items[{}]", path, ii));
            }
        }
    }

    fn item(&mut self, item: &Value, path: &str) {
        let Some(item) = self.object(item, path) else {
            return;
        };
        self.string(item, path, "dish");
        if let Some(price) = self.field(item, path, "price") {
            if !(price.is_number() || price.is_string()) {
                self.push(&join(path, "price"), "Expected number or string");
            }
        }
        self.optional_string_array(item, path, "tags");
        if let Some(pairings) = self.field(item, path, "pairings") {
            let pairings_path = join(path, "pairings");
            if let Some(pairings) = self.object(pairings, &pairings_path) {
                for tier in PairingTier::ALL {
                    if let Some(slot) = self.field(pairings, &pairings_path, tier.as_str()) {
                        self.slot(slot, &join(&pairings_path, tier.as_str()));
                    }
                }
            }
        }
    }

    fn slot(&mut self, slot: &Value, path: &str) {
        let Some(slot) = self.object(slot, path) else {
            return;
        };
        for key in ["name", "vintage", "price", "note", "grape"] {
            self.string(slot, path, key);
        }
        self.optional_string(slot, path, "description");
        self.optional_string_array(slot, path, "keywords");
        match slot.get("wine_id") {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if Uuid::parse_str(id).is_ok() => {}
            Some(_) => self.push(&join(path, "wine_id"), "Expected wine id"),
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Validates a raw menu document and converts it to the typed form.
///
/// Returns every failing field on error.
pub fn parse_menu_document(document: &Value) -> Result<RestaurantMenu, Vec<FieldError>> {
    let mut checker = Checker { issues: Vec::new() };
    checker.menu(document);
    if !checker.issues.is_empty() {
        return Err(checker.issues);
    }
    serde_json::from_value(document.clone()).map_err(|e| vec![FieldError::new("$", e.to_string())])
}

/// Flattens `validator` errors into field paths, sorted by path.
///
/// Struct-level errors are reported on the struct's own path (`$` at the
/// root).
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut issues = Vec::new();
    collect(errors, "", &mut issues);
    issues.sort_by(|a, b| a.path.cmp(&b.path));
    issues
}

fn collect(errors: &ValidationErrors, path: &str, issues: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field_path = match (&**field, path) {
            ("__all__", "") => "$".to_string(),
            ("__all__", _) => path.to_string(),
            _ => join(path, field),
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = match &failure.message {
                        Some(message) => message.to_string(),
                        None => failure.code.to_string(),
                    };
                    issues.push(FieldError::new(field_path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(inner, &field_path, issues),
            ValidationErrorsKind::List(entries) => {
                for (index, inner) in entries {
                    collect(inner, &format!("{}[{}]", field_path, index), issues);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StockStatus, Wine, WineTag};
    use serde_json::json;
    use validator::Validate;

    fn slot() -> Value {
        json!({"name": "", "grape": "", "vintage": "", "price": "", "note": ""})
    }

    fn document() -> Value {
        json!({
            "restaurantName": "Palate",
            "menu": [{
                "category": "Mains",
                "items": [{
                    "dish": "Lamb",
                    "price": "345",
                    "pairings": {"byGlass": slot(), "midRange": slot(), "exclusive": slot()}
                }]
            }]
        })
    }

    #[test]
    fn test_valid_document_parses() {
        let menu = parse_menu_document(&document()).unwrap();
        assert_eq!(menu.menu[0].items[0].dish, "Lamb");
    }

    #[test]
    fn test_reports_every_failing_field() {
        let mut doc = document();
        doc["menu"][0]["items"][0]
            .as_object_mut()
            .unwrap()
            .remove("price");
        doc["menu"][0]["items"][0]["pairings"]
            .as_object_mut()
            .unwrap()
            .remove("exclusive");
        doc["menu"][0]["items"][0]["pairings"]["byGlass"]["note"] = json!(12);
        doc["restaurantName"] = json!(null);

        let issues = parse_menu_document(&doc).unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "restaurantName",
                "menu[0].items[0].price",
                "menu[0].items[0].pairings.byGlass.note",
                "menu[0].items[0].pairings.exclusive",
            ]
        );
        assert_eq!(issues[1].message, "Required");
    }

    #[test]
    fn test_rejects_bad_optional_fields() {
        let mut doc = document();
        doc["menu"][0]["items"][0]["tags"] = json!(["spice", 3]);
        doc["menu"][0]["items"][0]["pairings"]["midRange"]["wine_id"] = json!("not-a-uuid");
        doc["menu"][0]["items"][0]["pairings"]["midRange"]["keywords"] = json!("oak");

        let issues = parse_menu_document(&doc).unwrap_err();
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "menu[0].items[0].tags[1]",
                "menu[0].items[0].pairings.midRange.keywords",
                "menu[0].items[0].pairings.midRange.wine_id",
            ]
        );
    }

    #[test]
    fn test_non_object_root() {
        let issues = parse_menu_document(&json!([1, 2])).unwrap_err();
        assert_eq!(issues, vec![FieldError::new("$", "Expected object")]);
    }

    fn wine(name: &str, price: f64, tags: Vec<WineTag>) -> Wine {
        Wine {
            id: None,
            tenant_id: "palate".into(),
            name: name.into(),
            grape: String::new(),
            vintage: String::new(),
            price,
            description: String::new(),
            stock_status: StockStatus::InStock,
            tags,
        }
    }

    #[test]
    fn test_valid_wine_passes() {
        let wine = wine("Chablis", 0.0, vec![WineTag::new("citrus", 1)]);
        assert!(wine.validate().is_ok());
    }

    #[test]
    fn test_wine_errors_flatten_to_field_paths() {
        let wine = wine(
            "",
            -1.0,
            vec![WineTag::new("spice", 0), WineTag::new("spice", 3)],
        );
        let issues = field_errors(&wine.validate().unwrap_err());
        let paths: Vec<&str> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["$", "name", "price", "tags[0].weight"]);
        assert_eq!(issues[0].message, "Duplicate tag 'spice'");
        assert_eq!(issues[1].message, "Must not be empty");
        assert_eq!(issues[3].message, "Must be positive");
    }

    #[test]
    fn test_missing_weight_is_not_an_error() {
        let link = WineTag {
            tag_id: "spice".into(),
            weight: None,
        };
        assert!(wine("Barolo", 40.0, vec![link]).validate().is_ok());
    }
}
