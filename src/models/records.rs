//! Normalized storage rows behind the nested menu document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::menu::PairingTier;

/// An independent restaurant account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    /// Short numeric code, unique across all tenants
    #[serde(skip_serializing)]
    pub access_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub id: String,
    pub name: String,
    pub access_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub tenant_id: String,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemRecord {
    pub id: Uuid,
    pub category_id: Uuid,
    pub dish: String,
    /// Stored as text whatever the document carried
    pub price: String,
    pub tags: Option<Vec<String>>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub category_id: Uuid,
    pub dish: String,
    pub price: String,
    pub tags: Option<Vec<String>>,
    pub sort_order: i32,
}

/// Wine display fields carried directly on a pairing row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InlinePairing {
    pub name: String,
    pub grape: String,
    pub vintage: String,
    pub price: String,
    pub note: String,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Where a stored pairing slot gets its display fields from
#[derive(Debug, Clone, PartialEq)]
pub enum PairingSource {
    Inline(InlinePairing),
    /// Display fields come from the inventory wine at read time
    Referenced { wine_id: Uuid, note: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairingRecord {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub tier: PairingTier,
    pub source: PairingSource,
}

impl PairingRecord {
    /// Classifies a raw row: a wine link wins over the inline copy.
    pub fn from_row(
        id: Uuid,
        menu_item_id: Uuid,
        tier: PairingTier,
        wine_id: Option<Uuid>,
        inline: InlinePairing,
    ) -> Self {
        let source = match wine_id {
            Some(wine_id) => PairingSource::Referenced {
                wine_id,
                note: Some(inline.note).filter(|n| !n.trim().is_empty()),
            },
            None => PairingSource::Inline(inline),
        };
        Self {
            id,
            menu_item_id,
            tier,
            source,
        }
    }
}

/// A pairing row to insert: inline display fields plus an optional wine link
#[derive(Debug, Clone, PartialEq)]
pub struct NewPairing {
    pub menu_item_id: Uuid,
    pub tier: PairingTier,
    pub pairing: InlinePairing,
    pub wine_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_wine_link_is_referenced() {
        let wine_id = Uuid::new_v4();
        let record = PairingRecord::from_row(
            Uuid::new_v4(),
            Uuid::new_v4(),
            PairingTier::Exclusive,
            Some(wine_id),
            InlinePairing {
                name: "stale copy".into(),
                note: "  ".into(),
                ..InlinePairing::default()
            },
        );
        assert_eq!(
            record.source,
            PairingSource::Referenced {
                wine_id,
                note: None
            }
        );
    }

    #[test]
    fn test_row_without_link_is_inline() {
        let inline = InlinePairing {
            name: "Barolo".into(),
            note: "Big".into(),
            ..InlinePairing::default()
        };
        let record = PairingRecord::from_row(
            Uuid::new_v4(),
            Uuid::new_v4(),
            PairingTier::MidRange,
            None,
            inline.clone(),
        );
        assert_eq!(record.source, PairingSource::Inline(inline));
    }

    #[test]
    fn test_tenant_never_serializes_access_code() {
        let tenant = Tenant {
            id: "palate".into(),
            name: "Palate".into(),
            access_code: "4821".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tenant).unwrap();
        assert!(json.get("access_code").is_none());
    }
}
