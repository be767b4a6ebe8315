use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use super::records::InlinePairing;
use super::wine::{ScoredWine, Wine};

/// Placeholder name for a slot whose referenced wine no longer exists
pub const UNKNOWN_WINE_NAME: &str = "Unknown Wine";

/// The nested menu document exchanged with the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantMenu {
    pub restaurant_name: String,
    pub menu: Vec<MenuCategory>,
}

impl RestaurantMenu {
    pub fn dish_count(&self) -> usize {
        self.menu.iter().map(|c| c.items.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuCategory {
    pub category: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuItem {
    pub dish: String,
    pub price: ItemPrice,
    /// Flavor tag identifiers describing the dish
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub pairings: Pairings,
}

impl MenuItem {
    pub fn tag_ids(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// Dish price as entered: either a number or free text ("18", "market price").
///
/// Storage keeps the text form, so two prices are equal when their text
/// renderings are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemPrice {
    Number(f64),
    Text(String),
}

impl ItemPrice {
    pub fn as_text(&self) -> String {
        match self {
            ItemPrice::Number(n) => format_price(*n),
            ItemPrice::Text(s) => s.clone(),
        }
    }
}

impl PartialEq for ItemPrice {
    fn eq(&self, other: &Self) -> bool {
        self.as_text() == other.as_text()
    }
}

impl Display for ItemPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Renders a numeric price without a trailing ".0"
pub fn format_price(price: f64) -> String {
    format!("{}", price)
}

/// One of the three fixed recommendation tiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PairingTier {
    ByGlass,
    MidRange,
    Exclusive,
}

impl PairingTier {
    pub const ALL: [PairingTier; 3] = [
        PairingTier::ByGlass,
        PairingTier::MidRange,
        PairingTier::Exclusive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PairingTier::ByGlass => "byGlass",
            PairingTier::MidRange => "midRange",
            PairingTier::Exclusive => "exclusive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == s)
    }
}

impl Display for PairingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three pairing slots of a dish. Every tier is always present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Pairings {
    pub by_glass: WinePairing,
    pub mid_range: WinePairing,
    pub exclusive: WinePairing,
}

impl Pairings {
    pub fn get(&self, tier: PairingTier) -> &WinePairing {
        match tier {
            PairingTier::ByGlass => &self.by_glass,
            PairingTier::MidRange => &self.mid_range,
            PairingTier::Exclusive => &self.exclusive,
        }
    }

    pub fn get_mut(&mut self, tier: PairingTier) -> &mut WinePairing {
        match tier {
            PairingTier::ByGlass => &mut self.by_glass,
            PairingTier::MidRange => &mut self.mid_range,
            PairingTier::Exclusive => &mut self.exclusive,
        }
    }
}

/// A single pairing slot as the dashboard sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WinePairing {
    pub name: String,
    pub grape: String,
    pub vintage: String,
    pub price: String,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Link to an inventory wine, if the slot was chosen from inventory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wine_id: Option<Uuid>,
}

impl Default for WinePairing {
    /// The blank slot used for tiers that have no stored row
    fn default() -> Self {
        Self {
            name: String::new(),
            grape: String::new(),
            vintage: String::new(),
            price: String::new(),
            note: String::new(),
            description: None,
            keywords: Some(Vec::new()),
            wine_id: None,
        }
    }
}

impl WinePairing {
    /// Display fields sourced from a referenced inventory wine.
    ///
    /// Wines carry no note of their own, so without an override the note is blank.
    pub fn from_wine(wine: &Wine, note: Option<String>) -> Self {
        Self {
            name: wine.name.clone(),
            grape: wine.grape.clone(),
            vintage: wine.vintage.clone(),
            price: format_price(wine.price),
            note: note.unwrap_or_default(),
            description: Some(wine.description.clone()),
            keywords: None,
            wine_id: wine.id,
        }
    }

    /// Stand-in for a reference whose wine has been deleted
    pub fn unknown(wine_id: Uuid, note: Option<String>) -> Self {
        Self {
            name: UNKNOWN_WINE_NAME.to_string(),
            note: note.unwrap_or_default(),
            keywords: None,
            wine_id: Some(wine_id),
            ..Self::default()
        }
    }

    /// Slot filled from a pairing-engine match
    pub fn from_match(scored: &ScoredWine) -> Self {
        let note = format!("Matched on: {}", scored.match_reasons.join(", "));
        Self::from_wine(&scored.wine, Some(note))
    }

    pub fn into_inline(self) -> (InlinePairing, Option<Uuid>) {
        let inline = InlinePairing {
            name: self.name,
            grape: self.grape,
            vintage: self.vintage,
            price: self.price,
            note: self.note,
            description: self.description,
            keywords: self.keywords,
        };
        (inline, self.wine_id)
    }
}

impl From<InlinePairing> for WinePairing {
    fn from(inline: InlinePairing) -> Self {
        Self {
            name: inline.name,
            grape: inline.grape,
            vintage: inline.vintage,
            price: inline.price,
            note: inline.note,
            description: inline.description,
            keywords: inline.keywords,
            wine_id: None,
        }
    }
}
