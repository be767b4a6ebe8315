//! Tag-overlap wine pairing
//!
//! Wines are scored against a dish's flavor tags, then partitioned into the
//! three price tiers. Nothing is retained between calls.

use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{PairingTier, RestaurantMenu, ScoredWine, Tag, Wine, WinePairing},
};

use super::inventory::InventoryService;

/// Score given to out-of-stock wines so they never survive filtering
const OUT_OF_STOCK_SCORE: i64 = -1;

/// Price breakpoints separating the three tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTiers {
    /// Prices strictly below this go by the glass
    pub glass_below: f64,
    /// Prices at or above this are exclusive
    pub exclusive_from: f64,
}

impl Default for PriceTiers {
    fn default() -> Self {
        Self {
            glass_below: 25.0,
            exclusive_from: 65.0,
        }
    }
}

impl PriceTiers {
    pub fn tier_for(&self, price: f64) -> PairingTier {
        if price < self.glass_below {
            PairingTier::ByGlass
        } else if price < self.exclusive_from {
            PairingTier::MidRange
        } else {
            PairingTier::Exclusive
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.glass_below.is_finite() || !self.exclusive_from.is_finite() {
            return Err("price tier breakpoints must be finite".to_string());
        }
        if self.glass_below > self.exclusive_from {
            return Err(format!(
                "glass breakpoint {} is above exclusive breakpoint {}",
                self.glass_below, self.exclusive_from
            ));
        }
        Ok(())
    }
}

/// Scores every wine against the dish tags.
///
/// Out-of-stock wines are skipped before any tag is looked at. Each shared
/// tag adds its weight and contributes its catalog name as a match reason;
/// tags missing from the catalog still score but give no reason. The result
/// keeps only positive scores, highest first, ties in input order.
pub fn score_wines(dish_tags: &[String], wines: &[Wine], catalog: &[Tag]) -> Vec<ScoredWine> {
    if dish_tags.is_empty() {
        return Vec::new();
    }

    let names: HashMap<&str, &str> = catalog
        .iter()
        .map(|tag| (tag.id.as_str(), tag.name.as_str()))
        .collect();

    let mut scored: Vec<ScoredWine> = wines
        .iter()
        .map(|wine| score_one(dish_tags, wine, &names))
        .filter(|scored| scored.score > 0)
        .collect();

    // sort_by is stable
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

fn score_one(dish_tags: &[String], wine: &Wine, names: &HashMap<&str, &str>) -> ScoredWine {
    if !wine.is_in_stock() {
        return ScoredWine {
            wine: wine.clone(),
            score: OUT_OF_STOCK_SCORE,
            match_reasons: Vec::new(),
        };
    }

    let mut score = 0i64;
    let mut match_reasons = Vec::new();
    for link in &wine.tags {
        if !dish_tags.iter().any(|t| t == &link.tag_id) {
            continue;
        }
        score += i64::from(link.weight());
        if let Some(name) = names.get(link.tag_id.as_str()) {
            match_reasons.push(name.to_string());
        }
    }

    ScoredWine {
        wine: wine.clone(),
        score,
        match_reasons,
    }
}

/// Scored wines partitioned by price tier, each bucket highest score first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Buckets {
    pub by_glass: Vec<ScoredWine>,
    pub mid_range: Vec<ScoredWine>,
    pub exclusive: Vec<ScoredWine>,
}

impl Buckets {
    pub fn get(&self, tier: PairingTier) -> &[ScoredWine] {
        match tier {
            PairingTier::ByGlass => &self.by_glass,
            PairingTier::MidRange => &self.mid_range,
            PairingTier::Exclusive => &self.exclusive,
        }
    }

    fn get_mut(&mut self, tier: PairingTier) -> &mut Vec<ScoredWine> {
        match tier {
            PairingTier::ByGlass => &mut self.by_glass,
            PairingTier::MidRange => &mut self.mid_range,
            PairingTier::Exclusive => &mut self.exclusive,
        }
    }

    pub fn len(&self) -> usize {
        self.by_glass.len() + self.mid_range.len() + self.exclusive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps only the best wine of each tier
    pub fn into_top(self) -> TopPairings {
        TopPairings {
            by_glass: self.by_glass.into_iter().next(),
            mid_range: self.mid_range.into_iter().next(),
            exclusive: self.exclusive.into_iter().next(),
        }
    }
}

/// Partitions scored wines by price. Every wine lands in exactly one bucket.
pub fn bucket_wines(scored: Vec<ScoredWine>, tiers: &PriceTiers) -> Buckets {
    let mut buckets = Buckets::default();
    for wine in scored {
        buckets.get_mut(tiers.tier_for(wine.wine.price)).push(wine);
    }
    for tier in PairingTier::ALL {
        buckets
            .get_mut(tier)
            .sort_by(|a, b| b.score.cmp(&a.score));
    }
    buckets
}

/// Best wine per tier, `null` on the wire when a tier has no candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPairings {
    pub by_glass: Option<ScoredWine>,
    pub mid_range: Option<ScoredWine>,
    pub exclusive: Option<ScoredWine>,
}

impl TopPairings {
    pub fn get(&self, tier: PairingTier) -> Option<&ScoredWine> {
        match tier {
            PairingTier::ByGlass => self.by_glass.as_ref(),
            PairingTier::MidRange => self.mid_range.as_ref(),
            PairingTier::Exclusive => self.exclusive.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        PairingTier::ALL.iter().all(|tier| self.get(*tier).is_none())
    }
}

/// Outcome of pairing a whole menu
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPairSummary {
    /// Dishes that received at least one new pairing
    pub paired: usize,
    /// Dishes without tags
    pub skipped: usize,
    /// Dishes with tags but no matching wine
    pub unmatched: usize,
}

pub struct PairingService {
    inventory: Arc<InventoryService>,
    tiers: PriceTiers,
}

impl PairingService {
    pub fn new(inventory: Arc<InventoryService>, tiers: PriceTiers) -> Self {
        Self { inventory, tiers }
    }

    pub fn tiers(&self) -> &PriceTiers {
        &self.tiers
    }

    async fn fetch_candidates(&self, tenant_id: &str) -> AppResult<(Vec<Wine>, Vec<Tag>)> {
        tokio::try_join!(
            self.inventory.list_wines(tenant_id),
            self.inventory.list_tags()
        )
    }

    /// Top wine per tier for one dish
    #[instrument(skip(self), fields(tag_count = dish_tags.len()))]
    pub async fn top_pairings_for_dish(
        &self,
        tenant_id: &str,
        dish_tags: &[String],
    ) -> AppResult<TopPairings> {
        if dish_tags.is_empty() {
            return Err(AppError::NoDishTags);
        }

        let (wines, catalog) = self.fetch_candidates(tenant_id).await?;
        let scored = score_wines(dish_tags, &wines, &catalog);

        tracing::info!(
            tenant_id = %tenant_id,
            wine_count = wines.len(),
            matched = scored.len(),
            "Pairings generated"
        );

        Ok(bucket_wines(scored, &self.tiers).into_top())
    }

    /// Fills every tagged dish's tiers with its best matches.
    ///
    /// Inventory is fetched once for the whole menu. Tiers without a
    /// candidate keep their current slot.
    #[instrument(skip(self, menu), fields(dish_count = menu.dish_count()))]
    pub async fn pair_menu(
        &self,
        tenant_id: &str,
        mut menu: RestaurantMenu,
    ) -> AppResult<(RestaurantMenu, AutoPairSummary)> {
        let (wines, catalog) = self.fetch_candidates(tenant_id).await?;
        let mut summary = AutoPairSummary::default();

        for item in menu.menu.iter_mut().flat_map(|c| c.items.iter_mut()) {
            if item.tag_ids().is_empty() {
                summary.skipped += 1;
                continue;
            }

            let top = bucket_wines(score_wines(item.tag_ids(), &wines, &catalog), &self.tiers)
                .into_top();
            if top.is_empty() {
                summary.unmatched += 1;
                continue;
            }

            for tier in PairingTier::ALL {
                if let Some(best) = top.get(tier) {
                    *item.pairings.get_mut(tier) = WinePairing::from_match(best);
                }
            }
            summary.paired += 1;
        }

        tracing::info!(
            tenant_id = %tenant_id,
            paired = summary.paired,
            skipped = summary.skipped,
            unmatched = summary.unmatched,
            "Menu auto-paired"
        );

        Ok((menu, summary))
    }
}
