//! Menu assembly and sync
//!
//! Converts between the normalized rows (tenant, category, item, pairing
//! slot, referenced wine) and the nested document the dashboard edits.
//!
//! Saves are delete-then-reinsert and are not atomic: a failure after the
//! clear step leaves the tenant's menu partially written. The error names
//! the stage that failed, the menu cache is invalidated anyway, and
//! resubmitting the whole document is always safe.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, fmt::Display, sync::Arc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    cached,
    db::{Cache, CacheKey, MenuStore},
    error::{AppError, AppResult},
    models::{
        parse_menu_document, CategoryRecord, ItemPrice, MenuCategory, MenuItem, MenuItemRecord,
        NewCategory, NewMenuItem, NewPairing, NewTenant, PairingSource, PairingTier, Pairings,
        RestaurantMenu, Tenant, Wine, WinePairing,
    },
};

use super::{
    invalidation::{notify, CacheScope, InvalidationHook},
    pairing::{AutoPairSummary, PairingService},
};

/// Write step of a menu save, reported when that step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStage {
    Delete,
    CategoryInsert,
    ItemInsert,
    PairingInsert,
}

impl Display for SaveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SaveStage::Delete => "delete",
            SaveStage::CategoryInsert => "category insert",
            SaveStage::ItemInsert => "item insert",
            SaveStage::PairingInsert => "pairing insert",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a single save. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveState {
    Validating,
    Clearing,
    InsertingCategories,
    InsertingItems,
    InsertingPairings,
    Done,
    Failed(SaveStage, String),
}

impl SaveState {
    /// The write step this state performs, if any
    fn stage(&self) -> Option<SaveStage> {
        match self {
            SaveState::Clearing => Some(SaveStage::Delete),
            SaveState::InsertingCategories => Some(SaveStage::CategoryInsert),
            SaveState::InsertingItems => Some(SaveStage::ItemInsert),
            SaveState::InsertingPairings => Some(SaveStage::PairingInsert),
            _ => None,
        }
    }
}

/// Tracks and logs the state of one save
struct SaveProgress<'a> {
    tenant_id: &'a str,
    state: SaveState,
}

impl<'a> SaveProgress<'a> {
    fn new(tenant_id: &'a str) -> Self {
        Self {
            tenant_id,
            state: SaveState::Validating,
        }
    }

    fn enter(&mut self, next: SaveState) {
        if self.state != next {
            tracing::debug!(tenant_id = %self.tenant_id, from = ?self.state, to = ?next, "Menu save transition");
            self.state = next;
        }
    }

    /// Moves to `Failed` and wraps the storage error with the current stage
    fn fail(&mut self, cause: AppError) -> AppError {
        let stage = self.state.stage().unwrap_or(SaveStage::Delete);
        let message = cause.to_string();
        tracing::error!(tenant_id = %self.tenant_id, stage = %stage, error = %message, "Menu save failed");
        self.state = SaveState::Failed(stage, message.clone());
        AppError::SaveFailed { stage, message }
    }

    /// True once a save has failed after the clear step committed
    fn cleared_then_failed(&self) -> bool {
        matches!(&self.state, SaveState::Failed(stage, _) if *stage != SaveStage::Delete)
    }
}

/// Counts of what a successful save wrote
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub categories_cleared: u64,
    pub categories: usize,
    pub items: usize,
    pub pairings: usize,
    pub saved_at: DateTime<Utc>,
}

/// Tenant session opened with an access code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub tenant_id: String,
    pub restaurant_name: String,
    pub data: RestaurantMenu,
}

pub struct MenuService {
    store: Arc<dyn MenuStore>,
    cache: Option<Cache>,
    menu_ttl: u64,
    hooks: Arc<dyn InvalidationHook>,
}

impl MenuService {
    pub fn new(
        store: Arc<dyn MenuStore>,
        cache: Option<Cache>,
        menu_ttl: u64,
        hooks: Arc<dyn InvalidationHook>,
    ) -> Self {
        Self {
            store,
            cache,
            menu_ttl,
            hooks,
        }
    }

    async fn require_tenant(&self, tenant_id: &str) -> AppResult<Tenant> {
        self.store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))
    }

    pub async fn create_tenant(&self, tenant: NewTenant) -> AppResult<Tenant> {
        let tenant = NewTenant {
            id: tenant.id.trim().to_string(),
            name: tenant.name.trim().to_string(),
            access_code: tenant.access_code.trim().to_string(),
        };
        if tenant.id.is_empty() || tenant.name.is_empty() || tenant.access_code.is_empty() {
            return Err(AppError::InvalidInput(
                "Tenant id, name and access code are required".to_string(),
            ));
        }

        let created = self.store.create_tenant(tenant).await?;
        tracing::info!(tenant_id = %created.id, "Tenant created");
        Ok(created)
    }

    /// Resolves an access code to its tenant and current menu
    #[instrument(skip_all)]
    pub async fn open_by_access_code(&self, code: &str) -> AppResult<AccessGrant> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::InvalidInput(
                "Please enter an access code.".to_string(),
            ));
        }

        let tenant = self
            .store
            .find_tenant_by_access_code(code)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid access code.".to_string()))?;

        tracing::info!(tenant_id = %tenant.id, "Access code accepted");
        let data = self.load_menu(&tenant.id).await?;
        Ok(AccessGrant {
            tenant_id: tenant.id,
            restaurant_name: tenant.name,
            data,
        })
    }

    /// Loads the tenant's menu, through the cache when one is configured
    pub async fn load_menu(&self, tenant_id: &str) -> AppResult<RestaurantMenu> {
        match &self.cache {
            Some(cache) => self.cached_menu(cache, tenant_id).await,
            None => self.assemble_menu(tenant_id).await,
        }
    }

    async fn cached_menu(&self, cache: &Cache, tenant_id: &str) -> AppResult<RestaurantMenu> {
        cached!(
            cache,
            CacheKey::Menu(tenant_id.to_string()),
            self.menu_ttl,
            self.assemble_menu(tenant_id)
        )
    }

    #[instrument(skip(self))]
    async fn assemble_menu(&self, tenant_id: &str) -> AppResult<RestaurantMenu> {
        let tenant = self.require_tenant(tenant_id).await?;

        let mut categories = self.store.list_categories(tenant_id).await?;
        categories.sort_by_key(|c| c.sort_order);

        let mut wines: HashMap<Uuid, Option<Wine>> = HashMap::new();
        let mut menu = Vec::with_capacity(categories.len());
        for category in categories {
            menu.push(self.assemble_category(tenant_id, category, &mut wines).await?);
        }

        let assembled = RestaurantMenu {
            restaurant_name: tenant.name,
            menu,
        };
        tracing::debug!(
            tenant_id = %tenant_id,
            categories = assembled.menu.len(),
            dishes = assembled.dish_count(),
            wines_resolved = wines.len(),
            "Menu assembled"
        );
        Ok(assembled)
    }

    async fn assemble_category(
        &self,
        tenant_id: &str,
        category: CategoryRecord,
        wines: &mut HashMap<Uuid, Option<Wine>>,
    ) -> AppResult<MenuCategory> {
        let mut records = self.store.list_menu_items(category.id).await?;
        records.sort_by_key(|item| item.sort_order);

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let pairings = self.assemble_pairings(tenant_id, record.id, wines).await?;
            items.push(menu_item(record, pairings));
        }

        Ok(MenuCategory {
            category: category.name,
            items,
        })
    }

    /// Overlays stored slots onto three blank tiers
    async fn assemble_pairings(
        &self,
        tenant_id: &str,
        menu_item_id: Uuid,
        wines: &mut HashMap<Uuid, Option<Wine>>,
    ) -> AppResult<Pairings> {
        let mut pairings = Pairings::default();

        for record in self.store.list_pairings(menu_item_id).await? {
            let slot = match record.source {
                PairingSource::Inline(inline) => WinePairing::from(inline),
                PairingSource::Referenced { wine_id, note } => {
                    let wine = match wines.get(&wine_id) {
                        Some(known) => known.clone(),
                        None => {
                            let fetched = self.store.get_wine(tenant_id, wine_id).await?;
                            wines.insert(wine_id, fetched.clone());
                            fetched
                        }
                    };
                    match wine {
                        Some(wine) => WinePairing::from_wine(&wine, note),
                        None => {
                            tracing::warn!(
                                tenant_id = %tenant_id,
                                wine_id = %wine_id,
                                tier = %record.tier,
                                "Pairing references a missing wine"
                            );
                            WinePairing::unknown(wine_id, note)
                        }
                    }
                }
            };
            *pairings.get_mut(record.tier) = slot;
        }

        Ok(pairings)
    }

    /// Validates the document and replaces the tenant's stored menu with it.
    ///
    /// Nothing is written when validation fails. The tenant's name is not
    /// changed by a save.
    #[instrument(skip(self, document))]
    pub async fn save_menu(&self, tenant_id: &str, document: &Value) -> AppResult<SaveReport> {
        let mut progress = SaveProgress::new(tenant_id);

        let menu = parse_menu_document(document).map_err(|issues| {
            tracing::info!(tenant_id = %tenant_id, issue_count = issues.len(), "Menu document rejected");
            AppError::Validation(issues)
        })?;
        self.require_tenant(tenant_id).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            categories = menu.menu.len(),
            dishes = menu.dish_count(),
            "Saving menu"
        );

        let report = match self.write_menu(tenant_id, &menu, &mut progress).await {
            Ok(report) => report,
            Err(e) => {
                // Stored rows no longer match any cached copy of the menu
                if progress.cleared_then_failed() {
                    notify(self.hooks.as_ref(), CacheScope::menu(tenant_id)).await;
                }
                return Err(e);
            }
        };
        progress.enter(SaveState::Done);

        tracing::info!(
            tenant_id = %tenant_id,
            categories = report.categories,
            items = report.items,
            pairings = report.pairings,
            "Menu saved"
        );

        notify(self.hooks.as_ref(), CacheScope::menu(tenant_id)).await;
        Ok(report)
    }

    /// Clears the tenant's categories and reinserts the document in order.
    ///
    /// Strictly sequential: each pairing insert needs the id of the item
    /// inserted just before it, and positions come from iteration order.
    async fn write_menu(
        &self,
        tenant_id: &str,
        menu: &RestaurantMenu,
        progress: &mut SaveProgress<'_>,
    ) -> AppResult<SaveReport> {
        progress.enter(SaveState::Clearing);
        let categories_cleared = match self.store.delete_categories(tenant_id).await {
            Ok(count) => count,
            Err(e) => return Err(progress.fail(e)),
        };

        let mut items = 0;
        let mut pairings = 0;
        for (category_index, category) in menu.menu.iter().enumerate() {
            progress.enter(SaveState::InsertingCategories);
            let stored_category = self
                .store
                .insert_category(NewCategory {
                    tenant_id: tenant_id.to_string(),
                    name: category.category.clone(),
                    sort_order: position(category_index),
                })
                .await;
            let stored_category = match stored_category {
                Ok(record) => record,
                Err(e) => return Err(progress.fail(e)),
            };

            for (item_index, item) in category.items.iter().enumerate() {
                progress.enter(SaveState::InsertingItems);
                let stored_item = self
                    .store
                    .insert_menu_item(NewMenuItem {
                        category_id: stored_category.id,
                        dish: item.dish.clone(),
                        price: item.price.as_text(),
                        tags: item.tags.clone(),
                        sort_order: position(item_index),
                    })
                    .await;
                let stored_item = match stored_item {
                    Ok(record) => record,
                    Err(e) => return Err(progress.fail(e)),
                };
                items += 1;

                progress.enter(SaveState::InsertingPairings);
                let rows = pairing_rows(stored_item.id, &item.pairings);
                let row_count = rows.len();
                if let Err(e) = self.store.insert_pairings(rows).await {
                    return Err(progress.fail(e));
                }
                pairings += row_count;
            }
        }

        Ok(SaveReport {
            categories_cleared,
            categories: menu.menu.len(),
            items,
            pairings,
            saved_at: Utc::now(),
        })
    }

    /// Pairs every tagged dish against the inventory and saves the result
    pub async fn auto_pair(
        &self,
        tenant_id: &str,
        pairing: &PairingService,
    ) -> AppResult<(RestaurantMenu, AutoPairSummary)> {
        let menu = self.assemble_menu(tenant_id).await?;
        let (paired, summary) = pairing.pair_menu(tenant_id, menu).await?;

        let document = serde_json::to_value(&paired)
            .map_err(|e| AppError::Internal(format!("Menu serialization error: {}", e)))?;
        self.save_menu(tenant_id, &document).await?;

        let saved = self.assemble_menu(tenant_id).await?;
        Ok((saved, summary))
    }
}

fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

fn menu_item(record: MenuItemRecord, pairings: Pairings) -> MenuItem {
    MenuItem {
        dish: record.dish,
        price: ItemPrice::Text(record.price),
        tags: record.tags,
        pairings,
    }
}

fn pairing_rows(menu_item_id: Uuid, pairings: &Pairings) -> Vec<NewPairing> {
    PairingTier::ALL
        .into_iter()
        .map(|tier| {
            let (pairing, wine_id) = pairings.get(tier).clone().into_inline();
            NewPairing {
                menu_item_id,
                tier,
                pairing,
                wine_id,
            }
        })
        .collect()
}
