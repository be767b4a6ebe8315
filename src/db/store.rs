//! Storage adapter abstraction
//!
//! The pairing engine and the menu assembly logic never talk to a database
//! directly; they go through these traits. Postgres backs production and an
//! in-memory store backs local runs and tests.

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CategoryRecord, MenuItemRecord, NewCategory, NewMenuItem, NewPairing, NewTenant,
        PairingRecord, Tag, Tenant, Wine,
    },
};

/// Wine inventory and the global tag catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    /// All wines of a tenant, ordered by name, with their tag links attached
    async fn list_wines(&self, tenant_id: &str) -> AppResult<Vec<Wine>>;

    /// The tag catalog, ordered by category then name
    async fn list_tags(&self) -> AppResult<Vec<Tag>>;

    /// Inserts a wine without an id or updates the tenant's existing one.
    ///
    /// Tag links are replaced wholesale. Updating a wine that belongs to a
    /// different tenant is reported as not found.
    async fn save_wine(&self, wine: Wine) -> AppResult<Wine>;

    /// Returns false when the tenant owns no such wine
    async fn delete_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<bool>;

    async fn create_tag(&self, tag: Tag) -> AppResult<Tag>;

    async fn rename_tag(&self, tag_id: &str, name: &str) -> AppResult<Option<Tag>>;
}

/// Tenants and the normalized menu tree
///
/// Deleting categories must cascade to their menu items and pairing rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MenuStore: Send + Sync {
    async fn get_tenant(&self, tenant_id: &str) -> AppResult<Option<Tenant>>;

    async fn find_tenant_by_access_code(&self, access_code: &str) -> AppResult<Option<Tenant>>;

    /// Fails with `Conflict` when the id or access code is already taken
    async fn create_tenant(&self, tenant: NewTenant) -> AppResult<Tenant>;

    async fn list_categories(&self, tenant_id: &str) -> AppResult<Vec<CategoryRecord>>;

    async fn list_menu_items(&self, category_id: Uuid) -> AppResult<Vec<MenuItemRecord>>;

    async fn list_pairings(&self, menu_item_id: Uuid) -> AppResult<Vec<PairingRecord>>;

    async fn get_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<Option<Wine>>;

    /// Removes every category of the tenant, returning how many were deleted
    async fn delete_categories(&self, tenant_id: &str) -> AppResult<u64>;

    async fn insert_category(&self, category: NewCategory) -> AppResult<CategoryRecord>;

    async fn insert_menu_item(&self, item: NewMenuItem) -> AppResult<MenuItemRecord>;

    async fn insert_pairings(&self, pairings: Vec<NewPairing>) -> AppResult<()>;
}
