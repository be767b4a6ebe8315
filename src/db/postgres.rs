use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::store::{InventoryStore, MenuStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        CategoryRecord, InlinePairing, MenuItemRecord, NewCategory, NewMenuItem, NewPairing,
        NewTenant, PairingRecord, PairingTier, StockStatus, Tag, Tenant, Wine, WineTag,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const WINE_COLUMNS: &str =
    "id, tenant_id, name, grape, vintage, price, description, stock_status";

#[derive(Debug, FromRow)]
struct WineRow {
    id: Uuid,
    tenant_id: String,
    name: String,
    grape: String,
    vintage: String,
    price: f64,
    description: String,
    stock_status: String,
}

impl WineRow {
    fn into_wine(self, tags: Vec<WineTag>) -> AppResult<Wine> {
        let stock_status = self
            .stock_status
            .parse::<StockStatus>()
            .map_err(AppError::Internal)?;
        Ok(Wine {
            id: Some(self.id),
            tenant_id: self.tenant_id,
            name: self.name,
            grape: self.grape,
            vintage: self.vintage,
            price: self.price,
            description: self.description,
            stock_status,
            tags,
        })
    }
}

#[derive(Debug, FromRow)]
struct WineTagRow {
    wine_id: Uuid,
    tag_id: String,
    weight: i32,
}

impl From<WineTagRow> for WineTag {
    fn from(row: WineTagRow) -> Self {
        WineTag {
            tag_id: row.tag_id,
            weight: u32::try_from(row.weight).ok(),
        }
    }
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: String,
    name: String,
    category: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
            category: row.category,
        }
    }
}

#[derive(Debug, FromRow)]
struct TenantRow {
    id: String,
    name: String,
    access_code: String,
    created_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            access_code: row.access_code,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    tenant_id: String,
    name: String,
    sort_order: i32,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        CategoryRecord {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, FromRow)]
struct MenuItemRow {
    id: Uuid,
    category_id: Uuid,
    dish: String,
    price: String,
    tags: Option<Vec<String>>,
    sort_order: i32,
}

impl From<MenuItemRow> for MenuItemRecord {
    fn from(row: MenuItemRow) -> Self {
        MenuItemRecord {
            id: row.id,
            category_id: row.category_id,
            dish: row.dish,
            price: row.price,
            tags: row.tags,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, FromRow)]
struct PairingRow {
    id: Uuid,
    menu_item_id: Uuid,
    tier: String,
    wine_id: Option<Uuid>,
    name: String,
    grape: String,
    vintage: String,
    price: String,
    note: String,
    description: Option<String>,
    keywords: Option<Vec<String>>,
}

impl TryFrom<PairingRow> for PairingRecord {
    type Error = AppError;

    fn try_from(row: PairingRow) -> AppResult<Self> {
        let tier = PairingTier::parse(&row.tier)
            .ok_or_else(|| AppError::Internal(format!("unknown pairing tier '{}'", row.tier)))?;
        let inline = InlinePairing {
            name: row.name,
            grape: row.grape,
            vintage: row.vintage,
            price: row.price,
            note: row.note,
            description: row.description,
            keywords: row.keywords,
        };
        Ok(PairingRecord::from_row(
            row.id,
            row.menu_item_id,
            tier,
            row.wine_id,
            inline,
        ))
    }
}

/// Relational store backed by PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tags_for(&self, wine_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<WineTag>>> {
        let rows = sqlx::query_as::<_, WineTagRow>(
            "SELECT wine_id, tag_id, weight FROM wine_tags WHERE wine_id = ANY($1) ORDER BY tag_id",
        )
        .bind(wine_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_wine: HashMap<Uuid, Vec<WineTag>> = HashMap::new();
        for row in rows {
            by_wine.entry(row.wine_id).or_default().push(row.into());
        }
        Ok(by_wine)
    }
}

#[async_trait::async_trait]
impl InventoryStore for PgStore {
    async fn list_wines(&self, tenant_id: &str) -> AppResult<Vec<Wine>> {
        let rows = sqlx::query_as::<_, WineRow>(&format!(
            "SELECT {} FROM wines WHERE tenant_id = $1 ORDER BY name",
            WINE_COLUMNS
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let links = tags.remove(&row.id).unwrap_or_default();
                row.into_wine(links)
            })
            .collect()
    }

    async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, category FROM tags ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    async fn save_wine(&self, wine: Wine) -> AppResult<Wine> {
        let mut tx = self.pool.begin().await?;

        let row = match wine.id {
            None => {
                sqlx::query_as::<_, WineRow>(&format!(
                    "INSERT INTO wines ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {cols}",
                    cols = WINE_COLUMNS
                ))
                .bind(Uuid::new_v4())
                .bind(&wine.tenant_id)
                .bind(&wine.name)
                .bind(&wine.grape)
                .bind(&wine.vintage)
                .bind(wine.price)
                .bind(&wine.description)
                .bind(wine.stock_status.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
            Some(id) => sqlx::query_as::<_, WineRow>(&format!(
                "UPDATE wines SET name = $3, grape = $4, vintage = $5, price = $6, \
                 description = $7, stock_status = $8 \
                 WHERE id = $1 AND tenant_id = $2 RETURNING {}",
                WINE_COLUMNS
            ))
            .bind(id)
            .bind(&wine.tenant_id)
            .bind(&wine.name)
            .bind(&wine.grape)
            .bind(&wine.vintage)
            .bind(wine.price)
            .bind(&wine.description)
            .bind(wine.stock_status.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("wine {}", id)))?,
        };

        sqlx::query("DELETE FROM wine_tags WHERE wine_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        if !wine.tags.is_empty() {
            let tag_ids: Vec<String> = wine.tags.iter().map(|t| t.tag_id.clone()).collect();
            let weights: Vec<i32> = wine
                .tags
                .iter()
                .map(|t| i32::try_from(t.weight()).unwrap_or(i32::MAX))
                .collect();
            sqlx::query(
                "INSERT INTO wine_tags (wine_id, tag_id, weight) \
                 SELECT $1, t.tag_id, t.weight FROM UNNEST($2::text[], $3::int4[]) AS t(tag_id, weight)",
            )
            .bind(row.id)
            .bind(&tag_ids)
            .bind(&weights)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row.into_wine(wine.tags)
    }

    async fn delete_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM wines WHERE id = $1 AND tenant_id = $2")
            .bind(wine_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_tag(&self, tag: Tag) -> AppResult<Tag> {
        let row = sqlx::query_as::<_, TagRow>(
            "INSERT INTO tags (id, name, category) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING RETURNING id, name, category",
        )
        .bind(&tag.id)
        .bind(&tag.name)
        .bind(&tag.category)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tag::from)
            .ok_or_else(|| AppError::Conflict(format!("tag '{}' already exists", tag.id)))
    }

    async fn rename_tag(&self, tag_id: &str, name: &str) -> AppResult<Option<Tag>> {
        let row = sqlx::query_as::<_, TagRow>(
            "UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name, category",
        )
        .bind(tag_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tag::from))
    }
}

#[async_trait::async_trait]
impl MenuStore for PgStore {
    async fn get_tenant(&self, tenant_id: &str) -> AppResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, access_code, created_at FROM tenants WHERE id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tenant::from))
    }

    async fn find_tenant_by_access_code(&self, access_code: &str) -> AppResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, access_code, created_at FROM tenants WHERE access_code = $1",
        )
        .bind(access_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Tenant::from))
    }

    async fn create_tenant(&self, tenant: NewTenant) -> AppResult<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>(
            "INSERT INTO tenants (id, name, access_code) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING RETURNING id, name, access_code, created_at",
        )
        .bind(&tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.access_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tenant::from).ok_or_else(|| {
            AppError::Conflict(format!(
                "tenant '{}' or its access code already exists",
                tenant.id
            ))
        })
    }

    async fn list_categories(&self, tenant_id: &str) -> AppResult<Vec<CategoryRecord>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, tenant_id, name, sort_order FROM categories \
             WHERE tenant_id = $1 ORDER BY sort_order",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn list_menu_items(&self, category_id: Uuid) -> AppResult<Vec<MenuItemRecord>> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, category_id, dish, price, tags, sort_order FROM menu_items \
             WHERE category_id = $1 ORDER BY sort_order",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(MenuItemRecord::from).collect())
    }

    async fn list_pairings(&self, menu_item_id: Uuid) -> AppResult<Vec<PairingRecord>> {
        let rows = sqlx::query_as::<_, PairingRow>(
            "SELECT id, menu_item_id, tier, wine_id, name, grape, vintage, price, note, \
             description, keywords FROM wine_pairings WHERE menu_item_id = $1",
        )
        .bind(menu_item_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PairingRecord::try_from).collect()
    }

    async fn get_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<Option<Wine>> {
        let row = sqlx::query_as::<_, WineRow>(&format!(
            "SELECT {} FROM wines WHERE id = $1 AND tenant_id = $2",
            WINE_COLUMNS
        ))
        .bind(wine_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let links = self
                    .tags_for(&[row.id])
                    .await?
                    .remove(&row.id)
                    .unwrap_or_default();
                Ok(Some(row.into_wine(links)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_categories(&self, tenant_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE tenant_id = $1")
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_category(&self, category: NewCategory) -> AppResult<CategoryRecord> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, tenant_id, name, sort_order) VALUES ($1, $2, $3, $4) \
             RETURNING id, tenant_id, name, sort_order",
        )
        .bind(Uuid::new_v4())
        .bind(&category.tenant_id)
        .bind(&category.name)
        .bind(category.sort_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_menu_item(&self, item: NewMenuItem) -> AppResult<MenuItemRecord> {
        let row = sqlx::query_as::<_, MenuItemRow>(
            "INSERT INTO menu_items (id, category_id, dish, price, tags, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, category_id, dish, price, tags, sort_order",
        )
        .bind(Uuid::new_v4())
        .bind(item.category_id)
        .bind(&item.dish)
        .bind(&item.price)
        .bind(&item.tags)
        .bind(item.sort_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn insert_pairings(&self, pairings: Vec<NewPairing>) -> AppResult<()> {
        if pairings.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO wine_pairings \
             (id, menu_item_id, tier, wine_id, name, grape, vintage, price, note, description, keywords) ",
        );
        builder.push_values(pairings, |mut row, p| {
            row.push_bind(Uuid::new_v4())
                .push_bind(p.menu_item_id)
                .push_bind(p.tier.as_str())
                .push_bind(p.wine_id)
                .push_bind(p.pairing.name)
                .push_bind(p.pairing.grape)
                .push_bind(p.pairing.vintage)
                .push_bind(p.pairing.price)
                .push_bind(p.pairing.note)
                .push_bind(p.pairing.description)
                .push_bind(p.pairing.keywords);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}
