use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{InventoryStore, MenuStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        tag::sort_catalog, CategoryRecord, MenuItemRecord, NewCategory, NewMenuItem, NewPairing,
        NewTenant, PairingRecord, Tag, Tenant, Wine,
    },
};

/// Process-local store holding every collection behind one lock
///
/// Mirrors the relational schema closely enough for the services not to
/// notice: categories cascade to items and pairing rows, tag links are
/// replaced on every wine save, and pairing rows keep dangling wine ids.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tenants: HashMap<String, Tenant>,
    tags: HashMap<String, Tag>,
    wines: HashMap<Uuid, Wine>,
    categories: HashMap<Uuid, CategoryRecord>,
    menu_items: HashMap<Uuid, MenuItemRecord>,
    pairings: HashMap<Uuid, PairingRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InventoryStore for MemoryStore {
    async fn list_wines(&self, tenant_id: &str) -> AppResult<Vec<Wine>> {
        let inner = self.inner.read().await;
        let mut wines: Vec<Wine> = inner
            .wines
            .values()
            .filter(|w| w.tenant_id == tenant_id)
            .cloned()
            .collect();
        wines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(wines)
    }

    async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        let inner = self.inner.read().await;
        let mut tags: Vec<Tag> = inner.tags.values().cloned().collect();
        sort_catalog(&mut tags);
        Ok(tags)
    }

    async fn save_wine(&self, mut wine: Wine) -> AppResult<Wine> {
        let mut inner = self.inner.write().await;
        let id = match wine.id {
            Some(id) => {
                let owned = inner
                    .wines
                    .get(&id)
                    .is_some_and(|existing| existing.tenant_id == wine.tenant_id);
                if !owned {
                    return Err(AppError::NotFound(format!("wine {}", id)));
                }
                id
            }
            None => {
                let id = Uuid::new_v4();
                wine.id = Some(id);
                id
            }
        };
        inner.wines.insert(id, wine.clone());
        Ok(wine)
    }

    async fn delete_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let owned = inner
            .wines
            .get(&wine_id)
            .is_some_and(|w| w.tenant_id == tenant_id);
        if owned {
            inner.wines.remove(&wine_id);
        }
        Ok(owned)
    }

    async fn create_tag(&self, tag: Tag) -> AppResult<Tag> {
        let mut inner = self.inner.write().await;
        if inner.tags.contains_key(&tag.id) {
            return Err(AppError::Conflict(format!("tag '{}' already exists", tag.id)));
        }
        inner.tags.insert(tag.id.clone(), tag.clone());
        Ok(tag)
    }

    async fn rename_tag(&self, tag_id: &str, name: &str) -> AppResult<Option<Tag>> {
        let mut inner = self.inner.write().await;
        Ok(inner.tags.get_mut(tag_id).map(|tag| {
            tag.name = name.to_string();
            tag.clone()
        }))
    }
}

#[async_trait::async_trait]
impl MenuStore for MemoryStore {
    async fn get_tenant(&self, tenant_id: &str) -> AppResult<Option<Tenant>> {
        Ok(self.inner.read().await.tenants.get(tenant_id).cloned())
    }

    async fn find_tenant_by_access_code(&self, access_code: &str) -> AppResult<Option<Tenant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tenants
            .values()
            .find(|t| t.access_code == access_code)
            .cloned())
    }

    async fn create_tenant(&self, tenant: NewTenant) -> AppResult<Tenant> {
        let mut inner = self.inner.write().await;
        if inner.tenants.contains_key(&tenant.id) {
            return Err(AppError::Conflict(format!("tenant '{}' already exists", tenant.id)));
        }
        if inner
            .tenants
            .values()
            .any(|t| t.access_code == tenant.access_code)
        {
            return Err(AppError::Conflict("access code already in use".to_string()));
        }
        let record = Tenant {
            id: tenant.id,
            name: tenant.name,
            access_code: tenant.access_code,
            created_at: Utc::now(),
        };
        inner.tenants.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn list_categories(&self, tenant_id: &str) -> AppResult<Vec<CategoryRecord>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<CategoryRecord> = inner
            .categories
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect();
        categories.sort_by_key(|c| c.sort_order);
        Ok(categories)
    }

    async fn list_menu_items(&self, category_id: Uuid) -> AppResult<Vec<MenuItemRecord>> {
        let inner = self.inner.read().await;
        let mut items: Vec<MenuItemRecord> = inner
            .menu_items
            .values()
            .filter(|i| i.category_id == category_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.sort_order);
        Ok(items)
    }

    async fn list_pairings(&self, menu_item_id: Uuid) -> AppResult<Vec<PairingRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .pairings
            .values()
            .filter(|p| p.menu_item_id == menu_item_id)
            .cloned()
            .collect())
    }

    async fn get_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<Option<Wine>> {
        let inner = self.inner.read().await;
        Ok(inner
            .wines
            .get(&wine_id)
            .filter(|w| w.tenant_id == tenant_id)
            .cloned())
    }

    async fn delete_categories(&self, tenant_id: &str) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let category_ids: Vec<Uuid> = inner
            .categories
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .map(|c| c.id)
            .collect();
        inner.categories.retain(|_, c| c.tenant_id != tenant_id);
        inner
            .menu_items
            .retain(|_, item| !category_ids.contains(&item.category_id));
        let MemoryInner {
            menu_items,
            pairings,
            ..
        } = &mut *inner;
        pairings.retain(|_, p| menu_items.contains_key(&p.menu_item_id));
        Ok(category_ids.len() as u64)
    }

    async fn insert_category(&self, category: NewCategory) -> AppResult<CategoryRecord> {
        let mut inner = self.inner.write().await;
        if !inner.tenants.contains_key(&category.tenant_id) {
            return Err(AppError::Storage(format!(
                "tenant '{}' does not exist",
                category.tenant_id
            )));
        }
        if inner
            .categories
            .values()
            .any(|c| c.tenant_id == category.tenant_id && c.sort_order == category.sort_order)
        {
            return Err(AppError::Storage(format!(
                "duplicate category sort_order {}",
                category.sort_order
            )));
        }
        let record = CategoryRecord {
            id: Uuid::new_v4(),
            tenant_id: category.tenant_id,
            name: category.name,
            sort_order: category.sort_order,
        };
        inner.categories.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_menu_item(&self, item: NewMenuItem) -> AppResult<MenuItemRecord> {
        let mut inner = self.inner.write().await;
        if !inner.categories.contains_key(&item.category_id) {
            return Err(AppError::Storage(format!(
                "category {} does not exist",
                item.category_id
            )));
        }
        if inner
            .menu_items
            .values()
            .any(|i| i.category_id == item.category_id && i.sort_order == item.sort_order)
        {
            return Err(AppError::Storage(format!(
                "duplicate menu item sort_order {}",
                item.sort_order
            )));
        }
        let record = MenuItemRecord {
            id: Uuid::new_v4(),
            category_id: item.category_id,
            dish: item.dish,
            price: item.price,
            tags: item.tags,
            sort_order: item.sort_order,
        };
        inner.menu_items.insert(record.id, record.clone());
        Ok(record)
    }

    async fn insert_pairings(&self, pairings: Vec<NewPairing>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        for pairing in &pairings {
            if !inner.menu_items.contains_key(&pairing.menu_item_id) {
                return Err(AppError::Storage(format!(
                    "menu item {} does not exist",
                    pairing.menu_item_id
                )));
            }
            if inner
                .pairings
                .values()
                .any(|p| p.menu_item_id == pairing.menu_item_id && p.tier == pairing.tier)
            {
                return Err(AppError::Storage(format!(
                    "duplicate {} pairing for menu item {}",
                    pairing.tier, pairing.menu_item_id
                )));
            }
        }
        for pairing in pairings {
            let record = PairingRecord::from_row(
                Uuid::new_v4(),
                pairing.menu_item_id,
                pairing.tier,
                pairing.wine_id,
                pairing.pairing,
            );
            inner.pairings.insert(record.id, record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InlinePairing, PairingSource, PairingTier, StockStatus, WineTag};

    fn wine(tenant: &str, name: &str) -> Wine {
        Wine {
            id: None,
            tenant_id: tenant.into(),
            name: name.into(),
            grape: String::new(),
            vintage: String::new(),
            price: 30.0,
            description: String::new(),
            stock_status: StockStatus::InStock,
            tags: vec![WineTag::new("spice", 4)],
        }
    }

    async fn store_with_tenant() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_tenant(NewTenant {
                id: "palate".into(),
                name: "Palate".into(),
                access_code: "1234".into(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_wines_listed_by_name_and_scoped_to_tenant() {
        let store = store_with_tenant().await;
        store.save_wine(wine("palate", "Zinfandel")).await.unwrap();
        store.save_wine(wine("palate", "Albariño")).await.unwrap();
        store.save_wine(wine("pastis", "Barolo")).await.unwrap();

        let names: Vec<String> = store
            .list_wines("palate")
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Albariño", "Zinfandel"]);
    }

    #[tokio::test]
    async fn test_save_wine_replaces_tags_and_rejects_foreign_tenant() {
        let store = store_with_tenant().await;
        let mut saved = store.save_wine(wine("palate", "Chablis")).await.unwrap();
        saved.tags = vec![WineTag::new("citrus", 7)];
        let updated = store.save_wine(saved.clone()).await.unwrap();
        assert_eq!(updated.tags, vec![WineTag::new("citrus", 7)]);

        let mut stolen = saved;
        stolen.tenant_id = "pastis".into();
        assert!(matches!(
            store.save_wine(stolen).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_categories_cascades() {
        let store = store_with_tenant().await;
        let category = store
            .insert_category(NewCategory {
                tenant_id: "palate".into(),
                name: "Mains".into(),
                sort_order: 0,
            })
            .await
            .unwrap();
        let item = store
            .insert_menu_item(NewMenuItem {
                category_id: category.id,
                dish: "Lamb".into(),
                price: "345".into(),
                tags: None,
                sort_order: 0,
            })
            .await
            .unwrap();
        store
            .insert_pairings(vec![NewPairing {
                menu_item_id: item.id,
                tier: PairingTier::ByGlass,
                pairing: InlinePairing::default(),
                wine_id: None,
            }])
            .await
            .unwrap();

        assert_eq!(store.delete_categories("palate").await.unwrap(), 1);
        assert!(store.list_menu_items(category.id).await.unwrap().is_empty());
        assert!(store.list_pairings(item.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pairing_rows_keep_dangling_wine_ids() {
        let store = store_with_tenant().await;
        let saved = store.save_wine(wine("palate", "Chablis")).await.unwrap();
        let wine_id = saved.id.unwrap();
        let category = store
            .insert_category(NewCategory {
                tenant_id: "palate".into(),
                name: "Fish".into(),
                sort_order: 0,
            })
            .await
            .unwrap();
        let item = store
            .insert_menu_item(NewMenuItem {
                category_id: category.id,
                dish: "Sole".into(),
                price: "300".into(),
                tags: None,
                sort_order: 0,
            })
            .await
            .unwrap();
        store
            .insert_pairings(vec![NewPairing {
                menu_item_id: item.id,
                tier: PairingTier::MidRange,
                pairing: InlinePairing::default(),
                wine_id: Some(wine_id),
            }])
            .await
            .unwrap();

        assert!(store.delete_wine("palate", wine_id).await.unwrap());
        let rows = store.list_pairings(item.id).await.unwrap();
        assert!(matches!(
            rows[0].source,
            PairingSource::Referenced { wine_id: id, .. } if id == wine_id
        ));
        assert_eq!(store.get_wine("palate", wine_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_access_codes_are_unique() {
        let store = store_with_tenant().await;
        let result = store
            .create_tenant(NewTenant {
                id: "pastis".into(),
                name: "Pastis".into(),
                access_code: "1234".into(),
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
