use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    cached,
    db::{Cache, CacheKey, InventoryStore},
    error::{AppError, AppResult},
    models::{sort_catalog, Tag, Wine, WineTag},
};

use super::invalidation::{notify, CacheScope, InvalidationHook};

/// Wine inventory and tag catalog management
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    cache: Option<Cache>,
    tag_ttl: u64,
    hooks: Arc<dyn InvalidationHook>,
}

impl InventoryService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cache: Option<Cache>,
        tag_ttl: u64,
        hooks: Arc<dyn InvalidationHook>,
    ) -> Self {
        Self {
            store,
            cache,
            tag_ttl,
            hooks,
        }
    }

    pub async fn list_wines(&self, tenant_id: &str) -> AppResult<Vec<Wine>> {
        self.store.list_wines(tenant_id).await
    }

    /// The tag catalog, served from cache when one is configured
    pub async fn list_tags(&self) -> AppResult<Vec<Tag>> {
        match &self.cache {
            Some(cache) => self.cached_tags(cache).await,
            None => self.store.list_tags().await,
        }
    }

    async fn cached_tags(&self, cache: &Cache) -> AppResult<Vec<Tag>> {
        cached!(cache, CacheKey::TagCatalog, self.tag_ttl, async move {
            let mut tags = self.store.list_tags().await?;
            sort_catalog(&mut tags);
            Ok::<_, AppError>(tags)
        })
    }

    /// Validates and stores a wine for the tenant.
    ///
    /// The tenant in the path always wins over whatever the body carried.
    #[instrument(skip(self, wine), fields(wine_name = %wine.name))]
    pub async fn save_wine(&self, tenant_id: &str, mut wine: Wine) -> AppResult<Wine> {
        wine.tenant_id = tenant_id.to_string();
        wine.name = wine.name.trim().to_string();

        wine.validate()?;

        wine.tags = wine
            .tags
            .into_iter()
            .map(|link| WineTag {
                weight: Some(link.weight()),
                tag_id: link.tag_id,
            })
            .collect();

        let saved = self.store.save_wine(wine).await?;
        tracing::info!(tenant_id = %tenant_id, wine_id = ?saved.id, tag_count = saved.tags.len(), "Wine saved");

        // Referenced pairing slots render wine fields, so the menu is stale too
        notify(self.hooks.as_ref(), CacheScope::menu(tenant_id)).await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete_wine(&self, tenant_id: &str, wine_id: Uuid) -> AppResult<()> {
        if !self.store.delete_wine(tenant_id, wine_id).await? {
            return Err(AppError::NotFound(format!("Wine {} not found", wine_id)));
        }

        tracing::info!(tenant_id = %tenant_id, wine_id = %wine_id, "Wine deleted");
        notify(self.hooks.as_ref(), CacheScope::menu(tenant_id)).await;
        Ok(())
    }

    pub async fn create_tag(&self, tag: Tag) -> AppResult<Tag> {
        let tag = Tag::new(tag.id.trim(), tag.name.trim(), tag.category.trim());
        if tag.id.is_empty() || tag.name.is_empty() {
            return Err(AppError::InvalidInput(
                "Tag id and name are required".to_string(),
            ));
        }

        let created = self.store.create_tag(tag).await?;
        tracing::info!(tag_id = %created.id, "Tag created");
        notify(self.hooks.as_ref(), CacheScope::tags()).await;
        Ok(created)
    }

    pub async fn rename_tag(&self, tag_id: &str, name: &str) -> AppResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Tag name is required".to_string()));
        }

        let renamed = self
            .store
            .rename_tag(tag_id, name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", tag_id)))?;

        tracing::info!(tag_id = %tag_id, name = %name, "Tag renamed");
        notify(self.hooks.as_ref(), CacheScope::tags()).await;
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockInventoryStore;
    use crate::models::StockStatus;
    use crate::services::invalidation::{CacheTag, MockInvalidationHook};
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    fn wine(name: &str) -> Wine {
        Wine {
            id: None,
            tenant_id: "someone-else".into(),
            name: name.into(),
            grape: "Riesling".into(),
            vintage: "2021".into(),
            price: 19.0,
            description: String::new(),
            stock_status: StockStatus::InStock,
            tags: vec![WineTag {
                tag_id: "citrus".into(),
                weight: None,
            }],
        }
    }

    fn quiet_hooks() -> Arc<dyn InvalidationHook> {
        let mut hooks = MockInvalidationHook::new();
        hooks.expect_invalidate().returning(|_| Ok(()));
        Arc::new(hooks)
    }

    #[tokio::test]
    async fn test_save_wine_scopes_tenant_and_fills_weights() {
        let mut store = MockInventoryStore::new();
        store
            .expect_save_wine()
            .withf(|w| w.tenant_id == "palate" && w.tags[0].weight == Some(5) && w.name == "Kabinett")
            .times(1)
            .returning(|mut w| {
                w.id = Some(Uuid::new_v4());
                Ok(w)
            });

        let mut hooks = MockInvalidationHook::new();
        hooks
            .expect_invalidate()
            .withf(|scope| scope.tag == CacheTag::Menu && scope.tenant_id.as_deref() == Some("palate"))
            .times(1)
            .returning(|_| Ok(()));

        let service = InventoryService::new(Arc::new(store), None, 60, Arc::new(hooks));
        let saved = assert_ok!(service.save_wine("palate", wine("  Kabinett ")).await);
        assert!(saved.id.is_some());
    }

    #[tokio::test]
    async fn test_invalid_wine_never_reaches_store() {
        let mut store = MockInventoryStore::new();
        store.expect_save_wine().never();

        let service = InventoryService::new(Arc::new(store), None, 60, quiet_hooks());
        let mut bad = wine("");
        bad.price = -1.0;
        let err = assert_err!(service.save_wine("palate", bad).await);
        match err {
            AppError::Validation(issues) => assert_eq!(issues.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_missing_wine_is_not_found() {
        let id = Uuid::new_v4();
        let mut store = MockInventoryStore::new();
        store
            .expect_delete_wine()
            .with(eq("palate"), eq(id))
            .times(1)
            .returning(|_, _| Ok(false));

        let mut hooks = MockInvalidationHook::new();
        hooks.expect_invalidate().never();

        let service = InventoryService::new(Arc::new(store), None, 60, Arc::new(hooks));
        let err = assert_err!(service.delete_wine("palate", id).await);
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_tag_invalidates_catalog() {
        let mut store = MockInventoryStore::new();
        store
            .expect_rename_tag()
            .with(eq("citrus"), eq("Bright Citrus"))
            .returning(|id, name| Ok(Some(Tag::new(id, name, "flavor"))));

        let mut hooks = MockInvalidationHook::new();
        hooks
            .expect_invalidate()
            .withf(|scope| *scope == CacheScope::tags())
            .times(1)
            .returning(|_| Ok(()));

        let service = InventoryService::new(Arc::new(store), None, 60, Arc::new(hooks));
        let tag = assert_ok!(service.rename_tag("citrus", " Bright Citrus ").await);
        assert_eq!(tag.name, "Bright Citrus");
    }

    #[tokio::test]
    async fn test_blank_tag_rejected() {
        let service = InventoryService::new(
            Arc::new(MockInventoryStore::new()),
            None,
            60,
            quiet_hooks(),
        );
        assert_err!(service.create_tag(Tag::new(" ", "Smoke", "flavor")).await);
        assert_err!(service.rename_tag("smoke", "  ").await);
    }
}
