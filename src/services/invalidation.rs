use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};
use tracing::instrument;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
};

/// Logical cache tag a write invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTag {
    Menu,
    Tags,
}

impl CacheTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTag::Menu => "menu",
            CacheTag::Tags => "tags",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "menu" => Some(CacheTag::Menu),
            "tags" => Some(CacheTag::Tags),
            _ => None,
        }
    }
}

/// What became stale: a tag, narrowed to one tenant for menu data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
    pub tag: CacheTag,
    pub tenant_id: Option<String>,
}

impl CacheScope {
    pub fn menu(tenant_id: impl Into<String>) -> Self {
        Self {
            tag: CacheTag::Menu,
            tenant_id: Some(tenant_id.into()),
        }
    }

    pub fn tags() -> Self {
        Self {
            tag: CacheTag::Tags,
            tenant_id: None,
        }
    }

    /// The local cache entry this scope maps to
    pub fn cache_key(&self) -> AppResult<CacheKey> {
        match (self.tag, &self.tenant_id) {
            (CacheTag::Menu, Some(tenant_id)) => Ok(CacheKey::Menu(tenant_id.clone())),
            (CacheTag::Menu, None) => Err(AppError::InvalidInput(
                "Menu invalidation requires a tenant".to_string(),
            )),
            (CacheTag::Tags, _) => Ok(CacheKey::TagCatalog),
        }
    }
}

impl Display for CacheScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tenant_id {
            Some(tenant_id) => write!(f, "{}:{}", self.tag.as_str(), tenant_id),
            None => f.write_str(self.tag.as_str()),
        }
    }
}

/// Signal fired after a committed write so readers drop stale data
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InvalidationHook: Send + Sync {
    async fn invalidate(&self, scope: &CacheScope) -> AppResult<()>;

    /// Hook name for logging
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl InvalidationHook for Cache {
    async fn invalidate(&self, scope: &CacheScope) -> AppResult<()> {
        let key = scope.cache_key()?;
        Cache::invalidate(self, &key).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Used when no cache is configured
pub struct NoopHook;

#[async_trait::async_trait]
impl InvalidationHook for NoopHook {
    async fn invalidate(&self, _scope: &CacheScope) -> AppResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Notifies the dashboard's revalidation endpoint over HTTP
pub struct RevalidateWebhook {
    http_client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl RevalidateWebhook {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            url,
            secret,
        }
    }

    fn request(&self, scope: &CacheScope) -> reqwest::RequestBuilder {
        let mut query: Vec<(&str, &str)> = vec![("tag", scope.tag.as_str())];
        if let Some(tenant_id) = &scope.tenant_id {
            query.push(("tenant", tenant_id.as_str()));
        }
        if let Some(secret) = &self.secret {
            query.push(("secret", secret.as_str()));
        }
        self.http_client.get(&self.url).query(&query)
    }
}

#[async_trait::async_trait]
impl InvalidationHook for RevalidateWebhook {
    #[instrument(skip(self), fields(scope = %scope))]
    async fn invalidate(&self, scope: &CacheScope) -> AppResult<()> {
        let response = self.request(scope).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Revalidation webhook rejected request");
            return Err(AppError::ExternalApi(format!(
                "Revalidation returned status {}: {}",
                status, body
            )));
        }

        tracing::debug!("Revalidation webhook acknowledged");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Fans one signal out to several hooks.
///
/// Every hook runs even if an earlier one fails; the first error is returned.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn InvalidationHook>>,
}

impl HookChain {
    pub fn new(hooks: Vec<Arc<dyn InvalidationHook>>) -> Self {
        Self { hooks }
    }
}

#[async_trait::async_trait]
impl InvalidationHook for HookChain {
    async fn invalidate(&self, scope: &CacheScope) -> AppResult<()> {
        let mut first_error = None;
        for hook in &self.hooks {
            if let Err(e) = hook.invalidate(scope).await {
                tracing::warn!(hook = hook.name(), scope = %scope, error = %e, "Invalidation hook failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

/// Fires the hook after a committed write.
///
/// The write already succeeded, so a failing hook is logged rather than
/// reported; cached readers fall back to their TTL.
pub async fn notify(hook: &dyn InvalidationHook, scope: CacheScope) {
    match hook.invalidate(&scope).await {
        Ok(()) => tracing::debug!(scope = %scope, "Cache invalidated"),
        Err(e) => tracing::warn!(scope = %scope, error = %e, "Cache invalidation failed after write"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_cache_keys() {
        assert_eq!(
            CacheScope::menu("palate").cache_key().unwrap(),
            CacheKey::Menu("palate".into())
        );
        assert_eq!(CacheScope::tags().cache_key().unwrap(), CacheKey::TagCatalog);
        let orphan = CacheScope {
            tag: CacheTag::Menu,
            tenant_id: None,
        };
        assert!(orphan.cache_key().is_err());
    }

    #[test]
    fn test_webhook_request_carries_tag_tenant_and_secret() {
        let hook = RevalidateWebhook::new(
            "http://dashboard.local/api/revalidate".into(),
            Some("s3cret".into()),
        );
        let request = hook.request(&CacheScope::menu("palate")).build().unwrap();
        assert_eq!(
            request.url().query(),
            Some("tag=menu&tenant=palate&secret=s3cret")
        );
    }

    #[tokio::test]
    async fn test_chain_runs_every_hook_and_reports_first_error() {
        let mut failing = MockInvalidationHook::new();
        failing
            .expect_invalidate()
            .times(1)
            .returning(|_| Err(AppError::Storage("redis down".into())));
        failing.expect_name().return_const("failing");

        let mut healthy = MockInvalidationHook::new();
        healthy.expect_invalidate().times(1).returning(|_| Ok(()));
        healthy.expect_name().return_const("healthy");

        let chain = HookChain::new(vec![Arc::new(failing), Arc::new(healthy)]);
        let result = chain.invalidate(&CacheScope::menu("palate")).await;
        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn test_notify_swallows_hook_errors() {
        let mut failing = MockInvalidationHook::new();
        failing
            .expect_invalidate()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("503".into())));
        notify(&failing, CacheScope::tags()).await;
    }
}
