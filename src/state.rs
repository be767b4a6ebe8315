use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, InventoryStore, MemoryStore, MenuStore},
    services::{
        HookChain, InvalidationHook, InventoryService, MenuService, NoopHook, PairingService,
        PriceTiers, RevalidateWebhook,
    },
};

/// Tunables for building [`AppState`]
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub menu_cache_ttl: u64,
    pub tag_cache_ttl: u64,
    pub price_tiers: PriceTiers,
    pub revalidate_url: Option<String>,
    pub revalidate_secret: Option<String>,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            menu_cache_ttl: 300,
            tag_cache_ttl: 3600,
            price_tiers: PriceTiers::default(),
            revalidate_url: None,
            revalidate_secret: None,
        }
    }
}

impl From<&Config> for StateOptions {
    fn from(config: &Config) -> Self {
        Self {
            menu_cache_ttl: config.menu_cache_ttl_secs,
            tag_cache_ttl: config.tag_cache_ttl_secs,
            price_tiers: config.price_tiers(),
            revalidate_url: config.revalidate_url.clone(),
            revalidate_secret: config.revalidate_secret.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub menus: Arc<MenuService>,
    pub inventory: Arc<InventoryService>,
    pub pairings: Arc<PairingService>,
    /// Drops locally cached entries; used by inbound revalidation
    pub local_cache: Arc<dyn InvalidationHook>,
    pub revalidate_secret: Option<String>,
}

impl AppState {
    /// Wires services over the given stores.
    ///
    /// Writes invalidate the local cache and, when a revalidation URL is
    /// configured, notify it as well.
    pub fn new(
        menu_store: Arc<dyn MenuStore>,
        inventory_store: Arc<dyn InventoryStore>,
        cache: Option<Cache>,
        options: StateOptions,
    ) -> Self {
        let local_cache: Arc<dyn InvalidationHook> = match &cache {
            Some(cache) => Arc::new(cache.clone()),
            None => Arc::new(NoopHook),
        };

        let mut hooks = vec![local_cache.clone()];
        if let Some(url) = options.revalidate_url {
            let webhook = RevalidateWebhook::new(url, options.revalidate_secret.clone());
            hooks.push(Arc::new(webhook) as Arc<dyn InvalidationHook>);
        }
        let hooks: Arc<dyn InvalidationHook> = Arc::new(HookChain::new(hooks));

        let inventory = Arc::new(InventoryService::new(
            inventory_store,
            cache.clone(),
            options.tag_cache_ttl,
            hooks.clone(),
        ));
        let pairings = Arc::new(PairingService::new(
            inventory.clone(),
            options.price_tiers,
        ));
        let menus = Arc::new(MenuService::new(
            menu_store,
            cache,
            options.menu_cache_ttl,
            hooks,
        ));

        Self {
            menus,
            inventory,
            pairings,
            local_cache,
            revalidate_secret: options.revalidate_secret,
        }
    }

    /// State over a single in-memory store, without cache or webhook
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(store.clone(), store, None, StateOptions::default())
    }
}
