pub mod inventory;
pub mod invalidation;
pub mod menu_sync;
pub mod pairing;

pub use inventory::InventoryService;
pub use invalidation::{CacheScope, CacheTag, HookChain, InvalidationHook, NoopHook, RevalidateWebhook};
pub use menu_sync::{AccessGrant, MenuService, SaveReport, SaveStage};
pub use pairing::{AutoPairSummary, PairingService, PriceTiers, TopPairings};
