pub mod menu;
pub mod records;
pub mod tag;
pub mod validation;
pub mod wine;

pub use menu::{
    format_price, ItemPrice, MenuCategory, MenuItem, PairingTier, Pairings, RestaurantMenu,
    WinePairing, UNKNOWN_WINE_NAME,
};
pub use records::{
    CategoryRecord, InlinePairing, MenuItemRecord, NewCategory, NewMenuItem, NewPairing,
    NewTenant, PairingRecord, PairingSource, Tenant,
};
pub use tag::{sort_catalog, Tag};
pub use validation::{field_errors, parse_menu_document, FieldError};
pub use wine::{ScoredWine, StockStatus, Wine, WineTag, DEFAULT_TAG_WEIGHT};
