//! Wine pairing and menu sync service for restaurant dashboards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, StateOptions};
