//! Read-only catalog of tiered backup archives.
//!
//! Each tier directory (`daily`, `weekly`, `monthly`, `yearly`) under the
//! backups root holds zip archives carrying a `manifest.json` entry. A catalog
//! request reads every manifest of one tier concurrently and returns the
//! records newest first.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use config::AppConfig;
pub use error::CatalogError;
