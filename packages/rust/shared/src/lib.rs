//! Shared types, error model, and configuration for the campus-services crates.
//!
//! This crate is the foundation depended on by all other campus crates.
//! It provides:
//! - [`CampusError`] — the unified error type
//! - Domain types ([`Dish`], [`DishQuery`], [`DishPage`], [`Facets`], [`Envelope`])
//! - Configuration ([`AppConfig`], config loading)
//! - HTTP client construction ([`http::build_client`])

pub mod config;
pub mod error;
pub mod http;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CatalogConfig, HttpConfig, LaundryConfig, SourceKind, config_dir,
    config_file_path, init_config, load_config, load_config_from, render_config,
    validate_config,
};
pub use error::{CampusError, Result};
pub use types::{
    API_SUCCESS_CODE, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, Dish, DishPage, DishQuery, Envelope,
    Facets, normalize_positive, split_canteens,
};
