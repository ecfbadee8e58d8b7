//! Canteen dish catalog: loaders and the in-memory query engine.
//!
//! This crate provides:
//! - [`sources`] — the [`CatalogSource`] capability with API and CSV loaders
//! - [`query`] — `filter`, `paginate`, and `facets` over a dish list
//! - [`DishCatalog`] — load-once cache composing the two

pub mod catalog;
pub mod query;
pub mod sources;

pub use catalog::DishCatalog;
pub use query::{facets, filter, paginate};
pub use sources::{
    AnySource, ApiSource, CatalogSource, CsvLocation, CsvParsed, CsvSource, RowWarning,
    parse_dishes_csv,
};
