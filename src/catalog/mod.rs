//! The catalog surface: one typed method per logical mutation or query.

mod service;

pub use service::{CatalogError, CatalogService, CatalogStats};
