mod json_source;
mod load;
mod memory_source;
mod models;
mod schema;
mod sqlite_source;
mod trait_def;

pub use json_source::JsonCatalogSource;
pub use load::{load_catalog, sanitize_tracks, LoadProblem};
pub use memory_source::InMemoryCatalogSource;
pub use models::*;
pub use schema::TRACK_FEATURES_VERSIONED_SCHEMAS;
pub use sqlite_source::SqliteCatalogSource;
pub use trait_def::CatalogSource;
