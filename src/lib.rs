//! Strain Explorer core
//!
//! Loads a small cannabis strain catalog from a spreadsheet-like CSV and
//! exposes the pieces an interactive dashboard needs:
//! - `catalog`: memoized loading and normalization of strain records
//! - `facets`: distinct value sets for the filter controls
//! - `filter`: predicate filtering, potency sort, effect frequency table
//! - `images`: best-effort online image resolution with memoization
//! - `session`: per-session favorites and notes
//! - `i18n`: static string table for user-visible messages
//!
//! The `api` feature adds the JSON request handlers (`api_server`) that an
//! external presentation layer drives.

pub mod catalog;
pub mod facets;
pub mod filter;
pub mod i18n;
pub mod images;
pub mod session;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogStore, DataUnavailable, StrainRecord};
pub use facets::Facets;
pub use filter::{apply, effect_frequency, EffectCount, SortBy, StrainFilters};
pub use images::{DuckDuckGoLookup, ImageLookup, ImageResolver};
pub use session::{SessionRegistry, SessionState};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
