//! Series catalog: latest known episode per quality tier for every series.

mod catalog;
mod sqlite;
mod types;

pub use catalog::{SeriesCatalog, SeriesUpdate};
pub use sqlite::SqliteSeriesStore;
pub use types::{QualitySlot, Series};

use crate::error::StoreError;

/// Trait for series storage backends.
pub trait SeriesStore: Send + Sync {
    /// Load every stored series.
    fn load_all(&self) -> Result<Vec<Series>, StoreError>;

    /// Get a series by name.
    fn get(&self, name: &str) -> Result<Option<Series>, StoreError>;

    /// Insert or replace a series.
    fn save(&self, series: &Series) -> Result<(), StoreError>;
}
