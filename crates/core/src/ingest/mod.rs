pub mod derive;
pub mod macro_quad;
pub mod provider;
pub mod types;

use crate::domain::snapshot::MacroSnapshot;
use crate::error::Result;

/// Anything that can assemble a fresh [`MacroSnapshot`]; the scheduler's
/// triggers and the manual refresh both go through this.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn build_snapshot(&self) -> Result<MacroSnapshot>;
}

pub use macro_quad::{MacroIngestor, SeriesCatalog};
pub use provider::{FredClient, SeriesSource};
pub use types::Observation;
