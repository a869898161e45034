pub mod naver;

use crate::domain::stock::Fundamentals;
use crate::error::Result;

/// Per-security fundamentals lookup. A code the provider cannot resolve is
/// [`crate::error::MacroError::DataUnavailable`].
#[async_trait::async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fetch(&self, code: &str) -> Result<Fundamentals>;
}

pub use naver::NaverStockClient;
