//! Persistence for generated daily reports, keyed by KST calendar date.

pub mod local;

use crate::error::{MacroError, Result};
use crate::time::kst::{parse_report_key, today_kst};
use chrono::{NaiveDate, Utc};
use std::path::PathBuf;

#[async_trait::async_trait]
pub trait ReportStorage: Send + Sync {
    async fn save_for_date(&self, date: NaiveDate, markdown: &str) -> Result<PathBuf>;

    /// Newest stored report, if any.
    async fn load_latest(&self) -> Result<Option<String>>;

    async fn load_for_date(&self, date: NaiveDate) -> Result<Option<String>>;

    async fn save_today(&self, markdown: &str) -> Result<PathBuf> {
        self.save_for_date(today_kst(Utc::now()), markdown).await
    }

    /// `key` is `yyyymmdd`; anything else is a validation error.
    async fn load_by_date(&self, key: &str) -> Result<Option<String>> {
        let date = parse_report_key(key)
            .ok_or_else(|| MacroError::validation(format!("report date must be yyyymmdd: {key:?}")))?;
        self.load_for_date(date).await
    }
}

pub use local::LocalReportStorage;
