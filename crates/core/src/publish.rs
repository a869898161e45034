//! Turns the cached snapshot into the day's artifacts: decision, banner and
//! the stored daily report.

use crate::cache::MacroSnapshotCache;
use crate::domain::decision::DecisionResult;
use crate::engine::DecisionEngine;
use crate::error::Result;
use crate::storage::ReportStorage;
use crate::views::banner::{build_banner, BannerView};
use crate::views::report::TieredReportBuilder;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DailyArtifacts {
    pub decision: DecisionResult,
    pub banner: BannerView,
    pub report_tier: &'static str,
    pub report_path: PathBuf,
}

pub struct DailyPublisher {
    cache: Arc<MacroSnapshotCache>,
    engine: DecisionEngine,
    reports: TieredReportBuilder,
    storage: Arc<dyn ReportStorage>,
}

impl DailyPublisher {
    pub fn new(
        cache: Arc<MacroSnapshotCache>,
        engine: DecisionEngine,
        reports: TieredReportBuilder,
        storage: Arc<dyn ReportStorage>,
    ) -> Self {
        Self {
            cache,
            engine,
            reports,
            storage,
        }
    }

    /// Builds everything from `cache.latest()`. `None` while the cache is
    /// still empty; only storage failures are errors.
    pub async fn publish_latest(&self) -> Result<Option<DailyArtifacts>> {
        let Some(snapshot) = self.cache.latest() else {
            tracing::warn!("macro cache empty; nothing to publish");
            return Ok(None);
        };

        let decision = self.engine.infer_safe(&snapshot).await;
        let banner = build_banner(&snapshot, &decision);
        let report = self.reports.generate_today(&snapshot, &decision).await;
        let report_path = self.storage.save_today(&report.markdown).await?;

        tracing::info!(
            decision = decision.decision.label(),
            headline = banner.headline,
            subtext = %banner.subtext,
            tier = report.tier,
            path = %report_path.display(),
            "daily artifacts published"
        );

        Ok(Some(DailyArtifacts {
            decision,
            banner,
            report_tier: report.tier,
            report_path,
        }))
    }
}
