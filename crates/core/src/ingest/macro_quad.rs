use crate::config::Settings;
use crate::domain::snapshot::{MacroSnapshot, Pmi};
use crate::error::Result;
use crate::ingest::derive::{self, round_to};
use crate::ingest::provider::SeriesSource;
use crate::ingest::types::Observation;
use crate::ingest::SnapshotSource;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// Fetch sizes per derivation. The policy rate is daily, so it needs roughly
// four months of points to yield four month-end values.
const LATEST_LIMIT: usize = derive::LATEST_LOOKBACK;
const YOY_LIMIT: usize = derive::YOY_WINDOW;
const UNRATE_LIMIT: usize = 15;
const PAYROLL_LEVELS: usize = 4;
const POLICY_DAILY_LIMIT: usize = 130;
const UNRATE_CHANGE_PERIODS: usize = 3;

const PERSONS_PER_THOUSAND: f64 = 1000.0;

/// FRED series ids feeding each snapshot field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesCatalog {
    pub policy_rate_upper: String,
    pub core_pce_index: String,
    pub core_cpi_index: String,
    pub unemployment_rate: String,
    pub nonfarm_payrolls: String,
    pub initial_claims_4wma: String,
    pub gdp_now: Option<String>,
    pub pmi_mfg: Option<String>,
    pub pmi_svcs: Option<String>,
}

impl Default for SeriesCatalog {
    fn default() -> Self {
        Self {
            policy_rate_upper: "DFEDTARU".to_string(),
            core_pce_index: "PCEPILFE".to_string(),
            core_cpi_index: "CPILFESL".to_string(),
            unemployment_rate: "UNRATE".to_string(),
            nonfarm_payrolls: "PAYEMS".to_string(),
            initial_claims_4wma: "IC4WSA".to_string(),
            gdp_now: Some("GDPNOW".to_string()),
            pmi_mfg: None,
            pmi_svcs: None,
        }
    }
}

impl SeriesCatalog {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            pmi_mfg: settings.pmi_mfg_series.clone(),
            pmi_svcs: settings.pmi_svcs_series.clone(),
            ..Self::default()
        }
    }
}

/// Builds a [`MacroSnapshot`] from a [`SeriesSource`]. Individual series
/// failures are logged and leave their fields empty.
#[derive(Clone)]
pub struct MacroIngestor {
    source: Arc<dyn SeriesSource>,
    catalog: SeriesCatalog,
}

impl MacroIngestor {
    pub fn new(source: Arc<dyn SeriesSource>, catalog: SeriesCatalog) -> Self {
        Self { source, catalog }
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        &self.catalog
    }

    /// Oldest-first observations, or an empty list when the fetch failed.
    async fn ascending(&self, series_id: &str, limit: usize) -> Vec<Observation> {
        match self.source.observations(series_id, limit).await {
            Ok(mut obs) => {
                obs.reverse();
                obs
            }
            Err(err) => {
                tracing::warn!(
                    source = self.source.source_name(),
                    series_id,
                    error = %err,
                    "series fetch failed; leaving fields empty"
                );
                Vec::new()
            }
        }
    }

    async fn optional(&self, series_id: Option<&str>, limit: usize) -> Vec<Observation> {
        match series_id {
            Some(id) => self.ascending(id, limit).await,
            None => Vec::new(),
        }
    }

    pub async fn build_snapshot_at(&self, now: DateTime<Utc>) -> MacroSnapshot {
        let c = &self.catalog;
        let (policy, pce, unrate, payrolls, claims, gdp, pmi_mfg, pmi_svcs) = tokio::join!(
            self.ascending(&c.policy_rate_upper, POLICY_DAILY_LIMIT),
            self.ascending(&c.core_pce_index, YOY_LIMIT),
            self.ascending(&c.unemployment_rate, UNRATE_LIMIT),
            self.ascending(&c.nonfarm_payrolls, PAYROLL_LEVELS),
            self.ascending(&c.initial_claims_4wma, LATEST_LIMIT),
            self.optional(c.gdp_now.as_deref(), LATEST_LIMIT),
            self.optional(c.pmi_mfg.as_deref(), LATEST_LIMIT),
            self.optional(c.pmi_svcs.as_deref(), LATEST_LIMIT),
        );

        let core_pce_yoy_pct = derive::yoy_from_index(&pce);
        // CPI is only consulted when PCE could not be derived.
        let core_cpi_yoy_pct = match core_pce_yoy_pct {
            Some(_) => None,
            None => derive::yoy_from_index(&self.ascending(&c.core_cpi_index, YOY_LIMIT).await),
        };

        let unrate_values = derive::values(&unrate);
        let claims_k: Vec<Option<f64>> = claims
            .iter()
            .map(|o| o.value.map(|v| v / PERSONS_PER_THOUSAND))
            .collect();
        let policy_monthly = derive::values(&derive::month_end(&policy));

        let snapshot = MacroSnapshot {
            as_of: Some(now),
            gdp_now_qoq_saar_pct: derive::latest_value(&gdp),
            payrolls_3mma_k: payrolls_3mma(&payrolls),
            unemp_rate_pct: derive::latest_value(&unrate),
            unemp_rate_change_3m_pp: derive::change_over_periods(
                &unrate_values,
                UNRATE_CHANGE_PERIODS,
            ),
            claims_4wma_k: latest_of(&claims_k).map(|v| round_to(v, 1)),
            claims_trend: derive::classify_trend(&claims_k),
            pmi_mfg: pmi_record(&pmi_mfg),
            pmi_svcs: pmi_record(&pmi_svcs),
            ffr_upper_pct: derive::latest_value(&policy),
            core_pce_yoy_pct,
            core_cpi_yoy_pct,
            policy_rate_change_3m_bps: derive::policy_rate_change_bps(&policy_monthly),
            previous_decision: None,
        };

        tracing::info!(
            as_of = %now,
            fields_present = populated_fields(&snapshot),
            "macro snapshot assembled"
        );
        snapshot
    }
}

#[async_trait::async_trait]
impl SnapshotSource for MacroIngestor {
    async fn build_snapshot(&self) -> Result<MacroSnapshot> {
        Ok(self.build_snapshot_at(Utc::now()).await)
    }
}

/// Average monthly net change over the last three months, whole thousands.
fn payrolls_3mma(levels: &[Observation]) -> Option<f64> {
    let changes = derive::period_changes(&derive::values(levels));
    derive::trailing_three_month_average(&changes).map(|v| round_to(v, 0))
}

fn latest_of(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .rev()
        .take(derive::LATEST_LOOKBACK)
        .find_map(|v| *v)
}

fn pmi_record(obs: &[Observation]) -> Option<Pmi> {
    let value = derive::latest_value(obs);
    let delta_mom = derive::change_over_periods(&derive::values(obs), 1);
    if value.is_none() && delta_mom.is_none() {
        return None;
    }
    Some(Pmi { value, delta_mom })
}

fn populated_fields(s: &MacroSnapshot) -> usize {
    [
        s.gdp_now_qoq_saar_pct.is_some(),
        s.payrolls_3mma_k.is_some(),
        s.unemp_rate_pct.is_some(),
        s.unemp_rate_change_3m_pp.is_some(),
        s.claims_4wma_k.is_some(),
        s.claims_trend.is_some(),
        s.pmi_mfg.is_some(),
        s.pmi_svcs.is_some(),
        s.ffr_upper_pct.is_some(),
        s.core_pce_yoy_pct.is_some() || s.core_cpi_yoy_pct.is_some(),
        s.policy_rate_change_3m_bps.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::Trend;
    use crate::error::MacroError;
    use chrono::{Datelike, Days, Months, NaiveDate, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned ascending series newest-first, like FRED does.
    #[derive(Default)]
    struct FakeSource {
        series: HashMap<String, Vec<Observation>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, id: &str, obs: Vec<Observation>) -> Self {
            self.series.insert(id.to_string(), obs);
            self
        }
    }

    #[async_trait::async_trait]
    impl SeriesSource for FakeSource {
        fn source_name(&self) -> &'static str {
            "fake"
        }

        async fn observations(&self, series_id: &str, limit: usize) -> Result<Vec<Observation>> {
            self.calls.lock().unwrap().push(series_id.to_string());
            let obs = self
                .series
                .get(series_id)
                .ok_or_else(|| MacroError::DataUnavailable(series_id.to_string()))?;
            Ok(obs.iter().rev().take(limit).copied().collect())
        }
    }

    fn monthly(start: (i32, u32), vals: &[f64]) -> Vec<Observation> {
        let first = NaiveDate::from_ymd_opt(start.0, start.1, 1).unwrap();
        vals.iter()
            .enumerate()
            .map(|(i, v)| Observation::new(first + Months::new(i as u32), Some(*v)))
            .collect()
    }

    fn weekly(vals: &[f64]) -> Vec<Observation> {
        let first = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        vals.iter()
            .enumerate()
            .map(|(i, v)| Observation::new(first + Days::new(7 * i as u64), Some(*v)))
            .collect()
    }

    fn daily_policy() -> Vec<Observation> {
        // 5.50 through June, 5.25 from July, 5.00 from September.
        let first = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        (0..120)
            .map(|i| {
                let date = first + Days::new(i);
                let rate = if date.month() >= 9 {
                    5.0
                } else if date.month() >= 7 {
                    5.25
                } else {
                    5.5
                };
                Observation::new(date, Some(rate))
            })
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn assembles_full_snapshot() {
        let pce: Vec<f64> = (0..14).map(|i| 120.0 + 0.3 * i as f64).collect();
        let source = FakeSource::default()
            .with("DFEDTARU", daily_policy())
            .with("PCEPILFE", monthly((2025, 8), &pce))
            .with("UNRATE", monthly((2026, 3), &[4.0, 4.1, 4.1, 4.2, 4.3, 4.4]))
            .with("PAYEMS", monthly((2026, 6), &[159_000.0, 159_150.0, 159_250.0, 159_450.0]))
            .with(
                "IC4WSA",
                weekly(&[
                    220_000.0, 220_000.0, 220_000.0, 220_000.0, 225_000.0, 225_000.0, 225_000.0,
                    225_250.0,
                ]),
            )
            .with("GDPNOW", monthly((2026, 7), &[2.1, 2.4]));

        let ingestor = MacroIngestor::new(Arc::new(source), SeriesCatalog::default());
        let s = ingestor.build_snapshot_at(now()).await;

        assert_eq!(s.as_of, Some(now()));
        assert_eq!(s.ffr_upper_pct, Some(5.0));
        // June-end 5.50 -> September-end 5.00
        assert_eq!(s.policy_rate_change_3m_bps, Some(-50));
        assert!(s.core_pce_yoy_pct.is_some());
        assert_eq!(s.core_cpi_yoy_pct, None);
        assert_eq!(s.unemp_rate_pct, Some(4.4));
        assert_eq!(s.unemp_rate_change_3m_pp, Some(0.3));
        // (150 + 100 + 200) / 3
        assert_eq!(s.payrolls_3mma_k, Some(150.0));
        assert_eq!(s.claims_4wma_k, Some(225.3));
        assert_eq!(s.claims_trend, Some(Trend::Up));
        assert_eq!(s.gdp_now_qoq_saar_pct, Some(2.4));
        assert_eq!(s.pmi_mfg, None);
        assert_eq!(s.previous_decision, None);
    }

    #[tokio::test]
    async fn falls_back_to_core_cpi_when_pce_missing() {
        let cpi: Vec<f64> = (0..13).map(|i| if i == 12 { 103.0 } else { 100.0 }).collect();
        let source = FakeSource::default().with("CPILFESL", monthly((2025, 9), &cpi));

        let s = MacroIngestor::new(Arc::new(source), SeriesCatalog::default())
            .build_snapshot_at(now())
            .await;

        assert_eq!(s.core_pce_yoy_pct, None);
        assert_eq!(s.core_cpi_yoy_pct, Some(3.0));
        assert_eq!(s.preferred_core_inflation(), Some(3.0));
    }

    #[tokio::test]
    async fn skips_cpi_fetch_when_pce_is_available() {
        let pce: Vec<f64> = (0..13).map(|i| 100.0 + i as f64).collect();
        let source = Arc::new(
            FakeSource::default()
                .with("PCEPILFE", monthly((2025, 9), &pce))
                .with("CPILFESL", monthly((2025, 9), &pce)),
        );

        let s = MacroIngestor::new(source.clone(), SeriesCatalog::default())
            .build_snapshot_at(now())
            .await;

        assert_eq!(s.core_pce_yoy_pct, Some(12.0));
        assert_eq!(s.core_cpi_yoy_pct, None);
        assert!(!source.calls.lock().unwrap().iter().any(|c| c == "CPILFESL"));
    }

    #[tokio::test]
    async fn every_series_failing_still_yields_a_snapshot() {
        let s = MacroIngestor::new(Arc::new(FakeSource::default()), SeriesCatalog::default())
            .build_snapshot()
            .await
            .unwrap();

        assert!(s.as_of.is_some());
        assert_eq!(populated_fields(&s), 0);
    }

    #[tokio::test]
    async fn optional_pmi_series_from_catalog() {
        let source =
            FakeSource::default().with("ISM_MFG", monthly((2026, 7), &[48.7, 49.0, 49.6]));
        let catalog = SeriesCatalog {
            pmi_mfg: Some("ISM_MFG".to_string()),
            ..SeriesCatalog::default()
        };

        let s = MacroIngestor::new(Arc::new(source), catalog)
            .build_snapshot_at(now())
            .await;
        assert_eq!(
            s.pmi_mfg,
            Some(Pmi {
                value: Some(49.6),
                delta_mom: Some(0.6)
            })
        );
        assert_eq!(s.pmi_svcs, None);
    }
}
