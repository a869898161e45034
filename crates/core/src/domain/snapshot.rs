use crate::domain::decision::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One assembled bundle of macro indicators. Every numeric field is optional:
/// a partially populated snapshot is the normal case, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroSnapshot {
    #[serde(rename = "asOf", default)]
    pub as_of: Option<DateTime<Utc>>,

    #[serde(rename = "gdpNow_qoq_saar_pct", default)]
    pub gdp_now_qoq_saar_pct: Option<f64>,
    #[serde(rename = "payrolls_3mma_k", default)]
    pub payrolls_3mma_k: Option<f64>,
    #[serde(rename = "unemp_rate_pct", default)]
    pub unemp_rate_pct: Option<f64>,
    #[serde(rename = "unemp_rate_change_3m_pp", default)]
    pub unemp_rate_change_3m_pp: Option<f64>,
    #[serde(rename = "claims_4wma_k", default)]
    pub claims_4wma_k: Option<f64>,
    #[serde(rename = "claims_trend", default)]
    pub claims_trend: Option<Trend>,

    #[serde(rename = "pmi_mfg", default)]
    pub pmi_mfg: Option<Pmi>,
    #[serde(rename = "pmi_svcs", default)]
    pub pmi_svcs: Option<Pmi>,

    #[serde(rename = "ffr_upper_pct", default)]
    pub ffr_upper_pct: Option<f64>,
    #[serde(rename = "core_pce_yoy_pct", default)]
    pub core_pce_yoy_pct: Option<f64>,
    #[serde(rename = "core_cpi_yoy_pct", default)]
    pub core_cpi_yoy_pct: Option<f64>,
    #[serde(rename = "policyRateChange3m_bps", default)]
    pub policy_rate_change_3m_bps: Option<i32>,

    // Kept for schema compatibility; nothing downstream scores on it.
    #[serde(rename = "previousDecision", default)]
    pub previous_decision: Option<Decision>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pmi {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(rename = "deltaMoM", default)]
    pub delta_mom: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

impl MacroSnapshot {
    /// An empty snapshot stamped with `now`.
    pub fn empty_at(now: DateTime<Utc>) -> Self {
        Self {
            as_of: Some(now),
            ..Self::default()
        }
    }

    /// Returns the snapshot with `as_of` filled in when it was missing.
    pub fn normalized(mut self, now: DateTime<Utc>) -> Self {
        if self.as_of.is_none() {
            self.as_of = Some(now);
        }
        self
    }

    /// Core PCE when present, otherwise core CPI. Never a blend of the two.
    pub fn preferred_core_inflation(&self) -> Option<f64> {
        self.core_pce_yoy_pct.or(self.core_cpi_yoy_pct)
    }

    /// Policy rate minus preferred core inflation.
    pub fn real_policy_rate(&self) -> Option<f64> {
        Some(self.ffr_upper_pct? - self.preferred_core_inflation()?)
    }
}
