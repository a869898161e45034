use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-way market stance, serialized with its Korean label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "매수")]
    Buy,
    #[serde(rename = "중립")]
    Neutral,
    #[serde(rename = "매도")]
    Sell,
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Buy, Decision::Neutral, Decision::Sell];

    pub fn label(self) -> &'static str {
        match self {
            Decision::Buy => "매수",
            Decision::Neutral => "중립",
            Decision::Sell => "매도",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label() == s.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "HighGrowth+FriendlyRates")]
    HighGrowthFriendlyRates,
    #[serde(rename = "HighGrowth+RestrictiveRates")]
    HighGrowthRestrictiveRates,
    #[serde(rename = "LowGrowth+FriendlyRates")]
    LowGrowthFriendlyRates,
    #[serde(rename = "LowGrowth+RestrictiveRates")]
    LowGrowthRestrictiveRates,
    #[serde(rename = "Mixed")]
    Mixed,
}

impl Quadrant {
    pub const ALL: [Quadrant; 5] = [
        Quadrant::HighGrowthFriendlyRates,
        Quadrant::HighGrowthRestrictiveRates,
        Quadrant::LowGrowthFriendlyRates,
        Quadrant::LowGrowthRestrictiveRates,
        Quadrant::Mixed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::HighGrowthFriendlyRates => "HighGrowth+FriendlyRates",
            Quadrant::HighGrowthRestrictiveRates => "HighGrowth+RestrictiveRates",
            Quadrant::LowGrowthFriendlyRates => "LowGrowth+FriendlyRates",
            Quadrant::LowGrowthRestrictiveRates => "LowGrowth+RestrictiveRates",
            Quadrant::Mixed => "Mixed",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|q| q.label() == s.trim())
    }
}

pub const SCORE_RANGE: std::ops::RangeInclusive<i32> = -3..=3;
pub const SIGNAL_RANGE: std::ops::RangeInclusive<i32> = -1..=1;
pub const USED_SIGNALS_RANGE: std::ops::RangeInclusive<i32> = 0..=2;

pub const FALLBACK_CONFIDENCE: f64 = 0.1;
pub const FALLBACK_FACT: &str = "LLM 오류 폴백";

/// A validated macro regime decision. Built only by contract validation or by
/// [`DecisionResult::neutral_fallback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub score: i32,
    pub growth_signal: i32,
    pub rate_signal: i32,
    pub decision: Decision,
    pub quadrant_label: Quadrant,
    pub confidence: f64,
    pub used_signals: i32,
    pub facts: Vec<String>,
    pub as_of: DateTime<Utc>,
}

impl DecisionResult {
    pub fn neutral_fallback(as_of: DateTime<Utc>) -> Self {
        Self {
            score: 0,
            growth_signal: 0,
            rate_signal: 0,
            decision: Decision::Neutral,
            quadrant_label: Quadrant::Mixed,
            confidence: FALLBACK_CONFIDENCE,
            used_signals: 0,
            facts: vec![FALLBACK_FACT.to_string()],
            as_of,
        }
    }
}
