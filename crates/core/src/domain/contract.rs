use crate::domain::decision::{
    Decision, DecisionResult, Quadrant, SCORE_RANGE, SIGNAL_RANGE, USED_SIGNALS_RANGE,
};
use crate::domain::stock::{Stance, StockOpinion};
use crate::error::{ensure_valid, MacroError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decision payload exactly as the reasoning provider emits it. Enumerated
/// fields stay as strings here so that an out-of-vocabulary value surfaces as
/// a validation error rather than a decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmDecision {
    pub score: i64,
    pub growth_signal: i64,
    pub rate_signal: i64,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub quadrant_label: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub used_signals: i64,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub as_of: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStockOpinion {
    #[serde(default)]
    pub stance: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub as_of: Option<String>,
}

impl LlmDecision {
    /// The decision's as-of is always the snapshot's, whatever the model said.
    pub fn validate_and_into_decision(self, as_of: DateTime<Utc>) -> Result<DecisionResult> {
        let decision = self
            .decision
            .as_deref()
            .ok_or_else(|| MacroError::validation("decision is null"))?;
        let decision = Decision::from_label(decision)
            .ok_or_else(|| MacroError::validation(format!("unknown decision label: {decision}")))?;

        ensure_valid!(
            SCORE_RANGE.contains(&clamp_i32(self.score)),
            "score out of range -3..3: {}",
            self.score
        );
        ensure_valid!(
            SIGNAL_RANGE.contains(&clamp_i32(self.growth_signal)),
            "growthSignal out of range -1..1: {}",
            self.growth_signal
        );
        ensure_valid!(
            SIGNAL_RANGE.contains(&clamp_i32(self.rate_signal)),
            "rateSignal out of range -1..1: {}",
            self.rate_signal
        );
        ensure_valid!(
            (0.0..=1.0).contains(&self.confidence),
            "confidence must be between 0 and 1 (got {})",
            self.confidence
        );
        ensure_valid!(
            USED_SIGNALS_RANGE.contains(&clamp_i32(self.used_signals)),
            "usedSignals out of range 0..2: {}",
            self.used_signals
        );

        let quadrant = self.quadrant_label.as_deref().unwrap_or_default();
        let quadrant_label = Quadrant::from_label(quadrant)
            .ok_or_else(|| MacroError::validation(format!("unknown quadrantLabel: {quadrant:?}")))?;

        let facts = self
            .facts
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        Ok(DecisionResult {
            score: self.score as i32,
            growth_signal: self.growth_signal as i32,
            rate_signal: self.rate_signal as i32,
            decision,
            quadrant_label,
            confidence: self.confidence,
            used_signals: self.used_signals as i32,
            facts,
            as_of,
        })
    }
}

impl LlmStockOpinion {
    pub fn validate_and_into_opinion(self, default_as_of: &str) -> Result<StockOpinion> {
        let stance = match self.stance.as_deref().map(str::trim) {
            Some("buy") => Stance::Buy,
            Some("neutral") => Stance::Neutral,
            Some("sell") => Stance::Sell,
            Some(other) => return Err(MacroError::validation(format!("unknown stance: {other}"))),
            None => return Err(MacroError::validation("stance is null")),
        };

        ensure_valid!(
            (0.0..=1.0).contains(&self.confidence),
            "confidence must be between 0 and 1 (got {})",
            self.confidence
        );

        let reasons: Vec<String> = self
            .reasons
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        ensure_valid!(!reasons.is_empty(), "reasons must be non-empty");

        let as_of = self
            .as_of
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_as_of.to_string());

        Ok(StockOpinion {
            stance,
            confidence: self.confidence,
            reasons,
            as_of,
        })
    }
}

// Values far outside i32 are still out of range; saturate instead of wrapping.
fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
