use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-security fundamentals as reported by the quote provider. Values stay
/// in the provider's display format (e.g. "71,500", "12.34배").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub code: String,
    pub name: String,
    pub price: Option<String>,
    pub market_cap: Option<String>,
    pub per: Option<String>,
    pub pbr: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Buy,
    Neutral,
    Sell,
}

impl Stance {
    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Buy => "buy",
            Stance::Neutral => "neutral",
            Stance::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizon {
    Short,
    #[default]
    Mid,
    Long,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Horizon::Short => "short",
            Horizon::Mid => "mid",
            Horizon::Long => "long",
        })
    }
}

impl FromStr for Horizon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Horizon::Short),
            "mid" => Ok(Horizon::Mid),
            "long" => Ok(Horizon::Long),
            other => Err(format!("unknown horizon: {other} (expected short|mid|long)")),
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTolerance::Low => "low",
            RiskTolerance::Normal => "normal",
            RiskTolerance::High => "high",
        })
    }
}

impl FromStr for RiskTolerance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTolerance::Low),
            "normal" => Ok(RiskTolerance::Normal),
            "high" => Ok(RiskTolerance::High),
            other => Err(format!("unknown risk tolerance: {other} (expected low|normal|high)")),
        }
    }
}

/// Validated output of the per-security reasoning call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOpinion {
    pub stance: Stance,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub as_of: String,
}

/// What clients receive: the opinion plus the inputs it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOpinionView {
    pub stance: Stance,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub as_of: String,
    pub macro_facts: Vec<String>,
    pub macro_as_of: DateTime<Utc>,
    pub stock: Fundamentals,
    pub horizon: Horizon,
    pub risk: RiskTolerance,
}
