use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated point of an economic series. `value` is `None` when the source
/// publishes a placeholder for the period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FredObservationsResponse {
    #[serde(default)]
    pub observations: Vec<FredObservation>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FredObservation {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub value: String,
}

impl FredObservation {
    /// FRED publishes "." for missing periods.
    pub fn parse(&self) -> Option<Observation> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok()?;
        Some(Observation::new(date, parse_num(&self.value)))
    }
}

fn parse_num(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || t == "." {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_missing_value_marker() {
        let obs = FredObservation {
            date: "2026-09-01".to_string(),
            value: ".".to_string(),
        };
        let parsed = obs.parse().unwrap();
        assert_eq!(parsed.value, None);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2026, 9, 1).unwrap());
    }

    #[test]
    fn skips_rows_with_bad_dates() {
        let obs = FredObservation {
            date: "September".to_string(),
            value: "1.0".to_string(),
        };
        assert!(obs.parse().is_none());
    }
}
