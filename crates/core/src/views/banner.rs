use crate::domain::decision::{Decision, DecisionResult, Quadrant};
use crate::domain::snapshot::{MacroSnapshot, Pmi};
use chrono::{DateTime, Utc};
use serde::Serialize;

const SEP: &str = " · ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Negative,
}

impl Tone {
    pub fn of(signal: i32) -> Self {
        match signal.signum() {
            1 => Tone::Positive,
            -1 => Tone::Negative,
            _ => Tone::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BannerKey {
    Growth,
    Rates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerItem {
    pub key: BannerKey,
    pub signal: i32,
    pub tone: Tone,
    pub title: &'static str,
    pub value_text: String,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    pub decision: Decision,
    pub quadrant_label: Quadrant,
    pub score: i32,
    pub confidence: f64,
    pub as_of: DateTime<Utc>,
    pub items: [BannerItem; 2],
    pub stance: &'static str,
    pub headline: &'static str,
    pub subtext: String,
    pub color: Tone,
    pub icon: &'static str,
}

/// Display summary of a decision. Pure: same inputs, same banner.
pub fn build_banner(snapshot: &MacroSnapshot, decision: &DecisionResult) -> BannerView {
    let growth_text = growth_value_text(snapshot);
    let rate_text = rate_value_text(snapshot);

    let growth = BannerItem {
        key: BannerKey::Growth,
        signal: decision.growth_signal,
        tone: Tone::of(decision.growth_signal),
        title: "성장",
        value_text: growth_text.clone(),
        description: growth_description(decision.growth_signal),
    };
    let rates = BannerItem {
        key: BannerKey::Rates,
        signal: decision.rate_signal,
        tone: Tone::of(decision.rate_signal),
        title: "금리",
        value_text: rate_text.clone(),
        description: rate_description(decision.rate_signal),
    };

    let (stance, icon) = match decision.decision {
        Decision::Buy => ("buy", "bull"),
        Decision::Sell => ("sell", "bear"),
        Decision::Neutral => ("neutral", "neutral"),
    };

    BannerView {
        decision: decision.decision,
        quadrant_label: decision.quadrant_label,
        score: decision.score,
        confidence: decision.confidence,
        as_of: decision.as_of,
        items: [growth, rates],
        stance,
        headline: headline(decision.quadrant_label),
        subtext: format!("{growth_text} | {rate_text}"),
        color: Tone::of(decision.score),
        icon,
    }
}

pub fn headline(quadrant: Quadrant) -> &'static str {
    match quadrant {
        Quadrant::HighGrowthFriendlyRates => "성장 우세·금리 우호",
        Quadrant::HighGrowthRestrictiveRates => "성장 우세·금리 제약",
        Quadrant::LowGrowthFriendlyRates => "성장 둔화·금리 우호",
        Quadrant::LowGrowthRestrictiveRates => "성장 둔화·금리 제약",
        Quadrant::Mixed => "혼조",
    }
}

fn growth_description(signal: i32) -> &'static str {
    match signal.signum() {
        1 => "성장 지표 우세",
        -1 => "성장 둔화 신호",
        _ => "혼조",
    }
}

fn rate_description(signal: i32) -> &'static str {
    match signal.signum() {
        1 => "금리 여건 우호",
        -1 => "긴축/높은 실질금리",
        _ => "중립",
    }
}

fn or_na(value: Option<String>, na: &str) -> String {
    value.unwrap_or_else(|| na.to_string())
}

fn pmi_value(pmi: Option<&Pmi>) -> Option<f64> {
    pmi.and_then(|p| p.value)
}

pub fn growth_value_text(s: &MacroSnapshot) -> String {
    [
        or_na(s.gdp_now_qoq_saar_pct.map(|v| format!("GDPNow {v:.1}%")), "GDPNow n/a"),
        or_na(s.payrolls_3mma_k.map(|v| format!("NFP3M {v:+.0}k")), "NFP 3M n/a"),
        or_na(s.unemp_rate_pct.map(|v| format!("U {v:.1}%")), "U n/a"),
        or_na(pmi_value(s.pmi_mfg.as_ref()).map(|v| format!("PMI M {v:.1}")), "PMI M n/a"),
        or_na(pmi_value(s.pmi_svcs.as_ref()).map(|v| format!("PMI S {v:.1}")), "PMI S n/a"),
    ]
    .join(SEP)
}

pub fn rate_value_text(s: &MacroSnapshot) -> String {
    [
        or_na(s.ffr_upper_pct.map(|v| format!("FFR {v:.2}%")), "FFR n/a"),
        or_na(s.preferred_core_inflation().map(|v| format!("Core {v:.1}%")), "Core n/a"),
        or_na(s.real_policy_rate().map(|v| format!("real {v:.1}%")), "real n/a"),
        or_na(s.policy_rate_change_3m_bps.map(|v| format!("3m Δ {v:+}bp")), "3m Δ n/a"),
    ]
    .join(SEP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 23, 5, 0).unwrap()
    }

    fn decision(growth: i32, rate: i32, score: i32, d: Decision, q: Quadrant) -> DecisionResult {
        DecisionResult {
            score,
            growth_signal: growth,
            rate_signal: rate,
            decision: d,
            quadrant_label: q,
            confidence: 0.7,
            used_signals: 2,
            facts: vec!["fact".to_string()],
            as_of: as_of(),
        }
    }

    fn full_snapshot() -> MacroSnapshot {
        MacroSnapshot {
            gdp_now_qoq_saar_pct: Some(2.44),
            payrolls_3mma_k: Some(142.0),
            unemp_rate_pct: Some(4.3),
            pmi_mfg: Some(Pmi {
                value: Some(49.2),
                delta_mom: Some(-0.4),
            }),
            pmi_svcs: Some(Pmi {
                value: None,
                delta_mom: None,
            }),
            ffr_upper_pct: Some(5.33),
            core_pce_yoy_pct: Some(2.8),
            policy_rate_change_3m_bps: Some(-25),
            ..MacroSnapshot::empty_at(as_of())
        }
    }

    #[test]
    fn real_rate_uses_pce() {
        let text = rate_value_text(&full_snapshot());
        assert_eq!(text, "FFR 5.33% · Core 2.8% · real 2.5% · 3m Δ -25bp");
    }

    #[test]
    fn core_falls_back_to_cpi() {
        let s = MacroSnapshot {
            ffr_upper_pct: Some(5.5),
            core_cpi_yoy_pct: Some(3.2),
            policy_rate_change_3m_bps: Some(25),
            ..MacroSnapshot::default()
        };
        assert_eq!(
            rate_value_text(&s),
            "FFR 5.50% · Core 3.2% · real 2.3% · 3m Δ +25bp"
        );
    }

    #[test]
    fn growth_text_marks_missing_fields() {
        assert_eq!(
            growth_value_text(&full_snapshot()),
            "GDPNow 2.4% · NFP3M +142k · U 4.3% · PMI M 49.2 · PMI S n/a"
        );
        assert_eq!(
            growth_value_text(&MacroSnapshot::default()),
            "GDPNow n/a · NFP 3M n/a · U n/a · PMI M n/a · PMI S n/a"
        );
        assert_eq!(
            rate_value_text(&MacroSnapshot::default()),
            "FFR n/a · Core n/a · real n/a · 3m Δ n/a"
        );
    }

    #[test]
    fn negative_payrolls_keep_their_sign() {
        let s = MacroSnapshot {
            payrolls_3mma_k: Some(-33.0),
            ..MacroSnapshot::default()
        };
        assert!(growth_value_text(&s).contains("NFP3M -33k"));
    }

    #[test]
    fn buy_banner() {
        let d = decision(1, 1, 3, Decision::Buy, Quadrant::HighGrowthFriendlyRates);
        let banner = build_banner(&full_snapshot(), &d);

        assert_eq!(banner.stance, "buy");
        assert_eq!(banner.icon, "bull");
        assert_eq!(banner.headline, "성장 우세·금리 우호");
        assert_eq!(banner.color, Tone::Positive);
        assert_eq!(banner.items[0].key, BannerKey::Growth);
        assert_eq!(banner.items[0].title, "성장");
        assert_eq!(banner.items[0].description, "성장 지표 우세");
        assert_eq!(banner.items[1].title, "금리");
        assert_eq!(banner.items[1].description, "금리 여건 우호");
        assert_eq!(
            banner.subtext,
            format!(
                "{} | {}",
                growth_value_text(&full_snapshot()),
                rate_value_text(&full_snapshot())
            )
        );
    }

    #[test]
    fn sell_and_mixed_tokens() {
        let d = decision(-1, -1, -3, Decision::Sell, Quadrant::LowGrowthRestrictiveRates);
        let banner = build_banner(&MacroSnapshot::default(), &d);
        assert_eq!((banner.stance, banner.icon), ("sell", "bear"));
        assert_eq!(banner.headline, "성장 둔화·금리 제약");
        assert_eq!(banner.items[0].description, "성장 둔화 신호");
        assert_eq!(banner.items[1].description, "긴축/높은 실질금리");
        assert_eq!(banner.color, Tone::Negative);

        let fallback = DecisionResult::neutral_fallback(as_of());
        let banner = build_banner(&MacroSnapshot::default(), &fallback);
        assert_eq!((banner.stance, banner.icon), ("neutral", "neutral"));
        assert_eq!(banner.headline, "혼조");
        assert_eq!(banner.items[0].description, "혼조");
        assert_eq!(banner.items[1].description, "중립");
        assert_eq!(banner.items[1].tone, Tone::Neutral);
    }

    #[test]
    fn serializes_client_shape() {
        let d = decision(1, -1, 1, Decision::Neutral, Quadrant::HighGrowthRestrictiveRates);
        let v = serde_json::to_value(build_banner(&full_snapshot(), &d)).unwrap();
        assert_eq!(v["quadrantLabel"], "HighGrowth+RestrictiveRates");
        assert_eq!(v["decision"], "중립");
        assert_eq!(v["items"][0]["key"], "GROWTH");
        assert_eq!(v["items"][1]["key"], "RATES");
        assert_eq!(v["items"][1]["tone"], "negative");
        assert!(v["items"][0]["valueText"].as_str().unwrap().starts_with("GDPNow"));
    }
}
