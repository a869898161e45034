//! Daily narrative report: an ordered list of fallible generators followed by
//! a template renderer that cannot fail.

use crate::config::DEFAULT_REPORT_MODEL;
use crate::domain::decision::DecisionResult;
use crate::domain::snapshot::{MacroSnapshot, Pmi};
use crate::error::{MacroError, Result};
use crate::llm::prompts::{PromptName, PromptStore};
use crate::llm::{request_text, ReasoningProvider, ResponseRequest};
use crate::time::kst::today_kst;
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::json;
use std::fmt::{Display, Write};
use std::sync::Arc;

pub const PRIMARY_MAX_OUTPUT_TOKENS: u32 = 1200;
pub const SECONDARY_MAX_OUTPUT_TOKENS: u32 = 1000;
pub const TEMPLATE_TIER: &str = "template";

/// Everything a generator needs for one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub date: NaiveDate,
    pub snapshot: &'a MacroSnapshot,
    pub decision: &'a DecisionResult,
}

#[async_trait::async_trait]
pub trait ReportStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, input: &ReportInput<'_>) -> Result<String>;
}

/// Narrative report from the reasoning provider.
pub struct LlmReportStrategy {
    name: &'static str,
    provider: Arc<dyn ReasoningProvider>,
    prompts: PromptStore,
    model: String,
    max_output_tokens: u32,
}

impl LlmReportStrategy {
    pub fn primary(provider: Arc<dyn ReasoningProvider>, prompts: PromptStore, model: impl Into<String>) -> Self {
        Self {
            name: "primary",
            provider,
            prompts,
            model: model.into(),
            max_output_tokens: PRIMARY_MAX_OUTPUT_TOKENS,
        }
    }

    /// Always the small report model, with a tighter output budget.
    pub fn secondary(provider: Arc<dyn ReasoningProvider>, prompts: PromptStore) -> Self {
        Self {
            name: "secondary",
            provider,
            prompts,
            model: DEFAULT_REPORT_MODEL.to_string(),
            max_output_tokens: SECONDARY_MAX_OUTPUT_TOKENS,
        }
    }

    fn request(&self, prompt: String) -> ResponseRequest {
        ResponseRequest::new(&self.model, prompt, self.max_output_tokens)
            .reasoning_effort("minimal")
            .verbosity("low")
    }
}

#[async_trait::async_trait]
impl ReportStrategy for LlmReportStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn generate(&self, input: &ReportInput<'_>) -> Result<String> {
        let payload = json!({
            "date": input.date.format("%Y-%m-%d").to_string(),
            "macroInput": input.snapshot,
            "macro": input.decision,
        });
        let prompt = self
            .prompts
            .render(PromptName::DailyReport, &payload.to_string())
            .await?;

        let text = request_text(self.provider.as_ref(), &self.request(prompt)).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(MacroError::validation(format!(
                "model {} returned an empty report",
                self.model
            )));
        }
        Ok(text.to_string())
    }
}

/// Deterministic markdown built from the inputs alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateReport;

impl TemplateReport {
    pub fn render(&self, input: &ReportInput<'_>) -> String {
        let s = input.snapshot;
        let d = input.decision;
        let mut md = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(md, "# Daily Macro Report (Fallback)\n");
        let _ = writeln!(md, "생성 일자: {}", input.date.format("%Y-%m-%d"));
        let _ = writeln!(
            md,
            "기준 시점(asOf): {}\n",
            d.as_of.to_rfc3339_opts(SecondsFormat::Secs, true)
        );

        let _ = writeln!(md, "## 시장 스탠스 요약");
        let _ = writeln!(md, "- 결정: {} ({})", d.decision.label(), d.quadrant_label.label());
        let _ = writeln!(
            md,
            "- 성장 신호: {} / 금리 신호: {}",
            d.growth_signal, d.rate_signal
        );
        let _ = writeln!(
            md,
            "- 점수: {} (확신도 {:.0}%)\n",
            d.score,
            d.confidence * 100.0
        );

        if !d.facts.is_empty() {
            let _ = writeln!(md, "### 근거 팩트");
            for fact in &d.facts {
                let _ = writeln!(md, "- {fact}");
            }
            md.push('\n');
        }

        let _ = writeln!(md, "## 입력 데이터(요약)");
        let _ = writeln!(md, "- GDPNow(q/q saar, %): {}", na(s.gdp_now_qoq_saar_pct));
        let _ = writeln!(md, "- Payrolls 3mma(k): {}", na(s.payrolls_3mma_k));
        let _ = writeln!(
            md,
            "- Unemp rate(%): {} (Δ3m {})",
            na(s.unemp_rate_pct),
            na(s.unemp_rate_change_3m_pp)
        );
        let _ = writeln!(
            md,
            "- Claims 4wma(k): {} (trend {})",
            na(s.claims_4wma_k),
            na(s.claims_trend.map(|t| t.as_str()))
        );
        let _ = writeln!(
            md,
            "- PMI mfg / svcs: {} / {}",
            pmi_text(s.pmi_mfg.as_ref()),
            pmi_text(s.pmi_svcs.as_ref())
        );
        let _ = writeln!(md, "- FFR upper(%): {}", na(s.ffr_upper_pct));
        let _ = writeln!(
            md,
            "- Core PCE / CPI YoY(%): {} / {}",
            na(s.core_pce_yoy_pct),
            na(s.core_cpi_yoy_pct)
        );
        let _ = writeln!(md, "- Policy rate Δ3m(bp): {}", na(s.policy_rate_change_3m_bps));
        let _ = writeln!(
            md,
            "- Previous decision: {}\n",
            na(s.previous_decision.map(|d| d.label()))
        );
        let _ = writeln!(md, "(본 리포트는 LLM 오류로 인해 축약 버전으로 생성되었습니다.)");
        md
    }
}

fn na<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn pmi_text(pmi: Option<&Pmi>) -> String {
    match pmi {
        Some(p) => format!("{} (ΔMoM {})", na(p.value), na(p.delta_mom)),
        None => "n/a".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub markdown: String,
    /// Which tier produced the markdown.
    pub tier: &'static str,
}

pub struct TieredReportBuilder {
    strategies: Vec<Box<dyn ReportStrategy>>,
    template: TemplateReport,
}

impl TieredReportBuilder {
    pub fn new(strategies: Vec<Box<dyn ReportStrategy>>) -> Self {
        Self {
            strategies,
            template: TemplateReport,
        }
    }

    /// primary (configured report model) -> secondary (small model) -> template.
    pub fn with_provider(provider: Arc<dyn ReasoningProvider>, prompts: PromptStore, model: impl Into<String>) -> Self {
        Self::new(vec![
            Box::new(LlmReportStrategy::primary(provider.clone(), prompts.clone(), model)),
            Box::new(LlmReportStrategy::secondary(provider, prompts)),
        ])
    }

    /// Tier names in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(TEMPLATE_TIER))
            .collect()
    }

    pub async fn generate(&self, snapshot: &MacroSnapshot, decision: &DecisionResult, date: NaiveDate) -> GeneratedReport {
        let input = ReportInput {
            date,
            snapshot,
            decision,
        };

        for strategy in &self.strategies {
            match strategy.generate(&input).await {
                Ok(markdown) => {
                    tracing::info!(tier = strategy.name(), %date, "daily report generated");
                    return GeneratedReport {
                        markdown,
                        tier: strategy.name(),
                    };
                }
                Err(err) => {
                    tracing::warn!(tier = strategy.name(), %date, error = %err, "report tier failed");
                }
            }
        }

        tracing::warn!(%date, "all report tiers failed; rendering template");
        GeneratedReport {
            markdown: self.template.render(&input),
            tier: TEMPLATE_TIER,
        }
    }

    /// Report dated with today's KST calendar date.
    pub async fn generate_today(&self, snapshot: &MacroSnapshot, decision: &DecisionResult) -> GeneratedReport {
        self.generate(snapshot, decision, today_kst(Utc::now())).await
    }
}
