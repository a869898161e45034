use crate::domain::contract::LlmStockOpinion;
use crate::domain::snapshot::MacroSnapshot;
use crate::domain::stock::{Horizon, RiskTolerance, Stance, StockOpinionView};
use crate::engine::DecisionEngine;
use crate::error::{MacroError, Result};
use crate::fundamentals::FundamentalsProvider;
use crate::llm::prompts::{PromptName, PromptStore};
use crate::llm::{request_structured, ReasoningProvider, ResponseRequest};
use chrono::SecondsFormat;
use serde_json::{json, Value};
use std::sync::Arc;

pub const OPINION_MAX_OUTPUT_TOKENS: u32 = 400;
const SCHEMA_NAME: &str = "stock_opinion";

/// Per-security opinion conditioned on the current macro decision. Unlike the
/// decision itself there is no deterministic fallback: any failure reaches
/// the caller.
pub struct StockOpinionBuilder {
    fundamentals: Arc<dyn FundamentalsProvider>,
    engine: DecisionEngine,
    provider: Arc<dyn ReasoningProvider>,
    prompts: PromptStore,
    model: String,
}

impl StockOpinionBuilder {
    pub fn new(
        fundamentals: Arc<dyn FundamentalsProvider>,
        engine: DecisionEngine,
        provider: Arc<dyn ReasoningProvider>,
        prompts: PromptStore,
        model: impl Into<String>,
    ) -> Self {
        Self {
            fundamentals,
            engine,
            provider,
            prompts,
            model: model.into(),
        }
    }

    pub async fn build(
        &self,
        snapshot: &MacroSnapshot,
        code: &str,
        horizon: Horizon,
        risk: RiskTolerance,
    ) -> Result<StockOpinionView> {
        let stock = self.fundamentals.fetch(code).await?;
        let decision = self.engine.infer_safe(snapshot).await;
        let default_as_of = decision.as_of.to_rfc3339_opts(SecondsFormat::Secs, true);

        let payload = json!({
            "macro": decision,
            "stock": stock,
            "horizon": horizon,
            "risk": risk,
        });
        let input_json = serde_json::to_string(&payload)
            .map_err(|e| MacroError::validation(format!("opinion payload is not serializable: {e}")))?;
        let prompt = self.prompts.render(PromptName::StockOpinion, &input_json).await?;

        let req = ResponseRequest::new(&self.model, prompt, OPINION_MAX_OUTPUT_TOKENS)
            .temperature(0.0)
            .json_schema(SCHEMA_NAME, opinion_schema());

        let raw: LlmStockOpinion = request_structured(self.provider.as_ref(), &req).await?;
        let opinion = raw.validate_and_into_opinion(&default_as_of)?;

        tracing::info!(
            code = %stock.code,
            stance = opinion.stance.as_str(),
            confidence = opinion.confidence,
            %horizon,
            %risk,
            "stock opinion built"
        );

        Ok(StockOpinionView {
            stance: opinion.stance,
            confidence: opinion.confidence,
            reasons: opinion.reasons,
            as_of: opinion.as_of,
            macro_facts: decision.facts,
            macro_as_of: decision.as_of,
            stock,
            horizon,
            risk,
        })
    }
}

pub fn opinion_schema() -> Value {
    let stances: Vec<&str> = [Stance::Buy, Stance::Neutral, Stance::Sell]
        .iter()
        .map(|s| s.as_str())
        .collect();
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "stance": {"type": "string", "enum": stances},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasons": {"type": "array", "items": {"type": "string"}},
            "asOf": {"type": "string"}
        },
        "required": ["stance", "confidence", "reasons", "asOf"]
    })
}
