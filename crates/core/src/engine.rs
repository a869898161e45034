//! Macro regime classification over a [`MacroSnapshot`].
//!
//! [`DecisionEngine::infer`] surfaces every provider and contract failure;
//! [`DecisionEngine::infer_safe`] never fails and degrades to the canonical
//! neutral decision instead.

use crate::domain::contract::LlmDecision;
use crate::domain::decision::{Decision, DecisionResult, Quadrant};
use crate::domain::snapshot::MacroSnapshot;
use crate::error::{MacroError, Result};
use crate::llm::prompts::{PromptName, PromptStore};
use crate::llm::{request_structured, ReasoningProvider, ResponseRequest};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

pub const DECISION_MAX_OUTPUT_TOKENS: u32 = 400;
const SCHEMA_NAME: &str = "macro_quad";

#[derive(Clone)]
pub struct DecisionEngine {
    provider: Arc<dyn ReasoningProvider>,
    prompts: PromptStore,
    model: String,
}

impl DecisionEngine {
    pub fn new(provider: Arc<dyn ReasoningProvider>, prompts: PromptStore, model: impl Into<String>) -> Self {
        Self {
            provider,
            prompts,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn infer(&self, snapshot: &MacroSnapshot) -> Result<DecisionResult> {
        let (snapshot, as_of) = normalize(snapshot, Utc::now());
        self.infer_normalized(&snapshot, as_of).await
    }

    pub async fn infer_safe(&self, snapshot: &MacroSnapshot) -> DecisionResult {
        let (snapshot, as_of) = normalize(snapshot, Utc::now());
        match self.infer_normalized(&snapshot, as_of).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    %as_of,
                    model = %self.model,
                    error = %err,
                    "macro decision failed; using neutral fallback"
                );
                DecisionResult::neutral_fallback(as_of)
            }
        }
    }

    async fn infer_normalized(&self, snapshot: &MacroSnapshot, as_of: DateTime<Utc>) -> Result<DecisionResult> {
        let input_json = serde_json::to_string(snapshot)
            .map_err(|e| MacroError::validation(format!("snapshot is not serializable: {e}")))?;
        let prompt = self.prompts.render(PromptName::MacroQuad, &input_json).await?;

        let req = ResponseRequest::new(&self.model, prompt, DECISION_MAX_OUTPUT_TOKENS)
            .temperature(0.0)
            .json_schema(SCHEMA_NAME, decision_schema());

        let raw: LlmDecision = request_structured(self.provider.as_ref(), &req).await?;
        let result = raw.validate_and_into_decision(as_of)?;

        tracing::info!(
            %as_of,
            decision = result.decision.label(),
            quadrant = result.quadrant_label.label(),
            score = result.score,
            "macro decision inferred"
        );
        Ok(result)
    }
}

fn normalize(snapshot: &MacroSnapshot, now: DateTime<Utc>) -> (MacroSnapshot, DateTime<Utc>) {
    let normalized = snapshot.clone().normalized(now);
    let as_of = normalized.as_of.unwrap_or(now);
    (normalized, as_of)
}

/// Closed output contract for the classifier.
pub fn decision_schema() -> Value {
    let decisions: Vec<&str> = Decision::ALL.iter().map(|d| d.label()).collect();
    let quadrants: Vec<&str> = Quadrant::ALL.iter().map(|q| q.label()).collect();
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "score": {"type": "integer", "minimum": -3, "maximum": 3},
            "growthSignal": {"type": "integer", "enum": [-1, 0, 1]},
            "rateSignal": {"type": "integer", "enum": [-1, 0, 1]},
            "decision": {"type": "string", "enum": decisions},
            "quadrantLabel": {"type": "string", "enum": quadrants},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "usedSignals": {"type": "integer", "minimum": 0, "maximum": 2},
            "facts": {"type": "array", "items": {"type": "string"}},
            "asOf": {"type": "string"}
        },
        "required": [
            "score", "growthSignal", "rateSignal", "decision", "quadrantLabel",
            "confidence", "usedSignals", "facts", "asOf"
        ]
    })
}
