pub mod json;
pub mod openai;
pub mod prompts;

use crate::error::{Provider, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Body of a Responses API call. Optional knobs are omitted from the wire
/// when unset so models that reject them (e.g. temperature on reasoning
/// models) still accept the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningOptions {
    pub effort: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl ResponseRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            temperature: None,
            max_output_tokens,
            reasoning: None,
            text: None,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn reasoning_effort(mut self, effort: &str) -> Self {
        self.reasoning = Some(ReasoningOptions {
            effort: effort.to_string(),
        });
        self
    }

    pub fn verbosity(mut self, verbosity: &str) -> Self {
        self.text.get_or_insert_with(TextOptions::default).verbosity = Some(verbosity.to_string());
        self
    }

    /// Constrains the output to a closed JSON schema.
    pub fn json_schema(mut self, name: &str, schema: Value) -> Self {
        self.text.get_or_insert_with(TextOptions::default).format = Some(TextFormat {
            kind: "json_schema",
            name: name.to_string(),
            schema,
            strict: true,
        });
        self
    }
}

#[async_trait::async_trait]
pub trait ReasoningProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the raw response body.
    async fn create_response(&self, req: &ResponseRequest) -> Result<Value>;
}

/// Sends `req` and decodes the structured payload into `T`.
pub async fn request_structured<T: DeserializeOwned>(
    client: &dyn ReasoningProvider,
    req: &ResponseRequest,
) -> Result<T> {
    let body = client.create_response(req).await?;
    json::parse_payload(client.provider(), &body)
}

/// Sends `req` and returns the narrative text of the response. Responses
/// without text output are errors.
pub async fn request_text(client: &dyn ReasoningProvider, req: &ResponseRequest) -> Result<String> {
    let body = client.create_response(req).await?;
    json::narrative_text(client.provider(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn omits_unset_options() {
        let req = ResponseRequest::new("gpt-5-mini", "hello", 1000);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({"model": "gpt-5-mini", "input": "hello", "max_output_tokens": 1000})
        );
    }

    #[test]
    fn serializes_schema_and_reasoning_knobs() {
        let req = ResponseRequest::new("gpt-4.1-mini", "x", 400)
            .temperature(0.0)
            .reasoning_effort("minimal")
            .verbosity("low")
            .json_schema("macro_quad", json!({"type": "object"}));
        let v = serde_json::to_value(&req).unwrap();

        assert_eq!(v["temperature"], json!(0.0));
        assert_eq!(v["reasoning"], json!({"effort": "minimal"}));
        assert_eq!(v["text"]["verbosity"], json!("low"));
        assert_eq!(v["text"]["format"]["type"], json!("json_schema"));
        assert_eq!(v["text"]["format"]["name"], json!("macro_quad"));
        assert_eq!(v["text"]["format"]["strict"], json!(true));
    }
}
