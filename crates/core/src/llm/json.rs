use crate::error::{Provider, ProviderError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // ```json ... ``` or ``` ... ```
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Model text of a Responses API body: the `output_text` convenience field,
/// else the first text part under `output[].content[]`.
pub fn output_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    body.get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .find_map(|part| part.get("text").and_then(Value::as_str))
        .map(str::to_string)
}

/// Like [`output_text`], but a body with no text part is treated as the
/// payload itself, which covers gateways that return the model output
/// directly.
pub fn response_text(body: &Value) -> String {
    output_text(body).unwrap_or_else(|| match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Narrative text of a completed response. A truncated (`incomplete`)
/// response or one without any text part is an error, never the body.
pub fn narrative_text(provider: Provider, body: &Value) -> Result<String> {
    if body.get("status").and_then(Value::as_str) == Some("incomplete") {
        let reason = body
            .pointer("/incomplete_details/reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(ProviderError::new(provider, "incomplete", format!("response incomplete: {reason}"))
            .with_raw_output(body.to_string())
            .into());
    }

    output_text(body).ok_or_else(|| {
        ProviderError::new(provider, "payload", "response has no text output")
            .with_raw_output(body.to_string())
            .into()
    })
}

/// Extracts and decodes the structured payload of a response.
pub fn parse_payload<T: DeserializeOwned>(provider: Provider, body: &Value) -> Result<T> {
    let text = response_text(body);
    let json_str = extract_json(&text).unwrap_or_else(|| text.trim().to_string());
    serde_json::from_str::<T>(&json_str).map_err(|e| {
        ProviderError::new(provider, "decode", format!("output does not match schema: {e}"))
            .with_raw_output(text)
            .into()
    })
}
