use crate::config::{env_parse, Settings};
use crate::error::{Provider, ProviderError, Result};
use crate::http::{build_client, read_body, transport_error};
use crate::llm::{ReasoningProvider, ResponseRequest};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(Provider::OpenAi, timeout)?,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?;
        let timeout_secs = env_parse::<u64>("OPENAI_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self::new(
            settings.openai_base_url.clone(),
            api_key,
            Duration::from_secs(timeout_secs),
        )?)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ProviderError::new(Provider::OpenAi, "auth", e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl ReasoningProvider for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn create_response(&self, req: &ResponseRequest) -> Result<serde_json::Value> {
        let url = format!("{}/responses", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(req)
            .send()
            .await
            .map_err(|e| transport_error(Provider::OpenAi, e))?;

        let (status, text) = read_body(Provider::OpenAi, res).await?;
        if !status.is_success() {
            return Err(ProviderError::new(
                Provider::OpenAi,
                "http",
                format!("model={} status={status}", req.model),
            )
            .with_raw_output(text)
            .into());
        }

        serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            ProviderError::new(Provider::OpenAi, "decode", format!("response is not JSON: {e}"))
                .with_raw_output(text.clone())
                .into()
        })
    }
}
