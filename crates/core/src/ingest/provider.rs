use crate::config::{env_parse, Settings};
use crate::error::{MacroError, Provider, ProviderError, Result};
use crate::http::{build_client, read_body, transport_error, AttemptError};
use crate::ingest::types::{FredObservationsResponse, Observation};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const OBSERVATIONS_PATH: &str = "/fred/series/observations";

/// Read access to dated economic series.
#[async_trait::async_trait]
pub trait SeriesSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Up to `limit` observations, newest first.
    async fn observations(&self, series_id: &str, limit: usize) -> Result<Vec<Observation>>;
}

#[derive(Debug, Clone)]
pub struct FredClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retries: u32,
    backoff_base: Duration,
}

impl FredClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(Provider::Fred, timeout)?,
            base_url: base_url.into(),
            api_key: api_key.into(),
            retries: DEFAULT_RETRIES,
            backoff_base: Duration::from_secs(1),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_fred_api_key()?;
        let timeout_secs = env_parse::<u64>("FRED_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let mut client = Self::new(
            settings.fred_base_url.clone(),
            api_key,
            Duration::from_secs(timeout_secs),
        )?;
        if let Some(retries) = env_parse::<u32>("FRED_RETRIES") {
            client.retries = retries.max(1);
        }
        Ok(client)
    }

    /// Attempt count and the unit of the exponential backoff between them.
    pub fn with_retry_policy(mut self, retries: u32, backoff_base: Duration) -> Self {
        self.retries = retries.max(1);
        self.backoff_base = backoff_base;
        self
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), OBSERVATIONS_PATH)
    }

    async fn fetch_once(
        &self,
        series_id: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Observation>, AttemptError> {
        let limit = limit.to_string();
        let res = self
            .http
            .get(self.url())
            .query(&[
                ("series_id", series_id),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(transport_error(Provider::Fred, e)))?;

        let (status, text) = read_body(Provider::Fred, res)
            .await
            .map_err(AttemptError::Retryable)?;
        if !status.is_success() {
            let err: MacroError = ProviderError::new(
                Provider::Fred,
                "http",
                format!("series {series_id}: status={status}"),
            )
            .with_raw_output(text)
            .into();
            return Err(AttemptError::for_status(status, err));
        }

        let parsed: FredObservationsResponse = serde_json::from_str(&text).map_err(|e| {
            AttemptError::Final(
                ProviderError::new(Provider::Fred, "decode", format!("series {series_id}: {e}"))
                    .with_raw_output(text.clone())
                    .into(),
            )
        })?;

        let observations: Vec<Observation> = parsed
            .observations
            .iter()
            .filter_map(|o| o.parse())
            .collect();

        // An empty series will not fill in on retry.
        if observations.is_empty() {
            return Err(AttemptError::Final(MacroError::DataUnavailable(format!(
                "series {series_id} returned no observations"
            ))));
        }
        Ok(observations)
    }
}

#[async_trait::async_trait]
impl SeriesSource for FredClient {
    fn source_name(&self) -> &'static str {
        "fred"
    }

    async fn observations(&self, series_id: &str, limit: usize) -> Result<Vec<Observation>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(series_id, limit).await {
                Ok(obs) => return Ok(obs),
                Err(AttemptError::Final(err)) => return Err(err),
                Err(AttemptError::Retryable(err)) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = self.backoff_base * (1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, series_id, error = %err, "fred fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> FredClient {
        FredClient::new(server.uri(), "test-key", Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn parses_observations_and_missing_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fred/series/observations"))
            .and(query_param("series_id", "UNRATE"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("sort_order", "desc"))
            .and(query_param("limit", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [
                    {"date": "2026-09-01", "value": "."},
                    {"date": "2026-08-01", "value": "4.3"}
                ]
            })))
            .mount(&server)
            .await;

        let obs = client(&server).observations("UNRATE", 4).await.unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].value, None);
        assert_eq!(obs[1].date, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(obs[1].value, Some(4.3));
    }

    #[tokio::test]
    async fn retries_then_surfaces_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).observations("PAYEMS", 5).await.unwrap_err();
        match err {
            MacroError::Provider(p) => {
                assert_eq!(p.stage, "http");
                assert_eq!(p.raw_output.as_deref(), Some("busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad Request.  The value for variable api_key is not registered."))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).observations("UNRATE", 4).await.unwrap_err();
        match err {
            MacroError::Provider(p) => {
                assert_eq!(p.stage, "http");
                assert!(p.detail.contains("400"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transient_status_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "observations": [{"date": "2026-09-01", "value": "4.3"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let obs = client(&server).observations("UNRATE", 4).await.unwrap();
        assert_eq!(obs[0].value, Some(4.3));
    }

    #[tokio::test]
    async fn empty_series_is_data_unavailable_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"observations": []})))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).observations("GDPNOW", 10).await.unwrap_err();
        assert!(err.is_data_unavailable());
    }
}
