use crate::config::{env_parse, Settings};
use crate::domain::stock::Fundamentals;
use crate::error::{ensure_valid, MacroError, Provider, ProviderError, Result};
use crate::fundamentals::FundamentalsProvider;
use crate::http::{build_client, read_body, transport_error, AttemptError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_ATTEMPTS: usize = 3;
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const MAX_CODE_LEN: usize = 12;

const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Mobile/15E148 Safari/604.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntegrationResponse {
    #[serde(default)]
    stock_name: Option<String>,
    #[serde(default)]
    deal_trend_infos: Vec<DealTrendInfo>,
    #[serde(default)]
    total_infos: Vec<TotalInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealTrendInfo {
    #[serde(default)]
    close_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TotalInfo {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

impl IntegrationResponse {
    fn total_info(&self, code: &str) -> Option<String> {
        self.total_infos
            .iter()
            .find(|i| i.code.as_deref() == Some(code))
            .and_then(|i| i.value.clone())
    }

    fn into_fundamentals(self, code: &str) -> Result<Fundamentals> {
        let name = self
            .stock_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MacroError::DataUnavailable(format!("no stock found for code {code}")))?
            .to_string();

        Ok(Fundamentals {
            code: code.to_string(),
            name,
            price: self.deal_trend_infos.first().and_then(|d| d.close_price.clone()),
            market_cap: self.total_info("marketValue"),
            per: self.total_info("per"),
            pbr: self.total_info("pbr"),
        })
    }
}

struct CachedFundamentals {
    value: Fundamentals,
    stored_at: Instant,
}

/// Naver mobile stock "integration" endpoint. Transient failures are retried;
/// when every attempt fails, a value fetched within the cache TTL is served
/// instead of the error.
pub struct NaverStockClient {
    http: reqwest::Client,
    base_url: String,
    backoff: [Duration; MAX_ATTEMPTS],
    cache_ttl: Duration,
    last_good: Mutex<HashMap<String, CachedFundamentals>>,
}

impl NaverStockClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(Provider::NaverStock, timeout)?,
            base_url: base_url.into(),
            backoff: [
                Duration::ZERO,
                Duration::from_millis(300),
                Duration::from_millis(800),
            ],
            cache_ttl: CACHE_TTL,
            last_good: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout_secs = env_parse::<u64>("STOCK_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self::new(
            settings.stock_base_url.clone(),
            Duration::from_secs(timeout_secs),
        )?)
    }

    /// Waits before each attempt, first one included.
    pub fn with_backoff(mut self, backoff: [Duration; MAX_ATTEMPTS]) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(MOBILE_UA));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        headers.insert(REFERER, HeaderValue::from_static("https://m.stock.naver.com/"));
        headers
    }

    fn url(&self, code: &str) -> String {
        format!(
            "{}/api/stock/{code}/integration",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn fetch_once(&self, code: &str) -> std::result::Result<Fundamentals, AttemptError> {
        let res = self
            .http
            .get(self.url(code))
            .headers(Self::headers())
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(transport_error(Provider::NaverStock, e)))?;

        let (status, text) = read_body(Provider::NaverStock, res)
            .await
            .map_err(AttemptError::Retryable)?;

        if status == StatusCode::NOT_FOUND {
            return Err(AttemptError::Final(MacroError::DataUnavailable(format!(
                "no stock found for code {code}"
            ))));
        }
        if !status.is_success() {
            let err: MacroError =
                ProviderError::new(Provider::NaverStock, "http", format!("code={code} status={status}"))
                    .with_raw_output(text)
                    .into();
            return Err(AttemptError::for_status(status, err));
        }
        if text.trim().is_empty() {
            return Err(AttemptError::Retryable(
                ProviderError::new(Provider::NaverStock, "payload", "empty response body").into(),
            ));
        }

        let parsed: IntegrationResponse = serde_json::from_str(&text).map_err(|e| {
            AttemptError::Final(
                ProviderError::new(Provider::NaverStock, "decode", e.to_string())
                    .with_raw_output(text.clone())
                    .into(),
            )
        })?;
        parsed.into_fundamentals(code).map_err(AttemptError::Final)
    }

    /// Last good value within the TTL. An expired entry is dropped.
    fn cached(&self, code: &str) -> Option<Fundamentals> {
        let mut cache = self.last_good.lock().ok()?;
        let fresh = cache.get(code)?.stored_at.elapsed() <= self.cache_ttl;
        if !fresh {
            cache.remove(code);
            return None;
        }
        cache.get(code).map(|c| c.value.clone())
    }

    fn remember(&self, value: &Fundamentals) {
        if let Ok(mut cache) = self.last_good.lock() {
            cache.insert(
                value.code.clone(),
                CachedFundamentals {
                    value: value.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

fn validate_code(code: &str) -> Result<&str> {
    let code = code.trim();
    ensure_valid!(!code.is_empty(), "stock code must be non-empty");
    ensure_valid!(
        code.len() <= MAX_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric()),
        "stock code must be alphanumeric: {code:?}"
    );
    Ok(code)
}

#[async_trait::async_trait]
impl FundamentalsProvider for NaverStockClient {
    async fn fetch(&self, code: &str) -> Result<Fundamentals> {
        let code = validate_code(code)?;

        let mut last_err = None;
        for (attempt, wait) in self.backoff.iter().enumerate() {
            if !wait.is_zero() {
                tokio::time::sleep(*wait).await;
            }
            match self.fetch_once(code).await {
                Ok(value) => {
                    self.remember(&value);
                    return Ok(value);
                }
                Err(AttemptError::Final(err)) => return Err(err),
                Err(AttemptError::Retryable(err)) => {
                    tracing::warn!(attempt = attempt + 1, code, error = %err, "stock fetch failed; retrying");
                    last_err = Some(err);
                }
            }
        }

        if let Some(value) = self.cached(code) {
            tracing::warn!(code, "stock fetch exhausted retries; serving cached value");
            return Ok(value);
        }
        Err(last_err.unwrap_or_else(|| {
            ProviderError::new(Provider::NaverStock, "request", "no attempts made").into()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> NaverStockClient {
        NaverStockClient::new(server.uri(), Duration::from_secs(5))
            .unwrap()
            .with_backoff([Duration::ZERO; MAX_ATTEMPTS])
    }

    fn samsung() -> serde_json::Value {
        json!({
            "stockName": "삼성전자",
            "dealTrendInfos": [{"closePrice": "71,500"}, {"closePrice": "70,900"}],
            "totalInfos": [
                {"code": "marketValue", "value": "426조 8,443억"},
                {"code": "per", "value": "13.52배"},
                {"code": "pbr", "value": "1.12배"}
            ]
        })
    }

    #[tokio::test]
    async fn maps_integration_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stock/005930/integration"))
            .and(header("referer", "https://m.stock.naver.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(samsung()))
            .mount(&server)
            .await;

        let f = client(&server).fetch("005930").await.unwrap();
        assert_eq!(f.code, "005930");
        assert_eq!(f.name, "삼성전자");
        assert_eq!(f.price.as_deref(), Some("71,500"));
        assert_eq!(f.market_cap.as_deref(), Some("426조 8,443억"));
        assert_eq!(f.per.as_deref(), Some("13.52배"));
        assert_eq!(f.pbr.as_deref(), Some("1.12배"));
    }

    #[tokio::test]
    async fn retries_transient_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(samsung()))
            .expect(1)
            .mount(&server)
            .await;

        let f = client(&server).fetch("005930").await.unwrap();
        assert_eq!(f.name, "삼성전자");
    }

    #[tokio::test]
    async fn unknown_code_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch("999999").await.unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[tokio::test]
    async fn body_without_name_is_data_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalInfos": []})))
            .mount(&server)
            .await;

        let err = client(&server).fetch("000000").await.unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[tokio::test]
    async fn rejects_path_like_codes() {
        let server = MockServer::start().await;
        let err = client(&server).fetch("../admin").await.unwrap_err();
        assert!(matches!(err, MacroError::Validation(_)));
    }

    #[tokio::test]
    async fn serves_last_good_value_when_retries_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(samsung()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.fetch("005930").await.unwrap();
        let second = client.fetch("005930").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn expired_cache_surfaces_the_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(samsung()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client(&server).with_cache_ttl(Duration::ZERO);
        client.fetch("005930").await.unwrap();
        assert!(client.last_good.lock().unwrap().contains_key("005930"));

        tokio::time::sleep(Duration::from_millis(5)).await;
        let err = client.fetch("005930").await.unwrap_err();
        assert!(matches!(err, MacroError::Provider(_)));
        assert!(client.last_good.lock().unwrap().is_empty());
    }
}
