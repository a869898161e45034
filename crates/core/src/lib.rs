pub mod cache;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fundamentals;
mod http;
pub mod ingest;
pub mod llm;
pub mod publish;
pub mod scheduler;
pub mod storage;
pub mod time;
pub mod views;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEFAULT_DECISION_MODEL: &str = "gpt-4.1-mini";
    pub const DEFAULT_REPORT_MODEL: &str = "gpt-5-mini";
    pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";
    pub const DEFAULT_STOCK_BASE_URL: &str = "https://m.stock.naver.com";
    pub const DEFAULT_REPORT_STORAGE_ROOT: &str = "data/reports";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openai_api_key: Option<String>,
        pub openai_base_url: String,
        pub openai_model: String,
        pub openai_report_model: String,
        pub fred_api_key: Option<String>,
        pub fred_base_url: String,
        pub pmi_mfg_series: Option<String>,
        pub pmi_svcs_series: Option<String>,
        pub stock_base_url: String,
        pub report_storage_root: String,
        pub prompt_dir: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                openai_api_key: non_empty_env("OPENAI_API_KEY"),
                openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                openai_model: env_or("OPENAI_MODEL", DEFAULT_DECISION_MODEL),
                openai_report_model: env_or("OPENAI_REPORT_MODEL", DEFAULT_REPORT_MODEL),
                fred_api_key: non_empty_env("FRED_API_KEY"),
                fred_base_url: env_or("FRED_BASE_URL", DEFAULT_FRED_BASE_URL),
                pmi_mfg_series: non_empty_env("MACRO_PMI_MFG_SERIES"),
                pmi_svcs_series: non_empty_env("MACRO_PMI_SVCS_SERIES"),
                stock_base_url: env_or("STOCK_BASE_URL", DEFAULT_STOCK_BASE_URL),
                report_storage_root: env_or("REPORT_STORAGE_ROOT", DEFAULT_REPORT_STORAGE_ROOT),
                prompt_dir: non_empty_env("PROMPT_DIR"),
                sentry_dsn: non_empty_env("SENTRY_DSN"),
            })
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_fred_api_key(&self) -> anyhow::Result<&str> {
            self.fred_api_key
                .as_deref()
                .context("FRED_API_KEY is required")
        }
    }

    /// Reads a numeric override such as `OPENAI_TIMEOUT_SECS`.
    pub fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

    fn non_empty_env(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn env_or(key: &str, default: &str) -> String {
        non_empty_env(key).unwrap_or_else(|| default.to_string())
    }
}
