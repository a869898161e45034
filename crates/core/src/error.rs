//! Error taxonomy shared by the pipeline.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = MacroError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Fred,
    NaverStock,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::Fred => "fred",
            Provider::NaverStock => "naver_stock",
        };
        f.write_str(name)
    }
}

/// Failure talking to an external dependency, with enough context to debug
/// the exchange after the fact.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl ProviderError {
    pub fn new(provider: Provider, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw: impl Into<String>) -> Self {
        self.raw_output = Some(raw.into());
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "provider error (provider={}, stage={}): {}",
            self.provider, self.stage, self.detail
        )
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Error)]
pub enum MacroError {
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage {op} failed for {}: {source}", path.display())]
    Storage {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MacroError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MacroError::Validation(msg.into())
    }

    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, MacroError::DataUnavailable(_))
    }
}

/// `ensure!` for validation failures.
macro_rules! ensure_valid {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::MacroError::Validation(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_valid;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_stage() {
        let err: MacroError = ProviderError::new(Provider::OpenAi, "http", "status=503").into();
        assert_eq!(
            err.to_string(),
            "provider error (provider=openai, stage=http): status=503"
        );
    }

    #[test]
    fn storage_error_names_the_path() {
        let err = MacroError::Storage {
            op: "read",
            path: PathBuf::from("data/reports/20261019.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("data/reports/20261019.md"));
    }
}
