use crate::error::{MacroError, Provider, ProviderError, Result};
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Response bodies larger than this are refused rather than buffered.
pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

pub(crate) fn build_client(provider: Provider, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::new(provider, "client", e.to_string()).into())
}

pub(crate) fn transport_error(provider: Provider, err: reqwest::Error) -> MacroError {
    let stage = if err.is_timeout() { "timeout" } else { "request" };
    ProviderError::new(provider, stage, err.to_string()).into()
}

/// Reads the body as text, enforcing [`MAX_RESPONSE_BYTES`].
pub(crate) async fn read_body(
    provider: Provider,
    res: reqwest::Response,
) -> Result<(StatusCode, String)> {
    let status = res.status();
    if let Some(len) = res.content_length() {
        if len as usize > MAX_RESPONSE_BYTES {
            return Err(ProviderError::new(
                provider,
                "payload",
                format!("response too large: {len} bytes"),
            )
            .into());
        }
    }

    let bytes = res.bytes().await.map_err(|e| transport_error(provider, e))?;
    if bytes.len() > MAX_RESPONSE_BYTES {
        return Err(ProviderError::new(
            provider,
            "payload",
            format!("response too large: {} bytes", bytes.len()),
        )
        .into());
    }

    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}

/// 409, 429 and 5xx are worth another attempt; other statuses are final.
pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::CONFLICT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Outcome of one failed attempt: whether another attempt could help.
pub(crate) enum AttemptError {
    Retryable(MacroError),
    Final(MacroError),
}

impl AttemptError {
    /// Classifies a non-2xx response by [`is_retryable`].
    pub(crate) fn for_status(status: StatusCode, err: MacroError) -> Self {
        if is_retryable(status) {
            AttemptError::Retryable(err)
        } else {
            AttemptError::Final(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::CONFLICT));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
