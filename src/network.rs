use std::time::Duration;

use tokio::time::timeout;

use crate::config::Config;

/// Browser-like user agent; the proxies forward it to the origin, and
/// AliExpress serves gutted pages to obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client shared by the resolver and the proxy fetcher.
///
/// Timeouts are applied per request by the caller since short-link resolution
/// and content fetches use different budgets.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(Config::CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(5))
            .http1_only()
            .tcp_nodelay(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch a URL and return the response body as text.
    ///
    /// Requires HTTP success; both the request and the body read are bounded
    /// by `timeout_secs`. One attempt only - retry policy lives with the
    /// proxy chains, not here.
    pub async fn fetch_text(
        &self,
        url: &str,
        timeout_secs: u64,
    ) -> Result<FetchResult, FetchError> {
        let budget = Duration::from_secs(timeout_secs);

        let response = timeout(
            budget,
            self.client
                .get(url)
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.5")
                .send(),
        )
        .await
        .map_err(|_| FetchError::Timeout(timeout_secs))?
        .map_err(|e| FetchError::Network(e.to_string()))?;

        let status_code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::BadStatus(status_code));
        }

        let content = timeout(budget, response.text())
            .await
            .map_err(|_| FetchError::Timeout(timeout_secs))?
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(FetchResult {
            content,
            status_code,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a successful HTTP fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content: String,
    pub status_code: u16,
}

/// Errors from a single proxy attempt, plus the terminal chain failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Proxy returned status {0}")]
    BadStatus(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Response body too short ({0} chars)")]
    BodyTooShort(usize),

    #[error("All proxy backends failed; last error: {0}")]
    Exhausted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let client = HttpClient::new();
        let result = client.fetch_text("not-a-url", 5).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_error_messages_are_human_readable() {
        let err = FetchError::BadStatus(429);
        assert_eq!(err.to_string(), "Proxy returned status 429");
        let err = FetchError::Exhausted("Request timed out after 25s".to_string());
        assert!(err.to_string().contains("All proxy backends failed"));
    }
}
