//! MineOS App Market API client

use bi_response_cache::{Method, Params, Upstream};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;
use url::Url;

#[derive(Debug)]
pub enum UpstreamError {
    Http(Box<reqwest::Error>),
    Status { status: u16, url: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Http(err) => write!(f, "HTTP error: {}", err),
            UpstreamError::Status { status, url } => {
                write!(f, "Upstream returned status {} for {}", status, url)
            }
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstreamError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Http(Box::new(err))
    }
}

/// HTTP client for the market API scripts
pub struct MarketClient {
    client: Client,
    base_url: Url,
}

impl MarketClient {
    pub fn new(base_url: Url, user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, base_url })
    }

    /// Full URL of a script, e.g. `<base>/Search.php`
    pub fn script_url(&self, script: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            script
        )
    }
}

impl Upstream for MarketClient {
    type Error = UpstreamError;

    async fn fetch(
        &self,
        endpoint: &str,
        method: Method,
        params: &Params,
    ) -> Result<Vec<u8>, UpstreamError> {
        let url = self.script_url(endpoint);
        debug!(url = %url, %method, "Fetching from upstream");

        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url).body(encode_form(params)),
        };
        let response = request
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "Upstream request failed");
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.bytes().await?.to_vec();
        debug!(url = %url, size = body.len(), "Fetched from upstream");
        Ok(body)
    }
}

/// Encode params as an `application/x-www-form-urlencoded` body
pub fn encode_form(params: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client(base: &str) -> MarketClient {
        MarketClient::new(Url::parse(base).unwrap(), "test-agent", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_script_url() {
        let client = make_client("http://mineos.buttex.ru/MineOSAPI/2.04");
        assert_eq!(
            client.script_url("Search.php"),
            "http://mineos.buttex.ru/MineOSAPI/2.04/Search.php"
        );

        let client = make_client("http://localhost:9000");
        assert_eq!(client.script_url("Search.php"), "http://localhost:9000/Search.php");
    }

    #[test]
    fn test_encode_form() {
        let mut params = Params::new();
        params.insert("search".to_string(), "hello world".to_string());
        params.insert("category".to_string(), "1".to_string());
        assert_eq!(encode_form(&params), "category=1&search=hello+world");
    }

    #[test]
    fn test_status_error_display() {
        let err = UpstreamError::Status {
            status: 503,
            url: "http://example.com/Search.php".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Upstream returned status 503 for http://example.com/Search.php"
        );
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_http_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = make_client("http://127.0.0.1:9");
        let err = client
            .fetch("Search.php", Method::Get, &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Http(_)));
    }
}
