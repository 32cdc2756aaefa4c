use crate::error::{ProxyError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_UPSTREAM_URL: &str = "http://mineos.buttex.ru/MineOSAPI/2.04";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_3) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/64.0.3282.119 Safari/537.36";
const DATA_DIR_NAME: &str = "market_proxy";

/// Proxy configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub upstream_url: Url,
    pub decay: Duration,
    pub serialize_endpoints: bool,
    pub upstream_timeout: Duration,
    pub user_agent: String,
}

impl Config {
    /// Parse configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir(&lookup));

        let raw_url = lookup("UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ProxyError::Config(format!("invalid UPSTREAM_URL {:?}: {}", raw_url, e)))?;

        let decay_secs = lookup("DECAY_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(24 * 60 * 60);

        let serialize_endpoints = lookup("SERIALIZE_ENDPOINTS")
            .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        let timeout_secs = lookup("UPSTREAM_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let user_agent = lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self {
            port,
            data_dir,
            upstream_url,
            decay: Duration::from_secs(decay_secs),
            serialize_endpoints,
            upstream_timeout: Duration::from_secs(timeout_secs),
            user_agent,
        })
    }
}

/// `$XDG_DATA_HOME/market_proxy`, falling back to `~/.local/share`
fn default_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    let data_home = lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."));
    data_home.join(DATA_DIR_NAME)
}
