// src/config/research.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::research::retry::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "RESEARCH_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/research.toml";
pub const DEFAULT_JSON_PATH: &str = "config/research.json";

fn default_true() -> bool {
    true
}
fn default_adapter_timeout_ms() -> u64 {
    15_000
}

/// Provider credentials. An adapter is enabled iff its credential is non-empty.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub newsapi_key: String,
    #[serde(default)]
    pub gnews_api_key: String,
    #[serde(default)]
    pub hunter_api_key: String,
    #[serde(default)]
    pub brandfetch_api_key: String,
    #[serde(default)]
    pub opencorporates_api_key: String,
    #[serde(default)]
    pub linkedin_access_token: String,
}

impl Credentials {
    /// Fill empty credentials from the environment; explicit file values win.
    pub fn apply_env(&mut self) {
        for (slot, var) in [
            (&mut self.newsapi_key, "NEWSAPI_KEY"),
            (&mut self.gnews_api_key, "GNEWS_API_KEY"),
            (&mut self.hunter_api_key, "HUNTER_API_KEY"),
            (&mut self.brandfetch_api_key, "BRANDFETCH_API_KEY"),
            (&mut self.opencorporates_api_key, "OPENCORPORATES_API_KEY"),
            (&mut self.linkedin_access_token, "LINKEDIN_ACCESS_TOKEN"),
        ] {
            if slot.trim().is_empty() {
                if let Ok(v) = std::env::var(var) {
                    *slot = v.trim().to_string();
                }
            }
        }
    }
}

// Never print secrets; key lengths are enough for diagnostics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("newsapi_key_len", &self.newsapi_key.len())
            .field("gnews_api_key_len", &self.gnews_api_key.len())
            .field("hunter_api_key_len", &self.hunter_api_key.len())
            .field("brandfetch_api_key_len", &self.brandfetch_api_key.len())
            .field("opencorporates_api_key_len", &self.opencorporates_api_key.len())
            .field("linkedin_access_token_len", &self.linkedin_access_token.len())
            .finish()
    }
}

/// Provider base URLs. Overridable so tests can point adapters at a local server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub newsapi: String,
    pub gnews: String,
    pub hunter: String,
    pub brandfetch: String,
    pub opencorporates: String,
    pub linkedin: String,
    /// Scheme used when scraping a bare domain.
    pub scraper_scheme: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            newsapi: "https://newsapi.org/v2".into(),
            gnews: "https://gnews.io/api/v4".into(),
            hunter: "https://api.hunter.io/v2".into(),
            brandfetch: "https://api.brandfetch.io/v2".into(),
            opencorporates: "https://api.opencorporates.com/v0.4".into(),
            linkedin: "https://api.linkedin.com/v2".into(),
            scraper_scheme: "https".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    /// Browser-like agent for the page scraper; some sites reject API clients.
    pub scraper_user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 4_000,
            request_timeout_ms: 10_000,
            user_agent: "account-research/0.1".into(),
            scraper_user_agent:
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    pub days_back: i64,
    pub limit: usize,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            days_back: 30,
            limit: 15,
        }
    }
}

/// Everything the aggregator and adapters need, built once at startup and
/// passed in explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Upper bound for one adapter call, retries included.
    #[serde(default = "default_adapter_timeout_ms")]
    pub adapter_timeout_ms: u64,
    #[serde(default)]
    pub news: NewsSettings,
    /// Scrape the company site on every request (for social links), not only as fallback.
    #[serde(default = "default_true")]
    pub scrape_always: bool,
    #[serde(default = "default_true")]
    pub scraper_enabled: bool,
    /// JSON priority table; built-in seed when absent or unreadable.
    #[serde(default)]
    pub priorities_path: Option<PathBuf>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            endpoints: Endpoints::default(),
            http: HttpSettings::default(),
            retry: RetryPolicy::default(),
            adapter_timeout_ms: default_adapter_timeout_ms(),
            news: NewsSettings::default(),
            scrape_always: true,
            scraper_enabled: true,
            priorities_path: None,
        }
    }
}

impl ResearchConfig {
    /// Defaults plus credentials from the environment.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.credentials.apply_env();
        cfg
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading research config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing research config {}", path.display()))?;
        cfg.credentials.apply_env();
        Ok(cfg)
    }

    /// Resolve config using env var + fallbacks:
    /// 1) $RESEARCH_CONFIG_PATH
    /// 2) config/research.toml
    /// 3) config/research.json
    /// 4) defaults + environment
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::from_env())
    }

    pub fn adapter_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.adapter_timeout_ms.max(1))
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ResearchConfig> {
    // JSON when hinted or when the content looks like an object.
    let try_json = hint_ext == "json" || s.trim_start().starts_with('{');
    if try_json {
        if let Ok(v) = serde_json::from_str::<ResearchConfig>(s) {
            return Ok(v);
        }
    }
    match toml::from_str::<ResearchConfig>(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => {
            if !try_json {
                if let Ok(v) = serde_json::from_str::<ResearchConfig>(s) {
                    return Ok(v);
                }
            }
            Err(anyhow!("unsupported research config format: {toml_err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_formats_work() {
        let toml = r#"
            adapter_timeout_ms = 5000
            scrape_always = false

            [credentials]
            hunter_api_key = "h-key"

            [retry]
            max_attempts = 5
        "#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.adapter_timeout_ms, 5000);
        assert!(!cfg.scrape_always);
        assert!(cfg.scraper_enabled);
        assert_eq!(cfg.credentials.hunter_api_key, "h-key");
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.base_delay_ms, 1_000);

        let json = r#"{"news": {"days_back": 7, "limit": 3}}"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(cfg.news.limit, 3);
        assert_eq!(cfg.adapter_timeout_ms, 15_000);
        assert_eq!(cfg.endpoints.hunter, "https://api.hunter.io/v2");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_config("adapter_timeout_ms = [", "toml").is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials {
            hunter_api_key: "super-secret".into(),
            ..Credentials::default()
        };
        let s = format!("{creds:?}");
        assert!(!s.contains("super-secret"));
        assert!(s.contains("hunter_api_key_len: 12"));
    }
}
