//! Configuration management for Serverless Deploy

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::deploy::UploadStrategy;

/// Default API host prefix
const API_HOST_PREFIX: &str = "serverless";

/// Host prefix for version uploads
const UPLOAD_HOST_PREFIX: &str = "serverless-upload";

/// Region assumed when only an edge is configured
const DEFAULT_REGION: &str = "us1";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    pub upload_strategy: UploadStrategy,
    pub build_poll: BuildPollConfig,
    pub logs: LogDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub region: Option<String>,
    pub edge: Option<String>,
    /// Overrides the derived API base URL
    pub base_url: Option<String>,
    /// Overrides the derived upload base URL
    pub upload_base_url: Option<String>,
}

/// Build status polling
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BuildPollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Instance defaults for log streams
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LogDefaults {
    pub poll_interval: Duration,
    pub page_size: u32,
}

impl Default for BuildPollConfig {
    fn default() -> Self {
        BuildPollConfig {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(600),
        }
    }
}

impl Default for LogDefaults {
    fn default() -> Self {
        LogDefaults {
            poll_interval: Duration::from_millis(1000),
            page_size: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client: ClientConfig {
                account_sid: String::new(),
                auth_token: String::new(),
                region: None,
                edge: None,
                base_url: None,
                upload_base_url: None,
            },
            upload_strategy: UploadStrategy::Inline,
            build_poll: BuildPollConfig::default(),
            logs: LogDefaults::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        ClientConfig {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            region: None,
            edge: None,
            base_url: None,
            upload_base_url: None,
        }
    }

    /// Base URL for regular API calls
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.host_url(API_HOST_PREFIX))
    }

    /// Base URL for version uploads
    pub fn upload_base_url(&self) -> String {
        self.upload_base_url
            .clone()
            .unwrap_or_else(|| self.host_url(UPLOAD_HOST_PREFIX))
    }

    fn host_url(&self, prefix: &str) -> String {
        let region = match (&self.edge, &self.region) {
            (_, Some(region)) => Some(region.as_str()),
            (Some(_), None) => Some(DEFAULT_REGION),
            (None, None) => None,
        };

        let mut host = prefix.to_string();
        if let Some(edge) = &self.edge {
            host.push('.');
            host.push_str(edge);
        }
        if let Some(region) = region {
            host.push('.');
            host.push_str(region);
        }

        format!("https://{}.twilio.com/v1", host)
    }
}

impl Config {
    /// Load configuration from `SERVERLESS_*` environment variables
    ///
    /// Credentials are required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            client: ClientConfig {
                account_sid: env::var("SERVERLESS_ACCOUNT_SID")?,
                auth_token: env::var("SERVERLESS_AUTH_TOKEN")?,
                region: env::var("SERVERLESS_REGION").ok(),
                edge: env::var("SERVERLESS_EDGE").ok(),
                base_url: env::var("SERVERLESS_BASE_URL").ok(),
                upload_base_url: env::var("SERVERLESS_UPLOAD_BASE_URL").ok(),
            },
            upload_strategy: match env::var("SERVERLESS_UPLOAD_STRATEGY")
                .unwrap_or_default()
                .to_lowercase()
                .as_str()
            {
                "presigned" => UploadStrategy::PreSigned,
                _ => UploadStrategy::Inline,
            },
            build_poll: BuildPollConfig {
                interval: env_millis("SERVERLESS_BUILD_POLL_MS")
                    .unwrap_or(defaults.build_poll.interval),
                timeout: env::var("SERVERLESS_BUILD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.build_poll.timeout),
            },
            logs: LogDefaults {
                poll_interval: env_millis("SERVERLESS_LOG_POLL_MS")
                    .unwrap_or(defaults.logs.poll_interval),
                page_size: env::var("SERVERLESS_LOG_PAGE_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.logs.page_size),
            },
        })
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
}
