//! Log tailing types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::Sid;
use crate::config::LogDefaults;

/// What to read logs for, as given by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsRequest {
    pub service_sid: Sid,
    /// Environment sid or unique name
    pub environment: String,
    /// Keep polling until cancelled
    #[serde(default)]
    pub tail: bool,
    /// Page size override
    #[serde(default)]
    pub limit: Option<u32>,
    /// Only logs from this function, by sid or friendly name
    #[serde(default)]
    pub filter_by_function: Option<String>,
}

/// Fully resolved settings for one log stream
#[derive(Debug, Clone)]
pub struct LogTailConfig {
    pub service_sid: Sid,
    pub environment_sid: Sid,
    pub tail: bool,
    pub function_sid: Option<Sid>,
    pub page_size: u32,
    pub poll_interval: Duration,
}

impl LogTailConfig {
    pub fn new(
        request: &LogsRequest,
        environment_sid: impl Into<Sid>,
        function_sid: Option<Sid>,
        defaults: &LogDefaults,
    ) -> Self {
        Self {
            service_sid: request.service_sid.clone(),
            environment_sid: environment_sid.into(),
            tail: request.tail,
            function_sid,
            page_size: request.limit.unwrap_or(defaults.page_size),
            poll_interval: defaults.poll_interval,
        }
    }
}
