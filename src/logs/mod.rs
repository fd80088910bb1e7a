//! Log tail
//!
//! Reads function logs for an environment, either one page or continuously.

pub mod stream;
pub mod types;

use std::sync::Arc;

use crate::api::{is_sid, ResourceKind, ServerlessApi, Sid};
use crate::config::LogDefaults;
use crate::deploy::resolve_environment;
use crate::error::{DeployError, Result};

pub use stream::{CancelHandle, LogStream};
pub use types::{LogTailConfig, LogsRequest};

/// Resolve the environment and open a log stream for it
///
/// The environment must already exist; it is never created here.
pub async fn open_log_stream(
    api: Arc<dyn ServerlessApi>,
    request: LogsRequest,
    defaults: &LogDefaults,
) -> Result<LogStream> {
    let environment =
        resolve_environment(api.as_ref(), &request.service_sid, &request.environment, false)
            .await?;

    let function_sid = match request.filter_by_function.as_deref() {
        Some(function) => {
            Some(resolve_function(api.as_ref(), &request.service_sid, function).await?)
        }
        None => None,
    };

    let config = LogTailConfig::new(&request, environment.sid, function_sid, defaults);
    tracing::info!(
        service = %config.service_sid,
        environment = %config.environment_sid,
        tail = config.tail,
        "Opening log stream"
    );
    Ok(LogStream::new(api, config))
}

/// Function sid for a sid or friendly name
async fn resolve_function(
    api: &dyn ServerlessApi,
    service_sid: &str,
    name_or_sid: &str,
) -> Result<Sid> {
    if is_sid(name_or_sid, "ZH") {
        return Ok(name_or_sid.to_string());
    }

    let functions = api
        .list_resources(ResourceKind::Function, service_sid)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list functions: {:?}", e);
            DeployError::remote("Failed to fetch functions", e)
        })?;

    functions
        .into_iter()
        .find(|f| f.friendly_name == name_or_sid)
        .map(|f| f.sid)
        .ok_or_else(|| DeployError::FunctionNotFound(name_or_sid.to_string()))
}
