//! Build trigger, status polling and activation

use tokio::time::{sleep, Instant};

use crate::api::{BuildRecord, BuildRequest, BuildStatus, DeploymentRecord, ServerlessApi};
use crate::config::BuildPollConfig;
use crate::error::{DeployError, Result};

/// Start a build from uploaded versions
pub async fn trigger_build(
    api: &dyn ServerlessApi,
    service_sid: &str,
    request: &BuildRequest,
) -> Result<BuildRecord> {
    let build = api.create_build(service_sid, request).await.map_err(|e| {
        tracing::error!("Failed to create build: {:?}", e);
        DeployError::remote("Failed to create build", e)
    })?;

    tracing::info!(
        build_sid = %build.sid,
        functions = request.function_versions.len(),
        assets = request.asset_versions.len(),
        "Build started"
    );
    Ok(build)
}

/// Poll until the build completes, fails or the timeout runs out
pub async fn wait_for_build(
    api: &dyn ServerlessApi,
    service_sid: &str,
    build_sid: &str,
    poll: &BuildPollConfig,
) -> Result<()> {
    let started = Instant::now();

    loop {
        let status = api
            .fetch_build_status(service_sid, build_sid)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch status of build {}: {:?}", build_sid, e);
                DeployError::remote(format!("Failed to fetch status of build {}", build_sid), e)
            })?;

        match status {
            BuildStatus::Completed => {
                tracing::info!("Build {} completed in {:?}", build_sid, started.elapsed());
                return Ok(());
            }
            BuildStatus::Failed => {
                return Err(DeployError::BuildFailed {
                    build_sid: build_sid.to_string(),
                });
            }
            BuildStatus::Building | BuildStatus::Unknown => {
                tracing::debug!("Build {} status: {:?}", build_sid, status);
            }
        }

        let waited = started.elapsed();
        if waited + poll.interval > poll.timeout {
            return Err(DeployError::BuildTimeout {
                build_sid: build_sid.to_string(),
                waited,
            });
        }

        sleep(poll.interval).await;
    }
}

/// Make a build live in an environment
pub async fn activate(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
    build_sid: &str,
) -> Result<DeploymentRecord> {
    let deployment = api
        .create_deployment(service_sid, environment_sid, build_sid)
        .await
        .map_err(|e| {
            tracing::error!("Failed to activate build {}: {:?}", build_sid, e);
            DeployError::remote(
                format!("Failed to activate build {} in {}", build_sid, environment_sid),
                e,
            )
        })?;

    tracing::info!(
        "Activated build {} in {} ({})",
        build_sid,
        environment_sid,
        deployment.sid
    );
    Ok(deployment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{Call, MockApi};
    use std::time::Duration;

    fn poll() -> BuildPollConfig {
        BuildPollConfig {
            interval: Duration::from_millis(1000),
            timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_completed() {
        let api = MockApi::new().with_build_statuses(&[
            BuildStatus::Building,
            BuildStatus::Building,
            BuildStatus::Completed,
        ]);

        wait_for_build(&api, "ZS1", "ZB1", &poll()).await.unwrap();

        assert_eq!(api.count(|c| matches!(c, Call::FetchBuildStatus(_))), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_build() {
        let api = MockApi::new().with_build_statuses(&[BuildStatus::Building, BuildStatus::Failed]);

        let err = wait_for_build(&api, "ZS1", "ZB1", &poll()).await.unwrap_err();
        assert!(matches!(err, DeployError::BuildFailed { ref build_sid } if build_sid == "ZB1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let api = MockApi::new().with_build_statuses(&[BuildStatus::Building; 50]);

        let err = wait_for_build(&api, "ZS1", "ZB1", &poll()).await.unwrap_err();

        assert!(matches!(err, DeployError::BuildTimeout { .. }));
        assert!(api.count(|c| matches!(c, Call::FetchBuildStatus(_))) <= 11);
    }

    #[tokio::test]
    async fn test_activate_creates_deployment() {
        let api = MockApi::new();
        let deployment = activate(&api, "ZS1", "ZE1", "ZB1").await.unwrap();

        assert_eq!(deployment.build_sid.as_deref(), Some("ZB1"));
        assert_eq!(
            api.calls(),
            vec![Call::CreateDeployment("ZE1".to_string(), "ZB1".to_string())]
        );
    }
}
