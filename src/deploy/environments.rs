//! Environment lookup

use crate::api::{is_sid, EnvironmentResource, ServerlessApi};
use crate::error::{DeployError, Result};

/// Whether a value has the shape of an environment sid
pub fn is_environment_sid(value: &str) -> bool {
    is_sid(value, "ZE")
}

/// Find an environment by sid, unique name or domain suffix
///
/// With `create_if_missing`, an unknown name is created using the same value
/// as unique name and domain suffix.
pub async fn resolve_environment(
    api: &dyn ServerlessApi,
    service_sid: &str,
    name_or_sid: &str,
    create_if_missing: bool,
) -> Result<EnvironmentResource> {
    let environments = api.list_environments(service_sid).await.map_err(|e| {
        tracing::error!("Failed to list environments: {:?}", e);
        DeployError::remote("Failed to fetch environments", e)
    })?;

    let by_sid = is_environment_sid(name_or_sid);
    let found = environments.into_iter().find(|env| {
        if by_sid {
            env.sid == name_or_sid
        } else {
            env.unique_name == name_or_sid || env.domain_suffix.as_deref() == Some(name_or_sid)
        }
    });

    match found {
        Some(env) => Ok(env),
        None if create_if_missing && !by_sid => {
            tracing::info!("Creating environment \"{}\"", name_or_sid);
            api.create_environment(service_sid, name_or_sid, name_or_sid)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create environment {}: {:?}", name_or_sid, e);
                    DeployError::remote(
                        format!("Failed to create environment \"{}\"", name_or_sid),
                        e,
                    )
                })
        }
        None => Err(DeployError::EnvironmentNotFound(name_or_sid.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{Call, MockApi};

    const SID: &str = "ZE0123456789abcdef0123456789abcdef";

    #[test]
    fn test_environment_sid_shape() {
        assert!(is_environment_sid(SID));
        assert!(!is_environment_sid("dev"));
        assert!(!is_environment_sid("ZE123"));
        assert!(!is_environment_sid("ZS0123456789abcdef0123456789abcdef"));
    }

    #[tokio::test]
    async fn test_finds_by_sid_and_name() {
        let api = MockApi::new()
            .with_environment(SID, "staging", None)
            .with_environment("ZE2", "dev", None);

        let by_sid = resolve_environment(&api, "ZS1", SID, false).await.unwrap();
        let by_name = resolve_environment(&api, "ZS1", "dev", false).await.unwrap();

        assert_eq!(by_sid.unique_name, "staging");
        assert_eq!(by_name.sid, "ZE2");
    }

    #[tokio::test]
    async fn test_missing_environment() {
        let api = MockApi::new();

        let err = resolve_environment(&api, "ZS1", "prod", false).await.unwrap_err();
        assert!(matches!(err, DeployError::EnvironmentNotFound(ref name) if name == "prod"));
        assert_eq!(api.count(|c| matches!(c, Call::CreateEnvironment(_))), 0);
    }

    #[tokio::test]
    async fn test_creates_when_allowed() {
        let api = MockApi::new();

        let env = resolve_environment(&api, "ZS1", "stage3", true).await.unwrap();

        assert_eq!(env.unique_name, "stage3");
        assert!(api.calls().contains(&Call::CreateEnvironment("stage3".to_string())));
    }
}
