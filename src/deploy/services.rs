//! Service lookup

use crate::api::{ServerlessApi, Sid};
use crate::error::{DeployError, Result};

/// Pick the service a deployment targets
///
/// A sid is used as given. Otherwise the service is looked up by unique name
/// and created when missing; an existing one is reused only with
/// `override_existing`.
pub async fn resolve_service(
    api: &dyn ServerlessApi,
    service_sid: Option<&str>,
    service_name: Option<&str>,
    override_existing: bool,
) -> Result<Sid> {
    if let Some(sid) = service_sid {
        return Ok(sid.to_string());
    }
    let Some(name) = service_name else {
        return Err(DeployError::Validation(
            "Either a service sid or a service name is required".to_string(),
        ));
    };

    let services = api.list_services().await.map_err(|e| {
        tracing::error!("Failed to list services: {:?}", e);
        DeployError::remote("Failed to fetch services", e)
    })?;

    if let Some(existing) = services.into_iter().find(|s| s.unique_name == name) {
        if !override_existing {
            return Err(DeployError::ServiceExists {
                name: name.to_string(),
                sid: existing.sid,
            });
        }
        tracing::info!("Deploying to existing service {} ({})", name, existing.sid);
        return Ok(existing.sid);
    }

    let created = api.create_service(name, name).await.map_err(|e| {
        tracing::error!("Failed to create service {}: {:?}", name, e);
        DeployError::remote(format!("Failed to create service \"{}\"", name), e)
    })?;

    tracing::info!("Created service {} ({})", name, created.sid);
    Ok(created.sid)
}
