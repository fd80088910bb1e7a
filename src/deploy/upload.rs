//! Content upload strategies
//!
//! Inline uploads post the bytes as multipart with the version request.
//! Pre-signed uploads first create the version, then push the bytes to the
//! storage URL it hands back.

use serde::{Deserialize, Serialize};

use crate::api::{Access, ResourceKind, ServerlessApi, Sid, VersionContent, VersionRequest};
use crate::content_type::resolve_content_type;
use crate::error::{ApiError, DeployError, Result};

use super::types::ResourceDescriptor;

/// How version content reaches the service
///
/// Chosen once per deployment from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStrategy {
    /// Multipart body on the version request
    #[default]
    Inline,
    /// Version request first, then a PUT to a pre-signed storage URL
    PreSigned,
}

/// Reject access levels a resource kind does not support
///
/// Runs before any network call.
pub fn validate_access(kind: ResourceKind, descriptor: &ResourceDescriptor) -> Result<()> {
    if kind == ResourceKind::Asset && descriptor.access == Access::Protected {
        return Err(DeployError::Validation(format!(
            "Asset {} cannot be \"protected\".\nPlease change it to have \"private\" or \"public\" access.",
            descriptor.name
        )));
    }
    Ok(())
}

/// Upload a new version of a reconciled resource and return its version sid
pub async fn upload_resource(
    api: &dyn ServerlessApi,
    strategy: UploadStrategy,
    kind: ResourceKind,
    service_sid: &str,
    descriptor: &ResourceDescriptor,
) -> Result<Sid> {
    validate_access(kind, descriptor)?;

    let resource_sid = descriptor.remote_id.as_deref().ok_or_else(|| {
        DeployError::Validation(format!(
            "{} \"{}\" has not been reconciled with the service",
            kind, descriptor.name
        ))
    })?;

    let failed = |e: ApiError| {
        tracing::error!("Upload of {} \"{}\" failed: {:?}", kind, descriptor.name, e);
        DeployError::remote(format!("Failed to upload {}", descriptor.name), e)
    };

    match strategy {
        UploadStrategy::Inline => {
            let content_type =
                resolve_content_type(&descriptor.content_name(), Some(&descriptor.content));
            tracing::debug!(
                "Uploading {} \"{}\" via form data with content-type \"{}\"",
                kind,
                descriptor.name,
                content_type
            );

            let request = VersionRequest {
                path: descriptor.path.clone(),
                access: descriptor.access,
                content: Some(VersionContent {
                    bytes: descriptor.content.to_bytes(),
                    content_type,
                    file_name: descriptor.name.clone(),
                }),
            };
            let version = api
                .create_version(kind, service_sid, resource_sid, request)
                .await
                .map_err(failed)?;
            Ok(version.sid)
        }
        UploadStrategy::PreSigned => {
            let request = VersionRequest {
                path: descriptor.path.clone(),
                access: descriptor.access,
                content: None,
            };
            let version = api
                .create_version(kind, service_sid, resource_sid, request)
                .await
                .map_err(failed)?;

            match &version.upload_target {
                Some(target) => {
                    api.push_content(target, descriptor.content.to_bytes(), &descriptor.name)
                        .await
                        .map_err(failed)?;
                }
                None => {
                    tracing::warn!(
                        "Version {} for {} \"{}\" came back without an upload target",
                        version.sid,
                        kind,
                        descriptor.name
                    );
                }
            }

            Ok(version.sid)
        }
    }
}
