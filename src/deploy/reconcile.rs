//! Resource reconciliation
//!
//! Matches desired functions or assets against the remote list by friendly
//! name and creates only the missing ones.

use std::collections::HashMap;
use std::future::Future;

use futures::future::try_join_all;

use crate::api::{RemoteResource, ResourceKind, ServerlessApi};
use crate::error::{ApiError, DeployError, Result};

use super::types::ResourceDescriptor;

/// Resolve a remote sid for every desired resource
///
/// `list` fetches the complete remote collection; `create` registers one
/// missing resource by name. Creations run concurrently and the first failure
/// fails the whole call. Resources created before that failure stay created.
///
/// Every input descriptor appears in the output exactly once: matched ones
/// first, then the newly created ones.
pub async fn reconcile<L, LF, C, CF>(
    kind: ResourceKind,
    desired: Vec<ResourceDescriptor>,
    list: L,
    create: C,
) -> Result<Vec<ResourceDescriptor>>
where
    L: FnOnce() -> LF,
    LF: Future<Output = std::result::Result<Vec<RemoteResource>, ApiError>>,
    C: Fn(String) -> CF,
    CF: Future<Output = std::result::Result<RemoteResource, ApiError>>,
{
    let existing = list().await.map_err(|e| {
        tracing::error!("Failed to list {}s: {:?}", kind, e);
        DeployError::remote(format!("Failed to list existing {}s", kind), e)
    })?;

    // First entry wins when the service holds duplicate names
    let mut by_name: HashMap<&str, &str> = HashMap::with_capacity(existing.len());
    for remote in &existing {
        by_name
            .entry(remote.friendly_name.as_str())
            .or_insert(remote.sid.as_str());
    }

    let mut resolved = Vec::with_capacity(desired.len());
    let mut to_create = Vec::new();
    for mut descriptor in desired {
        match by_name.get(descriptor.name.as_str()) {
            Some(sid) => {
                descriptor.remote_id = Some(sid.to_string());
                resolved.push(descriptor);
            }
            None => to_create.push(descriptor),
        }
    }

    tracing::debug!(
        kind = %kind,
        matched = resolved.len(),
        to_create = to_create.len(),
        "Reconciling resources"
    );

    let created = try_join_all(to_create.into_iter().map(|mut descriptor| {
        let pending = create(descriptor.name.clone());
        async move {
            match pending.await {
                Ok(remote) => {
                    tracing::info!("Created {} \"{}\" ({})", kind, descriptor.name, remote.sid);
                    descriptor.remote_id = Some(remote.sid);
                    Ok(descriptor)
                }
                Err(e) => {
                    tracing::error!("Failed to create {} \"{}\": {:?}", kind, descriptor.name, e);
                    Err(DeployError::PartialReconciliation {
                        kind,
                        name: descriptor.name,
                        source: e,
                    })
                }
            }
        }
    }))
    .await?;

    resolved.extend(created);
    Ok(resolved)
}

/// Reconcile one resource kind against the service
pub async fn reconcile_resources(
    api: &dyn ServerlessApi,
    kind: ResourceKind,
    service_sid: &str,
    desired: Vec<ResourceDescriptor>,
) -> Result<Vec<ResourceDescriptor>> {
    reconcile(
        kind,
        desired,
        || api.list_resources(kind, service_sid),
        |name| async move { api.create_resource(kind, service_sid, &name).await },
    )
    .await
}
