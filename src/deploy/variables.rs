//! Environment variable synchronization
//!
//! Creates missing keys and updates changed values. Keys present remotely but
//! absent locally are left alone.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde_json::Value;

use crate::api::{ServerlessApi, Variable, VariableResource};
use crate::error::{DeployError, Result};

use super::types::{EnvironmentVariables, SyncReport};

enum Change {
    Created,
    Updated,
    Unchanged,
}

/// Flatten the desired map into key/value pairs
///
/// Strings and numbers are kept; any other JSON value is dropped silently.
pub fn to_variables(env: &EnvironmentVariables) -> Vec<Variable> {
    env.iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some(Variable {
                key: key.clone(),
                value,
            })
        })
        .collect()
}

/// Make the environment's variables match `desired`
pub async fn sync_variables(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
    desired: &EnvironmentVariables,
) -> Result<SyncReport> {
    let existing = api
        .list_variables(service_sid, environment_sid)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list variables for {}: {:?}", environment_sid, e);
            DeployError::remote("Failed to fetch existing environment variables", e)
        })?;

    let by_key: HashMap<&str, &VariableResource> =
        existing.iter().map(|v| (v.key.as_str(), v)).collect();
    let variables = to_variables(desired);

    let changes = try_join_all(variables.iter().map(|variable| {
        let current = by_key.get(variable.key.as_str()).copied();
        async move {
            match current {
                None => api
                    .create_variable(service_sid, environment_sid, variable)
                    .await
                    .map(|_| Change::Created)
                    .map_err(|e| {
                        tracing::error!("Failed to create variable {}: {:?}", variable.key, e);
                        DeployError::remote(format!("Failed to set variable \"{}\"", variable.key), e)
                    }),
                Some(resource) if resource.value == variable.value => Ok(Change::Unchanged),
                Some(resource) => api
                    .update_variable(service_sid, environment_sid, &resource.sid, variable)
                    .await
                    .map(|_| Change::Updated)
                    .map_err(|e| {
                        tracing::error!("Failed to update variable {}: {:?}", variable.key, e);
                        DeployError::remote(
                            format!("Failed to update variable \"{}\"", variable.key),
                            e,
                        )
                    }),
            }
        }
    }))
    .await?;

    let mut report = SyncReport::default();
    for change in changes {
        match change {
            Change::Created => report.created += 1,
            Change::Updated => report.updated += 1,
            Change::Unchanged => report.unchanged += 1,
        }
    }

    tracing::info!(
        environment = environment_sid,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        "Synced environment variables"
    );

    Ok(report)
}
