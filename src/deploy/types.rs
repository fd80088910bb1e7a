//! Deployment types

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{Access, Sid};

/// Environment variables as declared locally
///
/// Only string and number values are synced; anything else is skipped.
pub type EnvironmentVariables = BTreeMap<String, Value>;

/// Resource content, either text or raw bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
}

impl Content {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Content::Text(text) => text.as_bytes().to_vec(),
            Content::Bytes(bytes) => bytes.clone(),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

/// Desired state of one function or asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Friendly name, the natural key for reconciliation
    pub name: String,
    /// URL path the resource is served under
    pub path: String,
    #[serde(default)]
    pub access: Access,
    pub content: Content,
    /// Local file the content came from; preferred for content-type lookup
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// Set once by reconciliation
    #[serde(skip)]
    pub remote_id: Option<Sid>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            access: Access::default(),
            content: content.into(),
            file_path: None,
            remote_id: None,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Name used for content-type resolution
    pub fn content_name(&self) -> String {
        self.file_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

// ============================================================================
// Orchestration
// ============================================================================

/// Stages of one deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    ResolveService,
    ResolveEnvironment,
    ReconcileFunctions,
    ReconcileAssets,
    UploadContents,
    SyncVariables,
    TriggerBuild,
    PollBuild,
    Activate,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeployStage::ResolveService => "resolving the service",
            DeployStage::ResolveEnvironment => "resolving the environment",
            DeployStage::ReconcileFunctions => "reconciling functions",
            DeployStage::ReconcileAssets => "reconciling assets",
            DeployStage::UploadContents => "uploading contents",
            DeployStage::SyncVariables => "syncing variables",
            DeployStage::TriggerBuild => "triggering the build",
            DeployStage::PollBuild => "waiting for the build",
            DeployStage::Activate => "activating the build",
        };
        f.write_str(label)
    }
}

/// One deployment's desired state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    /// Target service; when absent, `service_name` is looked up or created
    #[serde(default)]
    pub service_sid: Option<Sid>,
    #[serde(default)]
    pub service_name: Option<String>,
    /// Allow deploying by name into a service that already exists
    #[serde(default)]
    pub override_existing_service: bool,
    /// Target environment, by sid or unique name
    pub environment: String,
    #[serde(default)]
    pub create_environment: bool,
    #[serde(default)]
    pub functions: Vec<ResourceDescriptor>,
    #[serde(default)]
    pub assets: Vec<ResourceDescriptor>,
    #[serde(default)]
    pub env: EnvironmentVariables,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub runtime: Option<String>,
}

/// Resolved ids for one deployed function or asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedResource {
    pub name: String,
    pub path: String,
    pub sid: Sid,
    pub version_sid: Sid,
}

/// Outcome of variable synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySummary {
    pub service_sid: Sid,
    pub environment_sid: Sid,
    pub functions: Vec<DeployedResource>,
    pub assets: Vec<DeployedResource>,
    pub variables: SyncReport,
    pub build_sid: Sid,
    pub deployment_sid: Sid,
    pub completed_at: DateTime<Utc>,
}

/// Promote an existing build into another environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub service_sid: Sid,
    /// Build to activate; when absent, the source environment's current build
    #[serde(default)]
    pub build_sid: Option<Sid>,
    #[serde(default)]
    pub source_environment: Option<String>,
    pub target_environment: String,
    #[serde(default)]
    pub create_environment: bool,
    #[serde(default)]
    pub env: EnvironmentVariables,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationSummary {
    pub service_sid: Sid,
    pub environment_sid: Sid,
    pub build_sid: Sid,
    pub deployment_sid: Sid,
    pub variables: SyncReport,
}
