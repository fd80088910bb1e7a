//! Wire types exchanged with the serverless service

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque identifier assigned by the service
pub type Sid = String;

/// Whether `value` looks like a sid of the kind marked by `prefix`
///
/// Sids are a two-letter prefix followed by 32 hex digits.
pub fn is_sid(value: &str, prefix: &str) -> bool {
    value.len() == 34
        && value.starts_with(prefix)
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Top-level container for functions, assets and environments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResource {
    pub sid: Sid,
    pub unique_name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
}

// ============================================================================
// Resources
// ============================================================================

/// Resource kinds that carry versioned content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Function,
    Asset,
}

impl ResourceKind {
    /// Collection segment in resource URLs
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Function => "Functions",
            ResourceKind::Asset => "Assets",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Function => f.write_str("function"),
            ResourceKind::Asset => f.write_str("asset"),
        }
    }
}

/// Visibility of a deployed function or asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Public,
    Private,
    Protected,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Private => "private",
            Access::Protected => "protected",
        }
    }
}

impl Default for Access {
    fn default() -> Self {
        Self::Public
    }
}

/// Remote function or asset, as returned by list and create calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub sid: Sid,
    pub friendly_name: String,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Versions
// ============================================================================

/// Pre-signed destination for the second upload phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub url: String,
    /// Storage encryption key reference
    #[serde(rename = "kmsARN")]
    pub credential_ref: String,
}

/// Immutable content revision of a function or asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub sid: Sid,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub visibility: Option<Access>,
    #[serde(rename = "pre_signed_upload_url", default)]
    pub upload_target: Option<UploadTarget>,
}

/// Content sent inline with a version request
#[derive(Debug, Clone)]
pub struct VersionContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Version creation request
///
/// `content` is only set for inline uploads; pre-signed uploads push the bytes
/// in a second call.
#[derive(Debug, Clone)]
pub struct VersionRequest {
    pub path: String,
    pub access: Access,
    pub content: Option<VersionContent>,
}

// ============================================================================
// Variables and environments
// ============================================================================

/// Desired environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
}

/// Environment variable as stored by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableResource {
    pub sid: Sid,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentResource {
    pub sid: Sid,
    pub unique_name: String,
    #[serde(default)]
    pub domain_suffix: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    /// Build currently active in this environment
    #[serde(default)]
    pub build_sid: Option<Sid>,
}

// ============================================================================
// Builds and deployments
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub function_versions: Vec<Sid>,
    pub asset_versions: Vec<Sid>,
    /// Package name to version requirement
    pub dependencies: BTreeMap<String, String>,
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Building,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub sid: Sid,
    pub status: BuildStatus,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub sid: Sid,
    #[serde(default)]
    pub build_sid: Option<Sid>,
    #[serde(default)]
    pub environment_sid: Option<Sid>,
}

// ============================================================================
// Logs
// ============================================================================

/// Query for a single page of logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub page_size: u32,
    pub function_sid: Option<Sid>,
}

/// One log entry; everything but the sid is passed through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub sid: Sid,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}
