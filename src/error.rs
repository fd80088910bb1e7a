//! Error types for serverless deployments

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::api::ResourceKind;
use crate::deploy::DeployStage;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, DeployError>;

/// Deployment error type
///
/// Messages are meant to be shown to whoever started the deployment. Transport
/// detail stays in the `source` chain and in the logs.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Bad input detected before any network call
    #[error("{0}")]
    Validation(String),

    /// A create/update/fetch/upload call against the service failed
    #[error("{message}")]
    RemoteCall {
        message: String,
        #[source]
        source: ApiError,
    },

    /// A desired resource could not be resolved to a remote sid
    #[error("Failed to create {kind} \"{name}\"")]
    PartialReconciliation {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ApiError,
    },

    /// A log poll cycle failed and the stream was terminated
    #[error("Failed to fetch logs")]
    Stream {
        #[source]
        source: ApiError,
    },

    #[error("Build {build_sid} failed")]
    BuildFailed { build_sid: String },

    #[error("Timed out after {waited:?} waiting for build {build_sid}")]
    BuildTimeout { build_sid: String, waited: Duration },

    #[error("Environment \"{0}\" not found")]
    EnvironmentNotFound(String),

    #[error("Function \"{0}\" not found")]
    FunctionNotFound(String),

    /// Deploying by name hit an existing service without permission to reuse it
    #[error("Service with name \"{name}\" already exists with SID \"{sid}\"")]
    ServiceExists { name: String, sid: String },

    #[error("Invalid deploy manifest: {0}")]
    Manifest(String),

    /// Orchestrator wrapper naming the stage a deployment failed in
    ///
    /// The inner error is part of the message rather than the source chain,
    /// so transport detail stays in the logs.
    #[error("Deployment failed while {stage}: {cause}")]
    Phase {
        stage: DeployStage,
        cause: Box<DeployError>,
    },
}

impl DeployError {
    /// Wrap a collaborator failure behind a caller-facing message
    pub fn remote(message: impl Into<String>, source: ApiError) -> Self {
        DeployError::RemoteCall {
            message: message.into(),
            source,
        }
    }

    /// Tag an error with the deployment stage it happened in
    pub fn in_stage(self, stage: DeployStage) -> Self {
        match self {
            // Already tagged by an inner stage
            DeployError::Phase { .. } => self,
            other => DeployError::Phase {
                stage,
                cause: Box::new(other),
            },
        }
    }

    /// The stage a deployment failed in, if this error came from the orchestrator
    pub fn stage(&self) -> Option<DeployStage> {
        match self {
            DeployError::Phase { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Errors raised by the service collaborator
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Status {
        status: StatusCode,
        code: Option<i64>,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_remote_call_hides_transport_detail() {
        let err = DeployError::remote(
            "Failed to upload index.js",
            ApiError::Status {
                status: StatusCode::BAD_GATEWAY,
                code: Some(20500),
                message: "upstream exploded".to_string(),
            },
        );

        assert_eq!(err.to_string(), "Failed to upload index.js");
        let source = err.source().expect("cause is preserved");
        assert!(source.to_string().contains("upstream exploded"));
    }

    #[test]
    fn test_in_stage_does_not_double_wrap() {
        let err = DeployError::Validation("nope".to_string())
            .in_stage(DeployStage::UploadContents)
            .in_stage(DeployStage::TriggerBuild);

        assert_eq!(err.stage(), Some(DeployStage::UploadContents));
        assert_eq!(
            err.to_string(),
            "Deployment failed while uploading contents: nope"
        );
    }

    #[test]
    fn test_stage_message_names_inner_error_once() {
        let err = DeployError::remote(
            "Failed to upload a.js",
            ApiError::Status {
                status: StatusCode::BAD_GATEWAY,
                code: None,
                message: "upstream exploded".to_string(),
            },
        )
        .in_stage(DeployStage::UploadContents);

        let report = format!("{:?}", anyhow::Error::from(err));

        assert_eq!(report.matches("Failed to upload a.js").count(), 1);
        assert!(!report.contains("upstream exploded"));
    }
}
