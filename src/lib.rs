//! Serverless Deploy
//!
//! Synchronizes local functions, assets and environment variables with a
//! serverless service, builds them and activates the build in an environment.
//! Also tails function logs.
//!
//! # Modules
//!
//! - `api`: service client and the `ServerlessApi` seam
//! - `deploy`: reconciliation, uploads, variable sync and the orchestrator
//! - `logs`: polling, de-duplicating log stream
//! - `manifest`: JSON deploy manifests

pub mod api;
pub mod config;
pub mod content_type;
pub mod deploy;
pub mod error;
pub mod logs;
pub mod manifest;

pub use error::{ApiError, DeployError, Result};
