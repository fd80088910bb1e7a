//! Deployment pipeline
//!
//! Reconciles functions and assets with the service, uploads their content,
//! syncs environment variables, then builds and activates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use serverless_deploy::config::Config;
//! use serverless_deploy::deploy::{Deployer, DeployRequest};
//!
//! let deployer = Deployer::from_config(&Config::from_env()?)?;
//! let summary = deployer.deploy(request).await?;
//! println!("build {} is live", summary.build_sid);
//! ```

pub mod build;
pub mod environments;
pub mod orchestrator;
pub mod reconcile;
pub mod services;
pub mod types;
pub mod upload;
pub mod variables;

pub use environments::resolve_environment;
pub use orchestrator::{DeployOptions, Deployer};
pub use reconcile::{reconcile, reconcile_resources};
pub use services::resolve_service;
pub use types::*;
pub use upload::{upload_resource, validate_access, UploadStrategy};
pub use variables::sync_variables;
