//! Serverless service collaborator
//!
//! `ServerlessApi` is the seam between deployment logic and the remote
//! service. `ApiClient` implements it over HTTP; tests substitute a recording
//! mock.

mod client;
mod pagination;
mod types;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::ApiError;

pub use client::ApiClient;
pub use types::*;

/// Operations the deployment core needs from the service
///
/// List operations return every item, following pagination to the end.
#[async_trait]
pub trait ServerlessApi: Send + Sync {
    async fn list_services(&self) -> Result<Vec<ServiceResource>, ApiError>;

    async fn create_service(
        &self,
        unique_name: &str,
        friendly_name: &str,
    ) -> Result<ServiceResource, ApiError>;

    async fn list_resources(
        &self,
        kind: ResourceKind,
        service_sid: &str,
    ) -> Result<Vec<RemoteResource>, ApiError>;

    async fn create_resource(
        &self,
        kind: ResourceKind,
        service_sid: &str,
        name: &str,
    ) -> Result<RemoteResource, ApiError>;

    async fn create_version(
        &self,
        kind: ResourceKind,
        service_sid: &str,
        resource_sid: &str,
        request: VersionRequest,
    ) -> Result<VersionRecord, ApiError>;

    /// Second phase of a pre-signed upload
    async fn push_content(
        &self,
        target: &UploadTarget,
        content: Vec<u8>,
        display_name: &str,
    ) -> Result<(), ApiError>;

    async fn list_variables(
        &self,
        service_sid: &str,
        environment_sid: &str,
    ) -> Result<Vec<VariableResource>, ApiError>;

    async fn create_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError>;

    async fn update_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError>;

    async fn list_environments(
        &self,
        service_sid: &str,
    ) -> Result<Vec<EnvironmentResource>, ApiError>;

    async fn create_environment(
        &self,
        service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> Result<EnvironmentResource, ApiError>;

    async fn create_build(
        &self,
        service_sid: &str,
        request: &BuildRequest,
    ) -> Result<BuildRecord, ApiError>;

    async fn fetch_build_status(
        &self,
        service_sid: &str,
        build_sid: &str,
    ) -> Result<BuildStatus, ApiError>;

    /// Activate a build in an environment
    async fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> Result<DeploymentRecord, ApiError>;

    /// Fetch a single page of logs, newest first
    async fn list_log_page(
        &self,
        service_sid: &str,
        environment_sid: &str,
        query: &LogQuery,
    ) -> Result<Vec<LogRecord>, ApiError>;
}
