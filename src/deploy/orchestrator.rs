//! Deployment orchestration
//!
//! One run: resolve the environment, reconcile functions and assets
//! concurrently, upload every version while variables sync, then build and
//! activate. Nothing is rolled back on failure.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;

use crate::api::{ApiClient, BuildRequest, ResourceKind, ServerlessApi};
use crate::config::{BuildPollConfig, Config};
use crate::error::{ApiError, DeployError, Result};

use super::build::{activate, trigger_build, wait_for_build};
use super::environments::resolve_environment;
use super::reconcile::reconcile_resources;
use super::services::resolve_service;
use super::types::{
    ActivateRequest, ActivationSummary, DeployRequest, DeployStage, DeploySummary,
    DeployedResource, ResourceDescriptor,
};
use super::upload::{upload_resource, validate_access, UploadStrategy};
use super::variables::sync_variables;

/// Per-deployment settings
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    pub upload_strategy: UploadStrategy,
    pub build_poll: BuildPollConfig,
}

impl From<&Config> for DeployOptions {
    fn from(config: &Config) -> Self {
        Self {
            upload_strategy: config.upload_strategy,
            build_poll: config.build_poll,
        }
    }
}

/// Runs deployments against one service client
#[derive(Clone)]
pub struct Deployer {
    api: Arc<dyn ServerlessApi>,
    options: DeployOptions,
}

fn enter(stage: DeployStage) {
    tracing::info!("Deployment stage: {}", stage);
}

impl Deployer {
    pub fn new(api: Arc<dyn ServerlessApi>, options: DeployOptions) -> Self {
        Self { api, options }
    }

    /// Build a deployer backed by the HTTP client
    pub fn from_config(config: &Config) -> std::result::Result<Self, ApiError> {
        let client = ApiClient::new(&config.client)?;
        Ok(Self::new(Arc::new(client), DeployOptions::from(config)))
    }

    /// Deploy a resource set and activate the resulting build
    pub async fn deploy(&self, request: DeployRequest) -> Result<DeploySummary> {
        let DeployRequest {
            service_sid,
            service_name,
            override_existing_service,
            environment,
            create_environment,
            functions,
            assets,
            env,
            dependencies,
            runtime,
        } = request;
        let api = self.api.as_ref();

        // Catch disallowed access levels before touching the service
        for asset in &assets {
            validate_access(ResourceKind::Asset, asset)?;
        }

        enter(DeployStage::ResolveService);
        let service_sid = resolve_service(
            api,
            service_sid.as_deref(),
            service_name.as_deref(),
            override_existing_service,
        )
        .await
        .map_err(|e| e.in_stage(DeployStage::ResolveService))?;
        let service_sid = service_sid.as_str();

        tracing::info!(
            service = service_sid,
            functions = functions.len(),
            assets = assets.len(),
            "Starting deployment"
        );

        enter(DeployStage::ResolveEnvironment);
        let environment = resolve_environment(api, service_sid, &environment, create_environment)
            .await
            .map_err(|e| e.in_stage(DeployStage::ResolveEnvironment))?;
        let environment_sid = environment.sid.as_str();

        enter(DeployStage::ReconcileFunctions);
        enter(DeployStage::ReconcileAssets);
        let (functions, assets) = tokio::try_join!(
            async {
                reconcile_resources(api, ResourceKind::Function, service_sid, functions)
                    .await
                    .map_err(|e| e.in_stage(DeployStage::ReconcileFunctions))
            },
            async {
                reconcile_resources(api, ResourceKind::Asset, service_sid, assets)
                    .await
                    .map_err(|e| e.in_stage(DeployStage::ReconcileAssets))
            },
        )?;

        enter(DeployStage::UploadContents);
        enter(DeployStage::SyncVariables);
        let ((functions, assets), variables) = tokio::try_join!(
            async {
                tokio::try_join!(
                    self.upload_all(ResourceKind::Function, service_sid, &functions),
                    self.upload_all(ResourceKind::Asset, service_sid, &assets),
                )
                .map_err(|e| e.in_stage(DeployStage::UploadContents))
            },
            async {
                sync_variables(api, service_sid, environment_sid, &env)
                    .await
                    .map_err(|e| e.in_stage(DeployStage::SyncVariables))
            },
        )?;

        enter(DeployStage::TriggerBuild);
        let build_request = BuildRequest {
            function_versions: functions.iter().map(|f| f.version_sid.clone()).collect(),
            asset_versions: assets.iter().map(|a| a.version_sid.clone()).collect(),
            dependencies,
            runtime,
        };
        let build = trigger_build(api, service_sid, &build_request)
            .await
            .map_err(|e| e.in_stage(DeployStage::TriggerBuild))?;

        enter(DeployStage::PollBuild);
        wait_for_build(api, service_sid, &build.sid, &self.options.build_poll)
            .await
            .map_err(|e| e.in_stage(DeployStage::PollBuild))?;

        enter(DeployStage::Activate);
        let deployment = activate(api, service_sid, environment_sid, &build.sid)
            .await
            .map_err(|e| e.in_stage(DeployStage::Activate))?;

        tracing::info!(
            build = %build.sid,
            deployment = %deployment.sid,
            environment = environment_sid,
            "Deployment complete"
        );

        Ok(DeploySummary {
            service_sid: service_sid.to_string(),
            environment_sid: environment.sid.clone(),
            functions,
            assets,
            variables,
            build_sid: build.sid,
            deployment_sid: deployment.sid,
            completed_at: Utc::now(),
        })
    }

    /// Activate an existing build in another environment
    pub async fn activate(&self, request: ActivateRequest) -> Result<ActivationSummary> {
        let api = self.api.as_ref();
        let service_sid = request.service_sid.as_str();

        enter(DeployStage::ResolveEnvironment);
        let build_sid = match (&request.build_sid, &request.source_environment) {
            (Some(build_sid), _) => build_sid.clone(),
            (None, Some(source)) => {
                let source_env = resolve_environment(api, service_sid, source, false)
                    .await
                    .map_err(|e| e.in_stage(DeployStage::ResolveEnvironment))?;
                source_env.build_sid.ok_or_else(|| {
                    DeployError::Validation(format!(
                        "Environment \"{}\" has no active build",
                        source
                    ))
                })?
            }
            (None, None) => {
                return Err(DeployError::Validation(
                    "Either a build sid or a source environment is required".to_string(),
                ))
            }
        };

        let target = resolve_environment(
            api,
            service_sid,
            &request.target_environment,
            request.create_environment,
        )
        .await
        .map_err(|e| e.in_stage(DeployStage::ResolveEnvironment))?;

        enter(DeployStage::SyncVariables);
        let variables = sync_variables(api, service_sid, &target.sid, &request.env)
            .await
            .map_err(|e| e.in_stage(DeployStage::SyncVariables))?;

        enter(DeployStage::Activate);
        let deployment = activate(api, service_sid, &target.sid, &build_sid)
            .await
            .map_err(|e| e.in_stage(DeployStage::Activate))?;

        Ok(ActivationSummary {
            service_sid: service_sid.to_string(),
            environment_sid: target.sid,
            build_sid,
            deployment_sid: deployment.sid,
            variables,
        })
    }

    async fn upload_all(
        &self,
        kind: ResourceKind,
        service_sid: &str,
        resources: &[ResourceDescriptor],
    ) -> Result<Vec<DeployedResource>> {
        try_join_all(resources.iter().map(|descriptor| async move {
            let version_sid = upload_resource(
                self.api.as_ref(),
                self.options.upload_strategy,
                kind,
                service_sid,
                descriptor,
            )
            .await?;

            Ok::<_, DeployError>(DeployedResource {
                name: descriptor.name.clone(),
                path: descriptor.path.clone(),
                sid: descriptor.remote_id.clone().unwrap_or_default(),
                version_sid,
            })
        }))
        .await
    }
}
