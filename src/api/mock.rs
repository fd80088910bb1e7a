//! Recording in-memory service for tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::error::ApiError;

use super::types::*;
use super::ServerlessApi;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListServices,
    CreateService(String),
    ListResources(ResourceKind),
    CreateResource(ResourceKind, String),
    CreateVersion {
        kind: ResourceKind,
        resource_sid: String,
        path: String,
        inline: bool,
    },
    PushContent(String),
    ListVariables(String),
    CreateVariable(String),
    UpdateVariable(String, String),
    ListEnvironments,
    CreateEnvironment(String),
    CreateBuild(BuildRequest),
    FetchBuildStatus(String),
    CreateDeployment(String, String),
    ListLogPage(LogQuery),
}

#[derive(Default)]
struct MockState {
    services: Vec<ServiceResource>,
    resources: HashMap<ResourceKind, Vec<RemoteResource>>,
    variables: Vec<VariableResource>,
    environments: Vec<EnvironmentResource>,
    build_statuses: VecDeque<BuildStatus>,
    log_pages: VecDeque<Option<Vec<LogRecord>>>,
    log_gate: Option<Arc<Notify>>,
    failing_names: HashSet<String>,
    presign: bool,
    next_id: u32,
    calls: Vec<Call>,
}

impl MockState {
    fn next_sid(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{:032}", prefix, self.next_id)
    }
}

/// In-memory service that records every call
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

pub fn remote(sid: &str, name: &str) -> RemoteResource {
    RemoteResource {
        sid: sid.to_string(),
        friendly_name: name.to_string(),
        extra: Default::default(),
    }
}

pub fn log(sid: &str) -> LogRecord {
    let mut payload = serde_json::Map::new();
    payload.insert("message".to_string(), serde_json::json!(format!("log {}", sid)));
    LogRecord {
        sid: sid.to_string(),
        payload,
    }
}

fn failure(what: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: Some(20500),
        message: format!("{} exploded", what),
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(self, sid: &str, unique_name: &str) -> Self {
        self.state.lock().unwrap().services.push(ServiceResource {
            sid: sid.to_string(),
            unique_name: unique_name.to_string(),
            friendly_name: Some(unique_name.to_string()),
        });
        self
    }

    pub fn with_resource(self, kind: ResourceKind, sid: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .resources
            .entry(kind)
            .or_default()
            .push(remote(sid, name));
        self
    }

    pub fn with_variable(self, sid: &str, key: &str, value: &str) -> Self {
        self.state.lock().unwrap().variables.push(VariableResource {
            sid: sid.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_environment(self, sid: &str, unique_name: &str, build_sid: Option<&str>) -> Self {
        self.state.lock().unwrap().environments.push(EnvironmentResource {
            sid: sid.to_string(),
            unique_name: unique_name.to_string(),
            domain_suffix: Some(unique_name.to_string()),
            domain_name: None,
            build_sid: build_sid.map(str::to_string),
        });
        self
    }

    /// Version requests answer with a pre-signed upload target
    pub fn presigned(self) -> Self {
        self.state.lock().unwrap().presign = true;
        self
    }

    /// Any create or upload naming `name` fails
    pub fn failing_on(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_names
            .insert(name.to_string());
        self
    }

    pub fn with_build_statuses(self, statuses: &[BuildStatus]) -> Self {
        self.state
            .lock()
            .unwrap()
            .build_statuses
            .extend(statuses.iter().copied());
        self
    }

    /// Every log poll waits for a permit from `gate` before answering
    pub fn with_log_gate(self, gate: Arc<Notify>) -> Self {
        self.state.lock().unwrap().log_gate = Some(gate);
        self
    }

    /// Queue a log page; `None` makes that poll fail
    pub fn push_log_page(&self, page: Option<Vec<LogRecord>>) {
        self.state.lock().unwrap().log_pages.push_back(page);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn variables(&self) -> Vec<VariableResource> {
        self.state.lock().unwrap().variables.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ServerlessApi for MockApi {
    async fn list_services(&self) -> Result<Vec<ServiceResource>, ApiError> {
        self.record(Call::ListServices);
        Ok(self.state.lock().unwrap().services.clone())
    }

    async fn create_service(
        &self,
        unique_name: &str,
        friendly_name: &str,
    ) -> Result<ServiceResource, ApiError> {
        self.record(Call::CreateService(unique_name.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_names.contains(unique_name) {
            return Err(failure(unique_name));
        }
        let created = ServiceResource {
            sid: state.next_sid("ZS"),
            unique_name: unique_name.to_string(),
            friendly_name: Some(friendly_name.to_string()),
        };
        state.services.push(created.clone());
        Ok(created)
    }

    async fn list_resources(
        &self,
        kind: ResourceKind,
        _service_sid: &str,
    ) -> Result<Vec<RemoteResource>, ApiError> {
        self.record(Call::ListResources(kind));
        let state = self.state.lock().unwrap();
        Ok(state.resources.get(&kind).cloned().unwrap_or_default())
    }

    async fn create_resource(
        &self,
        kind: ResourceKind,
        _service_sid: &str,
        name: &str,
    ) -> Result<RemoteResource, ApiError> {
        self.record(Call::CreateResource(kind, name.to_string()));
        let mut state = self.state.lock().unwrap();
        if state.failing_names.contains(name) {
            return Err(failure(name));
        }
        let sid = state.next_sid("ZH");
        let created = remote(&sid, name);
        state.resources.entry(kind).or_default().push(created.clone());
        Ok(created)
    }

    async fn create_version(
        &self,
        kind: ResourceKind,
        _service_sid: &str,
        resource_sid: &str,
        request: VersionRequest,
    ) -> Result<VersionRecord, ApiError> {
        self.record(Call::CreateVersion {
            kind,
            resource_sid: resource_sid.to_string(),
            path: request.path.clone(),
            inline: request.content.is_some(),
        });
        let mut state = self.state.lock().unwrap();
        let owner = state
            .resources
            .get(&kind)
            .and_then(|list| list.iter().find(|r| r.sid == resource_sid))
            .map(|r| r.friendly_name.clone());
        if owner.is_some_and(|name| state.failing_names.contains(&name)) {
            return Err(failure(resource_sid));
        }

        let sid = state.next_sid("ZN");
        let upload_target = state.presign.then(|| UploadTarget {
            url: format!("https://storage.example.com/{}", sid),
            credential_ref: "arn:aws:kms:test".to_string(),
        });
        Ok(VersionRecord {
            sid,
            path: Some(request.path),
            visibility: Some(request.access),
            upload_target,
        })
    }

    async fn push_content(
        &self,
        _target: &UploadTarget,
        _content: Vec<u8>,
        display_name: &str,
    ) -> Result<(), ApiError> {
        self.record(Call::PushContent(display_name.to_string()));
        Ok(())
    }

    async fn list_variables(
        &self,
        _service_sid: &str,
        environment_sid: &str,
    ) -> Result<Vec<VariableResource>, ApiError> {
        self.record(Call::ListVariables(environment_sid.to_string()));
        Ok(self.state.lock().unwrap().variables.clone())
    }

    async fn create_variable(
        &self,
        _service_sid: &str,
        _environment_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError> {
        self.record(Call::CreateVariable(variable.key.clone()));
        let mut state = self.state.lock().unwrap();
        if state.failing_names.contains(&variable.key) {
            return Err(failure(&variable.key));
        }
        let created = VariableResource {
            sid: state.next_sid("ZV"),
            key: variable.key.clone(),
            value: variable.value.clone(),
        };
        state.variables.push(created.clone());
        Ok(created)
    }

    async fn update_variable(
        &self,
        _service_sid: &str,
        _environment_sid: &str,
        variable_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError> {
        self.record(Call::UpdateVariable(
            variable_sid.to_string(),
            variable.key.clone(),
        ));
        let mut state = self.state.lock().unwrap();
        let existing = state
            .variables
            .iter_mut()
            .find(|v| v.sid == variable_sid)
            .ok_or_else(|| failure(variable_sid))?;
        existing.value = variable.value.clone();
        Ok(existing.clone())
    }

    async fn list_environments(
        &self,
        _service_sid: &str,
    ) -> Result<Vec<EnvironmentResource>, ApiError> {
        self.record(Call::ListEnvironments);
        Ok(self.state.lock().unwrap().environments.clone())
    }

    async fn create_environment(
        &self,
        _service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> Result<EnvironmentResource, ApiError> {
        self.record(Call::CreateEnvironment(unique_name.to_string()));
        let mut state = self.state.lock().unwrap();
        let created = EnvironmentResource {
            sid: state.next_sid("ZE"),
            unique_name: unique_name.to_string(),
            domain_suffix: Some(domain_suffix.to_string()),
            domain_name: None,
            build_sid: None,
        };
        state.environments.push(created.clone());
        Ok(created)
    }

    async fn create_build(
        &self,
        _service_sid: &str,
        request: &BuildRequest,
    ) -> Result<BuildRecord, ApiError> {
        self.record(Call::CreateBuild(request.clone()));
        let mut state = self.state.lock().unwrap();
        Ok(BuildRecord {
            sid: state.next_sid("ZB"),
            status: BuildStatus::Building,
            date_created: None,
            date_updated: None,
        })
    }

    async fn fetch_build_status(
        &self,
        _service_sid: &str,
        build_sid: &str,
    ) -> Result<BuildStatus, ApiError> {
        self.record(Call::FetchBuildStatus(build_sid.to_string()));
        let mut state = self.state.lock().unwrap();
        Ok(state
            .build_statuses
            .pop_front()
            .unwrap_or(BuildStatus::Completed))
    }

    async fn create_deployment(
        &self,
        _service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> Result<DeploymentRecord, ApiError> {
        self.record(Call::CreateDeployment(
            environment_sid.to_string(),
            build_sid.to_string(),
        ));
        let mut state = self.state.lock().unwrap();
        Ok(DeploymentRecord {
            sid: state.next_sid("ZD"),
            build_sid: Some(build_sid.to_string()),
            environment_sid: Some(environment_sid.to_string()),
        })
    }

    async fn list_log_page(
        &self,
        _service_sid: &str,
        _environment_sid: &str,
        query: &LogQuery,
    ) -> Result<Vec<LogRecord>, ApiError> {
        self.record(Call::ListLogPage(query.clone()));
        let gate = self.state.lock().unwrap().log_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        match state.log_pages.pop_front() {
            Some(Some(page)) => Ok(page),
            Some(None) => Err(failure("logs")),
            None => Ok(Vec::new()),
        }
    }
}
