//! HTTP client for the serverless service
//!
//! Wraps `reqwest` with basic auth, pagination and error-body mapping.

use async_trait::async_trait;
use reqwest::{header, multipart, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;

use super::pagination::Page;
use super::types::{
    BuildRecord, BuildRequest, BuildStatus, DeploymentRecord, EnvironmentResource, LogQuery,
    LogRecord, RemoteResource, ResourceKind, ServiceResource, UploadTarget, Variable,
    VariableResource, VersionRecord, VersionRequest,
};
use super::ServerlessApi;

/// Page size requested when exhausting list endpoints
const LIST_PAGE_SIZE: u32 = 50;

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildStatusBody {
    status: BuildStatus,
}

#[derive(serde::Serialize)]
struct Dependency<'a> {
    name: &'a str,
    version: &'a str,
}

/// Serverless service client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    upload_base_url: String,
    account_sid: String,
    auth_token: String,
}

impl ApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("serverless-deploy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url().trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn upload_url(&self, path: &str) -> String {
        format!("{}/{}", self.upload_base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.basic_auth(&self.account_sid, Some(&self.auth_token))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!("GET {}", url);
        let response = self.authed(self.http.get(url)).query(query).send().await?;
        handle_response(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<T, ApiError> {
        tracing::debug!("POST {}", url);
        let response = self.authed(self.http.post(url)).form(form).send().await?;
        handle_response(response).await
    }

    /// Fetch every item of a list endpoint (handles pagination)
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let mut all_items = Vec::new();
        let first: Value = self
            .get(&self.url(path), &[("PageSize", LIST_PAGE_SIZE.to_string())])
            .await?;
        let mut page: Page<T> = Page::from_value(first)?;

        loop {
            all_items.extend(page.items);

            let Some(next) = page.next_page_url else {
                break;
            };
            let body: Value = self.get(&next, &[]).await?;
            page = Page::from_value(body)?;
        }

        Ok(all_items)
    }
}

/// Decode a JSON body, mapping non-2xx responses to `ApiError::Status`
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        let body = response.bytes().await?;
        return serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()));
    }

    Err(status_error(status, response).await)
}

async fn status_error(status: StatusCode, response: Response) -> ApiError {
    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ServiceErrorBody>(&text) {
        Ok(body) => (body.code, body.message.unwrap_or_else(|| text.clone())),
        Err(_) => (None, text),
    };

    ApiError::Status {
        status,
        code,
        message,
    }
}

/// `Content-Disposition` value that is always a valid header
///
/// `filename` is an ASCII fallback with quotes and backslashes escaped;
/// `filename*` carries the exact name percent-encoded.
fn content_disposition(name: &str) -> String {
    let mut fallback = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => fallback.push(c),
            _ => fallback.push('_'),
        }
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[async_trait]
impl ServerlessApi for ApiClient {
    async fn list_services(&self) -> Result<Vec<ServiceResource>, ApiError> {
        self.list_all("Services").await
    }

    async fn create_service(
        &self,
        unique_name: &str,
        friendly_name: &str,
    ) -> Result<ServiceResource, ApiError> {
        let url = self.url("Services");
        self.post_form(
            &url,
            &[
                ("UniqueName", unique_name.to_string()),
                ("FriendlyName", friendly_name.to_string()),
                ("IncludeCredentials", "true".to_string()),
            ],
        )
        .await
    }

    async fn list_resources(
        &self,
        kind: ResourceKind,
        service_sid: &str,
    ) -> Result<Vec<RemoteResource>, ApiError> {
        self.list_all(&format!(
            "Services/{}/{}",
            segment(service_sid),
            kind.path_segment()
        ))
        .await
    }

    async fn create_resource(
        &self,
        kind: ResourceKind,
        service_sid: &str,
        name: &str,
    ) -> Result<RemoteResource, ApiError> {
        let url = self.url(&format!(
            "Services/{}/{}",
            segment(service_sid),
            kind.path_segment()
        ));
        self.post_form(&url, &[("FriendlyName", name.to_string())])
            .await
    }

    async fn create_version(
        &self,
        kind: ResourceKind,
        service_sid: &str,
        resource_sid: &str,
        request: VersionRequest,
    ) -> Result<VersionRecord, ApiError> {
        let url = self.upload_url(&format!(
            "Services/{}/{}/{}/Versions",
            segment(service_sid),
            kind.path_segment(),
            segment(resource_sid)
        ));
        let visibility = request.access.as_str().to_string();

        match request.content {
            Some(content) => {
                tracing::debug!(
                    "POST {} (multipart, content-type \"{}\")",
                    url,
                    content.content_type
                );
                let part = multipart::Part::bytes(content.bytes)
                    .file_name(content.file_name)
                    .mime_str(&content.content_type)?;
                let form = multipart::Form::new()
                    .text("path", request.path)
                    .text("visibility", visibility)
                    .part("content", part);

                let response = self
                    .authed(self.http.post(&url))
                    .multipart(form)
                    .send()
                    .await?;
                handle_response(response).await
            }
            None => {
                self.post_form(&url, &[("Path", request.path), ("Visibility", visibility)])
                    .await
            }
        }
    }

    async fn push_content(
        &self,
        target: &UploadTarget,
        content: Vec<u8>,
        display_name: &str,
    ) -> Result<(), ApiError> {
        tracing::debug!("PUT pre-signed upload for {}", display_name);
        let response = self
            .http
            .put(&target.url)
            .header("x-amz-server-side-encryption", "aws:kms")
            .header(
                "x-amz-server-side-encryption-aws-kms-key-id",
                &target.credential_ref,
            )
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_DISPOSITION, content_disposition(display_name))
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, response).await)
        }
    }

    async fn list_variables(
        &self,
        service_sid: &str,
        environment_sid: &str,
    ) -> Result<Vec<VariableResource>, ApiError> {
        self.list_all(&format!(
            "Services/{}/Environments/{}/Variables",
            segment(service_sid),
            segment(environment_sid)
        ))
        .await
    }

    async fn create_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError> {
        let url = self.url(&format!(
            "Services/{}/Environments/{}/Variables",
            segment(service_sid),
            segment(environment_sid)
        ));
        self.post_form(
            &url,
            &[("Key", variable.key.clone()), ("Value", variable.value.clone())],
        )
        .await
    }

    async fn update_variable(
        &self,
        service_sid: &str,
        environment_sid: &str,
        variable_sid: &str,
        variable: &Variable,
    ) -> Result<VariableResource, ApiError> {
        let url = self.url(&format!(
            "Services/{}/Environments/{}/Variables/{}",
            segment(service_sid),
            segment(environment_sid),
            segment(variable_sid)
        ));
        self.post_form(
            &url,
            &[("Key", variable.key.clone()), ("Value", variable.value.clone())],
        )
        .await
    }

    async fn list_environments(
        &self,
        service_sid: &str,
    ) -> Result<Vec<EnvironmentResource>, ApiError> {
        self.list_all(&format!("Services/{}/Environments", segment(service_sid)))
            .await
    }

    async fn create_environment(
        &self,
        service_sid: &str,
        unique_name: &str,
        domain_suffix: &str,
    ) -> Result<EnvironmentResource, ApiError> {
        let url = self.url(&format!("Services/{}/Environments", segment(service_sid)));
        self.post_form(
            &url,
            &[
                ("UniqueName", unique_name.to_string()),
                ("DomainSuffix", domain_suffix.to_string()),
            ],
        )
        .await
    }

    async fn create_build(
        &self,
        service_sid: &str,
        request: &BuildRequest,
    ) -> Result<BuildRecord, ApiError> {
        let url = self.url(&format!("Services/{}/Builds", segment(service_sid)));

        let mut form: Vec<(&str, String)> = Vec::new();
        for sid in &request.function_versions {
            form.push(("FunctionVersions", sid.clone()));
        }
        for sid in &request.asset_versions {
            form.push(("AssetVersions", sid.clone()));
        }
        if !request.dependencies.is_empty() {
            let dependencies: Vec<Dependency<'_>> = request
                .dependencies
                .iter()
                .map(|(name, version)| Dependency { name, version })
                .collect();
            let encoded = serde_json::to_string(&dependencies)
                .map_err(|e| ApiError::Decode(e.to_string()))?;
            form.push(("Dependencies", encoded));
        }
        if let Some(runtime) = &request.runtime {
            form.push(("Runtime", runtime.clone()));
        }

        self.post_form(&url, &form).await
    }

    async fn fetch_build_status(
        &self,
        service_sid: &str,
        build_sid: &str,
    ) -> Result<BuildStatus, ApiError> {
        let url = self.url(&format!(
            "Services/{}/Builds/{}/Status",
            segment(service_sid),
            segment(build_sid)
        ));
        let body: BuildStatusBody = self.get(&url, &[]).await?;
        Ok(body.status)
    }

    async fn create_deployment(
        &self,
        service_sid: &str,
        environment_sid: &str,
        build_sid: &str,
    ) -> Result<DeploymentRecord, ApiError> {
        let url = self.url(&format!(
            "Services/{}/Environments/{}/Deployments",
            segment(service_sid),
            segment(environment_sid)
        ));
        self.post_form(&url, &[("BuildSid", build_sid.to_string())])
            .await
    }

    async fn list_log_page(
        &self,
        service_sid: &str,
        environment_sid: &str,
        query: &LogQuery,
    ) -> Result<Vec<LogRecord>, ApiError> {
        let url = self.url(&format!(
            "Services/{}/Environments/{}/Logs",
            segment(service_sid),
            segment(environment_sid)
        ));

        let mut params = vec![("PageSize", query.page_size.to_string())];
        if let Some(function_sid) = &query.function_sid {
            params.push(("FunctionSid", function_sid.clone()));
        }

        let body: Value = self.get(&url, &params).await?;
        Ok(Page::from_value(body)?.items)
    }
}
