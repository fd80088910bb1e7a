//! Deploy manifest loading
//!
//! A manifest is a JSON file describing one deployment. Resource content is
//! given inline as text or a byte array, or read from `file_path` (relative
//! to the manifest's directory) when `content` is omitted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{Access, Sid};
use crate::deploy::{Content, DeployRequest, EnvironmentVariables, ResourceDescriptor};
use crate::error::{DeployError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResource {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifest {
    #[serde(default)]
    pub service_sid: Option<Sid>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub override_existing_service: bool,
    pub environment: String,
    #[serde(default)]
    pub create_environment: bool,
    #[serde(default)]
    pub functions: Vec<ManifestResource>,
    #[serde(default)]
    pub assets: Vec<ManifestResource>,
    #[serde(default)]
    pub env: EnvironmentVariables,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub runtime: Option<String>,
}

impl DeployManifest {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| DeployError::Manifest(e.to_string()))
    }

    /// Read a manifest and turn it into a deploy request
    pub async fn load(path: impl AsRef<Path>) -> Result<DeployRequest> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            DeployError::Manifest(format!("cannot read {}: {}", path.display(), e))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&raw)?.into_request(base_dir).await
    }

    /// Resolve file-backed content relative to `base_dir`
    pub async fn into_request(self, base_dir: &Path) -> Result<DeployRequest> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for resource in self.functions {
            functions.push(resolve_resource(resource, base_dir).await?);
        }

        let mut assets = Vec::with_capacity(self.assets.len());
        for resource in self.assets {
            assets.push(resolve_resource(resource, base_dir).await?);
        }

        tracing::debug!(
            functions = functions.len(),
            assets = assets.len(),
            "Loaded deploy manifest"
        );

        Ok(DeployRequest {
            service_sid: self.service_sid,
            service_name: self.service_name,
            override_existing_service: self.override_existing_service,
            environment: self.environment,
            create_environment: self.create_environment,
            functions,
            assets,
            env: self.env,
            dependencies: self.dependencies,
            runtime: self.runtime,
        })
    }
}

async fn resolve_resource(resource: ManifestResource, base_dir: &Path) -> Result<ResourceDescriptor> {
    let file_path = resource.file_path.map(|p| {
        if p.is_absolute() {
            p
        } else {
            base_dir.join(p)
        }
    });

    let content = match (resource.content, &file_path) {
        (Some(content), _) => content,
        (None, Some(file)) => {
            let bytes = tokio::fs::read(file).await.map_err(|e| {
                DeployError::Manifest(format!(
                    "cannot read content of {} from {}: {}",
                    resource.name,
                    file.display(),
                    e
                ))
            })?;
            match String::from_utf8(bytes) {
                Ok(text) => Content::Text(text),
                Err(e) => Content::Bytes(e.into_bytes()),
            }
        }
        (None, None) => {
            return Err(DeployError::Manifest(format!(
                "{} has neither content nor file_path",
                resource.name
            )))
        }
    };

    let mut descriptor =
        ResourceDescriptor::new(resource.name, resource.path, content).with_access(resource.access);
    descriptor.file_path = file_path;
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_manifest_with_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.js"), "exports.handler = () => {}").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0xff, 0xfe]).unwrap();

        let manifest = serde_json::json!({
            "service_sid": "ZS1",
            "environment": "dev",
            "create_environment": true,
            "functions": [
                { "name": "hello", "path": "/hello", "file_path": "hello.js" }
            ],
            "assets": [
                { "name": "logo.png", "path": "/logo.png", "file_path": "logo.png" },
                { "name": "style.css", "path": "/style.css", "access": "private", "content": "body {}" }
            ],
            "env": { "API_KEY": "abc", "RETRIES": 3 },
            "dependencies": { "lodash": "^4.17.21" }
        });
        let path = dir.path().join("deploy.json");
        std::fs::write(&path, manifest.to_string()).unwrap();

        let request = DeployManifest::load(&path).await.unwrap();

        assert_eq!(request.service_sid.as_deref(), Some("ZS1"));
        assert!(request.service_name.is_none());
        assert!(request.create_environment);
        assert_eq!(request.functions[0].content, Content::from("exports.handler = () => {}"));
        assert_eq!(request.functions[0].file_path, Some(dir.path().join("hello.js")));
        assert!(matches!(request.assets[0].content, Content::Bytes(_)));
        assert_eq!(request.assets[1].access, Access::Private);
        assert_eq!(request.env.len(), 2);
        assert_eq!(request.dependencies["lodash"], "^4.17.21");
    }

    #[tokio::test]
    async fn test_resource_without_content() {
        let manifest = DeployManifest::from_json(
            r#"{ "service_sid": "ZS1", "environment": "dev",
                 "functions": [{ "name": "empty", "path": "/empty" }] }"#,
        )
        .unwrap();

        let err = manifest.into_request(Path::new(".")).await.unwrap_err();
        assert!(matches!(err, DeployError::Manifest(ref msg) if msg.contains("empty")));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = DeployManifest::load("/nonexistent/deploy.json").await.unwrap_err();
        assert!(matches!(err, DeployError::Manifest(_)));
    }

    #[tokio::test]
    async fn test_service_by_name() {
        let manifest = DeployManifest::from_json(
            r#"{ "service_name": "api-demo", "override_existing_service": true,
                 "environment": "test" }"#,
        )
        .unwrap();

        let request = manifest.into_request(Path::new(".")).await.unwrap();

        assert!(request.service_sid.is_none());
        assert_eq!(request.service_name.as_deref(), Some("api-demo"));
        assert!(request.override_existing_service);
    }

    #[test]
    fn test_invalid_json() {
        let err = DeployManifest::from_json("{ \"service_sid\": 1 }").unwrap_err();
        assert!(err.to_string().starts_with("Invalid deploy manifest"));
    }
}
