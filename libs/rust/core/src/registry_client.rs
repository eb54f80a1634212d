//! HTTP client for the model registry REST API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{classify, EdgeError, RegistryOp, Result};
use crate::metadata::CustomProperties;
use crate::metrics::record_mutation;
use crate::model_registry::{Artifact, ItemList, ModelRegistryApi, ModelVersion, RegisteredModel};

pub const DEFAULT_API_PATH: &str = "/api/model_registry/v1alpha3";

/// Error body returned by the registry: `{"code": "...", "message": "..."}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredModelCreate<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_properties: Option<CustomProperties>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelVersionCreate<'a> {
    name: &'a str,
    registered_model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_properties: Option<CustomProperties>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelArtifactUpdate<'a> {
    artifact_type: &'static str,
    external_id: &'a str,
}

#[derive(Clone, Debug)]
pub struct RegistryClient {
    http: Client,
    base: String,
}

impl RegistryClient {
    pub fn new(registry_url: &str, api_path: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| EdgeError::Transport { op: "build registry http client", source: e })?;
        Ok(Self::with_http(http, registry_url, api_path))
    }

    pub fn with_http(http: Client, registry_url: &str, api_path: &str) -> Self {
        let base = format!("{}{}", registry_url.trim_end_matches('/'), api_path);
        Self { http, base }
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base, path) }

    /// Sends the request and decodes the body when the status is exactly the
    /// one `op` promises; anything else goes through [`classify`].
    async fn send<T: DeserializeOwned>(&self, op: RegistryOp, subject: &str, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await.map_err(|e| EdgeError::Transport { op: op.describe(), source: e })?;
        let status = resp.status();
        debug!(op = op.describe(), status = status.as_u16(), "registry response");
        if status.as_u16() == op.expected_status() {
            return resp.json::<T>().await.map_err(|e| EdgeError::Transport { op: op.describe(), source: e });
        }
        if status.is_success() {
            return Err(EdgeError::UnexpectedStatus { op: op.describe(), status: status.as_u16(), message: None });
        }
        let message = resp.json::<ApiErrorBody>().await.ok().and_then(|b| b.message);
        Err(classify(op, status.as_u16(), message.as_deref(), subject))
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() { Err(EdgeError::InvalidArgument(format!("{what} is required"))) } else { Ok(()) }
}

#[async_trait]
impl ModelRegistryApi for RegistryClient {
    async fn get_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let list: ItemList<RegisteredModel> =
            self.send(RegistryOp::ListModels, "", self.http.get(self.url("/registered_models"))).await?;
        Ok(list.items)
    }

    async fn get_registered_model(&self, model_id: &str) -> Result<RegisteredModel> {
        require(model_id, "id")?;
        let req = self.http.get(self.url(&format!("/registered_models/{model_id}")));
        self.send(RegistryOp::GetModel, &format!("model id: {model_id}"), req).await
    }

    async fn create_registered_model(
        &self,
        name: &str,
        description: &str,
        custom_properties: Option<CustomProperties>,
    ) -> Result<RegisteredModel> {
        if name.is_empty() || description.is_empty() {
            return Err(EdgeError::InvalidArgument("name and description are required".into()));
        }
        let body = RegisteredModelCreate { name, description, custom_properties };
        let req = self.http.post(self.url("/registered_models")).json(&body);
        let model: RegisteredModel = self.send(RegistryOp::CreateModel, &format!("model name: {name}"), req).await?;
        record_mutation(RegistryOp::CreateModel);
        Ok(model)
    }

    async fn get_model_versions(&self, model_id: &str) -> Result<Vec<ModelVersion>> {
        require(model_id, "registeredModelId")?;
        let req = self.http.get(self.url(&format!("/registered_models/{model_id}/versions")));
        let list: ItemList<ModelVersion> = self.send(RegistryOp::ListVersions, &format!("model id: {model_id}"), req).await?;
        Ok(list.items)
    }

    async fn get_model_version(&self, version_id: &str) -> Result<ModelVersion> {
        require(version_id, "id")?;
        let req = self.http.get(self.url(&format!("/model_versions/{version_id}")));
        self.send(RegistryOp::GetVersion, &format!("version id: {version_id}"), req).await
    }

    async fn find_model_version(&self, model_id: &str, version_name: &str) -> Result<ModelVersion> {
        require(version_name, "versionName")?;
        let req = self
            .http
            .get(self.url("/model_version"))
            .query(&[("name", version_name), ("parentResourceId", model_id)]);
        self.send(RegistryOp::FindVersion, &format!("version name: {version_name}"), req).await
    }

    async fn create_model_version(
        &self,
        model_id: &str,
        version_name: &str,
        custom_properties: Option<CustomProperties>,
    ) -> Result<ModelVersion> {
        if model_id.is_empty() || version_name.is_empty() {
            return Err(EdgeError::InvalidArgument("model ID and version are required".into()));
        }
        let body = ModelVersionCreate { name: version_name, registered_model_id: model_id, custom_properties };
        let req = self.http.post(self.url(&format!("/registered_models/{model_id}/versions"))).json(&body);
        let subject = format!("model id: {model_id} version name: {version_name}");
        let version: ModelVersion = self.send(RegistryOp::CreateVersion, &subject, req).await?;
        record_mutation(RegistryOp::CreateVersion);
        Ok(version)
    }

    async fn update_model_version(&self, version_id: &str, custom_properties: CustomProperties) -> Result<ModelVersion> {
        require(version_id, "versionId")?;
        let mut version = self.get_model_version(version_id).await?;
        version.custom_properties = custom_properties;
        let req = self.http.patch(self.url(&format!("/model_versions/{version_id}"))).json(&version);
        let updated: ModelVersion = self.send(RegistryOp::UpdateVersion, &format!("version id: {version_id}"), req).await?;
        record_mutation(RegistryOp::UpdateVersion);
        Ok(updated)
    }

    async fn get_model_version_artifacts(&self, version_id: &str) -> Result<Vec<Artifact>> {
        require(version_id, "modelVersionId")?;
        let req = self.http.get(self.url(&format!("/model_versions/{version_id}/artifacts")));
        let list: ItemList<Artifact> = self.send(RegistryOp::ListArtifacts, &format!("version id: {version_id}"), req).await?;
        Ok(list.items)
    }

    async fn create_model_artifact(&self, version_id: &str, artifact: &Artifact) -> Result<Artifact> {
        if version_id.is_empty() || artifact.name.is_empty() {
            return Err(EdgeError::InvalidArgument("versionId and name are required".into()));
        }
        let req = self.http.post(self.url(&format!("/model_versions/{version_id}/artifacts"))).json(artifact);
        let subject = format!("version id: {version_id} artifact name: {}", artifact.name);
        let created: Artifact = self.send(RegistryOp::CreateArtifact, &subject, req).await?;
        record_mutation(RegistryOp::CreateArtifact);
        Ok(created)
    }

    async fn update_model_artifact(&self, artifact_id: &str, external_id: &str) -> Result<Artifact> {
        require(artifact_id, "artifactId")?;
        let body = ModelArtifactUpdate { artifact_type: crate::model_registry::MODEL_ARTIFACT_TYPE, external_id };
        let req = self.http.patch(self.url(&format!("/model_artifacts/{artifact_id}"))).json(&body);
        let updated: Artifact = self.send(RegistryOp::UpdateArtifact, &format!("artifact id: {artifact_id}"), req).await?;
        record_mutation(RegistryOp::UpdateArtifact);
        Ok(updated)
    }
}
