//! Model registry resources and the transport seam used to reach them.
//!
//! The hierarchy is registered model → model version → artifact. Every
//! operation that reads or writes the registry takes a [`ModelRegistryApi`]
//! handle so tests can swap in an in-memory registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EdgeError, Result};
use crate::metadata::CustomProperties;

pub const MODEL_ARTIFACT_TYPE: &str = "model-artifact";
/// Format recorded on artifacts created for edge container images.
pub const CONTAINER_IMAGE_FORMAT: &str = "ContainerImage";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredModel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "CustomProperties::is_empty")]
    pub custom_properties: CustomProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "registeredModelID", skip_serializing_if = "String::is_empty")]
    pub registered_model_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub custom_properties: CustomProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub artifact_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "externalID")]
    pub external_id: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub model_format_name: String,
    #[serde(default)]
    pub model_format_version: String,
}

impl Artifact {
    /// A model artifact carrying an edge container image identity.
    pub fn container_image(name: &str, description: &str, external_id: &str) -> Self {
        Self {
            artifact_type: MODEL_ARTIFACT_TYPE.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            external_id: external_id.to_string(),
            model_format_name: CONTAINER_IMAGE_FORMAT.to_string(),
            ..Default::default()
        }
    }

    pub fn is_model_artifact(&self) -> bool {
        self.artifact_type.is_empty() || self.artifact_type == MODEL_ARTIFACT_TYPE
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[async_trait]
pub trait ModelRegistryApi: Send + Sync {
    async fn get_registered_models(&self) -> Result<Vec<RegisteredModel>>;
    async fn get_registered_model(&self, model_id: &str) -> Result<RegisteredModel>;
    async fn create_registered_model(
        &self,
        name: &str,
        description: &str,
        custom_properties: Option<CustomProperties>,
    ) -> Result<RegisteredModel>;

    async fn get_model_versions(&self, model_id: &str) -> Result<Vec<ModelVersion>>;
    async fn get_model_version(&self, version_id: &str) -> Result<ModelVersion>;
    /// Fails with [`EdgeError::FindModelVersionFailed`] when the model has no version by that name.
    async fn find_model_version(&self, model_id: &str, version_name: &str) -> Result<ModelVersion>;
    async fn create_model_version(
        &self,
        model_id: &str,
        version_name: &str,
        custom_properties: Option<CustomProperties>,
    ) -> Result<ModelVersion>;
    /// Replaces the version's custom properties wholesale.
    async fn update_model_version(&self, version_id: &str, custom_properties: CustomProperties) -> Result<ModelVersion>;

    async fn get_model_version_artifacts(&self, version_id: &str) -> Result<Vec<Artifact>>;
    async fn create_model_artifact(&self, version_id: &str, artifact: &Artifact) -> Result<Artifact>;
    /// Sets `external_id` on the artifact; no other field changes.
    async fn update_model_artifact(&self, artifact_id: &str, external_id: &str) -> Result<Artifact>;

    /// The model artifact named `artifact_name` under the version, or
    /// [`EdgeError::FindArtifactFailed`].
    async fn find_model_version_artifact(&self, version_id: &str, artifact_name: &str) -> Result<Artifact> {
        if artifact_name.is_empty() {
            return Err(EdgeError::InvalidArgument("artifactName is required".into()));
        }
        self.get_model_version_artifacts(version_id)
            .await?
            .into_iter()
            .find(|a| a.is_model_artifact() && a.name == artifact_name)
            .ok_or_else(|| EdgeError::FindArtifactFailed(format!("artifact name: {artifact_name} version id: {version_id}")))
    }
}
