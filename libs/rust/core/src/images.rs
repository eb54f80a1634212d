//! Model image read-model, rebuilt from the registry on every call.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::drift::needs_sync;
use crate::error::{EdgeError, Result, ResultExt};
use crate::metadata::{decode, ParamMap};
use crate::metrics::record_drift;
use crate::model_registry::{Artifact, ModelRegistryApi, ModelVersion, RegisteredModel};

/// Lifecycle of a model image. Only `NeedsSync`/`Synced` are derived from the
/// registry; build outcomes are observed on the execution platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageStatus { Unknown, NeedsSync, Synced, Building, Live, Failed }

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImageStatus::Unknown => "Unknown",
            ImageStatus::NeedsSync => "Needs Sync",
            ImageStatus::Synced => "Synced",
            ImageStatus::Building => "Building",
            ImageStatus::Live => "Live",
            ImageStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<RegisteredModel> for Model {
    fn from(m: RegisteredModel) -> Self { Self { id: m.id, name: m.name, description: m.description } }
}

/// One registered model + version + artifact. `id` is the artifact's external
/// id and is empty when the registry holds none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelImage {
    pub id: String,
    pub model_id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub uri: String,
    pub needs_sync: bool,
    pub status: ImageStatus,
    pub build_params: ParamMap,
}

impl ModelImage {
    fn unsynced(model: &RegisteredModel, version: &ModelVersion, build_params: ParamMap) -> Self {
        Self {
            id: String::new(),
            model_id: model.id.clone(),
            name: model.name.clone(),
            description: model.description.clone(),
            version: version.name.clone(),
            uri: String::new(),
            needs_sync: true,
            status: ImageStatus::NeedsSync,
            build_params,
        }
    }

    pub(crate) fn from_records(model: &RegisteredModel, version: &ModelVersion, artifact: &Artifact, build_params: ParamMap) -> Self {
        let mut image = Self::unsynced(model, version, build_params);
        image.uri = artifact.uri.clone();
        if artifact.is_model_artifact() && !artifact.external_id.is_empty() {
            image.id = artifact.external_id.clone();
            image.needs_sync = needs_sync(model, version, artifact);
        }
        if image.needs_sync {
            record_drift();
            debug!(model = %model.name, version = %version.name, artifact = %artifact.name, "image needs sync");
        } else {
            image.status = ImageStatus::Synced;
        }
        image
    }
}

pub async fn list_models<R: ModelRegistryApi + ?Sized>(registry: &R) -> Result<Vec<Model>> {
    let models = registry.get_registered_models().await.context("failed to get models")?;
    Ok(models.into_iter().map(Model::from).collect())
}

/// Every (model, version, artifact) combination in the registry. A version
/// without artifacts yields a single image that needs sync.
pub async fn list_images<R: ModelRegistryApi + ?Sized>(registry: &R) -> Result<Vec<ModelImage>> {
    const CTX: &str = "failed to get model images";
    let models = registry.get_registered_models().await.context(CTX)?;
    let mut images = Vec::new();
    for model in &models {
        let versions = registry.get_model_versions(&model.id).await.context(CTX)?;
        for version in &versions {
            let artifacts = registry.get_model_version_artifacts(&version.id).await.context(CTX)?;
            let params = decode(&version.custom_properties).context(CTX)?;
            if artifacts.is_empty() {
                record_drift();
                images.push(ModelImage::unsynced(model, version, params));
                continue;
            }
            for artifact in &artifacts {
                images.push(ModelImage::from_records(model, version, artifact, params.clone()));
            }
        }
    }
    debug!(count = images.len(), "listed model images");
    Ok(images)
}

pub async fn describe_image<R: ModelRegistryApi + ?Sized>(registry: &R, image_id: &str) -> Result<ModelImage> {
    if image_id.is_empty() {
        return Err(EdgeError::InvalidArgument("image ID is required".into()));
    }
    list_images(registry)
        .await?
        .into_iter()
        .find(|i| i.id == image_id)
        .ok_or_else(|| EdgeError::ImageNotFound(image_id.to_string()))
}
