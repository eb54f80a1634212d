//! Entry point for managing edge model images.

use crate::build;
use crate::error::Result;
use crate::images::{self, Model, ModelImage};
use crate::metadata::ParamMap;
use crate::model_registry::ModelRegistryApi;
use crate::reconcile;
use crate::registry_client::RegistryClient;
use crate::tekton::{ClusterCredentials, PipelineRunApi, PipelineRunRef, TektonClient};
use crate::EdgeConfig;

/// Holds the registry and execution platform handles. It keeps no state
/// between calls; every listing is rebuilt from the registry.
pub struct EdgeClient<R = RegistryClient, P = TektonClient> {
    registry: R,
    platform: P,
}

impl EdgeClient {
    pub fn from_config(cfg: &EdgeConfig) -> Result<Self> {
        let registry = RegistryClient::new(&cfg.model_registry_url, &cfg.registry_api_path)?;
        Ok(Self::new(registry, TektonClient))
    }
}

impl<R: ModelRegistryApi, P: PipelineRunApi> EdgeClient<R, P> {
    pub fn new(registry: R, platform: P) -> Self { Self { registry, platform } }

    pub fn registry(&self) -> &R { &self.registry }

    pub fn platform(&self) -> &P { &self.platform }

    pub async fn list_models(&self) -> Result<Vec<Model>> { images::list_models(&self.registry).await }

    pub async fn list_images(&self) -> Result<Vec<ModelImage>> { images::list_images(&self.registry).await }

    pub async fn describe_image(&self, image_id: &str) -> Result<ModelImage> {
        images::describe_image(&self.registry, image_id).await
    }

    /// Reconciles the version and artifact with `params` (or with the
    /// parameters already stored when `None`) and returns the stored parameters.
    pub async fn sync_image(&self, model_id: &str, version_name: &str, params: Option<&ParamMap>) -> Result<ParamMap> {
        reconcile::ensure_resources(&self.registry, model_id, version_name, params).await
    }

    pub async fn build_image(
        &self,
        image_id: &str,
        namespace: &str,
        credentials: &ClusterCredentials,
        params: Option<&ParamMap>,
    ) -> Result<PipelineRunRef> {
        build::build_image(&self.registry, &self.platform, image_id, namespace, credentials, params).await
    }

    pub async fn add_model(&self, name: &str, description: &str, version_name: &str, params: &ParamMap) -> Result<ModelImage> {
        reconcile::add_model(&self.registry, name, description, version_name, params).await
    }
}
