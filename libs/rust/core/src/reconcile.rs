//! Ensure-exists upserts of the model → version → artifact hierarchy.
//!
//! The registry only offers create/read/update, so each level is looked up
//! first and created or updated depending on what comes back. Runs assume
//! exclusive access to the resources they touch; a failure part-way leaves
//! whatever was already written in place.

use tracing::{debug, info};

use crate::error::{EdgeError, Result, ResultExt};
use crate::fingerprint::fingerprint;
use crate::images::ModelImage;
use crate::metadata::{decode, encode, mark_edge_compatible, ParamMap};
use crate::model_registry::{Artifact, ModelRegistryApi, ModelVersion};

/// Makes sure the version and its image artifact exist and are in sync, and
/// returns the build parameters now stored on the version.
///
/// With `params` the version's custom properties are replaced by them (plus
/// the edge-compatible flag) even when nothing changed. Without `params` the
/// version must already exist and its stored parameters are used.
pub async fn ensure_resources<R: ModelRegistryApi + ?Sized>(
    registry: &R,
    model_id: &str,
    version_name: &str,
    params: Option<&ParamMap>,
) -> Result<ParamMap> {
    if model_id.is_empty() || version_name.is_empty() {
        return Err(EdgeError::InvalidArgument("registered model ID and model version name required".into()));
    }
    const CTX: &str = "failed to ensure resources are in model registry";
    let model = registry.get_registered_model(model_id).await.context(CTX)?;
    let (version, resolved) = ensure_version(registry, model_id, version_name, params).await.context(CTX)?;
    ensure_artifact(registry, &model.name, &version, &model.name, &model.description).await.context(CTX)?;
    Ok(resolved)
}

pub async fn ensure_version<R: ModelRegistryApi + ?Sized>(
    registry: &R,
    model_id: &str,
    version_name: &str,
    params: Option<&ParamMap>,
) -> Result<(ModelVersion, ParamMap)> {
    const CTX: &str = "failed to ensure version is in model registry";
    let found = match registry.find_model_version(model_id, version_name).await {
        Ok(v) => Some(v),
        Err(e) if matches!(e.root(), EdgeError::FindModelVersionFailed(_)) => None,
        Err(e) => return Err(e.context(CTX)),
    };
    let version = match (found, params) {
        (None, None) => {
            return Err(EdgeError::VersionNotFound(format!("{version_name} (no parameters provided to create it)")).context(CTX));
        }
        (None, Some(params)) => {
            let props = encode(&mark_edge_compatible(params)).context(CTX)?;
            let v = registry.create_model_version(model_id, version_name, Some(props)).await.context(CTX)?;
            info!(model_id, version = version_name, version_id = %v.id, "created model version");
            v
        }
        (Some(existing), Some(params)) => {
            let props = encode(&mark_edge_compatible(params)).context(CTX)?;
            let v = registry.update_model_version(&existing.id, props).await.context(CTX)?;
            info!(model_id, version = version_name, version_id = %v.id, "replaced model version parameters");
            v
        }
        (Some(existing), None) => existing,
    };
    let resolved = decode(&version.custom_properties).context(CTX)?;
    Ok((version, resolved))
}

/// Creates the artifact if missing and repairs a stale external id; an
/// artifact that already carries the expected id is left untouched.
pub async fn ensure_artifact<R: ModelRegistryApi + ?Sized>(
    registry: &R,
    model_name: &str,
    version: &ModelVersion,
    artifact_name: &str,
    description: &str,
) -> Result<Artifact> {
    const CTX: &str = "failed to ensure artifact is in model registry";
    let expected = fingerprint(model_name, &version.name, artifact_name);
    match registry.find_model_version_artifact(&version.id, artifact_name).await {
        Ok(artifact) if artifact.external_id == expected => {
            debug!(artifact_id = %artifact.id, external_id = %expected, "artifact already in sync");
            Ok(artifact)
        }
        Ok(artifact) => {
            let updated = registry.update_model_artifact(&artifact.id, &expected).await.context(CTX)?;
            info!(artifact_id = %artifact.id, old = %artifact.external_id, new = %expected, "updated artifact external id");
            Ok(updated)
        }
        Err(e) if matches!(e.root(), EdgeError::FindArtifactFailed(_)) => {
            let new = Artifact::container_image(artifact_name, description, &expected);
            let created = registry.create_model_artifact(&version.id, &new).await.context(CTX)?;
            info!(version_id = %version.id, artifact = artifact_name, external_id = %expected, "created artifact");
            Ok(created)
        }
        Err(e) => Err(e.context(CTX)),
    }
}

/// Registers a new model, its first version and the image artifact in one go.
/// Existing resources are reported as `ModelExists`/`VersionExists`/`ArtifactExists`.
pub async fn add_model<R: ModelRegistryApi + ?Sized>(
    registry: &R,
    name: &str,
    description: &str,
    version_name: &str,
    params: &ParamMap,
) -> Result<ModelImage> {
    if name.is_empty() || description.is_empty() || version_name.is_empty() {
        return Err(EdgeError::InvalidArgument("model name, description and version are required".into()));
    }
    const CTX: &str = "failed to add model image";
    let params = mark_edge_compatible(params);
    let props = encode(&params).context(CTX)?;
    let model = registry.create_registered_model(name, description, None).await.context(CTX)?;
    let version = registry.create_model_version(&model.id, version_name, Some(props)).await.context(CTX)?;
    let artifact = Artifact::container_image(name, description, &fingerprint(name, version_name, name));
    let artifact = registry.create_model_artifact(&version.id, &artifact).await.context(CTX)?;
    info!(model_id = %model.id, version = version_name, image_id = %artifact.external_id, "registered model image");
    Ok(ModelImage::from_records(&model, &version, &artifact, params))
}
