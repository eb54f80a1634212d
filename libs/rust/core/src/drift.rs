//! Drift detection between registry records and the locally computed identity.

use crate::fingerprint::fingerprint;
use crate::metadata::{MetadataValue, EDGE_COMPATIBLE_KEY};
use crate::model_registry::{Artifact, ModelVersion, RegisteredModel};

/// True unless the artifact's external id is the fingerprint of
/// (model, version, artifact) names and the version is flagged edge compatible.
pub fn needs_sync(model: &RegisteredModel, version: &ModelVersion, artifact: &Artifact) -> bool {
    if !artifact.is_model_artifact() || artifact.external_id.is_empty() {
        return true;
    }
    if artifact.external_id != fingerprint(&model.name, &version.name, &artifact.name) {
        return true;
    }
    !is_edge_compatible(version)
}

pub fn is_edge_compatible(version: &ModelVersion) -> bool {
    matches!(
        version.custom_properties.get(EDGE_COMPATIBLE_KEY),
        Some(MetadataValue::String { string_value }) if string_value == "true"
    )
}
