//! Build trigger: turns a synced model image into a pipeline run.

use tracing::info;

use crate::error::{EdgeError, Result, ResultExt};
use crate::images::{describe_image, ModelImage};
use crate::metadata::{ParamMap, ParamValue};
use crate::metrics::record_build;
use crate::model_registry::ModelRegistryApi;
use crate::tekton::{
    ClusterCredentials, Param, PipelineRun, PipelineRunApi, PipelineRunRef, VolumeClaimSpec, WorkspaceBinding,
    WorkspaceSource,
};

pub const PARAM_S3_SECRET: &str = "s3SecretName";
pub const PARAM_TEST_DATA: &str = "testDataConfigMapName";
pub const PARAM_ADD_DIR_WORKSPACE: &str = "addDirWorkspace";
pub const BUILD_VOLUME_SIZE: &str = "1Gi";

/// Required build parameters, checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub s3_secret_name: String,
    pub test_data_config_map: String,
    pub add_dir_workspace: bool,
}

fn required_string<'a>(params: &'a ParamMap, key: &str, kind: &str) -> Result<&'a str> {
    match params.get(key) {
        None => Err(EdgeError::validation(key, "is required")),
        Some(ParamValue::List(_)) => Err(EdgeError::validation(key, format!("must be a {kind}"))),
        Some(ParamValue::String(s)) => Ok(s),
    }
}

pub fn validate_build_params(params: &ParamMap) -> Result<BuildSettings> {
    let s3_secret_name = required_string(params, PARAM_S3_SECRET, "string")?.to_string();
    let test_data_config_map = required_string(params, PARAM_TEST_DATA, "string")?.to_string();
    let add_dir_workspace = required_string(params, PARAM_ADD_DIR_WORKSPACE, "boolean")? == "true";
    Ok(BuildSettings { s3_secret_name, test_data_config_map, add_dir_workspace })
}

/// `model-name` and `model-version` first, then every build parameter in key order.
pub fn to_pipeline_params(model_name: &str, model_version: &str, params: &ParamMap) -> Vec<Param> {
    let mut out = Vec::with_capacity(params.len() + 2);
    out.push(Param { name: "model-name".into(), value: model_name.into() });
    out.push(Param { name: "model-version".into(), value: model_version.into() });
    out.extend(params.iter().map(|(k, v)| Param { name: k.clone(), value: v.clone() }));
    out
}

pub fn workspaces(settings: &BuildSettings) -> Vec<WorkspaceBinding> {
    let mut ws = vec![
        WorkspaceBinding {
            name: "build-workspace-pv".into(),
            source: WorkspaceSource::VolumeClaimTemplate { spec: VolumeClaimSpec::read_write_once(BUILD_VOLUME_SIZE) },
        },
        WorkspaceBinding {
            name: "s3-secret".into(),
            source: WorkspaceSource::Secret { secret_name: settings.s3_secret_name.clone() },
        },
        WorkspaceBinding {
            name: "test-data".into(),
            source: WorkspaceSource::ConfigMap { name: settings.test_data_config_map.clone() },
        },
    ];
    if settings.add_dir_workspace {
        ws.push(WorkspaceBinding { name: "workspace".into(), source: WorkspaceSource::EmptyDir {} });
    }
    ws
}

/// Validates `params` and assembles the run for `image`. Refuses images that
/// need sync.
pub fn build_request(image: &ModelImage, namespace: &str, params: &ParamMap) -> Result<PipelineRun> {
    if image.needs_sync {
        return Err(EdgeError::NeedsSync(image.id.clone()));
    }
    let settings = validate_build_params(params)?;
    let run_params = to_pipeline_params(&image.name, &image.version, params);
    Ok(PipelineRun::new(namespace, run_params, workspaces(&settings)))
}

/// Resolves the image, checks it is in sync and submits its build. The image's
/// stored build parameters are used unless `params` overrides them.
pub async fn build_image<R, P>(
    registry: &R,
    platform: &P,
    image_id: &str,
    namespace: &str,
    credentials: &ClusterCredentials,
    params: Option<&ParamMap>,
) -> Result<PipelineRunRef>
where
    R: ModelRegistryApi + ?Sized,
    P: PipelineRunApi + ?Sized,
{
    if image_id.is_empty() || namespace.is_empty() {
        return Err(EdgeError::InvalidArgument("image ID and namespace are required".into()));
    }
    const CTX: &str = "failed to build model image";
    let image = describe_image(registry, image_id).await.context(CTX)?;
    let params = params.unwrap_or(&image.build_params);
    let run = build_request(&image, namespace, params).context(CTX)?;
    let created = platform.create_pipeline_run(credentials, &run).await.context(CTX)?;
    record_build();
    info!(image_id, run = %created.name, namespace = %created.namespace, "submitted image build");
    Ok(created)
}
