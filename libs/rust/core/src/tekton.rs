//! Tekton `PipelineRun` resources and their submission to a cluster.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{EdgeError, Result};
use crate::metadata::ParamValue;

pub const PIPELINE_NAME: &str = "aiedge-e2e";
pub const SERVICE_ACCOUNT: &str = "pipeline";
const OP_SUBMIT: &str = "create pipeline run";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PipelineRunSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate_name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    pub pipeline_ref: PipelineRef,
    pub task_run_template: TaskRunTemplate,
    pub params: Vec<Param>,
    pub workspaces: Vec<WorkspaceBinding>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRef { pub name: String }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunTemplate { pub service_account_name: String }

/// `value` serializes as a JSON string or array, which is how Tekton tells
/// string params from array params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceBinding {
    pub name: String,
    #[serde(flatten)]
    pub source: WorkspaceSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkspaceSource {
    VolumeClaimTemplate { spec: VolumeClaimSpec },
    Secret { #[serde(rename = "secretName")] secret_name: String },
    ConfigMap { name: String },
    EmptyDir {},
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaimSpec {
    pub access_modes: Vec<String>,
    pub resources: VolumeResources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeResources { pub requests: BTreeMap<String, String> }

impl VolumeClaimSpec {
    pub fn read_write_once(storage: &str) -> Self {
        Self {
            access_modes: vec!["ReadWriteOnce".to_string()],
            resources: VolumeResources { requests: BTreeMap::from([("storage".to_string(), storage.to_string())]) },
        }
    }
}

impl PipelineRun {
    pub fn new(namespace: &str, params: Vec<Param>, workspaces: Vec<WorkspaceBinding>) -> Self {
        Self {
            api_version: "tekton.dev/v1".to_string(),
            kind: "PipelineRun".to_string(),
            metadata: ObjectMeta {
                generate_name: format!("{PIPELINE_NAME}-"),
                namespace: namespace.to_string(),
                labels: BTreeMap::from([("tekton.dev/pipeline".to_string(), PIPELINE_NAME.to_string())]),
                ..Default::default()
            },
            spec: PipelineRunSpec {
                pipeline_ref: PipelineRef { name: PIPELINE_NAME.to_string() },
                task_run_template: TaskRunTemplate { service_account_name: SERVICE_ACCOUNT.to_string() },
                params,
                workspaces,
            },
        }
    }
}

/// Name and namespace the cluster assigned to a submitted run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRunRef {
    pub name: String,
    pub namespace: String,
}

#[derive(Deserialize)]
struct CreatedResource { metadata: ObjectMeta }

/// Cluster access supplied by the caller for a single submission.
#[derive(Debug, Clone, Default)]
pub struct ClusterCredentials {
    pub server: String,
    pub token: String,
    pub insecure_skip_tls_verify: bool,
    pub certificate_authority_pem: Option<Vec<u8>>,
}

#[async_trait]
pub trait PipelineRunApi: Send + Sync {
    async fn create_pipeline_run(&self, credentials: &ClusterCredentials, run: &PipelineRun) -> Result<PipelineRunRef>;
}

/// Submits runs through the Kubernetes API server of the given credentials.
#[derive(Debug, Clone, Default)]
pub struct TektonClient;

impl TektonClient {
    fn http(credentials: &ClusterCredentials) -> Result<Client> {
        let mut builder = Client::builder().danger_accept_invalid_certs(credentials.insecure_skip_tls_verify);
        if let Some(pem) = &credentials.certificate_authority_pem {
            let cert = reqwest::Certificate::from_pem(pem).map_err(|e| EdgeError::Transport { op: OP_SUBMIT, source: e })?;
            builder = builder.add_root_certificate(cert);
        }
        builder.build().map_err(|e| EdgeError::Transport { op: OP_SUBMIT, source: e })
    }
}

pub fn pipeline_runs_url(server: &str, namespace: &str) -> String {
    format!("{}/apis/tekton.dev/v1/namespaces/{namespace}/pipelineruns", server.trim_end_matches('/'))
}

#[async_trait]
impl PipelineRunApi for TektonClient {
    async fn create_pipeline_run(&self, credentials: &ClusterCredentials, run: &PipelineRun) -> Result<PipelineRunRef> {
        if credentials.server.is_empty() {
            return Err(EdgeError::InvalidArgument("cluster API server is required".into()));
        }
        let http = Self::http(credentials)?;
        let mut req = http.post(pipeline_runs_url(&credentials.server, &run.metadata.namespace)).json(run);
        if !credentials.token.is_empty() {
            req = req.bearer_auth(&credentials.token);
        }
        let resp = req.send().await.map_err(|e| EdgeError::Transport { op: OP_SUBMIT, source: e })?;
        let status = resp.status().as_u16();
        if status != 201 {
            let message = resp.text().await.ok().filter(|t| !t.is_empty());
            return Err(EdgeError::UnexpectedStatus { op: OP_SUBMIT, status, message });
        }
        let created: CreatedResource = resp.json().await.map_err(|e| EdgeError::Transport { op: OP_SUBMIT, source: e })?;
        Ok(PipelineRunRef { name: created.metadata.name, namespace: created.metadata.namespace })
    }
}
