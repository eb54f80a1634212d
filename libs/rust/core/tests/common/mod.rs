//! In-memory registry and pipeline submitter shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use edge_core::error::EdgeError;
use edge_core::tekton::PipelineRun;
use edge_core::{
    Artifact, ClusterCredentials, CustomProperties, ModelRegistryApi, ModelVersion, PipelineRunApi, PipelineRunRef,
    RegisteredModel, Result,
};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    next_id: u64,
    models: Vec<RegisteredModel>,
    versions: Vec<ModelVersion>,
    artifacts: Vec<(String, Artifact)>,
    mutations: Vec<String>,
    fail_artifact_create: bool,
    version_taken: bool,
    artifact_taken: bool,
}

impl State {
    fn id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// Behaves like the registry as seen through the HTTP client: lookups fail
/// with the classified errors, creates reject duplicates.
#[derive(Default)]
pub struct FakeRegistry {
    state: Mutex<State>,
}

impl FakeRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn seed_model(&self, name: &str, description: &str) -> String {
        let mut st = self.state.lock();
        let id = st.id();
        st.models.push(RegisteredModel { id: id.clone(), name: name.into(), description: description.into(), ..Default::default() });
        id
    }

    pub fn seed_version(&self, model_id: &str, name: &str, props: CustomProperties) -> String {
        let mut st = self.state.lock();
        let id = st.id();
        st.versions.push(ModelVersion {
            id: id.clone(),
            name: name.into(),
            registered_model_id: model_id.into(),
            custom_properties: props,
            ..Default::default()
        });
        id
    }

    pub fn seed_artifact(&self, version_id: &str, mut artifact: Artifact) -> String {
        let mut st = self.state.lock();
        let id = st.id();
        artifact.id = id.clone();
        st.artifacts.push((version_id.into(), artifact));
        id
    }

    pub fn fail_artifact_create(&self) { self.state.lock().fail_artifact_create = true; }

    /// Version creates report "already exists", as when another writer won the race.
    pub fn version_taken(&self) { self.state.lock().version_taken = true; }

    pub fn artifact_taken(&self) { self.state.lock().artifact_taken = true; }

    pub fn models(&self) -> Vec<RegisteredModel> { self.state.lock().models.clone() }

    pub fn mutations(&self) -> Vec<String> { self.state.lock().mutations.clone() }

    pub fn versions(&self) -> Vec<ModelVersion> { self.state.lock().versions.clone() }

    pub fn artifacts(&self) -> Vec<Artifact> { self.state.lock().artifacts.iter().map(|(_, a)| a.clone()).collect() }
}

#[async_trait]
impl ModelRegistryApi for FakeRegistry {
    async fn get_registered_models(&self) -> Result<Vec<RegisteredModel>> { Ok(self.state.lock().models.clone()) }

    async fn get_registered_model(&self, model_id: &str) -> Result<RegisteredModel> {
        let st = self.state.lock();
        st.models.iter().find(|m| m.id == model_id).cloned().ok_or_else(|| EdgeError::ModelNotFound(model_id.into()))
    }

    async fn create_registered_model(&self, name: &str, description: &str, custom_properties: Option<CustomProperties>) -> Result<RegisteredModel> {
        let mut st = self.state.lock();
        if st.models.iter().any(|m| m.name == name) {
            return Err(EdgeError::ModelExists(name.into()));
        }
        let id = st.id();
        let model = RegisteredModel {
            id,
            name: name.into(),
            description: description.into(),
            custom_properties: custom_properties.unwrap_or_default(),
        };
        st.models.push(model.clone());
        st.mutations.push(format!("create_model:{name}"));
        Ok(model)
    }

    async fn get_model_versions(&self, model_id: &str) -> Result<Vec<ModelVersion>> {
        let st = self.state.lock();
        if !st.models.iter().any(|m| m.id == model_id) {
            return Err(EdgeError::ModelNotFound(model_id.into()));
        }
        Ok(st.versions.iter().filter(|v| v.registered_model_id == model_id).cloned().collect())
    }

    async fn get_model_version(&self, version_id: &str) -> Result<ModelVersion> {
        let st = self.state.lock();
        st.versions.iter().find(|v| v.id == version_id).cloned().ok_or_else(|| EdgeError::VersionNotFound(version_id.into()))
    }

    async fn find_model_version(&self, model_id: &str, version_name: &str) -> Result<ModelVersion> {
        let st = self.state.lock();
        st.versions
            .iter()
            .find(|v| v.registered_model_id == model_id && v.name == version_name)
            .cloned()
            .ok_or_else(|| EdgeError::FindModelVersionFailed(version_name.into()))
    }

    async fn create_model_version(&self, model_id: &str, version_name: &str, custom_properties: Option<CustomProperties>) -> Result<ModelVersion> {
        let mut st = self.state.lock();
        if !st.models.iter().any(|m| m.id == model_id) {
            return Err(EdgeError::ModelNotFound(model_id.into()));
        }
        if st.version_taken || st.versions.iter().any(|v| v.registered_model_id == model_id && v.name == version_name) {
            return Err(EdgeError::VersionExists(version_name.into()));
        }
        let id = st.id();
        let version = ModelVersion {
            id,
            name: version_name.into(),
            registered_model_id: model_id.into(),
            custom_properties: custom_properties.unwrap_or_default(),
            ..Default::default()
        };
        st.versions.push(version.clone());
        st.mutations.push(format!("create_version:{version_name}"));
        Ok(version)
    }

    async fn update_model_version(&self, version_id: &str, custom_properties: CustomProperties) -> Result<ModelVersion> {
        let mut st = self.state.lock();
        let version = st.versions.iter_mut().find(|v| v.id == version_id).ok_or_else(|| EdgeError::VersionNotFound(version_id.into()))?;
        version.custom_properties = custom_properties;
        let updated = version.clone();
        st.mutations.push(format!("update_version:{}", updated.name));
        Ok(updated)
    }

    async fn get_model_version_artifacts(&self, version_id: &str) -> Result<Vec<Artifact>> {
        let st = self.state.lock();
        if !st.versions.iter().any(|v| v.id == version_id) {
            return Err(EdgeError::VersionNotFound(version_id.into()));
        }
        Ok(st.artifacts.iter().filter(|(v, _)| v == version_id).map(|(_, a)| a.clone()).collect())
    }

    async fn create_model_artifact(&self, version_id: &str, artifact: &Artifact) -> Result<Artifact> {
        let mut st = self.state.lock();
        if st.fail_artifact_create {
            return Err(EdgeError::UnexpectedStatus { op: "create model version artifact", status: 500, message: Some("boom".into()) });
        }
        if st.artifact_taken || st.artifacts.iter().any(|(v, a)| v == version_id && a.name == artifact.name) {
            return Err(EdgeError::ArtifactExists(artifact.name.clone()));
        }
        let mut created = artifact.clone();
        created.id = st.id();
        st.artifacts.push((version_id.into(), created.clone()));
        st.mutations.push(format!("create_artifact:{}", created.name));
        Ok(created)
    }

    async fn update_model_artifact(&self, artifact_id: &str, external_id: &str) -> Result<Artifact> {
        let mut st = self.state.lock();
        let (_, artifact) = st
            .artifacts
            .iter_mut()
            .find(|(_, a)| a.id == artifact_id)
            .ok_or_else(|| EdgeError::ArtifactNotFound(artifact_id.into()))?;
        artifact.external_id = external_id.into();
        let updated = artifact.clone();
        st.mutations.push(format!("update_artifact:{artifact_id}"));
        Ok(updated)
    }
}

/// Records submitted runs and names them like the API server would.
#[derive(Default)]
pub struct FakePlatform {
    pub runs: Mutex<Vec<PipelineRun>>,
}

#[async_trait]
impl PipelineRunApi for FakePlatform {
    async fn create_pipeline_run(&self, _credentials: &ClusterCredentials, run: &PipelineRun) -> Result<PipelineRunRef> {
        let mut runs = self.runs.lock();
        runs.push(run.clone());
        Ok(PipelineRunRef { name: format!("{}{:05}", run.metadata.generate_name, runs.len()), namespace: run.metadata.namespace.clone() })
    }
}
