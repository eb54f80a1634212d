//! Sync, list and build flows against an in-memory registry.

mod common;

use common::{FakePlatform, FakeRegistry};
use edge_core::error::EdgeError;
use edge_core::metadata::encode;
use edge_core::tekton::WorkspaceSource;
use edge_core::{fingerprint, Artifact, ClusterCredentials, EdgeClient, ImageStatus, MetadataValue, ParamMap, ParamValue, EDGE_COMPATIBLE_KEY};

fn build_params() -> ParamMap {
    let mut p = ParamMap::new();
    p.insert("s3SecretName".into(), "s".into());
    p.insert("testDataConfigMapName".into(), "t".into());
    p.insert("addDirWorkspace".into(), "true".into());
    p
}

fn client() -> EdgeClient<FakeRegistry, FakePlatform> { EdgeClient::new(FakeRegistry::new(), FakePlatform::default()) }

fn creds() -> ClusterCredentials {
    ClusterCredentials { server: "https://api.test:6443".into(), token: "t0k".into(), ..Default::default() }
}

#[tokio::test]
async fn sync_creates_version_and_artifact_then_lists_synced() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "housing model");
    assert!(c.list_images().await.unwrap().is_empty());

    let resolved = c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap();
    assert_eq!(resolved[EDGE_COMPATIBLE_KEY], ParamValue::from("true"));
    assert_eq!(resolved["s3SecretName"], ParamValue::from("s"));

    let versions = c.registry().versions();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].custom_properties[EDGE_COMPATIBLE_KEY], MetadataValue::string("true"));
    let artifacts = c.registry().artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name, "m1");
    assert_eq!(artifacts[0].external_id, fingerprint("m1", "v1", "m1"));
    assert_eq!(artifacts[0].model_format_name, "ContainerImage");
    assert_eq!(artifacts[0].description, "housing model");

    let images = c.list_images().await.unwrap();
    assert_eq!(images.len(), 1);
    assert!(!images[0].needs_sync);
    assert_eq!(images[0].status, ImageStatus::Synced);
    assert_eq!(images[0].id, fingerprint("m1", "v1", "m1"));
    assert_eq!(images[0].version, "v1");
}

#[tokio::test]
async fn second_sync_does_not_touch_artifact() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap();
    c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap();

    let mutations = c.registry().mutations();
    assert_eq!(mutations, ["create_version:v1", "create_artifact:m1", "update_version:v1"]);
}

#[tokio::test]
async fn stale_external_id_is_rewritten_in_place() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let props = encode(&build_params()).unwrap();
    let version_id = c.registry().seed_version(&model_id, "v1", props);
    let mut stale = Artifact::container_image("m1", "d", "zzzz");
    stale.uri = "oci://registry/m1:v1".into();
    let artifact_id = c.registry().seed_artifact(&version_id, stale);

    c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap();

    let artifacts = c.registry().artifacts();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].id, artifact_id);
    assert_eq!(artifacts[0].external_id, fingerprint("m1", "v1", "m1"));
    assert_eq!(artifacts[0].uri, "oci://registry/m1:v1");
    assert!(c.registry().mutations().contains(&format!("update_artifact:{artifact_id}")));
}

#[tokio::test]
async fn sync_without_params_uses_stored_properties() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let mut stored = build_params();
    stored.insert("extra".into(), vec!["a".to_string(), "b".to_string()].into());
    c.registry().seed_version(&model_id, "v1", encode(&stored).unwrap());

    let resolved = c.sync_image(&model_id, "v1", None).await.unwrap();
    assert_eq!(resolved, stored);
    assert!(!c.registry().mutations().iter().any(|m| m.starts_with("update_version")));
    // no edgeCompatible flag was stored, so the image still needs sync
    let images = c.list_images().await.unwrap();
    assert!(images[0].needs_sync);
}

#[tokio::test]
async fn missing_version_without_params_fails() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let err = c.sync_image(&model_id, "v1", None).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::VersionNotFound(_)), "{err}");
    assert!(c.registry().mutations().is_empty());
}

#[tokio::test]
async fn unknown_model_fails_with_model_not_found() {
    let c = client();
    let err = c.sync_image("42", "v1", Some(&build_params())).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::ModelNotFound(_)), "{err}");
}

#[tokio::test]
async fn artifact_failure_keeps_created_version() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    c.registry().fail_artifact_create();
    let err = c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::UnexpectedStatus { status: 500, .. }));
    assert_eq!(c.registry().versions().len(), 1);
}

#[tokio::test]
async fn version_without_artifacts_needs_sync() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let mut props = encode(&build_params()).unwrap();
    props.insert(EDGE_COMPATIBLE_KEY.into(), MetadataValue::string("true"));
    c.registry().seed_version(&model_id, "v1", props);

    let images = c.list_images().await.unwrap();
    assert_eq!(images.len(), 1);
    assert!(images[0].needs_sync);
    assert!(images[0].id.is_empty());
    assert_eq!(images[0].build_params["s3SecretName"], ParamValue::from("s"));
}

#[tokio::test]
async fn build_submits_run_for_synced_image() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    c.sync_image(&model_id, "v1", Some(&build_params())).await.unwrap();
    let image_id = fingerprint("m1", "v1", "m1");

    let run = c.build_image(&image_id, "edge", &creds(), None).await.unwrap();
    assert_eq!(run.namespace, "edge");
    assert!(run.name.starts_with("aiedge-e2e-"));

    let runs = c.platform().runs.lock().clone();
    assert_eq!(runs.len(), 1);
    let spec = &runs[0].spec;
    assert_eq!(spec.params[0].value, ParamValue::from("m1"));
    assert_eq!(spec.params[1].value, ParamValue::from("v1"));
    assert!(spec.params.iter().any(|p| p.name == "s3SecretName" && p.value == ParamValue::from("s")));
    assert_eq!(spec.workspaces.len(), 4);
    assert_eq!(spec.workspaces[3].source, WorkspaceSource::EmptyDir {});
}

#[tokio::test]
async fn build_refuses_unsynced_image() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let mut props = encode(&build_params()).unwrap();
    props.insert(EDGE_COMPATIBLE_KEY.into(), MetadataValue::string("false"));
    let version_id = c.registry().seed_version(&model_id, "v1", props);
    let image_id = fingerprint("m1", "v1", "m1");
    c.registry().seed_artifact(&version_id, Artifact::container_image("m1", "d", &image_id));

    let err = c.build_image(&image_id, "edge", &creds(), None).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::NeedsSync(id) if id == &image_id), "{err}");
    assert!(c.platform().runs.lock().is_empty());
}

#[tokio::test]
async fn build_validates_required_params() {
    let c = client();
    let model_id = c.registry().seed_model("m1", "d");
    let mut partial = build_params();
    partial.remove("testDataConfigMapName");
    c.sync_image(&model_id, "v1", Some(&partial)).await.unwrap();

    let err = c.build_image(&fingerprint("m1", "v1", "m1"), "edge", &creds(), None).await.unwrap_err();
    match err.root() {
        EdgeError::Validation { key, .. } => assert_eq!(key, "testDataConfigMapName"),
        other => panic!("unexpected {other:?}"),
    }

    let err = c.build_image(&fingerprint("m1", "v1", "m1"), "edge", &creds(), Some(&ParamMap::new())).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::Validation { key, .. } if key == "s3SecretName"));
    assert!(c.platform().runs.lock().is_empty());
}

#[tokio::test]
async fn build_unknown_image_is_not_found() {
    let c = client();
    c.registry().seed_model("m1", "d");
    let err = c.build_image("beef", "edge", &creds(), None).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::ImageNotFound(id) if id == "beef"));
}

#[tokio::test]
async fn add_model_registers_synced_image_once() {
    let c = client();
    let image = c.add_model("m2", "classifier", "1.0", &build_params()).await.unwrap();
    assert_eq!(image.id, fingerprint("m2", "1.0", "m2"));
    assert!(!image.needs_sync);
    assert_eq!(c.describe_image(&image.id).await.unwrap(), image);

    let models = c.list_models().await.unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "m2");

    let err = c.add_model("m2", "classifier", "1.0", &build_params()).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::ModelExists(_)));
    let err = c.add_model("m2", "", "1.0", &build_params()).await.unwrap_err();
    assert!(matches!(err, EdgeError::InvalidArgument(_)));
}

#[tokio::test]
async fn add_model_stops_when_version_already_exists() {
    let c = client();
    c.registry().version_taken();
    let err = c.add_model("m2", "classifier", "1.0", &build_params()).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::VersionExists(name) if name == "1.0"), "{err}");
    assert_eq!(c.registry().mutations(), ["create_model:m2"]);
    assert!(c.registry().artifacts().is_empty());
}

#[tokio::test]
async fn add_model_surfaces_existing_artifact() {
    let c = client();
    c.registry().artifact_taken();
    let err = c.add_model("m2", "classifier", "1.0", &build_params()).await.unwrap_err();
    assert!(matches!(err.root(), EdgeError::ArtifactExists(name) if name == "m2"), "{err}");
    // model and version stay behind; nothing is rolled back
    assert_eq!(c.registry().models().len(), 1);
    assert_eq!(c.registry().mutations(), ["create_model:m2", "create_version:1.0"]);
    assert!(c.registry().artifacts().is_empty());
}
