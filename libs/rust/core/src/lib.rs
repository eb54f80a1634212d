//! Core of the edge model image tooling: keeps model registry metadata in
//! sync with locally computed image identities and triggers image builds.

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

pub mod error;
pub mod fingerprint;
pub mod metadata;
pub mod model_registry;
pub mod registry_client;
pub mod drift;
pub mod images;
pub mod reconcile;
pub mod tekton;
pub mod build;
pub mod params;
pub mod edge_client;
mod metrics;

pub use build::{build_image, validate_build_params, BuildSettings};
pub use drift::needs_sync;
pub use edge_client::EdgeClient;
pub use error::{EdgeError, Result};
pub use fingerprint::fingerprint;
pub use images::{describe_image, list_images, list_models, ImageStatus, Model, ModelImage};
pub use metadata::{CustomProperties, MetadataValue, ParamMap, ParamValue, EDGE_COMPATIBLE_KEY};
pub use model_registry::{Artifact, ModelRegistryApi, ModelVersion, RegisteredModel};
pub use params::read_params;
pub use reconcile::{add_model, ensure_resources};
pub use registry_client::RegistryClient;
pub use tekton::{ClusterCredentials, PipelineRunApi, PipelineRunRef, TektonClient};

/// Installs the global subscriber once. `EDGE_JSON_LOG=1` switches to
/// flattened JSON lines; `RUST_LOG` overrides `default_level`.
pub fn init_tracing(service: &str, default_level: &str) -> anyhow::Result<()> {
    TRACING_INIT.get_or_try_init(|| -> anyhow::Result<()> {
        let json = std::env::var("EDGE_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
        let registry = tracing_subscriber::registry().with(filter);
        if json {
            registry
                .with(tracing_subscriber::fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false))
                .try_init()?;
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(false).with_line_number(true))
                .try_init()?;
        }
        Ok(())
    })?;
    info!(service, "tracing initialized");
    Ok(())
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EdgeConfig {
    pub model_registry_url: String,
    pub registry_api_path: String,
    pub log_level: String,
    pub params_file: String,
    pub action: String,
    pub namespace: Option<String>,
    pub kube_api_server: Option<String>,
    pub kube_token: Option<String>,
    pub kube_ca_file: Option<String>,
    #[serde(default)]
    pub kube_insecure_skip_tls_verify: bool,
    // action operands
    pub model_id: Option<String>,
    pub model_name: Option<String>,
    pub model_description: Option<String>,
    pub version_name: Option<String>,
    pub image_id: Option<String>,
}

impl EdgeConfig {
    /// Cluster credentials for build submission; reads the CA bundle if one is configured.
    pub fn cluster_credentials(&self) -> Result<ClusterCredentials> {
        let certificate_authority_pem = match &self.kube_ca_file {
            Some(path) => Some(std::fs::read(path).map_err(|e| EdgeError::Credentials { path: path.clone(), reason: e.to_string() })?),
            None => None,
        };
        Ok(ClusterCredentials {
            server: self.kube_api_server.clone().unwrap_or_default(),
            token: self.kube_token.clone().unwrap_or_default(),
            insecure_skip_tls_verify: self.kube_insecure_skip_tls_verify,
            certificate_authority_pem,
        })
    }
}

fn config_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("model_registry_url", "http://localhost:8080")?
        .set_default("registry_api_path", registry_client::DEFAULT_API_PATH)?
        .set_default("log_level", "info")?
        .set_default("params_file", "params.yaml")?
        .set_default("action", "list")?
        .set_default("kube_insecure_skip_tls_verify", false)?)
}

/// Defaults, then the file named by `EDGE_CONFIG_FILE` (if any), then
/// `EDGE__*` environment variables.
pub fn load_config() -> Result<EdgeConfig> {
    let mut builder = config_builder()?;
    if let Ok(file) = std::env::var("EDGE_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("EDGE").separator("__"));
    Ok(builder.build()?.try_deserialize()?)
}

/// Loads configuration from YAML text over the defaults. No environment.
pub fn config_from_yaml(text: &str) -> Result<EdgeConfig> {
    let builder = config_builder()?.add_source(config::File::from_str(text, config::FileFormat::Yaml));
    Ok(builder.build()?.try_deserialize()?)
}
