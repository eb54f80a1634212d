use anyhow::{anyhow, Context, Result};
use edge_core::{load_config, read_params, EdgeClient, EdgeConfig, ParamMap};
use serde::Serialize;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config().context("loading configuration")?;
    edge_core::init_tracing("edge-images", &cfg.log_level)?;
    let client = EdgeClient::from_config(&cfg)?;
    info!(action = %cfg.action, registry = %cfg.model_registry_url, "running");
    run(&client, &cfg).await
}

fn operand<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| anyhow!("{name} is required for this action"))
}

/// Params from the configured file, or `None` when the file does not exist.
fn optional_params(cfg: &EdgeConfig) -> Result<Option<ParamMap>> {
    if !std::path::Path::new(&cfg.params_file).exists() { return Ok(None); }
    Ok(Some(read_params(&cfg.params_file)?))
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(client: &EdgeClient, cfg: &EdgeConfig) -> Result<()> {
    match cfg.action.as_str() {
        "models" => print(&client.list_models().await?),
        "list" => print(&client.list_images().await?),
        "describe" => print(&client.describe_image(operand(&cfg.image_id, "image_id")?).await?),
        "sync" => {
            let params = optional_params(cfg)?;
            let model_id = operand(&cfg.model_id, "model_id")?;
            let version = operand(&cfg.version_name, "version_name")?;
            print(&client.sync_image(model_id, version, params.as_ref()).await?)
        }
        "build" => {
            let namespace = operand(&cfg.namespace, "namespace")?;
            let credentials = cfg.cluster_credentials()?;
            print(&client.build_image(operand(&cfg.image_id, "image_id")?, namespace, &credentials, None).await?)
        }
        "add" => {
            let params = read_params(&cfg.params_file)?;
            let image = client
                .add_model(
                    operand(&cfg.model_name, "model_name")?,
                    operand(&cfg.model_description, "model_description")?,
                    operand(&cfg.version_name, "version_name")?,
                    &params,
                )
                .await?;
            print(&image)
        }
        other => Err(anyhow!("unknown action {other}; expected one of models, list, describe, sync, build, add")),
    }
}
