use anyhow::Context;
use clap::Parser;
use formbricks_loader::{
    Formbricks, FormbricksLoader, HttpAssetLoader, Lifecycle, LoaderConfig, SdkSlot, SetupArgs,
    StubRuntime,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Runs one bootstrap against a Formbricks instance, queueing calls first.
///
/// The bundle is fetched over HTTP but evaluated by `StubRuntime`, so a run only
/// checks that `<appUrl>/js/<bundle>` is reachable and non-empty. Queued and
/// direct calls then land on an in-memory stub SDK and are logged, not sent to
/// Formbricks.
#[derive(Debug, Parser)]
#[command(name = "formbricks-playground", version)]
struct Cli {
    /// Base URL of the Formbricks app serving `/js/<bundle>`.
    #[arg(long, env = "FORMBRICKS_APP_URL")]
    app_url: String,
    #[arg(long, env = "FORMBRICKS_ENVIRONMENT_ID")]
    environment_id: String,
    #[arg(long)]
    user_id: Option<String>,
    /// Attribute as `key=value`; repeatable.
    #[arg(long = "attribute", value_parser = parse_attribute)]
    attributes: Vec<(String, String)>,
    /// Action code to track; repeatable.
    #[arg(long = "track")]
    actions: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = LoaderConfig::from_env()?;

    let slot = SdkSlot::new();
    let assets = HttpAssetLoader::new(Arc::new(StubRuntime), slot.clone())
        .context("failed to build http asset loader")?;
    let formbricks = Formbricks::new(FormbricksLoader::new(config, Arc::new(assets), slot));

    if let Some(user_id) = &cli.user_id {
        formbricks.set_user_id(user_id).await?;
    }
    if !cli.attributes.is_empty() {
        let attributes: BTreeMap<_, _> = cli.attributes.iter().cloned().collect();
        formbricks.set_attributes(&attributes).await?;
    }
    for action in &cli.actions {
        formbricks.track(action, None).await?;
    }

    tracing::info!(
        app_url = %cli.app_url,
        pending = formbricks.loader().pending(),
        "starting formbricks setup"
    );
    formbricks
        .setup(&SetupArgs::new(cli.app_url, cli.environment_id))
        .await?;

    if formbricks.lifecycle() != Lifecycle::Ready {
        anyhow::bail!("formbricks setup did not complete; see log for details");
    }
    formbricks.register_route_change().await?;
    tracing::info!("formbricks playground finished");
    Ok(())
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
