// Link preview CLI
//
// Resolves preview metadata for each URL argument and prints one
// `{"status":..,"body":..}` line per URL. One browser is launched at startup
// and shared by every rendered extraction.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kodegen_tools_link_preview::{
    BrowserManager, Config, MemoryStore, PreviewResponse, ResultCache, Unfurler,
    load_yaml_config, load_yaml_config_from, stop_sweeper,
};

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        anyhow::bail!("usage: kodegen-link-preview <url>...");
    }

    let config = load_config()?;

    let manager = Arc::new(BrowserManager::new(config.browser.clone()));
    if let Err(e) = manager.init().await {
        warn!("Browser launch failed at startup, will retry on first render: {}", e);
    }

    let store = Arc::new(MemoryStore::new());
    let sweeper_token = CancellationToken::new();
    let sweeper = (config.cache.sweep_interval_secs > 0).then(|| {
        Arc::clone(&store).spawn_sweeper(
            Duration::from_secs(config.cache.sweep_interval_secs),
            sweeper_token.clone(),
        )
    });
    let cache = ResultCache::new(store, config.cache.ttl());

    let outcome = run(&config, cache, Arc::clone(&manager), &urls).await;

    if let Some(handle) = sweeper {
        stop_sweeper(&sweeper_token, handle).await;
    }
    manager.shutdown().await;
    info!("Shutdown complete");

    outcome
}

async fn run(
    config: &Config,
    cache: ResultCache,
    manager: Arc<BrowserManager>,
    urls: &[String],
) -> Result<()> {
    let unfurler = Unfurler::from_config(config, cache, manager)?;

    for url in urls {
        let response = PreviewResponse::from(unfurler.unfurl(url).await);
        println!("{}", serde_json::to_string(&response)?);
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    match std::env::var_os("LINK_PREVIEW_CONFIG") {
        Some(path) => {
            let path = PathBuf::from(path);
            load_yaml_config_from(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => load_yaml_config().context("Failed to load config.yaml"),
    }
}
