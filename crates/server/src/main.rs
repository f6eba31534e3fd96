use anyhow::Context;
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use portico_core::config::AppConfig;
use portico_repo::RemoteRepository;
use portico_server::access::{AccessChecker, resolver_from_config};
use portico_server::{AppState, create_router};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "porticod", version, about = "Download-and-authorization proxy")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, env = "PORTICO_CONFIG", default_value = "portico.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config: AppConfig = Figment::new()
        .merge(Toml::file(&args.config))
        .merge(Env::prefixed("PORTICO_").split("__"))
        .extract()
        .context("loading configuration")?;

    let repo = Arc::new(RemoteRepository::new(
        &config.repo.url,
        &config.repo.namespace,
        config.repo.timeout(),
    )?);

    let resolver = resolver_from_config(&config.auth.resolver);
    if resolver.is_none() {
        tracing::warn!("no identity resolver configured; only public objects will be served");
    }
    let checker = Arc::new(AccessChecker::new(repo.clone(), resolver, &config.auth));

    let bind = config.server.bind.clone();
    let state = AppState::new(Arc::new(config), repo, checker);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    tracing::info!(addr = %bind, "porticod listening");
    axum::serve(listener, app).await?;
    Ok(())
}
