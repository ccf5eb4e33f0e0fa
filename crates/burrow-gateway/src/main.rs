use anyhow::Context;
use burrow_gateway::config::{Cli, LogFormat, Settings};
use burrow_gateway::identity::CookieCipher;
use burrow_gateway::{App, AppState};
use burrow_generator::{Generator, RandomGenerator};
use burrow_shortener::{DeletionPipeline, ShortenerService};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

fn cookie_secret(settings: &Settings) -> String {
    match &settings.cookie_secret {
        Some(secret) => secret.clone(),
        None => {
            warn!("no cookie secret configured, identities will not survive a restart");
            uuid::Uuid::new_v4().to_string()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().resolve()?;
    init_tracing(settings.log_format);

    info!(
        server_address = %settings.server_address,
        base_url = %settings.base_url,
        storage = %settings.storage,
        trusted_subnet = ?settings.trusted_subnet.map(|s| s.to_string()),
        "starting burrow"
    );

    let store = settings
        .storage
        .open()
        .await
        .context("failed to open storage")?;

    let (queue, worker) = DeletionPipeline::spawn(store.clone(), settings.deletion.clone());
    let generator: Box<dyn Generator> = Box::new(RandomGenerator::default());
    let shortener = ShortenerService::new(store, generator, settings.base_url.clone(), queue);
    let state = AppState::new(
        shortener,
        CookieCipher::new(&cookie_secret(&settings)),
        settings.trusted_subnet,
    );

    let listener = tokio::net::TcpListener::bind(&settings.server_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.server_address))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    worker.shutdown().await;
    info!("burrow stopped");

    Ok(())
}
