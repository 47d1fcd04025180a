mod app_state;
mod config;
mod core;
mod relay;
mod upstream;
mod web;

use std::{sync::Arc, time::Duration};

use app_state::AppState;
use config::AppConfig;
use tokio::{sync::watch, time::sleep};
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use upstream::{http_source::HttpUpstream, probe::probe_upstream};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env()?;
    let source = Arc::new(HttpUpstream::new(
        config.camera_url.clone(),
        config.upstream_connect_timeout,
    )?);

    if std::env::args().any(|arg| arg == "--probe-upstream") {
        let report = probe_upstream(source.as_ref()).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tokio::fs::create_dir_all(&config.log_dir).await?;
    let file_appender = rolling::daily(&config.log_dir, "growhub.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .with(config.log_stdout.then(|| fmt::layer()))
        .init();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(AppState::new(config.clone(), source, shutdown_rx));
    let app = web::routes::build_router(state.clone());

    info!(
        "{} listening on {} (camera: {})",
        config.app_name, config.bind_addr, config.camera_url
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    // Give the relay task a moment to close the camera connection.
    for _ in 0..20 {
        if state.relay.is_idle() {
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    info!("{} stopped", config.app_name);

    Ok(())
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {err}");
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
                warn!("failed to listen for SIGTERM: {err}");
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

    info!("shutdown requested, ending active relay");
    let _ = shutdown_tx.send(true);
}
