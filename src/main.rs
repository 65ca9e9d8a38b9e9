use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};

use whatsapp_relay::config::{ConfigPresence, RelayConfig};
use whatsapp_relay::routes::{AppState, relay_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real deployments set the variables directly
    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Panics are logged and the failing task dies; the server keeps running
    std::panic::set_hook(Box::new(|panic| {
        error!(panic = %panic, "Uncaught panic");
    }));

    let config = RelayConfig::from_env().context("invalid configuration")?;

    eprintln!("📲 WhatsApp Relay v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv {
        eprintln!("   Env file: {}", path.display());
    }
    report_presence(&config.presence);

    let app = relay_routes(AppState::from_config(&config));

    let _heartbeat = config.heartbeat_interval.map(spawn_heartbeat);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    info!(port = config.port, "🚀 Relay listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited")?;

    info!("✅ Server closed");
    Ok(())
}

/// Startup report of which variables are set. Never prints values.
fn report_presence(presence: &ConfigPresence) {
    let flag = |set: bool| if set { "set" } else { "missing" };
    eprintln!("   OPENAI_API_KEY: {}", flag(presence.has_openai_key));
    eprintln!("   OPENAI_MODEL: {}", flag(presence.has_openai_model));
    eprintln!("   OPENAI_ASSISTANT_ID: {}", flag(presence.has_openai_assistant));
    eprintln!("   TWILIO_ACCOUNT_SID: {}", flag(presence.has_twilio_sid));
    eprintln!("   TWILIO_AUTH_TOKEN: {}", flag(presence.has_twilio_token));
    eprintln!("   TWILIO_PHONE_NUMBER: {}\n", flag(presence.has_twilio_phone));
}

fn spawn_heartbeat(period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            info!("🔍 Server still running");
        }
    })
}

/// Completes on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
    warn!("⚠️ Shutdown signal received, draining in-flight requests");
}
