//! Hearth gateway entry point.
//!
//! Binary name: `hearth`
//!
//! Loads configuration, opens the conversation database, and serves the
//! streaming chat relay until Ctrl+C or SIGTERM.

mod cli;
mod http;
mod state;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Commands, ServeArgs};
use hearth_infra::config::{load_config, resolve_data_dir};
use hearth_observe::tracing_setup::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or state
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "hearth", &mut std::io::stdout());
        return Ok(());
    }

    let serve = match &cli.command {
        Some(Commands::Serve(args)) => args.clone(),
        _ => ServeArgs::default(),
    };

    init_tracing(&TracingOptions {
        default_directive: cli.log_directive().to_string(),
        format: if cli.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        enable_otel: serve.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = serve_http(serve).await;
    shutdown_tracing();
    result
}

async fn serve_http(args: ServeArgs) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    let mut config = load_config(&data_dir).await;
    args.apply(&mut config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(data_dir, config).await?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        upstream = %state.config.upstream.base_url,
        default_model = %state.config.upstream.default_model,
        data_dir = %state.data_dir.display(),
        "hearth listening"
    );

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
