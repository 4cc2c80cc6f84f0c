//! CLI definition using clap derive.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use hearth_types::config::HearthConfig;

/// Hearth - streaming chat gateway for a local model server.
#[derive(Parser, Debug)]
#[command(name = "hearth", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v debug for hearth crates, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "HEARTH_LOG_JSON")]
    pub log_json: bool,

    /// Defaults to `serve`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Filter used when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,hearth=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve(ServeArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Overrides for values from `config.toml`.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HEARTH_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HEARTH_PORT")]
    pub port: Option<u16>,

    /// Model server base URL
    #[arg(long, env = "HEARTH_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Model used when a request does not name one
    #[arg(long, env = "HEARTH_MODEL")]
    pub model: Option<String>,

    /// Export spans to stdout via OpenTelemetry
    #[arg(long, env = "HEARTH_OTEL")]
    pub otel: bool,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut HearthConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.upstream_url {
            config.upstream.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.upstream.default_model = model.clone();
        }
    }
}
