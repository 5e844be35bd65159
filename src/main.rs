//! Platform backend
//!
//! HTTP backend for the referral programme and the URA dashboard.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!                       │                 BACKEND                       │
//!   Client Request      │  ┌────────┐   ┌─────────┐   ┌─────────────┐  │
//!   ────────────────────┼─▶│  http  │──▶│ routing │──▶│  handlers   │  │
//!                       │  │ server │   │         │   │ (subsystem) │  │
//!                       │  └────────┘   └─────────┘   └──────┬──────┘  │
//!                       │                                     │         │
//!                       │        ┌────────────────────────────┼───────┐ │
//!                       │        ▼            ▼               ▼       ▼ │
//!                       │    ┌───────┐  ┌──────────┐  ┌──────────┐ ┌────────┐
//!                       │    │ store │  │ captcha  │  │viability │ │push /  │
//!                       │    │(REST) │  │ + abuse  │  │ provider │ │webhook │
//!                       │    └───┬───┘  └────┬─────┘  └────┬─────┘ └───┬────┘
//!                       └────────┼───────────┼─────────────┼───────────┼─────┘
//!                                ▼           ▼             ▼           ▼
//!                          nio_afiliados  siteverify   viability   push service /
//!                          painel_ura                  service     automation
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use plataforma_backend::config::{load_config, ObservabilityConfig};
use plataforma_backend::lifecycle::{self, signals, Shutdown};
use plataforma_backend::observability::logging;

#[derive(Parser)]
#[command(name = "plataforma-backend")]
#[command(about = "HTTP backend for the referral programme and URA dashboard", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, "Invalid configuration, refusing to start");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "plataforma-backend starting");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    match lifecycle::run(config, &shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Backend stopped with an error");
            ExitCode::FAILURE
        }
    }
}
