//! plymouth-theme-preview-helper - privileged half of the previewer
//!
//! Started by system bus activation. It handles:
//! 1. Owning ru.gentoo.plymouth_theme_preview_helper on the system bus
//! 2. Authorizing each caller through polkit
//! 3. Driving plymouthd for previews and switching the default theme
//! 4. Exiting again once idle

use anyhow::{Context, Result};
use clap::Parser;
use ptp_common::bus::{BUS_NAME, OBJECT_PATH};
use ptp_common::config::Config;
use ptp_helper::authority::{self, Polkit};
use ptp_helper::lifecycle::{self, Activity, OperationSlot};
use ptp_helper::plymouth::{CommandRunner, SystemRunner};
use ptp_helper::service::HelperService;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Privileged D-Bus helper for plymouth-theme-preview
#[derive(Parser, Debug)]
#[command(name = "plymouth-theme-preview-helper")]
#[command(about = "Privileged D-Bus helper for plymouth-theme-preview")]
#[command(version)]
struct Args {
    /// Read this config instead of /etc/plymouth-theme-preview.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep running instead of exiting when idle
    #[arg(long)]
    no_idle_exit: bool,

    /// Serve on the session bus (development only)
    #[arg(long, hide = true)]
    session: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Activated by the bus with no terminal, so honor RUST_LOG for debugging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();

    info!("plymouth-theme-preview-helper v{}", env!("CARGO_PKG_VERSION"));

    if !authority::is_root() {
        warn!("Not running as root; plymouthd will most likely refuse to start");
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_system()?,
    };
    let idle_timeout = Duration::from_secs(config.helper.idle_timeout_secs);
    let plymouth_config = config.plymouth.clone();

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let slot = Arc::new(OperationSlot::default());
    let activity = Activity::new();

    let service = HelperService::new(
        Arc::new(config),
        Arc::clone(&runner),
        Arc::new(Polkit),
        Arc::clone(&slot),
        activity.clone(),
    );

    let builder = if args.session {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _connection = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .with_context(|| format!("Failed to acquire {} on the bus", BUS_NAME))?;

    info!("Serving {} at {}", BUS_NAME, OBJECT_PATH);

    tokio::select! {
        _ = lifecycle::wait_for_idle(activity, Arc::clone(&slot), idle_timeout), if !args.no_idle_exit => {
            info!("Idle for {:?}, exiting", idle_timeout);
        }
        res = lifecycle::shutdown_signal() => {
            res?;
        }
    }

    // Never leave a preview splash covering the screen
    lifecycle::stop_preview_on_exit(&slot, &plymouth_config, runner.as_ref()).await;

    Ok(())
}
