//! DriveBot intake bridge: connects to the registration backend and serves a UI over
//! stdio.

use anyhow::{Context, Result};
use clap::Parser;
use drivebot::config::{load_user_config, AppConfig};
use drivebot::ipc::run_ipc_mode;
use drivebot::{init_logging, tracing_log_path};

fn main() -> Result<()> {
    let cli = AppConfig::parse();
    // Persisted defaults first; CLI flags and env always win.
    let user_config = load_user_config().context("reading config.toml")?;
    let config = cli.resolve(&user_config).context("invalid configuration")?;

    if config.print_markers {
        let markers = config.marker_table().context("loading marker table")?;
        print!("{}", markers.to_yaml().context("exporting marker table")?);
        return Ok(());
    }

    init_logging(&config);
    tracing::info!(
        server_url = %config.server_url,
        submit_url = %config.submit_url,
        trace_log = %tracing_log_path().display(),
        "drivebot starting"
    );

    run_ipc_mode(config)
}
