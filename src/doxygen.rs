//! Runs doxygen over the synthetic headers.

use crate::error::RenderError;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout as within;
use tracing::{debug, info, warn};

/// Run `command config` from `work_dir` and wait at most `timeout`.
///
/// The renderer's output is all-or-nothing: a non-zero exit, a signal or an
/// expired timeout are all errors. A timed-out child is killed.
pub fn run(command: &str, config: &Path, work_dir: &Path, timeout: Duration) -> Result<(), RenderError> {
    info!("running {} {}", command, config.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| spawn_error(command, source))?;
    runtime.block_on(render(command, config, work_dir, timeout))
}

fn spawn_error(command: &str, source: std::io::Error) -> RenderError {
    RenderError::Spawn {
        command: command.to_string(),
        source,
    }
}

async fn render(command: &str, config: &Path, work_dir: &Path, timeout: Duration) -> Result<(), RenderError> {
    let mut child = Command::new(command)
        .arg(config)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| spawn_error(command, source))?;

    let started = Instant::now();
    let waited = within(timeout, child.wait()).await;
    let Ok(status) = waited else {
        if let Err(e) = child.kill().await {
            warn!("could not kill {}: {}", command, e);
        }
        return Err(RenderError::Timeout {
            command: command.to_string(),
            secs: timeout.as_secs(),
        });
    };

    let status = status.map_err(|source| spawn_error(command, source))?;
    debug!("{} finished after {:?}", command, started.elapsed());
    if status.success() {
        Ok(())
    } else {
        Err(RenderError::Failed {
            command: command.to_string(),
            status: status.to_string(),
        })
    }
}
