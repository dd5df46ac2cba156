use std::{
    env,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{anyhow, bail, Context, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use super::daemon_path::to_daemon_path;

/// Terminates every other process running `executable`. Returns how many were found.
pub fn kill_previous_servers(executable: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't read current pid: {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| executable == *v)
            .is_some()
        {
            info!("Stopping {pid} ({executable:?})");
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// Stops both detached daemons and `serve` instances.
pub fn stop_servers() -> Result<usize> {
    let cli = env::current_exe().context("Can't operate without an executable")?;
    let daemon = to_daemon_path(cli.clone());
    Ok(kill_previous_servers(&cli)? + kill_previous_servers(&daemon)?)
}

/// Shuts down previous daemons and starts the daemon binary next to the current executable. The
/// daemon binary detaches itself, so this only waits for the detaching to finish.
pub fn restart_server(app_dir: &Path, config: Option<&Path>) -> Result<()> {
    stop_servers()?;

    let daemon = to_daemon_path(env::current_exe()?);
    let mut command = Command::new(&daemon);
    command.arg("--dir").arg(app_dir);
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    info!("Spawning {daemon:?}");
    let status = command
        .status()
        .with_context(|| format!("failed to start {}", daemon.display()))?;
    if !status.success() {
        bail!("{} exited with {status}", daemon.display());
    }
    Ok(())
}
