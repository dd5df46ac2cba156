// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::env::args;

use anyhow::Result;
use clap::Parser;
use dayreview::{
    config::AppConfig,
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::{config_path, create_application_default_path},
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::multi_thread_runtime,
    },
};

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let mut args = DaemonArgs::parse_from(&command_args);
    // Daemonizing moves the working directory to `/`.
    args.dir = args.dir.map(std::path::absolute).transpose()?;
    args.config = args.config.map(std::path::absolute).transpose()?;

    if !args.force {
        #[cfg(feature = "win")]
        {
            let mut command_args = command_args;
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::DETACHED_PROCESS;

            command_args.push("--force".into());
            let process_name = std::env::current_exe()?;
            let mut command = std::process::Command::new(process_name);
            command.args(command_args.into_iter().skip(1));
            command.creation_flags(DETACHED_PROCESS.0);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Created daemon");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use daemonize::Daemonize;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent.map_err(|e| {
                        anyhow::anyhow!("Failed to create daemon on parent side {e:?}")
                    })?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => (),
            }
        }
    }

    run(args)
}

fn run(args: DaemonArgs) -> Result<()> {
    let app_dir = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;

    let config = AppConfig::load(&args.config.unwrap_or_else(|| config_path(&app_dir)))
        .inspect_err(|e| tracing::error!("Failed to load config {e:?}"))?;
    multi_thread_runtime()?.block_on(async move { start_daemon(app_dir, config).await })?;
    Ok(())
}
