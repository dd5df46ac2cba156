pub mod daemon_path;
pub mod output;
pub mod process;
pub mod report;

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use process::{restart_server, stop_servers};
use report::{process_report_command, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    config::AppConfig,
    daemon::{
        start_daemon,
        storage::activity_store::{retention_cutoff, ActivityStore, SqliteStore},
    },
    report::day_stats,
    utils::{
        dir::{config_path, create_application_default_path, database_path},
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "DayReview", version, long_about = None)]
#[command(
    about = "Logs your desktop activity and turns every day into a short report",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Config file. Defaults to config.json inside the application directory"
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {},
    #[command(about = "Run a daemon directly in current console. Useful for debugging")]
    Serve {},
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Generate the daily report right now")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Show what today looks like so far")]
    Today {
        #[arg(long, default_value_t = 5, help = "Amount of processes to list")]
        top: usize,
    },
    #[command(about = "List the most recent daily reports")]
    History {
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
    #[command(about = "Delete detailed records older than the retention window")]
    Cleanup {
        #[arg(long, help = "Days to keep. Defaults to retention_days from the config")]
        days: Option<u32>,
    },
    #[command(about = "Show the effective configuration")]
    Config {
        #[arg(long, help = "Write a config file with defaults when there is none")]
        init: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match &args.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            std::path::absolute(dir)?
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = if matches!(args.commands, Commands::Serve {}) {
        DAEMON_PREFIX
    } else {
        CLI_PREFIX
    };
    enable_logging(prefix, &app_dir, logging_level, args.log)?;

    let config = args.config.map(std::path::absolute).transpose()?;
    let config_file = config.clone().unwrap_or_else(|| config_path(&app_dir));

    match args.commands {
        Commands::Init {} => {
            restart_server(&app_dir, config.as_deref())?;
            println!("DayReview is running in the background");
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = stop_servers()?;
            println!("Stopped {stopped} daemon(s)");
            Ok(())
        }
        Commands::Serve {} => start_daemon(app_dir, AppConfig::load(&config_file)?).await,
        Commands::Report { command } => {
            process_report_command(command, &app_dir, &AppConfig::load(&config_file)?).await
        }
        Commands::Today { top } => {
            let store = SqliteStore::open(&database_path(&app_dir))?;
            let stats = day_stats(&store, Local::now().date_naive(), top)?;
            println!("{}", output::render_day_stats(&stats));
            Ok(())
        }
        Commands::History { days } => {
            let store = SqliteStore::open(&database_path(&app_dir))?;
            println!("{}", output::render_history(&store.recent_summaries(days)?));
            Ok(())
        }
        Commands::Cleanup { days } => {
            let config = AppConfig::load(&config_file)?;
            let store = SqliteStore::open(&database_path(&app_dir))?;
            let cutoff = retention_cutoff(
                Local::now().date_naive(),
                days.unwrap_or(config.retention_days),
            );
            let removed = store.delete_older_than(cutoff)?;
            println!(
                "✓ Removed {} activity records and {} input snapshots before {cutoff}",
                removed.segments, removed.snapshots
            );
            Ok(())
        }
        Commands::Config { init } => {
            if init {
                if AppConfig::write_default(&config_file)? {
                    println!("Wrote defaults to {}", config_file.display());
                } else {
                    println!("{} already exists", config_file.display());
                }
            }
            let mut config = AppConfig::load(&config_file)?;
            if config.ai.api_key.is_some() {
                config.ai.api_key = Some("********".into());
            }
            println!("# {}", config_file.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
