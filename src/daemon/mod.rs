use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use collection::{
    input_sampler::{InputCounters, InputSampler},
    window_sampler::WindowSampler,
};
use processing::{privacy::PrivacyFilter, recorder::Recorder};
use scheduler::Scheduler;
use storage::activity_store::{ActivityStore, SqliteStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    analysis::{categorizer::Categorizer, DailyAnalyzer},
    config::AppConfig,
    input_api::{GenericInputHook, InputHook},
    notify::{DesktopNotifier, Notifier},
    report::DailyReportGenerator,
    utils::{
        clock::{Clock, DefaultClock},
        dir::database_path,
    },
    window_api::{GenericWindowManager, WindowManager},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod scheduler;
pub mod shutdown;
pub mod storage;

/// How long each loop gets to finish its final flush.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the daemon talks to outside of its own loops.
pub struct DaemonEnvironment {
    pub store: Arc<dyn ActivityStore>,
    pub window_manager: Box<dyn WindowManager>,
    pub input_hook: Result<Box<dyn InputHook>>,
    pub analyzer: DailyAnalyzer,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf, config: AppConfig) -> Result<()> {
    std::env::set_current_dir("/")?;

    let environment = DaemonEnvironment {
        store: Arc::new(SqliteStore::open(&database_path(&dir))?),
        window_manager: Box::new(GenericWindowManager::new()?),
        input_hook: GenericInputHook::new().map(|v| Box::new(v) as Box<dyn InputHook>),
        analyzer: DailyAnalyzer::from_config(&config.ai)?,
        notifier: Some(Arc::new(DesktopNotifier::new())),
    };

    let shutdown_token = CancellationToken::new();

    let (_, result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_daemon(environment, &config, shutdown_token, DefaultClock),
    );
    result
}

/// Runs every loop until `shutdown` is cancelled, then waits for them to flush.
pub async fn run_daemon(
    environment: DaemonEnvironment,
    config: &AppConfig,
    shutdown: CancellationToken,
    clock: impl Clock + Clone,
) -> Result<()> {
    let DaemonEnvironment {
        store,
        window_manager,
        input_hook,
        analyzer,
        notifier,
    } = environment;

    let recorder = Arc::new(Recorder::new(
        store.clone(),
        Categorizer::with_additions(&config.categories),
        PrivacyFilter::new(&config.privacy_keywords)?,
    ));

    let window_sampler = WindowSampler::new(
        window_manager,
        recorder.clone(),
        shutdown.clone(),
        config.window_check_interval(),
        config.min_activity_duration_secs,
        Box::new(clock.clone()),
    );

    let counters = Arc::new(InputCounters::new());
    let input_sampler = install_input_hook(input_hook, &counters).then(|| {
        InputSampler::new(
            counters.clone(),
            recorder.clone(),
            shutdown.clone(),
            config.input_stats_interval(),
            config.mouse_moves_per_unit,
            Box::new(clock.clone()),
        )
    });

    let report = Arc::new(DailyReportGenerator::new(
        store.clone(),
        analyzer,
        notifier,
        config.notifications.clone(),
        Box::new(clock.clone()),
    ));
    let scheduler = Scheduler::new(
        report,
        store,
        config.daily_analysis_time,
        config.retention_days,
        shutdown.clone(),
        Box::new(clock),
    );

    let mut tasks = vec![
        ("window sampler", tokio::spawn(window_sampler.run())),
        ("scheduler", tokio::spawn(scheduler.run())),
    ];
    if let Some(input_sampler) = input_sampler {
        tasks.push(("input sampler", tokio::spawn(input_sampler.run())));
    }
    info!("Daemon started");

    shutdown.cancelled().await;
    info!("Shutting down");

    for (name, handle) in tasks {
        join_component(name, handle).await;
    }
    Ok(())
}

/// Returns whether input events are flowing. A failure only costs the input telemetry.
fn install_input_hook(hook: Result<Box<dyn InputHook>>, counters: &Arc<InputCounters>) -> bool {
    let counters = counters.clone();
    let installed =
        hook.and_then(|mut hook| hook.start(Box::new(move |event| counters.record(event))));
    match installed {
        Ok(()) => true,
        Err(e) => {
            error!("Input monitoring disabled: {e:?}");
            false
        }
    }
}

async fn join_component(name: &str, handle: JoinHandle<Result<()>>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(Ok(Ok(()))) => info!("Stopped {name}"),
        Ok(Ok(Err(e))) => error!("{name} got an error {e:?}"),
        Ok(Err(e)) => error!("{name} panicked {e:?}"),
        Err(_) => warn!("{name} did not stop within {SHUTDOWN_TIMEOUT:?}"),
    }
}
