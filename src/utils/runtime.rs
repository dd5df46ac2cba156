use anyhow::Result;

/// Runtime for the daemon. Input hooks live on their own OS thread, so the workers only deal
/// with sampling, SQLite and the occasional HTTP call.
pub fn multi_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("dayreview-worker")
        .enable_all()
        .build()?)
}
