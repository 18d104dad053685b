mod bootstrap;
mod driver;

use std::sync::Arc;

use anyhow::Result;
use focus_core::config::Config;
use focus_core::time_utils::resolve_timezone;
use focus_runtime::host::memory::MemoryHost;
use focus_runtime::host::Host;
use focus_runtime::store::{JsonFileStore, StateStore};
use focus_runtime::{CoordinatorOptions, CoordinatorService};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let store_path = config.resolved_store_path();

    bootstrap::ensure_store_dir(&store_path)?;
    bootstrap::setup_logging(&config.log_level, config.log_file.as_ref())?;

    tracing::info!("Focus Coordinator v{} starting", env!("CARGO_PKG_VERSION"));

    let timezone = resolve_timezone(&config.timezone);
    tracing::info!(
        "Store: {}, Timezone: {}, Focus duration: {} min",
        store_path.display(),
        timezone,
        config.meeting_minutes
    );

    let store = StateStore::new(Arc::new(JsonFileStore::new(&store_path)));
    if config.reset {
        store.reset().await?;
        tracing::info!("persisted state cleared");
    }

    let host = Arc::new(MemoryHost::new());
    let options = CoordinatorOptions {
        timings: config.timings(),
        timezone,
        ..Default::default()
    };
    let (handle, task) =
        CoordinatorService::start(Host::from_shared(host.clone()), store, options).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if let Some(output) = driver::handle_line(&line, &host, &handle).await? {
                        println!("{output}");
                    }
                }
                None => {
                    tracing::info!("stdin closed; shutting down");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; shutting down");
                break;
            }
        }
    }

    handle.shutdown().await?;
    task.join().await;
    Ok(())
}
