//! Mediarelay entry point.

mod config;
mod run;
mod web;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = config::Config::load()?;
    init_logging(&config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting mediarelay"
    );
    tracing::info!(name = %config.name, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run::run(config))?;

    tracing::info!("run finished");
    Ok(())
}

/// Initializes structured logging.
///
/// When a log file is configured it is truncated at the start of each
/// run, so the attached report always covers exactly one run.
fn init_logging(config: &config::Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
