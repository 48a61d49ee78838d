use hearth::config::Config;
use tracing_subscriber::EnvFilter;

/// Initializes the application and invokes the server.
///
/// This sets up logging, reads the layered configuration and starts the
/// multithreaded tokio runtime. The runtime shape (worker count, I/O batch
/// depth) comes from the configuration.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize logging
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // aggregate the configuration
    let config = Config::read()?;

    // run the server blocking
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(config.effective_worker_threads())
        .max_io_events_per_tick(config.io_queue_depth.max(1))
        .build()?
        .block_on(hearth::start(config))
}
