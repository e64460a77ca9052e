pub mod cadence;
pub mod client;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fallback;
pub mod http;
pub mod overlay;
pub mod pose;
pub mod prompts;
pub mod schemas;
pub mod storage;

/// Load `.env` from the working directory if there is one
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Initialise tracing. `RUST_LOG` wins over the configured default filter.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .try_init();
}
