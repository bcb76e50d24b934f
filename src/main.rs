//! PurpleAir AQI monitor.
//!
//! Run with:
//! ```sh
//! API_KEY=your-read-key SENSOR_ID=12345 cargo run
//! ```
//!
//! Set `PURPLEAIR_CONFIG` to load settings from a YAML file first, and
//! `RUST_LOG` to change log verbosity.

use std::process::ExitCode;

use purpleair::{Client, LogDisplay, MonitorConfig, PollPolicy, PollScheduler, ProcessRestart};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<MonitorConfig, purpleair::Error> {
    #[cfg(feature = "yaml")]
    if let Ok(path) = std::env::var("PURPLEAIR_CONFIG") {
        return MonitorConfig::load(path);
    }

    MonitorConfig::from_env()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = Client::with_timeout(&config.api_key, config.request_timeout())
        .with_base_url(&config.base_url);
    let mut scheduler = PollScheduler::new(client, &config.sensor_id, PollPolicy::from(&config));

    tracing::info!(
        "Monitoring sensor {} every {}s (+ up to {}s jitter)",
        config.sensor_id,
        config.update_interval,
        config.jitter_max
    );

    let err = scheduler.run(&mut LogDisplay::new(), &ProcessRestart).await;
    tracing::error!("Monitor stopped: {}", err);
    ExitCode::FAILURE
}
