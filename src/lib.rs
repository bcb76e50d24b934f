//! # purpleair
//!
//! Poll a [PurpleAir](https://www2.purpleair.com) sensor, convert its PM2.5
//! reading to the US EPA Air Quality Index, and keep a readout up to date.
//!
//! The crate is built around three pieces:
//! - [`aqi`]: pure PM2.5 to AQI conversion and color banding
//! - [`Client`]: one GET per call against the PurpleAir API, with
//!   classified errors
//! - [`PollScheduler`]: decides when to poll, backs off on errors, and
//!   escalates to a restart when the network stack is gone
//!
//! Drawing and restarting are collaborators supplied by the caller through
//! the [`DisplaySink`] and [`Restart`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use purpleair::{Client, LogDisplay, MonitorConfig, PollPolicy, PollScheduler, ProcessRestart};
//!
//! # async fn example() -> Result<(), purpleair::Error> {
//! let config = MonitorConfig::from_env()?;
//! let client = Client::with_timeout(&config.api_key, config.request_timeout());
//!
//! let mut scheduler = PollScheduler::new(client, &config.sensor_id, PollPolicy::from(&config));
//! let err = scheduler.run(&mut LogDisplay::new(), &ProcessRestart).await;
//! # Err(err)
//! # }
//! ```
//!
//! ## Error Handling
//!
//! | Error | Class | Poll loop reaction |
//! |-------|-------|--------------------|
//! | `InvalidArgument`, `Config` | caller | stop, no retry |
//! | `Api`, `Decode` | recoverable | blank readout, retry after `retry_interval` |
//! | `InvalidInput`, `OutOfRange` | recoverable | blank readout, retry after `retry_interval` |
//! | `Transport` | fatal | call [`Restart::restart`] once and stop |
//!
//! ## Feature Flags
//!
//! - `reqwest` - HTTP transport backed by reqwest (default)
//! - `yaml` - Load [`MonitorConfig`] from a YAML file (default)
//! - `cli` - Log output for the `purpleair-monitor` binary (default)

pub mod aqi;
pub mod client;
pub mod config;
pub mod display;
mod error;
pub mod restart;
pub mod scheduler;
pub mod sensor;
pub mod transport;

pub use aqi::{aqi_color, convert, AqiResult, ColorBand};
pub use client::{url_encode, Client, FieldList, IntoFieldList};
pub use config::MonitorConfig;
pub use display::{DisplaySink, LogDisplay};
pub use error::{Error, ErrorClass};
pub use restart::{ProcessRestart, Restart};
pub use scheduler::{PollPhase, PollPolicy, PollScheduler, PollState, TickOutcome};
pub use sensor::{Altitude, SensorMetadata, SensorReading};
pub use transport::{HttpRequest, HttpResponse, Transport};

/// PurpleAir API base URL
pub const API_BASE_URL: &str = "https://api.purpleair.com/v1";

/// HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Seconds between successful polls
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 120;

/// Upper bound of the random extra delay per poll, in seconds
pub const DEFAULT_JITTER_MAX_SECS: u64 = 30;

/// Seconds before retrying after a recoverable error
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 30;

/// Milliseconds between loop iterations
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Longest accepted update, jitter, or retry interval, in seconds (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(API_BASE_URL, "https://api.purpleair.com/v1");
        assert!(DEFAULT_UPDATE_INTERVAL_SECS > DEFAULT_RETRY_INTERVAL_SECS);
        assert_eq!(DEFAULT_TICK_INTERVAL_MS, 100);
        assert!(DEFAULT_UPDATE_INTERVAL_SECS < MAX_INTERVAL_SECS);
    }

    #[test]
    fn test_reexports() {
        let result = convert(25.0).unwrap();
        assert_eq!(result.value, Some(78));
        assert_eq!(aqi_color(result.value), ColorBand::Yellow);
        assert_eq!(url_encode("pm2.5"), "pm2%2e5");
    }
}
