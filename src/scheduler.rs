//! Poll scheduling: when to fetch, how long to wait, and when to give up.
//!
//! The scheduler is a small state machine driven by a fixed-rate loop:
//!
//! | Phase | Meaning | Leaves when |
//! |-------|---------|-------------|
//! | `Idle` | Waiting for the next deadline | deadline reached |
//! | `Polling` | Request in flight | request completes |
//! | `Backoff` | Waiting after a recoverable error | deadline reached |
//! | `Stopped` | Fatal or caller error; no further polls | never |
//!
//! After a successful poll the next deadline is `update_interval` plus a
//! random jitter of up to `jitter_max`, which keeps many devices from
//! hitting the API in lockstep. Recoverable errors blank the readout and
//! retry after `retry_interval`. Transport failures are fatal: the loop
//! hands control to the [`Restart`] collaborator and stops.
//!
//! # Usage
//!
//! ```rust,no_run
//! use purpleair::{Client, LogDisplay, PollPolicy, PollScheduler, ProcessRestart};
//!
//! # async fn example() {
//! let client = Client::new(reqwest::Client::new(), "your-api-key");
//! let mut scheduler = PollScheduler::new(client, "12345", PollPolicy::default());
//!
//! let mut display = LogDisplay::new();
//! let err = scheduler.run(&mut display, &ProcessRestart).await;
//! eprintln!("monitor stopped: {}", err);
//! # }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::aqi::{self, AqiResult};
use crate::client::Client;
use crate::config::MonitorConfig;
use crate::display::DisplaySink;
use crate::error::{Error, ErrorClass};
use crate::restart::Restart;
use crate::sensor::SensorMetadata;
use crate::transport::Transport;
use crate::{
    DEFAULT_JITTER_MAX_SECS, DEFAULT_RETRY_INTERVAL_SECS, DEFAULT_TICK_INTERVAL_MS,
    DEFAULT_UPDATE_INTERVAL_SECS,
};

/// Timing parameters for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Base delay after a successful poll
    pub update_interval: Duration,
    /// Upper bound of the random delay added after a successful poll
    pub jitter_max: Duration,
    /// Delay after a recoverable error
    pub retry_interval: Duration,
    /// Delay between loop iterations
    pub tick_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_secs(DEFAULT_UPDATE_INTERVAL_SECS),
            jitter_max: Duration::from_secs(DEFAULT_JITTER_MAX_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
        }
    }
}

impl From<&MonitorConfig> for PollPolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            update_interval: config.update_interval(),
            jitter_max: config.jitter_max(),
            retry_interval: config.retry_interval(),
            tick_interval: config.tick_interval(),
        }
    }
}

impl PollPolicy {
    /// Delay until the next poll after a success: base interval plus jitter.
    pub fn success_delay(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(Duration::ZERO..=self.jitter_max);
        self.update_interval.saturating_add(jitter)
    }
}

/// Fallback deadline offset when `now + delay` overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or(now + FAR_FUTURE)
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the next deadline
    Idle,
    /// A request is in flight
    Polling,
    /// Waiting to retry after a recoverable error
    Backoff,
    /// Polling ended after a fatal or caller error
    Stopped,
}

/// State owned by the scheduler.
#[derive(Debug, Clone)]
pub struct PollState {
    next_deadline: Instant,
    last_result: AqiResult,
    phase: PollPhase,
}

impl PollState {
    fn new(now: Instant) -> Self {
        Self {
            next_deadline: now,
            last_result: AqiResult::placeholder(),
            phase: PollPhase::Idle,
        }
    }

    /// When the next poll is due.
    pub fn next_deadline(&self) -> Instant {
        self.next_deadline
    }

    /// The value the readout should currently show.
    pub fn last_result(&self) -> &AqiResult {
        &self.last_result
    }

    /// Current phase.
    pub fn phase(&self) -> PollPhase {
        self.phase
    }
}

/// What a single loop iteration did.
#[derive(Debug)]
pub enum TickOutcome {
    /// Deadline not reached; nothing was fetched
    Waiting,
    /// Poll succeeded with this result
    Updated(AqiResult),
    /// Poll failed with a recoverable error; a retry is scheduled
    Retrying(Error),
    /// Poll failed at the transport level; the process must restart
    Fatal(Error),
    /// Poll was rejected before reaching the network (caller bug)
    Rejected(Error),
}

/// Drives periodic polling of one sensor.
pub struct PollScheduler<T> {
    client: Client<T>,
    sensor_id: String,
    policy: PollPolicy,
    state: PollState,
}

impl<T: Transport> PollScheduler<T> {
    /// Create a scheduler whose first tick polls immediately.
    pub fn new(client: Client<T>, sensor_id: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            client,
            sensor_id: sensor_id.into(),
            policy,
            state: PollState::new(Instant::now()),
        }
    }

    /// Current state.
    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Timing parameters.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Sensor being polled.
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// Returns true if a poll is due at `now`. Never true once stopped.
    pub fn is_due_at(&self, now: Instant) -> bool {
        self.state.phase != PollPhase::Stopped && now >= self.state.next_deadline
    }

    /// Run one loop iteration: poll if the deadline has passed.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.is_due_at(Instant::now()) {
            return TickOutcome::Waiting;
        }

        self.state.phase = PollPhase::Polling;
        let outcome = self.poll().await;

        match outcome {
            Ok(result) => {
                let delay = self.policy.success_delay();
                self.state.next_deadline = deadline_after(delay);
                self.state.last_result = result;
                self.state.phase = PollPhase::Idle;

                tracing::info!(
                    "Sensor {} AQI {} ({}), next update in {}s",
                    self.sensor_id,
                    result,
                    result.band,
                    delay.as_secs()
                );
                TickOutcome::Updated(result)
            }
            Err(err) => match err.class() {
                ErrorClass::Recoverable => {
                    self.state.next_deadline = deadline_after(self.policy.retry_interval);
                    self.state.last_result = AqiResult::error();
                    self.state.phase = PollPhase::Backoff;

                    tracing::warn!(
                        "Error fetching sensor {} data: {}; retrying in {}s",
                        self.sensor_id,
                        err,
                        self.policy.retry_interval.as_secs()
                    );
                    TickOutcome::Retrying(err)
                }
                ErrorClass::Fatal => {
                    self.state.phase = PollPhase::Stopped;
                    tracing::error!(
                        "Transport error while fetching sensor {}: {}",
                        self.sensor_id,
                        err
                    );
                    TickOutcome::Fatal(err)
                }
                ErrorClass::Caller => {
                    self.state.phase = PollPhase::Stopped;
                    tracing::error!("Sensor {} poll rejected: {}", self.sensor_id, err);
                    TickOutcome::Rejected(err)
                }
            },
        }
    }

    /// Fetch sensor metadata and pass it to the display.
    ///
    /// Failure is logged and otherwise ignored; the display keeps its
    /// placeholder label.
    pub async fn load_metadata<D: DisplaySink>(&self, display: &mut D) -> Option<SensorMetadata> {
        match self.client.fetch_metadata(&self.sensor_id).await {
            Ok(metadata) => {
                display.show_metadata(&metadata);
                Some(metadata)
            }
            Err(err) => {
                tracing::warn!("Error fetching sensor {} metadata: {}", self.sensor_id, err);
                None
            }
        }
    }

    /// Run until a fatal or caller error.
    ///
    /// Loads metadata once, then ticks every `tick_interval`, pushing the
    /// current result to `display` on every iteration. A transport failure
    /// calls `restart` exactly once and ends the loop. Returns the error
    /// that stopped it.
    pub async fn run<D, R>(&mut self, display: &mut D, restart: &R) -> Error
    where
        D: DisplaySink,
        R: Restart,
    {
        self.load_metadata(display).await;

        loop {
            match self.tick().await {
                TickOutcome::Fatal(err) => {
                    restart.restart(&err);
                    return err;
                }
                TickOutcome::Rejected(err) => return err,
                TickOutcome::Waiting | TickOutcome::Updated(_) | TickOutcome::Retrying(_) => {}
            }

            display.show_aqi(&self.state.last_result);
            tokio::time::sleep(self.policy.tick_interval).await;
        }
    }

    async fn poll(&self) -> Result<AqiResult, Error> {
        let reading = self.client.fetch_reading(&self.sensor_id).await?;

        let pm25 = reading
            .pm2_5
            .ok_or_else(|| Error::InvalidInput("pm2.5 missing from response".to_string()))?;
        let result = aqi::convert(pm25)?;

        tracing::debug!(
            "Sensor {} pm2.5={} temperature={:?} humidity={:?} age={:?}",
            self.sensor_id,
            pm25,
            reading.temperature,
            reading.humidity,
            reading.age(chrono::Utc::now()).map(|age| age.num_seconds())
        );
        Ok(result)
    }
}
