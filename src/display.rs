//! Display collaborator.
//!
//! The poll loop pushes its current [`AqiResult`] into a [`DisplaySink`] on
//! every tick and hands over the sensor's [`SensorMetadata`] once at
//! startup. Drawing is entirely up to the sink.

use crate::aqi::AqiResult;
use crate::sensor::SensorMetadata;

/// Receives values to show on the readout.
pub trait DisplaySink {
    /// Label the readout with sensor information. Called at most once.
    fn show_metadata(&mut self, metadata: &SensorMetadata);

    /// Show the current AQI. Called on every loop tick.
    fn show_aqi(&mut self, result: &AqiResult);
}

/// A sink that writes changes to the log.
///
/// Only logs when the shown value changes, so it can be driven at the full
/// tick rate.
#[derive(Debug, Default)]
pub struct LogDisplay {
    title: Option<String>,
    shown: Option<AqiResult>,
}

impl LogDisplay {
    /// Create a sink with nothing shown yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sensor label, once metadata has arrived.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// The last result that was shown.
    pub fn shown(&self) -> Option<&AqiResult> {
        self.shown.as_ref()
    }
}

impl DisplaySink for LogDisplay {
    fn show_metadata(&mut self, metadata: &SensorMetadata) {
        let mut title = metadata.display_name().to_string();
        if let Some(model) = &metadata.model {
            title.push_str(&format!(" ({})", model));
        }
        if let Some(altitude) = &metadata.altitude {
            title.push_str(&format!(", altitude {}", altitude));
        }

        tracing::info!("Sensor: {}", title);
        self.title = Some(title);
    }

    fn show_aqi(&mut self, result: &AqiResult) {
        if self.shown.as_ref() == Some(result) {
            return;
        }

        let (r, g, b) = result.band.rgb();
        match self.title.as_deref() {
            Some(title) => tracing::info!(
                "{}: AQI {} [{} #{:02x}{:02x}{:02x}]",
                title,
                result,
                result.band,
                r,
                g,
                b
            ),
            None => tracing::info!(
                "AQI {} [{} #{:02x}{:02x}{:02x}]",
                result,
                result.band,
                r,
                g,
                b
            ),
        }
        self.shown = Some(*result);
    }
}
