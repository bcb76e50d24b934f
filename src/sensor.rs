//! PurpleAir sensor data types.
//!
//! The API wraps every sensor response in a `sensor` object:
//!
//! ```json
//! { "sensor": { "pm2.5": 15.3, "last_seen": 1702483200 } }
//! ```
//!
//! See: <https://api.purpleair.com/#api-sensors-get-sensor-data>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aqi::coerce_f64;
use crate::error::Error;

/// Fields requested on every poll.
pub const AIR_QUALITY_FIELDS: [&str; 4] = ["pm2.5", "temperature", "humidity", "last_seen"];

/// Fields requested once at startup to label the display.
pub const METADATA_FIELDS: [&str; 6] = [
    "name",
    "model",
    "latitude",
    "longitude",
    "altitude",
    "last_seen",
];

/// The subset of a sensor response consumed on each poll.
///
/// Temperature and humidity are the sensor's raw values; no correction is
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorReading {
    /// PM2.5 concentration in µg/m³
    pub pm2_5: Option<f64>,

    /// Temperature inside the sensor housing (°F)
    pub temperature: Option<f64>,

    /// Relative humidity inside the sensor housing (%)
    pub humidity: Option<f64>,

    /// Unix timestamp of the sensor's last report
    pub last_seen: Option<i64>,
}

impl SensorReading {
    /// Extract a reading from a full API response body.
    ///
    /// Missing and `null` fields become `None`. Numeric strings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a present field is not numeric.
    pub fn from_body(body: &Value) -> Result<Self, Error> {
        let sensor = sensor_object(body);

        Ok(Self {
            pm2_5: numeric_field(sensor, "pm2.5")?,
            temperature: numeric_field(sensor, "temperature")?,
            humidity: numeric_field(sensor, "humidity")?,
            last_seen: numeric_field(sensor, "last_seen")?.map(|t| t as i64),
        })
    }

    /// Time of the sensor's last report.
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// How long before `now` the sensor last reported.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_seen_at().map(|seen| now - seen)
    }
}

/// Sensor altitude; the API has returned both numbers and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Altitude {
    /// Altitude in feet
    Feet(f64),
    /// Altitude as reported
    Text(String),
}

impl std::fmt::Display for Altitude {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Altitude::Feet(feet) => write!(f, "{} ft", feet),
            Altitude::Text(text) => f.write_str(text),
        }
    }
}

/// Descriptive sensor information, fetched once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorMetadata {
    /// Sensor name as set by its owner
    #[serde(default)]
    pub name: Option<String>,

    /// Hardware model (e.g. "PA-II")
    #[serde(default)]
    pub model: Option<String>,

    /// Altitude
    #[serde(default)]
    pub altitude: Option<Altitude>,

    /// Latitude in degrees
    #[serde(default)]
    pub latitude: Option<f64>,

    /// Longitude in degrees
    #[serde(default)]
    pub longitude: Option<f64>,

    /// Unix timestamp of the sensor's last report
    #[serde(default)]
    pub last_seen: Option<i64>,
}

impl SensorMetadata {
    /// Extract metadata from a full API response body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if a present field has the wrong type.
    pub fn from_body(body: &Value) -> Result<Self, Error> {
        match body.get("sensor") {
            Some(sensor) => Ok(Self::deserialize(sensor)?),
            None => Ok(Self::default()),
        }
    }

    /// Label for the display, falling back to a generic name.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("PurpleAir sensor")
    }
}

static NO_SENSOR: Value = Value::Null;

fn sensor_object(body: &Value) -> &Value {
    body.get("sensor").unwrap_or(&NO_SENSOR)
}

fn numeric_field(sensor: &Value, field: &str) -> Result<Option<f64>, Error> {
    match sensor.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_f64(value)
            .map(Some)
            .map_err(|_| Error::InvalidInput(format!("{}={}", field, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reading_from_body() {
        let body = json!({
            "sensor": {
                "pm2.5": 15.3,
                "temperature": 71,
                "humidity": "38",
                "last_seen": 1702483200
            }
        });
        let reading = SensorReading::from_body(&body).unwrap();

        assert_eq!(reading.pm2_5, Some(15.3));
        assert_eq!(reading.temperature, Some(71.0));
        assert_eq!(reading.humidity, Some(38.0));
        assert_eq!(reading.last_seen, Some(1702483200));
    }

    #[test]
    fn test_reading_missing_fields_are_none() {
        let reading = SensorReading::from_body(&json!({"sensor": {"pm2.5": null}})).unwrap();
        assert_eq!(reading, SensorReading::default());

        let reading = SensorReading::from_body(&json!({})).unwrap();
        assert_eq!(reading.pm2_5, None);
    }

    #[test]
    fn test_reading_rejects_non_numeric_field() {
        let err = SensorReading::from_body(&json!({"sensor": {"pm2.5": "abc"}})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("pm2.5"));
    }

    #[test]
    fn test_reading_age() {
        let reading = SensorReading {
            last_seen: Some(1_702_483_200),
            ..Default::default()
        };
        let now = DateTime::from_timestamp(1_702_483_290, 0).unwrap();

        assert_eq!(reading.age(now), Some(chrono::Duration::seconds(90)));
        assert_eq!(SensorReading::default().age(now), None);
    }

    #[test]
    fn test_metadata_from_body() {
        let body = json!({
            "sensor": {
                "name": "Backyard",
                "model": "PA-II",
                "altitude": 520,
                "latitude": 47.6,
                "longitude": -122.3
            }
        });
        let metadata = SensorMetadata::from_body(&body).unwrap();

        assert_eq!(metadata.display_name(), "Backyard");
        assert_eq!(metadata.model.as_deref(), Some("PA-II"));
        assert_eq!(metadata.altitude, Some(Altitude::Feet(520.0)));
        assert_eq!(metadata.altitude.unwrap().to_string(), "520 ft");
        assert_eq!(metadata.last_seen, None);
    }

    #[test]
    fn test_metadata_string_altitude() {
        let body = json!({"sensor": {"altitude": "unknown"}});
        let metadata = SensorMetadata::from_body(&body).unwrap();

        assert_eq!(
            metadata.altitude,
            Some(Altitude::Text("unknown".to_string()))
        );
        assert_eq!(metadata.display_name(), "PurpleAir sensor");
    }

    #[test]
    fn test_metadata_wrong_type_is_decode_error() {
        let body = json!({"sensor": {"name": 42}});
        assert!(matches!(
            SensorMetadata::from_body(&body),
            Err(Error::Decode(_))
        ));
    }
}
