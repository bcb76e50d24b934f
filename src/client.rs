//! PurpleAir API client for reading sensor data.

use std::fmt;

use serde_json::Value;

use crate::error::Error;
use crate::sensor::{SensorMetadata, SensorReading, AIR_QUALITY_FIELDS, METADATA_FIELDS};
use crate::transport::{HttpRequest, Transport};
use crate::API_BASE_URL;

/// Percent-encode a string for use in a query parameter.
///
/// ASCII letters and digits pass through; every other byte becomes `%xx`
/// with lowercase hex digits. There are no reserved-character exceptions.
///
/// # Example
///
/// ```
/// use purpleair::client::url_encode;
///
/// assert_eq!(url_encode("pm2.5"), "pm2%2e5");
/// assert_eq!(url_encode("name,pm2.5"), "name%2cpm2%2e5");
/// ```
pub fn url_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{:02x}", byte));
        }
    }
    encoded
}

/// A non-empty, ordered list of API field names.
///
/// Names are not checked against the API's field catalogue. Empty names,
/// as in `"name,,pm2.5"`, are kept and sent as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// Build a field list from individual names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the list has no entries.
    pub fn new<I, S>(fields: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_string()).collect();

        if fields.is_empty() {
            return Err(Error::InvalidArgument(
                "field_list must not be empty".to_string(),
            ));
        }
        Ok(Self(fields))
    }

    /// Parse a comma-joined field string such as `"name,pm2.5"`.
    pub fn parse(joined: &str) -> Result<Self, Error> {
        if joined.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "field_list must not be empty".to_string(),
            ));
        }
        Self::new(joined.split(','))
    }

    /// Field names in request order.
    pub fn fields(&self) -> &[String] {
        &self.0
    }

    /// Comma-joined field names.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Types accepted as the `fields` argument of [`Client::fetch_sensor_data`].
///
/// Implemented for lists of names, comma-joined strings, and JSON values
/// (which must be an array of strings or a string).
pub trait IntoFieldList {
    /// Validate and convert into a [`FieldList`].
    fn into_field_list(self) -> Result<FieldList, Error>;
}

impl IntoFieldList for FieldList {
    fn into_field_list(self) -> Result<FieldList, Error> {
        Ok(self)
    }
}

impl IntoFieldList for &FieldList {
    fn into_field_list(self) -> Result<FieldList, Error> {
        Ok(self.clone())
    }
}

impl IntoFieldList for &str {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::parse(self)
    }
}

impl IntoFieldList for String {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::parse(&self)
    }
}

impl<S: AsRef<str>> IntoFieldList for &[S] {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::new(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoFieldList for [S; N] {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::new(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoFieldList for &[S; N] {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::new(self)
    }
}

impl<S: AsRef<str>> IntoFieldList for Vec<S> {
    fn into_field_list(self) -> Result<FieldList, Error> {
        FieldList::new(self)
    }
}

impl IntoFieldList for &Value {
    fn into_field_list(self) -> Result<FieldList, Error> {
        match self {
            Value::String(joined) => FieldList::parse(joined),
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "field_list entries must be strings, got {}",
                                item
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                FieldList::new(names)
            }
            other => Err(Error::InvalidArgument(format!(
                "field_list must be a list or a string, got {}",
                other
            ))),
        }
    }
}

/// PurpleAir API client.
///
/// Holds only the API key and a transport; no state is kept between calls
/// and each call makes exactly one request.
///
/// # Example
///
/// ```rust,no_run
/// use purpleair::Client;
///
/// # async fn example() -> Result<(), purpleair::Error> {
/// let client = Client::new(reqwest::Client::new(), "your-api-key");
///
/// let body = client.fetch_sensor_data(12345, ["name", "pm2.5"]).await?;
/// println!("PM2.5: {}", body["sensor"]["pm2.5"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
    api_key: String,
    base_url: String,
}

impl<T: Transport> Client<T> {
    /// Create a new client with the given transport and API key.
    ///
    /// # Arguments
    ///
    /// * `transport` - Anything implementing [`Transport`]
    /// * `api_key` - Your PurpleAir read key
    pub fn new(transport: T, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the request for a sensor and field list without sending it.
    pub fn build_request(&self, sensor_id: impl fmt::Display, fields: &FieldList) -> HttpRequest {
        let url = format!(
            "{}/sensors/{}?fields={}",
            self.base_url,
            sensor_id,
            url_encode(&fields.joined())
        );

        HttpRequest::get(url)
            .header("X-API-Key", self.api_key.as_str())
            .header("Content-Type", "application/json")
    }

    /// Fetch the given fields for a sensor.
    ///
    /// Returns the parsed response body unmodified; requested values live
    /// under `body["sensor"]`.
    ///
    /// # Arguments
    ///
    /// * `sensor_id` - Sensor index (number or string)
    /// * `fields` - Field names as a list or a comma-joined string
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `fields` is empty or not a list/string
    ///   (no request is made); empty names inside a non-empty list are sent
    ///   unchanged
    /// - [`Error::Transport`] if the request could not be completed
    /// - [`Error::Api`] if the API returned a non-2xx status
    /// - [`Error::Decode`] if a 2xx body is not valid JSON
    pub async fn fetch_sensor_data(
        &self,
        sensor_id: impl fmt::Display,
        fields: impl IntoFieldList,
    ) -> Result<Value, Error> {
        let fields = fields.into_field_list()?;
        let request = self.build_request(&sensor_id, &fields);

        tracing::debug!("Fetching fields [{}] for sensor {}", fields, sensor_id);

        let response = self.transport.fetch(request).await.map_err(|e| {
            tracing::warn!("Request for sensor {} failed: {}", sensor_id, e);
            e
        })?;

        if !response.is_success() {
            tracing::warn!(
                "Sensor {} request failed with status code {}: {}",
                sensor_id,
                response.status,
                snippet(&response.body)
            );
            return Err(Error::Api {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|e| {
            tracing::warn!(
                "Sensor {} returned unparsable body ({}): {}",
                sensor_id,
                e,
                snippet(&response.body)
            );
            Error::Decode(format!("{} in body: {}", e, snippet(&response.body)))
        })
    }

    /// Fetch the fields used on every poll and extract a [`SensorReading`].
    pub async fn fetch_reading(
        &self,
        sensor_id: impl fmt::Display,
    ) -> Result<SensorReading, Error> {
        let body = self.fetch_sensor_data(sensor_id, AIR_QUALITY_FIELDS).await?;
        SensorReading::from_body(&body)
    }

    /// Fetch descriptive sensor information.
    pub async fn fetch_metadata(
        &self,
        sensor_id: impl fmt::Display,
    ) -> Result<SensorMetadata, Error> {
        let body = self.fetch_sensor_data(sensor_id, METADATA_FIELDS).await?;
        SensorMetadata::from_body(&body)
    }
}

#[cfg(feature = "reqwest")]
impl Client<reqwest::Client> {
    /// Create a client backed by reqwest with the given request timeout.
    pub fn with_timeout(api_key: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::new(http, api_key)
    }
}

/// First part of a response body, for log lines.
fn snippet(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
