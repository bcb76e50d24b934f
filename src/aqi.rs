//! US EPA AQI conversion for PM2.5 concentrations.
//!
//! | AQI       | Category                       | PM2.5 (µg/m³) |
//! |-----------|--------------------------------|---------------|
//! | 0 - 50    | Good                           | 0.0 - 12.0    |
//! | 51 - 100  | Moderate                       | 12.1 - 35.4   |
//! | 101 - 150 | Unhealthy for Sensitive Groups | 35.5 - 55.4   |
//! | 151 - 200 | Unhealthy                      | 55.5 - 150.4  |
//! | 201 - 300 | Very Unhealthy                 | 150.5 - 250.4 |
//! | 301 - 400 | Hazardous                      | 250.5 - 350.4 |
//! | 401 - 500 | Hazardous                      | 350.5 - 500.4 |
//!
//! Bands are tested from the top down with a strict "greater than" on each
//! band's lower concentration, so a reading that sits exactly on a
//! breakpoint belongs to the band below it.

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// Highest value on the AQI scale.
pub const AQI_MAX: u16 = 500;

/// One row of the PM2.5 breakpoint table.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    conc_low: f64,
    conc_high: f64,
    aqi_low: u16,
    aqi_high: u16,
}

impl Breakpoint {
    const fn new(conc_low: f64, conc_high: f64, aqi_low: u16, aqi_high: u16) -> Self {
        Self {
            conc_low,
            conc_high,
            aqi_low,
            aqi_high,
        }
    }
}

/// Breakpoints above the Good band, highest first.
const BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint::new(350.5, 500.4, 401, 500),
    Breakpoint::new(250.5, 350.4, 301, 400),
    Breakpoint::new(150.5, 250.4, 201, 300),
    Breakpoint::new(55.5, 150.4, 151, 200),
    Breakpoint::new(35.5, 55.4, 101, 150),
    Breakpoint::new(12.1, 35.4, 51, 100),
];

/// Everything from zero up to the Moderate threshold.
const GOOD: Breakpoint = Breakpoint::new(0.0, 12.0, 0, 50);

/// EPA color band for an AQI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorBand {
    /// Good (0-50)
    Green,
    /// Moderate (51-100)
    Yellow,
    /// Unhealthy for Sensitive Groups (101-150)
    Orange,
    /// Unhealthy (151-200)
    Red,
    /// Very Unhealthy (201-300)
    Purple,
    /// Hazardous (301+)
    Maroon,
    /// No valid reading
    White,
}

impl ColorBand {
    /// RGB triple used on the display.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ColorBand::Green => (0, 228, 0),
            ColorBand::Yellow => (255, 255, 0),
            ColorBand::Orange => (255, 126, 0),
            ColorBand::Red => (255, 0, 0),
            ColorBand::Purple => (143, 63, 151),
            ColorBand::Maroon => (126, 0, 35),
            ColorBand::White => (255, 255, 255),
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorBand::Green => "green",
            ColorBand::Yellow => "yellow",
            ColorBand::Orange => "orange",
            ColorBand::Red => "red",
            ColorBand::Purple => "purple",
            ColorBand::Maroon => "maroon",
            ColorBand::White => "white",
        };
        f.write_str(name)
    }
}

/// A computed AQI value and the color to draw it in.
///
/// `value` is `None` when there is no valid reading to show, which is
/// distinct from a real reading of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiResult {
    /// AQI in `0..=500`, or `None` for the blank state
    pub value: Option<u16>,
    /// Color band for the value
    pub band: ColorBand,
}

impl AqiResult {
    /// Build a result for a valid AQI value.
    pub fn from_value(value: u16) -> Self {
        Self {
            value: Some(value),
            band: aqi_color(Some(value)),
        }
    }

    /// Neutral state shown before the first successful poll.
    pub fn placeholder() -> Self {
        Self {
            value: None,
            band: ColorBand::White,
        }
    }

    /// Blank state shown after a failed poll.
    pub fn error() -> Self {
        Self {
            value: None,
            band: ColorBand::Red,
        }
    }

    /// Returns true if this result carries a valid AQI value.
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}

impl Default for AqiResult {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Formats as a right-aligned three digit number, or `no data`.
impl fmt::Display for AqiResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{:>3}", value),
            None => f.write_str("no data"),
        }
    }
}

/// Convert a raw PM2.5 concentration (µg/m³) to an AQI result.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if `pm25` is NaN or infinite
/// - [`Error::OutOfRange`] if `pm25` is negative
///
/// # Example
///
/// ```
/// use purpleair::aqi::{convert, ColorBand};
///
/// let result = convert(15.3).unwrap();
/// assert_eq!(result.value, Some(58));
/// assert_eq!(result.band, ColorBand::Yellow);
/// ```
pub fn convert(pm25: f64) -> Result<AqiResult, Error> {
    if !pm25.is_finite() {
        return Err(Error::InvalidInput(pm25.to_string()));
    }
    if pm25 < 0.0 {
        return Err(Error::OutOfRange(pm25));
    }

    let band = BREAKPOINTS
        .iter()
        .find(|bp| pm25 > bp.conc_low)
        .unwrap_or(&GOOD);

    let aqi = calc_aqi(
        pm25,
        band.aqi_high.into(),
        band.aqi_low.into(),
        band.conc_high,
        band.conc_low,
    );

    // Readings past the top of the table extrapolate beyond 500
    let value = aqi.clamp(0.0, f64::from(AQI_MAX)) as u16;
    Ok(AqiResult::from_value(value))
}

/// Convert a JSON value holding a PM2.5 concentration.
///
/// Accepts JSON numbers and strings that parse as numbers. Anything else,
/// including `null`, is [`Error::InvalidInput`].
pub fn convert_value(pm25: &serde_json::Value) -> Result<AqiResult, Error> {
    convert(coerce_f64(pm25)?)
}

/// Coerce a JSON number or numeric string to `f64`.
pub(crate) fn coerce_f64(value: &serde_json::Value) -> Result<f64, Error> {
    match value {
        serde_json::Value::Number(n) => {
            n.as_f64().ok_or_else(|| Error::InvalidInput(n.to_string()))
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidInput(s.clone())),
        other => Err(Error::InvalidInput(other.to_string())),
    }
}

/// Linear interpolation within one breakpoint band.
///
/// `cp` is the concentration, `ih`/`il` the AQI bounds and `bph`/`bpl` the
/// concentration bounds. Rounds to nearest, ties to even.
pub fn calc_aqi(cp: f64, ih: f64, il: f64, bph: f64, bpl: f64) -> f64 {
    ((ih - il) / (bph - bpl) * (cp - bpl) + il).round_ties_even()
}

/// Color band for an AQI value; `None` maps to [`ColorBand::White`].
pub fn aqi_color(aqi: Option<u16>) -> ColorBand {
    match aqi {
        Some(v) if v > 300 => ColorBand::Maroon,
        Some(v) if v > 200 => ColorBand::Purple,
        Some(v) if v > 150 => ColorBand::Red,
        Some(v) if v > 100 => ColorBand::Orange,
        Some(v) if v > 50 => ColorBand::Yellow,
        Some(_) => ColorBand::Green,
        None => ColorBand::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aqi(pm25: f64) -> u16 {
        convert(pm25).unwrap().value.unwrap()
    }

    #[test]
    fn test_known_values() {
        assert_eq!(aqi(0.0), 0);
        assert_eq!(aqi(6.0), 25);
        assert_eq!(aqi(15.3), 58);
        assert_eq!(aqi(25.0), 78);
        assert_eq!(aqi(100.0), 174);
        assert_eq!(aqi(500.4), 500);
    }

    #[test]
    fn test_breakpoint_upper_bounds_stay_in_lower_band() {
        assert_eq!(aqi(12.0), 50);
        assert_eq!(aqi(35.4), 100);
        assert_eq!(aqi(55.4), 150);
        assert_eq!(aqi(150.4), 200);
        assert_eq!(aqi(250.4), 300);
        assert_eq!(aqi(350.4), 400);
    }

    #[test]
    fn test_band_lower_thresholds_are_exclusive() {
        // Exactly on a lower threshold is still scored by the band below
        assert_eq!(aqi(12.1), 50);
        assert_eq!(aqi(35.5), 100);
        assert_eq!(aqi(55.5), 150);
        assert_eq!(aqi(150.5), 200);
        assert_eq!(aqi(250.5), 300);
        assert_eq!(aqi(350.5), 400);
    }

    #[test]
    fn test_each_band_stays_within_bounds() {
        let bands = [
            (0.0, 12.0, 0, 50),
            (12.2, 35.4, 51, 100),
            (35.6, 55.4, 101, 150),
            (55.6, 150.4, 151, 200),
            (150.6, 250.4, 201, 300),
            (250.6, 350.4, 301, 400),
            (350.6, 500.4, 401, 500),
        ];
        for (low, high, aqi_low, aqi_high) in bands {
            let mut pm = low;
            while pm <= high {
                let value = aqi(pm);
                assert!(
                    (aqi_low..=aqi_high).contains(&value),
                    "pm {} gave {} outside {}..={}",
                    pm,
                    value,
                    aqi_low,
                    aqi_high
                );
                pm += 0.7;
            }
        }
    }

    #[test]
    fn test_above_table_is_clamped() {
        assert_eq!(aqi(600.0), AQI_MAX);
        assert_eq!(convert(9999.0).unwrap().band, ColorBand::Maroon);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(convert(-1.0), Err(Error::OutOfRange(_))));
        assert!(matches!(convert(f64::NAN), Err(Error::InvalidInput(_))));
        assert!(matches!(
            convert_value(&json!("abc")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            convert_value(&serde_json::Value::Null),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            convert_value(&json!(-1)),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_convert_value_coerces_numeric_strings() {
        assert_eq!(convert_value(&json!("15.3")).unwrap().value, Some(58));
        assert_eq!(convert_value(&json!(15.3)).unwrap().value, Some(58));
        assert_eq!(convert_value(&json!(0)).unwrap().value, Some(0));
    }

    #[test]
    fn test_calc_aqi() {
        let calc = calc_aqi(25.0, 100.0, 51.0, 35.4, 12.1);
        assert_eq!(calc, 78.0);
        // Ties round to even
        assert_eq!(calc_aqi(1.0, 1.0, 0.0, 2.0, 0.0), 0.0);
        assert_eq!(calc_aqi(3.0, 1.0, 0.0, 2.0, 0.0), 2.0);
    }

    #[test]
    fn test_aqi_color() {
        assert_eq!(aqi_color(Some(0)), ColorBand::Green);
        assert_eq!(aqi_color(Some(25)), ColorBand::Green);
        assert_eq!(aqi_color(Some(50)), ColorBand::Green);
        assert_eq!(aqi_color(Some(75)), ColorBand::Yellow);
        assert_eq!(aqi_color(Some(125)), ColorBand::Orange);
        assert_eq!(aqi_color(Some(175)), ColorBand::Red);
        assert_eq!(aqi_color(Some(250)), ColorBand::Purple);
        assert_eq!(aqi_color(Some(350)), ColorBand::Maroon);
        assert_eq!(aqi_color(None), ColorBand::White);
    }

    #[test]
    fn test_result_display() {
        assert_eq!(AqiResult::from_value(7).to_string(), "  7");
        assert_eq!(AqiResult::from_value(158).to_string(), "158");
        assert_eq!(AqiResult::error().to_string(), "no data");
        assert_eq!(AqiResult::error().band, ColorBand::Red);
        assert_eq!(AqiResult::default(), AqiResult::placeholder());
        assert!(!AqiResult::placeholder().is_valid());
    }

    #[test]
    fn test_band_rgb() {
        assert_eq!(ColorBand::Yellow.rgb(), (255, 255, 0));
        assert_eq!(ColorBand::Maroon.rgb(), (126, 0, 35));
        assert_eq!(
            serde_json::to_string(&ColorBand::Maroon).unwrap(),
            "\"MAROON\""
        );
    }
}
