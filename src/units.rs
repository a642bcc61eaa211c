//! Unit preferences and conversions
//!
//! Sources report temperature in °C and wind in km/h (NWS `wmoUnit:` codes);
//! the chart shows whatever the user configured.

use crate::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const KMH_PER_MPH: f64 = 1.609_344;
const KMH_PER_MS: f64 = 3.6;

/// Convert degrees Celsius to Fahrenheit
#[must_use]
pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert degrees Fahrenheit to Celsius
#[must_use]
pub fn f_to_c(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert km/h to mph
#[must_use]
pub fn kmh_to_mph(kmh: f64) -> f64 {
    kmh / KMH_PER_MPH
}

/// Convert mph to km/h
#[must_use]
pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * KMH_PER_MPH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Symbol shown next to values, e.g. `F` in `54°F`
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        }
    }

    /// Convert a value expressed in `from` into this unit
    #[must_use]
    pub fn convert_from(self, value: f64, from: TemperatureUnit) -> f64 {
        match (from, self) {
            (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => c_to_f(value),
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => f_to_c(value),
            _ => value,
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" | "c" => Ok(TemperatureUnit::Celsius),
            "F" | "f" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(ForecastError::config(format!(
                "Invalid temp_unit: {other}. Must be \"C\" or \"F\"."
            ))),
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindUnit {
    KilometersPerHour,
    MilesPerHour,
}

impl WindUnit {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            WindUnit::KilometersPerHour => "km/hr",
            WindUnit::MilesPerHour => "mph",
        }
    }

    /// Convert a value expressed in `from` into this unit
    #[must_use]
    pub fn convert_from(self, value: f64, from: WindUnit) -> f64 {
        match (from, self) {
            (WindUnit::KilometersPerHour, WindUnit::MilesPerHour) => kmh_to_mph(value),
            (WindUnit::MilesPerHour, WindUnit::KilometersPerHour) => mph_to_kmh(value),
            _ => value,
        }
    }
}

impl FromStr for WindUnit {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mph" => Ok(WindUnit::MilesPerHour),
            "km/hr" | "km/h" | "kmh" => Ok(WindUnit::KilometersPerHour),
            other => Err(ForecastError::config(format!(
                "Invalid wind_unit: {other}. Must be \"km/hr\" or \"mph\"."
            ))),
        }
    }
}

impl fmt::Display for WindUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Units as reported by a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Celsius,
    Fahrenheit,
    KilometersPerHour,
    MilesPerHour,
    Percent,
    Degrees,
    /// Dimensionless index or category (Kp, seeing/transparency classes)
    Index,
}

impl Unit {
    /// Map an NWS `wmoUnit:` code (e.g. `wmoUnit:degC`) to a unit
    pub fn from_wmo(code: &str) -> Result<Self, ForecastError> {
        let code = code.strip_prefix("wmoUnit:").unwrap_or(code);
        match code {
            "degC" => Ok(Unit::Celsius),
            "degF" => Ok(Unit::Fahrenheit),
            "km_h-1" => Ok(Unit::KilometersPerHour),
            "m_s-1" => Ok(Unit::KilometersPerHour),
            "percent" => Ok(Unit::Percent),
            "degree_(angle)" => Ok(Unit::Degrees),
            other => Err(ForecastError::parse(format!("Unknown unit of measure: {other}"))),
        }
    }

    /// Scale factor applied to raw values of `code` so they land in `Unit::from_wmo(code)`
    #[must_use]
    pub fn wmo_scale(code: &str) -> f64 {
        match code.strip_prefix("wmoUnit:").unwrap_or(code) {
            "m_s-1" => KMH_PER_MS,
            _ => 1.0,
        }
    }

    #[must_use]
    pub fn temperature(self) -> Option<TemperatureUnit> {
        match self {
            Unit::Celsius => Some(TemperatureUnit::Celsius),
            Unit::Fahrenheit => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }

    #[must_use]
    pub fn wind(self) -> Option<WindUnit> {
        match self {
            Unit::KilometersPerHour => Some(WindUnit::KilometersPerHour),
            Unit::MilesPerHour => Some(WindUnit::MilesPerHour),
            _ => None,
        }
    }
}

impl From<TemperatureUnit> for Unit {
    fn from(unit: TemperatureUnit) -> Self {
        match unit {
            TemperatureUnit::Celsius => Unit::Celsius,
            TemperatureUnit::Fahrenheit => Unit::Fahrenheit,
        }
    }
}

impl From<WindUnit> for Unit {
    fn from(unit: WindUnit) -> Self {
        match unit {
            WindUnit::KilometersPerHour => Unit::KilometersPerHour,
            WindUnit::MilesPerHour => Unit::MilesPerHour,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::KilometersPerHour => "km/hr",
            Unit::MilesPerHour => "mph",
            Unit::Percent => "%",
            Unit::Degrees => "°",
            Unit::Index => "",
        };
        write!(f, "{s}")
    }
}
