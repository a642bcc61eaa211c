//! Location model for the forecast site

use crate::ForecastError;
use chrono_tz::Tz;

/// Observing site: coordinates, timezone and elevation
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// IANA timezone used for axis labels and "today"
    pub timezone: Tz,
    /// Elevation above mean sea level in metres
    pub elevation: f64,
}

impl Location {
    /// Create a validated location
    pub fn new(latitude: f64, longitude: f64, timezone: Tz, elevation: f64) -> Result<Self, ForecastError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ForecastError::config(format!(
                "Invalid latitude entered: {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ForecastError::config(format!(
                "Invalid longitude entered: {longitude}"
            )));
        }
        if !elevation.is_finite() {
            return Err(ForecastError::config("Elevation must be a finite number"));
        }
        Ok(Self {
            latitude,
            longitude,
            timezone,
            elevation,
        })
    }

    /// Parse an IANA timezone name such as `US/Pacific`
    pub fn parse_timezone(name: &str) -> Result<Tz, ForecastError> {
        name.trim()
            .parse::<Tz>()
            .map_err(|_| ForecastError::config(format!("Unknown timezone: {name}")))
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Hemisphere-aware label, e.g. `39.236°N, 120.026°W`
    #[must_use]
    pub fn format_hemispheres(&self) -> String {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        format!(
            "{:.3}°{ns}, {:.3}°{ew}",
            self.latitude.abs(),
            self.longitude.abs()
        )
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Generate cache key for this location and a source-specific namespace
    #[must_use]
    pub fn cache_key(&self, namespace: &str) -> String {
        let (lat, lon) = self.rounded_coordinates(3);
        format!("{namespace}:{lat:.3}:{lon:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tahoe() -> Location {
        Location::new(39.236, -120.026, chrono_tz::US::Pacific, 1980.0).unwrap()
    }

    #[test]
    fn test_location_cache_key() {
        let location = tahoe();
        assert_eq!(location.cache_key("nws:points"), "nws:points:39.236:-120.026");
    }

    #[test]
    fn test_location_rounded_coordinates() {
        let location = Location::new(46.818_234, 8.227_456, chrono_tz::UTC, 0.0).unwrap();
        let (lat, lon) = location.rounded_coordinates(2);
        assert_eq!(lat, 46.82);
        assert_eq!(lon, 8.23);
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        assert!(Location::new(91.0, 0.0, chrono_tz::UTC, 0.0).is_err());
        assert!(Location::new(0.0, -180.5, chrono_tz::UTC, 0.0).is_err());
        assert!(Location::new(0.0, 0.0, chrono_tz::UTC, f64::NAN).is_err());
    }

    #[test]
    fn test_hemisphere_label() {
        assert_eq!(tahoe().format_hemispheres(), "39.236°N, 120.026°W");
        let sydney = Location::new(-33.868, 151.209, chrono_tz::Australia::Sydney, 0.0).unwrap();
        assert_eq!(sydney.format_hemispheres(), "33.868°S, 151.209°E");
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(Location::parse_timezone("US/Pacific").unwrap(), chrono_tz::US::Pacific);
        assert!(Location::parse_timezone("Mars/Olympus_Mons").is_err());
    }
}
