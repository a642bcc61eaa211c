//! Sun and moon ephemeris
//!
//! Low-precision positions after Meeus, *Astronomical Algorithms* (2nd ed.):
//! the sun from chapter 25, the moon from the leading terms of chapter 47,
//! phase from chapter 48. Accurate to a few hundredths of a degree, which is
//! far below what the altitude panel can show. Rise/set and twilight times
//! come from the `sunrise` crate.

use crate::ForecastError;
use crate::models::Location;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use sunrise::{Coordinates, DawnType, SolarDay, SolarEvent};

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const EARTH_RADIUS_KM: f64 = 6378.14;
const AU_KM: f64 = 149_597_870.7;
/// Half-width of the window around the quarter points that counts as "at" a phase
const PHASE_TOLERANCE: f64 = PI / 28.0;

/// Julian day of an instant (UT, treated as TD)
#[must_use]
pub fn julian_day(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 86_400_000.0 + UNIX_EPOCH_JD
}

fn centuries(jd: f64) -> f64 {
    (jd - J2000) / 36525.0
}

fn normalize_degrees(angle: f64) -> f64 {
    angle.rem_euclid(360.0)
}

fn sin_d(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_d(x: f64) -> f64 {
    x.to_radians().cos()
}

/// Geocentric ecliptic coordinates, degrees and kilometres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ecliptic {
    pub longitude: f64,
    pub latitude: f64,
    pub distance_km: f64,
}

/// Geocentric equatorial coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    pub right_ascension: f64,
    pub declination: f64,
    pub distance_km: f64,
}

/// Nutation in longitude and obliquity, degrees
fn nutation(t: f64) -> (f64, f64) {
    let omega = 125.04452 - 1934.136261 * t;
    let l_sun = 280.4665 + 36000.7698 * t;
    let l_moon = 218.3165 + 481_267.8813 * t;
    let dpsi = -17.20 * sin_d(omega) - 1.32 * sin_d(2.0 * l_sun) - 0.23 * sin_d(2.0 * l_moon)
        + 0.21 * sin_d(2.0 * omega);
    let deps = 9.20 * cos_d(omega) + 0.57 * cos_d(2.0 * l_sun) + 0.10 * cos_d(2.0 * l_moon)
        - 0.09 * cos_d(2.0 * omega);
    (dpsi / 3600.0, deps / 3600.0)
}

fn mean_obliquity(t: f64) -> f64 {
    23.439_291_111 - 0.013_004_167 * t - 1.639e-7 * t * t + 5.036e-7 * t * t * t
}

fn to_equatorial(ecliptic: Ecliptic, obliquity: f64) -> Equatorial {
    let (lambda, beta, eps) = (
        ecliptic.longitude.to_radians(),
        ecliptic.latitude.to_radians(),
        obliquity.to_radians(),
    );
    let ra = (lambda.sin() * eps.cos() - beta.tan() * eps.sin()).atan2(lambda.cos());
    let dec = (beta.sin() * eps.cos() + beta.cos() * eps.sin() * lambda.sin()).asin();
    Equatorial {
        right_ascension: normalize_degrees(ra.to_degrees()),
        declination: dec.to_degrees(),
        distance_km: ecliptic.distance_km,
    }
}

fn sun_ecliptic_at(t: f64) -> (Ecliptic, f64) {
    let l0 = 280.46646 + 36000.76983 * t + 0.000_303_2 * t * t;
    let m = 357.52911 + 35999.05029 * t - 0.000_153_7 * t * t;
    let e = 0.016_708_634 - 0.000_042_037 * t - 0.000_000_126_7 * t * t;
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * sin_d(m)
        + (0.019_993 - 0.000_101 * t) * sin_d(2.0 * m)
        + 0.000_289 * sin_d(3.0 * m);
    let true_longitude = l0 + c;
    let anomaly = m + c;
    let radius_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * cos_d(anomaly));
    let omega = 125.04 - 1934.136 * t;
    let apparent = true_longitude - 0.005_69 - 0.004_78 * sin_d(omega);
    let obliquity = mean_obliquity(t) + 0.002_56 * cos_d(omega);
    (
        Ecliptic {
            longitude: normalize_degrees(apparent),
            latitude: 0.0,
            distance_km: radius_au * AU_KM,
        },
        obliquity,
    )
}

/// Apparent ecliptic position of the sun
#[must_use]
pub fn sun_ecliptic(time: DateTime<Utc>) -> Ecliptic {
    sun_ecliptic_at(centuries(julian_day(time))).0
}

/// Apparent equatorial position of the sun
#[must_use]
pub fn sun_position(time: DateTime<Utc>) -> Equatorial {
    let (ecliptic, obliquity) = sun_ecliptic_at(centuries(julian_day(time)));
    to_equatorial(ecliptic, obliquity)
}

// Periodic terms for the moon: multiples of D, M, M', F and the
// coefficients of longitude (1e-6 deg) and distance (1e-3 km)
#[rustfmt::skip]
const MOON_LR: [(i8, i8, i8, i8, f64, f64); 32] = [
    (0, 0, 1, 0, 6_288_774.0, -20_905_355.0),
    (2, 0, -1, 0, 1_274_027.0, -3_699_111.0),
    (2, 0, 0, 0, 658_314.0, -2_955_968.0),
    (0, 0, 2, 0, 213_618.0, -569_925.0),
    (0, 1, 0, 0, -185_116.0, 48_888.0),
    (0, 0, 0, 2, -114_332.0, -3_149.0),
    (2, 0, -2, 0, 58_793.0, 246_158.0),
    (2, -1, -1, 0, 57_066.0, -152_138.0),
    (2, 0, 1, 0, 53_322.0, -170_733.0),
    (2, -1, 0, 0, 45_758.0, -204_586.0),
    (0, 1, -1, 0, -40_923.0, -129_620.0),
    (1, 0, 0, 0, -34_720.0, 108_743.0),
    (0, 1, 1, 0, -30_383.0, 104_755.0),
    (2, 0, 0, -2, 15_327.0, 10_321.0),
    (0, 0, 1, 2, -12_528.0, 0.0),
    (0, 0, 1, -2, 10_980.0, 79_661.0),
    (4, 0, -1, 0, 10_675.0, -34_782.0),
    (0, 0, 3, 0, 10_034.0, -23_210.0),
    (4, 0, -2, 0, 8_548.0, -21_636.0),
    (2, 1, -1, 0, -7_888.0, 24_208.0),
    (2, 1, 0, 0, -6_766.0, 30_824.0),
    (1, 0, -1, 0, -5_163.0, -8_379.0),
    (1, 1, 0, 0, 4_987.0, -16_675.0),
    (2, -1, 1, 0, 4_036.0, -12_831.0),
    (2, 0, 2, 0, 3_994.0, -10_445.0),
    (4, 0, 0, 0, 3_861.0, -11_650.0),
    (2, 0, -3, 0, 3_665.0, 14_403.0),
    (0, 1, -2, 0, -2_689.0, -7_003.0),
    (2, 0, -1, 2, -2_602.0, 0.0),
    (2, -1, -2, 0, 2_390.0, 10_056.0),
    (1, 0, 1, 0, -2_348.0, 6_322.0),
    (2, -2, 0, 0, 2_236.0, -9_884.0),
];

// Same for latitude (1e-6 deg)
#[rustfmt::skip]
const MOON_B: [(i8, i8, i8, i8, f64); 20] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
    (2, 1, 0, -1, -3_359.0),
    (2, -1, -1, 1, 2_463.0),
    (2, -1, 0, 1, 2_211.0),
    (2, -1, -1, -1, 2_065.0),
    (0, 1, -1, -1, -1_870.0),
    (4, 0, -1, -1, 1_828.0),
    (0, 1, 0, 1, -1_794.0),
];

fn moon_ecliptic_at(t: f64) -> Ecliptic {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let lp = 218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t2 + t3 / 538_841.0 - t4 / 65_194_000.0;
    let d = 297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t2 + t3 / 545_868.0 - t4 / 113_065_000.0;
    let m = 357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t2 + t3 / 24_490_000.0;
    let mp = 134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t2 + t3 / 69_699.0 - t4 / 14_712_000.0;
    let f = 93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t2 - t3 / 3_526_000.0 + t4 / 863_310_000.0;
    let a1 = 119.75 + 131.849 * t;
    let a2 = 53.09 + 479_264.290 * t;
    let a3 = 313.45 + 481_266.484 * t;
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;

    let eccentricity = |mult: i8| match mult.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };
    let argument = |cd: i8, cm: i8, cmp: i8, cf: i8| {
        f64::from(cd) * d + f64::from(cm) * m + f64::from(cmp) * mp + f64::from(cf) * f
    };

    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(cd, cm, cmp, cf, l, r) in &MOON_LR {
        let arg = argument(cd, cm, cmp, cf);
        let scale = eccentricity(cm);
        sum_l += l * scale * sin_d(arg);
        sum_r += r * scale * cos_d(arg);
    }
    let mut sum_b = 0.0;
    for &(cd, cm, cmp, cf, b) in &MOON_B {
        sum_b += b * eccentricity(cm) * sin_d(argument(cd, cm, cmp, cf));
    }

    sum_l += 3958.0 * sin_d(a1) + 1962.0 * sin_d(lp - f) + 318.0 * sin_d(a2);
    sum_b += -2235.0 * sin_d(lp) + 382.0 * sin_d(a3) + 175.0 * sin_d(a1 - f) + 175.0 * sin_d(a1 + f)
        + 127.0 * sin_d(lp - mp)
        - 115.0 * sin_d(lp + mp);

    let (dpsi, _) = nutation(t);
    Ecliptic {
        longitude: normalize_degrees(lp + sum_l / 1e6 + dpsi),
        latitude: sum_b / 1e6,
        distance_km: 385_000.56 + sum_r / 1000.0,
    }
}

/// Apparent ecliptic position of the moon
#[must_use]
pub fn moon_ecliptic(time: DateTime<Utc>) -> Ecliptic {
    moon_ecliptic_at(centuries(julian_day(time)))
}

/// Apparent equatorial position of the moon
#[must_use]
pub fn moon_position(time: DateTime<Utc>) -> Equatorial {
    let t = centuries(julian_day(time));
    let (_, deps) = nutation(t);
    to_equatorial(moon_ecliptic_at(t), mean_obliquity(t) + deps)
}

/// Mean sidereal time at Greenwich in degrees
#[must_use]
pub fn greenwich_sidereal_time(time: DateTime<Utc>) -> f64 {
    let jd = julian_day(time);
    let t = centuries(jd);
    normalize_degrees(
        280.460_618_37 + 360.985_647_366_29 * (jd - J2000) + 0.000_387_933 * t * t - t * t * t / 38_710_000.0,
    )
}

/// Bodies drawn on the altitude panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Sun,
    Moon,
}

impl Body {
    #[must_use]
    pub fn position(self, time: DateTime<Utc>) -> Equatorial {
        match self {
            Body::Sun => sun_position(time),
            Body::Moon => moon_position(time),
        }
    }
}

/// Altitude of `position` seen from `location`, ignoring parallax and refraction
#[must_use]
pub fn geocentric_altitude(position: &Equatorial, time: DateTime<Utc>, location: &Location) -> f64 {
    let hour_angle = greenwich_sidereal_time(time) + location.longitude - position.right_ascension;
    let (lat, dec) = (location.latitude.to_radians(), position.declination.to_radians());
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.to_radians().cos();
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Topocentric altitude in degrees; no refraction, matching an airless horizon
#[must_use]
pub fn altitude(body: Body, time: DateTime<Utc>, location: &Location) -> f64 {
    let position = body.position(time);
    let geocentric = geocentric_altitude(&position, time, location);
    let rho = 1.0 + location.elevation / (EARTH_RADIUS_KM * 1000.0);
    let sin_parallax = (rho * EARTH_RADIUS_KM / position.distance_km).min(1.0);
    let parallax = (sin_parallax * cos_d(geocentric)).asin().to_degrees();
    geocentric - parallax
}

/// Named lunar phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LunarPhase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    ThirdQuarter,
    WaningCrescent,
}

impl LunarPhase {
    pub const ALL: [LunarPhase; 8] = [
        LunarPhase::New,
        LunarPhase::WaxingCrescent,
        LunarPhase::FirstQuarter,
        LunarPhase::WaxingGibbous,
        LunarPhase::Full,
        LunarPhase::WaningGibbous,
        LunarPhase::ThirdQuarter,
        LunarPhase::WaningCrescent,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LunarPhase::New => "New Moon",
            LunarPhase::WaxingCrescent => "Waxing Crescent",
            LunarPhase::FirstQuarter => "First Quarter",
            LunarPhase::WaxingGibbous => "Waxing Gibbous",
            LunarPhase::Full => "Full Moon",
            LunarPhase::WaningGibbous => "Waning Gibbous",
            LunarPhase::ThirdQuarter => "Third Quarter",
            LunarPhase::WaningCrescent => "Waning Crescent",
        }
    }

    /// Classify a signed phase angle: negative while waxing, 0 at full, ±π at new
    #[must_use]
    pub fn classify(phase_angle: f64) -> Self {
        let waxing = phase_angle < 0.0;
        let i = phase_angle.abs();
        if i <= PHASE_TOLERANCE {
            LunarPhase::Full
        } else if (i - PI).abs() <= PHASE_TOLERANCE {
            LunarPhase::New
        } else if (i - PI / 2.0).abs() <= PHASE_TOLERANCE {
            if waxing { LunarPhase::FirstQuarter } else { LunarPhase::ThirdQuarter }
        } else {
            match (waxing, i > PI / 2.0) {
                (true, true) => LunarPhase::WaxingCrescent,
                (true, false) => LunarPhase::WaxingGibbous,
                (false, false) => LunarPhase::WaningGibbous,
                (false, true) => LunarPhase::WaningCrescent,
            }
        }
    }

    #[must_use]
    pub fn is_waxing(self) -> bool {
        matches!(
            self,
            LunarPhase::WaxingCrescent | LunarPhase::FirstQuarter | LunarPhase::WaxingGibbous
        )
    }
}

impl fmt::Display for LunarPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LunarPhase {
    type Err = ForecastError;

    /// Accepts `Full Moon`, `full`, `waxing-gibbous`, `third_quarter` and so on
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        let wanted = wanted.strip_suffix(" moon").unwrap_or(&wanted);
        LunarPhase::ALL
            .into_iter()
            .find(|phase| {
                let name = phase.name().to_lowercase();
                name == wanted || name.strip_suffix(" moon") == Some(wanted)
            })
            .or(match wanted {
                "last quarter" => Some(LunarPhase::ThirdQuarter),
                _ => None,
            })
            .ok_or_else(|| {
                let names: Vec<&str> = LunarPhase::ALL.iter().map(|p| p.name()).collect();
                ForecastError::config(format!("Invalid phase: {s}. Must be one of: {}", names.join(", ")))
            })
    }
}

/// Phase of the moon at an instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonPhase {
    pub phase: LunarPhase,
    /// Illuminated fraction of the disk, 0 to 1
    pub illumination: f64,
    /// Signed phase angle in radians, negative while waxing
    pub phase_angle: f64,
}

impl MoonPhase {
    #[must_use]
    pub fn illumination_percent(&self) -> f64 {
        self.illumination * 100.0
    }
}

/// Lunar phase and illuminated fraction at `time`
#[must_use]
pub fn moon_phase(time: DateTime<Utc>) -> MoonPhase {
    let sun = sun_ecliptic(time);
    let moon = moon_ecliptic(time);
    let elongation = (cos_d(moon.latitude) * cos_d(moon.longitude - sun.longitude)).clamp(-1.0, 1.0).acos();
    let i = (sun.distance_km * elongation.sin()).atan2(moon.distance_km - sun.distance_km * elongation.cos());
    let waxing = normalize_degrees(moon.longitude - sun.longitude) < 180.0;
    let phase_angle = if waxing { -i } else { i };
    MoonPhase {
        phase: LunarPhase::classify(phase_angle),
        illumination: (1.0 + i.cos()) / 2.0,
        phase_angle,
    }
}

/// Local date on which the moon next shows `target`, searching 28 days ahead
#[must_use]
pub fn next_phase_date(target: LunarPhase, from: DateTime<Utc>, timezone: Tz) -> Option<NaiveDate> {
    // quarter windows last about a day, so sample four times a day
    (0..=28 * 4)
        .map(|step| from + Duration::hours(6 * step))
        .find(|t| moon_phase(*t).phase == target)
        .map(|t| t.with_timezone(&timezone).date_naive())
}

/// Sun events for one UTC date; `None` where the event does not occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunEvents {
    pub astronomical_dawn: Option<DateTime<Utc>>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub astronomical_dusk: Option<DateTime<Utc>>,
}

pub fn sun_events(location: &Location, date: NaiveDate) -> Result<SunEvents, ForecastError> {
    let coordinates = Coordinates::new(location.latitude, location.longitude).ok_or_else(|| {
        ForecastError::config(format!(
            "Invalid coordinates: lat={}, lon={}",
            location.latitude, location.longitude
        ))
    })?;
    let day = SolarDay::new(coordinates, date);
    Ok(SunEvents {
        astronomical_dawn: day.event_time(SolarEvent::Dawn(DawnType::Astronomical)),
        sunrise: day.event_time(SolarEvent::Sunrise),
        sunset: day.event_time(SolarEvent::Sunset),
        astronomical_dusk: day.event_time(SolarEvent::Dusk(DawnType::Astronomical)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn from_jd(jd: f64) -> DateTime<Utc> {
        let millis = ((jd - UNIX_EPOCH_JD) * 86_400_000.0).round() as i64;
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn angle_diff(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn test_julian_day() {
        let t = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_day(t) - J2000).abs() < 1e-9);
    }

    #[test]
    fn test_sun_position_meeus_25a() {
        // 1992 October 13.0
        let sun = sun_position(from_jd(2_448_908.5));
        assert!(angle_diff(sun.right_ascension, 198.380_83) < 0.01, "{sun:?}");
        assert!((sun.declination - -7.785_07).abs() < 0.01, "{sun:?}");
        assert!((sun.distance_km / AU_KM - 0.997_66).abs() < 1e-4);
    }

    #[test]
    fn test_moon_position_meeus_47a() {
        // 1992 April 12.0
        let t = from_jd(2_448_724.5);
        let ecl = moon_ecliptic(t);
        assert!(angle_diff(ecl.longitude, 133.167_265) < 0.05, "{ecl:?}");
        assert!((ecl.latitude - -3.229_126).abs() < 0.05, "{ecl:?}");
        assert!((ecl.distance_km - 368_409.7).abs() < 100.0, "{ecl:?}");

        let eq = moon_position(t);
        assert!(angle_diff(eq.right_ascension, 134.688_470) < 0.05, "{eq:?}");
        assert!((eq.declination - 13.768_368).abs() < 0.05, "{eq:?}");
    }

    #[test]
    fn test_sidereal_time_meeus_12b() {
        // 1987 April 10, 19h21m00s UT
        let t = Utc.with_ymd_and_hms(1987, 4, 10, 19, 21, 0).unwrap();
        assert!(angle_diff(greenwich_sidereal_time(t), 128.737_873_4) < 1e-4);
    }

    #[test]
    fn test_moon_phase_meeus_48a() {
        let phase = moon_phase(from_jd(2_448_724.5));
        assert!((phase.illumination - 0.6786).abs() < 0.005, "{phase:?}");
        assert_eq!(phase.phase, LunarPhase::WaxingGibbous);
    }

    #[test]
    fn test_solstice_noon_sun_altitude() {
        let location = Location::new(40.0, 0.0, chrono_tz::UTC, 0.0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 6, 20, 12, 2, 0).unwrap();
        let alt = altitude(Body::Sun, noon, &location);
        assert!((alt - 73.43).abs() < 0.2, "{alt}");

        let midnight = Utc.with_ymd_and_hms(2024, 6, 21, 0, 2, 0).unwrap();
        assert!(altitude(Body::Sun, midnight, &location) < -20.0);
    }

    #[test]
    fn test_moon_parallax_lowers_altitude() {
        let location = Location::new(39.236, -120.026, chrono_tz::US::Pacific, 1980.0).unwrap();
        let t = Utc.with_ymd_and_hms(2024, 3, 20, 6, 0, 0).unwrap();
        let position = moon_position(t);
        let geo = geocentric_altitude(&position, t, &location);
        let topo = altitude(Body::Moon, t, &location);
        let parallax = geo - topo;
        // horizontal parallax is between 0.9 and 1.02 degrees
        assert!(parallax > 0.0 && parallax < 1.02, "{parallax}");
        assert!((parallax - 0.95 * cos_d(geo)).abs() < 0.08);
    }

    #[rstest]
    #[case(0.0, LunarPhase::Full)]
    #[case(PI, LunarPhase::New)]
    #[case(-PI, LunarPhase::New)]
    #[case(-PI / 2.0, LunarPhase::FirstQuarter)]
    #[case(PI / 2.0, LunarPhase::ThirdQuarter)]
    #[case(-2.5, LunarPhase::WaxingCrescent)]
    #[case(-1.0, LunarPhase::WaxingGibbous)]
    #[case(1.0, LunarPhase::WaningGibbous)]
    #[case(2.5, LunarPhase::WaningCrescent)]
    fn test_classify(#[case] angle: f64, #[case] expected: LunarPhase) {
        assert_eq!(LunarPhase::classify(angle), expected);
    }

    #[rstest]
    #[case("Full Moon", LunarPhase::Full)]
    #[case("full", LunarPhase::Full)]
    #[case("new-moon", LunarPhase::New)]
    #[case("waxing_gibbous", LunarPhase::WaxingGibbous)]
    #[case("Last Quarter", LunarPhase::ThirdQuarter)]
    fn test_phase_parsing(#[case] input: &str, #[case] expected: LunarPhase) {
        assert_eq!(input.parse::<LunarPhase>().unwrap(), expected);
    }

    #[test]
    fn test_phase_parsing_rejects_unknown() {
        assert!("blue moon".parse::<LunarPhase>().is_err());
    }

    #[test]
    fn test_next_full_moon() {
        // full moon of 2024-03-25 07:00 UTC
        let from = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let date = next_phase_date(LunarPhase::Full, from, chrono_tz::UTC).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
        assert!((date - expected).num_days().abs() <= 1, "{date}");
        for phase in LunarPhase::ALL {
            assert!(next_phase_date(phase, from, chrono_tz::UTC).is_some(), "{phase}");
        }
    }

    #[test]
    fn test_sun_events_order() {
        let location = Location::new(39.236, -120.026, chrono_tz::US::Pacific, 1980.0).unwrap();
        let events = sun_events(&location, NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()).unwrap();
        let (dawn, rise, set, dusk) = (
            events.astronomical_dawn.unwrap(),
            events.sunrise.unwrap(),
            events.sunset.unwrap(),
            events.astronomical_dusk.unwrap(),
        );
        assert!(dawn < rise && rise < set && set < dusk);
    }
}
