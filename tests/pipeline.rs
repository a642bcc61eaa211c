use astroatmos::models::{DataSource, Location, Parameter, TimeSeries, TimeWindow};
use astroatmos::sources::kp::{StormSummary, g_level, merge_observed_and_predicted, parse_forecast, parse_observed};
use astroatmos::sources::nws::{parse_gridpoint, parse_points};
use astroatmos::units::Unit;
use astroatmos::{ForecastError, ForecastService, ForecastSource, SourceData, TemperatureUnit, WindUnit};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

const NWS_POINTS: &str = include_str!("fixtures/nws_points.json");
const NWS_GRIDPOINT: &str = include_str!("fixtures/nws_gridpoint.json");
const KP_OBSERVED: &str = include_str!("fixtures/kp_observed.json");
const KP_3DAY: &str = include_str!("fixtures/kp_3day.txt");

/// Serves series parsed from the recorded responses
struct RecordedSource {
    source: DataSource,
    location_dependent: bool,
    series: Result<Vec<TimeSeries>, fn() -> ForecastError>,
}

#[async_trait]
impl ForecastSource for RecordedSource {
    fn source(&self) -> DataSource {
        self.source
    }

    fn location_dependent(&self) -> bool {
        self.location_dependent
    }

    async fn fetch(&self, _location: &Location, _window: &TimeWindow) -> Result<SourceData, ForecastError> {
        match &self.series {
            Ok(series) => Ok(SourceData::new(self.source, series.clone())),
            Err(make_error) => Err(make_error()),
        }
    }
}

fn issued() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

fn site() -> Location {
    Location::new(39.236, -120.026, chrono_tz::US::Pacific, 1980.0).unwrap()
}

fn nws() -> Arc<dyn ForecastSource> {
    Arc::new(RecordedSource {
        source: DataSource::Nws,
        location_dependent: true,
        series: Ok(parse_gridpoint(NWS_GRIDPOINT).unwrap()),
    })
}

fn swpc() -> Arc<dyn ForecastSource> {
    let observed = parse_observed(KP_OBSERVED).unwrap();
    let predicted = parse_forecast(KP_3DAY, issued()).unwrap();
    Arc::new(RecordedSource {
        source: DataSource::Swpc,
        location_dependent: false,
        series: Ok(vec![merge_observed_and_predicted(&observed, &predicted)]),
    })
}

fn too_far() -> ForecastError {
    ForecastError::unsupported_location("nearest RDPS grid point is 812 km away")
}

fn outside_domain() -> Arc<dyn ForecastSource> {
    Arc::new(RecordedSource {
        source: DataSource::RdpsAstro,
        location_dependent: true,
        series: Err(too_far as fn() -> ForecastError),
    })
}

fn values(series: &TimeSeries) -> Vec<f64> {
    series.values().map(|v| (v * 100.0).round() / 100.0).collect()
}

#[test]
fn test_points_fixture() {
    let point = parse_points(NWS_POINTS).unwrap();
    assert_eq!(point.forecast_grid_data, "https://api.weather.gov/gridpoints/REV/32,88");
    assert_eq!(point.time_zone.as_deref(), Some("America/Los_Angeles"));
}

#[test]
fn test_gridpoint_fixture_keeps_source_units() {
    let series = parse_gridpoint(NWS_GRIDPOINT).unwrap();
    assert_eq!(series.len(), 7);
    let temperature = series.iter().find(|s| s.parameter == Parameter::Temperature).unwrap();
    assert_eq!(temperature.unit, Unit::Celsius);
    assert_eq!(values(temperature), vec![-5.0, 0.0, 10.0]);
}

#[test]
fn test_kp_fixtures() {
    let observed = parse_observed(KP_OBSERVED).unwrap();
    // the 28 Feb bin is older than two days before the latest observation
    assert_eq!(observed.len(), 4);

    let summary = StormSummary::from_observed(&observed).unwrap();
    assert!(!summary.storm);
    assert!(summary.message().contains("Current Kp: 4.67 (G1: Minor)"));
    assert!(summary.message().contains("Recent Maximum Kp: 5.33 (G1: Minor)"));

    let predicted = parse_forecast(KP_3DAY, issued()).unwrap();
    assert_eq!(predicted.len(), 24);
    assert_eq!(g_level(predicted.max_value().unwrap()).scale, "G2");

    let merged = merge_observed_and_predicted(&observed, &predicted);
    assert_eq!(merged.len(), 4 + 21);
    assert_eq!(merged.samples()[4].time, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
}

#[tokio::test]
async fn test_recorded_forecast_on_common_grid() {
    let window = TimeWindow::starting_at(issued(), 14);
    let service = ForecastService::new(
        vec![nws(), swpc(), outside_domain()],
        TemperatureUnit::Fahrenheit,
        WindUnit::MilesPerHour,
    );
    let forecast = service.build(&site(), window, issued()).await.unwrap();

    let grid_times: Vec<_> = window.grid(chrono::Duration::hours(1)).points().collect();
    assert_eq!(grid_times.len(), 14);
    for series in forecast.series.values() {
        assert!(series.samples().iter().all(|s| window.contains(s.time)), "{}", series.parameter);
    }

    let temperature = forecast.get(Parameter::Temperature).unwrap();
    assert_eq!(temperature.unit, Unit::Fahrenheit);
    assert_eq!(values(temperature)[..3], [23.0, 27.5, 32.0]);

    let wind = forecast.get(Parameter::WindSpeed).unwrap();
    assert_eq!(wind.unit, Unit::MilesPerHour);
    assert!(values(wind).iter().all(|v| *v == 10.0));
    assert!(values(forecast.get(Parameter::WindGust).unwrap()).iter().all(|v| *v == 20.0));

    let clouds = values(forecast.get(Parameter::CloudCover).unwrap());
    assert_eq!(clouds[..6], [20.0, 20.0, 20.0, 45.0, 45.0, 80.0]);

    let kp = forecast.get(Parameter::KpIndex).unwrap();
    assert_eq!(kp.len(), 14);
    assert_eq!(values(kp).first(), Some(&2.0));
    assert_eq!(values(kp).last(), Some(&3.67));

    for parameter in [Parameter::SunAltitude, Parameter::MoonAltitude, Parameter::LunarIllumination] {
        assert_eq!(forecast.get(parameter).unwrap().len(), 14);
    }

    assert_eq!(forecast.failures.len(), 1);
    assert_eq!(forecast.failures[0].source, DataSource::RdpsAstro);
    assert!(forecast.failures[0].unsupported);
    assert!(!forecast.has(Parameter::Seeing));
}

#[tokio::test]
async fn test_site_outside_every_domain() {
    let window = TimeWindow::starting_at(issued(), 14);
    let service = ForecastService::new(
        vec![swpc(), outside_domain()],
        TemperatureUnit::Celsius,
        WindUnit::KilometersPerHour,
    );
    let err = service.build(&site(), window, issued()).await.unwrap_err();
    assert!(err.is_unsupported_location());
}
