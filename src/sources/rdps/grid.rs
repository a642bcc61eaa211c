//! GRIB2 decoding and nearest grid point lookup

use crate::ForecastError;
use crate::models::Location;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Grid point closest to the forecast location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMatch {
    /// Position of the point in the grid's value order
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
}

/// Wrap a longitude from [0, 360) into [-180, 180)
#[must_use]
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    haversine::distance(
        haversine::Location {
            latitude: a.0,
            longitude: a.1,
        },
        haversine::Location {
            latitude: b.0,
            longitude: b.1,
        },
        haversine::Units::Kilometers,
    )
}

/// Closest of `points` (latitude, longitude) to `location`
#[must_use]
pub fn nearest_point(points: &[(f64, f64)], location: &Location) -> Option<GridMatch> {
    let target = (location.latitude, location.longitude);
    // cheap prefilter on squared degrees, then measure the winner properly
    let (index, &(lat, lon)) = points.iter().enumerate().min_by(|(_, a), (_, b)| {
        let da = squared_degrees(**a, target);
        let db = squared_degrees(**b, target);
        da.total_cmp(&db)
    })?;
    Some(GridMatch {
        index,
        latitude: lat,
        longitude: lon,
        distance_km: distance_km((lat, lon), target),
    })
}

fn squared_degrees(point: (f64, f64), target: (f64, f64)) -> f64 {
    let dlat = point.0 - target.0;
    let dlon = normalize_longitude(point.1 - target.1) * target.0.to_radians().cos();
    dlat * dlat + dlon * dlon
}

/// Fail with an unsupported-location error when the nearest point is too far away
pub fn ensure_within(matched: &GridMatch, max_distance_km: f64, product: &str) -> Result<(), ForecastError> {
    if matched.distance_km > max_distance_km {
        return Err(ForecastError::unsupported_location(format!(
            "nearest {product} grid point ({:.3}, {:.3}) is {:.0} km away",
            matched.latitude, matched.longitude, matched.distance_km
        )));
    }
    Ok(())
}

fn grib_error(path: &Path, e: impl std::fmt::Display) -> ForecastError {
    ForecastError::parse(format!("{}: {e}", path.display()))
}

/// Coordinates of a north polar stereographic grid, treating the earth as a sphere
pub fn polar_stereographic_points(def: &grib::PolarStereographicGridDefinition) -> Result<Vec<(f64, f64)>, String> {
    if !def.projection_centre.contains_north_pole_on_projection_plane() {
        return Err("south polar stereographic grids are not supported".to_string());
    }
    let (radius, _) = def
        .earth_shape
        .radii()
        .ok_or_else(|| format!("unknown earth shape {}", def.earth_shape.shape_of_the_earth))?;
    let lad = f64::from(def.lad) * 1e-6;
    let lov = (f64::from(def.lov) * 1e-6).to_radians();
    let k = radius * (1.0 + lad.to_radians().sin());

    // projection plane coordinates in metres
    let lat0 = (f64::from(def.first_point_lat) * 1e-6).to_radians();
    let lon0 = (f64::from(def.first_point_lon) * 1e-6).to_radians();
    let rho0 = k * lat0.cos() / (1.0 + lat0.sin());
    let (x0, y0) = (rho0 * (lon0 - lov).sin(), -rho0 * (lon0 - lov).cos());

    let dx = f64::from(def.dx) * 1e-3;
    let dy = f64::from(def.dy) * 1e-3;
    let dx = if def.scanning_mode.scans_positively_for_i() { dx } else { -dx };
    let dy = if def.scanning_mode.scans_positively_for_j() { dy } else { -dy };

    let ij = def.ij().map_err(|e| e.to_string())?;
    Ok(ij
        .map(|(i, j)| {
            let x = x0 + i as f64 * dx;
            let y = y0 + j as f64 * dy;
            let rho = x.hypot(y);
            let lat = 90.0 - 2.0 * (rho / k).atan().to_degrees();
            let lon = (lov + x.atan2(-y)).to_degrees();
            (lat, normalize_longitude(lon))
        })
        .collect())
}

/// Decoded first field of a GRIB2 file
#[derive(Debug, Clone, Default)]
pub struct DecodedGrid {
    pub points: Vec<(f64, f64)>,
    pub values: Vec<f64>,
}

/// Decode the first submessage of a GRIB2 file; coordinates only when `with_points`
pub fn decode_file(path: &Path, with_points: bool) -> Result<DecodedGrid, ForecastError> {
    let reader = BufReader::new(File::open(path)?);
    let grib2 = grib::from_reader(reader).map_err(|e| grib_error(path, e))?;
    let (_, submessage) = grib2
        .iter()
        .next()
        .ok_or_else(|| grib_error(path, "no GRIB2 fields"))?;

    let points = if with_points {
        let template = grib::GridDefinitionTemplateValues::try_from(submessage.grid_def())
            .map_err(|e| grib_error(path, e))?;
        match template {
            grib::GridDefinitionTemplateValues::Template20(def) => {
                polar_stereographic_points(&def).map_err(|e| grib_error(path, e))?
            }
            _ => submessage
                .latlons()
                .map_err(|e| grib_error(path, e))?
                .map(|(lat, lon)| (f64::from(lat), normalize_longitude(f64::from(lon))))
                .collect(),
        }
    } else {
        Vec::new()
    };

    let decoder = grib::Grib2SubmessageDecoder::from(submessage).map_err(|e| grib_error(path, e))?;
    let values = decoder
        .dispatch()
        .map_err(|e| grib_error(path, e))?
        .map(f64::from)
        .collect();

    Ok(DecodedGrid { points, values })
}
