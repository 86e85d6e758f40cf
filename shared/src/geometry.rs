use geojson::{feature::Id, Feature, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EARTH_RADIUS_KM, MIN_POLYGON_POINTS};

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum CoordinateError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate is not a finite number")]
    NonFinite,
}

/// A latitude/longitude pair as it arrives from the backend or the shell.
///
/// Not validated on construction; backend records may carry garbage, and the
/// geometry functions below treat non-finite values as "no match".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lng")]
    pub lon: f64,
}

impl LatLon {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn validate(self) -> Result<Self, CoordinateError> {
        if !self.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(CoordinateError::LongitudeOutOfRange(self.lon));
        }
        Ok(self)
    }

    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        haversine_distance_km(self, other)
    }

    /// GeoJSON position order.
    #[must_use]
    pub fn to_position(self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }
}

impl TryFrom<(f64, f64)> for LatLon {
    type Error = CoordinateError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lat, lon).validate()
    }
}

/// Crossing-number test with longitude as x and latitude as y.
///
/// The closing edge from the last vertex back to the first is implied.
/// Fewer than three vertices, or any non-finite value, yields `false`.
#[must_use]
pub fn point_in_polygon(point: LatLon, polygon: &[LatLon]) -> bool {
    if polygon.len() < MIN_POLYGON_POINTS || !point.is_finite() {
        return false;
    }
    if polygon.iter().any(|p| !p.is_finite()) {
        return false;
    }

    let (x, y) = (point.lon, point.lat);
    let mut inside = false;
    let mut j = polygon.len() - 1;

    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].lon, polygon[i].lat);
        let (xj, yj) = (polygon[j].lon, polygon[j].lat);

        if (yi > y) != (yj > y) {
            let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

#[must_use]
pub fn haversine_distance_km(a: LatLon, b: LatLon) -> f64 {
    const EPSILON: f64 = 1e-10;

    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    if (a.lat - b.lat).abs() < EPSILON && (a.lon - b.lon).abs() < EPSILON {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    let distance = EARTH_RADIUS_KM * 2.0 * h.sqrt().asin();

    if distance.is_finite() {
        distance
    } else {
        0.0
    }
}

#[must_use]
pub fn is_within_radius(point: LatLon, center: LatLon, radius_km: f64) -> bool {
    point.is_finite() && center.is_finite() && haversine_distance_km(point, center) <= radius_km
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    #[must_use]
    pub fn contains(&self, point: LatLon) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

#[must_use]
pub fn polygon_bounds(polygon: &[LatLon]) -> Option<Bounds> {
    let mut points = polygon.iter().filter(|p| p.is_finite());
    let first = points.next()?;
    let init = Bounds {
        min_lat: first.lat,
        min_lon: first.lon,
        max_lat: first.lat,
        max_lon: first.lon,
    };
    Some(points.fold(init, |b, p| Bounds {
        min_lat: b.min_lat.min(p.lat),
        min_lon: b.min_lon.min(p.lon),
        max_lat: b.max_lat.max(p.lat),
        max_lon: b.max_lon.max(p.lon),
    }))
}

/// Area-weighted centroid in the lon/lat plane; falls back to the vertex mean
/// for degenerate (zero-area) rings.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn polygon_centroid(polygon: &[LatLon]) -> Option<LatLon> {
    if polygon.len() < MIN_POLYGON_POINTS || polygon.iter().any(|p| !p.is_finite()) {
        return None;
    }

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in polygon.iter().enumerate() {
        let q = polygon[(i + 1) % polygon.len()];
        let cross = p.lon * q.lat - q.lon * p.lat;
        twice_area += cross;
        cx += (p.lon + q.lon) * cross;
        cy += (p.lat + q.lat) * cross;
    }

    if twice_area.abs() < 1e-12 {
        let n = polygon.len() as f64;
        let lat = polygon.iter().map(|p| p.lat).sum::<f64>() / n;
        let lon = polygon.iter().map(|p| p.lon).sum::<f64>() / n;
        return Some(LatLon::new(lat, lon));
    }

    let factor = 1.0 / (3.0 * twice_area);
    Some(LatLon::new(cy * factor, cx * factor))
}

/// Closed-ring GeoJSON polygon, or `None` below three vertices.
#[must_use]
pub fn polygon_to_geojson(polygon: &[LatLon]) -> Option<Geometry> {
    if polygon.len() < MIN_POLYGON_POINTS {
        return None;
    }
    let mut ring: Vec<Vec<f64>> = polygon.iter().map(|p| p.to_position()).collect();
    if polygon.first() != polygon.last() {
        ring.push(polygon[0].to_position());
    }
    Some(Geometry::new(Value::Polygon(vec![ring])))
}

#[must_use]
pub fn point_feature(id: &str, point: LatLon, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(point.to_position()))),
        id: Some(Id::String(id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}
