use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    GEOCODE_CACHE_CAPACITY, MAX_MULTI_TOUCH_TOLERANCE_MS, MAX_NEARBY_RADIUS_KM,
    MAX_POLYGON_POINTS, MIN_GEOCODE_QUERY_LEN, MIN_NEARBY_RADIUS_KM, MIN_POLYGON_POINTS,
    MULTI_TOUCH_TOLERANCE_MS, DEFAULT_NEARBY_RADIUS_KM,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("nearby radius must be between {min} and {max} km, got {value}")]
    NearbyRadius { value: f64, min: f64, max: f64 },

    #[error("multi-touch tolerance must be at most {max} ms, got {value}")]
    MultiTouchTolerance { value: u64, max: u64 },

    #[error("max polygon points must be at least {min}, got {value}")]
    MaxPolygonPoints { value: usize, min: usize },

    #[error("{0} must be > 0")]
    Zero(&'static str),
}

/// Tunables for the shared core. The shell may replace them at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub nearby_radius_km: f64,
    pub multi_touch_tolerance_ms: u64,
    pub max_polygon_points: usize,
    pub geocode_cache_capacity: usize,
    pub min_geocode_query_len: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            nearby_radius_km: DEFAULT_NEARBY_RADIUS_KM,
            multi_touch_tolerance_ms: MULTI_TOUCH_TOLERANCE_MS,
            max_polygon_points: MAX_POLYGON_POINTS,
            geocode_cache_capacity: GEOCODE_CACHE_CAPACITY,
            min_geocode_query_len: MIN_GEOCODE_QUERY_LEN,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.nearby_radius_km.is_finite()
            || !(MIN_NEARBY_RADIUS_KM..=MAX_NEARBY_RADIUS_KM).contains(&self.nearby_radius_km)
        {
            return Err(ConfigError::NearbyRadius {
                value: self.nearby_radius_km,
                min: MIN_NEARBY_RADIUS_KM,
                max: MAX_NEARBY_RADIUS_KM,
            });
        }
        if self.multi_touch_tolerance_ms > MAX_MULTI_TOUCH_TOLERANCE_MS {
            return Err(ConfigError::MultiTouchTolerance {
                value: self.multi_touch_tolerance_ms,
                max: MAX_MULTI_TOUCH_TOLERANCE_MS,
            });
        }
        if self.max_polygon_points < MIN_POLYGON_POINTS {
            return Err(ConfigError::MaxPolygonPoints {
                value: self.max_polygon_points,
                min: MIN_POLYGON_POINTS,
            });
        }
        if self.geocode_cache_capacity == 0 {
            return Err(ConfigError::Zero("geocode_cache_capacity"));
        }
        if self.min_geocode_query_len == 0 {
            return Err(ConfigError::Zero("min_geocode_query_len"));
        }
        Ok(())
    }
}
