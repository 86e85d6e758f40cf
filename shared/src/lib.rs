// lib.rs - shared core for the cultural events app

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod authoring;
pub mod capabilities;
pub mod catalog;
pub mod config;
pub mod drawing;
pub mod error;
pub mod event;
pub mod favorites;
pub mod filter;
pub mod geometry;
pub mod model;
pub mod participation;
pub mod search;
pub mod view;

pub use app::{App, Model, ToastKind, ToastMessage};
pub use capabilities::{Capabilities, Effect};
pub use config::CoreConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use error::{AppError, AppResult, ErrorKind, ErrorSeverity};
pub use event::Event;
pub use view::ViewModel;

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 15.0;
pub const MIN_NEARBY_RADIUS_KM: f64 = 0.5;
pub const MAX_NEARBY_RADIUS_KM: f64 = 500.0;
pub const MULTI_TOUCH_TOLERANCE_MS: u64 = 200;
pub const MAX_MULTI_TOUCH_TOLERANCE_MS: u64 = 2_000;
pub const MIN_POLYGON_POINTS: usize = 3;
pub const MAX_POLYGON_POINTS: usize = 2_000;
pub const GEOCODE_CACHE_CAPACITY: usize = 32;
pub const MIN_GEOCODE_QUERY_LEN: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 5_000;
pub const DATE_TBA_LABEL: &str = "Date TBA";

#[must_use]
pub fn get_current_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
