use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::filter::{FilterState, FilterStore};
use crate::geometry::LatLon;
use crate::MIN_POLYGON_POINTS;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DrawingError {
    #[error("a drawn area needs at least {need} points, got {have}")]
    NotEnoughPoints { have: usize, need: usize },
    #[error("not in drawing mode")]
    NotDrawing,
}

/// Raw touch input from the map view. Timestamps come from the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TouchInput {
    Start {
        pointer_count: u8,
        timestamp_ms: u64,
    },
    Move {
        pointer_count: u8,
        coordinate: LatLon,
        timestamp_ms: u64,
    },
    End {
        remaining_pointers: u8,
        timestamp_ms: u64,
    },
    Cancel,
}

#[derive(Debug, Clone, Default, PartialEq)]
enum GesturePhase {
    #[default]
    Idle,
    /// One finger down, still inside the tolerance window. Moves are held
    /// back until the gesture is confirmed single-finger.
    Provisional { started_at: u64, pending: Vec<LatLon> },
    SingleFinger,
    /// Pan/zoom; nothing is captured until every finger lifts.
    MultiFinger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    None,
    Provisional,
    SingleFinger,
    MultiFinger,
}

/// Classifies a touch sequence as a single-finger draw or a multi-finger
/// camera gesture.
///
/// Platforms can report the first finger of a two-finger touch as a lone
/// pointer for a frame or two. Points from a fresh touch are therefore
/// buffered until one of: a single-finger move arrives after the window,
/// [`GestureTracker::tick`] passes the window, or the finger lifts. A second
/// pointer before that throws the buffer away.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureTracker {
    tolerance_ms: u64,
    phase: GesturePhase,
}

impl GestureTracker {
    #[must_use]
    pub fn new(tolerance_ms: u64) -> Self {
        Self {
            tolerance_ms,
            phase: GesturePhase::Idle,
        }
    }

    #[must_use]
    pub const fn tolerance_ms(&self) -> u64 {
        self.tolerance_ms
    }

    pub fn set_tolerance_ms(&mut self, tolerance_ms: u64) {
        self.tolerance_ms = tolerance_ms;
    }

    #[must_use]
    pub fn kind(&self) -> GestureKind {
        match self.phase {
            GesturePhase::Idle => GestureKind::None,
            GesturePhase::Provisional { .. } => GestureKind::Provisional,
            GesturePhase::SingleFinger => GestureKind::SingleFinger,
            GesturePhase::MultiFinger => GestureKind::MultiFinger,
        }
    }

    pub fn reset(&mut self) {
        self.phase = GesturePhase::Idle;
    }

    /// Feeds one input and returns the points confirmed by it, in order.
    pub fn handle(&mut self, input: &TouchInput) -> Vec<LatLon> {
        match *input {
            TouchInput::Start {
                pointer_count,
                timestamp_ms,
            } => {
                if pointer_count >= 2 {
                    self.enter_multi_finger();
                } else if self.phase == GesturePhase::Idle {
                    self.phase = GesturePhase::Provisional {
                        started_at: timestamp_ms,
                        pending: Vec::new(),
                    };
                }
                Vec::new()
            }
            TouchInput::Move {
                pointer_count,
                coordinate,
                timestamp_ms,
            } => {
                if pointer_count >= 2 {
                    self.enter_multi_finger();
                    return Vec::new();
                }
                self.single_finger_move(coordinate, timestamp_ms)
            }
            TouchInput::End {
                remaining_pointers,
                ..
            } => {
                if remaining_pointers > 0 {
                    return Vec::new();
                }
                match std::mem::take(&mut self.phase) {
                    GesturePhase::Provisional { pending, .. } => pending,
                    _ => Vec::new(),
                }
            }
            TouchInput::Cancel => {
                if let GesturePhase::Provisional { pending, .. } = &self.phase {
                    debug!(discarded = pending.len(), "touch cancelled");
                }
                self.phase = GesturePhase::Idle;
                Vec::new()
            }
        }
    }

    /// Confirms a provisional touch once the window has passed without a
    /// second finger.
    pub fn tick(&mut self, now_ms: u64) -> Vec<LatLon> {
        let window_passed = matches!(
            &self.phase,
            GesturePhase::Provisional { started_at, .. }
                if now_ms.saturating_sub(*started_at) >= self.tolerance_ms
        );
        if window_passed {
            self.confirm_single_finger()
        } else {
            Vec::new()
        }
    }

    fn single_finger_move(&mut self, coordinate: LatLon, timestamp_ms: u64) -> Vec<LatLon> {
        match &mut self.phase {
            GesturePhase::Idle => {
                self.phase = GesturePhase::Provisional {
                    started_at: timestamp_ms,
                    pending: vec![coordinate],
                };
                self.tick(timestamp_ms)
            }
            GesturePhase::Provisional { pending, .. } => {
                pending.push(coordinate);
                self.tick(timestamp_ms)
            }
            GesturePhase::SingleFinger => vec![coordinate],
            GesturePhase::MultiFinger => Vec::new(),
        }
    }

    fn confirm_single_finger(&mut self) -> Vec<LatLon> {
        match std::mem::replace(&mut self.phase, GesturePhase::SingleFinger) {
            GesturePhase::Provisional { pending, .. } => pending,
            _ => Vec::new(),
        }
    }

    fn enter_multi_finger(&mut self) {
        if let GesturePhase::Provisional { pending, .. } = &self.phase {
            if !pending.is_empty() {
                debug!(discarded = pending.len(), "second finger, dropping provisional points");
            }
        }
        self.phase = GesturePhase::MultiFinger;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawingState {
    Idle,
    Drawing,
    /// Drawing with enough points to apply or clear.
    PolygonReady,
    Applied,
}

/// Turns map gestures into the polygon held by a [`FilterStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonDrawing {
    tracker: GestureTracker,
    max_points: usize,
    restore: Vec<LatLon>,
}

impl Default for PolygonDrawing {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}

impl PolygonDrawing {
    #[must_use]
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            tracker: GestureTracker::new(config.multi_touch_tolerance_ms),
            max_points: config.max_polygon_points,
            restore: Vec::new(),
        }
    }

    pub fn reconfigure(&mut self, config: &CoreConfig) {
        self.tracker.set_tolerance_ms(config.multi_touch_tolerance_ms);
        self.max_points = config.max_polygon_points;
    }

    #[must_use]
    pub fn state(&self, filters: &FilterState) -> DrawingState {
        match (filters.drawing_mode(), filters.has_polygon()) {
            (true, true) => DrawingState::PolygonReady,
            (true, false) => DrawingState::Drawing,
            (false, _) if filters.polygon_restriction_active() => DrawingState::Applied,
            (false, _) => DrawingState::Idle,
        }
    }

    #[must_use]
    pub fn gesture(&self) -> GestureKind {
        self.tracker.kind()
    }

    /// Camera gestures stay off while drawing unless a multi-finger gesture
    /// is in progress.
    #[must_use]
    pub fn camera_gestures_enabled(&self, filters: &FilterState) -> bool {
        !filters.drawing_mode() || self.tracker.kind() == GestureKind::MultiFinger
    }

    /// Enters drawing mode with an empty polygon. The previous polygon is
    /// kept aside so a cancel can put it back.
    pub fn begin(&mut self, filters: &mut FilterStore) {
        if !filters.state().drawing_mode() {
            self.restore = filters.state().polygon().to_vec();
        }
        filters.set_polygon_coords(Vec::new());
        filters.set_drawing_mode(true);
        self.tracker.reset();
        info!("polygon drawing started");
    }

    /// Leaves drawing mode and discards the sketch. The map filter flag is
    /// not touched.
    pub fn cancel(&mut self, filters: &mut FilterStore) {
        filters.set_polygon_coords(std::mem::take(&mut self.restore));
        filters.set_drawing_mode(false);
        self.tracker.reset();
        info!("polygon drawing cancelled");
    }

    /// Empties the sketch but stays in drawing mode.
    pub fn clear(&mut self, filters: &mut FilterStore) -> Result<(), DrawingError> {
        if !filters.state().drawing_mode() {
            return Err(DrawingError::NotDrawing);
        }
        filters.set_polygon_coords(Vec::new());
        self.tracker.reset();
        Ok(())
    }

    /// Commits the sketch as the active spatial filter.
    pub fn apply(&mut self, filters: &mut FilterStore) -> Result<usize, DrawingError> {
        if !filters.state().drawing_mode() {
            return Err(DrawingError::NotDrawing);
        }
        let have = filters.state().polygon().len();
        if have < MIN_POLYGON_POINTS {
            return Err(DrawingError::NotEnoughPoints {
                have,
                need: MIN_POLYGON_POINTS,
            });
        }
        filters.set_drawing_mode(false);
        filters.set_map_filter_enabled(true);
        self.restore.clear();
        self.tracker.reset();
        info!(points = have, "drawn area applied");
        Ok(have)
    }

    /// Returns how many points were appended.
    pub fn handle_touch(&mut self, filters: &mut FilterStore, input: &TouchInput) -> usize {
        if !filters.state().drawing_mode() {
            self.tracker.reset();
            return 0;
        }
        let confirmed = self.tracker.handle(input);
        self.append(filters, confirmed)
    }

    pub fn tick(&mut self, filters: &mut FilterStore, now_ms: u64) -> usize {
        if !filters.state().drawing_mode() {
            return 0;
        }
        let confirmed = self.tracker.tick(now_ms);
        self.append(filters, confirmed)
    }

    /// Forgets in-flight gesture state and any saved polygon.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.restore.clear();
    }

    fn append(&self, filters: &mut FilterStore, points: Vec<LatLon>) -> usize {
        let mut added = 0;
        for point in points {
            if !point.is_finite() {
                continue;
            }
            if !filters.push_polygon_point(point, self.max_points) {
                break;
            }
            added += 1;
        }
        added
    }
}
