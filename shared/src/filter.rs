use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument, warn};

use crate::catalog::DerivedCatalog;
use crate::geometry::{is_within_radius, point_in_polygon, polygon_bounds, Bounds, LatLon};
use crate::model::{CulturalEvent, EventType};
use crate::MIN_POLYGON_POINTS;

/// Category filter. `Only` is never empty; deselecting the last category
/// collapses back to `All`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "types", rename_all = "snake_case")]
pub enum CategorySelection {
    #[default]
    All,
    Only(BTreeSet<EventType>),
}

impl CategorySelection {
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn allows(&self, event_type: EventType) -> bool {
        match self {
            Self::All => true,
            Self::Only(types) => types.contains(&event_type),
        }
    }

    #[must_use]
    pub fn is_selected(&self, choice: CategoryChoice) -> bool {
        match (self, choice) {
            (Self::All, CategoryChoice::All) => true,
            (Self::Only(types), CategoryChoice::Type(t)) => types.contains(&t),
            _ => false,
        }
    }

    fn from_types(types: BTreeSet<EventType>) -> Self {
        if types.is_empty() {
            Self::All
        } else {
            Self::Only(types)
        }
    }
}

/// One entry of the category chip row. `All` is the sentinel chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CategoryChoice {
    All,
    Type(EventType),
}

/// Country or city filter value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "name", rename_all = "snake_case")]
pub enum PlaceSelection {
    #[default]
    All,
    Only(String),
}

impl PlaceSelection {
    /// Blank input and the literal "all" both mean no restriction.
    #[must_use]
    pub fn from_input(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn allows(&self, value: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(name) => name == value.trim(),
        }
    }

    #[must_use]
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    categories: CategorySelection,
    country: PlaceSelection,
    city: PlaceSelection,
    map_filter_enabled: bool,
    polygon: Vec<LatLon>,
    drawing_mode: bool,
    should_navigate_to_map: bool,
    upcoming_only: bool,
}

impl FilterState {
    #[must_use]
    pub fn categories(&self) -> &CategorySelection {
        &self.categories
    }

    #[must_use]
    pub fn country(&self) -> &PlaceSelection {
        &self.country
    }

    #[must_use]
    pub fn city(&self) -> &PlaceSelection {
        &self.city
    }

    #[must_use]
    pub const fn map_filter_enabled(&self) -> bool {
        self.map_filter_enabled
    }

    #[must_use]
    pub fn polygon(&self) -> &[LatLon] {
        &self.polygon
    }

    #[must_use]
    pub const fn drawing_mode(&self) -> bool {
        self.drawing_mode
    }

    #[must_use]
    pub const fn should_navigate_to_map(&self) -> bool {
        self.should_navigate_to_map
    }

    #[must_use]
    pub const fn upcoming_only(&self) -> bool {
        self.upcoming_only
    }

    #[must_use]
    pub fn has_polygon(&self) -> bool {
        self.polygon.len() >= MIN_POLYGON_POINTS
    }

    /// True when the drawn polygon is the active spatial constraint.
    #[must_use]
    pub fn polygon_restriction_active(&self) -> bool {
        self.map_filter_enabled && self.has_polygon()
    }

    #[must_use]
    pub fn active_filter_count(&self) -> usize {
        usize::from(!self.categories.is_all())
            + usize::from(self.country != PlaceSelection::All)
            + usize::from(self.city != PlaceSelection::All)
            + usize::from(self.map_filter_enabled)
            + usize::from(self.upcoming_only)
    }
}

/// Inputs to filtering that live outside [`FilterState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterContext {
    pub reference: Option<LatLon>,
    pub radius_km: f64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpatialConstraint<'a> {
    None,
    Polygon { points: &'a [LatLon], bounds: Bounds },
    Radius { center: Option<LatLon>, radius_km: f64 },
}

impl SpatialConstraint<'_> {
    /// Events without coordinates never pass an active constraint.
    #[must_use]
    pub fn allows(&self, coordinates: Option<LatLon>) -> bool {
        match self {
            Self::None => true,
            Self::Polygon { points, bounds } => coordinates
                .is_some_and(|c| bounds.contains(c) && point_in_polygon(c, points)),
            Self::Radius { center, radius_km } => match (coordinates, center) {
                (Some(c), Some(center)) => is_within_radius(c, *center, *radius_km),
                _ => false,
            },
        }
    }
}

/// Sole owner of [`FilterState`]; every mutation goes through here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterStore {
    state: FilterState,
}

impl FilterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Replaces the whole category selection. An empty list or one that
    /// contains `All` selects everything.
    pub fn set_selected_types(&mut self, types: &[CategoryChoice]) {
        if types.contains(&CategoryChoice::All) {
            self.state.categories = CategorySelection::All;
            return;
        }
        let selected = types
            .iter()
            .filter_map(|choice| match choice {
                CategoryChoice::Type(t) => Some(*t),
                CategoryChoice::All => None,
            })
            .collect();
        self.state.categories = CategorySelection::from_types(selected);
    }

    pub fn toggle_type(&mut self, choice: CategoryChoice) {
        let next = match (choice, &self.state.categories) {
            (CategoryChoice::All, _) => CategorySelection::All,
            (CategoryChoice::Type(t), CategorySelection::All) => {
                CategorySelection::Only(BTreeSet::from([t]))
            }
            (CategoryChoice::Type(t), CategorySelection::Only(types)) => {
                let mut types = types.clone();
                if !types.remove(&t) {
                    types.insert(t);
                }
                CategorySelection::from_types(types)
            }
        };
        debug!(?choice, selection = ?next, "category toggled");
        self.state.categories = next;
    }

    /// Returns whether the country changed. Callers rebuild the catalog and
    /// call [`Self::reconcile_city`] afterwards.
    pub fn set_selected_country(&mut self, country: PlaceSelection) -> bool {
        if self.state.country == country {
            return false;
        }
        self.state.country = country;
        true
    }

    pub fn set_selected_city(&mut self, city: PlaceSelection) {
        self.state.city = city;
    }

    /// Resets the city to `All` when the catalog no longer offers it.
    pub fn reconcile_city(&mut self, catalog: &DerivedCatalog) -> bool {
        let stale = match &self.state.city {
            PlaceSelection::All => false,
            PlaceSelection::Only(city) => !catalog.has_city(city),
        };
        if stale {
            debug!(city = ?self.state.city, "selected city not in catalog, resetting");
            self.state.city = PlaceSelection::All;
        }
        stale
    }

    pub fn set_map_filter_enabled(&mut self, enabled: bool) {
        self.state.map_filter_enabled = enabled;
    }

    pub fn set_drawing_mode(&mut self, drawing: bool) {
        self.state.drawing_mode = drawing;
    }

    pub fn set_polygon_coords(&mut self, coords: Vec<LatLon>) {
        self.state.polygon = coords;
    }

    /// Appends one vertex unless the polygon already holds `cap` points.
    pub fn push_polygon_point(&mut self, point: LatLon, cap: usize) -> bool {
        if self.state.polygon.len() >= cap {
            warn!(cap, "polygon point cap reached, dropping point");
            return false;
        }
        self.state.polygon.push(point);
        true
    }

    pub fn set_should_navigate_to_map(&mut self, navigate: bool) {
        self.state.should_navigate_to_map = navigate;
    }

    pub fn set_upcoming_only(&mut self, upcoming_only: bool) {
        self.state.upcoming_only = upcoming_only;
    }

    /// Drops every restriction. Drawing mode and the navigation signal are
    /// left alone.
    pub fn clear_all_filters(&mut self) {
        self.state.categories = CategorySelection::All;
        self.state.country = PlaceSelection::All;
        self.state.city = PlaceSelection::All;
        self.state.map_filter_enabled = false;
        self.state.polygon.clear();
        self.state.upcoming_only = false;
    }

    #[must_use]
    pub fn spatial_constraint(&self, ctx: &FilterContext) -> SpatialConstraint<'_> {
        if !self.state.map_filter_enabled {
            return SpatialConstraint::None;
        }
        if self.state.has_polygon() {
            if let Some(bounds) = polygon_bounds(&self.state.polygon) {
                return SpatialConstraint::Polygon {
                    points: &self.state.polygon,
                    bounds,
                };
            }
        }
        SpatialConstraint::Radius {
            center: ctx.reference,
            radius_km: ctx.radius_km,
        }
    }

    #[must_use]
    pub fn matches(&self, event: &CulturalEvent, ctx: &FilterContext) -> bool {
        self.matches_with(event, ctx, &self.spatial_constraint(ctx))
    }

    fn matches_with(
        &self,
        event: &CulturalEvent,
        ctx: &FilterContext,
        spatial: &SpatialConstraint<'_>,
    ) -> bool {
        self.state.categories.allows(event.event_type)
            && self.state.country.allows(&event.country)
            && self.state.city.allows(&event.city)
            && spatial.allows(event.coordinates)
            && (!self.state.upcoming_only || event.is_upcoming(ctx.now))
    }

    /// Events passing every active predicate, ordered by earliest start
    /// (undated events sort as `ctx.now`), ties broken by id.
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn filtered_events<'a>(
        &self,
        events: &'a [CulturalEvent],
        ctx: &FilterContext,
    ) -> Vec<&'a CulturalEvent> {
        let spatial = self.spatial_constraint(ctx);
        if matches!(spatial, SpatialConstraint::Radius { center: None, .. }) {
            debug!("nearby filter active without a device location");
        }

        let mut keyed: Vec<(DateTime<Utc>, &'a CulturalEvent)> = events
            .iter()
            .filter(|event| self.matches_with(event, ctx, &spatial))
            .map(|event| (event.sort_key(ctx.now), event))
            .collect();
        keyed.sort_by(|(a_key, a), (b_key, b)| a_key.cmp(b_key).then_with(|| a.id.cmp(&b.id)));

        debug!(matched = keyed.len(), "filter recomputed");
        keyed.into_iter().map(|(_, event)| event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_timestamp, EventId, ScheduleEntry};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2025-06-01T12:00:00Z").unwrap()
    }

    fn ctx() -> FilterContext {
        FilterContext {
            reference: None,
            radius_km: 15.0,
            now: now(),
        }
    }

    fn event(id: &str, country: &str, city: &str, t: EventType, date: &str) -> CulturalEvent {
        CulturalEvent {
            id: EventId::new(id),
            title: format!("event {id}"),
            event_type: t,
            schedule: vec![ScheduleEntry::new(date)],
            city: city.into(),
            country: country.into(),
            ..CulturalEvent::default()
        }
    }

    fn scenario_events() -> Vec<CulturalEvent> {
        vec![
            event("1", "Portugal", "Lisboa", EventType::Music, "2030-01-01T20:00:00Z"),
            event("2", "Spain", "Madrid", EventType::Art, "2030-02-01T20:00:00Z"),
        ]
    }

    fn ids(events: &[&CulturalEvent]) -> Vec<String> {
        events.iter().map(|e| e.id.to_string()).collect()
    }

    mod category_tests {
        use super::*;

        #[test]
        fn test_default_is_all() {
            let store = FilterStore::new();
            assert!(store.state().categories().is_all());
        }

        #[test]
        fn test_toggle_round_trip() {
            let mut store = FilterStore::new();
            store.toggle_type(CategoryChoice::Type(EventType::Music));
            assert_eq!(
                store.state().categories(),
                &CategorySelection::Only(BTreeSet::from([EventType::Music]))
            );
            store.toggle_type(CategoryChoice::Type(EventType::Music));
            assert_eq!(store.state().categories(), &CategorySelection::All);
        }

        #[test]
        fn test_selecting_all_clears_specific() {
            let mut store = FilterStore::new();
            store.toggle_type(CategoryChoice::Type(EventType::Music));
            store.toggle_type(CategoryChoice::Type(EventType::Art));
            store.toggle_type(CategoryChoice::All);
            assert!(store.state().categories().is_all());
            assert!(store.state().categories().is_selected(CategoryChoice::All));
            assert!(!store
                .state()
                .categories()
                .is_selected(CategoryChoice::Type(EventType::Music)));
        }

        #[test]
        fn test_set_selected_types() {
            let mut store = FilterStore::new();
            store.set_selected_types(&[
                CategoryChoice::Type(EventType::Dance),
                CategoryChoice::Type(EventType::Cinema),
            ]);
            assert!(store.state().categories().allows(EventType::Dance));
            assert!(!store.state().categories().allows(EventType::Music));

            store.set_selected_types(&[CategoryChoice::Type(EventType::Dance), CategoryChoice::All]);
            assert!(store.state().categories().is_all());

            store.set_selected_types(&[]);
            assert!(store.state().categories().is_all());
        }
    }

    mod place_tests {
        use super::*;

        #[test]
        fn test_from_input() {
            assert_eq!(PlaceSelection::from_input("all"), PlaceSelection::All);
            assert_eq!(PlaceSelection::from_input("  "), PlaceSelection::All);
            assert_eq!(
                PlaceSelection::from_input(" Porto "),
                PlaceSelection::Only("Porto".into())
            );
        }

        #[test]
        fn test_country_change_reports() {
            let mut store = FilterStore::new();
            assert!(store.set_selected_country(PlaceSelection::Only("Spain".into())));
            assert!(!store.set_selected_country(PlaceSelection::Only("Spain".into())));
        }

        #[test]
        fn test_reconcile_city() {
            let events = scenario_events();
            let mut store = FilterStore::new();
            store.set_selected_city(PlaceSelection::Only("Lisboa".into()));
            store.set_selected_country(PlaceSelection::Only("Spain".into()));
            let catalog = DerivedCatalog::build(&events, store.state().country());
            assert!(store.reconcile_city(&catalog));
            assert_eq!(store.state().city(), &PlaceSelection::All);
        }
    }

    mod filtering_tests {
        use super::*;

        #[test]
        fn test_music_only() {
            let events = scenario_events();
            let mut store = FilterStore::new();
            store.set_selected_types(&[CategoryChoice::Type(EventType::Music)]);
            assert_eq!(ids(&store.filtered_events(&events, &ctx())), vec!["1"]);
        }

        #[test]
        fn test_spain_only() {
            let events = scenario_events();
            let mut store = FilterStore::new();
            store.set_selected_country(PlaceSelection::Only("Spain".into()));
            assert_eq!(ids(&store.filtered_events(&events, &ctx())), vec!["2"]);
        }

        #[test]
        fn test_sorted_by_earliest_date_then_id() {
            let events = vec![
                event("b", "PT", "Porto", EventType::Art, "2030-05-01T10:00:00Z"),
                event("c", "PT", "Porto", EventType::Art, "2030-01-01T10:00:00Z"),
                event("a", "PT", "Porto", EventType::Art, "2030-05-01T10:00:00Z"),
            ];
            let store = FilterStore::new();
            assert_eq!(ids(&store.filtered_events(&events, &ctx())), vec!["c", "a", "b"]);
        }

        #[test]
        fn test_empty_schedule_sorts_as_now() {
            let mut tba = event("tba", "PT", "Porto", EventType::Art, "");
            tba.schedule.clear();
            let events = vec![
                event("future", "PT", "Porto", EventType::Art, "2030-01-01T10:00:00Z"),
                tba,
                event("past", "PT", "Porto", EventType::Art, "2020-01-01T10:00:00Z"),
            ];
            let store = FilterStore::new();
            assert_eq!(
                ids(&store.filtered_events(&events, &ctx())),
                vec!["past", "tba", "future"]
            );
        }

        #[test]
        fn test_upcoming_only_keeps_tba() {
            let mut tba = event("tba", "PT", "Porto", EventType::Art, "garbage");
            tba.schedule.push(ScheduleEntry::new("also garbage"));
            let events = vec![
                tba,
                event("past", "PT", "Porto", EventType::Art, "2020-01-01T10:00:00Z"),
            ];
            let mut store = FilterStore::new();
            store.set_upcoming_only(true);
            assert_eq!(ids(&store.filtered_events(&events, &ctx())), vec!["tba"]);
        }

        #[test]
        fn test_polygon_restriction() {
            let mut inside = event("in", "PT", "Lisboa", EventType::Music, "2030-01-01");
            inside.coordinates = Some(LatLon::new(0.5, 0.5));
            let mut outside = event("out", "PT", "Lisboa", EventType::Music, "2030-01-01");
            outside.coordinates = Some(LatLon::new(5.0, 5.0));
            let nowhere = event("none", "PT", "Lisboa", EventType::Music, "2030-01-01");
            let events = vec![inside, outside, nowhere];

            let mut store = FilterStore::new();
            store.set_polygon_coords(vec![
                LatLon::new(0.0, 0.0),
                LatLon::new(0.0, 1.0),
                LatLon::new(1.0, 1.0),
                LatLon::new(1.0, 0.0),
            ]);
            // polygon without the flag does nothing
            assert_eq!(store.filtered_events(&events, &ctx()).len(), 3);

            store.set_map_filter_enabled(true);
            assert_eq!(ids(&store.filtered_events(&events, &ctx())), vec!["in"]);
        }

        #[test]
        fn test_radius_fallback() {
            let mut near = event("near", "PT", "Lisboa", EventType::Music, "2030-01-01");
            near.coordinates = Some(LatLon::new(38.75, -9.15));
            let mut far = event("far", "PT", "Porto", EventType::Music, "2030-01-01");
            far.coordinates = Some(LatLon::new(41.15, -8.61));
            let events = vec![near, far];

            let mut store = FilterStore::new();
            store.set_map_filter_enabled(true);
            store.set_polygon_coords(vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 1.0)]);

            let with_location = FilterContext {
                reference: Some(LatLon::new(38.7223, -9.1393)),
                ..ctx()
            };
            assert_eq!(ids(&store.filtered_events(&events, &with_location)), vec!["near"]);
            assert!(store.filtered_events(&events, &ctx()).is_empty());
        }

        #[test]
        fn test_empty_polygon_falls_back_to_radius() {
            let mut store = FilterStore::new();
            store.set_map_filter_enabled(true);
            store.set_polygon_coords(Vec::new());
            assert!(matches!(
                store.spatial_constraint(&ctx()),
                SpatialConstraint::Radius { .. }
            ));
            store.set_map_filter_enabled(false);
            assert_eq!(store.spatial_constraint(&ctx()), SpatialConstraint::None);
        }

        #[test]
        fn test_clear_all_filters() {
            let mut store = FilterStore::new();
            store.toggle_type(CategoryChoice::Type(EventType::Music));
            store.set_selected_country(PlaceSelection::Only("Spain".into()));
            store.set_selected_city(PlaceSelection::Only("Madrid".into()));
            store.set_polygon_coords(vec![LatLon::new(0.0, 0.0); 3]);
            store.set_map_filter_enabled(true);
            store.set_upcoming_only(true);
            assert_eq!(store.state().active_filter_count(), 5);

            store.clear_all_filters();
            assert_eq!(store.state().active_filter_count(), 0);
            assert!(store.state().polygon().is_empty());
            assert!(!store.state().polygon_restriction_active());
        }

        #[test]
        fn test_polygon_cap() {
            let mut store = FilterStore::new();
            assert!(store.push_polygon_point(LatLon::new(0.0, 0.0), 2));
            assert!(store.push_polygon_point(LatLon::new(0.0, 1.0), 2));
            assert!(!store.push_polygon_point(LatLon::new(1.0, 1.0), 2));
            assert_eq!(store.state().polygon().len(), 2);
        }
    }

    fn arb_event() -> impl Strategy<Value = CulturalEvent> {
        (
            0usize..EventType::ALL.len(),
            prop::sample::select(vec!["Portugal", "Spain", "France"]),
            prop::sample::select(vec!["Lisboa", "Madrid", "Paris", ""]),
            prop::option::of((-10.0f64..10.0, -10.0f64..10.0)),
            prop::sample::select(vec!["2030-01-01T00:00:00Z", "2020-01-01", "", "bad"]),
            "[a-z]{1,6}",
        )
            .prop_map(|(t, country, city, coords, date, id)| CulturalEvent {
                id: EventId::new(id),
                event_type: EventType::ALL[t],
                country: country.into(),
                city: city.into(),
                coordinates: coords.map(|(lat, lon)| LatLon::new(lat, lon)),
                schedule: vec![ScheduleEntry::new(date)],
                ..CulturalEvent::default()
            })
    }

    fn arb_store() -> impl Strategy<Value = FilterStore> {
        (
            prop::collection::vec(0usize..EventType::ALL.len(), 0..4),
            prop::option::of(prop::sample::select(vec!["Portugal", "Spain"])),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(types, country, map, upcoming)| {
                let mut store = FilterStore::new();
                let choices: Vec<_> = types
                    .into_iter()
                    .map(|i| CategoryChoice::Type(EventType::ALL[i]))
                    .collect();
                store.set_selected_types(&choices);
                if let Some(country) = country {
                    store.set_selected_country(PlaceSelection::Only(country.into()));
                }
                store.set_polygon_coords(vec![
                    LatLon::new(-5.0, -5.0),
                    LatLon::new(-5.0, 5.0),
                    LatLon::new(5.0, 5.0),
                ]);
                store.set_map_filter_enabled(map);
                store.set_upcoming_only(upcoming);
                store
            })
    }

    proptest! {
        #[test]
        fn prop_filtered_is_subset(
            events in prop::collection::vec(arb_event(), 0..20),
            store in arb_store(),
        ) {
            let result = store.filtered_events(&events, &ctx());
            prop_assert!(result.len() <= events.len());
            for e in &result {
                prop_assert!(events.iter().any(|x| std::ptr::eq(x, *e)));
            }
        }

        #[test]
        fn prop_adding_category_constraint_never_grows(
            events in prop::collection::vec(arb_event(), 0..20),
            store in arb_store(),
            extra in 0usize..EventType::ALL.len(),
        ) {
            let before = store.filtered_events(&events, &ctx()).len();
            let mut stricter = store.clone();
            let restricted = match stricter.state().categories() {
                CategorySelection::All => {
                    vec![CategoryChoice::Type(EventType::ALL[extra])]
                }
                CategorySelection::Only(types) => {
                    let keep: Vec<_> = types.iter().copied().collect();
                    if keep.len() > 1 {
                        keep[1..].iter().map(|t| CategoryChoice::Type(*t)).collect()
                    } else {
                        keep.iter().map(|t| CategoryChoice::Type(*t)).collect()
                    }
                }
            };
            stricter.set_selected_types(&restricted);
            let after = stricter.filtered_events(&events, &ctx()).len();
            prop_assert!(after <= before);
        }
    }
}
