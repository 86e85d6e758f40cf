use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::filter::PlaceSelection;
use crate::model::CulturalEvent;

/// Countries and cities offered by the filter pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedCatalog {
    available_countries: Vec<String>,
    available_cities: Vec<String>,
}

impl DerivedCatalog {
    /// Countries come from every event; cities only from events in the
    /// selected country. Blank names are skipped and both lists are sorted.
    #[instrument(skip_all, fields(events = events.len(), country = ?country))]
    pub fn build(events: &[CulturalEvent], country: &PlaceSelection) -> Self {
        let mut countries = BTreeSet::new();
        let mut cities = BTreeSet::new();

        for event in events {
            let event_country = event.country.trim();
            if !event_country.is_empty() {
                countries.insert(event_country);
            }
            let event_city = event.city.trim();
            if !event_city.is_empty() && country.allows(event_country) {
                cities.insert(event_city);
            }
        }

        let catalog = Self {
            available_countries: countries.into_iter().map(str::to_string).collect(),
            available_cities: cities.into_iter().map(str::to_string).collect(),
        };
        debug!(
            countries = catalog.available_countries.len(),
            cities = catalog.available_cities.len(),
            "catalog rebuilt"
        );
        catalog
    }

    #[must_use]
    pub fn available_countries(&self) -> &[String] {
        &self.available_countries
    }

    #[must_use]
    pub fn available_cities(&self) -> &[String] {
        &self.available_cities
    }

    #[must_use]
    pub fn has_city(&self, city: &str) -> bool {
        self.available_cities.binary_search_by(|c| c.as_str().cmp(city)).is_ok()
    }
}
