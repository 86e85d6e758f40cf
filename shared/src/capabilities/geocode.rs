use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::geometry::LatLon;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceSuggestion {
    pub label: String,
    pub coordinate: LatLon,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "data")]
pub enum GeocodeOperation {
    Search { query: String },
    Reverse { coordinate: LatLon },
}

/// The shell reports lookup failures as empty results, never as errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum GeocodeOutput {
    Suggestions(Vec<PlaceSuggestion>),
    Address(Option<String>),
}

impl Operation for GeocodeOperation {
    type Output = GeocodeOutput;
}

pub struct Geocode<Ev> {
    context: CapabilityContext<GeocodeOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geocode<Ev> {
    type Operation = GeocodeOperation;
    type MappedSelf<MappedEv> = Geocode<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geocode::new(self.context.map_event(f))
    }
}

impl<Ev> Geocode<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<GeocodeOperation, Ev>) -> Self {
        Self { context }
    }

    /// Suggestions with non-finite coordinates are dropped.
    pub fn search<F>(&self, query: String, make_event: F)
    where
        F: FnOnce(Vec<PlaceSuggestion>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let suggestions = match ctx
                .request_from_shell(GeocodeOperation::Search { query })
                .await
            {
                GeocodeOutput::Suggestions(list) => list
                    .into_iter()
                    .filter(|s| s.coordinate.validate().is_ok())
                    .collect(),
                GeocodeOutput::Address(_) => Vec::new(),
            };
            ctx.update_app(make_event(suggestions));
        });
    }

    pub fn reverse<F>(&self, coordinate: LatLon, make_event: F)
    where
        F: FnOnce(Option<String>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let label = match ctx
                .request_from_shell(GeocodeOperation::Reverse { coordinate })
                .await
            {
                GeocodeOutput::Address(label) => label.filter(|l| !l.trim().is_empty()),
                GeocodeOutput::Suggestions(_) => None,
            };
            ctx.update_app(make_event(label));
        });
    }
}
