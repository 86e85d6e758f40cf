mod backend;
mod geocode;
mod location;
mod push;

pub use self::backend::{
    Backend, BackendError, BackendOperation, BackendOutput, BackendResult,
};
pub use self::geocode::{Geocode, GeocodeOperation, GeocodeOutput, PlaceSuggestion};
pub use self::location::{Location, LocationOperation, LocationOutput, PermissionState};
pub use self::push::{Push, PushError, PushOperation, PushResult};

pub(crate) use self::backend::unexpected;
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub backend: Backend<Event>,
    pub push: Push<Event>,
    pub geocode: Geocode<Event>,
    pub location: Location<Event>,
}
