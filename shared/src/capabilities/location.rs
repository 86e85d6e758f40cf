use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::geometry::LatLon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    #[default]
    Unknown,
    Requesting,
    Granted,
    Denied,
}

impl PermissionState {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub const fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LocationOutput {
    Permission(bool),
    Position(Option<LatLon>),
}

impl Operation for LocationOperation {
    type Output = LocationOutput;
}

pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Location<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Location<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Location::new(self.context.map_event(f))
    }
}

impl<Ev> Location<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    /// Denial is an ordinary `false`, not an error.
    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(bool) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let granted = matches!(
                ctx.request_from_shell(LocationOperation::RequestPermission).await,
                LocationOutput::Permission(true)
            );
            ctx.update_app(make_event(granted));
        });
    }

    /// Invalid fixes are reported as `None`.
    pub fn current_position<F>(&self, make_event: F)
    where
        F: FnOnce(Option<LatLon>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let position = match ctx
                .request_from_shell(LocationOperation::CurrentPosition)
                .await
            {
                LocationOutput::Position(position) => {
                    position.and_then(|p| p.validate().ok())
                }
                LocationOutput::Permission(_) => None,
            };
            ctx.update_app(make_event(position));
        });
    }
}
