use thiserror::Error;

use crate::engine::events::{
    HandlerSlot, ListenTarget, Listener, PageEvent, StateProperty, SubscribeOptions,
    VisibilityState,
};

pub mod simulated;

pub use simulated::SimulatedPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Where a state-property override landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideLevel {
    Prototype,
    Instance,
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("{property} is not configurable at the {level:?} level")]
    NotConfigurable {
        property: &'static str,
        level: OverrideLevel,
    },
    #[error("native call failed: {0}")]
    Native(String),
}

/// The native side of the interception boundary. The engine owns every
/// diversion decision; a host implementation only performs the underlying
/// registrations, reads, and dispatches the engine delegates to it.
///
/// An embedding must route the page's subscribe/unsubscribe calls and
/// legacy handler-property writes through the engine rather than calling
/// the native methods here directly; state-property *writes* (where a
/// property is writable) stay native and never involve the engine.
pub trait PageHost {
    fn add_native_listener(
        &mut self,
        target: ListenTarget,
        event_type: &str,
        listener: Listener,
        options: SubscribeOptions,
    ) -> Result<(), PageError>;

    fn remove_native_listener(&mut self, target: ListenTarget, event_type: &str, listener: &Listener);

    /// Install a read override for one state property at one level.
    /// Fails when the property is not configurable at that level.
    fn install_read_override(
        &mut self,
        property: StateProperty,
        level: OverrideLevel,
    ) -> Result<(), PageError>;

    fn native_hidden(&self) -> bool;

    fn native_visibility_state(&self) -> VisibilityState;

    fn native_has_focus(&self) -> bool;

    fn native_handler(&self, slot: HandlerSlot) -> Option<Listener>;

    fn set_native_handler(&mut self, slot: HandlerSlot, handler: Option<Listener>);

    /// Dispatch an event through the native delivery path for `target`.
    fn dispatch(&mut self, target: ListenTarget, event: &PageEvent) -> Result<(), PageError>;

    fn viewport(&self) -> Viewport;
}
