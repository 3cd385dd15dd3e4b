use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::{OverrideLevel, PageError, PageHost, Viewport};
use crate::engine::events::{
    HandlerSlot, ListenTarget, Listener, PageEvent, StateProperty, SubscribeOptions,
    VisibilityState, HANDLER_SLOTS,
};

struct NativeListener {
    listener: Listener,
    options: SubscribeOptions,
}

/// In-memory page used by the integration tests and the demo binary: native
/// listener lists per target and event type, legacy handler slots, real
/// visibility/focus state, and a record of everything dispatched through the
/// native path.
pub struct SimulatedPage {
    listeners: HashMap<(ListenTarget, String), Vec<NativeListener>>,
    handlers: HashMap<HandlerSlot, Listener>,
    hidden: bool,
    focused: bool,
    viewport: Viewport,
    unconfigurable: HashSet<StateProperty>,
    sealed_instances: HashSet<StateProperty>,
    overrides: HashMap<StateProperty, OverrideLevel>,
    dispatched: Vec<(ListenTarget, PageEvent)>,
}

impl SimulatedPage {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            handlers: HashMap::new(),
            hidden: false,
            focused: true,
            viewport: Viewport {
                width: 1280,
                height: 720,
            },
            unconfigurable: HashSet::new(),
            sealed_instances: HashSet::new(),
            overrides: HashMap::new(),
            dispatched: Vec::new(),
        }
    }

    /// Put the page in the background: hidden and unfocused.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        self.focused = !hidden;
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Make prototype-level override installation fail for `property`.
    pub fn mark_unconfigurable(&mut self, property: StateProperty) {
        self.unconfigurable.insert(property);
    }

    /// Make instance-level installation fail as well.
    pub fn seal_instance(&mut self, property: StateProperty) {
        self.sealed_instances.insert(property);
    }

    pub fn override_level(&self, property: StateProperty) -> Option<OverrideLevel> {
        self.overrides.get(&property).copied()
    }

    pub fn native_listener_count(&self, target: ListenTarget, event_type: &str) -> usize {
        self.listeners
            .get(&(target, event_type.to_ascii_lowercase()))
            .map_or(0, Vec::len)
    }

    /// Fire a native event: invoke every natively-registered listener for
    /// the type (honoring `once` and fired cancellation tokens) and the
    /// matching legacy handler slot, the way the real delivery path would.
    /// Returns the number of callbacks invoked.
    pub fn fire_native(&mut self, target: ListenTarget, event: &PageEvent) -> usize {
        let key = (target, event.type_name().to_string());
        let mut invoked = 0;
        if let Some(entries) = self.listeners.get_mut(&key) {
            entries.retain(|entry| {
                !entry
                    .options
                    .signal
                    .as_ref()
                    .is_some_and(|token| token.is_fired())
            });
            let callbacks: Vec<Listener> =
                entries.iter().map(|entry| entry.listener.clone()).collect();
            entries.retain(|entry| !entry.options.once);
            for listener in callbacks {
                if let Err(err) = listener.invoke(event) {
                    warn!(target: "wraith", error = %err, "native listener failed");
                }
                invoked += 1;
            }
        }
        if let PageEvent::Signal { kind } = event {
            for slot in HANDLER_SLOTS {
                if ListenTarget::from(slot.scope) == target && slot.prop.signal() == *kind {
                    if let Some(handler) = self.handlers.get(&slot).cloned() {
                        if let Err(err) = handler.invoke(event) {
                            warn!(target: "wraith", error = %err, "native handler failed");
                        }
                        invoked += 1;
                    }
                }
            }
        }
        invoked
    }

    pub fn dispatched(&self) -> &[(ListenTarget, PageEvent)] {
        &self.dispatched
    }

    pub fn take_dispatched(&mut self) -> Vec<(ListenTarget, PageEvent)> {
        std::mem::take(&mut self.dispatched)
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl PageHost for SimulatedPage {
    fn add_native_listener(
        &mut self,
        target: ListenTarget,
        event_type: &str,
        listener: Listener,
        options: SubscribeOptions,
    ) -> Result<(), PageError> {
        if options.signal.as_ref().is_some_and(|token| token.is_fired()) {
            return Ok(());
        }
        self.listeners
            .entry((target, event_type.to_ascii_lowercase()))
            .or_default()
            .push(NativeListener { listener, options });
        Ok(())
    }

    fn remove_native_listener(
        &mut self,
        target: ListenTarget,
        event_type: &str,
        listener: &Listener,
    ) {
        if let Some(entries) = self
            .listeners
            .get_mut(&(target, event_type.to_ascii_lowercase()))
        {
            if let Some(pos) = entries
                .iter()
                .position(|entry| entry.listener.same_identity(listener))
            {
                entries.remove(pos);
            }
        }
    }

    fn install_read_override(
        &mut self,
        property: StateProperty,
        level: OverrideLevel,
    ) -> Result<(), PageError> {
        let blocked = match level {
            OverrideLevel::Prototype => self.unconfigurable.contains(&property),
            OverrideLevel::Instance => self.sealed_instances.contains(&property),
        };
        if blocked {
            return Err(PageError::NotConfigurable {
                property: property.name(),
                level,
            });
        }
        self.overrides.insert(property, level);
        Ok(())
    }

    fn native_hidden(&self) -> bool {
        self.hidden
    }

    fn native_visibility_state(&self) -> VisibilityState {
        if self.hidden {
            VisibilityState::Hidden
        } else {
            VisibilityState::Visible
        }
    }

    fn native_has_focus(&self) -> bool {
        self.focused
    }

    fn native_handler(&self, slot: HandlerSlot) -> Option<Listener> {
        self.handlers.get(&slot).cloned()
    }

    fn set_native_handler(&mut self, slot: HandlerSlot, handler: Option<Listener>) {
        match handler {
            Some(handler) => {
                self.handlers.insert(slot, handler);
            }
            None => {
                self.handlers.remove(&slot);
            }
        }
    }

    fn dispatch(&mut self, target: ListenTarget, event: &PageEvent) -> Result<(), PageError> {
        self.dispatched.push((target, event.clone()));
        self.fire_native(target, event);
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}
