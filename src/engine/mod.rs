use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Duration;
use tracing::{debug, warn};

pub mod cancel;
pub mod config;
pub mod events;
pub mod intercept;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod timers;

use crate::page::{OverrideLevel, PageHost};
use events::{
    HandlerSlot, ListenTarget, Listener, PageEvent, SignalKind, StateProperty, SubscribeOptions,
    VisibilityState, STATE_PROPERTIES,
};
use intercept::Diversion;
use registry::{BlockedHandlerRegistry, BlockedListenerRegistry, ElementListenerStore};
use timers::{TimerKind, TimerService};

pub use config::{DecoyTiming, FakeActivity, SpoofConfig};
pub use metrics::{MetricsCounters, MetricsSummary};

/// Non-zero counters are reported outward on this cadence.
pub const METRICS_FLUSH_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditCategory {
    FakeActivity,
    Metrics,
    FocusSync,
}

/// Everything the engine reports outward: audit records, flush summaries,
/// and requests for the distributor to resend policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Audit {
        category: AuditCategory,
        data: JsonValue,
    },
    Metrics(MetricsSummary),
    RequestConfig,
}

/// The spoofing engine: owns the registries, the current policy, and the
/// synthetic-activity timers. Exactly one instance exists per page lifetime;
/// every interception decision consults the configuration held here at call
/// time.
pub struct SpoofEngine {
    config: SpoofConfig,
    awaiting_config: bool,
    listeners: BlockedListenerRegistry,
    handlers: BlockedHandlerRegistry,
    element_listeners: ElementListenerStore,
    metrics: MetricsCounters,
    timers: TimerService,
    fake_timer: Option<u32>,
    metrics_timer: Option<u32>,
    overrides: HashMap<StateProperty, OverrideLevel>,
    lifetime_ended: bool,
    outbound: UnboundedSender<EngineEvent>,
    rng: StdRng,
}

impl SpoofEngine {
    pub fn new() -> (Self, UnboundedReceiver<EngineEvent>) {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic construction for tests and replayable simulations.
    pub fn with_seed(seed: u64) -> (Self, UnboundedReceiver<EngineEvent>) {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> (Self, UnboundedReceiver<EngineEvent>) {
        let (outbound, events) = unbounded_channel();
        let engine = Self {
            config: SpoofConfig::default(),
            awaiting_config: true,
            listeners: BlockedListenerRegistry::new(),
            handlers: BlockedHandlerRegistry::new(),
            element_listeners: ElementListenerStore::new(),
            metrics: MetricsCounters::default(),
            timers: TimerService::new(),
            fake_timer: None,
            metrics_timer: None,
            overrides: HashMap::new(),
            lifetime_ended: false,
            outbound,
            rng,
        };
        (engine, events)
    }

    /// Install the property overrides and start the metrics flush cadence,
    /// then ask the distributor for the current policy. Installation never
    /// fails: a property that cannot be overridden at the prototype level
    /// falls back to the document instance, and failing that is skipped.
    pub fn install(&mut self, page: &mut dyn PageHost) {
        for property in STATE_PROPERTIES {
            match page.install_read_override(property, OverrideLevel::Prototype) {
                Ok(()) => {
                    self.overrides.insert(property, OverrideLevel::Prototype);
                }
                Err(_) => match page.install_read_override(property, OverrideLevel::Instance) {
                    Ok(()) => {
                        self.overrides.insert(property, OverrideLevel::Instance);
                    }
                    Err(err) => {
                        debug!(
                            target: "wraith",
                            property = property.name(),
                            error = %err,
                            "state property left native"
                        );
                    }
                },
            }
        }
        if self.metrics_timer.is_none() {
            self.metrics_timer = Some(
                self.timers
                    .set_interval(METRICS_FLUSH_PERIOD, TimerKind::MetricsFlush),
            );
        }
        self.request_config();
    }

    /// Window/document suppression predicate. Until the first configuration
    /// arrives the engine fails safe toward "keep spoofing".
    fn suppressing(&self) -> bool {
        self.config.should_block() || self.awaiting_config
    }

    fn element_blocking(&self) -> bool {
        self.config.element_focus_blocking
    }

    fn spoof_active(&self) -> bool {
        self.config.spoofing_enabled || self.awaiting_config
    }

    // ---- interception boundary -------------------------------------------

    /// The subscribe entry point. Calls that the current policy does not
    /// target are forwarded to native registration unchanged.
    pub fn subscribe(
        &mut self,
        page: &mut dyn PageHost,
        target: ListenTarget,
        event_type: &str,
        listener: Listener,
        options: SubscribeOptions,
    ) {
        match intercept::classify(
            event_type,
            target,
            self.suppressing(),
            self.element_blocking(),
        ) {
            Diversion::Block(scope, kind) => {
                debug!(
                    target: "wraith",
                    signal = kind.name(),
                    scope = ?scope,
                    "suppressed listener registration"
                );
                self.listeners.store(scope, kind, listener, options);
                self.metrics.blocked_listeners += 1;
            }
            Diversion::Shadow(element, kind) => {
                self.element_listeners.store(element, kind, listener, options);
            }
            Diversion::PassThrough => {
                if let Err(err) = page.add_native_listener(target, event_type, listener, options) {
                    warn!(target: "wraith", error = %err, "native registration failed");
                }
            }
        }
    }

    /// The unsubscribe entry point, mirroring [`Self::subscribe`]: when the
    /// diversion predicate matches, the removal is applied to the matching
    /// registry instead of native unregistration.
    pub fn unsubscribe(
        &mut self,
        page: &mut dyn PageHost,
        target: ListenTarget,
        event_type: &str,
        listener: &Listener,
    ) {
        match intercept::classify(
            event_type,
            target,
            self.suppressing(),
            self.element_blocking(),
        ) {
            Diversion::Block(scope, kind) => self.listeners.remove(scope, kind, listener),
            Diversion::Shadow(element, kind) => {
                self.element_listeners.remove(element, kind, listener)
            }
            Diversion::PassThrough => page.remove_native_listener(target, event_type, listener),
        }
    }

    /// Write path for the legacy single-slot handler properties. Reads are
    /// not intercepted; see [`Self::handler`].
    pub fn assign_handler(
        &mut self,
        page: &mut dyn PageHost,
        slot: HandlerSlot,
        handler: Option<Listener>,
    ) {
        if self.suppressing() {
            if let Some(handler) = handler {
                debug!(
                    target: "wraith",
                    property = slot.prop.name(),
                    scope = ?slot.scope,
                    "suppressed handler assignment"
                );
                self.handlers.store(slot, handler);
                self.metrics.blocked_handlers += 1;
            }
            // The native slot is cleared either way so the page cannot be
            // reached through it while suppression is on.
            page.set_native_handler(slot, None);
        } else {
            page.set_native_handler(slot, handler);
        }
    }

    pub fn handler(&self, page: &dyn PageHost, slot: HandlerSlot) -> Option<Listener> {
        page.native_handler(slot)
    }

    // ---- property override layer -----------------------------------------

    pub fn hidden(&self, page: &dyn PageHost) -> bool {
        if self.spoof_active() {
            false
        } else {
            page.native_hidden()
        }
    }

    pub fn visibility_state(&self, page: &dyn PageHost) -> VisibilityState {
        if self.spoof_active() {
            VisibilityState::Visible
        } else {
            page.native_visibility_state()
        }
    }

    pub fn has_focus(&self, page: &dyn PageHost) -> bool {
        self.spoof_active() || page.native_has_focus()
    }

    /// Read one overridden state property by name, for hosts that route
    /// per-alias getter calls through the engine.
    pub fn read_state(&self, page: &dyn PageHost, property: StateProperty) -> JsonValue {
        match property {
            StateProperty::Hidden | StateProperty::WebkitHidden | StateProperty::MozHidden
            | StateProperty::MsHidden => json!(self.hidden(page)),
            StateProperty::VisibilityState
            | StateProperty::WebkitVisibilityState
            | StateProperty::MozVisibilityState => json!(self.visibility_state(page)),
        }
    }

    pub fn override_level(&self, property: StateProperty) -> Option<OverrideLevel> {
        self.overrides.get(&property).copied()
    }

    // ---- configuration lifecycle -----------------------------------------

    /// Apply a new policy wholesale. Turning suppression off flushes every
    /// shadowed subscription and handler back to native delivery, loss-free;
    /// the activity scheduler is restarted unconditionally because its
    /// policy may have changed independently.
    pub fn apply_config(&mut self, page: &mut dyn PageHost, config: SpoofConfig) {
        let was_suppressing = self.suppressing();
        let was_element_blocking = self.element_blocking();
        self.config = config;
        self.awaiting_config = false;
        if was_suppressing && !self.suppressing() {
            self.flush_blocked_listeners(page);
            self.restore_blocked_handlers(page);
        }
        if was_element_blocking && !self.element_blocking() {
            self.flush_element_listeners(page);
        }
        self.schedule_fake_activity();
    }

    /// JSON variant of [`Self::apply_config`]: unspecified fields take the
    /// defaults, and a payload that fails to deserialize degrades to the
    /// default baseline instead of being rejected.
    pub fn apply_config_value(&mut self, page: &mut dyn PageHost, payload: JsonValue) {
        let config = serde_json::from_value(payload).unwrap_or_else(|err| {
            warn!(target: "wraith", error = %err, "malformed configuration payload");
            SpoofConfig::default()
        });
        self.apply_config(page, config);
    }

    fn flush_blocked_listeners(&mut self, page: &mut dyn PageHost) {
        for (scope, kind, entry) in self.listeners.drain() {
            if let Err(err) = page.add_native_listener(
                ListenTarget::from(scope),
                kind.name(),
                entry.listener,
                entry.options,
            ) {
                warn!(
                    target: "wraith",
                    error = %err,
                    signal = kind.name(),
                    "failed to restore suppressed listener"
                );
            }
        }
    }

    fn restore_blocked_handlers(&mut self, page: &mut dyn PageHost) {
        for (slot, handler) in self.handlers.take_all() {
            page.set_native_handler(slot, Some(handler));
        }
    }

    fn flush_element_listeners(&mut self, page: &mut dyn PageHost) {
        for (element, kind, entry) in self.element_listeners.drain() {
            if let Err(err) = page.add_native_listener(
                ListenTarget::Element(element),
                kind.name(),
                entry.listener,
                entry.options,
            ) {
                warn!(
                    target: "wraith",
                    error = %err,
                    signal = kind.name(),
                    "failed to restore element listener"
                );
            }
        }
    }

    // ---- synthetic activity ----------------------------------------------

    fn schedule_fake_activity(&mut self) {
        if let Some(id) = self.fake_timer.take() {
            self.timers.clear(id);
        }
        if self.lifetime_ended {
            return;
        }
        if !self.config.spoofing_enabled || !self.config.fake_activity.enabled {
            return;
        }
        let delay = scheduler::next_burst_delay(&mut self.rng, &self.config);
        self.fake_timer = Some(self.timers.set_timeout(delay, TimerKind::FakeActivity));
    }

    /// Drain expired timers and run their work. Call this from the same
    /// logical thread as every other engine call; nothing here races page
    /// script.
    pub fn pump(&mut self, page: &mut dyn PageHost) {
        for fired in self.timers.drain_fired() {
            match fired.kind {
                TimerKind::FakeActivity => {
                    self.fake_timer = None;
                    self.run_burst(page);
                    self.schedule_fake_activity();
                }
                TimerKind::MetricsFlush => self.flush_metrics(),
            }
        }
    }

    fn run_burst(&mut self, page: &mut dyn PageHost) {
        let plan = scheduler::plan_burst(
            &mut self.rng,
            page.viewport(),
            self.config.fake_activity.move_radius,
        );
        for kind in plan.signals {
            self.dispatch_synthetic(page, kind);
        }
        if let Err(err) = page.dispatch(ListenTarget::Document, &plan.pointer) {
            warn!(target: "wraith", error = %err, "synthetic pointer dispatch failed");
        }
        self.metrics.synthetic_bursts += 1;
        if self.config.logging_enabled {
            self.emit(EngineEvent::Audit {
                category: AuditCategory::FakeActivity,
                data: json!({
                    "type": "burst",
                    "events": ["focus", "visibilitychange", "mousemove"],
                }),
            });
        }
    }

    /// Replay a synthetic signal to the suppressed listeners first, then
    /// push it down the native delivery path. Focus lands on both anchors,
    /// blur on the window only, everything else on the document.
    fn dispatch_synthetic(&mut self, page: &mut dyn PageHost, kind: SignalKind) {
        let event = PageEvent::signal(kind);
        self.listeners.replay(kind, &event);
        let targets: &[ListenTarget] = match kind {
            SignalKind::Focus => &[ListenTarget::Window, ListenTarget::Document],
            SignalKind::Blur => &[ListenTarget::Window],
            _ => &[ListenTarget::Document],
        };
        for target in targets {
            if let Err(err) = page.dispatch(*target, &event) {
                warn!(
                    target: "wraith",
                    error = %err,
                    signal = kind.name(),
                    "synthetic dispatch failed"
                );
            }
        }
    }

    fn flush_metrics(&mut self) {
        if !self.config.logging_enabled {
            return;
        }
        if !self.metrics.any() {
            return;
        }
        let counters = self.metrics.take();
        self.emit(EngineEvent::Audit {
            category: AuditCategory::Metrics,
            data: json!({
                "blockedListeners": counters.blocked_listeners,
                "blockedHandlers": counters.blocked_handlers,
                "syntheticBursts": counters.synthetic_bursts,
            }),
        });
        self.emit(EngineEvent::Metrics(counters.into()));
    }

    // ---- page lifecycle --------------------------------------------------

    /// The page came back from the cache or was re-shown; policy may have
    /// changed while it was away.
    pub fn on_page_shown(&mut self) {
        self.request_config();
    }

    /// A genuine focus reached the page while spoofing; record what the
    /// page now claims its visibility is.
    pub fn on_native_focus(&mut self, page: &dyn PageHost) {
        if self.config.spoofing_enabled {
            let state = self.visibility_state(page);
            self.emit(EngineEvent::Audit {
                category: AuditCategory::FocusSync,
                data: json!({ "value": state }),
            });
        }
    }

    /// Page teardown. Registries are left alone because the environment is
    /// going away; only the activity timer must stop.
    pub fn on_page_hide(&mut self) {
        self.lifetime_ended = true;
        if let Some(id) = self.fake_timer.take() {
            self.timers.clear(id);
        }
    }

    fn request_config(&mut self) {
        self.emit(EngineEvent::RequestConfig);
    }

    fn emit(&self, event: EngineEvent) {
        // The receiver going away just means nobody is auditing anymore.
        let _ = self.outbound.send(event);
    }

    // ---- introspection ---------------------------------------------------

    pub fn config(&self) -> &SpoofConfig {
        &self.config
    }

    pub fn awaiting_config(&self) -> bool {
        self.awaiting_config
    }

    pub fn metrics(&self) -> MetricsCounters {
        self.metrics
    }

    pub fn blocked_listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn blocked_handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn element_listener_count(&self) -> usize {
        self.element_listeners.len()
    }

    /// True when no burst is pending (the scheduler is in its idle state).
    pub fn scheduler_idle(&self) -> bool {
        self.fake_timer.is_none()
    }
}
