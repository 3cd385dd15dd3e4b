use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use serde::Serialize;

use super::cancel::CancelToken;

/// Signal types the interception gate targets. Anything that does not parse
/// into this vocabulary is forwarded to native registration untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    VisibilityChange,
    WebkitVisibilityChange,
    MozVisibilityChange,
    Blur,
    Focus,
    FocusIn,
    FocusOut,
    PageShow,
    PageHide,
    Freeze,
    Resume,
}

impl SignalKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "visibilitychange" => Some(Self::VisibilityChange),
            "webkitvisibilitychange" => Some(Self::WebkitVisibilityChange),
            "mozvisibilitychange" => Some(Self::MozVisibilityChange),
            "blur" => Some(Self::Blur),
            "focus" => Some(Self::Focus),
            "focusin" => Some(Self::FocusIn),
            "focusout" => Some(Self::FocusOut),
            "pageshow" => Some(Self::PageShow),
            "pagehide" => Some(Self::PageHide),
            "freeze" => Some(Self::Freeze),
            "resume" => Some(Self::Resume),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VisibilityChange => "visibilitychange",
            Self::WebkitVisibilityChange => "webkitvisibilitychange",
            Self::MozVisibilityChange => "mozvisibilitychange",
            Self::Blur => "blur",
            Self::Focus => "focus",
            Self::FocusIn => "focusin",
            Self::FocusOut => "focusout",
            Self::PageShow => "pageshow",
            Self::PageHide => "pagehide",
            Self::Freeze => "freeze",
            Self::Resume => "resume",
        }
    }

    /// The four types that can be shadowed on individual elements.
    pub fn is_focus_family(&self) -> bool {
        matches!(self, Self::Focus | Self::Blur | Self::FocusIn | Self::FocusOut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    #[default]
    Visible,
    Hidden,
}

impl VisibilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        }
    }
}

/// The two top-level anchors interception decisions are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetScope {
    Window,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub usize);

/// What a subscribe/unsubscribe call is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    Window,
    Document,
    Element(ElementId),
}

impl ListenTarget {
    pub fn scope(&self) -> Option<TargetScope> {
        match self {
            Self::Window => Some(TargetScope::Window),
            Self::Document => Some(TargetScope::Document),
            Self::Element(_) => None,
        }
    }
}

impl From<TargetScope> for ListenTarget {
    fn from(scope: TargetScope) -> Self {
        match scope {
            TargetScope::Window => Self::Window,
            TargetScope::Document => Self::Document,
        }
    }
}

/// Legacy single-slot handler properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerProp {
    OnVisibilityChange,
    OnWebkitVisibilityChange,
    OnMozVisibilityChange,
    OnBlur,
    OnFocus,
}

impl HandlerProp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnVisibilityChange => "onvisibilitychange",
            Self::OnWebkitVisibilityChange => "onwebkitvisibilitychange",
            Self::OnMozVisibilityChange => "onmozvisibilitychange",
            Self::OnBlur => "onblur",
            Self::OnFocus => "onfocus",
        }
    }

    pub fn signal(&self) -> SignalKind {
        match self {
            Self::OnVisibilityChange => SignalKind::VisibilityChange,
            Self::OnWebkitVisibilityChange => SignalKind::WebkitVisibilityChange,
            Self::OnMozVisibilityChange => SignalKind::MozVisibilityChange,
            Self::OnBlur => SignalKind::Blur,
            Self::OnFocus => SignalKind::Focus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerSlot {
    pub scope: TargetScope,
    pub prop: HandlerProp,
}

/// Every handler slot the engine intercepts. The prefixed visibility slots
/// exist only on the document anchor.
pub const HANDLER_SLOTS: [HandlerSlot; 7] = [
    HandlerSlot {
        scope: TargetScope::Document,
        prop: HandlerProp::OnVisibilityChange,
    },
    HandlerSlot {
        scope: TargetScope::Document,
        prop: HandlerProp::OnWebkitVisibilityChange,
    },
    HandlerSlot {
        scope: TargetScope::Document,
        prop: HandlerProp::OnMozVisibilityChange,
    },
    HandlerSlot {
        scope: TargetScope::Document,
        prop: HandlerProp::OnBlur,
    },
    HandlerSlot {
        scope: TargetScope::Document,
        prop: HandlerProp::OnFocus,
    },
    HandlerSlot {
        scope: TargetScope::Window,
        prop: HandlerProp::OnBlur,
    },
    HandlerSlot {
        scope: TargetScope::Window,
        prop: HandlerProp::OnFocus,
    },
];

/// Read-only state properties the override layer replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateProperty {
    Hidden,
    WebkitHidden,
    MozHidden,
    MsHidden,
    VisibilityState,
    WebkitVisibilityState,
    MozVisibilityState,
}

impl StateProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::WebkitHidden => "webkitHidden",
            Self::MozHidden => "mozHidden",
            Self::MsHidden => "msHidden",
            Self::VisibilityState => "visibilityState",
            Self::WebkitVisibilityState => "webkitVisibilityState",
            Self::MozVisibilityState => "mozVisibilityState",
        }
    }
}

pub const STATE_PROPERTIES: [StateProperty; 7] = [
    StateProperty::Hidden,
    StateProperty::WebkitHidden,
    StateProperty::MozHidden,
    StateProperty::MsHidden,
    StateProperty::VisibilityState,
    StateProperty::WebkitVisibilityState,
    StateProperty::MozVisibilityState,
];

/// An event as observed by listeners, whether replayed from a registry or
/// dispatched natively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Signal {
        kind: SignalKind,
    },
    PointerMove {
        client_x: i32,
        client_y: i32,
        movement_x: i32,
        movement_y: i32,
    },
}

impl PageEvent {
    pub fn signal(kind: SignalKind) -> Self {
        Self::Signal { kind }
    }

    /// The event type string this event dispatches under.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Signal { kind } => kind.name(),
            Self::PointerMove { .. } => "mousemove",
        }
    }
}

/// Object-shaped listener: anything with a handle-event method.
pub trait EventObserver {
    fn on_event(&self, event: &PageEvent) -> Result<()>;
}

/// A subscription callback in one of the two shapes a page can hand over.
/// Replay code calls [`Listener::invoke`] and never inspects the shape.
#[derive(Clone)]
pub enum Listener {
    Function(Rc<dyn Fn(&PageEvent)>),
    Observer(Rc<dyn EventObserver>),
}

impl Listener {
    pub fn function(f: impl Fn(&PageEvent) + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    pub fn observer(observer: impl EventObserver + 'static) -> Self {
        Self::Observer(Rc::new(observer))
    }

    pub fn invoke(&self, event: &PageEvent) -> Result<()> {
        match self {
            Self::Function(f) => {
                f(event);
                Ok(())
            }
            Self::Observer(o) => o.on_event(event),
        }
    }

    /// Pointer identity, the way native unregistration matches listeners.
    /// Clones of the same `Listener` share identity.
    pub fn same_identity(&self, other: &Listener) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    fn data_ptr(&self) -> *const () {
        match self {
            Self::Function(f) => Rc::as_ptr(f) as *const (),
            Self::Observer(o) => Rc::as_ptr(o) as *const (),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(ptr) => write!(f, "Listener::Function({:p})", Rc::as_ptr(ptr)),
            Self::Observer(ptr) => write!(f, "Listener::Observer({:p})", Rc::as_ptr(ptr)),
        }
    }
}

/// Options carried alongside a subscription, mirroring what native
/// registration accepts.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    pub once: bool,
    pub capture: bool,
    pub signal: Option<CancelToken>,
}

impl SubscribeOptions {
    pub fn once() -> Self {
        Self {
            once: true,
            ..Self::default()
        }
    }

    pub fn with_signal(signal: CancelToken) -> Self {
        Self {
            signal: Some(signal),
            ..Self::default()
        }
    }
}
