use super::events::{ElementId, ListenTarget, SignalKind, TargetScope};

/// Where one subscribe/unsubscribe call goes. The two diversion arms are
/// mutually exclusive per call: window/document targets never reach the
/// element path and elements never reach the window/document path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diversion {
    /// Divert into the blocked-listener registry.
    Block(TargetScope, SignalKind),
    /// Divert into the element listener shadow store.
    Shadow(ElementId, SignalKind),
    /// Forward to native registration untouched.
    PassThrough,
}

/// The interception gate, kept free of engine state so it can be checked in
/// isolation. `suppressing` is the current window/document predicate
/// (blocking configured, or still awaiting the first configuration);
/// `element_blocking` is the element-level flag.
pub fn classify(
    event_type: &str,
    target: ListenTarget,
    suppressing: bool,
    element_blocking: bool,
) -> Diversion {
    let Some(kind) = SignalKind::from_name(event_type) else {
        return Diversion::PassThrough;
    };
    match target {
        ListenTarget::Window if suppressing => Diversion::Block(TargetScope::Window, kind),
        ListenTarget::Document if suppressing => Diversion::Block(TargetScope::Document, kind),
        ListenTarget::Element(element) if element_blocking && kind.is_focus_family() => {
            Diversion::Shadow(element, kind)
        }
        _ => Diversion::PassThrough,
    }
}
