use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use super::events::{ElementId, HandlerSlot, Listener, PageEvent, SignalKind, SubscribeOptions, TargetScope};

type Bucket = Rc<RefCell<Vec<BlockedEntry>>>;

#[derive(Debug)]
pub struct BlockedEntry {
    id: u64,
    pub listener: Listener,
    pub options: SubscribeOptions,
}

/// Subscriptions intercepted instead of forwarded to native registration.
/// Entries are never deduplicated: registering the same listener twice for
/// the same type produces two entries, the way native registration treats
/// differing options.
#[derive(Default)]
pub struct BlockedListenerRegistry {
    buckets: HashMap<(TargetScope, SignalKind), Bucket>,
    next_id: u64,
}

impl BlockedListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(
        &mut self,
        scope: TargetScope,
        kind: SignalKind,
        listener: Listener,
        options: SubscribeOptions,
    ) {
        let signal = options.signal.clone();
        if signal.as_ref().is_some_and(|token| token.is_fired()) {
            return;
        }
        self.next_id += 1;
        let id = self.next_id;
        let bucket = Rc::clone(self.buckets.entry((scope, kind)).or_default());
        bucket.borrow_mut().push(BlockedEntry {
            id,
            listener,
            options,
        });
        if let Some(token) = signal {
            let weak = Rc::downgrade(&bucket);
            token.on_fire(move || {
                if let Some(bucket) = weak.upgrade() {
                    bucket.borrow_mut().retain(|entry| entry.id != id);
                }
            });
        }
    }

    /// Remove the first entry whose listener identity matches, mirroring
    /// native unregistration.
    pub fn remove(&mut self, scope: TargetScope, kind: SignalKind, listener: &Listener) {
        if let Some(bucket) = self.buckets.get(&(scope, kind)) {
            let mut entries = bucket.borrow_mut();
            if let Some(pos) = entries
                .iter()
                .position(|entry| entry.listener.same_identity(listener))
            {
                entries.remove(pos);
            }
        }
    }

    /// Invoke every stored listener for `kind` on both anchors, honoring
    /// `once` by consuming the entry after invocation. Listener errors are
    /// swallowed per entry.
    pub fn replay(&self, kind: SignalKind, event: &PageEvent) {
        for scope in [TargetScope::Window, TargetScope::Document] {
            let Some(bucket) = self.buckets.get(&(scope, kind)) else {
                continue;
            };
            let snapshot: Vec<(u64, Listener, bool)> = bucket
                .borrow()
                .iter()
                .map(|entry| (entry.id, entry.listener.clone(), entry.options.once))
                .collect();
            for (id, listener, once) in snapshot {
                if let Err(err) = listener.invoke(event) {
                    warn!(
                        target: "wraith",
                        error = %err,
                        signal = kind.name(),
                        "suppressed listener failed during replay"
                    );
                }
                if once {
                    bucket.borrow_mut().retain(|entry| entry.id != id);
                }
            }
        }
    }

    /// Take every entry for a loss-free flush back to native registration.
    pub fn drain(&mut self) -> Vec<(TargetScope, SignalKind, BlockedEntry)> {
        let mut drained = Vec::new();
        for ((scope, kind), bucket) in self.buckets.drain() {
            for entry in bucket.borrow_mut().drain(..) {
                drained.push((scope, kind, entry));
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.borrow().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_for(&self, scope: TargetScope, kind: SignalKind) -> usize {
        self.buckets
            .get(&(scope, kind))
            .map_or(0, |bucket| bucket.borrow().len())
    }
}

/// Last-write-wins store for intercepted legacy handler assignments. One
/// live value per slot, because the underlying mechanism is single-slot.
#[derive(Default)]
pub struct BlockedHandlerRegistry {
    handlers: HashMap<HandlerSlot, Listener>,
}

impl BlockedHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, slot: HandlerSlot, handler: Listener) {
        self.handlers.insert(slot, handler);
    }

    pub fn take_all(&mut self) -> Vec<(HandlerSlot, Listener)> {
        self.handlers.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn get(&self, slot: HandlerSlot) -> Option<&Listener> {
        self.handlers.get(&slot)
    }
}

type ElementBucket = Rc<RefCell<Vec<ElementEntry>>>;

#[derive(Debug)]
pub struct ElementEntry {
    id: u64,
    pub listener: Listener,
    pub options: SubscribeOptions,
}

/// Per-element focus-family subscriptions held while element-level blocking
/// is active. An element with no live entries is removed outright so the
/// store never accumulates empty buckets.
#[derive(Default)]
pub struct ElementListenerStore {
    elements: HashMap<ElementId, HashMap<SignalKind, ElementBucket>>,
    next_id: u64,
}

impl ElementListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(
        &mut self,
        element: ElementId,
        kind: SignalKind,
        listener: Listener,
        options: SubscribeOptions,
    ) {
        let signal = options.signal.clone();
        if signal.as_ref().is_some_and(|token| token.is_fired()) {
            return;
        }
        self.next_id += 1;
        let id = self.next_id;
        let bucket = Rc::clone(
            self.elements
                .entry(element)
                .or_default()
                .entry(kind)
                .or_default(),
        );
        bucket.borrow_mut().push(ElementEntry {
            id,
            listener,
            options,
        });
        if let Some(token) = signal {
            let weak = Rc::downgrade(&bucket);
            token.on_fire(move || {
                if let Some(bucket) = weak.upgrade() {
                    bucket.borrow_mut().retain(|entry| entry.id != id);
                }
            });
        }
    }

    pub fn remove(&mut self, element: ElementId, kind: SignalKind, listener: &Listener) {
        let Some(kinds) = self.elements.get_mut(&element) else {
            return;
        };
        let mut emptied = false;
        if let Some(bucket) = kinds.get(&kind).cloned() {
            let mut entries = bucket.borrow_mut();
            if let Some(pos) = entries
                .iter()
                .position(|entry| entry.listener.same_identity(listener))
            {
                entries.remove(pos);
            }
            emptied = entries.is_empty();
        }
        if emptied {
            kinds.remove(&kind);
        }
        if kinds.is_empty() {
            self.elements.remove(&element);
        }
    }

    pub fn drain(&mut self) -> Vec<(ElementId, SignalKind, ElementEntry)> {
        let mut drained = Vec::new();
        for (element, kinds) in self.elements.drain() {
            for (kind, bucket) in kinds {
                for entry in bucket.borrow_mut().drain(..) {
                    drained.push((element, kind, entry));
                }
            }
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.elements
            .values()
            .flat_map(|kinds| kinds.values())
            .map(|bucket| bucket.borrow().len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_for(&self, element: ElementId, kind: SignalKind) -> usize {
        self.elements
            .get(&element)
            .and_then(|kinds| kinds.get(&kind))
            .map_or(0, |bucket| bucket.borrow().len())
    }

    pub fn tracks_element(&self, element: ElementId) -> bool {
        self.elements.contains_key(&element)
    }
}
