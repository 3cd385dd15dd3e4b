use std::cell::Cell;
use std::rc::Rc;

use wraith::engine::events::{ElementId, ListenTarget, Listener, PageEvent, SignalKind, SubscribeOptions};
use wraith::engine::{SpoofConfig, SpoofEngine};
use wraith::page::SimulatedPage;

fn counting_listener() -> (Listener, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    let count_ref = Rc::clone(&count);
    let listener = Listener::function(move |_| count_ref.set(count_ref.get() + 1));
    (listener, count)
}

fn element_blocking_config() -> SpoofConfig {
    SpoofConfig {
        element_focus_blocking: true,
        ..SpoofConfig::default()
    }
}

#[tokio::test]
async fn focus_family_subscriptions_are_shadowed_per_element() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::new();
    engine.apply_config(&mut page, element_blocking_config());

    let input = ListenTarget::Element(ElementId(5));
    let (listener, _) = counting_listener();
    engine.subscribe(&mut page, input, "focus", listener, SubscribeOptions::default());
    assert_eq!(page.native_listener_count(input, "focus"), 0);
    assert_eq!(engine.element_listener_count(), 1);
}

#[tokio::test]
async fn non_focus_types_on_elements_stay_native() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::new();
    engine.apply_config(&mut page, element_blocking_config());

    let element = ListenTarget::Element(ElementId(9));
    let (listener, _) = counting_listener();
    engine.subscribe(
        &mut page,
        element,
        "pageshow",
        listener.clone(),
        SubscribeOptions::default(),
    );
    engine.subscribe(&mut page, element, "click", listener, SubscribeOptions::default());
    assert_eq!(page.native_listener_count(element, "pageshow"), 1);
    assert_eq!(page.native_listener_count(element, "click"), 1);
    assert_eq!(engine.element_listener_count(), 0);
}

#[tokio::test]
async fn anchors_never_land_in_the_element_store() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::new();
    engine.apply_config(&mut page, element_blocking_config());

    // Blocking is off for the anchors, so a window focus subscription is
    // plain native registration.
    let (listener, _) = counting_listener();
    engine.subscribe(
        &mut page,
        ListenTarget::Window,
        "focus",
        listener,
        SubscribeOptions::default(),
    );
    assert_eq!(page.native_listener_count(ListenTarget::Window, "focus"), 1);
    assert_eq!(engine.element_listener_count(), 0);
}

#[tokio::test]
async fn disabling_element_blocking_reattaches_to_the_exact_element() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::new();
    engine.apply_config(&mut page, element_blocking_config());

    let input = ListenTarget::Element(ElementId(5));
    let other = ListenTarget::Element(ElementId(6));
    let (listener, count) = counting_listener();
    engine.subscribe(&mut page, input, "focus", listener, SubscribeOptions::default());

    engine.apply_config(&mut page, SpoofConfig::default());
    assert_eq!(engine.element_listener_count(), 0);
    assert_eq!(page.native_listener_count(input, "focus"), 1);
    assert_eq!(page.native_listener_count(other, "focus"), 0);

    page.fire_native(input, &PageEvent::signal(SignalKind::Focus));
    assert_eq!(count.get(), 1);
}

#[tokio::test]
async fn unsubscribe_while_shadowed_removes_the_stored_entry() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::new();
    engine.apply_config(&mut page, element_blocking_config());

    let element = ListenTarget::Element(ElementId(3));
    let (listener, _) = counting_listener();
    engine.subscribe(
        &mut page,
        element,
        "focusout",
        listener.clone(),
        SubscribeOptions::default(),
    );
    assert_eq!(engine.element_listener_count(), 1);

    engine.unsubscribe(&mut page, element, "focusout", &listener);
    assert_eq!(engine.element_listener_count(), 0);

    // Nothing left to restore once blocking is lifted.
    engine.apply_config(&mut page, SpoofConfig::default());
    assert_eq!(page.native_listener_count(element, "focusout"), 0);
}
