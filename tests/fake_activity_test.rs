use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use wraith::engine::events::{ListenTarget, Listener, PageEvent, SignalKind, SubscribeOptions};
use wraith::engine::{DecoyTiming, FakeActivity, SpoofConfig, SpoofEngine};
use wraith::page::SimulatedPage;

fn counting_listener() -> (Listener, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    let count_ref = Rc::clone(&count);
    let listener = Listener::function(move |_| count_ref.set(count_ref.get() + 1));
    (listener, count)
}

fn burst_config(min: u64, max: u64, decoy: Option<(u64, u64)>, move_radius: u32) -> SpoofConfig {
    SpoofConfig {
        spoofing_enabled: true,
        block_events: true,
        fake_activity: FakeActivity {
            enabled: true,
            min,
            max,
            jitter: 0.0,
            move_radius,
        },
        decoy_timing: match decoy {
            Some((min, max)) => DecoyTiming {
                enabled: true,
                min,
                max,
            },
            None => DecoyTiming {
                enabled: false,
                ..DecoyTiming::default()
            },
        },
        ..SpoofConfig::default()
    }
}

/// Advance the paused clock and give the timer tasks a chance to queue
/// their expirations.
async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn burst_fires_at_exactly_the_configured_delay() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::with_seed(42);

    let (focus_listener, focus_count) = counting_listener();
    engine.subscribe(
        &mut page,
        ListenTarget::Window,
        "focus",
        focus_listener,
        SubscribeOptions::default(),
    );

    engine.apply_config(&mut page, burst_config(1000, 1000, None, 10));
    assert!(!engine.scheduler_idle());

    advance(999).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 0);
    assert!(page.dispatched().is_empty());

    advance(1).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 1);

    // The suppressed listener saw the replay exactly once.
    assert_eq!(focus_count.get(), 1);

    let dispatched = page.take_dispatched();
    let focus_targets: Vec<ListenTarget> = dispatched
        .iter()
        .filter(|(_, event)| matches!(event, PageEvent::Signal { kind: SignalKind::Focus }))
        .map(|(target, _)| *target)
        .collect();
    assert_eq!(focus_targets, vec![ListenTarget::Window, ListenTarget::Document]);
    assert_eq!(
        dispatched
            .iter()
            .filter(|(target, event)| *target == ListenTarget::Document
                && matches!(event, PageEvent::Signal { kind: SignalKind::VisibilityChange }))
            .count(),
        1
    );

    let pointer_moves: Vec<&PageEvent> = dispatched
        .iter()
        .filter(|(_, event)| matches!(event, PageEvent::PointerMove { .. }))
        .map(|(_, event)| event)
        .collect();
    assert_eq!(pointer_moves.len(), 1);
    let PageEvent::PointerMove {
        movement_x,
        movement_y,
        ..
    } = pointer_moves[0]
    else {
        unreachable!();
    };
    assert!((-10..=10).contains(movement_x));
    assert!((-10..=10).contains(movement_y));

    // The scheduler re-armed itself for the next burst.
    assert!(!engine.scheduler_idle());
    advance(1000).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 2);
    assert_eq!(focus_count.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn decoy_timing_is_mixed_into_the_delay() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::with_seed(7);

    // Degenerate ranges make the delay exact: 1000 + 0.2 * 1000.
    engine.apply_config(&mut page, burst_config(1000, 1000, Some((1000, 1000)), 12));

    advance(1199).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 0);

    advance(1).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 1);
}

#[tokio::test(start_paused = true)]
async fn once_subscriptions_are_consumed_by_the_first_replay() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::with_seed(11);

    let (listener, count) = counting_listener();
    engine.subscribe(
        &mut page,
        ListenTarget::Document,
        "visibilitychange",
        listener,
        SubscribeOptions::once(),
    );
    engine.apply_config(&mut page, burst_config(500, 500, None, 12));

    advance(500).await;
    engine.pump(&mut page);
    assert_eq!(count.get(), 1);
    assert_eq!(engine.blocked_listener_count(), 0);

    advance(500).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 2);
    assert_eq!(count.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabling_fake_activity_parks_the_scheduler() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::with_seed(3);

    engine.apply_config(&mut page, burst_config(400, 400, None, 12));
    assert!(!engine.scheduler_idle());

    engine.apply_config(&mut page, SpoofConfig::default());
    assert!(engine.scheduler_idle());

    advance(5000).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 0);
    assert!(page.dispatched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn page_teardown_stops_the_activity_timer() {
    let mut page = SimulatedPage::new();
    let (mut engine, _events) = SpoofEngine::with_seed(5);

    engine.apply_config(&mut page, burst_config(400, 400, None, 12));
    engine.on_page_hide();
    assert!(engine.scheduler_idle());

    advance(5000).await;
    engine.pump(&mut page);
    assert_eq!(engine.metrics().synthetic_bursts, 0);

    // A late policy push cannot revive the torn-down page.
    engine.apply_config(&mut page, burst_config(400, 400, None, 12));
    assert!(engine.scheduler_idle());
}
