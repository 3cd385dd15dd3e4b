use rand::Rng;
use tokio::time::Duration;

use super::config::SpoofConfig;
use super::events::{PageEvent, SignalKind};
use crate::page::Viewport;

/// Weight applied to the decoy range when it is mixed into the burst delay.
/// Tunable, not load-bearing; it exists so the two ranges never collapse
/// into one detectable period.
const DECOY_WEIGHT: f64 = 0.2;

/// Pointer coordinates stay this far inside the viewport edges.
const EDGE_INSET: u64 = 10;

/// Inclusive uniform sample that tolerates a violated `min <= max`
/// invariant by collapsing to the single value `min`.
pub(crate) fn uniform_between<R: Rng>(rng: &mut R, min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

fn uniform_signed<R: Rng>(rng: &mut R, radius: u32) -> i32 {
    if radius == 0 {
        return 0;
    }
    let radius = i64::from(radius);
    rng.gen_range(-radius..=radius) as i32
}

/// Delay until the next burst: the fake-activity range plus, when decoy
/// timing is on, a down-weighted sample from the second range.
pub fn next_burst_delay<R: Rng>(rng: &mut R, config: &SpoofConfig) -> Duration {
    let base = uniform_between(rng, config.fake_activity.min, config.fake_activity.max);
    let decoy = if config.decoy_timing.enabled {
        let sample = uniform_between(rng, config.decoy_timing.min, config.decoy_timing.max);
        (sample as f64 * DECOY_WEIGHT) as u64
    } else {
        0
    };
    Duration::from_millis(base + decoy)
}

/// One burst's worth of synthetic signals, planned up front so dispatch is
/// a straight walk over the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstPlan {
    /// Focus and visibility-change, in per-burst randomized order.
    pub signals: [SignalKind; 2],
    pub pointer: PageEvent,
}

pub fn plan_burst<R: Rng>(rng: &mut R, viewport: Viewport, move_radius: u32) -> BurstPlan {
    let signals = if rng.gen_bool(0.5) {
        [SignalKind::Focus, SignalKind::VisibilityChange]
    } else {
        [SignalKind::VisibilityChange, SignalKind::Focus]
    };
    let client_x = uniform_between(
        rng,
        EDGE_INSET,
        u64::from(viewport.width).saturating_sub(EDGE_INSET),
    ) as i32;
    let client_y = uniform_between(
        rng,
        EDGE_INSET,
        u64::from(viewport.height).saturating_sub(EDGE_INSET),
    ) as i32;
    BurstPlan {
        signals,
        pointer: PageEvent::PointerMove {
            client_x,
            client_y,
            movement_x: uniform_signed(rng, move_radius),
            movement_y: uniform_signed(rng, move_radius),
        },
    }
}
