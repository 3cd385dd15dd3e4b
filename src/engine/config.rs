use serde::{Deserialize, Serialize};

/// Policy pushed by the external config distributor. Replaced wholesale on
/// every push; fields missing from a payload take the baseline defaults,
/// which is what gives partial payloads merge-over-defaults semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpoofConfig {
    pub spoofing_enabled: bool,
    pub block_events: bool,
    pub logging_enabled: bool,
    pub element_focus_blocking: bool,
    pub fake_activity: FakeActivity,
    pub decoy_timing: DecoyTiming,
    pub allowlisted: bool,
    pub paused_reason: Option<String>,
}

impl Default for SpoofConfig {
    fn default() -> Self {
        Self {
            spoofing_enabled: false,
            block_events: false,
            logging_enabled: false,
            element_focus_blocking: false,
            fake_activity: FakeActivity::default(),
            decoy_timing: DecoyTiming::default(),
            allowlisted: false,
            paused_reason: None,
        }
    }
}

impl SpoofConfig {
    /// Event suppression requires both flags; spoofing alone only forces the
    /// state properties.
    pub fn should_block(&self) -> bool {
        self.block_events && self.spoofing_enabled
    }
}

/// Timing and shape of fabricated activity bursts. `min`/`max` are
/// milliseconds; a violated `min <= max` invariant collapses to a
/// single-value range rather than being rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FakeActivity {
    pub enabled: bool,
    pub min: u64,
    pub max: u64,
    pub jitter: f64,
    pub move_radius: u32,
}

impl Default for FakeActivity {
    fn default() -> Self {
        Self {
            enabled: false,
            min: 1000,
            max: 4000,
            jitter: 0.25,
            move_radius: 12,
        }
    }
}

/// Second randomized range mixed into the burst delay so the scheduler has
/// no single detectable period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoyTiming {
    pub enabled: bool,
    pub min: u64,
    pub max: u64,
}

impl Default for DecoyTiming {
    fn default() -> Self {
        Self {
            enabled: true,
            min: 800,
            max: 2500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_baseline() {
        let config = SpoofConfig::default();
        assert!(!config.spoofing_enabled);
        assert!(!config.should_block());
        assert_eq!(config.fake_activity.min, 1000);
        assert_eq!(config.fake_activity.max, 4000);
        assert_eq!(config.fake_activity.move_radius, 12);
        assert!(config.decoy_timing.enabled);
        assert_eq!(config.decoy_timing.min, 800);
        assert!(config.paused_reason.is_none());
    }

    #[test]
    fn partial_payload_merges_over_defaults() {
        let config: SpoofConfig = serde_json::from_value(json!({
            "spoofingEnabled": true,
            "fakeActivity": { "enabled": true, "min": 250 }
        }))
        .expect("partial payload");
        assert!(config.spoofing_enabled);
        assert!(!config.block_events);
        assert!(config.fake_activity.enabled);
        assert_eq!(config.fake_activity.min, 250);
        // Unspecified nested fields still come from the baseline.
        assert_eq!(config.fake_activity.max, 4000);
        assert!(config.decoy_timing.enabled);
    }

    #[test]
    fn should_block_requires_both_flags() {
        let mut config = SpoofConfig {
            block_events: true,
            ..SpoofConfig::default()
        };
        assert!(!config.should_block());
        config.spoofing_enabled = true;
        assert!(config.should_block());
    }
}
