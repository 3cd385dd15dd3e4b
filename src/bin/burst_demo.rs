use anyhow::Result;
use tokio::time::{sleep, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wraith::engine::{DecoyTiming, FakeActivity, SpoofConfig, SpoofEngine};
use wraith::page::SimulatedPage;

/// Runs the engine against a simulated page for a few seconds and prints the
/// outbound event stream, so the burst cadence can be eyeballed.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut page = SimulatedPage::new();
    page.set_hidden(true);

    let (mut engine, mut events) = SpoofEngine::new();
    engine.install(&mut page);
    engine.apply_config(
        &mut page,
        SpoofConfig {
            spoofing_enabled: true,
            block_events: true,
            logging_enabled: true,
            fake_activity: FakeActivity {
                enabled: true,
                min: 300,
                max: 900,
                ..FakeActivity::default()
            },
            decoy_timing: DecoyTiming {
                enabled: true,
                min: 200,
                max: 600,
            },
            ..SpoofConfig::default()
        },
    );

    info!(
        hidden = engine.hidden(&page),
        has_focus = engine.has_focus(&page),
        "page presented as"
    );

    for _ in 0..60 {
        sleep(Duration::from_millis(100)).await;
        engine.pump(&mut page);
        while let Ok(event) = events.try_recv() {
            let line = serde_json::to_string(&event)?;
            info!(event = %line, "engine event");
        }
    }

    let dispatched = page.take_dispatched();
    info!(count = dispatched.len(), "synthetic dispatches");
    Ok(())
}
