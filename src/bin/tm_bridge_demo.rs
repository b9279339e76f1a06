//! Demo driver for the bridge.
//!
//! Runs one simulated V5RC fieldset through a short match and prints every
//! snapshot change as a JSON line. Set `TM_BRIDGE_CONFIG` to a JSON file to
//! override engine settings and `RUST_LOG` to adjust logging.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tm_bridge::{
    AudienceDisplay, AutonomousBonus, BridgeEngine, Competition, EngineConfig, FieldsetState, SimulatedInspector,
};

const TITLE: &str = "Match Field Set #1";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = match std::env::var("TM_BRIDGE_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(Path::new(&path))?,
        Err(_) => EngineConfig::default(),
    };
    info!(
        low_cpu_usage = config.low_cpu_usage,
        cache_cycle = config.cache_cycle,
        poll_interval_ms = config.poll_interval_ms,
        "configuration loaded"
    );

    let inspector = Arc::new(SimulatedInspector::new());
    let target = inspector.add_fieldset(TITLE, Competition::V5rc);

    let engine = BridgeEngine::new(Competition::V5rc, inspector, config);
    engine.start()?;
    let fieldset = engine.get_fieldset(TITLE)?;
    let stream = fieldset.stream();

    let printer = thread::Builder::new().name("tm-bridge-demo-printer".to_string()).spawn(move || {
        // Quiet for a full second means the demo is over.
        while let Ok(event) = stream.recv_timeout(Duration::from_secs(1)) {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(error = %err, "failed to encode event"),
            }
        }
    })?;

    let pause = Duration::from_millis(200);
    fieldset.set_audience_display(AudienceDisplay::Intro)?;
    thread::sleep(pause);
    fieldset.start_match()?;
    fieldset.set_audience_display(AudienceDisplay::InMatch)?;
    thread::sleep(pause);

    target.update(|s| {
        s.state = FieldsetState::Pause;
        s.timer = Some("0:00".to_string());
    });
    fieldset.set_autonomous_bonus(AutonomousBonus::Red)?;
    thread::sleep(pause);

    fieldset.start_match()?;
    target.update(|s| s.timer = Some("1:45".to_string()));
    thread::sleep(pause);

    fieldset.end_early()?;
    thread::sleep(pause);
    fieldset.reset_timer()?;
    fieldset.set_audience_display(AudienceDisplay::SavedMatchResults)?;
    thread::sleep(pause);

    engine.stop();
    if printer.join().is_err() {
        tracing::warn!("printer thread panicked");
    }
    info!("demo finished");
    Ok(())
}
