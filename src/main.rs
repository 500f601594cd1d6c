use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;

use gazelab::sim::{ConsoleDisplay, LocalBackend, SimulatedSource};
use gazelab::{SessionConfig, SessionController};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("gazelab demo session starting");

    let display = Arc::new(ConsoleDisplay::new(1280.0, 800.0));
    // Predictions land 40 px left and 25 px below the true fixation point;
    // calibration should recover roughly {ax: 1, bx: 40, ay: 1, by: -25}.
    let source = Arc::new(SimulatedSource::new(-40.0, 25.0, (640.0, 400.0)));
    let backend = Arc::new(LocalBackend::new());

    // Compressed timing so the demo finishes in seconds rather than a minute.
    let mut config = SessionConfig::default();
    config.tick = Duration::from_millis(200);
    config.calibration.target_budget = Duration::from_millis(400);

    let mut controller = SessionController::new(config, source, display, backend);
    controller.start_session("30", "female")?;

    let report = controller.run().await?;
    info!(
        "session {} complete, mapping {:?}",
        controller.session_id(),
        controller.pipeline().mapping().await
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    controller.restart().await;
    Ok(())
}
