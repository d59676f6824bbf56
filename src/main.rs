mod config;
mod error;
mod model;
mod pipeline;
mod providers;
mod telemetry;
mod util;

use std::path::Path;

use anyhow::Result;
use tracing::info;

use config::ConnectionOverrides;
use telemetry::RunLog;

const OUTPUT_PATH: &str = "data/processed/";
const OUTPUT_NAME: &str = "extraction_jira.csv";
const LOG_PATH: &str = "app.log";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logging first so every later failure lands in the log file
    let log = RunLog::init(LOG_PATH)?;
    info!("Logging to {}", log.path().display());

    let result = pipeline::run(
        ConnectionOverrides::default(),
        Path::new(OUTPUT_PATH),
        OUTPUT_NAME,
    )
    .await;

    log.finish(result)?;
    Ok(())
}
