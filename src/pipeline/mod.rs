pub mod extract;
pub mod load;
pub mod transform;

use std::path::{Path, PathBuf};

use crate::config::{ConnectionOverrides, ConnectionSettings};
use crate::error::{EtlError, EtlResult};
use crate::model::table::RecordTable;
use crate::providers::jira::JiraClient;
use crate::providers::IssueTracker;
use crate::telemetry::observe;

/// Resolve settings, connect to Jira and run every stage.
pub async fn run(
    overrides: ConnectionOverrides,
    output_dir: &Path,
    output_name: &str,
) -> EtlResult<PathBuf> {
    let (client, settings) = observe("connect", async {
        let settings = ConnectionSettings::resolve(overrides)?;
        let client = JiraClient::connect(&settings).await?;
        Ok::<_, EtlError>((client, settings))
    })
    .await?;

    run_with_tracker(
        &client,
        &settings.board_id,
        &settings.project_key,
        output_dir,
        output_name,
    )
    .await
}

pub async fn run_with_tracker(
    tracker: &dyn IssueTracker,
    board_id: &str,
    project_key: &str,
    output_dir: &Path,
    output_name: &str,
) -> EtlResult<PathBuf> {
    let rows = observe("extract", extract::extract(tracker, board_id, project_key)).await?;
    let table = observe("transform", async {
        transform::transform(RecordTable::from_rows(&rows))
    })
    .await?;
    observe("load", async { load::load(&table, output_dir, output_name) }).await
}
