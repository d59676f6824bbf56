use tracing::{info, warn};

use crate::error::EtlResult;
use crate::model::issue::{FlatRow, IssueRecord, TimeLogEntry, NO_SPRINT};
use crate::providers::jira::{RemoteIssue, RemoteWorklog};
use crate::providers::{IssueTracker, Sprint, SprintState};

pub const PAGE_SIZE: usize = 100;

const SPRINT_STATES: [SprintState; 2] = [SprintState::Active, SprintState::Closed];

/// Sprint id to name, in the order the board listed them. A repeated id
/// keeps its first position and its last name.
#[derive(Debug, Default)]
pub struct SprintMap {
    entries: Vec<(u64, String)>,
    active: usize,
}

impl SprintMap {
    pub fn from_sprints(sprints: &[Sprint]) -> Self {
        let mut entries: Vec<(u64, String)> = Vec::new();
        let mut active = 0;
        for sprint in sprints {
            if sprint.state == SprintState::Active {
                active += 1;
            }
            match entries.iter_mut().find(|(id, _)| *id == sprint.id) {
                Some(entry) => entry.1 = sprint.name.clone(),
                None => entries.push((sprint.id, sprint.name.clone())),
            }
        }
        Self { entries, active }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sprints the board reported as active.
    pub fn active(&self) -> usize {
        self.active
    }
}

fn quote_jql(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn sprint_jql(project_key: &str, sprint_id: u64) -> String {
    format!(
        "project = {} AND sprint = {sprint_id} ORDER BY created DESC",
        quote_jql(project_key)
    )
}

pub fn backlog_jql(project_key: &str) -> String {
    format!(
        "project = {} AND sprint is EMPTY ORDER BY created DESC",
        quote_jql(project_key)
    )
}

/// Pull every issue of `project_key` in the board's active and closed
/// sprints, then the project's sprint-less issues, one row per
/// (issue, worklog) pair.
pub async fn extract(
    tracker: &dyn IssueTracker,
    board_id: &str,
    project_key: &str,
) -> EtlResult<Vec<FlatRow>> {
    let sprints = tracker.list_sprints(board_id, &SPRINT_STATES).await?;
    let sprint_map = SprintMap::from_sprints(&sprints);
    info!(
        "Found {} sprints ({} active) on {} board {board_id}",
        sprint_map.len(),
        sprint_map.active(),
        tracker.name()
    );

    let mut rows = Vec::new();

    info!("Processing issues with sprints");
    for (sprint_id, sprint_name) in sprint_map.iter() {
        let jql = sprint_jql(project_key, sprint_id);
        rows.extend(extract_query(tracker, &jql, sprint_name).await?);
    }
    info!("Finished issues with sprints");

    info!("Processing issues without sprint");
    rows.extend(extract_query(tracker, &backlog_jql(project_key), NO_SPRINT).await?);
    info!("Finished issues without sprint");

    info!("Extraction finished with {} rows", rows.len());
    Ok(rows)
}

/// Walk one JQL query page by page. A page shorter than `PAGE_SIZE` ends
/// the walk, so an exact multiple of the page size costs one empty request.
async fn extract_query(
    tracker: &dyn IssueTracker,
    jql: &str,
    sprint_name: &str,
) -> EtlResult<Vec<FlatRow>> {
    let mut rows = Vec::new();
    let mut start_at = 0;

    loop {
        let issues = tracker.search_issues(jql, start_at, PAGE_SIZE).await?;
        info!("Found {} issues starting at {start_at}", issues.len());

        for issue in &issues {
            rows.extend(issue_rows(tracker, issue, sprint_name).await?);
        }

        start_at += PAGE_SIZE;
        if issues.len() < PAGE_SIZE {
            break;
        }
    }

    Ok(rows)
}

/// Rows for one issue. When the search payload embedded only part of the
/// issue's worklogs, the full list is fetched from the tracker.
async fn issue_rows(
    tracker: &dyn IssueTracker,
    issue: &RemoteIssue,
    sprint_name: &str,
) -> EtlResult<Vec<FlatRow>> {
    let missing = issue.missing_worklogs();
    if missing == 0 {
        return Ok(flatten_issue(issue, issue.worklogs(), sprint_name));
    }

    info!("{} has {missing} worklogs beyond the search page, fetching all", issue.key);
    let worklogs = tracker.issue_worklogs(&issue.key).await?;
    let expected = issue.worklogs().len() + missing;
    if worklogs.len() < expected {
        warn!(
            "{} lists {expected} worklogs but only {} were returned",
            issue.key,
            worklogs.len()
        );
    }
    Ok(flatten_issue(issue, &worklogs, sprint_name))
}

fn flatten_issue(
    issue: &RemoteIssue,
    worklogs: &[RemoteWorklog],
    sprint_name: &str,
) -> Vec<FlatRow> {
    let entries = worklogs.iter().map(TimeLogEntry::from_remote).collect();
    IssueRecord::from_remote(issue, sprint_name).into_rows(entries)
}
