pub mod jira;

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use crate::error::EtlResult;
use jira::{RemoteIssue, RemoteWorklog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    Active,
    Closed,
    Future,
}

impl SprintState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Active => "active",
            SprintState::Closed => "closed",
            SprintState::Future => "future",
        }
    }
}

impl fmt::Display for SprintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: SprintState,
}

/// The remote issue tracker as seen by the extractor.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn name(&self) -> &str;

    /// Every sprint on `board_id` whose state is one of `states`.
    async fn list_sprints(&self, board_id: &str, states: &[SprintState])
        -> EtlResult<Vec<Sprint>>;

    /// One page of a JQL search.
    async fn search_issues(
        &self,
        jql: &str,
        start_at: usize,
        max_results: usize,
    ) -> EtlResult<Vec<RemoteIssue>>;

    /// Every worklog of one issue, for issues whose search payload
    /// embedded only part of them.
    async fn issue_worklogs(&self, issue_key: &str) -> EtlResult<Vec<RemoteWorklog>>;
}
