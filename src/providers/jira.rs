use async_trait::async_trait;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::{IssueTracker, Sprint, SprintState};
use crate::config::ConnectionSettings;
use crate::error::{EtlError, EtlResult};
use crate::model::issue::CUSTOM_FIELDS;

const STANDARD_FIELDS: [&str; 13] = [
    "summary",
    "priority",
    "labels",
    "assignee",
    "status",
    "creator",
    "timespent",
    "project",
    "created",
    "updated",
    "description",
    "parent",
    "worklog",
];

const SPRINT_PAGE_SIZE: usize = 50;
const WORKLOG_PAGE_SIZE: usize = 1000;

const SEARCH_PATH: &str = "/rest/api/3/search";
/// Data Center servers only serve search on the v2 API.
const LEGACY_SEARCH_PATH: &str = "/rest/api/2/search";

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
    legacy_search: AtomicBool,
}

impl JiraClient {
    pub fn new(server: &str, email: &str, api_token: &str) -> Self {
        let creds = format!("{email}:{api_token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: base_url_for(server),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
            legacy_search: AtomicBool::new(false),
        }
    }

    /// Build a client and check the credentials against the server.
    pub async fn connect(settings: &ConnectionSettings) -> EtlResult<Self> {
        let client = Self::new(&settings.server, &settings.email, &settings.api_token);
        let _: Value = client.get_json("/rest/api/3/myself").await?;
        info!("Connected to Jira at {}", client.base_url());
        Ok(client)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path_and_query: &str) -> EtlResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("GET {url}");

        self.client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| EtlError::Connectivity(format!("Jira API request failed: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> EtlResult<T> {
        let resp = self.get(path_and_query).await?;
        Self::decode(path_and_query, resp).await
    }

    async fn decode<T: DeserializeOwned>(
        path_and_query: &str,
        resp: reqwest::Response,
    ) -> EtlResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(300).collect();
            return Err(EtlError::Connectivity(format!(
                "Jira returned {status} for {path_and_query}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| EtlError::Decode(format!("{path_and_query}: {e}")))
    }
}

/// A bare site name such as `acme` expands to its Atlassian Cloud URL;
/// anything with a scheme is used as given.
fn base_url_for(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.contains("://") {
        server.to_string()
    } else {
        format!("https://{server}.atlassian.net")
    }
}

/// The v3 search endpoint is gone on servers that answer 404 or 410.
fn search_retired(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE
}

fn search_fields() -> String {
    STANDARD_FIELDS
        .iter()
        .chain(CUSTOM_FIELDS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SprintPage {
    #[serde(default)]
    values: Vec<Sprint>,
    is_last: Option<bool>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RemoteIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteIssue {
    pub key: String,
    pub fields: RemoteFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteFields {
    pub summary: Option<String>,
    pub priority: Option<NamedField>,
    pub labels: Option<Vec<String>>,
    pub assignee: Option<RemoteUser>,
    pub status: Option<NamedField>,
    pub creator: Option<RemoteUser>,
    pub timespent: Option<i64>,
    pub project: Option<NamedField>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub description: Option<Value>,
    pub parent: Option<ParentRef>,
    pub worklog: Option<WorklogPage>,
    /// `customfield_*` slots and anything else the server sends.
    #[serde(flatten)]
    pub custom: HashMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedField {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorklogPage {
    #[serde(default)]
    pub worklogs: Vec<RemoteWorklog>,
    /// How many worklogs the issue has, embedded or not.
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorklog {
    pub author: Option<RemoteUser>,
    pub comment: Option<Value>,
    pub created: Option<String>,
    pub started: Option<String>,
    pub time_spent: Option<String>,
    pub time_spent_seconds: Option<i64>,
}

impl RemoteIssue {
    /// Embedded worklogs in the order the server returned them.
    pub fn worklogs(&self) -> &[RemoteWorklog] {
        self.fields
            .worklog
            .as_ref()
            .map(|w| w.worklogs.as_slice())
            .unwrap_or(&[])
    }

    /// Worklogs the search payload left out. Jira embeds only the first
    /// page (20 entries) of an issue's worklogs.
    pub fn missing_worklogs(&self) -> usize {
        let embedded = self.worklogs().len();
        self.fields
            .worklog
            .as_ref()
            .and_then(|w| w.total)
            .map_or(0, |total| total.saturating_sub(embedded))
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    fn name(&self) -> &str {
        "Jira"
    }

    async fn list_sprints(
        &self,
        board_id: &str,
        states: &[SprintState],
    ) -> EtlResult<Vec<Sprint>> {
        let state = states
            .iter()
            .map(SprintState::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let mut sprints = Vec::new();
        let mut start_at = 0;

        loop {
            let page: SprintPage = self
                .get_json(&format!(
                    "/rest/agile/1.0/board/{}/sprint?state={}&startAt={}&maxResults={}",
                    urlencoding::encode(board_id),
                    state,
                    start_at,
                    SPRINT_PAGE_SIZE
                ))
                .await?;
            let fetched = page.values.len();
            sprints.extend(page.values);
            if page.is_last.unwrap_or(true) || fetched == 0 {
                break;
            }
            start_at += fetched;
        }

        Ok(sprints)
    }

    async fn search_issues(
        &self,
        jql: &str,
        start_at: usize,
        max_results: usize,
    ) -> EtlResult<Vec<RemoteIssue>> {
        let query = format!(
            "?jql={}&startAt={}&maxResults={}&fields={}",
            urlencoding::encode(jql),
            start_at,
            max_results,
            search_fields()
        );

        if !self.legacy_search.load(Ordering::Relaxed) {
            let path = format!("{SEARCH_PATH}{query}");
            let resp = self.get(&path).await?;
            if !search_retired(resp.status()) {
                let search: SearchResponse = Self::decode(&path, resp).await?;
                return Ok(search.issues);
            }
            warn!(
                "{SEARCH_PATH} answered {}, using {LEGACY_SEARCH_PATH}",
                resp.status()
            );
            self.legacy_search.store(true, Ordering::Relaxed);
        }

        let search: SearchResponse = self
            .get_json(&format!("{LEGACY_SEARCH_PATH}{query}"))
            .await?;
        Ok(search.issues)
    }

    async fn issue_worklogs(&self, issue_key: &str) -> EtlResult<Vec<RemoteWorklog>> {
        let mut worklogs = Vec::new();
        let mut start_at = 0;

        loop {
            let page: WorklogPage = self
                .get_json(&format!(
                    "/rest/api/3/issue/{}/worklog?startAt={}&maxResults={}",
                    urlencoding::encode(issue_key),
                    start_at,
                    WORKLOG_PAGE_SIZE
                ))
                .await?;
            let fetched = page.worklogs.len();
            worklogs.extend(page.worklogs);
            start_at += fetched;
            if fetched == 0 || start_at >= page.total.unwrap_or(0) {
                break;
            }
        }

        Ok(worklogs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn site_name_expands_to_cloud_url() {
        assert_eq!(base_url_for("acme"), "https://acme.atlassian.net");
        assert_eq!(
            base_url_for("https://jira.acme.io/"),
            "https://jira.acme.io"
        );
    }

    #[test]
    fn basic_auth_header_encodes_email_and_token() {
        let client = JiraClient::new("acme", "ana@acme.io", "tok");
        let expected = base64::engine::general_purpose::STANDARD.encode("ana@acme.io:tok");
        assert_eq!(client.auth_header, format!("Basic {expected}"));
        assert_eq!(client.base_url(), "https://acme.atlassian.net");
    }

    #[test]
    fn search_requests_custom_fields() {
        let fields = search_fields();
        assert!(fields.starts_with("summary,priority"));
        assert!(fields.contains("worklog"));
        assert!(fields.contains("customfield_10090"));
        assert!(fields.ends_with("customfield_10152"));
    }

    #[test]
    fn search_payload_decodes() {
        let payload = json!({
            "startAt": 0,
            "maxResults": 100,
            "total": 1,
            "issues": [{
                "id": "10001",
                "key": "IW-696",
                "fields": {
                    "summary": "Reconcile invoices",
                    "priority": {"name": "Medium", "id": "3"},
                    "labels": [],
                    "assignee": null,
                    "status": {"name": "Done"},
                    "creator": {"displayName": "Ana", "accountId": "abc"},
                    "timespent": null,
                    "project": {"key": "IW", "name": "Gestão de Atividades"},
                    "customfield_10163": "Contábil",
                    "worklog": {
                        "startAt": 0,
                        "maxResults": 20,
                        "total": 1,
                        "worklogs": [{
                            "author": {"displayName": "Bruno"},
                            "comment": {
                                "type": "doc",
                                "version": 1,
                                "content": [{
                                    "type": "paragraph",
                                    "content": [{"type": "text", "text": "review"}]
                                }]
                            },
                            "created": "2024-03-05T14:31:12.512+0000",
                            "started": "2024-03-05T14:30:00.000+0000",
                            "timeSpent": "30m",
                            "timeSpentSeconds": 1800
                        }]
                    }
                }
            }]
        });

        let search: SearchResponse = serde_json::from_value(payload).unwrap();
        let issue = &search.issues[0];
        assert_eq!(issue.key, "IW-696");
        assert!(issue.fields.assignee.is_none());
        assert_eq!(
            issue.fields.custom.get("customfield_10163"),
            Some(&json!("Contábil"))
        );
        assert_eq!(issue.worklogs().len(), 1);
        assert_eq!(issue.worklogs()[0].time_spent_seconds, Some(1800));
        assert_eq!(issue.missing_worklogs(), 0);
    }

    #[test]
    fn worklog_total_beyond_embedded_page_is_counted() {
        let worklogs: Vec<_> = (0..20)
            .map(|n| json!({"author": {"displayName": format!("A{n}")}}))
            .collect();
        let issue: RemoteIssue = serde_json::from_value(json!({
            "key": "IW-25",
            "fields": {
                "worklog": {"startAt": 0, "maxResults": 20, "total": 25, "worklogs": worklogs}
            }
        }))
        .unwrap();

        assert_eq!(issue.worklogs().len(), 20);
        assert_eq!(issue.missing_worklogs(), 5);
    }

    #[test]
    fn worklog_without_total_is_complete() {
        let issue: RemoteIssue = serde_json::from_value(json!({
            "key": "IW-2",
            "fields": {"worklog": {"worklogs": [{"timeSpentSeconds": 60}]}}
        }))
        .unwrap();
        assert_eq!(issue.missing_worklogs(), 0);
    }

    #[test]
    fn only_missing_search_endpoint_switches_to_legacy() {
        assert!(search_retired(reqwest::StatusCode::GONE));
        assert!(search_retired(reqwest::StatusCode::NOT_FOUND));
        assert!(!search_retired(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!search_retired(reqwest::StatusCode::OK));
    }

    #[test]
    fn new_client_starts_on_the_v3_search() {
        let client = JiraClient::new("acme", "ana@acme.io", "tok");
        assert!(!client.legacy_search.load(Ordering::Relaxed));
    }

    #[test]
    fn sprint_page_decodes_states() {
        let page: SprintPage = serde_json::from_value(json!({
            "maxResults": 50,
            "startAt": 0,
            "isLast": true,
            "values": [
                {"id": 7, "state": "closed", "name": "Sprint 1", "originBoardId": 3},
                {"id": 8, "state": "active", "name": "Sprint 2", "originBoardId": 3}
            ]
        }))
        .unwrap();
        assert_eq!(page.is_last, Some(true));
        assert_eq!(page.values[1].state, SprintState::Active);
        assert_eq!(page.values[0].name, "Sprint 1");
    }

    #[test]
    fn issue_without_worklog_field_has_no_entries() {
        let issue: RemoteIssue =
            serde_json::from_value(json!({"key": "IW-1", "fields": {}})).unwrap();
        assert!(issue.worklogs().is_empty());
    }
}
