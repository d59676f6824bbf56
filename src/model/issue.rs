use crate::providers::jira::{RemoteIssue, RemoteWorklog};
use crate::util::adf::{extract_text_from_adf, render_field_value};

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_PRIORITY: &str = "No Priority";
pub const UNASSIGNED: &str = "Unassigned";
pub const NO_TIME_SPENT: &str = "No Time Spent";
pub const NO_DESCRIPTION: &str = "No Description";
pub const NO_SPRINT: &str = "No Sprint";
pub const NO_AUTHOR: &str = "No Author";
pub const NO_COMMENT: &str = "No Comment";
pub const NO_WORKLOG: &str = "No Worklog";

pub const FIELD_CUSTOM_10160: &str = "customfield_10160";
pub const FIELD_CUSTOM_10163: &str = "customfield_10163";
pub const FIELD_CUSTOM_10175: &str = "customfield_10175";
pub const FIELD_REQUESTER_EMAIL: &str = "customfield_10090";
pub const FIELD_REQUESTER_NAME: &str = "customfield_10089";
pub const FIELD_START_DATE: &str = "customfield_10015";
pub const FIELD_END_DATE: &str = "customfield_10152";

pub const CUSTOM_FIELDS: [&str; 7] = [
    FIELD_CUSTOM_10160,
    FIELD_CUSTOM_10163,
    FIELD_CUSTOM_10175,
    FIELD_REQUESTER_EMAIL,
    FIELD_REQUESTER_NAME,
    FIELD_START_DATE,
    FIELD_END_DATE,
];

pub const COL_WORKLOG_CREATED: &str = "Worklog Created";
pub const COL_WORKLOG_STARTED: &str = "Worklog Started";

/// One issue's metadata with every optional attribute already resolved to
/// its value or sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRecord {
    pub key: String,
    pub summary: String,
    pub priority: String,
    pub labels: Vec<String>,
    pub assignee: String,
    pub status: String,
    pub creator: String,
    pub custom_10160: String,
    pub custom_10163: String,
    pub custom_10175: String,
    pub time_spent: String,
    pub project: String,
    /// Source format, left untouched by the transform stage.
    pub created: String,
    pub updated: String,
    pub description: String,
    pub sprint: String,
    pub requester_email: String,
    pub requester_name: String,
    pub start_date: String,
    pub end_date: String,
    pub parent: String,
}

impl IssueRecord {
    pub fn from_remote(issue: &RemoteIssue, sprint: &str) -> Self {
        let fields = &issue.fields;
        let custom = |id: &str| {
            fields
                .custom
                .get(id)
                .and_then(render_field_value)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        Self {
            key: issue.key.clone(),
            summary: fields.summary.clone().unwrap_or_default(),
            priority: fields
                .priority
                .as_ref()
                .and_then(|p| p.name.clone())
                .unwrap_or_else(|| NO_PRIORITY.to_string()),
            labels: fields.labels.clone().unwrap_or_default(),
            assignee: fields
                .assignee
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            status: fields
                .status
                .as_ref()
                .and_then(|s| s.name.clone())
                .unwrap_or_default(),
            creator: fields
                .creator
                .as_ref()
                .and_then(|c| c.display_name.clone())
                .unwrap_or_default(),
            custom_10160: custom(FIELD_CUSTOM_10160),
            custom_10163: custom(FIELD_CUSTOM_10163),
            custom_10175: custom(FIELD_CUSTOM_10175),
            time_spent: fields
                .timespent
                .filter(|secs| *secs != 0)
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| NO_TIME_SPENT.to_string()),
            project: fields
                .project
                .as_ref()
                .and_then(|p| p.name.clone())
                .unwrap_or_default(),
            created: fields.created.clone().unwrap_or_default(),
            updated: fields.updated.clone().unwrap_or_default(),
            description: fields
                .description
                .as_ref()
                .and_then(extract_text_from_adf)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            sprint: sprint.to_string(),
            requester_email: custom(FIELD_REQUESTER_EMAIL),
            requester_name: custom(FIELD_REQUESTER_NAME),
            start_date: custom(FIELD_START_DATE),
            end_date: custom(FIELD_END_DATE),
            parent: fields
                .parent
                .as_ref()
                .map(|p| p.key.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }

    /// One row per time-log entry, or a single sentinel row when there are
    /// none.
    pub fn into_rows(self, entries: Vec<TimeLogEntry>) -> Vec<FlatRow> {
        if entries.is_empty() {
            return vec![FlatRow {
                issue: self,
                worklog: TimeLogEntry::no_worklog(),
            }];
        }
        entries
            .into_iter()
            .map(|worklog| FlatRow {
                issue: self.clone(),
                worklog,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeLogEntry {
    pub author: String,
    pub comment: String,
    pub created: String,
    pub started: String,
    pub time_spent: String,
    pub time_spent_seconds: i64,
}

impl TimeLogEntry {
    pub fn from_remote(worklog: &RemoteWorklog) -> Self {
        Self {
            author: worklog
                .author
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| NO_AUTHOR.to_string()),
            comment: worklog
                .comment
                .as_ref()
                .and_then(extract_text_from_adf)
                .unwrap_or_else(|| NO_COMMENT.to_string()),
            created: worklog
                .created
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            started: worklog
                .started
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            time_spent: worklog
                .time_spent
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            time_spent_seconds: worklog.time_spent_seconds.unwrap_or(0),
        }
    }

    pub fn no_worklog() -> Self {
        Self {
            author: NO_WORKLOG.to_string(),
            comment: NO_WORKLOG.to_string(),
            created: NOT_AVAILABLE.to_string(),
            started: NOT_AVAILABLE.to_string(),
            time_spent: NOT_AVAILABLE.to_string(),
            time_spent_seconds: 0,
        }
    }
}

/// An issue merged with exactly one of its time-log entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRow {
    pub issue: IssueRecord,
    pub worklog: TimeLogEntry,
}

impl FlatRow {
    pub const COLUMNS: [&'static str; 27] = [
        "Issue Key",
        "Summary",
        "Priority",
        "Labels",
        "Assignee",
        "Status",
        "Creator",
        "Custom Field 10160",
        "Custom Field 10163",
        "Custom Field 10175",
        "Time Spent",
        "Project",
        "Created",
        "Updated",
        "Description",
        "Sprint",
        "E-mail Solicitante",
        "Nome do Solicitante",
        "Start Date",
        "End Data",
        "Parent",
        "Worklog Author",
        "Worklog Comment",
        COL_WORKLOG_CREATED,
        COL_WORKLOG_STARTED,
        "Worklog Time Spent",
        "Worklog Time Spent Seconds",
    ];

    /// Cell values in `COLUMNS` order.
    pub fn to_record(&self) -> Vec<String> {
        let i = &self.issue;
        let w = &self.worklog;
        vec![
            i.key.clone(),
            i.summary.clone(),
            i.priority.clone(),
            render_labels(&i.labels),
            i.assignee.clone(),
            i.status.clone(),
            i.creator.clone(),
            i.custom_10160.clone(),
            i.custom_10163.clone(),
            i.custom_10175.clone(),
            i.time_spent.clone(),
            i.project.clone(),
            i.created.clone(),
            i.updated.clone(),
            i.description.clone(),
            i.sprint.clone(),
            i.requester_email.clone(),
            i.requester_name.clone(),
            i.start_date.clone(),
            i.end_date.clone(),
            i.parent.clone(),
            w.author.clone(),
            w.comment.clone(),
            w.created.clone(),
            w.started.clone(),
            w.time_spent.clone(),
            w.time_spent_seconds.to_string(),
        ]
    }
}

/// Labels render as a bracketed, quoted list: `['bug', 'backend']`.
fn render_labels(labels: &[String]) -> String {
    let quoted: Vec<String> = labels.iter().map(|l| quote_label(l)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Single quotes unless the label holds a `'` and no `"`. Backslashes, and
/// a `'` inside single quotes, are escaped.
fn quote_label(label: &str) -> String {
    let escaped = label.replace('\\', "\\\\");
    if label.contains('\'') && !label.contains('"') {
        format!("\"{escaped}\"")
    } else {
        format!("'{}'", escaped.replace('\'', "\\'"))
    }
}
