use serde::{Deserialize, Serialize};

use super::document::AdfDocument;
use super::field::{deserialize_string_field, null_as_default, NamedRef};

/// Response of the JQL `search` endpoint.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub issues: Vec<Issue>,
    pub total: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// Projection of issue fields; every field is optional because callers request subsets.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IssueFields {
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub issuetype: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub worklog: Option<WorklogPage>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorklogPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub worklogs: Vec<WorklogSummary>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorklogSummary {
    #[serde(default)]
    pub time_spent_seconds: u64,
}

impl IssueFields {
    /// Sum of `timeSpentSeconds` over the embedded worklogs.
    pub fn logged_seconds(&self) -> u64 {
        self.worklog
            .as_ref()
            .map(|page| page.worklogs.iter().map(|entry| entry.time_spent_seconds).sum())
            .unwrap_or(0)
    }
}

/// Body of `POST issue`.
#[derive(Debug, Serialize, Clone)]
pub struct IssueCreateRequest {
    fields: IssueCreateFields,
}

#[derive(Debug, Serialize, Clone)]
struct IssueCreateFields {
    project: KeyRef,
    summary: String,
    description: AdfDocument,
    issuetype: NameRef,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Serialize, Clone)]
struct NameRef {
    name: String,
}

impl IssueCreateRequest {
    pub fn new(
        project_key: impl Into<String>,
        issue_type: impl Into<String>,
        summary: impl Into<String>,
        description: AdfDocument,
    ) -> Self {
        Self {
            fields: IssueCreateFields {
                project: KeyRef {
                    key: project_key.into(),
                },
                summary: summary.into(),
                description,
                issuetype: NameRef {
                    name: issue_type.into(),
                },
                labels: Vec::new(),
            },
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.fields.labels = labels;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.fields.labels
    }
}

/// Created issue as echoed by Jira.
#[derive(Debug, Deserialize, Clone)]
pub struct CreatedIssue {
    #[serde(default, deserialize_with = "deserialize_string_field")]
    pub id: Option<String>,
    pub key: String,
}

/// Body of `PUT issue/{key}` replacing the label set.
#[derive(Debug, Serialize)]
pub struct LabelsUpdateRequest<'a> {
    fields: LabelsField<'a>,
}

#[derive(Debug, Serialize)]
struct LabelsField<'a> {
    labels: &'a [String],
}

impl<'a> LabelsUpdateRequest<'a> {
    pub fn new(labels: &'a [String]) -> Self {
        Self {
            fields: LabelsField { labels },
        }
    }
}
