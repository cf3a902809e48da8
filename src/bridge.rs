//! Front-end-facing records rendered by the terminal shell.
//!
//! These are the serialized shapes the shell prints (and dumps as JSON with
//! the `state` command); they are built from gateway models and session state
//! and passed by value.

use serde::Serialize;

use jira_api::Issue as JiraIssue;

use crate::duration::format_duration;
use crate::session::{Enablement, Phase, SessionState};
use crate::timer::TimerState;

/// One row of the project task list.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: Option<String>,
    pub labels: Vec<String>,
    pub assignee: String,
    pub logged_seconds: u64,
}

impl TaskRow {
    pub fn from_issue(issue: &JiraIssue) -> Self {
        let fields = &issue.fields;
        Self {
            key: issue.key.clone(),
            summary: fields.summary.clone().unwrap_or_default(),
            status: fields
                .status
                .as_ref()
                .and_then(|status| status.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            issue_type: fields.issuetype.as_ref().and_then(|kind| kind.name.clone()),
            labels: fields.labels.clone(),
            assignee: fields
                .assignee
                .as_ref()
                .and_then(|assignee| assignee.display_name.clone())
                .unwrap_or_else(|| "Unassigned".to_string()),
            logged_seconds: fields.logged_seconds(),
        }
    }

    /// `[KEY] summary (status) [assignee] [labels] - Time: <dur>`
    pub fn display(&self) -> String {
        format!(
            "[{}] {} ({}) [{}] [{}] - Time: {}",
            self.key,
            self.summary,
            self.status,
            self.assignee,
            self.labels.join(", "),
            format_duration(self.logged_seconds as i64)
        )
    }
}

/// A label offered by the label editor with its current selection.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelChoice {
    pub name: String,
    pub selected: bool,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Banner shown to the user after an operation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn render(&self) -> String {
        let tag = match self.level {
            NoticeLevel::Info => "OK",
            NoticeLevel::Warning => "WARN",
            NoticeLevel::Error => "ERROR",
        };
        format!("[{}] {}: {}", tag, self.title, self.message)
    }
}

/// Snapshot of the session for the `state` command.
#[derive(Serialize, Debug, Clone)]
pub struct StateView {
    pub phase: Phase,
    pub project_key: Option<String>,
    pub issue_type: Option<String>,
    pub issue_types: Vec<String>,
    pub issue_key: Option<String>,
    pub summary: String,
    pub pending_labels: Vec<String>,
    pub account_id: Option<String>,
    pub timer: TimerState,
    pub enablement: Enablement,
}

impl StateView {
    pub fn capture(state: &SessionState, timer: TimerState) -> Self {
        Self {
            phase: state.phase(),
            project_key: state.selected_project_key.clone(),
            issue_type: state.selected_issue_type.clone(),
            issue_types: state.issue_types.clone(),
            issue_key: state.current_issue_key.clone(),
            summary: state.task_summary.clone(),
            pending_labels: state.pending_labels.iter().cloned().collect(),
            account_id: state.account_id.clone(),
            timer,
            enablement: state.enablement(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_row_display_line() {
        let issue: JiraIssue = serde_json::from_value(json!({
            "key": "FOC-7",
            "fields": {
                "summary": "Fix login",
                "status": {"name": "In Progress"},
                "issuetype": {"name": "Bug"},
                "labels": ["backend", "urgent"],
                "assignee": {"displayName": "Ada"},
                "worklog": {"worklogs": [{"timeSpentSeconds": 3600}, {"timeSpentSeconds": 1}]}
            }
        }))
        .unwrap();

        let row = TaskRow::from_issue(&issue);
        assert_eq!(row.logged_seconds, 3601);
        assert_eq!(
            row.display(),
            "[FOC-7] Fix login (In Progress) [Ada] [backend, urgent] - Time: 1h 1m"
        );
    }

    #[test]
    fn task_row_defaults_for_sparse_issue() {
        let issue: JiraIssue = serde_json::from_value(json!({"key": "FOC-8", "fields": {}})).unwrap();
        let row = TaskRow::from_issue(&issue);
        assert_eq!(row.assignee, "Unassigned");
        assert_eq!(row.display(), "[FOC-8]  (Unknown) [Unassigned] [] - Time: 0m");
    }

    #[test]
    fn notice_serializes_level_in_lowercase() {
        let value = serde_json::to_value(Notice::warning("Work log", "too short")).unwrap();
        assert_eq!(value["level"], "warning");
        assert_eq!(Notice::error("Status", "boom").render(), "[ERROR] Status: boom");
    }
}
