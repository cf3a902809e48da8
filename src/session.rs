//! Session state machine: which project, issue type and issue the user is
//! working on, whether the timer runs, and which actions that permits.
//!
//! Every transition validates its preconditions and either mutates the state
//! or returns a [`SessionError`] without touching it. Nothing here performs
//! I/O; the workspace layer calls the gateway between validation and update.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::labels::valid_labels;
use crate::timer::{StoppedTimer, Timer};

/// Local precondition failures, raised before any request is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("stop the timer before you {0}")]
    TimerRunning(&'static str),
    #[error("no project selected")]
    NoProject,
    #[error("issue type '{0}' is not available for this project")]
    InvalidIssueType(String),
    #[error("task summary cannot be empty")]
    EmptySummary,
    #[error("select a task from the list or start work on a new one first")]
    NoIssue,
    #[error("labels can only be staged for an issue that has not been created yet")]
    IssueAlreadyBound,
    #[error("your Jira account id could not be resolved; assignment is unavailable")]
    NoAccountId,
    #[error("label cannot be empty")]
    EmptyLabel,
    #[error("label '{0}' contains whitespace")]
    InvalidLabel(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// A project the user may pick, as listed by Jira.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub key: String,
    pub name: String,
}

/// Coarse phase derived from the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    NoProject,
    ProjectSelected,
    IssueBound,
    TimerActive,
}

/// Which user actions are currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Enablement {
    pub start: bool,
    pub stop: bool,
    pub change_status: bool,
    pub assign: bool,
    pub edit_labels: bool,
    pub task_list: bool,
}

/// Outcome of selecting a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectChange {
    Selected(String),
    Unchanged,
    Cleared,
}

/// What starting the timer requires from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPlan {
    Existing(String),
    CreateIssue {
        project_key: String,
        issue_type: String,
        summary: String,
        labels: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub selected_project_key: Option<String>,
    pub selected_issue_type: Option<String>,
    pub current_issue_key: Option<String>,
    pub pending_labels: BTreeSet<String>,
    pub account_id: Option<String>,
    pub projects: Vec<Project>,
    pub issue_types: Vec<String>,
    pub task_summary: String,
    timer: Timer,
}

impl SessionState {
    /// An empty session with no project selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether time is currently being counted.
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Start timestamp of the running timer.
    pub fn timer_start(&self) -> Option<DateTime<Utc>> {
        self.timer.started_at()
    }

    /// The underlying timer.
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Coarse phase derived from the current fields.
    pub fn phase(&self) -> Phase {
        if self.timer_running() {
            Phase::TimerActive
        } else if self.current_issue_key.is_some() {
            Phase::IssueBound
        } else if self.selected_project_key.is_some() {
            Phase::ProjectSelected
        } else {
            Phase::NoProject
        }
    }

    /// The selected project, if it is in the catalog.
    pub fn selected_project(&self) -> Option<&Project> {
        let key = self.selected_project_key.as_deref()?;
        self.projects.iter().find(|project| project.key == key)
    }

    fn issue_type_is_valid(&self) -> bool {
        self.selected_issue_type
            .as_ref()
            .map(|name| self.issue_types.contains(name))
            .unwrap_or(false)
    }

    /// Which actions the current state allows.
    pub fn enablement(&self) -> Enablement {
        let running = self.timer_running();
        let project = self.selected_project_key.is_some();
        let issue = self.current_issue_key.is_some();
        Enablement {
            start: project
                && self.issue_type_is_valid()
                && !self.task_summary.trim().is_empty()
                && !running,
            stop: running,
            change_status: issue && !running,
            assign: issue && self.account_id.is_some() && !running,
            edit_labels: (project || issue) && !running,
            task_list: project && !running,
        }
    }

    /// Replaces the project catalog; the previous selection and everything
    /// bound to it is dropped.
    pub fn set_projects(&mut self, mut projects: Vec<Project>) -> Result<()> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("reload projects"));
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        self.projects = projects;
        self.clear_project_context();
        self.selected_project_key = None;
        Ok(())
    }

    fn clear_project_context(&mut self) {
        self.current_issue_key = None;
        self.pending_labels.clear();
        self.selected_issue_type = None;
        self.issue_types.clear();
        self.task_summary.clear();
    }

    /// Selects a project by display name or key. Unknown choices clear the
    /// selection; re-selecting the current project changes nothing.
    pub fn select_project(&mut self, choice: &str) -> Result<ProjectChange> {
        let change = self.resolve_project(choice)?;
        self.apply_project_change(&change);
        Ok(change)
    }

    /// What [`select_project`](Self::select_project) would do, without
    /// touching the state.
    pub fn resolve_project(&self, choice: &str) -> Result<ProjectChange> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("change the project"));
        }
        let choice = choice.trim();
        let resolved = self
            .projects
            .iter()
            .find(|project| project.name == choice || project.key == choice)
            .or_else(|| {
                self.projects
                    .iter()
                    .find(|project| project.key.eq_ignore_ascii_case(choice))
            })
            .map(|project| project.key.clone());

        Ok(match resolved {
            Some(key) if Some(&key) == self.selected_project_key.as_ref() => {
                ProjectChange::Unchanged
            }
            Some(key) => ProjectChange::Selected(key),
            None => ProjectChange::Cleared,
        })
    }

    /// Commits a change from [`resolve_project`](Self::resolve_project).
    pub fn apply_project_change(&mut self, change: &ProjectChange) {
        match change {
            ProjectChange::Unchanged => {}
            ProjectChange::Selected(key) => {
                self.clear_project_context();
                self.selected_project_key = Some(key.clone());
            }
            ProjectChange::Cleared => {
                self.clear_project_context();
                self.selected_project_key = None;
            }
        }
    }

    /// Installs the issue-type catalog of the selected project and defaults
    /// the selection to its first entry.
    pub fn set_issue_types(&mut self, issue_types: Vec<String>) {
        self.selected_issue_type = issue_types.first().cloned();
        self.issue_types = issue_types;
    }

    /// Picks an issue type offered by the selected project.
    pub fn select_issue_type(&mut self, name: &str) -> Result<()> {
        if self.selected_project_key.is_none() {
            return Err(SessionError::NoProject);
        }
        if self.timer_running() {
            return Err(SessionError::TimerRunning("change the issue type"));
        }
        let name = name.trim();
        let canonical = self
            .issue_types
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| SessionError::InvalidIssueType(name.to_string()))?;
        self.selected_issue_type = Some(canonical);
        Ok(())
    }

    /// Sets the summary for the issue the timer will create.
    pub fn set_summary(&mut self, summary: &str) -> Result<()> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("edit the task summary"));
        }
        self.task_summary = summary.trim().to_string();
        Ok(())
    }

    /// Binds an issue chosen from the task list. An issue type outside the
    /// project's catalog falls back to the catalog's first entry.
    pub fn load_existing_issue(
        &mut self,
        issue_key: &str,
        summary: &str,
        issue_type: Option<&str>,
    ) -> Result<()> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("select another task"));
        }
        let issue_type = issue_type
            .and_then(|name| self.issue_types.iter().find(|known| known.as_str() == name))
            .or_else(|| self.issue_types.first())
            .cloned();

        self.current_issue_key = Some(issue_key.to_string());
        self.selected_issue_type = issue_type;
        self.task_summary = summary.trim().to_string();
        self.pending_labels.clear();
        Ok(())
    }

    /// Replaces the labels staged for the issue the timer will create.
    pub fn stage_labels(&mut self, labels: BTreeSet<String>) -> Result<()> {
        if self.current_issue_key.is_some() {
            return Err(SessionError::IssueAlreadyBound);
        }
        self.pending_labels = labels;
        Ok(())
    }

    /// Validates that the timer may start and reports whether an issue must
    /// be created first.
    pub fn plan_start(&self) -> Result<StartPlan> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("start it again"));
        }
        let project_key = self
            .selected_project_key
            .clone()
            .ok_or(SessionError::NoProject)?;
        if !self.issue_type_is_valid() {
            return Err(SessionError::InvalidIssueType(
                self.selected_issue_type.clone().unwrap_or_default(),
            ));
        }
        let summary = self.task_summary.trim();
        if summary.is_empty() {
            return Err(SessionError::EmptySummary);
        }

        Ok(match &self.current_issue_key {
            Some(key) => StartPlan::Existing(key.clone()),
            None => StartPlan::CreateIssue {
                project_key,
                issue_type: self.selected_issue_type.clone().unwrap_or_default(),
                summary: summary.to_string(),
                labels: valid_labels(self.pending_labels.iter()),
            },
        })
    }

    /// Binds a freshly created issue and drops the labels staged for it.
    pub fn bind_created_issue(&mut self, issue_key: &str) {
        self.current_issue_key = Some(issue_key.to_string());
        self.pending_labels.clear();
    }

    pub fn start_timer(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("start it again"));
        }
        self.timer.start(now);
        Ok(())
    }

    /// Stops the timer; `None` (and no state change) when it is not running.
    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Option<StoppedTimer> {
        self.timer.stop(now)
    }

    /// Issue key for actions that need a bound issue and an idle timer.
    pub fn require_issue(&self, action: &'static str) -> Result<&str> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning(action));
        }
        self.current_issue_key
            .as_deref()
            .ok_or(SessionError::NoIssue)
    }

    /// Issue key and account id for "assign to me".
    pub fn require_assignment(&self) -> Result<(&str, &str)> {
        let issue_key = self.require_issue("assign the task")?;
        let account_id = self
            .account_id
            .as_deref()
            .ok_or(SessionError::NoAccountId)?;
        Ok((issue_key, account_id))
    }

    /// Label editing needs an idle timer and a project or an issue.
    pub fn require_label_editing(&self) -> Result<()> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("edit labels"));
        }
        if self.selected_project_key.is_none() && self.current_issue_key.is_none() {
            return Err(SessionError::NoProject);
        }
        Ok(())
    }

    pub fn require_task_list(&self) -> Result<&str> {
        if self.timer_running() {
            return Err(SessionError::TimerRunning("browse tasks"));
        }
        self.selected_project_key
            .as_deref()
            .ok_or(SessionError::NoProject)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn projects() -> Vec<Project> {
        vec![
            Project {
                key: "FOC".into(),
                name: "Focus".into(),
            },
            Project {
                key: "OPS".into(),
                name: "Operations".into(),
            },
        ]
    }

    pub(crate) fn ready_state() -> SessionState {
        let mut state = SessionState::new();
        state.set_projects(projects()).unwrap();
        state.select_project("Focus").unwrap();
        state.set_issue_types(vec!["Bug".into(), "Task".into()]);
        state.set_summary("Write the docs").unwrap();
        state
    }

    #[test]
    fn initial_phase_has_nothing_enabled() {
        let state = SessionState::new();
        assert_eq!(state.phase(), Phase::NoProject);
        assert_eq!(state.enablement(), Enablement::default());
    }

    #[test]
    fn selecting_project_clears_issue_context() {
        let mut state = ready_state();
        state.load_existing_issue("FOC-1", "Existing", Some("Task")).unwrap();
        assert_eq!(state.phase(), Phase::IssueBound);

        let change = state.select_project("OPS").unwrap();
        assert_eq!(change, ProjectChange::Selected("OPS".into()));
        assert_eq!(state.selected_project_key.as_deref(), Some("OPS"));
        assert!(state.current_issue_key.is_none());
        assert!(state.selected_issue_type.is_none());
        assert!(state.issue_types.is_empty());
        assert!(state.pending_labels.is_empty());
        assert_eq!(state.phase(), Phase::ProjectSelected);
    }

    #[test]
    fn reselecting_same_project_is_a_no_op() {
        let mut state = ready_state();
        assert_eq!(state.select_project("foc").unwrap(), ProjectChange::Unchanged);
        assert_eq!(state.task_summary, "Write the docs");
        assert_eq!(state.selected_issue_type.as_deref(), Some("Bug"));
    }

    #[test]
    fn resolving_a_project_leaves_state_untouched() {
        let mut state = ready_state();
        state.bind_created_issue("FOC-1");

        assert_eq!(
            state.resolve_project("Operations").unwrap(),
            ProjectChange::Selected("OPS".into())
        );
        assert_eq!(state.selected_project_key.as_deref(), Some("FOC"));
        assert_eq!(state.current_issue_key.as_deref(), Some("FOC-1"));
        assert_eq!(state.task_summary, "Write the docs");
    }

    #[test]
    fn unknown_project_clears_selection() {
        let mut state = ready_state();
        assert_eq!(state.select_project("Nope").unwrap(), ProjectChange::Cleared);
        assert!(state.selected_project_key.is_none());
        assert_eq!(state.phase(), Phase::NoProject);
    }

    #[test]
    fn project_change_is_rejected_while_running() {
        let mut state = ready_state();
        state.start_timer(Utc::now()).unwrap();
        assert_eq!(
            state.select_project("OPS"),
            Err(SessionError::TimerRunning("change the project"))
        );
        assert_eq!(state.selected_project_key.as_deref(), Some("FOC"));
    }

    #[test]
    fn issue_type_must_be_in_catalog() {
        let mut state = ready_state();
        assert!(state.select_issue_type("task").is_ok());
        assert_eq!(state.selected_issue_type.as_deref(), Some("Task"));
        assert_eq!(
            state.select_issue_type("Epic"),
            Err(SessionError::InvalidIssueType("Epic".into()))
        );

        let mut empty = SessionState::new();
        assert_eq!(empty.select_issue_type("Task"), Err(SessionError::NoProject));
    }

    #[test]
    fn start_requires_project_type_and_summary() {
        let state = SessionState::new();
        assert_eq!(state.plan_start(), Err(SessionError::NoProject));

        let mut state = ready_state();
        state.set_summary("   ").unwrap();
        assert_eq!(state.plan_start(), Err(SessionError::EmptySummary));
        assert!(!state.enablement().start);

        let mut state = ready_state();
        state.selected_issue_type = Some("Epic".into());
        assert!(matches!(state.plan_start(), Err(SessionError::InvalidIssueType(_))));
    }

    #[test]
    fn start_plan_creates_issue_with_valid_labels_only() {
        let mut state = ready_state();
        state
            .stage_labels(["a".to_string(), "b c".to_string()].into_iter().collect())
            .unwrap();

        let plan = state.plan_start().unwrap();
        assert_eq!(
            plan,
            StartPlan::CreateIssue {
                project_key: "FOC".into(),
                issue_type: "Bug".into(),
                summary: "Write the docs".into(),
                labels: vec!["a".into()],
            }
        );
        assert!(state.enablement().start);
    }

    #[test]
    fn start_plan_reuses_bound_issue() {
        let mut state = ready_state();
        state.load_existing_issue("FOC-3", "Existing", Some("Story")).unwrap();
        assert_eq!(state.selected_issue_type.as_deref(), Some("Bug"));
        assert_eq!(state.plan_start().unwrap(), StartPlan::Existing("FOC-3".into()));
    }

    #[test]
    fn staging_labels_requires_unbound_issue() {
        let mut state = ready_state();
        state.bind_created_issue("FOC-9");
        assert_eq!(
            state.stage_labels(BTreeSet::new()),
            Err(SessionError::IssueAlreadyBound)
        );
    }

    #[test]
    fn binding_created_issue_clears_staged_labels() {
        let mut state = ready_state();
        state.stage_labels(["x".to_string()].into_iter().collect()).unwrap();
        state.bind_created_issue("FOC-10");
        assert!(state.pending_labels.is_empty());
        assert_eq!(state.current_issue_key.as_deref(), Some("FOC-10"));
    }

    #[test]
    fn running_timer_gates_other_actions() {
        let mut state = ready_state();
        state.account_id = Some("acc".into());
        state.bind_created_issue("FOC-1");
        let idle = state.enablement();
        assert!(idle.start && idle.change_status && idle.assign && idle.edit_labels && idle.task_list);
        assert!(!idle.stop);

        let now = Utc::now();
        state.start_timer(now).unwrap();
        assert_eq!(state.phase(), Phase::TimerActive);
        let running = state.enablement();
        assert_eq!(
            running,
            Enablement {
                stop: true,
                ..Enablement::default()
            }
        );
        assert_eq!(
            state.require_issue("change the status"),
            Err(SessionError::TimerRunning("change the status"))
        );
        assert!(state.require_label_editing().is_err());

        let stopped = state.stop_timer(now + Duration::seconds(30)).unwrap();
        assert_eq!(stopped.elapsed, 30);
        assert!(!state.timer_running());
        assert!(state.timer_start().is_none());
        assert!(state.stop_timer(now + Duration::seconds(31)).is_none());
    }

    #[test]
    fn assignment_needs_account_id() {
        let mut state = ready_state();
        state.bind_created_issue("FOC-1");
        assert_eq!(state.require_assignment(), Err(SessionError::NoAccountId));
        assert!(!state.enablement().assign);

        state.account_id = Some("acc-1".into());
        assert_eq!(state.require_assignment(), Ok(("FOC-1", "acc-1")));
    }

    #[test]
    fn label_editing_requires_project_or_issue() {
        let state = SessionState::new();
        assert_eq!(state.require_label_editing(), Err(SessionError::NoProject));
        assert!(ready_state().require_label_editing().is_ok());
    }
}
