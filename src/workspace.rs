//! Orchestration between the session state machine and the Jira gateway.
//!
//! Every operation validates its preconditions on [`SessionState`] first, then
//! awaits the gateway, then applies the normalized result. A failed call
//! leaves the state as it was.

use std::collections::BTreeSet;

use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;

use jira_api::{
    AdfDocument, CreateMeta, CreatedIssue, Issue as JiraIssue, IssueCreateRequest, JiraClient,
    JiraError, Myself, ProjectPage, RequestResult, SearchResults, TransitionList,
    WorklogCreateRequest, WorklogCreated,
};

use crate::bridge::{LabelChoice, Notice, StateView, TaskRow};
use crate::duration::{format_duration, is_loggable};
use crate::labels::{rank_project_labels, valid_labels, LabelEditor, LabelTarget};
use crate::session::{Project, ProjectChange, SessionError, SessionState, StartPlan};
use crate::timer::TimerState;
use crate::workflow::match_transition;

const TASK_LIST_FIELDS: &str = "summary,status,issuetype,worklog,labels,assignee";
const TASK_LIST_LIMIT: u32 = 50;
const LABEL_SAMPLE_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Transport(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("unexpected response from Jira: {0}")]
    Unexpected(String),
    #[error("no transition leads to '{target}'; available: {}", .available.join(", "))]
    NoTransition {
        target: String,
        available: Vec<String>,
    },
    #[error("no transitions are available for {0}")]
    NoTransitions(String),
    #[error("the label editor is not open")]
    EditorClosed,
    #[error("no task '{0}' in the last task list")]
    UnknownTask(String),
    #[error("no label at position {0}")]
    UnknownLabel(usize),
}

impl From<JiraError> for WorkspaceError {
    fn from(err: JiraError) -> Self {
        match err {
            JiraError::Http { status, message } => WorkspaceError::Api {
                status: status.as_u16(),
                message,
            },
            JiraError::Transport(message) => WorkspaceError::Transport(message),
            JiraError::Serialization(message) | JiraError::Config(message) => {
                WorkspaceError::Unexpected(message)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// How starting the timer went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub issue_key: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorklogOutcome {
    Logged { id: String },
    TooShort,
    NoIssue,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped {
        issue_key: Option<String>,
        elapsed: u64,
        duration: String,
        worklog: WorklogOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSave {
    NoChanges,
    Staged(Vec<String>),
    Updated { issue_key: String, labels: Vec<String> },
}

pub struct Workspace {
    client: JiraClient,
    state: SessionState,
    label_editor: Option<LabelEditor>,
    tasks: Vec<TaskRow>,
}

impl Workspace {
    /// Wraps a client with an empty session.
    pub fn new(client: JiraClient) -> Self {
        Self {
            client,
            state: SessionState::new(),
            label_editor: None,
            tasks: Vec::new(),
        }
    }

    /// Read access to the session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Resolves the account id and loads the project catalog. Failures are
    /// reported as notices; the session stays usable.
    pub async fn startup(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        match self.resolve_account_id().await {
            Ok(account_id) => debug!("Resolved Jira account id {}", account_id),
            Err(err) => {
                warn!("Failed to resolve Jira account id: {}", err);
                notices.push(Notice::warning(
                    "Account",
                    format!("Could not resolve your account; assignment is disabled. {}", err),
                ));
            }
        }
        match self.load_projects().await {
            Ok(0) => notices.push(Notice::warning("Projects", "No projects are visible to you")),
            Ok(count) => notices.push(Notice::info("Projects", format!("Loaded {} projects", count))),
            Err(err) => {
                warn!("Failed to load projects: {}", err);
                notices.push(Notice::error("Projects", err.to_string()));
            }
        }
        notices
    }

    /// Looks up the account id of the authenticated user.
    pub async fn resolve_account_id(&mut self) -> Result<String> {
        let myself: Myself = self.client.myself().await.decode()?;
        self.state.account_id = Some(myself.account_id.clone());
        Ok(myself.account_id)
    }

    /// Reloads the project catalog; returns how many projects were found.
    pub async fn load_projects(&mut self) -> Result<usize> {
        let page: ProjectPage = self.client.search_projects().await.decode()?;
        let projects: Vec<Project> = page
            .values
            .into_iter()
            .filter_map(|project| match (project.key, project.name) {
                (Some(key), Some(name)) => Some(Project { key, name }),
                _ => None,
            })
            .collect();
        let count = projects.len();
        self.state.set_projects(projects)?;
        self.tasks.clear();
        info!("Loaded {} Jira projects", count);
        Ok(count)
    }

    /// Projects sorted by display name.
    pub fn projects(&self) -> &[Project] {
        &self.state.projects
    }

    /// Selects a project and loads its issue types. The selection is only
    /// committed once the issue types arrived.
    pub async fn select_project(&mut self, choice: &str) -> Result<ProjectChange> {
        let change = self.state.resolve_project(choice)?;
        let issue_types = match &change {
            ProjectChange::Selected(key) => Some(self.fetch_issue_types(key).await?),
            ProjectChange::Unchanged | ProjectChange::Cleared => None,
        };

        if change != ProjectChange::Unchanged {
            self.state.apply_project_change(&change);
            self.tasks.clear();
            self.label_editor = None;
        }
        if let Some(issue_types) = issue_types {
            self.state.set_issue_types(issue_types);
        }
        Ok(change)
    }

    async fn fetch_issue_types(&self, project_key: &str) -> Result<Vec<String>> {
        let meta: CreateMeta = self.client.create_meta(project_key).await.decode()?;
        let issue_types = meta.standard_issue_types(project_key);
        debug!("Project {} offers issue types {:?}", project_key, issue_types);
        Ok(issue_types)
    }

    /// Picks one of the issue types of the selected project.
    pub fn select_issue_type(&mut self, name: &str) -> Result<()> {
        Ok(self.state.select_issue_type(name)?)
    }

    /// Sets the summary used when the timer creates an issue.
    pub fn set_summary(&mut self, summary: &str) -> Result<()> {
        Ok(self.state.set_summary(summary)?)
    }

    /// Most recently updated issues of the selected project.
    pub async fn task_list(&mut self) -> Result<Vec<TaskRow>> {
        let project_key = self.state.require_task_list()?.to_string();
        let jql = project_jql(&project_key);
        let results: SearchResults = self
            .client
            .search_issues(&jql, TASK_LIST_FIELDS, TASK_LIST_LIMIT)
            .await
            .decode()?;
        self.tasks = results.issues.iter().map(TaskRow::from_issue).collect();
        Ok(self.tasks.clone())
    }

    /// Binds a task from the last list, by 1-based position or issue key.
    pub fn select_task(&mut self, selector: &str) -> Result<TaskRow> {
        let selector = selector.trim();
        let row = match selector.parse::<usize>() {
            Ok(position) if position > 0 => self.tasks.get(position - 1),
            _ => self
                .tasks
                .iter()
                .find(|row| row.key.eq_ignore_ascii_case(selector)),
        }
        .cloned()
        .ok_or_else(|| WorkspaceError::UnknownTask(selector.to_string()))?;

        self.state
            .load_existing_issue(&row.key, &row.summary, row.issue_type.as_deref())?;
        self.label_editor = None;
        info!("Loaded existing issue {}", row.key);
        Ok(row)
    }

    /// Opens the label editor for the bound issue, or for the issue the timer
    /// will create.
    pub async fn open_label_editor(&mut self) -> Result<Vec<LabelChoice>> {
        self.state.require_label_editing()?;

        let project_labels = match self.state.selected_project_key.clone() {
            Some(project_key) => self.project_labels(&project_key).await,
            None => Vec::new(),
        };

        let (target, current) = match self.state.current_issue_key.clone() {
            Some(issue_key) => {
                let issue: JiraIssue = self.client.issue_labels(&issue_key).await.decode()?;
                let current: BTreeSet<String> = issue.fields.labels.into_iter().collect();
                (LabelTarget::Existing(issue_key), current)
            }
            None => (LabelTarget::NewIssue, self.state.pending_labels.clone()),
        };

        let editor = LabelEditor::new(target, project_labels, current);
        let choices = editor.choices();
        self.label_editor = Some(editor);
        Ok(choices)
    }

    async fn project_labels(&self, project_key: &str) -> Vec<String> {
        let result = self
            .client
            .search_issues(&project_jql(project_key), "labels", LABEL_SAMPLE_LIMIT)
            .await;
        match result.decode::<SearchResults>() {
            Ok(results) => rank_project_labels(&results.issues),
            Err(err) => {
                warn!("Could not load labels for project {}: {}", project_key, err);
                Vec::new()
            }
        }
    }

    /// Current choices of the open label editor.
    pub fn label_choices(&self) -> Result<Vec<LabelChoice>> {
        self.editor().map(LabelEditor::choices)
    }

    /// Toggles the label at 1-based `position`.
    pub fn toggle_label(&mut self, position: usize) -> Result<LabelChoice> {
        let editor = self.editor_mut()?;
        position
            .checked_sub(1)
            .and_then(|index| editor.toggle(index))
            .ok_or(WorkspaceError::UnknownLabel(position))
    }

    /// Adds a new label to the open editor, checked.
    pub fn add_label(&mut self, name: &str) -> Result<LabelChoice> {
        Ok(self.editor_mut()?.add_label(name)?)
    }

    /// Closes the label editor without saving.
    pub fn cancel_labels(&mut self) -> bool {
        self.label_editor.take().is_some()
    }

    /// Saves the editor selection; the editor stays open when saving fails.
    pub async fn save_labels(&mut self) -> Result<LabelSave> {
        let editor = self.editor()?;
        let target = editor.target().clone();
        let selected = editor.selected().clone();
        let changed = editor.has_changes();

        let outcome = match target {
            LabelTarget::NewIssue => {
                self.state.stage_labels(selected.clone())?;
                LabelSave::Staged(selected.into_iter().collect())
            }
            LabelTarget::Existing(_) if !changed => LabelSave::NoChanges,
            LabelTarget::Existing(issue_key) => {
                let labels = valid_labels(selected.iter());
                let result = self.client.update_labels(&issue_key, &labels).await;
                expect_status(&result, &[200, 204])?;
                info!("Updated labels of {}: {:?}", issue_key, labels);
                LabelSave::Updated { issue_key, labels }
            }
        };
        self.label_editor = None;
        Ok(outcome)
    }

    fn editor(&self) -> Result<&LabelEditor> {
        self.label_editor.as_ref().ok_or(WorkspaceError::EditorClosed)
    }

    fn editor_mut(&mut self) -> Result<&mut LabelEditor> {
        self.label_editor.as_mut().ok_or(WorkspaceError::EditorClosed)
    }

    /// Starts the timer, creating the issue first when none is bound.
    pub async fn start_timer(&mut self) -> Result<StartOutcome> {
        let outcome = match self.state.plan_start()? {
            StartPlan::Existing(issue_key) => StartOutcome {
                issue_key,
                created: false,
            },
            StartPlan::CreateIssue {
                project_key,
                issue_type,
                summary,
                labels,
            } => {
                let description =
                    AdfDocument::paragraph(format!("Task created from JIRA Focus: {}", summary));
                let request = IssueCreateRequest::new(project_key, issue_type, summary, description)
                    .with_labels(labels);
                let created: CreatedIssue = self.client.create_issue(&request).await.decode()?;
                info!("Created issue {} with labels {:?}", created.key, request.labels());
                self.state.bind_created_issue(&created.key);
                StartOutcome {
                    issue_key: created.key,
                    created: true,
                }
            }
        };

        self.state.start_timer(Utc::now())?;
        self.label_editor = None;
        info!("Timer started for {}", outcome.issue_key);
        Ok(outcome)
    }

    /// Stops the timer and logs the elapsed time. The timer always stops;
    /// a failed work log is reported in the outcome.
    pub async fn stop_timer(&mut self) -> StopOutcome {
        let Some(stopped) = self.state.stop_timer(Utc::now()) else {
            debug!("Stop requested while the timer is idle");
            return StopOutcome::NotRunning;
        };

        let elapsed = stopped.elapsed;
        let duration = format_duration(elapsed as i64);
        let issue_key = self.state.current_issue_key.clone();
        info!("Timer stopped after {}s ({})", elapsed, duration);

        let worklog = match &issue_key {
            _ if !is_loggable(elapsed as i64) => WorklogOutcome::TooShort,
            None => WorklogOutcome::NoIssue,
            Some(key) => match self.log_work(key, elapsed, &duration).await {
                Ok(id) => WorklogOutcome::Logged { id },
                Err(err) => {
                    warn!("Failed to log work on {}: {}", key, err);
                    WorklogOutcome::Failed(err.to_string())
                }
            },
        };

        StopOutcome::Stopped {
            issue_key,
            elapsed,
            duration,
            worklog,
        }
    }

    async fn log_work(&self, issue_key: &str, elapsed: u64, duration: &str) -> Result<String> {
        let entry = WorklogCreateRequest {
            time_spent: duration.to_string(),
            comment: Some(AdfDocument::paragraph(format!(
                "Work time ({}s -> {}) recorded by JIRA Focus.",
                elapsed, duration
            ))),
        };
        let created: WorklogCreated = self.client.add_worklog(issue_key, &entry).await.decode()?;
        let id = created.id.ok_or_else(|| {
            WorkspaceError::Unexpected("work log response carried no id".to_string())
        })?;
        info!("Logged {} on {} (worklog {})", duration, issue_key, id);
        Ok(id)
    }

    /// Moves the bound issue to the status named `target`; returns the
    /// transition id used.
    pub async fn change_status(&mut self, target: &str) -> Result<String> {
        let issue_key = self.state.require_issue("change the status")?.to_string();
        let list: TransitionList = self.client.transitions(&issue_key).await.decode()?;
        if list.transitions.is_empty() {
            return Err(WorkspaceError::NoTransitions(issue_key));
        }

        let transition_id = match_transition(&list.transitions, target).map_err(|err| {
            WorkspaceError::NoTransition {
                target: err.target,
                available: err.available,
            }
        })?;

        let result = self
            .client
            .execute_transition(&issue_key, &transition_id)
            .await;
        expect_status(&result, &[204])?;
        info!(
            "Moved {} to '{}' via transition {}",
            issue_key,
            target.trim(),
            transition_id
        );
        Ok(transition_id)
    }

    /// Assigns the bound issue to the authenticated user.
    pub async fn assign_to_me(&mut self) -> Result<String> {
        let (issue_key, account_id) = self.state.require_assignment()?;
        let (issue_key, account_id) = (issue_key.to_string(), account_id.to_string());
        let result = self.client.assign(&issue_key, &account_id).await;
        expect_status(&result, &[200, 204])?;
        info!("Assigned {} to account {}", issue_key, account_id);
        Ok(issue_key)
    }

    /// Timer snapshot at the current time.
    pub fn timer_state(&self) -> TimerState {
        self.state.timer().snapshot(Utc::now())
    }

    /// Text for the timer label at the current time.
    pub fn timer_display(&self) -> String {
        self.state.timer().display(Utc::now())
    }

    /// Everything the shell renders.
    pub fn view(&self) -> StateView {
        StateView::capture(&self.state, self.timer_state())
    }

    /// Final check before exit: running time is never logged implicitly.
    pub fn shutdown(&self) -> Option<Notice> {
        let state = self.timer_state();
        if !state.active {
            return None;
        }
        let issue = self.state.current_issue_key.as_deref().unwrap_or("no issue");
        warn!(
            "Quitting with the timer running on {}; {}s were not logged",
            issue, state.elapsed
        );
        Some(Notice::warning(
            "Timer",
            format!("{}s on {} were not logged", state.elapsed, issue),
        ))
    }
}

fn project_jql(project_key: &str) -> String {
    format!("project = \"{}\" ORDER BY updated DESC", project_key)
}

/// Maps a failed call to its error, and a success with an unexpected
/// status to [`WorkspaceError::Unexpected`].
fn expect_status(result: &RequestResult, accepted: &[u16]) -> Result<()> {
    result.ensure_success()?;
    match result.status_code {
        Some(code) if accepted.contains(&code) => Ok(()),
        other => Err(WorkspaceError::Unexpected(format!(
            "expected status {:?}, got {}",
            accepted,
            other.map(|code| code.to_string()).unwrap_or_else(|| "none".into())
        ))),
    }
}
