//! Line-oriented terminal front end.
//!
//! Reads one command per line, runs it against the [`Workspace`] and prints
//! notices. Operation failures are caught here, logged and shown; the session
//! keeps going.

use std::io::{self, Write};
use std::time::Duration;

use log::{error, info};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::bridge::{LabelChoice, Notice};
use crate::session::ProjectChange;
use crate::workspace::{LabelSave, StopOutcome, WorklogOutcome, Workspace, WorkspaceError};

const HELP: &str = "\
Commands:
  projects              list projects
  project <name|key>    select a project
  types                 list issue types of the project
  type <name>           select the issue type
  summary <text>        set the task summary
  tasks                 list recent tasks of the project
  pick <n|KEY>          work on a listed task
  labels                open the label editor
  toggle <n>            toggle a label in the editor
  label <name>          add a label in the editor
  labels save|cancel    save or discard the label selection
  start                 start the timer (creates the task if needed)
  stop                  stop the timer and log the work
  status <name>         move the task to a status
  assign                assign the task to yourself
  timer                 show the timer
  watch                 live timer until Enter
  state                 print the session state as JSON
  quit                  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Projects,
    Project(String),
    Types,
    Type(String),
    Summary(String),
    Tasks,
    Pick(String),
    Labels,
    Toggle(usize),
    Label(String),
    LabelsSave,
    LabelsCancel,
    Start,
    Stop,
    Status(String),
    Assign,
    Timer,
    Watch,
    State,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}'; type 'help' for the list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parses one input line; `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let argument = |usage: &'static str| -> Result<String, ParseError> {
            if rest.is_empty() {
                Err(ParseError::Usage(usage))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "projects" => Command::Projects,
            "project" => Command::Project(argument("project <name|key>")?),
            "types" => Command::Types,
            "type" => Command::Type(argument("type <name>")?),
            "summary" => Command::Summary(argument("summary <text>")?),
            "tasks" => Command::Tasks,
            "pick" => Command::Pick(argument("pick <n|KEY>")?),
            "labels" => match rest.to_lowercase().as_str() {
                "" => Command::Labels,
                "save" => Command::LabelsSave,
                "cancel" => Command::LabelsCancel,
                _ => return Err(ParseError::Usage("labels [save|cancel]")),
            },
            "toggle" => Command::Toggle(
                rest.parse()
                    .map_err(|_| ParseError::Usage("toggle <n>"))?,
            ),
            "label" => Command::Label(argument("label <name>")?),
            "start" => Command::Start,
            "stop" => Command::Stop,
            "status" => Command::Status(argument("status <name>")?),
            "assign" => Command::Assign,
            "timer" => Command::Timer,
            "watch" => Command::Watch,
            "state" => Command::State,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }

    fn title(&self) -> &'static str {
        match self {
            Command::Projects => "Projects",
            Command::Project(_) => "Project",
            Command::Type(_) | Command::Types => "Issue type",
            Command::Summary(_) => "Summary",
            Command::Tasks | Command::Pick(_) => "Tasks",
            Command::Labels
            | Command::Toggle(_)
            | Command::Label(_)
            | Command::LabelsSave
            | Command::LabelsCancel => "Labels",
            Command::Start => "Start timer",
            Command::Stop => "Stop timer",
            Command::Status(_) => "Status",
            Command::Assign => "Assign",
            Command::Timer | Command::Watch => "Timer",
            Command::State => "State",
            Command::Help | Command::Quit => "Shell",
        }
    }
}

#[derive(Debug, Error)]
enum ShellError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub struct Shell<W: Write> {
    workspace: Workspace,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(workspace: Workspace, out: W) -> Self {
        Self { workspace, out }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn into_parts(self) -> (Workspace, W) {
        (self.workspace, self.out)
    }

    pub fn notice(&mut self, notice: &Notice) -> io::Result<()> {
        writeln!(self.out, "{}", notice.render())
    }

    /// Runs the command loop until `quit` or end of input.
    pub async fn run<R>(&mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.prompt()?;
        while let Some(line) = lines.next_line().await? {
            let flow = match Command::parse(&line) {
                Ok(None) => Flow::Continue,
                Ok(Some(command)) => self.dispatch(command, &mut lines).await?,
                Err(err) => {
                    writeln!(self.out, "{}", err)?;
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                break;
            }
            self.prompt()?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "jira-focus> ")?;
        self.out.flush()
    }

    async fn dispatch<R>(&mut self, command: Command, lines: &mut Lines<R>) -> io::Result<Flow>
    where
        R: AsyncBufRead + Unpin,
    {
        let title = command.title();
        match self.execute(command, lines).await {
            Ok(flow) => Ok(flow),
            Err(ShellError::Io(err)) => Err(err),
            Err(err) => {
                error!("{} failed: {}", title, err);
                self.notice(&Notice::error(title, err.to_string()))?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn execute<R>(&mut self, command: Command, lines: &mut Lines<R>) -> Result<Flow, ShellError>
    where
        R: AsyncBufRead + Unpin,
    {
        match command {
            Command::Help => writeln!(self.out, "{}", HELP)?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Projects => {
                let projects = self.workspace.projects().to_vec();
                if projects.is_empty() {
                    writeln!(self.out, "No projects loaded")?;
                }
                let selected = self.workspace.state().selected_project_key.clone();
                for project in projects {
                    let marker = if Some(&project.key) == selected.as_ref() { "*" } else { " " };
                    writeln!(self.out, "{} {} ({})", marker, project.name, project.key)?;
                }
            }
            Command::Project(choice) => {
                let notice = match self.workspace.select_project(&choice).await? {
                    ProjectChange::Selected(key) => Notice::info(
                        "Project",
                        format!(
                            "Selected {}; issue types: {}",
                            key,
                            self.workspace.state().issue_types.join(", ")
                        ),
                    ),
                    ProjectChange::Unchanged => Notice::info("Project", "Already selected"),
                    ProjectChange::Cleared => Notice::warning(
                        "Project",
                        format!("Unknown project '{}'; selection cleared", choice),
                    ),
                };
                self.notice(&notice)?;
            }
            Command::Types => {
                let state = self.workspace.state();
                let rows: Vec<String> = state
                    .issue_types
                    .iter()
                    .map(|name| {
                        let marker = if state.selected_issue_type.as_ref() == Some(name) { "*" } else { " " };
                        format!("{} {}", marker, name)
                    })
                    .collect();
                if rows.is_empty() {
                    writeln!(self.out, "No issue types loaded; select a project first")?;
                }
                for row in rows {
                    writeln!(self.out, "{}", row)?;
                }
            }
            Command::Type(name) => {
                self.workspace.select_issue_type(&name)?;
                let selected = self.workspace.state().selected_issue_type.clone().unwrap_or_default();
                self.notice(&Notice::info("Issue type", format!("Using {}", selected)))?;
            }
            Command::Summary(text) => {
                self.workspace.set_summary(&text)?;
                self.notice(&Notice::info("Summary", "Updated"))?;
            }
            Command::Tasks => {
                let rows = self.workspace.task_list().await?;
                if rows.is_empty() {
                    writeln!(self.out, "No tasks in this project")?;
                }
                for (index, row) in rows.iter().enumerate() {
                    writeln!(self.out, "{:>3}. {}", index + 1, row.display())?;
                }
            }
            Command::Pick(selector) => {
                let row = self.workspace.select_task(&selector)?;
                self.notice(&Notice::info(
                    "Tasks",
                    format!("Working on {}: {}", row.key, row.summary),
                ))?;
            }
            Command::Labels => {
                let choices = self.workspace.open_label_editor().await?;
                self.print_choices(&choices)?;
            }
            Command::Toggle(position) => {
                self.workspace.toggle_label(position)?;
                let choices = self.workspace.label_choices()?;
                self.print_choices(&choices)?;
            }
            Command::Label(name) => {
                self.workspace.add_label(&name)?;
                let choices = self.workspace.label_choices()?;
                self.print_choices(&choices)?;
            }
            Command::LabelsSave => {
                let notice = match self.workspace.save_labels().await? {
                    LabelSave::NoChanges => Notice::info("Labels", "No changes"),
                    LabelSave::Staged(labels) => Notice::info(
                        "Labels",
                        format!("Will be applied to the new task: [{}]", labels.join(", ")),
                    ),
                    LabelSave::Updated { issue_key, labels } => Notice::info(
                        "Labels",
                        format!("{} now has [{}]", issue_key, labels.join(", ")),
                    ),
                };
                self.notice(&notice)?;
            }
            Command::LabelsCancel => {
                if self.workspace.cancel_labels() {
                    writeln!(self.out, "Label changes discarded")?;
                }
            }
            Command::Start => {
                let outcome = self.workspace.start_timer().await?;
                let message = if outcome.created {
                    format!("Created {} and started the timer", outcome.issue_key)
                } else {
                    format!("Timer started on {}", outcome.issue_key)
                };
                self.notice(&Notice::info("Timer", message))?;
            }
            Command::Stop => {
                let notice = stop_notice(self.workspace.stop_timer().await);
                self.notice(&notice)?;
                writeln!(self.out, "{}", self.workspace.timer_display())?;
            }
            Command::Status(target) => {
                self.workspace.change_status(&target).await?;
                let issue = self.workspace.state().current_issue_key.clone().unwrap_or_default();
                self.notice(&Notice::info("Status", format!("{} moved to {}", issue, target)))?;
            }
            Command::Assign => {
                let issue = self.workspace.assign_to_me().await?;
                self.notice(&Notice::info("Assign", format!("{} is assigned to you", issue)))?;
            }
            Command::Timer => writeln!(self.out, "{}", self.workspace.timer_display())?,
            Command::Watch => return Ok(self.watch(lines).await?),
            Command::State => {
                let view = self.workspace.view();
                writeln!(self.out, "{}", serde_json::to_string_pretty(&view)?)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn print_choices(&mut self, choices: &[LabelChoice]) -> io::Result<()> {
        if choices.is_empty() {
            writeln!(self.out, "No labels yet; add one with 'label <name>'")?;
        }
        for (index, choice) in choices.iter().enumerate() {
            let mark = if choice.selected { "x" } else { " " };
            writeln!(self.out, "{:>3}. [{}] {}", index + 1, mark, choice.name)?;
        }
        Ok(())
    }

    /// Redraws the timer every second until a line (or end of input) arrives.
    async fn watch<R>(&mut self, lines: &mut Lines<R>) -> io::Result<Flow>
    where
        R: AsyncBufRead + Unpin,
    {
        if !self.workspace.state().timer_running() {
            writeln!(self.out, "{}", self.workspace.timer_display())?;
            return Ok(Flow::Continue);
        }
        writeln!(self.out, "Press Enter to stop watching")?;
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    write!(self.out, "\r{}", self.workspace.timer_display())?;
                    self.out.flush()?;
                }
                line = lines.next_line() => {
                    writeln!(self.out)?;
                    return Ok(match line? {
                        Some(_) => Flow::Continue,
                        None => Flow::Quit,
                    });
                }
            }
        }
    }
}

fn stop_notice(outcome: StopOutcome) -> Notice {
    match outcome {
        StopOutcome::NotRunning => Notice::warning("Timer", "The timer is not running"),
        StopOutcome::Stopped {
            issue_key,
            elapsed,
            duration,
            worklog,
        } => match worklog {
            WorklogOutcome::Logged { id } => {
                info!("Work log {} recorded", id);
                Notice::info(
                    "Work log",
                    format!(
                        "Logged {} on {}",
                        duration,
                        issue_key.unwrap_or_default()
                    ),
                )
            }
            WorklogOutcome::TooShort => Notice::warning(
                "Work log",
                format!("{}s is too short to log; nothing was sent", elapsed),
            ),
            WorklogOutcome::NoIssue => {
                Notice::warning("Work log", "No task is bound; the time was not logged")
            }
            WorklogOutcome::Failed(message) => Notice::error("Work log", message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_api::{JiraClient, JiraConfig};

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(Command::parse("  "), Ok(None));
        assert_eq!(Command::parse("start"), Ok(Some(Command::Start)));
        assert_eq!(
            Command::parse("project  Focus Team "),
            Ok(Some(Command::Project("Focus Team".into())))
        );
        assert_eq!(
            Command::parse("STATUS In Progress"),
            Ok(Some(Command::Status("In Progress".into())))
        );
        assert_eq!(Command::parse("labels save"), Ok(Some(Command::LabelsSave)));
        assert_eq!(Command::parse("toggle 3"), Ok(Some(Command::Toggle(3))));
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn rejects_unknown_and_incomplete_commands() {
        assert_eq!(
            Command::parse("dance"),
            Err(ParseError::Unknown("dance".into()))
        );
        assert_eq!(
            Command::parse("summary"),
            Err(ParseError::Usage("summary <text>"))
        );
        assert_eq!(Command::parse("toggle x"), Err(ParseError::Usage("toggle <n>")));
        assert_eq!(
            Command::parse("labels maybe"),
            Err(ParseError::Usage("labels [save|cancel]"))
        );
    }

    #[tokio::test]
    async fn failures_become_notices_and_the_loop_continues() {
        let server = mockito::Server::new_async().await;
        let client = JiraClient::new(JiraConfig::new(server.url(), "me", "token")).unwrap();
        let mut shell = Shell::new(Workspace::new(client), Vec::new());

        let input: &[u8] = b"start\nstop\nbogus\nstate\nquit\ntimer\n";
        shell.run(input).await.unwrap();

        let (_, out) = shell.into_parts();
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("[ERROR] Start timer: no project selected"));
        assert!(output.contains("[WARN] Timer: The timer is not running"));
        assert!(output.contains("unknown command 'bogus'"));
        assert!(output.contains("\"phase\": \"NoProject\""));
        assert_eq!(output.matches("jira-focus> ").count(), 5);
    }

    #[test]
    fn stop_notice_reports_worklog_outcome() {
        let notice = stop_notice(StopOutcome::Stopped {
            issue_key: Some("FOC-1".into()),
            elapsed: 90,
            duration: "2m".into(),
            worklog: WorklogOutcome::Logged { id: "1".into() },
        });
        assert_eq!(notice.render(), "[OK] Work log: Logged 2m on FOC-1");

        let notice = stop_notice(StopOutcome::Stopped {
            issue_key: None,
            elapsed: 0,
            duration: "0m".into(),
            worklog: WorklogOutcome::TooShort,
        });
        assert_eq!(notice.render(), "[WARN] Work log: 0s is too short to log; nothing was sent");
    }
}
