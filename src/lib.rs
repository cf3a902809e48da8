use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::io::BufReader;

use jira_api::JiraClient;

pub mod bridge;
pub mod config;
pub mod duration;
pub mod labels;
pub mod session;
pub mod shell;
pub mod timer;
pub mod workflow;
pub mod workspace;

use config::ConfigManager;
use shell::Shell;
use workspace::Workspace;

const USER_AGENT: &str = concat!("jira-focus/", env!("CARGO_PKG_VERSION"));

#[derive(Parser, Debug)]
#[command(name = "jira-focus")]
#[command(about = "Track focused work on Jira issues and log it back to Jira")]
#[command(version)]
pub struct Cli {
    /// Path to config.json (defaults to the platform config directory)
    #[arg(short, long, env = "JIRA_FOCUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Request timeout in seconds
    #[arg(
        long,
        default_value_t = jira_api::config::DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level),
    )
    .format_timestamp_millis()
    .try_init();
}

fn build_workspace(cli: &Cli) -> Result<Workspace, String> {
    let manager = ConfigManager::new(cli.config.clone()).map_err(|err| err.to_string())?;
    let app_config = manager
        .load()
        .map_err(|err| format!("{} ({})", err, manager.path().display()))?;
    info!(
        "Using Jira server {} as {}",
        app_config.jira_server, app_config.jira_username
    );

    let jira_config = app_config
        .to_jira_config()
        .with_user_agent(USER_AGENT)
        .with_timeout(Duration::from_secs(cli.timeout));
    let client = JiraClient::new(jira_config).map_err(|err| err.to_string())?;
    Ok(Workspace::new(client))
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("Starting jira-focus");

    let workspace = match build_workspace(&cli) {
        Ok(workspace) => workspace,
        Err(message) => {
            error!("Startup failed: {}", message);
            eprintln!("jira-focus: {}", message);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("jira-focus: failed to start runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async move {
        let mut workspace = workspace;
        let notices = workspace.startup().await;

        let mut shell = Shell::new(workspace, std::io::stdout());
        for notice in &notices {
            if let Err(err) = shell.notice(notice) {
                error!("Failed to write to stdout: {}", err);
                return ExitCode::FAILURE;
            }
        }

        let result = shell.run(BufReader::new(tokio::io::stdin())).await;

        if let Some(notice) = shell.workspace().shutdown() {
            let _ = shell.notice(&notice);
        }
        info!("jira-focus stopped");

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("Terminal I/O failed: {}", err);
                ExitCode::FAILURE
            }
        }
    })
}
