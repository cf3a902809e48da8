use std::process::ExitCode;

fn main() -> ExitCode {
    jira_focus_lib::run()
}
