use crate::error::{Result, SqlSheetError};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

/// A program plus its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCommand {
    pub title: String,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl ExternalCommand {
    pub fn new<S: Into<String>>(program: S, timeout: Duration) -> Self {
        let program = program.into();
        Self {
            title: program.clone(),
            program,
            args: Vec::new(),
            timeout,
        }
    }

    pub fn titled<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    /// Stopped by a signal before reporting an exit code.
    Terminated,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    pub fn describe(&self) -> String {
        match self.status {
            CommandStatus::Exited(0) => format!("succeeded in {:.1}s", self.duration.as_secs_f64()),
            CommandStatus::Exited(code) => format!("failed with exit code {}", code),
            CommandStatus::Terminated => "terminated by signal".to_string(),
            CommandStatus::TimedOut => {
                format!("timed out after {}s", self.duration.as_secs())
            }
        }
    }
}

/// How the pipeline reaches external tools.
pub trait CommandRunner {
    fn locate(&self, program: &str) -> Option<PathBuf>;
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutcome>;
}

/// Runs real child processes, one at a time, on a private current-thread runtime.
pub struct SystemRunner {
    runtime: tokio::runtime::Runtime,
}

impl SystemRunner {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }

    async fn run_async(command: &ExternalCommand) -> Result<CommandOutcome> {
        let started = Instant::now();

        let child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SqlSheetError::CommandLaunch {
                program: command.program.clone(),
                message: e.to_string(),
            })?;

        // Dropping the child on timeout kills it.
        match tokio::time::timeout(command.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let status = match output.status.code() {
                    Some(code) => CommandStatus::Exited(code),
                    None => CommandStatus::Terminated,
                };
                Ok(CommandOutcome {
                    status,
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration: started.elapsed(),
                })
            }
            Ok(Err(e)) => Err(SqlSheetError::CommandLaunch {
                program: command.program.clone(),
                message: e.to_string(),
            }),
            Err(_) => Ok(CommandOutcome {
                status: CommandStatus::TimedOut,
                stdout: String::new(),
                stderr: String::new(),
                duration: started.elapsed(),
            }),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_on_path(program, std::env::var_os("PATH"))
    }

    fn run(&self, command: &ExternalCommand) -> Result<CommandOutcome> {
        log::info!("Running {}: {}", command.title, command);
        let outcome = self.runtime.block_on(Self::run_async(command))?;

        if !outcome.stdout.trim().is_empty() {
            log::debug!("{} stdout:\n{}", command.title, outcome.stdout.trim_end());
        }
        if !outcome.stderr.trim().is_empty() {
            log::debug!("{} stderr:\n{}", command.title, outcome.stderr.trim_end());
        }

        Ok(outcome)
    }
}

/// Resolves `program` the way a shell would: explicit paths as-is, bare names via PATH.
pub fn find_on_path(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var).find_map(|dir| {
        executable_candidates(program)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(windows)]
fn executable_candidates(program: &str) -> Vec<String> {
    let mut names = vec![program.to_string()];
    for ext in ["exe", "cmd", "bat"] {
        names.push(format!("{}.{}", program, ext));
    }
    names
}

#[cfg(not(windows))]
fn executable_candidates(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_display_quotes_spaces() {
        let command = ExternalCommand::new("databricks", Duration::from_secs(5))
            .args(["labs", "lakebridge"])
            .arg("/data/My Folder/a.sql");

        assert_eq!(
            command.to_string(),
            "databricks labs lakebridge \"/data/My Folder/a.sql\""
        );
        assert_eq!(command.title, "databricks");
    }

    #[test]
    fn test_outcome_descriptions() {
        let outcome = CommandOutcome {
            status: CommandStatus::Exited(2),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_secs(1),
        };
        assert!(!outcome.success());
        assert!(outcome.describe().contains("exit code 2"));

        let timed_out = CommandOutcome {
            status: CommandStatus::TimedOut,
            ..outcome
        };
        assert!(timed_out.describe().contains("timed out"));
    }

    #[test]
    fn test_find_on_path() {
        let temp_dir = TempDir::new().unwrap();
        let tool = temp_dir.path().join(executable_candidates("fake-tool").remove(0));
        std::fs::write(&tool, "").unwrap();

        let path_var = std::env::join_paths([temp_dir.path()]).unwrap();
        assert_eq!(find_on_path("fake-tool", Some(path_var.clone())), Some(tool.clone()));
        assert_eq!(find_on_path("missing-tool", Some(path_var)), None);
        assert_eq!(find_on_path("fake-tool", None), None);
        assert_eq!(
            find_on_path(&tool.to_string_lossy(), None),
            Some(tool)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_output() {
        let runner = SystemRunner::new().unwrap();
        let command = ExternalCommand::new("sh", Duration::from_secs(10))
            .args(["-c", "echo hello; exit 3"]);

        let outcome = runner.run(&command).unwrap();
        assert_eq!(outcome.status, CommandStatus::Exited(3));
        assert_eq!(outcome.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout() {
        let runner = SystemRunner::new().unwrap();
        let command =
            ExternalCommand::new("sleep", Duration::from_millis(200)).arg("5");

        let outcome = runner.run(&command).unwrap();
        assert_eq!(outcome.status, CommandStatus::TimedOut);
    }

    #[test]
    fn test_system_runner_launch_failure() {
        let runner = SystemRunner::new().unwrap();
        let command = ExternalCommand::new("definitely-not-a-real-binary-xyz", Duration::from_secs(1));

        assert!(matches!(
            runner.run(&command),
            Err(SqlSheetError::CommandLaunch { .. })
        ));
    }
}
