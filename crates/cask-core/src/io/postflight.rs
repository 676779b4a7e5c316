//! Running a cask's postflight command.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use wait_timeout::ChildExt;

use cask_schema::PostflightCommand;

/// Postflight failures. Always reported as warnings by the pipeline.
#[derive(Error, Debug)]
pub enum PostflightError {
    /// The executable could not be started.
    #[error("Failed to run {}: {source}", .program.display())]
    Spawn {
        /// Executable path.
        program: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The command exited unsuccessfully.
    #[error("{} exited with {status}{}", .program.display(), stderr_suffix(.stderr))]
    Exit {
        /// Executable path.
        program: PathBuf,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The command did not finish in time and was killed.
    #[error("{} timed out after {}s", .program.display(), .timeout.as_secs())]
    Timeout {
        /// Executable path.
        program: PathBuf,
        /// Limit that was exceeded.
        timeout: Duration,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Runs a postflight command against an installed bundle.
pub trait CommandRunner: Send + Sync {
    /// Run `command`. `appdir` and `app` feed the argument placeholders.
    fn run(&self, command: &PostflightCommand, appdir: &Path, app: &Path) -> Result<(), PostflightError>;
}

/// Default postflight timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// [`CommandRunner`] that spawns a child process directly, without a shell.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ProcessRunner {
    /// Runner that kills commands exceeding `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &PostflightCommand, appdir: &Path, app: &Path) -> Result<(), PostflightError> {
        let program = command.executable.clone();
        let args = expand_args(&command.args, appdir, app);
        debug!(program = %program.display(), ?args, "running postflight");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PostflightError::Spawn {
                program: program.clone(),
                source,
            })?;

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                child.kill().ok();
                child.wait().ok();
                return Err(PostflightError::Timeout {
                    program,
                    timeout: self.timeout,
                });
            }
            Err(source) => return Err(PostflightError::Spawn { program, source }),
        };

        if status.success() {
            return Ok(());
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr).ok();
        }
        Err(PostflightError::Exit {
            program,
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        })
    }
}

/// Substitute `#{appdir}` / `{{appdir}}` and `#{app}` / `{{app}}` in each argument.
pub fn expand_args(args: &[String], appdir: &Path, app: &Path) -> Vec<String> {
    let appdir = appdir.to_string_lossy();
    let app = app.to_string_lossy();
    args.iter()
        .map(|arg| {
            arg.replace("#{appdir}", &appdir)
                .replace("{{appdir}}", &appdir)
                .replace("#{app}", &app)
                .replace("{{app}}", &app)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(executable: &str, args: &[&str]) -> PostflightCommand {
        PostflightCommand {
            executable: PathBuf::from(executable),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    #[test]
    fn expands_placeholders() {
        let args = vec![
            "-dr".to_string(),
            "com.apple.quarantine".to_string(),
            "#{appdir}/mdiew.app".to_string(),
            "{{app}}".to_string(),
        ];
        let out = expand_args(
            &args,
            Path::new("/Applications"),
            Path::new("/Applications/mdiew.app"),
        );
        assert_eq!(
            out,
            [
                "-dr",
                "com.apple.quarantine",
                "/Applications/mdiew.app",
                "/Applications/mdiew.app"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn success_and_failure() {
        let runner = ProcessRunner::default();
        let dir = Path::new("/tmp");
        assert!(runner.run(&cmd("/bin/sh", &["-c", "exit 0"]), dir, dir).is_ok());

        let err = runner
            .run(&cmd("/bin/sh", &["-c", "echo nope >&2; exit 3"]), dir, dir)
            .unwrap_err();
        match err {
            PostflightError::Exit { stderr, .. } => assert_eq!(stderr, "nope"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn missing_executable() {
        let err = ProcessRunner::default()
            .run(&cmd("/nonexistent/tool", &[]), Path::new("/"), Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, PostflightError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills() {
        let runner = ProcessRunner::new(Duration::from_millis(100));
        let err = runner
            .run(&cmd("/bin/sleep", &["5"]), Path::new("/"), Path::new("/"))
            .unwrap_err();
        assert!(matches!(err, PostflightError::Timeout { .. }));
    }
}
