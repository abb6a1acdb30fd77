//! External command dispatch and result classification.
//!
//! Every invocation redirects stdout/stderr into `<cmd>.log` / `<cmd>.err`
//! under the case's log folder. Classification reads only the error file:
//! success iff it is empty after the process exits. The exit code is
//! deliberately ignored - solver tools signal failure through their error
//! stream, not their status - which leaves a known blind spot for commands
//! that exit non-zero without writing to stderr.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::{Child, Command};

/// Errors raised while setting up a command run.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to prepare log files for {command} under {log_dir}")]
    LogSetup {
        command: String,
        log_dir: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {command_line}")]
    Spawn {
        command_line: String,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal state of a completed command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// Parallel decomposition of a run across solver sub-domains.
///
/// The engine only wraps the command line (`mpirun -np N <cmd> -parallel`);
/// the decomposition itself is the external solver's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelSpec {
    pub subdomains: usize,
}

/// Result of a completed command run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub command: String,
    pub status: RunStatus,
    /// Verbatim error-file content when the run failed.
    pub error: Option<String>,
    pub duration: Duration,
    pub log_file: Utf8PathBuf,
    pub error_file: Utf8PathBuf,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Full log output of the run. Surfaced on request, never used for
    /// success classification.
    pub fn log_contents(&self) -> Result<String> {
        fs::read_to_string(&self.log_file)
            .with_context(|| format!("failed to read log file {}", self.log_file))
    }
}

/// A command started without waiting: the caller owns the child handle and
/// polls it (or the log/error files) itself. No timeout or cancellation is
/// provided here - terminate the child directly if needed.
#[derive(Debug)]
pub struct DispatchedCommand {
    pub child: Child,
    pub command_line: String,
    pub log_file: Utf8PathBuf,
    pub error_file: Utf8PathBuf,
}

/// Dispatches named external commands against a case folder.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    working_dir: Utf8PathBuf,
    log_dir: Utf8PathBuf,
}

impl ExecutionEngine {
    /// `working_dir` is the project root commands run in; `log_dir` receives
    /// the per-command log and error files.
    pub fn new(working_dir: impl Into<Utf8PathBuf>, log_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Utf8Path {
        &self.log_dir
    }

    /// The program and argument vector for a run, parallel wrapper included.
    fn build_command(
        &self,
        command: &str,
        args: &[&str],
        parallel: Option<ParallelSpec>,
    ) -> (String, Vec<String>) {
        match parallel {
            Some(spec) => {
                let mut argv = vec![
                    "-np".to_string(),
                    spec.subdomains.to_string(),
                    command.to_string(),
                    "-parallel".to_string(),
                ];
                argv.extend(args.iter().map(|a| a.to_string()));
                ("mpirun".to_string(), argv)
            }
            None => (
                command.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            ),
        }
    }

    fn spawn(
        &self,
        command: &str,
        args: &[&str],
        parallel: Option<ParallelSpec>,
    ) -> Result<DispatchedCommand, ExecutionError> {
        let log_file = self.log_dir.join(format!("{command}.log"));
        let error_file = self.log_dir.join(format!("{command}.err"));

        let setup_err = |source| ExecutionError::LogSetup {
            command: command.to_string(),
            log_dir: self.log_dir.clone(),
            source,
        };
        fs::create_dir_all(&self.log_dir).map_err(setup_err)?;
        let log = File::create(&log_file).map_err(setup_err)?;
        let err = File::create(&error_file).map_err(setup_err)?;

        let (program, argv) = self.build_command(command, args, parallel);
        let command_line = std::iter::once(program.as_str())
            .chain(argv.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!("dispatching: {}", command_line);

        let child = Command::new(&program)
            .args(&argv)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err))
            .spawn()
            .map_err(|source| ExecutionError::Spawn {
                command_line: command_line.clone(),
                source,
            })?;

        Ok(DispatchedCommand {
            child,
            command_line,
            log_file,
            error_file,
        })
    }

    /// Start a command without waiting for it.
    pub fn dispatch(
        &self,
        command: &str,
        args: &[&str],
        parallel: Option<ParallelSpec>,
    ) -> Result<DispatchedCommand> {
        Ok(self.spawn(command, args, parallel)?)
    }

    /// Run a command to completion and classify the result.
    pub async fn run(
        &self,
        command: &str,
        args: &[&str],
        parallel: Option<ParallelSpec>,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let mut dispatched = self.spawn(command, args, parallel)?;

        let status = dispatched
            .child
            .wait()
            .await
            .with_context(|| format!("failed to wait for {}", dispatched.command_line))?;
        let duration = start.elapsed();

        let (run_status, error) = classify(&dispatched.error_file)?;
        tracing::info!(
            "{} finished in {:.2}s: {:?} (exit code {:?})",
            command,
            duration.as_secs_f32(),
            run_status,
            status.code(),
        );

        Ok(RunReport {
            command: command.to_string(),
            status: run_status,
            error,
            duration,
            log_file: dispatched.log_file,
            error_file: dispatched.error_file,
        })
    }
}

/// Classify a finished run from its error file: success iff the file is
/// empty. On failure the file's content is reported verbatim.
pub fn classify(error_file: &Utf8Path) -> Result<(RunStatus, Option<String>)> {
    let content = fs::read_to_string(error_file)
        .with_context(|| format!("failed to read error file {error_file}"))?;
    if content.is_empty() {
        Ok((RunStatus::Succeeded, None))
    } else {
        Ok((RunStatus::Failed, Some(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(temp: &TempDir) -> ExecutionEngine {
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        ExecutionEngine::new(root.clone(), root.join("log"))
    }

    #[test]
    fn test_build_command_plain() {
        let temp = TempDir::new().unwrap();
        let (program, argv) = engine(&temp).build_command("blockMesh", &["-help"], None);
        assert_eq!(program, "blockMesh");
        assert_eq!(argv, vec!["-help"]);
    }

    #[test]
    fn test_build_command_parallel_wrapper() {
        let temp = TempDir::new().unwrap();
        let (program, argv) = engine(&temp).build_command(
            "snappyHexMesh",
            &["-overwrite"],
            Some(ParallelSpec { subdomains: 4 }),
        );
        assert_eq!(program, "mpirun");
        assert_eq!(
            argv,
            vec!["-np", "4", "snappyHexMesh", "-parallel", "-overwrite"]
        );
    }

    #[test]
    fn test_classify_empty_and_non_empty() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let empty = root.join("empty.err");
        fs::write(&empty, "").unwrap();
        assert_eq!(classify(&empty).unwrap(), (RunStatus::Succeeded, None));

        let failed = root.join("failed.err");
        fs::write(&failed, "FOAM FATAL ERROR\n").unwrap();
        let (status, error) = classify(&failed).unwrap();
        assert_eq!(status, RunStatus::Failed);
        // failure content is reported verbatim
        assert_eq!(error.as_deref(), Some("FOAM FATAL ERROR\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_succeeds_on_quiet_stderr() {
        let temp = TempDir::new().unwrap();
        let report = engine(&temp).run("echo", &["mesh", "ok"], None).await.unwrap();

        assert!(report.success());
        assert_eq!(report.error, None);
        assert!(report.log_contents().unwrap().contains("mesh ok"));
        assert!(report.log_file.as_str().ends_with("echo.log"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_fails_on_stderr_output_despite_exit_zero() {
        let temp = TempDir::new().unwrap();
        // writes to stderr but exits 0: classification must still be Failed
        let report = engine(&temp)
            .run("sh", &["-c", "echo boom 1>&2; exit 0"], None)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.error.as_deref(), Some("boom\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dispatch_returns_immediately() {
        let temp = TempDir::new().unwrap();
        let mut dispatched = engine(&temp).dispatch("sleep", &["5"], None).unwrap();

        // still running right after dispatch
        assert!(dispatched.child.try_wait().unwrap().is_none());
        dispatched.child.kill().await.unwrap();
    }

    #[test]
    fn test_spawn_missing_command_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = engine(&temp)
            .dispatch("definitely_not_a_real_solver_tool", &[], None)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::Spawn { .. })
        ));
    }
}
