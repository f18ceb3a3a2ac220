use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::gcloud::ExecError;

/// Abstraction over external command execution for testability.
///
/// Production code uses [`ProcessRunner`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    async fn run(&self, program: &str, args: &[String]) -> Result<(), ExecError>;
}

/// Runs commands as child processes, forwarding their output to the
/// configured sinks while they run.
///
/// The child sees exactly `env`; the parent environment is not inherited.
pub struct ProcessRunner<O = tokio::io::Stdout, E = tokio::io::Stderr> {
    dir: PathBuf,
    env: Vec<(OsString, OsString)>,
    stdout: Mutex<O>,
    stderr: Mutex<E>,
    dry_run: bool,
}

impl ProcessRunner {
    /// Runner writing to this process's own stdout and stderr.
    pub fn inherit(
        dir: impl Into<PathBuf>,
        env: Vec<(OsString, OsString)>,
        dry_run: bool,
    ) -> Self {
        Self::new(dir, env, tokio::io::stdout(), tokio::io::stderr(), dry_run)
    }
}

impl<O, E> ProcessRunner<O, E>
where
    O: AsyncWrite + Unpin + Send,
    E: AsyncWrite + Unpin + Send,
{
    pub fn new(
        dir: impl Into<PathBuf>,
        env: Vec<(OsString, OsString)>,
        stdout: O,
        stderr: E,
        dry_run: bool,
    ) -> Self {
        Self {
            dir: dir.into(),
            env,
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Give back the stdout and stderr sinks.
    pub fn into_sinks(self) -> (O, E) {
        (self.stdout.into_inner(), self.stderr.into_inner())
    }
}

impl<O, E> CommandRunner for ProcessRunner<O, E>
where
    O: AsyncWrite + Unpin + Send,
    E: AsyncWrite + Unpin + Send,
{
    async fn run(&self, program: &str, args: &[String]) -> Result<(), ExecError> {
        tracing::info!(program, ?args, dry_run = self.dry_run, "running");
        if self.dry_run {
            return Ok(());
        }

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.dir)
            .env_clear()
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn {
                program: program.to_owned(),
                source: e,
            })?;

        let mut child_stdout = child.stdout.take();
        let mut child_stderr = child.stderr.take();
        let mut stdout = self.stdout.lock().await;
        let mut stderr = self.stderr.lock().await;

        let forward_stdout = async {
            if let Some(out) = child_stdout.as_mut() {
                tokio::io::copy(out, &mut *stdout).await?;
            }
            stdout.flush().await
        };
        let forward_stderr = async {
            if let Some(err) = child_stderr.as_mut() {
                tokio::io::copy(err, &mut *stderr).await?;
            }
            stderr.flush().await
        };

        let stream_error = |e| ExecError::Stream {
            program: program.to_owned(),
            source: e,
        };

        tokio::try_join!(forward_stdout, forward_stderr).map_err(stream_error)?;
        let status = child.wait().await.map_err(stream_error)?;

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::Failed {
                program: program.to_owned(),
                args: args.to_vec(),
                status,
            })
        }
    }
}
