use std::path::Path;

use crate::executor::{CommandRunner, ProcessRunner};
use crate::gcloud::ExecError;
use crate::plan::ExecutionPlan;

/// Program invoked when no override is given.
pub const DEFAULT_PROGRAM: &str = "gcloud";

/// gcloud operations client, parameterized over the runner for testability.
pub struct GcloudClient<R: CommandRunner = ProcessRunner> {
    runner: R,
    program: String,
}

impl<R: CommandRunner> GcloudClient<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            program: DEFAULT_PROGRAM.to_owned(),
        }
    }

    /// Invoke `program` instead of `gcloud` (e.g. a test double).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    // ── Steps ──

    /// `gcloud version`
    pub async fn version(&self) -> Result<(), ExecError> {
        self.runner.run(&self.program, &args(["version"])).await
    }

    /// `gcloud auth activate-service-account --key-file <key_file>`
    pub async fn activate_service_account(&self, key_file: &Path) -> Result<(), ExecError> {
        let key_file = key_file.to_string_lossy();
        self.runner
            .run(
                &self.program,
                &args([
                    "auth",
                    "activate-service-account",
                    "--key-file",
                    &*key_file,
                ]),
            )
            .await
    }

    /// `gcloud <plan...>`
    pub async fn execute_plan(&self, plan: &ExecutionPlan) -> Result<(), ExecError> {
        self.runner.run(&self.program, plan.args()).await
    }

    // ── Deploy ──

    /// Probe the CLI, activate the service account key, then run the plan.
    ///
    /// Stops at the first failing step.
    pub async fn deploy(&self, plan: &ExecutionPlan, key_file: &Path) -> Result<(), DeployError> {
        self.version()
            .await
            .map_err(|e| DeployError::Version { source: e })?;

        self.activate_service_account(key_file)
            .await
            .map_err(|e| DeployError::Activate { source: e })?;

        self.execute_plan(plan)
            .await
            .map_err(|e| DeployError::Plan { source: e })?;

        tracing::info!(program = %self.program, "deployment finished");
        Ok(())
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("version probe failed")]
    Version { source: ExecError },

    #[error("service account activation failed")]
    Activate { source: ExecError },

    #[error("cloud run command failed")]
    Plan { source: ExecError },
}
