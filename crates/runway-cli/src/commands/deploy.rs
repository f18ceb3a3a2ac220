use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use runway_cloud::{CredentialFile, ExecutionPlan, GcloudClient, ProcessRunner};
use runway_core::{Configuration, PluginEnv};

pub struct DeployOptions {
    pub dry_run: bool,
    pub env_file: Option<PathBuf>,
    pub program: String,
    pub key_dir: Option<PathBuf>,
}

/// Resolve settings, build the plan, then run version probe → service
/// account activation → plan.
pub async fn deploy(opts: DeployOptions) -> anyhow::Result<()> {
    let vars = collect_vars(opts.env_file.as_deref())?;

    let env = PluginEnv::from_vars(utf8_vars(&vars));
    let config = Configuration::resolve(&env).context("failed to resolve configuration")?;
    let plan = ExecutionPlan::build(&config)?;
    tracing::debug!(%plan, "execution plan");

    let credentials = CredentialFile::write(&config.credential_token, opts.key_dir.as_deref())?;

    let runner = ProcessRunner::inherit(&config.working_directory, vars, opts.dry_run);
    let client = GcloudClient::with_runner(runner).with_program(opts.program);

    let outcome = client.deploy(&plan, credentials.path()).await;
    let removed = credentials.remove();

    match (outcome, removed) {
        // arch-lint: allow(no-error-swallowing) reason="the deploy failure is the error reported; the cleanup failure is logged"
        (Err(e), Err(cleanup)) => {
            tracing::warn!(error = %cleanup, "failed to remove credential file");
            Err(e.into())
        }
        (outcome, removed) => {
            outcome?;
            removed?;
            Ok(())
        }
    }
}

/// Process environment, layered over the optional dotenv file.
///
/// Variables that are not valid UTF-8 are still passed to gcloud.
fn collect_vars(env_file: Option<&Path>) -> anyhow::Result<Vec<(OsString, OsString)>> {
    let mut vars = BTreeMap::new();

    if let Some(path) = env_file {
        let entries = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to read env file {}", path.display()))?;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("failed to parse env file {}", path.display()))?;
            vars.insert(OsString::from(key), OsString::from(value));
        }
        tracing::debug!(path = %path.display(), "loaded env file");
    }

    vars.extend(std::env::vars_os());
    Ok(vars.into_iter().collect())
}

/// The UTF-8 subset of `vars`, which is all plugin settings can be.
fn utf8_vars(vars: &[(OsString, OsString)]) -> impl Iterator<Item = (&str, &str)> {
    vars.iter().filter_map(|(key, value)| match (key.to_str(), value.to_str()) {
        (Some(key), Some(value)) => Some((key, value)),
        _ => {
            tracing::warn!(
                name = %key.to_string_lossy(),
                "ignoring non UTF-8 environment variable"
            );
            None
        }
    })
}
