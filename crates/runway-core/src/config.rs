use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::env::PluginEnv;
use crate::error::{ConfigError, Result};

/// Platform passed to `--platform` when `RUNTIME` is not set.
pub const DEFAULT_RUNTIME: &str = "managed";

/// Settings starting with this prefix become `NAME=VALUE` service
/// environment entries.
pub const ENV_SECRET_PREFIX: &str = "ENV_SECRET_";

/// What the plugin was asked to do.
///
/// Parsing never fails: unknown actions are kept verbatim so that the
/// plan builder can reject them with a precise error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Deploy,
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Deploy => "deploy",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "deploy" => Self::Deploy,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated deployment request.
///
/// Built once from the plugin environment by [`Configuration::resolve`].
pub struct Configuration {
    pub action: Action,
    pub working_directory: PathBuf,

    /// Service account key (JSON) used to activate gcloud credentials.
    pub credential_token: SecretString,

    // Cloud Run runtime
    pub project_id: String,
    pub runtime_platform: String,
    pub region: Option<String>,
    pub service_account: Option<String>,

    // Deployed service
    pub service_name: String,
    pub image_reference: String,
    pub allow_unauthenticated: bool,
    pub concurrency: Option<String>,
    pub memory_limit: Option<String>,
    pub request_timeout: Option<String>,
    pub environment_variables: BTreeMap<String, String>,
    /// Pre-formatted `NAME=VALUE` entries, in resolution order.
    pub environment_secrets: Vec<String>,

    /// Extra `gcloud` flags; an empty value means a valueless flag.
    pub additional_flags: BTreeMap<String, String>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("action", &self.action)
            .field("working_directory", &self.working_directory)
            .field("credential_token", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("runtime_platform", &self.runtime_platform)
            .field("region", &self.region)
            .field("service_account", &self.service_account)
            .field("service_name", &self.service_name)
            .field("image_reference", &self.image_reference)
            .field("allow_unauthenticated", &self.allow_unauthenticated)
            .field("concurrency", &self.concurrency)
            .field("memory_limit", &self.memory_limit)
            .field("request_timeout", &self.request_timeout)
            .field(
                "environment_variables",
                &self.environment_variables.keys().collect::<Vec<_>>(),
            )
            .field("environment_secrets", &self.environment_secrets.len())
            .field("additional_flags", &self.additional_flags)
            .finish()
    }
}

impl Configuration {
    /// Resolve a configuration from the plugin environment.
    ///
    /// Fails on the first missing required setting, or when `ADDL_FLAGS`
    /// is not a JSON object of strings. A malformed `ENVIRONMENT` is only
    /// logged.
    pub fn resolve(env: &PluginEnv) -> Result<Self> {
        let action = required(env.get("ACTION"), "action")?;

        let runtime_platform = env
            .get_opt("RUNTIME")
            .unwrap_or_else(|| DEFAULT_RUNTIME.to_owned());

        let service_name = required(env.get("SERVICE"), "service")?;

        // Drone 0.8 passes settings top-level, where `image` clashes with the
        // step image, hence `deployment_image`.
        let image_reference = required(env.get_first(&["IMAGE", "DEPLOYMENT_IMAGE"]), "image")?;

        let token = required(env.get_first(&["TOKEN", "RAW_TOKEN"]), "token")?;

        let environment_variables = parse_environment(env.get("ENVIRONMENT"));

        let additional_flags = decode_object(env.get("ADDL_FLAGS")).map_err(|source| {
            tracing::error!(
                error = %source,
                raw = env.get("ADDL_FLAGS"),
                "failed to decode additional flags"
            );
            ConfigError::InvalidEncoding {
                field: "additional flags",
                source,
            }
        })?;

        let environment_secrets = env
            .with_prefix(ENV_SECRET_PREFIX)
            .map(|(name, value)| format!("{name}={value}"))
            .collect();

        let project_id = match env.get_opt("PROJECT") {
            Some(project) => project,
            None => project_from_token(&token).ok_or(ConfigError::MissingField("project"))?,
        };
        tracing::info!(project_id = %project_id, "using project ID");

        let working_directory = working_directory(env.get("WORKSPACE"), env.get("DIR"));

        Ok(Self {
            action: Action::from(action.as_str()),
            working_directory,
            credential_token: SecretString::from(token),
            project_id,
            runtime_platform,
            region: env.get_opt("REGION"),
            service_account: env.get_opt("SVC_ACCOUNT"),
            service_name,
            image_reference,
            allow_unauthenticated: env.get("ALLOW_UNAUTHENTICATED") == "true",
            concurrency: env.get_opt("CONCURRENCY"),
            memory_limit: env.get_opt("MEMORY"),
            request_timeout: env.get_opt("TIMEOUT"),
            environment_variables,
            environment_secrets,
            additional_flags,
        })
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(default)]
    project_id: Option<String>,
}

/// Extract `project_id` from a service account key.
///
/// Returns `None` when the token is not a JSON object or has no
/// non-empty `project_id` string.
pub fn project_from_token(token: &str) -> Option<String> {
    match serde_json::from_str::<ServiceAccountKey>(token) {
        Ok(key) => key.project_id.filter(|p| !p.is_empty()),
        // arch-lint: allow(no-error-swallowing) reason="an opaque token just means the project must be set explicitly"
        Err(e) => {
            tracing::debug!(error = %e, "token is not a service account key");
            None
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String> {
    if value.is_empty() {
        Err(ConfigError::MissingField(field))
    } else {
        Ok(value.to_owned())
    }
}

/// `DIR` nested under `WORKSPACE`, even when `DIR` is absolute.
///
/// Without a workspace `DIR` is used as given; with neither, `.`.
fn working_directory(workspace: &str, dir: &str) -> PathBuf {
    if workspace.is_empty() {
        return if dir.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(dir)
        };
    }

    let relative: PathBuf = Path::new(dir)
        .components()
        .filter(|c| !matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect();
    Path::new(workspace).join(relative)
}

/// Decode a JSON object of strings. Blank input and `null` decode to an
/// empty map; `null` values decode to `""`.
fn decode_object(raw: &str) -> serde_json::Result<BTreeMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let object: Option<BTreeMap<String, Option<String>>> = serde_json::from_str(raw)?;
    Ok(object
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}

fn parse_environment(raw: &str) -> BTreeMap<String, String> {
    match decode_object(raw) {
        Ok(vars) => vars,
        // arch-lint: allow(no-error-swallowing) reason="a malformed environment is logged and deployment proceeds without it"
        Err(e) => {
            tracing::warn!(error = %e, raw, "ignoring malformed environment");
            BTreeMap::new()
        }
    }
}
