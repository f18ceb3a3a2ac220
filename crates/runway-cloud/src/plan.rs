use std::fmt;

use runway_core::{Action, Configuration};

/// Separator used inside `--set-env-vars`; values may contain `,` and `=`.
pub const ENV_SEPARATOR: &str = ":||:";

/// Leading arguments of every plan.
const PREAMBLE: [&str; 3] = ["--quiet", "beta", "run"];

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("action: {0} not implemented yet")]
    UnsupportedAction(String),
}

/// Ordered `gcloud` arguments for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    args: Vec<String>,
}

impl ExecutionPlan {
    /// Compile a configuration into `gcloud` arguments.
    pub fn build(cfg: &Configuration) -> Result<Self, PlanError> {
        let mut args: Vec<String> = PREAMBLE.iter().map(|s| (*s).to_owned()).collect();

        match &cfg.action {
            Action::Deploy => push_deploy(&mut args, cfg),
            Action::Other(name) => return Err(PlanError::UnsupportedAction(name.clone())),
        }

        Ok(Self { args })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Value passed to `--set-env-vars`, if the plan sets any.
    pub fn set_env_vars(&self) -> Option<&str> {
        self.flag_value("--set-env-vars")
    }

    /// Value following `flag` when it is passed as a separate argument.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

fn push_deploy(args: &mut Vec<String>, cfg: &Configuration) {
    let mut push = |flag: &str, value: &str| {
        args.push(flag.to_owned());
        args.push(value.to_owned());
    };

    push("deploy", &cfg.service_name);
    push("--image", &cfg.image_reference);
    push("--project", &cfg.project_id);
    push("--platform", &cfg.runtime_platform);

    if let Some(account) = &cfg.service_account {
        push("--service-account", account);
    }

    if !cfg.environment_secrets.is_empty() || !cfg.environment_variables.is_empty() {
        let entries: Vec<String> = cfg
            .environment_secrets
            .iter()
            .cloned()
            .chain(
                cfg.environment_variables
                    .iter()
                    .map(|(k, v)| format!("{k}={v}")),
            )
            .collect();
        push("--set-env-vars", &encode_delimited(&entries));
    }

    if cfg.allow_unauthenticated {
        args.push("--allow-unauthenticated".to_owned());
    }

    for (flag, value) in [
        ("--concurrency", &cfg.concurrency),
        ("--memory", &cfg.memory_limit),
        ("--region", &cfg.region),
    ] {
        if let Some(value) = value {
            args.push(flag.to_owned());
            args.push(value.clone());
        }
    }

    args.extend(cfg.additional_flags.iter().map(|(flag, value)| {
        if value.is_empty() {
            format!("--{flag}")
        } else {
            format!("--{flag}={value}")
        }
    }));
}

/// Join `entries` with [`ENV_SEPARATOR`] and announce the separator,
/// gcloud's `^DELIM^` syntax.
pub fn encode_delimited(entries: &[String]) -> String {
    format!(
        "^{sep}^{joined}",
        sep = ENV_SEPARATOR,
        joined = entries.join(ENV_SEPARATOR)
    )
}

/// Split a `^DELIM^`-encoded value back into its entries.
///
/// Returns `None` when `value` carries no delimiter header.
pub fn decode_delimited(value: &str) -> Option<Vec<String>> {
    let rest = value.strip_prefix('^')?;
    let (sep, body) = rest.split_once('^')?;
    if sep.is_empty() {
        return None;
    }
    if body.is_empty() {
        return Some(Vec::new());
    }
    Some(body.split(sep).map(str::to_owned).collect())
}
