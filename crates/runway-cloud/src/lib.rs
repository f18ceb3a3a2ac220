//! gcloud side of runway: compiling a [`runway_core::Configuration`] into an
//! [`ExecutionPlan`], materializing credentials, and running `gcloud`.

pub mod client;
pub mod credentials;
pub mod executor;
pub mod gcloud;
pub mod plan;

pub use client::{DEFAULT_PROGRAM, DeployError, GcloudClient};
pub use credentials::{CredentialError, CredentialFile};
pub use executor::{CommandRunner, ProcessRunner};
pub use gcloud::ExecError;
pub use plan::{ENV_SEPARATOR, ExecutionPlan, PlanError, decode_delimited, encode_delimited};
