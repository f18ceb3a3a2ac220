/// Failure to run an external command.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start {program} — is it installed? https://cloud.google.com/sdk/docs/install")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to forward output of {program}")]
    Stream {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} {args:?} failed: {status}")]
    Failed {
        program: String,
        args: Vec<String>,
        status: std::process::ExitStatus,
    },
}
