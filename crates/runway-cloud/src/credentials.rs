use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to create credential file in {dir}")]
    Create {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write credential file {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove credential file {path}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Service account key materialized on disk for `gcloud auth`.
///
/// Each invocation gets its own file, readable and writable by the owner
/// only. The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct CredentialFile {
    file: NamedTempFile,
}

impl CredentialFile {
    /// Write `token` to a new file in `dir`, or the system temp dir.
    pub fn write(token: &SecretString, dir: Option<&Path>) -> Result<Self, CredentialError> {
        let dir = dir.map_or_else(std::env::temp_dir, Path::to_path_buf);

        let mut file = tempfile::Builder::new()
            .prefix("token")
            .suffix(".json")
            .tempfile_in(&dir)
            .map_err(|e| CredentialError::Create {
                dir: dir.clone(),
                source: e,
            })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(write_error(file.path()))?;
        }

        file.write_all(token.expose_secret().as_bytes())
            .map_err(write_error(file.path()))?;
        file.flush().map_err(write_error(file.path()))?;

        tracing::debug!(path = %file.path().display(), "credential file written");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, reporting failures instead of ignoring them
    /// as drop does.
    pub fn remove(self) -> Result<(), CredentialError> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|e| CredentialError::Remove { path, source: e })
    }
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> CredentialError + use<> {
    let path = path.to_path_buf();
    move |e| CredentialError::Write { path, source: e }
}
