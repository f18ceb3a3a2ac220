pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("failed to parse {field}")]
    InvalidEncoding {
        field: &'static str,
        source: serde_json::Error,
    },
}
