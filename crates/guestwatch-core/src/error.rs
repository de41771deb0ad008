use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuestwatchError {
    #[error("not initialized: run 'guestwatch init'")]
    NotInitialized,

    #[error("configuration errors:\n  {}", .0.join("\n  "))]
    Config(Vec<String>),

    #[error("order fetch failed: {0}")]
    Fetch(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GuestwatchError>;
