use crate::lifecycle::LifecycleError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModgateError>;

#[derive(Debug, Error)]
pub enum ModgateError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },
}

impl ModgateError {
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }
}
