use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Unknown stream: {0}")]
    UnknownStream(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Stage execution failed for {task}: {message}")]
    StageExecution { task: String, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Already running: {0}")]
    AlreadyRunning(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DomainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn unknown_stream(name: impl Into<String>) -> Self {
        Self::UnknownStream(name.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    pub fn stage_execution(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageExecution {
            task: task.into(),
            message: message.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn already_running(msg: impl Into<String>) -> Self {
        Self::AlreadyRunning(msg.into())
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    pub fn is_unknown_stream(&self) -> bool {
        matches!(self, Self::UnknownStream(_))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }

    pub fn is_stage_execution(&self) -> bool {
        matches!(self, Self::StageExecution { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_match_predicates() {
        assert!(DomainError::config("missing db_url").is_config_error());
        assert!(DomainError::unknown_stream("deployments").is_unknown_stream());
        assert!(DomainError::transport("refused").is_transport_error());
        assert!(DomainError::stage_execution("collectCiPipelines", "boom").is_stage_execution());
        assert!(!DomainError::storage("disk full").is_stage_execution());
    }

    #[test]
    fn test_io_errors_convert() {
        let err: DomainError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, DomainError::IoError(_)));
        assert_eq!(err.to_string(), "I/O error: gone");
    }
}
