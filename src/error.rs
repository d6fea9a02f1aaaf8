//! Error types for Ichijiku

use thiserror::Error;

/// Result type for Ichijiku operations
pub type Result<T> = std::result::Result<T, IchijikuError>;

/// Ichijiku error types
#[derive(Error, Debug)]
pub enum IchijikuError {
    #[error("Invalid container index in {name}: {message}")]
    InvalidIndex { name: String, message: String },

    #[error("Runtime command `{command}` failed: {message}")]
    Runtime { command: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Service {service} links to unknown service {target}")]
    LinkNotFound { service: String, target: String },

    #[error("Fig file parse error: {0}")]
    FigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IchijikuError {
    /// Whether this error belongs to the configuration family, raised before
    /// anything touches the runtime
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            IchijikuError::Config(_)
                | IchijikuError::ServiceNotFound(_)
                | IchijikuError::LinkNotFound { .. }
                | IchijikuError::FigParse(_)
        )
    }

    /// Whether this error came from parsing runtime output
    pub fn is_parse(&self) -> bool {
        matches!(self, IchijikuError::InvalidIndex { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        assert!(IchijikuError::ServiceNotFound("web".to_string()).is_config());
        assert!(IchijikuError::InvalidIndex {
            name: "app_web_x".to_string(),
            message: "invalid digit".to_string(),
        }
        .is_parse());

        let runtime = IchijikuError::Runtime {
            command: "docker stop app_web_1".to_string(),
            message: "exit status 1".to_string(),
        };
        assert!(!runtime.is_config());
        assert!(!runtime.is_parse());
        assert_eq!(
            runtime.to_string(),
            "Runtime command `docker stop app_web_1` failed: exit status 1"
        );
    }
}
