use thiserror::Error;

use jdao_runtime::RuntimeError;
use jdao_types::error::DaoError;

/// Errors that can occur in the node.
#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum NodeError {
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    #[error("scenario error: {reason}")]
    ScenarioError { reason: String },

    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("runtime error: {0}")]
    RuntimeError(#[from] RuntimeError),

    #[error("protocol error: {0}")]
    ProtocolError(#[from] DaoError),

    #[error("metrics encoding failed")]
    MetricsError,

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = NodeError::ConfigError {
            reason: "missing field".to_string(),
        };
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_runtime_error_from() {
        let err: NodeError = RuntimeError::TooManyTransactions { limit: 3 }.into();
        assert!(matches!(err, NodeError::RuntimeError(_)));
        assert!(err.to_string().contains("runtime error"));
    }

    #[test]
    fn test_protocol_error_from() {
        let err: NodeError = DaoError::NotAdmin.into();
        assert!(matches!(err, NodeError::ProtocolError(DaoError::NotAdmin)));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let node_err: NodeError = io_err.into();
        assert!(matches!(node_err, NodeError::IoError(_)));
    }
}
