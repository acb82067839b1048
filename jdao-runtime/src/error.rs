use jdao_types::error::DaoError;
use jdao_types::primitives::Address;
use thiserror::Error;

/// Exit code recorded when the runtime itself, not the contract, fails a
/// transaction (unknown code, corrupt state, bad init).
pub const RUNTIME_FAILURE_EXIT: u32 = 0xfffe;

/// Errors that can occur while processing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("message rejected: {0}")]
    Rejected(#[from] DaoError),

    #[error("no handler registered for code {code}")]
    UnknownCode { code: String },

    #[error("state of {kind} could not be decoded: {reason}")]
    StateDecode { kind: &'static str, reason: String },

    #[error("state of {kind} could not be encoded: {reason}")]
    StateEncode { kind: &'static str, reason: String },

    #[error("state init does not derive {address}")]
    StateInitMismatch { address: Address },

    #[error("account not found: {address}")]
    AccountNotFound { address: Address },

    #[error("account {address} is not active")]
    AccountNotActive { address: Address },

    #[error("sender {address} has {available}, needs {required}")]
    InsufficientFunds {
        address: Address,
        available: u128,
        required: u128,
    },

    #[error("transaction limit exceeded: {limit}")]
    TooManyTransactions { limit: usize },
}

impl RuntimeError {
    /// Exit code to record for a failed transaction.
    pub fn exit_code(&self) -> u32 {
        match self {
            RuntimeError::Rejected(err) => err.exit_code(),
            _ => RUNTIME_FAILURE_EXIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_passthrough() {
        let err: RuntimeError = DaoError::UnauthorizedRouting.into();
        assert_eq!(err.exit_code(), 78);
        let err = RuntimeError::UnknownCode {
            code: "x{00}".to_string(),
        };
        assert_eq!(err.exit_code(), RUNTIME_FAILURE_EXIT);
    }
}
