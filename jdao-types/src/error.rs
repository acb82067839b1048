use thiserror::Error;

use crate::constants::exit_code;

/// Reasons a contract rejects an inbound message.
///
/// Every variant maps to the numeric exit code recorded on the failed
/// transaction (see [`DaoError::exit_code`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DaoError {
    // ─── Codec Errors ────────────────────────────────────────────────────────
    #[error("integer overflow")]
    IntegerOverflow,

    #[error("value {value} does not fit in {bits} bits")]
    IntegerOutOfRange { value: u128, bits: usize },

    #[error("cell overflow: {bits} bits / {refs} refs")]
    CellOverflow { bits: usize, refs: usize },

    #[error("cell underflow: {reason}")]
    CellUnderflow { reason: String },

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: String },

    #[error("not enough value for outgoing messages: have {available}, need {required}")]
    NotEnoughValue { available: u128, required: u128 },

    // ─── Jetton Errors ───────────────────────────────────────────────────────
    #[error("sender is not the admin")]
    NotAdmin,

    #[error("burn notification not from the owner's wallet")]
    UnauthorizedBurn,

    #[error("sender is not the derived counterpart for this routing operation")]
    UnauthorizedRouting,

    #[error("code upgrade requested by non-admin")]
    UpgradeNotAdmin,

    #[error("sender is not the wallet owner")]
    NotOwner,

    #[error("insufficient spendable balance: have {available}, need {required}")]
    NotEnoughJettons { available: u128, required: u128 },

    #[error("internal transfer from unexpected sender")]
    UnauthorizedIncoming,

    // ─── Voting Errors ───────────────────────────────────────────────────────
    #[error("voting init not from the DAO")]
    NotFromDao,

    #[error("voting already initialized")]
    AlreadyInitialized,

    #[error("voting not initialized")]
    NotInitialized,

    #[error("vote submission not from the voter's keeper")]
    NotFromKeeper,

    #[error("voting not finished: expires at {expiration_date}, now {now}")]
    VotingNotFinished { expiration_date: u64, now: u64 },

    #[error("execution value too low: got {value}, need {minimum}")]
    ExecutionValueTooLow { value: u128, minimum: u128 },

    #[error("voting already executed")]
    AlreadyExecuted,

    #[error("voting finished at {expiration_date}, now {now}")]
    VotingFinished { expiration_date: u64, now: u64 },

    #[error("expiration date mismatch: claimed {claimed}, stored {stored}")]
    ExpirationMismatch { claimed: u64, stored: u64 },

    #[error("vote request not from the owning wallet")]
    KeeperNotFromWallet,

    #[error("nothing new to vote: claimed {claimed}, already voted {voted}")]
    NothingNewToVote { claimed: u128, voted: u128 },

    #[error("unknown operation 0x{op:08x}")]
    UnknownOp { op: u32 },
}

impl DaoError {
    /// Numeric exit code surfaced on the failed transaction.
    pub fn exit_code(&self) -> u32 {
        match self {
            DaoError::IntegerOverflow => exit_code::INTEGER_OVERFLOW,
            DaoError::IntegerOutOfRange { .. } => exit_code::INTEGER_OUT_OF_RANGE,
            DaoError::CellOverflow { .. } => exit_code::CELL_OVERFLOW,
            DaoError::CellUnderflow { .. } | DaoError::InvalidAddress { .. } => {
                exit_code::CELL_UNDERFLOW
            }
            DaoError::NotEnoughValue { .. } => exit_code::NOT_ENOUGH_VALUE,
            DaoError::NotAdmin => exit_code::NOT_ADMIN,
            DaoError::UnauthorizedBurn => exit_code::UNAUTHORIZED_BURN,
            DaoError::UnauthorizedRouting => exit_code::UNAUTHORIZED_ROUTING,
            DaoError::UpgradeNotAdmin => exit_code::UPGRADE_NOT_ADMIN,
            DaoError::NotOwner => exit_code::NOT_OWNER,
            DaoError::NotEnoughJettons { .. } => exit_code::NOT_ENOUGH_JETTONS,
            DaoError::UnauthorizedIncoming => exit_code::UNAUTHORIZED_INCOMING,
            DaoError::NotFromDao => exit_code::NOT_FROM_DAO,
            DaoError::AlreadyInitialized => exit_code::ALREADY_INITIALIZED,
            DaoError::NotInitialized => exit_code::NOT_INITIALIZED,
            DaoError::NotFromKeeper => exit_code::NOT_FROM_KEEPER,
            DaoError::VotingNotFinished { .. } => exit_code::VOTING_NOT_FINISHED,
            DaoError::ExecutionValueTooLow { .. } => exit_code::EXECUTION_VALUE_TOO_LOW,
            DaoError::AlreadyExecuted => exit_code::ALREADY_EXECUTED,
            DaoError::VotingFinished { .. } => exit_code::VOTING_FINISHED,
            DaoError::ExpirationMismatch { .. } => exit_code::EXPIRATION_MISMATCH,
            DaoError::KeeperNotFromWallet => exit_code::KEEPER_NOT_FROM_WALLET,
            DaoError::NothingNewToVote { .. } => exit_code::NOTHING_NEW_TO_VOTE,
            DaoError::UnknownOp { .. } => exit_code::UNKNOWN_OP,
        }
    }

    /// Shorthand for a cell underflow with a reason.
    pub fn underflow(reason: impl Into<String>) -> Self {
        DaoError::CellUnderflow {
            reason: reason.into(),
        }
    }
}
