//! Execution environment for the jetton DAO contracts.
//!
//! Provides the code registry, single-transaction processing with atomic
//! commit, and a deterministic in-memory [`chain::Blockchain`] that drives
//! message cascades to completion.

pub mod chain;
pub mod error;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod testing;

pub use chain::{Blockchain, SendResult, TxFilter};
pub use error::RuntimeError;
pub use runtime::{Envelope, Transaction};
