//! Safe arithmetic helpers for contract math.

use jdao_types::error::DaoError;
use jdao_types::primitives::Coins;

/// Add two amounts, returning `DaoError::IntegerOverflow` on overflow.
pub fn safe_add(a: Coins, b: Coins) -> Result<Coins, DaoError> {
    a.checked_add(b).ok_or(DaoError::IntegerOverflow)
}

/// Subtract `b` from `a`, returning `DaoError::IntegerOverflow` on underflow.
pub fn safe_sub(a: Coins, b: Coins) -> Result<Coins, DaoError> {
    a.checked_sub(b).ok_or(DaoError::IntegerOverflow)
}

pub fn safe_add_u64(a: u64, b: u64) -> Result<u64, DaoError> {
    a.checked_add(b).ok_or(DaoError::IntegerOverflow)
}
