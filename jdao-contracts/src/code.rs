//! Code cells of the built-in contracts.
//!
//! A code cell identifies the handler the runtime runs for an account. It
//! feeds into address derivation, so changing a code cell moves every
//! address derived from it.

use jdao_crypto::hash::blake3_hash_domain;
use jdao_types::cell::Cell;

const CODE_CONTEXT: &str = "jdao 2024 contract code";

fn code_cell(name: &str) -> Cell {
    Cell::from_hash(blake3_hash_domain(CODE_CONTEXT, name.as_bytes()))
}

/// The jetton minter acting as DAO root.
pub fn minter() -> Cell {
    code_cell("jetton-minter/v1")
}

/// A minter revision that tolerates unknown operations. Used as the target
/// of code upgrades.
pub fn minter_update() -> Cell {
    code_cell("jetton-minter/v2")
}

/// A holder's jetton wallet.
pub fn wallet() -> Cell {
    code_cell("jetton-wallet/v1")
}

/// Per-(wallet, voting) vote keeper.
pub fn keeper() -> Cell {
    code_cell("vote-keeper/v1")
}

/// Per-proposal voting.
pub fn voting() -> Cell {
    code_cell("voting/v1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [minter(), minter_update(), wallet(), keeper(), voting()];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(wallet(), wallet());
    }
}
