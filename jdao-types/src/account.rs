use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::cell::Cell;

/// Initial code and data of a contract. Its hash is the contract address,
/// so anyone who knows the parameters can compute where it lives.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct StateInit {
    pub code: Cell,
    /// Borsh-encoded initial contract state.
    pub data: Vec<u8>,
}

impl StateInit {
    pub fn new(code: Cell, data: Vec<u8>) -> Self {
        Self { code, data }
    }
}
