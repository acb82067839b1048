use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;

use jdao_types::account::StateInit;
use jdao_types::cell::Cell;
use jdao_types::primitives::{Address, Coins};

/// A single account on the sandbox chain.
///
/// Accounts without code are plain value holders (user treasuries, or
/// contracts not deployed yet) and accept every message.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct Account {
    pub address: Address,
    /// Contract code, `None` until deployed.
    pub code: Option<Cell>,
    /// Borsh-encoded contract state.
    pub data: Vec<u8>,
    pub balance: Coins,
}

impl Account {
    /// An account holding only value.
    pub fn uninit(address: Address) -> Self {
        Self {
            address,
            code: None,
            data: Vec::new(),
            balance: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.code.is_some()
    }

    /// Install code and initial data from a state init.
    pub fn deploy(&mut self, init: &StateInit) {
        self.code = Some(init.code.clone());
        self.data = init.data.clone();
    }
}
