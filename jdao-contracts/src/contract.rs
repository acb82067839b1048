//! Core `Contract` trait and the `Context` passed to every handler.

use borsh::{BorshDeserialize, BorshSerialize};

use jdao_types::error::DaoError;
use jdao_types::message::Body;
use jdao_types::primitives::{Address, Coins, Timestamp};

use crate::response::ContractResult;

/// A message-driven state machine. The runtime decodes the account data
/// into `Self`, calls [`Contract::receive`] once per inbound message and
/// persists `self` only when the handler succeeds.
pub trait Contract: BorshSerialize + BorshDeserialize {
    /// Short name used in logs and transaction records.
    const KIND: &'static str;

    /// Handle one inbound message.
    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult;
}

/// What a handler knows about the message it is processing.
#[derive(Debug, Clone)]
pub struct Context {
    sender: Address,
    myself: Address,
    value: Coins,
    now: Timestamp,
    balance: Coins,
}

impl Context {
    pub fn new(
        sender: Address,
        myself: Address,
        value: Coins,
        now: Timestamp,
        balance: Coins,
    ) -> Self {
        Context {
            sender,
            myself,
            value,
            now,
            balance,
        }
    }

    /// Context for unit tests: zero value, zero balance, time zero.
    pub fn mock(sender: Address, myself: Address) -> Self {
        Self::new(sender, myself, 0, 0, 0)
    }

    /// Set the current time (builder, consuming).
    pub fn at(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// Set the inbound value (builder, consuming).
    pub fn with_value(mut self, value: Coins) -> Self {
        self.value = value;
        self.balance = self.balance.max(value);
        self
    }

    /// Address of the account that sent the inbound message.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Address of the contract handling the message.
    pub fn myself(&self) -> Address {
        self.myself
    }

    /// Value attached to the inbound message.
    pub fn value(&self) -> Coins {
        self.value
    }

    /// Current time (unix seconds).
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Account balance including the inbound value.
    pub fn balance(&self) -> Coins {
        self.balance
    }

    /// Fail with `err` unless the sender is `expected`.
    pub fn require_sender(&self, expected: &Address, err: DaoError) -> Result<(), DaoError> {
        if self.sender != *expected {
            Err(err)
        } else {
            Ok(())
        }
    }
}
