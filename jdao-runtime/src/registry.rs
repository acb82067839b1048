//! Code registry: maps a code cell hash to the handler that runs it.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use jdao_contracts::code;
use jdao_contracts::keeper::VoteKeeper;
use jdao_contracts::minter::{Minter, UpgradedMinter};
use jdao_contracts::voting::Voting;
use jdao_contracts::wallet::Wallet;
use jdao_contracts::{Context, Contract, Response};
use jdao_types::cell::Cell;
use jdao_types::message::Body;
use jdao_types::primitives::Hash;

use crate::error::RuntimeError;

/// Result of a successful compute phase.
#[derive(Debug, Clone)]
pub struct Computed {
    /// State to store if the action phase also succeeds.
    pub data: Vec<u8>,
    pub response: Response,
}

/// Runs one message against stored contract state.
pub trait Handler: Send + Sync {
    fn kind(&self) -> &'static str;

    fn handle(&self, data: &[u8], ctx: &Context, body: Body) -> Result<Computed, RuntimeError>;
}

/// Handler for any borsh-encoded [`Contract`].
pub struct ContractHandler<C>(PhantomData<fn() -> C>);

impl<C> ContractHandler<C> {
    pub fn new() -> Self {
        ContractHandler(PhantomData)
    }
}

impl<C> Default for ContractHandler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Contract> Handler for ContractHandler<C> {
    fn kind(&self) -> &'static str {
        C::KIND
    }

    fn handle(&self, data: &[u8], ctx: &Context, body: Body) -> Result<Computed, RuntimeError> {
        let mut state: C = borsh::from_slice(data).map_err(|e| RuntimeError::StateDecode {
            kind: C::KIND,
            reason: e.to_string(),
        })?;
        let response = state.receive(ctx, body)?;
        let data = borsh::to_vec(&state).map_err(|e| RuntimeError::StateEncode {
            kind: C::KIND,
            reason: e.to_string(),
        })?;
        Ok(Computed { data, response })
    }
}

/// Known contract codes.
pub struct CodeRegistry {
    handlers: HashMap<Hash, Box<dyn Handler>>,
}

impl CodeRegistry {
    /// Registry with no codes.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for `code`, replacing any previous entry.
    pub fn register(&mut self, code: &Cell, handler: Box<dyn Handler>) {
        self.handlers.insert(code.repr_hash(), handler);
    }

    pub fn register_contract<C: Contract + 'static>(&mut self, code: &Cell) {
        self.register(code, Box::new(ContractHandler::<C>::new()));
    }

    pub fn get(&self, code: &Cell) -> Result<&dyn Handler, RuntimeError> {
        self.handlers
            .get(&code.repr_hash())
            .map(|h| h.as_ref())
            .ok_or_else(|| RuntimeError::UnknownCode {
                code: code.to_string(),
            })
    }

    pub fn contains(&self, code: &Cell) -> bool {
        self.handlers.contains_key(&code.repr_hash())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CodeRegistry {
    /// The minter (both revisions), wallet, keeper and voting codes.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register_contract::<Minter>(&code::minter());
        registry.register_contract::<UpgradedMinter>(&code::minter_update());
        registry.register_contract::<Wallet>(&code::wallet());
        registry.register_contract::<VoteKeeper>(&code::keeper());
        registry.register_contract::<Voting>(&code::voting());
        registry
    }
}

impl fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.values().map(|h| h.kind()).collect();
        kinds.sort_unstable();
        f.debug_struct("CodeRegistry").field("kinds", &kinds).finish()
    }
}
