//! Deterministic in-memory chain.
//!
//! Messages are processed strictly FIFO until the queue is empty, so a
//! single `send` returns the whole cascade it caused. Time only moves when
//! the caller sets it.

use std::collections::{HashMap, VecDeque};

use borsh::BorshDeserialize;
use serde::Serialize;
use tracing::{debug, info};

use jdao_crypto::address::contract_address;
use jdao_crypto::hash::blake3_hash_domain;
use jdao_types::account::StateInit;
use jdao_types::cell::Cell;
use jdao_types::message::MessageBody;
use jdao_types::primitives::{Address, Coins, Timestamp, BASECHAIN, ONE_COIN};

use crate::error::RuntimeError;
use crate::registry::CodeRegistry;
use crate::runtime::{Envelope, Runtime, Transaction};
use crate::state::Account;

/// Starting balance of every treasury.
pub const TREASURY_BALANCE: Coins = 1_000_000 * ONE_COIN;

/// Default bound on transactions caused by one `send`.
pub const DEFAULT_MAX_TRANSACTIONS: usize = 1_000;

/// Default chain time (unix seconds).
pub const DEFAULT_NOW: Timestamp = 1_700_000_000;

/// Address of the treasury called `name`.
pub fn treasury_address(name: &str) -> Address {
    Address::new(
        BASECHAIN,
        blake3_hash_domain("jdao 2024 sandbox treasury", name.as_bytes()),
    )
}

// ─── Transaction Filters ─────────────────────────────────────────────────

/// Matches transactions by any combination of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxFilter {
    pub from: Option<Address>,
    pub on: Option<Address>,
    pub op: Option<u32>,
    pub body: Option<Cell>,
    pub success: Option<bool>,
    pub exit_code: Option<u32>,
    pub deploy: Option<bool>,
}

impl TxFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, addr: Address) -> Self {
        self.from = Some(addr);
        self
    }

    pub fn on(mut self, addr: Address) -> Self {
        self.on = Some(addr);
        self
    }

    pub fn op(mut self, op: u32) -> Self {
        self.op = Some(op);
        self
    }

    pub fn body(mut self, body: Cell) -> Self {
        self.body = Some(body);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Failed with `code`.
    pub fn exit_code(mut self, code: u32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn deploy(mut self, deploy: bool) -> Self {
        self.deploy = Some(deploy);
        self
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.from.map_or(true, |a| tx.from == a)
            && self.on.map_or(true, |a| tx.on == a)
            && self.op.map_or(true, |op| tx.op == Some(op))
            && self.body.as_ref().map_or(true, |b| tx.body == *b)
            && self.success.map_or(true, |s| tx.success == s)
            && self.exit_code.map_or(true, |c| tx.exit_code == c)
            && self.deploy.map_or(true, |d| tx.deploy == d)
    }
}

/// Every transaction caused by one external send, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendResult {
    pub transactions: Vec<Transaction>,
}

impl SendResult {
    pub fn has(&self, filter: &TxFilter) -> bool {
        self.transactions.iter().any(|tx| filter.matches(tx))
    }

    pub fn find(&self, filter: &TxFilter) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| filter.matches(tx))
    }

    pub fn count(&self, filter: &TxFilter) -> usize {
        self.transactions.iter().filter(|tx| filter.matches(tx)).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.transactions.iter().all(|tx| tx.success)
    }

    /// First failed transaction, if any.
    pub fn first_failure(&self) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| !tx.success)
    }
}

// ─── Blockchain ──────────────────────────────────────────────────────────

/// Sandbox chain holding every account.
#[derive(Debug)]
pub struct Blockchain {
    runtime: Runtime,
    accounts: HashMap<Address, Account>,
    names: HashMap<Address, String>,
    now: Timestamp,
    lt: u64,
    max_transactions: usize,
    log: Vec<Transaction>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Chain with the default code registry.
    pub fn new() -> Self {
        Self::with_registry(CodeRegistry::default())
    }

    pub fn with_registry(registry: CodeRegistry) -> Self {
        Self {
            runtime: Runtime::new(registry),
            accounts: HashMap::new(),
            names: HashMap::new(),
            now: DEFAULT_NOW,
            lt: 0,
            max_transactions: DEFAULT_MAX_TRANSACTIONS,
            log: Vec::new(),
        }
    }

    pub fn with_max_transactions(mut self, max: usize) -> Self {
        self.max_transactions = max;
        self
    }

    // ─── Time ────────────────────────────────────────────────────────────

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_now(&mut self, now: Timestamp) {
        debug!(now, "chain time set");
        self.now = now;
    }

    pub fn advance(&mut self, seconds: Timestamp) {
        self.set_now(self.now.saturating_add(seconds));
    }

    // ─── Accounts ────────────────────────────────────────────────────────

    /// Codeless account funded with [`TREASURY_BALANCE`], derived from
    /// `name`. Calling it again with the same name returns the same address
    /// without refunding it.
    pub fn treasury(&mut self, name: &str) -> Address {
        let address = treasury_address(name);
        if !self.accounts.contains_key(&address) {
            let mut account = Account::uninit(address);
            account.balance = TREASURY_BALANCE;
            self.accounts.insert(address, account);
            self.names.insert(address, name.to_string());
        }
        address
    }

    /// Name given to a treasury, if `address` is one.
    pub fn name_of(&self, address: &Address) -> Option<&str> {
        self.names.get(address).map(String::as_str)
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn balance(&self, address: &Address) -> Coins {
        self.accounts.get(address).map_or(0, |a| a.balance)
    }

    pub fn is_active(&self, address: &Address) -> bool {
        self.accounts.get(address).is_some_and(Account::is_active)
    }

    /// Decode the stored state of a deployed contract.
    pub fn state<C: BorshDeserialize>(&self, address: &Address) -> Result<C, RuntimeError> {
        let account = self
            .accounts
            .get(address)
            .ok_or(RuntimeError::AccountNotFound { address: *address })?;
        if !account.is_active() {
            return Err(RuntimeError::AccountNotActive { address: *address });
        }
        C::try_from_slice(&account.data).map_err(|e| RuntimeError::StateDecode {
            kind: "account",
            reason: e.to_string(),
        })
    }

    /// Current code of a deployed contract.
    pub fn code(&self, address: &Address) -> Option<&Cell> {
        self.accounts.get(address).and_then(|a| a.code.as_ref())
    }

    // ─── Messages ────────────────────────────────────────────────────────

    /// Send from an existing account, paying `msg.value` from its balance.
    pub fn send(&mut self, msg: Envelope) -> Result<SendResult, RuntimeError> {
        let sender = self
            .accounts
            .get_mut(&msg.from)
            .ok_or(RuntimeError::AccountNotFound { address: msg.from })?;
        if sender.balance < msg.value {
            return Err(RuntimeError::InsufficientFunds {
                address: msg.from,
                available: sender.balance,
                required: msg.value,
            });
        }
        sender.balance -= msg.value;
        self.run(msg)
    }

    /// Send a message that claims to come from `msg.from` without charging
    /// anyone. Used to impersonate contracts.
    pub fn send_as(&mut self, msg: Envelope) -> Result<SendResult, RuntimeError> {
        self.run(msg)
    }

    /// Encode `body` and send it from `from`.
    pub fn send_body<M: MessageBody>(
        &mut self,
        from: Address,
        to: Address,
        value: Coins,
        body: &M,
    ) -> Result<SendResult, RuntimeError> {
        self.send(Envelope::new(from, to, value, body.to_cell()?))
    }

    /// Deploy a contract from `from` with an empty body.
    pub fn deploy(
        &mut self,
        from: Address,
        init: StateInit,
        value: Coins,
    ) -> Result<(Address, SendResult), RuntimeError> {
        let address = contract_address(BASECHAIN, &init);
        let msg = Envelope::new(from, address, value, Cell::empty()).with_state_init(init);
        let result = self.send(msg)?;
        info!(address = %address.short(), "contract deployed");
        Ok((address, result))
    }

    fn run(&mut self, first: Envelope) -> Result<SendResult, RuntimeError> {
        let mut queue = VecDeque::from([first]);
        let mut result = SendResult::default();
        while let Some(msg) = queue.pop_front() {
            if result.transactions.len() >= self.max_transactions {
                return Err(RuntimeError::TooManyTransactions {
                    limit: self.max_transactions,
                });
            }
            self.lt += 1;
            let executed = self.runtime.execute(&mut self.accounts, &msg, self.now, self.lt);
            queue.extend(executed.outgoing);
            self.log.push(executed.transaction.clone());
            result.transactions.push(executed.transaction);
        }
        Ok(result)
    }

    /// Every transaction processed so far.
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }
}
