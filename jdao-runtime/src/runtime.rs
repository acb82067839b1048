//! Single-transaction processing.
//!
//! One inbound message is one transaction on its destination account:
//! credit, optional deploy, compute, action. A failing compute or action
//! phase leaves the contract state and code untouched and sends nothing;
//! the inbound value stays with the account since bounces are not modelled.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use jdao_contracts::{Attribute, Context, SendValue};
use jdao_crypto::address::contract_address;
use jdao_types::account::StateInit;
use jdao_types::cell::Cell;
use jdao_types::error::DaoError;
use jdao_types::message::Body;
use jdao_types::primitives::{Address, Coins, Timestamp, BASECHAIN};

use crate::error::RuntimeError;
use crate::registry::CodeRegistry;
use crate::state::Account;

/// A message in flight between two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: Address,
    pub to: Address,
    pub value: Coins,
    pub bounce: bool,
    pub body: Cell,
    pub state_init: Option<StateInit>,
}

impl Envelope {
    pub fn new(from: Address, to: Address, value: Coins, body: Cell) -> Self {
        Self {
            from,
            to,
            value,
            bounce: false,
            body,
            state_init: None,
        }
    }

    pub fn with_state_init(mut self, init: StateInit) -> Self {
        self.state_init = Some(init);
        self
    }
}

/// Record of one processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Position in the chain's log.
    pub lt: u64,
    pub from: Address,
    pub on: Address,
    pub value: Coins,
    /// Op code of the inbound body, `None` for an empty body.
    pub op: Option<u32>,
    /// Decoded body name, or "unknown" when the op is not recognised.
    pub name: &'static str,
    #[serde(skip)]
    pub body: Cell,
    pub success: bool,
    /// 0 on success.
    pub exit_code: u32,
    /// The account got its code from this message.
    pub deploy: bool,
    pub error: Option<String>,
    /// Action tag of the handler response.
    pub action: Option<String>,
    /// Key-value attributes of the handler response.
    pub attributes: Vec<Attribute>,
    pub out_messages: usize,
}

impl Transaction {
    /// Value of the response attribute `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// A processed transaction and the messages it emitted.
#[derive(Debug, Clone)]
pub struct Executed {
    pub transaction: Transaction,
    pub outgoing: Vec<Envelope>,
}

/// What a successful transaction leaves behind besides state.
#[derive(Debug, Default)]
struct Committed {
    action: Option<String>,
    attributes: Vec<Attribute>,
    outgoing: Vec<Envelope>,
}

/// Processes messages against a set of accounts using a code registry.
#[derive(Debug, Default)]
pub struct Runtime {
    registry: CodeRegistry,
}

impl Runtime {
    pub fn new(registry: CodeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    /// Run `msg` as one transaction on its destination, creating the
    /// account if it does not exist yet.
    pub fn execute(
        &self,
        accounts: &mut HashMap<Address, Account>,
        msg: &Envelope,
        now: Timestamp,
        lt: u64,
    ) -> Executed {
        let account = accounts
            .entry(msg.to)
            .or_insert_with(|| Account::uninit(msg.to));
        self.execute_on(account, msg, now, lt)
    }

    /// Run `msg` as one transaction on `account`, which must be the
    /// destination.
    pub fn execute_on(
        &self,
        account: &mut Account,
        msg: &Envelope,
        now: Timestamp,
        lt: u64,
    ) -> Executed {
        account.balance = account.balance.saturating_add(msg.value);

        let (op, name) = match Body::parse(&msg.body) {
            Ok(body) => (body.op(), body.name()),
            Err(_) => (
                msg.body.parse().preload_uint(32).ok().map(|v| v as u32),
                "malformed",
            ),
        };

        let mut deploy = false;
        let result = match Self::maybe_deploy(account, msg) {
            Ok(deployed) => {
                deploy = deployed;
                self.run(account, msg, now)
            }
            Err(e) => Err(e),
        };

        let mut transaction = Transaction {
            lt,
            from: msg.from,
            on: msg.to,
            value: msg.value,
            op,
            name,
            body: msg.body.clone(),
            success: false,
            exit_code: 0,
            deploy,
            error: None,
            action: None,
            attributes: Vec::new(),
            out_messages: 0,
        };

        match result {
            Ok(phase) => {
                transaction.success = true;
                transaction.action = phase.action;
                transaction.attributes = phase.attributes;
                transaction.out_messages = phase.outgoing.len();
                debug!(
                    lt,
                    on = %msg.to.short(),
                    from = %msg.from.short(),
                    op = name,
                    deploy,
                    out = phase.outgoing.len(),
                    "transaction committed"
                );
                Executed {
                    transaction,
                    outgoing: phase.outgoing,
                }
            }
            Err(err) => {
                transaction.exit_code = err.exit_code();
                transaction.error = Some(err.to_string());
                warn!(
                    lt,
                    on = %msg.to.short(),
                    from = %msg.from.short(),
                    op = name,
                    exit_code = transaction.exit_code,
                    error = %err,
                    "transaction aborted"
                );
                Executed {
                    transaction,
                    outgoing: Vec::new(),
                }
            }
        }
    }

    /// Deploy an inactive destination from the message's state init.
    /// Deployment sticks even when the compute phase later fails.
    fn maybe_deploy(account: &mut Account, msg: &Envelope) -> Result<bool, RuntimeError> {
        let init = match (&msg.state_init, account.is_active()) {
            (Some(init), false) => init,
            _ => return Ok(false),
        };
        if contract_address(BASECHAIN, init) != msg.to {
            return Err(RuntimeError::StateInitMismatch { address: msg.to });
        }
        account.deploy(init);
        Ok(true)
    }

    /// Compute and action phases. Commits into `account` only on success.
    fn run(
        &self,
        account: &mut Account,
        msg: &Envelope,
        now: Timestamp,
    ) -> Result<Committed, RuntimeError> {
        let code = match &account.code {
            Some(code) => code.clone(),
            None => return Ok(Committed::default()),
        };
        let handler = self.registry.get(&code)?;
        let body = Body::parse(&msg.body)?;
        let ctx = Context::new(msg.from, msg.to, msg.value, now, account.balance);
        let computed = handler.handle(&account.data, &ctx, body)?;

        let action = computed.response.action().map(str::to_string);
        let (messages, new_code, attributes) = computed.response.into_parts();

        let mut required: Coins = 0;
        let mut outgoing = Vec::with_capacity(messages.len());
        for out in messages {
            let value = match out.value {
                SendValue::Coins(c) => c,
                SendValue::CarryInbound => msg.value,
            };
            required = required.checked_add(value).ok_or(DaoError::IntegerOverflow)?;
            outgoing.push(Envelope {
                from: msg.to,
                to: out.dest,
                value,
                bounce: out.bounce,
                body: out.body,
                state_init: out.state_init,
            });
        }
        if required > account.balance {
            return Err(DaoError::NotEnoughValue {
                available: account.balance,
                required,
            }
            .into());
        }

        account.balance -= required;
        account.data = computed.data;
        if let Some(code) = new_code {
            debug!(account = %msg.to.short(), code = %code, "code replaced");
            account.code = Some(code);
        }
        Ok(Committed {
            action,
            attributes,
            outgoing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdao_contracts::code;
    use jdao_contracts::derive::keeper_state_init;
    use jdao_contracts::keeper::VoteKeeper;
    use jdao_types::message::{MessageBody, RequestVote, VoteWeight};

    fn request(weight: Coins) -> Cell {
        RequestVote(VoteWeight {
            query_id: 0,
            voter: Address::basechain([9; 32]),
            expiration_date: 100,
            weight,
            vote_for: true,
            confirm: false,
        })
        .to_cell()
        .unwrap()
    }

    fn keeper_env() -> (Address, Address, StateInit) {
        let wallet = Address::basechain([1; 32]);
        let voting = Address::basechain([2; 32]);
        let init = keeper_state_init(&wallet, &voting, &code::keeper());
        (wallet, contract_address(BASECHAIN, &init), init)
    }

    #[test]
    fn test_deploy_and_forward() {
        let runtime = Runtime::default();
        let mut accounts = HashMap::new();
        let (wallet, keeper, init) = keeper_env();

        let msg = Envelope::new(wallet, keeper, 50, request(10)).with_state_init(init);
        let executed = runtime.execute(&mut accounts, &msg, 0, 1);
        assert!(executed.transaction.success);
        assert!(executed.transaction.deploy);
        assert_eq!(executed.outgoing.len(), 1);
        assert_eq!(executed.outgoing[0].value, 50);
        assert_eq!(accounts[&keeper].balance, 0);

        let state: VoteKeeper = borsh::from_slice(&accounts[&keeper].data).unwrap();
        assert_eq!(state.total_votes, 10);
    }

    #[test]
    fn test_failure_rolls_back_state() {
        let runtime = Runtime::default();
        let mut accounts = HashMap::new();
        let (wallet, keeper, init) = keeper_env();
        let first = Envelope::new(wallet, keeper, 10, request(10)).with_state_init(init);
        runtime.execute(&mut accounts, &first, 0, 1);
        let data_before = accounts[&keeper].data.clone();

        let again = Envelope::new(wallet, keeper, 10, request(5));
        let executed = runtime.execute(&mut accounts, &again, 0, 2);
        assert!(!executed.transaction.success);
        assert_eq!(executed.transaction.exit_code, 0x1f5);
        assert!(executed.outgoing.is_empty());
        assert_eq!(accounts[&keeper].data, data_before);
        assert_eq!(accounts[&keeper].balance, 10);
    }

    #[test]
    fn test_wrong_state_init_is_refused() {
        let runtime = Runtime::default();
        let mut accounts = HashMap::new();
        let (wallet, _, init) = keeper_env();
        let elsewhere = Address::basechain([7; 32]);
        let msg = Envelope::new(wallet, elsewhere, 1, request(1)).with_state_init(init);
        let executed = runtime.execute(&mut accounts, &msg, 0, 1);
        assert!(!executed.transaction.success);
        assert!(!accounts[&elsewhere].is_active());
    }

    #[test]
    fn test_codeless_account_accepts_anything() {
        let runtime = Runtime::default();
        let mut accounts = HashMap::new();
        let user = Address::basechain([5; 32]);
        let msg = Envelope::new(Address::basechain([6; 32]), user, 3, Cell::from_hash([1; 32]));
        let executed = runtime.execute(&mut accounts, &msg, 0, 1);
        assert!(executed.transaction.success);
        assert_eq!(accounts[&user].balance, 3);
    }
}
