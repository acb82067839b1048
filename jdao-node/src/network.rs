//! Asynchronous message network.
//!
//! Every account runs as its own tokio task that owns the account record
//! and drains a bounded `mpsc` mailbox one message at a time. A single
//! router task holds the mailbox senders and nothing else; account tasks
//! hand their outgoing messages to it over an unbounded channel, so an
//! account never blocks on another account's full mailbox.
//!
//! Tasks are spawned on first delivery, so a message to a fresh address
//! creates the account that its state init may then deploy. Delivery
//! between two accounts is FIFO; across accounts there is no ordering.
//! [`Network::settle`] waits until nothing is in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use borsh::BorshDeserialize;
use tokio::sync::{broadcast, mpsc, oneshot, Notify};
use tracing::{debug, info, warn};

use jdao_runtime::chain::{treasury_address, TREASURY_BALANCE};
use jdao_runtime::runtime::Runtime;
use jdao_runtime::state::Account;
use jdao_runtime::{Envelope, RuntimeError, Transaction};
use jdao_types::message::MessageBody;
use jdao_types::primitives::{Address, Coins, Timestamp};

use crate::config::NetworkConfig;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;

/// Capacity of the transaction broadcast channel.
const EVENT_CAPACITY: usize = 1024;

// ─── Commands ────────────────────────────────────────────────────────────

/// Commands consumed by an account task.
enum Command {
    /// Run an inbound message as a transaction.
    Deliver(Envelope),
    /// Send value out of a code-less account on behalf of its owner.
    Emit(Envelope, oneshot::Sender<Result<(), RuntimeError>>),
    Snapshot(oneshot::Sender<Account>),
}

/// Commands consumed by the router task.
enum Route {
    /// Deliver to the destination, spawning it if needed. Already counted
    /// as in flight.
    Message(Envelope),
    /// Mailbox of an existing account.
    Lookup(Address, oneshot::Sender<Option<mpsc::Sender<Command>>>),
    /// Spawn a funded treasury unless it exists.
    Treasury(Address, oneshot::Sender<()>),
    Count(oneshot::Sender<usize>),
    Shutdown,
}

/// State shared by every task. Never holds account records.
struct Shared {
    runtime: Runtime,
    capacity: usize,
    max_transactions: usize,
    now: AtomicU64,
    lt: AtomicU64,
    in_flight: AtomicUsize,
    processed: AtomicUsize,
    overflowed: AtomicBool,
    idle: Notify,
    events: broadcast::Sender<Transaction>,
    log: Mutex<Vec<Transaction>>,
    metrics: Option<Arc<NodeMetrics>>,
}

impl Shared {
    fn finish(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

// ─── Network Handle ──────────────────────────────────────────────────────

/// Handle to a running network. Cheap to clone.
#[derive(Clone)]
pub struct Network {
    shared: Arc<Shared>,
    router: mpsc::UnboundedSender<Route>,
}

impl Network {
    /// Start the router. Must be called inside a tokio runtime.
    pub fn new(config: &NetworkConfig, now: Timestamp) -> Self {
        Self::start(config, now, None)
    }

    /// A network that reports every transaction to `metrics`.
    pub fn with_metrics(config: &NetworkConfig, now: Timestamp, metrics: Arc<NodeMetrics>) -> Self {
        Self::start(config, now, Some(metrics))
    }

    fn start(config: &NetworkConfig, now: Timestamp, metrics: Option<Arc<NodeMetrics>>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            runtime: Runtime::default(),
            capacity: config.mailbox_capacity.max(1),
            max_transactions: config.max_transactions,
            now: AtomicU64::new(now),
            lt: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            overflowed: AtomicBool::new(false),
            idle: Notify::new(),
            events,
            log: Mutex::new(Vec::new()),
            metrics,
        });
        let (router, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_router(shared.clone(), router.clone(), rx));
        info!(
            mailbox_capacity = shared.capacity,
            max_transactions = shared.max_transactions,
            "network started"
        );
        Self { shared, router }
    }

    // ─── Time ────────────────────────────────────────────────────────────

    pub fn now(&self) -> Timestamp {
        self.shared.now.load(Ordering::SeqCst)
    }

    pub fn set_now(&self, now: Timestamp) {
        debug!(now, "network time set");
        self.shared.now.store(now, Ordering::SeqCst);
    }

    // ─── Accounts ────────────────────────────────────────────────────────

    /// Treasury `name`, funded with [`TREASURY_BALANCE`] when first seen.
    pub async fn treasury(&self, name: &str) -> Result<Address, NodeError> {
        let address = treasury_address(name);
        let (reply, rx) = oneshot::channel();
        self.router
            .send(Route::Treasury(address, reply))
            .map_err(|_| router_gone())?;
        rx.await.map_err(|_| router_gone())?;
        Ok(address)
    }

    /// Snapshot of an account, `None` if no message ever reached it.
    pub async fn account(&self, address: &Address) -> Option<Account> {
        let mailbox = self.lookup(address).await?;
        let (reply, rx) = oneshot::channel();
        mailbox.send(Command::Snapshot(reply)).await.ok()?;
        rx.await.ok()
    }

    pub async fn balance(&self, address: &Address) -> Coins {
        self.account(address).await.map_or(0, |a| a.balance)
    }

    pub async fn is_active(&self, address: &Address) -> bool {
        self.account(address).await.is_some_and(|a| a.is_active())
    }

    /// Decoded state of a deployed contract.
    pub async fn state<C: BorshDeserialize>(&self, address: &Address) -> Result<C, NodeError> {
        let account = self
            .account(address)
            .await
            .ok_or(RuntimeError::AccountNotFound { address: *address })?;
        if !account.is_active() {
            return Err(RuntimeError::AccountNotActive { address: *address }.into());
        }
        C::try_from_slice(&account.data).map_err(|e| {
            RuntimeError::StateDecode {
                kind: "account",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Number of account tasks.
    pub async fn len(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.router.send(Route::Count(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    async fn lookup(&self, address: &Address) -> Option<mpsc::Sender<Command>> {
        let (reply, rx) = oneshot::channel();
        self.router.send(Route::Lookup(*address, reply)).ok()?;
        rx.await.ok().flatten()
    }

    // ─── Messages ────────────────────────────────────────────────────────

    /// Send `msg` out of the sender's account, which pays its value. The
    /// sender must be a code-less account such as a treasury.
    pub async fn send(&self, msg: Envelope) -> Result<(), NodeError> {
        let mailbox = self
            .lookup(&msg.from)
            .await
            .ok_or(RuntimeError::AccountNotFound { address: msg.from })?;
        let (reply, rx) = oneshot::channel();
        mailbox
            .send(Command::Emit(msg, reply))
            .await
            .map_err(|_| account_gone())?;
        rx.await.map_err(|_| account_gone())??;
        Ok(())
    }

    /// Encode `body` and send it from `from`.
    pub async fn send_body<M: MessageBody>(
        &self,
        from: Address,
        to: Address,
        value: Coins,
        body: &M,
    ) -> Result<(), NodeError> {
        self.send(Envelope::new(from, to, value, body.to_cell()?))
            .await
    }

    /// Wait until no message is in flight. Fails if the transactions since
    /// the previous settle exceeded the configured limit; the excess
    /// messages were dropped.
    pub async fn settle(&self) -> Result<(), NodeError> {
        loop {
            let idle = self.shared.idle.notified();
            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            idle.await;
        }
        let processed = self.shared.processed.swap(0, Ordering::SeqCst);
        debug!(processed, "network settled");
        if self.shared.overflowed.swap(false, Ordering::SeqCst) {
            return Err(RuntimeError::TooManyTransactions {
                limit: self.shared.max_transactions,
            }
            .into());
        }
        Ok(())
    }

    /// Receive every transaction executed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Transaction> {
        self.shared.events.subscribe()
    }

    /// All transactions executed so far, in completion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions_since(0)
    }

    /// Transactions executed after the first `from`.
    pub fn transactions_since(&self, from: usize) -> Vec<Transaction> {
        self.shared
            .log
            .lock()
            .map(|log| log.get(from..).map(<[_]>::to_vec).unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn transaction_count(&self) -> usize {
        self.shared.log.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Stop the router and every account task. Pending messages are
    /// dropped.
    pub fn shutdown(&self) {
        let _ = self.router.send(Route::Shutdown);
    }
}

fn router_gone() -> NodeError {
    NodeError::NetworkError {
        reason: "router stopped".to_string(),
    }
}

fn account_gone() -> NodeError {
    NodeError::NetworkError {
        reason: "account task stopped".to_string(),
    }
}

// ─── Router Task ─────────────────────────────────────────────────────────

async fn run_router(
    shared: Arc<Shared>,
    handle: mpsc::UnboundedSender<Route>,
    mut rx: mpsc::UnboundedReceiver<Route>,
) {
    let mut mailboxes: HashMap<Address, mpsc::Sender<Command>> = HashMap::new();

    let spawn = |mailboxes: &mut HashMap<Address, mpsc::Sender<Command>>, account: Account| {
        let address = account.address;
        let (tx, mailbox) = mpsc::channel(shared.capacity);
        if let Some(metrics) = &shared.metrics {
            metrics.live_accounts.inc();
        }
        debug!(account = %address.short(), "account task spawned");
        tokio::spawn(run_account(shared.clone(), handle.clone(), account, mailbox));
        mailboxes.insert(address, tx.clone());
        tx
    };

    while let Some(route) = rx.recv().await {
        match route {
            Route::Message(msg) => {
                let to = msg.to;
                let mailbox = match mailboxes.get(&to) {
                    Some(tx) => tx.clone(),
                    None => spawn(&mut mailboxes, Account::uninit(to)),
                };
                if mailbox.send(Command::Deliver(msg)).await.is_err() {
                    warn!(to = %to.short(), "mailbox closed, message dropped");
                    shared.finish();
                }
            }
            Route::Lookup(address, reply) => {
                let _ = reply.send(mailboxes.get(&address).cloned());
            }
            Route::Treasury(address, reply) => {
                if !mailboxes.contains_key(&address) {
                    let mut account = Account::uninit(address);
                    account.balance = TREASURY_BALANCE;
                    spawn(&mut mailboxes, account);
                }
                let _ = reply.send(());
            }
            Route::Count(reply) => {
                let _ = reply.send(mailboxes.len());
            }
            Route::Shutdown => break,
        }
    }
    info!(accounts = mailboxes.len(), "network stopped");
}

// ─── Account Task ────────────────────────────────────────────────────────

async fn run_account(
    shared: Arc<Shared>,
    router: mpsc::UnboundedSender<Route>,
    mut account: Account,
    mut rx: mpsc::Receiver<Command>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Deliver(msg) => {
                deliver(&shared, &router, &mut account, msg);
                shared.finish();
            }
            Command::Emit(msg, reply) => {
                let _ = reply.send(emit(&shared, &router, &mut account, msg));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(account.clone());
            }
        }
    }
    if let Some(metrics) = &shared.metrics {
        metrics.live_accounts.dec();
    }
    debug!(account = %account.address.short(), "account task stopped");
}

fn forward(shared: &Shared, router: &mpsc::UnboundedSender<Route>, msg: Envelope) {
    shared.in_flight.fetch_add(1, Ordering::SeqCst);
    if router.send(Route::Message(msg)).is_err() {
        shared.finish();
    }
}

fn deliver(
    shared: &Shared,
    router: &mpsc::UnboundedSender<Route>,
    account: &mut Account,
    msg: Envelope,
) {
    let processed = shared.processed.fetch_add(1, Ordering::SeqCst);
    if processed >= shared.max_transactions {
        shared.overflowed.store(true, Ordering::SeqCst);
        warn!(
            to = %msg.to.short(),
            limit = shared.max_transactions,
            "transaction limit reached, message dropped"
        );
        return;
    }

    let lt = shared.lt.fetch_add(1, Ordering::SeqCst) + 1;
    let now = shared.now.load(Ordering::SeqCst);
    let executed = shared.runtime.execute_on(account, &msg, now, lt);

    if let Some(metrics) = &shared.metrics {
        metrics.observe(&executed.transaction);
    }
    if let Ok(mut log) = shared.log.lock() {
        log.push(executed.transaction.clone());
    }
    // No subscribers is fine.
    let _ = shared.events.send(executed.transaction);

    for out in executed.outgoing {
        forward(shared, router, out);
    }
}

fn emit(
    shared: &Shared,
    router: &mpsc::UnboundedSender<Route>,
    account: &mut Account,
    msg: Envelope,
) -> Result<(), RuntimeError> {
    if account.is_active() {
        return Err(RuntimeError::AccountNotFound {
            address: account.address,
        });
    }
    if account.balance < msg.value {
        return Err(RuntimeError::InsufficientFunds {
            address: account.address,
            available: account.balance,
            required: msg.value,
        });
    }
    account.balance -= msg.value;
    forward(shared, router, msg);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdao_types::cell::Cell;

    fn network() -> Network {
        Network::new(&NetworkConfig::default(), 1_000)
    }

    #[tokio::test]
    async fn test_settle_on_idle_network() {
        let net = network();
        net.settle().await.unwrap();
        assert_eq!(net.transaction_count(), 0);
        assert_eq!(net.len().await, 0);
    }

    #[tokio::test]
    async fn test_value_transfer_between_treasuries() {
        let net = network();
        let alice = net.treasury("alice").await.unwrap();
        let bob = net.treasury("bob").await.unwrap();

        net.send(Envelope::new(alice, bob, 5, Cell::empty()))
            .await
            .unwrap();
        net.settle().await.unwrap();

        assert_eq!(net.balance(&alice).await, TREASURY_BALANCE - 5);
        assert_eq!(net.balance(&bob).await, TREASURY_BALANCE + 5);
        let txs = net.transactions();
        assert_eq!(txs.len(), 1);
        assert!(txs[0].success);
        assert_eq!(txs[0].on, bob);
    }

    #[tokio::test]
    async fn test_treasury_funded_once() {
        let net = network();
        let a = net.treasury("alice").await.unwrap();
        let b = net.treasury("bob").await.unwrap();
        net.send(Envelope::new(a, b, 7, Cell::empty())).await.unwrap();
        net.settle().await.unwrap();
        assert_eq!(net.treasury("alice").await.unwrap(), a);
        assert_eq!(net.balance(&a).await, TREASURY_BALANCE - 7);
    }

    #[tokio::test]
    async fn test_send_requires_funds() {
        let net = network();
        let alice = net.treasury("alice").await.unwrap();
        let bob = net.treasury("bob").await.unwrap();
        let err = net
            .send(Envelope::new(alice, bob, TREASURY_BALANCE + 1, Cell::empty()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::RuntimeError(RuntimeError::InsufficientFunds { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_from_unknown_account() {
        let net = network();
        let ghost = Address::basechain([7; 32]);
        let err = net
            .send(Envelope::new(ghost, ghost, 1, Cell::empty()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::RuntimeError(RuntimeError::AccountNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_fresh_address_spawned_lazily() {
        let net = network();
        let alice = net.treasury("alice").await.unwrap();
        let fresh = Address::basechain([9; 32]);
        assert!(net.account(&fresh).await.is_none());

        net.send(Envelope::new(alice, fresh, 3, Cell::empty()))
            .await
            .unwrap();
        net.settle().await.unwrap();

        let account = net.account(&fresh).await.unwrap();
        assert_eq!(account.balance, 3);
        assert!(!account.is_active());
        assert_eq!(net.len().await, 2);
    }

    #[tokio::test]
    async fn test_transactions_broadcast() {
        let net = network();
        let mut events = net.subscribe();
        let alice = net.treasury("alice").await.unwrap();
        let bob = net.treasury("bob").await.unwrap();
        net.send(Envelope::new(alice, bob, 1, Cell::empty()))
            .await
            .unwrap();
        net.settle().await.unwrap();

        let tx = events.recv().await.unwrap();
        assert_eq!(tx.from, alice);
        assert_eq!(tx.on, bob);
    }

    #[tokio::test]
    async fn test_transaction_limit() {
        let config = NetworkConfig {
            mailbox_capacity: 8,
            max_transactions: 1,
        };
        let net = Network::new(&config, 0);
        let alice = net.treasury("alice").await.unwrap();
        let bob = net.treasury("bob").await.unwrap();
        for _ in 0..2 {
            net.send(Envelope::new(alice, bob, 1, Cell::empty()))
                .await
                .unwrap();
        }
        let err = net.settle().await.unwrap_err();
        assert!(matches!(
            err,
            NodeError::RuntimeError(RuntimeError::TooManyTransactions { limit: 1 })
        ));
        assert_eq!(net.transaction_count(), 1);
        // The counter resets after each settle.
        net.settle().await.unwrap();
    }

    #[tokio::test]
    async fn test_metrics_track_accounts_and_messages() {
        let metrics = Arc::new(NodeMetrics::new());
        let net = Network::with_metrics(&NetworkConfig::default(), 0, metrics.clone());
        let alice = net.treasury("alice").await.unwrap();
        let bob = net.treasury("bob").await.unwrap();
        net.send(Envelope::new(alice, bob, 1, Cell::empty()))
            .await
            .unwrap();
        net.settle().await.unwrap();

        assert_eq!(metrics.live_accounts.get(), 2);
        assert_eq!(metrics.messages_delivered.get(), 1);
        assert_eq!(metrics.transactions_failed.get(), 0);
    }
}
