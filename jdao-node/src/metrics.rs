use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use jdao_runtime::Transaction;
use jdao_types::constants::op;

use crate::error::NodeError;

/// Network-wide Prometheus metrics.
pub struct NodeMetrics {
    pub messages_delivered: Counter,
    pub transactions_failed: Counter,
    pub votings_created: Counter,
    pub votings_executed: Counter,
    pub live_accounts: Gauge,
    pub registry: Registry,
}

impl NodeMetrics {
    /// Create a new metrics registry with all node metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let messages_delivered = Counter::default();
        let transactions_failed = Counter::default();
        let votings_created = Counter::default();
        let votings_executed = Counter::default();
        let live_accounts = Gauge::default();

        registry.register(
            "jdao_messages_delivered",
            "Messages processed as transactions",
            messages_delivered.clone(),
        );
        registry.register(
            "jdao_transactions_failed",
            "Transactions rejected with a non-zero exit code",
            transactions_failed.clone(),
        );
        registry.register(
            "jdao_votings_created",
            "Votings initialised by the minter",
            votings_created.clone(),
        );
        registry.register(
            "jdao_votings_executed",
            "Votings ended after expiration",
            votings_executed.clone(),
        );
        registry.register(
            "jdao_live_accounts",
            "Account tasks running in the network",
            live_accounts.clone(),
        );

        Self {
            messages_delivered,
            transactions_failed,
            votings_created,
            votings_executed,
            live_accounts,
            registry,
        }
    }

    /// Account for one executed transaction.
    pub fn observe(&self, tx: &Transaction) {
        self.messages_delivered.inc();
        if !tx.success {
            self.transactions_failed.inc();
            return;
        }
        match tx.op {
            Some(op::INIT_VOTING) => {
                self.votings_created.inc();
            }
            Some(op::END_VOTING) => {
                self.votings_executed.inc();
            }
            _ => {}
        }
    }

    /// Encode all metrics in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &self.registry)
            .map_err(|_| NodeError::MetricsError)?;
        Ok(buf)
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdao_types::cell::Cell;
    use jdao_types::primitives::Address;

    fn tx(op: Option<u32>, success: bool) -> Transaction {
        Transaction {
            lt: 1,
            from: Address::basechain([1; 32]),
            on: Address::basechain([2; 32]),
            value: 0,
            op,
            name: "test",
            body: Cell::empty(),
            success,
            exit_code: if success { 0 } else { 0xf6 },
            deploy: false,
            error: None,
            action: None,
            attributes: Vec::new(),
            out_messages: 0,
        }
    }

    #[test]
    fn test_observe_counts_by_op() {
        let metrics = NodeMetrics::new();
        metrics.observe(&tx(Some(op::INIT_VOTING), true));
        metrics.observe(&tx(Some(op::END_VOTING), true));
        metrics.observe(&tx(Some(op::END_VOTING), false));
        metrics.observe(&tx(None, true));

        assert_eq!(metrics.messages_delivered.get(), 4);
        assert_eq!(metrics.transactions_failed.get(), 1);
        assert_eq!(metrics.votings_created.get(), 1);
        assert_eq!(metrics.votings_executed.get(), 1);
    }

    #[test]
    fn test_metrics_encode_format() {
        let metrics = NodeMetrics::new();
        metrics.live_accounts.set(7);
        metrics.messages_delivered.inc();
        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("jdao_live_accounts 7"));
        assert!(encoded.contains("jdao_messages_delivered_total 1"));
        assert!(encoded.contains("jdao_votings_created"));
    }
}
