//! End-to-end runs of configured governance scenarios over the async
//! network: deploy, mint, vote, lock, expire, execute, relay.

use std::sync::Arc;

use jdao_contracts::minter::Minter;
use jdao_node::config::{
    HolderConfig, NetworkConfig, NodeConfig, ProposalAction, ProposalConfig, VoteConfig,
};
use jdao_node::metrics::NodeMetrics;
use jdao_node::network::Network;
use jdao_node::scenario::{simulate, Scenario};
use jdao_types::constants::{exit_code, op};
use jdao_types::primitives::ONE_COIN;

const COIN: u64 = ONE_COIN as u64;

fn holders(list: &[(&str, u64)]) -> Vec<HolderConfig> {
    list.iter()
        .map(|(name, coins)| HolderConfig {
            name: name.to_string(),
            balance: coins * COIN,
        })
        .collect()
}

fn vote(holder: &str, vote_for: bool) -> VoteConfig {
    VoteConfig {
        holder: holder.to_string(),
        vote_for,
        confirm: false,
    }
}

fn proposal(action: ProposalAction, votes: Vec<VoteConfig>) -> ProposalConfig {
    ProposalConfig {
        expiration_offset: 600,
        minimal_execution_amount: 0,
        initiator: None,
        action,
        votes,
        transfers: Vec::new(),
    }
}

fn network(config: &NodeConfig) -> Network {
    Network::new(&config.network, config.dao.start_time)
}

#[tokio::test]
async fn test_sample_scenario() {
    let config = NodeConfig::sample();
    let net = network(&config);
    let report = simulate(&config, &net).await.unwrap();

    assert_eq!(report.proposals.len(), 2);
    assert_eq!(report.admin, "dao");

    // alice (500) for, bob (300) against: mint 100 to carol passes.
    let first = &report.proposals[0];
    assert_eq!(first.voted_for, (500 * COIN) as u128);
    assert_eq!(first.voted_against, (300 * COIN) as u128);
    assert!(first.executed);
    assert!(first.relayed);
    assert!(first.applied);
    // alice's transfer was refused while her jettons were locked.
    assert_eq!(first.refused_transfers, 1);

    // bob (300) for, alice (500) against: admin change is not relayed.
    let second = &report.proposals[1];
    assert_eq!(second.voting_id, 1);
    assert!(second.executed);
    assert!(!second.relayed);
    assert!(!second.applied);

    assert_eq!(report.total_supply, (1_100 * COIN) as u128);
    let carol = report.holders.iter().find(|h| h.name == "carol").unwrap();
    assert_eq!(carol.balance, (300 * COIN) as u128);
    let alice = report.holders.iter().find(|h| h.name == "alice").unwrap();
    assert_eq!(alice.balance, (500 * COIN) as u128);
}

#[tokio::test]
async fn test_admin_owned_minter_refuses_relayed_admin_change() {
    let mut config = NodeConfig {
        holders: holders(&[("alice", 10), ("bob", 5)]),
        ..NodeConfig::default()
    };
    config.dao.self_governed = false;
    config.proposals.push(proposal(
        ProposalAction::ChangeAdmin {
            new_admin: "bob".to_string(),
        },
        vec![vote("alice", true)],
    ));
    let net = network(&config);
    let report = simulate(&config, &net).await.unwrap();

    let p = &report.proposals[0];
    assert!(p.relayed);
    assert!(!p.applied);
    assert_eq!(report.admin, "admin");
    assert!(net.transactions().iter().any(|t| t.op == Some(op::CHANGE_ADMIN)
        && t.exit_code == exit_code::NOT_ADMIN));
}

#[tokio::test]
async fn test_dao_admin_change_by_vote() {
    let config = NodeConfig {
        holders: holders(&[("alice", 10), ("bob", 5)]),
        proposals: vec![proposal(
            ProposalAction::ChangeAdmin {
                new_admin: "bob".to_string(),
            },
            vec![vote("alice", true), vote("bob", false)],
        )],
        ..NodeConfig::default()
    };
    let net = network(&config);
    let report = simulate(&config, &net).await.unwrap();

    assert!(report.proposals[0].applied);
    assert_eq!(report.admin, "bob");
}

#[tokio::test]
async fn test_payout_reaches_recipient() {
    let config = NodeConfig {
        holders: holders(&[("alice", 10), ("carol", 1)]),
        proposals: vec![proposal(
            ProposalAction::Payout {
                to: "carol".to_string(),
                value: COIN / 2,
            },
            vec![vote("alice", true)],
        )],
        ..NodeConfig::default()
    };
    let net = network(&config);
    let scenario = Scenario::setup(&config, &net).await.unwrap();
    let carol = net.treasury("carol").await.unwrap();
    let before = net.balance(&carol).await;

    let report = scenario.run().await.unwrap();
    assert!(report.proposals[0].applied);
    assert_eq!(net.balance(&carol).await, before + ONE_COIN / 2);
}

#[tokio::test]
async fn test_vote_confirmation_reaches_owner() {
    let mut p = proposal(
        ProposalAction::Payout {
            to: "alice".to_string(),
            value: 1,
        },
        vec![VoteConfig {
            holder: "alice".to_string(),
            vote_for: true,
            confirm: true,
        }],
    );
    p.expiration_offset = 60;
    let config = NodeConfig {
        holders: holders(&[("alice", 3)]),
        proposals: vec![p],
        ..NodeConfig::default()
    };
    let net = network(&config);
    simulate(&config, &net).await.unwrap();

    let alice = net.treasury("alice").await.unwrap();
    assert!(net
        .transactions()
        .iter()
        .any(|t| t.on == alice && t.op == Some(op::VOTE_CONFIRMATION) && t.success));
}

#[tokio::test]
async fn test_many_concurrent_voters() {
    let names: Vec<String> = (0..12).map(|i| format!("voter{}", i)).collect();
    let list: Vec<(&str, u64)> = names.iter().map(|n| (n.as_str(), 2)).collect();
    let votes = names
        .iter()
        .enumerate()
        .map(|(i, n)| vote(n, i % 3 != 0))
        .collect();
    let config = NodeConfig {
        holders: holders(&list),
        proposals: vec![proposal(
            ProposalAction::Mint {
                to: "voter0".to_string(),
                amount: COIN,
            },
            votes,
        )],
        ..NodeConfig::default()
    };
    let net = network(&config);
    let report = simulate(&config, &net).await.unwrap();

    let p = &report.proposals[0];
    assert_eq!(p.voted_for, (16 * COIN) as u128);
    assert_eq!(p.voted_against, (8 * COIN) as u128);
    assert!(p.applied);
    assert_eq!(report.total_supply, (25 * COIN) as u128);
}

#[tokio::test]
async fn test_minter_state_after_setup() {
    let config = NodeConfig {
        holders: holders(&[("alice", 7), ("bob", 3)]),
        ..NodeConfig::default()
    };
    let net = network(&config);
    let scenario = Scenario::setup(&config, &net).await.unwrap();
    let minter: Minter = net.state(&scenario.minter()).await.unwrap();
    assert_eq!(minter.total_supply, (10 * COIN) as u128);
    assert_eq!(minter.admin, scenario.minter());
    assert_eq!(minter.voting_id, 0);
}

#[tokio::test]
async fn test_transaction_limit_aborts_scenario() {
    let config = NodeConfig {
        network: NetworkConfig {
            mailbox_capacity: 4,
            max_transactions: 2,
        },
        holders: holders(&[("alice", 1)]),
        ..NodeConfig::default()
    };
    let net = network(&config);
    assert!(simulate(&config, &net).await.is_err());
}

#[tokio::test]
async fn test_metrics_after_simulation() {
    let config = NodeConfig::sample();
    let metrics = Arc::new(NodeMetrics::new());
    let net = Network::with_metrics(&config.network, config.dao.start_time, metrics.clone());
    simulate(&config, &net).await.unwrap();

    assert_eq!(metrics.votings_created.get(), 2);
    assert_eq!(metrics.votings_executed.get(), 2);
    assert!(metrics.transactions_failed.get() >= 1);
    assert_eq!(
        metrics.messages_delivered.get(),
        net.transaction_count() as u64
    );
    let text = metrics.encode().unwrap();
    assert!(text.contains("jdao_votings_created_total 2"));
}
