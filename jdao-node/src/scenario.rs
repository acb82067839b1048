//! Configured governance scenario run over the async network.
//!
//! Deploys the minter, mints holder balances, then walks every proposal:
//! create the voting, cast votes, attempt the configured transfers, move
//! time past the expiration and end the voting.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use jdao_contracts::code;
use jdao_contracts::derive::{minter_state_init, voting_address, wallet_address};
use jdao_contracts::minter::Minter;
use jdao_contracts::voting::Voting;
use jdao_contracts::wallet::Wallet;
use jdao_crypto::address::contract_address;
use jdao_runtime::{Envelope, Transaction};
use jdao_types::cell::Cell;
use jdao_types::constants::{
    op, FORWARD_VALUE, JETTON_MSG_VALUE, NOTIFICATION_VALUE, VOTE_VALUE, VOTING_DEPLOY_VALUE,
};
use jdao_types::message::{
    relay_payload, ChangeAdmin, CreateVoting, EndVoting, InternalMessage, MessageBody, Mint,
    Transfer, Vote,
};
use jdao_types::primitives::{Address, Coins, Timestamp, VotingId, BASECHAIN, ONE_COIN};

use crate::config::{NodeConfig, ProposalAction, ProposalConfig, DAO_NAME};
use crate::error::NodeError;
use crate::network::Network;

// ─── Report ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ProposalReport {
    pub voting_id: VotingId,
    pub voting: Address,
    pub action: String,
    pub initiator: String,
    pub expiration_date: Timestamp,
    pub voted_for: Coins,
    pub voted_against: Coins,
    pub executed: bool,
    /// The minter relayed the proposal payload.
    pub relayed: bool,
    /// The relayed message itself was accepted by its destination.
    pub applied: bool,
    /// Configured transfers refused while the votes were locked.
    pub refused_transfers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HolderReport {
    pub name: String,
    pub address: Address,
    pub balance: Coins,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub minter: Address,
    /// Holder name, "dao", the admin treasury name, or the raw address.
    pub admin: String,
    pub total_supply: Coins,
    pub holders: Vec<HolderReport>,
    pub proposals: Vec<ProposalReport>,
    pub transactions: usize,
    pub failed_transactions: usize,
}

// ─── Runner ──────────────────────────────────────────────────────────────

/// Minter address for a DAO administered by treasury `admin`.
pub fn minter_address(admin: &Address) -> Address {
    contract_address(BASECHAIN, &minter_init(admin))
}

fn minter_init(admin: &Address) -> jdao_types::account::StateInit {
    minter_state_init(
        admin,
        Cell::empty(),
        &code::minter(),
        &code::wallet(),
        &code::voting(),
        &code::keeper(),
    )
}

pub struct Scenario<'a> {
    config: &'a NodeConfig,
    network: &'a Network,
    admin: Address,
    minter: Address,
    names: HashMap<String, Address>,
}

impl<'a> Scenario<'a> {
    /// Deploy the minter and mint every holder balance.
    pub async fn setup(config: &'a NodeConfig, network: &'a Network) -> Result<Self, NodeError> {
        network.set_now(config.dao.start_time);
        let admin = network.treasury(&config.dao.admin).await?;
        let init = minter_init(&admin);
        let minter = contract_address(BASECHAIN, &init);
        network
            .send(Envelope::new(admin, minter, ONE_COIN, Cell::empty()).with_state_init(init))
            .await?;
        network.settle().await?;
        if !network.is_active(&minter).await {
            return Err(scenario_error("minter was not deployed".to_string()));
        }
        info!(minter = %minter.short(), "dao deployed");

        let mut names = HashMap::new();
        names.insert(config.dao.admin.clone(), admin);
        names.insert(DAO_NAME.to_string(), minter);

        let mut scenario = Self {
            config,
            network,
            admin,
            minter,
            names,
        };
        for holder in &config.holders {
            let owner = network.treasury(&holder.name).await?;
            scenario.names.insert(holder.name.clone(), owner);
            if holder.balance > 0 {
                let body = Mint {
                    query_id: 0,
                    to_address: owner,
                    jetton_amount: holder.balance as Coins,
                    forward_ton_amount: FORWARD_VALUE,
                };
                network
                    .send_body(admin, minter, JETTON_MSG_VALUE, &body)
                    .await?;
            }
        }
        network.settle().await?;

        if config.dao.self_governed {
            let body = ChangeAdmin {
                query_id: 0,
                new_admin: minter,
            };
            network
                .send_body(admin, minter, JETTON_MSG_VALUE, &body)
                .await?;
            network.settle().await?;
            info!("minter adminship handed to the dao");
        }
        Ok(scenario)
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Run every proposal and report the outcome.
    pub async fn run(&self) -> Result<Report, NodeError> {
        let mut proposals = Vec::with_capacity(self.config.proposals.len());
        for proposal in &self.config.proposals {
            proposals.push(self.run_proposal(proposal).await?);
        }

        let minter: Minter = self.network.state(&self.minter).await?;
        let mut holders = Vec::with_capacity(self.config.holders.len());
        for holder in &self.config.holders {
            let address = self.resolve(&holder.name)?;
            let balance = self.balance_of(&minter, &address).await;
            holders.push(HolderReport {
                name: holder.name.clone(),
                address,
                balance,
            });
        }

        let transactions = self.network.transactions();
        Ok(Report {
            minter: self.minter,
            admin: self.name_of(&minter.admin),
            total_supply: minter.total_supply,
            holders,
            proposals,
            transactions: transactions.len(),
            failed_transactions: transactions.iter().filter(|t| !t.success).count(),
        })
    }

    async fn run_proposal(&self, proposal: &ProposalConfig) -> Result<ProposalReport, NodeError> {
        let net = self.network;
        let mark = net.transaction_count();
        let minter: Minter = net.state(&self.minter).await?;
        let voting_id = minter.voting_id;
        let voting = voting_address(&self.minter, voting_id, &minter.voting_code);

        let initiator_name = self
            .config
            .initiator_of(proposal)
            .ok_or_else(|| scenario_error(format!("voting {} has no initiator", voting_id)))?;
        let initiator = self.resolve(initiator_name)?;
        let expiration_date = net.now() + proposal.expiration_offset;

        let payload = self.payload(&proposal.action)?;
        let relayed_msg = InternalMessage::parse(&payload)?;
        let create = CreateVoting {
            query_id: 0,
            expiration_date,
            minimal_execution_amount: proposal.minimal_execution_amount as Coins,
            payload,
        };
        net.send_body(initiator, self.minter, VOTING_DEPLOY_VALUE, &create)
            .await?;
        net.settle().await?;
        if !net.is_active(&voting).await {
            return Err(scenario_error(format!("voting {} was not deployed", voting_id)));
        }
        info!(voting_id, voting = %voting.short(), expiration_date, "voting created");

        for v in &proposal.votes {
            let owner = self.resolve(&v.holder)?;
            let body = Vote {
                query_id: 0,
                voting_address: voting,
                expiration_date,
                vote_for: v.vote_for,
                need_confirmation: v.confirm,
            };
            net.send_body(owner, self.wallet_of(&minter, &owner), VOTE_VALUE, &body)
                .await?;
        }
        net.settle().await?;

        let transfer_mark = net.transaction_count();
        for t in &proposal.transfers {
            let from = self.resolve(&t.from)?;
            let body = Transfer {
                query_id: 0,
                amount: t.amount as Coins,
                destination: self.resolve(&t.to)?,
                response_destination: Some(from),
                custom_payload: None,
                forward_ton_amount: 0,
                forward_payload: None,
            };
            net.send_body(from, self.wallet_of(&minter, &from), JETTON_MSG_VALUE, &body)
                .await?;
        }
        net.settle().await?;
        let refused_transfers = net
            .transactions_since(transfer_mark)
            .iter()
            .filter(|t| t.op == Some(op::TRANSFER) && !t.success)
            .count();

        net.set_now(expiration_date + 1);
        let value = (self.config.dao.execution_value as Coins)
            .max(proposal.minimal_execution_amount as Coins);
        net.send_body(initiator, voting, value, &EndVoting { query_id: 0 })
            .await?;
        net.settle().await?;

        let state: Voting = net.state(&voting).await?;
        let log = net.transactions_since(mark);
        let relay = log.iter().position(|t| {
            t.on == self.minter
                && t.op == Some(op::EXECUTE_VOTE_RESULT)
                && t.success
                && t.attribute("relayed") == Some("true")
        });
        let applied =
            relay.is_some_and(|i| relay_applied(&log[i + 1..], &self.minter, &relayed_msg));

        let report = ProposalReport {
            voting_id,
            voting,
            action: self.describe(&proposal.action),
            initiator: initiator_name.to_string(),
            expiration_date,
            voted_for: state.voted_for,
            voted_against: state.voted_against,
            executed: state.executed,
            relayed: relay.is_some(),
            applied,
            refused_transfers,
        };
        info!(
            voting_id,
            voted_for = report.voted_for,
            voted_against = report.voted_against,
            relayed = report.relayed,
            "voting finished"
        );
        Ok(report)
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn resolve(&self, name: &str) -> Result<Address, NodeError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| scenario_error(format!("unknown name '{}'", name)))
    }

    fn name_of(&self, address: &Address) -> String {
        self.names
            .iter()
            .find(|(_, a)| *a == address)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| address.to_string())
    }

    fn wallet_of(&self, minter: &Minter, owner: &Address) -> Address {
        wallet_address(owner, &self.minter, &minter.wallet_code, &minter.keeper_code)
    }

    async fn balance_of(&self, minter: &Minter, owner: &Address) -> Coins {
        let wallet = self.wallet_of(minter, owner);
        match self.network.state::<Wallet>(&wallet).await {
            Ok(w) => w.total_balance(self.network.now()),
            Err(_) => 0,
        }
    }

    /// Internal message the minter relays if the proposal passes.
    fn payload(&self, action: &ProposalAction) -> Result<Cell, NodeError> {
        let cell = match action {
            ProposalAction::Mint { to, amount } => {
                let body = Mint {
                    query_id: 0,
                    to_address: self.resolve(to)?,
                    jetton_amount: *amount as Coins,
                    forward_ton_amount: 0,
                };
                relay_payload(self.minter, JETTON_MSG_VALUE, body.to_cell()?)?
            }
            ProposalAction::ChangeAdmin { new_admin } => {
                let body = ChangeAdmin {
                    query_id: 0,
                    new_admin: self.resolve(new_admin)?,
                };
                relay_payload(self.minter, NOTIFICATION_VALUE, body.to_cell()?)?
            }
            ProposalAction::Payout { to, value } => {
                relay_payload(self.resolve(to)?, *value as Coins, Cell::empty())?
            }
        };
        Ok(cell)
    }

    fn describe(&self, action: &ProposalAction) -> String {
        match action {
            ProposalAction::Mint { to, amount } => {
                format!("mint {} to {}", format_coins(*amount as Coins), to)
            }
            ProposalAction::ChangeAdmin { new_admin } => format!("change admin to {}", new_admin),
            ProposalAction::Payout { to, value } => {
                format!("pay {} to {}", format_coins(*value as Coins), to)
            }
        }
    }
}

/// The relayed message, sent by the minter after the relay, succeeded on
/// its destination.
fn relay_applied(after: &[Transaction], minter: &Address, relayed: &InternalMessage) -> bool {
    after
        .iter()
        .find(|t| t.from == *minter && t.on == relayed.dest && t.body == relayed.body)
        .is_some_and(|t| t.success)
}

/// Run the whole configured scenario on `network`.
pub async fn simulate(config: &NodeConfig, network: &Network) -> Result<Report, NodeError> {
    let scenario = Scenario::setup(config, network).await?;
    scenario.run().await
}

/// `amount` in whole coins with nine decimals, trailing zeros trimmed.
pub fn format_coins(amount: Coins) -> String {
    let whole = amount / ONE_COIN;
    let frac = amount % ONE_COIN;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:09}", frac);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

fn scenario_error(reason: String) -> NodeError {
    NodeError::ScenarioError { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_coins() {
        assert_eq!(format_coins(0), "0");
        assert_eq!(format_coins(5 * ONE_COIN), "5");
        assert_eq!(format_coins(ONE_COIN / 10), "0.1");
        assert_eq!(format_coins(ONE_COIN + 1), "1.000000001");
    }

    #[test]
    fn test_minter_address_per_admin() {
        let a = Address::basechain([1; 32]);
        let b = Address::basechain([2; 32]);
        assert_ne!(minter_address(&a), minter_address(&b));
    }

    #[test]
    fn test_relay_applied_matches_relayed_message() {
        let minter = Address::basechain([1; 32]);
        let target = Address::basechain([2; 32]);
        let wallet = Address::basechain([3; 32]);
        let body = Cell::from_hash([7; 32]);
        let relayed = InternalMessage {
            bounce: true,
            dest: target,
            value: 0,
            body: body.clone(),
        };
        let tx = |from: Address, on: Address, body: Cell, success: bool| Transaction {
            lt: 0,
            from,
            on,
            value: 0,
            op: None,
            name: "empty",
            body,
            success,
            exit_code: 0,
            deploy: false,
            error: None,
            action: None,
            attributes: Vec::new(),
            out_messages: 0,
        };

        // another minter message completing first does not decide the outcome
        let log = [
            tx(minter, wallet, Cell::empty(), false),
            tx(minter, target, body.clone(), true),
        ];
        assert!(relay_applied(&log, &minter, &relayed));

        let log = [
            tx(minter, wallet, Cell::empty(), true),
            tx(minter, target, body.clone(), false),
        ];
        assert!(!relay_applied(&log, &minter, &relayed));

        let log = [tx(wallet, target, body, true)];
        assert!(!relay_applied(&log, &minter, &relayed));
        assert!(!relay_applied(&[], &minter, &relayed));
    }
}
