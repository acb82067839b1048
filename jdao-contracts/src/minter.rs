//! Jetton minter acting as DAO root.
//!
//! Owns the supply, the admin, and the code cells every wallet, keeper and
//! voting is derived from. Hands out sequential voting ids and relays
//! messages back from votings after checking that the sender is the address
//! derived for the claimed id.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use tracing::{debug, info};

use jdao_types::cell::Cell;
use jdao_types::constants::PROPOSAL_VOTING_KIND;
use jdao_types::error::DaoError;
use jdao_types::message::{
    Body, BurnNotification, ChangeAdmin, ChangeContent, ConfirmVote, ConfirmVoting, CreateVoting,
    Excesses, ExecuteVoteResult, InitVoting, InternalMessage, InternalTransfer, Mint, Proposal,
    UpgradeCodes, VotingCreated, VotingInitiated,
};
use jdao_types::primitives::{Address, Coins, VotingId};

use crate::contract::{Context, Contract};
use crate::derive::{voting_address, voting_state_init, wallet_address, wallet_state_init};
use crate::{ensure, ensure_eq};
use crate::math::{safe_add, safe_add_u64, safe_sub};
use crate::response::{ContractResult, OutMessage, Response, SendValue};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Minter {
    pub total_supply: Coins,
    pub admin: Address,
    pub content: Cell,
    pub wallet_code: Cell,
    pub voting_code: Cell,
    pub keeper_code: Cell,
    /// Id the next created voting receives.
    pub voting_id: VotingId,
}

/// Snapshot returned by the jetton-data getter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JettonData {
    pub total_supply: Coins,
    pub admin: Address,
    pub content: Cell,
    pub wallet_code: Cell,
}

impl Minter {
    pub fn new(
        admin: Address,
        content: Cell,
        wallet_code: Cell,
        voting_code: Cell,
        keeper_code: Cell,
    ) -> Self {
        Minter {
            total_supply: 0,
            admin,
            content,
            wallet_code,
            voting_code,
            keeper_code,
            voting_id: 0,
        }
    }

    pub fn jetton_data(&self) -> JettonData {
        JettonData {
            total_supply: self.total_supply,
            admin: self.admin,
            content: self.content.clone(),
            wallet_code: self.wallet_code.clone(),
        }
    }

    pub fn wallet_address(&self, myself: &Address, owner: &Address) -> Address {
        wallet_address(owner, myself, &self.wallet_code, &self.keeper_code)
    }

    pub fn voting_address(&self, myself: &Address, voting_id: VotingId) -> Address {
        voting_address(myself, voting_id, &self.voting_code)
    }

    fn require_voting(&self, ctx: &Context, voting_id: VotingId) -> Result<(), DaoError> {
        ctx.require_sender(
            &self.voting_address(&ctx.myself(), voting_id),
            DaoError::UnauthorizedRouting,
        )
    }

    // ─── Jetton Plumbing ─────────────────────────────────────────────────

    fn mint(&mut self, ctx: &Context, msg: Mint) -> ContractResult {
        ensure_eq!(ctx.sender(), self.admin, DaoError::NotAdmin);
        self.total_supply = safe_add(self.total_supply, msg.jetton_amount)?;

        let me = ctx.myself();
        let init = wallet_state_init(&msg.to_address, &me, &self.wallet_code, &self.keeper_code);
        let internal = InternalTransfer {
            query_id: msg.query_id,
            amount: msg.jetton_amount,
            from: me,
            response_address: Some(ctx.sender()),
            forward_ton_amount: msg.forward_ton_amount,
            forward_payload: None,
        };
        Ok(Response::with_action("mint")
            .add_u128("amount", msg.jetton_amount)
            .add_address("to", &msg.to_address)
            .send(
                OutMessage::new(
                    self.wallet_address(&me, &msg.to_address),
                    SendValue::CarryInbound,
                    &internal,
                )?
                .with_state_init(init),
            ))
    }

    fn burn_notification(&mut self, ctx: &Context, msg: BurnNotification) -> ContractResult {
        ensure!(
            ctx.sender() == self.wallet_address(&ctx.myself(), &msg.sender),
            DaoError::UnauthorizedBurn
        );
        self.total_supply = safe_sub(self.total_supply, msg.amount)?;

        let mut resp = Response::with_action("burn_notification").add_u128("amount", msg.amount);
        if let Some(dest) = msg.response_destination {
            let excesses = Excesses {
                query_id: msg.query_id,
            };
            resp = resp.send(OutMessage::new(dest, SendValue::CarryInbound, &excesses)?);
        }
        Ok(resp)
    }

    fn change_admin(&mut self, ctx: &Context, msg: ChangeAdmin) -> ContractResult {
        ensure_eq!(ctx.sender(), self.admin, DaoError::NotAdmin);
        info!(admin = %msg.new_admin, "minter admin changed");
        self.admin = msg.new_admin;
        Ok(Response::with_action("change_admin").add_address("admin", &msg.new_admin))
    }

    fn change_content(&mut self, ctx: &Context, msg: ChangeContent) -> ContractResult {
        ensure_eq!(ctx.sender(), self.admin, DaoError::NotAdmin);
        self.content = msg.content;
        Ok(Response::with_action("change_content"))
    }

    // ─── Voting Routing ──────────────────────────────────────────────────

    fn create_voting(&mut self, ctx: &Context, msg: CreateVoting) -> ContractResult {
        let me = ctx.myself();
        let voting_id = self.voting_id;
        let proposal = Proposal {
            minimal_execution_amount: msg.minimal_execution_amount,
            payload: msg.payload,
        };
        let init = InitVoting {
            query_id: msg.query_id,
            expiration_date: msg.expiration_date,
            voting_kind: PROPOSAL_VOTING_KIND,
            wallet_code: self.wallet_code.clone(),
            keeper_code: self.keeper_code.clone(),
            proposal: proposal.to_cell()?,
            initiator: ctx.sender(),
        };
        let voting = self.voting_address(&me, voting_id);
        self.voting_id = safe_add_u64(self.voting_id, 1)?;
        info!(
            voting_id,
            voting = %voting.short(),
            expiration_date = msg.expiration_date,
            "creating voting"
        );

        Ok(Response::with_action("create_voting")
            .add_attribute("voting_id", voting_id.to_string())
            .send(
                OutMessage::new(voting, SendValue::CarryInbound, &init)?
                    .with_state_init(voting_state_init(&me, voting_id, &self.voting_code)),
            ))
    }

    fn voting_initiated(&mut self, ctx: &Context, msg: VotingInitiated) -> ContractResult {
        self.require_voting(ctx, msg.voting_id)?;
        let created = VotingCreated {
            query_id: msg.query_id,
            voting_address: ctx.sender(),
        };
        Ok(Response::with_action("voting_initiated").send(OutMessage::new(
            msg.initiator,
            SendValue::CarryInbound,
            &created,
        )?))
    }

    fn execute_vote_result(&mut self, ctx: &Context, msg: ExecuteVoteResult) -> ContractResult {
        self.require_voting(ctx, msg.voting_id)?;
        ensure!(
            ctx.now() > msg.expiration_date,
            DaoError::VotingNotFinished {
                expiration_date: msg.expiration_date,
                now: ctx.now(),
            }
        );

        let resp = Response::with_action("execute_vote_result")
            .add_u128("voted_for", msg.voted_for)
            .add_u128("voted_against", msg.voted_against);
        if msg.voted_for <= msg.voted_against {
            info!(voting_id = msg.voting_id, "proposal rejected");
            return Ok(resp.add_attribute("relayed", "false"));
        }

        let relay = InternalMessage::parse(&msg.payload)?;
        info!(
            voting_id = msg.voting_id,
            dest = %relay.dest.short(),
            "relaying accepted proposal"
        );
        Ok(resp.add_attribute("relayed", "true").send(
            OutMessage::raw(relay.dest, SendValue::Coins(relay.value), relay.body)
                .with_bounce(relay.bounce),
        ))
    }

    fn confirm_voting(&mut self, ctx: &Context, msg: ConfirmVoting) -> ContractResult {
        self.require_voting(ctx, msg.voting_id)?;
        let wallet = self.wallet_address(&ctx.myself(), &msg.voter);
        let confirm = ConfirmVote {
            query_id: msg.query_id,
        };
        Ok(Response::with_action("confirm_voting").send(OutMessage::new(
            wallet,
            SendValue::CarryInbound,
            &confirm,
        )?))
    }

    fn upgrade_codes(&mut self, ctx: &Context, msg: UpgradeCodes) -> ContractResult {
        ensure_eq!(ctx.sender(), self.admin, DaoError::UpgradeNotAdmin);
        if let Some(voting_code) = msg.new_voting_code {
            self.voting_code = voting_code;
        }
        debug!(code = %msg.new_code, "minter code upgrade");
        Ok(Response::with_action("upgrade_codes").set_code(msg.new_code))
    }
}

impl Contract for Minter {
    const KIND: &'static str = "jetton-minter";

    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult {
        match body {
            Body::Empty => Ok(Response::new()),
            Body::Mint(msg) => self.mint(ctx, msg),
            Body::BurnNotification(msg) => self.burn_notification(ctx, msg),
            Body::ChangeAdmin(msg) => self.change_admin(ctx, msg),
            Body::ChangeContent(msg) => self.change_content(ctx, msg),
            Body::CreateVoting(msg) => self.create_voting(ctx, msg),
            Body::VotingInitiated(msg) => self.voting_initiated(ctx, msg),
            Body::ExecuteVoteResult(msg) => self.execute_vote_result(ctx, msg),
            Body::ConfirmVoting(msg) => self.confirm_voting(ctx, msg),
            Body::UpgradeCodes(msg) => self.upgrade_codes(ctx, msg),
            other => Err(DaoError::UnknownOp {
                op: other.op().unwrap_or_default(),
            }),
        }
    }
}

/// Second minter revision: same state and handlers, but operations it does
/// not know are accepted as no-ops instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UpgradedMinter(pub Minter);

impl Contract for UpgradedMinter {
    const KIND: &'static str = "jetton-minter-v2";

    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult {
        match self.0.receive(ctx, body) {
            Err(DaoError::UnknownOp { op }) => {
                Ok(Response::with_action("ignored").add_attribute("op", format!("0x{op:08x}")))
            }
            other => other,
        }
    }
}
