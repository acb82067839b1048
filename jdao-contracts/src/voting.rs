//! Voting: one per proposal.
//!
//! Lifecycle is `uninitialized -> active -> executed`. The minter deploys
//! the voting and initialises it in the same message; keepers submit vote
//! deltas until the expiration date; afterwards anyone may end the voting,
//! which hands the tally and the proposal back to the minter exactly once.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use tracing::{debug, info};

use jdao_types::cell::Cell;
use jdao_types::error::DaoError;
use jdao_types::message::{
    Body, ConfirmVoting, EndVoting, Excesses, ExecuteVoteResult, InitVoting, Proposal,
    SubmitVotes, VoteWeight, VotingInitiated,
};
use jdao_types::primitives::{Address, Coins, Timestamp, VotingId};

use crate::contract::{Context, Contract};
use crate::derive::{keeper_address, wallet_address};
use crate::{ensure, ensure_eq};
use crate::math::safe_add;
use crate::response::{ContractResult, OutMessage, Response, SendValue};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Voting {
    pub voting_id: VotingId,
    pub dao: Address,
    pub init: bool,
    pub executed: bool,
    pub expiration_date: Timestamp,
    pub voting_kind: u64,
    pub wallet_code: Cell,
    pub keeper_code: Cell,
    pub proposal: Cell,
    pub initiator: Option<Address>,
    pub voted_for: Coins,
    pub voted_against: Coins,
}

/// Snapshot returned by the full-data getter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VotingData {
    pub voting_id: VotingId,
    pub dao: Address,
    pub init: bool,
    pub executed: bool,
    pub expiration_date: Timestamp,
    pub voting_kind: u64,
    pub initiator: Option<Address>,
    pub voted_for: Coins,
    pub voted_against: Coins,
    pub minimal_execution_amount: Coins,
}

impl Voting {
    /// Undeployed state; this is what the address is derived from.
    pub fn new(dao: Address, voting_id: VotingId) -> Self {
        Voting {
            voting_id,
            dao,
            init: false,
            executed: false,
            expiration_date: 0,
            voting_kind: 0,
            wallet_code: Cell::empty(),
            keeper_code: Cell::empty(),
            proposal: Cell::empty(),
            initiator: None,
            voted_for: 0,
            voted_against: 0,
        }
    }

    pub fn data(&self) -> VotingData {
        let minimal_execution_amount = Proposal::parse(&self.proposal)
            .map(|p| p.minimal_execution_amount)
            .unwrap_or_default();
        VotingData {
            voting_id: self.voting_id,
            dao: self.dao,
            init: self.init,
            executed: self.executed,
            expiration_date: self.expiration_date,
            voting_kind: self.voting_kind,
            initiator: self.initiator,
            voted_for: self.voted_for,
            voted_against: self.voted_against,
            minimal_execution_amount,
        }
    }

    fn init_voting(&mut self, ctx: &Context, msg: InitVoting) -> ContractResult {
        ensure_eq!(ctx.sender(), self.dao, DaoError::NotFromDao);
        ensure!(!self.init, DaoError::AlreadyInitialized);
        // Reject a proposal cell the voting could never execute.
        Proposal::parse(&msg.proposal)?;

        self.init = true;
        self.expiration_date = msg.expiration_date;
        self.voting_kind = msg.voting_kind;
        self.wallet_code = msg.wallet_code;
        self.keeper_code = msg.keeper_code;
        self.proposal = msg.proposal;
        self.initiator = Some(msg.initiator);
        debug!(
            voting_id = self.voting_id,
            expiration_date = self.expiration_date,
            "voting initialized"
        );

        let initiated = VotingInitiated {
            query_id: msg.query_id,
            voting_id: self.voting_id,
            expiration_date: self.expiration_date,
            initiator: msg.initiator,
        };
        Ok(Response::with_action("init_voting").send(OutMessage::new(
            self.dao,
            SendValue::CarryInbound,
            &initiated,
        )?))
    }

    fn submit_votes(&mut self, ctx: &Context, vote: VoteWeight) -> ContractResult {
        ensure!(self.init, DaoError::NotInitialized);
        let wallet = wallet_address(&vote.voter, &self.dao, &self.wallet_code, &self.keeper_code);
        let keeper = keeper_address(&wallet, &ctx.myself(), &self.keeper_code);
        ensure_eq!(ctx.sender(), keeper, DaoError::NotFromKeeper);
        ensure!(
            vote.expiration_date == self.expiration_date,
            DaoError::ExpirationMismatch {
                claimed: vote.expiration_date,
                stored: self.expiration_date,
            }
        );
        ensure!(
            ctx.now() <= self.expiration_date,
            DaoError::VotingFinished {
                expiration_date: self.expiration_date,
                now: ctx.now(),
            }
        );

        if vote.vote_for {
            self.voted_for = safe_add(self.voted_for, vote.weight)?;
        } else {
            self.voted_against = safe_add(self.voted_against, vote.weight)?;
        }
        debug!(
            voting_id = self.voting_id,
            voter = %vote.voter.short(),
            weight = vote.weight,
            vote_for = vote.vote_for,
            "votes accepted"
        );

        let reply = if vote.confirm {
            let confirm = ConfirmVoting {
                query_id: vote.query_id,
                voting_id: self.voting_id,
                voter: vote.voter,
            };
            OutMessage::new(self.dao, SendValue::CarryInbound, &confirm)?
        } else {
            let excesses = Excesses {
                query_id: vote.query_id,
            };
            OutMessage::new(vote.voter, SendValue::CarryInbound, &excesses)?
        };
        Ok(Response::with_action("submit_votes")
            .add_u128("voted_for", self.voted_for)
            .add_u128("voted_against", self.voted_against)
            .send(reply))
    }

    fn end_voting(&mut self, ctx: &Context, msg: EndVoting) -> ContractResult {
        ensure!(self.init, DaoError::NotInitialized);
        ensure!(
            ctx.now() > self.expiration_date,
            DaoError::VotingNotFinished {
                expiration_date: self.expiration_date,
                now: ctx.now(),
            }
        );
        ensure!(!self.executed, DaoError::AlreadyExecuted);
        let proposal = Proposal::parse(&self.proposal)?;
        ensure!(
            ctx.value() >= proposal.minimal_execution_amount,
            DaoError::ExecutionValueTooLow {
                value: ctx.value(),
                minimum: proposal.minimal_execution_amount,
            }
        );

        self.executed = true;
        info!(
            voting_id = self.voting_id,
            voted_for = self.voted_for,
            voted_against = self.voted_against,
            "voting ended"
        );

        let execute = ExecuteVoteResult {
            query_id: msg.query_id,
            voting_id: self.voting_id,
            expiration_date: self.expiration_date,
            voted_for: self.voted_for,
            voted_against: self.voted_against,
            payload: proposal.payload,
        };
        Ok(Response::with_action("end_voting").send(OutMessage::new(
            self.dao,
            SendValue::CarryInbound,
            &execute,
        )?))
    }
}

impl Contract for Voting {
    const KIND: &'static str = "voting";

    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult {
        match body {
            Body::Empty => Ok(Response::new()),
            Body::InitVoting(msg) => self.init_voting(ctx, msg),
            Body::SubmitVotes(SubmitVotes(vote)) => self.submit_votes(ctx, vote),
            Body::EndVoting(msg) => self.end_voting(ctx, msg),
            other => Err(DaoError::UnknownOp {
                op: other.op().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code;
    use crate::testing::{addr, ALICE, BOB};
    use jdao_types::constants::PROPOSAL_VOTING_KIND;

    const DAO: Address = Address::basechain([0xda; 32]);
    const ME: Address = Address::basechain([0x70; 32]);
    const EXP: Timestamp = 1_000;

    fn proposal(min: Coins) -> Cell {
        Proposal {
            minimal_execution_amount: min,
            payload: Cell::from_hash([1; 32]),
        }
        .to_cell()
        .unwrap()
    }

    fn init_msg(min: Coins) -> Body {
        Body::InitVoting(InitVoting {
            query_id: 0,
            expiration_date: EXP,
            voting_kind: PROPOSAL_VOTING_KIND,
            wallet_code: code::wallet(),
            keeper_code: code::keeper(),
            proposal: proposal(min),
            initiator: ALICE,
        })
    }

    fn active(min: Coins) -> Voting {
        let mut v = Voting::new(DAO, 0);
        v.receive(&Context::mock(DAO, ME), init_msg(min)).unwrap();
        v
    }

    fn keeper_of(voter: &Address) -> Address {
        let wallet = wallet_address(voter, &DAO, &code::wallet(), &code::keeper());
        keeper_address(&wallet, &ME, &code::keeper())
    }

    fn submit(voter: Address, exp: Timestamp, weight: Coins, vote_for: bool, confirm: bool) -> Body {
        Body::SubmitVotes(SubmitVotes(VoteWeight {
            query_id: 0,
            voter,
            expiration_date: exp,
            weight,
            vote_for,
            confirm,
        }))
    }

    #[test]
    fn test_init_notifies_dao() {
        let mut v = Voting::new(DAO, 3);
        let resp = v.receive(&Context::mock(DAO, ME), init_msg(5)).unwrap();
        assert!(v.init);
        assert_eq!(v.initiator, Some(ALICE));
        let out = &resp.messages()[0];
        assert_eq!(out.dest, DAO);
        match Body::parse(&out.body).unwrap() {
            Body::VotingInitiated(m) => {
                assert_eq!(m.voting_id, 3);
                assert_eq!(m.expiration_date, EXP);
                assert_eq!(m.initiator, ALICE);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_init_only_from_dao_and_once() {
        let mut v = Voting::new(DAO, 0);
        let err = v.receive(&Context::mock(ALICE, ME), init_msg(0)).unwrap_err();
        assert_eq!(err.exit_code(), 0xf2);
        v.receive(&Context::mock(DAO, ME), init_msg(0)).unwrap();
        let err = v.receive(&Context::mock(DAO, ME), init_msg(0)).unwrap_err();
        assert_eq!(err.exit_code(), 0xf3);
    }

    #[test]
    fn test_submit_before_init_rejected() {
        let mut v = Voting::new(DAO, 0);
        let err = v
            .receive(&Context::mock(keeper_of(&BOB), ME), submit(BOB, 0, 1, true, false))
            .unwrap_err();
        assert_eq!(err, DaoError::NotInitialized);
    }

    #[test]
    fn test_submit_accumulates_and_returns_excesses() {
        let mut v = active(0);
        let ctx = Context::mock(keeper_of(&BOB), ME).at(EXP);
        let resp = v.receive(&ctx, submit(BOB, EXP, 40, true, false)).unwrap();
        assert_eq!(v.voted_for, 40);
        assert_eq!(resp.messages()[0].dest, BOB);
        assert!(matches!(
            Body::parse(&resp.messages()[0].body).unwrap(),
            Body::Excesses(_)
        ));

        let ctx = Context::mock(keeper_of(&ALICE), ME).at(EXP - 1);
        v.receive(&ctx, submit(ALICE, EXP, 60, false, false)).unwrap();
        assert_eq!((v.voted_for, v.voted_against), (40, 60));
    }

    #[test]
    fn test_submit_with_confirmation_routes_through_dao() {
        let mut v = active(0);
        let ctx = Context::mock(keeper_of(&BOB), ME);
        let resp = v.receive(&ctx, submit(BOB, EXP, 1, false, true)).unwrap();
        let out = &resp.messages()[0];
        assert_eq!(out.dest, DAO);
        match Body::parse(&out.body).unwrap() {
            Body::ConfirmVoting(m) => {
                assert_eq!(m.voter, BOB);
                assert_eq!(m.voting_id, 0);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_submit_only_from_derived_keeper() {
        let mut v = active(0);
        // Alice's keeper may not submit on Bob's behalf.
        for sender in [BOB, keeper_of(&ALICE), addr(99)] {
            let err = v
                .receive(&Context::mock(sender, ME), submit(BOB, EXP, 10, true, false))
                .unwrap_err();
            assert_eq!(err.exit_code(), 0xf5);
        }
        assert_eq!(v.voted_for, 0);
    }

    #[test]
    fn test_submit_with_wrong_expiration() {
        let mut v = active(0);
        let ctx = Context::mock(keeper_of(&BOB), ME);
        let err = v.receive(&ctx, submit(BOB, EXP - 1, 10, true, false)).unwrap_err();
        assert_eq!(err.exit_code(), 0xf32);
    }

    #[test]
    fn test_submit_after_expiration() {
        let mut v = active(0);
        let ctx = Context::mock(keeper_of(&BOB), ME).at(EXP + 1);
        let err = v.receive(&ctx, submit(BOB, EXP, 10, true, false)).unwrap_err();
        assert_eq!(err.exit_code(), 0xf9);
        assert_eq!(v.voted_for, 0);
    }

    #[test]
    fn test_end_voting_checks_in_order() {
        let mut v = active(100);
        let end = || Body::EndVoting(EndVoting { query_id: 0 });

        let err = v
            .receive(&Context::mock(BOB, ME).at(EXP).with_value(1_000), end())
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xf6);

        let err = v
            .receive(&Context::mock(BOB, ME).at(EXP + 1).with_value(99), end())
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xf7);

        let resp = v
            .receive(&Context::mock(BOB, ME).at(EXP + 1).with_value(100), end())
            .unwrap();
        assert!(v.executed);
        match Body::parse(&resp.messages()[0].body).unwrap() {
            Body::ExecuteVoteResult(m) => {
                assert_eq!(m.payload, Cell::from_hash([1; 32]));
                assert_eq!(m.expiration_date, EXP);
            }
            other => panic!("unexpected body {:?}", other),
        }

        let err = v
            .receive(&Context::mock(BOB, ME).at(EXP + 1).with_value(100), end())
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xf8);
    }

    #[test]
    fn test_repeated_end_voting_reports_executed_before_value() {
        let mut v = active(100);
        let end = || Body::EndVoting(EndVoting { query_id: 0 });
        v.receive(&Context::mock(BOB, ME).at(EXP + 1).with_value(100), end())
            .unwrap();

        let err = v
            .receive(&Context::mock(BOB, ME).at(EXP + 1).with_value(0), end())
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xf8);
    }

    #[test]
    fn test_data_snapshot() {
        let v = active(7);
        let data = v.data();
        assert_eq!(data.minimal_execution_amount, 7);
        assert!(data.init && !data.executed);
        assert_eq!(data.dao, DAO);
    }
}
