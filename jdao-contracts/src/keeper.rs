//! Vote keeper: one per (voter wallet, voting) pair.
//!
//! Records the total weight the wallet has committed to the voting and
//! forwards only the increase, so repeated or smaller requests are refused
//! and the voting tally never counts the same jettons twice.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use tracing::debug;

use jdao_types::error::DaoError;
use jdao_types::message::{Body, RequestVote, SubmitVotes, VoteWeight};
use jdao_types::primitives::{Address, Coins};

use crate::contract::{Context, Contract};
use crate::{ensure, ensure_eq};
use crate::math::safe_sub;
use crate::response::{ContractResult, OutMessage, Response, SendValue};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize)]
pub struct VoteKeeper {
    pub voter_wallet: Address,
    pub voting: Address,
    pub total_votes: Coins,
}

impl VoteKeeper {
    pub fn new(voter_wallet: Address, voting: Address) -> Self {
        VoteKeeper {
            voter_wallet,
            voting,
            total_votes: 0,
        }
    }

    fn request_vote(&mut self, ctx: &Context, req: VoteWeight) -> ContractResult {
        ensure_eq!(ctx.sender(), self.voter_wallet, DaoError::KeeperNotFromWallet);
        ensure!(
            req.weight > self.total_votes,
            DaoError::NothingNewToVote {
                claimed: req.weight,
                voted: self.total_votes,
            }
        );

        let delta = safe_sub(req.weight, self.total_votes)?;
        self.total_votes = req.weight;
        debug!(
            voting = %self.voting.short(),
            delta,
            total = self.total_votes,
            "keeper forwarding vote delta"
        );

        let submit = SubmitVotes(VoteWeight { weight: delta, ..req });
        Ok(Response::with_action("request_vote")
            .add_u128("delta", delta)
            .send(OutMessage::new(
                self.voting,
                SendValue::CarryInbound,
                &submit,
            )?))
    }
}

impl Contract for VoteKeeper {
    const KIND: &'static str = "vote-keeper";

    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult {
        match body {
            Body::Empty => Ok(Response::new()),
            Body::RequestVote(RequestVote(req)) => self.request_vote(ctx, req),
            other => Err(DaoError::UnknownOp {
                op: other.op().unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, BOB};

    fn request(weight: Coins) -> Body {
        Body::RequestVote(RequestVote(VoteWeight {
            query_id: 0,
            voter: BOB,
            expiration_date: 1_000,
            weight,
            vote_for: true,
            confirm: false,
        }))
    }

    fn forwarded_delta(resp: &Response) -> Coins {
        let msg = &resp.messages()[0];
        match Body::parse(&msg.body).unwrap() {
            Body::SubmitVotes(SubmitVotes(w)) => w.weight,
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_forwards_delta_only() {
        let wallet = addr(10);
        let voting = addr(20);
        let mut keeper = VoteKeeper::new(wallet, voting);
        let ctx = Context::mock(wallet, addr(30));

        let resp = keeper.receive(&ctx, request(100)).unwrap();
        assert_eq!(forwarded_delta(&resp), 100);
        assert_eq!(resp.messages()[0].dest, voting);
        assert_eq!(keeper.total_votes, 100);

        let resp = keeper.receive(&ctx, request(150)).unwrap();
        assert_eq!(forwarded_delta(&resp), 50);
        assert_eq!(keeper.total_votes, 150);
    }

    #[test]
    fn test_rejects_non_increasing_weight() {
        let wallet = addr(10);
        let mut keeper = VoteKeeper::new(wallet, addr(20));
        let ctx = Context::mock(wallet, addr(30));
        keeper.receive(&ctx, request(100)).unwrap();

        let err = keeper.receive(&ctx, request(100)).unwrap_err();
        assert_eq!(err.exit_code(), 0x1f5);
        let err = keeper.receive(&ctx, request(99)).unwrap_err();
        assert_eq!(err.exit_code(), 0x1f5);
        assert_eq!(keeper.total_votes, 100);
    }

    #[test]
    fn test_zero_weight_is_nothing_new() {
        let wallet = addr(10);
        let mut keeper = VoteKeeper::new(wallet, addr(20));
        let err = keeper
            .receive(&Context::mock(wallet, addr(30)), request(0))
            .unwrap_err();
        assert!(matches!(err, DaoError::NothingNewToVote { .. }));
    }

    #[test]
    fn test_rejects_foreign_sender() {
        let mut keeper = VoteKeeper::new(addr(10), addr(20));
        let err = keeper
            .receive(&Context::mock(addr(11), addr(30)), request(5))
            .unwrap_err();
        assert_eq!(err, DaoError::KeeperNotFromWallet);
        assert_eq!(keeper.total_votes, 0);
    }

    #[test]
    fn test_unknown_op() {
        let mut keeper = VoteKeeper::new(addr(10), addr(20));
        let err = keeper
            .receive(&Context::mock(addr(10), addr(30)), Body::Unknown { op: 42 })
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xffff);
    }
}
