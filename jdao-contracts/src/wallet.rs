//! Jetton wallet with vote locking.
//!
//! Balance is split into a spendable part and a locked part with an
//! expiration date. The lock is never released by a timer: every read and
//! every handler first folds an expired lock back into the spendable
//! balance, so `locked == 0` exactly when `lock_expiration == 0`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use tracing::debug;

use jdao_types::cell::Cell;
use jdao_types::constants::MIN_STORAGE_RESERVE;
use jdao_types::error::DaoError;
use jdao_types::message::{
    Body, Burn, BurnNotification, ConfirmVote, Excesses, InternalTransfer, RequestVote,
    Transfer, TransferNotification, Vote, VoteConfirmation, VoteWeight, WithdrawJettons,
    WithdrawTons,
};
use jdao_types::primitives::{Address, Coins, Timestamp};

use crate::contract::{Context, Contract};
use crate::derive::{keeper_address, keeper_state_init, wallet_address, wallet_state_init};
use crate::{ensure, ensure_eq};
use crate::math::{safe_add, safe_sub};
use crate::response::{ContractResult, OutMessage, Response, SendValue};

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Wallet {
    pub owner: Address,
    pub minter: Address,
    pub wallet_code: Cell,
    pub keeper_code: Cell,
    /// Spendable balance.
    pub balance: Coins,
    pub locked: Coins,
    pub lock_expiration: Timestamp,
}

/// Balance split as seen at a given moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletDaoData {
    pub balance: Coins,
    pub locked: Coins,
    pub lock_expiration: Timestamp,
}

/// Standard jetton wallet getter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletData {
    pub balance: Coins,
    pub owner: Address,
    pub minter: Address,
    pub wallet_code: Cell,
}

impl WalletDaoData {
    pub fn total(&self) -> Coins {
        self.balance.saturating_add(self.locked)
    }
}

impl Wallet {
    /// Empty wallet; this is what the address is derived from.
    pub fn new(owner: Address, minter: Address, wallet_code: Cell, keeper_code: Cell) -> Self {
        Wallet {
            owner,
            minter,
            wallet_code,
            keeper_code,
            balance: 0,
            locked: 0,
            lock_expiration: 0,
        }
    }

    /// Stored spendable balance; locked jettons are not included.
    pub fn wallet_data(&self) -> WalletData {
        WalletData {
            balance: self.balance,
            owner: self.owner,
            minter: self.minter,
            wallet_code: self.wallet_code.clone(),
        }
    }

    /// Balances at `now`, with an expired lock read as spendable.
    pub fn dao_data(&self, now: Timestamp) -> WalletDaoData {
        if self.lock_expiration != 0 && now > self.lock_expiration {
            WalletDaoData {
                balance: self.balance.saturating_add(self.locked),
                locked: 0,
                lock_expiration: 0,
            }
        } else {
            WalletDaoData {
                balance: self.balance,
                locked: self.locked,
                lock_expiration: self.lock_expiration,
            }
        }
    }

    /// Spendable plus still-locked balance at `now`.
    pub fn total_balance(&self, now: Timestamp) -> Coins {
        self.dao_data(now).total()
    }

    /// Jettons that stay locked at least until `expiration_date`, i.e. the
    /// weight this wallet has committed to votings ending by then.
    pub fn voted_weight(&self, expiration_date: Timestamp, now: Timestamp) -> Coins {
        let data = self.dao_data(now);
        if data.lock_expiration >= expiration_date {
            data.locked
        } else {
            0
        }
    }

    pub fn vote_keeper_address(&self, myself: &Address, voting: &Address) -> Address {
        keeper_address(myself, voting, &self.keeper_code)
    }

    fn wallet_of(&self, owner: &Address) -> Address {
        wallet_address(owner, &self.minter, &self.wallet_code, &self.keeper_code)
    }

    fn release_expired_lock(&mut self, now: Timestamp) {
        let data = self.dao_data(now);
        self.balance = data.balance;
        self.locked = data.locked;
        self.lock_expiration = data.lock_expiration;
    }

    fn take_spendable(&mut self, amount: Coins) -> Result<(), DaoError> {
        ensure!(
            amount <= self.balance,
            DaoError::NotEnoughJettons {
                available: self.balance,
                required: amount,
            }
        );
        self.balance = safe_sub(self.balance, amount)?;
        Ok(())
    }

    fn transfer(&mut self, ctx: &Context, msg: Transfer) -> ContractResult {
        ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
        self.take_spendable(msg.amount)?;

        let to_owner = msg.destination;
        let init = wallet_state_init(&to_owner, &self.minter, &self.wallet_code, &self.keeper_code);
        let internal = InternalTransfer {
            query_id: msg.query_id,
            amount: msg.amount,
            from: self.owner,
            response_address: msg.response_destination,
            forward_ton_amount: msg.forward_ton_amount,
            forward_payload: msg.forward_payload,
        };
        Ok(Response::with_action("transfer")
            .add_u128("amount", msg.amount)
            .add_address("to", &to_owner)
            .send(
                OutMessage::new(self.wallet_of(&to_owner), SendValue::CarryInbound, &internal)?
                    .with_state_init(init),
            ))
    }

    fn internal_transfer(&mut self, ctx: &Context, msg: InternalTransfer) -> ContractResult {
        ensure!(
            ctx.sender() == self.minter || ctx.sender() == self.wallet_of(&msg.from),
            DaoError::UnauthorizedIncoming
        );
        self.balance = safe_add(self.balance, msg.amount)?;

        let mut resp = Response::with_action("internal_transfer").add_u128("amount", msg.amount);
        if msg.forward_ton_amount > 0 {
            let note = TransferNotification {
                query_id: msg.query_id,
                amount: msg.amount,
                sender: msg.from,
                forward_payload: msg.forward_payload,
            };
            resp = resp.send(OutMessage::new(
                self.owner,
                SendValue::Coins(msg.forward_ton_amount),
                &note,
            )?);
        }
        if let Some(response_address) = msg.response_address {
            let rest = ctx.value().saturating_sub(msg.forward_ton_amount);
            if rest > 0 {
                let excesses = Excesses {
                    query_id: msg.query_id,
                };
                resp = resp.send(OutMessage::new(
                    response_address,
                    SendValue::Coins(rest),
                    &excesses,
                )?);
            }
        }
        Ok(resp)
    }

    fn burn(&mut self, ctx: &Context, msg: Burn) -> ContractResult {
        ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
        self.take_spendable(msg.amount)?;

        let note = BurnNotification {
            query_id: msg.query_id,
            amount: msg.amount,
            sender: self.owner,
            response_destination: msg.response_destination,
        };
        Ok(Response::with_action("burn")
            .add_u128("amount", msg.amount)
            .send(OutMessage::new(self.minter, SendValue::CarryInbound, &note)?))
    }

    fn vote(&mut self, ctx: &Context, msg: Vote) -> ContractResult {
        ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
        ensure!(
            ctx.now() <= msg.expiration_date,
            DaoError::VotingFinished {
                expiration_date: msg.expiration_date,
                now: ctx.now(),
            }
        );

        let weight = safe_add(self.balance, self.locked)?;
        if weight > 0 {
            self.locked = weight;
            self.balance = 0;
            self.lock_expiration = self.lock_expiration.max(msg.expiration_date);
        }
        debug!(
            owner = %self.owner.short(),
            voting = %msg.voting_address.short(),
            weight,
            lock_expiration = self.lock_expiration,
            "wallet vote"
        );

        let keeper = self.vote_keeper_address(&ctx.myself(), &msg.voting_address);
        let init = keeper_state_init(&ctx.myself(), &msg.voting_address, &self.keeper_code);
        let request = RequestVote(VoteWeight {
            query_id: msg.query_id,
            voter: self.owner,
            expiration_date: msg.expiration_date,
            weight,
            vote_for: msg.vote_for,
            confirm: msg.need_confirmation,
        });
        Ok(Response::with_action("vote")
            .add_u128("weight", weight)
            .send(OutMessage::new(keeper, SendValue::CarryInbound, &request)?.with_state_init(init)))
    }

    fn withdraw_tons(&mut self, ctx: &Context, msg: WithdrawTons) -> ContractResult {
        ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
        let surplus = ctx.balance().saturating_sub(MIN_STORAGE_RESERVE);
        let mut resp = Response::with_action("withdraw_tons").add_u128("amount", surplus);
        if surplus > 0 {
            let excesses = Excesses {
                query_id: msg.query_id,
            };
            resp = resp.send(OutMessage::new(
                self.owner,
                SendValue::Coins(surplus),
                &excesses,
            )?);
        }
        Ok(resp)
    }

    /// Asks `msg.wallet`, a jetton wallet owned by this contract, to move
    /// `msg.amount` to our owner.
    fn withdraw_jettons(&mut self, ctx: &Context, msg: WithdrawJettons) -> ContractResult {
        ensure_eq!(ctx.sender(), self.owner, DaoError::NotOwner);
        let transfer = Transfer {
            query_id: msg.query_id,
            amount: msg.amount,
            destination: self.owner,
            response_destination: Some(self.owner),
            custom_payload: msg.custom_payload,
            forward_ton_amount: 0,
            forward_payload: None,
        };
        Ok(Response::with_action("withdraw_jettons")
            .add_u128("amount", msg.amount)
            .add_address("wallet", &msg.wallet)
            .send(OutMessage::new(msg.wallet, SendValue::CarryInbound, &transfer)?))
    }

    fn confirm_vote(&mut self, ctx: &Context, msg: ConfirmVote) -> ContractResult {
        ensure_eq!(ctx.sender(), self.minter, DaoError::UnauthorizedRouting);
        let confirmation = VoteConfirmation {
            query_id: msg.query_id,
        };
        Ok(Response::with_action("confirm_vote").send(OutMessage::new(
            self.owner,
            SendValue::CarryInbound,
            &confirmation,
        )?))
    }
}

impl Contract for Wallet {
    const KIND: &'static str = "jetton-wallet";

    fn receive(&mut self, ctx: &Context, body: Body) -> ContractResult {
        self.release_expired_lock(ctx.now());
        match body {
            Body::Empty => Ok(Response::new()),
            Body::Transfer(msg) => self.transfer(ctx, msg),
            Body::InternalTransfer(msg) => self.internal_transfer(ctx, msg),
            Body::Burn(msg) => self.burn(ctx, msg),
            Body::Vote(msg) => self.vote(ctx, msg),
            Body::ConfirmVote(msg) => self.confirm_vote(ctx, msg),
            Body::WithdrawTons(msg) => self.withdraw_tons(ctx, msg),
            Body::WithdrawJettons(msg) => self.withdraw_jettons(ctx, msg),
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
    use jdao_types::primitives::ONE_COIN;

    const MINTER: Address = Address::basechain([0x33; 32]);

    fn wallet_with(balance: Coins) -> (Wallet, Address) {
        let mut w = Wallet::new(ALICE, MINTER, code::wallet(), code::keeper());
        w.balance = balance;
        let me = wallet_address(&ALICE, &MINTER, &code::wallet(), &code::keeper());
        (w, me)
    }

    fn vote(voting: Address, exp: Timestamp) -> Body {
        Body::Vote(Vote {
            query_id: 0,
            voting_address: voting,
            expiration_date: exp,
            vote_for: true,
            need_confirmation: false,
        })
    }

    fn transfer(amount: Coins) -> Body {
        Body::Transfer(Transfer {
            query_id: 0,
            amount,
            destination: BOB,
            response_destination: Some(ALICE),
            custom_payload: None,
            forward_ton_amount: 0,
            forward_payload: None,
        })
    }

    fn requested_weight(resp: &Response) -> Coins {
        match Body::parse(&resp.messages()[0].body).unwrap() {
            Body::RequestVote(RequestVote(w)) => w.weight,
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_vote_locks_everything_and_targets_keeper() {
        let (mut w, me) = wallet_with(500);
        let voting = addr(50);
        let resp = w.receive(&Context::mock(ALICE, me).at(10), vote(voting, 100)).unwrap();

        assert_eq!(requested_weight(&resp), 500);
        assert_eq!((w.balance, w.locked, w.lock_expiration), (0, 500, 100));
        let out = &resp.messages()[0];
        assert_eq!(out.dest, keeper_address(&me, &voting, &code::keeper()));
        assert!(out.state_init.is_some());
    }

    #[test]
    fn test_lock_expiration_only_grows() {
        let (mut w, me) = wallet_with(500);
        let ctx = Context::mock(ALICE, me).at(10);
        w.receive(&ctx, vote(addr(50), 200)).unwrap();
        w.receive(&ctx, vote(addr(51), 100)).unwrap();
        assert_eq!(w.lock_expiration, 200);
        w.receive(&ctx, vote(addr(52), 300)).unwrap();
        assert_eq!(w.lock_expiration, 300);
        assert_eq!(w.locked, 500);
    }

    #[test]
    fn test_locked_balance_cannot_be_transferred() {
        let (mut w, me) = wallet_with(500);
        w.receive(&Context::mock(ALICE, me).at(10), vote(addr(50), 100)).unwrap();

        let err = w
            .receive(&Context::mock(ALICE, me).at(100), transfer(1))
            .unwrap_err();
        assert_eq!(err.exit_code(), 706);
        assert_eq!(w.locked, 500);
    }

    #[test]
    fn test_lock_released_after_expiration() {
        let (mut w, me) = wallet_with(500);
        w.receive(&Context::mock(ALICE, me).at(10), vote(addr(50), 100)).unwrap();

        let data = w.dao_data(101);
        assert_eq!(data, WalletDaoData { balance: 500, locked: 0, lock_expiration: 0 });
        assert_eq!(w.dao_data(100).locked, 500);

        let resp = w
            .receive(&Context::mock(ALICE, me).at(101), transfer(200))
            .unwrap();
        assert_eq!(resp.messages().len(), 1);
        assert_eq!((w.balance, w.locked, w.lock_expiration), (300, 0, 0));
    }

    #[test]
    fn test_vote_after_expiration_rejected() {
        let (mut w, me) = wallet_with(500);
        let err = w
            .receive(&Context::mock(ALICE, me).at(101), vote(addr(50), 100))
            .unwrap_err();
        assert_eq!(err.exit_code(), 0xf9);
        assert_eq!(w.locked, 0);
    }

    #[test]
    fn test_only_owner_votes_and_transfers() {
        let (mut w, me) = wallet_with(500);
        let err = w.receive(&Context::mock(BOB, me), vote(addr(50), 100)).unwrap_err();
        assert_eq!(err.exit_code(), 705);
        let err = w.receive(&Context::mock(BOB, me), transfer(1)).unwrap_err();
        assert_eq!(err.exit_code(), 705);
    }

    #[test]
    fn test_second_vote_counts_new_jettons() {
        let (mut w, me) = wallet_with(500);
        let ctx = Context::mock(ALICE, me).at(10);
        w.receive(&ctx, vote(addr(50), 100)).unwrap();
        w.balance = 30;
        let resp = w.receive(&ctx, vote(addr(50), 100)).unwrap();
        assert_eq!(requested_weight(&resp), 530);
        assert_eq!((w.balance, w.locked), (0, 530));
    }

    #[test]
    fn test_internal_transfer_auth() {
        let (mut w, me) = wallet_with(0);
        let msg = |from: Address| {
            Body::InternalTransfer(InternalTransfer {
                query_id: 0,
                amount: 10,
                from,
                response_address: None,
                forward_ton_amount: 0,
                forward_payload: None,
            })
        };
        w.receive(&Context::mock(MINTER, me), msg(MINTER)).unwrap();
        let bob_wallet = wallet_address(&BOB, &MINTER, &code::wallet(), &code::keeper());
        w.receive(&Context::mock(bob_wallet, me), msg(BOB)).unwrap();
        assert_eq!(w.balance, 20);

        let err = w.receive(&Context::mock(BOB, me), msg(BOB)).unwrap_err();
        assert_eq!(err.exit_code(), 707);
        assert_eq!(w.balance, 20);
    }

    #[test]
    fn test_internal_transfer_notifies_and_returns_excesses() {
        let (mut w, me) = wallet_with(0);
        let ctx = Context::mock(MINTER, me).with_value(1_000);
        let resp = w
            .receive(
                &ctx,
                Body::InternalTransfer(InternalTransfer {
                    query_id: 9,
                    amount: 10,
                    from: MINTER,
                    response_address: Some(BOB),
                    forward_ton_amount: 300,
                    forward_payload: None,
                }),
            )
            .unwrap();
        let msgs = resp.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!((msgs[0].dest, msgs[0].value), (ALICE, SendValue::Coins(300)));
        assert_eq!((msgs[1].dest, msgs[1].value), (BOB, SendValue::Coins(700)));
    }

    #[test]
    fn test_burn_notifies_minter() {
        let (mut w, me) = wallet_with(50);
        let resp = w
            .receive(
                &Context::mock(ALICE, me),
                Body::Burn(Burn {
                    query_id: 0,
                    amount: 20,
                    response_destination: None,
                    custom_payload: None,
                }),
            )
            .unwrap();
        assert_eq!(w.balance, 30);
        assert_eq!(resp.messages()[0].dest, MINTER);
    }

    #[test]
    fn test_confirm_vote_only_from_minter() {
        let (mut w, me) = wallet_with(0);
        let body = || Body::ConfirmVote(ConfirmVote { query_id: 0 });
        let err = w.receive(&Context::mock(BOB, me), body()).unwrap_err();
        assert_eq!(err.exit_code(), 78);
        let resp = w.receive(&Context::mock(MINTER, me), body()).unwrap();
        assert_eq!(resp.messages()[0].dest, ALICE);
    }

    #[test]
    fn test_withdraw_tons_keeps_storage_reserve() {
        let (mut w, me) = wallet_with(0);
        let body = || Body::WithdrawTons(WithdrawTons { query_id: 4 });

        let err = w
            .receive(&Context::mock(BOB, me).with_value(ONE_COIN), body())
            .unwrap_err();
        assert_eq!(err.exit_code(), 705);

        let resp = w
            .receive(&Context::mock(ALICE, me).with_value(ONE_COIN), body())
            .unwrap();
        let out = &resp.messages()[0];
        assert_eq!(out.dest, ALICE);
        assert_eq!(out.value, SendValue::Coins(ONE_COIN - MIN_STORAGE_RESERVE));

        let resp = w
            .receive(&Context::mock(ALICE, me).with_value(MIN_STORAGE_RESERVE), body())
            .unwrap();
        assert!(resp.messages().is_empty());
    }

    #[test]
    fn test_withdraw_jettons_asks_foreign_wallet() {
        let (mut w, me) = wallet_with(0);
        let foreign = addr(70);
        let body = || {
            Body::WithdrawJettons(WithdrawJettons {
                query_id: 2,
                wallet: foreign,
                amount: 40,
                custom_payload: None,
            })
        };

        let err = w.receive(&Context::mock(BOB, me), body()).unwrap_err();
        assert_eq!(err.exit_code(), 705);

        let resp = w.receive(&Context::mock(ALICE, me), body()).unwrap();
        let out = &resp.messages()[0];
        assert_eq!((out.dest, out.value), (foreign, SendValue::CarryInbound));
        match Body::parse(&out.body).unwrap() {
            Body::Transfer(t) => {
                assert_eq!(t.amount, 40);
                assert_eq!(t.destination, ALICE);
                assert_eq!(t.response_destination, Some(ALICE));
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(w.balance, 0);
    }

    #[test]
    fn test_voted_weight_follows_lock() {
        let (mut w, me) = wallet_with(500);
        assert_eq!(w.voted_weight(100, 10), 0);

        w.receive(&Context::mock(ALICE, me).at(10), vote(addr(50), 200)).unwrap();
        assert_eq!(w.voted_weight(100, 10), 500);
        assert_eq!(w.voted_weight(200, 10), 500);
        assert_eq!(w.voted_weight(201, 10), 0);
        assert_eq!(w.voted_weight(200, 201), 0);
    }
}
