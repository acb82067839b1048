//! A deployed DAO on a sandbox chain, for integration tests and scenario
//! runners.
//!
//! ```ignore
//! let mut dao = Dao::deploy()?;
//! let alice = dao.holder("alice", 500 * ONE_COIN)?;
//! let (_, voting) = dao.create_voting(alice, exp, ONE_COIN / 10, payload)?;
//! dao.vote(alice, voting, exp, true, false)?;
//! ```

use jdao_contracts::code;
use jdao_contracts::derive::{keeper_address, minter_state_init, voting_address, wallet_address};
use jdao_contracts::keeper::VoteKeeper;
use jdao_contracts::minter::Minter;
use jdao_contracts::voting::Voting;
use jdao_contracts::wallet::Wallet;
use jdao_types::cell::Cell;
use jdao_types::constants::{
    END_VOTING_VALUE, FORWARD_VALUE, JETTON_MSG_VALUE, VOTE_VALUE, VOTING_DEPLOY_VALUE,
};
use jdao_types::message::{
    ChangeAdmin, CreateVoting, EndVoting, Mint, Transfer, UpgradeCodes, Vote,
};
use jdao_types::primitives::{Address, Coins, Timestamp, VotingId, ONE_COIN};

use crate::chain::{Blockchain, SendResult};
use crate::error::RuntimeError;

/// A minter deployed with the default codes.
#[derive(Debug)]
pub struct Dao {
    pub chain: Blockchain,
    pub admin: Address,
    pub minter: Address,
}

impl Dao {
    /// Deploy on a fresh chain with treasury "admin" as admin.
    pub fn deploy() -> Result<Self, RuntimeError> {
        Self::deploy_on(Blockchain::new())
    }

    pub fn deploy_on(mut chain: Blockchain) -> Result<Self, RuntimeError> {
        let admin = chain.treasury("admin");
        let init = minter_state_init(
            &admin,
            Cell::empty(),
            &code::minter(),
            &code::wallet(),
            &code::voting(),
            &code::keeper(),
        );
        let (minter, _) = chain.deploy(admin, init, ONE_COIN)?;
        Ok(Self {
            chain,
            admin,
            minter,
        })
    }

    /// Treasury `name`, holding `amount` jettons minted by the admin.
    pub fn holder(&mut self, name: &str, amount: Coins) -> Result<Address, RuntimeError> {
        let owner = self.chain.treasury(name);
        if amount > 0 {
            self.mint(owner, amount)?;
        }
        Ok(owner)
    }

    // ─── Getters ─────────────────────────────────────────────────────────

    pub fn minter_state(&self) -> Result<Minter, RuntimeError> {
        self.chain.state(&self.minter)
    }

    pub fn wallet_of(&self, owner: &Address) -> Result<Address, RuntimeError> {
        let m = self.minter_state()?;
        Ok(wallet_address(owner, &self.minter, &m.wallet_code, &m.keeper_code))
    }

    pub fn wallet(&self, owner: &Address) -> Result<Wallet, RuntimeError> {
        self.chain.state(&self.wallet_of(owner)?)
    }

    /// Spendable plus unexpired locked jettons of `owner` at chain time.
    pub fn total_balance(&self, owner: &Address) -> Result<Coins, RuntimeError> {
        match self.wallet(owner) {
            Ok(w) => Ok(w.total_balance(self.chain.now())),
            Err(RuntimeError::AccountNotFound { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    pub fn voting_address(&self, voting_id: VotingId) -> Result<Address, RuntimeError> {
        let m = self.minter_state()?;
        Ok(voting_address(&self.minter, voting_id, &m.voting_code))
    }

    pub fn voting(&self, address: &Address) -> Result<Voting, RuntimeError> {
        self.chain.state(address)
    }

    pub fn keeper_of(&self, owner: &Address, voting: &Address) -> Result<Address, RuntimeError> {
        let m = self.minter_state()?;
        Ok(keeper_address(&self.wallet_of(owner)?, voting, &m.keeper_code))
    }

    pub fn keeper(&self, owner: &Address, voting: &Address) -> Result<VoteKeeper, RuntimeError> {
        self.chain.state(&self.keeper_of(owner, voting)?)
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    pub fn mint(&mut self, to: Address, amount: Coins) -> Result<SendResult, RuntimeError> {
        let body = Mint {
            query_id: 0,
            to_address: to,
            jetton_amount: amount,
            forward_ton_amount: FORWARD_VALUE,
        };
        self.chain
            .send_body(self.admin, self.minter, JETTON_MSG_VALUE, &body)
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Coins,
    ) -> Result<SendResult, RuntimeError> {
        let body = Transfer {
            query_id: 0,
            amount,
            destination: to,
            response_destination: Some(from),
            custom_payload: None,
            forward_ton_amount: FORWARD_VALUE,
            forward_payload: None,
        };
        let wallet = self.wallet_of(&from)?;
        self.chain.send_body(from, wallet, JETTON_MSG_VALUE, &body)
    }

    /// Create a voting; returns the send result and the voting address.
    pub fn create_voting(
        &mut self,
        from: Address,
        expiration_date: Timestamp,
        minimal_execution_amount: Coins,
        payload: Cell,
    ) -> Result<(SendResult, Address), RuntimeError> {
        let voting = self.voting_address(self.minter_state()?.voting_id)?;
        let body = CreateVoting {
            query_id: 0,
            expiration_date,
            minimal_execution_amount,
            payload,
        };
        let result = self
            .chain
            .send_body(from, self.minter, VOTING_DEPLOY_VALUE, &body)?;
        Ok((result, voting))
    }

    pub fn vote(
        &mut self,
        owner: Address,
        voting: Address,
        expiration_date: Timestamp,
        vote_for: bool,
        need_confirmation: bool,
    ) -> Result<SendResult, RuntimeError> {
        let body = Vote {
            query_id: 0,
            voting_address: voting,
            expiration_date,
            vote_for,
            need_confirmation,
        };
        let wallet = self.wallet_of(&owner)?;
        self.chain.send_body(owner, wallet, VOTE_VALUE, &body)
    }

    pub fn end_voting(&mut self, from: Address, voting: Address) -> Result<SendResult, RuntimeError> {
        self.end_voting_with(from, voting, END_VOTING_VALUE)
    }

    pub fn end_voting_with(
        &mut self,
        from: Address,
        voting: Address,
        value: Coins,
    ) -> Result<SendResult, RuntimeError> {
        self.chain
            .send_body(from, voting, value, &EndVoting { query_id: 0 })
    }

    pub fn change_admin(
        &mut self,
        from: Address,
        new_admin: Address,
    ) -> Result<SendResult, RuntimeError> {
        let body = ChangeAdmin {
            query_id: 0,
            new_admin,
        };
        self.chain
            .send_body(from, self.minter, JETTON_MSG_VALUE, &body)
    }

    pub fn upgrade_codes(
        &mut self,
        from: Address,
        new_code: Cell,
        new_voting_code: Option<Cell>,
    ) -> Result<SendResult, RuntimeError> {
        let body = UpgradeCodes {
            query_id: 0,
            new_code,
            new_voting_code,
        };
        self.chain
            .send_body(from, self.minter, JETTON_MSG_VALUE, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_and_mint() {
        let mut dao = Dao::deploy().unwrap();
        assert!(dao.chain.is_active(&dao.minter));
        let alice = dao.holder("alice", 700).unwrap();
        assert_eq!(dao.minter_state().unwrap().total_supply, 700);
        assert_eq!(dao.wallet(&alice).unwrap().balance, 700);
        let nobody = dao.chain.treasury("nobody");
        assert_eq!(dao.total_balance(&nobody).unwrap(), 0);
    }
}
