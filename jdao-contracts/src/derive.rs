//! Counterpart address derivation.
//!
//! Contracts never keep allow-lists. A message is accepted only when its
//! sender equals the address the receiver computes from the same initial
//! state the counterpart was deployed with.

use jdao_crypto::address::contract_address;
use jdao_types::account::StateInit;
use jdao_types::cell::Cell;
use jdao_types::primitives::{Address, VotingId, BASECHAIN};

use crate::keeper::VoteKeeper;
use crate::minter::Minter;
use crate::voting::Voting;
use crate::wallet::Wallet;

fn state_init<T: borsh::BorshSerialize>(code: &Cell, initial: &T) -> StateInit {
    // Serializing plain structs into a Vec is infallible.
    let data = borsh::to_vec(initial).unwrap_or_default();
    StateInit::new(code.clone(), data)
}

/// Initial state of a fresh minter administered by `admin`.
pub fn minter_state_init(
    admin: &Address,
    content: Cell,
    minter_code: &Cell,
    wallet_code: &Cell,
    voting_code: &Cell,
    keeper_code: &Cell,
) -> StateInit {
    let initial = Minter::new(
        *admin,
        content,
        wallet_code.clone(),
        voting_code.clone(),
        keeper_code.clone(),
    );
    state_init(minter_code, &initial)
}

pub fn wallet_state_init(
    owner: &Address,
    minter: &Address,
    wallet_code: &Cell,
    keeper_code: &Cell,
) -> StateInit {
    let initial = Wallet::new(*owner, *minter, wallet_code.clone(), keeper_code.clone());
    state_init(wallet_code, &initial)
}

/// Wallet of `owner` under `minter`.
pub fn wallet_address(
    owner: &Address,
    minter: &Address,
    wallet_code: &Cell,
    keeper_code: &Cell,
) -> Address {
    contract_address(
        BASECHAIN,
        &wallet_state_init(owner, minter, wallet_code, keeper_code),
    )
}

pub fn voting_state_init(dao: &Address, voting_id: VotingId, voting_code: &Cell) -> StateInit {
    state_init(voting_code, &Voting::new(*dao, voting_id))
}

/// Voting number `voting_id` created by `dao`.
pub fn voting_address(dao: &Address, voting_id: VotingId, voting_code: &Cell) -> Address {
    contract_address(BASECHAIN, &voting_state_init(dao, voting_id, voting_code))
}

pub fn keeper_state_init(wallet: &Address, voting: &Address, keeper_code: &Cell) -> StateInit {
    state_init(keeper_code, &VoteKeeper::new(*wallet, *voting))
}

/// Keeper recording what `wallet` has committed to `voting`.
pub fn keeper_address(wallet: &Address, voting: &Address, keeper_code: &Cell) -> Address {
    contract_address(BASECHAIN, &keeper_state_init(wallet, voting, keeper_code))
}
