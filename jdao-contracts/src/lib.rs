//! Jetton DAO contracts.
//!
//! Four message-driven state machines share one jetton:
//!
//! - [`minter::Minter`] holds the supply and acts as DAO root.
//! - [`wallet::Wallet`] holds one owner's jettons and locks them while voting.
//! - [`keeper::VoteKeeper`] remembers how much a wallet has put into one voting.
//! - [`voting::Voting`] tallies weight and hands the result back to the minter.
//!
//! None of them keeps a list of trusted peers. Every inbound message is
//! authenticated by recomputing the sender's address from its initial state,
//! see [`derive`].

pub mod code;
pub mod contract;
pub mod derive;
pub mod guard;
pub mod keeper;
pub mod math;
pub mod minter;
pub mod response;
pub mod testing;
pub mod voting;
pub mod wallet;

pub use contract::{Context, Contract};
pub use response::{Attribute, ContractResult, OutMessage, Response, SendValue};
