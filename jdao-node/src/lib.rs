//! Node tooling for the jetton DAO: an asynchronous account network, a
//! configured scenario runner and the `jdao` CLI.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod network;
pub mod scenario;
pub mod ui;
