pub mod account;
pub mod cell;
pub mod constants;
pub mod error;
pub mod message;
pub mod primitives;
