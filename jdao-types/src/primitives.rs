use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DaoError;

/// 32-byte BLAKE3 hash.
pub type Hash = [u8; 32];

/// Native value attached to messages and held by accounts (nano units).
/// Also used for jetton amounts, which travel as `VarUInteger 16`.
pub type Coins = u128;

/// Unix timestamp in seconds. On the wire it is a 48-bit unsigned integer.
pub type Timestamp = u64;

/// Caller-chosen correlation id echoed through every message of a flow.
pub type QueryId = u64;

/// Sequential identifier of a voting, assigned by the minter.
pub type VotingId = u64;

/// Largest timestamp representable in the 48-bit wire field.
pub const MAX_TIMESTAMP: Timestamp = (1 << 48) - 1;

/// Largest value representable as `Coins` on the wire (15 bytes).
pub const MAX_COINS: Coins = (1 << 120) - 1;

/// One native coin in nano units.
pub const ONE_COIN: Coins = 1_000_000_000;

/// Basechain id used for every derived contract.
pub const BASECHAIN: i8 = 0;

/// An internal account address: workchain id plus the 256-bit hash of the
/// account's initial state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Address {
    pub workchain: i8,
    pub hash: Hash,
}

impl Address {
    pub const fn new(workchain: i8, hash: Hash) -> Self {
        Self { workchain, hash }
    }

    /// Basechain address for the given hash.
    pub const fn basechain(hash: Hash) -> Self {
        Self::new(BASECHAIN, hash)
    }

    /// Raw form `wc:hex`.
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// Shortened form used in log lines.
    pub fn short(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(&self.hash[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl FromStr for Address {
    type Err = DaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hash_hex) = s.split_once(':').ok_or_else(|| DaoError::InvalidAddress {
            reason: format!("missing workchain separator in '{}'", s),
        })?;
        let workchain = wc.parse::<i8>().map_err(|e| DaoError::InvalidAddress {
            reason: format!("bad workchain '{}': {}", wc, e),
        })?;
        let bytes = hex::decode(hash_hex).map_err(|e| DaoError::InvalidAddress {
            reason: format!("bad hash hex: {}", e),
        })?;
        let hash: Hash = bytes.try_into().map_err(|_| DaoError::InvalidAddress {
            reason: "hash must be 32 bytes".to_string(),
        })?;
        Ok(Address { workchain, hash })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Check that a timestamp fits the 48-bit wire field.
pub fn check_timestamp(ts: Timestamp) -> Result<Timestamp, DaoError> {
    if ts > MAX_TIMESTAMP {
        return Err(DaoError::IntegerOutOfRange {
            value: ts as u128,
            bits: 48,
        });
    }
    Ok(ts)
}
