use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use jdao_runtime::chain::{DEFAULT_MAX_TRANSACTIONS, DEFAULT_NOW};
use jdao_types::constants::END_VOTING_VALUE;
use jdao_types::primitives::ONE_COIN;

use crate::error::NodeError;

/// File name written by `jdao init`.
pub const CONFIG_FILE: &str = "jdao.toml";

/// Name that resolves to the minter itself in proposal actions.
pub const DAO_NAME: &str = "dao";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub dao: DaoConfig,
    #[serde(default)]
    pub holders: Vec<HolderConfig>,
    #[serde(default)]
    pub proposals: Vec<ProposalConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Capacity of every account mailbox.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Transactions allowed before a settle gives up.
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

fn default_mailbox_capacity() -> usize {
    256
}

fn default_max_transactions() -> usize {
    DEFAULT_MAX_TRANSACTIONS
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: default_mailbox_capacity(),
            max_transactions: default_max_transactions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoConfig {
    /// Treasury that deploys the minter and mints holder balances.
    #[serde(default = "default_admin")]
    pub admin: String,
    /// Chain time at start (unix seconds).
    #[serde(default = "default_start_time")]
    pub start_time: u64,
    /// Value attached to every `end_voting`, in nano units.
    #[serde(default = "default_execution_value")]
    pub execution_value: u64,
    /// Hand minter adminship to the minter itself once holders are minted,
    /// so admin operations can only happen by vote.
    #[serde(default = "default_self_governed")]
    pub self_governed: bool,
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_start_time() -> u64 {
    DEFAULT_NOW
}

fn default_execution_value() -> u64 {
    END_VOTING_VALUE as u64
}

fn default_self_governed() -> bool {
    true
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            start_time: default_start_time(),
            execution_value: default_execution_value(),
            self_governed: default_self_governed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderConfig {
    pub name: String,
    /// Jettons minted to the holder, in nano units.
    pub balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalConfig {
    /// Seconds from proposal creation until the voting expires.
    pub expiration_offset: u64,
    /// Minimum value `end_voting` must carry, in nano units.
    #[serde(default)]
    pub minimal_execution_amount: u64,
    /// Holder that creates the voting; the first holder when unset.
    #[serde(default)]
    pub initiator: Option<String>,
    pub action: ProposalAction,
    #[serde(default)]
    pub votes: Vec<VoteConfig>,
    /// Transfers attempted after voting, while the votes are still locked.
    #[serde(default)]
    pub transfers: Vec<TransferConfig>,
}

/// What the minter relays when a proposal passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalAction {
    /// Mint jettons to a holder. Needs a self-governed minter.
    Mint { to: String, amount: u64 },
    /// Change the minter admin to a holder, or to "dao".
    ChangeAdmin { new_admin: String },
    /// Send plain value to a holder.
    Payout { to: String, value: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteConfig {
    pub holder: String,
    pub vote_for: bool,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl NodeConfig {
    /// Three holders and two proposals: one that passes, one that fails.
    pub fn sample() -> Self {
        let coins = ONE_COIN as u64;
        let holders = [("alice", 500), ("bob", 300), ("carol", 200)]
            .into_iter()
            .map(|(name, amount)| HolderConfig {
                name: name.to_string(),
                balance: amount * coins,
            })
            .collect();
        let vote = |holder: &str, vote_for: bool| VoteConfig {
            holder: holder.to_string(),
            vote_for,
            confirm: false,
        };
        Self {
            holders,
            proposals: vec![
                ProposalConfig {
                    expiration_offset: 3_600,
                    minimal_execution_amount: coins / 10,
                    initiator: Some("carol".to_string()),
                    action: ProposalAction::Mint {
                        to: "carol".to_string(),
                        amount: 100 * coins,
                    },
                    votes: vec![vote("alice", true), vote("bob", false)],
                    transfers: vec![TransferConfig {
                        from: "alice".to_string(),
                        to: "bob".to_string(),
                        amount: 10 * coins,
                    }],
                },
                ProposalConfig {
                    expiration_offset: 7_200,
                    minimal_execution_amount: 0,
                    initiator: Some("bob".to_string()),
                    action: ProposalAction::ChangeAdmin {
                        new_admin: "bob".to_string(),
                    },
                    votes: vec![vote("bob", true), vote("alice", false)],
                    transfers: Vec::new(),
                },
            ],
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        let config: NodeConfig = toml::from_str(&contents).map_err(|e| NodeError::ConfigError {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the sample configuration into the given directory.
    pub fn init(dir: &str) -> Result<(), NodeError> {
        let dir_path = Path::new(dir);
        if !dir_path.exists() {
            std::fs::create_dir_all(dir_path)?;
        }

        let toml_str =
            toml::to_string_pretty(&NodeConfig::sample()).map_err(|e| NodeError::ConfigError {
                reason: format!("failed to serialize default config: {}", e),
            })?;

        std::fs::write(dir_path.join(CONFIG_FILE), toml_str)?;
        Ok(())
    }

    /// Every name a proposal refers to must be a configured holder, except
    /// `dao` as a new admin.
    pub fn validate(&self) -> Result<(), NodeError> {
        let mut names = HashSet::new();
        for holder in &self.holders {
            if holder.name == DAO_NAME || holder.name == self.dao.admin {
                return Err(config_error(format!(
                    "holder name '{}' is reserved",
                    holder.name
                )));
            }
            if !names.insert(holder.name.as_str()) {
                return Err(config_error(format!(
                    "duplicate holder '{}'",
                    holder.name
                )));
            }
        }
        if self.network.mailbox_capacity == 0 {
            return Err(config_error("mailbox_capacity must be positive".to_string()));
        }

        let known = |name: &str, what: &str, index: usize| -> Result<(), NodeError> {
            if names.contains(name) {
                Ok(())
            } else {
                Err(config_error(format!(
                    "proposal {}: unknown {} '{}'",
                    index, what, name
                )))
            }
        };

        for (i, p) in self.proposals.iter().enumerate() {
            if p.expiration_offset == 0 {
                return Err(config_error(format!(
                    "proposal {}: expiration_offset must be positive",
                    i
                )));
            }
            match &p.initiator {
                Some(name) => known(name, "initiator", i)?,
                None if self.holders.is_empty() => {
                    return Err(config_error(format!("proposal {}: no initiator", i)))
                }
                None => {}
            }
            match &p.action {
                ProposalAction::Mint { to, .. } => known(to, "recipient", i)?,
                ProposalAction::Payout { to, .. } => known(to, "recipient", i)?,
                ProposalAction::ChangeAdmin { new_admin } if new_admin != DAO_NAME => {
                    known(new_admin, "admin", i)?
                }
                ProposalAction::ChangeAdmin { .. } => {}
            }
            for v in &p.votes {
                known(&v.holder, "voter", i)?;
            }
            for t in &p.transfers {
                known(&t.from, "sender", i)?;
                known(&t.to, "recipient", i)?;
            }
        }
        Ok(())
    }

    /// Holder that creates proposal `p`.
    pub fn initiator_of<'a>(&'a self, p: &'a ProposalConfig) -> Option<&'a str> {
        p.initiator
            .as_deref()
            .or_else(|| self.holders.first().map(|h| h.name.as_str()))
    }
}

fn config_error(reason: String) -> NodeError {
    NodeError::ConfigError { reason }
}
