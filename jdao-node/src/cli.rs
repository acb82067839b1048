use std::sync::Arc;

use clap::{Parser, Subcommand};

use jdao_contracts::code;
use jdao_contracts::derive::{voting_address, wallet_address};
use jdao_runtime::chain::treasury_address;

use crate::config::{NodeConfig, CONFIG_FILE};
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::network::Network;
use crate::scenario::{format_coins, minter_address, simulate, Report};
use crate::ui::{cell_right, data_table, print_field, print_table, yes_no};

#[derive(Parser)]
#[command(
    name = "jdao",
    about = "Jetton DAO governance: simulate votings over an asynchronous message network",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample configuration
    Init {
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: String,
    },
    /// Deploy a DAO and run the configured proposals
    Simulate {
        /// Path to config file
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Print OpenMetrics text after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Compute contract addresses without running anything
    Derive {
        /// Path to config file; the defaults are used when absent
        #[arg(short, long)]
        config: Option<String>,
        #[command(subcommand)]
        target: DeriveTarget,
    },
}

#[derive(Subcommand)]
pub enum DeriveTarget {
    /// Address of voting number `id`
    Voting {
        #[arg(long)]
        id: u64,
    },
    /// Jetton wallet of a named holder
    Wallet {
        #[arg(long)]
        owner: String,
    },
}

impl Cli {
    /// Log level from the config file the command reads, if it can be read.
    pub fn log_level(&self) -> String {
        let path = match &self.command {
            Command::Simulate { config, .. } => Some(config.as_str()),
            Command::Derive { config, .. } => config.as_deref(),
            Command::Init { .. } => None,
        };
        path.and_then(|p| NodeConfig::load(p).ok())
            .map(|c| c.logging.level)
            .unwrap_or_else(|| "info".to_string())
    }
}

pub async fn run(cli: Cli) -> Result<(), NodeError> {
    match cli.command {
        Command::Init { dir } => {
            NodeConfig::init(&dir)?;
            tracing::info!("configuration written to {}/{}", dir, CONFIG_FILE);
            Ok(())
        }
        Command::Simulate {
            config,
            json,
            metrics,
        } => {
            let config = NodeConfig::load(&config)?;
            let registry = Arc::new(NodeMetrics::new());
            let network =
                Network::with_metrics(&config.network, config.dao.start_time, registry.clone());
            let result = simulate(&config, &network).await;
            network.shutdown();
            let report = result?;

            if json {
                let out =
                    serde_json::to_string_pretty(&report).map_err(|e| NodeError::ScenarioError {
                        reason: format!("failed to encode report: {}", e),
                    })?;
                println!("{}", out);
            } else {
                print_report(&report);
            }
            if metrics {
                print!("{}", registry.encode()?);
            }
            Ok(())
        }
        Command::Derive { config, target } => {
            let config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };
            let minter = minter_address(&treasury_address(&config.dao.admin));
            let address = match target {
                DeriveTarget::Voting { id } => voting_address(&minter, id, &code::voting()),
                DeriveTarget::Wallet { owner } => wallet_address(
                    &treasury_address(&owner),
                    &minter,
                    &code::wallet(),
                    &code::keeper(),
                ),
            };
            println!("{}", address);
            Ok(())
        }
    }
}

fn print_report(report: &Report) {
    println!();
    print_field("Minter", report.minter);
    print_field("Admin", &report.admin);
    print_field("Supply", format_coins(report.total_supply));
    print_field(
        "Txs",
        format!(
            "{} ({} failed)",
            report.transactions, report.failed_transactions
        ),
    );
    println!();

    let mut proposals = data_table(&[
        "#", "Action", "For", "Against", "Executed", "Relayed", "Applied", "Refused",
    ]);
    for p in &report.proposals {
        proposals.add_row(vec![
            cell_right(p.voting_id),
            comfy_table::Cell::new(&p.action),
            cell_right(format_coins(p.voted_for)),
            cell_right(format_coins(p.voted_against)),
            comfy_table::Cell::new(yes_no(p.executed)),
            comfy_table::Cell::new(yes_no(p.relayed)),
            comfy_table::Cell::new(yes_no(p.applied)),
            cell_right(p.refused_transfers),
        ]);
    }
    print_table(&proposals);
    println!();

    let mut holders = data_table(&["Holder", "Balance"]);
    for h in &report.holders {
        holders.add_row(vec![
            comfy_table::Cell::new(&h.name),
            cell_right(format_coins(h.balance)),
        ]);
    }
    print_table(&holders);
}
