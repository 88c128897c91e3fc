use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::signer::keypair::{read_keypair_file, Keypair};
use anchor_client::solana_sdk::signer::Signer;
use anchor_client::Cluster;
use anchor_lang::prelude::Pubkey;

use crate::error::{OrchestratorError, Result};

const DEFAULT_PRESALE_SECONDS: i64 = 86_400;

/// How the final account snapshot is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for ReportFormat {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            other => Err(OrchestratorError::Config(format!(
                "NODE_STAKING_REPORT must be `table` or `json`, got `{other}`"
            ))),
        }
    }
}

/// Orchestrator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: Cluster,
    pub commitment: CommitmentConfig,
    pub program_id: Pubkey,

    // Wallet acting as pool authority, payer and staking user
    pub wallet_path: PathBuf,
    // Only signer allowed to withdraw presale proceeds
    pub vault_authority_path: PathBuf,

    pub presale_duration: i64,
    pub with_metadata: bool,
    pub report_format: ReportFormat,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Required environment variables:
    /// - NODE_STAKING_VAULT_AUTHORITY: keypair file of the vault authority
    ///
    /// Optional environment variables (with defaults):
    /// - NODE_STAKING_CLUSTER: cluster name or RPC URL (default: localnet)
    /// - NODE_STAKING_WALLET: wallet keypair file (default: ~/.config/solana/id.json)
    /// - NODE_STAKING_PROGRAM_ID: deployed program id (default: the program's declared id)
    /// - NODE_STAKING_COMMITMENT: processed | confirmed | finalized (default: confirmed)
    /// - NODE_STAKING_PRESALE_SECONDS: presale window length (default: 86400)
    /// - NODE_STAKING_WITH_METADATA: also create token metadata (default: false)
    /// - NODE_STAKING_REPORT: table | json (default: table)
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster = match lookup("NODE_STAKING_CLUSTER") {
            Some(value) => Cluster::from_str(&value).map_err(|e| {
                OrchestratorError::Config(format!("NODE_STAKING_CLUSTER `{value}`: {e}"))
            })?,
            None => Cluster::Localnet,
        };

        let commitment = match lookup("NODE_STAKING_COMMITMENT").as_deref() {
            None | Some("confirmed") => CommitmentConfig::confirmed(),
            Some("processed") => CommitmentConfig::processed(),
            Some("finalized") => CommitmentConfig::finalized(),
            Some(other) => {
                return Err(OrchestratorError::Config(format!(
                    "unknown commitment `{other}`"
                )))
            }
        };

        let program_id = match lookup("NODE_STAKING_PROGRAM_ID") {
            Some(value) => Pubkey::from_str(&value).map_err(|e| {
                OrchestratorError::Config(format!("NODE_STAKING_PROGRAM_ID `{value}`: {e}"))
            })?,
            None => node_staking::ID,
        };

        let wallet_path = match lookup("NODE_STAKING_WALLET") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = lookup("HOME").ok_or_else(|| {
                    OrchestratorError::Config(
                        "NODE_STAKING_WALLET is unset and HOME is unknown".to_string(),
                    )
                })?;
                PathBuf::from(home).join(".config/solana/id.json")
            }
        };

        let vault_authority_path = lookup("NODE_STAKING_VAULT_AUTHORITY")
            .map(PathBuf::from)
            .ok_or_else(|| {
                OrchestratorError::Config(
                    "NODE_STAKING_VAULT_AUTHORITY environment variable is required".to_string(),
                )
            })?;

        let presale_duration = match lookup("NODE_STAKING_PRESALE_SECONDS") {
            Some(value) => value.parse::<i64>().map_err(|_| {
                OrchestratorError::Config(format!(
                    "NODE_STAKING_PRESALE_SECONDS must be a number, got `{value}`"
                ))
            })?,
            None => DEFAULT_PRESALE_SECONDS,
        };

        let with_metadata = lookup("NODE_STAKING_WITH_METADATA")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let report_format = lookup("NODE_STAKING_REPORT")
            .map(|v| v.parse::<ReportFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            cluster,
            commitment,
            program_id,
            wallet_path,
            vault_authority_path,
            presale_duration,
            with_metadata,
            report_format,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.presale_duration <= 0 {
            return Err(OrchestratorError::Config(format!(
                "presale duration must be positive, got {}",
                self.presale_duration
            )));
        }
        if self.wallet_path == self.vault_authority_path {
            return Err(OrchestratorError::Config(
                "wallet and vault authority must be different keypairs".to_string(),
            ));
        }
        self.wallet()?;
        self.vault_authority()?;
        Ok(())
    }

    /// The wallet keypair; the program only accepts `POOL_AUTHORITY` here.
    pub fn wallet(&self) -> Result<Keypair> {
        load_authority(&self.wallet_path, "wallet", &node_staking::POOL_AUTHORITY)
    }

    pub fn vault_authority(&self) -> Result<Keypair> {
        load_authority(
            &self.vault_authority_path,
            "vault authority",
            &node_staking::VAULT_AUTHORITY,
        )
    }
}

fn load_keypair(path: &Path) -> Result<Keypair> {
    read_keypair_file(path).map_err(|e| OrchestratorError::Keypair {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_authority(path: &Path, role: &str, expected: &Pubkey) -> Result<Keypair> {
    let keypair = load_keypair(path)?;
    if keypair.pubkey() != *expected {
        return Err(OrchestratorError::Config(format!(
            "{role} keypair {} is {}, the program expects {expected}",
            path.display(),
            keypair.pubkey()
        )));
    }
    Ok(keypair)
}
