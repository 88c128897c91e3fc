use std::fmt;

use serde::Serialize;

use crate::config::ReportFormat;
use crate::error::{OrchestratorError, Result};
use crate::ledger::StakingLedger;

/// Aggregated balances read once the scenario has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total_nodes: u64,
    pub treasury_tokens: u64,
    pub selling_tokens: u64,
    #[serde(rename = "presaleVaultAmount")]
    pub presale_vault_lamports: u64,
    pub user_nodes: u16,
    pub claimable_amount: u64,
    #[serde(rename = "vaultAuthBalance")]
    pub vault_authority_lamports: u64,
}

impl Report {
    pub fn collect(ledger: &impl StakingLedger) -> Result<Self> {
        let addresses = ledger.addresses();
        let pool = ledger.pool_state()?;
        let entry = ledger.user_stake_entry()?;

        Ok(Self {
            total_nodes: pool.total_nodes,
            treasury_tokens: ledger.token_balance(&addresses.treasury_vault)?,
            selling_tokens: ledger.token_balance(&addresses.selling_vault)?,
            presale_vault_lamports: ledger.lamports(&addresses.presale_vault)?,
            user_nodes: entry.staked_amount,
            claimable_amount: entry.claimable_amount,
            vault_authority_lamports: ledger.lamports(&ledger.vault_authority())?,
        })
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Table => Ok(self.to_string()),
            ReportFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| OrchestratorError::Config(format!("report serialization: {e}"))),
        }
    }

    fn rows(&self) -> [(&'static str, String); 7] {
        [
            ("totalNodes", self.total_nodes.to_string()),
            ("treasuryTokens", self.treasury_tokens.to_string()),
            ("sellingTokens", self.selling_tokens.to_string()),
            ("presaleVaultAmount", self.presale_vault_lamports.to_string()),
            ("userNodes", self.user_nodes.to_string()),
            ("claimableAmount", self.claimable_amount.to_string()),
            ("vaultAuthBalance", self.vault_authority_lamports.to_string()),
        ]
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let value_width = rows.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let rule = format!("+{}+{}+", "-".repeat(key_width + 2), "-".repeat(value_width + 2));

        writeln!(f, "{rule}")?;
        for (key, value) in &rows {
            writeln!(f, "| {key:<key_width$} | {value:>value_width$} |")?;
        }
        write!(f, "{rule}")
    }
}
