//! The fixed node staking scenario.
//!
//! Steps run in order, once. A step that fails aborts the run; nothing is
//! retried or rolled back.

use anchor_client::solana_sdk::native_token::LAMPORTS_PER_SOL;
use anchor_client::solana_sdk::signature::Signature;
use tracing::{info, warn};

use crate::error::{OrchestratorError, Result};
use crate::ledger::{PoolParams, PresaleParams, StakingLedger};
use crate::report::Report;

/// Literal inputs of every step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioParams {
    pub pool: PoolParams,
    pub mint_amount: u64,
    pub price_per_node: u64,
    pub presale_max_allocation: u16,
    pub presale_supply: u64,
    pub presale_duration: i64,
    pub mint_nodes: u64,
    pub presale_purchase: u16,
    pub airdrop_lamports: u64,
    pub create_nodes: u16,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            pool: PoolParams {
                tokens_per_node: 10,
                reward_per_node: 20,
                max_allocation: 1000,
                treasury_to_selling_bps: 2_000,
            },
            mint_amount: 50_000_000_000,
            price_per_node: 1,
            presale_max_allocation: 1000,
            presale_supply: 10_000,
            presale_duration: 86_400,
            mint_nodes: 1000,
            presale_purchase: 10,
            airdrop_lamports: LAMPORTS_PER_SOL,
            create_nodes: 100,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub signatures: Vec<(&'static str, Signature)>,
    pub report: Report,
}

pub struct Scenario<'a, L> {
    ledger: &'a L,
    params: ScenarioParams,
    with_metadata: bool,
}

impl<'a, L: StakingLedger> Scenario<'a, L> {
    pub fn new(ledger: &'a L, params: ScenarioParams) -> Self {
        Self {
            ledger,
            params,
            with_metadata: false,
        }
    }

    /// Also attach token metadata after the selling vault is created.
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.with_metadata = enabled;
        self
    }

    pub fn run(&self) -> Result<ScenarioRun> {
        let ledger = self.ledger;
        let params = &self.params;
        let addresses = *ledger.addresses();
        let mut signatures = Vec::new();
        let mut record = |step: &'static str, signature: Signature| {
            info!(step, %signature, "Your transaction signature");
            signatures.push((step, signature));
        };

        let sig = step("initialize_pool", || {
            let sig = ledger.initialize_pool(&params.pool)?;
            let pool = ledger.pool_state()?;
            ensure("initialize_pool", pool.tokens_per_node == params.pool.tokens_per_node, || {
                format!(
                    "pool reports {} tokens per node, expected {}",
                    pool.tokens_per_node, params.pool.tokens_per_node
                )
            })?;
            Ok(sig)
        })?;
        record("initialize_pool", sig);

        let sig = step("initialize_selling_vault", || {
            let sig = ledger.initialize_selling_vault()?;
            let balance = ledger.token_balance(&addresses.selling_vault)?;
            ensure("initialize_selling_vault", balance == 0, || {
                format!("new selling vault holds {balance} tokens")
            })?;
            Ok(sig)
        })?;
        record("initialize_selling_vault", sig);

        if self.with_metadata {
            let sig = step("initialize_token", || ledger.initialize_token())?;
            record("initialize_token", sig);
        }

        let sig = step("mint_tokens", || {
            let before = ledger.token_balance(&addresses.treasury_vault)?;
            let sig = ledger.mint_tokens(params.mint_amount)?;
            let after = ledger.token_balance(&addresses.treasury_vault)?;
            ensure("mint_tokens", after.checked_sub(before) == Some(params.mint_amount), || {
                format!(
                    "treasury went from {before} to {after}, expected +{}",
                    params.mint_amount
                )
            })?;
            Ok(sig)
        })?;
        record("mint_tokens", sig);

        let sig = step("initialize_presale", || {
            let start_at = ledger.now()?;
            let presale = PresaleParams {
                price_per_node: params.price_per_node,
                max_allocation: params.presale_max_allocation,
                start_at,
                end_at: start_at.saturating_add(params.presale_duration),
                total_presale_amount: params.presale_supply,
            };
            let sig = ledger.initialize_presale(&presale)?;
            let state = ledger.presale_state()?;
            ensure(
                "initialize_presale",
                state.presale_end_at > state.presale_start_at,
                || {
                    format!(
                        "presale ends at {} but starts at {}",
                        state.presale_end_at, state.presale_start_at
                    )
                },
            )?;
            Ok(sig)
        })?;
        record("initialize_presale", sig);

        let sig = step("mint_nodes", || {
            let before = ledger.pool_state()?.total_nodes;
            let sig = ledger.mint_nodes(params.mint_nodes)?;
            let after = ledger.pool_state()?.total_nodes;
            ensure("mint_nodes", after.checked_sub(before) == Some(params.mint_nodes), || {
                format!(
                    "pool went from {before} to {after} nodes, expected +{}",
                    params.mint_nodes
                )
            })?;
            Ok(sig)
        })?;
        record("mint_nodes", sig);

        let sig = step("initialize_user_stake", || ledger.initialize_user_stake())?;
        record("initialize_user_stake", sig);

        let sig = step("sell_nodes_at_presale", || {
            let before = ledger.user_stake_entry()?.staked_amount;
            let sig = ledger.sell_nodes_at_presale(params.presale_purchase)?;
            let after = ledger.user_stake_entry()?.staked_amount;
            ensure(
                "sell_nodes_at_presale",
                after.checked_sub(before) == Some(params.presale_purchase),
                || {
                    format!(
                        "staked amount went from {before} to {after}, expected +{}",
                        params.presale_purchase
                    )
                },
            )?;
            Ok(sig)
        })?;
        record("sell_nodes_at_presale", sig);

        let sig = step("withdraw_cap", || {
            let vault_authority = ledger.vault_authority();
            ledger.airdrop(&vault_authority, params.airdrop_lamports)?;
            ledger.withdraw_cap()
        })?;
        record("withdraw_cap", sig);

        let sig = step("create_nodes", || {
            let before = ledger.pool_state()?.total_nodes;
            let sig = ledger.create_nodes(params.create_nodes)?;
            let after = ledger.pool_state()?.total_nodes;
            info!(total_nodes = after, "nodes balance");
            ensure(
                "create_nodes",
                after.checked_sub(before) == Some(u64::from(params.create_nodes)),
                || {
                    format!(
                        "pool went from {before} to {after} nodes, expected +{}",
                        params.create_nodes
                    )
                },
            )?;
            Ok(sig)
        })?;
        record("create_nodes", sig);

        // Rewards only exist once a full day has passed since the last stake
        let claimable = step("read_claimable", || {
            Ok(ledger.user_stake_entry()?.claimable_amount)
        })?;
        if claimable > 0 {
            let sig = step("claim_rewards", || ledger.claim_rewards())?;
            record("claim_rewards", sig);
        }

        let report = step("accounts_data", || Report::collect(ledger))?;
        if report.user_nodes == 0 {
            warn!("stake entry holds no nodes after the scenario");
        }

        Ok(ScenarioRun { signatures, report })
    }
}

fn step<T>(name: &'static str, run: impl FnOnce() -> Result<T>) -> Result<T> {
    info!(step = name, "Running step");
    run().map_err(|source| match source {
        check @ OrchestratorError::Check { .. } => check,
        other => OrchestratorError::Step {
            step: name,
            source: Box::new(other),
        },
    })
}

fn ensure(step: &'static str, holds: bool, detail: impl FnOnce() -> String) -> Result<()> {
    if holds {
        Ok(())
    } else {
        Err(OrchestratorError::Check {
            step,
            detail: detail(),
        })
    }
}
