//! The remote surface of the node staking program as the scenario sees it.

mod rpc;

#[cfg(test)]
pub(crate) mod bank;

pub use rpc::RpcLedger;

use anchor_client::solana_sdk::signature::Signature;
use anchor_lang::prelude::Pubkey;
use node_staking::{PoolState, PresaleState, UserStakeEntry};

use crate::addresses::Addresses;
use crate::error::Result;

/// Arguments of `initialize_pool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub tokens_per_node: u64,
    pub reward_per_node: u8,
    pub max_allocation: u16,
    pub treasury_to_selling_bps: u16,
}

/// Arguments of `initialize_presale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresaleParams {
    pub price_per_node: u64,
    pub max_allocation: u16,
    pub start_at: i64,
    pub end_at: i64,
    pub total_presale_amount: u64,
}

/// One connection to a ledger running the node staking program.
///
/// Every instruction call returns once the transaction is confirmed, so
/// state reads issued afterwards observe its effects.
pub trait StakingLedger {
    fn addresses(&self) -> &Addresses;

    fn vault_authority(&self) -> Pubkey;

    /// Current unix timestamp as seen by the ledger.
    fn now(&self) -> Result<i64>;

    fn initialize_pool(&self, params: &PoolParams) -> Result<Signature>;

    fn initialize_selling_vault(&self) -> Result<Signature>;

    fn initialize_token(&self) -> Result<Signature>;

    fn mint_tokens(&self, amount: u64) -> Result<Signature>;

    fn initialize_presale(&self, params: &PresaleParams) -> Result<Signature>;

    fn mint_nodes(&self, amount: u64) -> Result<Signature>;

    fn initialize_user_stake(&self) -> Result<Signature>;

    fn sell_nodes_at_presale(&self, amount: u16) -> Result<Signature>;

    /// Requests `lamports` for `to` and waits for the airdrop to land.
    fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature>;

    /// Signed by the vault authority.
    fn withdraw_cap(&self) -> Result<Signature>;

    fn create_nodes(&self, amount: u16) -> Result<Signature>;

    fn claim_rewards(&self) -> Result<Signature>;

    fn pool_state(&self) -> Result<PoolState>;

    fn presale_state(&self) -> Result<PresaleState>;

    fn user_stake_entry(&self) -> Result<UserStakeEntry>;

    fn token_balance(&self, account: &Pubkey) -> Result<u64>;

    fn lamports(&self, account: &Pubkey) -> Result<u64>;
}
