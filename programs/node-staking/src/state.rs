use anchor_lang::prelude::*;

use crate::StakingError;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const BPS_DENOMINATOR: u64 = 10_000;

#[account]
pub struct PoolState {
    pub max_allocation: u16,          // nodes a wallet may hold
    pub total_nodes: u64,             // nodes available to the pool
    pub total_tokens: u64,            // tokens paid in for created nodes
    pub tokens_per_node: u64,
    pub reward_per_node: u8,          // tokens per node per day
    pub treasury_to_selling_bps: u16, // share of node payments routed to the selling vault
    pub mint: Pubkey,
    pub treasury_vault: Pubkey,
    pub selling_vault: Pubkey,
    pub bump: u8,
}

impl PoolState {
    pub const LEN: usize = 2 + 8 + 8 + 8 + 1 + 2 + 32 + 32 + 32 + 1;

    pub fn add_nodes(&mut self, amount: u64) -> std::result::Result<(), StakingError> {
        self.total_nodes = self
            .total_nodes
            .checked_add(amount)
            .ok_or(StakingError::AmountOverflow)?;
        Ok(())
    }

    pub fn take_nodes(&mut self, amount: u64) -> std::result::Result<(), StakingError> {
        self.total_nodes = self
            .total_nodes
            .checked_sub(amount)
            .ok_or(StakingError::LackNodes)?;
        Ok(())
    }

    /// Token cost of `amount` nodes.
    pub fn node_cost(&self, amount: u16) -> std::result::Result<u64, StakingError> {
        self.tokens_per_node
            .checked_mul(u64::from(amount))
            .ok_or(StakingError::UnableCalculatingNodesPrice)
    }

    /// Splits a node payment into `(treasury, selling)` shares.
    pub fn split_payment(&self, cost: u64) -> std::result::Result<(u64, u64), StakingError> {
        let selling = u128::from(cost)
            .checked_mul(u128::from(self.treasury_to_selling_bps))
            .map(|v| v / u128::from(BPS_DENOMINATOR))
            .and_then(|v| u64::try_from(v).ok())
            .ok_or(StakingError::UnableCalculatingSellingTokens)?;
        let treasury = cost
            .checked_sub(selling)
            .ok_or(StakingError::UnableCalculatingSellingTokens)?;
        Ok((treasury, selling))
    }
}

#[account]
pub struct PresaleState {
    pub price_per_node: u64, // lamports
    pub max_allocation: u16,
    pub presale_start_at: i64,
    pub presale_end_at: i64,
    pub total_presale_amount: u64,
    pub sold_nodes: u64,
    pub bump: u8,
}

impl PresaleState {
    pub const LEN: usize = 8 + 2 + 8 + 8 + 8 + 8 + 1;

    pub fn validate_window(start: i64, end: i64) -> std::result::Result<(), StakingError> {
        if end <= start {
            return Err(StakingError::InvalidPresaleWindow);
        }
        Ok(())
    }

    pub fn ensure_open(&self, now: i64) -> std::result::Result<(), StakingError> {
        if self.presale_start_at > now {
            return Err(StakingError::PresaleTooNew);
        }
        if self.presale_end_at < now {
            return Err(StakingError::PresaleTooOld);
        }
        Ok(())
    }

    /// Lamports owed for `amount` nodes.
    pub fn price_of(&self, amount: u16) -> std::result::Result<u64, StakingError> {
        self.price_per_node
            .checked_mul(u64::from(amount))
            .ok_or(StakingError::UnableCalculatingNodesPrice)
    }

    pub fn record_sale(&mut self, amount: u16) -> std::result::Result<(), StakingError> {
        self.sold_nodes = self
            .sold_nodes
            .checked_add(u64::from(amount))
            .ok_or(StakingError::AmountOverflow)?;
        Ok(())
    }
}

#[account]
pub struct PresaleVault {}

#[account]
pub struct UserStakeEntry {
    pub claimable_amount: u64,
    pub staked_amount: u16,
    pub last_staked_at: i64, // reward accrual checkpoint
    pub bump: u8,
}

impl UserStakeEntry {
    pub const LEN: usize = 8 + 2 + 8 + 1;

    pub fn stake(&mut self, amount: u16, max_allocation: u16) -> std::result::Result<(), StakingError> {
        let staked = self
            .staked_amount
            .checked_add(amount)
            .ok_or(StakingError::UserAmountOverflow)?;
        if staked > max_allocation {
            return Err(StakingError::StakesAmountOverflow);
        }
        self.staked_amount = staked;
        Ok(())
    }

    /// Credits rewards for every whole day since the checkpoint and moves the
    /// checkpoint forward by those days. Returns the amount credited.
    pub fn settle_rewards(
        &mut self,
        reward_per_node: u8,
        now: i64,
    ) -> std::result::Result<u64, StakingError> {
        if now <= self.last_staked_at {
            return Ok(0);
        }
        let days = now
            .checked_sub(self.last_staked_at)
            .map(|elapsed| elapsed / SECONDS_PER_DAY)
            .ok_or(StakingError::UnavailableCaculateSub)?;
        if days == 0 {
            return Ok(0);
        }
        let reward = u64::from(self.staked_amount)
            .checked_mul(u64::from(reward_per_node))
            .and_then(|per_day| per_day.checked_mul(days as u64))
            .ok_or(StakingError::UnavailableCaculateSum)?;
        self.claimable_amount = self
            .claimable_amount
            .checked_add(reward)
            .ok_or(StakingError::UnavailableCaculateSum)?;
        self.last_staked_at = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|span| self.last_staked_at.checked_add(span))
            .ok_or(StakingError::UnavailableCaculateSum)?;
        Ok(reward)
    }

    /// Brings accrual up to `now` ahead of a stake change: whole days first,
    /// then the partial day pro rata for the nodes already staked. The
    /// checkpoint ends at `now` unless it already lies in the future.
    pub fn checkpoint_stake(
        &mut self,
        reward_per_node: u8,
        now: i64,
    ) -> std::result::Result<u64, StakingError> {
        let settled = self.settle_rewards(reward_per_node, now)?;
        if now <= self.last_staked_at {
            return Ok(settled);
        }
        let elapsed = now
            .checked_sub(self.last_staked_at)
            .ok_or(StakingError::UnavailableCaculateSub)?;
        let partial = u128::from(self.staked_amount)
            .checked_mul(u128::from(reward_per_node))
            .and_then(|per_day| per_day.checked_mul(elapsed as u128))
            .map(|v| v / SECONDS_PER_DAY as u128)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or(StakingError::UnavailableCaculateSum)?;
        self.claimable_amount = self
            .claimable_amount
            .checked_add(partial)
            .ok_or(StakingError::UnavailableCaculateSum)?;
        self.last_staked_at = now;
        settled
            .checked_add(partial)
            .ok_or(StakingError::UnavailableCaculateSum)
    }

    pub fn take_claimable(&mut self) -> std::result::Result<u64, StakingError> {
        if self.claimable_amount == 0 {
            return Err(StakingError::NothingToClaim);
        }
        Ok(std::mem::take(&mut self.claimable_amount))
    }
}
