use anchor_lang::prelude::*;
use anchor_lang::system_program;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::metadata::{
    create_metadata_accounts_v3, mpl_token_metadata::types::DataV2, CreateMetadataAccountsV3,
    Metadata,
};
use anchor_spl::token::{self, Mint, MintTo, Token, TokenAccount, Transfer};

pub mod state;

pub use state::*;

declare_id!("4dtYh4bYBJ8P2ssASw5izqLjfTEJYMDHCmuhAipcr6vc");

pub const POOL_AUTHORITY: Pubkey = pubkey!("Ef9FGPkrnFokBtsiAmYsZNPo1tuaGF45qzGbNAWb4MeP");
pub const VAULT_AUTHORITY: Pubkey = pubkey!("HhdE56oBEQcYE8cU6QdDG44cLz9LE7F1g9wfz5pRu6Ya");

pub const MINT_SEED: &[u8] = b"mint";
pub const POOL_STATE_SEED: &[u8] = b"pool_state";
pub const PRESALE_STATE_SEED: &[u8] = b"presale_state";
pub const PRESALE_VAULT_SEED: &[u8] = b"presale_vault";
pub const METADATA_SEED: &[u8] = b"metadata";

pub const TOKEN_DECIMALS: u8 = 9;
pub const TOKEN_NAME: &str = "Solana Node Staking Token";
pub const TOKEN_SYMBOL: &str = "NST";
pub const TOKEN_URI: &str = "https://ipfs.io/ipfs/QmQ5m5WQPrgDGU24KmPJsCiMzAWyEaZZuohxssVeZP8LVH";

#[program]
pub mod node_staking {
    use super::*;

    // Create the pool, the token mint and the treasury vault
    pub fn initialize_pool(
        ctx: Context<InitializePool>,
        tokens_per_node: u64,
        reward_per_node: u8,
        max_allocation: u16,
        treasury_to_selling_bps: u16,
    ) -> Result<()> {
        require!(
            u64::from(treasury_to_selling_bps) <= BPS_DENOMINATOR,
            StakingError::InvalidSellingRatio
        );

        let pool_state = &mut ctx.accounts.pool_state;
        pool_state.max_allocation = max_allocation;
        pool_state.total_nodes = 0;
        pool_state.total_tokens = 0;
        pool_state.tokens_per_node = tokens_per_node;
        pool_state.reward_per_node = reward_per_node;
        pool_state.treasury_to_selling_bps = treasury_to_selling_bps;
        pool_state.mint = ctx.accounts.mint.key();
        pool_state.treasury_vault = ctx.accounts.treasury_vault.key();
        pool_state.selling_vault = Pubkey::default(); // set by initialize_selling_vault
        pool_state.bump = ctx.bumps.pool_state;

        msg!(
            "Pool initialized: {} tokens per node, {} bps to selling vault",
            tokens_per_node,
            treasury_to_selling_bps
        );
        Ok(())
    }

    pub fn initialize_selling_vault(ctx: Context<InitializeSellingVault>) -> Result<()> {
        let pool_state = &mut ctx.accounts.pool_state;
        pool_state.selling_vault = ctx.accounts.selling_vault.key();

        msg!("Selling vault initialized: {}", pool_state.selling_vault);
        Ok(())
    }

    // Attach Metaplex metadata to the pool mint
    pub fn initialize_token(ctx: Context<InitializeToken>) -> Result<()> {
        let seeds = &[MINT_SEED, &[ctx.bumps.mint]];
        let signer = &[&seeds[..]];

        let token_data = DataV2 {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            uri: TOKEN_URI.to_string(),
            seller_fee_basis_points: 0,
            creators: None,
            collection: None,
            uses: None,
        };

        let cpi_accounts = CreateMetadataAccountsV3 {
            metadata: ctx.accounts.metadata.to_account_info(),
            mint: ctx.accounts.mint.to_account_info(),
            mint_authority: ctx.accounts.mint.to_account_info(),
            payer: ctx.accounts.pool_authority.to_account_info(),
            update_authority: ctx.accounts.mint.to_account_info(),
            system_program: ctx.accounts.system_program.to_account_info(),
            rent: ctx.accounts.rent.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_metadata_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer);
        create_metadata_accounts_v3(cpi_ctx, token_data, false, true, None)?;

        msg!("Token metadata created for mint {}", ctx.accounts.mint.key());
        Ok(())
    }

    // Mint pool tokens into the treasury vault (pool authority only)
    pub fn mint_tokens(ctx: Context<MintTokens>, amount: u64) -> Result<()> {
        let seeds = &[MINT_SEED, &[ctx.bumps.mint]];
        let signer = &[&seeds[..]];

        let cpi_accounts = MintTo {
            mint: ctx.accounts.mint.to_account_info(),
            to: ctx.accounts.treasury_vault.to_account_info(),
            authority: ctx.accounts.mint.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer);
        token::mint_to(cpi_ctx, amount)?;

        msg!("Minted {} tokens to treasury vault", amount);
        Ok(())
    }

    pub fn initialize_presale(
        ctx: Context<InitializePresale>,
        price_per_node: u64,
        max_allocation: u16,
        presale_start_at: i64,
        presale_end_at: i64,
        total_presale_amount: u64,
    ) -> Result<()> {
        PresaleState::validate_window(presale_start_at, presale_end_at)?;

        let presale = &mut ctx.accounts.presale_state;
        presale.price_per_node = price_per_node;
        presale.max_allocation = max_allocation;
        presale.presale_start_at = presale_start_at;
        presale.presale_end_at = presale_end_at;
        presale.total_presale_amount = total_presale_amount;
        presale.sold_nodes = 0;
        presale.bump = ctx.bumps.presale_state;

        // Presale inventory is drawn from the pool's node count
        let pool_state = &mut ctx.accounts.pool_state;
        pool_state.total_nodes = total_presale_amount;

        msg!(
            "Presale initialized: {} nodes at {} lamports, {}..{}",
            total_presale_amount,
            price_per_node,
            presale_start_at,
            presale_end_at
        );
        Ok(())
    }

    pub fn mint_nodes(ctx: Context<MintNodes>, amount: u64) -> Result<()> {
        let pool_state = &mut ctx.accounts.pool_state;
        pool_state.add_nodes(amount)?;

        msg!("Minted {} nodes, pool now holds {}", amount, pool_state.total_nodes);
        Ok(())
    }

    pub fn initialize_user_stake(ctx: Context<InitializeUserStake>) -> Result<()> {
        let user_stake_entry = &mut ctx.accounts.user_stake_entry;
        user_stake_entry.claimable_amount = 0;
        user_stake_entry.staked_amount = 0;
        user_stake_entry.last_staked_at = Clock::get()?.unix_timestamp;
        user_stake_entry.bump = ctx.bumps.user_stake_entry;

        msg!("Stake entry created for {}", ctx.accounts.user.key());
        Ok(())
    }

    // Buy nodes with lamports while the presale window is open
    pub fn sell_nodes_at_presale(ctx: Context<SellNodesAtPresale>, amount: u16) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let presale_state = &mut ctx.accounts.presale_state;
        presale_state.ensure_open(now)?;

        let pool_state = &mut ctx.accounts.pool_state;
        let user_stake_entry = &mut ctx.accounts.user_stake_entry;
        let needed_lamports = presale_state.price_of(amount)?;

        require!(
            pool_state.total_nodes >= u64::from(amount),
            StakingError::LackNodes
        );
        require!(
            ctx.accounts.user.lamports() >= needed_lamports,
            StakingError::InsufficientBalanceForPresale
        );

        user_stake_entry.checkpoint_stake(pool_state.reward_per_node, now)?;
        user_stake_entry.stake(amount, presale_state.max_allocation)?;
        // Presale nodes start earning once the presale closes
        user_stake_entry.last_staked_at = user_stake_entry
            .last_staked_at
            .max(presale_state.presale_end_at);

        system_program::transfer(
            CpiContext::new(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.user.to_account_info(),
                    to: ctx.accounts.presale_vault.to_account_info(),
                },
            ),
            needed_lamports,
        )?;

        pool_state.take_nodes(u64::from(amount))?;
        presale_state.record_sale(amount)?;

        msg!(
            "Presale sold {} nodes for {} lamports",
            amount,
            needed_lamports
        );
        Ok(())
    }

    // Move presale proceeds above the rent-exempt minimum to the vault authority
    pub fn withdraw_cap(ctx: Context<WithdrawCap>) -> Result<()> {
        let presale_vault = ctx.accounts.presale_vault.to_account_info();
        let rent_exempt = Rent::get()?.minimum_balance(presale_vault.data_len());
        let available = presale_vault
            .lamports()
            .checked_sub(rent_exempt)
            .ok_or(StakingError::UnavailableCaculateSub)?;

        let vault_lamports = presale_vault
            .lamports()
            .checked_sub(available)
            .ok_or(StakingError::UnavailableCaculateSub)?;
        let withdrawer = ctx.accounts.withdrawer.to_account_info();
        let withdrawer_lamports = withdrawer
            .lamports()
            .checked_add(available)
            .ok_or(StakingError::UnavailableCaculateSum)?;
        **presale_vault.try_borrow_mut_lamports()? = vault_lamports;
        **withdrawer.try_borrow_mut_lamports()? = withdrawer_lamports;

        msg!("Withdrew {} lamports to {}", available, withdrawer.key());
        Ok(())
    }

    // Buy nodes with pool tokens; payment is split between treasury and selling vaults
    pub fn create_nodes(ctx: Context<CreateNodes>, amount: u16) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let pool_state = &mut ctx.accounts.pool_state;
        let cost = pool_state.node_cost(amount)?;
        let (treasury_share, selling_share) = pool_state.split_payment(cost)?;

        require!(
            ctx.accounts.user_token_account.amount >= cost,
            StakingError::LackUserTokenBalance
        );

        let user_stake_entry = &mut ctx.accounts.user_stake_entry;
        user_stake_entry.checkpoint_stake(pool_state.reward_per_node, now)?;
        user_stake_entry.stake(amount, pool_state.max_allocation)?;

        let cpi_program = ctx.accounts.token_program.to_account_info();
        // The pool authority pays straight out of the treasury vault
        let pays_from_treasury =
            ctx.accounts.user_token_account.key() == ctx.accounts.treasury_vault.key();
        if treasury_share > 0 && !pays_from_treasury {
            let cpi_accounts = Transfer {
                from: ctx.accounts.user_token_account.to_account_info(),
                to: ctx.accounts.treasury_vault.to_account_info(),
                authority: ctx.accounts.user.to_account_info(),
            };
            token::transfer(CpiContext::new(cpi_program.clone(), cpi_accounts), treasury_share)?;
        }
        if selling_share > 0 {
            let cpi_accounts = Transfer {
                from: ctx.accounts.user_token_account.to_account_info(),
                to: ctx.accounts.selling_vault.to_account_info(),
                authority: ctx.accounts.user.to_account_info(),
            };
            token::transfer(CpiContext::new(cpi_program, cpi_accounts), selling_share)?;
        }

        pool_state.add_nodes(u64::from(amount))?;
        pool_state.total_tokens = pool_state
            .total_tokens
            .checked_add(cost)
            .ok_or(StakingError::UnavailableCaculateSum)?;

        msg!(
            "Created {} nodes for {} tokens ({} treasury, {} selling)",
            amount,
            cost,
            treasury_share,
            selling_share
        );
        Ok(())
    }

    // Pay accrued node rewards out of the selling vault
    pub fn claim_rewards(ctx: Context<ClaimRewards>) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let pool_state = &ctx.accounts.pool_state;
        let user_stake_entry = &mut ctx.accounts.user_stake_entry;
        user_stake_entry.settle_rewards(pool_state.reward_per_node, now)?;
        let amount = user_stake_entry.take_claimable()?;

        require!(
            ctx.accounts.selling_vault.amount >= amount,
            StakingError::LackSellingVaultBalance
        );

        let seeds = &[POOL_STATE_SEED, &[pool_state.bump]];
        let signer = &[&seeds[..]];

        let cpi_accounts = Transfer {
            from: ctx.accounts.selling_vault.to_account_info(),
            to: ctx.accounts.user_token_account.to_account_info(),
            authority: ctx.accounts.pool_state.to_account_info(),
        };
        let cpi_program = ctx.accounts.token_program.to_account_info();
        let cpi_ctx = CpiContext::new_with_signer(cpi_program, cpi_accounts, signer);
        token::transfer(cpi_ctx, amount)?;

        msg!("Claimed {} reward tokens", amount);
        Ok(())
    }
}

// Account Structures

#[derive(Accounts)]
pub struct InitializePool<'info> {
    #[account(
        init,
        payer = pool_authority,
        space = 8 + PoolState::LEN,
        seeds = [POOL_STATE_SEED],
        bump
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        init,
        payer = pool_authority,
        seeds = [MINT_SEED],
        bump,
        mint::decimals = TOKEN_DECIMALS,
        mint::authority = mint.key(),
    )]
    pub mint: Account<'info, Mint>,

    #[account(
        init,
        payer = pool_authority,
        associated_token::mint = mint,
        associated_token::authority = pool_authority
    )]
    pub treasury_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeSellingVault<'info> {
    #[account(
        mut,
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump,
        has_one = mint
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(seeds = [MINT_SEED], bump)]
    pub mint: Account<'info, Mint>,

    // ATA owned by the pool state PDA
    #[account(
        init,
        payer = pool_authority,
        associated_token::mint = mint,
        associated_token::authority = pool_state
    )]
    pub selling_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct InitializeToken<'info> {
    /// CHECK: Metadata PDA, created and validated by the token metadata program
    #[account(
        mut,
        seeds = [METADATA_SEED, token_metadata_program.key().as_ref(), mint.key().as_ref()],
        bump,
        seeds::program = token_metadata_program.key()
    )]
    pub metadata: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [MINT_SEED],
        bump,
        mint::authority = mint
    )]
    pub mint: Account<'info, Mint>,

    #[account(
        mut,
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,

    pub rent: Sysvar<'info, Rent>,
    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub token_metadata_program: Program<'info, Metadata>,
}

#[derive(Accounts)]
pub struct MintTokens<'info> {
    #[account(
        mut,
        seeds = [MINT_SEED],
        bump,
        mint::authority = mint
    )]
    pub mint: Account<'info, Mint>,

    #[account(
        mut,
        associated_token::mint = mint,
        associated_token::authority = pool_authority
    )]
    pub treasury_vault: Account<'info, TokenAccount>,

    #[account(
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct InitializePresale<'info> {
    #[account(
        init,
        payer = pool_authority,
        space = 8 + PresaleState::LEN,
        seeds = [PRESALE_STATE_SEED],
        bump
    )]
    pub presale_state: Account<'info, PresaleState>,

    #[account(
        init,
        payer = pool_authority,
        space = 8,
        seeds = [PRESALE_VAULT_SEED],
        bump
    )]
    pub presale_vault: Account<'info, PresaleVault>,

    #[account(
        mut,
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        mut,
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct MintNodes<'info> {
    #[account(
        mut,
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        constraint = pool_authority.key() == POOL_AUTHORITY @ StakingError::InvalidPoolAuthority
    )]
    pub pool_authority: Signer<'info>,
}

#[derive(Accounts)]
pub struct InitializeUserStake<'info> {
    #[account(
        init,
        payer = user,
        space = 8 + UserStakeEntry::LEN,
        seeds = [user.key().as_ref()],
        bump
    )]
    pub user_stake_entry: Account<'info, UserStakeEntry>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct SellNodesAtPresale<'info> {
    #[account(
        mut,
        seeds = [user.key().as_ref()],
        bump = user_stake_entry.bump
    )]
    pub user_stake_entry: Account<'info, UserStakeEntry>,

    #[account(
        mut,
        seeds = [PRESALE_VAULT_SEED],
        bump
    )]
    pub presale_vault: Account<'info, PresaleVault>,

    #[account(
        mut,
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        mut,
        seeds = [PRESALE_STATE_SEED],
        bump = presale_state.bump
    )]
    pub presale_state: Account<'info, PresaleState>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct WithdrawCap<'info> {
    #[account(
        mut,
        seeds = [PRESALE_VAULT_SEED],
        bump
    )]
    pub presale_vault: Account<'info, PresaleVault>,

    #[account(
        mut,
        constraint = withdrawer.key() == VAULT_AUTHORITY @ StakingError::InvalidVaultAuthority
    )]
    pub withdrawer: Signer<'info>,
}

#[derive(Accounts)]
pub struct CreateNodes<'info> {
    #[account(
        mut,
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump,
        has_one = mint,
        has_one = treasury_vault,
        has_one = selling_vault
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        mut,
        seeds = [user.key().as_ref()],
        bump = user_stake_entry.bump
    )]
    pub user_stake_entry: Account<'info, UserStakeEntry>,

    pub mint: Account<'info, Mint>,

    #[account(
        mut,
        token::mint = mint,
        token::authority = user
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub treasury_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub selling_vault: Account<'info, TokenAccount>,

    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ClaimRewards<'info> {
    #[account(
        seeds = [POOL_STATE_SEED],
        bump = pool_state.bump,
        has_one = mint,
        has_one = selling_vault
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        mut,
        seeds = [user.key().as_ref()],
        bump = user_stake_entry.bump
    )]
    pub user_stake_entry: Account<'info, UserStakeEntry>,

    pub mint: Account<'info, Mint>,

    #[account(mut)]
    pub selling_vault: Account<'info, TokenAccount>,

    #[account(
        init_if_needed,
        payer = user,
        associated_token::mint = mint,
        associated_token::authority = user
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

// Error Codes

#[error_code]
pub enum StakingError {
    #[msg("Pool authority is invalid")]
    InvalidPoolAuthority,
    #[msg("Nodes of pool overflowed")]
    AmountOverflow,
    #[msg("Presale is not started yet")]
    PresaleTooNew,
    #[msg("Presale is over")]
    PresaleTooOld,
    #[msg("Presale must end after it starts")]
    InvalidPresaleWindow,
    #[msg("Stakes amount exceeds max allocation")]
    StakesAmountOverflow,
    #[msg("Pool doesn't have enough nodes")]
    LackNodes,
    #[msg("User staked amount overflowed")]
    UserAmountOverflow,
    #[msg("Can not calculate price for requested nodes")]
    UnableCalculatingNodesPrice,
    #[msg("Can not calculate selling amount")]
    UnableCalculatingSellingTokens,
    #[msg("Treasury to selling ratio exceeds 10000 bps")]
    InvalidSellingRatio,
    #[msg("Insufficient balance for presale")]
    InsufficientBalanceForPresale,
    #[msg("Only vault authority can withdraw capital")]
    InvalidVaultAuthority,
    #[msg("User token balance is not enough to buy nodes")]
    LackUserTokenBalance,
    #[msg("Selling vault can not cover rewards")]
    LackSellingVaultBalance,
    #[msg("No rewards to claim")]
    NothingToClaim,
    #[msg("Can not calculate sum")]
    UnavailableCaculateSum,
    #[msg("Can not calculate sub")]
    UnavailableCaculateSub,
}
