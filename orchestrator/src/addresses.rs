use anchor_lang::prelude::Pubkey;
use anchor_lang::Id;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::metadata::Metadata;
use node_staking::{
    METADATA_SEED, MINT_SEED, POOL_STATE_SEED, PRESALE_STATE_SEED, PRESALE_VAULT_SEED,
};

/// Every account the scenario touches, derived from the program id and the
/// wallet that acts as pool authority and staking user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addresses {
    pub program_id: Pubkey,
    pub authority: Pubkey,
    pub mint: Pubkey,
    pub pool_state: Pubkey,
    pub presale_state: Pubkey,
    pub presale_vault: Pubkey,
    pub user_stake_entry: Pubkey,
    // ATA(mint, authority); also the authority's own token account
    pub treasury_vault: Pubkey,
    // ATA(mint, pool_state)
    pub selling_vault: Pubkey,
    pub metadata: Pubkey,
}

impl Addresses {
    pub fn derive(program_id: &Pubkey, authority: &Pubkey) -> Self {
        let pda = |seeds: &[&[u8]]| Pubkey::find_program_address(seeds, program_id).0;

        let mint = pda(&[MINT_SEED]);
        let pool_state = pda(&[POOL_STATE_SEED]);
        let metadata_program = Metadata::id();
        let (metadata, _) = Pubkey::find_program_address(
            &[METADATA_SEED, metadata_program.as_ref(), mint.as_ref()],
            &metadata_program,
        );

        Self {
            program_id: *program_id,
            authority: *authority,
            mint,
            pool_state,
            presale_state: pda(&[PRESALE_STATE_SEED]),
            presale_vault: pda(&[PRESALE_VAULT_SEED]),
            user_stake_entry: pda(&[authority.as_ref()]),
            treasury_vault: get_associated_token_address(authority, &mint),
            selling_vault: get_associated_token_address(&pool_state, &mint),
            metadata,
        }
    }
}
