use anchor_client::solana_client::rpc_client::RpcClient;
use anchor_client::solana_sdk::account::from_account;
use anchor_client::solana_sdk::clock::Clock;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::signer::keypair::Keypair;
use anchor_client::solana_sdk::signer::Signer;
use anchor_client::solana_sdk::transaction::Transaction;
use anchor_lang::prelude::{Pubkey, System};
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::sysvar;
use anchor_lang::{AccountDeserialize, Id, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::metadata::Metadata;
use anchor_spl::token::Token;
use node_staking::{accounts, instruction, PoolState, PresaleState, UserStakeEntry};
use tracing::{debug, info};

use super::{PoolParams, PresaleParams, StakingLedger};
use crate::addresses::Addresses;
use crate::config::Config;
use crate::error::{OrchestratorError, Result};

/// `StakingLedger` over a Solana JSON-RPC endpoint.
///
/// The wallet pays for every transaction and signs as pool authority and
/// staking user; the vault authority co-signs `withdraw_cap` only.
pub struct RpcLedger {
    rpc: RpcClient,
    wallet: Keypair,
    vault_authority: Keypair,
    addresses: Addresses,
}

impl RpcLedger {
    pub fn connect(config: &Config) -> Result<Self> {
        let wallet = config.wallet()?;
        let vault_authority = config.vault_authority()?;
        let rpc = RpcClient::new_with_commitment(config.cluster.url().to_string(), config.commitment);
        let addresses = Addresses::derive(&config.program_id, &wallet.pubkey());

        info!(
            cluster = config.cluster.url(),
            program = %config.program_id,
            wallet = %wallet.pubkey(),
            "Connected to cluster"
        );

        Ok(Self {
            rpc,
            wallet,
            vault_authority,
            addresses,
        })
    }

    fn send(
        &self,
        name: &'static str,
        accounts: impl ToAccountMetas,
        args: impl InstructionData,
        extra_signers: &[&Keypair],
    ) -> Result<Signature> {
        let ix = Instruction {
            program_id: self.addresses.program_id,
            accounts: accounts.to_account_metas(None),
            data: args.data(),
        };

        let mut signers: Vec<&Keypair> = vec![&self.wallet];
        signers.extend_from_slice(extra_signers);

        let blockhash = self.rpc.get_latest_blockhash()?;
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&self.wallet.pubkey()),
            &signers,
            blockhash,
        );
        let signature = self.rpc.send_and_confirm_transaction(&tx)?;

        debug!(instruction = name, %signature, "Transaction confirmed");
        Ok(signature)
    }

    fn fetch<T: AccountDeserialize>(&self, address: &Pubkey) -> Result<T> {
        let data = self.rpc.get_account_data(address)?;
        T::try_deserialize(&mut data.as_slice()).map_err(|e| OrchestratorError::Decode {
            address: *address,
            reason: e.to_string(),
        })
    }
}

impl StakingLedger for RpcLedger {
    fn addresses(&self) -> &Addresses {
        &self.addresses
    }

    fn vault_authority(&self) -> Pubkey {
        self.vault_authority.pubkey()
    }

    fn now(&self) -> Result<i64> {
        let account = self.rpc.get_account(&sysvar::clock::ID)?;
        let clock: Clock = from_account(&account).ok_or_else(|| OrchestratorError::Decode {
            address: sysvar::clock::ID,
            reason: "malformed clock sysvar".to_string(),
        })?;
        Ok(clock.unix_timestamp)
    }

    fn initialize_pool(&self, params: &PoolParams) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "initialize_pool",
            accounts::InitializePool {
                pool_state: a.pool_state,
                mint: a.mint,
                treasury_vault: a.treasury_vault,
                pool_authority: a.authority,
                token_program: Token::id(),
                associated_token_program: AssociatedToken::id(),
                system_program: System::id(),
            },
            instruction::InitializePool {
                tokens_per_node: params.tokens_per_node,
                reward_per_node: params.reward_per_node,
                max_allocation: params.max_allocation,
                treasury_to_selling_bps: params.treasury_to_selling_bps,
            },
            &[],
        )
    }

    fn initialize_selling_vault(&self) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "initialize_selling_vault",
            accounts::InitializeSellingVault {
                pool_state: a.pool_state,
                mint: a.mint,
                selling_vault: a.selling_vault,
                pool_authority: a.authority,
                token_program: Token::id(),
                associated_token_program: AssociatedToken::id(),
                system_program: System::id(),
            },
            instruction::InitializeSellingVault {},
            &[],
        )
    }

    fn initialize_token(&self) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "initialize_token",
            accounts::InitializeToken {
                metadata: a.metadata,
                mint: a.mint,
                pool_authority: a.authority,
                rent: sysvar::rent::ID,
                system_program: System::id(),
                token_program: Token::id(),
                token_metadata_program: Metadata::id(),
            },
            instruction::InitializeToken {},
            &[],
        )
    }

    fn mint_tokens(&self, amount: u64) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "mint_tokens",
            accounts::MintTokens {
                mint: a.mint,
                treasury_vault: a.treasury_vault,
                pool_authority: a.authority,
                token_program: Token::id(),
            },
            instruction::MintTokens { amount },
            &[],
        )
    }

    fn initialize_presale(&self, params: &PresaleParams) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "initialize_presale",
            accounts::InitializePresale {
                presale_state: a.presale_state,
                presale_vault: a.presale_vault,
                pool_state: a.pool_state,
                pool_authority: a.authority,
                system_program: System::id(),
            },
            instruction::InitializePresale {
                price_per_node: params.price_per_node,
                max_allocation: params.max_allocation,
                presale_start_at: params.start_at,
                presale_end_at: params.end_at,
                total_presale_amount: params.total_presale_amount,
            },
            &[],
        )
    }

    fn mint_nodes(&self, amount: u64) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "mint_nodes",
            accounts::MintNodes {
                pool_state: a.pool_state,
                pool_authority: a.authority,
            },
            instruction::MintNodes { amount },
            &[],
        )
    }

    fn initialize_user_stake(&self) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "initialize_user_stake",
            accounts::InitializeUserStake {
                user_stake_entry: a.user_stake_entry,
                user: a.authority,
                system_program: System::id(),
            },
            instruction::InitializeUserStake {},
            &[],
        )
    }

    fn sell_nodes_at_presale(&self, amount: u16) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "sell_nodes_at_presale",
            accounts::SellNodesAtPresale {
                user_stake_entry: a.user_stake_entry,
                presale_vault: a.presale_vault,
                pool_state: a.pool_state,
                presale_state: a.presale_state,
                user: a.authority,
                system_program: System::id(),
            },
            instruction::SellNodesAtPresale { amount },
            &[],
        )
    }

    fn airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature> {
        let signature = self.rpc.request_airdrop(to, lamports)?;
        self.rpc.poll_for_signature(&signature)?;
        debug!(%to, lamports, %signature, "Airdrop confirmed");
        Ok(signature)
    }

    fn withdraw_cap(&self) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "withdraw_cap",
            accounts::WithdrawCap {
                presale_vault: a.presale_vault,
                withdrawer: self.vault_authority.pubkey(),
            },
            instruction::WithdrawCap {},
            &[&self.vault_authority],
        )
    }

    fn create_nodes(&self, amount: u16) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "create_nodes",
            accounts::CreateNodes {
                pool_state: a.pool_state,
                user_stake_entry: a.user_stake_entry,
                mint: a.mint,
                user_token_account: a.treasury_vault,
                treasury_vault: a.treasury_vault,
                selling_vault: a.selling_vault,
                user: a.authority,
                token_program: Token::id(),
            },
            instruction::CreateNodes { amount },
            &[],
        )
    }

    fn claim_rewards(&self) -> Result<Signature> {
        let a = &self.addresses;
        self.send(
            "claim_rewards",
            accounts::ClaimRewards {
                pool_state: a.pool_state,
                user_stake_entry: a.user_stake_entry,
                mint: a.mint,
                selling_vault: a.selling_vault,
                user_token_account: a.treasury_vault,
                user: a.authority,
                token_program: Token::id(),
                associated_token_program: AssociatedToken::id(),
                system_program: System::id(),
            },
            instruction::ClaimRewards {},
            &[],
        )
    }

    fn pool_state(&self) -> Result<PoolState> {
        self.fetch(&self.addresses.pool_state)
    }

    fn presale_state(&self) -> Result<PresaleState> {
        self.fetch(&self.addresses.presale_state)
    }

    fn user_stake_entry(&self) -> Result<UserStakeEntry> {
        self.fetch(&self.addresses.user_stake_entry)
    }

    fn token_balance(&self, account: &Pubkey) -> Result<u64> {
        let balance = self.rpc.get_token_account_balance(account)?;
        balance
            .amount
            .parse::<u64>()
            .map_err(|e| OrchestratorError::Decode {
                address: *account,
                reason: e.to_string(),
            })
    }

    fn lamports(&self, account: &Pubkey) -> Result<u64> {
        Ok(self.rpc.get_balance(account)?)
    }
}
