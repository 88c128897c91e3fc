//! Ledger backed by an in-process bank running the real program.

use std::cell::RefCell;

use anchor_client::solana_sdk::account::Account;
use anchor_client::solana_sdk::native_token::LAMPORTS_PER_SOL;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::signer::keypair::{read_keypair_file, Keypair};
use anchor_client::solana_sdk::signer::Signer;
use anchor_client::solana_sdk::system_instruction;
use anchor_client::solana_sdk::transaction::Transaction;
use anchor_lang::prelude::{AccountInfo, Clock, Pubkey, System};
use anchor_lang::solana_program::entrypoint::ProgramResult;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{AccountDeserialize, Id, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Token, TokenAccount};
use node_staking::{accounts, instruction, PoolState, PresaleState, UserStakeEntry};
use solana_program_test::{processor, ProgramTest, ProgramTestContext};
use tokio::runtime::Runtime;

use super::{PoolParams, PresaleParams, StakingLedger};
use crate::addresses::Addresses;
use crate::error::{OrchestratorError, Result};

const WALLET_LAMPORTS: u64 = 100 * LAMPORTS_PER_SOL;

// Anchor's entry ties the slice lifetime to the account lifetime
fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    data: &[u8],
) -> ProgramResult {
    let accounts = Box::leak(Box::new(accounts.to_vec()));
    node_staking::entry(program_id, accounts, data)
}

pub fn fixture(name: &str) -> Keypair {
    let path = format!(
        "{}/../programs/node-staking/tests/fixtures/{name}.json",
        env!("CARGO_MANIFEST_DIR")
    );
    read_keypair_file(&path).unwrap()
}

/// A fresh bank with `node_staking` loaded, driven synchronously.
///
/// The wallet is the pool authority; the bank's own payer acts as faucet.
pub struct BankLedger {
    runtime: Runtime,
    context: RefCell<ProgramTestContext>,
    faucet: Keypair,
    wallet: Keypair,
    vault_authority: Keypair,
    addresses: Addresses,
    calls: RefCell<Vec<&'static str>>,
}

impl BankLedger {
    pub fn new() -> Self {
        let wallet = fixture("pool_authority");
        let vault_authority = fixture("vault_authority");

        let mut program_test = ProgramTest::new(
            "node_staking",
            node_staking::ID,
            processor!(process_instruction),
        );
        program_test.add_account(
            wallet.pubkey(),
            Account::new(WALLET_LAMPORTS, 0, &System::id()),
        );

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let context = runtime.block_on(program_test.start_with_context());

        Self {
            faucet: context.payer.insecure_clone(),
            addresses: Addresses::derive(&node_staking::ID, &wallet.pubkey()),
            runtime,
            context: RefCell::new(context),
            wallet,
            vault_authority,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn advance_clock(&self, seconds: i64) {
        let context = self.context.borrow_mut();
        let mut clock: Clock = self
            .runtime
            .block_on(context.banks_client.clone().get_sysvar())
            .unwrap();
        clock.unix_timestamp += seconds;
        context.set_sysvar(&clock);
    }

    pub fn minimum_balance(&self, len: usize) -> u64 {
        let context = self.context.borrow();
        self.runtime
            .block_on(context.banks_client.clone().get_rent())
            .unwrap()
            .minimum_balance(len)
    }

    /// Transactions that landed, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn submit(
        &self,
        name: &'static str,
        ix: Instruction,
        payer: &Keypair,
        extra_signers: &[&Keypair],
    ) -> Result<Signature> {
        let rejected = |reason: String| OrchestratorError::Rejected {
            instruction: name,
            reason,
        };

        let mut signers: Vec<&Keypair> = vec![payer];
        signers.extend_from_slice(extra_signers);

        let mut context = self.context.borrow_mut();
        let (signature, outcome) = self
            .runtime
            .block_on(async {
                let blockhash = context
                    .get_new_latest_blockhash()
                    .await
                    .map_err(|e| e.to_string())?;
                let tx = Transaction::new_signed_with_payer(
                    &[ix],
                    Some(&payer.pubkey()),
                    &signers,
                    blockhash,
                );
                let signature = tx.signatures[0];
                let outcome = context
                    .banks_client
                    .process_transaction_with_metadata(tx)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok::<_, String>((signature, outcome))
            })
            .map_err(rejected)?;

        if let Err(err) = outcome.result {
            // Prefer the program's own error message over the numeric code
            let reason = outcome
                .metadata
                .into_iter()
                .flat_map(|meta| meta.log_messages)
                .find_map(|log| log.split("Error Message: ").nth(1).map(str::to_string))
                .unwrap_or_else(|| err.to_string());
            return Err(rejected(reason));
        }

        self.calls.borrow_mut().push(name);
        Ok(signature)
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
        self.submit(name, ix, &self.wallet, extra_signers)
    }

    fn account(&self, address: &Pubkey) -> Result<Account> {
        let context = self.context.borrow();
        self.runtime
            .block_on(context.banks_client.clone().get_account(*address))
            .map_err(|e| OrchestratorError::Decode {
                address: *address,
                reason: e.to_string(),
            })?
            .ok_or_else(|| OrchestratorError::Decode {
                address: *address,
                reason: "account does not exist".to_string(),
            })
    }

    fn fetch<T: AccountDeserialize>(&self, address: &Pubkey) -> Result<T> {
        let account = self.account(address)?;
        T::try_deserialize(&mut account.data.as_slice()).map_err(|e| OrchestratorError::Decode {
            address: *address,
            reason: e.to_string(),
        })
    }
}

impl StakingLedger for BankLedger {
    fn addresses(&self) -> &Addresses {
        &self.addresses
    }

    fn vault_authority(&self) -> Pubkey {
        self.vault_authority.pubkey()
    }

    fn now(&self) -> Result<i64> {
        let context = self.context.borrow();
        let clock: Clock = self
            .runtime
            .block_on(context.banks_client.clone().get_sysvar())
            .map_err(|e| OrchestratorError::Decode {
                address: anchor_lang::solana_program::sysvar::clock::ID,
                reason: e.to_string(),
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
                rent: anchor_lang::solana_program::sysvar::rent::ID,
                system_program: System::id(),
                token_program: Token::id(),
                token_metadata_program: anchor_spl::metadata::Metadata::id(),
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
        let ix = system_instruction::transfer(&self.faucet.pubkey(), to, lamports);
        self.submit("airdrop", ix, &self.faucet, &[])
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
        Ok(self.fetch::<TokenAccount>(account)?.amount)
    }

    fn lamports(&self, account: &Pubkey) -> Result<u64> {
        Ok(self.account(account).map(|a| a.lamports).unwrap_or(0))
    }
}
