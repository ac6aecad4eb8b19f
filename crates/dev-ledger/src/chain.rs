//! In-process development chain.

use crate::config::ChainConfig;
use alloy::consensus::{Header as ConsensusHeader, Receipt, ReceiptEnvelope, ReceiptWithBloom};
use alloy::primitives::{keccak256, Address, Bloom, Bytes, TxKind, B256, U256};
use alloy::rpc::types::{Block, BlockTransactions, Header, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use chrono::Utc;
use identity_registry::{CallContext, Execution, RegistryContract, Reverted};
use ledger_client::{Ledger, LedgerError, WaitOptions};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Gas charged for every transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Extra gas for a contract creation.
pub const CREATE_GAS: u64 = 32_000;
/// Gas per byte of deployed bytecode.
pub const CODE_DEPOSIT_GAS_PER_BYTE: u64 = 200;
/// Gas per registry record written.
pub const RECORD_WRITE_GAS: u64 = 20_000;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Gas for a transaction's calldata: 16 per non-zero byte, 4 per zero byte.
pub fn calldata_gas(data: &[u8]) -> u64 {
    data.iter().map(|b| if *b == 0 { 4 } else { 16 }).sum()
}

/// A contract hosted by the chain.
#[derive(Debug, Clone)]
struct Deployed {
    contract: RegistryContract,
    bytecode: Bytes,
}

#[derive(Debug)]
struct ChainState {
    /// Genesis first; the last entry is the head.
    blocks: Vec<Block>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, Deployed>,
    receipts: HashMap<B256, TransactionReceipt>,
}

impl ChainState {
    fn head(&self) -> &Block {
        // Genesis is inserted at construction and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    fn block_number(&self) -> u64 {
        self.head().header.number
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }
}

/// Result of running a transaction against the current state, before commit.
struct Outcome {
    gas_used: u64,
    execution: Option<Execution>,
    contract_address: Option<Address>,
}

/// A disposable ledger that mines one block per transaction.
///
/// Every account listed by [`DevLedger::accounts`] is unlocked. All state
/// changes go through a single lock, so submissions are totally ordered and
/// either fully applied or rejected without effect.
#[derive(Debug)]
pub struct DevLedger {
    config: ChainConfig,
    accounts: Vec<Address>,
    state: Mutex<ChainState>,
}

impl DevLedger {
    /// Create a chain with pre-funded accounts and an empty state.
    pub fn new(config: ChainConfig) -> Self {
        let accounts = derive_accounts(&config.seed, config.accounts);
        let funding = U256::from(config.initial_balance_eth) * U256::from(WEI_PER_ETHER);
        let genesis = mine_block(&config, B256::ZERO, 0, 0, Vec::new());

        let state = ChainState {
            blocks: vec![genesis],
            balances: accounts.iter().map(|a| (*a, funding)).collect(),
            nonces: HashMap::new(),
            contracts: HashMap::new(),
            receipts: HashMap::new(),
        };

        info!(
            chain_id = config.chain_id,
            accounts = accounts.len(),
            "Development ledger ready"
        );

        Self {
            config,
            accounts,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Bytecode recorded for a deployed contract.
    pub async fn code(&self, address: Address) -> Option<Bytes> {
        let state = self.state.lock().await;
        state.contracts.get(&address).map(|d| d.bytecode.clone())
    }

    /// Number of records held by the registry deployed at `address`.
    pub async fn registry_size(&self, address: Address) -> Option<u64> {
        let state = self.state.lock().await;
        state
            .contracts
            .get(&address)
            .map(|d| d.contract.registry().record_count())
    }

    /// Receipt of a mined transaction.
    pub async fn transaction_receipt(&self, hash: B256) -> Option<TransactionReceipt> {
        let state = self.state.lock().await;
        state.receipts.get(&hash).cloned()
    }

    /// Block at `number`, or the head when `number` is `None`.
    pub async fn block(&self, number: Option<u64>) -> Option<Block> {
        let state = self.state.lock().await;
        match number {
            Some(n) => usize::try_from(n).ok().and_then(|i| state.blocks.get(i)).cloned(),
            None => Some(state.head().clone()),
        }
    }

    fn context(&self, state: &ChainState, sender: Address) -> CallContext {
        CallContext::new(sender, state.block_number() + 1, Utc::now())
    }

    /// Dry-run `tx` against `state` and price it.
    fn evaluate(
        &self,
        state: &ChainState,
        tx: &TransactionRequest,
    ) -> Result<Outcome, LedgerError> {
        let from = tx.from.unwrap_or_default();
        let input = calldata(tx);
        let mut gas_used = TX_BASE_GAS + calldata_gas(input);

        match tx.to {
            None | Some(TxKind::Create) => {
                if input.is_empty() {
                    return Err(LedgerError::Reverted("contract creation without bytecode".into()));
                }
                gas_used += CREATE_GAS + CODE_DEPOSIT_GAS_PER_BYTE * input.len() as u64;
                Ok(Outcome {
                    gas_used,
                    execution: None,
                    contract_address: Some(from.create(state.nonce(&from))),
                })
            }
            Some(TxKind::Call(to)) => match state.contracts.get(&to) {
                Some(deployed) => {
                    let ctx = self.context(state, from);
                    let execution = deployed
                        .contract
                        .simulate(&ctx, input)
                        .map_err(reverted)?;
                    gas_used += RECORD_WRITE_GAS * u64::from(execution.records_written);
                    Ok(Outcome {
                        gas_used,
                        execution: Some(execution),
                        contract_address: None,
                    })
                }
                None => Ok(Outcome {
                    gas_used,
                    execution: None,
                    contract_address: None,
                }),
            },
        }
    }

    /// Validate, apply and mine `tx` in a block of its own.
    ///
    /// Returns the transaction hash. A rejected transaction leaves balances,
    /// nonces, contracts and the block height untouched.
    pub async fn submit(&self, tx: TransactionRequest) -> Result<B256, LedgerError> {
        let from = tx.from.ok_or_else(|| LedgerError::Rpc {
            code: -32000,
            message: "from not specified".into(),
        })?;
        if !self.accounts.contains(&from) {
            return Err(LedgerError::UnknownAccount(from));
        }
        if let Some(chain_id) = tx.chain_id.filter(|id| *id != self.config.chain_id) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!(
                    "invalid chain id: {} (expected {})",
                    chain_id, self.config.chain_id
                ),
            });
        }

        let mut state = self.state.lock().await;

        let nonce = state.nonce(&from);
        if let Some(given) = tx.nonce.filter(|n| *n != nonce) {
            let relation = if given < nonce { "too low" } else { "too high" };
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!("nonce {}: got {}, expected {}", relation, given, nonce),
            });
        }

        let outcome = match self.evaluate(&state, &tx) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%from, error = %e, "Transaction rejected");
                return Err(e);
            }
        };

        let gas_limit = tx.gas.unwrap_or(outcome.gas_used);
        if gas_limit > self.config.block_gas_limit {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: format!(
                    "exceeds block gas limit: {} > {}",
                    gas_limit, self.config.block_gas_limit
                ),
            });
        }
        if outcome.gas_used > gas_limit {
            return Err(LedgerError::Reverted("out of gas".into()));
        }

        let gas_price = tx.gas_price.unwrap_or(u128::from(self.config.gas_price));
        let value = tx.value.unwrap_or_default();
        let recipient = match tx.to {
            Some(TxKind::Call(to)) => Some(to),
            _ => None,
        };
        let available = state.balance(&from);
        // An overflowing cost can never be paid.
        let required = U256::from(gas_limit)
            .checked_mul(U256::from(gas_price))
            .and_then(|max_fee| max_fee.checked_add(value))
            .unwrap_or(U256::MAX);
        if available < required {
            return Err(LedgerError::InsufficientFunds {
                required,
                available,
            });
        }

        let fee = U256::from(outcome.gas_used) * U256::from(gas_price);
        let sender_balance = available
            .checked_sub(fee)
            .and_then(|rest| rest.checked_sub(value))
            .ok_or(LedgerError::InsufficientFunds {
                required,
                available,
            })?;
        let recipient_balance = match recipient {
            Some(to) if to != from => {
                let credited = state.balance(&to).checked_add(value).ok_or_else(|| {
                    LedgerError::Rpc {
                        code: -32000,
                        message: format!("balance overflow for {}", to),
                    }
                })?;
                Some((to, credited))
            }
            _ => None,
        };

        // Commit. The simulation above already accepted the call.
        let block_number = state.block_number() + 1;
        let ctx = CallContext::new(from, block_number, Utc::now());

        if let Some(address) = outcome.contract_address {
            state.contracts.insert(
                address,
                Deployed {
                    contract: RegistryContract::new(),
                    bytecode: Bytes::copy_from_slice(calldata(&tx)),
                },
            );
            info!(%address, block = block_number, "Contract deployed");
        } else if let (Some(to), Some(_)) = (recipient, outcome.execution.as_ref()) {
            if let Some(deployed) = state.contracts.get_mut(&to) {
                deployed.contract.execute(&ctx, calldata(&tx)).map_err(reverted)?;
            }
        }

        match recipient_balance {
            Some((to, credited)) => {
                state.balances.insert(from, sender_balance);
                state.balances.insert(to, credited);
            }
            // A self-transfer only pays the fee.
            None if recipient == Some(from) => {
                state.balances.insert(from, available - fee);
            }
            None => {
                state.balances.insert(from, sender_balance);
            }
        }
        state.nonces.insert(from, nonce + 1);

        let hash = transaction_hash(self.config.chain_id, from, nonce, calldata(&tx));
        let parent_hash = state.head().header.hash;
        let block = mine_block(
            &self.config,
            parent_hash,
            block_number,
            outcome.gas_used,
            vec![hash],
        );
        let receipt = TransactionReceipt {
            inner: ReceiptEnvelope::Legacy(ReceiptWithBloom::new(
                Receipt {
                    status: true.into(),
                    cumulative_gas_used: outcome.gas_used,
                    logs: Vec::new(),
                },
                Bloom::default(),
            )),
            transaction_hash: hash,
            transaction_index: Some(0),
            block_hash: Some(block.header.hash),
            block_number: Some(block_number),
            gas_used: outcome.gas_used,
            effective_gas_price: gas_price,
            blob_gas_used: None,
            blob_gas_price: None,
            from,
            to: recipient,
            contract_address: outcome.contract_address,
        };
        state.receipts.insert(hash, receipt);
        state.blocks.push(block);

        debug!(tx = %hash, block = block_number, gas_used = outcome.gas_used, "Block mined");
        Ok(hash)
    }
}

impl Default for DevLedger {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

fn reverted(r: Reverted) -> LedgerError {
    LedgerError::Reverted(r.reason)
}

fn calldata(tx: &TransactionRequest) -> &[u8] {
    tx.input.input().map(|data| &data[..]).unwrap_or_default()
}

/// Deterministic account addresses for a seed.
fn derive_accounts(seed: &str, count: usize) -> Vec<Address> {
    (0..count)
        .map(|index| Address::from_word(keccak256(format!("{}/{}", seed, index))))
        .collect()
}

fn transaction_hash(chain_id: u64, from: Address, nonce: u64, input: &[u8]) -> B256 {
    let mut preimage = Vec::with_capacity(8 + 20 + 8 + input.len());
    preimage.extend_from_slice(&chain_id.to_be_bytes());
    preimage.extend_from_slice(from.as_slice());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    preimage.extend_from_slice(input);
    keccak256(preimage)
}

fn mine_block(
    config: &ChainConfig,
    parent_hash: B256,
    number: u64,
    gas_used: u64,
    transactions: Vec<B256>,
) -> Block {
    let header = ConsensusHeader {
        parent_hash,
        number,
        gas_limit: config.block_gas_limit,
        gas_used,
        timestamp: u64::try_from(Utc::now().timestamp()).unwrap_or_default(),
        ..Default::default()
    };
    Block::new(Header::new(header), BlockTransactions::Hashes(transactions))
}

#[async_trait]
impl Ledger for DevLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.config.chain_id)
    }

    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.accounts.clone())
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        Ok(self.state.lock().await.balance(&address))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.state.lock().await.nonce(&address))
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().await.block_number())
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(u128::from(self.config.gas_price))
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        let outcome = self.evaluate(&state, tx)?;
        Ok(outcome.gas_used)
    }

    /// Blocks are only mined by transactions, so the inclusion block is final
    /// and further confirmations are not awaited.
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        wait: WaitOptions,
    ) -> Result<TransactionReceipt, LedgerError> {
        let hash = self.submit(tx).await?;
        debug!(tx = %hash, confirmations = wait.confirmations, "Instamined");
        self.transaction_receipt(hash)
            .await
            .ok_or_else(|| LedgerError::InvalidResponse(format!("no receipt for {}", hash)))
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes, LedgerError> {
        let state = self.state.lock().await;
        let outcome = self.evaluate(&state, tx)?;
        Ok(outcome
            .execution
            .map(|e| e.output)
            .unwrap_or_default())
    }
}
