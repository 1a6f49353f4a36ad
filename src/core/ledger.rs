//! Append-only chain of blocks plus the balance table derived from it.
//!
//! Balances are folded from every transaction in chain order: the sender is debited
//! `amount + fee` unless it is a reward sentinel, the receiver is credited `amount`.
//! The table is maintained incrementally on [`Ledger::append`]; [`Ledger::recompute_balances`]
//! is the from-scratch reference fold.

use crate::core::block::GENESIS_PREVIOUS_HASH;
use crate::core::monetary::is_reward_sentinel;
use crate::core::proof_of_work::meets_difficulty;
use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::wallet::SignatureScheme;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

/// Confirmed balance lookup used by mempool admission
pub trait BalanceOracle {
    fn balance_of(&self, address: &str) -> i64;
}

/// A confirmed transaction together with the height of its block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub height: u64,
    pub transaction: Transaction,
}

pub struct Ledger {
    blocks: Vec<Block>,
    balances: HashMap<String, i64>,
    scheme: Arc<dyn SignatureScheme>,
}

fn signed_amount(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        BlockchainError::MalformedTransaction(format!("Amount {value} exceeds the balance range"))
    })
}

/// Fold one transaction into `balances`
fn apply_transaction(balances: &mut HashMap<String, i64>, tx: &Transaction) -> Result<()> {
    let overflow =
        || BlockchainError::MalformedTransaction("Balance arithmetic overflow".to_string());
    if !tx.is_reward() {
        let cost = signed_amount(tx.total_cost())?;
        let sender = balances.entry(tx.get_from().to_string()).or_insert(0);
        *sender = sender.checked_sub(cost).ok_or_else(overflow)?;
    }
    let credit = signed_amount(tx.get_amount())?;
    let receiver = balances.entry(tx.get_to().to_string()).or_insert(0);
    *receiver = receiver.checked_add(credit).ok_or_else(overflow)?;
    Ok(())
}

#[allow(clippy::len_without_is_empty)]
impl Ledger {
    /// Start a chain from its genesis block
    pub fn new(genesis: Block, scheme: Arc<dyn SignatureScheme>) -> Result<Ledger> {
        if genesis.get_height() != 0 || genesis.get_previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(BlockchainError::ChainLinkageError(format!(
                "Genesis block must have height 0 and previous hash \"{GENESIS_PREVIOUS_HASH}\""
            )));
        }
        let mut balances = HashMap::new();
        for tx in genesis.get_transactions() {
            apply_transaction(&mut balances, tx)?;
        }
        info!("Ledger initialized with genesis block {}", genesis.get_hash());
        Ok(Ledger {
            blocks: vec![genesis],
            balances,
            scheme,
        })
    }

    /// Rebuild from persisted blocks; anything that is not a valid chain is corrupted state
    pub fn from_blocks(blocks: Vec<Block>, scheme: Arc<dyn SignatureScheme>) -> Result<Ledger> {
        let corrupted = |e: BlockchainError| BlockchainError::CorruptedState(e.to_string());
        let mut iter = blocks.into_iter();
        let genesis = iter
            .next()
            .ok_or_else(|| BlockchainError::CorruptedState("Snapshot holds no blocks".to_string()))?;
        let mut ledger = Ledger::new(genesis, scheme).map_err(corrupted)?;
        for block in iter {
            ledger.append(block).map_err(corrupted)?;
        }
        ledger.validate().map_err(corrupted)?;
        if ledger.recompute_balances()? != ledger.balances {
            return Err(BlockchainError::CorruptedState(
                "Cached balances diverge from the chain".to_string(),
            ));
        }
        Ok(ledger)
    }

    /// Link and balance checks, then commit. Nothing is mutated on failure.
    pub fn append(&mut self, block: Block) -> Result<()> {
        let expected_height = self.blocks.len() as u64;
        if block.get_height() != expected_height {
            return Err(BlockchainError::ChainLinkageError(format!(
                "Block height {} does not follow tip, expected {expected_height}",
                block.get_height()
            )));
        }
        let tip_hash = self.last_block().get_hash();
        if block.get_previous_hash() != tip_hash {
            return Err(BlockchainError::ChainLinkageError(format!(
                "Block {} links to {}, tip is {tip_hash}",
                block.get_height(),
                block.get_previous_hash()
            )));
        }

        // Only touched addresses are staged
        let mut staged: HashMap<String, i64> = HashMap::new();
        for tx in block.get_transactions() {
            let mut touched = vec![tx.get_to()];
            if !tx.is_reward() {
                touched.push(tx.get_from());
            }
            for address in touched {
                if !staged.contains_key(address) {
                    staged.insert(address.to_string(), self.balance_of(address));
                }
            }
            apply_transaction(&mut staged, tx)?;
        }
        if let Some((address, balance)) = staged
            .iter()
            .find(|(address, balance)| **balance < 0 && !is_reward_sentinel(address))
        {
            return Err(BlockchainError::NegativeBalance {
                address: address.clone(),
                balance: *balance,
            });
        }

        self.balances.extend(staged);
        info!(
            "Appended block {} at height {} ({} transactions)",
            block.get_hash(),
            block.get_height(),
            block.get_transactions().len()
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Full audit; the first failure is reported
    pub fn validate(&self) -> Result<()> {
        let genesis = &self.blocks[0];
        if genesis.get_height() != 0 || genesis.get_previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(BlockchainError::ChainLinkageError(
                "Malformed genesis block".to_string(),
            ));
        }
        for pair in self.blocks.windows(2) {
            let (previous, block) = (&pair[0], &pair[1]);
            let height = block.get_height();
            if height != previous.get_height() + 1 {
                return Err(BlockchainError::HeightMismatch {
                    expected: previous.get_height() + 1,
                    actual: height,
                });
            }
            if block.get_previous_hash() != previous.get_hash() {
                return Err(BlockchainError::LinkageMismatch {
                    expected: previous.get_hash().to_string(),
                    actual: block.get_previous_hash().to_string(),
                });
            }
            if block.calculate_hash()? != block.get_hash() {
                return Err(BlockchainError::HashMismatch { height });
            }
            if !meets_difficulty(block.get_hash(), block.get_difficulty()) {
                return Err(BlockchainError::ProofInvalid {
                    height,
                    difficulty: block.get_difficulty(),
                });
            }
            block.verify_producer(self.scheme.as_ref())?;
            if let Some(index) = block
                .get_transactions()
                .iter()
                .position(|tx| !tx.is_valid(self.scheme.as_ref()))
            {
                return Err(BlockchainError::TransactionInvalid { height, index });
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Reference fold over the whole chain
    pub fn recompute_balances(&self) -> Result<HashMap<String, i64>> {
        let mut balances = HashMap::new();
        for tx in self.blocks.iter().flat_map(Block::get_transactions) {
            apply_transaction(&mut balances, tx)?;
        }
        Ok(balances)
    }

    /// Blocks on top of (and including) the one at `height`; 0 above the tip
    pub fn confirmations(&self, height: u64) -> u64 {
        let tip = self.tip_height();
        if height > tip {
            0
        } else {
            tip - height + 1
        }
    }

    pub fn history(&self, address: &str) -> Vec<HistoryEntry> {
        self.blocks
            .iter()
            .flat_map(|block| {
                block
                    .get_transactions()
                    .iter()
                    .filter(|tx| tx.get_from() == address || tx.get_to() == address)
                    .map(|tx| HistoryEntry {
                        height: block.get_height(),
                        transaction: tx.clone(),
                    })
            })
            .collect()
    }

    /// Addresses with a balance entry, sentinels excluded
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .balances
            .keys()
            .filter(|address| !is_reward_sentinel(address))
            .cloned()
            .collect();
        addresses.sort();
        addresses
    }

    pub fn recent_blocks(&self, count: usize) -> &[Block] {
        &self.blocks[self.blocks.len().saturating_sub(count)..]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> &Block {
        // A ledger always holds its genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_height(&self) -> u64 {
        self.last_block().get_height()
    }

    /// Number of blocks; at least 1 since genesis is always present
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn scheme(&self) -> &dyn SignatureScheme {
        self.scheme.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

impl BalanceOracle for Ledger {
    fn balance_of(&self, address: &str) -> i64 {
        self.balances.get(address).copied().unwrap_or(0)
    }
}
