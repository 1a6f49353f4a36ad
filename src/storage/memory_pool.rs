use crate::core::contracts::ContractRegistry;
use crate::core::ledger::BalanceOracle;
use crate::core::monetary::conversions::format_balance;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::wallet::SignatureScheme;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Default number of pending transactions held
pub const DEFAULT_MEMPOOL_CAPACITY: usize = 1_000;

/// Window within which two otherwise identical transfers are the same one
pub const DEFAULT_PURGE_TOLERANCE_MS: i64 = 1_000;

struct PendingEntry {
    tx: Transaction,
    sequence: u64, // arrival order
}

/// ( K -> txid_hex, V => Transaction )
pub struct MemoryPool {
    entries: HashMap<String, PendingEntry>,
    capacity: usize,
    next_sequence: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeStatistics {
    pub mempool_size: usize,
    pub capacity: usize,
    pub min_fee: u64,
    pub max_fee: u64,
    pub mean_fee: f64,
}

impl fmt::Display for FeeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fee Statistics:")?;
        writeln!(
            f,
            "  Mempool Size: {}/{} transactions",
            self.mempool_size, self.capacity
        )?;
        writeln!(f, "  Min Fee: {}", format_balance(self.min_fee as i64))?;
        writeln!(f, "  Max Fee: {}", format_balance(self.max_fee as i64))?;
        write!(f, "  Mean Fee: {:.0} base units", self.mean_fee)
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new(DEFAULT_MEMPOOL_CAPACITY)
    }
}

impl MemoryPool {
    pub fn new(capacity: usize) -> MemoryPool {
        MemoryPool {
            entries: HashMap::new(),
            capacity,
            next_sequence: 0,
        }
    }

    fn check_well_formed(tx: &Transaction) -> Result<()> {
        if tx.get_from().is_empty() || tx.get_to().is_empty() {
            return Err(BlockchainError::MalformedTransaction(
                "Sender and receiver addresses are required".to_string(),
            ));
        }
        if tx.get_amount() == 0 {
            return Err(BlockchainError::MalformedTransaction(
                "Amount must be positive".to_string(),
            ));
        }
        if tx.get_amount().checked_add(tx.get_fee()).map_or(true, |total| total > i64::MAX as u64)
        {
            return Err(BlockchainError::MalformedTransaction(format!(
                "Amount {} plus fee {} is out of range",
                tx.get_amount(),
                tx.get_fee()
            )));
        }
        Ok(())
    }

    /// Admission pipeline; every check precedes any mutation of the pool or the
    /// contracts. Returns the transaction id.
    pub fn admit(
        &mut self,
        tx: Transaction,
        balances: &dyn BalanceOracle,
        contracts: &mut ContractRegistry,
        scheme: &dyn SignatureScheme,
        current_height: u64,
    ) -> Result<String> {
        Self::check_well_formed(&tx)?;
        let txid = tx.id()?;
        if self.entries.contains_key(&txid) {
            return Err(BlockchainError::DuplicateTransaction(txid));
        }
        if self.entries.len() >= self.capacity {
            return Err(BlockchainError::MempoolFull {
                capacity: self.capacity,
            });
        }
        tx.verify(scheme)?;
        if !tx.is_reward() {
            let available = balances.balance_of(tx.get_from());
            // check_well_formed bounds the total below i64::MAX
            let required = tx.total_cost();
            if available < required as i64 {
                return Err(BlockchainError::InsufficientBalance {
                    address: tx.get_from().to_string(),
                    required,
                    available,
                });
            }
        }
        contracts.validate(&tx, current_height)?;

        contracts.apply(&tx, current_height);
        debug!(
            "Admitted transaction {txid} from {} to {} (amount {}, fee {})",
            tx.get_from(),
            tx.get_to(),
            tx.get_amount(),
            tx.get_fee()
        );
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries
            .insert(txid.clone(), PendingEntry { tx, sequence });
        Ok(txid)
    }

    /// Highest fee first, earlier arrival breaking ties; `None` selects everything
    pub fn select_for_block(&self, limit: Option<usize>) -> Vec<Transaction> {
        let mut pending: Vec<&PendingEntry> = self.entries.values().collect();
        pending.sort_by(|a, b| {
            b.tx.get_fee()
                .cmp(&a.tx.get_fee())
                .then(a.sequence.cmp(&b.sequence))
        });
        pending
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|entry| entry.tx.clone())
            .collect()
    }

    /// Drop pending entries confirmed by `included`, matched by id or by content within
    /// `tolerance_ms`. Returns how many were removed.
    pub fn purge(&mut self, included: &[Transaction], tolerance_ms: i64) -> usize {
        let included_ids: Vec<String> = included.iter().filter_map(|tx| tx.id().ok()).collect();
        let before = self.entries.len();
        self.entries.retain(|txid, entry| {
            !included_ids.contains(txid)
                && !included
                    .iter()
                    .any(|confirmed| confirmed.matches(&entry.tx, tolerance_ms))
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Purged {removed} confirmed transactions from the mempool");
        }
        removed
    }

    /// Net effect of pending transactions on `address`
    pub fn pending_delta(&self, address: &str) -> i64 {
        self.entries.values().fold(0i64, |delta, entry| {
            let tx = &entry.tx;
            let mut delta = delta;
            if tx.get_from() == address && !tx.is_reward() {
                delta = delta.saturating_sub(tx.total_cost() as i64);
            }
            if tx.get_to() == address {
                delta = delta.saturating_add(tx.get_amount() as i64);
            }
            delta
        })
    }

    pub fn fee_statistics(&self) -> FeeStatistics {
        let fees: Vec<u64> = self.entries.values().map(|e| e.tx.get_fee()).collect();
        let mean_fee = if fees.is_empty() {
            0.0
        } else {
            fees.iter().map(|&fee| fee as f64).sum::<f64>() / fees.len() as f64
        };
        FeeStatistics {
            mempool_size: fees.len(),
            capacity: self.capacity,
            min_fee: fees.iter().copied().min().unwrap_or(0),
            max_fee: fees.iter().copied().max().unwrap_or(0),
            mean_fee,
        }
    }

    pub fn get(&self, txid: &str) -> Option<Transaction> {
        self.entries.get(txid).map(|entry| entry.tx.clone())
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.entries.contains_key(txid)
    }

    pub fn remove(&mut self, txids: &[String]) {
        for txid in txids {
            self.entries.remove(txid);
        }
    }

    /// Pending transactions in arrival order
    pub fn get_all(&self) -> Vec<Transaction> {
        let mut pending: Vec<&PendingEntry> = self.entries.values().collect();
        pending.sort_by_key(|entry| entry.sequence);
        pending.into_iter().map(|entry| entry.tx.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
