use crate::core::ledger::Ledger;
use crate::core::proof_of_work::meets_difficulty;
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::storage::MemoryPool;
use log::{info, warn};

/// Replays validation of a block produced elsewhere before appending it
///
/// Contract hooks are not re-run: the block is taken as an already accepted history.
#[derive(Debug, Clone, Copy)]
pub struct ConsensusAcceptor {
    purge_tolerance_ms: i64,
}

impl ConsensusAcceptor {
    pub fn new(purge_tolerance_ms: i64) -> ConsensusAcceptor {
        ConsensusAcceptor { purge_tolerance_ms }
    }

    /// Checks in order: height, linkage, hash, proof, producer signature, transactions
    pub fn check(&self, ledger: &Ledger, candidate: &Block) -> Result<()> {
        let expected = ledger.len() as u64;
        if candidate.get_height() != expected {
            return Err(BlockchainError::HeightMismatch {
                expected,
                actual: candidate.get_height(),
            });
        }
        let tip_hash = ledger.last_block().get_hash();
        if candidate.get_previous_hash() != tip_hash {
            return Err(BlockchainError::LinkageMismatch {
                expected: tip_hash.to_string(),
                actual: candidate.get_previous_hash().to_string(),
            });
        }
        let height = candidate.get_height();
        if candidate.calculate_hash()? != candidate.get_hash() {
            return Err(BlockchainError::HashMismatch { height });
        }
        if !meets_difficulty(candidate.get_hash(), candidate.get_difficulty()) {
            return Err(BlockchainError::ProofInvalid {
                height,
                difficulty: candidate.get_difficulty(),
            });
        }
        candidate.verify_producer(ledger.scheme())?;
        if let Some(index) = candidate
            .get_transactions()
            .iter()
            .position(|tx| !tx.is_valid(ledger.scheme()))
        {
            return Err(BlockchainError::TransactionInvalid { height, index });
        }
        Ok(())
    }

    /// Check, append, then drop the block's transactions from the local pool
    pub fn accept(&self, ledger: &mut Ledger, mempool: &mut MemoryPool, candidate: Block) -> Result<()> {
        if let Err(e) = self.check(ledger, &candidate) {
            warn!("Rejected block at height {}: {e}", candidate.get_height());
            return Err(e);
        }
        let included = candidate.get_transactions().to_vec();
        let hash = candidate.get_hash().to_string();
        ledger.append(candidate)?;
        let purged = mempool.purge(&included, self.purge_tolerance_ms);
        info!("Accepted external block {hash}, purged {purged} pending transactions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::ContractRegistry;
    use crate::core::{PowMiner, Transaction};
    use crate::storage::memory_pool::DEFAULT_PURGE_TOLERANCE_MS;
    use crate::testnet::test_utils::{funded_ledger, signed_transfer};
    use crate::wallet::{EcdsaP256Scheme, Wallet};

    fn acceptor() -> ConsensusAcceptor {
        ConsensusAcceptor::new(DEFAULT_PURGE_TOLERANCE_MS)
    }

    fn next_block(ledger: &Ledger, transactions: Vec<Transaction>, difficulty: u32) -> Block {
        let tip = ledger.last_block();
        let candidate =
            Block::new_candidate(tip.get_height() + 1, tip.get_hash(), transactions, difficulty, "miner")
                .unwrap();
        PowMiner::default().mine(candidate).unwrap()
    }

    #[test]
    fn test_accept_appends_and_purges() {
        let alice = Wallet::new().unwrap();
        let mut ledger = funded_ledger(&[(&alice.get_address(), 1_000)]);
        let mut mempool = MemoryPool::default();
        let tx = signed_transfer(&alice, "bob", 10, 1);
        mempool
            .admit(tx.clone(), &ledger, &mut ContractRegistry::new(), &EcdsaP256Scheme, 0)
            .unwrap();

        let block = next_block(&ledger, vec![tx], 1);
        acceptor().accept(&mut ledger, &mut mempool, block).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_check_order() {
        let alice = Wallet::new().unwrap();
        let ledger = funded_ledger(&[(&alice.get_address(), 1_000)]);
        let good = next_block(&ledger, vec![signed_transfer(&alice, "bob", 10, 1)], 1);
        assert!(acceptor().check(&ledger, &good).is_ok());

        let skipped = Block::new_candidate(2, good.get_hash(), vec![], 1, "miner").unwrap();
        assert!(matches!(
            acceptor().check(&ledger, &skipped),
            Err(BlockchainError::HeightMismatch { expected: 1, actual: 2 })
        ));

        let mut relinked = good.clone();
        relinked.set_previous_hash("00ff");
        assert!(matches!(
            acceptor().check(&ledger, &relinked),
            Err(BlockchainError::LinkageMismatch { .. })
        ));

        let mut renonced = good.clone();
        renonced.set_nonce(good.get_nonce() + 1);
        assert!(matches!(
            acceptor().check(&ledger, &renonced),
            Err(BlockchainError::HashMismatch { height: 1 })
        ));

        // Consistent hash that misses a difficulty it never claimed to meet
        let mut weak = Block::new_candidate(1, ledger.last_block().get_hash(), vec![], 1, "miner")
            .unwrap();
        let (nonce, hash) = loop {
            let hash = weak.calculate_hash().unwrap();
            if !hash.starts_with('0') {
                break (weak.get_nonce(), hash);
            }
            weak.set_nonce(weak.get_nonce() + 1);
        };
        weak.seal(nonce, hash, None);
        assert!(matches!(
            acceptor().check(&ledger, &weak),
            Err(BlockchainError::ProofInvalid { height: 1, difficulty: 1 })
        ));
    }

    #[test]
    fn test_forged_signatures_are_rejected() {
        let alice = Wallet::new().unwrap();
        let mallory = Wallet::new().unwrap();
        let ledger = funded_ledger(&[(&alice.get_address(), 1_000)]);

        let mut signed_by_other = next_block(&ledger, vec![], 1);
        signed_by_other.sign_as_producer(&mallory).unwrap();
        assert!(matches!(
            acceptor().check(&ledger, &signed_by_other),
            Err(BlockchainError::SignatureInvalid(_))
        ));

        let mut forged = Transaction::new(&alice.get_address(), "mallory", 500, 0, "").unwrap();
        forged.sign(&mallory).unwrap();
        let coinbase = Transaction::new_coinbase("miner", 1, "reward").unwrap();
        let block = next_block(&ledger, vec![coinbase, forged], 1);
        assert!(matches!(
            acceptor().check(&ledger, &block),
            Err(BlockchainError::TransactionInvalid { height: 1, index: 1 })
        ));
    }

    #[test]
    fn test_rejection_leaves_state_unchanged() {
        let alice = Wallet::new().unwrap();
        let mut ledger = funded_ledger(&[(&alice.get_address(), 1_000)]);
        let mut mempool = MemoryPool::default();
        let tx = signed_transfer(&alice, "bob", 10, 1);
        mempool
            .admit(tx.clone(), &ledger, &mut ContractRegistry::new(), &EcdsaP256Scheme, 0)
            .unwrap();

        let mut block = next_block(&ledger, vec![tx], 1);
        block.set_previous_hash("abc");
        assert!(acceptor().accept(&mut ledger, &mut mempool, block).is_err());
        assert_eq!(ledger.len(), 1);
        assert_eq!(mempool.len(), 1);
    }
}
