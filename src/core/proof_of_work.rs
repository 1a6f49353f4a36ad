use crate::core::Block;
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Highest difficulty a 256-bit hash can satisfy (64 hex zeros)
pub const MAX_DIFFICULTY: u32 = 64;

/// Attempts between cancellation polls and progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Nonce search over a fixed candidate header
///
/// The target is `2^(256 - 4 * difficulty)`; a digest below it has at least
/// `difficulty` leading hex zeros.
pub struct ProofOfWork {
    header: Vec<u8>,
    target: BigInt,
    difficulty: u32,
}

impl ProofOfWork {
    pub fn new_proof_of_work(block: &Block) -> Result<ProofOfWork> {
        let difficulty = block.get_difficulty();
        let target = Self::target_for(difficulty).ok_or_else(|| {
            BlockchainError::Mining(format!(
                "Difficulty {difficulty} is outside 1..={MAX_DIFFICULTY}"
            ))
        })?;
        Ok(ProofOfWork {
            header: block.header_prefix()?,
            target,
            difficulty,
        })
    }

    fn target_for(difficulty: u32) -> Option<BigInt> {
        if difficulty == 0 || difficulty > MAX_DIFFICULTY {
            return None;
        }
        let mut target = BigInt::from(1);
        target.shl_assign(256 - 4 * difficulty);
        Some(target)
    }

    fn meets_target(&self, digest: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, digest) < self.target
    }

    /// Validate proof-of-work for a block: stored hash is the recomputed one and meets
    /// the block's difficulty
    pub fn validate(block: &Block) -> bool {
        match block.calculate_hash() {
            Ok(hash) => hash == block.get_hash() && meets_difficulty(&hash, block.get_difficulty()),
            Err(_) => false,
        }
    }

    /// Blocking search from nonce 0 upward
    pub fn run(&self) -> Result<(u64, String)> {
        let never = AtomicBool::new(false);
        self.run_cancelable(&never, u64::MAX, &mut |_| {})?
            .ok_or_else(|| BlockchainError::Mining("Nonce search interrupted".to_string()))
    }

    /// Same search, polling `cancel` and reporting attempts every `progress_interval`.
    /// `None` means the search was canceled.
    pub fn run_cancelable(
        &self,
        cancel: &AtomicBool,
        progress_interval: u64,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Option<(u64, String)>> {
        let interval = progress_interval.max(1);
        let mut nonce: u64 = 0;
        loop {
            if nonce % interval == 0 && nonce > 0 {
                progress(nonce);
                if cancel.load(Ordering::Relaxed) {
                    debug!("Nonce search canceled after {nonce} attempts");
                    return Ok(None);
                }
            }
            let digest = Block::digest_with_nonce(&self.header, nonce);
            if self.meets_target(&digest) {
                progress(nonce + 1);
                return Ok(Some((nonce, HEXLOWER.encode(&digest))));
            }
            nonce = nonce.checked_add(1).ok_or_else(|| {
                BlockchainError::Mining(format!(
                    "Nonce space exhausted at difficulty {}",
                    self.difficulty
                ))
            })?;
        }
    }
}

/// Difficulty predicate on a lowercase hex hash
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    if difficulty == 0 || difficulty > MAX_DIFFICULTY || hash.len() < difficulty as usize {
        return false;
    }
    hash.bytes().take(difficulty as usize).all(|b| b == b'0')
}

/// Terminal state of a cancelable mining job
#[derive(Debug)]
pub enum MiningOutcome {
    Mined(Block),
    Canceled { attempts: u64 },
}

/// Seals candidate blocks, recording the elapsed search time on them
#[derive(Debug, Clone, Copy)]
pub struct PowMiner {
    progress_interval: u64,
}

impl Default for PowMiner {
    fn default() -> Self {
        PowMiner::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl PowMiner {
    pub fn new(progress_interval: u64) -> PowMiner {
        PowMiner {
            progress_interval: progress_interval.max(1),
        }
    }

    pub fn mine(&self, block: Block) -> Result<Block> {
        let never = AtomicBool::new(false);
        match self.mine_cancelable(block, &never, &mut |_| {})? {
            MiningOutcome::Mined(block) => Ok(block),
            MiningOutcome::Canceled { .. } => {
                Err(BlockchainError::Mining("Nonce search interrupted".to_string()))
            }
        }
    }

    pub fn mine_cancelable(
        &self,
        mut block: Block,
        cancel: &AtomicBool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<MiningOutcome> {
        let pow = ProofOfWork::new_proof_of_work(&block)?;
        info!(
            "Starting proof-of-work for block at height {} with difficulty {}",
            block.get_height(),
            block.get_difficulty()
        );
        let started = Instant::now();
        let mut attempts = 0;
        let result = pow.run_cancelable(cancel, self.progress_interval, &mut |count| {
            attempts = count;
            progress(count);
        })?;

        match result {
            Some((nonce, hash)) => {
                let elapsed = started.elapsed().as_millis() as u64;
                block.seal(nonce, hash, Some(elapsed));
                info!(
                    "Proof-of-work completed for block {} after {} attempts in {elapsed} ms",
                    block.get_hash(),
                    nonce + 1
                );
                Ok(MiningOutcome::Mined(block))
            }
            None => Ok(MiningOutcome::Canceled { attempts }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn candidate(difficulty: u32) -> Block {
        let coinbase = Transaction::with_timestamp("COINBASE", "miner", 50, 0, "", 7);
        Block::with_timestamp(1, 7, "00abc", vec![coinbase], difficulty, "miner")
    }

    #[test]
    fn test_mined_hash_meets_difficulty() {
        for difficulty in 1..=3 {
            let block = PowMiner::default().mine(candidate(difficulty)).unwrap();
            assert!(block.get_hash().starts_with(&"0".repeat(difficulty as usize)));
            assert!(ProofOfWork::validate(&block));
            assert!(block.get_mining_duration_ms().is_some());
        }
    }

    #[test]
    fn test_search_is_deterministic_and_minimal() {
        let first = PowMiner::default().mine(candidate(2)).unwrap();
        let second = PowMiner::default().mine(candidate(2)).unwrap();
        assert_eq!(first.get_nonce(), second.get_nonce());
        assert_eq!(first.get_hash(), second.get_hash());

        let header = candidate(2).header_prefix().unwrap();
        for nonce in 0..first.get_nonce() {
            let digest = Block::digest_with_nonce(&header, nonce);
            assert!(!meets_difficulty(&HEXLOWER.encode(&digest), 2));
        }
    }

    #[test]
    fn test_invalid_difficulty_is_rejected() {
        assert!(ProofOfWork::new_proof_of_work(&candidate(0)).is_err());
        assert!(ProofOfWork::new_proof_of_work(&candidate(65)).is_err());
        assert!(ProofOfWork::new_proof_of_work(&candidate(64)).is_ok());
    }

    #[test]
    fn test_predicate_matches_target() {
        assert!(meets_difficulty("00ff", 2));
        assert!(!meets_difficulty("0f0f", 2));
        assert!(!meets_difficulty("0000", 0));
        assert!(!meets_difficulty("00", 3));
    }

    #[test]
    fn test_preset_cancel_stops_search() {
        let cancel = AtomicBool::new(true);
        let mut reports = Vec::new();
        let outcome = PowMiner::new(1)
            .mine_cancelable(candidate(MAX_DIFFICULTY), &cancel, &mut |n| reports.push(n))
            .unwrap();
        assert!(matches!(outcome, MiningOutcome::Canceled { attempts: 1 }));
        assert_eq!(reports, vec![1]);
    }

    #[test]
    fn test_tampered_hash_fails_validation() {
        let block = PowMiner::default().mine(candidate(1)).unwrap();
        let mut tampered = block.clone();
        tampered.set_nonce(block.get_nonce() + 1);
        assert!(!ProofOfWork::validate(&tampered));
    }
}
