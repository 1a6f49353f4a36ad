//! One engine instance: ledger, mempool, contracts and difficulty behind a single lock,
//! plus at most one background mining job.
//!
//! The nonce search runs without the state lock. A candidate is assembled under the
//! lock, searched on a worker thread, and the lock is taken again only to append. If
//! the tip moved in the meantime the append fails and nothing is committed.

use crate::config::Config;
use crate::core::contracts::{Contract, ContractRegistry, ContractReport};
use crate::core::ledger::{BalanceOracle, HistoryEntry, Ledger};
use crate::core::monetary::is_reward_sentinel;
use crate::core::{
    Block, ConsensusAcceptor, DifficultyController, MiningOutcome, PowMiner, Transaction,
};
use crate::error::{BlockchainError, Result};
use crate::storage::{FeeStatistics, MemoryPool, Snapshot};
use crate::wallet::{EcdsaP256Scheme, SignatureScheme, Wallet, Wallets};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use uuid::Uuid;

/// Everything guarded by the node's single lock
pub struct NodeState {
    pub ledger: Ledger,
    pub mempool: MemoryPool,
    pub contracts: ContractRegistry,
    pub difficulty: DifficultyController,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningStatus {
    NotStarted,
    InProgress,
    Completed,
    Canceled,
}

/// Snapshot of the current or last mining job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningState {
    pub status: MiningStatus,
    pub attempts: u64,
    pub elapsed_ms: u64,
    pub block_hash: Option<String>,
    pub last_error: Option<String>,
    pub job_id: Option<Uuid>,
}

impl Default for MiningState {
    fn default() -> Self {
        MiningState {
            status: MiningStatus::NotStarted,
            attempts: 0,
            elapsed_ms: 0,
            block_hash: None,
            last_error: None,
            job_id: None,
        }
    }
}

#[derive(Default)]
struct MiningControl {
    cancel: AtomicBool,
    attempts: AtomicU64,
    state: Mutex<MiningState>,
    started: Mutex<Option<Instant>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MiningControl {
    // Status reads never fail; a poisoned lock still holds the last written state
    fn state(&self) -> MutexGuard<'_, MiningState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn elapsed_ms(&self) -> u64 {
        let started = self.started.lock().unwrap_or_else(|p| p.into_inner());
        started.map_or(0, |instant| instant.elapsed().as_millis() as u64)
    }

    fn finish(&self, status: MiningStatus, block_hash: Option<String>, last_error: Option<String>) {
        let elapsed_ms = self.elapsed_ms();
        let mut state = self.state();
        state.status = status;
        state.attempts = self.attempts.load(Ordering::Relaxed);
        state.elapsed_ms = elapsed_ms;
        state.block_hash = block_hash;
        state.last_error = last_error;
    }
}

#[derive(Clone)]
pub struct Node {
    id: String,
    config: Arc<Config>,
    state: Arc<Mutex<NodeState>>,
    wallets: Arc<Mutex<Wallets>>,
    scheme: Arc<dyn SignatureScheme>,
    miner: PowMiner,
    acceptor: ConsensusAcceptor,
    snapshot: Option<Arc<Snapshot>>,
    mining: Arc<MiningControl>,
}

impl Node {
    /// ECDSA P-256 node with an empty keystore
    pub fn new(id: &str, config: Config) -> Result<Node> {
        Self::with_parts(id, config, Wallets::new(), Arc::new(EcdsaP256Scheme))
    }

    pub fn with_parts(
        id: &str,
        config: Config,
        wallets: Wallets,
        scheme: Arc<dyn SignatureScheme>,
    ) -> Result<Node> {
        config.validate()?;
        let difficulty = DifficultyController::from_config(&config)?;
        let snapshot = config.snapshot_path.as_ref().map(Snapshot::new);

        let persisted = match &snapshot {
            Some(snapshot) => snapshot.load()?,
            None => None,
        };
        let ledger = match persisted {
            Some(blocks) => Ledger::from_blocks(blocks, scheme.clone())?,
            None => {
                let genesis = Block::generate_genesis_block(
                    &config.allocations(),
                    config.initial_difficulty,
                )?;
                let ledger = Ledger::new(genesis, scheme.clone())?;
                if let Some(snapshot) = &snapshot {
                    snapshot.save(ledger.blocks())?;
                }
                ledger
            }
        };
        info!(
            "Node {id} ready at height {} (difficulty {})",
            ledger.tip_height(),
            difficulty.get_difficulty()
        );

        Ok(Node {
            id: id.to_string(),
            miner: PowMiner::new(config.progress_interval),
            acceptor: ConsensusAcceptor::new(config.purge_tolerance_ms),
            state: Arc::new(Mutex::new(NodeState {
                ledger,
                mempool: MemoryPool::new(config.mempool_capacity),
                contracts: ContractRegistry::new(),
                difficulty,
            })),
            config: Arc::new(config),
            wallets: Arc::new(Mutex::new(wallets)),
            scheme,
            snapshot: snapshot.map(Arc::new),
            mining: Arc::new(MiningControl::default()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, NodeState>> {
        self.state
            .lock()
            .map_err(|_| BlockchainError::LockPoisoned(format!("Node {} state", self.id)))
    }

    fn lock_wallets(&self) -> Result<MutexGuard<'_, Wallets>> {
        self.wallets
            .lock()
            .map_err(|_| BlockchainError::LockPoisoned(format!("Node {} keystore", self.id)))
    }

    fn persist(&self, ledger: &Ledger) {
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(ledger.blocks()) {
                error!("Failed to write snapshot {:?}: {e}", snapshot.path());
            }
        }
    }

    // ---- transactions ----

    /// Build, sign with the keystore and admit a transfer. Returns the transaction id.
    pub fn submit_transaction(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        fee: u64,
        note: &str,
    ) -> Result<String> {
        let mut tx = Transaction::new(from, to, amount, fee, note)?;
        if !is_reward_sentinel(from) {
            let wallets = self.lock_wallets()?;
            let wallet = wallets
                .get_wallet(from)
                .ok_or_else(|| BlockchainError::Wallet(format!("No key for {from} in keystore")))?;
            tx.sign(wallet)?;
        }
        self.submit_signed(tx)
    }

    /// Admit a transaction signed by the caller
    pub fn submit_signed(&self, tx: Transaction) -> Result<String> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        let height = state.ledger.tip_height();
        let result = state.mempool.admit(
            tx,
            &state.ledger,
            &mut state.contracts,
            self.scheme.as_ref(),
            height,
        );
        if let Err(e) = &result {
            debug!("Node {} rejected transaction: {e}", self.id);
        }
        result
    }

    // ---- mining ----

    /// Coinbase plus pending transfers that keep every sender solvent. Pending entries
    /// that would overdraw are left in the mempool for a later block.
    fn prepare_candidate(&self, miner: &str) -> Result<Block> {
        if miner.is_empty() {
            return Err(BlockchainError::Mining("Miner address is required".to_string()));
        }
        let state = self.lock_state()?;
        let height = state.ledger.len() as u64;

        let mut tally: HashMap<String, i64> = HashMap::new();
        let mut included = Vec::new();
        for tx in state.mempool.select_for_block(self.config.block_tx_limit) {
            if tx.is_reward() {
                included.push(tx);
                continue;
            }
            let cost = tx.total_cost() as i64;
            let available = *tally
                .entry(tx.get_from().to_string())
                .or_insert_with(|| state.ledger.balance_of(tx.get_from()));
            if available < cost {
                warn!(
                    "Skipping transaction from {} that would overdraw ({} available, {cost} required)",
                    tx.get_from(),
                    available
                );
                continue;
            }
            tally.insert(tx.get_from().to_string(), available - cost);
            let credited = tally
                .entry(tx.get_to().to_string())
                .or_insert_with(|| state.ledger.balance_of(tx.get_to()));
            *credited = credited.saturating_add(tx.get_amount() as i64);
            included.push(tx);
        }

        let fees = included
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.get_fee()));
        let reward = state.difficulty.reward_for_height(height);
        let coinbase =
            Transaction::new_coinbase(miner, reward.saturating_add(fees), "Block reward")?;

        let mut transactions = Vec::with_capacity(included.len() + 1);
        transactions.push(coinbase);
        transactions.extend(included);
        Block::new_candidate(
            height,
            state.ledger.last_block().get_hash(),
            transactions,
            state.difficulty.get_difficulty(),
            miner,
        )
    }

    /// Sign as producer when the keystore holds the miner key, then append
    fn commit_mined(&self, mut block: Block) -> Result<Block> {
        {
            let wallets = self.lock_wallets()?;
            if let Some(wallet) = wallets.get_wallet(block.get_miner()) {
                block.sign_as_producer(wallet)?;
            }
        }
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        state.ledger.append(block.clone())?;
        state
            .mempool
            .purge(block.get_transactions(), self.config.purge_tolerance_ms);
        state.difficulty.adjust(state.ledger.blocks());
        self.persist(&state.ledger);
        Ok(block)
    }

    /// Claim the node's single mining slot. Cancellation and progress are reset before
    /// the job becomes visible as in progress.
    fn begin_job(&self) -> Option<Uuid> {
        let mut state = self.mining.state();
        if state.status == MiningStatus::InProgress {
            return None;
        }
        self.mining.cancel.store(false, Ordering::SeqCst);
        self.mining.attempts.store(0, Ordering::SeqCst);
        *self.mining.started.lock().unwrap_or_else(|p| p.into_inner()) = Some(Instant::now());
        let job_id = Uuid::new_v4();
        *state = MiningState {
            status: MiningStatus::InProgress,
            job_id: Some(job_id),
            ..MiningState::default()
        };
        Some(job_id)
    }

    /// Mine one block on the calling thread. Fails without touching any state while
    /// another job is running.
    pub fn mine_sync(&self, miner: &str) -> Result<Block> {
        let job_id = self.begin_job().ok_or_else(|| {
            BlockchainError::Mining(format!("Node {} is already mining", self.id))
        })?;
        debug!("Node {} mining job {job_id} running inline", self.id);

        let result = self
            .prepare_candidate(miner)
            .and_then(|candidate| self.miner.mine(candidate))
            .and_then(|block| self.commit_mined(block));
        match &result {
            Ok(block) => {
                self.mining
                    .attempts
                    .store(block.get_nonce().saturating_add(1), Ordering::Relaxed);
                self.mining.finish(
                    MiningStatus::Completed,
                    Some(block.get_hash().to_string()),
                    None,
                );
            }
            Err(e) => self
                .mining
                .finish(MiningStatus::Canceled, None, Some(e.to_string())),
        }
        result
    }

    /// Start a background mining job; `false` if one is already running
    pub fn start_mining_async(&self, miner: &str) -> bool {
        if self.begin_job().is_none() {
            return false;
        }

        // Reap a finished previous worker
        if let Some(previous) = self.take_worker() {
            let _ = previous.join();
        }

        let node = self.clone();
        let miner = miner.to_string();
        let handle = thread::spawn(move || node.run_mining_job(&miner));
        *self.mining.worker.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        true
    }

    fn run_mining_job(&self, miner: &str) {
        let control = &self.mining;
        let job_id = control.state().job_id.unwrap_or_default();
        info!("Node {} mining job {job_id} started for {miner}", self.id);

        let outcome = self.prepare_candidate(miner).and_then(|candidate| {
            self.miner
                .mine_cancelable(candidate, &control.cancel, &mut |attempts| {
                    control.attempts.store(attempts, Ordering::Relaxed);
                    debug!("Mining job {job_id}: {attempts} attempts");
                })
        });

        match outcome.and_then(|outcome| match outcome {
            MiningOutcome::Mined(block) => self.commit_mined(block).map(Some),
            MiningOutcome::Canceled { .. } => Ok(None),
        }) {
            Ok(Some(block)) => {
                info!("Mining job {job_id} completed block {}", block.get_hash());
                control.finish(
                    MiningStatus::Completed,
                    Some(block.get_hash().to_string()),
                    None,
                );
            }
            Ok(None) => {
                info!("Mining job {job_id} canceled");
                control.finish(MiningStatus::Canceled, None, None);
            }
            Err(e) => {
                error!("Mining job {job_id} failed: {e}");
                control.finish(MiningStatus::Canceled, None, Some(e.to_string()));
            }
        }
    }

    /// Idempotent; only affects a running job
    pub fn cancel_mining(&self) {
        if self.mining.state().status == MiningStatus::InProgress {
            self.mining.cancel.store(true, Ordering::SeqCst);
        }
    }

    pub fn mining_status(&self) -> MiningState {
        let mut state = self.mining.state().clone();
        if state.status == MiningStatus::InProgress {
            state.attempts = self.mining.attempts.load(Ordering::Relaxed);
            state.elapsed_ms = self.mining.elapsed_ms();
        }
        state
    }

    fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.mining
            .worker
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
    }

    /// Block until the current job (if any) has finished, returning its final state
    pub fn wait_for_mining(&self) -> Result<MiningState> {
        if let Some(handle) = self.take_worker() {
            handle
                .join()
                .map_err(|_| BlockchainError::Mining("Mining thread panicked".to_string()))?;
        }
        Ok(self.mining_status())
    }

    // ---- queries ----

    pub fn balance(&self, address: &str) -> Result<i64> {
        Ok(self.lock_state()?.ledger.balance_of(address))
    }

    pub fn balance_including_pending(&self, address: &str) -> Result<i64> {
        let state = self.lock_state()?;
        Ok(state
            .ledger
            .balance_of(address)
            .saturating_add(state.mempool.pending_delta(address)))
    }

    pub fn is_chain_valid(&self) -> Result<bool> {
        Ok(self.lock_state()?.ledger.is_valid())
    }

    pub fn chain(&self) -> Result<Vec<Block>> {
        Ok(self.lock_state()?.ledger.blocks().to_vec())
    }

    pub fn mempool(&self) -> Result<Vec<Transaction>> {
        Ok(self.lock_state()?.mempool.get_all())
    }

    pub fn latest_block(&self) -> Result<Block> {
        Ok(self.lock_state()?.ledger.last_block().clone())
    }

    pub fn height(&self) -> Result<u64> {
        Ok(self.lock_state()?.ledger.tip_height())
    }

    pub fn confirmations(&self, height: u64) -> Result<u64> {
        Ok(self.lock_state()?.ledger.confirmations(height))
    }

    pub fn history(&self, address: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self.lock_state()?.ledger.history(address))
    }

    pub fn addresses(&self) -> Result<Vec<String>> {
        Ok(self.lock_state()?.ledger.addresses())
    }

    pub fn block_reward(&self, height: u64) -> Result<u64> {
        Ok(self.lock_state()?.difficulty.reward_for_height(height))
    }

    pub fn difficulty(&self) -> Result<u32> {
        Ok(self.lock_state()?.difficulty.get_difficulty())
    }

    pub fn set_difficulty(&self, difficulty: u32) -> Result<()> {
        self.lock_state()?.difficulty.set_difficulty(difficulty)
    }

    pub fn fee_statistics(&self) -> Result<FeeStatistics> {
        Ok(self.lock_state()?.mempool.fee_statistics())
    }

    // ---- contracts ----

    pub fn register_contract(&self, contract: Contract) -> Result<()> {
        let address = contract.address().to_string();
        if self.lock_state()?.contracts.register(contract).is_some() {
            warn!("Replaced contract registered at {address}");
        }
        Ok(())
    }

    /// Contract report at the current tip height
    pub fn contract_state(&self, address: &str) -> Result<Option<ContractReport>> {
        let state = self.lock_state()?;
        Ok(state.contracts.report(address, state.ledger.tip_height()))
    }

    pub fn contract_state_at(&self, address: &str, height: u64) -> Result<Option<ContractReport>> {
        Ok(self.lock_state()?.contracts.report(address, height))
    }

    /// Withdraw everything a staking contract currently allows for `user`, signed with
    /// the contract's own key
    pub fn request_unstake(&self, contract: &str, user: &str) -> Result<String> {
        let amount = {
            let state = self.lock_state()?;
            let height = state.ledger.tip_height();
            match state.contracts.get(contract) {
                Some(Contract::PenaltyStaking(staking)) => staking
                    .withdrawable(user, height)
                    .ok_or_else(|| {
                        BlockchainError::ContractRejected(format!("No stake found for {user}"))
                    })?,
                _ => {
                    return Err(BlockchainError::ContractRejected(format!(
                        "{contract} is not a staking contract"
                    )))
                }
            }
        };
        self.submit_transaction(contract, user, amount, 0, "Unstake")
    }

    // ---- peers ----

    /// Validate and append a block produced by a peer
    pub fn receive_block(&self, block: Block) -> Result<()> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        self.acceptor
            .accept(&mut state.ledger, &mut state.mempool, block)?;
        self.persist(&state.ledger);
        Ok(())
    }

    // ---- keystore ----

    pub fn create_wallet(&self) -> Result<String> {
        self.lock_wallets()?.create_wallet()
    }

    pub fn import_wallet(&self, wallet: Wallet) -> Result<String> {
        Ok(self.lock_wallets()?.insert(wallet))
    }

    pub fn wallet_addresses(&self) -> Result<Vec<String>> {
        Ok(self.lock_wallets()?.get_addresses())
    }

    /// Shared handle to the keystore, e.g. for saving it to disk
    pub fn wallets(&self) -> Arc<Mutex<Wallets>> {
        Arc::clone(&self.wallets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contracts::{PenaltyStaking, TimeLock};
    use crate::core::monetary::SATOSHIS_PER_COIN;
    use crate::testnet::test_utils::{funded_node, test_config};

    #[test]
    fn test_submit_and_mine() {
        let (node, alice) = funded_node("A", 1_000);
        let txid = node.submit_transaction(&alice, "bob", 100, 5, "rent").unwrap();
        assert_eq!(node.mempool().unwrap().len(), 1);
        assert_eq!(node.balance_including_pending(&alice).unwrap(), 895);
        assert_eq!(node.balance(&alice).unwrap(), 1_000);

        let block = node.mine_sync("miner").unwrap();
        assert_eq!(block.get_height(), 1);
        assert_eq!(block.get_transactions()[1].id().unwrap(), txid);
        assert!(node.mempool().unwrap().is_empty());
        assert_eq!(node.balance(&alice).unwrap(), 895);
        assert_eq!(node.balance("bob").unwrap(), 100);
        assert_eq!(node.balance("miner").unwrap(), (50 * SATOSHIS_PER_COIN + 5) as i64);
        assert!(node.is_chain_valid().unwrap());
        assert_eq!(node.confirmations(1).unwrap(), 1);
    }

    #[test]
    fn test_missing_key_is_a_wallet_error() {
        let (node, _) = funded_node("A", 1_000);
        assert!(matches!(
            node.submit_transaction("stranger", "bob", 1, 0, ""),
            Err(BlockchainError::Wallet(_))
        ));
    }

    #[test]
    fn test_overdrawing_entries_stay_pending() {
        let (node, alice) = funded_node("A", 100);
        node.submit_transaction(&alice, "bob", 80, 0, "").unwrap();
        node.submit_transaction(&alice, "carol", 80, 0, "").unwrap();

        let block = node.mine_sync("miner").unwrap();
        assert_eq!(block.get_transactions().len(), 2);
        assert_eq!(node.mempool().unwrap().len(), 1);
        assert_eq!(node.balance(&alice).unwrap(), 20);

        // Still unaffordable, still pending
        let block = node.mine_sync("miner").unwrap();
        assert_eq!(block.get_transactions().len(), 1);
        assert_eq!(node.mempool().unwrap().len(), 1);
        assert!(node.is_chain_valid().unwrap());
    }

    #[test]
    fn test_outbid_deposit_keeps_backing_its_stake() {
        let (node, alice) = funded_node("A", 100);
        node.register_contract(Contract::PenaltyStaking(PenaltyStaking::new(
            "stake", 1_000, 20, 200_000,
        )))
        .unwrap();
        node.submit_transaction(&alice, "stake", 80, 0, "deposit").unwrap();
        node.submit_transaction(&alice, "bob", 80, 5, "").unwrap();

        // The higher fee spend wins; alice mines so she can afford the deposit next
        node.mine_sync(&alice).unwrap();
        assert_eq!(node.balance("bob").unwrap(), 80);
        assert_eq!(node.balance("stake").unwrap(), 0);
        let pending = node.mempool().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].get_to(), "stake");
        match node.contract_state("stake").unwrap() {
            Some(ContractReport::PenaltyStaking { positions, .. }) => {
                assert_eq!(positions[0].principal, 80);
            }
            other => panic!("unexpected report {other:?}"),
        }

        node.mine_sync("miner").unwrap();
        assert_eq!(node.balance("stake").unwrap(), 80);
        assert!(node.mempool().unwrap().is_empty());
    }

    #[test]
    fn test_sync_mining_waits_for_background_job() {
        let (node, alice) = funded_node("A", 100);
        node.submit_transaction(&alice, "bob", 80, 0, "").unwrap();
        node.submit_transaction(&alice, "carol", 80, 0, "").unwrap();
        node.set_difficulty(test_config(&[]).max_difficulty).unwrap();

        assert!(node.start_mining_async("miner"));
        assert!(matches!(
            node.mine_sync("miner"),
            Err(BlockchainError::Mining(_))
        ));
        node.cancel_mining();
        assert_eq!(node.wait_for_mining().unwrap().status, MiningStatus::Canceled);
        assert_eq!(node.height().unwrap(), 0);
        assert_eq!(node.mempool().unwrap().len(), 2);

        node.set_difficulty(1).unwrap();
        assert_eq!(node.mine_sync("miner").unwrap().get_height(), 1);
        assert_eq!(node.mining_status().status, MiningStatus::Completed);
    }

    #[test]
    fn test_cancel_right_after_start_is_not_lost() {
        let (node, _) = funded_node("A", 100);
        node.set_difficulty(test_config(&[]).max_difficulty).unwrap();
        assert!(node.start_mining_async("miner"));
        node.cancel_mining();
        let state = node.wait_for_mining().unwrap();
        assert_eq!(state.status, MiningStatus::Canceled);
        assert!(state.job_id.is_some());
    }

    #[test]
    fn test_miner_key_signs_block() {
        let (node, _) = funded_node("A", 1_000);
        let miner = node.create_wallet().unwrap();
        let block = node.mine_sync(&miner).unwrap();
        assert!(block.has_producer_signature());
        assert!(block.verify_producer(&EcdsaP256Scheme).is_ok());
    }

    #[test]
    fn test_cancel_leaves_state_unchanged() {
        let (node, alice) = funded_node("A", 1_000);
        node.submit_transaction(&alice, "bob", 10, 1, "").unwrap();
        node.set_difficulty(test_config(&[]).max_difficulty).unwrap();

        assert!(node.start_mining_async("miner"));
        assert!(!node.start_mining_async("miner"));
        assert_eq!(node.mining_status().status, MiningStatus::InProgress);
        node.cancel_mining();
        let state = node.wait_for_mining().unwrap();

        assert_eq!(state.status, MiningStatus::Canceled);
        assert!(state.last_error.is_none());
        assert_eq!(node.height().unwrap(), 0);
        assert_eq!(node.mempool().unwrap().len(), 1);
    }

    #[test]
    fn test_async_job_completes() {
        let (node, _) = funded_node("A", 1_000);
        assert_eq!(node.mining_status().status, MiningStatus::NotStarted);
        assert!(node.start_mining_async("miner"));
        let state = node.wait_for_mining().unwrap();
        assert_eq!(state.status, MiningStatus::Completed);
        assert_eq!(state.block_hash.as_deref(), Some(node.latest_block().unwrap().get_hash()));
        assert!(state.attempts > 0);
        assert_eq!(node.height().unwrap(), 1);

        // A finished job does not block the next one
        assert!(node.start_mining_async("miner"));
        node.wait_for_mining().unwrap();
        assert_eq!(node.height().unwrap(), 2);
    }

    #[test]
    fn test_staking_through_node() {
        let (node, alice) = funded_node("A", 1_000);
        let stake = node.create_wallet().unwrap();
        node.register_contract(Contract::PenaltyStaking(PenaltyStaking::new(
            &stake, 1_000, 20, 200_000,
        )))
        .unwrap();

        node.submit_transaction(&alice, &stake, 100, 0, "deposit").unwrap();
        node.mine_sync("miner").unwrap();
        match node.contract_state(&stake).unwrap() {
            Some(ContractReport::PenaltyStaking { positions, .. }) => {
                assert_eq!(positions[0].principal, 100);
                assert_eq!(positions[0].withdrawable_now, 80);
            }
            other => panic!("unexpected report {other:?}"),
        }

        node.request_unstake(&stake, &alice).unwrap();
        node.mine_sync("miner").unwrap();
        assert_eq!(node.balance(&alice).unwrap(), 980);
        assert_eq!(node.balance(&stake).unwrap(), 20);
        assert!(node.request_unstake(&stake, &alice).is_err());
    }

    #[test]
    fn test_time_lock_through_node() {
        let (node, alice) = funded_node("A", 1_000);
        node.register_contract(Contract::TimeLock(TimeLock::new(&alice, 2)))
            .unwrap();
        assert!(matches!(
            node.submit_transaction(&alice, "bob", 1, 0, ""),
            Err(BlockchainError::ContractRejected(_))
        ));
        node.mine_sync("miner").unwrap();
        node.mine_sync("miner").unwrap();
        node.submit_transaction(&alice, "bob", 1, 0, "").unwrap();
    }
}
