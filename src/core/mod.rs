//! Core blockchain functionality
//!
//! Transactions and blocks, the ledger and its balance table, proof-of-work mining,
//! difficulty and reward schedule, contract hooks, and acceptance of peer blocks.

pub mod block;
pub mod consensus;
pub mod contracts;
pub mod difficulty;
pub mod ledger;
pub mod merkle;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_TIMESTAMP};
pub use consensus::ConsensusAcceptor;
pub use contracts::{
    AllowList, Contract, ContractRegistry, ContractReport, PenaltyStaking, StakePosition, TimeLock,
};
pub use difficulty::DifficultyController;
pub use ledger::{BalanceOracle, HistoryEntry, Ledger};
pub use merkle::MerkleTree;
pub use monetary::{
    COINBASE_SENDER, DEFAULT_TRANSACTION_FEE, GENESIS_SENDER, INITIAL_BLOCK_REWARD,
    SATOSHIS_PER_COIN,
};
pub use proof_of_work::{MiningOutcome, PowMiner, ProofOfWork};
pub use transaction::Transaction;
