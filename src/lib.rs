//! # Hashlink Chain - a single-process blockchain engine
//!
//! A hash-linked ledger with a pending-transaction pool, proof-of-work mining that can
//! run in the background and be canceled, per-address contract hooks, a halving reward
//! schedule, and in-process peers that accept or reject each other's blocks.
//!
//! ## How the code is organized
//! - `core/`: transactions, blocks, the ledger, mining, difficulty, contracts, consensus
//! - `storage/`: the mempool and the JSON chain snapshot
//! - `network/`: the `Node` facade and the in-process `NodeRegistry`
//! - `wallet/`: ECDSA P-256 keys, Base58Check addresses, the keystore, and the
//!   `Signer` / `SignatureScheme` traits the engine is written against
//! - `config/`: TOML settings with environment overrides
//! - `utils/`: hashing, signing primitives and the canonical encoding
//! - `cli/`: command-line parsing for the binary
//!
//! ## Where to start
//! 1. `network/node.rs` for the engine surface (submit, mine, query, receive)
//! 2. `storage/memory_pool.rs` for the admission pipeline
//! 3. `core/ledger.rs` for linkage checks and the balance table
//! 4. `core/proof_of_work.rs` for the nonce search and cancellation
//! 5. `core/contracts/` for the TimeLock, AllowList and PenaltyStaking hooks
//!
//! Amounts are integer base units (1 coin = 100,000,000). Each node keeps all of its
//! state behind one lock; only the nonce search runs outside it.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, GenesisAllocation};
pub use core::{
    Block, ConsensusAcceptor, Contract, ContractRegistry, ContractReport, DifficultyController,
    Ledger, MiningOutcome, PowMiner, ProofOfWork, Transaction,
};
pub use error::{BlockchainError, Result};
pub use network::{MiningState, MiningStatus, Node, NodeRegistry};
pub use storage::{FeeStatistics, MemoryPool, Snapshot};
pub use utils::{
    base58_decode, base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    convert_address, hash_pub_key, validate_address, EcdsaP256Scheme, SignatureScheme, Signer,
    Wallet, Wallets, ADDRESS_CHECK_SUM_LEN,
};
