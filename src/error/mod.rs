//! Error handling for the blockchain engine
//!
//! Rejections a caller can recover from (malformed input, balance, contract vetoes,
//! peer block validation) and unexpected failures share one enum so every operation
//! can return the same `Result`.

use std::fmt;

/// Result type alias for blockchain operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Comprehensive error types for blockchain operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Missing address, zero amount or unrepresentable value
    MalformedTransaction(String),
    /// A transaction with the same id is already pending
    DuplicateTransaction(String),
    /// The mempool reached its capacity limit
    MempoolFull { capacity: usize },
    /// Confirmed balance does not cover amount + fee
    InsufficientBalance {
        address: String,
        required: u64,
        available: i64,
    },
    /// A registered contract vetoed the transaction
    ContractRejected(String),
    /// Missing or non-verifying transaction / producer signature
    SignatureInvalid(String),
    /// Block does not extend the local tip
    ChainLinkageError(String),
    /// Block would drive an account below zero
    NegativeBalance { address: String, balance: i64 },
    /// Peer block height is not the next local height
    HeightMismatch { expected: u64, actual: u64 },
    /// Peer block does not point at the local tip
    LinkageMismatch { expected: String, actual: String },
    /// Stored hash differs from the recomputed one
    HashMismatch { height: u64 },
    /// Hash does not satisfy the difficulty predicate
    ProofInvalid { height: u64, difficulty: u32 },
    /// A contained transaction failed individual validation
    TransactionInvalid { height: u64, index: usize },
    /// Persisted state could not be trusted
    CorruptedState(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Wallet / keystore errors
    Wallet(String),
    /// Invalid address format
    InvalidAddress(String),
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Block construction errors
    InvalidBlock(String),
    /// Mining errors
    Mining(String),
    /// No node registered under this id
    UnknownNode(String),
    /// A lock was poisoned by a panicking thread
    LockPoisoned(String),
}

impl BlockchainError {
    /// True for rejections that leave all state untouched and are reported back to the
    /// caller rather than treated as faults.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BlockchainError::MalformedTransaction(_)
                | BlockchainError::DuplicateTransaction(_)
                | BlockchainError::MempoolFull { .. }
                | BlockchainError::InsufficientBalance { .. }
                | BlockchainError::ContractRejected(_)
                | BlockchainError::SignatureInvalid(_)
                | BlockchainError::ChainLinkageError(_)
                | BlockchainError::NegativeBalance { .. }
                | BlockchainError::HeightMismatch { .. }
                | BlockchainError::LinkageMismatch { .. }
                | BlockchainError::HashMismatch { .. }
                | BlockchainError::ProofInvalid { .. }
                | BlockchainError::TransactionInvalid { .. }
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::MalformedTransaction(msg) => {
                write!(f, "Malformed transaction: {msg}")
            }
            BlockchainError::DuplicateTransaction(id) => {
                write!(f, "Duplicate transaction: {id}")
            }
            BlockchainError::MempoolFull { capacity } => {
                write!(f, "Mempool full: capacity {capacity} reached")
            }
            BlockchainError::InsufficientBalance {
                address,
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient balance for {address}: required {required}, available {available}"
                )
            }
            BlockchainError::ContractRejected(reason) => write!(f, "Contract rejected: {reason}"),
            BlockchainError::SignatureInvalid(msg) => write!(f, "Invalid signature: {msg}"),
            BlockchainError::ChainLinkageError(msg) => write!(f, "Chain linkage error: {msg}"),
            BlockchainError::NegativeBalance { address, balance } => {
                write!(f, "Block would leave {address} with balance {balance}")
            }
            BlockchainError::HeightMismatch { expected, actual } => {
                write!(f, "Height mismatch: expected {expected}, got {actual}")
            }
            BlockchainError::LinkageMismatch { expected, actual } => {
                write!(
                    f,
                    "Previous hash mismatch: expected {expected}, got {actual}"
                )
            }
            BlockchainError::HashMismatch { height } => {
                write!(f, "Hash mismatch for block at height {height}")
            }
            BlockchainError::ProofInvalid { height, difficulty } => {
                write!(
                    f,
                    "Proof of work invalid for block at height {height} (difficulty {difficulty})"
                )
            }
            BlockchainError::TransactionInvalid { height, index } => {
                write!(f, "Invalid transaction {index} in block at height {height}")
            }
            BlockchainError::CorruptedState(msg) => write!(f, "Corrupted state: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Wallet(msg) => write!(f, "Wallet error: {msg}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
            BlockchainError::UnknownNode(id) => write!(f, "Unknown node: {id}"),
            BlockchainError::LockPoisoned(what) => write!(f, "Lock poisoned: {what}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
