use crate::core::{MerkleTree, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, sha256_digest};
use crate::wallet::{SignatureScheme, Signer};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

/// 2024-01-01T00:00:00Z; every node built from the same allocations shares a genesis hash
pub const GENESIS_TIMESTAMP: i64 = 1_704_067_200_000;

/// Predecessor link of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "index")]
    height: u64,
    timestamp: i64,
    #[serde(rename = "prevHash")]
    previous_hash: String,
    hash: String,
    transactions: Vec<Transaction>,
    nonce: u64,
    difficulty: u32,
    #[serde(default)]
    miner: String,
    #[serde(default, with = "hex::serde", skip_serializing_if = "Vec::is_empty")]
    miner_signature: Vec<u8>,
    #[serde(default, with = "hex::serde", skip_serializing_if = "Vec::is_empty")]
    miner_public_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mining_duration_ms: Option<u64>, // recorded by the miner, not hashed
}

impl Block {
    /// Unmined block: nonce 0, hash unset
    pub fn new_candidate(
        height: u64,
        previous_hash: &str,
        transactions: Vec<Transaction>,
        difficulty: u32,
        miner: &str,
    ) -> Result<Block> {
        Ok(Self::with_timestamp(
            height,
            current_timestamp()?,
            previous_hash,
            transactions,
            difficulty,
            miner,
        ))
    }

    pub fn with_timestamp(
        height: u64,
        timestamp: i64,
        previous_hash: &str,
        transactions: Vec<Transaction>,
        difficulty: u32,
        miner: &str,
    ) -> Block {
        Block {
            height,
            timestamp,
            previous_hash: previous_hash.to_string(),
            hash: String::new(),
            transactions,
            nonce: 0,
            difficulty,
            miner: miner.to_string(),
            miner_signature: vec![],
            miner_public_key: vec![],
            mining_duration_ms: None,
        }
    }

    /// Deterministic genesis block carrying the initial allocations
    pub fn generate_genesis_block(allocations: &[(String, u64)], difficulty: u32) -> Result<Block> {
        let transactions = allocations
            .iter()
            .map(|(address, amount)| {
                Transaction::genesis_allocation(address, *amount, GENESIS_TIMESTAMP)
            })
            .collect();
        let mut block = Self::with_timestamp(
            0,
            GENESIS_TIMESTAMP,
            GENESIS_PREVIOUS_HASH,
            transactions,
            difficulty,
            "",
        );
        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block)?.run()?;
        block.seal(nonce, hash, None);
        info!("Genesis block {} created", block.hash);
        Ok(block)
    }

    /// Every hashed field except the nonce, in preimage order
    pub fn header_prefix(&self) -> Result<Vec<u8>> {
        let merkle_root = MerkleTree::root_of(&self.transactions)?;
        let mut data_bytes = vec![];
        data_bytes.extend(self.height.to_be_bytes());
        data_bytes.extend(self.timestamp.to_be_bytes());
        data_bytes.extend(self.previous_hash.as_bytes());
        data_bytes.extend(merkle_root);
        data_bytes.extend(self.difficulty.to_be_bytes());
        data_bytes.extend(self.miner.as_bytes());
        Ok(data_bytes)
    }

    pub fn digest_with_nonce(header_prefix: &[u8], nonce: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(header_prefix.len() + 8);
        data.extend_from_slice(header_prefix);
        data.extend(nonce.to_be_bytes());
        sha256_digest(&data)
    }

    /// Recompute the content hash from the block's fields
    pub fn calculate_hash(&self) -> Result<String> {
        let digest = Self::digest_with_nonce(&self.header_prefix()?, self.nonce);
        Ok(HEXLOWER.encode(&digest))
    }

    /// Freeze the search result on the block
    pub(crate) fn seal(&mut self, nonce: u64, hash: String, mining_duration_ms: Option<u64>) {
        self.nonce = nonce;
        self.hash = hash;
        self.mining_duration_ms = mining_duration_ms;
    }

    /// Sign the block hash with the producer's key
    pub fn sign_as_producer(&mut self, signer: &dyn Signer) -> Result<()> {
        if self.hash.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Cannot sign an unmined block".to_string(),
            ));
        }
        self.miner_signature = signer.sign(self.hash.as_bytes())?;
        self.miner_public_key = signer.public_key().to_vec();
        Ok(())
    }

    pub fn has_producer_signature(&self) -> bool {
        !self.miner_signature.is_empty()
    }

    /// An absent producer signature is acceptable; a present one must verify and
    /// belong to the miner address
    pub fn verify_producer(&self, scheme: &dyn SignatureScheme) -> Result<()> {
        if !self.has_producer_signature() {
            return Ok(());
        }
        if scheme.address_of(&self.miner_public_key) != self.miner {
            return Err(BlockchainError::SignatureInvalid(format!(
                "Producer key of block {} does not belong to miner {}",
                self.height, self.miner
            )));
        }
        if !scheme.verify(
            &self.miner_public_key,
            self.hash.as_bytes(),
            &self.miner_signature,
        ) {
            return Err(BlockchainError::SignatureInvalid(format!(
                "Producer signature of block {} does not verify",
                self.height
            )));
        }
        Ok(())
    }

    /// Sum of fees paid by the block's transactions
    pub fn total_fees(&self) -> u64 {
        self.transactions
            .iter()
            .fold(0u64, |acc, tx| acc.saturating_add(tx.get_fee()))
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_height(&self) -> u64 {
        self.height
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_miner(&self) -> &str {
        self.miner.as_str()
    }

    pub fn get_mining_duration_ms(&self) -> Option<u64> {
        self.mining_duration_ms
    }

    #[cfg(test)]
    pub(crate) fn transactions_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.transactions
    }

    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: i64) {
        self.timestamp = timestamp;
    }

    #[cfg(test)]
    pub(crate) fn set_previous_hash(&mut self, previous_hash: &str) {
        self.previous_hash = previous_hash.to_string();
    }

    #[cfg(test)]
    pub(crate) fn set_miner(&mut self, miner: &str) {
        self.miner = miner.to_string();
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{EcdsaP256Scheme, Wallet};

    fn allocations() -> Vec<(String, u64)> {
        vec![("alice".to_string(), 1_000), ("bob".to_string(), 500)]
    }

    #[test]
    fn test_genesis_is_deterministic() {
        let first = Block::generate_genesis_block(&allocations(), 1).unwrap();
        let second = Block::generate_genesis_block(&allocations(), 1).unwrap();
        assert_eq!(first.get_hash(), second.get_hash());
        assert_eq!(first.get_height(), 0);
        assert_eq!(first.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert!(first.get_hash().starts_with('0'));
        assert_eq!(first.calculate_hash().unwrap(), first.get_hash());
    }

    #[test]
    fn test_reordering_transactions_changes_hash() {
        let mut block = Block::generate_genesis_block(&allocations(), 1).unwrap();
        let original = block.calculate_hash().unwrap();
        block.transactions_mut().reverse();
        assert_ne!(block.calculate_hash().unwrap(), original);
    }

    #[test]
    fn test_every_hashed_field_affects_hash() {
        let block = Block::generate_genesis_block(&allocations(), 1).unwrap();
        let original = block.calculate_hash().unwrap();

        let mut tampered = block.clone();
        tampered.set_timestamp(block.get_timestamp() + 1);
        assert_ne!(tampered.calculate_hash().unwrap(), original);

        let mut tampered = block.clone();
        tampered.set_previous_hash("ff");
        assert_ne!(tampered.calculate_hash().unwrap(), original);

        let mut tampered = block.clone();
        tampered.set_miner("mallory");
        assert_ne!(tampered.calculate_hash().unwrap(), original);

        let mut tampered = block;
        tampered.set_nonce(tampered.get_nonce() + 1);
        assert_ne!(tampered.calculate_hash().unwrap(), original);
    }

    #[test]
    fn test_producer_signature() {
        let wallet = Wallet::new().unwrap();
        let scheme = EcdsaP256Scheme;
        let mut block = Block::generate_genesis_block(&allocations(), 1).unwrap();
        assert!(block.verify_producer(&scheme).is_ok());

        block.set_miner(&wallet.get_address());
        block.sign_as_producer(&wallet).unwrap();
        assert!(block.verify_producer(&scheme).is_ok());

        block.set_miner("someone-else");
        assert!(matches!(
            block.verify_producer(&scheme),
            Err(BlockchainError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_snapshot_field_names() {
        let block = Block::generate_genesis_block(&allocations(), 1).unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["index"], 0);
        assert_eq!(json["prevHash"], "0");
        assert!(json.get("hash").is_some());
        assert!(json.get("minerSignature").is_none());

        let restored: Block = serde_json::from_value(json).unwrap();
        assert_eq!(restored, block);
    }
}
