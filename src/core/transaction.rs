// A transaction moves `amount` from one account to another and pays `fee` to the miner.
// Accounts are plain address strings; balances live in the ledger, not in outputs.
// Reward transactions come from a sentinel sender and are never signed.

use crate::core::monetary::{is_reward_sentinel, COINBASE_SENDER, GENESIS_SENDER};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, encode_canonical, serialize, sha256_digest, sha256_hex};
use crate::wallet::{SignatureScheme, Signer};
use serde::{Deserialize, Serialize};

// The content that gets signed and identifies the transaction
#[derive(bincode::Encode)]
struct SigningPayload<'a> {
    from: &'a str,
    to: &'a str,
    amount: u64,
    fee: u64,
    timestamp: i64,
    note: &'a str,
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    from: String,
    to: String,
    amount: u64,
    fee: u64,
    timestamp: i64, // milliseconds since the epoch
    #[serde(default)]
    note: String,
    #[serde(default, with = "hex::serde")]
    signature: Vec<u8>,
    #[serde(default, with = "hex::serde")]
    public_key: Vec<u8>,
}

impl Transaction {
    /// Unsigned transfer stamped with the current time
    pub fn new(from: &str, to: &str, amount: u64, fee: u64, note: &str) -> Result<Transaction> {
        Ok(Self::with_timestamp(from, to, amount, fee, note, current_timestamp()?))
    }

    pub fn with_timestamp(
        from: &str,
        to: &str,
        amount: u64,
        fee: u64,
        note: &str,
        timestamp: i64,
    ) -> Transaction {
        Transaction {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            fee,
            timestamp,
            note: note.to_string(),
            signature: vec![],
            public_key: vec![],
        }
    }

    /// Miner reward; fees collected from the block are folded into `amount`
    pub fn new_coinbase(to: &str, amount: u64, note: &str) -> Result<Transaction> {
        Self::new(COINBASE_SENDER, to, amount, 0, note)
    }

    /// Initial allocation in the genesis block
    pub fn genesis_allocation(to: &str, amount: u64, timestamp: i64) -> Transaction {
        Self::with_timestamp(GENESIS_SENDER, to, amount, 0, "Genesis allocation", timestamp)
    }

    fn signing_payload(&self) -> Result<Vec<u8>> {
        encode_canonical(&SigningPayload {
            from: &self.from,
            to: &self.to,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            note: &self.note,
        })
    }

    /// Content-derived identifier; unaffected by (re-)signing
    pub fn id(&self) -> Result<String> {
        Ok(sha256_hex(&self.signing_payload()?))
    }

    /// Digest over the full encoding, signature included. Used as Merkle leaf.
    pub fn digest(&self) -> Result<Vec<u8>> {
        Ok(sha256_digest(&serialize(self)?))
    }

    pub fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        if self.is_reward() {
            return Err(BlockchainError::SignatureInvalid(
                "Reward transactions are not signed".to_string(),
            ));
        }
        let payload = self.signing_payload()?;
        self.signature = signer.sign(&payload)?;
        self.public_key = signer.public_key().to_vec();
        Ok(())
    }

    /// Sentinel rule or a signature by the key that controls `from`
    pub fn verify(&self, scheme: &dyn SignatureScheme) -> Result<()> {
        if self.is_reward() {
            return Ok(());
        }
        if self.signature.is_empty() || self.public_key.is_empty() {
            return Err(BlockchainError::SignatureInvalid(format!(
                "Transaction from {} is not signed",
                self.from
            )));
        }
        if scheme.address_of(&self.public_key) != self.from {
            return Err(BlockchainError::SignatureInvalid(format!(
                "Public key does not control {}",
                self.from
            )));
        }
        if !scheme.verify(&self.public_key, &self.signing_payload()?, &self.signature) {
            return Err(BlockchainError::SignatureInvalid(format!(
                "Signature does not match transaction content from {}",
                self.from
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self, scheme: &dyn SignatureScheme) -> bool {
        self.verify(scheme).is_ok()
    }

    pub fn is_reward(&self) -> bool {
        is_reward_sentinel(&self.from)
    }

    /// Same transfer, possibly re-signed, stamped within `tolerance_ms` of each other
    pub fn matches(&self, other: &Transaction, tolerance_ms: i64) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.amount == other.amount
            && self.fee == other.fee
            && (self.timestamp - other.timestamp).abs() < tolerance_ms
    }

    /// What the sender is debited
    pub fn total_cost(&self) -> u64 {
        self.amount.saturating_add(self.fee)
    }

    pub fn get_from(&self) -> &str {
        self.from.as_str()
    }

    pub fn get_to(&self) -> &str {
        self.to.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_note(&self) -> &str {
        self.note.as_str()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    /// Test hook for tamper scenarios
    #[cfg(test)]
    pub(crate) fn set_amount(&mut self, amount: u64) {
        self.amount = amount;
    }
}
