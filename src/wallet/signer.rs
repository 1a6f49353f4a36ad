//! Pluggable signature capability.
//!
//! The engine never touches key material directly: transactions and blocks are signed
//! through a [`Signer`] and checked through a [`SignatureScheme`], so a node can be run
//! with any scheme that can sign and verify a byte payload and derive an address from a
//! public key.

use crate::error::Result;
use crate::wallet::{convert_address, hash_pub_key};

/// Something holding a private key
pub trait Signer {
    fn public_key(&self) -> &[u8];
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

/// Verification side of a signature scheme
pub trait SignatureScheme: Send + Sync {
    fn verify(&self, public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool;

    /// The address a public key controls
    fn address_of(&self, public_key: &[u8]) -> String;
}

/// ECDSA P-256 / SHA-256 with Base58Check addresses, as produced by [`crate::wallet::Wallet`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaP256Scheme;

impl SignatureScheme for EcdsaP256Scheme {
    fn verify(&self, public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        crate::utils::ecdsa_p256_sha256_sign_verify(public_key, signature, payload)
    }

    fn address_of(&self, public_key: &[u8]) -> String {
        convert_address(hash_pub_key(public_key).as_slice())
    }
}
