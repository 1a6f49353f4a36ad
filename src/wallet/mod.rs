//! Wallet management and cryptographic operations
//!
//! Key pairs, Base58Check addresses, the keystore, and the signature capability the
//! engine is parameterised over.

pub mod signer;
#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use signer::{EcdsaP256Scheme, SignatureScheme, Signer};
pub use wallet::{convert_address, hash_pub_key, validate_address, Wallet, ADDRESS_CHECK_SUM_LEN};
pub use wallets::{Wallets, WALLET_FILE};
