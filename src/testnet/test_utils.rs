//! Test utilities shared by the unit tests

use crate::config::{Config, GenesisAllocation};
use crate::core::ledger::Ledger;
use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::network::{Node, NodeRegistry};
use crate::wallet::{EcdsaP256Scheme, Wallet, Wallets};
use std::sync::Arc;

/// Fast settings: difficulty 1, no adjustment within a test's lifetime
pub fn test_config(allocations: &[(&str, u64)]) -> Config {
    Config {
        initial_difficulty: 1,
        min_difficulty: 1,
        max_difficulty: 10,
        adjustment_window: 1_000,
        progress_interval: 1_000,
        genesis_allocations: allocations
            .iter()
            .map(|(address, amount)| GenesisAllocation {
                address: address.to_string(),
                amount: *amount,
            })
            .collect(),
        ..Config::default()
    }
}

/// Ledger whose genesis block credits `allocations`
pub fn funded_ledger(allocations: &[(&str, u64)]) -> Ledger {
    let allocations: Vec<(String, u64)> = allocations
        .iter()
        .map(|(address, amount)| (address.to_string(), *amount))
        .collect();
    let genesis = Block::generate_genesis_block(&allocations, 1).unwrap();
    Ledger::new(genesis, Arc::new(EcdsaP256Scheme)).unwrap()
}

pub fn signed_transfer(wallet: &Wallet, to: &str, amount: u64, fee: u64) -> Transaction {
    let mut tx = Transaction::new(&wallet.get_address(), to, amount, fee, "").unwrap();
    tx.sign(wallet).unwrap();
    tx
}

/// Node whose keystore holds one funded wallet; returns the node and that address
pub fn funded_node(id: &str, balance: u64) -> (Node, String) {
    let mut wallets = Wallets::new();
    let address = wallets.create_wallet().unwrap();
    let config = test_config(&[(&address, balance)]);
    let node = Node::with_parts(id, config, wallets, Arc::new(EcdsaP256Scheme)).unwrap();
    (node, address)
}

/// Peers sharing one genesis; the first id holds the key of the funded address
pub fn create_test_network(ids: &[&str], balance: u64) -> Result<(NodeRegistry, String)> {
    let wallet = Wallet::new()?;
    let address = wallet.get_address();
    let config = test_config(&[(&address, balance)]);

    let mut registry = NodeRegistry::new();
    for (i, id) in ids.iter().enumerate() {
        let mut wallets = Wallets::new();
        if i == 0 {
            wallets.insert(wallet.clone());
        }
        registry.register(Node::with_parts(
            id,
            config.clone(),
            wallets,
            Arc::new(EcdsaP256Scheme),
        )?);
    }
    Ok((registry, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_network_shares_genesis() {
        let (registry, _) = create_test_network(&["A", "B", "C"], 10).unwrap();
        let hashes: Vec<String> = registry
            .node_ids()
            .iter()
            .map(|id| registry.get(id).unwrap().latest_block().unwrap().get_hash().to_string())
            .collect();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
