//! Per-address contract hooks consulted during mempool admission
//!
//! The set of contract kinds is closed, so dispatch is a plain `match`. Validation is
//! pure; state changes happen in [`ContractRegistry::apply`] once every hook involved in
//! a transaction has accepted it.

mod allow_list;
mod penalty_staking;
mod time_lock;

pub use allow_list::AllowList;
pub use penalty_staking::{PenaltyStaking, StakePosition};
pub use time_lock::TimeLock;

use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contract {
    TimeLock(TimeLock),
    AllowList(AllowList),
    PenaltyStaking(PenaltyStaking),
}

/// Observable contract state at a given height
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContractReport {
    #[serde(rename_all = "camelCase")]
    TimeLock {
        address: String,
        unlock_height: u64,
        locked: bool,
    },
    #[serde(rename_all = "camelCase")]
    AllowList {
        address: String,
        allowed_senders: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    PenaltyStaking {
        address: String,
        positions: Vec<StakePosition>,
    },
}

impl Contract {
    pub fn address(&self) -> &str {
        match self {
            Contract::TimeLock(contract) => contract.address(),
            Contract::AllowList(contract) => contract.address(),
            Contract::PenaltyStaking(contract) => contract.address(),
        }
    }

    /// Accept or reject with a reason; never mutates
    pub fn validate(&self, tx: &Transaction, current_height: u64) -> std::result::Result<(), String> {
        match self {
            Contract::TimeLock(contract) => contract.validate(tx, current_height),
            Contract::AllowList(contract) => contract.validate(tx),
            Contract::PenaltyStaking(contract) => contract.validate(tx, current_height),
        }
    }

    pub fn apply(&mut self, tx: &Transaction, current_height: u64) {
        if let Contract::PenaltyStaking(contract) = self {
            contract.apply(tx, current_height);
        }
    }

    pub fn report(&self, current_height: u64) -> ContractReport {
        match self {
            Contract::TimeLock(contract) => ContractReport::TimeLock {
                address: contract.address().to_string(),
                unlock_height: contract.unlock_height(),
                locked: contract.is_locked(current_height),
            },
            Contract::AllowList(contract) => ContractReport::AllowList {
                address: contract.address().to_string(),
                allowed_senders: contract.allowed_senders(),
            },
            Contract::PenaltyStaking(contract) => ContractReport::PenaltyStaking {
                address: contract.address().to_string(),
                positions: contract.positions(current_height),
            },
        }
    }
}

/// Address -> contract
#[derive(Debug, Default, Clone)]
pub struct ContractRegistry {
    contracts: HashMap<String, Contract>,
}

impl ContractRegistry {
    pub fn new() -> ContractRegistry {
        ContractRegistry::default()
    }

    /// Register a contract, returning the one it replaces
    pub fn register(&mut self, contract: Contract) -> Option<Contract> {
        debug!("Registering contract at {}", contract.address());
        self.contracts
            .insert(contract.address().to_string(), contract)
    }

    pub fn get(&self, address: &str) -> Option<&Contract> {
        self.contracts.get(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.contracts.contains_key(address)
    }

    // Sender side first; a self-transfer consults its contract once
    fn involved<'a>(tx: &'a Transaction) -> Vec<&'a str> {
        let mut addresses = vec![tx.get_from()];
        if tx.get_to() != tx.get_from() {
            addresses.push(tx.get_to());
        }
        addresses
    }

    /// Run every involved hook without mutating any of them
    pub fn validate(&self, tx: &Transaction, current_height: u64) -> Result<()> {
        for address in Self::involved(tx) {
            if let Some(contract) = self.contracts.get(address) {
                contract
                    .validate(tx, current_height)
                    .map_err(BlockchainError::ContractRejected)?;
            }
        }
        Ok(())
    }

    /// Commit the effects of a transaction every hook accepted
    pub fn apply(&mut self, tx: &Transaction, current_height: u64) {
        for address in Self::involved(tx) {
            if let Some(contract) = self.contracts.get_mut(address) {
                contract.apply(tx, current_height);
            }
        }
    }

    pub fn report(&self, address: &str, current_height: u64) -> Option<ContractReport> {
        self.contracts
            .get(address)
            .map(|contract| contract.report(current_height))
    }

    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.contracts.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ContractRegistry {
        let mut registry = ContractRegistry::new();
        registry.register(Contract::TimeLock(TimeLock::new("vault", 10)));
        registry.register(Contract::PenaltyStaking(PenaltyStaking::new(
            "stake", 1_000, 20, 200_000,
        )));
        registry
    }

    #[test]
    fn test_rejection_on_either_side() {
        let registry = registry();
        let locked = Transaction::with_timestamp("vault", "bob", 1, 0, "", 0);
        assert!(matches!(
            registry.validate(&locked, 3),
            Err(BlockchainError::ContractRejected(_))
        ));

        let unknown_withdrawal = Transaction::with_timestamp("stake", "bob", 1, 0, "", 0);
        assert!(registry.validate(&unknown_withdrawal, 3).is_err());
    }

    #[test]
    fn test_rejected_transaction_leaves_other_contract_untouched() {
        let mut registry = registry();
        // Deposit side accepts, sender side rejects
        let vault_to_stake = Transaction::with_timestamp("vault", "stake", 100, 0, "", 0);
        assert!(registry.validate(&vault_to_stake, 3).is_err());

        match registry.report("stake", 3) {
            Some(ContractReport::PenaltyStaking { positions, .. }) => assert!(positions.is_empty()),
            other => panic!("unexpected report {other:?}"),
        }

        registry.apply(&vault_to_stake, 12);
        match registry.report("stake", 12) {
            Some(ContractReport::PenaltyStaking { positions, .. }) => {
                assert_eq!(positions[0].user, "vault");
                assert_eq!(positions[0].principal, 100);
            }
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn test_reports() {
        let registry = registry();
        assert_eq!(
            registry.report("vault", 3),
            Some(ContractReport::TimeLock {
                address: "vault".to_string(),
                unlock_height: 10,
                locked: true,
            })
        );
        assert_eq!(registry.report("nobody", 3), None);
        assert_eq!(registry.addresses(), vec!["stake", "vault"]);
    }
}
