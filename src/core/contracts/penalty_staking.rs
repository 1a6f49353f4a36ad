use crate::core::monetary::conversions::apply_rate;
use crate::core::Transaction;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stake {
    principal: u64,
    start_height: u64,
}

/// One user's stake as seen at a given height
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakePosition {
    pub user: String,
    pub principal: u64,
    pub start_height: u64,
    pub held_blocks: u64,
    pub withdrawable_now: u64,
}

/// Deposits into `address` earn a per-block reward once held for `min_lock_blocks`;
/// earlier withdrawals forfeit a share of the principal. Rates are in ppm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyStaking {
    address: String,
    reward_ppm_per_block: u64,
    min_lock_blocks: u64,
    early_penalty_ppm: u64,
    stakes: BTreeMap<String, Stake>,
}

impl PenaltyStaking {
    pub fn new(
        address: &str,
        reward_ppm_per_block: u64,
        min_lock_blocks: u64,
        early_penalty_ppm: u64,
    ) -> PenaltyStaking {
        PenaltyStaking {
            address: address.to_string(),
            reward_ppm_per_block,
            min_lock_blocks,
            early_penalty_ppm,
            stakes: BTreeMap::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn allowed_withdrawal(&self, stake: &Stake, current_height: u64) -> u64 {
        let held = current_height.saturating_sub(stake.start_height);
        if held >= self.min_lock_blocks {
            let rate = self.reward_ppm_per_block.saturating_mul(held);
            stake
                .principal
                .saturating_add(apply_rate(stake.principal, rate))
        } else {
            stake
                .principal
                .saturating_sub(apply_rate(stake.principal, self.early_penalty_ppm))
        }
    }

    /// Maximum the contract would pay out to `user` right now
    pub fn withdrawable(&self, user: &str, current_height: u64) -> Option<u64> {
        self.stakes
            .get(user)
            .map(|stake| self.allowed_withdrawal(stake, current_height))
    }

    /// Deposits are always accepted; a withdrawal must not exceed the allowed amount
    pub fn validate(&self, tx: &Transaction, current_height: u64) -> Result<(), String> {
        if tx.get_from() != self.address {
            return Ok(());
        }
        let user = tx.get_to();
        let stake = self
            .stakes
            .get(user)
            .ok_or_else(|| format!("No stake found for {user}"))?;
        let allowed = self.allowed_withdrawal(stake, current_height);
        if tx.get_amount() > allowed {
            return Err(format!(
                "Withdrawal of {} exceeds allowed {allowed} for {user}",
                tx.get_amount()
            ));
        }
        Ok(())
    }

    /// Record an accepted deposit or withdrawal
    pub fn apply(&mut self, tx: &Transaction, current_height: u64) {
        if tx.get_from() == self.address {
            self.stakes.remove(tx.get_to());
        } else if tx.get_to() == self.address {
            let stake = self
                .stakes
                .entry(tx.get_from().to_string())
                .or_insert(Stake {
                    principal: 0,
                    start_height: current_height,
                });
            stake.principal = stake.principal.saturating_add(tx.get_amount());
        }
    }

    pub fn positions(&self, current_height: u64) -> Vec<StakePosition> {
        self.stakes
            .iter()
            .map(|(user, stake)| StakePosition {
                user: user.clone(),
                principal: stake.principal,
                start_height: stake.start_height,
                held_blocks: current_height.saturating_sub(stake.start_height),
                withdrawable_now: self.allowed_withdrawal(stake, current_height),
            })
            .collect()
    }
}
