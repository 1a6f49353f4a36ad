use crate::core::Transaction;
use serde::Serialize;

/// Funds held at `address` cannot leave before `unlock_height`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLock {
    address: String,
    unlock_height: u64,
}

impl TimeLock {
    pub fn new(address: &str, unlock_height: u64) -> TimeLock {
        TimeLock {
            address: address.to_string(),
            unlock_height,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn unlock_height(&self) -> u64 {
        self.unlock_height
    }

    pub fn is_locked(&self, current_height: u64) -> bool {
        current_height < self.unlock_height
    }

    /// Incoming transfers are always accepted
    pub fn validate(&self, tx: &Transaction, current_height: u64) -> Result<(), String> {
        if tx.get_from() == self.address && self.is_locked(current_height) {
            return Err(format!(
                "Funds at {} are locked until height {} (current height {current_height})",
                self.address, self.unlock_height
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outgoing_blocked_until_unlock_height() {
        let lock = TimeLock::new("vault", 5);
        let outgoing = Transaction::with_timestamp("vault", "bob", 1, 0, "", 0);
        let incoming = Transaction::with_timestamp("bob", "vault", 1, 0, "", 0);

        assert!(lock.validate(&outgoing, 4).is_err());
        assert!(lock.validate(&outgoing, 5).is_ok());
        assert!(lock.validate(&incoming, 0).is_ok());
    }
}
