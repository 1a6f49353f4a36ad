use crate::core::Transaction;
use serde::Serialize;
use std::collections::BTreeSet;

/// Only listed senders may pay into `address`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowList {
    address: String,
    allowed_senders: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(address: &str, allowed_senders: I) -> AllowList
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList {
            address: address.to_string(),
            allowed_senders: allowed_senders.into_iter().map(Into::into).collect(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn allowed_senders(&self) -> Vec<String> {
        self.allowed_senders.iter().cloned().collect()
    }

    pub fn validate(&self, tx: &Transaction) -> Result<(), String> {
        if tx.get_to() == self.address && !self.allowed_senders.contains(tx.get_from()) {
            return Err(format!(
                "Sender {} is not allowed to pay {}",
                tx.get_from(),
                self.address
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_listed_senders_may_pay_in() {
        let list = AllowList::new("club", ["alice"]);
        let from_alice = Transaction::with_timestamp("alice", "club", 1, 0, "", 0);
        let from_bob = Transaction::with_timestamp("bob", "club", 1, 0, "", 0);
        let outgoing = Transaction::with_timestamp("club", "bob", 1, 0, "", 0);

        assert!(list.validate(&from_alice).is_ok());
        assert!(list.validate(&from_bob).is_err());
        assert!(list.validate(&outgoing).is_ok());
    }
}
