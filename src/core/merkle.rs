use crate::core::Transaction;
use crate::error::Result;
use crate::utils::sha256_digest;

/// Merkle root over the transactions of a block
///
/// Leaves are the SHA-256 digests of each full transaction encoding, so any edit to a
/// transaction, its signature, or its position changes the root. Levels with an odd
/// number of nodes duplicate the last one. An empty list commits to SHA-256 of nothing.
pub struct MerkleTree;

impl MerkleTree {
    pub fn root_of(transactions: &[Transaction]) -> Result<Vec<u8>> {
        let leaves = transactions
            .iter()
            .map(Transaction::digest)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::calculate_merkle_root(&leaves))
    }

    /// Calculate the Merkle root from a list of leaf hashes
    pub fn calculate_merkle_root(leaf_hashes: &[Vec<u8>]) -> Vec<u8> {
        if leaf_hashes.is_empty() {
            return sha256_digest(&[]);
        }

        let mut current_level = leaf_hashes.to_vec();
        while current_level.len() > 1 {
            current_level = current_level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => Self::hash_pair(left, right),
                    [single] => Self::hash_pair(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
        }

        // A lone leaf is still paired with itself
        if leaf_hashes.len() == 1 {
            return Self::hash_pair(&leaf_hashes[0], &leaf_hashes[0]);
        }
        current_level.swap_remove(0)
    }

    fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
        let mut combined = Vec::with_capacity(left.len() + right.len());
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_commits_to_empty_digest() {
        assert_eq!(MerkleTree::calculate_merkle_root(&[]), sha256_digest(&[]));
    }

    #[test]
    fn test_single_leaf_is_paired_with_itself() {
        let leaf = vec![1, 2, 3, 4];
        let root = MerkleTree::calculate_merkle_root(&[leaf.clone()]);
        assert_eq!(root, MerkleTree::hash_pair(&leaf, &leaf));
        assert_eq!(root.len(), 32);
    }

    #[test]
    fn test_odd_level_duplicates_last() {
        let a = vec![1u8];
        let b = vec![2u8];
        let c = vec![3u8];
        let expected = MerkleTree::hash_pair(
            &MerkleTree::hash_pair(&a, &b),
            &MerkleTree::hash_pair(&c, &c),
        );
        assert_eq!(
            MerkleTree::calculate_merkle_root(&[a, b, c]),
            expected
        );
    }

    #[test]
    fn test_root_is_order_sensitive() {
        let first = Transaction::with_timestamp("GENESIS", "alice", 10, 0, "", 1);
        let second = Transaction::with_timestamp("GENESIS", "bob", 20, 0, "", 1);
        let forward = MerkleTree::root_of(&[first.clone(), second.clone()]).unwrap();
        let reversed = MerkleTree::root_of(&[second, first]).unwrap();
        assert_ne!(forward, reversed);
    }
}
