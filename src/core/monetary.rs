//! Monetary units and sentinel addresses
//!
//! Amounts are integer base units ("satoshis"); one coin is 100,000,000 base units, so a
//! 50-coin reward halves exactly down to 12.5 coins and beyond. Rates (staking reward,
//! early-withdrawal penalty) are parts-per-million of the principal.

/// Number of base units in one coin
pub const SATOSHIS_PER_COIN: u64 = 100_000_000;

/// Default block reward before any halving (50 coins)
pub const INITIAL_BLOCK_REWARD: u64 = 50 * SATOSHIS_PER_COIN;

/// Default transaction fee (0.001 coins)
pub const DEFAULT_TRANSACTION_FEE: u64 = SATOSHIS_PER_COIN / 1_000;

/// Fixed-point scale for fractional rates
pub const RATE_SCALE: u64 = 1_000_000;

/// Sender of the per-block miner reward
pub const COINBASE_SENDER: &str = "COINBASE";

/// Sender of the initial allocations in the genesis block
pub const GENESIS_SENDER: &str = "GENESIS";

/// Reward senders are never debited and carry no signature
pub fn is_reward_sentinel(address: &str) -> bool {
    address.is_empty() || address == COINBASE_SENDER || address == GENESIS_SENDER
}

/// Utility functions for monetary conversions
pub mod conversions {
    use super::*;

    /// Convert coins to base units
    ///
    /// # Examples
    /// ```
    /// use hashlink_chain::core::monetary::conversions::coins_to_satoshis;
    /// assert_eq!(coins_to_satoshis(1.0), 100_000_000);
    /// assert_eq!(coins_to_satoshis(12.5), 1_250_000_000);
    /// ```
    pub fn coins_to_satoshis(coins: f64) -> u64 {
        (coins * SATOSHIS_PER_COIN as f64).round() as u64
    }

    /// Convert base units to coins
    pub fn satoshis_to_coins(satoshis: u64) -> f64 {
        satoshis as f64 / SATOSHIS_PER_COIN as f64
    }

    /// Format a signed balance as a human-readable string
    ///
    /// # Examples
    /// ```
    /// use hashlink_chain::core::monetary::conversions::format_balance;
    /// assert_eq!(format_balance(150_000_000), "1.50000000 coins");
    /// assert_eq!(format_balance(-1_000), "-0.00001000 coins");
    /// ```
    pub fn format_balance(balance: i64) -> String {
        let sign = if balance < 0 { "-" } else { "" };
        let magnitude = balance.unsigned_abs();
        format!(
            "{sign}{}.{:08} coins",
            magnitude / SATOSHIS_PER_COIN,
            magnitude % SATOSHIS_PER_COIN
        )
    }

    /// Convert a decimal rate (e.g. 0.2 for 20%) to parts-per-million
    pub fn rate_to_ppm(rate: f64) -> u64 {
        (rate * RATE_SCALE as f64).round() as u64
    }

    /// `amount * ppm / RATE_SCALE`, truncated toward zero
    pub fn apply_rate(amount: u64, ppm: u64) -> u64 {
        let scaled = amount as u128 * ppm as u128 / RATE_SCALE as u128;
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::conversions::*;
    use super::*;

    #[test]
    fn test_monetary_constants() {
        assert_eq!(INITIAL_BLOCK_REWARD, 5_000_000_000);
        assert_eq!(DEFAULT_TRANSACTION_FEE, 100_000);
    }

    #[test]
    fn test_sentinels() {
        assert!(is_reward_sentinel(COINBASE_SENDER));
        assert!(is_reward_sentinel(GENESIS_SENDER));
        assert!(is_reward_sentinel(""));
        assert!(!is_reward_sentinel("coinbase"));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(coins_to_satoshis(0.5), SATOSHIS_PER_COIN / 2);
        assert_eq!(satoshis_to_coins(SATOSHIS_PER_COIN / 4), 0.25);
        assert_eq!(rate_to_ppm(0.001), 1_000);
        assert_eq!(rate_to_ppm(0.20), 200_000);
    }

    #[test]
    fn test_apply_rate_truncates() {
        assert_eq!(apply_rate(100, 200_000), 20);
        assert_eq!(apply_rate(7, 500_000), 3);
        assert_eq!(apply_rate(u64::MAX, 2 * RATE_SCALE), u64::MAX);
    }
}
