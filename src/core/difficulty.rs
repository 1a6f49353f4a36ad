use crate::config::Config;
use crate::core::proof_of_work::MAX_DIFFICULTY;
use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::info;

// Reaction band around the target block time
const SPEED_UP_RATIO: f64 = 0.7;
const SLOW_DOWN_RATIO: f64 = 1.5;

/// Halvings after which the reward is exhausted
const MAX_HALVINGS: u64 = 64;

/// Tracks the mining difficulty and computes block rewards
#[derive(Debug, Clone)]
pub struct DifficultyController {
    difficulty: u32,
    min_difficulty: u32,
    max_difficulty: u32,
    target_block_time_ms: u64,
    adjustment_window: usize,
    base_reward: u64,
    halving_interval: Option<u64>,
}

impl DifficultyController {
    pub fn from_config(config: &Config) -> Result<DifficultyController> {
        let min_difficulty = config.min_difficulty;
        let max_difficulty = config.max_difficulty;
        if min_difficulty == 0 || min_difficulty > max_difficulty || max_difficulty > MAX_DIFFICULTY
        {
            return Err(BlockchainError::Config(format!(
                "Difficulty bounds {min_difficulty}..={max_difficulty} must lie within 1..={MAX_DIFFICULTY}"
            )));
        }
        if config.halving_interval == Some(0) {
            return Err(BlockchainError::Config(
                "Halving interval must be positive".to_string(),
            ));
        }
        Ok(DifficultyController {
            difficulty: config
                .initial_difficulty
                .clamp(min_difficulty, max_difficulty),
            min_difficulty,
            max_difficulty,
            target_block_time_ms: config.target_block_time_secs.saturating_mul(1_000),
            adjustment_window: config.adjustment_window.max(1),
            base_reward: config.base_reward,
            halving_interval: config.halving_interval,
        })
    }

    /// Reward for the block at `height`; genesis earns nothing
    pub fn reward_for_height(&self, height: u64) -> u64 {
        if height == 0 {
            return 0;
        }
        match self.halving_interval {
            None => self.base_reward,
            Some(interval) => {
                let halvings = (height - 1) / interval;
                if halvings >= MAX_HALVINGS {
                    0
                } else {
                    self.base_reward >> halvings
                }
            }
        }
    }

    /// Mean recorded mining duration over the last window of non-genesis blocks
    pub fn average_mining_time(&self, chain: &[Block]) -> Option<u64> {
        let mined = chain.get(1..).unwrap_or_default();
        let window = &mined[mined.len().saturating_sub(self.adjustment_window)..];
        let durations: Vec<u64> = window
            .iter()
            .filter_map(Block::get_mining_duration_ms)
            .collect();
        if durations.is_empty() {
            return None;
        }
        Some(durations.iter().sum::<u64>() / durations.len() as u64)
    }

    /// Recalibrate after a locally mined block; returns the (possibly unchanged) difficulty
    pub fn adjust(&mut self, chain: &[Block]) -> u32 {
        if chain.len().saturating_sub(1) < self.adjustment_window {
            return self.difficulty;
        }
        let Some(average) = self.average_mining_time(chain) else {
            return self.difficulty;
        };

        let target = self.target_block_time_ms as f64;
        let current = self.difficulty;
        let next = if (average as f64) < SPEED_UP_RATIO * target {
            current.saturating_add(1)
        } else if (average as f64) > SLOW_DOWN_RATIO * target {
            current.saturating_sub(1)
        } else {
            current
        }
        .clamp(self.min_difficulty, self.max_difficulty);

        if next != current {
            info!(
                "Difficulty adjustment at height {}: {current} -> {next} (average: {average}ms, target: {}ms)",
                chain.len() - 1,
                self.target_block_time_ms
            );
        }
        self.difficulty = next;
        next
    }

    pub fn validate_difficulty(&self, difficulty: u32) -> Result<()> {
        if difficulty < self.min_difficulty || difficulty > self.max_difficulty {
            return Err(BlockchainError::Config(format!(
                "Difficulty {difficulty} is outside {}..={}",
                self.min_difficulty, self.max_difficulty
            )));
        }
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: u32) -> Result<()> {
        self.validate_difficulty(difficulty)?;
        info!("Difficulty set manually: {} -> {difficulty}", self.difficulty);
        self.difficulty = difficulty;
        Ok(())
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_base_reward(&self) -> u64 {
        self.base_reward
    }

    pub fn get_halving_interval(&self) -> Option<u64> {
        self.halving_interval
    }
}
