#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Token budget that gates how much the director may spawn.
//!
//! `current` is the spendable budget, clamped to the active difficulty's
//! ceiling. `returned` counts every token that was either committed to the
//! arena or handed back by a destroyed entity; it is never spent and only
//! gates wave mode.

use spawn_director_core::DifficultyLevel;

/// Spendable budget plus the cumulative returned counter.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenEconomy {
    current: f32,
    ceiling: f32,
    returned: u32,
    wave_enabled: bool,
    wave_threshold: u32,
}

impl TokenEconomy {
    /// Creates an economy primed for the provided level.
    #[must_use]
    pub fn new(level: &DifficultyLevel) -> Self {
        let mut economy = Self {
            current: 0.0,
            ceiling: 0.0,
            returned: 0,
            wave_enabled: false,
            wave_threshold: u32::MAX,
        };
        economy.reset_for_difficulty(level);
        economy
    }

    /// Replaces every field with the values implied by `level`.
    pub fn reset_for_difficulty(&mut self, level: &DifficultyLevel) {
        self.ceiling = level.default_tokens().max(0.0);
        self.current = self.ceiling;
        self.returned = 0;
        self.wave_enabled = level.wave_enabled();
        self.wave_threshold = level.wave_threshold();
    }

    /// Debits `cost` when the budget covers it.
    ///
    /// A successful spend also counts toward `returned`, rounded to the
    /// nearest whole token.
    pub fn spend(&mut self, cost: f32) -> bool {
        if !cost.is_finite() || cost < 0.0 || self.current < cost {
            return false;
        }
        self.current = (self.current - cost).max(0.0);
        self.returned = self.returned.saturating_add(whole_tokens(cost));
        true
    }

    /// Credits `amount` back, capped at the ceiling.
    pub fn refund(&mut self, amount: f32) {
        if !amount.is_finite() || amount < 0.0 {
            log::warn!("ignoring invalid token refund of {amount}");
            return;
        }
        self.current = (self.current + amount).min(self.ceiling);
        self.returned = self.returned.saturating_add(whole_tokens(amount));
    }

    /// Spendable budget.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Upper bound of the spendable budget.
    #[must_use]
    pub const fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Tokens spent or refunded since the last reset.
    #[must_use]
    pub const fn returned(&self) -> u32 {
        self.returned
    }

    /// Reports whether enough tokens were returned to unlock wave mode.
    #[must_use]
    pub const fn is_wave_mode(&self) -> bool {
        self.wave_enabled && self.returned >= self.wave_threshold
    }
}

fn whole_tokens(amount: f32) -> u32 {
    // `as` saturates for out-of-range floats.
    amount.round() as u32
}
