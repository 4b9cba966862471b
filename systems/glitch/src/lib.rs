#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Slowly accumulating override that occasionally ignores sector balancing.
//!
//! At randomized intervals the glitch chance grows by a fixed step. Every
//! main-sector roll first tests that chance: on a hit the chance drops back to
//! zero and a uniformly random sector is returned, otherwise the balanced
//! heuristic decides.

use std::time::Duration;

use rand::Rng;
use spawn_director_core::SectorId;
use spawn_director_sector_load::SectionLoadTracker;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration parameters required to construct the randomizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    interval_min: Duration,
    interval_max: Duration,
    accumulation_rate: f32,
    max_chance: f32,
}

impl Config {
    /// Creates a configuration.
    ///
    /// Accumulation happens every `interval_min..=interval_max`, adding
    /// `accumulation_rate` to the chance, which never exceeds `max_chance`.
    #[must_use]
    pub fn new(
        interval_min: Duration,
        interval_max: Duration,
        accumulation_rate: f32,
        max_chance: f32,
    ) -> Self {
        let (interval_min, interval_max) = if interval_min <= interval_max {
            (interval_min, interval_max)
        } else {
            (interval_max, interval_min)
        };
        Self {
            interval_min: interval_min.max(MIN_INTERVAL),
            interval_max: interval_max.max(MIN_INTERVAL),
            accumulation_rate: accumulation_rate.max(0.0),
            max_chance: max_chance.clamp(0.0, 1.0),
        }
    }
}

/// Accumulated probability of overriding the balanced sector choice.
#[derive(Clone, Debug)]
pub struct GlitchRandomizer {
    config: Config,
    chance: f32,
    now: Duration,
    next_accumulation: Duration,
}

impl GlitchRandomizer {
    /// Creates a randomizer with no accumulated chance, scheduled from `now`.
    pub fn new<R: Rng + ?Sized>(config: Config, now: Duration, rng: &mut R) -> Self {
        let mut glitch = Self {
            config,
            chance: 0.0,
            now,
            next_accumulation: now,
        };
        glitch.reschedule(rng);
        glitch
    }

    /// Advances the accumulation clock to `now`.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: Duration, rng: &mut R) {
        self.now = self.now.max(now);
        if self.now < self.next_accumulation {
            return;
        }
        self.chance = (self.chance + self.config.accumulation_rate).min(self.config.max_chance);
        log::trace!("glitch chance rose to {:.3}", self.chance);
        self.reschedule(rng);
    }

    /// Picks the main sector, overriding `balanced` when the glitch fires.
    pub fn roll_sector<R, F>(
        &mut self,
        loads: &SectionLoadTracker,
        rng: &mut R,
        balanced: F,
    ) -> SectorId
    where
        R: Rng + ?Sized,
        F: FnOnce(&SectionLoadTracker, &mut R) -> SectorId,
    {
        let draw: f32 = rng.gen();
        if draw >= self.chance {
            return balanced(loads, rng);
        }

        let sector_count = loads.sector_count().max(1);
        let sector = SectorId::new(rng.gen_range(0..sector_count));
        log::debug!(
            "glitch fired at chance {:.3}; forcing sector {}",
            self.chance,
            sector.get()
        );
        self.chance = 0.0;
        self.reschedule(rng);
        sector
    }

    /// Overrides the accumulated chance, clamped to the configured maximum.
    pub fn force_chance(&mut self, chance: f32) {
        self.chance = chance.clamp(0.0, self.config.max_chance);
    }

    /// Current probability that the next roll is overridden.
    #[must_use]
    pub const fn chance(&self) -> f32 {
        self.chance
    }

    /// Time of the next accumulation step.
    #[must_use]
    pub const fn next_accumulation(&self) -> Duration {
        self.next_accumulation
    }

    fn reschedule<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let min = self.config.interval_min.as_secs_f32();
        let max = self.config.interval_max.as_secs_f32();
        let wait = Duration::from_secs_f32(rng.gen_range(min..=max)).max(MIN_INTERVAL);
        self.next_accumulation = self.now.saturating_add(wait);
    }
}

/// Balanced default: the sector opposite the heaviest one, jittered by up to
/// `max_deviation` sectors either way.
pub fn balanced_sector<R: Rng + ?Sized>(
    loads: &SectionLoadTracker,
    max_deviation: u16,
    rng: &mut R,
) -> SectorId {
    let sector_count = loads.sector_count().max(1);
    let opposite = loads.heaviest().opposite(sector_count);
    let spread = i32::from(max_deviation);
    let deviation = rng.gen_range(-spread..=spread);
    let jittered = (i32::from(opposite.get()) + deviation).rem_euclid(i32::from(sector_count));
    SectorId::new(u16::try_from(jittered).unwrap_or(0))
}
