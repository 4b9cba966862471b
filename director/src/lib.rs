#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn director that decides when, where and what hostile entities enter the arena.
//!
//! The director wires the token economy, sector load tracker, preset selector,
//! glitch randomizer and leadership registry together behind a single
//! tick-driven control surface. The host owns the entity pool, geometry and
//! enemy metadata and lends them to [`SpawnDirector::tick`]; destroyed
//! entities report back through a [`RefundSender`].

mod config;
mod hydrate;
mod scheduler;

use std::{
    path::Path,
    sync::mpsc::{self, Receiver, Sender},
    time::Duration,
};

use anyhow::Context;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spawn_director_core::{
    ConfigError, DifficultyIndex, DifficultyLevel, DifficultyTable, PresetId, RefundMetadata,
    SpawnRequest,
};
use spawn_director_glitch::{self as glitch, GlitchRandomizer};
use spawn_director_leadership::GroupRegistry;
use spawn_director_presets::{self as presets, PresetCatalog, PresetCooldowns, PresetSelector};
use spawn_director_sector_load::{self as sector_load, SectionLoadTracker};
use spawn_director_token_economy::TokenEconomy;
use thiserror::Error;

pub use config::{DirectorConfig, GlitchTuning, LoadError, ScheduleTuning, SectorTuning};
pub use scheduler::{Phase, SpawnedEntity, TickReport};

/// Errors surfaced by the director's constructors and control surface.
#[derive(Debug, Error, PartialEq)]
pub enum DirectorError {
    /// The configuration cannot produce a working director.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The requested difficulty index is not part of the table.
    #[error("difficulty {index} is not configured")]
    UnknownDifficulty {
        /// Requested index.
        index: u32,
    },
}

/// Cloneable handle the entity pool uses to report destroyed entities.
#[derive(Clone, Debug)]
pub struct RefundSender {
    inner: Sender<RefundMetadata>,
}

impl RefundSender {
    /// Queues a refund for the next tick. Returns `false` once the director is gone.
    pub fn send(&self, refund: RefundMetadata) -> bool {
        self.inner.send(refund).is_ok()
    }
}

/// Tick-driven spawn director.
#[derive(Debug)]
pub struct SpawnDirector {
    difficulties: DifficultyTable,
    starting_difficulty: DifficultyIndex,
    difficulty: DifficultyIndex,
    catalog: PresetCatalog,
    cooldowns: PresetCooldowns,
    economy: TokenEconomy,
    loads: SectionLoadTracker,
    selector: PresetSelector,
    glitch: GlitchRandomizer,
    deviation: u16,
    groups: GroupRegistry,
    schedule: scheduler::Schedule,
    rng: ChaCha8Rng,
    refund_tx: Sender<RefundMetadata>,
    refund_rx: Receiver<RefundMetadata>,
    requests: Vec<SpawnRequest>,
}

impl SpawnDirector {
    /// Validates `config` and builds a director at the configured starting difficulty.
    pub fn new(config: DirectorConfig) -> Result<Self, DirectorError> {
        Self::build(config).map_err(|error| {
            log::error!("spawn director configuration rejected: {error}");
            DirectorError::Config(error)
        })
    }

    /// Loads a TOML configuration from disk and builds a director from it.
    pub fn from_config_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = DirectorConfig::from_path(path)
            .with_context(|| format!("failed to load director config from {}", path.display()))?;
        Self::new(config).context("failed to build spawn director")
    }

    fn build(config: DirectorConfig) -> Result<Self, ConfigError> {
        let DirectorConfig {
            sectors,
            glitch: glitch_tuning,
            schedule,
            difficulties,
            catalog,
        } = config;

        let starting_difficulty = DifficultyIndex::new(schedule.starting_difficulty);
        let level = difficulties.get(starting_difficulty).ok_or(
            ConfigError::StartingDifficultyOutOfRange {
                index: schedule.starting_difficulty,
                levels: difficulties.len(),
            },
        )?;

        if sectors.count == 0 {
            return Err(ConfigError::NoSectors);
        }
        if catalog.sector_count() != sectors.count {
            return Err(ConfigError::InvalidTuning {
                field: "sectors.count",
            });
        }
        finite_non_negative(sectors.floor, "sectors.floor")?;
        finite_non_negative(sectors.min_cost, "sectors.min_cost")?;
        finite_non_negative(sectors.decay_rate, "sectors.decay_rate")?;
        finite_non_negative(sectors.quiet_threshold, "sectors.quiet_threshold")?;
        finite_non_negative(glitch_tuning.accumulation_rate, "glitch.accumulation_rate")?;
        finite_non_negative(glitch_tuning.max_chance, "glitch.max_chance")?;

        let glitch_config = glitch::Config::new(
            config::seconds(glitch_tuning.interval_min, "glitch.interval_min")?,
            config::seconds(glitch_tuning.interval_max, "glitch.interval_max")?,
            glitch_tuning.accumulation_rate,
            glitch_tuning.max_chance,
        );
        let cycle_length = config::seconds(schedule.cycle_length, "schedule.cycle_length")?;

        let mut rng = ChaCha8Rng::seed_from_u64(schedule.seed);
        let glitch = GlitchRandomizer::new(glitch_config, Duration::ZERO, &mut rng);
        let economy = TokenEconomy::new(level);
        let cooldowns = PresetCooldowns::new(&catalog);
        let loads = SectionLoadTracker::new(sector_load::Config::new(
            sectors.count,
            sectors.floor,
            sectors.min_cost,
            sectors.decay_rate,
        ));
        let (refund_tx, refund_rx) = mpsc::channel();

        log::info!(
            "spawn director ready at difficulty '{}' with {} presets over {} sectors",
            level.label(),
            catalog.iter().count(),
            sectors.count
        );

        Ok(Self {
            difficulties,
            starting_difficulty,
            difficulty: starting_difficulty,
            catalog,
            cooldowns,
            economy,
            loads,
            selector: PresetSelector::new(presets::Config::new(sectors.quiet_threshold)),
            glitch,
            deviation: glitch_tuning.deviation,
            groups: GroupRegistry::new(),
            schedule: scheduler::Schedule::new(cycle_length),
            rng,
            refund_tx,
            refund_rx,
            requests: Vec::new(),
        })
    }

    /// Handle the entity pool uses to send refunds back to the director.
    #[must_use]
    pub fn refund_sender(&self) -> RefundSender {
        RefundSender {
            inner: self.refund_tx.clone(),
        }
    }

    /// Switches to another difficulty level.
    ///
    /// Resets the budget, the returned counter and every cooldown, rearms the
    /// wave surge and makes the next spawn pass due immediately. Sector loads
    /// are left untouched.
    pub fn set_difficulty(&mut self, index: DifficultyIndex) -> Result<(), DirectorError> {
        let Some(level) = self.difficulties.get(index) else {
            return Err(DirectorError::UnknownDifficulty { index: index.get() });
        };
        log::info!("difficulty changed to '{}'", level.label());
        self.economy.reset_for_difficulty(level);
        self.cooldowns.clear();
        self.schedule.restart();
        self.difficulty = index;
        Ok(())
    }

    /// Returns to the configured starting difficulty.
    pub fn reset_difficulty(&mut self) {
        let level = self.starting_difficulty;
        if let Err(error) = self.set_difficulty(level) {
            log::error!("starting difficulty vanished: {error}");
        }
    }

    /// Spendable budget.
    #[must_use]
    pub fn current_tokens(&self) -> f32 {
        self.economy.current()
    }

    /// Tokens spent or refunded since the last difficulty selection.
    #[must_use]
    pub fn returned_tokens(&self) -> u32 {
        self.economy.returned()
    }

    /// Reports whether enough tokens were returned to unlock wave mode.
    #[must_use]
    pub fn is_wave_mode(&self) -> bool {
        self.economy.is_wave_mode()
    }

    /// Reports whether the relaxed wave spawn interval is in effect.
    #[must_use]
    pub fn is_wave_running(&self) -> bool {
        self.schedule.wave_running()
    }

    /// Active difficulty index.
    #[must_use]
    pub fn current_difficulty_index(&self) -> DifficultyIndex {
        self.difficulty
    }

    /// Active difficulty level.
    #[must_use]
    pub fn current_difficulty(&self) -> Option<&DifficultyLevel> {
        self.difficulties.get(self.difficulty)
    }

    /// Per-sector loads.
    #[must_use]
    pub fn sector_loads(&self) -> &[f32] {
        self.loads.weights()
    }

    /// Current glitch chance.
    #[must_use]
    pub fn glitch_chance(&self) -> f32 {
        self.glitch.chance()
    }

    /// Overrides the glitch chance, clamped to the configured maximum.
    pub fn force_glitch_chance(&mut self, chance: f32) {
        self.glitch.force_chance(chance);
    }

    /// Arena time at which the next spawn pass becomes due.
    #[must_use]
    pub fn next_spawn_time(&self) -> Duration {
        self.schedule.next_spawn()
    }

    /// Last time observed by [`SpawnDirector::tick`].
    #[must_use]
    pub fn now(&self) -> Duration {
        self.schedule.now()
    }

    /// Scheduler state after the last tick.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.schedule.phase()
    }

    /// Cooldown cycles left for a preset.
    #[must_use]
    pub fn cooldown(&self, preset: PresetId) -> u32 {
        self.cooldowns.remaining(preset)
    }

    /// Preset templates the director chooses from.
    #[must_use]
    pub fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    /// Live leadership groups.
    #[must_use]
    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }
}

fn finite_non_negative(value: f32, field: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTuning { field })
    }
}
