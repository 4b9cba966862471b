use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use spawn_director_core::{
    ConfigError, DifficultyIndex, DifficultyLevel, DifficultyTable, EnemyKind, Placement,
    PresetTemplate, VariantId, VariantSlot, WaveSettings, DEFAULT_SECTOR_COUNT,
};
use spawn_director_presets::PresetCatalog;
use thiserror::Error;

const RANDOM_VARIANT: &str = "random";

/// Ring layout and load bookkeeping parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SectorTuning {
    /// Number of angular sectors around the protagonist.
    pub count: u16,
    /// Load no sector ever drops below.
    pub floor: f32,
    /// Lower bound applied to per-entity cost weights.
    pub min_cost: f32,
    /// Load removed from every sector per second.
    pub decay_rate: f32,
    /// Sectors at most this far above the floor count as empty.
    pub quiet_threshold: f32,
}

impl Default for SectorTuning {
    fn default() -> Self {
        Self {
            count: DEFAULT_SECTOR_COUNT,
            floor: 0.0,
            min_cost: 0.1,
            decay_rate: 0.05,
            quiet_threshold: 0.05,
        }
    }
}

/// Glitch accumulation parameters. Intervals are in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlitchTuning {
    /// Shortest wait between two accumulation steps.
    pub interval_min: f32,
    /// Longest wait between two accumulation steps.
    pub interval_max: f32,
    /// Chance added per accumulation step.
    pub accumulation_rate: f32,
    /// Ceiling of the accumulated chance.
    pub max_chance: f32,
    /// Jitter, in sectors, applied around the balanced default.
    pub deviation: u16,
}

impl Default for GlitchTuning {
    fn default() -> Self {
        Self {
            interval_min: 8.0,
            interval_max: 16.0,
            accumulation_rate: 0.02,
            max_chance: 0.25,
            deviation: 1,
        }
    }
}

/// Scheduler cadence and session parameters.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleTuning {
    /// Seconds one preset cooldown cycle delays the next spawn pass.
    pub cycle_length: f32,
    /// Seed of the director's random stream.
    pub seed: u64,
    /// Difficulty index selected on construction and on reset.
    pub starting_difficulty: u32,
}

impl Default for ScheduleTuning {
    fn default() -> Self {
        Self {
            cycle_length: 1.0,
            seed: 0x5eed_d1ec_7042,
            starting_difficulty: 0,
        }
    }
}

/// Everything needed to construct a [`crate::SpawnDirector`].
#[derive(Clone, Debug)]
pub struct DirectorConfig {
    /// Ring and load parameters.
    pub sectors: SectorTuning,
    /// Glitch parameters.
    pub glitch: GlitchTuning,
    /// Scheduler parameters.
    pub schedule: ScheduleTuning,
    /// Validated difficulty levels.
    pub difficulties: DifficultyTable,
    /// Validated preset templates.
    pub catalog: PresetCatalog,
}

impl DirectorConfig {
    /// Wraps validated tables with default tuning sized to the catalog's ring.
    #[must_use]
    pub fn new(difficulties: DifficultyTable, catalog: PresetCatalog) -> Self {
        let sectors = SectorTuning {
            count: catalog.sector_count(),
            ..SectorTuning::default()
        };
        Self {
            sectors,
            glitch: GlitchTuning::default(),
            schedule: ScheduleTuning::default(),
            difficulties,
            catalog,
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, LoadError> {
        let raw: RawConfig = toml::from_str(contents)?;
        raw.validate()
    }

    /// Reads and validates the TOML document at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

/// Reasons a configuration document could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read director config at {}", path.display())]
    Io {
        /// Location that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not valid TOML for the expected layout.
    #[error("failed to parse director config")]
    Parse(#[from] toml::de::Error),
    /// The document parsed but describes an unusable director.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Converts a seconds value into a [`Duration`], rejecting negative or non-finite input.
pub(crate) fn seconds(value: f32, field: &'static str) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f32(value).map_err(|_| ConfigError::InvalidTuning { field })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    sectors: SectorTuning,
    #[serde(default)]
    glitch: GlitchTuning,
    #[serde(default)]
    schedule: ScheduleTuning,
    #[serde(default, rename = "difficulty")]
    difficulties: Vec<RawDifficulty>,
    #[serde(default, rename = "preset")]
    presets: Vec<RawPreset>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDifficulty {
    label: String,
    tokens: f32,
    #[serde(default)]
    wave: Option<RawWave>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWave {
    threshold: u32,
    duration: f32,
    spawn_interval: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPreset {
    label: String,
    cost: f32,
    #[serde(default)]
    cooldown: u32,
    difficulties: Vec<DifficultyIndex>,
    #[serde(default, rename = "placement")]
    placements: Vec<RawPlacement>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlacement {
    kind: EnemyKind,
    #[serde(default)]
    variant: RawVariant,
    sector: u16,
    #[serde(default = "single")]
    count: u32,
    #[serde(default)]
    death_timer_reduction: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVariant {
    Fixed(VariantId),
    Keyword(String),
}

impl Default for RawVariant {
    fn default() -> Self {
        Self::Keyword(RANDOM_VARIANT.to_owned())
    }
}

fn single() -> u32 {
    1
}

impl RawConfig {
    fn validate(self) -> Result<DirectorConfig, LoadError> {
        let levels = self
            .difficulties
            .into_iter()
            .map(RawDifficulty::into_level)
            .collect::<Result<Vec<_>, _>>()?;
        let difficulties = DifficultyTable::new(levels)?;

        let templates = self
            .presets
            .into_iter()
            .map(RawPreset::into_template)
            .collect::<Result<Vec<_>, _>>()?;
        let catalog = PresetCatalog::new(templates, self.sectors.count)?;

        Ok(DirectorConfig {
            sectors: self.sectors,
            glitch: self.glitch,
            schedule: self.schedule,
            difficulties,
            catalog,
        })
    }
}

impl RawDifficulty {
    fn into_level(self) -> Result<DifficultyLevel, ConfigError> {
        let level = DifficultyLevel::new(self.label, self.tokens);
        let Some(wave) = self.wave else {
            return Ok(level);
        };
        Ok(level.with_wave(WaveSettings {
            threshold: wave.threshold,
            duration: seconds(wave.duration, "difficulty.wave.duration")?,
            spawn_interval: seconds(wave.spawn_interval, "difficulty.wave.spawn_interval")?,
        }))
    }
}

impl RawPreset {
    /// Builds the template, or `None` when a placement names an unknown variant.
    fn into_template(self) -> Result<Option<PresetTemplate>, ConfigError> {
        let mut placements = Vec::with_capacity(self.placements.len());
        for raw in self.placements {
            let variant = match raw.variant {
                RawVariant::Fixed(id) => VariantSlot::Fixed(id),
                RawVariant::Keyword(keyword) if keyword.eq_ignore_ascii_case(RANDOM_VARIANT) => {
                    VariantSlot::Random
                }
                RawVariant::Keyword(value) => {
                    log::warn!(
                        "preset '{}' names unknown variant '{value}'; leaving its slot vacant",
                        self.label
                    );
                    return Ok(None);
                }
            };
            placements.push(Placement {
                kind: raw.kind,
                variant,
                relative_sector: raw.sector,
                count: raw.count,
                death_timer_reduction: seconds(
                    raw.death_timer_reduction,
                    "preset.placement.death_timer_reduction",
                )?,
            });
        }

        Ok(Some(PresetTemplate {
            label: self.label,
            cost: self.cost,
            cooldown: self.cooldown,
            difficulties: self.difficulties,
            placements,
        }))
    }
}
