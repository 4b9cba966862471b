#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the spawn director workspace.
//!
//! This crate defines the vocabulary that connects the director's systems and
//! the host arena. Identifiers are small integer newtypes so every system can
//! keep dense arrays indexed by id. Static configuration lives in
//! [`DifficultyTable`] and [`PresetTemplate`], hydrated spawns travel as
//! [`SpawnRequest`] values, and destroyed entities report back through
//! [`RefundMetadata`]. The host plugs in through the [`EntityPool`],
//! [`GeometryProvider`] and [`EnemyMetadataProvider`] traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position in the arena expressed in world units.
pub type WorldPosition = glam::Vec2;

/// Number of angular sectors surrounding the protagonist by default.
pub const DEFAULT_SECTOR_COUNT: u16 = 12;

/// Identifier of an angular sector within the ring.
///
/// Sectors are numbered from zero, clockwise from the reference angle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(u16);

impl SectorId {
    /// Creates a new sector identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Index of the sector inside dense per-sector arrays.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Resolves a 1-based offset relative to this sector onto the ring.
    ///
    /// Returns `None` when `relative` lies outside `1..=sector_count`, which
    /// only happens for malformed preset data.
    #[must_use]
    pub fn offset(self, relative: u16, sector_count: u16) -> Option<SectorId> {
        if relative == 0 || relative > sector_count {
            return None;
        }
        let absolute = (u32::from(self.0) + u32::from(relative) - 1) % u32::from(sector_count);
        u16::try_from(absolute).ok().map(SectorId::new)
    }

    /// Sector directly across the ring from this one.
    #[must_use]
    pub fn opposite(self, sector_count: u16) -> SectorId {
        if sector_count == 0 {
            return self;
        }
        let across = (u32::from(self.0) + u32::from(sector_count / 2)) % u32::from(sector_count);
        u16::try_from(across).map_or(self, SectorId)
    }
}

/// Position of a difficulty level inside the [`DifficultyTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DifficultyIndex(u32);

impl DifficultyIndex {
    /// Creates a new difficulty index with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a preset slot inside the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresetId(u32);

impl PresetId {
    /// Creates a new preset identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index of the preset inside dense per-preset arrays.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Kind of hostile entity the pool knows how to instantiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyKind(u16);

impl EnemyKind {
    /// Creates a new enemy kind with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the kind.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Concrete visual/behavioural variant of an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(u16);

impl VariantId {
    /// Creates a new variant identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Variant requested by a placement, resolved when the preset is hydrated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariantSlot {
    /// Always spawn the provided variant.
    Fixed(VariantId),
    /// Pick uniformly among the variants the metadata provider lists for the kind.
    Random,
}

/// Opaque handle the entity pool assigns to a live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    /// Creates a new handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a batch of entities sharing a leader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    /// Creates a new group identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Static description of one difficulty level.
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyLevel {
    index: DifficultyIndex,
    label: String,
    default_tokens: f32,
    wave: Option<WaveSettings>,
}

/// Wave-mode parameters attached to a difficulty level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveSettings {
    /// Tokens that must be returned before a wave begins.
    pub threshold: u32,
    /// How long a wave lasts once it begins.
    pub duration: Duration,
    /// Upper bound on the delay between spawn passes while a wave runs.
    pub spawn_interval: Duration,
}

impl DifficultyLevel {
    /// Creates a level without wave mode. The index is assigned by the table.
    #[must_use]
    pub fn new(label: impl Into<String>, default_tokens: f32) -> Self {
        Self {
            index: DifficultyIndex::new(0),
            label: label.into(),
            default_tokens,
            wave: None,
        }
    }

    /// Enables wave mode for the level.
    #[must_use]
    pub fn with_wave(mut self, wave: WaveSettings) -> Self {
        self.wave = Some(wave);
        self
    }

    /// Position of the level inside its table.
    #[must_use]
    pub const fn index(&self) -> DifficultyIndex {
        self.index
    }

    /// Human readable name.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Token ceiling, also the budget granted when the level is selected.
    #[must_use]
    pub const fn default_tokens(&self) -> f32 {
        self.default_tokens
    }

    /// Whether the level ever enters wave mode.
    #[must_use]
    pub const fn wave_enabled(&self) -> bool {
        self.wave.is_some()
    }

    /// Wave parameters, when wave mode is enabled.
    #[must_use]
    pub const fn wave(&self) -> Option<&WaveSettings> {
        self.wave.as_ref()
    }

    /// Count of returned tokens that unlocks wave mode.
    ///
    /// Levels without wave mode report `u32::MAX` so the gate never opens.
    #[must_use]
    pub fn wave_threshold(&self) -> u32 {
        self.wave.map_or(u32::MAX, |wave| wave.threshold)
    }
}

/// Ordered, non-empty list of difficulty levels.
#[derive(Clone, Debug, PartialEq)]
pub struct DifficultyTable {
    levels: Vec<DifficultyLevel>,
}

impl DifficultyTable {
    /// Builds a table, assigning each level its positional index.
    pub fn new(levels: Vec<DifficultyLevel>) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyDifficultyTable);
        }

        let mut indexed = Vec::with_capacity(levels.len());
        for (position, mut level) in levels.into_iter().enumerate() {
            if !level.default_tokens.is_finite() || level.default_tokens < 0.0 {
                return Err(ConfigError::InvalidTokenCeiling { label: level.label });
            }
            let position =
                u32::try_from(position).map_err(|_| ConfigError::TooManyDifficultyLevels)?;
            level.index = DifficultyIndex::new(position);
            indexed.push(level);
        }

        Ok(Self { levels: indexed })
    }

    /// Looks up a level by index.
    #[must_use]
    pub fn get(&self, index: DifficultyIndex) -> Option<&DifficultyLevel> {
        self.levels.get(index.get() as usize)
    }

    /// Number of levels in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; an empty table cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Iterator over the levels in index order.
    pub fn iter(&self) -> impl Iterator<Item = &DifficultyLevel> {
        self.levels.iter()
    }
}

/// One group of identical entities inside a preset.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Kind of entity to spawn.
    pub kind: EnemyKind,
    /// Variant to spawn, possibly resolved at random.
    pub variant: VariantSlot,
    /// 1-based sector offset from the main sector chosen for the preset.
    pub relative_sector: u16,
    /// Number of entities spawned by this placement.
    pub count: u32,
    /// How much each entity's death pulls the next spawn pass forward.
    pub death_timer_reduction: Duration,
}

/// Multi-entity encounter template with a cost and a cooldown.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetTemplate {
    /// Designer facing name used in logs.
    pub label: String,
    /// Tokens spent when the preset is committed.
    pub cost: f32,
    /// Spend-cycles the preset stays unavailable after being committed.
    pub cooldown: u32,
    /// Difficulty levels allowed to use the preset.
    pub difficulties: Vec<DifficultyIndex>,
    /// Entities spawned by the preset.
    pub placements: Vec<Placement>,
}

impl PresetTemplate {
    /// Reports whether the preset may be used at the provided difficulty.
    #[must_use]
    pub fn allows(&self, difficulty: DifficultyIndex) -> bool {
        self.difficulties.contains(&difficulty)
    }

    /// Total number of entities across all placements.
    #[must_use]
    pub fn total_entities(&self) -> u32 {
        self.placements
            .iter()
            .fold(0_u32, |total, placement| total.saturating_add(placement.count))
    }
}

/// Bookkeeping returned to the director when a spawned entity is destroyed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefundMetadata {
    /// Handle of the destroyed entity.
    pub handle: EntityHandle,
    /// Kind of the destroyed entity, kept for telemetry.
    pub kind: EnemyKind,
    /// Sector whose load the entity contributed to.
    pub sector: SectorId,
    /// Cost weight committed to the sector for this entity.
    pub cost_weight: f32,
    /// Tokens handed back to the economy.
    pub tokens_to_return: f32,
    /// Share of the preset cooldown attributed to the entity.
    pub cooldown_share: f32,
    /// Amount by which the next spawn pass is pulled forward.
    pub timer_reduction: Duration,
    /// Leadership group the entity belonged to, if any.
    pub group: Option<GroupId>,
}

/// Concrete entity the director asks the pool to spawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Preset the request was hydrated from.
    pub preset: PresetId,
    /// Kind of entity to spawn.
    pub kind: EnemyKind,
    /// Resolved variant.
    pub variant: VariantId,
    /// Absolute sector the entity is placed in.
    pub sector: SectorId,
    /// World position of the sector's spawn point.
    pub position: WorldPosition,
    /// Load weight per entity committed to the sector.
    pub cost_weight: f32,
    /// Share of the preset cost returned when the entity dies.
    pub tokens_to_return: f32,
    /// Share of the preset cooldown attributed to this entity.
    pub cooldown_share: f32,
    /// Amount by which the entity's death pulls the next pass forward.
    pub timer_reduction: Duration,
}

impl SpawnRequest {
    /// Builds the refund message that travels back when the entity dies.
    #[must_use]
    pub fn refund_for(&self, handle: EntityHandle, group: Option<GroupId>) -> RefundMetadata {
        RefundMetadata {
            handle,
            kind: self.kind,
            sector: self.sector,
            cost_weight: self.cost_weight,
            tokens_to_return: self.tokens_to_return,
            cooldown_share: self.cooldown_share,
            timer_reduction: self.timer_reduction,
            group,
        }
    }
}

/// Host-side pool that owns entity instances.
pub trait EntityPool {
    /// Instantiates an entity, returning `None` when the pool cannot supply one.
    fn spawn_at(
        &mut self,
        position: WorldPosition,
        kind: EnemyKind,
        variant: VariantId,
    ) -> Option<EntityHandle>;

    /// Attaches the refund message the pool must send back when `handle` dies.
    fn bind_refund(&mut self, handle: EntityHandle, refund: RefundMetadata);
}

/// Maps sectors onto world positions.
pub trait GeometryProvider {
    /// Spawn point for the provided sector.
    fn position_for(&self, sector: SectorId) -> WorldPosition;
}

/// Static per-kind data the director needs for balancing.
pub trait EnemyMetadataProvider {
    /// Load weight of a single entity of the kind.
    fn cost_weight(&self, kind: EnemyKind) -> f32;

    /// Variants a `Random` slot may resolve to.
    fn variants(&self, kind: EnemyKind) -> &[VariantId];
}

/// Places sector spawn points on a circle around a centre point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    centre: WorldPosition,
    radius: f32,
    sector_count: u16,
}

impl RingGeometry {
    /// Creates a ring of `sector_count` spawn points at `radius` from `centre`.
    #[must_use]
    pub const fn new(centre: WorldPosition, radius: f32, sector_count: u16) -> Self {
        Self {
            centre,
            radius,
            sector_count,
        }
    }

    /// Moves the ring, typically to follow the protagonist.
    pub fn recentre(&mut self, centre: WorldPosition) {
        self.centre = centre;
    }
}

impl GeometryProvider for RingGeometry {
    fn position_for(&self, sector: SectorId) -> WorldPosition {
        if self.sector_count == 0 {
            return self.centre;
        }
        let width = std::f32::consts::TAU / f32::from(self.sector_count);
        let angle = (f32::from(sector.get()) + 0.5) * width;
        self.centre + glam::Vec2::from_angle(angle) * self.radius
    }
}

/// Fatal configuration problems that prevent the director from running.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// No difficulty level was configured.
    #[error("difficulty table is empty")]
    EmptyDifficultyTable,
    /// More levels than a difficulty index can address.
    #[error("difficulty table has too many levels")]
    TooManyDifficultyLevels,
    /// A level's token ceiling was negative or not finite.
    #[error("difficulty level '{label}' has an invalid token ceiling")]
    InvalidTokenCeiling {
        /// Label of the offending level.
        label: String,
    },
    /// The preset catalog holds no usable template.
    #[error("preset catalog has no usable template")]
    EmptyPresetCatalog,
    /// The sector ring was configured with no sectors.
    #[error("sector ring must contain at least one sector")]
    NoSectors,
    /// The starting difficulty does not exist in the table.
    #[error("starting difficulty {index} is out of range for {levels} levels")]
    StartingDifficultyOutOfRange {
        /// Requested index.
        index: u32,
        /// Number of configured levels.
        levels: usize,
    },
    /// A tuning value was negative, inverted or not finite.
    #[error("invalid tuning value for '{field}'")]
    InvalidTuning {
        /// Name of the offending field.
        field: &'static str,
    },
}
