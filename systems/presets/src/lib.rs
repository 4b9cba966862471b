#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Preset catalog, cooldown tracking and balancing selection.
//!
//! A pass filters the catalog down to templates that are enabled for the
//! active difficulty, off cooldown and affordable. When the arena is quiet the
//! most expensive candidate wins outright. Otherwise every candidate is scored
//! by simulating its load on top of the current sector loads: the score is
//! twice the load it adds to the weakest sector minus the variance of the
//! resulting distribution.

mod catalog;

use rand::{seq::SliceRandom, Rng};
use spawn_director_core::{
    DifficultyIndex, EnemyMetadataProvider, PresetId, PresetTemplate, SectorId,
};
use spawn_director_sector_load::SectionLoadTracker;
use spawn_director_token_economy::TokenEconomy;

pub use catalog::{PresetCatalog, PresetCooldowns};

const SCORE_TOLERANCE: f32 = 1e-5;

/// Configuration parameters required to construct the selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    quiet_threshold: f32,
}

impl Config {
    /// Creates a configuration; sectors within `quiet_threshold` of the floor count as empty.
    #[must_use]
    pub const fn new(quiet_threshold: f32) -> Self {
        Self { quiet_threshold }
    }
}

/// Outcome of a successful selection pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Template that won the pass.
    pub preset: PresetId,
    /// Sector the template's relative placements are anchored to.
    pub main_sector: SectorId,
}

/// Read-only state a selection pass inspects.
pub struct SelectionContext<'a, M: ?Sized> {
    /// Templates to choose from.
    pub catalog: &'a PresetCatalog,
    /// Cooldown state per template.
    pub cooldowns: &'a PresetCooldowns,
    /// Budget the winner must fit in.
    pub economy: &'a TokenEconomy,
    /// Active difficulty level.
    pub difficulty: DifficultyIndex,
    /// Current sector loads.
    pub loads: &'a SectionLoadTracker,
    /// Per-kind weights used to simulate placements.
    pub metadata: &'a M,
}

/// Scores qualifying templates against the current sector loads.
#[derive(Debug)]
pub struct PresetSelector {
    quiet_threshold: f32,
    candidates: Vec<PresetId>,
    ties: Vec<PresetId>,
    simulated: Vec<f32>,
}

impl PresetSelector {
    /// Creates a selector with empty scratch buffers.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            quiet_threshold: config.quiet_threshold,
            candidates: Vec::new(),
            ties: Vec::new(),
            simulated: Vec::new(),
        }
    }

    /// Load above the floor at or below which the arena counts as quiet.
    #[must_use]
    pub const fn quiet_threshold(&self) -> f32 {
        self.quiet_threshold
    }

    /// Picks the template to spend on next, or `None` when nothing qualifies.
    ///
    /// `main_sector` is only consulted once at least one template qualifies,
    /// so a pass without candidates never disturbs the sector randomizer.
    pub fn select<M, R, F>(
        &mut self,
        context: &SelectionContext<'_, M>,
        rng: &mut R,
        main_sector: F,
    ) -> Option<Selection>
    where
        M: EnemyMetadataProvider + ?Sized,
        R: Rng + ?Sized,
        F: FnOnce(&SectionLoadTracker, &mut R) -> SectorId,
    {
        self.collect_candidates(context);
        if self.candidates.is_empty() {
            log::trace!("no preset qualifies this pass");
            return None;
        }

        let main = main_sector(context.loads, &mut *rng);

        let preset = if context.loads.is_quiet(self.quiet_threshold) {
            self.most_expensive(context.catalog)?
        } else {
            self.best_balanced(context, main, rng)?
        };

        Some(Selection {
            preset,
            main_sector: main,
        })
    }

    fn collect_candidates<M: ?Sized>(&mut self, context: &SelectionContext<'_, M>) {
        self.candidates.clear();
        let budget = context.economy.current();
        for (id, template) in context.catalog.iter() {
            if template.allows(context.difficulty)
                && context.cooldowns.is_ready(id)
                && template.cost <= budget
            {
                self.candidates.push(id);
            }
        }
    }

    fn most_expensive(&self, catalog: &PresetCatalog) -> Option<PresetId> {
        let mut best: Option<(PresetId, f32)> = None;
        for &id in &self.candidates {
            let Some(template) = catalog.get(id) else {
                continue;
            };
            if best.map_or(true, |(_, cost)| template.cost > cost) {
                best = Some((id, template.cost));
            }
        }
        best.map(|(id, _)| id)
    }

    fn best_balanced<M, R>(
        &mut self,
        context: &SelectionContext<'_, M>,
        main: SectorId,
        rng: &mut R,
    ) -> Option<PresetId>
    where
        M: EnemyMetadataProvider + ?Sized,
        R: Rng + ?Sized,
    {
        let weakest = context.loads.weakest();
        let mut best_score = f32::NEG_INFINITY;
        self.ties.clear();

        for index in 0..self.candidates.len() {
            let id = self.candidates[index];
            let Some(template) = context.catalog.get(id) else {
                continue;
            };

            simulate(
                &mut self.simulated,
                template,
                main,
                context.loads,
                context.metadata,
            );
            let added = self.simulated[weakest.index()] - context.loads.weights()[weakest.index()];
            let bonus = 2.0 * added;
            let score = bonus - variance(&self.simulated);
            log::trace!(
                "preset '{}' scores {score:.4} (bonus {bonus:.4})",
                template.label
            );

            if score > best_score + SCORE_TOLERANCE {
                best_score = score;
                self.ties.clear();
                self.ties.push(id);
            } else if (score - best_score).abs() <= SCORE_TOLERANCE {
                self.ties.push(id);
            }
        }

        self.ties.choose(rng).copied()
    }
}

/// Pays for a selection and starts its cooldown.
///
/// Returns `false` without touching cooldowns when the budget no longer
/// covers the template, e.g. because it changed since the selection pass.
pub fn commit(
    selection: &Selection,
    catalog: &PresetCatalog,
    cooldowns: &mut PresetCooldowns,
    economy: &mut TokenEconomy,
) -> bool {
    let Some(template) = catalog.get(selection.preset) else {
        log::warn!("preset slot {} vanished before commit", selection.preset.get());
        return false;
    };

    if !economy.spend(template.cost) {
        log::debug!(
            "preset '{}' no longer affordable ({} < {}); aborting",
            template.label,
            economy.current(),
            template.cost
        );
        return false;
    }

    cooldowns.start(selection.preset, template.cooldown);
    true
}

/// Writes the loads the arena would have after spawning `template` at `main`.
fn simulate<M>(
    out: &mut Vec<f32>,
    template: &PresetTemplate,
    main: SectorId,
    loads: &SectionLoadTracker,
    metadata: &M,
) where
    M: EnemyMetadataProvider + ?Sized,
{
    out.clear();
    out.extend_from_slice(loads.weights());
    let sector_count = loads.sector_count();
    for placement in &template.placements {
        let Some(sector) = main.offset(placement.relative_sector, sector_count) else {
            continue;
        };
        if let Some(load) = out.get_mut(sector.index()) {
            *load += loads.contribution(placement.count, metadata.cost_weight(placement.kind));
        }
    }
}

fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let count = values.len() as f32;
    let mean = values.iter().sum::<f32>() / count;
    values
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f32>()
        / count
}
