#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Decaying per-sector load used to spread spawns around the protagonist.

use std::time::Duration;

use spawn_director_core::SectorId;

/// Configuration parameters required to construct the tracker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    sector_count: u16,
    floor: f32,
    min_cost: f32,
    decay_rate: f32,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// `floor` is the lowest load any sector may hold, `min_cost` the smallest
    /// per-entity weight a commit may add and `decay_rate` the load shed by
    /// every sector per second.
    #[must_use]
    pub const fn new(sector_count: u16, floor: f32, min_cost: f32, decay_rate: f32) -> Self {
        Self {
            sector_count,
            floor,
            min_cost,
            decay_rate,
        }
    }
}

/// Load value per angular sector, kept at or above a floor.
#[derive(Clone, Debug)]
pub struct SectionLoadTracker {
    loads: Vec<f32>,
    floor: f32,
    min_cost: f32,
    decay_rate: f32,
}

impl SectionLoadTracker {
    /// Creates a tracker with every sector resting at the floor.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            loads: vec![config.floor; usize::from(config.sector_count)],
            floor: config.floor,
            min_cost: config.min_cost,
            decay_rate: config.decay_rate.max(0.0),
        }
    }

    /// Adds `count` entities of weight `cost_per_unit` to the sector.
    pub fn commit(&mut self, sector: SectorId, count: u32, cost_per_unit: f32) {
        let amount = self.contribution(count, cost_per_unit);
        if let Some(load) = self.slot_mut(sector) {
            *load += amount;
        }
    }

    /// Removes `count` entities of weight `cost_per_unit` from the sector.
    pub fn release(&mut self, sector: SectorId, count: u32, cost_per_unit: f32) {
        let amount = self.contribution(count, cost_per_unit);
        let floor = self.floor;
        if let Some(load) = self.slot_mut(sector) {
            *load = (*load - amount).max(floor);
        }
    }

    /// Sheds `decay_rate * dt` from every sector.
    pub fn decay(&mut self, dt: Duration) {
        let amount = self.decay_rate * dt.as_secs_f32();
        if amount <= 0.0 {
            return;
        }
        let floor = self.floor;
        for load in &mut self.loads {
            *load = (*load - amount).max(floor);
        }
    }

    /// Full per-sector load array, indexed by [`SectorId::index`].
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.loads
    }

    /// Load of a single sector.
    #[must_use]
    pub fn load(&self, sector: SectorId) -> Option<f32> {
        self.loads.get(sector.index()).copied()
    }

    /// Load a commit of `count` entities with weight `cost_per_unit` adds.
    #[must_use]
    pub fn contribution(&self, count: u32, cost_per_unit: f32) -> f32 {
        count as f32 * cost_per_unit.max(self.min_cost)
    }

    /// Number of sectors in the ring.
    #[must_use]
    pub fn sector_count(&self) -> u16 {
        u16::try_from(self.loads.len()).unwrap_or(u16::MAX)
    }

    /// Lowest load any sector may hold.
    #[must_use]
    pub const fn floor(&self) -> f32 {
        self.floor
    }

    /// Most loaded sector; the lowest id wins ties.
    #[must_use]
    pub fn heaviest(&self) -> SectorId {
        self.extreme(|candidate, best| candidate > best)
    }

    /// Least loaded sector; the lowest id wins ties.
    #[must_use]
    pub fn weakest(&self) -> SectorId {
        self.extreme(|candidate, best| candidate < best)
    }

    /// Reports whether every sector sits within `margin` of the floor.
    #[must_use]
    pub fn is_quiet(&self, margin: f32) -> bool {
        let limit = self.floor + margin.max(0.0);
        self.loads.iter().all(|load| *load <= limit)
    }

    fn extreme(&self, better: impl Fn(f32, f32) -> bool) -> SectorId {
        let mut best_index = 0;
        let mut best = f32::NAN;
        for (index, load) in self.loads.iter().copied().enumerate() {
            if best.is_nan() || better(load, best) {
                best = load;
                best_index = index;
            }
        }
        SectorId::new(u16::try_from(best_index).unwrap_or(0))
    }

    fn slot_mut(&mut self, sector: SectorId) -> Option<&mut f32> {
        debug_assert!(
            sector.index() < self.loads.len(),
            "sector {} outside ring of {}",
            sector.get(),
            self.loads.len()
        );
        self.loads.get_mut(sector.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SectionLoadTracker {
        SectionLoadTracker::new(Config::new(12, 1.0, 0.5, 2.0))
    }

    #[test]
    fn commit_uses_minimum_cost_for_light_entities() {
        let mut tracker = tracker();
        tracker.commit(SectorId::new(3), 4, 0.1);
        assert_eq!(tracker.load(SectorId::new(3)), Some(3.0));
    }

    #[test]
    fn decay_stops_at_floor() {
        let mut tracker = tracker();
        tracker.commit(SectorId::new(0), 1, 3.0);
        tracker.decay(Duration::from_millis(500));
        assert_eq!(tracker.load(SectorId::new(0)), Some(3.0));
        tracker.decay(Duration::from_secs(10));
        assert_eq!(tracker.load(SectorId::new(0)), Some(1.0));
    }

    #[test]
    fn extremes_prefer_lowest_id_on_ties() {
        let mut tracker = tracker();
        assert_eq!(tracker.weakest(), SectorId::new(0));
        assert_eq!(tracker.heaviest(), SectorId::new(0));
        tracker.commit(SectorId::new(5), 1, 2.0);
        tracker.commit(SectorId::new(9), 1, 2.0);
        assert_eq!(tracker.heaviest(), SectorId::new(5));
        assert_eq!(tracker.weakest(), SectorId::new(0));
    }

    #[test]
    fn quiet_margin_is_measured_from_the_floor() {
        let mut tracker = tracker();
        assert!(tracker.is_quiet(0.0));
        tracker.commit(SectorId::new(11), 1, 1.0);
        assert!(!tracker.is_quiet(0.0));
        assert!(!tracker.is_quiet(0.5));
        assert!(tracker.is_quiet(1.0));
    }
}
