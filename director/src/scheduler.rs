//! Tick pipeline: refunds, decay, glitch and wave timers, then spawn passes.

use std::time::Duration;

use spawn_director_core::{
    EntityHandle, EntityPool, EnemyMetadataProvider, GeometryProvider, GroupId, PresetId,
    RefundMetadata, VariantId, WorldPosition,
};
use spawn_director_glitch::balanced_sector;
use spawn_director_leadership::Succession;
use spawn_director_presets::{self as presets, SelectionContext};

use crate::{hydrate::hydrate, SpawnDirector};

/// Upper bound on presets committed by a single tick.
const MAX_COMMITS_PER_TICK: usize = 256;

/// Scheduler state between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next spawn time.
    Idle,
    /// Spending the budget; resumes on the next tick without waiting.
    Spawning,
}

/// Entity handed to the pool during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedEntity {
    /// Preset the entity belongs to.
    pub preset: PresetId,
    /// Resolved variant.
    pub variant: VariantId,
    /// Spawn point the pool received.
    pub position: WorldPosition,
    /// Refund message bound to the entity.
    pub refund: RefundMetadata,
}

/// Everything a tick changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Entities the pool accepted, in spawn order.
    pub spawned: Vec<SpawnedEntity>,
    /// Presets paid for, in commit order.
    pub committed: Vec<PresetId>,
    /// Entities the pool failed to supply.
    pub refused: u32,
    /// Refunds drained from the channel.
    pub refunds: u32,
    /// A wave began during the tick.
    pub wave_started: bool,
    /// A wave ended during the tick.
    pub wave_ended: bool,
    /// Leadership changes caused by refunds.
    pub successions: Vec<(GroupId, Succession)>,
}

#[derive(Clone, Debug)]
pub(crate) struct Schedule {
    phase: Phase,
    cycle_length: Duration,
    now: Duration,
    next_spawn: Duration,
    surge: Surge,
}

/// Relaxed-interval window opened once wave mode unlocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Surge {
    Dormant,
    Running { until: Duration },
    Finished,
}

impl Schedule {
    pub(crate) fn new(cycle_length: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            cycle_length,
            now: Duration::ZERO,
            next_spawn: Duration::ZERO,
            surge: Surge::Dormant,
        }
    }

    /// Makes the next pass due at the last observed time and rearms the surge.
    pub(crate) fn restart(&mut self) {
        self.phase = Phase::Idle;
        self.next_spawn = self.now;
        self.surge = Surge::Dormant;
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn next_spawn(&self) -> Duration {
        self.next_spawn
    }

    pub(crate) fn wave_running(&self) -> bool {
        matches!(self.surge, Surge::Running { .. })
    }

    fn delay_for(&self, cooldown: u32, wave_interval: Option<Duration>) -> Duration {
        let delay = self.cycle_length.saturating_mul(cooldown);
        match (self.surge, wave_interval) {
            (Surge::Running { .. }, Some(interval)) => delay.min(interval),
            _ => delay,
        }
    }
}

impl SpawnDirector {
    /// Advances the director to `now`.
    ///
    /// Queued refunds are applied first, then loads decay and the glitch and
    /// wave timers advance. When the next spawn time has passed, presets are
    /// committed until nothing qualifies; a pass without a candidate costs
    /// every preset one cooldown cycle.
    pub fn tick<P, G, M>(
        &mut self,
        now: Duration,
        pool: &mut P,
        geometry: &G,
        metadata: &M,
    ) -> TickReport
    where
        P: EntityPool + ?Sized,
        G: GeometryProvider + ?Sized,
        M: EnemyMetadataProvider + ?Sized,
    {
        let mut report = TickReport::default();

        while let Ok(refund) = self.refund_rx.try_recv() {
            report.refunds += 1;
            if let Some(change) = self.handle_refund(refund) {
                report.successions.push(change);
            }
        }

        let now = now.max(self.schedule.now);
        self.loads.decay(now - self.schedule.now);
        self.schedule.now = now;
        self.glitch.tick(now, &mut self.rng);
        self.update_wave(&mut report);

        if self.schedule.phase == Phase::Idle && now < self.schedule.next_spawn {
            return report;
        }
        self.schedule.phase = Phase::Spawning;

        for _ in 0..MAX_COMMITS_PER_TICK {
            if !self.spawn_pass(pool, geometry, metadata, &mut report) {
                self.schedule.phase = Phase::Idle;
                return report;
            }
        }

        log::debug!("commit limit reached; continuing next tick");
        report
    }

    /// Applies one refund immediately.
    ///
    /// Leadership passes on before the tokens return. Returns the succession
    /// applied when the entity belonged to a group.
    pub fn handle_refund(&mut self, refund: RefundMetadata) -> Option<(GroupId, Succession)> {
        let succession = refund.group.map(|group| {
            let change = self.groups.member_returned(group, refund.handle);
            (group, change)
        });

        self.economy.refund(refund.tokens_to_return);
        self.loads.release(refund.sector, 1, refund.cost_weight);
        self.schedule.next_spawn = self
            .schedule
            .next_spawn
            .saturating_sub(refund.timer_reduction);

        log::debug!(
            "entity {} refunded {:.2} tokens; next spawn at {:.2}s",
            refund.handle.get(),
            refund.tokens_to_return,
            self.schedule.next_spawn.as_secs_f32()
        );
        succession
    }

    fn update_wave(&mut self, report: &mut TickReport) {
        let now = self.schedule.now;
        match self.schedule.surge {
            Surge::Finished => return,
            Surge::Running { until } => {
                if now >= until {
                    self.schedule.surge = Surge::Finished;
                    report.wave_ended = true;
                    log::info!("wave ended");
                }
                return;
            }
            Surge::Dormant => {}
        }

        if !self.economy.is_wave_mode() {
            return;
        }
        let Some(wave) = self
            .difficulties
            .get(self.difficulty)
            .and_then(|level| level.wave())
        else {
            return;
        };
        self.schedule.surge = Surge::Running {
            until: now.saturating_add(wave.duration),
        };
        report.wave_started = true;
        log::info!(
            "wave started with {} tokens returned; lasts {:.1}s",
            self.economy.returned(),
            wave.duration.as_secs_f32()
        );
    }

    /// Runs one selection pass. Returns `false` once the budget is exhausted.
    fn spawn_pass<P, G, M>(
        &mut self,
        pool: &mut P,
        geometry: &G,
        metadata: &M,
        report: &mut TickReport,
    ) -> bool
    where
        P: EntityPool + ?Sized,
        G: GeometryProvider + ?Sized,
        M: EnemyMetadataProvider + ?Sized,
    {
        let context = SelectionContext {
            catalog: &self.catalog,
            cooldowns: &self.cooldowns,
            economy: &self.economy,
            difficulty: self.difficulty,
            loads: &self.loads,
            metadata,
        };
        let glitch = &mut self.glitch;
        let deviation = self.deviation;
        let selection = self.selector.select(&context, &mut self.rng, |loads, rng| {
            glitch.roll_sector(loads, rng, |loads, rng| {
                balanced_sector(loads, deviation, rng)
            })
        });

        let Some(selection) = selection else {
            self.cooldowns.decrement_all();
            log::trace!("no preset qualifies; cooldowns decremented");
            return false;
        };
        if !presets::commit(
            &selection,
            &self.catalog,
            &mut self.cooldowns,
            &mut self.economy,
        ) {
            return false;
        }
        let Some(template) = self.catalog.get(selection.preset) else {
            return false;
        };

        hydrate(
            &selection,
            template,
            self.loads.sector_count(),
            geometry,
            metadata,
            &mut self.rng,
            &mut self.requests,
        );

        let mut handles: Vec<EntityHandle> = Vec::with_capacity(self.requests.len());
        let first_spawned = report.spawned.len();
        for request in &self.requests {
            let Some(handle) = pool.spawn_at(request.position, request.kind, request.variant)
            else {
                report.refused += 1;
                continue;
            };
            handles.push(handle);
            report.spawned.push(SpawnedEntity {
                preset: request.preset,
                variant: request.variant,
                position: request.position,
                refund: request.refund_for(handle, None),
            });
        }

        let group = (handles.len() >= 2).then(|| self.groups.create_group(handles));
        for spawned in &mut report.spawned[first_spawned..] {
            spawned.refund.group = group;
            self.loads
                .commit(spawned.refund.sector, 1, spawned.refund.cost_weight);
            pool.bind_refund(spawned.refund.handle, spawned.refund);
        }

        let wave_interval = self
            .difficulties
            .get(self.difficulty)
            .and_then(|level| level.wave())
            .map(|wave| wave.spawn_interval);
        self.schedule.next_spawn = self
            .schedule
            .now
            .saturating_add(self.schedule.delay_for(template.cooldown, wave_interval));

        report.committed.push(selection.preset);
        log::debug!(
            "committed preset '{}' at sector {} ({} spawned, {:.2} tokens left)",
            template.label,
            selection.main_sector.get(),
            report.spawned.len() - first_spawned,
            self.economy.current()
        );
        true
    }
}
