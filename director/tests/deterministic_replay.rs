use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use spawn_director::{DirectorConfig, SpawnDirector, TickReport};
use spawn_director_core::{
    DifficultyIndex, DifficultyLevel, DifficultyTable, EnemyKind, EnemyMetadataProvider,
    EntityHandle, EntityPool, Placement, PresetTemplate, RefundMetadata, RingGeometry, VariantId,
    VariantSlot, WaveSettings, WorldPosition,
};
use spawn_director_presets::PresetCatalog;

const TICK: Duration = Duration::from_millis(250);
const LIFETIME: Duration = Duration::from_secs(3);

#[test]
fn deterministic_replay_produces_identical_sequence() {
    let first = replay(0x4d59_5df4_d0f3_3173);
    let second = replay(0x4d59_5df4_d0f3_3173);

    assert!(!first.ticks.is_empty(), "session never spawned anything");
    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn invariants_hold_across_a_long_session() {
    let outcome = replay(0x1234_5678);
    for record in &outcome.ticks {
        assert!(record.tokens_bits <= 8.0_f32.to_bits(), "budget above ceiling");
        assert!(f32::from_bits(record.tokens_bits) >= 0.0);
        assert!(record.loads.iter().all(|load| f32::from_bits(*load) >= 0.0));
    }
}

#[derive(Default)]
struct Pool {
    issued: u64,
    live: Vec<(Duration, RefundMetadata)>,
    now: Duration,
}

impl EntityPool for Pool {
    fn spawn_at(
        &mut self,
        _position: WorldPosition,
        _kind: EnemyKind,
        _variant: VariantId,
    ) -> Option<EntityHandle> {
        if self.live.len() >= 24 {
            return None;
        }
        self.issued += 1;
        Some(EntityHandle::new(self.issued))
    }

    fn bind_refund(&mut self, _handle: EntityHandle, refund: RefundMetadata) {
        self.live.push((self.now + LIFETIME, refund));
    }
}

struct Kinds {
    variants: [VariantId; 3],
}

impl EnemyMetadataProvider for Kinds {
    fn cost_weight(&self, kind: EnemyKind) -> f32 {
        1.0 + f32::from(kind.get())
    }

    fn variants(&self, _kind: EnemyKind) -> &[VariantId] {
        &self.variants
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayOutcome {
    ticks: Vec<TickRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.ticks.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct TickRecord {
    step: u32,
    committed: Vec<u32>,
    spawned: Vec<(u64, u16, u16)>,
    refused: u32,
    tokens_bits: u32,
    loads: Vec<u32>,
    wave: bool,
}

impl TickRecord {
    fn new(step: u32, report: &TickReport, director: &SpawnDirector) -> Self {
        Self {
            step,
            committed: report.committed.iter().map(|id| id.get()).collect(),
            spawned: report
                .spawned
                .iter()
                .map(|entity| {
                    (
                        entity.refund.handle.get(),
                        entity.refund.sector.get(),
                        entity.variant.get(),
                    )
                })
                .collect(),
            refused: report.refused,
            tokens_bits: director.current_tokens().to_bits(),
            loads: director
                .sector_loads()
                .iter()
                .map(|load| load.to_bits())
                .collect(),
            wave: director.is_wave_mode(),
        }
    }
}

fn replay(seed: u64) -> ReplayOutcome {
    let mut director = SpawnDirector::new(session_config(seed)).expect("director");
    let sender = director.refund_sender();
    let geometry = RingGeometry::new(WorldPosition::new(3.0, -2.0), 15.0, 12);
    let kinds = Kinds {
        variants: [VariantId::new(0), VariantId::new(1), VariantId::new(2)],
    };
    let mut pool = Pool::default();
    let mut ticks = Vec::new();

    for step in 0..480_u32 {
        let now = TICK * step;
        pool.now = now;

        let (expired, alive): (Vec<_>, Vec<_>) =
            pool.live.drain(..).partition(|(death, _)| *death <= now);
        pool.live = alive;
        for (_, refund) in expired {
            assert!(sender.send(refund));
        }

        if step == 240 {
            director
                .set_difficulty(DifficultyIndex::new(1))
                .expect("second level");
        }

        let report = director.tick(now, &mut pool, &geometry, &kinds);
        if !report.committed.is_empty() || report.refunds > 0 || report.wave_ended {
            ticks.push(TickRecord::new(step, &report, &director));
        }
    }

    ReplayOutcome { ticks }
}

fn session_config(seed: u64) -> DirectorConfig {
    let levels = vec![
        DifficultyLevel::new("steady", 6.0),
        DifficultyLevel::new("surging", 8.0).with_wave(WaveSettings {
            threshold: 20,
            duration: Duration::from_secs(8),
            spawn_interval: Duration::from_millis(500),
        }),
    ];
    let both = vec![DifficultyIndex::new(0), DifficultyIndex::new(1)];
    let presets = vec![
        template("scouts", 2.0, 1, &both, &[(0, 1, 2), (0, 4, 1)]),
        template("brutes", 4.0, 3, &both, &[(2, 1, 1)]),
        template("pincer", 3.0, 2, &both, &[(1, 1, 1), (1, 7, 1)]),
        template("swarm", 5.0, 4, &both[1..], &[(0, 1, 3), (0, 2, 3)]),
    ];

    let table = DifficultyTable::new(levels).expect("difficulty table");
    let catalog =
        PresetCatalog::new(presets.into_iter().map(Some).collect(), 12).expect("preset catalog");
    let mut config = DirectorConfig::new(table, catalog);
    config.sectors.decay_rate = 0.2;
    config.glitch.interval_min = 2.0;
    config.glitch.interval_max = 4.0;
    config.glitch.accumulation_rate = 0.1;
    config.schedule.seed = seed;
    config
}

fn template(
    label: &str,
    cost: f32,
    cooldown: u32,
    difficulties: &[DifficultyIndex],
    placements: &[(u16, u16, u32)],
) -> PresetTemplate {
    PresetTemplate {
        label: label.to_owned(),
        cost,
        cooldown,
        difficulties: difficulties.to_vec(),
        placements: placements
            .iter()
            .map(|&(kind, relative_sector, count)| Placement {
                kind: EnemyKind::new(kind),
                variant: VariantSlot::Random,
                relative_sector,
                count,
                death_timer_reduction: Duration::from_millis(300),
            })
            .collect(),
    }
}
