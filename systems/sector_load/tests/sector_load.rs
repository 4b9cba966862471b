use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spawn_director_core::SectorId;
use spawn_director_sector_load::{Config, SectionLoadTracker};

const FLOOR: f32 = 0.25;

fn tracker() -> SectionLoadTracker {
    SectionLoadTracker::new(Config::new(12, FLOOR, 0.5, 1.5))
}

#[test]
fn loads_never_drop_below_floor() {
    let mut tracker = tracker();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5ec7_0a11);

    for _ in 0..2_000 {
        let sector = SectorId::new(rng.gen_range(0..12));
        let count = rng.gen_range(0..5);
        let cost = rng.gen_range(0.0..4.0);
        match rng.gen_range(0..3) {
            0 => tracker.commit(sector, count, cost),
            1 => tracker.release(sector, count, cost),
            _ => tracker.decay(Duration::from_millis(rng.gen_range(0..400))),
        }

        assert!(
            tracker.weights().iter().all(|load| *load >= FLOOR),
            "load dipped below floor: {:?}",
            tracker.weights()
        );
    }
}

#[test]
fn commit_then_release_restores_previous_load() {
    let mut tracker = tracker();
    let sector = SectorId::new(4);
    tracker.commit(sector, 2, 1.25);
    let before = tracker.load(sector).expect("sector in range");

    tracker.commit(sector, 3, 0.75);
    tracker.release(sector, 3, 0.75);

    let after = tracker.load(sector).expect("sector in range");
    assert!((after - before).abs() < 1e-5, "{before} != {after}");
}

#[test]
fn release_from_floor_stays_at_floor() {
    let mut tracker = tracker();
    let sector = SectorId::new(7);

    tracker.commit(sector, 1, 2.0);
    tracker.release(sector, 1, 2.0);
    tracker.release(sector, 1, 2.0);

    assert_eq!(tracker.load(sector), Some(FLOOR));
}

#[test]
fn decay_touches_every_sector() {
    let mut tracker = tracker();
    for sector in 0..12 {
        tracker.commit(SectorId::new(sector), 1, 3.0);
    }

    tracker.decay(Duration::from_secs(1));

    for load in tracker.weights() {
        assert!((load - (FLOOR + 3.0 - 1.5)).abs() < 1e-5);
    }
}
