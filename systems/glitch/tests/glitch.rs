use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spawn_director_core::SectorId;
use spawn_director_glitch::{balanced_sector, Config, GlitchRandomizer};
use spawn_director_sector_load::{self as sector_load, SectionLoadTracker};

fn loads() -> SectionLoadTracker {
    let mut loads = SectionLoadTracker::new(sector_load::Config::new(12, 0.0, 0.1, 0.0));
    loads.commit(SectorId::new(0), 3, 2.0);
    loads
}

fn glitch(rng: &mut ChaCha8Rng) -> GlitchRandomizer {
    let config = Config::new(Duration::from_secs(3), Duration::from_secs(6), 0.05, 1.0);
    GlitchRandomizer::new(config, Duration::from_secs(10), rng)
}

#[test]
fn forced_glitch_overrides_balanced_choice_and_resets() {
    let loads = loads();
    let mut rng = ChaCha8Rng::seed_from_u64(0x6c17_c400);
    let mut glitch = glitch(&mut rng);
    let mut counts = [0_u32; 12];

    for _ in 0..1_200 {
        glitch.force_chance(1.0);
        let sector = glitch.roll_sector(&loads, &mut rng, |_, _| {
            panic!("balanced heuristic must not run when the glitch is certain")
        });
        counts[sector.index()] += 1;

        assert_eq!(glitch.chance(), 0.0);
        assert!(glitch.next_accumulation() > Duration::from_secs(10));
    }

    for (sector, count) in counts.iter().enumerate() {
        assert!(
            (50..=150).contains(count),
            "sector {sector} drawn {count} times out of 1200"
        );
    }
}

#[test]
fn zero_chance_defers_to_balanced_heuristic() {
    let loads = loads();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut glitch = glitch(&mut rng);

    for _ in 0..100 {
        let sector = glitch.roll_sector(&loads, &mut rng, |loads, rng| {
            balanced_sector(loads, 0, rng)
        });
        assert_eq!(sector, SectorId::new(6));
    }
    assert_eq!(glitch.chance(), 0.0);
}

#[test]
fn accumulated_chance_eventually_fires() {
    let loads = loads();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut glitch = glitch(&mut rng);
    let mut now = Duration::from_secs(10);
    let mut fired = false;

    for _ in 0..2_000 {
        now += Duration::from_secs(1);
        glitch.tick(now, &mut rng);
        let before = glitch.chance();
        let _ = glitch.roll_sector(&loads, &mut rng, |_, _| SectorId::new(6));
        if before > 0.0 && glitch.chance() == 0.0 {
            fired = true;
            assert!(glitch.next_accumulation() > now);
            break;
        }
    }

    assert!(fired, "glitch never fired");
}
