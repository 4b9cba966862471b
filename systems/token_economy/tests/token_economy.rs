use std::time::Duration;

use spawn_director_core::{DifficultyLevel, WaveSettings};
use spawn_director_token_economy::TokenEconomy;

fn wave_level() -> DifficultyLevel {
    DifficultyLevel::new("veteran", 6.0).with_wave(WaveSettings {
        threshold: 10,
        duration: Duration::from_secs(20),
        spawn_interval: Duration::from_millis(500),
    })
}

#[test]
fn fractional_refund_rounds_returned_counter() {
    let mut economy = TokenEconomy::new(&DifficultyLevel::new("normal", 5.0));
    assert!(economy.spend(3.0));
    let returned_before = economy.returned();

    economy.refund(1.5);

    assert!((economy.current() - 3.5).abs() < f32::EPSILON);
    assert_eq!(economy.returned(), returned_before + 2);
}

#[test]
fn refund_is_capped_at_ceiling() {
    let mut economy = TokenEconomy::new(&DifficultyLevel::new("normal", 5.0));
    assert!(economy.spend(1.0));

    economy.refund(4.0);

    assert_eq!(economy.current(), economy.ceiling());
    assert_eq!(economy.returned(), 5);
}

#[test]
fn budget_stays_within_bounds_over_long_sessions() {
    let mut economy = TokenEconomy::new(&wave_level());
    let amounts = [0.5_f32, 2.25, 7.0, 1.0, 3.75, 0.0, 6.0, 4.5];

    for round in 0..500 {
        let amount = amounts[round % amounts.len()];
        if round % 3 == 0 {
            economy.refund(amount);
        } else {
            let _ = economy.spend(amount);
        }
        assert!(economy.current() >= 0.0, "budget went negative");
        assert!(
            economy.current() <= economy.ceiling(),
            "budget exceeded ceiling"
        );
    }
}

#[test]
fn difficulty_reset_restores_budget_and_clears_returned() {
    let mut economy = TokenEconomy::new(&wave_level());
    assert!(economy.spend(6.0));
    economy.refund(5.0);
    assert!(economy.is_wave_mode());

    economy.reset_for_difficulty(&DifficultyLevel::new("recruit", 2.0));

    assert_eq!(economy.current(), 2.0);
    assert_eq!(economy.ceiling(), 2.0);
    assert_eq!(economy.returned(), 0);
    assert!(!economy.is_wave_mode());
}
