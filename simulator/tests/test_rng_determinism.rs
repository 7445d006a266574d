//! Tests for deterministic RNG
//!
//! CRITICAL: Determinism is sacred. Same seed MUST produce same sequence.

use fleet_simulator_core_rs::RngManager;

#[test]
fn test_rng_new_with_seed() {
    let rng = RngManager::new(12345);
    assert_eq!(rng.get_state(), 12345);
}

#[test]
fn test_rng_next_deterministic() {
    let mut rng1 = RngManager::new(12345);
    let mut rng2 = RngManager::new(12345);

    // Same seed should produce same sequence
    for _ in 0..100 {
        let val1 = rng1.next();
        let val2 = rng2.next();
        assert_eq!(val1, val2, "RNG not deterministic!");
    }
}

#[test]
fn test_rng_different_seeds_different_sequences() {
    let mut rng1 = RngManager::new(12345);
    let mut rng2 = RngManager::new(54321);

    let val1 = rng1.next();
    let val2 = rng2.next();

    assert_ne!(
        val1, val2,
        "Different seeds should produce different values"
    );
}

#[test]
fn test_rng_uniform_deterministic() {
    let mut rng1 = RngManager::new(99999);
    let mut rng2 = RngManager::new(99999);

    for _ in 0..50 {
        let val1 = rng1.uniform(-0.5, 0.5);
        let val2 = rng2.uniform(-0.5, 0.5);
        assert_eq!(val1, val2, "uniform() not deterministic!");
    }
}

#[test]
fn test_rng_uniform_int_deterministic() {
    let mut rng1 = RngManager::new(99999);
    let mut rng2 = RngManager::new(99999);

    for _ in 0..50 {
        let val1 = rng1.uniform_int(10, 1000);
        let val2 = rng2.uniform_int(10, 1000);
        assert_eq!(val1, val2, "uniform_int() not deterministic!");
    }
}

#[test]
fn test_rng_uniform_int_single_value() {
    let mut rng = RngManager::new(12345);

    // Inclusive range [5, 5] always returns 5 but still advances state
    let before = rng.get_state();
    let val = rng.uniform_int(5, 5);
    assert_eq!(val, 5);
    assert_ne!(rng.get_state(), before);
}

#[test]
fn test_rng_state_advances() {
    let mut rng = RngManager::new(12345);
    let initial_state = rng.get_state();

    rng.next();
    let new_state = rng.get_state();

    assert_ne!(initial_state, new_state, "RNG state should advance");
}

#[test]
fn test_rng_call_order_matters() {
    // Interleaving uniform and uniform_int consumes the same underlying
    // stream, so the two generators below diverge after the first call
    let mut rng1 = RngManager::new(42);
    let mut rng2 = RngManager::new(42);

    let _ = rng1.uniform(0.0, 1.0);
    let _ = rng2.uniform_int(0, 9);

    assert_eq!(
        rng1.get_state(),
        rng2.get_state(),
        "one draw advances state identically regardless of draw kind"
    );

    let a = rng1.uniform(0.0, 1.0);
    let b = rng2.uniform(0.0, 1.0);
    assert_eq!(a, b, "same state must produce the same next draw");
}
