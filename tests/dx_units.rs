//! Tests for the patch value conversions.

use six_op_fm::fm::dx_units::*;
use six_op_fm::fm::patch::{FrequencyMode, KeyboardScaling, Operator};

const MIN_LFO_FREQUENCY: f32 = 0.005865;

fn assert_approx(value: f32, expected: f32, tolerance: f32) {
    assert!(
        (value - expected).abs() <= tolerance,
        "{value} is not within {tolerance} of {expected}"
    );
}

#[test]
fn operator_levels() {
    let levels = [(0, 0), (14, 38), (15, 42), (19, 46), (20, 48), (50, 78), (99, 127)];

    for (level, expected) in levels {
        assert_eq!(operator_level(level), expected, "level {level}");
    }
}

#[test]
fn pitch_envelope_levels() {
    assert_eq!(pitch_envelope_level(50), 0.0);
    assert_approx(pitch_envelope_level(82), 1.0, 0.01);
    assert_approx(pitch_envelope_level(18), -1.0, 0.01);
    assert_approx(pitch_envelope_level(0), -4.0, 0.01);
    assert_approx(pitch_envelope_level(99), 4.0, 0.1);
}

#[test]
fn operator_envelope_increments() {
    assert_eq!(operator_envelope_increment(0), 16.0 / (1 << 24) as f32);
    assert_eq!(operator_envelope_increment(99), 0.0546875);

    for rate in 1..=99 {
        assert!(operator_envelope_increment(rate) >= operator_envelope_increment(rate - 1));
    }
}

#[test]
fn pitch_envelope_increments() {
    assert_approx(pitch_envelope_increment(0), 1.0 / (21.3 * 44100.0), 1e-9);
    assert!(pitch_envelope_increment(99) > pitch_envelope_increment(50));
}

#[test]
fn lfo_frequencies() {
    assert_approx(lfo_frequency(0), 11.0 * MIN_LFO_FREQUENCY, 1e-4);
    assert_approx(lfo_frequency(99), 4080.0 * MIN_LFO_FREQUENCY, 1e-2);
}

#[test]
fn lfo_delays() {
    assert_eq!(lfo_delay(0), [100000.0; 2]);

    let [before, after] = lfo_delay(99);
    assert_approx(before, 32.0 * MIN_LFO_FREQUENCY, 1e-4);
    assert_approx(after, 128.0 * MIN_LFO_FREQUENCY, 1e-4);
}

#[test]
fn velocity() {
    assert_approx(normalize_velocity(1.0), 1.312, 1e-4);
    assert!(normalize_velocity(0.0) < 0.0);
    assert_eq!(normalize_velocity(-1.0), normalize_velocity(0.0));
}

#[test]
fn rate_scaling_is_neutral_when_disabled() {
    for note in [0.0, 48.0, 127.0] {
        assert_eq!(rate_scaling(note, 0), 1.0);
    }

    assert!(rate_scaling(96.0, 7) > 1.0);
    assert!(rate_scaling(12.0, 7) < 1.0);
}

#[test]
fn sensitivities() {
    assert_eq!(amp_mod_sensitivity(0), 0.0);
    assert_eq!(amp_mod_sensitivity(3), 1.0);
    assert_eq!(amp_mod_sensitivity(200), 1.0);

    assert_eq!(pitch_mod_sensitivity(0), 0.0);
    assert_eq!(pitch_mod_sensitivity(7), 2.0);
    assert_eq!(pitch_mod_sensitivity(200), 2.0);
}

#[test]
fn keyboard_scaling_curves() {
    let mut ks = KeyboardScaling {
        left_depth: 50,
        right_depth: 50,
        left_curve: 0,
        right_curve: 0,
        break_point: 39,
    };

    assert_approx(keyboard_scaling(24.0, &ks), -40.155, 1e-3);

    ks.left_curve = 3;
    assert_approx(keyboard_scaling(24.0, &ks), 40.155, 1e-3);

    // Exponential curves are shallower close to the break point.
    ks.left_curve = 1;
    let exponential = keyboard_scaling(24.0, &ks);
    assert!(exponential < 0.0);
    assert!(exponential > -40.155);

    // Right side uses its own curve.
    ks.right_curve = 2;
    assert!(keyboard_scaling(84.0, &ks) > 0.0);

    ks.right_depth = 0;
    assert_eq!(keyboard_scaling(84.0, &ks), 0.0);
}

#[test]
fn frequency_ratios() {
    let mut op = Operator {
        coarse: 1,
        detune: 7,
        ..Default::default()
    };

    assert_eq!(
        frequency_ratio(&op),
        OscillatorMode::RatioOfFundamental(1.0)
    );

    op.coarse = 2;
    let OscillatorMode::RatioOfFundamental(ratio) = frequency_ratio(&op) else {
        panic!("Expected a ratio");
    };
    assert_approx(ratio, 2.0, 1e-5);

    op.coarse = 0;
    let OscillatorMode::RatioOfFundamental(ratio) = frequency_ratio(&op) else {
        panic!("Expected a ratio");
    };
    assert_approx(ratio, 0.5, 1e-5);

    op.mode = FrequencyMode::Fixed;
    assert_eq!(
        frequency_ratio(&op),
        OscillatorMode::FixedFrequencyHz(1.0)
    );

    op.coarse = 1;
    let OscillatorMode::FixedFrequencyHz(hz) = frequency_ratio(&op) else {
        panic!("Expected a fixed frequency");
    };
    assert_approx(hz, 10.0, 0.1);
}

#[test]
fn oscillator_mode_frequency() {
    let one_hz = 1.0 / 48000.0;

    assert_eq!(
        OscillatorMode::RatioOfFundamental(2.0).frequency(0.01, one_hz),
        0.02
    );
    assert_eq!(
        OscillatorMode::FixedFrequencyHz(480.0).frequency(0.01, one_hz),
        480.0 * one_hz
    );
}
