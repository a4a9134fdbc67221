//! Tests for the envelope generators.

use six_op_fm::fm::dx_units::{operator_envelope_increment, pitch_envelope_increment};
use six_op_fm::fm::envelope::{Envelope, OperatorEnvelope, PitchEnvelope, ASCENDING_SEGMENT_FLOOR};
use six_op_fm::fm::patch;

fn assert_approx(value: f32, expected: f32, tolerance: f32) {
    assert!(
        (value - expected).abs() <= tolerance,
        "{value} is not within {tolerance} of {expected}"
    );
}

fn operator_envelope(rate: [u8; 4], level: [u8; 4]) -> OperatorEnvelope {
    let mut envelope = OperatorEnvelope::new(1.0);
    envelope.set(&patch::Envelope { rate, level }, 127);

    envelope
}

#[test]
fn initial_state() {
    let envelope = Envelope::<4, false>::new(1.0);

    assert_eq!(envelope.stage, 3);
    assert_eq!(envelope.phase, 1.0);
    assert_eq!(envelope.start, Some(0.0));
    assert_eq!(envelope.level(0), 1.0);
    assert_eq!(envelope.level(3), 0.0);
    assert_eq!(envelope.increment(0), 0.001);
}

#[test]
fn operator_levels() {
    let envelope = operator_envelope([99; 4], [99, 20, 50, 0]);

    assert_eq!(envelope.0.level(0), 15.0);
    assert_eq!(envelope.0.level(1), 5.25);
    assert_eq!(envelope.0.level(2), 9.0);
    assert_eq!(envelope.0.level(3), 0.0625);
}

#[test]
fn operator_levels_follow_global_level() {
    let mut envelope = OperatorEnvelope::new(1.0);
    envelope.set(
        &patch::Envelope {
            rate: [99; 4],
            level: [99, 99, 99, 0],
        },
        100,
    );

    // (126 + 100 - 133) / 8
    assert_eq!(envelope.0.level(0), 11.625);
}

#[test]
fn operator_increments() {
    let envelope = operator_envelope([99; 4], [99, 99, 99, 0]);
    let increment = operator_envelope_increment(99);

    // Ascending from the floor.
    assert_approx(
        envelope.0.increment(0),
        increment * 7.2 / (15.0 - ASCENDING_SEGMENT_FLOOR),
        1e-6,
    );
    // Plateau.
    assert_approx(envelope.0.increment(1), increment * 0.6, 1e-6);
    // Descending.
    assert_approx(envelope.0.increment(3), increment / (15.0 - 0.0625), 1e-6);
}

#[test]
fn attack_below_floor_is_instant() {
    let envelope = operator_envelope([10; 4], [20, 20, 20, 0]);

    assert_eq!(envelope.0.increment(0), 1.0);
}

#[test]
fn attack_plateau_at_zero_is_faster() {
    let envelope = operator_envelope([99; 4], [0; 4]);
    let increment = operator_envelope_increment(99);

    assert_approx(envelope.0.increment(0), increment * 12.0, 1e-6);
    assert_approx(envelope.0.increment(1), increment * 0.6, 1e-6);
}

#[test]
fn increments_follow_scale() {
    let mut envelope = OperatorEnvelope::new(0.5);
    envelope.set(
        &patch::Envelope {
            rate: [99; 4],
            level: [99, 99, 99, 0],
        },
        127,
    );
    let reference = operator_envelope([99; 4], [99, 99, 99, 0]);

    assert_approx(
        envelope.0.increment(1),
        reference.0.increment(1) * 0.5,
        1e-7,
    );
}

#[test]
fn ascending_segments_are_reshaped() {
    let envelope = operator_envelope([99; 4], [99, 99, 99, 0]);

    assert_approx(
        envelope.0.value(0, 0.5, None),
        ASCENDING_SEGMENT_FLOOR + 0.666667 * (15.0 - ASCENDING_SEGMENT_FLOOR),
        1e-4,
    );

    // Descending segments stay linear.
    assert_approx(
        envelope.0.value(3, 0.5, None),
        0.5 * (15.0 + 0.0625),
        1e-4,
    );

    // An explicit start level replaces the previous stage level.
    assert_approx(envelope.0.value(3, 0.0, Some(10.0)), 10.0, 1e-6);
}

#[test]
fn continuous_across_stages() {
    let envelope = operator_envelope([99, 50, 50, 99], [99, 80, 60, 0]);

    for stage in 0..3 {
        let end = envelope.0.value(stage, 1.0, None);
        let next = envelope.0.value(stage + 1, 0.0, None);

        assert_approx(end, envelope.0.level(stage), 1e-4);
        assert_approx(next, end, 1e-4);
    }
}

#[test]
fn pitch_envelope_flat() {
    let mut envelope = PitchEnvelope::new(1.0);
    envelope.set(&patch::Envelope {
        rate: [84, 95, 95, 60],
        level: [50; 4],
    });

    for stage in 0..3 {
        assert_eq!(envelope.0.increment(stage), 0.2);
        assert_eq!(envelope.0.level(stage), 0.0);
    }
    assert_eq!(envelope.0.increment(3), pitch_envelope_increment(60));
}

#[test]
fn gate_cycle() {
    let mut envelope = operator_envelope([99, 50, 50, 99], [99, 80, 80, 0]);

    // Attack starts from the release level.
    let value = envelope.0.render(true, 1.0, 1.0, 1.0);
    assert_eq!(envelope.0.stage, 0);
    assert!(value >= ASCENDING_SEGMENT_FLOOR);

    // Stages advance while the gate is held and stop at the sustain stage.
    for _ in 0..100000 {
        envelope.0.render(true, 1.0, 1.0, 1.0);
    }
    assert_eq!(envelope.0.stage, 2);
    assert_eq!(envelope.0.phase, 1.0);
    assert_approx(envelope.0.current_value(), envelope.0.level(2), 1e-5);

    // Release snapshots the current value.
    let sustain = envelope.0.current_value();
    envelope.0.render(false, 0.0, 1.0, 1.0);
    assert_eq!(envelope.0.stage, 3);
    assert_eq!(envelope.0.start, Some(sustain));

    for _ in 0..100000 {
        envelope.0.render(false, 1.0, 1.0, 1.0);
    }
    assert_eq!(envelope.0.stage, 3);
    assert_approx(envelope.0.current_value(), 0.0625, 1e-5);
}

#[test]
fn render_default() {
    let mut envelope = Envelope::<4, false>::new(1.0);
    envelope.set(&[0.5, 0.5, 0.5, 0.5], &[1.0, 0.5, 0.5, 0.0]);

    assert_eq!(envelope.render_default(true), 0.5);
    assert_eq!(envelope.render_default(true), 1.0);
    assert_eq!(envelope.stage, 1);
    assert_eq!(envelope.start, None);
    assert_eq!(envelope.render_default(true), 0.75);
}
