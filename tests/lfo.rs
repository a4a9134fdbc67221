//! Tests for the LFO.

use six_op_fm::fm::dx_units::lfo_frequency;
use six_op_fm::fm::lfo::{Lfo, Waveform};
use six_op_fm::fm::patch::ModulationParameters;
use six_op_fm::SampleRate;

fn assert_approx(value: f32, expected: f32, tolerance: f32) {
    assert!(
        (value - expected).abs() <= tolerance,
        "{value} is not within {tolerance} of {expected}"
    );
}

fn lfo(parameters: ModulationParameters) -> Lfo {
    let mut lfo = Lfo::new(SampleRate::default());
    lfo.set(&parameters);

    lfo
}

#[test]
fn waveform_from_byte() {
    assert_eq!(Waveform::from(0), Waveform::Triangle);
    assert_eq!(Waveform::from(3), Waveform::Square);
    assert_eq!(Waveform::from(4), Waveform::Sine);
    assert_eq!(Waveform::from(5), Waveform::SAndH);
    assert_eq!(Waveform::from(9), Waveform::Triangle);
}

#[test]
fn no_depth_no_modulation() {
    let mut lfo = Lfo::default();

    for _ in 0..100 {
        let modulations = lfo.step(64.0);
        assert_eq!(modulations.pitch_mod, 0.0);
        assert_eq!(modulations.amp_mod, 0.0);
    }
}

#[test]
fn square_without_delay() {
    let mut lfo = lfo(ModulationParameters {
        rate: 50,
        delay: 0,
        pitch_mod_depth: 99,
        amp_mod_depth: 50,
        waveform: 3,
        pitch_mod_sensitivity: 7,
        ..Default::default()
    });

    let modulations = lfo.step(1.0);

    assert_eq!(lfo.delay_ramp(), 1.0);
    assert_eq!(lfo.value(), 0.0);
    assert_approx(modulations.pitch_mod, -0.5 * 0.99 * 2.0, 1e-6);
    assert_approx(modulations.amp_mod, 0.5, 1e-6);
}

#[test]
fn delay_holds_modulation_back() {
    let mut lfo = lfo(ModulationParameters {
        rate: 50,
        delay: 99,
        pitch_mod_depth: 99,
        amp_mod_depth: 99,
        waveform: 0,
        pitch_mod_sensitivity: 7,
        ..Default::default()
    });

    let modulations = lfo.step(64.0);
    assert_eq!(lfo.delay_ramp(), 0.0);
    assert_eq!(modulations.pitch_mod, 0.0);
    assert_eq!(modulations.amp_mod, 0.0);

    // The ramp eventually opens up completely.
    for _ in 0..100000 {
        lfo.step(64.0);
    }
    assert_eq!(lfo.delay_ramp(), 1.0);
}

#[test]
fn phase_follows_rate() {
    let mut lfo = lfo(ModulationParameters {
        rate: 99,
        ..Default::default()
    });

    lfo.step(1000.0);

    let expected = 1000.0 * lfo_frequency(99) / SampleRate::default().sample_rate_hz;
    assert_approx(lfo.phase(), expected, 1e-4);
}

#[test]
fn waveform_values() {
    let mut lfo = lfo(ModulationParameters {
        waveform: 0,
        ..Default::default()
    });
    assert_eq!(lfo.value(), 1.0);

    lfo.set(&ModulationParameters {
        waveform: 4,
        ..Default::default()
    });
    assert_approx(lfo.value(), 0.5, 1e-6);

    lfo.set(&ModulationParameters {
        waveform: 1,
        ..Default::default()
    });
    assert_eq!(lfo.value(), 1.0);

    lfo.set(&ModulationParameters {
        waveform: 2,
        ..Default::default()
    });
    assert_eq!(lfo.value(), 0.0);
}

#[test]
fn sample_and_hold_stays_in_range() {
    let mut lfo = lfo(ModulationParameters {
        rate: 99,
        waveform: 5,
        ..Default::default()
    });

    for _ in 0..1000 {
        lfo.step(64.0);
        let value = lfo.value();
        assert!((0.0..1.0).contains(&value));
    }
}

#[test]
fn reset() {
    let parameters = ModulationParameters {
        rate: 50,
        delay: 50,
        ..Default::default()
    };

    let mut lfo = lfo(parameters);
    lfo.step(1000.0);
    let phase = lfo.phase();
    assert!(phase > 0.0);

    lfo.reset();
    assert_eq!(lfo.phase(), phase);
    assert_eq!(lfo.delay_ramp(), 0.0);

    lfo.set(&ModulationParameters {
        reset_phase: true,
        ..parameters
    });
    lfo.step(1000.0);
    lfo.reset();
    assert_eq!(lfo.phase(), 0.0);
}
