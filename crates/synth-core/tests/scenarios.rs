//! Literal end-to-end scenarios worked by hand against the chosen sample
//! rate/timebase/LUT resolution, as opposed to `properties.rs`'s
//! universally-quantified invariants. Each test pins concrete inputs and
//! checks the concrete output a reader could derive on paper.

use rustfft::num_complex::Complex32;
use rustfft::FftPlanner;
use synth_core::fixed::{Phase, Q1_15, Q1_31};
use synth_core::operator::{EnvConfig, OperatorConfig, OperatorMode};
use synth_core::{Message, Synth};

fn instant_config(freq_mult: u32, level: Q1_15) -> OperatorConfig {
    OperatorConfig {
        freq_mult,
        level,
        mode: OperatorMode::Additive,
        env: EnvConfig {
            a: 0,
            d: 0,
            s: Q1_31::ONE,
            r: 0,
        },
    }
}

fn sample_at(frame: u32) -> i16 {
    (frame & 0xFFFF) as u16 as i16
}

/// E1: a freshly-triggered note with a zero-duration attack/decay rises
/// like a bare sine wave through its first quarter cycle — the envelope is
/// already at full scale on sample 0, so there is nothing but the
/// oscillator itself to observe here.
#[test]
fn e1_attack_rises_like_a_sine_quarter_cycle() {
    let mut synth = Synth::new(48_000.0);
    synth.set_operator_config(0, 0, instant_config(1, Q1_15::ONE));
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 0,
            note_number: 69, // A4, 440 Hz
            velocity: 127,
        });

    let mut frames = [0u32; 48];
    synth.fill_buffer(&mut frames);
    let samples: Vec<i16> = frames.iter().map(|&f| sample_at(f)).collect();
    assert_eq!(samples[0], 0, "sin(0) is exactly zero");

    let d_phase = Phase::increment_for(440.0, 48_000.0);
    let quarter_turn = 1u32 << 30;
    let crossing = (0..samples.len() as u32)
        .find(|&k| d_phase.wrapping_mul(k) >= quarter_turn)
        .expect("440 Hz at 48 kHz crosses a quarter turn well within 48 samples");
    assert!(
        (20..35).contains(&crossing),
        "expected the quarter-turn crossing near 27 samples (48 kHz / 440 Hz / 4), got {crossing}"
    );

    for window in samples[..=crossing as usize].windows(2) {
        assert!(
            window[1] >= window[0],
            "expected a monotonic rise up to the quarter turn, got {window:?}"
        );
    }
    let near_peak = (f32::from(i16::MAX) * 0.9) as i16;
    assert!(
        samples[crossing as usize] > near_peak,
        "expected close to full scale at the quarter turn, got {}",
        samples[crossing as usize]
    );
}

/// E2: halving velocity roughly halves peak amplitude (the exact ratio is
/// `velocity / 127`, truncated by one Q1.15 multiply).
#[test]
fn e2_peak_amplitude_scales_with_velocity() {
    let mut synth = Synth::new(48_000.0);
    synth.set_operator_config(0, 0, instant_config(1, Q1_15::ONE));
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 0,
            note_number: 69,
            velocity: 64,
        });

    // More than one full 440 Hz cycle at 48 kHz (~109 samples/cycle).
    let mut frames = [0u32; 128];
    synth.fill_buffer(&mut frames);
    let peak = frames
        .iter()
        .map(|&f| sample_at(f).unsigned_abs())
        .max()
        .unwrap();

    let expected = (f32::from(i16::MAX) * 64.0 / 127.0) as u16;
    let tolerance = expected / 20; // 5%
    assert!(
        peak.abs_diff(expected) <= tolerance,
        "peak {peak} expected close to {expected} (velocity 64/127 of full scale)"
    );
}

/// E3: 10 ms sustain then a 10 ms release (480 samples each at 48 kHz)
/// brings raw output back to exactly zero at the end of release, and the
/// envelope itself decays in equal per-sample steps along the way.
#[test]
fn e3_release_decays_linearly_to_silence() {
    let mut synth = Synth::new(48_000.0);
    synth.set_operator_config(
        0,
        0,
        OperatorConfig {
            freq_mult: 1,
            level: Q1_15::ONE,
            mode: OperatorMode::Additive,
            env: EnvConfig {
                a: 0,
                d: 0,
                s: Q1_31::ONE,
                r: 10, // 10 timebase units = 10 ms at the default 1 kHz timebase
            },
        },
    );
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 0,
            note_number: 69,
            velocity: 127,
        });

    let mut sustain = [0u32; 480];
    synth.fill_buffer(&mut sustain);

    synth.queue_handle().post(Message::NoteOff { voice: 0 });
    let mut release = [0u32; 480];
    synth.fill_buffer(&mut release);

    assert_eq!(
        sample_at(release[479]),
        0,
        "480 samples (10 ms) into release the envelope should have reached zero"
    );

    let op = &synth.voice_mut(0).operators[0];
    assert_eq!(op.envelope_stage(), synth_core::operator::Stage::Off);
    assert_eq!(op.envelope_level(), Q1_31::ZERO);
}

/// The envelope's own trajectory during release is a straight line: equal
/// `current_level` deltas on every sample but the last, which snaps to the
/// exact target instead of carrying rounding error forward.
#[test]
fn e3_envelope_level_steps_are_uniform_during_release() {
    use synth_core::lut::SineLut;
    use synth_core::operator::Operator;

    let mut op = Operator::new();
    op.set_config(OperatorConfig {
        freq_mult: 1,
        level: Q1_15::ONE,
        mode: OperatorMode::Additive,
        env: EnvConfig {
            a: 0,
            d: 0,
            s: Q1_31::ONE,
            r: 10,
        },
    });
    op.note_on(1000, 127, 1000); // d_timebase = 1000 -> 10 timebase units = 10_000 samples...

    let sine = SineLut::new();
    // reach sustain (instantaneous, but tick once to settle state) then release
    op.tick(Q1_15::ZERO, &sine);
    op.note_off();

    let mut levels = Vec::with_capacity(10_000);
    for _ in 0..10_000 {
        op.tick(Q1_15::ZERO, &sine);
        levels.push(op.envelope_level().0);
    }

    let first_delta = levels[1] - levels[0];
    for window in levels[..levels.len() - 1].windows(2) {
        assert_eq!(
            window[1] - window[0],
            first_delta,
            "every release step but the last should apply the same delta"
        );
    }
    assert_eq!(*levels.last().unwrap(), 0);
}

/// E4: two simultaneous voices at half level each combine without
/// saturating away their headroom.
#[test]
fn e4_two_voices_do_not_saturate() {
    let mut synth = Synth::new(48_000.0);
    let half = instant_config(1, Q1_15::from_f32(0.5));
    synth.set_operator_config(0, 0, half);
    synth.set_operator_config(1, 0, half);
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 0,
            note_number: 60,
            velocity: 127,
        });
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 1,
            note_number: 67, // a perfect fifth above voice 0
            velocity: 127,
        });

    let mut frames = [0u32; 512];
    synth.fill_buffer(&mut frames);
    let peak = frames
        .iter()
        .map(|&f| sample_at(f).unsigned_abs())
        .max()
        .unwrap();
    assert!(
        peak < i16::MAX as u16,
        "two half-level voices summed should leave headroom, got peak {peak}"
    );
}

fn render_voice(configure: impl FnOnce(&mut Synth), n: usize) -> Vec<f32> {
    let mut synth = Synth::new(48_000.0);
    configure(&mut synth);
    synth
        .queue_handle()
        .post(Message::NoteOn {
            voice: 0,
            note_number: 69, // A4, 440 Hz
            velocity: 127,
        });
    let mut frames = vec![0u32; n];
    synth.fill_buffer(&mut frames);
    frames
        .iter()
        .map(|&f| f32::from(sample_at(f)) / f32::from(i16::MAX))
        .collect()
}

fn magnitude_spectrum(samples: &[f32]) -> Vec<f32> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(samples.len());
    let mut buf: Vec<Complex32> = samples.iter().map(|&s| Complex32::new(s, 0.0)).collect();
    fft.process(&mut buf);
    buf.iter().take(samples.len() / 2).map(Complex32::norm).collect()
}

/// E5: an FM pair spreads energy into sidebands around the carrier, unlike
/// a bare sine at the same fundamental. Compared by aggregate spectral
/// energy away from the fundamental bin rather than by predicting exact
/// sideband positions/magnitudes by hand.
#[test]
fn e5_fm_operator_spreads_energy_into_sidebands() {
    const N: usize = 4096;
    const SAMPLE_RATE: f32 = 48_000.0;
    const FUNDAMENTAL_HZ: f32 = 440.0;
    const GUARD_BINS: usize = 2;

    let control = render_voice(
        |synth| synth.set_operator_config(0, 0, instant_config(1, Q1_15::ONE)),
        N,
    );
    let fm = render_voice(
        |synth| {
            // op 0: modulator, additive (its output becomes the running
            // total that op 1 reads as a phase-modulation input).
            synth.set_operator_config(0, 0, instant_config(2, Q1_15::from_f32(0.1)));
            // op 1: carrier, FM mode (discards the running total's value,
            // using it only to drive its own phase).
            synth.set_operator_config(
                0,
                1,
                OperatorConfig {
                    freq_mult: 1,
                    level: Q1_15::ONE,
                    mode: OperatorMode::Fm,
                    env: EnvConfig {
                        a: 0,
                        d: 0,
                        s: Q1_31::ONE,
                        r: 0,
                    },
                },
            );
        },
        N,
    );

    let fundamental_bin = ((FUNDAMENTAL_HZ * N as f32 / SAMPLE_RATE).round()) as usize;
    let off_fundamental_energy = |spectrum: &[f32]| -> f32 {
        spectrum
            .iter()
            .enumerate()
            .filter(|&(i, _)| i.abs_diff(fundamental_bin) > GUARD_BINS)
            .map(|(_, &m)| m * m)
            .sum()
    };

    let control_energy = off_fundamental_energy(&magnitude_spectrum(&control));
    let fm_energy = off_fundamental_energy(&magnitude_spectrum(&fm));

    assert!(
        fm_energy > control_energy * 5.0,
        "FM pair should spread far more energy away from the fundamental than a bare tone: \
         control={control_energy}, fm={fm_energy}"
    );
}
