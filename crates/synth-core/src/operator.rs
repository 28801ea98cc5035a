//! Operator: one oscillator plus one ADSR envelope, the building block of
//! FM/additive synthesis (OPL/DX7 terminology). Grounded on
//! `original_source/src/shared/audio/synth.c`'s
//! `audio_synth_operator_sample_additive`/`_freq_mod`, with the envelope
//! tick implemented per spec's state table (the original left envelope
//! ticking as a `todo`).

use crate::fixed::{Phase, Q1_15, Q1_31};
use crate::lut::SineLut;

/// How an operator's sample combines with the previous operator's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorMode {
    /// Sum this operator's output into the running total.
    Additive,
    /// Use the previous operator's output as a phase-modulation input.
    Fm,
}

/// Attack/decay/sustain/release configuration. `a`, `d`, `r` are durations
/// in timebase units (default 1 ms); `s` is the sustain level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvConfig {
    pub a: u32,
    pub d: u32,
    pub s: Q1_31,
    pub r: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            a: 0,
            d: 0,
            s: Q1_31::ONE,
            r: 0,
        }
    }
}

/// Static configuration for one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Integer multiplier of the voice's fundamental frequency.
    pub freq_mult: u32,
    /// Output gain before velocity scaling.
    pub level: Q1_15,
    pub mode: OperatorMode,
    pub env: EnvConfig,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            freq_mult: 1,
            level: Q1_15::ZERO,
            mode: OperatorMode::Additive,
            env: EnvConfig::default(),
        }
    }
}

/// Envelope stage. `Off` is the rest state before the first note-on and
/// after a release completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Off,
}

#[derive(Debug, Clone, Copy, Default)]
struct StageParams {
    sample_duration: u32,
    d_level: Q1_31,
    target_level: Q1_31,
}

/// Linear ramp rate from `start` to `target` over `duration` samples.
/// Division is off the audio hot path: this only runs on stage transitions.
fn ramp_rate(start: Q1_31, target: Q1_31, duration: u32) -> Q1_31 {
    debug_assert!(duration > 0);
    let delta = i64::from(target.0) - i64::from(start.0);
    Q1_31::clamp_i64(delta / i64::from(duration))
}

/// Per-voice ADSR envelope generator.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    stage: Stage,
    current_level: Q1_31,
    samples_into_stage: u32,
    /// Index 0 = Attack, 1 = Decay, 2 = unused (Sustain holds), 3 = Release.
    stages: [StageParams; 4],
}

const STAGE_A: usize = 0;
const STAGE_D: usize = 1;
const STAGE_R: usize = 3;

impl Envelope {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Off,
            current_level: Q1_31::ZERO,
            samples_into_stage: 0,
            stages: [StageParams::default(); 4],
        }
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn current_level(&self) -> Q1_31 {
        self.current_level
    }

    /// Reset into Attack for a new note, precomputing the attack/decay
    /// ramps (the release ramp depends on the level attained at release
    /// time, so it is computed lazily in [`Envelope::enter_release`]).
    pub fn reset_for_note_on(&mut self, config: &EnvConfig, d_timebase: u32) {
        let duration_a = config.a * d_timebase;
        let duration_d = config.d * d_timebase;
        let duration_r = config.r * d_timebase;

        self.stages[STAGE_A] = StageParams {
            sample_duration: duration_a,
            d_level: if duration_a == 0 {
                Q1_31::ZERO
            } else {
                ramp_rate(Q1_31::ZERO, Q1_31::ONE, duration_a)
            },
            target_level: Q1_31::ONE,
        };
        self.stages[STAGE_D] = StageParams {
            sample_duration: duration_d,
            d_level: if duration_d == 0 {
                Q1_31::ZERO
            } else {
                ramp_rate(Q1_31::ONE, config.s, duration_d)
            },
            target_level: config.s,
        };
        // Only the duration is known up front for release; `d_level` is
        // filled in by `enter_release` once the attained level is known.
        self.stages[STAGE_R] = StageParams {
            sample_duration: duration_r,
            d_level: Q1_31::ZERO,
            target_level: Q1_31::ZERO,
        };

        self.stage = Stage::Attack;
        self.current_level = Q1_31::ZERO;
        self.samples_into_stage = 0;
    }

    /// Immediate silence: used by panic.
    pub fn silence(&mut self) {
        self.stage = Stage::Off;
        self.current_level = Q1_31::ZERO;
        self.samples_into_stage = 0;
    }

    fn enter_release(&mut self) {
        let duration = self.stages[STAGE_R].sample_duration;
        self.samples_into_stage = 0;
        if duration == 0 {
            self.current_level = Q1_31::ZERO;
            self.stage = Stage::Off;
            return;
        }
        let d_level = ramp_rate(self.current_level, Q1_31::ZERO, duration);
        self.stages[STAGE_R] = StageParams {
            sample_duration: duration,
            d_level,
            target_level: Q1_31::ZERO,
        };
        self.stage = Stage::Release;
    }

    /// Advance the stage at `idx` by one sample. Returns `true` if the
    /// stage's exit condition was reached this sample (duration == 0
    /// transitions instantaneously, per spec).
    fn step(&mut self, idx: usize) -> bool {
        let params = self.stages[idx];
        if params.sample_duration == 0 {
            self.current_level = params.target_level;
            return true;
        }
        self.current_level = self.current_level + params.d_level;
        self.samples_into_stage += 1;
        if self.samples_into_stage >= params.sample_duration {
            self.current_level = params.target_level;
            true
        } else {
            false
        }
    }

    /// Advance the envelope by one sample. `active` reflects whether the
    /// note is still held (false once `note_off` has been observed).
    ///
    /// A zero-duration stage transitions on the same sample rather than
    /// consuming one (per spec), so this cascades through same-sample
    /// transitions in a bounded loop (at most one pass per stage) instead
    /// of requiring a separate `tick` call per hop.
    pub fn tick(&mut self, active: bool) -> Q1_31 {
        for _ in 0..4 {
            match self.stage {
                Stage::Attack => {
                    if !self.step(STAGE_A) {
                        break;
                    }
                    if active {
                        self.stage = Stage::Decay;
                        self.samples_into_stage = 0;
                    } else {
                        self.enter_release();
                    }
                }
                Stage::Decay => {
                    if !self.step(STAGE_D) {
                        break;
                    }
                    if active {
                        self.stage = Stage::Sustain;
                        self.samples_into_stage = 0;
                    } else {
                        self.enter_release();
                    }
                }
                Stage::Sustain => {
                    if active {
                        break;
                    }
                    self.enter_release();
                }
                Stage::Release => {
                    if !self.step(STAGE_R) {
                        break;
                    }
                    self.stage = Stage::Off;
                    self.current_level = Q1_31::ZERO;
                }
                Stage::Off => {
                    self.current_level = Q1_31::ZERO;
                    break;
                }
            }
        }
        self.current_level
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

/// One oscillator plus one envelope.
#[derive(Debug, Clone)]
pub struct Operator {
    pub config: OperatorConfig,
    phase: Phase,
    d_phase: u32,
    env: Envelope,
    /// Effective output gain after velocity scaling.
    level: Q1_15,
    active: bool,
}

impl Operator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: OperatorConfig::default(),
            phase: Phase::ZERO,
            d_phase: 0,
            env: Envelope::new(),
            level: Q1_15::ZERO,
            active: false,
        }
    }

    pub fn set_config(&mut self, config: OperatorConfig) {
        self.config = config;
    }

    /// Recompute `d_phase` from the voice's fundamental and this
    /// operator's frequency multiplier (also used when the voice's note
    /// changes without retriggering the envelope, if ever needed).
    pub fn set_base_d_phase(&mut self, base_d_phase: u32) {
        self.d_phase = base_d_phase.wrapping_mul(self.config.freq_mult);
    }

    pub fn note_on(&mut self, base_d_phase: u32, velocity: u8, d_timebase: u32) {
        self.phase = Phase::ZERO;
        self.set_base_d_phase(base_d_phase);
        let velocity_gain = Q1_15::from_f32(f32::from(velocity) / 127.0);
        self.level = self.config.level * velocity_gain;
        self.env.reset_for_note_on(&self.config.env, d_timebase);
        self.active = true;
    }

    pub fn note_off(&mut self) {
        self.active = false;
    }

    pub fn panic(&mut self) {
        self.level = Q1_15::ZERO;
        self.active = false;
        self.env.silence();
    }

    #[must_use]
    pub fn envelope_stage(&self) -> Stage {
        self.env.stage()
    }

    /// Current envelope level, for tests that need to observe the ADSR
    /// trajectory directly rather than inferring it from mixed output.
    #[must_use]
    pub fn envelope_level(&self) -> Q1_31 {
        self.env.current_level()
    }

    /// Per-sample tick: advance the envelope, read the oscillator, combine
    /// with `prev` according to mode, and advance the phase accumulator.
    #[must_use]
    pub fn tick(&mut self, prev: Q1_15, sine: &SineLut) -> Q1_15 {
        let env_level = self.env.tick(self.active);
        let env_down = env_level.to_q1_15();
        let sample = sine.sample(self.phase);
        let scaled = sample * self.level * env_down;

        match self.config.mode {
            OperatorMode::Additive => {
                self.phase = self.phase.wrapping_add(self.d_phase);
                prev + scaled
            }
            OperatorMode::Fm => {
                let modulation = (i32::from(prev.raw()) << 16) as u32;
                self.phase = self
                    .phase
                    .wrapping_add(self.d_phase.wrapping_add(modulation));
                scaled
            }
        }
    }
}

impl Default for Operator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_config() -> OperatorConfig {
        OperatorConfig {
            freq_mult: 1,
            level: Q1_15::ONE,
            mode: OperatorMode::Additive,
            env: EnvConfig {
                a: 0,
                d: 0,
                s: Q1_31::ONE,
                r: 0,
            },
        }
    }

    #[test]
    fn note_on_resets_phase_and_activates() {
        let mut op = Operator::new();
        op.set_config(instant_config());
        op.note_on(1000, 127, 1000);
        assert!(op.active);
        assert_eq!(op.phase, Phase::ZERO);
        assert_eq!(op.d_phase, 1000);
    }

    #[test]
    fn zero_duration_envelope_jumps_straight_to_sustain() {
        let mut op = Operator::new();
        op.set_config(instant_config());
        op.note_on(1000, 127, 1000);
        let sine = SineLut::new();
        // first tick should already be in sustain at full level, since a=d=0
        let _ = op.tick(Q1_15::ZERO, &sine);
        assert_eq!(op.envelope_stage(), Stage::Sustain);
    }

    #[test]
    fn attack_ramps_linearly() {
        let mut op = Operator::new();
        let mut config = instant_config();
        config.env.a = 10; // 10 timebase units
        op.set_config(config);
        op.note_on(0, 127, 1000); // d_timebase = 1000 -> duration_a = 10_000 samples
        let sine = SineLut::new();
        let mut levels = Vec::new();
        for _ in 0..5 {
            op.tick(Q1_15::ZERO, &sine);
            levels.push(op.env.current_level());
        }
        for window in levels.windows(2) {
            assert!(window[1].0 >= window[0].0);
        }
    }

    #[test]
    fn panic_silences_immediately() {
        let mut op = Operator::new();
        op.set_config(instant_config());
        op.note_on(1000, 127, 1000);
        op.panic();
        let sine = SineLut::new();
        let out = op.tick(Q1_15::ZERO, &sine);
        assert_eq!(out, Q1_15::ZERO);
        assert_eq!(op.envelope_stage(), Stage::Off);
    }

    #[test]
    fn double_note_off_matches_single_note_off_trajectory() {
        let mut a = Operator::new();
        let mut config = instant_config();
        config.env.r = 10;
        a.set_config(config);
        a.note_on(1000, 127, 1000);

        let mut b = a.clone();

        let sine = SineLut::new();
        a.tick(Q1_15::ZERO, &sine);
        a.note_off();
        b.tick(Q1_15::ZERO, &sine);
        b.note_off();
        b.note_off(); // redundant

        for _ in 0..20 {
            let sa = a.tick(Q1_15::ZERO, &sine);
            let sb = b.tick(Q1_15::ZERO, &sine);
            assert_eq!(sa, sb);
        }
    }
}
