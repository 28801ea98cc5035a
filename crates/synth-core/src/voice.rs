//! Voice: a fixed, ordered chain of operators sharing one fundamental
//! frequency. Grounded on `audio_synth_voice_fill_buffer` in
//! `original_source/src/shared/audio/synth.c`: the outer loop runs over
//! operators, the inner loop over samples, so each operator's phase and
//! envelope state advance sample-by-sample contiguously across the whole
//! block before the next operator runs.

use crate::config::AUDIO_SYNTH_OPERATOR_COUNT;
use crate::fixed::Q1_15;
use crate::lut::SineLut;
use crate::operator::{Operator, OperatorConfig};

/// An ordered chain of operators. The final operator's mode determines
/// whether earlier operators are additive-mixed or act as FM modulators —
/// there is no separate "algorithm" selector, matching the OPL2 style the
/// spec calls for.
pub struct Voice {
    pub operators: [Operator; AUDIO_SYNTH_OPERATOR_COUNT],
}

impl Voice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            operators: std::array::from_fn(|_| Operator::new()),
        }
    }

    pub fn set_operator_config(&mut self, index: usize, config: OperatorConfig) {
        self.operators[index].set_config(config);
    }

    pub fn note_on(&mut self, base_d_phase: u32, velocity: u8, d_timebase: u32) {
        for op in &mut self.operators {
            op.note_on(base_d_phase, velocity, d_timebase);
        }
    }

    pub fn note_off(&mut self) {
        for op in &mut self.operators {
            op.note_off();
        }
    }

    pub fn panic(&mut self) {
        for op in &mut self.operators {
            op.panic();
        }
    }

    /// Fill `draft` with this voice's contribution in Q1.15, zeroing it
    /// first and running each operator across the whole block in order.
    pub fn fill_block(&mut self, draft: &mut [Q1_15], sine: &SineLut) {
        draft.fill(Q1_15::ZERO);
        for op in &mut self.operators {
            for sample in draft.iter_mut() {
                *sample = op.tick(*sample, sine);
            }
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::OperatorMode;

    #[test]
    fn inactive_voice_is_silent() {
        let mut voice = Voice::new();
        let sine = SineLut::new();
        let mut draft = vec![Q1_15::ZERO; 64];
        voice.fill_block(&mut draft, &sine);
        assert!(draft.iter().all(|s| *s == Q1_15::ZERO));
    }

    #[test]
    fn additive_chain_sums_operators() {
        let mut voice = Voice::new();
        for op in &mut voice.operators {
            op.set_config(OperatorConfig {
                freq_mult: 1,
                level: Q1_15::ONE,
                mode: OperatorMode::Additive,
                env: crate::operator::EnvConfig {
                    a: 0,
                    d: 0,
                    s: crate::fixed::Q1_31::ONE,
                    r: 0,
                },
            });
        }
        voice.note_on(1000, 127, 1000);
        let sine = SineLut::new();
        let mut draft = vec![Q1_15::ZERO; 8];
        voice.fill_block(&mut draft, &sine);
        // with identical operators in phase, the sum should saturate toward
        // the extremes rather than stay within a single operator's range
        assert!(draft.iter().any(|s| s.0.unsigned_abs() > (i16::MAX / 2) as u16));
    }
}
