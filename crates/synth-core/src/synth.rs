//! The top-level synth engine: a fixed bank of voices, the shared lookup
//! tables, the control message queue, and the per-block mixdown.
//!
//! Grounded on `audio_synth_fill_buffer` in
//! `original_source/src/shared/audio/synth.c`: voice 0 (the "lead") mixes
//! into one draft buffer, and `_merge_drafts` then saturating-adds each
//! subsequent voice's scratch buffer directly into that running total,
//! one voice at a time, before the result is scaled by the master level
//! and widened into output frames. Because saturating add is not
//! associative, this sequential merge must happen inside the per-voice
//! loop rather than via a separately-accumulated second bus — summing the
//! non-lead voices against each other first and combining once at the end
//! would saturate differently whenever an intermediate sum clips.

use std::sync::Arc;

use crate::config::{AUDIO_BUFFER_SIZE, AUDIO_SYNTH_TIMEBASE, AUDIO_SYNTH_VOICE_COUNT};
use crate::fixed::Q1_15;
use crate::lut::LookupTables;
use crate::message::{Message, MessageQueue};
use crate::operator::OperatorConfig;
use crate::pool::frame_from_mono;
use crate::voice::Voice;

pub struct Synth {
    voices: [Voice; AUDIO_SYNTH_VOICE_COUNT],
    luts: LookupTables,
    queue: Arc<MessageQueue>,
    master_level: Q1_15,
    d_timebase: u32,
    draft_primary: Vec<Q1_15>,
    draft_scratch: Vec<Q1_15>,
}

impl Synth {
    #[must_use]
    pub fn new(sample_rate_hz: f64) -> Self {
        let d_timebase = (sample_rate_hz / f64::from(AUDIO_SYNTH_TIMEBASE)) as u32;
        Self {
            voices: std::array::from_fn(|_| Voice::new()),
            luts: LookupTables::new(sample_rate_hz),
            queue: Arc::new(MessageQueue::new()),
            master_level: Q1_15::ONE,
            d_timebase,
            draft_primary: vec![Q1_15::ZERO; AUDIO_BUFFER_SIZE],
            draft_scratch: vec![Q1_15::ZERO; AUDIO_BUFFER_SIZE],
        }
    }

    /// Grow the reusable draft buffers to at least `n` frames the first
    /// time a larger block is requested, mirroring `original_source`'s
    /// `static q1x15 *draft[2]` growth-by-realloc pattern as a safe
    /// `Vec::resize` instead of a fixed-capacity bound. Growth is rare in
    /// practice (callers render fixed-size blocks from the pool) so it is
    /// not part of the steady-state hot path's allocation-free guarantee.
    fn ensure_draft_capacity(&mut self, n: usize) {
        if n > self.draft_primary.len() {
            self.draft_primary.resize(n, Q1_15::ZERO);
            self.draft_scratch.resize(n, Q1_15::ZERO);
        }
    }

    /// Handle used to post [`Message`]s from any thread (UI, MIDI input,
    /// a demo sequencer) without touching the audio worker directly. The
    /// returned `Arc` can outlive and move independently of the `Synth`
    /// itself, e.g. into a thread that owns the synth for rendering while
    /// another posts control messages into it.
    #[must_use]
    pub fn queue_handle(&self) -> Arc<MessageQueue> {
        Arc::clone(&self.queue)
    }

    pub fn set_master_level(&mut self, level: Q1_15) {
        self.master_level = level;
    }

    pub fn voice_mut(&mut self, index: usize) -> &mut Voice {
        &mut self.voices[index]
    }

    pub fn set_operator_config(&mut self, voice: usize, operator: usize, config: OperatorConfig) {
        self.voices[voice].set_operator_config(operator, config);
    }

    fn apply(&mut self, msg: Message) {
        match msg {
            Message::NoteOn {
                voice,
                note_number,
                velocity,
            } => {
                let d_phase = self.luts.note.d_phase(note_number);
                debug_assert!(
                    (voice as usize) < self.voices.len(),
                    "note-on for out-of-range voice {voice}"
                );
                if let Some(v) = self.voices.get_mut(voice as usize) {
                    v.note_on(d_phase, velocity, self.d_timebase);
                } else {
                    log::warn!("note-on for out-of-range voice {voice}");
                }
            }
            Message::NoteOff { voice } => {
                debug_assert!(
                    (voice as usize) < self.voices.len(),
                    "note-off for out-of-range voice {voice}"
                );
                if let Some(v) = self.voices.get_mut(voice as usize) {
                    v.note_off();
                } else {
                    log::warn!("note-off for out-of-range voice {voice}");
                }
            }
            Message::Panic => {
                for v in &mut self.voices {
                    v.panic();
                }
            }
        }
    }

    /// Drain pending control messages and render one block, widening each
    /// Q1.15 sample into a packed stereo frame via [`frame_from_mono`].
    pub fn fill_buffer(&mut self, frames: &mut [u32]) {
        while let Some(msg) = self.queue.drain_next() {
            self.apply(msg);
        }

        let n = frames.len();
        self.ensure_draft_capacity(n);
        let primary = &mut self.draft_primary[..n];
        let scratch = &mut self.draft_scratch[..n];

        let (lead, others) = self
            .voices
            .split_first_mut()
            .expect("at least one voice configured");
        lead.fill_block(primary, &self.luts.sine);

        // Each subsequent voice must saturating-add directly into the
        // running total (not into a separately-accumulated bus merged at
        // the end): saturating add is not associative, so the merge order
        // matters whenever an intermediate sum would clip.
        for voice in others {
            voice.fill_block(scratch, &self.luts.sine);
            for (p, s) in primary.iter_mut().zip(scratch.iter()) {
                *p = *p + *s;
            }
        }

        for (frame, p) in frames.iter_mut().zip(primary.iter()) {
            let mixed = *p * self.master_level;
            *frame = frame_from_mono(mixed);
        }
    }
}
