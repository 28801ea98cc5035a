//! The consumer-side abstraction over hardware DMA/interrupt callbacks and
//! host audio callbacks (e.g. `cpal`).
//!
//! `original_source/src/rp2/audio.c`'s I2S interrupt handler and
//! `src/host/audio.c`'s host callback both do the same thing: pull one
//! block's worth of frames, non-blocking, substituting silence on
//! underrun. [`AudioSink`] is the trait that lets `synth-runner` treat
//! both the real hardware path and a desktop `cpal` stream the same way;
//! [`PoolSink`] is the one implementation this crate provides, backed by
//! a [`crate::pool::Reader`].

use crate::pool::Reader;

/// Something that can be handed packed PCM frames to consume. `pull` must
/// never block for long — it is called from a real-time audio callback.
pub trait AudioSink {
    /// Fill `out` with exactly `out.len()` frames.
    fn pull(&mut self, out: &mut [u32]);
}

/// An [`AudioSink`] backed by the lock-free buffer pool's consumer side.
pub struct PoolSink {
    reader: Reader,
}

impl PoolSink {
    #[must_use]
    pub fn new(reader: Reader) -> Self {
        Self { reader }
    }

    #[must_use]
    pub fn underrun_count(&self) -> u64 {
        self.reader.underrun_count()
    }
}

impl AudioSink for PoolSink {
    fn pull(&mut self, out: &mut [u32]) {
        self.reader.read_or_silence(out);
    }
}
