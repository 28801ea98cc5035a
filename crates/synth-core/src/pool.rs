//! Buffer pool: a bounded ring of fixed-size output frame buffers,
//! single-producer/single-consumer, with atomic `count` and the
//! release/acquire fence pairing the spec requires.
//!
//! Grounded directly on `original_source/src/shared/audio/buffer.{h,c}`:
//! the original tracks `write_head`/`read_head`/`count` on one shared
//! struct behind a `__dmb()` barrier. Here, `write_head`/`read_head` move
//! into the owning [`Writer`]/[`Reader`] handles (per the re-architecture
//! note: "model as two owning handles... communicating via an atomic
//! `count`"), and `count` is updated with a real fetch-add/fetch-sub
//! rather than a plain read-modify-write under a barrier — cheap, and it
//! removes the "only correct under SPSC" caveat entirely.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::InitError;

/// How long to back off between poll attempts while blocking on a full or
/// empty pool. Matches the `sleep_us(100)` cadence in the original.
const BLOCKING_POLL_INTERVAL: Duration = Duration::from_micros(100);

struct Shared {
    buffers: UnsafeCell<Box<[u32]>>,
    size: usize,
    buffer_size: usize,
    count: AtomicUsize,
    underrun_count: AtomicU64,
}

// SAFETY: `buffers` is only ever indexed through disjoint `write_head`-
// and `read_head`-selected slots. `Writer` is the sole mutator of the
// write-side slot and `Reader` the sole mutator of the read-side slot;
// `count` is the only field both sides touch, and it is always accessed
// through atomic operations. The invariant `0 <= count <= size` plus
// "producer only advances write_head after incrementing count, consumer
// only advances read_head after decrementing it" guarantees the active
// write slot and the active read slot never coincide.
unsafe impl Sync for Shared {}

impl Shared {
    fn slot_ptr(&self, index: usize) -> *mut u32 {
        // SAFETY: `index < size` is upheld by callers (checked against
        // `count` before computing the offset).
        unsafe { (*self.buffers.get()).as_mut_ptr().add(index * self.buffer_size) }
    }
}

/// Producer-side handle: the only side allowed to call
/// `acquire_write`/`commit_write`.
pub struct Writer {
    shared: Arc<Shared>,
    write_head: usize,
}

/// Consumer-side handle: the only side allowed to call
/// `acquire_read`/`commit_read`.
pub struct Reader {
    shared: Arc<Shared>,
    read_head: usize,
}

/// Create a pool of `n_buffers` buffers, each `frames_per_buffer` frames,
/// split into its producer and consumer handles.
pub fn channel(n_buffers: u8, frames_per_buffer: u32) -> Result<(Writer, Reader), InitError> {
    let size = n_buffers as usize;
    let buffer_size = frames_per_buffer as usize;
    if size < 2 {
        return Err(InitError::InvalidPoolSize { n_buffers });
    }
    let total = size
        .checked_mul(buffer_size)
        .ok_or(InitError::OutOfMemory)?;
    let buffers = vec![0u32; total].into_boxed_slice();
    let shared = Arc::new(Shared {
        buffers: UnsafeCell::new(buffers),
        size,
        buffer_size,
        count: AtomicUsize::new(0),
        underrun_count: AtomicU64::new(0),
    });
    Ok((
        Writer {
            shared: shared.clone(),
            write_head: 0,
        },
        Reader {
            shared,
            read_head: 0,
        },
    ))
}

impl Writer {
    /// Acquire the next free buffer. Blocks (with a short sleep-poll
    /// back-off) until one frees up if `blocking` is true; otherwise
    /// returns `None` immediately when the pool is full.
    pub fn acquire_write(&mut self, blocking: bool) -> Option<&mut [u32]> {
        loop {
            if self.shared.count.load(Ordering::Acquire) < self.shared.size {
                break;
            }
            if !blocking {
                return None;
            }
            thread::sleep(BLOCKING_POLL_INTERVAL);
        }
        let ptr = self.shared.slot_ptr(self.write_head);
        // SAFETY: see `Shared`'s `Sync` impl comment — this slot is not
        // the active read slot while `count < size` holds it reserved.
        Some(unsafe { std::slice::from_raw_parts_mut(ptr, self.shared.buffer_size) })
    }

    /// Publish the buffer most recently returned by `acquire_write`.
    pub fn commit_write(&mut self) {
        self.write_head = (self.write_head + 1) % self.shared.size;
        self.shared.count.fetch_add(1, Ordering::Release);
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }
}

impl Reader {
    /// Acquire the oldest committed buffer. Blocks (with the same
    /// back-off) until one is available if `blocking` is true; otherwise
    /// returns `None` immediately on underrun.
    pub fn acquire_read(&mut self, blocking: bool) -> Option<&[u32]> {
        loop {
            if self.shared.count.load(Ordering::Acquire) > 0 {
                break;
            }
            if !blocking {
                return None;
            }
            thread::sleep(BLOCKING_POLL_INTERVAL);
        }
        let ptr = self.shared.slot_ptr(self.read_head);
        // SAFETY: see `Shared`'s `Sync` impl comment.
        Some(unsafe { std::slice::from_raw_parts(ptr, self.shared.buffer_size) })
    }

    /// Release the buffer most recently returned by `acquire_read` back
    /// to the pool.
    pub fn commit_read(&mut self) {
        self.read_head = (self.read_head + 1) % self.shared.size;
        self.shared.count.fetch_sub(1, Ordering::Release);
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.shared.buffer_size
    }

    /// Current fill level, `0..=size`. For diagnostics/tests only — not
    /// part of the hot path contract.
    #[must_use]
    pub fn count(&self) -> usize {
        self.shared.count.load(Ordering::Acquire)
    }

    fn note_underrun(&self) {
        self.shared.underrun_count.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn underrun_count(&self) -> u64 {
        self.shared.underrun_count.load(Ordering::Relaxed)
    }

    /// Pull one buffer's worth of frames into `out` (which must be exactly
    /// `buffer_size` long), substituting silence and recording an underrun
    /// if none is available. Non-blocking, matching the interrupt/callback
    /// consumer contract in spec §4.6/§7.
    pub fn read_or_silence(&mut self, out: &mut [u32]) {
        match self.acquire_read(false) {
            Some(buf) => {
                out.copy_from_slice(buf);
                self.commit_read();
            }
            None => {
                out.fill(0);
                self.note_underrun();
            }
        }
    }
}

/// Pack a mono Q1.15 sample into a stereo frame, duplicating it into both
/// channels (output is mono duplicated, per spec's non-goals).
#[must_use]
pub fn frame_from_mono(sample: crate::fixed::Q1_15) -> u32 {
    frame_from_stereo(sample.raw(), sample.raw())
}

/// Pack a stereo frame: `(left << 16) | right`, both as raw signed PCM bit
/// patterns.
#[must_use]
pub fn frame_from_stereo(left: i16, right: i16) -> u32 {
    (u32::from(left as u16) << 16) | u32::from(right as u16)
}
