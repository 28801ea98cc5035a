//! Control message queue: bounded, lock-free, multi-producer/single-consumer,
//! drop-on-full. Messages are plain `Copy` value types — no per-message
//! allocation.
//!
//! Grounded on `crossbeam_queue::ArrayQueue`, which already gives wait-free
//! bounded push/pop with the exact drop-on-full discipline the spec calls
//! for (`push` returns the rejected item instead of blocking), rather than
//! hand-rolling the same atomics the original's `pico/util/queue.h` ring
//! wraps for a single-board target.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;

use crate::config::AUDIO_SYNTH_MESSAGE_QUEUE_SIZE;

/// A control message posted from outside the audio worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Start a note on the given voice.
    NoteOn {
        voice: u8,
        note_number: u16,
        velocity: u8,
    },
    /// Release the note currently held on the given voice.
    NoteOff { voice: u8 },
    /// Immediate silence on every voice.
    Panic,
}

/// Bounded FIFO of [`Message`]s, safe to post from any thread.
pub struct MessageQueue {
    queue: ArrayQueue<Message>,
    dropped: AtomicU64,
}

impl MessageQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(AUDIO_SYNTH_MESSAGE_QUEUE_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
            dropped: AtomicU64::new(0),
        }
    }

    /// Post a message. Non-blocking; silently dropped (and counted) if the
    /// queue is full.
    pub fn post(&self, msg: Message) {
        if self.queue.push(msg).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!("synth message queue full, dropping {msg:?}");
        }
    }

    /// Pop the next message in FIFO order, if any.
    pub fn drain_next(&self) -> Option<Message> {
        self.queue.pop()
    }

    /// Number of messages dropped due to a full queue since creation.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let q = MessageQueue::with_capacity(4);
        q.post(Message::NoteOn {
            voice: 0,
            note_number: 60,
            velocity: 127,
        });
        q.post(Message::NoteOff { voice: 0 });
        q.post(Message::Panic);

        assert_eq!(
            q.drain_next(),
            Some(Message::NoteOn {
                voice: 0,
                note_number: 60,
                velocity: 127
            })
        );
        assert_eq!(q.drain_next(), Some(Message::NoteOff { voice: 0 }));
        assert_eq!(q.drain_next(), Some(Message::Panic));
        assert_eq!(q.drain_next(), None);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let q = MessageQueue::with_capacity(1);
        q.post(Message::Panic);
        q.post(Message::Panic);
        assert_eq!(q.dropped_count(), 1);
    }
}
