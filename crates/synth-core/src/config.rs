//! Compile-time configuration surface.
//!
//! These mirror the `#define`s in the original firmware's `config.h`:
//! tunables that change the shape of the DSP graph or its memory layout,
//! not runtime state.

/// Output sample rate in Hz.
pub const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// Bits per PCM channel sample.
pub const AUDIO_BIT_DEPTH: u32 = 16;

/// Number of simultaneously-sounding voices.
#[cfg(not(feature = "host"))]
pub const AUDIO_SYNTH_VOICE_COUNT: usize = 8;
#[cfg(feature = "host")]
pub const AUDIO_SYNTH_VOICE_COUNT: usize = 4;

/// Operators chained per voice.
#[cfg(not(feature = "host"))]
pub const AUDIO_SYNTH_OPERATOR_COUNT: usize = 4;
#[cfg(feature = "host")]
pub const AUDIO_SYNTH_OPERATOR_COUNT: usize = 2;

/// Sine LUT resolution: `2^AUDIO_SYNTH_LUT_RES` entries.
pub const AUDIO_SYNTH_LUT_RES: u32 = 10;

/// Sine LUT size in entries.
pub const AUDIO_SYNTH_LUT_SIZE: usize = 1 << AUDIO_SYNTH_LUT_RES;

/// Frames per output block.
pub const AUDIO_BUFFER_SIZE: usize = 512;

/// Number of frame buffers in the producer/consumer ring.
pub const AUDIO_BUFFER_POOL_SIZE: usize = 2;

/// Envelope timebase: ticks per second (1000 = millisecond granularity).
pub const AUDIO_SYNTH_TIMEBASE: u32 = 1000;

/// Capacity of the control-message queue.
pub const AUDIO_SYNTH_MESSAGE_QUEUE_SIZE: usize = 32;
