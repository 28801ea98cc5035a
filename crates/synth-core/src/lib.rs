//! Real-time polyphonic FM/additive synthesis core.
//!
//! Pure DSP and lock-free plumbing — no hardware or host I/O. A voice is a
//! fixed chain of [`operator::Operator`]s sharing one fundamental pitch;
//! an operator is one phase-accumulator oscillator plus one ADSR
//! envelope, combined additively or as phase modulation according to its
//! [`operator::OperatorMode`]. [`synth::Synth`] owns a bank of voices, the
//! shared lookup tables, and a [`message::MessageQueue`] for control
//! input, and renders blocks of packed PCM frames via
//! [`synth::Synth::fill_buffer`]. [`pool`] hands those frames to a
//! consumer across threads without locks; [`sink::AudioSink`] is the
//! trait a consumer implements to receive them.

pub mod config;
pub mod error;
pub mod fixed;
pub mod lut;
pub mod message;
pub mod note;
pub mod operator;
pub mod pool;
pub mod sink;
pub mod synth;
pub mod voice;

pub use error::InitError;
pub use message::Message;
pub use synth::Synth;
