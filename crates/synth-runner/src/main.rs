//! Desktop demo host for `synth-core`.
//!
//! Spins up a producer thread that fills the buffer pool from a
//! [`synth_core::Synth`], plays it back through the default `cpal` output
//! device via [`synth_core::sink::PoolSink`], configures a two-operator FM
//! "bell" patch (the same `a/d/s/r`, frequency multiplier and gain values
//! as `bongocat`'s demo app), and drives it from a small line-based
//! console reading note names.

use std::io::{self, BufRead};
use std::process;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use synth_core::fixed::{Q1_15, Q1_31};
use synth_core::operator::{EnvConfig, OperatorConfig, OperatorMode};
use synth_core::pool::{self, Reader};
use synth_core::sink::{AudioSink, PoolSink};
use synth_core::{InitError, Message, Synth};

const POOL_BUFFERS: u8 = 4;
const BLOCK_FRAMES: u32 = 256;
const SAMPLE_RATE_HZ: u32 = 48_000;

struct CliArgs {
    demo: bool,
    mute: bool,
}

fn print_usage_and_exit(code: i32) -> ! {
    eprintln!("Usage: synth-runner [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --demo     Play a short scripted phrase and exit");
    eprintln!("  --mute     Run the synth without opening an audio device");
    eprintln!("  -h, --help Show this help");
    process::exit(code);
}

fn parse_args() -> CliArgs {
    let mut demo = false;
    let mut mute = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--demo" => demo = true,
            "--mute" => mute = true,
            "-h" | "--help" => print_usage_and_exit(0),
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage_and_exit(1);
            }
        }
    }
    CliArgs { demo, mute }
}

/// The "bell" patch from the original firmware's bongocat demo app:
/// operator 0 is a short percussive additive click, operator 1 is a
/// longer frequency-modulated decay layered on top.
fn bell_patch(synth: &mut Synth, voice: usize) {
    synth.set_operator_config(
        voice,
        0,
        OperatorConfig {
            freq_mult: 6,
            level: Q1_15::from_f32(0.4),
            mode: OperatorMode::Additive,
            env: EnvConfig {
                a: 2,
                d: 50,
                s: Q1_31::from_f32(0.0),
                r: 50,
            },
        },
    );
    synth.set_operator_config(
        voice,
        1,
        OperatorConfig {
            freq_mult: 1,
            level: Q1_15::from_f32(0.5),
            mode: OperatorMode::Fm,
            env: EnvConfig {
                a: 2,
                d: 150,
                s: Q1_31::from_f32(0.0),
                r: 100,
            },
        },
    );
}

fn build_output_stream(sample_rate_hz: u32, reader: Reader) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| String::from("no default audio output device"))?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| format!("failed to query output configs: {e}"))?
        .find(|cfg| cfg.channels() == 2)
        .ok_or_else(|| String::from("no stereo output config available"))?;

    let config = supported
        .with_sample_rate(cpal::SampleRate(sample_rate_hz))
        .config();

    let mut sink = PoolSink::new(reader);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [i16], _| {
                let frame_count = data.len() / 2;
                let mut frames = vec![0u32; frame_count];
                sink.pull(&mut frames);
                for (out, frame) in data.chunks_mut(2).zip(frames.iter()) {
                    out[0] = (*frame >> 16) as i16;
                    out[1] = (*frame & 0xFFFF) as i16;
                }
            },
            |err| log::error!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| format!("failed to build output stream: {e}"))?;

    stream
        .play()
        .map_err(|e| format!("failed to start output stream: {e}"))?;
    Ok(stream)
}

/// Play a short scripted phrase then return, for `--demo`/headless use.
fn run_demo(queue: &synth_core::message::MessageQueue) {
    let phrase = [("A3", 0u8), ("C4", 0), ("E4", 0)];
    for (name, voice) in phrase {
        let note_number = synth_core::note::note(name);
        queue.post(Message::NoteOn {
            voice,
            note_number,
            velocity: 100,
        });
        thread::sleep(Duration::from_millis(300));
        queue.post(Message::NoteOff { voice });
        thread::sleep(Duration::from_millis(150));
    }
}

/// Read note names from stdin until `quit`/EOF, posting note on/off.
fn run_console(queue: &synth_core::message::MessageQueue) {
    println!("synth-runner console: type a note name (e.g. A4, C#3) to play it,");
    println!("'off' to release voice 0, 'panic' to silence everything, 'quit' to exit.");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "" => continue,
            "quit" | "q" => break,
            "off" => queue.post(Message::NoteOff { voice: 0 }),
            "panic" => queue.post(Message::Panic),
            name => {
                let note_number = synth_core::note::note(name);
                queue.post(Message::NoteOn {
                    voice: 0,
                    note_number,
                    velocity: 100,
                });
            }
        }
    }
}

fn main() {
    env_logger::init();
    let cli = parse_args();

    let mut synth = Synth::new(f64::from(SAMPLE_RATE_HZ));
    bell_patch(&mut synth, 0);
    synth.set_master_level(Q1_15::from_f32(0.5));
    let queue = synth.queue_handle();

    let (mut writer, reader) = match pool::channel(POOL_BUFFERS, BLOCK_FRAMES) {
        Ok(channel) => channel,
        Err(InitError::InvalidPoolSize { n_buffers }) => {
            eprintln!("invalid pool size {n_buffers}");
            process::exit(1);
        }
        Err(InitError::OutOfMemory) => {
            eprintln!("failed to allocate buffer pool");
            process::exit(1);
        }
    };

    let _stream = if cli.mute {
        None
    } else {
        match build_output_stream(SAMPLE_RATE_HZ, reader) {
            Ok(stream) => Some(stream),
            Err(e) => {
                log::error!("{e}, continuing muted");
                None
            }
        }
    };

    thread::spawn(move || loop {
        let Some(buf) = writer.acquire_write(true) else {
            continue;
        };
        synth.fill_buffer(buf);
        writer.commit_write();
    });

    if cli.demo {
        run_demo(&queue);
    } else {
        run_console(&queue);
    }
}
