//! Note-name parsing utility: `"C4"`, `"A#3"`, `"Gb"` (no octave → octave 3)
//! → MIDI note number. Not used on the audio hot path; malformed input
//! returns a sentinel rather than panicking, per spec's error-handling
//! policy for this utility.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Sentinel note returned on parse failure (middle C).
const FALLBACK_NOTE: u16 = 60;

/// Parse a note name (`"A4"`, `"C#4"`, `"B3"`) to a MIDI note number.
/// Default octave is 3 when none is given. `"C4" == 60`, `"A4" == 69`.
#[must_use]
pub fn note(name: &str) -> u16 {
    // Longest match first so "C#4" matches "C#" rather than "C".
    let Some((index, matched)) = NOTE_NAMES
        .iter()
        .enumerate()
        .filter(|(_, candidate)| name.starts_with(*candidate))
        .max_by_key(|(_, candidate)| candidate.len())
    else {
        return FALLBACK_NOTE;
    };

    let rest = &name[matched.len()..];
    let octave: i32 = if rest.is_empty() {
        3
    } else {
        match rest.parse::<i32>() {
            Ok(value) => value,
            Err(_) => return FALLBACK_NOTE,
        }
    };

    let note_num = 60 + index as i32 + (octave - 4) * 12;
    note_num.clamp(0, 127) as u16
}
