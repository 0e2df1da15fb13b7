// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Equal-temperament pitch math.
//!
//! Everything here is referenced to A4 = 440 Hz. A "register distance" is the
//! number of semitones (keys/pads) away from A4, positive or negative.

/// Concert pitch used for tuning.
pub const A4_FREQUENCY: f64 = 440.0;

/// Middle C, used for marking and shifting.
pub const MIDDLE_C_FREQUENCY: f64 = 261.6256;

/// The MIDI note value of A4.
pub const A4_MIDI_VALUE: f64 = 69.0;

/// Two frequencies within this many hertz of each other are the same pitch.
/// Absorbs sloppy sample naming and float error.
pub const FREQUENCY_TOLERANCE: f64 = 0.3;

pub const NOTES_IN_OCTAVE: i32 = 12;

/// Lowest supported register distance from A4 (MIDI note 0).
pub const MIN_REGISTER_DISTANCE: i32 = -69;

/// Highest supported register distance from A4.
pub const MAX_REGISTER_DISTANCE: i32 = 143;

/// Returns the frequency of the register `distance` semitones away from A4.
pub fn hertz(distance: f64) -> f64 {
    A4_FREQUENCY * 2f64.powf(distance / NOTES_IN_OCTAVE as f64)
}

/// Converts a frequency to a fractional MIDI note value.
pub fn midi_value(frequency: f64) -> f64 {
    A4_MIDI_VALUE + NOTES_IN_OCTAVE as f64 * (frequency / A4_FREQUENCY).log2()
}

/// Converts a fractional MIDI note value back to a frequency.
pub fn frequency_from_midi_value(value: f64) -> f64 {
    A4_FREQUENCY * 2f64.powf((value - A4_MIDI_VALUE) / NOTES_IN_OCTAVE as f64)
}

/// Converts an interval in semitones into a frequency ratio.
pub fn frequency_ratio(interval: f64) -> f64 {
    2f64.powf(interval / NOTES_IN_OCTAVE as f64)
}

/// Returns true if the two frequencies are within [`FREQUENCY_TOLERANCE`].
pub fn frequencies_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= FREQUENCY_TOLERANCE
}
