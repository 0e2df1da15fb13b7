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

//! Register tables.
//!
//! A register is a frequency paired with an octave and a note label: one
//! distinct point on the spectrum, corresponding to one key on a keyboard or
//! one pad on a controller. Tables are built over a range of register
//! distances from A4, e.g. -48 starts at A0 (27.5 Hz), -9 at C4 and 0 at A4.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::debug;

use crate::pitch::{
    frequencies_match, hertz, MAX_REGISTER_DISTANCE, MIN_REGISTER_DISTANCE, NOTES_IN_OCTAVE,
};

mod error;

pub use error::RegisterError;

/// Note names in scientific notation, starting from A.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// Physical keyboard key counts mapped to the register distance of their lowest key.
pub const KEYBOARD_START_OFFSETS: [(usize, i32); 5] =
    [(88, -48), (61, -33), (49, -21), (32, -9), (25, -9)];

/// A frequency paired with an octave and label.
#[derive(Clone, Debug, PartialEq)]
pub struct Register {
    /// The fundamental frequency in hertz.
    pub frequency: f64,
    /// The octave in scientific pitch notation.
    pub octave: i32,
    /// The note label, e.g. "C#".
    pub label: &'static str,
}

impl Register {
    /// Builds the register `distance` semitones away from A4.
    pub fn at_distance(distance: i32) -> Register {
        let label = NOTE_NAMES[distance.rem_euclid(NOTES_IN_OCTAVE) as usize];
        let octave = (4.0 + distance as f64 / NOTES_IN_OCTAVE as f64).ceil() as i32;

        Register {
            frequency: hertz(distance as f64),
            // B and A# sort above C in the name table, so they belong to the octave below.
            octave: if label == "B" || label == "A#" {
                octave - 1
            } else {
                octave
            },
            label,
        }
    }

    /// Returns true for sharps.
    pub fn is_accidental(&self) -> bool {
        self.label.contains('#')
    }

    /// The label and octave, e.g. "C#5".
    pub fn mapping_name(&self) -> String {
        format!("{}{}", self.label, self.octave)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({:.4} Hz)", self.label, self.octave, self.frequency)
    }
}

/// A register carrying a horizontal rendering coordinate for a keybed.
#[derive(Clone, Debug, PartialEq)]
pub struct KeybedRegister {
    pub register: Register,
    /// Grid column for drawing the key. Naturals and accidentals advance
    /// separate counters so black keys sit between their neighbours.
    pub offset: i32,
}

fn check_range(start: i32, end: i32) -> Result<(), RegisterError> {
    let supported = MIN_REGISTER_DISTANCE..=MAX_REGISTER_DISTANCE;
    if !supported.contains(&start) || !supported.contains(&end) || start > end {
        return Err(RegisterError::OutOfRange { start, end });
    }
    Ok(())
}

/// Builds the registers for every distance in `start..end`.
pub fn build_registers(start: i32, end: i32) -> Result<Vec<Register>, RegisterError> {
    check_range(start, end)?;
    Ok((start..end).map(Register::at_distance).collect())
}

/// Builds keybed registers for every distance in `start..end`.
pub fn build_keybed_registers(start: i32, end: i32) -> Result<Vec<KeybedRegister>, RegisterError> {
    check_range(start, end)?;

    let mut black = 0;
    let mut white = -2;

    Ok((start..end)
        .enumerate()
        .map(|(i, distance)| {
            let register = Register::at_distance(distance);
            // A range starting on C has no preceding white key to sit after.
            if i == 0 && register.label == "C" {
                black = -3;
            }
            let offset = if register.is_accidental() {
                black += 3;
                if register.label == "C#" || register.label == "F#" {
                    black += 3;
                }
                black
            } else {
                white += 3;
                white
            };
            KeybedRegister { register, offset }
        })
        .collect())
}

/// Builds `count` registers starting at `start`.
pub fn registers_for_count(count: usize, start: i32) -> Result<Vec<Register>, RegisterError> {
    build_registers(start, count_end(count, start)?)
}

/// Builds `count` keybed registers starting at `start`.
pub fn keybed_registers_for_count(
    count: usize,
    start: i32,
) -> Result<Vec<KeybedRegister>, RegisterError> {
    build_keybed_registers(start, count_end(count, start)?)
}

fn count_end(count: usize, start: i32) -> Result<i32, RegisterError> {
    i32::try_from(count)
        .ok()
        .and_then(|count| start.checked_add(count))
        .ok_or(RegisterError::OutOfRange {
            start,
            end: MAX_REGISTER_DISTANCE + 1,
        })
}

/// Gets the register distance of the lowest key of a keyboard with `key_count` keys.
pub fn keyboard_start_offset(key_count: usize) -> Result<i32, RegisterError> {
    KEYBOARD_START_OFFSETS
        .iter()
        .find(|(count, _)| *count == key_count)
        .map(|(_, start)| *start)
        .ok_or(RegisterError::UnsupportedKeyCount(key_count))
}

/// Finds the register matching `frequency` within tolerance.
pub fn find_register(registers: &[Register], frequency: f64) -> Option<&Register> {
    registers
        .iter()
        .find(|register| register.frequency == frequency)
        .or_else(|| {
            registers
                .iter()
                .find(|register| frequencies_match(register.frequency, frequency))
        })
}

/// Lazily built register tables, owned by the controller context.
#[derive(Default)]
pub struct RegisterCache {
    /// The full supported spectrum, used for index-based sample assignment.
    indexed: OnceLock<Arc<[Register]>>,
    /// Keybed tables by key count.
    keybeds: Mutex<HashMap<usize, Arc<[KeybedRegister]>>>,
}

impl RegisterCache {
    pub fn new() -> RegisterCache {
        RegisterCache::default()
    }

    /// Gets the full-spectrum register table.
    pub fn indexed(&self) -> Arc<[Register]> {
        self.indexed
            .get_or_init(|| {
                debug!("Building indexed register table");
                (MIN_REGISTER_DISTANCE..MAX_REGISTER_DISTANCE)
                    .map(Register::at_distance)
                    .collect()
            })
            .clone()
    }

    /// Gets the keybed table for a keyboard with `key_count` keys.
    pub fn keybed(&self, key_count: usize) -> Result<Arc<[KeybedRegister]>, RegisterError> {
        let mut keybeds = self.keybeds.lock();
        if let Some(registers) = keybeds.get(&key_count) {
            return Ok(registers.clone());
        }

        let start = keyboard_start_offset(key_count)?;
        let registers: Arc<[KeybedRegister]> =
            keybed_registers_for_count(key_count, start)?.into();
        debug!(key_count, start, "Built keybed register table");
        keybeds.insert(key_count, registers.clone());
        Ok(registers)
    }

    /// Finds the register with the given label and octave in the full spectrum.
    pub fn find_by_name(&self, label: &str, octave: i32) -> Option<Register> {
        self.indexed()
            .iter()
            .find(|register| register.label == label && register.octave == octave)
            .cloned()
    }
}

impl fmt::Debug for RegisterCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterCache")
            .field("indexed", &self.indexed.get().is_some())
            .field("keybeds", &self.keybeds.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::MIDDLE_C_FREQUENCY;

    #[test]
    fn test_build_registers_from_middle_c() {
        let registers = build_registers(-9, 3).unwrap();
        assert_eq!(registers.len(), 12);

        let labels: Vec<&str> = registers.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec!["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"]
        );
        assert_eq!(registers[0].octave, 4);
        assert!(frequencies_match(registers[0].frequency, MIDDLE_C_FREQUENCY));

        // The whole octave stays in octave 4, including A# and B.
        assert!(registers.iter().all(|r| r.octave == 4));
    }

    #[test]
    fn test_octave_boundaries() {
        assert_eq!(Register::at_distance(-10).mapping_name(), "B3");
        assert_eq!(Register::at_distance(-11).mapping_name(), "A#3");
        assert_eq!(Register::at_distance(-12).mapping_name(), "A3");
        assert_eq!(Register::at_distance(3).mapping_name(), "C5");
        assert_eq!(Register::at_distance(-48).mapping_name(), "A0");
        assert_eq!(Register::at_distance(-69).mapping_name(), "C-1");
    }

    #[test]
    fn test_frequencies_strictly_increase() {
        let registers = build_registers(MIN_REGISTER_DISTANCE, MAX_REGISTER_DISTANCE).unwrap();
        assert!(registers
            .windows(2)
            .all(|pair| pair[0].frequency < pair[1].frequency));
    }

    #[test]
    fn test_range_errors() {
        assert_eq!(
            registers_for_count(300, MIN_REGISTER_DISTANCE),
            Err(RegisterError::OutOfRange {
                start: -69,
                end: 231
            })
        );
        assert!(build_registers(-70, 0).is_err());
        assert!(build_registers(0, 144).is_err());
        assert!(build_registers(5, 4).is_err());
        assert_eq!(build_registers(4, 4).unwrap().len(), 0);
    }

    #[test]
    fn test_keyboard_start_offsets() {
        assert_eq!(keyboard_start_offset(88), Ok(-48));
        assert_eq!(keyboard_start_offset(61), Ok(-33));
        assert_eq!(keyboard_start_offset(25), Ok(-9));
        assert_eq!(
            keyboard_start_offset(76),
            Err(RegisterError::UnsupportedKeyCount(76))
        );
    }

    #[test]
    fn test_keybed_offsets_from_a() {
        let keybed = build_keybed_registers(-48, -36).unwrap();
        let offsets: Vec<(&str, i32)> = keybed
            .iter()
            .map(|k| (k.register.label, k.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("A", 1),
                ("A#", 3),
                ("B", 4),
                ("C", 7),
                ("C#", 9),
                ("D", 10),
                ("D#", 12),
                ("E", 13),
                ("F", 16),
                ("F#", 18),
                ("G", 19),
                ("G#", 21),
            ]
        );
    }

    #[test]
    fn test_keybed_offsets_from_c() {
        let keybed = build_keybed_registers(-9, -6).unwrap();
        let offsets: Vec<i32> = keybed.iter().map(|k| k.offset).collect();
        // C, C#, D
        assert_eq!(offsets, vec![1, 3, 4]);
    }

    #[test]
    fn test_cache_reuses_tables() {
        let cache = RegisterCache::new();
        let first = cache.keybed(61).unwrap();
        let second = cache.keybed(61).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 61);
        assert_eq!(first[0].register.mapping_name(), "C2");

        assert_eq!(
            cache.keybed(12).unwrap_err(),
            RegisterError::UnsupportedKeyCount(12)
        );

        let indexed = cache.indexed();
        assert_eq!(indexed.len(), 212);
        assert!(Arc::ptr_eq(&indexed, &cache.indexed()));
    }

    #[test]
    fn test_find_register() {
        let registers = build_registers(-12, 12).unwrap();
        let found = find_register(&registers, 440.2).unwrap();
        assert_eq!(found.mapping_name(), "A4");
        assert!(find_register(&registers, 450.0).is_none());

        let cache = RegisterCache::new();
        let c5 = cache.find_by_name("C#", 5).unwrap();
        assert!(frequencies_match(c5.frequency, 554.3653));
    }
}
