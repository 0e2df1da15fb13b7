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

//! Performance events.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::pitch::{midi_value, A4_MIDI_VALUE, MAX_REGISTER_DISTANCE, MIN_REGISTER_DISTANCE};
use crate::registers::Register;

/// Global note ID counter.
static NEXT_NOTE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one performance event, independent of its pitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a note was entered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriggerMethod {
    #[default]
    Pointer,
    ProtocolInput,
    GlyphEntry,
}

/// A requested pitch with a velocity.
///
/// Two notes are equal only if they are the same event: retriggering the
/// same key produces a new note with a new ID.
#[derive(Clone, Debug)]
pub struct Note {
    id: NoteId,
    name: String,
    frequency: f64,
    octave: i32,
    velocity: u8,
    trigger_method: TriggerMethod,
}

impl Note {
    /// Creates a new note with zero velocity.
    pub fn new(name: &str, frequency: f64, octave: i32) -> Note {
        Note {
            id: NoteId(NEXT_NOTE_ID.fetch_add(1, Ordering::SeqCst)),
            name: name.to_string(),
            frequency,
            octave,
            velocity: 0,
            trigger_method: TriggerMethod::default(),
        }
    }

    /// Creates a note at the pitch of the given register.
    pub fn from_register(register: &Register) -> Note {
        Note::new(register.label, register.frequency, register.octave)
    }

    /// Sets the velocity, clamped to the 0-127 domain.
    pub fn with_velocity(mut self, velocity: u8) -> Note {
        self.velocity = velocity.min(127);
        self
    }

    pub fn with_trigger_method(mut self, trigger_method: TriggerMethod) -> Note {
        self.trigger_method = trigger_method;
        self
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn trigger_method(&self) -> TriggerMethod {
        self.trigger_method
    }

    /// The name and octave, e.g. "A4". Identifies a pitch-class slot
    /// regardless of fine tuning.
    pub fn mapping_name(&self) -> String {
        format!("{}{}", self.name, self.octave)
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.4} Hz, velocity {})",
            self.mapping_name(),
            self.frequency,
            self.velocity
        )
    }
}

/// A note typed as text could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid note {0:?}: expected e.g. A4, C#5 or 450hz, optionally followed by @velocity")]
pub struct ParseNoteError(String);

/// Parses typed notes: a label and octave ("A4", "C#5") or a raw frequency
/// ("450hz"), optionally followed by "@velocity". A raw frequency is named
/// after its nearest equal-tempered register.
impl FromStr for Note {
    type Err = ParseNoteError;

    fn from_str(text: &str) -> Result<Note, ParseNoteError> {
        let invalid = || ParseNoteError(text.to_string());

        let (pitch, velocity) = match text.split_once('@') {
            Some((pitch, velocity)) => (pitch, velocity.parse::<u8>().map_err(|_| invalid())?),
            None => (text, 0),
        };

        let note = match pitch.to_ascii_lowercase().strip_suffix("hz") {
            Some(frequency) => {
                let frequency: f64 = frequency.trim().parse().map_err(|_| invalid())?;
                if !frequency.is_finite() || frequency <= 0.0 {
                    return Err(invalid());
                }
                let distance = (midi_value(frequency) - A4_MIDI_VALUE).round() as i32;
                let nearest = Register::at_distance(distance);
                Note::new(nearest.label, frequency, nearest.octave)
            }
            None => {
                let split = pitch
                    .find(|c: char| c.is_ascii_digit() || c == '-')
                    .ok_or_else(invalid)?;
                let (label, octave) = pitch.split_at(split);
                let label = label.to_ascii_uppercase();
                let octave: i32 = octave.parse().map_err(|_| invalid())?;
                let register = (MIN_REGISTER_DISTANCE..=MAX_REGISTER_DISTANCE)
                    .map(Register::at_distance)
                    .find(|register| register.label == label && register.octave == octave)
                    .ok_or_else(invalid)?;
                Note::from_register(&register)
            }
        };

        Ok(note
            .with_velocity(velocity)
            .with_trigger_method(TriggerMethod::GlyphEntry))
    }
}
