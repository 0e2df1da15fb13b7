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

//! The registry of active voices.
//!
//! Voices are keyed by instrument, then by the note's mapping name, then by
//! the note event itself, so two presses of the same key are distinct voices.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::instrument::InstrumentId;
use crate::note::{Note, NoteId};
use crate::voice::Voice;

type NoteVoices = HashMap<NoteId, Voice>;

/// Every voice currently playing or releasing, across all instruments.
#[derive(Default)]
pub struct ActiveVoiceRegistry {
    instruments: Mutex<HashMap<InstrumentId, HashMap<String, NoteVoices>>>,
}

impl ActiveVoiceRegistry {
    pub fn new() -> ActiveVoiceRegistry {
        ActiveVoiceRegistry::default()
    }

    /// Registers a voice under its instrument and note. Replaces (and returns)
    /// any voice already registered for the same note event.
    pub fn insert(&self, voice: Voice) -> Option<Voice> {
        let instrument = voice.instrument();
        let mapping_name = voice.note().mapping_name();
        let note = voice.note().id();
        debug!(%instrument, mapping_name, %note, "Registered voice");

        self.instruments
            .lock()
            .entry(instrument)
            .or_default()
            .entry(mapping_name)
            .or_default()
            .insert(note, voice)
    }

    /// Runs `f` on the voice registered for the note while holding the
    /// registry lock. Returns None if there is no such voice.
    pub fn with_voice<R>(
        &self,
        instrument: InstrumentId,
        note: &Note,
        f: impl FnOnce(&mut Voice) -> R,
    ) -> Option<R> {
        let mut instruments = self.instruments.lock();
        let voice = instruments
            .get_mut(&instrument)?
            .get_mut(&note.mapping_name())?
            .get_mut(&note.id())?;
        Some(f(voice))
    }

    /// Returns a copy of the voice registered for the note.
    pub fn get(&self, instrument: InstrumentId, note: &Note) -> Option<Voice> {
        self.with_voice(instrument, note, |voice| voice.clone())
    }

    pub fn contains(&self, instrument: InstrumentId, note: &Note) -> bool {
        self.with_voice(instrument, note, |_| ()).is_some()
    }

    /// Removes the voice registered for the note, pruning empty entries.
    pub fn remove(&self, instrument: InstrumentId, note: &Note) -> Option<Voice> {
        let mapping_name = note.mapping_name();
        let mut instruments = self.instruments.lock();
        let by_mapping = instruments.get_mut(&instrument)?;
        let voices = by_mapping.get_mut(&mapping_name)?;
        let voice = voices.remove(&note.id())?;

        if voices.is_empty() {
            by_mapping.remove(&mapping_name);
        }
        if by_mapping.is_empty() {
            instruments.remove(&instrument);
        }

        debug!(%instrument, mapping_name, note = %note.id(), "Removed voice");
        Some(voice)
    }

    /// Number of voices registered for one mapping name of an instrument.
    pub fn voices_for(&self, instrument: InstrumentId, mapping_name: &str) -> usize {
        self.instruments
            .lock()
            .get(&instrument)
            .and_then(|by_mapping| by_mapping.get(mapping_name))
            .map_or(0, HashMap::len)
    }

    /// Total number of registered voices.
    pub fn len(&self) -> usize {
        self.instruments
            .lock()
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.lock().is_empty()
    }
}

impl fmt::Debug for ActiveVoiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveVoiceRegistry")
            .field("voices", &self.len())
            .finish()
    }
}
