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
use serde::Deserialize;

use crate::note::Note;
use crate::pitch::{frequency_ratio, midi_value};
use crate::samples::Sample;

/// How an instrument bends a sample to the requested pitch.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PitchCorrection {
    /// Samples play at their base speed.
    #[default]
    Off,
    /// Samples are resampled to the requested pitch, microtones included.
    Corrected,
}

impl PitchCorrection {
    /// The playback rate for `sample` when playing `note`.
    pub fn playback_rate(&self, sample: &Sample, note: &Note) -> f64 {
        match self {
            PitchCorrection::Off => sample.playback_speed(),
            PitchCorrection::Corrected => {
                corrected_rate(note.frequency(), sample.note_frequency()) * sample.playback_speed()
            }
        }
    }
}

/// The resampling ratio that moves a recording at `sample_frequency` to
/// `note_frequency`.
///
/// The note's deviation from the nearest equal-tempered step is added on top
/// of the semitone distance, so microtonal offsets count twice.
pub fn corrected_rate(note_frequency: f64, sample_frequency: f64) -> f64 {
    let note_midi = midi_value(note_frequency);
    let cents = note_midi - note_midi.round();
    let interval = (note_midi - midi_value(sample_frequency)) + cents;
    frequency_ratio(interval)
}
