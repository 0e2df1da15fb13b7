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
use tracing::trace;

use super::{Sample, SampleError, SampleLibrary};
use crate::note::Note;
use crate::pitch::{frequencies_match, FREQUENCY_TOLERANCE};

impl SampleLibrary {
    /// Finds the sample to play for `note`.
    ///
    /// The pitch is rounded down: the highest sample at or below the note
    /// (within tolerance) wins, and notes below every sample use the lowest
    /// one. Among the velocity layers at that pitch, an exact velocity match
    /// wins, then the nearest velocity, with ties going to the earlier layer.
    pub fn find_closest_sample(&self, note: &Note) -> Result<&Sample, SampleError> {
        let lowest = self.samples().first().ok_or(SampleError::EmptyLibrary)?;
        let ceiling = note.frequency() + FREQUENCY_TOLERANCE;

        let closest = self
            .samples()
            .iter()
            .take_while(|sample| sample.note_frequency() <= ceiling)
            .last()
            .unwrap_or(lowest);

        let mut best: Option<(&Sample, u8)> = None;
        for sample in self
            .samples()
            .iter()
            .filter(|sample| frequencies_match(sample.note_frequency(), closest.note_frequency()))
        {
            if sample.note_velocity() == note.velocity() {
                best = Some((sample, 0));
                break;
            }
            let difference = sample.note_velocity().abs_diff(note.velocity());
            if best.is_none_or(|(_, best_difference)| difference < best_difference) {
                best = Some((sample, difference));
            }
        }

        let selected = best.map_or(closest, |(sample, _)| sample);
        trace!(
            note = %note,
            sample = selected.name(),
            "Selected sample"
        );
        Ok(selected)
    }
}
