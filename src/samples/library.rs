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
use std::fmt;

use tracing::{debug, error};

use super::Sample;
use crate::registers::{find_register, Register};

/// An instrument's samples, ordered by ascending frequency.
#[derive(Clone, Default)]
pub struct SampleLibrary {
    samples: Vec<Sample>,
}

impl SampleLibrary {
    /// Creates a library. Samples are stably sorted by frequency, so velocity
    /// layers at the same pitch keep their given order.
    pub fn new(mut samples: Vec<Sample>) -> SampleLibrary {
        samples.sort_by(|a, b| a.note_frequency().total_cmp(&b.note_frequency()));
        SampleLibrary { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub(super) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns true if every sample has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.samples.iter().all(Sample::is_loaded)
    }
}

impl fmt::Debug for SampleLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleLibrary")
            .field("samples", &self.samples.len())
            .field(
                "loaded",
                &self.samples.iter().filter(|s| s.is_loaded()).count(),
            )
            .finish()
    }
}

/// Assigns sample files to consecutive registers of `spectrum`, beginning at
/// index `start`. Each entry lists the velocity layers recorded at its pitch.
///
/// Entries whose pitch isn't an input register of `inputs`, or that run past
/// the end of the spectrum, are logged and skipped.
pub fn samples_by_index(
    spectrum: &[Register],
    inputs: &[Register],
    start: usize,
    entries: &[Vec<String>],
) -> Vec<Sample> {
    let mut samples = Vec::new();

    for (i, files) in entries.iter().enumerate() {
        let Some(register) = spectrum.get(start + i) else {
            error!(index = start + i, "Sample entry is past the end of the register table");
            continue;
        };
        let Some(input) = find_register(inputs, register.frequency) else {
            error!(register = %register, "Input register not found");
            continue;
        };

        samples.extend(
            files
                .iter()
                .map(|file| Sample::new(file, input.label, register.frequency)),
        );
    }

    debug!(samples = samples.len(), "Assigned samples by index");
    samples
}

/// Assigns sample files to explicit frequencies.
///
/// Frequencies that aren't an input register of `inputs` are logged and skipped.
pub fn samples_by_frequency(inputs: &[Register], entries: &[(f64, Vec<String>)]) -> Vec<Sample> {
    let mut samples = Vec::new();

    for (frequency, files) in entries {
        let Some(input) = find_register(inputs, *frequency) else {
            error!(frequency, "Input register not found");
            continue;
        };

        samples.extend(
            files
                .iter()
                .map(|file| Sample::new(file, input.label, *frequency)),
        );
    }

    debug!(samples = samples.len(), "Assigned samples by frequency");
    samples
}
