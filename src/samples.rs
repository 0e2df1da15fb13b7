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

//! Instrument samples: descriptors, the per-instrument library, selection
//! of the sample for a note, and concurrent loading.

mod error;
mod library;
mod loader;
mod sample;
mod selector;

pub use error::SampleError;
pub use library::{samples_by_frequency, samples_by_index, SampleLibrary};
pub use loader::{load_library, LoadSummary};
pub use sample::{parse_velocity, Sample, DEFAULT_SAMPLE_VELOCITY};
