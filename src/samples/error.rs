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
use crate::audio::AudioError;
use crate::resources::ResourceError;

/// Errors raised while loading or selecting samples.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Failed to decode sample {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: AudioError,
    },

    #[error("Sample {0} has not been loaded")]
    NotLoaded(String),

    #[error("Cannot find samples when the sample library is empty")]
    EmptyLibrary,
}
