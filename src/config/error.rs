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
use std::io;

use crate::audio::AudioError;
use crate::registers::RegisterError;

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from parse errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration: {0}")]
    Duration(#[from] duration_string::Error),

    #[error(transparent)]
    Registers(#[from] RegisterError),

    #[error("Unable to open the sample cache: {0}")]
    Cache(#[from] io::Error),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("Input section {0} needs either a keybed or a register range")]
    InvalidInputSection(String),

    #[error("Instrument {0} has no samples")]
    NoSamples(String),
}
