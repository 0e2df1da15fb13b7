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

/// Errors raised while building or looking up register tables.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Cannot create registers outside of frequency bounds: {start}..{end}")]
    OutOfRange { start: i32, end: i32 },

    #[error("Unsupported keyboard key count: {0}")]
    UnsupportedKeyCount(usize),

    #[error("Unknown input register section: {0}")]
    UnknownSection(String),
}
