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
use super::NodeId;

/// Error types for audio backend operations
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Unknown audio node {0}")]
    UnknownNode(NodeId),

    #[error("Audio node {0} is not a {1} node")]
    WrongNodeKind(NodeId, &'static str),

    #[error("Audio file error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("No audio track found")]
    NoAudioTrack,

    #[error("Sample rate not specified")]
    MissingSampleRate,
}
