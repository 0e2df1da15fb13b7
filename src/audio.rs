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

//! The audio backend capability.
//!
//! The engine never renders audio itself. It drives a node graph owned by a
//! backend: gain nodes, buffer source nodes and a destination, with gain
//! automation scheduled against the backend's clock.

use std::fmt;
use std::sync::Arc;

pub mod automation;
pub mod decode;
mod error;
pub mod mock;

pub use automation::AutomationTimeline;
pub use decode::{decode_audio, DecodedAudio};
pub use error::AudioError;

/// Decoded audio shared between a sample and the voices playing it.
pub type DecodedBuffer = Arc<DecodedAudio>;

/// Identifies a node in the backend's graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(id: u64) -> NodeId {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A gain control node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GainHandle(NodeId);

impl GainHandle {
    pub fn new(node: NodeId) -> GainHandle {
        GainHandle(node)
    }

    pub fn node(&self) -> NodeId {
        self.0
    }
}

/// A buffer source node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceHandle(NodeId);

impl SourceHandle {
    pub fn new(node: NodeId) -> SourceHandle {
        SourceHandle(node)
    }

    pub fn node(&self) -> NodeId {
        self.0
    }
}

/// A gain automation command. Times are absolute seconds on the backend clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Automation {
    /// Removes every event scheduled at or after `from`.
    CancelScheduled { from: f64 },
    /// Jumps to `value` at time `at`.
    SetValue { value: f32, at: f64 },
    /// Ramps linearly from the previous event to `value`, arriving at `end_time`.
    LinearRamp { value: f32, end_time: f64 },
}

/// The capabilities the engine needs from an audio output backend.
pub trait AudioBackend: fmt::Debug + Send + Sync {
    /// Monotonic clock in seconds.
    fn current_time(&self) -> f64;

    /// The final output node.
    fn destination(&self) -> NodeId;

    /// Creates a gain node with a gain of 1.0.
    fn create_gain(&self) -> Result<GainHandle, AudioError>;

    /// Creates a source node bound to the given buffer, playing at rate 1.0.
    fn create_source(&self, buffer: DecodedBuffer) -> Result<SourceHandle, AudioError>;

    /// Sets the playback rate of a source. Resampling shifts the pitch.
    fn set_playback_rate(&self, source: SourceHandle, rate: f64) -> Result<(), AudioError>;

    /// Connects the output of `from` to the input of `to`.
    fn connect(&self, from: NodeId, to: NodeId) -> Result<(), AudioError>;

    /// Disconnects every output of the node and releases it. A released node
    /// is unknown to the backend afterwards; the destination is never released.
    fn disconnect(&self, node: NodeId) -> Result<(), AudioError>;

    /// The instantaneous value of the gain at the current time.
    fn gain_value(&self, gain: GainHandle) -> Result<f32, AudioError>;

    /// Applies a batch of automation commands to a gain. The batch is applied
    /// atomically: nothing else can be scheduled on the gain between its commands.
    fn schedule_gain(&self, gain: GainHandle, automation: &[Automation])
        -> Result<(), AudioError>;

    /// Starts playback of a source.
    fn start(&self, source: SourceHandle) -> Result<(), AudioError>;

    /// Decodes raw file bytes into a playable buffer.
    fn decode(&self, bytes: Arc<[u8]>) -> Result<DecodedBuffer, AudioError> {
        Ok(Arc::new(decode_audio(bytes)?))
    }
}
