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

//! Voices: the playing instances of triggered notes, and their envelopes.

use std::fmt;
use std::time::Duration;

use crate::audio::{Automation, GainHandle, SourceHandle};
use crate::instrument::InstrumentId;
use crate::note::Note;
use crate::samples::Sample;

mod release;

pub use release::{PendingRelease, ReleaseOutcome, ReleaseScheduler};

/// The gain a voice ramps up to.
pub const DEFAULT_VOICE_VOLUME: f32 = 0.5;

/// The attack and release shape applied to every voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Envelope {
    /// Ramp from silence to the voice volume.
    pub attack: Duration,
    /// Ramp from the current gain to silence.
    pub release: Duration,
    /// Extra wait after the release ramp before the voice may be disposed.
    pub settle: Duration,
    /// Target gain of the attack.
    pub volume: f32,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope {
            attack: Duration::from_millis(20),
            release: Duration::from_millis(200),
            settle: Duration::from_millis(2),
            volume: DEFAULT_VOICE_VOLUME,
        }
    }
}

impl Envelope {
    /// The automation that fades a voice in, starting at `now`.
    pub fn attack_automation(&self, now: f64) -> [Automation; 2] {
        [
            Automation::SetValue { value: 0.0, at: now },
            Automation::LinearRamp {
                value: self.volume,
                end_time: now + self.attack.as_secs_f64(),
            },
        ]
    }

    /// The automation that fades a voice out from its `current` gain.
    ///
    /// Anything already scheduled is cancelled and the gain is re-anchored at
    /// `current`, so a release interrupting a ramp doesn't jump.
    pub fn release_automation(&self, current: f32, now: f64) -> [Automation; 3] {
        [
            Automation::CancelScheduled { from: now },
            Automation::SetValue {
                value: current,
                at: now,
            },
            Automation::LinearRamp {
                value: 0.0,
                end_time: now + self.release.as_secs_f64(),
            },
        ]
    }

    /// How long a release waits before it resolves.
    pub fn release_wait(&self) -> Duration {
        self.release + self.settle
    }
}

/// Where a voice is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceState {
    /// Not yet started.
    Idle,
    /// Started; the attack ramp is still running.
    Triggered,
    /// The attack has finished and the voice is holding.
    Sustaining,
    /// Fading out.
    Releasing,
    /// Disconnected from the graph.
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Playing,
    Releasing { since: f64 },
    Disposed,
}

/// Per-kind voice data.
#[derive(Clone, Debug)]
pub enum VoiceKind {
    /// A voice playing back a recorded sample.
    Sample {
        source: SourceHandle,
        sample: Sample,
        playback_rate: f64,
    },
}

/// A playing (or releasing) instance of a triggered note.
#[derive(Clone)]
pub struct Voice {
    instrument: InstrumentId,
    note: Note,
    gain: GainHandle,
    volume: f32,
    started_at: f64,
    attack_end: f64,
    phase: Phase,
    kind: VoiceKind,
}

impl Voice {
    pub(crate) fn new(
        instrument: InstrumentId,
        note: &Note,
        gain: GainHandle,
        envelope: &Envelope,
        started_at: f64,
        kind: VoiceKind,
    ) -> Voice {
        Voice {
            instrument,
            note: note.clone(),
            gain,
            volume: envelope.volume,
            started_at,
            attack_end: started_at + envelope.attack.as_secs_f64(),
            phase: Phase::Playing,
            kind,
        }
    }

    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn gain(&self) -> GainHandle {
        self.gain
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn kind(&self) -> &VoiceKind {
        &self.kind
    }

    pub fn source(&self) -> SourceHandle {
        match &self.kind {
            VoiceKind::Sample { source, .. } => *source,
        }
    }

    pub fn sample(&self) -> &Sample {
        match &self.kind {
            VoiceKind::Sample { sample, .. } => sample,
        }
    }

    pub fn playback_rate(&self) -> f64 {
        match &self.kind {
            VoiceKind::Sample { playback_rate, .. } => *playback_rate,
        }
    }

    /// The lifecycle state at backend time `now`.
    pub fn state_at(&self, now: f64) -> VoiceState {
        match self.phase {
            Phase::Playing if now < self.started_at => VoiceState::Idle,
            Phase::Playing if now < self.attack_end => VoiceState::Triggered,
            Phase::Playing => VoiceState::Sustaining,
            Phase::Releasing { .. } => VoiceState::Releasing,
            Phase::Disposed => VoiceState::Disposed,
        }
    }

    /// When the most recent release began, if releasing.
    pub fn released_at(&self) -> Option<f64> {
        match self.phase {
            Phase::Releasing { since } => Some(since),
            _ => None,
        }
    }

    pub(crate) fn mark_releasing(&mut self, now: f64) {
        self.phase = Phase::Releasing { since: now };
    }

    pub(crate) fn mark_disposed(&mut self) {
        self.phase = Phase::Disposed;
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("instrument", &self.instrument)
            .field("note", &self.note.mapping_name())
            .field("gain", &self.gain.node())
            .field("phase", &self.phase)
            .field("kind", &self.kind)
            .finish()
    }
}
