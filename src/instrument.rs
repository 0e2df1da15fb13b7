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

//! Sample-based instruments.
//!
//! An instrument selects a sample for each note, optionally bends it to the
//! note's pitch, and drives the voice through its attack and release.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, span, warn, Instrument as _, Level};

use crate::audio::{AudioBackend, AudioError, GainHandle, SourceHandle};
use crate::controller::ControllerContext;
use crate::note::Note;
use crate::samples::{load_library, LoadSummary, SampleLibrary};
use crate::voice::{PendingRelease, Voice, VoiceKind};

mod correction;
mod error;

pub use correction::{corrected_rate, PitchCorrection};
pub use error::InstrumentError;

/// Global instrument ID counter.
static NEXT_INSTRUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an instrument within the voice registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(u64);

impl InstrumentId {
    /// Allocates a fresh ID.
    pub fn next() -> InstrumentId {
        InstrumentId(NEXT_INSTRUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Load progress of one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadProgress {
    pub instrument: InstrumentId,
    pub name: String,
    /// Percentage of samples finished, with two decimals.
    pub progress: f64,
}

/// A playable, sample-based instrument.
pub struct Instrument {
    id: InstrumentId,
    name: String,
    modes: Vec<String>,
    selected_mode: Option<String>,
    library: SampleLibrary,
    correction: PitchCorrection,
}

impl Instrument {
    /// Creates an instrument over a library of samples.
    pub fn new(name: &str, library: SampleLibrary, correction: PitchCorrection) -> Instrument {
        Instrument {
            id: InstrumentId::next(),
            name: name.to_string(),
            modes: Vec::new(),
            selected_mode: None,
            library,
            correction,
        }
    }

    /// Sets the playing modes the instrument offers. The first becomes selected.
    pub fn with_modes(mut self, modes: Vec<String>) -> Instrument {
        self.selected_mode = modes.first().cloned();
        self.modes = modes;
        self
    }

    pub fn id(&self) -> InstrumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modes(&self) -> &[String] {
        &self.modes
    }

    pub fn selected_mode(&self) -> Option<&str> {
        self.selected_mode.as_deref()
    }

    /// Selects one of the instrument's modes. Returns false for an unknown mode.
    pub fn select_mode(&mut self, mode: &str) -> bool {
        if !self.modes.iter().any(|m| m == mode) {
            return false;
        }
        self.selected_mode = Some(mode.to_string());
        true
    }

    pub fn library(&self) -> &SampleLibrary {
        &self.library
    }

    pub fn correction(&self) -> PitchCorrection {
        self.correction
    }

    /// Loads every sample concurrently. Failed samples are logged and left
    /// unloaded.
    pub async fn load<F>(&mut self, context: &ControllerContext, mut on_progress: F) -> LoadSummary
    where
        F: FnMut(LoadProgress),
    {
        let span = span!(Level::INFO, "load instrument", instrument = %self.name);
        let id = self.id;
        let name = self.name.clone();
        let library = &mut self.library;

        async move {
            info!(samples = library.len(), "Loading instrument");
            load_library(library, context.resources(), context.backend(), |progress| {
                on_progress(LoadProgress {
                    instrument: id,
                    name: name.clone(),
                    progress,
                })
            })
            .await
        }
        .instrument(span)
        .await
    }

    /// Starts a voice for `note` and returns it. The caller registers the
    /// voice with the context's registry.
    ///
    /// On error nothing is left connected to the graph.
    pub fn play_note(
        &self,
        context: &ControllerContext,
        note: &Note,
    ) -> Result<Voice, InstrumentError> {
        let sample = self.library.find_closest_sample(note)?;
        let buffer = sample.buffer()?;
        let playback_rate = self.correction.playback_rate(sample, note);

        let backend = context.backend().as_ref();
        let gain = backend.create_gain()?;
        let source = match backend.create_source(buffer) {
            Ok(source) => source,
            Err(e) => {
                dispose(backend, gain, None);
                return Err(e.into());
            }
        };

        let now = backend.current_time();
        let envelope = context.envelope();
        let started = backend
            .set_playback_rate(source, playback_rate)
            .and_then(|_| backend.connect(source.node(), gain.node()))
            .and_then(|_| backend.connect(gain.node(), context.master().node()))
            .and_then(|_| backend.schedule_gain(gain, &envelope.attack_automation(now)))
            .and_then(|_| backend.start(source));
        if let Err(e) = started {
            dispose(backend, gain, Some(source));
            return Err(e.into());
        }

        debug!(
            instrument = %self.name,
            note = %note,
            velocity = note.velocity(),
            sample = sample.name(),
            playback_rate,
            "Playing note"
        );

        Ok(Voice::new(
            self.id,
            note,
            gain,
            envelope,
            now,
            VoiceKind::Sample {
                source,
                sample: sample.clone(),
                playback_rate,
            },
        ))
    }

    /// Fades the note's voice out. The returned release resolves once the
    /// fade has finished, or as superseded if the note is released again (or
    /// disconnected) first.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn end_note(
        &self,
        context: &ControllerContext,
        note: &Note,
    ) -> Result<PendingRelease, InstrumentError> {
        let backend = context.backend().as_ref();
        let envelope = context.envelope();

        // The registry lock is held while the gain is sampled and rescheduled,
        // so no other release of this voice can interleave.
        context
            .registry()
            .with_voice(self.id, note, |voice| -> Result<(), AudioError> {
                let now = backend.current_time();
                let current = backend.gain_value(voice.gain())?;
                backend.schedule_gain(voice.gain(), &envelope.release_automation(current, now))?;
                voice.mark_releasing(now);
                debug!(instrument = %self.name, note = %note, gain = current, "Releasing note");
                Ok(())
            })
            .ok_or_else(|| self.voice_not_found(note))??;

        Ok(context
            .releases()
            .arm(self.id, note.id(), envelope.release_wait()))
    }

    /// Disconnects the note's voice from the graph and cancels any pending
    /// release. The caller removes the voice from the registry.
    pub fn disconnect_note(
        &self,
        context: &ControllerContext,
        note: &Note,
    ) -> Result<(), InstrumentError> {
        let backend = context.backend().as_ref();

        context
            .registry()
            .with_voice(self.id, note, |voice| -> Result<(), AudioError> {
                // Both nodes are released even if the first one fails.
                let source = backend.disconnect(voice.source().node());
                let gain = backend.disconnect(voice.gain().node());
                voice.mark_disposed();
                source.and(gain)
            })
            .ok_or_else(|| self.voice_not_found(note))??;

        context.releases().cancel(self.id, note.id());
        debug!(instrument = %self.name, note = %note, "Disconnected note");
        Ok(())
    }

    fn voice_not_found(&self, note: &Note) -> InstrumentError {
        InstrumentError::VoiceNotFound {
            instrument: self.id,
            mapping_name: note.mapping_name(),
        }
    }
}

/// Disconnects the nodes of a voice that failed to start.
fn dispose(backend: &dyn AudioBackend, gain: GainHandle, source: Option<SourceHandle>) {
    let nodes = source.map(|s| s.node()).into_iter().chain([gain.node()]);
    for node in nodes {
        if let Err(e) = backend.disconnect(node) {
            warn!(%node, err = %e, "Failed to disconnect node");
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("selected_mode", &self.selected_mode)
            .field("correction", &self.correction)
            .field("library", &self.library)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::resources::{MemoryFetcher, ResourceLoader};
    use crate::samples::{Sample, SampleError};
    use crate::testutil::{sine, wav_bytes};
    use crate::voice::{Envelope, ReleaseOutcome, VoiceState};

    fn context() -> (ControllerContext, Arc<MockBackend>) {
        let fetcher = Arc::new(MemoryFetcher::new());
        for name in ["A3v7.wav", "A4v3.wav", "A4v9.wav", "A5v7.wav"] {
            fetcher.insert(name, wav_bytes(&[sine(440.0, 44100, 256)], 44100));
        }
        let backend = Arc::new(MockBackend::new("test"));
        let context = ControllerContext::new(
            backend.clone(),
            ResourceLoader::new(fetcher, None),
            Envelope::default(),
            1.0,
        )
        .unwrap();
        (context, backend)
    }

    fn library() -> SampleLibrary {
        SampleLibrary::new(vec![
            Sample::new("A3v7.wav", "A", 220.0),
            Sample::new("A4v3.wav", "A", 440.0),
            Sample::new("A4v9.wav", "A", 440.0),
            Sample::new("A5v7.wav", "A", 880.0),
        ])
    }

    async fn loaded(context: &ControllerContext, correction: PitchCorrection) -> Instrument {
        let mut instrument = Instrument::new("piano", library(), correction);
        instrument.load(context, |_| {}).await;
        instrument
    }

    #[tokio::test]
    async fn test_load_reports_progress_per_instrument() {
        let (context, _) = context();
        let mut instrument = Instrument::new("piano", library(), PitchCorrection::Off);

        let mut updates = Vec::new();
        let summary = instrument.load(&context, |p| updates.push(p)).await;

        assert_eq!(summary.loaded, 4);
        assert_eq!(updates.len(), 5);
        assert!(updates.iter().all(|u| u.instrument == instrument.id() && u.name == "piano"));
        assert_eq!(updates.last().unwrap().progress, 100.0);
        assert!(instrument.library().is_loaded());
    }

    #[test]
    fn test_modes() {
        let mut instrument = Instrument::new("piano", library(), PitchCorrection::Off)
            .with_modes(vec!["sustain".to_string(), "staccato".to_string()]);
        assert_eq!(instrument.selected_mode(), Some("sustain"));
        assert!(instrument.select_mode("staccato"));
        assert!(!instrument.select_mode("pizzicato"));
        assert_eq!(instrument.selected_mode(), Some("staccato"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_note_wires_the_voice() {
        let (context, backend) = context();
        let instrument = loaded(&context, PitchCorrection::Off).await;
        let note = Note::new("A", 450.0, 4).with_velocity(7);

        let voice = instrument.play_note(&context, &note).unwrap();
        assert_eq!(voice.sample().name(), "A4v9.wav");
        assert_eq!(voice.playback_rate(), 1.0);
        assert!(backend.is_connected(voice.source().node(), voice.gain().node()));
        assert!(backend.is_connected(voice.gain().node(), context.master().node()));
        assert!(backend.is_started(voice.source()));

        let now = backend.current_time();
        assert_eq!(voice.state_at(now), VoiceState::Triggered);
        assert_eq!(backend.gain_value(voice.gain()).unwrap(), 0.0);

        tokio::time::advance(Duration::from_millis(10)).await;
        assert!((backend.gain_value(voice.gain()).unwrap() - 0.25).abs() < 1e-3);
        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(backend.gain_value(voice.gain()).unwrap(), 0.5);
        assert_eq!(voice.state_at(backend.current_time()), VoiceState::Sustaining);
    }

    #[tokio::test]
    async fn test_pitch_corrected_rate() {
        let (context, backend) = context();
        let instrument = loaded(&context, PitchCorrection::Corrected).await;
        let note = Note::new("B", 493.883301256124, 4).with_velocity(9);

        let voice = instrument.play_note(&context, &note).unwrap();
        assert_eq!(voice.sample().name(), "A4v9.wav");
        let expected = 2f64.powf(2.0 / 12.0);
        assert!((voice.playback_rate() - expected).abs() < 1e-6);
        assert!((backend.playback_rate(voice.source()).unwrap() - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unloaded_library_leaves_nothing_connected() {
        let (context, backend) = context();
        let instrument = Instrument::new("piano", library(), PitchCorrection::Off);

        let result = instrument.play_note(&context, &Note::new("A", 440.0, 4));
        assert!(matches!(
            result,
            Err(InstrumentError::Sample(SampleError::NotLoaded(_)))
        ));
        assert_eq!(backend.connected_source_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_library() {
        let (context, _) = context();
        let instrument = Instrument::new("empty", SampleLibrary::default(), PitchCorrection::Off);
        assert!(matches!(
            instrument.play_note(&context, &Note::new("A", 440.0, 4)),
            Err(InstrumentError::Sample(SampleError::EmptyLibrary))
        ));
    }

    #[tokio::test]
    async fn test_unregistered_voice_is_not_found() {
        let (context, _) = context();
        let instrument = loaded(&context, PitchCorrection::Off).await;
        let note = Note::new("A", 440.0, 4);

        instrument.play_note(&context, &note).unwrap();
        assert!(matches!(
            instrument.end_note(&context, &note),
            Err(InstrumentError::VoiceNotFound { mapping_name, .. }) if mapping_name == "A4"
        ));
        assert!(matches!(
            instrument.disconnect_note(&context, &note),
            Err(InstrumentError::VoiceNotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_then_disconnect() {
        let (context, backend) = context();
        let instrument = loaded(&context, PitchCorrection::Off).await;
        let note = Note::new("A", 440.0, 4);
        let baseline = backend.node_count();

        let voice = instrument.play_note(&context, &note).unwrap();
        let (gain, source) = (voice.gain(), voice.source());
        assert_eq!(backend.node_count(), baseline + 2);
        context.registry().insert(voice);
        tokio::time::advance(Duration::from_millis(100)).await;

        let release = instrument.end_note(&context, &note).unwrap();
        let released = context.registry().get(instrument.id(), &note).unwrap();
        assert_eq!(released.state_at(backend.current_time()), VoiceState::Releasing);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert!((backend.gain_value(gain).unwrap() - 0.25).abs() < 1e-3);

        assert_eq!(release.await, ReleaseOutcome::Completed);
        assert_eq!(backend.gain_value(gain).unwrap(), 0.0);

        instrument.disconnect_note(&context, &note).unwrap();
        assert!(!backend.has_outputs(source.node()));
        assert!(!backend.has_outputs(gain.node()));
        assert_eq!(backend.node_count(), baseline);
        let disposed = context.registry().get(instrument.id(), &note).unwrap();
        assert_eq!(disposed.state_at(backend.current_time()), VoiceState::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_supersedes_pending_release() {
        let (context, _) = context();
        let instrument = loaded(&context, PitchCorrection::Off).await;
        let note = Note::new("A", 440.0, 4);

        context
            .registry()
            .insert(instrument.play_note(&context, &note).unwrap());
        let release = instrument.end_note(&context, &note).unwrap();
        instrument.disconnect_note(&context, &note).unwrap();

        assert_eq!(release.await, ReleaseOutcome::Superseded);
        assert_eq!(context.releases().pending(), 0);
    }
}
