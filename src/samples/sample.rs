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
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::SampleError;
use crate::audio::{AudioBackend, DecodedBuffer};
use crate::resources::{Origin, ResourceLoader};

/// Velocity assumed for samples whose name doesn't encode one.
pub const DEFAULT_SAMPLE_VELOCITY: u8 = 7;

/// One recorded sample of an instrument at a known pitch and velocity.
#[derive(Clone)]
pub struct Sample {
    /// Where the sample's bytes come from.
    resource: String,
    /// The file name, e.g. "C4v3.wav".
    name: String,
    /// The note label of the input register this sample is assigned to.
    note_label: String,
    /// The recorded fundamental frequency.
    note_frequency: f64,
    /// The recorded velocity layer.
    note_velocity: u8,
    /// Base playback speed; pitch correction multiplies into this.
    playback_speed: f64,
    /// Raw file bytes.
    raw: Option<Arc<[u8]>>,
    /// Decoded audio, ready for playback.
    buffer: Option<DecodedBuffer>,
}

impl Sample {
    /// Creates a sample descriptor. The name defaults to the last path
    /// segment of the resource, and the velocity is parsed from it.
    pub fn new(resource: &str, note_label: &str, note_frequency: f64) -> Sample {
        let name = resource.rsplit('/').next().unwrap_or(resource).to_string();
        let note_velocity = parse_velocity(&name).unwrap_or(DEFAULT_SAMPLE_VELOCITY);

        Sample {
            resource: resource.to_string(),
            name,
            note_label: note_label.to_string(),
            note_frequency,
            note_velocity,
            playback_speed: 1.0,
            raw: None,
            buffer: None,
        }
    }

    pub fn with_playback_speed(mut self, playback_speed: f64) -> Sample {
        self.playback_speed = playback_speed;
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn note_label(&self) -> &str {
        &self.note_label
    }

    pub fn note_frequency(&self) -> f64 {
        self.note_frequency
    }

    pub fn note_velocity(&self) -> u8 {
        self.note_velocity
    }

    pub fn playback_speed(&self) -> f64 {
        self.playback_speed
    }

    pub fn raw_bytes(&self) -> Option<&Arc<[u8]>> {
        self.raw.as_ref()
    }

    /// The decoded buffer, or [`SampleError::NotLoaded`].
    pub fn buffer(&self) -> Result<DecodedBuffer, SampleError> {
        self.buffer
            .clone()
            .ok_or_else(|| SampleError::NotLoaded(self.resource.clone()))
    }

    pub fn is_loaded(&self) -> bool {
        self.raw.is_some() && self.buffer.is_some()
    }

    /// Loads the sample's bytes and decodes them. Does nothing if already loaded.
    pub fn load(
        &mut self,
        resources: &ResourceLoader,
        backend: &dyn AudioBackend,
    ) -> Result<(), SampleError> {
        if self.is_loaded() {
            debug!(sample = self.name, "Skipped load");
            return Ok(());
        }

        let (raw, buffer) = fetch_and_decode(&self.resource, resources, backend)?;
        self.set_loaded(raw, buffer);
        Ok(())
    }

    pub(super) fn set_loaded(&mut self, raw: Arc<[u8]>, buffer: DecodedBuffer) {
        self.raw = Some(raw);
        self.buffer = Some(buffer);
    }
}

/// Fetches (or reads from cache) and decodes the bytes of a resource.
///
/// Cached bytes that fail to decode are evicted and fetched once more.
pub(super) fn fetch_and_decode(
    resource: &str,
    resources: &ResourceLoader,
    backend: &dyn AudioBackend,
) -> Result<(Arc<[u8]>, DecodedBuffer), SampleError> {
    let decode = |raw: &Arc<[u8]>| {
        backend
            .decode(raw.clone())
            .map_err(|source| SampleError::Decode {
                resource: resource.to_string(),
                source,
            })
    };

    let (mut raw, origin) = resources.load(resource)?;
    let buffer = match decode(&raw) {
        Ok(buffer) => buffer,
        Err(e) if origin == Origin::Cache => {
            warn!(resource, error = %e, "Evicting undecodable cache entry");
            resources.evict(resource)?;
            (raw, _) = resources.load(resource)?;
            decode(&raw)?
        }
        Err(e) => return Err(e),
    };

    info!(
        resource,
        channels = buffer.channel_count(),
        sample_rate = buffer.sample_rate(),
        duration_ms = buffer.duration().as_millis(),
        memory_kb = buffer.memory_size() / 1024,
        "Sample loaded"
    );
    Ok((raw, buffer))
}

/// Parses the velocity layer out of a sample name such as "C4v3.wav": the
/// digits after the last 'v' of the name, extension excluded.
pub fn parse_velocity(name: &str) -> Option<u8> {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let (_, velocity) = stem.rsplit_once('v')?;
    velocity.parse().ok()
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sample")
            .field("resource", &self.resource)
            .field("note_frequency", &self.note_frequency)
            .field("note_velocity", &self.note_velocity)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::resources::{ByteCache, DirectoryCache, MemoryFetcher};
    use crate::testutil::wav_bytes;

    #[test]
    fn test_parse_velocity() {
        assert_eq!(parse_velocity("C4v3.wav"), Some(3));
        assert_eq!(parse_velocity("C4v12.flac"), Some(12));
        assert_eq!(parse_velocity("violin_C4v9.wav"), Some(9));
        assert_eq!(parse_velocity("C4v9"), Some(9));
        assert_eq!(parse_velocity("C4.wav"), None);
        assert_eq!(parse_velocity("C4vloud.wav"), None);
    }

    #[test]
    fn test_new_sample_defaults() {
        let sample = Sample::new("https://cdn/piano/A4.wav", "A", 440.0);
        assert_eq!(sample.name(), "A4.wav");
        assert_eq!(sample.note_velocity(), DEFAULT_SAMPLE_VELOCITY);
        assert_eq!(sample.playback_speed(), 1.0);
        assert!(!sample.is_loaded());
        assert!(matches!(sample.buffer(), Err(SampleError::NotLoaded(_))));

        let layered = Sample::new("piano/A4v11.wav", "A", 440.0);
        assert_eq!(layered.note_velocity(), 11);
    }

    #[test]
    fn test_load_is_idempotent() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert("A4v7.wav", wav_bytes(&[vec![0.1, 0.2]], 44100));
        let resources = ResourceLoader::new(fetcher.clone(), None);
        let backend = MockBackend::new("test");

        let mut sample = Sample::new("A4v7.wav", "A", 440.0);
        sample.load(&resources, &backend).unwrap();
        assert!(sample.is_loaded());
        assert_eq!(sample.buffer().unwrap().frames(), 2);

        sample.load(&resources, &backend).unwrap();
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn test_load_reports_undecodable_bytes() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert("bad.wav", Arc::from(&b"nope"[..]));
        let resources = ResourceLoader::new(fetcher, None);

        let mut sample = Sample::new("bad.wav", "A", 440.0);
        assert!(matches!(
            sample.load(&resources, &MockBackend::new("test")),
            Err(SampleError::Decode { .. })
        ));
        assert!(!sample.is_loaded());
    }

    #[test]
    fn test_truncated_cache_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(DirectoryCache::open(dir.path()).unwrap());
        let wav = wav_bytes(&[vec![0.1, 0.2, 0.3]], 44100);
        cache.put("A4v7.wav", Arc::from(&wav[..20])).unwrap();

        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert("A4v7.wav", wav.clone());
        let resources = ResourceLoader::new(fetcher.clone(), Some(cache.clone()));
        let backend = MockBackend::new("test");

        let mut sample = Sample::new("A4v7.wav", "A", 440.0);
        sample.load(&resources, &backend).unwrap();
        assert_eq!(sample.buffer().unwrap().frames(), 3);
        assert_eq!(fetcher.fetch_count(), 1);

        // The cache now holds the good bytes.
        assert_eq!(&*cache.get("A4v7.wav").unwrap().unwrap(), &*wav);
        let mut again = Sample::new("A4v7.wav", "A", 440.0);
        again.load(&resources, &backend).unwrap();
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn test_undecodable_source_is_fetched_once() {
        let fetcher = Arc::new(MemoryFetcher::new());
        fetcher.insert("bad.wav", Arc::from(&b"nope"[..]));
        let resources = ResourceLoader::new(fetcher.clone(), None);

        let mut sample = Sample::new("bad.wav", "A", 440.0);
        assert!(sample.load(&resources, &MockBackend::new("test")).is_err());
        assert_eq!(fetcher.fetch_count(), 1);
    }
}
