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

//! Concurrent loading of a sample library.
//!
//! Every sample is fetched and decoded on the blocking pool. Failures are
//! logged and leave the sample unloaded; the rest of the batch carries on.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::sample::fetch_and_decode;
use super::SampleLibrary;
use crate::audio::AudioBackend;
use crate::resources::ResourceLoader;

/// The outcome of loading a library.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Samples loaded by this call.
    pub loaded: usize,
    /// Samples that were already loaded.
    pub skipped: usize,
    /// Samples that failed to load.
    pub failed: usize,
}

/// Rounds a completion ratio to a percentage with two decimals.
fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (completed as f64 / total as f64 * 10000.0).round() / 100.0
}

/// Loads every sample of `library`, calling `on_progress` with the completed
/// percentage after each sample finishes and with 100 once all have.
pub async fn load_library<F>(
    library: &mut SampleLibrary,
    resources: &ResourceLoader,
    backend: &Arc<dyn AudioBackend>,
    mut on_progress: F,
) -> LoadSummary
where
    F: FnMut(f64),
{
    let total = library.len();
    let mut summary = LoadSummary::default();
    let mut tasks = JoinSet::new();

    for (index, sample) in library.samples().iter().enumerate() {
        if sample.is_loaded() {
            summary.skipped += 1;
            continue;
        }

        let resource = sample.resource().to_string();
        let resources = resources.clone();
        let backend = backend.clone();
        tasks.spawn_blocking(move || {
            let result = fetch_and_decode(&resource, &resources, backend.as_ref());
            (index, resource, result)
        });
    }

    let mut completed = summary.skipped;
    while let Some(joined) = tasks.join_next().await {
        completed += 1;
        match joined {
            Ok((index, _, Ok((raw, buffer)))) => {
                library.samples_mut()[index].set_loaded(raw, buffer);
                summary.loaded += 1;
            }
            Ok((_, resource, Err(e))) => {
                warn!(resource, err = %e, "Failed to load sample");
                summary.failed += 1;
            }
            Err(e) => {
                error!(err = %e, "Sample load task failed");
                summary.failed += 1;
            }
        }
        on_progress(percent(completed, total));
    }
    on_progress(100.0);

    info!(
        loaded = summary.loaded,
        skipped = summary.skipped,
        failed = summary.failed,
        "Finished loading samples"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockBackend;
    use crate::resources::MemoryFetcher;
    use crate::samples::Sample;
    use crate::testutil::{sine, wav_bytes};

    fn fixture() -> (ResourceLoader, Arc<MemoryFetcher>, Arc<dyn AudioBackend>) {
        let fetcher = Arc::new(MemoryFetcher::new());
        for name in ["A3v7.wav", "A4v7.wav", "A5v7.wav"] {
            fetcher.insert(name, wav_bytes(&[sine(440.0, 44100, 128)], 44100));
        }
        let resources = ResourceLoader::new(fetcher.clone(), None);
        (resources, fetcher, Arc::new(MockBackend::new("test")))
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(2, 3), 66.67);
        assert_eq!(percent(3, 3), 100.0);
        assert_eq!(percent(0, 0), 100.0);
    }

    #[tokio::test]
    async fn test_load_library_reports_progress() {
        let (resources, _, backend) = fixture();
        let mut library = SampleLibrary::new(vec![
            Sample::new("A3v7.wav", "A", 220.0),
            Sample::new("A4v7.wav", "A", 440.0),
            Sample::new("A5v7.wav", "A", 880.0),
        ]);

        let mut progress = Vec::new();
        let summary = load_library(&mut library, &resources, &backend, |p| progress.push(p)).await;

        assert_eq!(
            summary,
            LoadSummary {
                loaded: 3,
                skipped: 0,
                failed: 0
            }
        );
        assert!(library.is_loaded());
        assert_eq!(progress, vec![33.33, 66.67, 100.0, 100.0]);
    }

    #[tokio::test]
    async fn test_load_library_skips_failures() {
        let (resources, _, backend) = fixture();
        let mut library = SampleLibrary::new(vec![
            Sample::new("A4v7.wav", "A", 440.0),
            Sample::new("missing.wav", "A", 880.0),
        ]);

        let summary = load_library(&mut library, &resources, &backend, |_| {}).await;
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.failed, 1);
        assert!(library.samples()[0].is_loaded());
        assert!(!library.samples()[1].is_loaded());
    }

    #[tokio::test]
    async fn test_reload_is_a_no_op() {
        let (resources, fetcher, backend) = fixture();
        let mut library = SampleLibrary::new(vec![Sample::new("A4v7.wav", "A", 440.0)]);

        load_library(&mut library, &resources, &backend, |_| {}).await;
        let summary = load_library(&mut library, &resources, &backend, |_| {}).await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.loaded, 0);
        assert_eq!(fetcher.fetch_count(), 1);
    }
}
