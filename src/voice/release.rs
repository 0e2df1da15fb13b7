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

//! Release timers.
//!
//! Each releasing note owns at most one timer. Arming a timer for a note that
//! already has one aborts the old timer under the same lock that installs
//! the new one, so two timers for the same note can never both complete.

use std::collections::HashMap;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::instrument::InstrumentId;
use crate::note::NoteId;

type ReleaseKey = (InstrumentId, NoteId);

/// How a release wait ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The wait ran to completion; the voice may be disposed.
    Completed,
    /// Another release (or a disconnect) replaced this one.
    Superseded,
}

struct Timer {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns the pending release timers, keyed by instrument and note.
#[derive(Default)]
pub struct ReleaseScheduler {
    timers: Arc<Mutex<HashMap<ReleaseKey, Timer>>>,
    generation: AtomicU64,
}

impl ReleaseScheduler {
    pub fn new() -> ReleaseScheduler {
        ReleaseScheduler::default()
    }

    /// Arms the release timer for a note, replacing any pending one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self, instrument: InstrumentId, note: NoteId, wait: Duration) -> PendingRelease {
        let key = (instrument, note);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (done, finished) = oneshot::channel();
        let deadline = Instant::now() + wait;

        let mut timers = self.timers.lock();
        let shared = self.timers.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let mut timers = shared.lock();
            if timers
                .get(&key)
                .is_some_and(|timer| timer.generation == generation)
            {
                timers.remove(&key);
                let _ = done.send(());
            }
        });

        if let Some(previous) = timers.insert(key, Timer { generation, task }) {
            previous.task.abort();
            debug!(%instrument, %note, "Replaced pending release");
        }

        PendingRelease { finished }
    }

    /// Cancels the pending release of a note. Returns true if one was pending.
    pub fn cancel(&self, instrument: InstrumentId, note: NoteId) -> bool {
        match self.timers.lock().remove(&(instrument, note)) {
            Some(timer) => {
                timer.task.abort();
                debug!(%instrument, %note, "Cancelled pending release");
                true
            }
            None => false,
        }
    }

    /// Returns true if a release is pending for the note.
    pub fn is_pending(&self, instrument: InstrumentId, note: NoteId) -> bool {
        self.timers.lock().contains_key(&(instrument, note))
    }

    /// Number of pending releases.
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}

impl fmt::Debug for ReleaseScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Resolves when a release wait ends. Dropping it doesn't cancel the timer.
#[derive(Debug)]
pub struct PendingRelease {
    finished: oneshot::Receiver<()>,
}

impl IntoFuture for PendingRelease {
    type Output = ReleaseOutcome;
    type IntoFuture = Pin<Box<dyn Future<Output = ReleaseOutcome> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            match self.finished.await {
                Ok(()) => ReleaseOutcome::Completed,
                Err(_) => ReleaseOutcome::Superseded,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;

    const WAIT: Duration = Duration::from_millis(202);

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(1),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_completes_after_wait() {
        let scheduler = ReleaseScheduler::new();
        let instrument = InstrumentId::next();
        let note = Note::new("A", 440.0, 4);

        let start = Instant::now();
        let pending = scheduler.arm(instrument, note.id(), WAIT);
        assert!(scheduler.is_pending(instrument, note.id()));

        assert_eq!(pending.await, ReleaseOutcome::Completed);
        assert_elapsed(start, WAIT);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_supersedes_previous() {
        let scheduler = ReleaseScheduler::new();
        let instrument = InstrumentId::next();
        let note = Note::new("A", 440.0, 4);

        let start = Instant::now();
        let first = scheduler.arm(instrument, note.id(), WAIT);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = scheduler.arm(instrument, note.id(), WAIT);
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(first.await, ReleaseOutcome::Superseded);
        assert_eq!(second.await, ReleaseOutcome::Completed);
        assert_elapsed(start, Duration::from_millis(50) + WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let scheduler = ReleaseScheduler::new();
        let instrument = InstrumentId::next();
        let note = Note::new("A", 440.0, 4);

        let pending = scheduler.arm(instrument, note.id(), WAIT);
        assert!(scheduler.cancel(instrument, note.id()));
        assert!(!scheduler.cancel(instrument, note.id()));
        assert_eq!(pending.await, ReleaseOutcome::Superseded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notes_are_independent() {
        let scheduler = ReleaseScheduler::new();
        let instrument = InstrumentId::next();
        let a = Note::new("A", 440.0, 4);
        let b = Note::new("A", 440.0, 4);

        let first = scheduler.arm(instrument, a.id(), WAIT);
        let second = scheduler.arm(instrument, b.id(), WAIT);
        assert_eq!(scheduler.pending(), 2);
        assert_eq!(first.await, ReleaseOutcome::Completed);
        assert_eq!(second.await, ReleaseOutcome::Completed);
    }
}
