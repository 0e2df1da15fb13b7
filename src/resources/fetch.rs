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
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Fetcher, ResourceError};

const FILE_SCHEME: &str = "file://";

/// Fetches resources from the local filesystem.
///
/// Identifiers may be plain paths or `file://` URLs. Relative paths are
/// resolved against the fetcher's root.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    pub fn new(root: &Path) -> FileFetcher {
        FileFetcher {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    fn path_for(&self, resource: &str) -> PathBuf {
        let path = Path::new(resource.strip_prefix(FILE_SCHEME).unwrap_or(resource));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Fetcher for FileFetcher {
    fn resolve(&self, resource: &str) -> String {
        format!("{}{}", FILE_SCHEME, self.path_for(resource).display())
    }

    fn fetch(&self, resource: &str) -> Result<Arc<[u8]>, ResourceError> {
        fs::read(self.path_for(resource))
            .map(Arc::from)
            .map_err(|e| ResourceError::Unavailable {
                resource: resource.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Serves resources registered ahead of time. Counts fetches so callers can
/// observe cache behavior.
#[derive(Default)]
pub struct MemoryFetcher {
    resources: Mutex<HashMap<String, Arc<[u8]>>>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> MemoryFetcher {
        MemoryFetcher::default()
    }

    /// Registers the bytes served for `resource`.
    pub fn insert(&self, resource: &str, bytes: Arc<[u8]>) {
        self.resources.lock().insert(resource.to_string(), bytes);
    }

    /// Number of fetches served or attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, resource: &str) -> Result<Arc<[u8]>, ResourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.resources
            .lock()
            .get(resource)
            .cloned()
            .ok_or_else(|| ResourceError::Unavailable {
                resource: resource.to_string(),
                reason: "not found".to_string(),
            })
    }
}

impl fmt::Debug for MemoryFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryFetcher")
            .field("resources", &self.resources.lock().len())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}
