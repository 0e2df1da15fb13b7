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
use std::fmt::{self, Write as _};
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

use super::ByteCache;

/// Keeps resource bytes in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ByteCache for MemoryCache {
    fn get(&self, resource: &str) -> io::Result<Option<Arc<[u8]>>> {
        Ok(self.entries.lock().get(resource).cloned())
    }

    fn put(&self, resource: &str, bytes: Arc<[u8]>) -> io::Result<()> {
        self.entries.lock().insert(resource.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, resource: &str) -> io::Result<()> {
        self.entries.lock().remove(resource);
        Ok(())
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

/// Persists resource bytes across sessions, one file per resource.
///
/// File names are the hex-encoded resource identifier, so distinct
/// identifiers never collide. Entries are written to a temporary file in the
/// same directory and renamed into place, so a reader never sees a partial
/// entry.
#[derive(Debug)]
pub struct DirectoryCache {
    dir: PathBuf,
}

impl DirectoryCache {
    /// Opens (and creates, if needed) a cache rooted at `dir`.
    pub fn open(dir: &Path) -> io::Result<DirectoryCache> {
        fs::create_dir_all(dir)?;
        debug!(dir = ?dir, "Opened byte cache");
        Ok(DirectoryCache {
            dir: dir.to_path_buf(),
        })
    }

    fn entry_path(&self, resource: &str) -> PathBuf {
        let mut name = String::with_capacity(resource.len() * 2 + 4);
        for byte in resource.as_bytes() {
            let _ = write!(name, "{:02x}", byte);
        }
        name.push_str(".bin");
        self.dir.join(name)
    }
}

impl ByteCache for DirectoryCache {
    fn get(&self, resource: &str) -> io::Result<Option<Arc<[u8]>>> {
        match fs::read(self.entry_path(resource)) {
            Ok(bytes) => Ok(Some(bytes.into())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn put(&self, resource: &str, bytes: Arc<[u8]>) -> io::Result<()> {
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(self.entry_path(resource))?;
        Ok(())
    }

    fn remove(&self, resource: &str) -> io::Result<()> {
        match fs::remove_file(self.entry_path(resource)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        assert!(cache.get("file:///a.wav").unwrap().is_none());

        cache.put("file:///a.wav", Arc::from(&[1u8, 2, 3][..])).unwrap();
        assert_eq!(&*cache.get("file:///a.wav").unwrap().unwrap(), &[1, 2, 3]);
        assert_eq!(cache.len(), 1);

        cache.remove("file:///a.wav").unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_directory_cache_persists() {
        let dir = tempfile::tempdir().unwrap();
        let resource = "file:///samples/piano/C4v7.wav";

        {
            let cache = DirectoryCache::open(dir.path()).unwrap();
            assert!(cache.get(resource).unwrap().is_none());
            cache.put(resource, Arc::from(&[9u8, 8, 7][..])).unwrap();
        }

        let reopened = DirectoryCache::open(dir.path()).unwrap();
        assert_eq!(&*reopened.get(resource).unwrap().unwrap(), &[9, 8, 7]);
        assert!(reopened.get("file:///samples/other.wav").unwrap().is_none());
    }

    #[test]
    fn test_directory_cache_replaces_whole_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryCache::open(dir.path()).unwrap();
        let resource = "file:///samples/piano/C4v7.wav";

        cache.put(resource, Arc::from(&[1u8; 64][..])).unwrap();
        cache.put(resource, Arc::from(&[2u8, 3][..])).unwrap();
        assert_eq!(&*cache.get(resource).unwrap().unwrap(), &[2, 3]);

        // Only the entry itself is left behind; no temporary files.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);

        cache.remove(resource).unwrap();
        assert!(cache.get(resource).unwrap().is_none());
        cache.remove(resource).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_entry_names_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirectoryCache::open(dir.path()).unwrap();
        assert_ne!(cache.entry_path("a/b"), cache.entry_path("a_b"));
        assert!(cache
            .entry_path("ab")
            .to_string_lossy()
            .ends_with("6162.bin"));
    }
}
