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

//! Obtaining sample file bytes: a byte cache in front of a fetcher.

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, warn};

mod cache;
mod error;
mod fetch;

pub use cache::{DirectoryCache, MemoryCache};
pub use error::ResourceError;
pub use fetch::{FileFetcher, MemoryFetcher};

/// An opaque byte store keyed by absolute resource identifier.
pub trait ByteCache: fmt::Debug + Send + Sync {
    fn get(&self, resource: &str) -> io::Result<Option<Arc<[u8]>>>;
    fn put(&self, resource: &str, bytes: Arc<[u8]>) -> io::Result<()>;
    /// Drops an entry. Removing a missing entry is not an error.
    fn remove(&self, resource: &str) -> io::Result<()>;
}

/// Retrieves resource bytes from their origin.
pub trait Fetcher: fmt::Debug + Send + Sync {
    /// Normalizes an identifier to its absolute form, used as the cache key.
    fn resolve(&self, resource: &str) -> String {
        resource.to_string()
    }

    /// Fetches the bytes, failing with [`ResourceError::Unavailable`].
    fn fetch(&self, resource: &str) -> Result<Arc<[u8]>, ResourceError>;
}

/// Where loaded bytes came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Fetcher,
}

/// Loads resource bytes, preferring the cache and filling it on a miss.
#[derive(Clone, Debug)]
pub struct ResourceLoader {
    cache: Option<Arc<dyn ByteCache>>,
    fetcher: Arc<dyn Fetcher>,
}

impl ResourceLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Option<Arc<dyn ByteCache>>) -> ResourceLoader {
        ResourceLoader { cache, fetcher }
    }

    /// Gets the bytes for `resource` and where they were found. Blocks on I/O.
    ///
    /// Cache failures are logged and fall through to the fetcher; only a
    /// fetch failure is an error.
    pub fn load(&self, resource: &str) -> Result<(Arc<[u8]>, Origin), ResourceError> {
        let key = self.fetcher.resolve(resource);

        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Ok(Some(bytes)) => {
                    debug!(resource = key, "Using cached resource");
                    return Ok((bytes, Origin::Cache));
                }
                Ok(None) => {}
                Err(e) => warn!(resource = key, error = %e, "Byte cache read failed"),
            }
        }

        let bytes = self.fetcher.fetch(&key)?;
        debug!(resource = key, bytes = bytes.len(), "Fetched resource");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, bytes.clone()) {
                warn!(resource = key, error = %e, "Byte cache write failed");
            }
        }

        Ok((bytes, Origin::Fetcher))
    }

    /// Drops the cached bytes of `resource`, so the next load fetches it again.
    pub fn evict(&self, resource: &str) -> Result<(), ResourceError> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let key = self.fetcher.resolve(resource);
        cache.remove(&key)?;
        debug!(resource = key, "Evicted cached resource");
        Ok(())
    }
}
