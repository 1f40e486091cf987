//! On-disk cache of response bodies, used when the site is unreachable.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::CacheConfig;

pub struct ResponseCache {
    dir: PathBuf,
    max_size_bytes: u64,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_size_bytes,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.path.clone(), config.max_size_bytes)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let key = format!("{:x}", Sha256::digest(url.as_bytes()));
        self.dir.join(key)
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        fs::read(self.entry_path(url)).ok()
    }

    /// Store a body, then evict the oldest entries until the cache fits its budget.
    ///
    /// A body over the budget is not stored, and any older body for the same
    /// URL is dropped so it cannot be served later.
    pub fn put(&self, url: &str, body: &[u8]) -> Result<()> {
        if body.len() as u64 > self.max_size_bytes {
            remove_entry(&self.entry_path(url))?;
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory {}", self.dir.display()))?;
        fs::write(self.entry_path(url), body)?;
        self.trim()?;
        Ok(())
    }

    /// Total size of cached bodies in bytes.
    pub fn size(&self) -> u64 {
        entries(&self.dir).iter().map(|(_, size, _)| size).sum()
    }

    fn trim(&self) -> Result<()> {
        let mut entries = entries(&self.dir);
        let mut total: u64 = entries.iter().map(|(_, size, _)| size).sum();
        if total <= self.max_size_bytes {
            return Ok(());
        }

        entries.sort_by_key(|(_, _, modified)| *modified);
        for (path, size, _) in entries {
            if total <= self.max_size_bytes {
                break;
            }
            remove_entry(&path)?;
            total = total.saturating_sub(size);
            tracing::debug!(path = %path.display(), "Evicted cached response");
        }
        Ok(())
    }
}

/// Remove a cache file. Another worker may have evicted it already.
fn remove_entry(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

fn entries(dir: &Path) -> Vec<(PathBuf, u64, SystemTime)> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return Vec::new();
    };
    read_dir
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((entry.path(), metadata.len(), modified))
        })
        .collect()
}
