//! Content-addressed NFP store shared by all workers.
//!
//! Entries live in memory behind an `RwLock` and, when a cache directory is
//! configured, in one JSON file per entry. NFPs are pure functions of their
//! key, so concurrent writers of the same key race harmlessly: each file is
//! written to a private temporary name and renamed into place.

use crate::nfp::Nfp;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Which kind of fit polygon an entry holds.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum NfpKind {
    /// Orbiting part around a placed part.
    Outer,
    /// Part inside a sheet.
    Inner,
}

/// Cache key: shape signatures plus the rotation of each shape.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfpKey {
    pub stationary: u64,
    pub orbiting: u64,
    /// Rotations in millidegrees, normalized to [0, 360000).
    pub stationary_rotation: i64,
    pub orbiting_rotation: i64,
    pub kind: NfpKind,
}

impl NfpKey {
    pub fn outer(stationary: u64, stationary_rotation: f64, orbiting: u64, orbiting_rotation: f64) -> Self {
        Self {
            stationary,
            orbiting,
            stationary_rotation: millidegrees(stationary_rotation),
            orbiting_rotation: millidegrees(orbiting_rotation),
            kind: NfpKind::Outer,
        }
    }

    pub fn inner(sheet: u64, part: u64, part_rotation: f64) -> Self {
        Self {
            stationary: sheet,
            orbiting: part,
            stationary_rotation: 0,
            orbiting_rotation: millidegrees(part_rotation),
            kind: NfpKind::Inner,
        }
    }

    /// Stable 64-bit hash used as the on-disk file name.
    pub fn hash64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn file_name(&self) -> String {
        format!("{:016x}.json", self.hash64())
    }
}

fn millidegrees(degrees: f64) -> i64 {
    let value = (degrees.rem_euclid(360.0) * 1000.0).round() as i64;
    if value >= 360_000 {
        0
    } else {
        value
    }
}

#[derive(Serialize, Deserialize)]
struct DiskEntry {
    key: NfpKey,
    nfp: Nfp,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

/// Thread-safe NFP cache.
#[derive(Debug, Default)]
pub struct NfpCache {
    memory: RwLock<HashMap<NfpKey, Arc<Nfp>>>,
    dir: Option<PathBuf>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl NfpCache {
    /// Memory-only cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache persisted under `dir`. Falls back to memory only when the
    /// directory cannot be created.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let dir = match fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                log::warn!("NFP cache directory {} unusable: {}", dir.display(), e);
                None
            }
        };
        Self {
            dir,
            ..Self::default()
        }
    }

    /// Cache directory, if entries are persisted.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn get(&self, key: &NfpKey) -> Option<Arc<Nfp>> {
        let found = self.lookup(key);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn lookup(&self, key: &NfpKey) -> Option<Arc<Nfp>> {
        if let Some(nfp) = self.memory.read().ok()?.get(key) {
            return Some(Arc::clone(nfp));
        }
        let nfp = Arc::new(self.read_disk(key)?);
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(*key, Arc::clone(&nfp));
        }
        Some(nfp)
    }

    /// Stores an entry, overwriting any previous value for the key.
    pub fn put(&self, key: NfpKey, nfp: Nfp) -> Arc<Nfp> {
        self.write_disk(&key, &nfp);
        let nfp = Arc::new(nfp);
        if let Ok(mut memory) = self.memory.write() {
            memory.insert(key, Arc::clone(&nfp));
        }
        nfp
    }

    /// Returns the cached entry or computes and stores it.
    pub fn get_or_compute<F>(&self, key: NfpKey, compute: F) -> Arc<Nfp>
    where
        F: FnOnce() -> Nfp,
    {
        if let Some(nfp) = self.get(&key) {
            return nfp;
        }
        log::debug!("NFP cache miss {:016x}", key.hash64());
        self.put(key, compute())
    }

    /// Drops every entry, in memory and on disk. Only files named like cache
    /// entries (and their temporaries) are removed from the directory.
    pub fn clear(&self) {
        if let Ok(mut memory) = self.memory.write() {
            memory.clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);

        let Some(dir) = &self.dir else {
            return;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot list NFP cache {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let ours = path
                .file_name()
                .and_then(|name| name.to_str())
                .map_or(false, is_cache_file);
            if ours {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("cannot remove {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.memory.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn read_disk(&self, key: &NfpKey) -> Option<Nfp> {
        let path = self.dir.as_ref()?.join(key.file_name());
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("NFP cache read {} failed: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice::<DiskEntry>(&bytes) {
            Ok(entry) if entry.key == *key => Some(entry.nfp),
            Ok(_) => None,
            Err(e) => {
                log::warn!("NFP cache entry {} unreadable: {}", path.display(), e);
                None
            }
        }
    }

    fn write_disk(&self, key: &NfpKey, nfp: &Nfp) {
        let Some(dir) = &self.dir else {
            return;
        };
        let target = dir.join(key.file_name());
        let temp = dir.join(format!(
            "{}.{}.{}.tmp",
            key.file_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let entry = DiskEntry { key: *key, nfp: nfp.clone() };
        let result = serde_json::to_vec(&entry)
            .map_err(std::io::Error::from)
            .and_then(|bytes| fs::write(&temp, bytes))
            .and_then(|()| fs::rename(&temp, &target));
        if let Err(e) = result {
            log::warn!("NFP cache write {} failed: {}", target.display(), e);
            let _ = fs::remove_file(&temp);
        }
    }
}

/// `<16 hex>.json` entries and their `<entry>.<pid>.<n>.tmp` temporaries.
fn is_cache_file(name: &str) -> bool {
    let is_entry = |s: &str| {
        s.strip_suffix(".json").map_or(false, |hash| {
            hash.len() == 16 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
    };
    if is_entry(name) {
        return true;
    }
    let Some(rest) = name.strip_suffix(".tmp") else {
        return false;
    };
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let mut fields = rest.rsplitn(3, '.');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(counter), Some(pid), Some(entry)) => numeric(counter) && numeric(pid) && is_entry(entry),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;
    use std::sync::atomic::AtomicUsize;

    fn square_nfp(size: f64) -> Nfp {
        Nfp::from_polygons(vec![Polygon::rectangle(size, size).unwrap()])
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sheetnest-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_get_or_compute_computes_once() {
        let cache = NfpCache::new();
        let calls = AtomicUsize::new(0);
        let key = NfpKey::outer(1, 0.0, 2, 90.0);

        for _ in 0..3 {
            cache.get_or_compute(key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                square_nfp(1.0)
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_keys_distinguish_rotation_and_kind() {
        let cache = NfpCache::new();
        cache.put(NfpKey::outer(1, 0.0, 2, 0.0), square_nfp(1.0));
        cache.put(NfpKey::outer(1, 0.0, 2, 90.0), square_nfp(2.0));
        cache.put(NfpKey::inner(1, 2, 0.0), square_nfp(3.0));
        assert_eq!(cache.len(), 3);
        assert_eq!(NfpKey::outer(1, 360.0, 2, -90.0), NfpKey::outer(1, 0.0, 2, 270.0));
    }

    #[test]
    fn test_clear() {
        let cache = NfpCache::new();
        cache.put(NfpKey::inner(1, 2, 0.0), square_nfp(1.0));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&NfpKey::inner(1, 2, 0.0)).is_none());
    }

    #[test]
    fn test_disk_round_trip() {
        let dir = temp_dir("cache-roundtrip");
        let key = NfpKey::outer(7, 0.0, 8, 180.0);
        {
            let cache = NfpCache::with_dir(&dir);
            cache.put(key, square_nfp(4.0));
            assert!(dir.join(key.file_name()).exists());
        }

        // A fresh cache sees the entry written by the previous one.
        let cache = NfpCache::with_dir(&dir);
        let nfp = cache.get(&key).unwrap();
        assert_eq!(*nfp, square_nfp(4.0));

        cache.clear();
        assert!(!dir.join(key.file_name()).exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cache_file_names() {
        assert!(is_cache_file("00ff00ff00ff00ff.json"));
        assert!(is_cache_file("00ff00ff00ff00ff.json.4711.3.tmp"));
        assert!(!is_cache_file("settings.json"));
        assert!(!is_cache_file("00FF00FF00FF00FF.json"));
        assert!(!is_cache_file("00ff00ff00ff00ff.json.bak"));
        assert!(!is_cache_file("download.tmp"));
        assert!(!is_cache_file("00ff00ff00ff00ff.json.x.3.tmp"));
    }

    #[test]
    fn test_clear_keeps_unrelated_files() {
        let dir = temp_dir("cache-shared");
        let key = NfpKey::inner(5, 6, 90.0);
        let cache = NfpCache::with_dir(&dir);
        cache.put(key, square_nfp(2.0));
        let stale = dir.join(format!("{}.1.0.tmp", key.file_name()));
        fs::write(&stale, b"{").unwrap();
        let unrelated = ["settings.json", "download.tmp", "notes.txt"];
        for name in unrelated {
            fs::write(dir.join(name), b"keep").unwrap();
        }

        cache.clear();
        assert!(!dir.join(key.file_name()).exists());
        assert!(!stale.exists());
        for name in unrelated {
            assert!(dir.join(name).exists(), "{name} was removed");
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let dir = temp_dir("cache-corrupt");
        let cache = NfpCache::with_dir(&dir);
        let key = NfpKey::inner(3, 4, 0.0);
        fs::write(dir.join(key.file_name()), b"not json").unwrap();
        assert!(cache.get(&key).is_none());

        let nfp = cache.get_or_compute(key, || square_nfp(1.0));
        assert_eq!(nfp.polygons.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }
}
