//! Content-addressed indexing of loose mod files.
//!
//! A mod is a directory. Its files are addressed by two conventions, both
//! applied during one scan:
//!
//! 1. **Hex-key files**: files directly inside the mod directory whose name
//!    (last extension stripped) is a base-16 integer use that integer as key:
//!    `64.dat` replaces entry `0x64`. Other top-level files are ignored.
//! 2. **Path-hashed files**: every file below a subdirectory is keyed by the
//!    xxHash64 of its lowercased, `/`-separated path relative to the mod
//!    directory: `assets/characters/ahri/skin0.bin`.
//!
//! When a path-hashed file lands on a key already claimed by a hex-key file,
//! the hex-key file is kept.
//!
//! Every indexed file is streamed once through SHA-256 to record its size and
//! a truncated content hash. Unreadable files are logged and skipped.

use crate::error::Result;
use crate::utils::{hash_asset_path, normalize_rel_path, parse_hex_key};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::Read;
use walkdir::WalkDir;

/// Chunk size used when streaming file content through the digest.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Index of one mod: key -> file.
pub type ModIndex = BTreeMap<u64, ModFileEntry>;

/// One file contributed by a mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModFileEntry {
    /// Location of the file on disk.
    pub path: Utf8PathBuf,
    /// Key of the archive entry this file provides.
    pub key: u64,
    /// Size of the file in bytes when it was indexed.
    pub size: u64,
    /// First 8 bytes (little-endian) of the SHA-256 of the file content.
    pub content_hash: u64,
}

impl ModFileEntry {
    /// Hash the file at `path` and record it under `key`.
    pub fn from_file(path: &Utf8Path, key: u64) -> Result<Self> {
        let mut file = std::fs::File::open(path.as_std_path())?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
        let mut size = 0u64;

        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            size += read as u64;
        }

        let digest = hasher.finalize();
        let mut truncated = [0u8; 8];
        truncated.copy_from_slice(&digest[..8]);

        Ok(Self {
            path: path.to_path_buf(),
            key,
            size,
            content_hash: u64::from_le_bytes(truncated),
        })
    }
}

/// Scan a mod directory and index every file under both addressing conventions.
pub fn scan_mod_dir(mod_dir: &Utf8Path) -> ModIndex {
    scan_mod_dir_with(mod_dir, hash_asset_path)
}

/// [`scan_mod_dir`] with a replaceable path hash, so key collisions can be staged in tests.
pub(crate) fn scan_mod_dir_with(mod_dir: &Utf8Path, path_hash: fn(&str) -> u64) -> ModIndex {
    let mut index = ModIndex::new();

    for entry in WalkDir::new(mod_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in '{}': {}", mod_dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!("Skipping non-UTF-8 file name: {}", entry.path().display());
            continue;
        };
        let Some(key) = parse_hex_key(name) else {
            tracing::trace!("Ignoring top-level file without hex key: {}", name);
            continue;
        };
        let path = mod_dir.join(name);
        index_file(&mut index, &path, key);
    }

    for entry in WalkDir::new(mod_dir).min_depth(2).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in '{}': {}", mod_dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };
        let Ok(rel) = path.strip_prefix(mod_dir) else {
            continue;
        };
        let normalized = normalize_rel_path(rel);
        let key = path_hash(&normalized);

        if let Some(existing) = index.get(&key) {
            tracing::warn!(
                "Path '{}' hashes to {:016x}, already provided by {} '{}'; keeping the existing file",
                normalized,
                key,
                key_origin(existing, mod_dir),
                existing.path
            );
            continue;
        }
        index_file(&mut index, &path, key);
    }

    tracing::debug!("Indexed mod '{}': {} files", mod_dir, index.len());
    index
}

/// Index every mod under `mods_dir`: one mod per immediate subdirectory, keyed by name.
///
/// A missing `mods_dir` yields no mods.
pub fn index_mods_root(mods_dir: &Utf8Path) -> BTreeMap<String, ModIndex> {
    let mut mods = BTreeMap::new();
    if !mods_dir.as_std_path().is_dir() {
        tracing::debug!("Mods directory '{}' does not exist", mods_dir);
        return mods;
    }

    for entry in WalkDir::new(mods_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in '{}': {}", mods_dir, e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!("Skipping non-UTF-8 mod name: {}", entry.path().display());
            continue;
        };
        let index = scan_mod_dir(&mods_dir.join(name));
        mods.insert(name.to_string(), index);
    }

    tracing::info!("Indexed {} mods in {}", mods.len(), mods_dir);
    mods
}

/// How an indexed file got its key: top-level files are hex-keyed, nested ones path-hashed.
fn key_origin(entry: &ModFileEntry, mod_dir: &Utf8Path) -> &'static str {
    if entry.path.parent() == Some(mod_dir) {
        "hex-key file"
    } else {
        "path-hashed file"
    }
}

fn index_file(index: &mut ModIndex, path: &Utf8Path, key: u64) {
    match ModFileEntry::from_file(path, key) {
        Ok(entry) => match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                tracing::debug!(
                    "Key {:016x}: '{}' replaces '{}'",
                    key,
                    path,
                    slot.get().path
                );
                slot.insert(entry);
            }
        },
        Err(e) => {
            tracing::warn!("Failed to index mod file '{}': {}", path, e);
        }
    }
}
