//! Path normalization, key derivation and staleness signal helpers.
//!
//! These functions bridge the gap between how mod files are stored on disk and
//! the `u64` keys used inside WAD files.

use camino::Utf8Path;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh64::xxh64;

/// Suffix identifying game archives, compared case-insensitively.
pub const WAD_SUFFIX: &str = ".wad.client";

/// Normalize a relative path for hash computation.
///
/// Path separators are normalized to forward slashes (`/`) and the result is
/// lowercased, so the same asset hashes identically on every platform.
pub fn normalize_rel_path(rel_path: &Utf8Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/")
        .replace('\\', "/")
        .to_lowercase()
}

/// Hash an already normalized asset path with xxHash64 (seed 0).
pub fn hash_asset_path(normalized: &str) -> u64 {
    xxh64(normalized.as_bytes(), 0)
}

/// Parse the key of a top-level mod file named after its hexadecimal key.
///
/// Only the last extension is stripped: `64.dat` -> `0x64`, `1a2b` -> `0x1a2b`.
/// Returns `None` when the stem is not a base-16 integer that fits in a `u64`.
pub fn parse_hex_key(file_name: &str) -> Option<u64> {
    let stem = Utf8Path::new(file_name).file_stem()?;
    u64::from_str_radix(stem, 16).ok()
}

/// Whether a file name carries the game archive suffix.
pub fn is_wad_file_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(WAD_SUFFIX)
}

/// Modification time of `path` in milliseconds since the Unix epoch.
///
/// Returns `None` when the path does not exist or the platform cannot report
/// a modification time. `None` is a valid signal value in its own right: a
/// directory that stays missing is not considered changed.
pub fn modified_millis(path: &Utf8Path) -> Option<u64> {
    let modified = std::fs::metadata(path.as_std_path()).ok()?.modified().ok()?;
    let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
    u64::try_from(millis).ok()
}
