//! Game archive indexing.
//!
//! The [`GameIndex`] is built by scanning every `.wad.client` file under the
//! game's `DATA/FINAL` directory. It keeps each archive's parsed TOC, keyed by
//! the archive path relative to the game directory, and a reverse lookup from
//! chunk key to every archive that contains it. The reverse lookup powers
//! cross-WAD matching: one mod file is written into every archive that ships
//! the same asset.

use crate::error::{Error, Result};
use crate::utils::is_wad_file_name;
use crate::wad::Wad;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Index of all WAD files in a game directory.
///
/// Only the archives are serialized; the reverse lookup is rebuilt on load.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "StoredGameIndex")]
pub struct GameIndex {
    /// Relative archive path (e.g. `DATA/FINAL/Champions/Ahri.wad.client`) -> parsed archive.
    archives: BTreeMap<Utf8PathBuf, Wad>,

    /// Chunk key -> relative paths of the archives containing it, sorted.
    #[serde(skip_serializing)]
    key_lookup: HashMap<u64, Vec<Utf8PathBuf>>,
}

#[derive(Deserialize)]
struct StoredGameIndex {
    archives: BTreeMap<Utf8PathBuf, Wad>,
}

impl From<StoredGameIndex> for GameIndex {
    fn from(stored: StoredGameIndex) -> Self {
        Self::from_archives(stored.archives)
    }
}

/// Directory holding the game archives, relative to the game directory.
pub fn data_final_dir(game_dir: &Utf8Path) -> Utf8PathBuf {
    game_dir.join("DATA").join("FINAL")
}

impl GameIndex {
    /// Build a game index from the specified game directory.
    ///
    /// Archives that cannot be read or parsed are logged and skipped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGameDir`] when `DATA/FINAL` does not exist.
    pub fn build(game_dir: &Utf8Path) -> Result<Self> {
        let data_final = data_final_dir(game_dir);

        if !data_final.as_std_path().is_dir() {
            return Err(Error::InvalidGameDir(format!(
                "DATA/FINAL not found in {}",
                game_dir
            )));
        }

        tracing::info!("Building game index from {}", data_final);

        let mut archives = BTreeMap::new();
        let mut stack = vec![data_final];

        while let Some(dir) = stack.pop() {
            let read_dir = match std::fs::read_dir(dir.as_std_path()) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Failed to list '{}': {}", dir, e);
                    continue;
                }
            };

            for entry in read_dir {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!("Failed to read entry in '{}': {}", dir, e);
                        continue;
                    }
                };
                let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                    Ok(p) => p,
                    Err(p) => {
                        tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                        continue;
                    }
                };

                if path.as_std_path().is_dir() {
                    stack.push(path);
                    continue;
                }

                let Some(name) = path.file_name() else {
                    continue;
                };
                if !is_wad_file_name(name) {
                    continue;
                }

                let relative_path = match path.strip_prefix(game_dir) {
                    Ok(p) => p.to_path_buf(),
                    Err(_) => continue,
                };

                let wad = match Wad::read(&path) {
                    Ok(w) => w,
                    Err(e) => {
                        tracing::warn!("Failed to read WAD '{}': {}", path, e);
                        continue;
                    }
                };

                archives.insert(relative_path, wad);
            }
        }

        let index = Self::from_archives(archives);
        let chunk_count: usize = index.archives.values().map(|w| w.entries().len()).sum();
        tracing::info!(
            "Game index built: {} WADs, {} total chunk entries, {} unique keys",
            index.archives.len(),
            chunk_count,
            index.key_lookup.len()
        );

        Ok(index)
    }

    /// Index already-parsed archives, keyed by path relative to the game directory.
    pub fn from_archives(archives: BTreeMap<Utf8PathBuf, Wad>) -> Self {
        let mut key_lookup: HashMap<u64, Vec<Utf8PathBuf>> = HashMap::new();
        // BTreeMap iteration keeps every lookup list in path order.
        for (relative_path, wad) in &archives {
            for &key in wad.entries().keys() {
                key_lookup
                    .entry(key)
                    .or_default()
                    .push(relative_path.clone());
            }
        }
        Self {
            archives,
            key_lookup,
        }
    }

    /// All indexed archives, by path relative to the game directory.
    pub fn archives(&self) -> &BTreeMap<Utf8PathBuf, Wad> {
        &self.archives
    }

    pub fn archive(&self, relative_path: &Utf8Path) -> Option<&Wad> {
        self.archives.get(relative_path)
    }

    /// Every archive containing `key`, in path order.
    pub fn find_wads_with_key(&self, key: u64) -> Option<&[Utf8PathBuf]> {
        self.key_lookup.get(&key).map(|v| v.as_slice())
    }

    /// Reverse lookup: chunk key -> archives containing it.
    pub fn key_lookup(&self) -> &HashMap<u64, Vec<Utf8PathBuf>> {
        &self.key_lookup
    }
}
