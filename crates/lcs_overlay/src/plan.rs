//! Merge planning: which mod files go into which game archive.
//!
//! # Algorithm
//!
//! Mods are processed in ascending name order, each mod's files in ascending
//! key order. A key claimed by one mod is never reconsidered for a later mod.
//!
//! 1. Every unclaimed file whose key exists in the game is a **substitution**
//!    for every archive containing that key. Each such archive scores one point
//!    in the mod's tally.
//! 2. The archive with the highest tally (ties: smallest path) is the mod's
//!    **primary** archive. Every unclaimed file whose key exists nowhere in the
//!    game is an **addition** to the primary archive.
//! 3. A mod with an empty tally has no primary archive, so its new files are
//!    dropped. The mod name is recorded in [`MergePlan::dropped_mods`].

use crate::mod_index::{ModFileEntry, ModIndex};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Replacement set for one archive: key -> mod file.
pub type ArchivePlan = BTreeMap<u64, ModFileEntry>;

/// The computed mapping of archive path -> replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePlan {
    archives: BTreeMap<Utf8PathBuf, ArchivePlan>,
    dropped_mods: Vec<String>,
}

impl MergePlan {
    /// Compute the plan for the enabled mods.
    ///
    /// # Arguments
    ///
    /// * `mods` - Mod name -> index of its files
    /// * `key_lookup` - Chunk key -> relative paths of the archives containing it
    /// * `disabled` - Mod names excluded from the plan
    pub fn compute(
        mods: &BTreeMap<String, ModIndex>,
        key_lookup: &HashMap<u64, Vec<Utf8PathBuf>>,
        disabled: &BTreeSet<String>,
    ) -> Self {
        let mut plan = Self::default();
        let mut claimed: HashSet<u64> = HashSet::new();

        for (name, files) in mods {
            if disabled.contains(name) {
                tracing::debug!("Skipping disabled mod '{}'", name);
                continue;
            }

            let mut tally: BTreeMap<&Utf8PathBuf, usize> = BTreeMap::new();
            for (&key, file) in files {
                if claimed.contains(&key) {
                    continue;
                }
                let Some(archives) = key_lookup.get(&key) else {
                    continue;
                };
                for archive in archives {
                    plan.archives
                        .entry(archive.clone())
                        .or_default()
                        .insert(key, file.clone());
                    *tally.entry(archive).or_default() += 1;
                }
                claimed.insert(key);
            }

            let new_files: Vec<&ModFileEntry> = files
                .values()
                .filter(|f| !claimed.contains(&f.key) && !key_lookup.contains_key(&f.key))
                .collect();

            let Some(primary) = primary_archive(&tally) else {
                if !new_files.is_empty() {
                    tracing::warn!(
                        "Mod '{}' does not overlap any game archive; dropping its {} new files",
                        name,
                        new_files.len()
                    );
                    plan.dropped_mods.push(name.clone());
                }
                continue;
            };

            let primary = primary.clone();
            tracing::debug!(
                "Mod '{}': {} substitutions, {} additions into '{}'",
                name,
                tally.values().sum::<usize>(),
                new_files.len(),
                primary
            );

            let target = plan.archives.entry(primary).or_default();
            for file in new_files {
                target.insert(file.key, file.clone());
                claimed.insert(file.key);
            }
        }

        plan
    }

    /// Archive path (relative to the game directory) -> replacements.
    pub fn archives(&self) -> &BTreeMap<Utf8PathBuf, ArchivePlan> {
        &self.archives
    }

    /// Mods dropped because none of their files exist in any game archive.
    pub fn dropped_mods(&self) -> &[String] {
        &self.dropped_mods
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Total number of replacement entries across all archives.
    pub fn entry_count(&self) -> usize {
        self.archives.values().map(BTreeMap::len).sum()
    }
}

/// Highest tally wins; iteration is in path order, so the smallest path wins ties.
fn primary_archive<'a>(tally: &BTreeMap<&'a Utf8PathBuf, usize>) -> Option<&'a Utf8PathBuf> {
    let mut best: Option<(&Utf8PathBuf, usize)> = None;
    for (&path, &count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((path, count));
        }
    }
    best.map(|(path, _)| path)
}

/// A key provided by more than one enabled mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub key: u64,
    /// Every enabled mod providing the key, in processing order.
    pub contributing_mods: Vec<String>,
    /// The mod whose file the plan uses, or `None` when every provider was dropped.
    pub winner: Option<String>,
}

/// Report every key provided by more than one enabled mod, sorted by key.
///
/// The winner is read back from `plan`, which must have been computed from the
/// same `mods` and `disabled`.
pub fn find_conflicts(
    mods: &BTreeMap<String, ModIndex>,
    disabled: &BTreeSet<String>,
    plan: &MergePlan,
) -> Vec<Conflict> {
    let mut providers: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    for (name, files) in mods {
        if disabled.contains(name) {
            continue;
        }
        for &key in files.keys() {
            providers.entry(key).or_default().push(name.clone());
        }
    }

    // A key lands in every archive containing it, always from the same mod file.
    let mut planned: HashMap<u64, &Utf8PathBuf> = HashMap::new();
    for replacements in plan.archives().values() {
        for (&key, file) in replacements {
            planned.entry(key).or_insert(&file.path);
        }
    }

    providers
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(key, contributing_mods)| {
            let winner = planned.get(&key).and_then(|&used| {
                contributing_mods
                    .iter()
                    .find(|name| mods[name.as_str()].get(&key).map(|f| &f.path) == Some(used))
                    .cloned()
            });
            Conflict {
                key,
                contributing_mods,
                winner,
            }
        })
        .collect()
}
