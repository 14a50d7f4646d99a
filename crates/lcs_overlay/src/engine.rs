//! The overlay engine.
//!
//! [`OverlayEngine`] owns the game index, the mod index and the merge plan, and
//! is the only writer of the overlay directory. Each of the four pipeline
//! stages is tracked by a [`Stage`](crate::state::Stage):
//!
//! | Stage      | Staleness signal               | On rebuild                         |
//! |------------|--------------------------------|------------------------------------|
//! | game index | mtime of `game_dir/DATA/FINAL` | re-reads every archive TOC         |
//! | mod index  | mtime of the mods directory    | re-scans every mod                 |
//! | merge plan | upstream rebuild or selection  | recomputes the [`MergePlan`]       |
//! | overlay    | mtime of the overlay directory | writes planned archives, prunes    |
//!
//! [`auto_write`](OverlayEngine::auto_write) only recomputes stale stages and
//! is a cheap no-op when nothing changed. [`force_write`](OverlayEngine::force_write)
//! invalidates every stage first, for filesystems with coarse mtime resolution.
//! [`save_state`](OverlayEngine::save_state) and [`restore`](OverlayEngine::restore)
//! carry the stage signals and cached outputs over to the next process.
//!
//! # Write phase
//!
//! Every archive in the plan is written to `overlay_root/<relative path>`. A
//! failed archive keeps its previous overlay file and leaves the overlay stage
//! stale so the next call retries. Afterwards every other file under the overlay
//! root is deleted.

use crate::error::Result;
use crate::game_index::{data_final_dir, GameIndex};
use crate::mod_index::{index_mods_root, ModIndex};
use crate::plan::{find_conflicts, Conflict, MergePlan};
use crate::state::{EngineState, StageKind, StageState};
use crate::utils::modified_millis;
use crate::wad_builder::write_merged_wad;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Progress information emitted while the engine runs.
///
/// `current`/`total` are only meaningful during
/// [`WritingWad`](OverlayStage::WritingWad).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayProgress {
    pub stage: OverlayStage,
    /// Archive currently being written.
    pub current_file: Option<String>,
    /// 1-based index of the archive currently being written.
    pub current: u32,
    pub total: u32,
}

/// Stages reported through [`OverlayProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayStage {
    IndexingGame,
    IndexingMods,
    Planning,
    WritingWad,
    Pruning,
    Complete,
}

/// One archive written during the write phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenArchive {
    /// Path relative to the overlay root.
    pub path: Utf8PathBuf,
    pub entries: usize,
    pub replaced: usize,
    pub added: usize,
}

/// One archive that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedArchive {
    pub path: Utf8PathBuf,
    pub message: String,
}

/// Summary of one [`auto_write`](OverlayEngine::auto_write) or
/// [`force_write`](OverlayEngine::force_write) call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub overlay_root: Utf8PathBuf,
    /// Stages recomputed during this call, in pipeline order.
    pub stages_rebuilt: Vec<StageKind>,
    pub archives_written: Vec<WrittenArchive>,
    pub archives_failed: Vec<FailedArchive>,
    /// Files deleted from the overlay root.
    pub files_pruned: Vec<Utf8PathBuf>,
    /// Mods that contribute nothing because they overlap no game archive.
    pub dropped_mods: Vec<String>,
    pub elapsed_ms: u64,
}

impl BuildReport {
    /// Whether the call did not touch the overlay at all.
    pub fn is_noop(&self) -> bool {
        self.archives_written.is_empty()
            && self.archives_failed.is_empty()
            && self.files_pruned.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.archives_failed.is_empty()
    }
}

type ProgressCallback = Arc<dyn Fn(OverlayProgress) + Send + Sync>;

/// Builds and maintains the overlay directory for a game and a mods directory.
pub struct OverlayEngine {
    state: EngineState,
    progress_callback: Option<ProgressCallback>,
}

impl OverlayEngine {
    /// Create an engine. Nothing is read until the first write; every stage starts stale.
    ///
    /// # Arguments
    ///
    /// * `game_dir` - Game directory containing `DATA/FINAL`
    /// * `mods_dir` - Directory holding one subdirectory per mod
    /// * `overlay_root` - Directory the engine writes archives to and prunes
    pub fn new(game_dir: Utf8PathBuf, mods_dir: Utf8PathBuf, overlay_root: Utf8PathBuf) -> Self {
        Self::from_state(EngineState::new(game_dir, mods_dir, overlay_root))
    }

    /// Resume from a state written by [`save_state`](Self::save_state).
    ///
    /// Stages whose signals still match stay fresh, so an unchanged install is a
    /// no-op on the next [`auto_write`](Self::auto_write). A missing or unreadable
    /// file, or one saved for other directories, yields a new engine instead.
    pub fn restore(
        game_dir: Utf8PathBuf,
        mods_dir: Utf8PathBuf,
        overlay_root: Utf8PathBuf,
        state_path: &Utf8Path,
    ) -> Self {
        match EngineState::load(state_path) {
            Ok(Some(state)) if state.matches(&game_dir, &mods_dir, &overlay_root) => {
                tracing::debug!("Restored engine state from '{}'", state_path);
                return Self::from_state(state);
            }
            Ok(Some(_)) => {
                tracing::info!(
                    "Discarding engine state '{}' saved for other directories",
                    state_path
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Ignoring unreadable engine state '{}': {}", state_path, e);
            }
        }
        Self::new(game_dir, mods_dir, overlay_root)
    }

    fn from_state(state: EngineState) -> Self {
        Self {
            state,
            progress_callback: None,
        }
    }

    /// Save stage signals and cached outputs for [`restore`](Self::restore).
    pub fn save_state(&self, path: &Utf8Path) -> Result<()> {
        self.state.save(path)
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(OverlayProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Replace the set of disabled mod names.
    ///
    /// A change marks the merge plan stale without re-scanning any directory.
    pub fn set_disabled_mods(&mut self, disabled: BTreeSet<String>) {
        if disabled == self.state.disabled {
            return;
        }
        self.state.disabled = disabled;
        self.state.stages.get_mut(StageKind::MergePlan).invalidate();
        self.state.stages.get_mut(StageKind::Overlay).invalidate();
    }

    pub fn disabled_mods(&self) -> &BTreeSet<String> {
        &self.state.disabled
    }

    pub fn game_dir(&self) -> &Utf8Path {
        &self.state.game_dir
    }

    pub fn mods_dir(&self) -> &Utf8Path {
        &self.state.mods_dir
    }

    pub fn overlay_root(&self) -> &Utf8Path {
        &self.state.overlay_root
    }

    pub fn game_index(&self) -> &GameIndex {
        &self.state.game_index
    }

    /// Mod name -> indexed files, as of the last mod index rebuild.
    pub fn mods(&self) -> &BTreeMap<String, ModIndex> {
        &self.state.mods
    }

    pub fn plan(&self) -> &MergePlan {
        &self.state.plan
    }

    pub fn stage(&self, kind: StageKind) -> StageState {
        self.state.stages.get(kind).state()
    }

    /// Keys provided by more than one enabled mod, as of the last plan rebuild.
    pub fn conflicts(&self) -> Vec<Conflict> {
        find_conflicts(&self.state.mods, &self.state.disabled, &self.state.plan)
    }

    /// Recompute stale stages and bring the overlay up to date.
    pub fn auto_write(&mut self) -> Result<BuildReport> {
        let start = Instant::now();
        let mut report = BuildReport {
            overlay_root: self.state.overlay_root.clone(),
            ..Default::default()
        };

        self.refresh(&mut report)?;
        self.refresh_overlay(&mut report)?;

        report.dropped_mods = self.state.plan.dropped_mods().to_vec();
        report.elapsed_ms = start.elapsed().as_millis() as u64;

        let total = report.archives_written.len() as u32;
        self.emit_progress(OverlayProgress {
            stage: OverlayStage::Complete,
            current_file: None,
            current: total,
            total,
        });

        if report.is_noop() {
            tracing::debug!("Overlay is up to date");
        } else {
            tracing::info!(
                "Overlay updated: {} written, {} failed, {} pruned in {} ms",
                report.archives_written.len(),
                report.archives_failed.len(),
                report.files_pruned.len(),
                report.elapsed_ms
            );
        }
        Ok(report)
    }

    /// Rebuild every stage regardless of staleness signals.
    pub fn force_write(&mut self) -> Result<BuildReport> {
        tracing::info!("Forcing full overlay rebuild");
        self.state.stages.invalidate_all();
        self.auto_write()
    }

    /// Recompute the stale index and plan stages without touching the overlay.
    pub fn refresh_plan(&mut self) -> Result<&MergePlan> {
        let mut report = BuildReport::default();
        self.refresh(&mut report)?;
        Ok(&self.state.plan)
    }

    fn refresh(&mut self, report: &mut BuildReport) -> Result<()> {
        self.refresh_game_index(report)?;
        self.refresh_mod_index(report);
        self.refresh_merge_plan(report);
        Ok(())
    }

    fn refresh_game_index(&mut self, report: &mut BuildReport) -> Result<()> {
        // Sampled before the scan so a change made during it is seen next time.
        let signal = modified_millis(&data_final_dir(&self.state.game_dir));
        let stage = self.state.stages.get_mut(StageKind::GameIndex);
        stage.observe(signal);
        if !stage.begin() {
            return Ok(());
        }

        self.emit_progress(OverlayProgress {
            stage: OverlayStage::IndexingGame,
            current_file: None,
            current: 0,
            total: 0,
        });

        match GameIndex::build(&self.state.game_dir) {
            Ok(index) => {
                self.state.game_index = index;
                self.state.stages.finish(StageKind::GameIndex, signal);
                report.stages_rebuilt.push(StageKind::GameIndex);
                Ok(())
            }
            Err(e) => {
                self.state.stages.get_mut(StageKind::GameIndex).abort();
                Err(e)
            }
        }
    }

    fn refresh_mod_index(&mut self, report: &mut BuildReport) {
        let signal = modified_millis(&self.state.mods_dir);
        let stage = self.state.stages.get_mut(StageKind::ModIndex);
        stage.observe(signal);
        if !stage.begin() {
            return;
        }

        self.emit_progress(OverlayProgress {
            stage: OverlayStage::IndexingMods,
            current_file: None,
            current: 0,
            total: 0,
        });

        self.state.mods = index_mods_root(&self.state.mods_dir);
        self.state.stages.finish(StageKind::ModIndex, signal);
        report.stages_rebuilt.push(StageKind::ModIndex);
    }

    fn refresh_merge_plan(&mut self, report: &mut BuildReport) {
        if !self.state.stages.get_mut(StageKind::MergePlan).begin() {
            return;
        }

        self.emit_progress(OverlayProgress {
            stage: OverlayStage::Planning,
            current_file: None,
            current: 0,
            total: 0,
        });

        self.state.plan = MergePlan::compute(&self.state.mods, self.state.game_index.key_lookup(), &self.state.disabled);
        tracing::info!(
            "Merge plan: {} archives, {} entries, {} mods dropped",
            self.state.plan.archives().len(),
            self.state.plan.entry_count(),
            self.state.plan.dropped_mods().len()
        );
        self.state.stages.finish(StageKind::MergePlan, None);
        report.stages_rebuilt.push(StageKind::MergePlan);
    }

    fn refresh_overlay(&mut self, report: &mut BuildReport) -> Result<()> {
        let stage = self.state.stages.get_mut(StageKind::Overlay);
        stage.observe(modified_millis(&self.state.overlay_root));
        if !stage.begin() {
            return Ok(());
        }

        if let Err(e) = self.write_overlay(report) {
            self.state.stages.get_mut(StageKind::Overlay).abort();
            return Err(e);
        }

        if report.has_failures() {
            self.state.stages.get_mut(StageKind::Overlay).abort();
        } else {
            let signal = modified_millis(&self.state.overlay_root);
            self.state.stages.finish(StageKind::Overlay, signal);
        }
        report.stages_rebuilt.push(StageKind::Overlay);
        Ok(())
    }

    fn write_overlay(&self, report: &mut BuildReport) -> Result<()> {
        std::fs::create_dir_all(self.state.overlay_root.as_std_path())?;

        let total = self.state.plan.archives().len() as u32;
        let mut keep: HashSet<Utf8PathBuf> = HashSet::new();

        for (idx, (relative_path, replacements)) in self.state.plan.archives().iter().enumerate() {
            let wad_name = relative_path.file_name().unwrap_or("unknown");
            self.emit_progress(OverlayProgress {
                stage: OverlayStage::WritingWad,
                current_file: Some(wad_name.to_string()),
                current: idx as u32 + 1,
                total,
            });

            let dst = self.state.overlay_root.join(relative_path);
            keep.insert(dst.clone());

            let Some(base) = self.state.game_index.archive(relative_path) else {
                report.archives_failed.push(FailedArchive {
                    path: relative_path.clone(),
                    message: "archive is missing from the game index".to_string(),
                });
                continue;
            };

            tracing::info!(
                "Writing WAD src={} dst={} replacements={}",
                base.path(),
                dst,
                replacements.len()
            );

            match write_merged_wad(&dst, base, replacements) {
                Ok(stats) => report.archives_written.push(WrittenArchive {
                    path: relative_path.clone(),
                    entries: stats.entries_written,
                    replaced: stats.replaced,
                    added: stats.added,
                }),
                Err(e) => {
                    tracing::warn!("Failed to write WAD '{}': {}", dst, e);
                    report.archives_failed.push(FailedArchive {
                        path: relative_path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        self.emit_progress(OverlayProgress {
            stage: OverlayStage::Pruning,
            current_file: None,
            current: total,
            total,
        });
        report.files_pruned = prune_overlay(&self.state.overlay_root, &keep);
        Ok(())
    }

    fn emit_progress(&self, progress: OverlayProgress) {
        if let Some(callback) = &self.progress_callback {
            callback(progress);
        }
    }
}

/// Delete every file under `root` not in `keep`, then any directory left empty.
///
/// Returns the deleted files. Failures are logged and skipped.
fn prune_overlay(root: &Utf8Path, keep: &HashSet<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut pruned = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Failed to walk overlay '{}': {}", root, e);
                continue;
            }
        };
        let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(p) => p,
            Err(p) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", p.display());
                continue;
            }
        };

        if path.as_std_path().is_dir() {
            // Only succeeds when empty.
            if std::fs::remove_dir(path.as_std_path()).is_ok() {
                tracing::trace!("Removed empty overlay directory '{}'", path);
            }
            continue;
        }
        if keep.contains(&path) {
            continue;
        }

        match std::fs::remove_file(path.as_std_path()) {
            Ok(()) => {
                tracing::info!("Pruned stale overlay file '{}'", path);
                pruned.push(path);
            }
            Err(e) => tracing::warn!("Failed to prune '{}': {}", path, e),
        }
    }

    pruned.sort();
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{utf8_tempdir, write_file, write_fixture_wad, Utf8TempDir};
    use std::sync::Mutex;

    struct Fixture {
        dir: Utf8TempDir,
        game: Utf8PathBuf,
        mods: Utf8PathBuf,
        overlay: Utf8PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = utf8_tempdir();
        let game = dir.path.join("game");
        let mods = dir.path.join("mods");
        let overlay = dir.path.join("overlay");
        write_fixture_wad(
            &game.join("DATA/FINAL/Champions/Ahri.wad.client"),
            &[(0x10, [1u8; 4].as_slice()), (0x20, [2u8; 4].as_slice())],
        );
        write_fixture_wad(
            &game.join("DATA/FINAL/Maps/Map11.wad.client"),
            &[(0x30, [3u8; 4].as_slice())],
        );
        std::fs::create_dir_all(&mods).unwrap();
        Fixture {
            dir,
            game,
            mods,
            overlay,
        }
    }

    impl Fixture {
        fn engine(&self) -> OverlayEngine {
            OverlayEngine::new(self.game.clone(), self.mods.clone(), self.overlay.clone())
        }
    }

    #[test]
    fn test_new_engine_is_stale() {
        let f = fixture();
        let engine = f.engine();
        for kind in StageKind::ALL {
            assert_eq!(engine.stage(kind), StageState::Stale);
        }
        assert!(engine.plan().is_empty());
    }

    #[test]
    fn test_missing_game_dir_fails_and_stays_stale() {
        let f = fixture();
        let mut engine = OverlayEngine::new(
            f.game.join("nope"),
            f.mods.clone(),
            f.overlay.clone(),
        );
        assert!(engine.auto_write().is_err());
        assert_eq!(engine.stage(StageKind::GameIndex), StageState::Stale);
    }

    #[test]
    fn test_auto_write_then_noop() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"replaced");

        let mut engine = f.engine();
        let first = engine.auto_write().unwrap();
        assert_eq!(first.stages_rebuilt, StageKind::ALL.to_vec());
        assert_eq!(first.archives_written.len(), 1);
        assert_eq!(
            first.archives_written[0].path,
            Utf8PathBuf::from("DATA/FINAL/Champions/Ahri.wad.client")
        );
        for kind in StageKind::ALL {
            assert_eq!(engine.stage(kind), StageState::Fresh);
        }

        let second = engine.auto_write().unwrap();
        assert!(second.stages_rebuilt.is_empty());
        assert!(second.is_noop());
    }

    #[test]
    fn test_disabling_mod_prunes_its_archive() {
        let f = fixture();
        write_file(&f.mods.join("ahri/10.bin"), b"ahri");
        write_file(&f.mods.join("map/30.bin"), b"map");

        let mut engine = f.engine();
        engine.auto_write().unwrap();
        let map_wad = f.overlay.join("DATA/FINAL/Maps/Map11.wad.client");
        let ahri_wad = f.overlay.join("DATA/FINAL/Champions/Ahri.wad.client");
        assert!(map_wad.exists());

        engine.set_disabled_mods(["map".to_string()].into());
        assert_eq!(engine.stage(StageKind::MergePlan), StageState::Stale);
        assert_eq!(engine.stage(StageKind::GameIndex), StageState::Fresh);

        let report = engine.auto_write().unwrap();
        assert_eq!(
            report.stages_rebuilt,
            vec![StageKind::MergePlan, StageKind::Overlay]
        );
        assert_eq!(report.files_pruned, vec![map_wad.clone()]);
        assert!(!map_wad.exists());
        assert!(!f.overlay.join("DATA/FINAL/Maps").exists());
        assert!(ahri_wad.exists());
    }

    #[test]
    fn test_unknown_overlay_files_are_pruned() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"x");
        let leftover = f.overlay.join("DATA/FINAL/Old.wad.client");
        write_file(&leftover, b"stale");

        let report = f.engine().force_write().unwrap();
        assert_eq!(report.files_pruned, vec![leftover.clone()]);
        assert!(!leftover.exists());
    }

    #[test]
    fn test_failed_archive_keeps_overlay_stale() {
        let f = fixture();
        write_file(&f.mods.join("ahri/10.bin"), b"ahri");
        write_file(&f.mods.join("map/30.bin"), b"map");
        // A directory where the archive should go makes the final rename fail.
        std::fs::create_dir_all(f.overlay.join("DATA/FINAL/Maps/Map11.wad.client/blocker"))
            .unwrap();

        let mut engine = f.engine();
        let report = engine.auto_write().unwrap();
        assert_eq!(report.archives_written.len(), 1);
        assert_eq!(report.archives_failed.len(), 1);
        assert_eq!(
            report.archives_failed[0].path,
            Utf8PathBuf::from("DATA/FINAL/Maps/Map11.wad.client")
        );
        assert!(report.has_failures());
        assert_eq!(engine.stage(StageKind::Overlay), StageState::Stale);
        assert_eq!(engine.stage(StageKind::MergePlan), StageState::Fresh);
    }

    #[test]
    fn test_conflicts_and_dropped_mods() {
        let f = fixture();
        write_file(&f.mods.join("a/10.bin"), b"a");
        write_file(&f.mods.join("b/10.bin"), b"b");
        write_file(&f.mods.join("orphan/ff.bin"), b"new");

        let mut engine = f.engine();
        let report = engine.auto_write().unwrap();
        assert_eq!(report.dropped_mods, vec!["orphan".to_string()]);

        let conflicts = engine.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].key, 0x10);
        assert_eq!(conflicts[0].winner.as_deref(), Some("a"));
    }

    #[test]
    fn test_restored_engine_is_noop() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"replaced");
        let state_path = f.dir.path.join("engine.state");

        let mut engine = f.engine();
        engine.force_write().unwrap();
        engine.save_state(&state_path).unwrap();

        let mut restored = OverlayEngine::restore(
            f.game.clone(),
            f.mods.clone(),
            f.overlay.clone(),
            &state_path,
        );
        for kind in StageKind::ALL {
            assert_eq!(restored.stage(kind), StageState::Fresh);
        }
        assert_eq!(restored.plan(), engine.plan());
        assert_eq!(restored.game_index().key_lookup(), engine.game_index().key_lookup());

        let report = restored.auto_write().unwrap();
        assert!(report.stages_rebuilt.is_empty());
        assert!(report.is_noop());
    }

    #[test]
    fn test_restored_engine_reuses_indexes() {
        let f = fixture();
        write_file(&f.mods.join("ahri/10.bin"), b"ahri");
        write_file(&f.mods.join("map/30.bin"), b"map");
        let state_path = f.dir.path.join("engine.state");

        let mut engine = f.engine();
        engine.force_write().unwrap();
        engine.save_state(&state_path).unwrap();
        drop(engine);

        let mut restored = OverlayEngine::restore(
            f.game.clone(),
            f.mods.clone(),
            f.overlay.clone(),
            &state_path,
        );
        restored.set_disabled_mods(["map".to_string()].into());
        let report = restored.auto_write().unwrap();
        assert_eq!(
            report.stages_rebuilt,
            vec![StageKind::MergePlan, StageKind::Overlay]
        );
        assert_eq!(
            report.files_pruned,
            vec![f.overlay.join("DATA/FINAL/Maps/Map11.wad.client")]
        );
    }

    #[test]
    fn test_restore_ignores_foreign_or_missing_state() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"x");
        let state_path = f.dir.path.join("engine.state");

        let fresh = OverlayEngine::restore(
            f.game.clone(),
            f.mods.clone(),
            f.overlay.clone(),
            &state_path,
        );
        assert_eq!(fresh.stage(StageKind::GameIndex), StageState::Stale);

        let mut engine = f.engine();
        engine.force_write().unwrap();
        engine.save_state(&state_path).unwrap();

        let other = OverlayEngine::restore(
            f.game.clone(),
            f.mods.clone(),
            f.dir.path.join("elsewhere"),
            &state_path,
        );
        for kind in StageKind::ALL {
            assert_eq!(other.stage(kind), StageState::Stale);
        }
        assert!(other.plan().is_empty());

        write_file(&state_path, b"garbage");
        let garbage = OverlayEngine::restore(
            f.game.clone(),
            f.mods.clone(),
            f.overlay.clone(),
            &state_path,
        );
        assert_eq!(garbage.stage(StageKind::Overlay), StageState::Stale);
    }

    #[test]
    fn test_refresh_plan_does_not_write() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"x");

        let mut engine = f.engine();
        let plan = engine.refresh_plan().unwrap();
        assert_eq!(plan.archives().len(), 1);
        assert!(!f.overlay.exists());
        assert_eq!(engine.stage(StageKind::Overlay), StageState::Stale);
    }

    #[test]
    fn test_progress_events() {
        let f = fixture();
        write_file(&f.mods.join("skin/10.bin"), b"x");

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut engine = f
            .engine()
            .with_progress(move |p| sink.lock().unwrap().push(p.stage));
        engine.auto_write().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                OverlayStage::IndexingGame,
                OverlayStage::IndexingMods,
                OverlayStage::Planning,
                OverlayStage::WritingWad,
                OverlayStage::Pruning,
                OverlayStage::Complete,
            ]
        );
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = BuildReport {
            overlay_root: Utf8PathBuf::from("overlay"),
            stages_rebuilt: vec![StageKind::MergePlan],
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overlayRoot"], "overlay");
        assert_eq!(json["stagesRebuilt"][0], "mergePlan");
        assert!(json["filesPruned"].as_array().unwrap().is_empty());
    }
}
