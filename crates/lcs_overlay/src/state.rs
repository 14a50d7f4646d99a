//! Per-stage rebuild state.
//!
//! The engine's pipeline has four stages, each tracked by a [`Stage`]:
//!
//! ```text
//! GameIndex ─┐
//!            ├─> MergePlan ──> Overlay
//! ModIndex ──┘
//! ```
//!
//! A stage is [`Fresh`](StageState::Fresh) when its cached output matches the
//! last observed staleness signal, [`Stale`](StageState::Stale) when it must be
//! recomputed, and [`Rebuilding`](StageState::Rebuilding) while that happens.
//! Rebuilding a stage invalidates every stage downstream of it.
//!
//! [`EngineState`] bundles the stages with the cached outputs they describe, so
//! an engine can be saved after a build and restored by the next process. It is
//! stored as MessagePack:
//!
//! ```text
//! { version, gameDir, modsDir, overlayRoot, disabled, stages, gameIndex, mods, plan }
//! ```

use crate::error::Result;
use crate::game_index::GameIndex;
use crate::mod_index::ModIndex;
use crate::plan::MergePlan;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;

/// Schema version of [`EngineState`]. A saved state with another version is discarded.
pub const STATE_VERSION: u32 = 1;

/// Rebuild state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageState {
    Fresh,
    Stale,
    Rebuilding,
}

/// The pipeline stages, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageKind {
    GameIndex,
    ModIndex,
    MergePlan,
    Overlay,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::GameIndex,
        StageKind::ModIndex,
        StageKind::MergePlan,
        StageKind::Overlay,
    ];

    /// Stages whose output is derived from this one.
    pub fn downstream(self) -> &'static [StageKind] {
        match self {
            StageKind::GameIndex | StageKind::ModIndex => {
                &[StageKind::MergePlan, StageKind::Overlay]
            }
            StageKind::MergePlan => &[StageKind::Overlay],
            StageKind::Overlay => &[],
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::GameIndex => "game index",
            StageKind::ModIndex => "mod index",
            StageKind::MergePlan => "merge plan",
            StageKind::Overlay => "overlay",
        };
        f.write_str(name)
    }
}

/// State plus the staleness signal recorded at the last successful rebuild.
///
/// The signal is a modification time in milliseconds; `None` means the tracked
/// path did not exist, which compares equal to itself like any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    state: StageState,
    signal: Option<u64>,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            state: StageState::Stale,
            signal: None,
        }
    }
}

impl Stage {
    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn signal(&self) -> Option<u64> {
        self.signal
    }

    pub fn is_fresh(&self) -> bool {
        self.state == StageState::Fresh
    }

    /// Compare a live signal with the recorded one. Fresh -> Stale on change.
    pub fn observe(&mut self, signal: Option<u64>) {
        if self.state == StageState::Fresh && self.signal != signal {
            self.state = StageState::Stale;
        }
    }

    /// Stale -> Rebuilding. Returns `false` (and does nothing) from any other state.
    pub fn begin(&mut self) -> bool {
        if self.state != StageState::Stale {
            return false;
        }
        self.state = StageState::Rebuilding;
        true
    }

    /// Rebuilding -> Fresh, recording the signal the rebuilt output corresponds to.
    pub fn finish(&mut self, signal: Option<u64>) {
        if self.state == StageState::Rebuilding {
            self.state = StageState::Fresh;
            self.signal = signal;
        }
    }

    /// Rebuilding -> Stale, keeping the previous signal.
    pub fn abort(&mut self) {
        if self.state == StageState::Rebuilding {
            self.state = StageState::Stale;
        }
    }

    /// Any -> Stale.
    pub fn invalidate(&mut self) {
        self.state = StageState::Stale;
    }
}

/// The four stages of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stages {
    game_index: Stage,
    mod_index: Stage,
    merge_plan: Stage,
    overlay: Stage,
}

impl Stages {
    pub fn get(&self, kind: StageKind) -> &Stage {
        match kind {
            StageKind::GameIndex => &self.game_index,
            StageKind::ModIndex => &self.mod_index,
            StageKind::MergePlan => &self.merge_plan,
            StageKind::Overlay => &self.overlay,
        }
    }

    pub fn get_mut(&mut self, kind: StageKind) -> &mut Stage {
        match kind {
            StageKind::GameIndex => &mut self.game_index,
            StageKind::ModIndex => &mut self.mod_index,
            StageKind::MergePlan => &mut self.merge_plan,
            StageKind::Overlay => &mut self.overlay,
        }
    }

    /// Mark `kind` rebuilt and invalidate everything downstream of it.
    pub fn finish(&mut self, kind: StageKind, signal: Option<u64>) {
        self.get_mut(kind).finish(signal);
        for &next in kind.downstream() {
            self.get_mut(next).invalidate();
        }
    }

    pub fn invalidate_all(&mut self) {
        for kind in StageKind::ALL {
            self.get_mut(kind).invalidate();
        }
    }

    /// Roll back any stage left mid-rebuild.
    pub fn settle(&mut self) {
        for kind in StageKind::ALL {
            self.get_mut(kind).abort();
        }
    }
}

/// Everything an [`OverlayEngine`](crate::engine::OverlayEngine) needs to resume
/// without re-reading unchanged inputs.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub version: u32,
    pub game_dir: Utf8PathBuf,
    pub mods_dir: Utf8PathBuf,
    pub overlay_root: Utf8PathBuf,
    pub disabled: BTreeSet<String>,
    pub stages: Stages,
    pub game_index: GameIndex,
    pub mods: BTreeMap<String, ModIndex>,
    pub plan: MergePlan,
}

impl EngineState {
    /// A state with every stage stale and nothing cached.
    pub fn new(game_dir: Utf8PathBuf, mods_dir: Utf8PathBuf, overlay_root: Utf8PathBuf) -> Self {
        Self {
            version: STATE_VERSION,
            game_dir,
            mods_dir,
            overlay_root,
            ..Default::default()
        }
    }

    /// Load a saved state.
    ///
    /// Returns `Ok(None)` if the file doesn't exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the state file
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }

        let contents = std::fs::read(path.as_std_path())?;
        let mut state: Self = rmp_serde::from_slice(&contents)?;
        state.stages.settle();
        Ok(Some(state))
    }

    /// Save the state, replacing any previous file only once the new one is complete.
    ///
    /// Creates parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_str().is_empty() => p,
            _ => Utf8Path::new("."),
        };
        std::fs::create_dir_all(parent.as_std_path())?;

        let contents = rmp_serde::to_vec_named(self)?;
        let mut file = tempfile::NamedTempFile::new_in(parent.as_std_path())?;
        file.write_all(&contents)?;
        file.persist(path.as_std_path())?;

        tracing::debug!("Saved engine state to '{}' ({} bytes)", path, contents.len());
        Ok(())
    }

    /// Whether this state was saved for the same version and directories.
    pub fn matches(
        &self,
        game_dir: &Utf8Path,
        mods_dir: &Utf8Path,
        overlay_root: &Utf8Path,
    ) -> bool {
        self.version == STATE_VERSION
            && self.game_dir.as_path() == game_dir
            && self.mods_dir.as_path() == mods_dir
            && self.overlay_root.as_path() == overlay_root
    }
}
