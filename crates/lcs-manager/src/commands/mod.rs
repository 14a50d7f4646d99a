mod apply;
mod check;
mod config;
mod mods;

pub use apply::*;
pub use check::*;
pub use config::*;
pub use mods::*;

use crate::errors::CliError;
use crate::utils::config::ResolvedPaths;
use crate::utils::selection;
use camino::{Utf8Path, Utf8PathBuf};
use lcs_overlay::{verify_game_dir, OverlayEngine};
use miette::Result;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Verify the configured game directory, accepting executables and shortcuts.
pub fn require_game_dir(paths: &ResolvedPaths) -> Result<Utf8PathBuf> {
    let candidate = paths.game_dir.as_deref().ok_or(CliError::GameDirNotSet)?;
    verify_game_dir(Utf8Path::new(candidate))
        .map_err(|e| CliError::invalid_game_dir(candidate, e).into())
}

/// Restore the engine saved by the previous run, with the persisted selection applied.
pub(crate) fn build_engine(paths: &ResolvedPaths) -> Result<OverlayEngine> {
    let game_dir = require_game_dir(paths)?;
    let mut engine = OverlayEngine::restore(
        game_dir,
        paths.mods_dir.clone(),
        paths.overlay_dir.clone(),
        &paths.state_file,
    );
    engine.set_disabled_mods(load_selection(paths)?);
    Ok(engine)
}

/// Save the engine for the next run.
pub(crate) fn save_engine(engine: &OverlayEngine, paths: &ResolvedPaths) -> Result<()> {
    engine
        .save_state(&paths.state_file)
        .map_err(|e| CliError::from(e).into())
}

pub(crate) fn load_selection(paths: &ResolvedPaths) -> Result<std::collections::BTreeSet<String>> {
    selection::load_disabled(&paths.disabled_list).map_err(|e| CliError::from(e).into())
}
