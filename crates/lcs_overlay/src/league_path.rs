//! Game installation path validation.

use crate::shortcut::{resolve_shortcut, ResolutionFailure};
use camino::{Utf8Path, Utf8PathBuf};

/// File name of the game executable inside the game directory.
pub const GAME_EXECUTABLE: &str = "League of Legends.exe";

/// Validates if a path points to a valid League of Legends executable.
pub fn is_valid_league_path(path: &Utf8Path) -> bool {
    if !path.exists() {
        return false;
    }
    if let Some(file_name) = path.file_name() {
        return file_name == GAME_EXECUTABLE;
    }
    false
}

/// Turn a user-supplied location into the game directory.
///
/// Accepts the game directory itself, the installation root containing `Game/`,
/// the path of an executable inside either, or a `.lnk` shortcut to any of those.
/// The result uses forward slashes.
pub fn verify_game_dir(candidate: &Utf8Path) -> Result<Utf8PathBuf, ResolutionFailure> {
    let mut dir = if has_extension(candidate, "lnk") {
        normalize(&resolve_shortcut(candidate)?)
    } else {
        normalize(candidate.as_str())
    };

    if has_extension(&dir, "exe") {
        dir = dir.parent().map(Utf8Path::to_path_buf).unwrap_or_default();
    }

    let nested = dir.join("Game");
    if is_valid_league_path(&nested.join(GAME_EXECUTABLE)) {
        dir = nested;
    }

    if is_valid_league_path(&dir.join(GAME_EXECUTABLE)) {
        tracing::debug!("Verified game directory '{}'", dir);
        Ok(dir)
    } else {
        Err(ResolutionFailure::NotAGameDirectory(dir))
    }
}

fn has_extension(path: &Utf8Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn normalize(path: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(path.replace('\\', "/"))
        .components()
        .collect()
}
