//! Non-destructive WAD overlay builder for loose-file League of Legends mods.
//!
//! Mods are plain directories of replacement files. This crate merges them into
//! copies of the game's WAD archives written to a separate overlay directory,
//! leaving the game installation untouched. It provides:
//!
//! - **WAD v3.0 codec**: read a header and TOC, write a merged archive ([`wad`], [`wad_builder`])
//! - **Mod indexing**: hex-named and path-hashed files, content digests ([`mod_index`])
//! - **Cross-WAD matching**: one mod file lands in every archive that ships its key ([`plan`])
//! - **Incremental rebuilds**: per-stage staleness tracking, saved across runs ([`state`], [`engine`])
//! - **Game directory discovery**: `.lnk` shortcuts and executable paths ([`shortcut`], [`league_path`])
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8PathBuf;
//! use lcs_overlay::OverlayEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let game_dir = Utf8PathBuf::from("C:/Riot Games/League of Legends/Game");
//! let mods_dir = Utf8PathBuf::from("mods");
//! let overlay_root = Utf8PathBuf::from("overlay");
//!
//! let mut engine = OverlayEngine::new(game_dir, mods_dir, overlay_root)
//!     .with_progress(|progress| {
//!         println!("Stage: {:?}, Progress: {}/{}",
//!             progress.stage, progress.current, progress.total);
//!     });
//!
//! let report = engine.force_write()?;
//! println!("Wrote {} WADs, pruned {}",
//!     report.archives_written.len(), report.files_pruned.len());
//!
//! // Later calls only redo what changed on disk.
//! engine.auto_write()?;
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod game_index;
pub mod league_path;
pub mod mod_index;
pub mod plan;
pub mod shortcut;
pub mod state;
pub mod utils;
pub mod wad;
pub mod wad_builder;

#[cfg(test)]
mod test_utils;

// Re-export main types
pub use engine::{BuildReport, OverlayEngine, OverlayProgress, OverlayStage};
pub use error::{Error, Result};
pub use game_index::GameIndex;
pub use league_path::{is_valid_league_path, verify_game_dir};
pub use mod_index::{scan_mod_dir, ModFileEntry, ModIndex};
pub use plan::{find_conflicts, Conflict, MergePlan};
pub use shortcut::{resolve_shortcut, ResolutionFailure};
pub use state::{EngineState, StageKind, StageState};
pub use wad::{Wad, WadEntry};
pub use wad_builder::write_merged_wad;
