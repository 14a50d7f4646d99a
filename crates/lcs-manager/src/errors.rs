use camino::Utf8PathBuf;
use lcs_overlay::ResolutionFailure;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Game directory is not set")]
    #[diagnostic(
        code(config::game_dir_not_set),
        help("Run 'lcs-manager config set-game-dir <path>' or pass --game-dir")
    )]
    GameDirNotSet,

    #[error("Invalid game directory: {path}")]
    #[diagnostic(
        code(config::invalid_game_dir),
        help("Point to the folder containing 'League of Legends.exe', the executable itself, or a shortcut to it")
    )]
    InvalidGameDir {
        path: String,
        #[source]
        source: ResolutionFailure,
    },

    #[error("Mod not found: {name}")]
    #[diagnostic(
        code(mods::not_found),
        help("Mods are the subdirectories of {mods_dir}; run 'lcs-manager mods list' to see them")
    )]
    ModNotFound { name: String, mods_dir: Utf8PathBuf },

    #[error("{count} conflicting file(s) between enabled mods")]
    #[diagnostic(
        code(mods::conflicts),
        severity(Warning),
        help("Disable one of the contributing mods, or accept that the first mod in name order wins")
    )]
    ConflictsFound { count: usize },

    #[error("{count} overlay archive(s) could not be written")]
    #[diagnostic(
        code(overlay::write_failed),
        help("The previous overlay files were kept; run 'lcs-manager sync' to retry")
    )]
    WadsFailed { count: usize },

    #[error("Overlay build failed")]
    #[diagnostic(code(overlay::failed))]
    Overlay {
        #[from]
        source: lcs_overlay::Error,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn invalid_game_dir(path: impl Into<String>, source: ResolutionFailure) -> Self {
        Self::InvalidGameDir {
            path: path.into(),
            source,
        }
    }

    pub fn mod_not_found(name: impl Into<String>, mods_dir: Utf8PathBuf) -> Self {
        Self::ModNotFound {
            name: name.into(),
            mods_dir,
        }
    }
}
