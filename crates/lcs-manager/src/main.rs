use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    apply_mods, check_mods, disable_mod, enable_mod, list_mods, reset_config, set_game_dir,
    set_mods_dir, set_overlay_dir, show_config, sync_mods, watch_mods, OutputFormat,
};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utils::config::{self, PathOverrides};

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output from the overlay engine
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game directory, executable or shortcut (overrides the configuration)
    #[arg(long, global = true)]
    game_dir: Option<String>,

    /// Directory holding one subdirectory per mod (overrides the configuration)
    #[arg(long, global = true)]
    mods_dir: Option<String>,

    /// Directory the overlay is written to (overrides the configuration)
    #[arg(long, global = true)]
    overlay_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rebuild the whole overlay from scratch
    Apply {
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update the overlay, redoing only what changed on disk
    Sync {
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep the overlay up to date until interrupted
    Watch {
        /// Seconds between checks
        #[arg(short, long, default_value_t = 2)]
        interval: u64,
    },
    /// Report conflicts between mods and what the overlay would contain
    Check,
    /// List, enable or disable mods
    Mods {
        #[command(subcommand)]
        command: ModsCommands,
    },
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModsCommands {
    /// List installed mods and whether they are enabled
    List,
    /// Enable a mod by directory name
    Enable { name: String },
    /// Disable a mod by directory name
    Disable { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set the game directory (a directory, an executable or a .lnk shortcut)
    SetGameDir { path: String },
    /// Set the overlay directory
    SetOverlayDir { path: String },
    /// Set the mods directory
    SetModsDir { path: String },
    /// Reset the configuration to defaults
    Reset,
}

fn parse_args() -> Result<Args> {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).into_diagnostic()
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "lcs_manager=debug,lcs_overlay=debug"
    } else {
        "lcs_manager=info,lcs_overlay=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn main() -> Result<()> {
    let args = parse_args()?;
    init_logging(args.verbose);

    let overrides = PathOverrides {
        game_dir: args.game_dir,
        mods_dir: args.mods_dir,
        overlay_dir: args.overlay_dir,
    };
    let paths = config::load_config().resolve(&overrides);

    match args.command {
        Commands::Apply { json } => apply_mods(&paths, OutputFormat::from_json_flag(json)),
        Commands::Sync { json } => sync_mods(&paths, OutputFormat::from_json_flag(json)),
        Commands::Watch { interval } => watch_mods(&paths, interval),
        Commands::Check => check_mods(&paths),
        Commands::Mods { command } => match command {
            ModsCommands::List => list_mods(&paths),
            ModsCommands::Enable { name } => enable_mod(&paths, &name),
            ModsCommands::Disable { name } => disable_mod(&paths, &name),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&paths),
            ConfigCommands::SetGameDir { path } => set_game_dir(path),
            ConfigCommands::SetOverlayDir { path } => set_overlay_dir(path),
            ConfigCommands::SetModsDir { path } => set_mods_dir(path),
            ConfigCommands::Reset => reset_config(),
        },
    }
}
