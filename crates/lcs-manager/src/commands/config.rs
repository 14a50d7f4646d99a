use crate::errors::CliError;
use crate::utils::config::{self, AppConfig, ResolvedPaths};
use camino::Utf8Path;
use colored::Colorize;
use lcs_overlay::verify_game_dir;
use miette::Result;

fn update_config(update: impl FnOnce(&mut AppConfig)) -> Result<()> {
    let mut cfg = config::load_config();
    update(&mut cfg);
    config::save_config(&cfg).map_err(|e| miette::miette!("Failed to save config: {}", e))
}

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&str>, validator: impl Fn(&Utf8Path) -> bool) {
    match path {
        Some(p) => {
            let status = if validator(Utf8Path::new(p)) {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

pub fn show_config(paths: &ResolvedPaths) -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);

    print_path_config("game_dir", paths.game_dir.as_deref(), |p| {
        verify_game_dir(p).is_ok()
    });
    print_path_config("mods_dir", Some(paths.mods_dir.as_str()), |p| p.is_dir());
    print_path_config("overlay_dir", Some(paths.overlay_dir.as_str()), |p| p.is_dir());
    print_path_config("disabled_list", Some(paths.disabled_list.as_str()), |p| {
        p.is_file()
    });
    print_path_config("state_file", Some(paths.state_file.as_str()), |p| p.is_file());

    println!();
    Ok(())
}

pub fn set_game_dir(path: String) -> Result<()> {
    let game_dir = match verify_game_dir(Utf8Path::new(&path)) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!(
                "  {}",
                "The path must lead to the folder containing 'League of Legends.exe'."
                    .bright_yellow()
            );
            eprintln!(
                "  {}",
                "Example: C:\\Riot Games\\League of Legends\\Game".bright_yellow()
            );
            eprintln!();
            return Err(CliError::invalid_game_dir(path, e).into());
        }
    };

    update_config(|cfg| cfg.game_dir = Some(game_dir.to_string()))?;

    println!("{}", "✓ Game directory set successfully!".bright_green().bold());
    println!();
    println!(
        "  {} {}",
        "Path:".bright_white().bold(),
        game_dir.as_str().bright_green()
    );

    Ok(())
}

pub fn set_overlay_dir(path: String) -> Result<()> {
    update_config(|cfg| cfg.overlay_dir = Some(path.clone()))?;
    println!(
        "{} {}",
        "✓ Overlay directory set to".bright_green().bold(),
        path.bright_green()
    );
    Ok(())
}

pub fn set_mods_dir(path: String) -> Result<()> {
    if !Utf8Path::new(&path).is_dir() {
        eprintln!(
            "  {} {}",
            "!".bright_yellow(),
            "The directory does not exist yet; mods will be read from it once it does"
                .bright_yellow()
        );
    }
    update_config(|cfg| cfg.mods_dir = Some(path.clone()))?;
    println!(
        "{} {}",
        "✓ Mods directory set to".bright_green().bold(),
        path.bright_green()
    );
    Ok(())
}

pub fn reset_config() -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let default_cfg = AppConfig::default();
    config::save_config(&default_cfg)
        .map_err(|e| miette::miette!("Failed to reset config: {}", e))?;

    println!(
        "{}",
        "✓ Configuration reset to defaults".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), config_path);
    println!();
    println!(
        "  {}",
        "Run 'lcs-manager config set-game-dir <path>' to choose your League installation"
            .bright_cyan()
    );

    Ok(())
}
