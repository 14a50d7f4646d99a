use super::load_selection;
use crate::errors::CliError;
use crate::utils::config::ResolvedPaths;
use crate::utils::selection;
use colored::Colorize;
use lcs_overlay::mod_index::index_mods_root;
use miette::Result;

pub fn list_mods(paths: &ResolvedPaths) -> Result<()> {
    let disabled = load_selection(paths)?;
    let mods = index_mods_root(&paths.mods_dir);

    println!();
    println!(
        "  {} {}",
        "Mods directory:".bright_white().bold(),
        paths.mods_dir
    );
    println!();

    if mods.is_empty() {
        println!("  {}", "(no mods installed)".bright_yellow());
        println!();
        return Ok(());
    }

    for (name, files) in &mods {
        let status = if disabled.contains(name) {
            "✗".bright_red()
        } else {
            "✓".bright_green()
        };
        println!(
            "  {} {} {}",
            status,
            name.bright_white(),
            format!("({} files)", files.len()).dimmed()
        );
    }
    println!();
    Ok(())
}

pub fn enable_mod(paths: &ResolvedPaths, name: &str) -> Result<()> {
    set_enabled(paths, name, true)
}

pub fn disable_mod(paths: &ResolvedPaths, name: &str) -> Result<()> {
    set_enabled(paths, name, false)
}

fn set_enabled(paths: &ResolvedPaths, name: &str, enabled: bool) -> Result<()> {
    if !paths.mods_dir.join(name).as_std_path().is_dir() {
        return Err(CliError::mod_not_found(name, paths.mods_dir.clone()).into());
    }

    let mut disabled = load_selection(paths)?;
    let changed = if enabled {
        disabled.remove(name)
    } else {
        disabled.insert(name.to_string())
    };
    if changed {
        selection::save_disabled(&paths.disabled_list, &disabled).map_err(CliError::from)?;
    }

    let (mark, verb) = if enabled {
        ("✓".bright_green(), "enabled")
    } else {
        ("✗".bright_red(), "disabled")
    };
    println!("{} {} {}", mark, name.bright_white().bold(), verb);
    if changed {
        println!(
            "  {}",
            "Run 'lcs-manager sync' to update the overlay".bright_cyan()
        );
    }
    Ok(())
}
