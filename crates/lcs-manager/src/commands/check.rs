use super::{build_engine, save_engine};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::ResolvedPaths;
use colored::Colorize;
use miette::Result;

/// Index game and mods, then report the planned overlay and any conflicts.
pub fn check_mods(paths: &ResolvedPaths) -> Result<()> {
    let mut engine = build_engine(paths)?;
    let plan = engine.refresh_plan().map_err(CliError::from)?.clone();
    save_engine(&engine, paths)?;

    let enabled = engine
        .mods()
        .keys()
        .filter(|name| !engine.disabled_mods().contains(*name))
        .count();

    println!();
    println!(
        "  {} {} enabled, {} disabled",
        "Mods:".bright_white().bold(),
        enabled,
        engine.mods().len() - enabled
    );
    println!(
        "  {} {} archives, {} entries",
        "Plan:".bright_white().bold(),
        plan.archives().len(),
        plan.entry_count()
    );
    for (path, entries) in plan.archives() {
        println_pad!("{} {}", path, format!("({} entries)", entries.len()).dimmed());
    }

    for name in plan.dropped_mods() {
        println!(
            "  {} {} {}",
            "!".bright_yellow(),
            name.bright_white(),
            "does not touch any game archive and will be skipped".bright_yellow()
        );
    }

    let conflicts = engine.conflicts();
    if conflicts.is_empty() {
        println!();
        println!("{}", "✓ No conflicts between enabled mods".bright_green().bold());
        return Ok(());
    }

    println!();
    println!("  {}", "Conflicts:".bright_white().bold());
    for conflict in &conflicts {
        let Some(winner) = &conflict.winner else {
            println_pad!(
                "{:016x} {} {}",
                conflict.key,
                conflict.contributing_mods.join(", ").bright_red(),
                "(none applied)".dimmed()
            );
            continue;
        };
        let losers = conflict
            .contributing_mods
            .iter()
            .filter(|name| *name != winner)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        println_pad!(
            "{:016x} {} {} {}",
            conflict.key,
            winner.bright_green(),
            "overrides".dimmed(),
            losers.bright_red()
        );
    }
    println!();

    Err(CliError::ConflictsFound {
        count: conflicts.len(),
    }
    .into())
}
