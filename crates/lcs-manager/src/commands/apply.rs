use super::{build_engine, load_selection, save_engine, OutputFormat};
use crate::errors::CliError;
use crate::utils::config::ResolvedPaths;
use colored::Colorize;
use lcs_overlay::{BuildReport, OverlayEngine, OverlayStage};
use miette::{IntoDiagnostic, Result};
use std::time::Duration;

/// Rebuild every stage and rewrite the overlay.
pub fn apply_mods(paths: &ResolvedPaths, format: OutputFormat) -> Result<()> {
    let mut engine = with_console_progress(build_engine(paths)?, format);
    let report = engine.force_write().map_err(CliError::from)?;
    save_engine(&engine, paths)?;
    finish(&report, format)
}

/// Bring the overlay up to date, recomputing only stale stages.
pub fn sync_mods(paths: &ResolvedPaths, format: OutputFormat) -> Result<()> {
    let mut engine = with_console_progress(build_engine(paths)?, format);
    let report = engine.auto_write().map_err(CliError::from)?;
    save_engine(&engine, paths)?;
    finish(&report, format)
}

/// Keep one engine alive and sync every `interval_secs` until interrupted.
pub fn watch_mods(paths: &ResolvedPaths, interval_secs: u64) -> Result<()> {
    let mut engine = build_engine(paths)?;
    let interval = Duration::from_secs(interval_secs.max(1));

    println!(
        "{} {} {}",
        "Watching".bright_cyan().bold(),
        paths.mods_dir.as_str().bright_white(),
        format!("(every {}s, Ctrl+C to stop)", interval.as_secs()).dimmed()
    );

    loop {
        // The selection may be edited by another invocation while we run.
        match load_selection(paths) {
            Ok(disabled) => engine.set_disabled_mods(disabled),
            Err(e) => tracing::warn!("Failed to reload disabled mods: {}", e),
        }

        match engine.auto_write() {
            Ok(report) if report.is_noop() => {}
            Ok(report) => {
                print_report(&report);
                if let Err(e) = engine.save_state(&paths.state_file) {
                    tracing::warn!("Failed to save engine state: {}", e);
                }
            }
            Err(e) => tracing::warn!("Overlay update failed: {}", e),
        }

        std::thread::sleep(interval);
    }
}

fn with_console_progress(engine: OverlayEngine, format: OutputFormat) -> OverlayEngine {
    if format == OutputFormat::Json {
        return engine;
    }
    engine.with_progress(|progress| {
        if progress.stage == OverlayStage::WritingWad {
            println!(
                "  {} {} {}",
                "Writing".bright_cyan(),
                progress.current_file.as_deref().unwrap_or("unknown"),
                format!("({}/{})", progress.current, progress.total).dimmed()
            );
        }
    })
}

fn finish(report: &BuildReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Human => print_report(report),
    }

    if report.has_failures() {
        return Err(CliError::WadsFailed {
            count: report.archives_failed.len(),
        }
        .into());
    }
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!();
    if report.is_noop() {
        println!("{}", "✓ Overlay is already up to date".bright_green().bold());
    } else if report.has_failures() {
        println!("{}", "✗ Overlay partially updated".bright_red().bold());
    } else {
        println!("{}", "✓ Overlay updated".bright_green().bold());
    }
    println!();
    println!(
        "  {} {}",
        "Overlay:".bright_white().bold(),
        report.overlay_root.as_str().bright_green()
    );

    if !report.stages_rebuilt.is_empty() {
        let stages = report
            .stages_rebuilt
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {}", "Rebuilt:".bright_white().bold(), stages);
    }

    for written in &report.archives_written {
        println!(
            "  {} {} {}",
            "✓".bright_green(),
            written.path,
            format!(
                "({} entries, {} replaced, {} added)",
                written.entries, written.replaced, written.added
            )
            .dimmed()
        );
    }
    for failed in &report.archives_failed {
        println!("  {} {}: {}", "✗".bright_red(), failed.path, failed.message);
    }
    for pruned in &report.files_pruned {
        println!("  {} {}", "−".bright_yellow(), pruned);
    }
    for name in &report.dropped_mods {
        println!(
            "  {} {} {}",
            "!".bright_yellow(),
            name.bright_white(),
            "does not touch any game archive; its files were skipped".bright_yellow()
        );
    }

    println!();
    println!(
        "  {} {} ms",
        "Elapsed:".bright_white().bold(),
        report.elapsed_ms
    );
}
