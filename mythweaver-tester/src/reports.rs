use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::autoplay::RunSummary;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    runs: &'a [RunSummary],
    victories: usize,
    violations: usize,
}

pub fn generate_console_report(
    writer: &mut dyn Write,
    runs: &[RunSummary],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Playthrough Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "======================".cyan())?;

    let total = runs.len();
    let victories = runs.iter().filter(|r| r.won()).count();
    let failed = runs.iter().filter(|r| !r.passed()).count();
    writeln!(writer, "Runs: {total}")?;
    writeln!(writer, "Victories: {}", victories.to_string().green())?;
    writeln!(writer, "Invariant failures: {}", failed.to_string().red())?;
    if let Some(best) = runs.iter().max_by_key(|r| r.total_score) {
        writeln!(
            writer,
            "Best score: {} (seed {})",
            best.total_score.to_string().bold(),
            best.seed
        )?;
    }
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for run in runs {
        let status = if run.passed() {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            writer,
            "{status} seed {} - {} in era {}",
            run.seed,
            run.outcome.bold(),
            run.era_reached
        )?;
        writeln!(
            writer,
            "   Score: {}  Crises cleared: {}  Weaves: {}  Myths: {}  Government: {}",
            run.total_score, run.crises_cleared, run.weaves, run.myths, run.government
        )?;
        if run.narrations > 0 {
            writeln!(writer, "   Narrations: {}", run.narrations)?;
        }
        for violation in &run.violations {
            writeln!(writer, "     • {}", violation.red())?;
        }
    }
    Ok(())
}

pub fn generate_json_report(writer: &mut dyn Write, runs: &[RunSummary]) -> Result<()> {
    let report = JsonReport {
        runs,
        victories: runs.iter().filter(|r| r.won()).count(),
        violations: runs.iter().map(|r| r.violations.len()).sum(),
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}
