use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use crate::runner::RunRecord;

/// Document written by the JSON report.
#[derive(Debug, Serialize)]
struct BatchReport<'a> {
    generated_at: String,
    total: usize,
    passed: usize,
    failed: usize,
    runs: &'a [RunRecord],
}

#[derive(Debug, Default)]
struct ProfileTally {
    passed: usize,
    failed: usize,
    draws: u64,
}

fn passed_count(records: &[RunRecord]) -> usize {
    records.iter().filter(|r| r.passed).count()
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (passed as f64 / total as f64) * 100.0
    }
}

fn tally(records: &[RunRecord]) -> BTreeMap<&str, ProfileTally> {
    let mut tallies: BTreeMap<&str, ProfileTally> = BTreeMap::new();
    for record in records {
        let entry = tallies.entry(record.profile.as_str()).or_default();
        if record.passed {
            entry.passed += 1;
            entry.draws += record.rng_draws;
        } else {
            entry.failed += 1;
        }
    }
    tallies
}

pub fn generate_console_report(
    out: &mut dyn Write,
    records: &[RunRecord],
    total_duration: Duration,
    verbose: bool,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Fill Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=======================".cyan())?;

    let total = records.len();
    let passed = passed_count(records);
    let failed = total - passed;

    writeln!(out, "Total runs: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", failed.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(passed, total))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for record in records {
        let status = if record.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(
            out,
            "{status} {} seed {}",
            record.profile.bold(),
            record.seed
        )?;
        if let Some(failure) = &record.failure {
            writeln!(out, "   Stage: {}", failure.stage)?;
            writeln!(out, "   Reason: {}", failure.reason.red())?;
            writeln!(
                out,
                "   Available: {}, unreached: {}",
                failure.available, failure.unreached
            )?;
            if verbose {
                writeln!(out, "   Discovered: {}", failure.discovered.join(", "))?;
                writeln!(out, "   Trace:")?;
                for line in &failure.trace {
                    writeln!(out, "     • {line}")?;
                }
            }
        } else {
            writeln!(
                out,
                "   Start: {}, placed: {}, draws: {}, time: {}ms",
                record.start.as_deref().unwrap_or("-"),
                record.placed,
                record.rng_draws,
                record.elapsed_ms
            )?;
            if !record.pre_opened.is_empty() {
                writeln!(out, "   Pre-opened: {}", record.pre_opened.join(", "))?;
            }
            if let Some(spoiler) = &record.spoiler {
                writeln!(out, "   Spoiler: {spoiler}")?;
            }
        }
    }

    let tallies = tally(records);
    if tallies.len() > 1 {
        writeln!(out)?;
        writeln!(out, "{}", "🧮 Per-profile Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        for (profile, tally) in &tallies {
            writeln!(
                out,
                "{profile:12} {}/{} passed",
                tally.passed,
                tally.passed + tally.failed
            )?;
        }
    }

    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, records: &[RunRecord]) -> Result<()> {
    let passed = passed_count(records);
    let report = BatchReport {
        generated_at: Utc::now().to_rfc3339(),
        total: records.len(),
        passed,
        failed: records.len() - passed,
        runs: records,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, records: &[RunRecord]) -> Result<()> {
    writeln!(out, "# Rainfill Fill Results\n")?;
    writeln!(
        out,
        "_Generated {}_\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    let total = records.len();
    let passed = passed_count(records);

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {total}")?;
    writeln!(out, "- **Passed**: {passed}")?;
    writeln!(out, "- **Failed**: {}", total - passed)?;
    writeln!(
        out,
        "- **Success rate**: {:.1}%\n",
        success_rate(passed, total)
    )?;

    writeln!(out, "## Profiles\n")?;
    writeln!(out, "| Profile | Passed | Failed | Mean draws |")?;
    writeln!(out, "|---|---|---|---|")?;
    for (profile, tally) in tally(records) {
        let mean = if tally.passed == 0 {
            0
        } else {
            tally.draws / tally.passed as u64
        };
        writeln!(
            out,
            "| {profile} | {} | {} | {mean} |",
            tally.passed, tally.failed
        )?;
    }
    writeln!(out)?;

    writeln!(out, "## Runs\n")?;
    for record in records {
        let status = if record.passed { "✅" } else { "❌" };
        writeln!(out, "### {status} {} seed {}\n", record.profile, record.seed)?;
        match &record.failure {
            Some(failure) => {
                writeln!(out, "- **Stage**: {}", failure.stage)?;
                writeln!(out, "- **Reason**: {}", failure.reason)?;
                writeln!(
                    out,
                    "- **Available / unreached**: {} / {}",
                    failure.available, failure.unreached
                )?;
                if !failure.trace.is_empty() {
                    writeln!(out, "- **Trace**:")?;
                    for line in &failure.trace {
                        writeln!(out, "  - {line}")?;
                    }
                }
            }
            None => {
                writeln!(
                    out,
                    "- **Start**: {}",
                    record.start.as_deref().unwrap_or("-")
                )?;
                writeln!(out, "- **Placed**: {}", record.placed)?;
                writeln!(out, "- **RNG draws**: {}", record.rng_draws)?;
                if !record.pre_opened.is_empty() {
                    writeln!(out, "- **Pre-opened**: {}", record.pre_opened.join(", "))?;
                }
                if !record.force_opened.is_empty() {
                    writeln!(
                        out,
                        "- **Force-opened**: {}",
                        record.force_opened.join(", ")
                    )?;
                }
            }
        }
        writeln!(out)?;
    }

    Ok(())
}
