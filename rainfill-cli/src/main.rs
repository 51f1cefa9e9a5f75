mod reports;
mod runner;
mod seeds;
mod storage;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rainfill_logic::{FillEngine, GeneratorConfig, ProfileId};
use runner::{RunRecord, run_batch};
use seeds::{resolve_seed_inputs, split_csv};
use storage::{DirSpoilerStore, FsCatalogLoader};

#[derive(Debug, Parser)]
#[command(name = "rainfill", version)]
#[command(about = "Logic-consistent item placement for randomizer seeds")]
struct Args {
    /// World catalog JSON (defaults to the bundled sample world)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Overlay registrations JSON applied on top of the catalog
    #[arg(long)]
    overlays: Option<PathBuf>,

    /// Generator configuration JSON (defaults to the bundled sample config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Profiles to run (comma-separated, or `all`)
    #[arg(long, default_value = "White")]
    profiles: String,

    /// List the catalog's profiles and exit
    #[arg(long)]
    list_profiles: bool,

    /// Seeds to run (comma-separated integers or ranges like `1..10`)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Directory to write spoiler logs for successful runs
    #[arg(long)]
    spoiler_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    let loader = FsCatalogLoader {
        catalog: args.catalog.clone(),
        overlays: args.overlays.clone(),
    };
    let spoilers = DirSpoilerStore::new(args.spoiler_dir.clone());
    let spoilers_enabled = spoilers.is_enabled();
    let engine =
        FillEngine::load(&loader, config, spoilers).context("failed to load world content")?;

    if maybe_list_profiles(&args, &engine)? {
        return Ok(());
    }

    if args.report == "console" && args.output.is_none() {
        announce_banner();
    }

    let start_time = Instant::now();
    let profiles = expand_profiles(&args.profiles, &engine.catalog().profiles)?;
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    log::info!(
        "running {} seeds across {} profiles",
        seeds.len(),
        profiles.len()
    );

    let records = run_batch(&engine, spoilers_enabled, &profiles, &seeds, args.verbose).await?;

    write_reports(&args, &records, start_time)?;

    if records.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            GeneratorConfig::from_json(&text)
                .with_context(|| format!("invalid configuration in {}", path.display()))
        }
        None => GeneratorConfig::sample().context("bundled configuration is invalid"),
    }
}

fn maybe_list_profiles<S>(args: &Args, engine: &FillEngine<S>) -> Result<bool>
where
    S: rainfill_logic::SpoilerStore,
{
    if !args.list_profiles {
        return Ok(false);
    }
    let catalog = engine.catalog();
    let mut out = open_output(args.output.as_deref())?;
    writeln!(out, "Available profiles:")?;
    for profile in &catalog.profiles {
        let start = catalog
            .default_starts
            .get(profile)
            .map_or("-", |region| region.as_str());
        let name = profile.as_str();
        writeln!(out, "  {name:12} - starts in {start}")?;
    }
    out.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🌧️  Rainfill Progression Fill".bright_cyan().bold());
    println!("{}", "==============================".cyan());
}

fn expand_profiles(input: &str, known: &[ProfileId]) -> Result<Vec<ProfileId>> {
    let mut profiles: Vec<ProfileId> = Vec::new();
    for token in split_csv(input) {
        if token.eq_ignore_ascii_case("all") {
            for profile in known {
                if !profiles.contains(profile) {
                    profiles.push(profile.clone());
                }
            }
            continue;
        }
        let Some(profile) = known
            .iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(&token))
        else {
            bail!("Unknown profile: {token}");
        };
        if !profiles.contains(profile) {
            profiles.push(profile.clone());
        }
    }
    if profiles.is_empty() {
        bail!("No profiles selected");
    }
    Ok(profiles)
}

fn write_reports(args: &Args, records: &[RunRecord], start_time: Instant) -> Result<()> {
    let mut out = open_output(args.output.as_deref())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(out.as_mut(), records)?,
        "markdown" => reports::generate_markdown_report(out.as_mut(), records)?,
        _ => reports::generate_console_report(
            out.as_mut(),
            records,
            start_time.elapsed(),
            args.verbose,
        )?,
    }

    out.flush()?;
    Ok(())
}

/// Report destination: the `--output` file when given, stdout otherwise.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout())));
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> Vec<ProfileId> {
        ["White", "Red", "Saint"].map(ProfileId::new).to_vec()
    }

    #[test]
    fn args_parse_defaults() {
        let args = Args::try_parse_from(["rainfill"]).unwrap();
        assert_eq!(args.profiles, "White");
        assert_eq!(args.seeds, "1337");
        assert_eq!(args.report, "console");
        assert!(args.catalog.is_none());
        assert!(!args.list_profiles);
    }

    #[test]
    fn args_reject_unknown_report() {
        assert!(Args::try_parse_from(["rainfill", "--report", "csv"]).is_err());
    }

    #[test]
    fn profiles_expand_all_and_match_case_insensitively() {
        let profiles = expand_profiles("saint,all", &known()).unwrap();
        assert_eq!(
            profiles,
            ["Saint", "White", "Red"].map(ProfileId::new).to_vec()
        );
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = expand_profiles("Hunter", &known()).unwrap_err();
        assert!(err.to_string().contains("Hunter"));
        assert!(expand_profiles(" , ", &known()).is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/config.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.json"));
    }

    #[test]
    fn bundled_config_loads_by_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config.options.get("passage_checks"), Some(&true));
    }

    #[test]
    fn output_file_receives_buffered_report() {
        let path = std::env::temp_dir().join(format!(
            "rainfill-main-output-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        let mut out = open_output(Some(path.as_path())).unwrap();
        writeln!(out, "Available profiles:").unwrap();
        out.flush().unwrap();
        drop(out);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Available profiles:\n"
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unwritable_output_path_is_reported() {
        let Err(err) = open_output(Some(Path::new("/nonexistent/dir/report.json"))) else {
            panic!("expected an error for a missing directory");
        };
        assert!(err.to_string().contains("/nonexistent/dir/report.json"));
    }
}
