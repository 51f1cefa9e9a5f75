//! Runs every requested seed for every requested profile.
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use rainfill_logic::{
    FillEngine, Generation, GenerationFailure, GenerationStage, ProfileId,
};

use crate::storage::DirSpoilerStore;

/// Trace lines kept from a failed run.
const FAILURE_TRACE_TAIL: usize = 12;

/// Outcome of one (profile, seed) run as it appears in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub profile: String,
    pub seed: u64,
    pub passed: bool,
    pub start: Option<String>,
    pub placed: usize,
    pub pre_opened: Vec<String>,
    pub force_opened: Vec<String>,
    pub rng_draws: u64,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub stage: GenerationStage,
    pub reason: String,
    pub available: usize,
    pub unreached: usize,
    pub discovered: Vec<String>,
    pub trace: Vec<String>,
}

impl RunRecord {
    fn from_result(
        profile: &ProfileId,
        seed: u64,
        result: &Result<Generation, GenerationFailure>,
        elapsed: Duration,
    ) -> Self {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match result {
            Ok(generation) => Self {
                profile: profile.to_string(),
                seed,
                passed: true,
                start: Some(generation.start.to_string()),
                placed: generation.assignments.len(),
                pre_opened: generation.pre_opened.iter().map(|g| g.name.clone()).collect(),
                force_opened: generation
                    .force_opened
                    .iter()
                    .map(|g| g.name.clone())
                    .collect(),
                rng_draws: generation.rng_draws,
                elapsed_ms,
                spoiler: None,
                failure: None,
            },
            Err(failure) => Self {
                profile: profile.to_string(),
                seed,
                passed: false,
                start: None,
                placed: 0,
                pre_opened: Vec::new(),
                force_opened: Vec::new(),
                rng_draws: 0,
                elapsed_ms,
                spoiler: None,
                failure: Some(FailureSummary::from(failure)),
            },
        }
    }
}

impl From<&GenerationFailure> for FailureSummary {
    fn from(failure: &GenerationFailure) -> Self {
        let skip = failure.trace.len().saturating_sub(FAILURE_TRACE_TAIL);
        Self {
            stage: failure.stage,
            reason: failure.reason.to_string(),
            available: failure.available,
            unreached: failure.unreached,
            discovered: failure.discovered.iter().map(ToString::to_string).collect(),
            trace: failure.trace[skip..].to_vec(),
        }
    }
}

/// Run `seeds` for each of `profiles` concurrently on the blocking pool.
/// Records come back ordered by profile (as given) and then seed (as given).
/// Successful runs are saved to the engine's spoiler store when it is enabled.
pub async fn run_batch(
    engine: &FillEngine<DirSpoilerStore>,
    spoilers_enabled: bool,
    profiles: &[ProfileId],
    seeds: &[u64],
    verbose: bool,
) -> Result<Vec<RunRecord>> {
    let mut tasks = JoinSet::new();
    for (profile_index, profile) in profiles.iter().enumerate() {
        let generator = engine
            .generator(profile)
            .with_context(|| format!("cannot build generator for {profile}"))?;
        for (seed_index, &seed) in seeds.iter().enumerate() {
            let generator = generator.clone();
            tasks.spawn(async move {
                let started = Instant::now();
                let result = generator.generate_async(seed).await;
                ((profile_index, seed_index), result, started.elapsed())
            });
        }
    }

    let mut finished = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        finished.push(joined.context("generation task panicked")?);
    }
    finished.sort_by_key(|(order, _, _)| *order);

    let mut records = Vec::with_capacity(finished.len());
    for ((profile_index, seed_index), result, elapsed) in finished {
        let profile = &profiles[profile_index];
        let seed = seeds[seed_index];
        let mut record = RunRecord::from_result(profile, seed, &result, elapsed);
        match &result {
            Ok(generation) => {
                log::info!(
                    "{profile} seed {seed}: placed {} items from {}",
                    record.placed,
                    generation.start
                );
                if spoilers_enabled {
                    let name = engine
                        .save_spoiler(generation)
                        .with_context(|| format!("failed to save spoiler for {profile}-{seed}"))?;
                    record.spoiler = Some(name);
                }
            }
            Err(failure) => {
                log::warn!("{profile} seed {seed}: {failure}");
                if verbose {
                    eprintln!("{} {profile} seed {seed}: {failure}", "❌".red());
                }
            }
        }
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsCatalogLoader;
    use rainfill_logic::GeneratorConfig;

    fn engine() -> FillEngine<DirSpoilerStore> {
        FillEngine::load(
            &FsCatalogLoader::default(),
            GeneratorConfig::sample().unwrap(),
            DirSpoilerStore::new(None),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn batch_is_ordered_and_deterministic() {
        let engine = engine();
        let profiles = [ProfileId::new("Saint"), ProfileId::new("White")];
        let seeds = [9, 2, 5];
        let first = run_batch(&engine, false, &profiles, &seeds, false)
            .await
            .unwrap();
        let second = run_batch(&engine, false, &profiles, &seeds, false)
            .await
            .unwrap();

        let order: Vec<(&str, u64)> = first
            .iter()
            .map(|record| (record.profile.as_str(), record.seed))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Saint", 9),
                ("Saint", 2),
                ("Saint", 5),
                ("White", 9),
                ("White", 2),
                ("White", 5)
            ]
        );
        assert!(first.iter().all(|record| record.passed));
        let draws = |records: &[RunRecord]| -> Vec<u64> {
            records.iter().map(|record| record.rng_draws).collect()
        };
        assert_eq!(draws(&first), draws(&second));
    }

    #[tokio::test]
    async fn unknown_profile_is_an_error() {
        let engine = engine();
        let err = run_batch(&engine, false, &[ProfileId::new("Nobody")], &[1], false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Nobody"));
    }
}
