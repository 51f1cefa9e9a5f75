use anyhow::{Context, Result, bail};
use std::collections::HashSet;

/// Seed used when no seed tokens are given.
pub const DEFAULT_SEED: u64 = 1337;

/// Upper bound on how many seeds a single range may expand to.
const MAX_RANGE_LEN: u64 = 100_000;

/// Split a comma-separated argument into trimmed, non-empty tokens.
#[must_use]
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Resolve CLI seed tokens into a list of seeds.
///
/// Supports literal integers (negative values use their magnitude), half-open
/// ranges `a..b`, and inclusive ranges `a..=b`. Duplicates are dropped while
/// keeping first-seen order.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut pending: Vec<u64> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            pending.extend(expand_range(token, start, end)?);
            continue;
        }

        pending.push(parse_seed(token)?);
    }

    let mut seen = HashSet::new();
    let mut deduped: Vec<u64> = pending
        .into_iter()
        .filter(|seed| seen.insert(*seed))
        .collect();

    if deduped.is_empty() {
        deduped.push(DEFAULT_SEED);
    }

    Ok(deduped)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    bail!("Unrecognized seed token: {token}");
}

fn expand_range(token: &str, start: &str, end: &str) -> Result<Vec<u64>> {
    let (end, inclusive) = match end.strip_prefix('=') {
        Some(end) => (end, true),
        None => (end, false),
    };
    let start: u64 = start
        .trim()
        .parse()
        .with_context(|| format!("invalid range start in `{token}`"))?;
    let end: u64 = end
        .trim()
        .parse()
        .with_context(|| format!("invalid range end in `{token}`"))?;
    let last = if inclusive {
        end
    } else if end > start {
        end - 1
    } else {
        bail!("empty seed range: {token}");
    };
    if last < start {
        bail!("empty seed range: {token}");
    }
    if last - start >= MAX_RANGE_LEN {
        bail!("seed range {token} expands to more than {MAX_RANGE_LEN} seeds");
    }
    Ok((start..=last).collect())
}
