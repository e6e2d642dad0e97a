//! Convert CSV score tables into dataset JSON
//!
//! Reads `(drug, effect, score)` rows, title-cases names, groups them by
//! drug and writes the `[{drugName, sideEffects}]` array the API loads.
//!
//! Usage:
//!   cargo run --bin convert_scores_csv -- <scores|fda> <input.csv> <output.json>

use anyhow::{bail, Context, Result};
use drug_effects_rust::{AssociationIndex, Dataset, ScoreColumns};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "drug_effects_rust=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [layout, input, output] = args.as_slice() else {
        bail!("usage: convert_scores_csv <scores|fda> <input.csv> <output.json>");
    };

    let columns = match layout.as_str() {
        "scores" => ScoreColumns::SIDE_EFFECT_SCORES,
        "fda" => ScoreColumns::FDA_REACTIONS,
        other => bail!("unknown table layout {:?} (expected 'scores' or 'fda')", other),
    };

    let start = Instant::now();
    let dataset = Dataset::from_score_table(input, &columns)
        .with_context(|| format!("Failed to convert {}", input))?;

    let json = dataset.to_json_pretty().context("Failed to serialize dataset")?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output))?;

    // Same checks the API runs at startup
    let stats = AssociationIndex::build(&dataset).stats();

    println!("Converted {} -> {} ({:.3} ms)", input, output, start.elapsed().as_secs_f64() * 1000.0);
    println!("  Drugs:        {}", stats.drugs);
    println!("  Side effects: {}", stats.effects);
    println!("  Scores:       {}", stats.associations);

    Ok(())
}
