use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use tpi_engine::config::{ScoringConfig, load_config};
use tpi_engine::dataset;
use tpi_engine::derive::derive_metrics;
use tpi_engine::record::RowId;
use tpi_engine::win_prob::predict_lineup_matchup;

#[derive(Debug, serde::Deserialize)]
struct MatchupCase {
    dataset: PathBuf,
    lineup_a: Vec<usize>,
    lineup_b: Vec<usize>,
    #[serde(default)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/matchup_case.json"));

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let case: MatchupCase = serde_json::from_str(&raw).context("parse matchup case")?;

    // Paths inside the case are relative to the case file.
    let base = path.parent().map(PathBuf::from).unwrap_or_default();
    let config = match &case.config {
        Some(p) => load_config(&base.join(p))?,
        None => ScoringConfig::default(),
    };
    let table = dataset::load_table(&base.join(&case.dataset))?;
    let derivation = derive_metrics(&table, &config)?;

    let lineup_a: Vec<RowId> = case.lineup_a.into_iter().map(RowId).collect();
    let lineup_b: Vec<RowId> = case.lineup_b.into_iter().map(RowId).collect();
    let matchup = predict_lineup_matchup(&derivation.table, &lineup_a, &lineup_b)?;

    println!("Lineup A avg TPI: {:.2}", matchup.avg_tpi_a);
    println!("Lineup B avg TPI: {:.2}", matchup.avg_tpi_b);
    println!("A win probability: {:.1}%", matchup.p_win_a);

    Ok(())
}
