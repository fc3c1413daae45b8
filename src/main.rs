use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use tpi_engine::aggregates::{PillarAverages, compute_team_average};
use tpi_engine::compare::compare_to_benchmark;
use tpi_engine::config::{MissingValuePolicy, ScoringConfig, load_config};
use tpi_engine::dataset;
use tpi_engine::derive::{EnrichedRow, EnrichedTable, derive_metrics};
use tpi_engine::export;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MissingValues {
    FixedDefault,
    ColumnMedian,
    Zero,
}

/// Player performance index over a table of player statistics
#[derive(Parser, Debug)]
#[command(name = "tpi_engine", version, about)]
struct Cli {
    /// Player statistics, CSV or spreadsheet (.xlsx, .xlsm, .xls, .ods)
    #[arg(long, env = "TPI_INPUT")]
    input: PathBuf,

    /// JSON scoring config; flags below override it
    #[arg(long, env = "TPI_CONFIG")]
    config: Option<PathBuf>,

    /// Missing sub-metric policy
    #[arg(long, env = "TPI_MISSING_VALUES", value_enum)]
    missing_values: Option<MissingValues>,

    /// Year contract lengths are measured from
    #[arg(long, env = "TPI_REFERENCE_YEAR")]
    reference_year: Option<i32>,

    /// Add Rank_Percentile
    #[arg(long, env = "TPI_PERCENTILE")]
    percentile: bool,

    /// Add Transfer_Prob (needs an `age` column)
    #[arg(long, env = "TPI_TRANSFER_PROB")]
    transfer_prob: bool,

    /// Compute the elite benchmark
    #[arg(long, env = "TPI_ELITE_BENCHMARK")]
    elite_benchmark: bool,

    /// Rows in the elite benchmark
    #[arg(long, env = "TPI_ELITE_TOP_N")]
    elite_top_n: Option<usize>,

    /// Rows shown in the leaderboard
    #[arg(long, default_value = "10")]
    top: usize,

    /// Show every row with this display name
    #[arg(long)]
    player: Option<String>,

    #[arg(long)]
    csv_out: Option<PathBuf>,

    #[arg(long)]
    json_out: Option<PathBuf>,

    #[arg(long)]
    xlsx_out: Option<PathBuf>,
}

impl Cli {
    fn scoring_config(&self) -> Result<ScoringConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => ScoringConfig::default(),
        };
        if let Some(policy) = self.missing_values {
            cfg.missing_values = match (policy, cfg.missing_values) {
                // Keep per-field defaults from the config file.
                (MissingValues::FixedDefault, kept @ MissingValuePolicy::FixedDefault { .. }) => kept,
                (MissingValues::FixedDefault, _) => MissingValuePolicy::default(),
                (MissingValues::ColumnMedian, _) => MissingValuePolicy::ColumnMedian,
                (MissingValues::Zero, _) => MissingValuePolicy::Zero,
            };
        }
        if let Some(year) = self.reference_year {
            cfg.reference_year = year;
        }
        if let Some(n) = self.elite_top_n {
            cfg.elite_top_n = n;
        }
        cfg.include_percentile |= self.percentile;
        cfg.include_transfer_prob |= self.transfer_prob;
        cfg.include_elite_benchmark |= self.elite_benchmark;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.scoring_config()?;

    let raw = dataset::load_table(&cli.input)
        .with_context(|| format!("load dataset {}", cli.input.display()))?;
    info!("Loaded {} rows from {}", raw.len(), cli.input.display());

    let derivation = derive_metrics(&raw, &config)?;
    if !derivation.dropped.is_empty() {
        warn!("{} row(s) dropped without player_name", derivation.dropped.len());
    }
    let team_average = compute_team_average(&derivation.table);

    print_leaderboard(&derivation.table, cli.top);
    print_averages("Team average", &team_average);
    if let Some(elite) = &derivation.elite_benchmark {
        print_averages(&format!("Elite benchmark (top {})", config.elite_top_n), elite);
    }

    if let Some(name) = &cli.player {
        let matches = derivation.table.find_by_name(name);
        if matches.is_empty() {
            warn!("No player named {name}");
        }
        for row in matches {
            print_player(row, &team_average);
        }
    }

    if let Some(path) = &cli.csv_out {
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        export::write_enriched_csv(&derivation.table, BufWriter::new(file))?;
        info!("CSV written: {}", path.display());
    }
    if let Some(path) = &cli.json_out {
        let json = export::export_json(&derivation, &team_average)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!("JSON written: {}", path.display());
    }
    if let Some(path) = &cli.xlsx_out {
        let report = export::export_xlsx(path, &derivation, &team_average)?;
        info!(
            "Workbook written: {} ({} players, {} dropped)",
            path.display(),
            report.players,
            report.dropped
        );
    }

    Ok(())
}

fn print_leaderboard(table: &EnrichedTable, top: usize) {
    println!(
        "{:>4}  {:<24} {:>7} {:>7} {:>7} {:>7} {:>7} {:>6}",
        "Row", "Player", "Tech", "Tact", "Phys", "Ment", "TPI", "Pct"
    );
    for row in table.leaderboard().into_iter().take(top) {
        let pct = row
            .rank_percentile
            .map(|p| format!("{p:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>4}  {:<24} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.2} {:>6}",
            row.row_id.0,
            row.player_name,
            row.pillars.technical,
            row.pillars.tactical,
            row.pillars.physical,
            row.pillars.mental,
            row.tpi,
            pct
        );
    }
}

fn print_averages(title: &str, averages: &PillarAverages) {
    if averages.is_empty() {
        println!("{title}: n/a");
        return;
    }
    let parts: Vec<String> = averages
        .iter()
        .map(|(col, v)| format!("{} {v:.1}", col.label()))
        .collect();
    println!("{title}: {}", parts.join(" | "));
}

fn print_player(row: &EnrichedRow, team_average: &PillarAverages) {
    println!();
    println!("{} (row {})", row.player_name, row.row_id.0);
    println!("  Position: {}", position_label(row));
    for delta in compare_to_benchmark(row, team_average) {
        println!(
            "  {:<10} {:>7.1}  ({:+.1} vs team)",
            delta.column.label(),
            delta.left,
            delta.delta
        );
    }
    if let Some(p) = row.transfer_prob {
        println!("  Transfer probability {:.0}%", p * 100.0);
    }
    if let (Some(years), Some(risk)) = (row.years_left, row.contract_risk) {
        println!("  Contract: {years} year(s) left ({})", risk.label());
    }
    if !row.imputed.is_empty() {
        let names: Vec<&str> = row.imputed.iter().map(|m| m.column()).collect();
        println!("  Filled: {}", names.join(", "));
    }
}

fn position_label(row: &EnrichedRow) -> String {
    row.record
        .get("position")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
