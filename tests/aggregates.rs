use std::fs;
use std::path::PathBuf;

use approx::assert_relative_eq;

use tpi_engine::aggregates::{ScoreColumn, compute_elite_benchmark, compute_team_average};
use tpi_engine::compare::compare_players;
use tpi_engine::config::{ScoringConfig, load_config};
use tpi_engine::dataset::load_table;
use tpi_engine::derive::{Derivation, derive_metrics};
use tpi_engine::record::RowId;
use tpi_engine::win_prob::{compute_win_probability, predict_lineup_matchup};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn derived(cfg: &ScoringConfig) -> Derivation {
    let raw = load_table(&fixture_path("players.csv")).expect("fixture file should be readable");
    derive_metrics(&raw, cfg).expect("fixture should derive")
}

#[test]
fn team_average_over_usable_rows() {
    let out = derived(&ScoringConfig::default());
    let avg = compute_team_average(&out.table);
    assert_eq!(avg.len(), ScoreColumn::ALL.len());
    assert_relative_eq!(avg[&ScoreColumn::Technical], 59.56, epsilon = 1e-9);
    let tpi_mean = (68.525 + 54.6 + 66.325 + 52.55 + 63.38) / 5.0;
    assert_relative_eq!(avg[&ScoreColumn::Tpi], tpi_mean, epsilon = 1e-9);
}

#[test]
fn elite_benchmark_from_config() {
    let cfg = load_config(&fixture_path("config_median.json")).unwrap();
    let out = derived(&cfg);
    let elite = out.elite_benchmark.expect("benchmark requested");
    assert_eq!(elite, compute_elite_benchmark(&out.table, 2));

    // Top two by TPI under median fill: A (68.525) and Eric N (67.58).
    let a = out.table.row(RowId(0)).unwrap();
    let eric = out.table.row(RowId(5)).unwrap();
    assert_relative_eq!(eric.tpi, 67.58, epsilon = 1e-9);
    assert_relative_eq!(
        elite[&ScoreColumn::Technical],
        (a.pillars.technical + eric.pillars.technical) / 2.0,
        epsilon = 1e-9
    );
}

#[test]
fn elite_benchmark_degrades_to_team_average() {
    let out = derived(&ScoringConfig::default());
    let avg = compute_team_average(&out.table);
    assert_eq!(compute_elite_benchmark(&out.table, out.table.len()), avg);
    assert_eq!(compute_elite_benchmark(&out.table, 50), avg);
}

#[test]
fn elite_ties_keep_input_order() {
    use tpi_engine::record::{PlayerRecord, RawTable};

    let raw = RawTable::from_records(vec![
        PlayerRecord::new().with("player_name", "First").with("stamina", 70),
        PlayerRecord::new().with("player_name", "Second").with("stamina", 70),
        PlayerRecord::new().with("player_name", "Third").with("stamina", 70),
    ]);
    let out = derive_metrics(&raw, &ScoringConfig::default()).unwrap();
    let board: Vec<&str> = out
        .table
        .leaderboard()
        .into_iter()
        .map(|r| r.player_name.as_str())
        .collect();
    assert_eq!(board, vec!["First", "Second", "Third"]);
}

#[test]
fn head_to_head_on_duplicate_names_uses_row_ids() {
    let out = derived(&ScoringConfig::default());
    let cmp = compare_players(&out.table, RowId(0), RowId(4)).unwrap();
    assert_eq!(cmp.left_name, cmp.right_name);
    assert_relative_eq!(cmp.delta(ScoreColumn::Technical).unwrap(), 72.0 - 41.0, epsilon = 1e-9);
    assert_relative_eq!(cmp.delta(ScoreColumn::Tpi).unwrap(), 68.525 - 52.55, epsilon = 1e-9);
}

#[derive(serde::Deserialize)]
struct MatchupCase {
    lineup_a: Vec<usize>,
    lineup_b: Vec<usize>,
}

#[test]
fn matchup_case_fixture() {
    let raw = fs::read_to_string(fixture_path("matchup_case.json")).unwrap();
    let case: MatchupCase = serde_json::from_str(&raw).unwrap();
    let out = derived(&ScoringConfig::default());

    let a: Vec<RowId> = case.lineup_a.into_iter().map(RowId).collect();
    let b: Vec<RowId> = case.lineup_b.into_iter().map(RowId).collect();
    let m = predict_lineup_matchup(&out.table, &a, &b).unwrap();

    let avg_a = (68.525 + 66.325) / 2.0;
    let avg_b = (54.6 + 52.55 + 63.38) / 3.0;
    assert_relative_eq!(m.avg_tpi_a, avg_a, epsilon = 1e-9);
    assert_relative_eq!(m.avg_tpi_b, avg_b, epsilon = 1e-9);
    assert_relative_eq!(m.p_win_a, 50.0 + 3.0 * (avg_a - avg_b), epsilon = 1e-9);
    assert!(m.p_win_a > 50.0 && m.p_win_a < 95.0);
    assert_eq!(m.p_win_a, compute_win_probability(m.avg_tpi_a, m.avg_tpi_b));
}
