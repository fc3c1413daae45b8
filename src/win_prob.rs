use serde::{Deserialize, Serialize};

use crate::derive::EnrichedTable;
use crate::error::ScoringError;
use crate::record::RowId;

const BASE_PROB: f64 = 50.0;
const PTS_PER_TPI: f64 = 3.0;
const MIN_PROB: f64 = 5.0;
const MAX_PROB: f64 = 95.0;

/// Percent chance that lineup A beats lineup B, from their average TPIs.
/// Swapping the sides gives `100 - p`.
pub fn compute_win_probability(a_avg_tpi: f64, b_avg_tpi: f64) -> f64 {
    clamp(BASE_PROB + PTS_PER_TPI * (a_avg_tpi - b_avg_tpi), MIN_PROB, MAX_PROB)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupMatchup {
    pub avg_tpi_a: f64,
    pub avg_tpi_b: f64,
    pub p_win_a: f64,
}

pub fn lineup_average_tpi(table: &EnrichedTable, lineup: &[RowId]) -> Result<f64, ScoringError> {
    if lineup.is_empty() {
        return Err(ScoringError::EmptyLineup);
    }
    let mut sum = 0.0;
    for id in lineup {
        let row = table.row(*id).ok_or(ScoringError::UnknownRow(*id))?;
        sum += row.tpi;
    }
    Ok(sum / lineup.len() as f64)
}

pub fn predict_lineup_matchup(
    table: &EnrichedTable,
    lineup_a: &[RowId],
    lineup_b: &[RowId],
) -> Result<LineupMatchup, ScoringError> {
    let avg_tpi_a = lineup_average_tpi(table, lineup_a)?;
    let avg_tpi_b = lineup_average_tpi(table, lineup_b)?;
    Ok(LineupMatchup {
        avg_tpi_a,
        avg_tpi_b,
        p_win_a: compute_win_probability(avg_tpi_a, avg_tpi_b),
    })
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
