use serde::{Deserialize, Serialize};

use crate::aggregates::{PillarAverages, ScoreColumn};
use crate::derive::{EnrichedRow, EnrichedTable};
use crate::error::ScoringError;
use crate::record::RowId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub column: ScoreColumn,
    pub left: f64,
    pub right: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerComparison {
    pub left: RowId,
    pub right: RowId,
    pub left_name: String,
    pub right_name: String,
    pub deltas: Vec<ScoreDelta>,
}

impl PlayerComparison {
    pub fn delta(&self, column: ScoreColumn) -> Option<f64> {
        self.deltas.iter().find(|d| d.column == column).map(|d| d.delta)
    }
}

/// Head-to-head scores of two rows, `left - right` per column.
pub fn compare_players(
    table: &EnrichedTable,
    left: RowId,
    right: RowId,
) -> Result<PlayerComparison, ScoringError> {
    let l = table.row(left).ok_or(ScoringError::UnknownRow(left))?;
    let r = table.row(right).ok_or(ScoringError::UnknownRow(right))?;
    let deltas = ScoreColumn::ALL
        .into_iter()
        .map(|column| {
            let (lv, rv) = (column.value(l), column.value(r));
            ScoreDelta {
                column,
                left: lv,
                right: rv,
                delta: lv - rv,
            }
        })
        .collect();
    Ok(PlayerComparison {
        left,
        right,
        left_name: l.player_name.clone(),
        right_name: r.player_name.clone(),
        deltas,
    })
}

/// Row against a set of averages. Columns the averages lack are skipped.
pub fn compare_to_benchmark(row: &EnrichedRow, benchmark: &PillarAverages) -> Vec<ScoreDelta> {
    benchmark
        .iter()
        .map(|(column, avg)| {
            let value = column.value(row);
            ScoreDelta {
                column: *column,
                left: value,
                right: *avg,
                delta: value - avg,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::compute_team_average;
    use crate::config::ScoringConfig;
    use crate::derive::derive_metrics;
    use crate::record::{PlayerRecord, RawTable};
    use approx::assert_relative_eq;

    fn pair() -> EnrichedTable {
        let records = vec![
            PlayerRecord::new()
                .with("player_name", "Keeper")
                .with("composure", 90)
                .with("big_game_impact", 80),
            PlayerRecord::new()
                .with("player_name", "Winger")
                .with("sprint_speed", 35)
                .with("dribble_success", 85),
        ];
        derive_metrics(&RawTable::from_records(records), &ScoringConfig::default())
            .unwrap()
            .table
    }

    #[test]
    fn head_to_head_deltas() {
        let table = pair();
        let cmp = compare_players(&table, RowId(0), RowId(1)).unwrap();
        assert_eq!(cmp.left_name, "Keeper");
        assert_eq!(cmp.deltas.len(), 5);
        // Mental: (0.7*90 + 0.3*80) - (0.7*70 + 0.3*50) = 87 - 64
        assert_relative_eq!(cmp.delta(ScoreColumn::Mental).unwrap(), 23.0, epsilon = 1e-9);
        // Physical: (2*25 + 10) - (2*35 + 10)
        assert_relative_eq!(cmp.delta(ScoreColumn::Physical).unwrap(), -20.0, epsilon = 1e-9);
        assert!(compare_players(&table, RowId(0), RowId(9)).is_err());
    }

    #[test]
    fn benchmark_deltas_cancel_out() {
        let table = pair();
        let avg = compute_team_average(&table);
        let a = compare_to_benchmark(&table.rows[0], &avg);
        let b = compare_to_benchmark(&table.rows[1], &avg);
        for (da, db) in a.iter().zip(&b) {
            assert_relative_eq!(da.delta + db.delta, 0.0, epsilon = 1e-9);
        }
        assert!(compare_to_benchmark(&table.rows[0], &PillarAverages::new()).is_empty());
    }
}
