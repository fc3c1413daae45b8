use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::derive::{EnrichedRow, EnrichedTable, MENT_SCORE, PHYS_SCORE, TACT_SCORE, TECH_SCORE, TPI};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScoreColumn {
    Technical,
    Tactical,
    Physical,
    Mental,
    Tpi,
}

impl ScoreColumn {
    pub const ALL: [ScoreColumn; 5] = [
        ScoreColumn::Technical,
        ScoreColumn::Tactical,
        ScoreColumn::Physical,
        ScoreColumn::Mental,
        ScoreColumn::Tpi,
    ];

    pub fn column(self) -> &'static str {
        match self {
            ScoreColumn::Technical => TECH_SCORE,
            ScoreColumn::Tactical => TACT_SCORE,
            ScoreColumn::Physical => PHYS_SCORE,
            ScoreColumn::Mental => MENT_SCORE,
            ScoreColumn::Tpi => TPI,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreColumn::Technical => "Technical",
            ScoreColumn::Tactical => "Tactical",
            ScoreColumn::Physical => "Physical",
            ScoreColumn::Mental => "Mental",
            ScoreColumn::Tpi => "TPI",
        }
    }

    pub fn value(self, row: &EnrichedRow) -> f64 {
        match self {
            ScoreColumn::Technical => row.pillars.technical,
            ScoreColumn::Tactical => row.pillars.tactical,
            ScoreColumn::Physical => row.pillars.physical,
            ScoreColumn::Mental => row.pillars.mental,
            ScoreColumn::Tpi => row.tpi,
        }
    }
}

/// Column means. Empty when there was nothing to average.
pub type PillarAverages = BTreeMap<ScoreColumn, f64>;

pub fn compute_team_average(table: &EnrichedTable) -> PillarAverages {
    let rows: Vec<&EnrichedRow> = table.rows.iter().collect();
    mean_scores(&rows)
}

/// Mean scores of the `top_n` rows by TPI; all rows when there are fewer.
pub fn compute_elite_benchmark(table: &EnrichedTable, top_n: usize) -> PillarAverages {
    let mut elite = table.leaderboard();
    elite.truncate(top_n);
    // Sum in input order so a full selection matches the team average exactly.
    elite.sort_by_key(|r| r.row_id);
    mean_scores(&elite)
}

fn mean_scores(rows: &[&EnrichedRow]) -> PillarAverages {
    let mut out = PillarAverages::new();
    if rows.is_empty() {
        return out;
    }
    let n = rows.len() as f64;
    for col in ScoreColumn::ALL {
        let sum: f64 = rows.iter().map(|r| col.value(r)).sum();
        out.insert(col, sum / n);
    }
    out
}
