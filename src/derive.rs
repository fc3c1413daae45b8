use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregates::{PillarAverages, compute_elite_benchmark};
use crate::config::{MissingValuePolicy, ScoringConfig};
use crate::error::{DroppedRow, ScoringError};
use crate::metrics::{MetricDefaults, PillarScores, SubMetric, SubMetricValues};
use crate::record::{CellValue, PlayerRecord, RawTable, RowId};

pub const TECH_SCORE: &str = "Tech_Score";
pub const TACT_SCORE: &str = "Tact_Score";
pub const PHYS_SCORE: &str = "Phys_Score";
pub const MENT_SCORE: &str = "Ment_Score";
pub const TPI: &str = "TPI";
pub const RANK_PERCENTILE: &str = "Rank_Percentile";
pub const TRANSFER_PROB: &str = "Transfer_Prob";
pub const YEARS_LEFT: &str = "Years_Left";
pub const CONTRACT_RISK: &str = "Contract_Risk";

pub const AGE: &str = "age";
pub const CONTRACT_END_YEAR: &str = "contract_end_year";
pub const CONTRACT_END: &str = "contract_end";

const TRANSFER_PROB_CAP: f64 = 0.95;
const TRANSFER_PEAK_AGE: f64 = 35.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractRisk {
    Expired,
    Expiring,
    Watch,
    Secure,
}

impl ContractRisk {
    pub fn from_years_left(years_left: i32) -> Self {
        match years_left {
            i32::MIN..=0 => ContractRisk::Expired,
            1 => ContractRisk::Expiring,
            2 => ContractRisk::Watch,
            _ => ContractRisk::Secure,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContractRisk::Expired => "Expired",
            ContractRisk::Expiring => "Expiring",
            ContractRisk::Watch => "Watch",
            ContractRisk::Secure => "Secure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row_id: RowId,
    pub player_name: String,
    pub record: PlayerRecord,
    pub pillars: PillarScores,
    pub tpi: f64,
    pub rank_percentile: Option<f64>,
    pub transfer_prob: Option<f64>,
    pub years_left: Option<i32>,
    pub contract_risk: Option<ContractRisk>,
    /// Sub-metrics that were filled by the missing-value policy.
    pub imputed: Vec<SubMetric>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    pub columns: Vec<String>,
    pub rows: Vec<EnrichedRow>,
}

impl EnrichedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn row(&self, id: RowId) -> Option<&EnrichedRow> {
        self.rows.iter().find(|r| r.row_id == id)
    }

    /// Every row carrying this display name. Names are labels, not keys.
    pub fn find_by_name(&self, name: &str) -> Vec<&EnrichedRow> {
        let needle = name.trim();
        self.rows
            .iter()
            .filter(|r| r.player_name.eq_ignore_ascii_case(needle))
            .collect()
    }

    /// Rows by TPI descending; equal TPI keeps input order.
    pub fn leaderboard(&self) -> Vec<&EnrichedRow> {
        let mut rows: Vec<&EnrichedRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.tpi.total_cmp(&a.tpi));
        rows
    }

    pub fn cell(&self, row: &EnrichedRow, column: &str) -> Option<CellValue> {
        let computed = match column {
            TECH_SCORE => Some(row.pillars.technical),
            TACT_SCORE => Some(row.pillars.tactical),
            PHYS_SCORE => Some(row.pillars.physical),
            MENT_SCORE => Some(row.pillars.mental),
            TPI => Some(row.tpi),
            RANK_PERCENTILE if self.has_column(RANK_PERCENTILE) => row.rank_percentile,
            TRANSFER_PROB if self.has_column(TRANSFER_PROB) => row.transfer_prob,
            YEARS_LEFT if self.has_column(YEARS_LEFT) => row.years_left.map(f64::from),
            CONTRACT_RISK if self.has_column(CONTRACT_RISK) => {
                return row.contract_risk.map(|r| CellValue::from(r.label()));
            }
            _ => return row.record.get(column).cloned(),
        };
        computed.map(CellValue::Number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub table: EnrichedTable,
    pub dropped: Vec<DroppedRow>,
    pub elite_benchmark: Option<PillarAverages>,
}

pub fn derive_metrics(raw: &RawTable, config: &ScoringConfig) -> Result<Derivation, ScoringError> {
    config.validate()?;

    let mut dropped = Vec::new();
    let mut usable: Vec<(RowId, String, &PlayerRecord)> = Vec::with_capacity(raw.len());
    for (idx, record) in raw.rows.iter().enumerate() {
        let row_id = RowId(idx);
        match record.player_name() {
            Some(name) => usable.push((row_id, name, record)),
            None => {
                warn!(row = idx, "dropping row without player_name");
                dropped.push(DroppedRow {
                    row: row_id,
                    reason: "missing player_name".to_string(),
                });
            }
        }
    }

    if usable.is_empty() && (config.include_percentile || config.include_elite_benchmark) {
        return Err(ScoringError::EmptyDataset);
    }

    let values: Vec<SubMetricValues> = usable
        .iter()
        .map(|(_, _, record)| SubMetricValues::from_record(record))
        .collect();
    let fill = match &config.missing_values {
        MissingValuePolicy::FixedDefault { defaults } => *defaults,
        MissingValuePolicy::ColumnMedian => MetricDefaults::column_medians(&values),
        MissingValuePolicy::Zero => MetricDefaults::zeros(),
    };

    let with_transfer = config.include_transfer_prob && raw.has_column(AGE);
    let contract_column = [CONTRACT_END_YEAR, CONTRACT_END]
        .into_iter()
        .find(|c| raw.has_column(c));

    let mut rows: Vec<EnrichedRow> = usable
        .into_iter()
        .zip(values.iter())
        .map(|((row_id, player_name, record), values)| {
            let pillars = values.resolve(&fill).pillar_scores();
            let tpi = pillars.tpi(&config.pillar_weights);
            let transfer_prob = if with_transfer {
                record.number(AGE).map(|age| transfer_probability(tpi, age))
            } else {
                None
            };
            let years_left = contract_column
                .and_then(|c| record.get(c))
                .and_then(contract_end_year)
                .and_then(|year| year.checked_sub(config.reference_year));
            EnrichedRow {
                row_id,
                player_name,
                record: record.clone(),
                pillars,
                tpi,
                rank_percentile: None,
                transfer_prob,
                years_left,
                contract_risk: years_left.map(ContractRisk::from_years_left),
                imputed: values.missing().collect(),
            }
        })
        .collect();

    if config.include_percentile {
        let tpis: Vec<f64> = rows.iter().map(|r| r.tpi).collect();
        for (row, pct) in rows.iter_mut().zip(percentile_ranks(&tpis)) {
            row.rank_percentile = Some(pct);
        }
    }

    let mut columns = raw.columns.clone();
    let mut added: Vec<&str> = vec![TECH_SCORE, TACT_SCORE, PHYS_SCORE, MENT_SCORE, TPI];
    if config.include_percentile {
        added.push(RANK_PERCENTILE);
    }
    if with_transfer {
        added.push(TRANSFER_PROB);
    }
    if contract_column.is_some() {
        added.push(YEARS_LEFT);
        added.push(CONTRACT_RISK);
    }
    for name in added {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }

    let table = EnrichedTable { columns, rows };
    let elite_benchmark = config
        .include_elite_benchmark
        .then(|| compute_elite_benchmark(&table, config.elite_top_n));

    debug!(
        rows = table.len(),
        dropped = dropped.len(),
        percentile = config.include_percentile,
        transfer_prob = with_transfer,
        contract = contract_column.is_some(),
        "derived metrics"
    );

    Ok(Derivation {
        table,
        dropped,
        elite_benchmark,
    })
}

/// Average-method percentile rank, scaled to (0, 100].
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut out = vec![0.0; n];
    let mut start = 0usize;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            out[idx] = avg_rank / n as f64 * 100.0;
        }
        start = end;
    }
    out
}

pub fn transfer_probability(tpi: f64, age: f64) -> f64 {
    let raw = (0.6 * tpi + 2.0 * (TRANSFER_PEAK_AGE - age)) / 100.0;
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, TRANSFER_PROB_CAP)
}

/// Year a contract ends: a plain year (`2028`, `2028.0`) or an ISO date.
pub fn contract_end_year(cell: &CellValue) -> Option<i32> {
    if let Some(v) = cell.as_number() {
        if v.abs() < 10_000.0 {
            return Some(v.trunc() as i32);
        }
        return None;
    }
    let CellValue::Text(raw) = cell else {
        return None;
    };
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
        .map(|d| d.year())
}
