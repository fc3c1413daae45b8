use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::aggregates::{PillarAverages, ScoreColumn};
use crate::derive::{AGE, CONTRACT_END, CONTRACT_END_YEAR, Derivation, EnrichedRow, EnrichedTable};
use crate::error::DroppedRow;
use crate::record::{CellValue, RowId};

/// Bio and financial columns carried into the flattened export when present.
pub const PASSTHROUGH_FIELDS: [&str; 9] = [
    "position",
    AGE,
    "team",
    "club",
    "nationality",
    "market_value",
    "wage",
    CONTRACT_END_YEAR,
    CONTRACT_END,
];

/// Flattened, read-only view of one enriched row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub row_id: RowId,
    pub player_name: String,
    pub technical: f64,
    pub tactical: f64,
    pub physical: f64,
    pub mental: f64,
    pub tpi: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_percentile: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_prob: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_risk: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, CellValue>,
}

impl ExportRecord {
    pub fn from_row(row: &EnrichedRow) -> Self {
        let details = PASSTHROUGH_FIELDS
            .iter()
            .filter_map(|f| row.record.get(f).map(|v| (f.to_string(), v.clone())))
            .collect();
        Self {
            row_id: row.row_id,
            player_name: row.player_name.clone(),
            technical: row.pillars.technical,
            tactical: row.pillars.tactical,
            physical: row.pillars.physical,
            mental: row.pillars.mental,
            tpi: row.tpi,
            rank_percentile: row.rank_percentile,
            transfer_prob: row.transfer_prob,
            years_left: row.years_left,
            contract_risk: row.contract_risk.map(|r| r.label().to_string()),
            details,
        }
    }
}

pub fn export_records(table: &EnrichedTable) -> Vec<ExportRecord> {
    table.rows.iter().map(ExportRecord::from_row).collect()
}

pub fn write_enriched_csv<W: Write>(table: &EnrichedTable, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.columns).context("write csv header")?;
    for row in &table.rows {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|c| table.cell(row, c).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        out.write_record(&cells)
            .with_context(|| format!("write csv row {}", row.row_id))?;
    }
    out.flush().context("flush csv")?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    generated_at: String,
    players: Vec<ExportRecord>,
    team_average: BTreeMap<&'static str, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elite_benchmark: Option<BTreeMap<&'static str, f64>>,
    dropped: &'a [DroppedRow],
}

pub fn export_json(derivation: &Derivation, team_average: &PillarAverages) -> Result<String> {
    let doc = JsonExport {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        players: export_records(&derivation.table),
        team_average: labelled(team_average),
        elite_benchmark: derivation.elite_benchmark.as_ref().map(labelled),
        dropped: &derivation.dropped,
    };
    serde_json::to_string_pretty(&doc).context("serialize json export")
}

fn labelled(averages: &PillarAverages) -> BTreeMap<&'static str, f64> {
    averages.iter().map(|(c, v)| (c.label(), *v)).collect()
}

pub struct ExportReport {
    pub players: usize,
    pub averages: usize,
    pub dropped: usize,
}

pub fn export_xlsx(
    path: &Path,
    derivation: &Derivation,
    team_average: &PillarAverages,
) -> Result<ExportReport> {
    let table = &derivation.table;

    let mut players_rows: Vec<Vec<CellValue>> = vec![
        table
            .columns
            .iter()
            .map(|c| CellValue::from(c.as_str()))
            .collect(),
    ];
    for row in &table.rows {
        players_rows.push(
            table
                .columns
                .iter()
                .map(|c| table.cell(row, c).unwrap_or_else(|| CellValue::from("")))
                .collect(),
        );
    }

    let mut header = vec![CellValue::from("Benchmark")];
    header.extend(ScoreColumn::ALL.iter().map(|c| CellValue::from(c.label())));
    let mut averages_rows = vec![header];
    averages_rows.push(averages_row("Team Average", team_average));
    if let Some(elite) = &derivation.elite_benchmark {
        averages_rows.push(averages_row("Elite Benchmark", elite));
    }

    let mut dropped_rows = vec![vec![CellValue::from("Row"), CellValue::from("Reason")]];
    for d in &derivation.dropped {
        dropped_rows.push(vec![
            CellValue::Number(d.row.0 as f64),
            CellValue::from(d.reason.as_str()),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &players_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Averages")?;
        write_rows(sheet, &averages_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Dropped")?;
        write_rows(sheet, &dropped_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        players: players_rows.len().saturating_sub(1),
        averages: averages_rows.len().saturating_sub(1),
        dropped: dropped_rows.len().saturating_sub(1),
    })
}

fn averages_row(label: &str, averages: &PillarAverages) -> Vec<CellValue> {
    let mut row = vec![CellValue::from(label)];
    for col in ScoreColumn::ALL {
        row.push(
            averages
                .get(&col)
                .map(|v| CellValue::Number(*v))
                .unwrap_or_else(|| CellValue::from("")),
        );
    }
    row
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<CellValue>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let (r, c) = (row_idx as u32, col_idx as u16);
            let written = match value {
                CellValue::Number(v) if v.is_finite() => worksheet.write_number(r, c, *v),
                other => worksheet.write_string(r, c, other.to_string()),
            };
            written.with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregates::compute_team_average;
    use crate::config::ScoringConfig;
    use crate::derive::derive_metrics;
    use crate::record::{PlayerRecord, RawTable};

    fn derivation() -> Derivation {
        let records = vec![
            PlayerRecord::new()
                .with("player_name", "Ada")
                .with("position", "MF")
                .with("age", 24)
                .with("contract_end_year", 2028)
                .with("scout_note", "left footed"),
            PlayerRecord::new().with("age", 30),
        ];
        let cfg = ScoringConfig {
            include_percentile: true,
            include_transfer_prob: true,
            ..ScoringConfig::default()
        };
        derive_metrics(&RawTable::from_records(records), &cfg).unwrap()
    }

    #[test]
    fn export_record_flattens_present_fields() {
        let d = derivation();
        let rec = ExportRecord::from_row(&d.table.rows[0]);
        assert_eq!(rec.player_name, "Ada");
        assert_eq!(rec.years_left, Some(2));
        assert_eq!(rec.contract_risk.as_deref(), Some("Watch"));
        assert_eq!(rec.details.get("position"), Some(&CellValue::from("MF")));
        assert!(!rec.details.contains_key("scout_note"));
        assert!(!rec.details.contains_key("wage"));
    }

    #[test]
    fn csv_has_original_and_computed_columns() {
        let d = derivation();
        let mut buf = Vec::new();
        write_enriched_csv(&d.table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "age,contract_end_year,player_name,position,scout_note,\
             Tech_Score,Tact_Score,Phys_Score,Ment_Score,TPI,\
             Rank_Percentile,Transfer_Prob,Years_Left,Contract_Risk"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("24,2028,Ada,MF,left footed,"));
        assert!(row.contains(",100,"));
        assert!(row.ends_with(",2,Watch"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn json_export_lists_dropped_rows() {
        let d = derivation();
        let avg = compute_team_average(&d.table);
        let raw = export_json(&d, &avg).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["players"].as_array().unwrap().len(), 1);
        assert_eq!(v["dropped"][0]["row"], 1);
        assert!(v["team_average"]["TPI"].is_number());
        assert!(v.get("elite_benchmark").is_none());
    }

    #[test]
    fn xlsx_export_reports_counts() {
        let d = derivation();
        let avg = compute_team_average(&d.table);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.xlsx");
        let report = export_xlsx(&path, &d, &avg).unwrap();
        assert_eq!(report.players, 1);
        assert_eq!(report.averages, 1);
        assert_eq!(report.dropped, 1);
        assert!(path.exists());
    }
}
