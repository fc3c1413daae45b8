use serde::{Deserialize, Serialize};

use crate::record::RowId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("invalid scoring config: {0}")]
    InvalidConfig(String),

    #[error("dataset has no usable rows for a batch-relative indicator")]
    EmptyDataset,

    #[error("lineup is empty")]
    EmptyLineup,

    #[error("row {0} is not present in the enriched table")]
    UnknownRow(RowId),
}

/// A row excluded from derivation. Reported alongside the output, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    pub row: RowId,
    pub reason: String,
}
