pub mod aggregates;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod derive;
pub mod error;
pub mod export;
pub mod metrics;
pub mod record;
pub mod win_prob;

pub use aggregates::{PillarAverages, ScoreColumn, compute_elite_benchmark, compute_team_average};
pub use config::{MissingValuePolicy, PillarWeights, ScoringConfig};
pub use derive::{Derivation, EnrichedRow, EnrichedTable, derive_metrics};
pub use error::{DroppedRow, ScoringError};
pub use record::{CellValue, PlayerRecord, RawTable, RowId};
pub use win_prob::compute_win_probability;
