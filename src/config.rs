use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::metrics::MetricDefaults;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub const DEFAULT_REFERENCE_YEAR: i32 = 2026;
pub const DEFAULT_ELITE_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarWeights {
    pub technical: f64,
    pub tactical: f64,
    pub physical: f64,
    pub mental: f64,
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self {
            technical: 0.35,
            tactical: 0.25,
            physical: 0.25,
            mental: 0.15,
        }
    }
}

impl PillarWeights {
    pub fn sum(&self) -> f64 {
        self.technical + self.tactical + self.physical + self.mental
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let named = [
            ("technical", self.technical),
            ("tactical", self.tactical),
            ("physical", self.physical),
            ("mental", self.mental),
        ];
        for (name, w) in named {
            if !w.is_finite() || w <= 0.0 {
                return Err(ScoringError::InvalidConfig(format!(
                    "pillar weight `{name}` must be positive, got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringError::InvalidConfig(format!(
                "pillar weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// How missing sub-metrics are filled before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MissingValuePolicy {
    FixedDefault {
        #[serde(default)]
        defaults: MetricDefaults,
    },
    ColumnMedian,
    Zero,
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        MissingValuePolicy::FixedDefault {
            defaults: MetricDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub pillar_weights: PillarWeights,
    pub missing_values: MissingValuePolicy,
    pub reference_year: i32,
    pub include_percentile: bool,
    pub include_transfer_prob: bool,
    pub include_elite_benchmark: bool,
    pub elite_top_n: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            pillar_weights: PillarWeights::default(),
            missing_values: MissingValuePolicy::default(),
            reference_year: DEFAULT_REFERENCE_YEAR,
            include_percentile: false,
            include_transfer_prob: false,
            include_elite_benchmark: false,
            elite_top_n: DEFAULT_ELITE_TOP_N,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        self.pillar_weights.validate()?;
        if let MissingValuePolicy::FixedDefault { defaults } = &self.missing_values {
            let all_finite = crate::metrics::SubMetric::ALL
                .iter()
                .all(|m| defaults.get(*m).is_finite());
            if !all_finite {
                return Err(ScoringError::InvalidConfig(
                    "fixed defaults must be finite numbers".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let cfg: ScoringConfig = serde_json::from_str(raw).context("parse scoring config")?;
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn load_config(path: &Path) -> Result<ScoringConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read scoring config {}", path.display()))?;
    ScoringConfig::from_json_str(&raw)
        .with_context(|| format!("load scoring config {}", path.display()))
}
