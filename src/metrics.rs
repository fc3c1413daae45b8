use serde::{Deserialize, Serialize};

use crate::record::PlayerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubMetric {
    PassAccuracy,
    DribbleSuccess,
    Interceptions,
    PositioningRating,
    SprintSpeed,
    Stamina,
    Composure,
    BigGameImpact,
}

impl SubMetric {
    pub const ALL: [SubMetric; 8] = [
        SubMetric::PassAccuracy,
        SubMetric::DribbleSuccess,
        SubMetric::Interceptions,
        SubMetric::PositioningRating,
        SubMetric::SprintSpeed,
        SubMetric::Stamina,
        SubMetric::Composure,
        SubMetric::BigGameImpact,
    ];

    pub fn column(self) -> &'static str {
        match self {
            SubMetric::PassAccuracy => "pass_accuracy",
            SubMetric::DribbleSuccess => "dribble_success",
            SubMetric::Interceptions => "interceptions",
            SubMetric::PositioningRating => "positioning_rating",
            SubMetric::SprintSpeed => "sprint_speed",
            SubMetric::Stamina => "stamina",
            SubMetric::Composure => "composure",
            SubMetric::BigGameImpact => "big_game_impact",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-field fill values used when a sub-metric is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricDefaults {
    pub pass_accuracy: f64,
    pub dribble_success: f64,
    pub interceptions: f64,
    pub positioning_rating: f64,
    pub sprint_speed: f64,
    pub stamina: f64,
    pub composure: f64,
    pub big_game_impact: f64,
}

impl Default for MetricDefaults {
    /// League-average placeholders.
    fn default() -> Self {
        Self {
            pass_accuracy: 50.0,
            dribble_success: 50.0,
            interceptions: 5.0,
            positioning_rating: 50.0,
            sprint_speed: 25.0,
            stamina: 50.0,
            composure: 70.0,
            big_game_impact: 50.0,
        }
    }
}

impl MetricDefaults {
    pub fn zeros() -> Self {
        Self::from_array([0.0; 8])
    }

    pub fn get(&self, metric: SubMetric) -> f64 {
        self.to_array()[metric.index()]
    }

    /// Median of the present values of each column. Columns with no present
    /// value fall back to the league-average placeholder.
    pub fn column_medians(rows: &[SubMetricValues]) -> Self {
        let fallback = Self::default().to_array();
        let mut out = [0.0; 8];
        for metric in SubMetric::ALL {
            let i = metric.index();
            let mut present: Vec<f64> = rows.iter().filter_map(|r| r.values[i]).collect();
            out[i] = median(&mut present).unwrap_or(fallback[i]);
        }
        Self::from_array(out)
    }

    fn to_array(self) -> [f64; 8] {
        [
            self.pass_accuracy,
            self.dribble_success,
            self.interceptions,
            self.positioning_rating,
            self.sprint_speed,
            self.stamina,
            self.composure,
            self.big_game_impact,
        ]
    }

    fn from_array(v: [f64; 8]) -> Self {
        Self {
            pass_accuracy: v[0],
            dribble_success: v[1],
            interceptions: v[2],
            positioning_rating: v[3],
            sprint_speed: v[4],
            stamina: v[5],
            composure: v[6],
            big_game_impact: v[7],
        }
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Sub-metrics as read from a row, before any missing-value policy applies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubMetricValues {
    values: [Option<f64>; 8],
}

impl SubMetricValues {
    pub fn from_record(record: &PlayerRecord) -> Self {
        let mut values = [None; 8];
        for metric in SubMetric::ALL {
            values[metric.index()] = record.number(metric.column());
        }
        Self { values }
    }

    pub fn get(&self, metric: SubMetric) -> Option<f64> {
        self.values[metric.index()]
    }

    pub fn set(&mut self, metric: SubMetric, value: Option<f64>) {
        self.values[metric.index()] = value.filter(|v| v.is_finite());
    }

    pub fn missing(&self) -> impl Iterator<Item = SubMetric> + '_ {
        SubMetric::ALL.into_iter().filter(|m| self.get(*m).is_none())
    }

    pub fn resolve(&self, fill: &MetricDefaults) -> ResolvedMetrics {
        let mut out = [0.0; 8];
        for metric in SubMetric::ALL {
            let i = metric.index();
            out[i] = self.values[i].unwrap_or_else(|| fill.get(metric));
        }
        ResolvedMetrics(MetricDefaults::from_array(out))
    }
}

/// Every sub-metric present. Only formula code consumes this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMetrics(MetricDefaults);

impl ResolvedMetrics {
    pub fn get(&self, metric: SubMetric) -> f64 {
        self.0.get(metric)
    }

    pub fn pillar_scores(&self) -> PillarScores {
        let m = &self.0;
        PillarScores {
            technical: 0.6 * m.pass_accuracy + 0.4 * m.dribble_success,
            tactical: 5.0 * m.interceptions + 0.5 * m.positioning_rating,
            physical: 2.0 * m.sprint_speed + 0.2 * m.stamina,
            mental: 0.7 * m.composure + 0.3 * m.big_game_impact,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarScores {
    pub technical: f64,
    pub tactical: f64,
    pub physical: f64,
    pub mental: f64,
}

impl PillarScores {
    pub fn tpi(&self, weights: &crate::config::PillarWeights) -> f64 {
        weights.technical * self.technical
            + weights.tactical * self.tactical
            + weights.physical * self.physical
            + weights.mental * self.mental
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PillarWeights;
    use approx::assert_relative_eq;

    #[test]
    fn pillar_formulas_match_reference_row() {
        let rec = PlayerRecord::new()
            .with("pass_accuracy", 80)
            .with("dribble_success", 60)
            .with("interceptions", 4)
            .with("positioning_rating", 70)
            .with("sprint_speed", 30)
            .with("stamina", 80)
            .with("composure", 75)
            .with("big_game_impact", 60);
        let pillars = SubMetricValues::from_record(&rec)
            .resolve(&MetricDefaults::default())
            .pillar_scores();
        assert_relative_eq!(pillars.technical, 72.0, epsilon = 1e-9);
        assert_relative_eq!(pillars.tactical, 55.0, epsilon = 1e-9);
        assert_relative_eq!(pillars.physical, 76.0, epsilon = 1e-9);
        assert_relative_eq!(pillars.mental, 70.5, epsilon = 1e-9);
        assert_relative_eq!(pillars.tpi(&PillarWeights::default()), 68.525, epsilon = 1e-9);
    }

    #[test]
    fn resolve_fills_only_missing_fields() {
        let mut values = SubMetricValues::default();
        values.set(SubMetric::Composure, Some(90.0));
        values.set(SubMetric::Stamina, Some(f64::INFINITY));
        assert_eq!(values.missing().count(), 7);

        let resolved = values.resolve(&MetricDefaults::default());
        assert_eq!(resolved.get(SubMetric::Composure), 90.0);
        assert_eq!(resolved.get(SubMetric::Stamina), 50.0);
        assert_eq!(resolved.get(SubMetric::SprintSpeed), 25.0);

        let zeroed = values.resolve(&MetricDefaults::zeros());
        assert_eq!(zeroed.get(SubMetric::Stamina), 0.0);
    }

    #[test]
    fn column_medians_use_present_values() {
        let rows: Vec<SubMetricValues> = [Some(10.0), None, Some(30.0), Some(20.0), Some(40.0)]
            .into_iter()
            .map(|v| {
                let mut r = SubMetricValues::default();
                r.set(SubMetric::PassAccuracy, v);
                r.set(SubMetric::Interceptions, v.map(|x| x / 10.0).filter(|x| *x < 3.5));
                r
            })
            .collect();
        let medians = MetricDefaults::column_medians(&rows);
        assert_eq!(medians.pass_accuracy, 25.0);
        assert_eq!(medians.interceptions, 2.0);
        // No present values anywhere: placeholder.
        assert_eq!(medians.composure, 70.0);
    }
}
