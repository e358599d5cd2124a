//! Parameter-keyed store of algorithm outputs.
//!
//! Single writer per key; re-running a key overwrites its previous output.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bounds::Bounds;
use crate::graph::NodeId;
use crate::params::{ParameterKey, SpreadModel};

/// Result of one solver on one parameter key.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlgorithmOutput {
    pub objective: f64,
    /// Graph labels in pick order.
    pub honeypots: Vec<NodeId>,
    pub wall_time: Duration,
    pub a_priori_ub: f64,
    pub posterior_ub: f64,
}

impl AlgorithmOutput {
    pub fn new(honeypots: Vec<NodeId>, bounds: &Bounds, wall_time: Duration) -> Self {
        Self {
            objective: bounds.objective,
            honeypots,
            wall_time,
            a_priori_ub: bounds.a_priori,
            posterior_ub: bounds.posterior,
        }
    }

    /// `100·(posterior − objective)/objective`; `None` for a zero objective.
    pub fn posterior_gap_percent(&self) -> Option<f64> {
        (self.objective > 0.0).then(|| 100.0 * (self.posterior_ub - self.objective) / self.objective)
    }
}

/// One line of the tabular report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportRow {
    pub model: SpreadModel,
    pub network: String,
    pub time_step: usize,
    pub repetitions: usize,
    pub false_negative: f64,
    pub transmissability: f64,
    pub k: usize,
    pub objective: f64,
    pub honeypots: Vec<NodeId>,
    pub a_priori_ub: f64,
    pub posterior_ub: f64,
    pub posterior_gap_percent: Option<f64>,
    pub wall_time_secs: f64,
    pub utc: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct ResultCache {
    outputs: HashMap<ParameterKey, AlgorithmOutput>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; returns the output previously stored under `key`.
    pub fn upsert(&mut self, key: ParameterKey, output: AlgorithmOutput) -> Option<AlgorithmOutput> {
        self.outputs.insert(key, output)
    }

    pub fn get(&self, key: &ParameterKey) -> Option<&AlgorithmOutput> {
        self.outputs.get(key)
    }

    pub fn contains(&self, key: &ParameterKey) -> bool {
        self.outputs.contains_key(key)
    }

    #[inline] pub fn len(&self) -> usize { self.outputs.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.outputs.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterKey, &AlgorithmOutput)> {
        self.outputs.iter()
    }

    /// Report rows stamped with `now`, sorted by key fields.
    pub fn report_rows(&self, now: DateTime<Utc>) -> Vec<ReportRow> {
        let mut entries: Vec<_> = self.outputs.iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.model
                .cmp(&b.model)
                .then_with(|| a.network.cmp(&b.network))
                .then_with(|| a.time_step.cmp(&b.time_step))
                .then_with(|| a.repetitions.cmp(&b.repetitions))
                .then_with(|| a.false_negative.total_cmp(&b.false_negative))
                .then_with(|| a.transmissability.total_cmp(&b.transmissability))
                .then_with(|| a.honeypots.cmp(&b.honeypots))
        });

        entries
            .into_iter()
            .map(|(key, out)| ReportRow {
                model: key.model,
                network: key.network.clone(),
                time_step: key.time_step,
                repetitions: key.repetitions,
                false_negative: key.false_negative,
                transmissability: key.transmissability,
                k: key.honeypots,
                objective: out.objective,
                honeypots: out.honeypots.clone(),
                a_priori_ub: out.a_priori_ub,
                posterior_ub: out.posterior_ub,
                posterior_gap_percent: out.posterior_gap_percent(),
                wall_time_secs: out.wall_time.as_secs_f64(),
                utc: now,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn key(k: usize, r: f64) -> ParameterKey {
        ParameterKey::new(SpreadModel::Raepc, "net", 4, 100, r, 0.5, k)
    }

    fn output(objective: f64, posterior: f64) -> AlgorithmOutput {
        AlgorithmOutput {
            objective,
            honeypots: vec![3, 1],
            wall_time: Duration::from_millis(250),
            a_priori_ub: 1.0,
            posterior_ub: posterior,
        }
    }

    #[test]
    fn upsert_overwrites() {
        let mut cache = ResultCache::new();
        assert!(cache.upsert(key(2, 0.1), output(0.4, 0.6)).is_none());
        let old = cache.upsert(key(2, 0.1), output(0.5, 0.7)).unwrap();
        approx::assert_relative_eq!(old.objective, 0.4);
        assert_eq!(cache.len(), 1);
        approx::assert_relative_eq!(cache.get(&key(2, 0.1)).unwrap().objective, 0.5);
    }

    #[test]
    fn float_fields_compare_by_value() {
        let mut cache = ResultCache::new();
        cache.upsert(key(2, 0.0), output(0.4, 0.6));
        assert!(cache.contains(&key(2, -0.0)));
        assert!(!cache.contains(&key(3, 0.0)));
    }

    #[test]
    fn report_rows_are_sorted_and_stamped() {
        let mut cache = ResultCache::new();
        cache.upsert(key(3, 0.1), output(0.5, 0.6));
        cache.upsert(key(2, 0.1), output(0.0, 0.2));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let rows = cache.report_rows(now);
        assert_eq!(rows.iter().map(|r| r.k).collect::<Vec<_>>(), vec![2, 3]);
        assert!(rows[0].posterior_gap_percent.is_none());
        approx::assert_relative_eq!(rows[1].posterior_gap_percent.unwrap(), 20.0, epsilon = 1e-9);
        approx::assert_relative_eq!(rows[1].wall_time_secs, 0.25);
        assert!(rows.iter().all(|r| r.utc == now));

        let json = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(json["model"], "RAEPC");
        assert_eq!(json["honeypots"], serde_json::json!([3, 1]));
    }
}
