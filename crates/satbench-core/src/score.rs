//! Cross-solver score tables.
//!
//! Turns per-instance metric averages into normalized scores: within each
//! (instance, metric) cell group the best configuration scores 1.00 and the
//! others score proportionally less, so wins and losses are comparable
//! across instances of very different scale. A footer row carries the
//! per-column mean over all instances.
//!
//! `aggregate_bound_scores` is the analogous ranking for external-solver
//! upper bounds collected per benchmark.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CompareError, CompareResult};
use crate::metric::{Direction, Metric};
use crate::record::{BoundsRecord, Summary};

/// One instance row of a score table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub instance: String,
    /// Scores in column order: metric-major, then one column per solver label
    pub scores: Vec<f64>,
}

/// Normalized comparison table over two or more solver configurations.
///
/// Built once by [`compare_summaries`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    /// Compared metrics with their optimization direction, in column order
    pub metrics: Vec<(Metric, Direction)>,
    /// Solver labels, in the order they appear within each metric group
    pub labels: Vec<String>,
    /// One row per instance, lexicographically ordered
    pub rows: Vec<ScoreRow>,
    /// Per-column mean of the (rounded) scores over all instances
    pub totals: Vec<f64>,
}

impl ScoreTable {
    /// Render the table as text cells in the layout the comparison CSV uses:
    /// a metric-group header with blank spanning cells, a solver-label row,
    /// instance rows, and a `total` footer.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let columns = self.metrics.len() * self.labels.len();
        let mut out = Vec::with_capacity(self.rows.len() + 3);

        let mut metric_header = Vec::with_capacity(columns + 1);
        metric_header.push("instance".to_string());
        for (metric, _) in &self.metrics {
            metric_header.push(metric.to_string());
            for _ in 1..self.labels.len() {
                metric_header.push(String::new());
            }
        }
        out.push(metric_header);

        let mut label_header = Vec::with_capacity(columns + 1);
        label_header.push(String::new());
        for _ in &self.metrics {
            label_header.extend(self.labels.iter().cloned());
        }
        out.push(label_header);

        for row in &self.rows {
            let mut cells = Vec::with_capacity(columns + 1);
            cells.push(row.instance.clone());
            cells.extend(row.scores.iter().map(|score| format!("{score:.2}")));
            out.push(cells);
        }

        let mut footer = Vec::with_capacity(columns + 1);
        footer.push("total".to_string());
        footer.extend(self.totals.iter().map(|score| format!("{score:.2}")));
        out.push(footer);
        out
    }
}

/// Build a score table from labeled summaries.
///
/// Every summary must cover the union of all instance names; a comparison
/// over mismatched instance sets would silently reward whoever skipped the
/// hard instances, so it is rejected outright and no partial table is
/// produced.
pub fn compare_summaries(
    summaries: &[(String, Summary)],
    metrics: &[(Metric, Direction)],
) -> CompareResult<ScoreTable> {
    if summaries.len() < 2 {
        return Err(CompareError::TooFewSummaries {
            found: summaries.len(),
        });
    }

    let all_instances: BTreeSet<String> = summaries
        .iter()
        .flat_map(|(_, summary)| summary.keys().cloned())
        .collect();
    for (label, summary) in summaries {
        if summary.len() != all_instances.len() {
            return Err(CompareError::MissingInstanceCoverage {
                label: label.clone(),
                expected: all_instances.len(),
                found: summary.len(),
            });
        }
    }

    let columns = metrics.len() * summaries.len();
    let mut rows = Vec::with_capacity(all_instances.len());
    let mut column_sums = vec![0.0_f64; columns];

    for instance in &all_instances {
        let mut scores = Vec::with_capacity(columns);
        for &(metric, direction) in metrics {
            let values: Vec<f64> = summaries
                .iter()
                .map(|(_, summary)| {
                    summary
                        .get(instance)
                        .and_then(|averages| averages.get(&metric))
                        .copied()
                        .unwrap_or(f64::INFINITY)
                })
                .collect();
            let best = match direction {
                Direction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
                Direction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            };
            for value in values {
                scores.push(score_against_best(value, best, direction));
            }
        }
        for (sum, score) in column_sums.iter_mut().zip(&scores) {
            *sum += *score;
        }
        rows.push(ScoreRow {
            instance: instance.clone(),
            scores,
        });
    }

    let totals = if rows.is_empty() {
        vec![0.0; columns]
    } else {
        column_sums.iter().map(|sum| sum / rows.len() as f64).collect()
    };

    Ok(ScoreTable {
        metrics: metrics.to_vec(),
        labels: summaries.iter().map(|(label, _)| label.clone()).collect(),
        rows,
        totals,
    })
}

/// Normalize one averaged value against the best value of its cell group.
///
/// Ties with the best score 1.00 (this includes the all-zero group, where
/// the plain ratio would be 0/0). A group where nobody produced a finite
/// average earns nobody credit.
fn score_against_best(value: f64, best: f64, direction: Direction) -> f64 {
    if !best.is_finite() {
        return 0.0;
    }
    if value == best {
        return 1.0;
    }
    let ratio = match direction {
        Direction::Min => best / value,
        Direction::Max => value / best,
    };
    round2(ratio)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Rank solver configurations by the quality of their final upper bounds.
///
/// Per benchmark, the best (lowest) upper bound across all configurations
/// sets the yardstick and each configuration earns `(best + 1) / (ub + 1)`
/// (the offset keeps bound 0 well-defined; an infinite upper bound earns 0).
/// Benchmarks where no configuration found any bound score 0 for everyone.
/// Scores are summed over all benchmarks, so higher is better and the
/// maximum equals the number of benchmarks.
pub fn aggregate_bound_scores(
    configs: &[String],
    benchmarks: &[String],
    results: &BTreeMap<String, BTreeMap<String, BoundsRecord>>,
) -> CompareResult<BTreeMap<String, f64>> {
    let mut scores: BTreeMap<String, f64> =
        configs.iter().map(|config| (config.clone(), 0.0)).collect();

    for benchmark in benchmarks {
        let mut best_ub = f64::INFINITY;
        for config in configs {
            best_ub = best_ub.min(lookup_bounds(results, config, benchmark, benchmarks.len())?.upper_bound);
        }
        if !best_ub.is_finite() {
            continue;
        }
        for config in configs {
            let ub = lookup_bounds(results, config, benchmark, benchmarks.len())?.upper_bound;
            // x / inf == 0, so an open bound adds nothing
            if let Some(score) = scores.get_mut(config) {
                *score += (best_ub + 1.0) / (ub + 1.0);
            }
        }
    }
    Ok(scores)
}

fn lookup_bounds<'a>(
    results: &'a BTreeMap<String, BTreeMap<String, BoundsRecord>>,
    config: &str,
    benchmark: &str,
    expected: usize,
) -> CompareResult<&'a BoundsRecord> {
    results
        .get(config)
        .and_then(|per_benchmark| per_benchmark.get(benchmark))
        .ok_or_else(|| CompareError::MissingInstanceCoverage {
            label: config.to_string(),
            expected,
            found: results.get(config).map_or(0, |m| m.len()),
        })
}
