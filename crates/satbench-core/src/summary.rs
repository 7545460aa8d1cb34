//! バッチ集計
//!
//! インスタンスごとの繰り返し実行（シード違い）をメトリクス平均に潰す。
//! スコア表はこの平均値の上に組み立てる。

use crate::metric::Metric;
use crate::record::{BatchResult, RunRecord, Summary};

/// バッチ結果をインスタンス単位のメトリクス平均へ集計する
///
/// 各メトリクスは、値が存在しかつ有限な実行だけの算術平均。どの実行も
/// 有限値を報告しなかった場合は +inf を入れる（「有限値なし」の印。
/// 未報告と inf 報告の区別はこの段階で失われる）。実行順に依存しない。
pub fn summarize(batch: &BatchResult, metrics: &[Metric]) -> Summary {
    batch
        .iter()
        .map(|(instance, runs)| {
            let averages = metrics
                .iter()
                .map(|&metric| (metric, mean_metric(runs, metric)))
                .collect();
            (instance.clone(), averages)
        })
        .collect()
}

fn mean_metric(runs: &[RunRecord], metric: Metric) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for run in runs {
        if let Some(value) = run.metric_value(metric) {
            if value.is_finite() {
                sum += value;
                count += 1;
            }
        }
    }
    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn feasible_run(best_objective: i64, metrics: &[(Metric, f64)]) -> RunRecord {
        RunRecord {
            source_file: None,
            feasible: true,
            best_objective: Some(best_objective),
            solutions: Vec::new(),
            metrics: metrics.iter().copied().collect(),
        }
    }

    fn infeasible_run() -> RunRecord {
        RunRecord {
            source_file: None,
            feasible: false,
            best_objective: None,
            solutions: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    #[test]
    fn averages_repeated_runs() {
        let mut batch = BatchResult::new();
        batch.insert(
            "inst1".to_string(),
            vec![feasible_run(10, &[]), feasible_run(20, &[])],
        );
        let summary = summarize(&batch, &[Metric::BestObjective, Metric::Feasible]);
        let averages = &summary["inst1"];
        assert_eq!(averages[&Metric::BestObjective], 15.0);
        assert_eq!(averages[&Metric::Feasible], 1.0);
    }

    #[test]
    fn feasible_average_is_a_success_rate() {
        let mut batch = BatchResult::new();
        batch.insert(
            "inst1".to_string(),
            vec![feasible_run(10, &[]), infeasible_run(), infeasible_run(), feasible_run(12, &[])],
        );
        let summary = summarize(&batch, &[Metric::Feasible, Metric::BestObjective]);
        let averages = &summary["inst1"];
        assert_eq!(averages[&Metric::Feasible], 0.5);
        // 実行可能だった2回だけの平均
        assert_eq!(averages[&Metric::BestObjective], 11.0);
    }

    #[test]
    fn run_order_does_not_change_the_averages() {
        let runs = vec![
            feasible_run(10, &[(Metric::NumConflicts, 100.0)]),
            feasible_run(20, &[(Metric::NumConflicts, 250.0)]),
            feasible_run(30, &[(Metric::NumConflicts, 400.0)]),
        ];
        let mut reversed = runs.clone();
        reversed.reverse();

        let mut forward = BatchResult::new();
        forward.insert("inst1".to_string(), runs);
        let mut backward = BatchResult::new();
        backward.insert("inst1".to_string(), reversed);

        let metrics = [Metric::BestObjective, Metric::NumConflicts];
        assert_eq!(summarize(&forward, &metrics), summarize(&backward, &metrics));
    }

    #[test]
    fn absent_and_non_finite_values_are_excluded() {
        let mut batch = BatchResult::new();
        batch.insert(
            "inst1".to_string(),
            vec![
                feasible_run(10, &[(Metric::NumPropagations, 100.0)]),
                feasible_run(10, &[(Metric::PrimalIntegral, f64::INFINITY)]),
            ],
        );
        let summary = summarize(
            &batch,
            &[Metric::NumPropagations, Metric::PrimalIntegral],
        );
        let averages = &summary["inst1"];
        // 片方の実行にしか無い値は、その1件の平均
        assert_eq!(averages[&Metric::NumPropagations], 100.0);
        // inf 報告しか無ければ「有限値なし」
        assert_eq!(averages[&Metric::PrimalIntegral], f64::INFINITY);
    }

    #[test]
    fn instance_without_finite_values_gets_infinity() {
        let mut batch = BatchResult::new();
        batch.insert("inst1".to_string(), vec![infeasible_run()]);
        batch.insert("inst2".to_string(), Vec::new());
        let summary = summarize(&batch, &[Metric::BestObjective]);
        assert_eq!(summary["inst1"][&Metric::BestObjective], f64::INFINITY);
        assert_eq!(summary["inst2"][&Metric::BestObjective], f64::INFINITY);
    }
}
