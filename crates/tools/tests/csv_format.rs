//! スコア表CSVのバイト単位での形式検証
//!
//! 出力は既存の集計スクリプトに読まれるため、区切り・ヘッダ2行・
//! total 行の形を固定する。

use std::collections::BTreeMap;

use satbench_core::{compare_summaries, Direction, Metric, Summary};
use tools::table::write_score_csv;

fn summary(rows: &[(&str, &[(Metric, f64)])]) -> Summary {
    rows.iter()
        .map(|(instance, metrics)| {
            let values: BTreeMap<Metric, f64> = metrics.iter().copied().collect();
            (instance.to_string(), values)
        })
        .collect()
}

#[test]
fn csv_layout_is_stable() {
    let summaries = vec![
        (
            "a".to_string(),
            summary(&[
                ("inst1", &[(Metric::BestObjective, 10.0), (Metric::Feasible, 1.0)]),
                ("inst2", &[(Metric::BestObjective, 20.0), (Metric::Feasible, 1.0)]),
            ]),
        ),
        (
            "b".to_string(),
            summary(&[
                ("inst1", &[(Metric::BestObjective, 20.0), (Metric::Feasible, 0.5)]),
                ("inst2", &[(Metric::BestObjective, 20.0), (Metric::Feasible, 1.0)]),
            ]),
        ),
    ];
    let metrics = [
        (Metric::BestObjective, Direction::Min),
        (Metric::Feasible, Direction::Max),
    ];
    let table = compare_summaries(&summaries, &metrics).unwrap();

    let mut buf = Vec::new();
    write_score_csv(&mut buf, &table).unwrap();
    let csv = String::from_utf8(buf).unwrap();

    let expected = "\
instance, best-objective, , feasible, \n\
, a, b, a, b\n\
inst1, 1.00, 0.50, 1.00, 0.50\n\
inst2, 1.00, 1.00, 1.00, 1.00\n\
total, 1.00, 0.75, 1.00, 0.75\n";
    assert_eq!(csv, expected);
}

#[test]
fn open_instances_score_zero_in_csv() {
    // 片側が解なし（+inf 平均）の列は 0.00、最良値側は 1.00 になる
    let summaries = vec![
        (
            "a".to_string(),
            summary(&[("inst1", &[(Metric::BestObjective, 10.0)])]),
        ),
        (
            "b".to_string(),
            summary(&[("inst1", &[(Metric::BestObjective, f64::INFINITY)])]),
        ),
    ];
    let metrics = [(Metric::BestObjective, Direction::Min)];
    let table = compare_summaries(&summaries, &metrics).unwrap();

    let mut buf = Vec::new();
    write_score_csv(&mut buf, &table).unwrap();
    let csv = String::from_utf8(buf).unwrap();

    let expected = "\
instance, best-objective, \n\
, a, b\n\
inst1, 1.00, 0.00\n\
total, 1.00, 0.00\n";
    assert_eq!(csv, expected);
}
