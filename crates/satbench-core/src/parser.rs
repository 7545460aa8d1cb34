//! ソルバー実行ログのパーサ
//!
//! ログは行単位の固定文法で、認識したタグ行はトークン数まで厳密に検査する。
//! 軌跡（インカンベント更新列）はリスタート報告を起点とする複数行の
//! サブ文法なので、先読みに頼らず明示的な状態機械で読む。
//!
//! 途中で切れたログは「不完全な軌跡」として成立する（クラスタのタイム
//! リミットで kill された実行が正常系のため）。一方、タグ行の形式違反と
//! ログ本文中のエラーマーカーは即座に解析全体を失敗させる。

use std::collections::BTreeMap;

use crate::error::{ParseError, ParseResult};
use crate::metric::Metric;
use crate::record::{RunRecord, SolutionEvent};

// ---------------------------------------------------------------------------
// 行タグ定義
// ---------------------------------------------------------------------------

/// 本文のどこに現れても解析を打ち切るマーカー
const ERROR_MARKERS: &[&str] = &["ERROR", "error", "Error", "Solution not OK"];

/// リスタートサイクルを空振りにするマーカー（リスタートは起きたが解は出ない）
const SKIP_CYCLE_MARKERS: &[&str] =
    &["c linear search initial bound", "timeout", "c preprocessor harden"];

/// 2解目以降の目的値行の直前に必ず挟まる内部チェック行
const CHECKING_NOTICE: &str = "c not debug checking satisfaction of encoded constraints..";

const TAG_FILE: &str = "c File: ";
const TAG_CONFLICTS_UNTIL_RESTART: &str = "c conflicts until restart:";
const TAG_RESTART_COUNTER: &str = "c restart counter:";
const TAG_OBJECTIVE: &str = "o ";
const TAG_SOLUTION_TIME: &str = "c t = ";

/// 値トークンの数値型
#[derive(Debug, Clone, Copy)]
enum ValueKind {
    Int,
    Float,
    /// float。MSVC 由来の `nan(ind)` 表記だけは 0 に読み替える
    FloatNanZero,
}

/// 単純メトリクス行の仕様（タグ / 総トークン数 / 値の位置 / 型 / 書き込み先）
struct MetricLineSpec {
    tag: &'static str,
    tokens: usize,
    value_index: usize,
    kind: ValueKind,
    metric: Metric,
}

/// タグ判定は表の順に行う。`c nb learnts DL2:` と `c nb learnts:` のように
/// 似たタグが並ぶため、順序はソルバーの出力仕様に合わせて固定。
const METRIC_LINE_SPECS: &[MetricLineSpec] = &[
    MetricLineSpec {
        tag: "c Time spent reading the file:",
        tokens: 7,
        value_index: 6,
        kind: ValueKind::Float,
        metric: Metric::TimeReadingFile,
    },
    MetricLineSpec {
        tag: "c num lexicographical objectives:",
        tokens: 5,
        value_index: 4,
        kind: ValueKind::Int,
        metric: Metric::NumLexiObjectives,
    },
    MetricLineSpec {
        tag: "c blocked restarts:",
        tokens: 4,
        value_index: 3,
        kind: ValueKind::Int,
        metric: Metric::NumBlockedRestarts,
    },
    MetricLineSpec {
        tag: "c nb removed clauses:",
        tokens: 5,
        value_index: 4,
        kind: ValueKind::Int,
        metric: Metric::NumRemovedClauses,
    },
    MetricLineSpec {
        tag: "c nb learnts DL2:",
        tokens: 5,
        value_index: 4,
        kind: ValueKind::Int,
        metric: Metric::NumLearntSize2,
    },
    MetricLineSpec {
        tag: "c nb learnts size 1:",
        tokens: 6,
        value_index: 5,
        kind: ValueKind::Int,
        metric: Metric::NumLearntSize1,
    },
    MetricLineSpec {
        tag: "c nb learnts size 3:",
        tokens: 6,
        value_index: 5,
        kind: ValueKind::Int,
        metric: Metric::NumLearntSize3,
    },
    MetricLineSpec {
        tag: "c nb learnts:",
        tokens: 4,
        value_index: 3,
        kind: ValueKind::Int,
        metric: Metric::NumLearntClauses,
    },
    MetricLineSpec {
        tag: "c avg learnt clause size:",
        tokens: 6,
        value_index: 5,
        kind: ValueKind::FloatNanZero,
        metric: Metric::AvgLearntClauseSize,
    },
    MetricLineSpec {
        tag: "c current number of learned clauses:",
        tokens: 7,
        value_index: 6,
        kind: ValueKind::Int,
        metric: Metric::NumLearntClauses,
    },
    MetricLineSpec {
        tag: "c ratio of learned clauses:",
        tokens: 6,
        value_index: 5,
        kind: ValueKind::Float,
        metric: Metric::RatioLearntClauses,
    },
    MetricLineSpec {
        tag: "c conflicts:",
        tokens: 3,
        value_index: 2,
        kind: ValueKind::Int,
        metric: Metric::NumConflicts,
    },
    MetricLineSpec {
        tag: "c decisions:",
        tokens: 3,
        value_index: 2,
        kind: ValueKind::Int,
        metric: Metric::NumDecisions,
    },
    MetricLineSpec {
        tag: "c propagations:",
        tokens: 3,
        value_index: 2,
        kind: ValueKind::Int,
        metric: Metric::NumPropagations,
    },
    MetricLineSpec {
        tag: "c Primal integral:",
        tokens: 4,
        value_index: 3,
        kind: ValueKind::Float,
        metric: Metric::PrimalIntegral,
    },
    MetricLineSpec {
        tag: "c wallclock time:",
        tokens: 5,
        value_index: 3,
        kind: ValueKind::Int,
        metric: Metric::TimeWallclock,
    },
    MetricLineSpec {
        tag: "c CPU time:",
        tokens: 4,
        value_index: 3,
        kind: ValueKind::Float,
        metric: Metric::TimeCpu,
    },
];

// ---------------------------------------------------------------------------
// 軌跡サブ文法の状態機械
// ---------------------------------------------------------------------------

/// リスタートサイクルの読み取り状態
///
/// 1サイクルは `c conflicts until restart:` → `c restart counter:` →
/// （skip マーカー | [チェック行] [o 行 → `c t = ` 行]）の並び。
#[derive(Debug, Clone, Copy)]
enum TrajectoryState {
    /// サイクル外。メトリクス行・ファイル行を受け付ける
    Idle,
    /// リスタート回数行を待っている
    AwaitingRestartCounter { conflicts: u64 },
    /// サイクル本体。skip マーカーか目的値行か、その前のチェック行か
    AwaitingObjective {
        conflicts: u64,
        restart_counter: u64,
        notice_consumed: bool,
    },
    /// 目的値は読めた。解発見時刻行を待っている
    AwaitingTime {
        conflicts: u64,
        restart_counter: u64,
        objective: i64,
    },
}

// ---------------------------------------------------------------------------
// 公開 API
// ---------------------------------------------------------------------------

/// ソルバーログ本文を [`RunRecord`] へ解析する
///
/// 認識しない行は読み飛ばす。認識したタグ行の形式違反・エラーマーカー・
/// 軌跡の単調性破れはすべて [`ParseError`] として返す。入力途中での
/// 打ち切り（途絶ログ）はエラーではなく、そこまでの軌跡を持つ
/// レコードになる。
pub fn parse_run_log(text: &str) -> ParseResult<RunRecord> {
    let mut source_file: Option<String> = None;
    let mut metrics: BTreeMap<Metric, f64> = BTreeMap::new();
    let mut solutions: Vec<SolutionEvent> = Vec::new();
    let mut state = TrajectoryState::Idle;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        check_error_markers(line, line_no)?;

        state = match state {
            TrajectoryState::Idle => {
                if line.contains(TAG_CONFLICTS_UNTIL_RESTART) {
                    let tokens = expect_tokens(line, line_no, TAG_CONFLICTS_UNTIL_RESTART, 5)?;
                    let conflicts = parse_uint(tokens[4], line_no, TAG_CONFLICTS_UNTIL_RESTART)?;
                    TrajectoryState::AwaitingRestartCounter { conflicts }
                } else {
                    record_idle_line(line, line_no, &mut source_file, &mut metrics)?;
                    TrajectoryState::Idle
                }
            }
            TrajectoryState::AwaitingRestartCounter { conflicts } => {
                if !line.contains(TAG_RESTART_COUNTER) {
                    return Err(ParseError::FormatViolation {
                        line: line_no,
                        tag: TAG_RESTART_COUNTER,
                        detail: "expected restart counter line after conflict report".to_string(),
                    });
                }
                let tokens = expect_tokens(line, line_no, TAG_RESTART_COUNTER, 4)?;
                let restart_counter = parse_uint(tokens[3], line_no, TAG_RESTART_COUNTER)?;
                TrajectoryState::AwaitingObjective {
                    conflicts,
                    restart_counter,
                    notice_consumed: false,
                }
            }
            TrajectoryState::AwaitingObjective {
                conflicts,
                restart_counter,
                notice_consumed,
            } => {
                if !notice_consumed && SKIP_CYCLE_MARKERS.iter().any(|m| line.contains(m)) {
                    // リスタートはしたが解報告はないサイクル
                    TrajectoryState::Idle
                } else if !notice_consumed && !solutions.is_empty() {
                    if !line.contains(CHECKING_NOTICE) {
                        return Err(ParseError::FormatViolation {
                            line: line_no,
                            tag: CHECKING_NOTICE,
                            detail: "checking notice is mandatory once a solution exists"
                                .to_string(),
                        });
                    }
                    TrajectoryState::AwaitingObjective {
                        conflicts,
                        restart_counter,
                        notice_consumed: true,
                    }
                } else if line.contains(TAG_OBJECTIVE) {
                    let tokens = expect_tokens(line, line_no, TAG_OBJECTIVE, 2)?;
                    let objective = parse_int(tokens[1], line_no, TAG_OBJECTIVE)?;
                    TrajectoryState::AwaitingTime {
                        conflicts,
                        restart_counter,
                        objective,
                    }
                } else {
                    // このサイクルでは新しいインカンベントなし。行は消費する
                    TrajectoryState::Idle
                }
            }
            TrajectoryState::AwaitingTime {
                conflicts,
                restart_counter,
                objective,
            } => {
                if !line.contains(TAG_SOLUTION_TIME) {
                    return Err(ParseError::FormatViolation {
                        line: line_no,
                        tag: TAG_SOLUTION_TIME,
                        detail: "expected solution time line after objective".to_string(),
                    });
                }
                let tokens = expect_tokens(line, line_no, TAG_SOLUTION_TIME, 4)?;
                let time_ms = parse_uint(tokens[3], line_no, TAG_SOLUTION_TIME)?;
                solutions.push(SolutionEvent {
                    objective,
                    restart_counter,
                    conflicts_until_restart: conflicts,
                    time_ms: Some(time_ms),
                });
                TrajectoryState::Idle
            }
        };
    }

    // サイクル途中での入力途絶。目的値まで読めていれば時刻なしで採用し、
    // それより手前なら未完のサイクルごと捨てる
    if let TrajectoryState::AwaitingTime {
        conflicts,
        restart_counter,
        objective,
    } = state
    {
        solutions.push(SolutionEvent {
            objective,
            restart_counter,
            conflicts_until_restart: conflicts,
            time_ms: None,
        });
    }

    validate_trajectory(&solutions)?;

    Ok(RunRecord {
        source_file,
        feasible: !solutions.is_empty(),
        best_objective: solutions.iter().map(|e| e.objective).min(),
        solutions,
        metrics,
    })
}

// ---------------------------------------------------------------------------
// 行の処理
// ---------------------------------------------------------------------------

fn check_error_markers(line: &str, line_no: usize) -> ParseResult<()> {
    for marker in ERROR_MARKERS {
        if line.contains(marker) {
            return Err(ParseError::EmbeddedErrorMarker {
                line: line_no,
                marker,
            });
        }
    }
    Ok(())
}

/// Idle 状態の行（ファイル行・メトリクス行・その他）を処理する
fn record_idle_line(
    line: &str,
    line_no: usize,
    source_file: &mut Option<String>,
    metrics: &mut BTreeMap<Metric, f64>,
) -> ParseResult<()> {
    if line.contains(TAG_FILE) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(ParseError::FormatViolation {
                line: line_no,
                tag: TAG_FILE,
                detail: format!("expected at least 3 tokens, found {}", tokens.len()),
            });
        }
        // パスに空白が含まれる場合に備えて残りトークンを繋ぎ直す
        *source_file = Some(tokens[2..].join(" "));
        return Ok(());
    }

    for spec in METRIC_LINE_SPECS {
        if line.contains(spec.tag) {
            let tokens = expect_tokens(line, line_no, spec.tag, spec.tokens)?;
            let value = parse_metric_value(tokens[spec.value_index], spec.kind, line_no, spec.tag)?;
            metrics.insert(spec.metric, value);
            return Ok(());
        }
    }

    // 未知の行は仕様上ノイズとして無視
    Ok(())
}

// ---------------------------------------------------------------------------
// トークン処理
// ---------------------------------------------------------------------------

fn expect_tokens<'a>(
    line: &'a str,
    line_no: usize,
    tag: &'static str,
    expected: usize,
) -> ParseResult<Vec<&'a str>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != expected {
        return Err(ParseError::FormatViolation {
            line: line_no,
            tag,
            detail: format!("expected {} tokens, found {}", expected, tokens.len()),
        });
    }
    Ok(tokens)
}

fn parse_int(token: &str, line_no: usize, tag: &'static str) -> ParseResult<i64> {
    token.parse::<i64>().map_err(|_| ParseError::FormatViolation {
        line: line_no,
        tag,
        detail: format!("'{token}' is not an integer"),
    })
}

fn parse_uint(token: &str, line_no: usize, tag: &'static str) -> ParseResult<u64> {
    token.parse::<u64>().map_err(|_| ParseError::FormatViolation {
        line: line_no,
        tag,
        detail: format!("'{token}' is not a non-negative integer"),
    })
}

fn parse_float(token: &str, line_no: usize, tag: &'static str) -> ParseResult<f64> {
    token.parse::<f64>().map_err(|_| ParseError::FormatViolation {
        line: line_no,
        tag,
        detail: format!("'{token}' is not a number"),
    })
}

fn parse_metric_value(
    token: &str,
    kind: ValueKind,
    line_no: usize,
    tag: &'static str,
) -> ParseResult<f64> {
    match kind {
        ValueKind::Int => parse_int(token, line_no, tag).map(|v| v as f64),
        ValueKind::Float => parse_float(token, line_no, tag),
        ValueKind::FloatNanZero => {
            if token.contains("nan(ind)") {
                Ok(0.0)
            } else {
                parse_float(token, line_no, tag)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 軌跡の検証
// ---------------------------------------------------------------------------

/// 解析後の軌跡に対する単調性チェック
///
/// ソルバー側の不具合（目的値が改善しない・リスタート回数が戻る等）を
/// データとして取り込む前に弾く。
fn validate_trajectory(solutions: &[SolutionEvent]) -> ParseResult<()> {
    for (i, pair) in solutions.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.objective >= prev.objective {
            return Err(ParseError::MonotonicityViolation {
                context: format!(
                    "solutions[{}] -> [{}]: objective {} -> {} does not improve",
                    i,
                    i + 1,
                    prev.objective,
                    next.objective
                ),
            });
        }
        if let (Some(a), Some(b)) = (prev.time_ms, next.time_ms) {
            if b < a {
                return Err(ParseError::MonotonicityViolation {
                    context: format!(
                        "solutions[{}] -> [{}]: time {}ms -> {}ms runs backwards",
                        i,
                        i + 1,
                        a,
                        b
                    ),
                });
            }
        }
        if next.restart_counter <= prev.restart_counter {
            return Err(ParseError::MonotonicityViolation {
                context: format!(
                    "solutions[{}] -> [{}]: restart counter {} -> {} does not advance",
                    i,
                    i + 1,
                    prev.restart_counter,
                    next.restart_counter
                ),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_cycle_log() {
        let log = "\
c File: models/test.lp
c conflicts until restart: 100
c restart counter: 1
o 42
c t = 500
c conflicts: 3
";
        let record = parse_run_log(log).unwrap();
        assert_eq!(record.source_file.as_deref(), Some("models/test.lp"));
        assert!(record.feasible);
        assert_eq!(record.best_objective, Some(42));
        assert_eq!(record.solutions.len(), 1);
        let event = &record.solutions[0];
        assert_eq!(event.objective, 42);
        assert_eq!(event.restart_counter, 1);
        assert_eq!(event.conflicts_until_restart, 100);
        assert_eq!(event.time_ms, Some(500));
        assert_eq!(record.metrics.get(&Metric::NumConflicts), Some(&3.0));
    }

    #[test]
    fn embedded_error_marker_is_fatal_anywhere() {
        let log = "\
c conflicts until restart: 100
c restart counter: 1
o 42
c t = 500
ERROR some solver failure
";
        match parse_run_log(log) {
            Err(ParseError::EmbeddedErrorMarker { line, marker }) => {
                assert_eq!(line, 5);
                assert_eq!(marker, "ERROR");
            }
            other => panic!("expected error marker failure, got {other:?}"),
        }
        assert!(parse_run_log("c comment\nSolution not OK\n").is_err());
    }

    #[test]
    fn later_solutions_require_checking_notice() {
        let log = "\
c conflicts until restart: 100
c restart counter: 1
o 50
c t = 100
c conflicts until restart: 200
c restart counter: 2
c not debug checking satisfaction of encoded constraints..
o 40
c t = 900
";
        let record = parse_run_log(log).unwrap();
        assert_eq!(record.solutions.len(), 2);
        assert_eq!(record.best_objective, Some(40));

        let without_notice = "\
c conflicts until restart: 100
c restart counter: 1
o 50
c t = 100
c conflicts until restart: 200
c restart counter: 2
o 40
c t = 900
";
        match parse_run_log(without_notice) {
            Err(ParseError::FormatViolation { line, .. }) => assert_eq!(line, 7),
            other => panic!("expected format violation, got {other:?}"),
        }
    }

    #[test]
    fn skip_markers_cancel_the_cycle() {
        for marker in ["c linear search initial bound found", "solver timeout reached"] {
            let log = format!(
                "c conflicts until restart: 100\nc restart counter: 1\n{marker}\n"
            );
            let record = parse_run_log(&log).unwrap();
            assert!(!record.feasible, "marker {marker:?} should cancel the cycle");
            assert!(record.solutions.is_empty());
        }
    }

    #[test]
    fn cycle_without_incumbent_consumes_the_candidate_line() {
        // サイクル3行目に解報告がない場合、その行は再分類されない
        let log = "\
c conflicts until restart: 100
c restart counter: 1
c conflicts: 3
";
        let record = parse_run_log(log).unwrap();
        assert!(record.solutions.is_empty());
        assert!(!record.metrics.contains_key(&Metric::NumConflicts));
    }

    #[test]
    fn truncated_log_is_an_incomplete_trajectory() {
        // 時刻行の手前で途絶: 目的値は時刻なしで採用する
        let after_objective = "\
c conflicts until restart: 100
c restart counter: 1
o 42
";
        let record = parse_run_log(after_objective).unwrap();
        assert_eq!(record.solutions.len(), 1);
        assert_eq!(record.solutions[0].time_ms, None);
        assert_eq!(record.best_objective, Some(42));

        // リスタート回数行の手前で途絶: サイクルごと捨てる
        let after_conflicts = "c conflicts until restart: 100\n";
        let record = parse_run_log(after_conflicts).unwrap();
        assert!(record.solutions.is_empty());
        assert!(!record.feasible);
    }

    #[test]
    fn wrong_token_counts_are_rejected() {
        let bad_conflicts = "c conflicts until restart: 100 extra\n";
        assert!(matches!(
            parse_run_log(bad_conflicts),
            Err(ParseError::FormatViolation { line: 1, .. })
        ));

        let bad_objective = "\
c conflicts until restart: 100
c restart counter: 1
o 42 extra
";
        assert!(matches!(
            parse_run_log(bad_objective),
            Err(ParseError::FormatViolation { line: 3, .. })
        ));

        let bad_metric = "c conflicts: not-a-number\n";
        assert!(matches!(
            parse_run_log(bad_metric),
            Err(ParseError::FormatViolation { line: 1, .. })
        ));
    }

    #[test]
    fn non_improving_objective_is_rejected() {
        let log = "\
c conflicts until restart: 100
c restart counter: 1
o 50
c t = 100
c conflicts until restart: 200
c restart counter: 2
c not debug checking satisfaction of encoded constraints..
o 50
c t = 900
";
        assert!(matches!(
            parse_run_log(log),
            Err(ParseError::MonotonicityViolation { .. })
        ));
    }

    #[test]
    fn stale_restart_counter_is_rejected() {
        let log = "\
c conflicts until restart: 100
c restart counter: 3
o 50
c t = 100
c conflicts until restart: 200
c restart counter: 3
c not debug checking satisfaction of encoded constraints..
o 40
c t = 900
";
        assert!(matches!(
            parse_run_log(log),
            Err(ParseError::MonotonicityViolation { .. })
        ));
    }

    #[test]
    fn extracts_auxiliary_metrics() {
        let log = "\
c Time spent reading the file: 0.25
c num lexicographical objectives: 2
c blocked restarts: 7
c avg learnt clause size: nan(ind)
c Primal integral: inf
c wallclock time: 3600 s
c CPU time: 12.5
c decisions: 200
c propagations: 99000
";
        let record = parse_run_log(log).unwrap();
        assert_eq!(record.metrics.get(&Metric::TimeReadingFile), Some(&0.25));
        assert_eq!(record.metrics.get(&Metric::NumLexiObjectives), Some(&2.0));
        assert_eq!(record.metrics.get(&Metric::NumBlockedRestarts), Some(&7.0));
        assert_eq!(record.metrics.get(&Metric::AvgLearntClauseSize), Some(&0.0));
        assert_eq!(
            record.metrics.get(&Metric::PrimalIntegral),
            Some(&f64::INFINITY)
        );
        assert_eq!(record.metrics.get(&Metric::TimeWallclock), Some(&3600.0));
        assert_eq!(record.metrics.get(&Metric::TimeCpu), Some(&12.5));
        assert_eq!(record.metrics.get(&Metric::NumDecisions), Some(&200.0));
        assert_eq!(record.metrics.get(&Metric::NumPropagations), Some(&99000.0));
        assert!(!record.feasible);
    }

    #[test]
    fn file_path_with_spaces_is_rejoined() {
        let record = parse_run_log("c File: /data/my instance.lp\n").unwrap();
        assert_eq!(record.source_file.as_deref(), Some("/data/my instance.lp"));
    }

    #[test]
    fn unknown_lines_and_empty_input_are_fine() {
        let record = parse_run_log("c some random solver chatter\n\n").unwrap();
        assert!(record.metrics.is_empty());
        assert!(!record.feasible);
        assert_eq!(record.best_objective, None);

        let record = parse_run_log("").unwrap();
        assert!(record.solutions.is_empty());
    }
}
