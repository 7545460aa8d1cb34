//! 実行記録の型定義
//!
//! パーサが生成する構造化レコード。一度構築したら不変で、集計・比較側は
//! 参照でのみ受け取る。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// リスタートサイクル内で記録されたインカンベント更新1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionEvent {
    /// 目的値（軌跡内では狭義単調減少）
    pub objective: i64,
    /// 累積リスタート回数（狭義単調増加）
    pub restart_counter: u64,
    /// 次リスタートまでのコンフリクト数
    pub conflicts_until_restart: u64,
    /// 解発見時刻（ミリ秒）。ログ途絶で時刻行を失った場合のみ None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
}

/// 1インスタンスに対する1回のソルバー実行の解析結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// ログ中の `c File: ` 行から取った入力ファイルパス
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// 実行可能解が1つでも見つかったか
    pub feasible: bool,
    /// 最良（最小）目的値。解が無ければ None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_objective: Option<i64>,
    /// インカンベント更新の軌跡（時系列順）
    pub solutions: Vec<SolutionEvent>,
    /// 付随カウンタ類。報告されなかったメトリクスはキーごと存在しない
    pub metrics: BTreeMap<Metric, f64>,
}

impl RunRecord {
    /// メトリクス値への統一アクセサ
    ///
    /// `BestObjective` / `Feasible` はフィールドから導出し、残りは
    /// `metrics` マップを引く。未報告は None（0 とは区別される）。
    /// 報告値そのものが非有限（inf な primal integral 等）の場合は
    /// その値を返し、除外判断は集計側に委ねる。
    pub fn metric_value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::BestObjective => self.best_objective.map(|v| v as f64),
            Metric::Feasible => Some(if self.feasible { 1.0 } else { 0.0 }),
            other => self.metrics.get(&other).copied(),
        }
    }
}

/// 外部ソルバーのログから抽出した上下界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsRecord {
    /// 下界。既定 0、ログ中で非減少
    pub lower_bound: f64,
    /// 上界。インカンベント未発見なら +inf、ログ中で非増加
    pub upper_bound: f64,
}

impl Default for BoundsRecord {
    fn default() -> Self {
        BoundsRecord {
            lower_bound: 0.0,
            upper_bound: f64::INFINITY,
        }
    }
}

impl BoundsRecord {
    /// 上界が一度でも報告されたか
    pub fn has_upper_bound(&self) -> bool {
        self.upper_bound.is_finite()
    }

    /// 上下界が閉じた（= 最適性が証明された）状態か
    pub fn is_closed(&self) -> bool {
        self.lower_bound.is_finite() && self.lower_bound == self.upper_bound
    }
}

/// バッチ実行の結果: インスタンス名 → シード順の実行列
pub type BatchResult = BTreeMap<String, Vec<RunRecord>>;

/// バッチ集計: インスタンス名 → メトリクス → 平均値
pub type Summary = BTreeMap<String, BTreeMap<Metric, f64>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(metrics: &[(Metric, f64)]) -> RunRecord {
        RunRecord {
            source_file: None,
            feasible: true,
            best_objective: Some(42),
            solutions: Vec::new(),
            metrics: metrics.iter().copied().collect(),
        }
    }

    #[test]
    fn metric_value_dispatch() {
        let rec = record_with(&[(Metric::NumConflicts, 120.0)]);
        assert_eq!(rec.metric_value(Metric::BestObjective), Some(42.0));
        assert_eq!(rec.metric_value(Metric::Feasible), Some(1.0));
        assert_eq!(rec.metric_value(Metric::NumConflicts), Some(120.0));
        assert_eq!(rec.metric_value(Metric::NumDecisions), None);
    }

    #[test]
    fn infeasible_record_has_no_best_objective() {
        let rec = RunRecord {
            source_file: None,
            feasible: false,
            best_objective: None,
            solutions: Vec::new(),
            metrics: BTreeMap::new(),
        };
        assert_eq!(rec.metric_value(Metric::BestObjective), None);
        assert_eq!(rec.metric_value(Metric::Feasible), Some(0.0));
    }

    #[test]
    fn bounds_record_defaults_open() {
        let bounds = BoundsRecord::default();
        assert_eq!(bounds.lower_bound, 0.0);
        assert!(!bounds.has_upper_bound());
        assert!(!bounds.is_closed());
    }

    #[test]
    fn solution_event_json_omits_missing_time() {
        let event = SolutionEvent {
            objective: 10,
            restart_counter: 1,
            conflicts_until_restart: 100,
            time_ms: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("time_ms"));
    }
}
