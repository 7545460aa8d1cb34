//! メトリクス語彙
//!
//! ソルバーログから抽出する計測値の閉じた語彙。元データは行タグごとに
//! 決まったメトリクスへ対応付けられるため、文字列キーではなく enum で
//! 持ち、未知メトリクスの混入をコンパイル時に締め出す。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 集計・比較の対象となる実行メトリクス
///
/// シリアライズ名（= CLI で指定する名前）は kebab-case。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// 最良目的値（インカンベントの最終値）
    BestObjective,
    /// 実行内で実行可能解が見つかったか（0/1）
    Feasible,
    /// 入力ファイル読み込み時間
    TimeReadingFile,
    /// 辞書式目的関数の本数
    NumLexiObjectives,
    /// ブロックされたリスタート数
    NumBlockedRestarts,
    /// 削除された学習節数
    NumRemovedClauses,
    /// サイズ1の学習節数
    NumLearntSize1,
    /// サイズ2（DL2）の学習節数
    NumLearntSize2,
    /// サイズ3の学習節数
    NumLearntSize3,
    /// 学習節総数
    NumLearntClauses,
    /// 学習節の平均サイズ
    AvgLearntClauseSize,
    /// 学習節比率
    RatioLearntClauses,
    /// コンフリクト数
    NumConflicts,
    /// 決定数
    NumDecisions,
    /// 伝播数
    NumPropagations,
    /// Primal integral（時間×ギャップの積分、inf になり得る）
    PrimalIntegral,
    /// 実時間
    TimeWallclock,
    /// CPU 時間
    TimeCpu,
}

impl Metric {
    /// 全メトリクス（CLI のヘルプ表示・検証用）
    pub const ALL: &'static [Metric] = &[
        Metric::BestObjective,
        Metric::Feasible,
        Metric::TimeReadingFile,
        Metric::NumLexiObjectives,
        Metric::NumBlockedRestarts,
        Metric::NumRemovedClauses,
        Metric::NumLearntSize1,
        Metric::NumLearntSize2,
        Metric::NumLearntSize3,
        Metric::NumLearntClauses,
        Metric::AvgLearntClauseSize,
        Metric::RatioLearntClauses,
        Metric::NumConflicts,
        Metric::NumDecisions,
        Metric::NumPropagations,
        Metric::PrimalIntegral,
        Metric::TimeWallclock,
        Metric::TimeCpu,
    ];

    /// kebab-case の正式名
    pub fn name(&self) -> &'static str {
        match self {
            Metric::BestObjective => "best-objective",
            Metric::Feasible => "feasible",
            Metric::TimeReadingFile => "time-reading-file",
            Metric::NumLexiObjectives => "num-lexi-objectives",
            Metric::NumBlockedRestarts => "num-blocked-restarts",
            Metric::NumRemovedClauses => "num-removed-clauses",
            Metric::NumLearntSize1 => "num-learnt-size1",
            Metric::NumLearntSize2 => "num-learnt-size2",
            Metric::NumLearntSize3 => "num-learnt-size3",
            Metric::NumLearntClauses => "num-learnt-clauses",
            Metric::AvgLearntClauseSize => "avg-learnt-clause-size",
            Metric::RatioLearntClauses => "ratio-learnt-clauses",
            Metric::NumConflicts => "num-conflicts",
            Metric::NumDecisions => "num-decisions",
            Metric::NumPropagations => "num-propagations",
            Metric::PrimalIntegral => "primal-integral",
            Metric::TimeWallclock => "time-wallclock",
            Metric::TimeCpu => "time-cpu",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// スコア計算時の最適方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 小さいほど良い（目的値・時間など）
    Min,
    /// 大きいほど良い（伝播数・feasible 率など）
    Max,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Min => "min",
            Direction::Max => "max",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(Direction::Min),
            "max" => Ok(Direction::Max),
            other => Err(format!("unknown direction '{other}' (expected min or max)")),
        }
    }
}
