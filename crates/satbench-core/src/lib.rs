//! SAT 系最適化ソルバーの実行ログ解析ライブラリ
//!
//! ソルバーが吐いた生ログを構造化レコードへ解析し、バッチ実験の集計・
//! 構成間比較・スコア表生成までを担う。ファイル I/O・プロセス起動・
//! CSV 出力は持たない（`tools` crate 側の責務）。全 API は同期・純粋で、
//! ファイル単位の並列化は呼び出し側の自由。

pub mod bounds;
pub mod error;
pub mod metric;
pub mod parser;
pub mod record;
pub mod score;
pub mod summary;
pub mod trajectory;

pub use bounds::{parse_bounds_log, BoundsDialect};
pub use error::{CompareError, CompareResult, ParseError, ParseResult};
pub use metric::{Direction, Metric};
pub use parser::parse_run_log;
pub use record::{BatchResult, BoundsRecord, RunRecord, SolutionEvent, Summary};
pub use score::{aggregate_bound_scores, compare_summaries, ScoreRow, ScoreTable};
pub use summary::summarize;
pub use trajectory::{same_batch_trajectories, same_trajectory};
