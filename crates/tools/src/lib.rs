//! SATソルバー実験ツール群
//!
//! バッチ実行 (`run_batch`)、単発ログ解析 (`parse_run`)、バッチ間比較
//! (`compare_batches`)、外部ソルバーの bound 比較 (`compare_bounds`) の
//! 各バイナリが共有するライブラリ部分。

pub mod batch;
pub mod common;
pub mod runner;
pub mod table;
