//! バッチ実験ディレクトリの読み込み
//!
//! `run_batch` が書き出すレイアウト
//! `out_dir/<instance>/<instance>-<seed_index>.txt[.gz]` を [`BatchResult`]
//! へ読み込む。ログ解析は CPU バウンドなのでファイル単位で並列化する。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use regex::Regex;

use satbench_core::{parse_bounds_log, parse_run_log, BatchResult, BoundsDialect, BoundsRecord};

use crate::common::io::read_log_text;

static RUN_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(\d+)\.txt(?:\.gz)?$").expect("invalid RUN_FILE_RE pattern")
});

/// 実行ログファイル名 `<instance>-<seed_index>.txt[.gz]` からシード添字を取り出す
pub fn run_file_seed(file_name: &str) -> Option<u64> {
    RUN_FILE_RE.captures(file_name)?.get(1)?.as_str().parse().ok()
}

/// バッチ出力ディレクトリ全体を読み込む
///
/// インスタンスはディレクトリ名の辞書順、各インスタンスの実行はシード添字の
/// 数値順に並べる。1ファイルでも解析に失敗したら、対象ファイルのパスを
/// コンテキストに付けて全体を失敗させる。
pub fn read_batch_dir(dir: &Path) -> Result<BatchResult> {
    let mut batch = BatchResult::new();
    for instance_dir in sorted_subdirs(dir)? {
        let instance = dir_name(&instance_dir)?;
        let runs = read_instance_dir(&instance_dir)?;
        log::debug!("{instance}: {} runs", runs.len());
        batch.insert(instance, runs);
    }
    if batch.is_empty() {
        bail!("no instance directories in {}", dir.display());
    }
    Ok(batch)
}

fn read_instance_dir(dir: &Path) -> Result<Vec<satbench_core::RunRecord>> {
    let mut files: Vec<(u64, PathBuf)> = Vec::new();
    for path in sorted_files(dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            bail!("non-UTF-8 file name in {}", dir.display());
        };
        let Some(seed) = run_file_seed(name) else {
            bail!("unexpected file name '{name}' in {}", dir.display());
        };
        files.push((seed, path));
    }
    files.sort();

    files
        .par_iter()
        .map(|(_, path)| {
            let text = read_log_text(path)?;
            parse_run_log(&text).with_context(|| format!("failed to parse {}", path.display()))
        })
        .collect()
}

/// 外部ソルバーの出力ツリー `config_dir/<benchmark>/<log>` を読み込む
///
/// ベンチマークディレクトリに複数のログがある場合は辞書順で最初の1本を採用する。
pub fn read_bounds_tree(
    dir: &Path,
    dialect: BoundsDialect,
) -> Result<BTreeMap<String, BoundsRecord>> {
    let mut results = BTreeMap::new();
    for bench_dir in sorted_subdirs(dir)? {
        let benchmark = dir_name(&bench_dir)?;
        let logs = sorted_files(&bench_dir)?;
        let Some(log_path) = logs.first() else {
            bail!("no log file in {}", bench_dir.display());
        };
        let text = read_log_text(log_path)?;
        let bounds = parse_bounds_log(&text, dialect)
            .with_context(|| format!("failed to parse {}", log_path.display()))?;
        results.insert(benchmark, bounds);
    }
    if results.is_empty() {
        bail!("no benchmark directories in {}", dir.display());
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// ディレクトリ走査ヘルパー
// ---------------------------------------------------------------------------

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn dir_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("directory {} has a non-UTF-8 name", path.display()))
}
