//! ソルバーのバッチ実行
//!
//! インスタンス × シードの全ジョブを crossbeam-channel のワーカープールで
//! 並列実行し、各実行の標準出力を
//! `out_dir/<instance>/<instance>-<seed_index>.txt` へ書き出す。
//! 標準エラーは捨てる（ソルバーの診断はすべて標準出力側にある前提）。
//! ファイル名の添字はシードの値ではなくシードリスト内の位置で、バッチ間の
//! 実行の突き合わせに使う。

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Local;
use crossbeam_channel as chan;
use serde::Serialize;

/// 実行対象ソルバーの起動方法
#[derive(Debug, Clone, Serialize)]
pub struct SolverSpec {
    /// ソルバー実行ファイルへのパス
    pub path: PathBuf,
    /// 全実行に共通で渡す引数
    pub fixed_args: Vec<String>,
    /// インスタンスファイルを渡すフラグ（None なら末尾の位置引数）
    pub file_flag: Option<String>,
    /// 乱数シードを渡すフラグ（None ならシードを渡さない）
    pub seed_flag: Option<String>,
}

/// バッチ全体の設定
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub spec: SolverSpec,
    /// インスタンスファイルのパス一覧
    pub instances: Vec<PathBuf>,
    /// 使用するシード値。インスタンスごとに全シードで1回ずつ実行する
    pub seeds: Vec<u64>,
    pub out_dir: PathBuf,
    pub concurrency: usize,
}

/// バッチ実行の集計結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub completed: u32,
    pub failed: u32,
}

#[derive(Serialize)]
struct BatchMeta<'a> {
    timestamp: String,
    solver: &'a SolverSpec,
    seeds: &'a [u64],
    concurrency: usize,
    instances: Vec<String>,
}

#[derive(Debug, Clone)]
struct RunTicket {
    instance: PathBuf,
    instance_name: String,
    seed_index: usize,
    seed: u64,
    out_path: PathBuf,
}

struct RunOutcome {
    ticket: RunTicket,
    result: Result<ExitStatus>,
}

/// 入力ディレクトリ内のインスタンスファイルをソート済みで列挙する
pub fn list_instance_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read instance directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    if files.is_empty() {
        bail!("no instance files in {}", dir.display());
    }
    files.sort();
    Ok(files)
}

/// ソルバーの起動引数を組み立てる
fn solver_args(spec: &SolverSpec, instance: &Path, seed: u64) -> Vec<String> {
    let mut args = spec.fixed_args.clone();
    if let Some(flag) = &spec.seed_flag {
        args.push(flag.clone());
        args.push(seed.to_string());
    }
    if let Some(flag) = &spec.file_flag {
        args.push(flag.clone());
    }
    args.push(instance.display().to_string());
    args
}

/// 1 実行分のソルバーを起動し、標準出力を `out_path` へ書き出す
pub fn run_solver(
    spec: &SolverSpec,
    instance: &Path,
    seed: u64,
    out_path: &Path,
) -> Result<ExitStatus> {
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    Command::new(&spec.path)
        .args(solver_args(spec, instance, seed))
        .stdin(Stdio::null())
        .stdout(out_file)
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("failed to run {}", spec.path.display()))
}

fn worker_main(
    spec: SolverSpec,
    rx: chan::Receiver<RunTicket>,
    tx: chan::Sender<RunOutcome>,
    shutdown: Arc<AtomicBool>,
) {
    while let Ok(ticket) = rx.recv() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let result = run_solver(&spec, &ticket.instance, ticket.seed, &ticket.out_path);
        if tx.send(RunOutcome { ticket, result }).is_err() {
            break;
        }
    }
}

/// バッチ全体を実行する
///
/// `shutdown` が立つと新しいジョブの着手をやめる。実行中のジョブは
/// 完了まで待つ（時間制限はソルバー側の引数に任せる）。起動そのものの
/// 失敗は環境要因なので shutdown を立てて残りを打ち切る。
pub fn run_batch(config: &BatchConfig, shutdown: &Arc<AtomicBool>) -> Result<BatchStats> {
    if config.instances.is_empty() {
        bail!("no instance files given");
    }
    if config.seeds.is_empty() {
        bail!("no seeds given");
    }
    if config.concurrency == 0 {
        bail!("concurrency must be at least 1");
    }

    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed to create {}", config.out_dir.display()))?;

    // チケット生成。インスタンス名の衝突は出力が混ざるので先に弾く。
    let mut tickets: Vec<RunTicket> = Vec::new();
    let mut seen_names: Vec<String> = Vec::new();
    for instance in &config.instances {
        let name = instance_name(instance)?;
        if seen_names.contains(&name) {
            bail!("duplicate instance name '{name}'");
        }
        let instance_out = config.out_dir.join(&name);
        fs::create_dir_all(&instance_out)
            .with_context(|| format!("failed to create {}", instance_out.display()))?;
        for (seed_index, &seed) in config.seeds.iter().enumerate() {
            tickets.push(RunTicket {
                instance: instance.clone(),
                instance_name: name.clone(),
                seed_index,
                seed,
                out_path: instance_out.join(format!("{name}-{seed_index}.txt")),
            });
        }
        seen_names.push(name);
    }

    write_meta(config, &seen_names)?;

    let total = tickets.len();
    println!(
        "run_batch: {} instances x {} seeds = {} jobs, concurrency={}",
        seen_names.len(),
        config.seeds.len(),
        total,
        config.concurrency
    );

    let (ticket_tx, ticket_rx) = chan::unbounded::<RunTicket>();
    let (result_tx, result_rx) = chan::unbounded::<RunOutcome>();
    for ticket in tickets {
        // unbounded なので満杯で失敗することはない
        let _ = ticket_tx.send(ticket);
    }
    drop(ticket_tx);

    let mut handles = Vec::new();
    for _ in 0..config.concurrency {
        let spec = config.spec.clone();
        let rx = ticket_rx.clone();
        let tx = result_tx.clone();
        let sd = shutdown.clone();
        handles.push(thread::spawn(move || worker_main(spec, rx, tx, sd)));
    }
    // メインスレッドは result_tx を持たないので drop
    drop(result_tx);

    let start_time = Instant::now();
    let mut stats = BatchStats { completed: 0, failed: 0 };
    let mut done = 0usize;
    while let Ok(outcome) = result_rx.recv() {
        done += 1;
        match outcome.result {
            Ok(status) if status.success() => {
                stats.completed += 1;
            }
            Ok(status) => {
                // 時間切れで非ゼロ終了するソルバーもあるため失敗扱いにしない
                log::warn!(
                    "{}-{} exited with {status}",
                    outcome.ticket.instance_name,
                    outcome.ticket.seed_index
                );
                stats.completed += 1;
            }
            Err(e) => {
                eprintln!(
                    "run_batch: {}-{}: {e:#}",
                    outcome.ticket.instance_name, outcome.ticket.seed_index
                );
                stats.failed += 1;
                shutdown.store(true, Ordering::Relaxed);
            }
        }
        println!(
            "[{done}/{total}] {}-{} seed={} ({:.0?} elapsed)",
            outcome.ticket.instance_name,
            outcome.ticket.seed_index,
            outcome.ticket.seed,
            start_time.elapsed()
        );
    }

    for handle in handles {
        let _ = handle.join();
    }
    Ok(stats)
}

fn instance_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive an instance name from {}", path.display()))
}

fn write_meta(config: &BatchConfig, instance_names: &[String]) -> Result<()> {
    let meta = BatchMeta {
        timestamp: Local::now().to_rfc3339(),
        solver: &config.spec,
        seeds: &config.seeds,
        concurrency: config.concurrency,
        instances: instance_names.to_vec(),
    };
    let path = config.out_dir.join("meta.json");
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, &meta)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(file_flag: Option<&str>, seed_flag: Option<&str>) -> SolverSpec {
        SolverSpec {
            path: PathBuf::from("/opt/solver"),
            fixed_args: vec!["-t".to_string(), "3600".to_string()],
            file_flag: file_flag.map(str::to_string),
            seed_flag: seed_flag.map(str::to_string),
        }
    }

    #[test]
    fn positional_instance_goes_last() {
        let args = solver_args(&spec(None, None), Path::new("models/queens.lp"), 4);
        assert_eq!(args, vec!["-t", "3600", "models/queens.lp"]);
    }

    #[test]
    fn seed_and_file_flags_are_inserted() {
        let args = solver_args(&spec(Some("-f"), Some("-r")), Path::new("a.lp"), 4);
        assert_eq!(args, vec!["-t", "3600", "-r", "4", "-f", "a.lp"]);
    }

    #[test]
    fn instance_name_strips_directory_and_extension() {
        assert_eq!(instance_name(Path::new("models/queens-12.lp")).unwrap(), "queens-12");
        assert_eq!(instance_name(Path::new("flat.wcnf")).unwrap(), "flat");
    }

    #[test]
    fn lists_instance_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.wcnf", "a.wcnf", "c.wcnf"] {
            std::fs::write(dir.path().join(name), "p wcnf 1 1 2\n").unwrap();
        }
        let files = list_instance_files(dir.path()).unwrap();
        let names: Vec<&str> =
            files.iter().filter_map(|p| p.file_name().and_then(|n| n.to_str())).collect();
        assert_eq!(names, ["a.wcnf", "b.wcnf", "c.wcnf"]);
    }

    #[test]
    fn empty_instance_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_instance_files(dir.path()).is_err());
    }
}
