/// SATソルバーのバッチ実験ランナー。
///
/// 入力ディレクトリ内の全インスタンスを全シードで実行し、各実行の標準出力を
/// `out_dir/<instance>/<instance>-<seed_index>.txt` へ保存する。実行条件は
/// `out_dir/meta.json` に記録し、後から compare_batches で突き合わせられる
/// ようにする。
///
/// # 使用例
///
/// ```shell
/// cargo run -p tools --release --bin run_batch -- \
///   --solver target/release/solver \
///   --solver-arg -t --solver-arg 3600 \
///   --seed-flag -r --seeds 7,13,42 \
///   --input-dir models --concurrency 8
/// ```
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser as _;

use tools::runner::{list_instance_files, run_batch, BatchConfig, SolverSpec};

#[derive(clap::Parser, Debug)]
#[command(about = "run a solver over an instance set with repeated seeds")]
struct Cli {
    /// Solver binary path
    #[arg(long)]
    solver: PathBuf,

    /// Fixed argument passed to every run (can be repeated)
    #[arg(long = "solver-arg", num_args = 1, allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// Flag for the instance file (omit to pass it as the last positional argument)
    #[arg(long, allow_hyphen_values = true)]
    file_flag: Option<String>,

    /// Flag for the seed value (omit to run without an explicit seed)
    #[arg(long, allow_hyphen_values = true)]
    seed_flag: Option<String>,

    /// Comma-separated seed values, one run per seed and instance
    #[arg(long, default_value = "0")]
    seeds: String,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Directory holding the instance files
    #[arg(long)]
    input_dir: PathBuf,

    /// Output directory (default: runs/batch/<timestamp>)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn parse_seed_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{part}' in --seeds"))
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let seeds = parse_seed_list(&cli.seeds)?;
    let instances = list_instance_files(&cli.input_dir)?;
    let out_dir = cli.out_dir.unwrap_or_else(|| {
        PathBuf::from(format!("runs/batch/{}", Local::now().format("%Y%m%d_%H%M%S")))
    });

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl-C ハンドラ
    {
        let shutdown_clone = shutdown.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nShutting down gracefully...");
            shutdown_clone.store(true, Ordering::Relaxed);
        })
        .ok();
    }

    let config = BatchConfig {
        spec: SolverSpec {
            path: cli.solver,
            fixed_args: cli.solver_args,
            file_flag: cli.file_flag,
            seed_flag: cli.seed_flag,
        },
        instances,
        seeds,
        out_dir,
        concurrency: cli.concurrency,
    };

    let stats = run_batch(&config, &shutdown)?;
    println!("run_batch: {} completed, {} failed", stats.completed, stats.failed);
    if stats.failed > 0 {
        bail!("{} runs could not be started", stats.failed);
    }
    if shutdown.load(Ordering::Relaxed) {
        bail!("interrupted");
    }
    Ok(())
}
