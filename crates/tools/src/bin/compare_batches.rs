/// バッチ実験の比較ツール。
///
/// 2つ以上のバッチ出力ディレクトリを読み込み、インスタンスごとの指標平均を
/// 最良値で正規化したスコア表をCSVで出力する。
///
/// # 使用例
///
/// ```shell
/// cargo run -p tools --release --bin compare_batches -- \
///   --batch runs/batch/baseline --batch runs/batch/candidate \
///   --label baseline --label candidate \
///   --metric best-objective:min --metric num-conflicts:min \
///   --check-trajectories \
///   --output-csv comparison.csv
/// ```
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser as _;

use satbench_core::{
    compare_summaries, same_batch_trajectories, summarize, BatchResult, Direction, Metric,
};
use tools::batch::read_batch_dir;
use tools::table::write_score_csv;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(clap::Parser, Debug)]
#[command(about = "compare two or more batch experiment directories")]
struct Cli {
    /// Batch output directories (2 or more required)
    #[arg(long = "batch", required = true, num_args = 1)]
    batches: Vec<PathBuf>,

    /// Labels for the batches (defaults to the directory names)
    #[arg(long = "label", num_args = 1)]
    labels: Vec<String>,

    /// Metric to compare, as "name:direction" (can be repeated).
    /// Defaults to best-objective:min num-propagations:max feasible:max.
    #[arg(long = "metric", num_args = 1)]
    metrics: Vec<String>,

    /// Require identical solution trajectories across matching runs
    #[arg(long)]
    check_trajectories: bool,

    /// Write the table to this CSV file instead of stdout
    #[arg(long)]
    output_csv: Option<PathBuf>,
}

const DEFAULT_METRICS: &[(Metric, Direction)] = &[
    (Metric::BestObjective, Direction::Min),
    (Metric::NumPropagations, Direction::Max),
    (Metric::Feasible, Direction::Max),
];

fn parse_metric_arg(raw: &str) -> Result<(Metric, Direction)> {
    let Some((name, direction)) = raw.split_once(':') else {
        bail!("invalid --metric format: '{raw}' (expected name:direction)");
    };
    let metric = Metric::from_str(name).map_err(anyhow::Error::msg)?;
    let direction = Direction::from_str(direction).map_err(anyhow::Error::msg)?;
    Ok((metric, direction))
}

fn batch_label(dir: &PathBuf) -> Result<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a label from {}", dir.display()))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.batches.len() < 2 {
        bail!("need at least 2 --batch directories, got {}", cli.batches.len());
    }

    let labels: Vec<String> = if cli.labels.is_empty() {
        cli.batches.iter().map(batch_label).collect::<Result<_>>()?
    } else if cli.labels.len() == cli.batches.len() {
        cli.labels.clone()
    } else {
        bail!(
            "--label count ({}) does not match --batch count ({})",
            cli.labels.len(),
            cli.batches.len()
        );
    };

    let metrics: Vec<(Metric, Direction)> = if cli.metrics.is_empty() {
        DEFAULT_METRICS.to_vec()
    } else {
        cli.metrics.iter().map(|raw| parse_metric_arg(raw)).collect::<Result<_>>()?
    };

    let mut batches: Vec<(String, BatchResult)> = Vec::with_capacity(cli.batches.len());
    for (dir, label) in cli.batches.iter().zip(&labels) {
        let batch = read_batch_dir(dir)
            .with_context(|| format!("failed to read batch '{label}'"))?;
        log::info!("{label}: {} instances", batch.len());
        batches.push((label.clone(), batch));
    }

    if cli.check_trajectories {
        let (first_label, first) = &batches[0];
        for (label, other) in &batches[1..] {
            if !same_batch_trajectories(first, other)? {
                bail!("solution trajectories diverge between '{first_label}' and '{label}'");
            }
        }
        log::info!("solution trajectories match across all batches");
    }

    let metric_names: Vec<Metric> = metrics.iter().map(|(metric, _)| *metric).collect();
    let summaries: Vec<(String, satbench_core::Summary)> = batches
        .iter()
        .map(|(label, batch)| (label.clone(), summarize(batch, &metric_names)))
        .collect();

    let table = compare_summaries(&summaries, &metrics)?;

    match &cli.output_csv {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_score_csv(&mut writer, &table)?;
            writer.flush()?;
            println!("wrote {}", path.display());
            // total 行だけは画面でも見たい
            if let Some(footer) = table.render_rows().last() {
                println!("{}", footer.join(", "));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write_score_csv(&mut lock, &table)?;
        }
    }
    Ok(())
}
