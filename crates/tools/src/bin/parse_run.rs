/// 単発ソルバーログの解析ツール。
///
/// 使い方:
///   # 自前ソルバーの実行ログを要約
///   parse_run runs/batch/queens-12/queens-12-0.txt
///
///   # gzip 圧縮ログもそのまま読める
///   parse_run runs/batch/queens-12/queens-12-0.txt.gz
///
///   # 標準入力から読む
///   solver model.wcnf | parse_run -
///
///   # RoundingSat / Loandra の bound ログ
///   parse_run --format roundingsat logs/roundingsat/queens-12/run.log
///
///   # JSON出力モード
///   parse_run --json runs/batch/queens-12/queens-12-0.txt
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use satbench_core::{parse_bounds_log, parse_run_log, BoundsDialect};
use tools::common::io::read_log_text;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(about = "parse a single solver log and summarise it")]
struct Cli {
    /// ログファイルのパス（`-` で標準入力、`.gz` は透過展開）
    file: String,

    /// ログの形式
    #[arg(long, value_enum, default_value_t = LogFormat::Run)]
    format: LogFormat,

    /// JSON出力モード
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    /// 自前ソルバーの実行ログ
    Run,
    /// RoundingSat の bound ログ
    Roundingsat,
    /// Loandra の bound ログ
    Loandra,
}

// ---------------------------------------------------------------------------
// 出力
// ---------------------------------------------------------------------------

fn print_run(text: &str, file: &str, json: bool) -> Result<()> {
    let record =
        parse_run_log(text).with_context(|| format!("failed to parse {file}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }
    println!("file:           {}", record.source_file.as_deref().unwrap_or("(unknown)"));
    println!("feasible:       {}", record.feasible);
    match record.best_objective {
        Some(objective) => println!("best objective: {objective}"),
        None => println!("best objective: none"),
    }
    println!("solutions:      {}", record.solutions.len());
    for event in &record.solutions {
        let time = match event.time_ms {
            Some(ms) => format!("{ms} ms"),
            None => "n/a".to_string(),
        };
        println!(
            "  o {:>12}  restart {:>4}  conflicts {:>8}  t {}",
            event.objective, event.restart_counter, event.conflicts_until_restart, time
        );
    }
    for (metric, value) in &record.metrics {
        println!("{metric}: {value}");
    }
    Ok(())
}

fn print_bounds(text: &str, file: &str, dialect: BoundsDialect, json: bool) -> Result<()> {
    let bounds = parse_bounds_log(text, dialect)
        .with_context(|| format!("failed to parse {file}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&bounds)?);
        return Ok(());
    }
    println!("lower bound: {}", bounds.lower_bound);
    if bounds.has_upper_bound() {
        println!("upper bound: {}", bounds.upper_bound);
    } else {
        println!("upper bound: none");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let text = read_log_text(&cli.file)?;

    match cli.format {
        LogFormat::Run => print_run(&text, &cli.file, cli.json),
        LogFormat::Roundingsat => print_bounds(&text, &cli.file, BoundsDialect::RoundingSat, cli.json),
        LogFormat::Loandra => print_bounds(&text, &cli.file, BoundsDialect::Loandra, cli.json),
    }
}
