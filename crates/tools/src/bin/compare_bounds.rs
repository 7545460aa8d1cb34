/// 外部ソルバー間の bound 品質比較ツール。
///
/// RoundingSat / Loandra の出力ツリーを読み込み、ベンチマークごとの上界を
/// 全構成の最良上界で正規化した集計スコアを構成別に表示する。スコアは
/// ベンチマークあたり (best+1)/(ub+1) の和で、大きいほど良い。
///
/// # 使用例
///
/// ```shell
/// cargo run -p tools --release --bin compare_bounds -- \
///   --config rs:roundingsat:logs/roundingsat \
///   --config rs-cg:roundingsat:logs/roundingsat-cg \
///   --config loandra:loandra:logs/loandra
/// ```
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::Parser as _;

use satbench_core::{aggregate_bound_scores, BoundsDialect, BoundsRecord};
use tools::batch::read_bounds_tree;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(clap::Parser, Debug)]
#[command(about = "score external solvers by the bounds in their logs")]
struct Cli {
    /// Solver configuration as "label:dialect:dir" (2 or more required).
    /// dialect is "roundingsat" or "loandra".
    #[arg(long = "config", required = true, num_args = 1)]
    configs: Vec<String>,
}

struct ConfigSpec {
    label: String,
    dialect: BoundsDialect,
    dir: PathBuf,
}

fn parse_config_arg(raw: &str) -> Result<ConfigSpec> {
    let mut parts = raw.splitn(3, ':');
    let (Some(label), Some(dialect), Some(dir)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("invalid --config format: '{raw}' (expected label:dialect:dir)");
    };
    let dialect = BoundsDialect::from_str(dialect).map_err(anyhow::Error::msg)?;
    Ok(ConfigSpec {
        label: label.to_string(),
        dialect,
        dir: PathBuf::from(dir),
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.configs.len() < 2 {
        bail!("need at least 2 --config entries, got {}", cli.configs.len());
    }

    let specs: Vec<ConfigSpec> =
        cli.configs.iter().map(|raw| parse_config_arg(raw)).collect::<Result<_>>()?;
    let labels: Vec<String> = specs.iter().map(|spec| spec.label.clone()).collect();
    {
        let unique: BTreeSet<&String> = labels.iter().collect();
        if unique.len() != labels.len() {
            bail!("duplicate --config labels");
        }
    }

    let mut results: BTreeMap<String, BTreeMap<String, BoundsRecord>> = BTreeMap::new();
    for spec in &specs {
        let tree = read_bounds_tree(&spec.dir, spec.dialect)?;
        log::info!("{}: {} benchmarks ({})", spec.label, tree.len(), spec.dialect);
        results.insert(spec.label.clone(), tree);
    }

    // 全構成に共通するベンチマークだけを採点対象にする
    let mut benchmarks: Vec<String> = Vec::new();
    let union: BTreeSet<&String> = results.values().flat_map(|tree| tree.keys()).collect();
    for benchmark in union {
        if results.values().all(|tree| tree.contains_key(benchmark)) {
            benchmarks.push(benchmark.clone());
        } else {
            log::warn!("skipping benchmark '{benchmark}': not covered by every config");
        }
    }
    if benchmarks.is_empty() {
        bail!("no benchmark is covered by every config");
    }

    let scores = aggregate_bound_scores(&labels, &benchmarks, &results)?;

    let mut ranked: Vec<(&String, f64)> = scores.iter().map(|(label, s)| (label, *s)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    println!("score over {} benchmarks (higher is better):", benchmarks.len());
    for (label, score) in ranked {
        println!("{label}: {score:.2}");
    }
    Ok(())
}
