/// rustfish を `-C target-cpu=native` でビルドし、`--test` 指定時は旧ビルドとの自己対局を並列実行する。
///
/// # 使用例
///
/// ビルドのみ:
/// ```shell
/// cargo run -p rustfish-harness --release
/// ```
///
/// ビルド後、4並列 × 7局（60秒切れ負けなし）で旧ビルド `./rustfish` と対局:
/// ```shell
/// cargo run -p rustfish-harness --release -- --test
/// ```
///
/// 1手ごとのログを見る:
/// ```shell
/// RUST_LOG=debug cargo run -p rustfish-harness --release -- --test --workers 1 --games 2
/// ```
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use rustfish_harness::builder::{BuildConfig, NATIVE_RUSTFLAGS, build_engine};
use rustfish_harness::selfplay::{
    AdjudicationConfig, EngineConfig, GameConfig, MatchConfig, ProcessLauncher, run_match,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "rustfish self-play regression harness")]
struct Cli {
    /// Run the parallel match after building (otherwise build only)
    #[arg(long, default_value_t = false)]
    test: bool,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 4)]
    workers: u32,

    /// Games per worker (colors alternate every game)
    #[arg(long, default_value_t = 7)]
    games: u32,

    /// Initial clock per side in seconds
    #[arg(long, default_value_t = 60.0)]
    time: f64,

    /// Increment per move in seconds
    #[arg(long, default_value_t = 0.0)]
    inc: f64,

    /// Freshly built engine
    #[arg(long, default_value = "./target/release/rustfish")]
    candidate: PathBuf,

    /// Previous build to compare against
    #[arg(long, default_value = "./rustfish")]
    baseline: PathBuf,

    /// Start position (FEN) instead of the standard initial position
    #[arg(long)]
    start_fen: Option<String>,

    /// Extra wait (seconds) beyond the mover's clock before an engine is declared unresponsive
    #[arg(long, default_value_t = 10.0)]
    move_timeout_margin: f64,

    /// Additional UCI options for both engines (format: "Name=Value", can be repeated)
    #[arg(long = "uci-option", num_args = 1)]
    uci_options: Vec<String>,

    /// Build command
    #[arg(long, default_value = "cargo")]
    cargo: PathBuf,

    /// Directory of the engine crate to build
    #[arg(long, default_value = ".")]
    manifest_dir: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let build = BuildConfig {
        program: cli.cargo.clone(),
        working_dir: cli.manifest_dir.clone(),
        rustflags: NATIVE_RUSTFLAGS.to_string(),
        ..BuildConfig::default()
    };
    build_engine(&build)?;

    if !cli.test {
        return Ok(());
    }

    if cli.workers == 0 {
        bail!("--workers must be at least 1");
    }
    if !(cli.time.is_finite() && cli.time > 0.0) {
        bail!("--time must be a positive number of seconds");
    }
    if !(cli.inc.is_finite() && cli.inc >= 0.0) {
        bail!("--inc must be a non-negative number of seconds");
    }
    let move_timeout_margin = parse_margin(cli.move_timeout_margin)?;
    for path in [&cli.candidate, &cli.baseline] {
        if !path.is_file() {
            bail!("engine binary not found: {}", path.display());
        }
    }

    let engine_config = |path: &PathBuf| EngineConfig {
        path: path.clone(),
        args: Vec::new(),
        uci_options: cli.uci_options.clone(),
    };
    let launcher = Arc::new(ProcessLauncher {
        candidate: engine_config(&cli.candidate),
        baseline: engine_config(&cli.baseline),
    });
    let config = MatchConfig {
        workers: cli.workers,
        games_per_worker: cli.games,
        game: GameConfig {
            initial_time: cli.time,
            increment: cli.inc,
            start_fen: cli.start_fen.clone(),
            adjudication: AdjudicationConfig::default(),
            move_timeout_margin,
        },
    };

    run_match(&config, launcher)?;
    Ok(())
}

fn parse_margin(secs: f64) -> Result<Duration> {
    if !(secs >= 0.0) {
        bail!("--move-timeout-margin must be a non-negative number of seconds");
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("--move-timeout-margin {secs} is out of range"))
}
