/// 2つのエンジンを多数回対局させ、勝敗を集計する。
///
/// 各エンジンは xboard 互換（`usermove` / `time` / `otim` / `quit`）で、
/// `variant suicide` を受け付けるものとする。
///
/// # 使用例
///
/// 60秒持ち時間で 100 局、4 ワーカーで並列実行:
/// ```shell
/// cargo run -p compete --release -- \
///   nak-new:target/release/nakshatra nak-old:/opt/engines/nakshatra-1.2 60 100 4
/// ```
///
/// 1局ごとの詳細を JSONL に残す:
/// ```shell
/// cargo run -p compete --release -- \
///   nak-new:./nak nak-old:./nak-old 30 20 2 \
///   --games-log "runs/compete/$(date +%Y%m%d_%H%M%S).jsonl"
/// ```
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use chrono::Local;
use clap::Parser as _;

use compete::relay::game::{DEFAULT_MAX_HALF_MOVES, DEFAULT_VARIANT};
use compete::results_log::{MetaLogEntry, MetaSettings};
use compete::{EngineSpec, GameConfig, LogTargets, MatchConfig, MatchScheduler, ResultsLog};

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "play two xboard engines against each other")]
struct Cli {
    /// First engine as NAME:PATH
    engine1: EngineSpec,

    /// Second engine as NAME:PATH
    engine2: EngineSpec,

    /// Initial clock per side in seconds
    seconds: u32,

    /// Total number of games
    games: u32,

    /// Number of concurrent workers
    workers: usize,

    /// File receiving one winner label per finished game
    #[arg(long, default_value = "results_log.txt")]
    results_log: PathBuf,

    /// Optional JSON Lines log with per-game details
    #[arg(long)]
    games_log: Option<PathBuf>,

    /// Half-moves after which a game is declared a draw
    #[arg(long, default_value_t = DEFAULT_MAX_HALF_MOVES)]
    max_half_moves: u32,

    /// Variant announced to both engines
    #[arg(long, default_value = DEFAULT_VARIANT)]
    variant: String,

    /// Sleep between idle relay ticks in milliseconds (0 = yield only)
    #[arg(long, default_value_t = 1)]
    idle_sleep_ms: u64,

    /// Grace period for an engine to exit after quit before it is killed (ms)
    #[arg(long, default_value_t = 2000)]
    quit_timeout_ms: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let config = MatchConfig {
        engine1: cli.engine1.clone(),
        engine2: cli.engine2.clone(),
        games: cli.games,
        workers: cli.workers,
        game: GameConfig {
            seconds: cli.seconds,
            max_half_moves: cli.max_half_moves,
            variant: cli.variant.clone(),
            idle_sleep: Duration::from_millis(cli.idle_sleep_ms),
            quit_timeout: Duration::from_millis(cli.quit_timeout_ms),
        },
    };
    let scheduler = MatchScheduler::new(config)?;

    for spec in [&cli.engine1, &cli.engine2] {
        if !spec.path.is_file() {
            log::warn!("engine binary not found: {}", spec.path.display());
        }
    }

    let targets = LogTargets {
        results: cli.results_log.clone(),
        games_jsonl: cli.games_log.clone(),
    };
    let meta = MetaLogEntry {
        kind: "meta".to_string(),
        timestamp: Local::now().to_rfc3339(),
        settings: MetaSettings {
            engine1: cli.engine1.to_string(),
            engine2: cli.engine2.to_string(),
            seconds: cli.seconds,
            games: cli.games,
            workers: cli.workers,
            max_half_moves: cli.max_half_moves,
            variant: cli.variant.clone(),
        },
        results_log: cli.results_log.display().to_string(),
    };
    let results_log = ResultsLog::create(&targets, Some(&meta))?;

    let start_time = Instant::now();
    let report = scheduler.run_all(Some(&results_log.sink()));
    let log_status = results_log.finish();

    let tally = report.tally(&cli.engine1.name, &cli.engine2.name);
    println!("Final results: {:?}", report.results);
    println!(
        " {}: {}   {}: {}   Draws: {}   Unknown: {}",
        cli.engine1.name,
        tally.engine1_wins,
        cli.engine2.name,
        tally.engine2_wins,
        tally.draws,
        tally.unknown
    );

    for f in &report.failures {
        eprintln!(
            "worker {} aborted after {}/{} games: {}",
            f.worker, f.completed, f.scheduled, f.error
        );
    }

    // 集計を表示した後でログの失敗を返す
    let written = log_status?;
    log::info!(
        "{written} results written to {} in {:.1}s",
        cli.results_log.display(),
        start_time.elapsed().as_secs_f64()
    );

    if !report.failures.is_empty() {
        bail!("{} of {} workers aborted", report.failures.len(), cli.workers);
    }
    Ok(())
}
