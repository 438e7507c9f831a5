//! 複数ワーカーで対局を並列実行し、結果をまとめる。

use std::thread;

use anyhow::{bail, Result};
use chrono::Local;

use crate::relay::{
    EngineSpec, GameConfig, GameSession, MoveEvent, DRAW_LABEL, NO_RESULT_LABEL,
};
use crate::results_log::{GameRecord, ResultsSink};

/// 対局全体の設定
#[derive(Clone, Debug)]
pub struct MatchConfig {
    pub engine1: EngineSpec,
    pub engine2: EngineSpec,
    pub games: u32,
    pub workers: usize,
    pub game: GameConfig,
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("worker count must be at least 1");
        }
        if u32::try_from(self.workers).is_err() {
            bail!("worker count {} is too large", self.workers);
        }
        if self.engine1.name == self.engine2.name {
            bail!(
                "engine names must differ (both are '{}'); results are tallied by name",
                self.engine1.name
            );
        }
        for spec in [&self.engine1, &self.engine2] {
            if spec.name == DRAW_LABEL || spec.name == NO_RESULT_LABEL {
                bail!("engine name '{}' is reserved for result labels", spec.name);
            }
        }
        Ok(())
    }
}

/// 総対局数をワーカーに割り振る。余りはすべて最後のワーカーが受け持つ。
pub fn split_games(total: u32, workers: usize) -> Vec<u32> {
    if workers == 0 {
        return Vec::new();
    }
    // 各取り分は total 以下なので u32 に収まる
    let per_worker = (total as usize / workers) as u32;
    let remainder = (total as usize % workers) as u32;
    let mut shares = vec![per_worker; workers];
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}

/// ワーカー内の `index` 局目の (white, black)。偶数局は engine1 が先手。
pub fn pairing<'a>(
    index: u32,
    engine1: &'a EngineSpec,
    engine2: &'a EngineSpec,
) -> (&'a EngineSpec, &'a EngineSpec) {
    if index % 2 == 0 {
        (engine1, engine2)
    } else {
        (engine2, engine1)
    }
}

/// 勝敗の集計
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub engine1_wins: u32,
    pub engine2_wins: u32,
    pub draws: u32,
    pub unknown: u32,
}

impl Tally {
    pub fn from_results(results: &[String], engine1: &str, engine2: &str) -> Self {
        let mut tally = Tally::default();
        for label in results {
            if label == engine1 {
                tally.engine1_wins += 1;
            } else if label == engine2 {
                tally.engine2_wins += 1;
            } else if label == DRAW_LABEL {
                tally.draws += 1;
            } else {
                tally.unknown += 1;
            }
        }
        tally
    }

    pub fn total(&self) -> u32 {
        self.engine1_wins + self.engine2_wins + self.draws + self.unknown
    }
}

/// 起動失敗で打ち切られたワーカー
#[derive(Clone, Debug)]
pub struct WorkerFailure {
    pub worker: usize,
    pub scheduled: u32,
    pub completed: u32,
    pub error: String,
}

#[derive(Clone, Debug, Default)]
pub struct MatchReport {
    /// ワーカー生成順に連結した勝者ラベル
    pub results: Vec<String>,
    pub failures: Vec<WorkerFailure>,
}

impl MatchReport {
    pub fn tally(&self, engine1: &str, engine2: &str) -> Tally {
        Tally::from_results(&self.results, engine1, engine2)
    }
}

struct WorkerOutput {
    results: Vec<String>,
    failure: Option<WorkerFailure>,
}

pub struct MatchScheduler {
    config: MatchConfig,
}

impl MatchScheduler {
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// 全対局を実行する。ワーカー同士は通信せず、結果の追記だけを `sink` に送る。
    pub fn run_all(&self, sink: Option<&ResultsSink>) -> MatchReport {
        let shares = split_games(self.config.games, self.config.workers);
        log::info!(
            "{} vs {}: {} games on {} workers {:?}",
            self.config.engine1.name,
            self.config.engine2.name,
            self.config.games,
            self.config.workers,
            shares
        );

        let mut handles = Vec::with_capacity(shares.len());
        for (worker, share) in shares.iter().copied().enumerate() {
            let engine1 = self.config.engine1.clone();
            let engine2 = self.config.engine2.clone();
            let game = self.config.game.clone();
            let sink = sink.cloned();
            handles.push(thread::spawn(move || {
                worker_main(worker, share, &engine1, &engine2, &game, sink.as_ref())
            }));
        }

        let mut report = MatchReport::default();
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(output) => {
                    report.results.extend(output.results);
                    report.failures.extend(output.failure);
                }
                Err(_) => report.failures.push(WorkerFailure {
                    worker,
                    scheduled: shares[worker],
                    completed: 0,
                    error: "worker thread panicked".to_string(),
                }),
            }
        }
        report
    }
}

fn worker_main(
    worker: usize,
    share: u32,
    engine1: &EngineSpec,
    engine2: &EngineSpec,
    game: &GameConfig,
    sink: Option<&ResultsSink>,
) -> WorkerOutput {
    let mut results = Vec::with_capacity(share as usize);
    for index in 0..share {
        let (white, black) = pairing(index, engine1, engine2);
        let session = GameSession::new(white, black, game);
        let mut on_move = |ev: &MoveEvent<'_>| {
            log::trace!(
                "worker {worker} game {index} ply {}: {} -> {} (white {} / black {})",
                ev.ply,
                ev.engine,
                ev.forwarded,
                ev.white_centis,
                ev.black_centis
            );
        };
        let result = match session.play(&mut on_move) {
            Ok(result) => result,
            Err(e) => {
                log::error!("worker {worker}: aborting after {index}/{share} games: {e}");
                return WorkerOutput {
                    results,
                    failure: Some(WorkerFailure {
                        worker,
                        scheduled: share,
                        completed: index,
                        error: e.to_string(),
                    }),
                };
            }
        };
        if let Some(sink) = sink {
            sink.record(GameRecord {
                worker,
                game_index: index,
                white: white.name.clone(),
                black: black.name.clone(),
                outcome: result.outcome,
                winner: result.winner.clone(),
                reason: result.reason.describe(),
                half_moves: result.half_moves,
                finished_at: Local::now(),
            });
        }
        results.push(result.winner);
    }
    WorkerOutput {
        results,
        failure: None,
    }
}
