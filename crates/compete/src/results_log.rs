//! 対局結果の追記ログ。
//!
//! 全ワーカーの結果を1本の書き込みスレッドに集約するので、各行は必ず完全な1行として
//! 追記され、ワーカー間で混ざらない。1件ごとに flush するため途中で落ちても
//! それまでの結果は残る。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use crossbeam_channel as chan;
use serde::Serialize;

use crate::relay::GameOutcome;

/// 1局分の記録（ワーカーから書き込みスレッドへ送る）
#[derive(Clone, Debug)]
pub struct GameRecord {
    pub worker: usize,
    pub game_index: u32,
    pub white: String,
    pub black: String,
    pub outcome: GameOutcome,
    pub winner: String,
    pub reason: String,
    pub half_moves: u32,
    pub finished_at: DateTime<Local>,
}

#[derive(Serialize)]
struct ResultLogEntry<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    worker: usize,
    game_index: u32,
    white: &'a str,
    black: &'a str,
    outcome: &'a str,
    winner: &'a str,
    reason: &'a str,
    half_moves: u32,
    finished_at: String,
}

impl<'a> From<&'a GameRecord> for ResultLogEntry<'a> {
    fn from(rec: &'a GameRecord) -> Self {
        Self {
            kind: "result",
            worker: rec.worker,
            game_index: rec.game_index,
            white: &rec.white,
            black: &rec.black,
            outcome: rec.outcome.label(),
            winner: &rec.winner,
            reason: &rec.reason,
            half_moves: rec.half_moves,
            finished_at: rec.finished_at.to_rfc3339(),
        }
    }
}

/// JSONL ログ先頭の meta 行
#[derive(Serialize)]
pub struct MetaLogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub settings: MetaSettings,
    pub results_log: String,
}

#[derive(Serialize)]
pub struct MetaSettings {
    pub engine1: String,
    pub engine2: String,
    pub seconds: u32,
    pub games: u32,
    pub workers: usize,
    pub max_half_moves: u32,
    pub variant: String,
}

/// 出力先の設定
#[derive(Clone, Debug)]
pub struct LogTargets {
    /// 勝者ラベルを1行ずつ書くファイル
    pub results: PathBuf,
    /// 1局ごとの詳細を書く JSONL（任意）
    pub games_jsonl: Option<PathBuf>,
}

impl Default for LogTargets {
    fn default() -> Self {
        Self {
            results: PathBuf::from("results_log.txt"),
            games_jsonl: None,
        }
    }
}

struct LineWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LineWriter {
    fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .with_context(|| format!("failed to write {}", self.path.display()))
    }

    fn write_json(&mut self, value: &impl Serialize) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.write_line("")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }

    /// 1行書いて即座に flush する。
    fn append_line(&mut self, line: &str) -> Result<()> {
        self.write_line(line)?;
        self.flush()
    }

    fn append_json(&mut self, value: &impl Serialize) -> Result<()> {
        self.write_json(value)?;
        self.flush()
    }
}

/// ワーカーが保持する送信側
#[derive(Clone)]
pub struct ResultsSink {
    tx: chan::Sender<GameRecord>,
}

impl ResultsSink {
    pub fn record(&self, rec: GameRecord) {
        if let Err(e) = self.tx.send(rec) {
            log::warn!("results writer is gone, dropping record for {}", e.into_inner().winner);
        }
    }
}

/// 書き込みスレッド本体
pub struct ResultsLog {
    sink: ResultsSink,
    handle: JoinHandle<Result<u64>>,
}

impl ResultsLog {
    /// 出力ファイルを作成（既存内容は切り詰め）し、書き込みスレッドを起動する。
    pub fn create(targets: &LogTargets, meta: Option<&MetaLogEntry>) -> Result<Self> {
        let mut results = LineWriter::create(&targets.results)?;
        results.flush()?;
        let mut games = match &targets.games_jsonl {
            Some(path) => {
                let mut w = LineWriter::create(path)?;
                if let Some(meta) = meta {
                    w.append_json(meta)?;
                }
                Some(w)
            }
            None => None,
        };

        let (tx, rx) = chan::unbounded::<GameRecord>();
        // 書き込みに失敗しても受信は続け、最初のエラーを最後に返す。
        let handle = thread::spawn(move || -> Result<u64> {
            let mut written = 0u64;
            let mut first_error: Option<anyhow::Error> = None;
            for rec in rx {
                let mut res = results.append_line(&rec.winner);
                if let Some(w) = games.as_mut() {
                    res = res.and(w.append_json(&ResultLogEntry::from(&rec)));
                }
                match res {
                    Ok(()) => written += 1,
                    Err(e) => {
                        log::error!("{e:#}");
                        first_error.get_or_insert(e);
                    }
                }
            }
            match first_error {
                Some(e) => Err(e),
                None => Ok(written),
            }
        });

        Ok(Self {
            sink: ResultsSink { tx },
            handle,
        })
    }

    pub fn sink(&self) -> ResultsSink {
        self.sink.clone()
    }

    /// 全送信側が drop された後に呼ぶ。書き込んだ件数を返す。
    ///
    /// 途中で書き込みに失敗していた場合は最初のエラーを返す。
    pub fn finish(self) -> Result<u64> {
        drop(self.sink);
        self.handle.join().map_err(|_| anyhow!("results writer panicked"))?
    }
}
