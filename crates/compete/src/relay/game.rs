use std::process::ExitStatus;
use std::time::{Duration, Instant};

use super::clock::ClockPair;
use super::engine::{EngineHandle, EngineSpec, LineEndpoint, ENGINE_QUIT_TIMEOUT};
use super::error::EngineResult;
use super::protocol::{classify_line, InboundLine};
use super::types::{duration_to_centis, EndReason, GameOutcome, Side};

/// 応答のない対局を打ち切る手数（半手単位）
pub const DEFAULT_MAX_HALF_MOVES: u32 = 300;
pub const DEFAULT_VARIANT: &str = "suicide";
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(1);

/// ゲーム設定
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// 各対局者の初期持ち時間（秒）。時計の初期値にのみ使い、対局自体の時間制限ではない。
    pub seconds: u32,
    pub max_half_moves: u32,
    pub variant: String,
    /// 両エンジンとも出力がなかったティックの後に眠る時間（0 なら yield のみ）
    pub idle_sleep: Duration,
    pub quit_timeout: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seconds: 60,
            max_half_moves: DEFAULT_MAX_HALF_MOVES,
            variant: DEFAULT_VARIANT.to_string(),
            idle_sleep: DEFAULT_IDLE_SLEEP,
            quit_timeout: ENGINE_QUIT_TIMEOUT,
        }
    }
}

impl GameConfig {
    pub fn initial_centis(&self) -> i64 {
        i64::from(self.seconds) * 100
    }
}

/// 1手転送するごとに呼ばれるイベント
pub struct MoveEvent<'a> {
    pub ply: u32,
    pub side: Side,
    pub engine: &'a str,
    /// 相手へ転送した行（`usermove ...`）
    pub forwarded: &'a str,
    pub white_centis: i64,
    pub black_centis: i64,
}

/// 対局結果
#[derive(Debug)]
pub struct GameResult {
    pub outcome: GameOutcome,
    /// 勝者名、`"Draw"`、または未確定マーカー
    pub winner: String,
    pub reason: EndReason,
    pub half_moves: u32,
    pub white_centis: i64,
    pub black_centis: i64,
    /// quit 後に回収した終了ステータス (white, black)
    pub exit_status: [Option<ExitStatus>; 2],
}

/// 中継の状態。初期化（起動と `go` 送信）は `Relay::begin` で完了するので、
/// 生成直後から `Running` になる。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Ended { outcome: GameOutcome, reason: EndReason },
}

/// 2つのエンジン間の中継状態機械。
///
/// 1ティックで White → Black の順に1行ずつ非ブロッキングで読み、分類して相手へ転送する。
pub struct Relay {
    clock: ClockPair,
    epoch: Instant,
    half_moves: u32,
    max_half_moves: u32,
    idle_sleep: Duration,
    state: SessionState,
}

impl Relay {
    /// White に `go` を送り、両者の時計を動かし始める。
    pub fn begin(config: &GameConfig, white: &mut dyn LineEndpoint) -> Self {
        let epoch = Instant::now();
        send_or_log(white, "go");
        Self {
            clock: ClockPair::start(config.initial_centis(), 0),
            epoch,
            half_moves: 0,
            max_half_moves: config.max_half_moves,
            idle_sleep: config.idle_sleep,
            state: SessionState::Running,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn half_moves(&self) -> u32 {
        self.half_moves
    }

    pub fn clock(&self) -> &ClockPair {
        &self.clock
    }

    fn now_centis(&self) -> i64 {
        duration_to_centis(self.epoch.elapsed())
    }

    /// 1ティック分の中継を行う。どちらかのエンジンから行を受け取ったら `true`。
    pub fn tick<'e>(
        &mut self,
        white: &mut (dyn LineEndpoint + 'e),
        black: &mut (dyn LineEndpoint + 'e),
        on_move: &mut dyn FnMut(&MoveEvent<'_>),
    ) -> bool {
        let mut active = false;
        for side in [Side::White, Side::Black] {
            if self.state != SessionState::Running {
                break;
            }
            let (from, to) = match side {
                Side::White => (&mut *white, &mut *black),
                Side::Black => (&mut *black, &mut *white),
            };
            let Some(line) = from.try_recv_line() else {
                continue;
            };
            active = true;
            self.relay_line(side, from.name(), to, line, on_move);
        }
        if self.state == SessionState::Running && self.half_moves >= self.max_half_moves {
            self.end(GameOutcome::Draw, EndReason::MoveCap);
        }
        active
    }

    fn relay_line(
        &mut self,
        side: Side,
        from_name: &str,
        to: &mut dyn LineEndpoint,
        line: String,
        on_move: &mut dyn FnMut(&MoveEvent<'_>),
    ) {
        match classify_line(&line) {
            InboundLine::Result(outcome) => {
                log::debug!("{from_name} ({}) reported result: {line}", side.label());
                self.end(outcome, EndReason::ResultLine { side, line });
            }
            InboundLine::Move(forwarded) => {
                let now = self.now_centis();
                self.clock.on_move(side, now);
                for cmd in self.clock.time_update_for(side.opponent()) {
                    send_or_log(to, &cmd);
                }
                self.half_moves += 1;
                send_or_log(to, &forwarded);
                on_move(&MoveEvent {
                    ply: self.half_moves,
                    side,
                    engine: from_name,
                    forwarded: &forwarded,
                    white_centis: self.clock.remaining_for(Side::White),
                    black_centis: self.clock.remaining_for(Side::Black),
                });
                if self.half_moves >= self.max_half_moves {
                    self.end(GameOutcome::Draw, EndReason::MoveCap);
                }
            }
            InboundLine::Command(cmd) => send_or_log(to, &cmd),
            InboundLine::Noise => log::trace!("{from_name}: ignored \"{line}\""),
        }
    }

    fn end(&mut self, outcome: GameOutcome, reason: EndReason) {
        self.state = SessionState::Ended { outcome, reason };
    }

    /// 終局まで中継を続ける。壁時計による打ち切りはない。
    pub fn run<'e>(
        &mut self,
        white: &mut (dyn LineEndpoint + 'e),
        black: &mut (dyn LineEndpoint + 'e),
        on_move: &mut dyn FnMut(&MoveEvent<'_>),
    ) -> (GameOutcome, EndReason) {
        loop {
            let active = self.tick(white, black, on_move);
            if let SessionState::Ended { outcome, reason } = &self.state {
                return (*outcome, reason.clone());
            }
            if !active {
                if self.idle_sleep.is_zero() {
                    std::thread::yield_now();
                } else {
                    std::thread::sleep(self.idle_sleep);
                }
            }
        }
    }
}

fn send_or_log(to: &mut dyn LineEndpoint, line: &str) {
    // 書き込み失敗は致命的ではない。相手が応答しなければ手数上限で終わる。
    if let Err(e) = to.send(line) {
        log::debug!("{e}");
    }
}

/// 1局分のセッション。エンジンの起動から終了待ちまでを所有する。
pub struct GameSession<'a> {
    white: &'a EngineSpec,
    black: &'a EngineSpec,
    config: &'a GameConfig,
}

impl<'a> GameSession<'a> {
    pub fn new(white: &'a EngineSpec, black: &'a EngineSpec, config: &'a GameConfig) -> Self {
        Self {
            white,
            black,
            config,
        }
    }

    /// 1局を実行する。
    ///
    /// 起動失敗だけがエラーとして返る。エンジンハンドルは Drop で必ず終了処理されるが、
    /// 結果を返す前に明示的に quit と終了待ちを行い、その終了ステータスを記録する。
    pub fn play(&self, on_move: &mut dyn FnMut(&MoveEvent<'_>)) -> EngineResult<GameResult> {
        let cfg = self.config;
        let mut white =
            EngineHandle::spawn(self.white, &self.black.name, &cfg.variant, cfg.quit_timeout)?;
        let mut black =
            EngineHandle::spawn(self.black, &self.white.name, &cfg.variant, cfg.quit_timeout)?;

        let mut relay = Relay::begin(cfg, &mut white);
        let (outcome, reason) = relay.run(&mut white, &mut black, on_move);

        let exit_status = [shutdown(&mut white), shutdown(&mut black)];
        let winner = outcome.winner_label(&self.white.name, &self.black.name);
        log::info!(
            "{} (white) vs {} (black): {} after {} half-moves ({})",
            self.white.name,
            self.black.name,
            winner,
            relay.half_moves(),
            reason.describe()
        );
        Ok(GameResult {
            outcome,
            winner,
            reason,
            half_moves: relay.half_moves(),
            white_centis: relay.clock().remaining_for(Side::White),
            black_centis: relay.clock().remaining_for(Side::Black),
            exit_status,
        })
    }
}

fn shutdown(engine: &mut EngineHandle) -> Option<ExitStatus> {
    match engine.terminate() {
        Ok(status) => Some(status),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}
