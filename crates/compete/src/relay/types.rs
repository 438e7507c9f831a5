use std::time::Duration;

/// 引き分けを表す結果ラベル。エンジン名と衝突してはならない。
pub const DRAW_LABEL: &str = "Draw";
/// 結果が確定しなかった対局のラベル。
pub const NO_RESULT_LABEL: &str = "No result";

/// 手番。White が先に指す。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::White => 0,
            Side::Black => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
    Unknown,
}

impl GameOutcome {
    pub fn label(self) -> &'static str {
        match self {
            GameOutcome::WhiteWins => "white_win",
            GameOutcome::BlackWins => "black_win",
            GameOutcome::Draw => "draw",
            GameOutcome::Unknown => "unknown",
        }
    }

    /// 勝者のエンジン名、`"Draw"`、または未確定マーカーを返す。
    pub fn winner_label(self, white_name: &str, black_name: &str) -> String {
        match self {
            GameOutcome::WhiteWins => white_name.to_string(),
            GameOutcome::BlackWins => black_name.to_string(),
            GameOutcome::Draw => DRAW_LABEL.to_string(),
            GameOutcome::Unknown => NO_RESULT_LABEL.to_string(),
        }
    }
}

/// 対局が終了した理由
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// エンジンが結果行を出力した（行をそのまま保持）
    ResultLine { side: Side, line: String },
    /// 手数上限に達した
    MoveCap,
}

impl EndReason {
    pub fn describe(&self) -> String {
        match self {
            EndReason::ResultLine { side, line } => format!("{} reported \"{}\"", side.label(), line),
            EndReason::MoveCap => "max_half_moves".to_string(),
        }
    }
}

pub fn duration_to_centis(d: Duration) -> i64 {
    (d.as_millis() / 10).min(i64::MAX as u128) as i64
}
