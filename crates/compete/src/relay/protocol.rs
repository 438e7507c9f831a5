//! xboard 系プロトコルの行分類と書き換え

use super::types::GameOutcome;

/// 相手エンジンへ転送するコマンドのキーワード
pub const RELAY_COMMANDS: [&str; 5] = ["go", "usermove", "move", "new", "variant"];

/// 結果行の接頭辞（完全一致の前方一致で判定する）
const RESULT_PREFIXES: [(&str, GameOutcome); 3] = [
    ("1-0", GameOutcome::WhiteWins),
    ("0-1", GameOutcome::BlackWins),
    ("1/2-1/2", GameOutcome::Draw),
];

/// 受信した1行の分類結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundLine {
    /// 対局結果
    Result(GameOutcome),
    /// 指し手。`usermove` に書き換えた行を保持する。
    Move(String),
    /// 指し手以外の転送対象コマンド（そのまま転送）
    Command(String),
    /// 認識できない行（破棄する）
    Noise,
}

pub fn classify_line(line: &str) -> InboundLine {
    for (prefix, outcome) in RESULT_PREFIXES {
        if line.starts_with(prefix) {
            return InboundLine::Result(outcome);
        }
    }
    match command_keyword(line) {
        Some("move") => InboundLine::Move(rewrite_move(line)),
        Some(_) => InboundLine::Command(line.to_string()),
        None => InboundLine::Noise,
    }
}

/// 先頭の空白区切りトークンが転送対象キーワードと完全一致すればそれを返す。
///
/// 前方一致ではないので `movement` や `usermove=1` は転送対象にならない。
fn command_keyword(line: &str) -> Option<&'static str> {
    let first = line.split_whitespace().next()?;
    RELAY_COMMANDS.iter().copied().find(|kw| *kw == first)
}

/// `move <mv>` を受信側が期待する `usermove <mv>` に書き換える。
pub fn rewrite_move(line: &str) -> String {
    match line.trim_start().strip_prefix("move") {
        Some(rest) => format!("usermove{rest}"),
        None => line.to_string(),
    }
}
