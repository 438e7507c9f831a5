//! モックエンジンのプロセスを相手にした中継の統合テスト

#![cfg(unix)]

mod common;

use std::fs;
use std::time::Duration;

use compete::relay::{EndReason, EngineError, MoveEvent, Side};
use compete::{EngineSpec, GameConfig, GameOutcome, GameSession};

use common::{
    binary_noise_then_win, endless_mover, fast_game_config, move_then_exit, opener_then_win,
    recording_replier, unprompted_mover, weak,
};

#[test]
fn decisive_result_names_white_engine_and_both_engines_exit() {
    let dir = tempfile::tempdir().unwrap();
    let quit_a = dir.path().join("a.quit");
    let quit_b = dir.path().join("b.quit");
    let transcript = dir.path().join("b.transcript");
    let a = opener_then_win(dir.path(), "alpha", &quit_a);
    let b = recording_replier(dir.path(), "beta", &transcript, &quit_b);
    let config = fast_game_config();

    let mut forwarded = Vec::new();
    let result = GameSession::new(&a, &b, &config)
        .play(&mut |ev: &MoveEvent<'_>| forwarded.push((ev.side, ev.forwarded.to_string())))
        .expect("game should run");

    assert_eq!(result.outcome, GameOutcome::WhiteWins);
    assert_eq!(result.winner, "alpha");
    assert!(result.half_moves >= 1);
    assert_eq!(
        result.reason,
        EndReason::ResultLine {
            side: Side::White,
            line: "1-0 {Black resigns}".to_string()
        }
    );
    assert_eq!(
        forwarded,
        vec![
            (Side::White, "usermove a2a3".to_string()),
            (Side::Black, "usermove h7h6".to_string()),
        ]
    );

    // 結果を返す前に両エンジンとも quit を受けて終了している
    assert!(quit_a.exists(), "white never saw quit");
    assert!(quit_b.exists(), "black never saw quit");
    for status in result.exit_status {
        assert!(status.expect("exit status recorded").success());
    }
}

#[test]
fn recipient_sees_init_time_update_and_usermove_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let transcript = dir.path().join("b.transcript");
    let a = opener_then_win(dir.path(), "alpha", &dir.path().join("a.quit"));
    let b = recording_replier(dir.path(), "beta", &transcript, &dir.path().join("b.quit"));
    let config = fast_game_config();

    GameSession::new(&a, &b, &config).play(&mut |_| {}).unwrap();

    let text = fs::read_to_string(&transcript).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(&lines[..3], &["name alpha", "new", "variant suicide"]);
    assert!(lines[3].starts_with("time "), "{lines:?}");
    assert!(lines[4].starts_with("otim "), "{lines:?}");
    assert_eq!(lines[5], "usermove a2a3");
    assert_eq!(lines.last().copied(), Some("quit"));
    assert!(!lines.iter().any(|l| l.starts_with("move ")));
    assert!(!lines.contains(&"go"), "black must not be told to go");

    // 持ち時間は 60 秒 = 6000cs から始まり、黒はまだ指していない
    assert_eq!(lines[3], "time 6000");
}

#[test]
fn engines_that_never_report_a_result_are_drawn_at_the_move_cap() {
    let dir = tempfile::tempdir().unwrap();
    let a = endless_mover(dir.path(), "alpha");
    let b = endless_mover(dir.path(), "beta");
    let config = fast_game_config();

    let mut plies = 0u32;
    let result = GameSession::new(&a, &b, &config).play(&mut |_| plies += 1).unwrap();

    assert_eq!(result.outcome, GameOutcome::Draw);
    assert_eq!(result.winner, "Draw");
    assert_eq!(result.reason, EndReason::MoveCap);
    assert_eq!(result.half_moves, 300);
    assert_eq!(plies, 300);
}

#[test]
fn missing_executable_is_a_spawn_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = endless_mover(dir.path(), "alpha");
    let ghost = EngineSpec::new("ghost", dir.path().join("does-not-exist"));
    let config = fast_game_config();

    let err = GameSession::new(&a, &ghost, &config).play(&mut |_| {}).unwrap_err();
    assert!(matches!(err, EngineError::Spawn { ref name, .. } if name == "ghost"), "{err}");
}

#[test]
fn non_utf8_noise_does_not_stall_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let a = binary_noise_then_win(dir.path(), "alpha");
    let b = weak(dir.path(), "beta");
    let config = fast_game_config();

    let result = GameSession::new(&a, &b, &config).play(&mut |_| {}).unwrap();

    // 雑音行の後の指し手と結果行も読まれている
    assert_eq!(result.outcome, GameOutcome::WhiteWins);
    assert_eq!(result.winner, "alpha");
    assert_eq!(result.half_moves, 2);
}

#[test]
fn engine_that_exits_mid_game_is_drawn_at_the_move_cap() {
    let dir = tempfile::tempdir().unwrap();
    let a = move_then_exit(dir.path(), "alpha");
    let b = unprompted_mover(dir.path(), "beta");
    let config = GameConfig {
        quit_timeout: Duration::from_millis(200),
        ..fast_game_config()
    };

    // 終了済みエンジンへの書き込み失敗は無視され、対局は手数上限まで続く
    let result = GameSession::new(&a, &b, &config)
        .play(&mut |_| {})
        .expect("write failures must not abort the game");

    assert_eq!(result.outcome, GameOutcome::Draw);
    assert_eq!(result.reason, EndReason::MoveCap);
    assert_eq!(result.half_moves, 300);
    assert!(result.exit_status[0].expect("white exit status").success());
}
