//! 統合テスト用のモックエンジン（POSIX シェルスクリプト）

#![allow(dead_code)] // テストファイルごとに使うエンジンが異なる

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compete::{EngineSpec, GameConfig};

/// `dir` に実行可能な `#!/bin/sh` スクリプトを書き出す。
pub fn write_engine(dir: &Path, file: &str, body: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("failed to write mock engine");
    let mut perms = fs::metadata(&path).expect("stat mock engine").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod mock engine");
    path
}

/// go で `move a2a3` を指し、相手の応手には `1-0` を返す。quit を受けると `marker` を作る。
pub fn opener_then_win(dir: &Path, name: &str, marker: &Path) -> EngineSpec {
    let body = format!(
        r#"while IFS= read -r line; do
  case "$line" in
    go) echo "move a2a3" ;;
    usermove*) echo "1-0 {{Black resigns}}" ;;
    quit) echo quit > "{marker}"; exit 0 ;;
  esac
done
"#,
        marker = marker.display()
    );
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), &body))
}

/// usermove には `move h7h6` を返し、受信した全行を `transcript` に追記する。
/// quit を受けると `marker` を作る。
pub fn recording_replier(dir: &Path, name: &str, transcript: &Path, marker: &Path) -> EngineSpec {
    let body = format!(
        r#"while IFS= read -r line; do
  echo "$line" >> "{transcript}"
  case "$line" in
    usermove*) echo "move h7h6" ;;
    quit) echo quit > "{marker}"; exit 0 ;;
  esac
done
"#,
        transcript = transcript.display(),
        marker = marker.display()
    );
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), &body))
}

/// 結果を出さずに指し続ける。
pub fn endless_mover(dir: &Path, name: &str) -> EngineSpec {
    let body = r#"while IFS= read -r line; do
  case "$line" in
    go|usermove*) echo "move a2a3" ;;
    quit) exit 0 ;;
  esac
done
"#;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

/// 先手でも後手でも2回目の応手で勝ちを宣言する。途中で雑音行も出す。
pub fn strong(dir: &Path, name: &str) -> EngineSpec {
    let body = r##"color=black
n=0
echo "feature usermove=1 done=1"
while IFS= read -r line; do
  case "$line" in
    go) color=white; echo "move e2e3" ;;
    usermove*)
      n=$((n+1))
      if [ "$n" -ge 2 ]; then
        if [ "$color" = white ]; then echo "1-0 {mated}"; else echo "0-1 {mated}"; fi
      else
        echo "# thinking"
        echo "move b7b6"
      fi ;;
    quit) exit 0 ;;
  esac
done
"##;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

/// go と usermove に指し手を返すだけで、結果は宣言しない。
pub fn weak(dir: &Path, name: &str) -> EngineSpec {
    let body = r#"while IFS= read -r line; do
  case "$line" in
    go|usermove*) echo "move g2g4" ;;
    quit) exit 0 ;;
  esac
done
"#;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

/// go を受けると UTF-8 でない雑音行を出してから指し、相手の応手には `1-0` を返す。
pub fn binary_noise_then_win(dir: &Path, name: &str) -> EngineSpec {
    let body = r#"while IFS= read -r line; do
  case "$line" in
    go) printf '\377 debug noise\n'; echo "move a2a3" ;;
    usermove*) echo "1-0 {Black resigns}" ;;
    quit) exit 0 ;;
  esac
done
"#;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

/// go で1手指した直後に終了する。
pub fn move_then_exit(dir: &Path, name: &str) -> EngineSpec {
    let body = r#"while IFS= read -r line; do
  case "$line" in
    go) echo "move a2a3"; exit 0 ;;
  esac
done
"#;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

/// 入力を待たずに指し手を出し続ける。quit は読まないので終了は kill 頼み。
pub fn unprompted_mover(dir: &Path, name: &str) -> EngineSpec {
    let body = r#"while :; do
  echo "move h7h6" || exit 0
done
"#;
    EngineSpec::new(name, write_engine(dir, &format!("{name}.sh"), body))
}

pub fn fast_game_config() -> GameConfig {
    GameConfig {
        seconds: 60,
        idle_sleep: Duration::from_micros(200),
        quit_timeout: Duration::from_secs(5),
        ..GameConfig::default()
    }
}
