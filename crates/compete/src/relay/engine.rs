use std::fmt;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use super::error::{EngineError, EngineResult, SpecError};

pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 対局者1人分の設定（名前と実行ファイル）。起動後は読み取り専用で共有する。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSpec {
    pub name: String,
    pub path: PathBuf,
}

impl EngineSpec {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl FromStr for EngineSpec {
    type Err = SpecError;

    /// `NAME:PATH` を最初の `:` で分割する（パス側の `:` はそのまま残す）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) =
            s.split_once(':').ok_or_else(|| SpecError::MissingSeparator(s.to_string()))?;
        if name.trim().is_empty() {
            return Err(SpecError::EmptyName(s.to_string()));
        }
        if path.trim().is_empty() {
            return Err(SpecError::EmptyPath(s.to_string()));
        }
        Ok(Self::new(name.trim(), path.trim()))
    }
}

impl fmt::Display for EngineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.path.display())
    }
}

/// 中継ループから見たエンジンの入出力。
///
/// `try_recv_line` は決してブロックしない。データがない場合とストリームが
/// 閉じた場合はどちらも `None` を返す。
pub trait LineEndpoint {
    fn name(&self) -> &str;
    fn send(&mut self, line: &str) -> EngineResult<()>;
    fn try_recv_line(&mut self) -> Option<String>;
}

/// 1本のエンジンプロセスに対する入出力をカプセル化する。
///
/// stdout は専用スレッドが行単位でキューに積むため、受信側は常に非ブロッキング。
/// Drop 時に `quit` を送って終了を待つので、どの経路で対局が終わっても後始末される。
pub struct EngineHandle {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    rx: Receiver<String>,
    quit_timeout: Duration,
    exit_status: Option<ExitStatus>,
    name: String,
}

impl EngineHandle {
    /// エンジンを起動し、初期化コマンド（name / new / variant）を送る。
    pub fn spawn(
        spec: &EngineSpec,
        opponent_name: &str,
        variant: &str,
        quit_timeout: Duration,
    ) -> EngineResult<Self> {
        let mut child = Command::new(&spec.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                name: spec.name.clone(),
                path: spec.path.clone(),
                source,
            })?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (stdin, stdout) = match (stdin, stdout) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            (None, _) => {
                reap(&mut child);
                return Err(EngineError::MissingPipe(spec.name.clone(), "stdin"));
            }
            (_, None) => {
                reap(&mut child);
                return Err(EngineError::MissingPipe(spec.name.clone(), "stdout"));
            }
        };

        let (tx, rx) = mpsc::channel::<String>();
        let reader_name = spec.name.clone();
        std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        // 不正な UTF-8 を含む行も置換文字にして渡す
                        if tx.send(decode_line(&buf)).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::debug!("{reader_name}: stdout closed: {e}");
                        break;
                    }
                }
            }
        });

        log::info!(
            "starting instance {} ({}) pid={}",
            spec.name,
            spec.path.display(),
            child.id()
        );

        let mut handle = Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            rx,
            quit_timeout,
            exit_status: None,
            name: spec.name.clone(),
        };
        for line in [format!("name {opponent_name}"), "new".to_string(), format!("variant {variant}")]
        {
            if let Err(e) = handle.write_line(&line) {
                log::debug!("{e}");
            }
        }
        Ok(handle)
    }

    pub fn write_line(&mut self, msg: &str) -> EngineResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(EngineError::Write {
                name: self.name.clone(),
                source: io::Error::from(io::ErrorKind::BrokenPipe),
            });
        };
        let res = stdin
            .write_all(msg.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush());
        res.map_err(|source| EngineError::Write {
            name: self.name.clone(),
            source,
        })
    }

    /// `quit` を送り、stdin を閉じてからプロセスの終了を待つ。
    ///
    /// 猶予時間内に終了しない場合は kill して回収する。2回目以降の呼び出しは
    /// 記録済みの終了ステータスを返す。
    pub fn terminate(&mut self) -> EngineResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        if let Err(e) = self.write_line("quit") {
            log::debug!("{e}");
        }
        self.stdin = None;

        let deadline = Instant::now() + self.quit_timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("{}: exited ({status})", self.name);
                    self.exit_status = Some(status);
                    return Ok(status);
                }
                Ok(None) if Instant::now() < deadline => {
                    std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
                }
                Ok(None) => break,
                Err(source) => {
                    return Err(EngineError::Wait {
                        name: self.name.clone(),
                        source,
                    });
                }
            }
        }

        log::warn!("{}: still running {:?} after quit, killing", self.name, self.quit_timeout);
        let _ = self.child.kill();
        let status = self.child.wait().map_err(|source| EngineError::Wait {
            name: self.name.clone(),
            source,
        })?;
        self.exit_status = Some(status);
        Ok(status)
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }
}

impl LineEndpoint for EngineHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, line: &str) -> EngineResult<()> {
        self.write_line(line)
    }

    fn try_recv_line(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.exit_status.is_some() {
            return;
        }
        if let Err(e) = self.terminate() {
            log::warn!("{e}");
        }
    }
}

/// 改行（`\n` / `\r\n`）を取り除き、不正な UTF-8 は置換文字にして1行に変換する。
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
