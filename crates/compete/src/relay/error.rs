//! エンジンプロセス操作のエラー型

use std::io;
use std::path::PathBuf;

/// エンジンプロセスの起動・書き込みで発生するエラー
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// 実行ファイルが存在しない、または起動できない
    #[error("failed to spawn engine {name} at {path}: {source}")]
    Spawn {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// 子プロセスのパイプが取得できなかった
    #[error("engine {0}: missing {1} pipe")]
    MissingPipe(String, &'static str),

    /// 終了済みエンジンへの書き込み
    #[error("engine {name}: write failed: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },

    /// quit 後の待機に失敗した
    #[error("engine {name}: wait failed: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// 対局を継続できないエラーか（起動失敗のみが致命的）。
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, EngineError::Spawn { .. } | EngineError::MissingPipe(..))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// `NAME:PATH` 形式のエンジン指定の解析エラー
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SpecError {
    #[error("engine must be given as NAME:PATH, got \"{0}\"")]
    MissingSeparator(String),

    #[error("engine name is empty in \"{0}\"")]
    EmptyName(String),

    #[error("engine path is empty in \"{0}\"")]
    EmptyPath(String),
}
