//! 2つの xboard 互換エンジンを対局させる中継ハーネス。
//!
//! - `relay`: エンジンプロセスの管理と1局分の中継状態機械
//! - `scheduler`: ワーカーへの対局割り振りと結果の集計
//! - `results_log`: 全ワーカー共有の追記ログ

pub mod relay;
pub mod results_log;
pub mod scheduler;

pub use relay::{EngineSpec, GameConfig, GameOutcome, GameResult, GameSession};
pub use results_log::{LogTargets, ResultsLog, ResultsSink};
pub use scheduler::{split_games, MatchConfig, MatchReport, MatchScheduler, Tally};
