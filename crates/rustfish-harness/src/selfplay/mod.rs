pub mod adjudication;
pub mod coordinator;
pub mod engine;
pub mod game;
pub mod position;
pub mod tally;
pub mod time_control;
pub mod types;
pub mod worker;

#[cfg(test)]
mod testing;

pub use adjudication::{AdjudicationConfig, DrawAdjudicator};
pub use coordinator::{MatchConfig, MatchSummary, collect_reports, run_match};
pub use engine::{EngineConfig, EngineHandle, EngineProcess};
pub use game::{GameConfig, GameRecord, MoveEvent, run_game};
pub use position::{BoardResult, GameBoard};
pub use tally::{Identity, MatchTally};
pub use time_control::Clock;
pub use types::{GameOutcome, MoveReply, MoveRequest, Score, TimeArgs, side_label};
pub use worker::{EngineLauncher, ProcessLauncher, WorkerConfig, WorkerReport, run_batch};
