use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use shakmaty::Color;

use super::adjudication::{AdjudicationConfig, DrawAdjudicator};
use super::engine::EngineHandle;
use super::position::{BoardResult, GameBoard};
use super::time_control::Clock;
use super::types::{GameOutcome, MoveRequest, Score};
use crate::error::MatchError;

/// ゲーム設定
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// 初期持ち時間（秒）
    pub initial_time: f64,
    /// 1手ごとの加算（秒）
    pub increment: f64,
    /// 開始局面の FEN。`None` なら平手。
    pub start_fen: Option<String>,
    pub adjudication: AdjudicationConfig,
    /// 自分の残り時間 + 加算 にこの余裕を足した時間まで `bestmove` を待つ
    pub move_timeout_margin: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_time: 60.0,
            increment: 0.0,
            start_fen: None,
            adjudication: AdjudicationConfig::default(),
            move_timeout_margin: Duration::from_secs(10),
        }
    }
}

/// 1手ごとに呼ばれるイベント
pub struct MoveEvent<'a> {
    pub game_id: u32,
    pub ply: u32,
    pub side: Color,
    pub move_uci: &'a str,
    pub elapsed: Duration,
    /// 着手後の手番側の残り時間（秒）
    pub remaining: f64,
    pub score: Option<Score>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub engine_label: &'a str,
}

/// 終局した1局の記録。
#[derive(Clone, Debug)]
pub struct GameRecord {
    moves: Vec<String>,
    outcome: GameOutcome,
    final_fen: String,
}

impl GameRecord {
    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    pub fn final_fen(&self) -> &str {
        &self.final_fen
    }

    pub fn plies(&self) -> u32 {
        self.moves.len() as u32
    }

    pub fn is_adjudicated(&self) -> bool {
        self.outcome == GameOutcome::AdjudicatedDraw
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    AwaitingMove(Color),
    Adjudicated,
    GameOver,
}

/// 対局中の2エンジン。どの経路で抜けても（エラー・panic を含む）両方を停止させる。
struct EnginePair<'a> {
    white: &'a mut dyn EngineHandle,
    black: &'a mut dyn EngineHandle,
}

impl EnginePair<'_> {
    fn get(&mut self, side: Color) -> &mut dyn EngineHandle {
        match side {
            Color::White => &mut *self.white,
            Color::Black => &mut *self.black,
        }
    }
}

impl Drop for EnginePair<'_> {
    fn drop(&mut self) {
        self.white.stop();
        self.black.stop();
    }
}

/// 1局を実行する。
///
/// - `white`, `black`: 起動済みのエンジン。戻る時点で必ず停止している
/// - `config`: 持ち時間・開始局面・裁定条件
/// - `game_id`: ゲーム番号（イベント用）
/// - `on_move`: 1手ごとに呼ばれるコールバック
pub fn run_game(
    white: &mut dyn EngineHandle,
    black: &mut dyn EngineHandle,
    config: &GameConfig,
    game_id: u32,
    on_move: &mut dyn FnMut(&MoveEvent<'_>),
) -> Result<GameRecord> {
    let mut engines = EnginePair { white, black };
    let mut board = GameBoard::from_start(config.start_fen.as_deref())?;
    let mut clock = Clock::new(config.initial_time, config.increment);
    let mut adjudicator = DrawAdjudicator::new(config.adjudication);
    let mut state = if board.is_terminal() {
        SessionState::GameOver
    } else {
        SessionState::AwaitingMove(board.turn())
    };

    while let SessionState::AwaitingMove(side) = state {
        let start = Instant::now();
        let engine = engines.get(side);
        let reply = {
            let req = MoveRequest {
                start_fen: board.start_fen(),
                moves: board.moves(),
                time_args: clock.time_args(),
                max_wait: max_wait(&clock, side, config.move_timeout_margin),
                want_eval: true,
            };
            engine.request_move(&req)?
        };

        if let Err(e) = board.apply(&reply.bestmove) {
            log::debug!("{}: {e:#} ({})", engine.label(), board.describe());
            return Err(MatchError::IllegalMove {
                engine: engine.label().to_string(),
                mv: reply.bestmove,
                fen: board.fen(),
            }
            .into());
        }
        let elapsed = start.elapsed();
        clock.consume(side, elapsed.as_secs_f64(), clock.increment());

        let ply = board.ply_count();
        on_move(&MoveEvent {
            game_id,
            ply,
            side,
            move_uci: &reply.bestmove,
            elapsed,
            remaining: clock.remaining(side),
            score: reply.score,
            depth: reply.depth,
            nodes: reply.nodes,
            engine_label: engine.label(),
        });

        state = if adjudicator.observe(ply, reply.score, side) {
            SessionState::Adjudicated
        } else if board.is_terminal() {
            SessionState::GameOver
        } else {
            SessionState::AwaitingMove(!side)
        };
    }

    let outcome = match (state, board.result()) {
        (SessionState::Adjudicated, _) => GameOutcome::AdjudicatedDraw,
        (_, BoardResult::WhiteWin) => GameOutcome::WhiteWin,
        (_, BoardResult::BlackWin) => GameOutcome::BlackWin,
        (_, BoardResult::Draw) => GameOutcome::Draw,
        (_, BoardResult::InProgress) => bail!("game {game_id} stopped without a result"),
    };

    Ok(GameRecord {
        moves: board.moves().to_vec(),
        outcome,
        final_fen: board.fen(),
    })
}

/// `bestmove` を待つ上限。残り時間が負でも余裕分は必ず待ち、表せないほど長い時計は `Duration::MAX` に丸める。
fn max_wait(clock: &Clock, side: Color, margin: Duration) -> Duration {
    let budget = clock.remaining(side) + clock.increment();
    let budget = if budget > 0.0 {
        Duration::try_from_secs_f64(budget).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    };
    budget.saturating_add(margin)
}
