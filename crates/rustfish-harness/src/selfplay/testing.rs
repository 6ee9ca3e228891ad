//! プロセスを使わないテスト用エンジン。

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use shakmaty::Color;

use super::engine::EngineHandle;
use super::tally::Identity;
use super::types::{MoveReply, MoveRequest, Score, TimeArgs};
use super::worker::EngineLauncher;

/// 白: f3, g4 / 黒: e5, Qh4#。4 ply で黒勝ち。
pub const FOOLS_MATE_WHITE: [&str; 2] = ["f2f3", "g2g4"];
pub const FOOLS_MATE_BLACK: [&str; 2] = ["e7e5", "d8h4"];

/// 決められた指し手を順に返すエンジン。
pub struct ScriptedEngine {
    label: String,
    moves: VecDeque<String>,
    cycle: bool,
    score: Option<Score>,
    stopped: bool,
    stop_counter: Option<Arc<AtomicUsize>>,
    pub seen_time_args: Vec<TimeArgs>,
    pub seen_positions: Vec<(Option<String>, Vec<String>)>,
}

impl ScriptedEngine {
    pub fn new(label: &str, moves: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            moves: moves.iter().map(|m| m.to_string()).collect(),
            cycle: false,
            score: None,
            stopped: false,
            stop_counter: None,
            seen_time_args: Vec::new(),
            seen_positions: Vec::new(),
        }
    }

    /// 指し手列を使い切ったら先頭から繰り返す。
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    pub fn with_score(mut self, score: Score) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_stop_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.stop_counter = Some(counter);
        self
    }
}

impl EngineHandle for ScriptedEngine {
    fn label(&self) -> &str {
        &self.label
    }

    fn request_move(&mut self, req: &MoveRequest<'_>) -> Result<MoveReply> {
        if self.stopped {
            bail!("{}: request after stop", self.label);
        }
        self.seen_time_args.push(req.time_args);
        self.seen_positions
            .push((req.start_fen.map(str::to_string), req.moves.to_vec()));
        let Some(mv) = self.moves.pop_front() else {
            bail!("{}: script exhausted", self.label);
        };
        if self.cycle {
            self.moves.push_back(mv.clone());
        }
        Ok(MoveReply {
            bestmove: mv,
            score: if req.want_eval { self.score } else { None },
            depth: Some(1),
            nodes: None,
        })
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(counter) = &self.stop_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// 色ごとに決まった台本を渡すランチャー。起動数と停止数を数える。
#[derive(Default)]
pub struct ScriptedLauncher {
    pub launched: AtomicUsize,
    pub stopped: Arc<AtomicUsize>,
    /// 1 以上なら、この回数目の起動で失敗する
    pub fail_on_launch: usize,
    /// true なら白が非合法手を指す
    pub illegal_white: bool,
}

impl EngineLauncher for ScriptedLauncher {
    fn launch(&self, identity: Identity, color: Color) -> Result<Box<dyn EngineHandle>> {
        let n = self.launched.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on_launch {
            bail!("launch #{n} refused");
        }
        let script: &[&str] = match color {
            Color::White if self.illegal_white => &["e2e5"],
            Color::White => &FOOLS_MATE_WHITE,
            Color::Black => &FOOLS_MATE_BLACK,
        };
        let engine = ScriptedEngine::new(identity.label(), script)
            .with_score(Score::Cp(0))
            .with_stop_counter(self.stopped.clone());
        Ok(Box::new(engine))
    }
}
