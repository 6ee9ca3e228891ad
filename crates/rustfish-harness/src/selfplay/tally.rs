use std::fmt;

use shakmaty::Color;

use super::types::GameOutcome;

/// 論理的なエンジンの区別。色とは独立に勝敗を帰属させるために使う。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Identity {
    /// 今回ビルドしたエンジン
    Candidate,
    /// 比較対象の旧ビルド
    Baseline,
}

impl Identity {
    pub fn label(self) -> &'static str {
        match self {
            Identity::Candidate => "candidate",
            Identity::Baseline => "baseline",
        }
    }

    /// バッチ内 `game_index` 局目で白を持つエンジン。偶数局は候補が白。
    pub fn white_for_game(game_index: u32) -> Identity {
        if game_index % 2 == 0 {
            Identity::Candidate
        } else {
            Identity::Baseline
        }
    }
}

/// 候補・旧ビルドそれぞれの得点（勝ち 1、引き分け 0.5）。
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MatchTally {
    pub candidate: f64,
    pub baseline: f64,
}

impl MatchTally {
    /// 1局の結果を、その局で `candidate_color` を持っていた候補側から見て加算する。
    pub fn record(&mut self, outcome: GameOutcome, candidate_color: Color) {
        match outcome.winner() {
            None => {
                self.candidate += 0.5;
                self.baseline += 0.5;
            }
            Some(winner) if winner == candidate_color => self.candidate += 1.0,
            Some(_) => self.baseline += 1.0,
        }
    }

    pub fn merge(&mut self, other: &MatchTally) {
        self.candidate += other.candidate;
        self.baseline += other.baseline;
    }

    /// 両者の得点の和。1局につき必ず 1.0 増える。
    pub fn total(&self) -> f64 {
        self.candidate + self.baseline
    }
}

impl fmt::Display for MatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?}]", self.candidate, self.baseline)
    }
}
