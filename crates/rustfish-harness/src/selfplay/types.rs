use std::time::Duration;

use shakmaty::Color;

/// 詰みスコアを白視点の数値に写すときの絶対値。引き分け判定の帯 (±10) から十分に離す。
pub const MATE_SENTINEL: i32 = 100_000;

/// エンジンが `info ... score` で報告した評価値（手番側＝指した側の視点）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// `score mate N`。正なら報告側が詰ます、0 以下なら報告側が詰まされる。
    Mate(i32),
}

impl Score {
    /// 手番側視点のスコアを数値化する。詰みは ±[`MATE_SENTINEL`] に丸める。
    pub fn to_value(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => MATE_SENTINEL,
            Score::Mate(_) => -MATE_SENTINEL,
        }
    }

    /// `mover` 視点のスコアを白視点に変換する。
    pub fn white_relative(self, mover: Color) -> i32 {
        let value = self.to_value();
        match mover {
            Color::White => value,
            Color::Black => -value,
        }
    }
}

#[derive(Default, Clone)]
pub struct InfoSnapshot {
    pub score: Option<Score>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
}

impl InfoSnapshot {
    /// info 行を解析し、multipv=1 の情報を保持する。
    pub fn update_from_line(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().copied() != Some("info") {
            return;
        }
        let mut multipv = 1u32;
        let mut idx = 1;
        while idx + 1 < tokens.len() {
            if tokens[idx] == "multipv" {
                multipv = tokens[idx + 1].parse::<u32>().unwrap_or(1);
                break;
            }
            idx += 1;
        }
        if multipv != 1 {
            return;
        }
        let mut i = 1;
        while i < tokens.len() {
            match tokens[i] {
                // info string 以降は自由文なので読まない
                "string" => break,
                "depth" => {
                    if i + 1 < tokens.len() {
                        self.depth = tokens[i + 1].parse::<u32>().ok();
                        i += 1;
                    }
                }
                "nodes" => {
                    if i + 1 < tokens.len() {
                        self.nodes = tokens[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "score" => {
                    if i + 2 < tokens.len() {
                        match tokens[i + 1] {
                            "cp" => {
                                if let Ok(cp) = tokens[i + 2].parse::<i32>() {
                                    self.score = Some(Score::Cp(cp));
                                }
                                i += 2;
                            }
                            "mate" => {
                                if let Ok(n) = tokens[i + 2].parse::<i32>() {
                                    self.score = Some(Score::Mate(n));
                                }
                                i += 2;
                            }
                            _ => {}
                        }
                    }
                }
                // pv 以降は指し手列
                "pv" => break,
                _ => {}
            }
            i += 1;
        }
    }
}

/// `go` コマンドに渡す時計（ミリ秒）。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeArgs {
    pub wtime: u64,
    pub btime: u64,
    pub winc: u64,
    pub binc: u64,
}

/// 1手分の探索依頼。
pub struct MoveRequest<'a> {
    /// 開始局面の FEN。`None` なら平手 (`position startpos`)。
    pub start_fen: Option<&'a str>,
    /// 開始局面からの指し手列（UCI 表記）
    pub moves: &'a [String],
    pub time_args: TimeArgs,
    /// `bestmove` を待つ上限。超えたら EngineUnresponsive。
    pub max_wait: Duration,
    /// 評価値を要求するか。false の場合 info 行を読み捨てる。
    pub want_eval: bool,
}

pub struct MoveReply {
    pub bestmove: String,
    pub score: Option<Score>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWin,
    BlackWin,
    Draw,
    /// 評価値ベースの引き分け裁定
    AdjudicatedDraw,
}

impl GameOutcome {
    /// PGN 形式の結果トークン。
    pub fn result_token(self) -> &'static str {
        match self {
            GameOutcome::WhiteWin => "1-0",
            GameOutcome::BlackWin => "0-1",
            GameOutcome::Draw | GameOutcome::AdjudicatedDraw => "1/2-1/2",
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameOutcome::WhiteWin => Some(Color::White),
            GameOutcome::BlackWin => Some(Color::Black),
            GameOutcome::Draw | GameOutcome::AdjudicatedDraw => None,
        }
    }
}

pub fn side_label(color: Color) -> char {
    if color == Color::White {
        'w'
    } else {
        'b'
    }
}
