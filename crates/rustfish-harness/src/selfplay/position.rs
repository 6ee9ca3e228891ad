//! ルールオラクル（shakmaty）の薄いラッパー。
//!
//! 終局判定は「申告なし」の扱いに揃える: チェックメイト、ステイルメイト、
//! 駒不足、75手ルール、5回同一局面。

use anyhow::{Context, Result, anyhow};
use shakmaty::fen::{Epd, Fen};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};

/// 75手ルール（申告不要の引き分け）に達する halfmove clock。
const SEVENTYFIVE_MOVE_HALFMOVES: u32 = 150;
/// 申告不要の同一局面回数。
const FIVEFOLD: usize = 5;

/// オラクルが返す対局状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardResult {
    WhiteWin,
    BlackWin,
    Draw,
    InProgress,
}

impl BoardResult {
    pub fn token(self) -> &'static str {
        match self {
            BoardResult::WhiteWin => "1-0",
            BoardResult::BlackWin => "0-1",
            BoardResult::Draw => "1/2-1/2",
            BoardResult::InProgress => "*",
        }
    }
}

/// 対局中の局面と、開始局面からの指し手履歴。
#[derive(Clone)]
pub struct GameBoard {
    pos: Chess,
    /// 開始局面の FEN。平手なら `None`。
    start_fen: Option<String>,
    moves: Vec<String>,
    /// 同一局面判定用の EPD（開始局面を含む）
    history: Vec<String>,
}

impl GameBoard {
    pub fn initial_position() -> Self {
        Self::from_chess(Chess::default(), None)
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid FEN '{fen}': {e}"))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| anyhow!("illegal start position '{fen}': {e}"))?;
        // エンジンには省略のない正規化済み FEN を渡す
        let normalized = Fen::from_position(&pos, EnPassantMode::Legal).to_string();
        Ok(Self::from_chess(pos, Some(normalized)))
    }

    /// 開始局面指定（`None` なら平手）から盤面を作る。
    pub fn from_start(start_fen: Option<&str>) -> Result<Self> {
        match start_fen {
            Some(fen) => Self::from_fen(fen),
            None => Ok(Self::initial_position()),
        }
    }

    fn from_chess(pos: Chess, start_fen: Option<String>) -> Self {
        let key = repetition_key(&pos);
        Self {
            pos,
            start_fen,
            moves: Vec::new(),
            history: vec![key],
        }
    }

    /// UCI 表記の指し手を適用する。非合法手や解析不能な文字列はエラー。
    pub fn apply(&mut self, uci: &str) -> Result<()> {
        let parsed: UciMove = uci
            .parse()
            .map_err(|e| anyhow!("unparsable move '{uci}': {e}"))?;
        let mv = parsed
            .to_move(&self.pos)
            .with_context(|| format!("illegal move '{uci}' in {}", self.fen()))?;
        self.pos.play_unchecked(mv);
        self.moves.push(uci.to_string());
        self.history.push(repetition_key(&self.pos));
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.result() != BoardResult::InProgress
    }

    pub fn result(&self) -> BoardResult {
        if self.pos.is_checkmate() {
            return match self.pos.turn() {
                Color::White => BoardResult::BlackWin,
                Color::Black => BoardResult::WhiteWin,
            };
        }
        if self.pos.is_stalemate()
            || self.pos.is_insufficient_material()
            || self.pos.halfmoves() >= SEVENTYFIVE_MOVE_HALFMOVES
            || self.is_fivefold_repetition()
        {
            return BoardResult::Draw;
        }
        BoardResult::InProgress
    }

    fn is_fivefold_repetition(&self) -> bool {
        let Some(current) = self.history.last() else {
            return false;
        };
        self.history.iter().filter(|key| *key == current).count() >= FIVEFOLD
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn ply_count(&self) -> u32 {
        self.moves.len() as u32
    }

    /// 現局面を UCI `position` コマンドとして表す。
    pub fn describe(&self) -> String {
        let mut buf = match &self.start_fen {
            Some(fen) => format!("position fen {fen}"),
            None => "position startpos".to_string(),
        };
        if !self.moves.is_empty() {
            buf.push_str(" moves ");
            buf.push_str(&self.moves.join(" "));
        }
        buf
    }
}

fn repetition_key(pos: &Chess) -> String {
    Epd::from_position(pos, EnPassantMode::Legal).to_string()
}
