use shakmaty::Color;

use super::types::TimeArgs;

/// エンジンに渡す残り時間の下限（ミリ秒）。負の時計を送らないための丸め。
const MIN_RELAYED_MS: u64 = 1;

/// フィッシャー方式の持ち時間（秒）。時間切れ負けは判定せず、経過時間の記帳と中継だけを行う。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    white_time: f64,
    black_time: f64,
    increment: f64,
}

impl Clock {
    pub fn new(initial: f64, increment: f64) -> Self {
        Self {
            white_time: initial,
            black_time: initial,
            increment,
        }
    }

    pub fn remaining(&self, side: Color) -> f64 {
        match side {
            Color::White => self.white_time,
            Color::Black => self.black_time,
        }
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// `side` の残り時間を `remaining - elapsed + increment` に更新する。下限は設けない。
    pub fn consume(&mut self, side: Color, elapsed: f64, increment: f64) {
        let slot = match side {
            Color::White => &mut self.white_time,
            Color::Black => &mut self.black_time,
        };
        *slot = *slot - elapsed + increment;
    }

    pub fn time_args(&self) -> TimeArgs {
        TimeArgs {
            wtime: relay_ms(self.white_time),
            btime: relay_ms(self.black_time),
            winc: relay_ms_allow_zero(self.increment),
            binc: relay_ms_allow_zero(self.increment),
        }
    }
}

fn relay_ms(secs: f64) -> u64 {
    relay_ms_allow_zero(secs).max(MIN_RELAYED_MS)
}

fn relay_ms_allow_zero(secs: f64) -> u64 {
    if secs.is_nan() || secs <= 0.0 {
        return 0;
    }
    (secs * 1000.0).round() as u64
}
