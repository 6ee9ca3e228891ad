use shakmaty::Color;

use super::types::Score;

/// 評価値による引き分け裁定の閾値。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjudicationConfig {
    /// この手数（ply）以下では裁定しない
    pub min_plies: u32,
    /// 白視点スコアがこの値の開区間 (-band, band) に入れば「引き分け気味」
    pub band: i32,
    /// 連続加算の目標値。1 ply ごとに 0.5 加算する。
    pub streak_target: f64,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            min_plies: 80,
            band: 10,
            streak_target: 3.0,
        }
    }
}

const STREAK_STEP: f64 = 0.5;

/// 互いに決め手のない局面が続いたら引き分けを宣言する。
pub struct DrawAdjudicator {
    config: AdjudicationConfig,
    streak: f64,
    plies: u32,
}

impl DrawAdjudicator {
    pub fn new(config: AdjudicationConfig) -> Self {
        Self {
            config,
            streak: 0.0,
            plies: 0,
        }
    }

    /// 1 ply 分の評価値を観測し、今すぐ引き分けにすべきなら true を返す。
    ///
    /// - `ply_count`: この手を指した後の総手数
    /// - `score`: 指した側（`mover`）視点の評価値。報告が無ければ `None`
    pub fn observe(&mut self, ply_count: u32, score: Option<Score>, mover: Color) -> bool {
        self.plies = ply_count;
        if ply_count <= self.config.min_plies {
            self.streak = 0.0;
            return false;
        }
        let qualifies = score
            .map(|s| s.white_relative(mover))
            .is_some_and(|white| -self.config.band < white && white < self.config.band);
        if qualifies {
            self.streak += STREAK_STEP;
        } else {
            self.streak = 0.0;
        }
        self.streak >= self.config.streak_target
    }

    pub fn streak(&self) -> f64 {
        self.streak
    }

    pub fn plies_observed(&self) -> u32 {
        self.plies
    }

    pub fn reset(&mut self) {
        self.streak = 0.0;
        self.plies = 0;
    }
}

impl Default for DrawAdjudicator {
    fn default() -> Self {
        Self::new(AdjudicationConfig::default())
    }
}
