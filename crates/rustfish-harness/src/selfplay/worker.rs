use anyhow::{Context, Result};
use crossbeam_channel as chan;
use log::{debug, error};
use shakmaty::Color;

use super::engine::{EngineConfig, EngineHandle, EngineProcess};
use super::game::{GameConfig, GameRecord, MoveEvent, run_game};
use super::tally::{Identity, MatchTally};
use super::types::side_label;

/// 1局ごとに新しいエンジンを起動する窓口。ワーカースレッド間で共有される。
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, identity: Identity, color: Color) -> Result<Box<dyn EngineHandle>>;
}

/// 候補・旧ビルドの実行ファイルを UCI プロセスとして起動する。
pub struct ProcessLauncher {
    pub candidate: EngineConfig,
    pub baseline: EngineConfig,
}

impl EngineLauncher for ProcessLauncher {
    fn launch(&self, identity: Identity, color: Color) -> Result<Box<dyn EngineHandle>> {
        let cfg = match identity {
            Identity::Candidate => &self.candidate,
            Identity::Baseline => &self.baseline,
        };
        let label = format!("{}({})", identity.label(), side_label(color));
        let engine = EngineProcess::spawn(cfg, label)?;
        Ok(Box::new(engine))
    }
}

/// ワーカー1本分の設定
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub worker_id: u32,
    pub games: u32,
    pub game: GameConfig,
}

/// ワーカーからコーディネータへ1度だけ渡される集計。
#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub worker_id: u32,
    pub tally: MatchTally,
    pub games_completed: u32,
    /// `Some` なら途中で失敗したバッチ。集計に混ぜてはいけない。
    pub failure: Option<String>,
}

impl WorkerReport {
    pub fn invalid(worker_id: u32, reason: impl Into<String>) -> Self {
        Self {
            worker_id,
            tally: MatchTally::default(),
            games_completed: 0,
            failure: Some(reason.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.failure.is_none()
    }
}

/// G 局を順番に指し、局ごとに先後を入れ替えながら得点を集計する。
///
/// 1局でも失敗したらそこで打ち切り、無効な報告を返す（再試行はしない）。
pub fn run_batch(cfg: &WorkerConfig, launcher: &dyn EngineLauncher) -> WorkerReport {
    let mut tally = MatchTally::default();
    let mut completed = 0u32;
    for g in 0..cfg.games {
        let game_no = cfg.games * cfg.worker_id + g + 1;
        let white_identity = Identity::white_for_game(g);
        let candidate_color = if white_identity == Identity::Candidate {
            Color::White
        } else {
            Color::Black
        };
        match play_one(launcher, white_identity, &cfg.game, game_no) {
            Ok(record) => {
                tally.record(record.outcome(), candidate_color);
                completed += 1;
                print!("{}", format_game_block(game_no, &record));
            }
            Err(e) => {
                error!("worker {}: game {game_no} failed: {e:#}", cfg.worker_id);
                return WorkerReport {
                    worker_id: cfg.worker_id,
                    tally,
                    games_completed: completed,
                    failure: Some(format!("game {game_no}: {e:#}")),
                };
            }
        }
    }
    WorkerReport {
        worker_id: cfg.worker_id,
        tally,
        games_completed: completed,
        failure: None,
    }
}

/// ワーカースレッドの本体。報告は必ず1回だけ送る。
pub fn run_worker(
    cfg: WorkerConfig,
    launcher: &dyn EngineLauncher,
    tx: chan::Sender<WorkerReport>,
) {
    let report = run_batch(&cfg, launcher);
    debug!(
        "worker {}: {} games, tally {}",
        cfg.worker_id, report.games_completed, report.tally
    );
    // 受信側が先に落ちている場合は送れないが、その時点で集計は破棄されている
    let _ = tx.send(report);
}

fn play_one(
    launcher: &dyn EngineLauncher,
    white_identity: Identity,
    config: &GameConfig,
    game_no: u32,
) -> Result<GameRecord> {
    let black_identity = match white_identity {
        Identity::Candidate => Identity::Baseline,
        Identity::Baseline => Identity::Candidate,
    };
    let mut white = launcher
        .launch(white_identity, Color::White)
        .with_context(|| format!("failed to start {} as white", white_identity.label()))?;
    let mut black = match launcher.launch(black_identity, Color::Black) {
        Ok(engine) => engine,
        Err(e) => {
            white.stop();
            return Err(e.context(format!("failed to start {} as black", black_identity.label())));
        }
    };
    let mut on_move = |ev: &MoveEvent<'_>| {
        debug!(
            "game {} ply {} {} {} played {} score {:?} depth {:?} nodes {:?} in {:.3}s, {:.3}s left",
            ev.game_id,
            ev.ply,
            side_label(ev.side),
            ev.engine_label,
            ev.move_uci,
            ev.score,
            ev.depth,
            ev.nodes,
            ev.elapsed.as_secs_f64(),
            ev.remaining
        );
    };
    run_game(white.as_mut(), black.as_mut(), config, game_no, &mut on_move)
}

/// 1局分の結果表示。
pub fn format_game_block(game_no: u32, record: &GameRecord) -> String {
    let mut out = format!("GAME {game_no} Finished\n");
    if record.is_adjudicated() {
        out.push_str("Adjunct Draw\n");
    }
    out.push_str(record.outcome().result_token());
    out.push('\n');
    out.push_str(record.final_fen());
    out.push_str("\n\n");
    out
}
