use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel as chan;
use log::{error, info, warn};

use super::game::GameConfig;
use super::tally::MatchTally;
use super::worker::{EngineLauncher, WorkerConfig, WorkerReport, run_worker};
use crate::error::MatchError;

/// 並列対局全体の設定
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// 同時に走らせるワーカー数
    pub workers: u32,
    /// ワーカー1本あたりの対局数
    pub games_per_worker: u32,
    pub game: GameConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            games_per_worker: 7,
            game: GameConfig::default(),
        }
    }
}

/// 全ワーカーの報告と、その有効分の合計。
#[derive(Clone, Debug)]
pub struct MatchSummary {
    pub tally: MatchTally,
    pub reports: Vec<WorkerReport>,
}

impl MatchSummary {
    pub fn failed_workers(&self) -> usize {
        self.reports.iter().filter(|r| !r.is_valid()).count()
    }
}

/// ワーカーを起動し、全員の報告を起動順に待って合算する。
///
/// ワーカーごとに容量1のチャネルを持たせ、報告は1回だけ受け取る。
/// panic したワーカーは送信側を落とすので、待ち続けずに無効扱いにする。
pub fn collect_reports(
    config: &MatchConfig,
    launcher: Arc<dyn EngineLauncher>,
) -> Result<MatchSummary> {
    let mut handles = Vec::with_capacity(config.workers as usize);
    let mut receivers = Vec::with_capacity(config.workers as usize);
    for worker_id in 0..config.workers {
        let (tx, rx) = chan::bounded::<WorkerReport>(1);
        let cfg = WorkerConfig {
            worker_id,
            games: config.games_per_worker,
            game: config.game.clone(),
        };
        let launcher = Arc::clone(&launcher);
        let handle = thread::Builder::new()
            .name(format!("worker-{worker_id}"))
            .spawn(move || run_worker(cfg, launcher.as_ref(), tx))
            .with_context(|| format!("failed to spawn worker {worker_id}"))?;
        handles.push(handle);
        receivers.push((worker_id, rx));
    }

    let mut tally = MatchTally::default();
    let mut reports = Vec::with_capacity(receivers.len());
    for (worker_id, rx) in receivers {
        let report = rx
            .recv()
            .unwrap_or_else(|_| WorkerReport::invalid(worker_id, "worker exited without reporting"));
        match &report.failure {
            None => tally.merge(&report.tally),
            Some(reason) => warn!(
                "worker {worker_id}: tally excluded after {} games ({reason})",
                report.games_completed
            ),
        }
        reports.push(report);
    }

    for handle in handles {
        if handle.join().is_err() {
            error!("a worker thread panicked");
        }
    }

    Ok(MatchSummary { tally, reports })
}

/// 並列対局を実行し、最終集計を表示する。無効な報告があればエラーを返す。
pub fn run_match(config: &MatchConfig, launcher: Arc<dyn EngineLauncher>) -> Result<MatchTally> {
    let start = Instant::now();
    info!(
        "match: {} workers x {} games, {}s + {}s",
        config.workers, config.games_per_worker, config.game.initial_time, config.game.increment
    );
    let summary = collect_reports(config, launcher)?;
    info!("match finished in {:.1}s", start.elapsed().as_secs_f64());

    println!("{}", summary.tally);

    let failed = summary.failed_workers();
    if failed > 0 {
        return Err(MatchError::WorkerFailed {
            failed,
            total: summary.reports.len(),
        }
        .into());
    }
    Ok(summary.tally)
}
