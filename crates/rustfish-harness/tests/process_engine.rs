//! sh スクリプトの偽エンジンを実プロセスとして起動し、UCI のやり取りを通して確認する。
#![cfg(unix)]

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustfish_harness::MatchError;
use rustfish_harness::selfplay::{
    EngineConfig, EngineHandle, EngineProcess, GameConfig, GameOutcome, MatchConfig, MoveEvent,
    MoveRequest, ProcessLauncher, Score, TimeArgs, run_game, run_match,
};
use tempfile::NamedTempFile;

/// ナイトを往復させるだけのエンジン。平手から 16 ply で5回同一局面になる。
const SHUFFLE_ENGINE: &str = r#"
n=0
while read -r line; do
  case "$line" in
    uci)
      echo "id name shuffle"
      echo "option name Hash type spin default 16 min 1 max 1024"
      echo "option name Clear Hash type button"
      echo "uciok" ;;
    isready) echo "readyok" ;;
    position*)
      set -- $line
      n=$(($# - 3))
      [ "$n" -lt 0 ] && n=0 ;;
    go*)
      if [ $((n % 2)) -eq 0 ]; then
        if [ $(((n / 2) % 2)) -eq 0 ]; then mv=g1f3; else mv=f3g1; fi
      else
        if [ $((((n - 1) / 2) % 2)) -eq 0 ]; then mv=g8f6; else mv=f6g8; fi
      fi
      echo "info depth 1 score cp 0 nodes 1 pv $mv"
      echo "bestmove $mv" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// 白 f3, g4 / 黒 e5, Qh4# を指すエンジン。
const FOOLS_MATE_ENGINE: &str = r#"
n=0
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    position*)
      set -- $line
      n=$(($# - 3))
      [ "$n" -lt 0 ] && n=0 ;;
    go*)
      case "$n" in
        0) echo "info depth 3 score cp -20"; echo "bestmove f2f3" ;;
        1) echo "info depth 3 score cp 40"; echo "bestmove e7e5" ;;
        2) echo "info depth 3 score mate -1"; echo "bestmove g2g4" ;;
        *) echo "info depth 3 nodes 4096 score mate 1 pv d8h4"; echo "bestmove d8h4" ;;
      esac ;;
    quit) exit 0 ;;
  esac
done
"#;

/// 初期化には応じるが `go` には答えないエンジン。
const SILENT_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    quit) exit 0 ;;
  esac
done
"#;

/// 最初の `go` で落ちるエンジン。
const CRASHING_ENGINE: &str = r#"
while read -r line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    go*) exit 1 ;;
  esac
done
"#;

fn write_script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn sh_engine(script: &NamedTempFile) -> EngineConfig {
    EngineConfig {
        path: "sh".into(),
        args: vec![script.path().display().to_string()],
        uci_options: vec!["Hash=32".to_string(), "Clear Hash".to_string()],
    }
}

fn spawn(script: &NamedTempFile, label: &str) -> EngineProcess {
    EngineProcess::spawn(&sh_engine(script), label.to_string()).unwrap()
}

#[test]
fn engine_process_answers_a_move_request_with_eval() {
    let script = write_script(FOOLS_MATE_ENGINE);
    let mut engine = spawn(&script, "fools");
    let moves = vec!["f2f3".to_string(), "e7e5".to_string(), "g2g4".to_string()];
    let req = MoveRequest {
        start_fen: None,
        moves: &moves,
        time_args: TimeArgs {
            wtime: 60_000,
            btime: 60_000,
            winc: 0,
            binc: 0,
        },
        max_wait: Duration::from_secs(10),
        want_eval: true,
    };
    let reply = engine.request_move(&req).unwrap();
    assert_eq!(reply.bestmove, "d8h4");
    assert_eq!(reply.score, Some(Score::Mate(1)));
    assert_eq!(reply.depth, Some(3));
    assert_eq!(reply.nodes, Some(4096));

    engine.stop();
    assert!(engine.is_stopped());
    // 2回目の停止は何もしない
    engine.stop();
}

#[test]
fn unbounded_wait_still_returns_the_move() {
    let script = write_script(FOOLS_MATE_ENGINE);
    let mut engine = spawn(&script, "fools");
    let req = MoveRequest {
        start_fen: None,
        moves: &[],
        time_args: TimeArgs {
            wtime: u64::MAX,
            btime: u64::MAX,
            winc: 0,
            binc: 0,
        },
        max_wait: Duration::MAX,
        want_eval: true,
    };
    let reply = engine.request_move(&req).unwrap();
    assert_eq!(reply.bestmove, "f2f3");
}

#[test]
fn eval_is_skipped_when_not_requested() {
    let script = write_script(FOOLS_MATE_ENGINE);
    let mut engine = spawn(&script, "fools");
    let req = MoveRequest {
        start_fen: None,
        moves: &[],
        time_args: TimeArgs {
            wtime: 1_000,
            btime: 1_000,
            winc: 0,
            binc: 0,
        },
        max_wait: Duration::from_secs(10),
        want_eval: false,
    };
    let reply = engine.request_move(&req).unwrap();
    assert_eq!(reply.bestmove, "f2f3");
    assert_eq!(reply.score, None);
    assert_eq!(reply.nodes, None);
}

#[test]
fn real_processes_play_to_checkmate() {
    let script = write_script(FOOLS_MATE_ENGINE);
    let mut white = spawn(&script, "white");
    let mut black = spawn(&script, "black");
    let mut plies = Vec::new();
    let mut nodes = Vec::new();
    let mut on_move = |ev: &MoveEvent<'_>| {
        plies.push((ev.ply, ev.move_uci.to_string(), ev.score));
        nodes.push(ev.nodes);
    };
    let record =
        run_game(&mut white, &mut black, &GameConfig::default(), 1, &mut on_move).unwrap();
    assert_eq!(record.outcome(), GameOutcome::BlackWin);
    assert_eq!(record.moves(), ["f2f3", "e7e5", "g2g4", "d8h4"]);
    assert_eq!(plies.len(), 4);
    assert_eq!(plies[3], (4, "d8h4".to_string(), Some(Score::Mate(1))));
    assert_eq!(nodes, [None, None, None, Some(4096)]);
    assert!(white.is_stopped());
    assert!(black.is_stopped());
}

#[test]
fn real_processes_draw_by_repetition() {
    let script = write_script(SHUFFLE_ENGINE);
    let mut white = spawn(&script, "white");
    let mut black = spawn(&script, "black");
    let record =
        run_game(&mut white, &mut black, &GameConfig::default(), 1, &mut |_| {}).unwrap();
    assert_eq!(record.outcome(), GameOutcome::Draw);
    assert_eq!(record.plies(), 16);
    assert!(!record.is_adjudicated());
}

#[test]
fn silent_engine_is_declared_unresponsive() {
    let silent = write_script(SILENT_ENGINE);
    let shuffle = write_script(SHUFFLE_ENGINE);
    let mut white = spawn(&silent, "silent");
    let mut black = spawn(&shuffle, "shuffle");
    let config = GameConfig {
        initial_time: 0.2,
        move_timeout_margin: Duration::from_millis(100),
        ..GameConfig::default()
    };
    let start = Instant::now();
    let err = run_game(&mut white, &mut black, &config, 1, &mut |_| {}).unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(5));
    match err.downcast_ref::<MatchError>() {
        Some(MatchError::EngineUnresponsive { engine, .. }) => assert_eq!(engine, "silent"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(white.is_stopped());
    assert!(black.is_stopped());
}

#[test]
fn crashed_engine_is_reported_as_exited() {
    let crashing = write_script(CRASHING_ENGINE);
    let shuffle = write_script(SHUFFLE_ENGINE);
    let mut white = spawn(&crashing, "crashing");
    let mut black = spawn(&shuffle, "shuffle");
    let err =
        run_game(&mut white, &mut black, &GameConfig::default(), 1, &mut |_| {}).unwrap_err();
    match err.downcast_ref::<MatchError>() {
        Some(MatchError::EngineExited { engine }) => assert_eq!(engine, "crashing"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(black.is_stopped());
}

#[test]
fn parallel_match_with_process_engines() {
    let script = write_script(SHUFFLE_ENGINE);
    let launcher = Arc::new(ProcessLauncher {
        candidate: sh_engine(&script),
        baseline: sh_engine(&script),
    });
    let config = MatchConfig {
        workers: 2,
        games_per_worker: 2,
        game: GameConfig::default(),
    };
    let tally = run_match(&config, launcher).unwrap();
    assert_eq!(tally.total(), 4.0);
    assert_eq!(tally.candidate, 2.0);
    assert_eq!(tally.baseline, 2.0);
}
