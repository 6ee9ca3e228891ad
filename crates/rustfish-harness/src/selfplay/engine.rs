use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use log::debug;

use super::types::{InfoSnapshot, MoveReply, MoveRequest};
use crate::error::MatchError;

pub const ENGINE_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// 対局ループから見たエンジン1本分の窓口。
///
/// 実体は UCI プロセス（[`EngineProcess`]）だが、テストではプロセスを持たない実装に差し替える。
pub trait EngineHandle {
    fn label(&self) -> &str;

    /// 局面と時計を渡して1手を要求する。応答があるまでブロックする。
    fn request_move(&mut self, req: &MoveRequest<'_>) -> Result<MoveReply>;

    /// エンジンを終了させる。停止済みなら何もしない。
    fn stop(&mut self);

    fn is_stopped(&self) -> bool;
}

/// エンジンプロセス起動時の設定。
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// 追加のUCIオプション (Name=Value 形式)
    pub uci_options: Vec<String>,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            uci_options: Vec::new(),
        }
    }
}

/// 1本のエンジンに対する入出力をカプセル化する。
pub struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    opt_names: HashSet<String>,
    stopped: bool,
    pub label: String,
}

impl EngineProcess {
    pub fn spawn(cfg: &EngineConfig, label: String) -> Result<Self> {
        let mut cmd = Command::new(&cfg.path);
        if !cfg.args.is_empty() {
            cmd.args(&cfg.args);
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn engine at {}", cfg.path.display()))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut proc = Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            opt_names: HashSet::new(),
            stopped: false,
            label,
        };
        debug!("{}: spawned {} (pid {})", proc.label, cfg.path.display(), proc.child.id());
        // 初期化に失敗した場合も Drop で quit / kill される
        proc.initialize(cfg)?;
        Ok(proc)
    }

    fn initialize(&mut self, cfg: &EngineConfig) -> Result<()> {
        self.write_line("uci")?;
        loop {
            let line = self.recv_line(ENGINE_READY_TIMEOUT)?;
            if let Some(rest) = line.strip_prefix("option ") {
                if let Some(name) = parse_option_name(rest) {
                    self.opt_names.insert(name);
                }
            } else if line == "uciok" {
                break;
            }
        }
        for opt in &cfg.uci_options {
            if let Some((name, value)) = opt.split_once('=') {
                self.set_option_if_available(name.trim(), value.trim())?;
            } else {
                // "=" がない場合は button 型とみなし、値なしで送る
                self.write_line(&format!("setoption name {}", opt.trim()))?;
            }
        }
        self.sync_ready()?;
        self.write_line("ucinewgame")?;
        self.sync_ready()
    }

    pub fn sync_ready(&mut self) -> Result<()> {
        self.write_line("isready")?;
        loop {
            let line = self.recv_line(ENGINE_READY_TIMEOUT)?;
            if line == "readyok" {
                break;
            }
        }
        Ok(())
    }

    pub fn recv_line(&self, timeout: Duration) -> Result<String> {
        match self.rx.recv_timeout(timeout) {
            Ok(line) => Ok(line),
            Err(RecvTimeoutError::Timeout) => Err(MatchError::EngineUnresponsive {
                engine: self.label.clone(),
                waited: timeout,
            }
            .into()),
            Err(RecvTimeoutError::Disconnected) => Err(MatchError::EngineExited {
                engine: self.label.clone(),
            }
            .into()),
        }
    }

    pub fn set_option_if_available(&mut self, name: &str, value: &str) -> Result<()> {
        if self.opt_names.is_empty() || self.opt_names.contains(name) {
            self.write_line(&format!("setoption name {} value {}", name, value))?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, msg: &str) -> Result<()> {
        self.stdin.write_all(msg.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl EngineHandle for EngineProcess {
    fn label(&self) -> &str {
        &self.label
    }

    fn request_move(&mut self, req: &MoveRequest<'_>) -> Result<MoveReply> {
        let mut position_cmd = match req.start_fen {
            Some(fen) => format!("position fen {fen}"),
            None => "position startpos".to_string(),
        };
        if !req.moves.is_empty() {
            position_cmd.push_str(" moves ");
            position_cmd.push_str(&req.moves.join(" "));
        }
        self.write_line(&position_cmd)?;
        let t = &req.time_args;
        self.write_line(&format!(
            "go wtime {} btime {} winc {} binc {}",
            t.wtime, t.btime, t.winc, t.binc
        ))?;

        // 表せないほど先の期限は無期限として扱う
        let deadline = Instant::now().checked_add(req.max_wait);
        let mut snapshot = InfoSnapshot::default();
        loop {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => req.max_wait,
            };
            if remaining.is_zero() {
                return Err(MatchError::EngineUnresponsive {
                    engine: self.label.clone(),
                    waited: req.max_wait,
                }
                .into());
            }
            let line = self.recv_line(remaining)?;
            if line.starts_with("info") {
                if req.want_eval {
                    snapshot.update_from_line(&line);
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("bestmove") {
                let bestmove = rest.split_whitespace().next().unwrap_or_default().to_string();
                return Ok(MoveReply {
                    bestmove,
                    score: snapshot.score,
                    depth: snapshot.depth,
                    nodes: snapshot.nodes,
                });
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = self.write_line("quit");
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                debug!("{}: exited", self.label);
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        debug!("{}: did not quit in time, killing", self.label);
        let _ = self.child.kill();
        let _ = self.child.wait();
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn parse_option_name(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        if tok == "name" {
            let mut parts = Vec::new();
            while let Some(next) = tokens.next_if(|t| *t != "type") {
                parts.push(next.to_string());
            }
            if !parts.is_empty() {
                return Some(parts.join(" "));
            }
        }
    }
    None
}
