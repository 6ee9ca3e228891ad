//! エンジンのビルド（`cargo build --release`）。
//!
//! `RUSTFLAGS` は子プロセスの環境にだけ設定し、ハーネス自身の環境変数には触れない。

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use log::info;

use crate::error::MatchError;

/// ネイティブ CPU 向け最適化フラグ。
pub const NATIVE_RUSTFLAGS: &str = "-C target-cpu=native";

#[derive(Clone, Debug)]
pub struct BuildConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// ビルドを実行するディレクトリ（エンジンのクレート）
    pub working_dir: PathBuf,
    pub rustflags: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("cargo"),
            args: vec!["build".to_string(), "--release".to_string()],
            working_dir: PathBuf::from("."),
            rustflags: NATIVE_RUSTFLAGS.to_string(),
        }
    }
}

impl BuildConfig {
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .env("RUSTFLAGS", &self.rustflags);
        cmd
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// ビルドを実行し、終了コードが 0 以外なら [`MatchError::BuildFailed`] を返す。
pub fn build_engine(cfg: &BuildConfig) -> Result<()> {
    info!("NEW RUSTFLAGS: {:?}", cfg.rustflags);
    info!("building with {:?} in {}", cfg.describe(), cfg.working_dir.display());
    let status = cfg
        .command()
        .status()
        .with_context(|| format!("failed to run {}", cfg.program.display()))?;
    if !status.success() {
        return Err(MatchError::BuildFailed { status }.into());
    }
    info!("build finished ({status})");
    Ok(())
}
