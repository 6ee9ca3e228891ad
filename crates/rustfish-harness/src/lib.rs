//! rustfish の自己対局回帰テスト用ハーネス。
//!
//! 新しくビルドしたエンジンと旧ビルドを並列に対局させ、勝敗を集計する。

pub mod builder;
pub mod error;
pub mod selfplay;

pub use error::MatchError;
