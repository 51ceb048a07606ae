//! TextMarker 辞書コンパイラのメインエントリーポイント
//!
//! 行指向のソースリストからバイナリ辞書を構築するサブコマンドと、
//! 構築済みの辞書を検査するサブコマンドを提供します。

mod build;
mod inspect;

use clap::Parser;
use thiserror::Error;

use crate::{build::BuildError, inspect::InspectError};

/// コマンドライン引数の構造体
#[derive(Parser, Debug)]
#[clap(name = "compile", version)]
struct Cli {
    /// 実行するサブコマンド
    #[clap(subcommand)]
    command: Command,
}

/// 利用可能なサブコマンド
#[derive(Parser, Debug)]
enum Command {
    /// ソースリストからバイナリ辞書を構築します
    ///
    /// 各リストは宣言順に1つのトライへまとめられます。
    Build(build::Args),

    /// バイナリ辞書のヘッダと統計を表示します
    Inspect(inspect::Args),
}

/// コンパイラの実行中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum CompileError {
    /// 辞書ビルド中のエラー
    #[error(transparent)]
    BuildError(#[from] BuildError),
    /// 辞書検査中のエラー
    #[error(transparent)]
    InspectError(#[from] InspectError),
}

/// メイン関数
///
/// ログ出力を初期化し、指定されたサブコマンドを実行します。
/// ログレベルは`RUST_LOG`で変更できます(既定は`warn`)。
fn main() -> Result<(), CompileError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Build(args) => Ok(build::run(args)?),
        Command::Inspect(args) => Ok(inspect::run(args)?),
    }
}
