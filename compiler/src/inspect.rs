//! バイナリ辞書の検査モジュール
//!
//! ヘッダと、リストごとの統計を表示します。

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use textmarker::dictionary::{Dictionary, Header};
use textmarker::errors::TextMarkerError;

/// 検査コマンドの引数
#[derive(Parser, Debug)]
#[clap(name = "inspect", about = "A program to print a summary of a binary dictionary.")]
pub struct Args {
    /// Binary dictionary file.
    #[clap(short = 'i', long)]
    input: PathBuf,
}

/// 検査中に発生する可能性のあるエラー
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 辞書の読み込みエラー
    #[error("Dictionary loading failed: {0}")]
    TextMarker(#[from] TextMarkerError),
}

pub fn run(args: Args) -> Result<(), InspectError> {
    let bytes = fs::read(&args.input)?;
    let header = Header::parse(&bytes)?;
    println!("file:           {}", args.input.display());
    println!("version:        {}", header.version);
    println!("compressed:     {}", header.compressed);
    println!("sha256:         {}", header.digest_hex());

    let dict = Dictionary::from_bytes(&bytes)?;
    println!("case sensitive: {}", dict.case_sensitive());
    println!("nodes:          {}", dict.num_nodes());
    println!("entries:        {}", dict.num_entries());
    println!("lists:");
    for (i, list) in dict.lists().iter().enumerate() {
        let columns: Vec<String> = list
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.kind.name()))
            .collect();
        println!(
            "  [{i}] {} -> {}({})",
            list.name,
            list.type_name,
            columns.join(",")
        );
    }
    Ok(())
}
