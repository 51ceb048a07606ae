//! バイナリ辞書のビルドモジュール
//!
//! 行指向のソースリスト群から、複数リストを1つのトライにまとめたバイナリ辞書(MTWL)を
//! 構築します。読み込めなかったリストはログに記録され、残りのリストで辞書が書き出されます。

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use textmarker::dictionary::{
    DictionaryBuilder, DictionaryConfig, Encoding, LexiconFormat, SourceList,
};
use textmarker::errors::TextMarkerError;
use textmarker::type_system::PrimitiveKind;

/// ビルドコマンドの引数
#[derive(Parser, Debug)]
#[clap(
    name = "build",
    about = "A program to build a multi-list binary dictionary."
)]
pub struct Args {
    /// Source lists in the form `PATH=TYPE` or `PATH=TYPE(col:Kind,...)`.
    ///
    /// Lists are matched in the order given here.
    #[clap(required = true)]
    lists: Vec<ListSpec>,

    /// File to which the binary dictionary is output.
    #[clap(short = 'o', long)]
    output: PathBuf,

    /// Field delimiter of the source lists.
    #[clap(short = 'd', long, default_value = ";")]
    delimiter: char,

    /// Number of leading fields that form the key.
    #[clap(short = 'k', long, default_value_t = 1)]
    key_fields: usize,

    /// Encoding of the source lists (UTF-8 or ISO-8859-1).
    #[clap(short = 'e', long, default_value = "UTF-8")]
    encoding: Encoding,

    /// Matches keys without regard to case.
    #[clap(long)]
    ignore_case: bool,

    /// Writes the body without zstd compression.
    #[clap(long)]
    no_compress: bool,
}

/// ビルド処理中に発生する可能性のあるエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// 区切り文字がASCII文字ではない
    #[error("The delimiter must be a single ASCII character: {0:?}")]
    InvalidDelimiter(char),

    /// どのリストも読み込めなかった
    #[error("None of the {0} source lists could be read")]
    NoListLoaded(usize),

    /// 入出力エラー
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 辞書構築エラー
    #[error("Dictionary building failed: {0}")]
    TextMarker(#[from] TextMarkerError),
}

/// コマンドラインで指定された1つのソースリスト
#[derive(Clone, Debug)]
pub struct ListSpec {
    path: PathBuf,
    type_name: String,
    columns: Vec<(String, PrimitiveKind)>,
}

impl ListSpec {
    fn to_source_list(&self) -> SourceList {
        let name = self
            .path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.columns
            .iter()
            .fold(SourceList::new(name, self.type_name.as_str()), |list, (col, kind)| {
                list.with_column(col.as_str(), *kind)
            })
    }
}

impl FromStr for ListSpec {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (path, target) = spec
            .rsplit_once('=')
            .ok_or_else(|| format!("expected PATH=TYPE, got {spec:?}"))?;
        if path.is_empty() {
            return Err(format!("missing path in {spec:?}"));
        }
        let (type_name, columns) = match target.split_once('(') {
            None => (target, vec![]),
            Some((type_name, rest)) => {
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| format!("unclosed column list in {spec:?}"))?;
                let columns = inner
                    .split(',')
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| -> Result<(String, PrimitiveKind), String> {
                        let (name, kind) = c
                            .split_once(':')
                            .ok_or_else(|| format!("expected NAME:KIND, got {c:?}"))?;
                        let kind = PrimitiveKind::from_name(kind.trim())
                            .ok_or_else(|| format!("unknown column kind {kind:?}"))?;
                        Ok((name.trim().to_string(), kind))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (type_name, columns)
            }
        };
        let type_name = type_name.trim();
        if type_name.is_empty() {
            return Err(format!("missing type name in {spec:?}"));
        }
        Ok(Self {
            path: PathBuf::from(path),
            type_name: type_name.to_string(),
            columns,
        })
    }
}

/// ビルドコマンドを実行する
///
/// # 引数
///
/// * `args` - ビルドコマンドの引数
///
/// # エラー
///
/// どのリストも読み込めなかった場合、または辞書の構築や書き出しに失敗した場合、
/// `BuildError`を返します。個々のリストの読み込み失敗はログに記録され、
/// エラーにはなりません。
pub fn run(args: Args) -> Result<(), BuildError> {
    if !args.delimiter.is_ascii() {
        return Err(BuildError::InvalidDelimiter(args.delimiter));
    }
    let format = LexiconFormat {
        delimiter: args.delimiter as u8,
        key_fields: args.key_fields,
        encoding: args.encoding,
    };
    let config = DictionaryConfig {
        case_sensitive: !args.ignore_case,
        compress: !args.no_compress,
    };

    println!("Compiling {} source lists...", args.lists.len());
    let mut builder = DictionaryBuilder::new(config);
    for spec in &args.lists {
        if let Err(e) = builder.add_list_from_path(spec.to_source_list(), &format, &spec.path) {
            log::error!("Failed to read {}: {e}", spec.path.display());
        }
    }
    if builder.lists().is_empty() {
        return Err(BuildError::NoListLoaded(args.lists.len()));
    }
    let num_diagnostics = builder.diagnostics().len();
    if num_diagnostics != 0 {
        log::warn!("{num_diagnostics} entries were skipped");
    }

    let dict = builder.build()?;
    println!(
        "Writing {} entries of {} lists...",
        dict.num_entries(),
        dict.lists().len()
    );
    if let Some(parent) = args.output.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = BufWriter::new(File::create(&args.output)?);
    dict.write(&mut wtr)?;
    wtr.flush()?;

    println!("Successfully built the dictionary to {}", args.output.display());
    Ok(())
}
