//! 複数リストの単語辞書モジュール。
//!
//! このモジュールは、トークン列をキーとする辞書トライの構築、照合、
//! バイナリ形式での読み書きを行います。主な機能として以下を提供します:
//!
//! - 複数のソースリストの1つのトライへの統合(マーカーはリストごとに独立)
//! - 大文字小文字を区別しない照合(構築時に決定され、辞書に記録されます)
//! - Zstandard圧縮とSHA-256による本体の検査を備えたバイナリ形式
//!
//! # バイナリ形式
//!
//! | オフセット | サイズ | 内容 |
//! |----|----|----|
//! | 0 | 14 | マジックバイト `TextMarkerMTWL` |
//! | 14 | 2 | フォーマットバージョン(u16、リトルエンディアン) |
//! | 16 | 1 | フラグ(ビット0: 本体がzstd圧縮されている) |
//! | 17 | 32 | 格納された本体のSHA-256 |
//! | 49 | 15 | `0xFF`によるパディング |
//! | 64 | .. | 本体(rkyvアーカイブ。圧縮フラグがあればzstdストリーム) |
//!
//! # 辞書の読み込み方法
//!
//! - [`Dictionary::from_path`]: ファイルパスから辞書を読み込む
//! - [`Dictionary::read`]: リーダーから辞書を読み込む
//! - [`Dictionary::load_all`]: 複数のファイルを読み込み、失敗したものを報告する
pub mod attribute;
pub mod builder;
pub mod config;
pub mod lexicon;
pub mod trie;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use rkyv::rancor::Error;
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dictionary::trie::{Marker, Trie};
use crate::errors::{Result, TextMarkerError};

pub use crate::dictionary::attribute::{AttributeValue, Column};
pub use crate::dictionary::builder::DictionaryBuilder;
pub use crate::dictionary::config::{DictionaryConfig, Encoding, LexiconFormat};
pub use crate::dictionary::lexicon::{BuildDiagnostic, Entry, SourceList};

/// バイナリ辞書を識別するマジックバイト。
pub const MODEL_MAGIC: &[u8] = b"TextMarkerMTWL";

/// バイナリ辞書のフォーマットバージョン。
///
/// クレートのセマンティックバージョンからは切り離されています。
pub const FORMAT_VERSION: u16 = 1;

/// 本体がzstd圧縮されていることを示すフラグ。
pub const FLAG_COMPRESSED: u8 = 0b1;

const MODEL_MAGIC_LEN: usize = MODEL_MAGIC.len();
const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = MODEL_MAGIC_LEN + 2 + 1 + DIGEST_LEN;
const RKYV_ALIGNMENT: usize = 16;
const DATA_START: usize = HEADER_LEN.div_ceil(RKYV_ALIGNMENT) * RKYV_ALIGNMENT;
const ZSTD_LEVEL: i32 = 19;

/// 展開後の本体の上限(1 GiB)。
pub const MAX_BODY_LEN: u64 = 1 << 30;

/// [`Dictionary`]の内部データ。
///
/// バイナリ辞書の本体としてシリアライズされます。
#[derive(Archive, Serialize, Deserialize)]
pub struct DictionaryInner {
    case_sensitive: bool,
    lists: Vec<SourceList>,
    trie: Trie,
}

/// バイナリ辞書のヘッダー
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub compressed: bool,
    pub digest: [u8; DIGEST_LEN],
}

impl Header {
    /// バイト列の先頭からヘッダーを解析します。
    ///
    /// マジックバイト、バージョン、フラグを検査します。本体の検査は行いません。
    ///
    /// # エラー
    ///
    /// ヘッダーが不正な場合に[`TextMarkerError::DictionaryFormat`]を返します。
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DATA_START {
            return Err(TextMarkerError::dictionary_format(
                "the dictionary is truncated",
                format!("{} bytes is shorter than the header", bytes.len()),
            ));
        }
        if &bytes[..MODEL_MAGIC_LEN] != MODEL_MAGIC {
            return Err(TextMarkerError::dictionary_format(
                "the magic number of the input dictionary mismatches",
                "",
            ));
        }
        let version = u16::from_le_bytes([bytes[MODEL_MAGIC_LEN], bytes[MODEL_MAGIC_LEN + 1]]);
        if version != FORMAT_VERSION {
            return Err(TextMarkerError::dictionary_format(
                "unsupported format version",
                format!("{version}"),
            ));
        }
        let flags = bytes[MODEL_MAGIC_LEN + 2];
        if flags & !FLAG_COMPRESSED != 0 {
            return Err(TextMarkerError::dictionary_format(
                "unknown header flags",
                format!("{flags:#04x}"),
            ));
        }
        let mut digest = [0; DIGEST_LEN];
        digest.copy_from_slice(&bytes[MODEL_MAGIC_LEN + 3..HEADER_LEN]);
        Ok(Self {
            version,
            compressed: flags & FLAG_COMPRESSED != 0,
            digest,
        })
    }

    /// 本体のダイジェストを16進数で返します。
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// トークン列を照合するための読み取り専用辞書。
pub struct Dictionary {
    inner: DictionaryInner,
    compress: bool,
}

/// [`Dictionary::load_all`]の結果
pub struct LoadReport {
    /// 読み込めた辞書(入力順)
    pub loaded: Vec<(PathBuf, Dictionary)>,
    /// 読み込めなかったパスとその原因
    pub failed: Vec<(PathBuf, TextMarkerError)>,
}

impl Dictionary {
    /// 内部データから辞書を作成します。
    ///
    /// 書き出し時は圧縮されます。
    pub fn from_inner(inner: DictionaryInner) -> Self {
        Self {
            inner,
            compress: true,
        }
    }

    /// 書き出し時に本体を圧縮するかどうかを設定します。
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// 書き出し時に本体を圧縮するかどうか
    ///
    /// 読み込んだ辞書では、読み込み元のヘッダーのフラグになります。
    pub fn compress(&self) -> bool {
        self.compress
    }

    /// 大文字小文字を区別して照合するかどうか
    #[inline(always)]
    pub fn case_sensitive(&self) -> bool {
        self.inner.case_sensitive
    }

    /// 宣言順のソースリスト
    #[inline(always)]
    pub fn lists(&self) -> &[SourceList] {
        &self.inner.lists
    }

    #[inline(always)]
    pub(crate) fn trie(&self) -> &Trie {
        &self.inner.trie
    }

    /// トライのノード数(根を含む)
    pub fn num_nodes(&self) -> usize {
        self.inner.trie.num_nodes()
    }

    /// 登録されたエントリ数
    ///
    /// 複数のリストに同じキーがある場合は、リストごとに数えます。
    pub fn num_entries(&self) -> usize {
        self.inner.trie.nodes().iter().map(|n| n.markers.len()).sum()
    }

    /// キーに完全一致するすべてのマーカーを返します。
    ///
    /// 大文字小文字を区別しない辞書では、トークンを小文字化して検索します。
    /// マーカーはリストの宣言順に並びます。
    pub fn lookup<I, S>(&self, tokens: I) -> &[Marker]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let node = if self.case_sensitive() {
            self.inner.trie.find(tokens)
        } else {
            self.inner
                .trie
                .find(tokens.into_iter().map(|t| t.as_ref().to_lowercase()))
        };
        node.map_or(&[][..], |idx| self.inner.trie.node(idx).markers.as_slice())
    }

    /// 辞書をバイナリ形式でライターに書き出します。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - 基礎となる`writer`への書き込みに失敗した場合。
    /// - `rkyv`シリアライゼーションまたはzstd圧縮でエラーが発生した場合。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        let archived = rkyv::to_bytes::<Error>(&self.inner)?;
        let body = if self.compress {
            zstd::encode_all(archived.as_slice(), ZSTD_LEVEL)?
        } else {
            archived.to_vec()
        };
        let flags = if self.compress { FLAG_COMPRESSED } else { 0 };

        wtr.write_all(MODEL_MAGIC)?;
        wtr.write_all(&FORMAT_VERSION.to_le_bytes())?;
        wtr.write_all(&[flags])?;
        wtr.write_all(&Sha256::digest(&body))?;
        wtr.write_all(&[0xFF; DATA_START - HEADER_LEN])?;
        wtr.write_all(&body)?;
        Ok(())
    }

    /// リーダーから辞書を読み込みます。
    ///
    /// # エラー
    ///
    /// 読み込みに失敗した場合、または内容が不正な場合にエラーを返します。
    pub fn read<R: Read>(mut rdr: R) -> Result<Self> {
        let mut buffer = Vec::new();
        rdr.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }

    /// メモリマッピングを使用してファイルパスから辞書を読み込みます。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - パスがディレクトリの場合。
    /// - ファイルを開けない場合。
    /// - ファイルが破損している、切り詰められている、または互換性がない場合。
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(TextMarkerError::PathIsDirectory(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len < DATA_START as u64 {
            return Err(TextMarkerError::dictionary_format(
                "the dictionary is truncated",
                format!("{len} bytes is shorter than the header"),
            ));
        }
        // SAFETY: the mapping is only read while the file is open and is copied before use.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap)
    }

    /// 複数の辞書ファイルを読み込みます。
    ///
    /// 読み込めないファイルは警告を記録して読み飛ばし、残りの読み込みを続けます。
    pub fn load_all<I, P>(paths: I) -> LoadReport
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut report = LoadReport {
            loaded: vec![],
            failed: vec![],
        };
        for path in paths {
            let path = path.as_ref().to_path_buf();
            match Self::from_path(&path) {
                Ok(dict) => report.loaded.push((path, dict)),
                Err(e) => {
                    log::warn!("Failed to load a dictionary {}: {e}", path.display());
                    report.failed.push((path, e));
                }
            }
        }
        report
    }

    /// バイナリ形式のバイト列から辞書を読み込みます。
    ///
    /// ヘッダー、本体のダイジェスト、rkyvアーカイブ、トライの構造をすべて検査します。
    ///
    /// # エラー
    ///
    /// 検査に失敗した場合に[`TextMarkerError::DictionaryFormat`]を返します。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;
        let stored = &bytes[DATA_START..];
        if Sha256::digest(stored).as_slice() != header.digest {
            return Err(TextMarkerError::dictionary_format(
                "checksum mismatch",
                "the body is truncated or corrupted",
            ));
        }

        let decoded;
        let body = if header.compressed {
            decoded = decode_body(stored, MAX_BODY_LEN)?;
            decoded.as_slice()
        } else {
            stored
        };

        let mut aligned_bytes = AlignedVec::<RKYV_ALIGNMENT>::with_capacity(body.len());
        aligned_bytes.extend_from_slice(body);

        let inner = rkyv::from_bytes::<DictionaryInner, Error>(&aligned_bytes).map_err(|e| {
            TextMarkerError::dictionary_format(
                "rkyv validation failed. The dictionary file may be corrupted or incompatible.",
                e.to_string(),
            )
        })?;

        let columns: Vec<&[Column]> = inner.lists.iter().map(|l| l.columns.as_slice()).collect();
        inner.trie.verify(&columns)?;

        Ok(Self {
            inner,
            compress: header.compressed,
        })
    }
}

/// zstdストリームを最大`limit`バイトまで展開します。
fn decode_body(stored: &[u8], limit: u64) -> Result<Vec<u8>> {
    let undecodable =
        |e: std::io::Error| TextMarkerError::dictionary_format("undecodable zstd stream", e.to_string());
    let mut decoded = vec![];
    zstd::stream::read::Decoder::new(stored)
        .map_err(undecodable)?
        .take(limit + 1)
        .read_to_end(&mut decoded)
        .map_err(undecodable)?;
    if decoded.len() as u64 > limit {
        return Err(TextMarkerError::dictionary_format(
            "the decompressed body is too large",
            format!("more than {limit} bytes"),
        ));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::type_system::PrimitiveKind;

    fn sample() -> Dictionary {
        let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
        builder
            .add_list(
                SourceList::new("a", "A"),
                &LexiconFormat::default(),
                "x y\n".as_bytes(),
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(64, DATA_START);
        let mut buf = vec![];
        sample().with_compression(false).write(&mut buf).unwrap();
        assert_eq!(b"TextMarkerMTWL", &buf[..14]);
        assert_eq!([1, 0], buf[14..16]);
        assert_eq!(0, buf[16]);
        assert!(buf[49..64].iter().all(|&b| b == 0xFF));

        let header = Header::parse(&buf).unwrap();
        assert!(!header.compressed);
        assert_eq!(64, header.digest_hex().len());
    }

    #[test]
    fn test_unknown_version() {
        let mut buf = vec![];
        sample().write(&mut buf).unwrap();
        buf[14] = 2;
        assert!(matches!(
            Dictionary::from_bytes(&buf),
            Err(TextMarkerError::DictionaryFormat(_))
        ));
    }

    #[test]
    fn test_decode_body_limit() {
        let stream = zstd::encode_all(&[0u8; 4096][..], 3).unwrap();
        assert_eq!(4096, decode_body(&stream, 4096).unwrap().len());
        assert!(matches!(
            decode_body(&stream, 4095),
            Err(TextMarkerError::DictionaryFormat(_))
        ));
    }

    #[test]
    fn test_attribute_kind_mismatch() {
        let mut trie = trie::TrieBuilder::new();
        trie.insert(
            ["Peter"],
            Marker {
                list: 0,
                attributes: vec![AttributeValue::Integer(6)],
            },
        );
        let forged = Dictionary {
            inner: DictionaryInner {
                case_sensitive: true,
                lists: vec![SourceList::new("a", "A").with_column("a", PrimitiveKind::String)],
                trie: trie.build().unwrap(),
            },
            compress: false,
        };
        let mut buf = vec![];
        forged.write(&mut buf).unwrap();
        assert!(matches!(
            Dictionary::from_bytes(&buf),
            Err(TextMarkerError::DictionaryFormat(_))
        ));
    }
}
