//! 辞書のビルド設定とソースファイルの書式
//!
//! このモジュールは、トライの構築オプションと、行指向のソースリストを
//! 読み込むための書式を定義します。

use std::fmt;
use std::str::FromStr;

/// トライの構築オプション
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DictionaryConfig {
    /// `false`の場合、トークンを小文字化して格納・照合します。
    ///
    /// この設定はバイナリ辞書に記録され、読み込んだ辞書は常に
    /// 構築時と同じ方法で照合されます。
    pub case_sensitive: bool,

    /// 書き出すバイナリ辞書の本体をzstdで圧縮するかどうか
    pub compress: bool,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            compress: true,
        }
    }
}

/// ソースファイルの文字エンコーディング
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1。各バイトがそのままコードポイントになります。
    Latin1,
}

impl Encoding {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = &'static str;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            _ => Err("Could not parse an encoding"),
        }
    }
}

/// 行指向のソースリストの書式
///
/// 1行が1エントリです。フィールドは`delimiter`で区切られ、先頭の`key_fields`個の
/// フィールドがキーとしてトークン化され、残りのフィールドが列の宣言順に
/// 属性値として解釈されます。空行と`//`で始まる行は無視されます。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LexiconFormat {
    pub delimiter: u8,
    pub key_fields: usize,
    pub encoding: Encoding,
}

impl Default for LexiconFormat {
    fn default() -> Self {
        Self {
            delimiter: b';',
            key_fields: 1,
            encoding: Encoding::Utf8,
        }
    }
}
