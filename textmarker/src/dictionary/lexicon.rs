//! ソースリストの読み込み
//!
//! ソースリストは、対象の型名と属性列の宣言を持つ行指向のテキストファイルです。
//! 行の書式は[`LexiconFormat`]で指定します。

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::attribute::{AttributeValue, Column};
use crate::dictionary::config::{Encoding, LexiconFormat};
use crate::errors::{Result, TextMarkerError};
use crate::sentence::tokenize;
use crate::type_system::PrimitiveKind;
use crate::utils::parse_delimited_row;

/// ソースリストの宣言
///
/// リストに含まれるすべてのエントリは、一致すると`type_name`型の
/// アノテーションになり、`columns`の各素性に属性値が設定されます。
#[derive(Clone, Debug, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct SourceList {
    pub name: String,
    pub type_name: String,
    pub columns: Vec<Column>,
}

impl SourceList {
    pub fn new<N, T>(name: N, type_name: T) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            columns: vec![],
        }
    }

    /// 属性列を追加します。
    pub fn with_column<S>(mut self, name: S, kind: PrimitiveKind) -> Self
    where
        S: Into<String>,
    {
        self.columns.push(Column::new(name, kind));
        self
    }
}

/// 解析済みのエントリ
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub tokens: Vec<String>,
    pub attributes: Vec<AttributeValue>,
}

/// ビルド中に検出された致命的でない問題
///
/// 問題のあったエントリは辞書から除外され、ビルドは続行されます。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildDiagnostic {
    /// ソースリストの名前
    pub source: String,
    /// 1始まりの行番号
    pub line: usize,
    pub message: String,
}

impl fmt::Display for BuildDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.message)
    }
}

/// ソースファイルのバイト列を文字列に復号します。
///
/// UTF-8の場合は先頭のBOMを取り除きます。
pub(crate) fn decode(bytes: &[u8], encoding: Encoding, name: &str) -> Result<String> {
    match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            let text = std::str::from_utf8(bytes).map_err(|e| {
                TextMarkerError::invalid_format(name, format!("not valid {encoding}: {e}"))
            })?;
            Ok(text.to_string())
        }
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// ソースリストの本文をエントリに分解します。
///
/// # 引数
///
/// * `text` - 復号済みの本文
/// * `list` - リストの宣言
/// * `format` - 行の書式
/// * `diagnostics` - 除外したエントリの記録先
///
/// # 戻り値
///
/// ファイル中の順序のエントリ
pub(crate) fn parse_entries(
    text: &str,
    list: &SourceList,
    format: &LexiconFormat,
    diagnostics: &mut Vec<BuildDiagnostic>,
) -> Vec<Entry> {
    let mut entries = vec![];
    let mut report = |line: usize, message: String| {
        let diagnostic = BuildDiagnostic {
            source: list.name.clone(),
            line,
            message,
        };
        log::warn!("Skipped an entry, {diagnostic}");
        diagnostics.push(diagnostic);
    };

    for (i, row) in text.lines().enumerate() {
        let line = i + 1;
        let row = row.strip_suffix('\r').unwrap_or(row);
        if row.trim().is_empty() || row.starts_with("//") {
            continue;
        }
        let fields = parse_delimited_row(row, format.delimiter);
        let expected = format.key_fields + list.columns.len();
        if fields.len() != expected {
            report(
                line,
                format!("expected {expected} fields, found {}", fields.len()),
            );
            continue;
        }

        let (key, literals) = fields.split_at(format.key_fields);
        let key = key.join(" ");
        let tokens: Vec<String> = tokenize(&key).into_iter().map(str::to_string).collect();
        if tokens.is_empty() {
            report(line, "the key has no tokens".to_string());
            continue;
        }

        let mut attributes = Vec::with_capacity(list.columns.len());
        for (literal, column) in literals.iter().zip(&list.columns) {
            match AttributeValue::parse(literal, column.kind) {
                Some(value) => attributes.push(value),
                None => break,
            }
        }
        if attributes.len() != list.columns.len() {
            let column = &list.columns[attributes.len()];
            report(
                line,
                format!(
                    "{:?} is not a valid {} for column {}",
                    literals[attributes.len()],
                    column.kind.name(),
                    column.name
                ),
            );
            continue;
        }

        entries.push(Entry { tokens, attributes });
    }
    entries
}
