//! 辞書構築のためのビルダー
//!
//! このモジュールは、1つ以上のソースリストから [`Dictionary`] を構築するための
//! ビルダーを提供します。すべてのリストは1つのトライに統合されますが、終端マーカーは
//! リストごとに保持されます。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dictionary::config::{DictionaryConfig, LexiconFormat};
use crate::dictionary::lexicon::{self, BuildDiagnostic, Entry, SourceList};
use crate::dictionary::trie::{Marker, TrieBuilder};
use crate::dictionary::{Dictionary, DictionaryInner};
use crate::errors::{Result, TextMarkerError};

/// ソースリストから [`Dictionary`] を構築するビルダー
///
/// # 例
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use textmarker::dictionary::{DictionaryBuilder, DictionaryConfig, LexiconFormat, SourceList};
///
/// let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
/// builder.add_list(
///     SourceList::new("names.txt", "Name"),
///     &LexiconFormat::default(),
///     "Peter Kluegl\nMarshall Schor\n".as_bytes(),
/// )?;
/// let dict = builder.build()?;
///
/// assert_eq!(2, dict.num_entries());
/// assert_eq!(1, dict.lookup(["Marshall", "Schor"]).len());
/// # Ok(())
/// # }
/// ```
pub struct DictionaryBuilder {
    config: DictionaryConfig,
    lists: Vec<SourceList>,
    trie: TrieBuilder,
    diagnostics: Vec<BuildDiagnostic>,
}

impl DictionaryBuilder {
    pub fn new(config: DictionaryConfig) -> Self {
        Self {
            config,
            lists: vec![],
            trie: TrieBuilder::new(),
            diagnostics: vec![],
        }
    }

    /// リーダーからソースリストを読み込み、辞書に追加します。
    ///
    /// 属性値が列の型に合わない行は診断として記録され、そのエントリのみが除外されます。
    ///
    /// # 引数
    ///
    /// * `list` - リストの宣言
    /// * `format` - 行の書式
    /// * `rdr` - ソースファイルのリーダー
    ///
    /// # エラー
    ///
    /// 読み込みまたは復号に失敗した場合にエラーを返します。その場合リストは追加されません。
    pub fn add_list<R>(&mut self, list: SourceList, format: &LexiconFormat, mut rdr: R) -> Result<()>
    where
        R: Read,
    {
        if format.key_fields == 0 {
            return Err(TextMarkerError::invalid_argument(
                "format",
                "key_fields must be at least 1",
            ));
        }
        let mut buf = vec![];
        rdr.read_to_end(&mut buf)?;
        let text = lexicon::decode(&buf, format.encoding, &list.name)?;
        let entries = lexicon::parse_entries(&text, &list, format, &mut self.diagnostics);
        self.insert_list(list, entries)
    }

    /// ファイルからソースリストを読み込み、辞書に追加します。
    ///
    /// # エラー
    ///
    /// パスがディレクトリの場合、またはファイルを読めない場合にエラーを返します。
    pub fn add_list_from_path<P>(
        &mut self,
        list: SourceList,
        format: &LexiconFormat,
        path: P,
    ) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if path.is_dir() {
            return Err(TextMarkerError::PathIsDirectory(path.to_path_buf()));
        }
        let file = File::open(path)?;
        self.add_list(list, format, file)
    }

    /// 解析済みのエントリからなるリストを辞書に追加します。
    ///
    /// 列の宣言に合わないエントリは診断として記録されます。行番号はエントリの
    /// 1始まりの位置です。
    pub fn add_entries<I>(&mut self, list: SourceList, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut valid = vec![];
        for (i, entry) in entries.into_iter().enumerate() {
            let matches_columns = entry.attributes.len() == list.columns.len()
                && entry
                    .attributes
                    .iter()
                    .zip(&list.columns)
                    .all(|(value, column)| value.kind() == column.kind);
            if entry.tokens.is_empty() || !matches_columns {
                let diagnostic = BuildDiagnostic {
                    source: list.name.clone(),
                    line: i + 1,
                    message: "the entry does not match the declared columns".to_string(),
                };
                log::warn!("Skipped an entry, {diagnostic}");
                self.diagnostics.push(diagnostic);
                continue;
            }
            valid.push(entry);
        }
        self.insert_list(list, valid)
    }

    /// これまでに記録された診断
    pub fn diagnostics(&self) -> &[BuildDiagnostic] {
        &self.diagnostics
    }

    /// 追加済みのリスト
    pub fn lists(&self) -> &[SourceList] {
        &self.lists
    }

    fn insert_list(&mut self, list: SourceList, entries: Vec<Entry>) -> Result<()> {
        if list.type_name.is_empty() {
            return Err(TextMarkerError::invalid_argument(
                "list",
                format!("{} has no target type", list.name),
            ));
        }
        let list_idx = u32::try_from(self.lists.len())?;
        for entry in entries {
            let tokens: Vec<String> = if self.config.case_sensitive {
                entry.tokens
            } else {
                entry.tokens.iter().map(|t| t.to_lowercase()).collect()
            };
            let key = tokens.join(" ");
            let marker = Marker {
                list: list_idx,
                attributes: entry.attributes,
            };
            if self.trie.insert(tokens, marker) {
                log::debug!("{}: a later entry replaced {key:?}", list.name);
            }
        }
        self.lists.push(list);
        Ok(())
    }

    /// 辞書を確定します。
    pub fn build(self) -> Result<Dictionary> {
        let trie = self.trie.build()?;
        log::debug!(
            "Built a dictionary of {} lists and {} nodes",
            self.lists.len(),
            trie.num_nodes()
        );
        let inner = DictionaryInner {
            case_sensitive: self.config.case_sensitive,
            lists: self.lists,
            trie,
        };
        Ok(Dictionary::from_inner(inner).with_compression(self.config.compress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::attribute::AttributeValue;
    use crate::type_system::PrimitiveKind;

    #[test]
    fn test_replace_within_list() {
        let list = SourceList::new("a.txt", "A").with_column("v", PrimitiveKind::Integer);
        let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
        builder
            .add_list(list, &LexiconFormat::default(), "x y;1\nx y;2\n".as_bytes())
            .unwrap();
        let dict = builder.build().unwrap();
        let markers = dict.lookup(["x", "y"]);
        assert_eq!(1, markers.len());
        assert_eq!(vec![AttributeValue::Integer(2)], markers[0].attributes);
    }

    #[test]
    fn test_add_entries_mismatch() {
        let list = SourceList::new("a", "A").with_column("v", PrimitiveKind::Boolean);
        let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
        builder
            .add_entries(
                list,
                [
                    Entry {
                        tokens: vec!["x".to_string()],
                        attributes: vec![AttributeValue::Integer(1)],
                    },
                    Entry {
                        tokens: vec!["y".to_string()],
                        attributes: vec![AttributeValue::Boolean(true)],
                    },
                ],
            )
            .unwrap();
        assert_eq!(1, builder.diagnostics().len());
        assert_eq!(1, builder.diagnostics()[0].line);
        let dict = builder.build().unwrap();
        assert_eq!(1, dict.num_entries());
    }

    #[test]
    fn test_unreadable_list_is_not_added() {
        let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
        let result = builder.add_list(
            SourceList::new("bad", "A"),
            &LexiconFormat::default(),
            &b"\xFF\xFE"[..],
        );
        assert!(result.is_err());
        assert!(builder.lists().is_empty());
    }

    #[test]
    fn test_fold_case() {
        let config = DictionaryConfig {
            case_sensitive: false,
            ..DictionaryConfig::default()
        };
        let mut builder = DictionaryBuilder::new(config);
        builder
            .add_list(
                SourceList::new("a", "A"),
                &LexiconFormat::default(),
                "CAS Editor".as_bytes(),
            )
            .unwrap();
        let dict = builder.build().unwrap();
        assert!(!dict.case_sensitive());
        assert_eq!(1, dict.lookup(["cas", "EDITOR"]).len());
    }
}
