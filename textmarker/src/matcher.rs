//! 辞書による最長一致の照合器。
//!
//! このモジュールは、トークン化した文書を辞書トライで走査し、一致した範囲を
//! アノテーションとして出力するための照合器を提供します。
//!
//! # 主要な構造体
//!
//! - [`Matcher`]: 共有される辞書と照合オプションを保持する構造体
//! - [`Worker`]: 照合器のワーカー。実際の走査処理を行う
//!
//! # 例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use textmarker::dictionary::{DictionaryBuilder, DictionaryConfig, LexiconFormat, SourceList};
//! use textmarker::Matcher;
//!
//! let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
//! builder.add_list(
//!     SourceList::new("names.txt", "Name"),
//!     &LexiconFormat::default(),
//!     "Peter\nPeter Kluegl\n".as_bytes(),
//! )?;
//! let matcher = Matcher::new(builder.build()?);
//! let mut worker = matcher.new_worker();
//!
//! worker.reset_document("Peter Kluegl: Ruta");
//! worker.scan();
//! assert_eq!(1, worker.num_matches());
//! assert_eq!("Peter Kluegl", worker.dict_match(0).surface());
//! # Ok(())
//! # }
//! ```
mod dict_match;
pub mod worker;

use std::sync::Arc;

use crate::dictionary::Dictionary;
use crate::matcher::worker::Worker;

pub use crate::matcher::dict_match::{DictMatch, DictMatchIter};

/// 同じ開始位置で複数のリストが一致した場合の扱い
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchScope {
    /// リストごとに独立した最長一致を出力します。
    ///
    /// 各リストは1回の走査を共有する独立した辞書として振る舞います。
    #[default]
    PerList,
    /// 開始位置ごとに1つだけ出力します。
    ///
    /// 最もトークン数の多い一致が選ばれ、同じ長さの場合は先に宣言されたリストが優先されます。
    Merged,
}

/// 辞書による照合器
#[derive(Clone)]
pub struct Matcher {
    dict: Arc<Dictionary>,
    allow_overlap: bool,
    scope: MatchScope,
}

impl Matcher {
    /// 辞書から新しい照合器を作成します。
    pub fn new(dict: Dictionary) -> Self {
        Self::from_shared_dictionary(Arc::new(dict))
    }

    /// 共有された辞書から新しい照合器を作成します。
    ///
    /// 同じ辞書を複数の照合器やスレッドで共有する場合に使用します。
    pub fn from_shared_dictionary(dict: Arc<Dictionary>) -> Self {
        Self {
            dict,
            allow_overlap: false,
            scope: MatchScope::default(),
        }
    }

    /// 一致範囲の重なりを許すかどうかを設定します。
    ///
    /// `false`(デフォルト)の場合、一致の終わりから走査を再開します。
    /// [`MatchScope::PerList`]ではリストごとに判定します。
    pub fn allow_overlap(mut self, yes: bool) -> Self {
        self.allow_overlap = yes;
        self
    }

    /// 同じ開始位置の一致の扱いを設定します。
    pub fn scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    #[inline(always)]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// 新しいワーカーを作成します。
    ///
    /// ワーカーは走査用の作業領域を所有するため、スレッドごとに1つ作成してください。
    pub fn new_worker(&self) -> Worker {
        Worker::new(self.clone())
    }
}
