//! 一致結果のコンテナ

use std::ops::Range;

use crate::dictionary::attribute::AttributeValue;
use crate::dictionary::lexicon::SourceList;
use crate::matcher::worker::{RawMatch, Worker};
use crate::utils::FromU32;

/// 辞書との一致
///
/// [`Worker`]への軽量な参照であり、Workerが生存している間のみ有効です。
pub struct DictMatch<'w> {
    worker: &'w Worker,
    index: usize,
}

impl<'w> DictMatch<'w> {
    #[inline(always)]
    pub(crate) const fn new(worker: &'w Worker, index: usize) -> Self {
        Self { worker, index }
    }

    #[inline(always)]
    fn raw(&self) -> &'w RawMatch {
        &self.worker.matches[self.index]
    }

    /// 一致のトークン単位の範囲
    #[inline(always)]
    pub fn range_token(&self) -> Range<usize> {
        let m = self.raw();
        m.start..m.end
    }

    /// 一致のバイト単位の範囲
    #[inline(always)]
    pub fn range_byte(&self) -> Range<usize> {
        let m = self.raw();
        self.worker.sent.byte_range(m.start, m.end)
    }

    /// 一致したテキスト
    ///
    /// トークン間の空白も含む、文書中の元の文字列です。
    #[inline(always)]
    pub fn surface(&self) -> &'w str {
        &self.worker.sent.raw()[self.range_byte()]
    }

    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        let m = self.raw();
        m.end - m.start
    }

    /// 一致したリストの宣言順のインデックス
    #[inline(always)]
    pub fn list_index(&self) -> usize {
        usize::from_u32(self.raw().list)
    }

    /// 一致したリスト
    #[inline(always)]
    pub fn list(&self) -> &'w SourceList {
        &self.worker.matcher.dict.lists()[self.list_index()]
    }

    /// 出力するアノテーションの型名
    #[inline(always)]
    pub fn type_name(&self) -> &'w str {
        &self.list().type_name
    }

    /// 列の宣言順の属性値
    pub fn attributes(&self) -> &'w [AttributeValue] {
        let m = self.raw();
        let markers = &self.worker.matcher.dict.trie().node(m.node).markers;
        markers
            .binary_search_by_key(&m.list, |marker| marker.list)
            .map_or(&[][..], |i| markers[i].attributes.as_slice())
    }
}

impl std::fmt::Debug for DictMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictMatch")
            .field("surface", &self.surface())
            .field("range_byte", &self.range_byte())
            .field("type_name", &self.type_name())
            .field("attributes", &self.attributes())
            .finish()
    }
}

/// 一致のイテレータ
pub struct DictMatchIter<'w> {
    worker: &'w Worker,
    i: usize,
}

impl<'w> DictMatchIter<'w> {
    #[inline(always)]
    pub(crate) const fn new(worker: &'w Worker) -> Self {
        Self { worker, i: 0 }
    }
}

impl<'w> Iterator for DictMatchIter<'w> {
    type Item = DictMatch<'w>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.i < self.worker.num_matches() {
            let m = DictMatch::new(self.worker, self.i);
            self.i += 1;
            Some(m)
        } else {
            None
        }
    }
}
