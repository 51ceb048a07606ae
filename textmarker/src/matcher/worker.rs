//! 照合処理のためのルーチンを提供するモジュール。
//!
//! ワーカーは文書のトークン列と一致結果を保持し、再利用することで
//! 不要なメモリアロケーションを避けます。
use crate::cas::{AnnotationId, Cas};
use crate::errors::{Result, TextMarkerError};
use crate::matcher::dict_match::{DictMatch, DictMatchIter};
use crate::matcher::{MatchScope, Matcher};
use crate::sentence::Sentence;
use crate::type_system::{FeatureId, Range, TypeId, TypeSystem};
use crate::utils::FromU32;

/// 1件の一致
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RawMatch {
    /// 開始トークン
    pub(crate) start: usize,
    /// 終了トークン(含まない)
    pub(crate) end: usize,
    pub(crate) list: u32,
    pub(crate) node: u32,
}

/// 照合処理のためのルーチンを提供する構造体。
///
/// # 例
///
/// ```ignore
/// let mut worker = matcher.new_worker();
/// worker.reset_document("Marshall Schor: UIMA");
/// worker.scan();
/// for m in worker.match_iter() {
///     println!("{} {}", m.type_name(), m.surface());
/// }
/// ```
pub struct Worker {
    pub(crate) matcher: Matcher,
    pub(crate) sent: Sentence,
    pub(crate) matches: Vec<RawMatch>,
    longest: Vec<Option<(usize, u32)>>,
    next_free: Vec<usize>,
}

impl Worker {
    pub(crate) fn new(matcher: Matcher) -> Self {
        let num_lists = matcher.dict.lists().len();
        Self {
            matcher,
            sent: Sentence::new(),
            matches: vec![],
            longest: vec![None; num_lists],
            next_free: vec![0; num_lists],
        }
    }

    /// 照合する文書をリセットします。
    ///
    /// 新しい文書を設定してトークン化し、以前の一致結果をクリアします。
    pub fn reset_document<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.matches.clear();
        self.sent.set_sentence(input);
        self.sent.compile(self.matcher.dict.case_sensitive());
    }

    /// 設定された文書を走査します。
    ///
    /// 結果は`num_matches()`や`match_iter()`でアクセスできます。一致は開始位置の順、
    /// 同じ開始位置ではリストの宣言順に並びます。
    pub fn scan(&mut self) {
        self.matches.clear();
        self.next_free.iter_mut().for_each(|n| *n = 0);
        let trie = self.matcher.dict.trie();
        let sent = &self.sent;
        let len = sent.len_tokens();

        for start in 0..len {
            if self.matcher.scope == MatchScope::Merged
                && !self.matcher.allow_overlap
                && self.next_free.first().is_some_and(|&n| start < n)
            {
                continue;
            }

            self.longest.iter_mut().for_each(|l| *l = None);
            let mut deepest = None;
            for (depth, node) in trie.common_prefix_iterator(len - start, |i| sent.token(start + i)) {
                // Deeper terminals overwrite shallower ones of the same list.
                for marker in &trie.node(node).markers {
                    self.longest[usize::from_u32(marker.list)] = Some((depth, node));
                }
                deepest = Some((depth, node));
            }

            match self.matcher.scope {
                MatchScope::PerList => {
                    for (list, longest) in self.longest.iter().enumerate() {
                        let Some((depth, node)) = *longest else {
                            continue;
                        };
                        if !self.matcher.allow_overlap && start < self.next_free[list] {
                            continue;
                        }
                        self.next_free[list] = start + depth;
                        self.matches.push(RawMatch {
                            start,
                            end: start + depth,
                            list: list as u32,
                            node,
                        });
                    }
                }
                MatchScope::Merged => {
                    let Some((depth, node)) = deepest else {
                        continue;
                    };
                    // Markers are ordered by list, so the first one is the first-declared list.
                    let list = trie.node(node).markers[0].list;
                    if let Some(next_free) = self.next_free.first_mut() {
                        *next_free = start + depth;
                    }
                    self.matches.push(RawMatch {
                        start,
                        end: start + depth,
                        list,
                        node,
                    });
                }
            }
        }
    }

    /// 一致の数
    #[inline(always)]
    pub fn num_matches(&self) -> usize {
        self.matches.len()
    }

    /// `i`番目の一致を取得します。
    #[inline(always)]
    pub fn dict_match(&self, i: usize) -> DictMatch<'_> {
        DictMatch::new(self, i)
    }

    /// 一致のイテレータを作成します。
    #[inline(always)]
    pub fn match_iter(&self) -> DictMatchIter<'_> {
        DictMatchIter::new(self)
    }

    /// 文書のトークン数
    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        self.sent.len_tokens()
    }

    /// 一致をアノテーションとして出力します。
    ///
    /// 各一致はリストの型のアノテーションになり、列ごとの素性に属性値が設定されます。
    /// 出力前にすべてのリストの型と列を型システムに対して解決します。
    ///
    /// # 引数
    ///
    /// * `cas` - 出力先。テキストは走査した文書と同じでなければなりません
    /// * `ts` - 型システム
    ///
    /// # 戻り値
    ///
    /// 作成したアノテーションのID(一致の順)
    ///
    /// # エラー
    ///
    /// リストの型や列の素性が存在しない場合、または素性の値域が列の型と異なる場合に
    /// [`TextMarkerError::FeatureResolution`]を返します。
    pub fn annotate<T>(&self, cas: &mut Cas, ts: &T) -> Result<Vec<AnnotationId>>
    where
        T: TypeSystem + ?Sized,
    {
        if cas.text() != self.sent.raw() {
            return Err(TextMarkerError::invalid_argument(
                "cas",
                "the document text differs from the scanned document",
            ));
        }

        let bindings = self
            .matcher
            .dict
            .lists()
            .iter()
            .map(|list| -> Result<(TypeId, Vec<FeatureId>)> {
                let ty = ts.type_by_name(&list.type_name).ok_or_else(|| {
                    TextMarkerError::feature_resolution(
                        &list.type_name,
                        None,
                        format!("the type of list {} is not defined", list.name),
                    )
                })?;
                let features = list
                    .columns
                    .iter()
                    .map(|column| -> Result<FeatureId> {
                        let feature = ts.feature_by_base_name(ty, &column.name).ok_or_else(|| {
                            TextMarkerError::feature_resolution(
                                &column.name,
                                Some(list.type_name.as_str()),
                                "the feature is not defined",
                            )
                        })?;
                        if feature.range() != Range::Primitive(column.kind) {
                            return Err(TextMarkerError::feature_resolution(
                                &column.name,
                                Some(list.type_name.as_str()),
                                format!("the feature range does not accept {}", column.kind.name()),
                            ));
                        }
                        Ok(feature.id())
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((ty, features))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut ids = Vec::with_capacity(self.matches.len());
        for m in self.match_iter() {
            let (ty, features) = &bindings[m.list_index()];
            let range = m.range_byte();
            let id = cas.add_annotation(*ty, range.start, range.end)?;
            for (feature, value) in features.iter().zip(m.attributes()) {
                cas.set_value(id, *feature, value.to_value())?;
            }
            ids.push(id);
        }
        Ok(ids)
    }
}
