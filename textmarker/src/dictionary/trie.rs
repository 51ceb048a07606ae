//! トークン単位の多分木トライ
//!
//! 各辺は1トークンでラベル付けされ、根から終端ノードまでの経路がエントリの
//! トークン列を表します。終端ノードはソースリストごとに独立したマーカーを持つため、
//! 同じキーを定義する複数のリストが互いの属性を上書きすることはありません。
//!
//! ノードは前順(pre-order)で番号付けされた配列に格納されます。子の番号は常に
//! 親より大きいため、読み込んだデータの検査で循環がないことを保証できます。

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};

use crate::dictionary::attribute::{AttributeValue, Column};
use crate::errors::{Result, TextMarkerError};
use crate::utils::FromU32;

/// 終端マーカー
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct Marker {
    /// ソースリストの宣言順のインデックス
    pub list: u32,
    /// 列の宣言順の属性値
    pub attributes: Vec<AttributeValue>,
}

/// トークンでラベル付けされた辺
#[derive(Clone, Debug, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Edge {
    pub token: String,
    pub child: u32,
}

/// ノードのレコード
#[derive(Clone, Debug, Default, PartialEq, Archive, Serialize, Deserialize)]
pub struct Node {
    /// トークンの昇順に並んだ辺
    pub edges: Vec<Edge>,
    /// リストの宣言順に並んだマーカー
    pub markers: Vec<Marker>,
}

impl Node {
    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        !self.markers.is_empty()
    }
}

/// 構築済みの不変なトライ
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub struct Trie {
    nodes: Vec<Node>,
}

impl Trie {
    #[inline(always)]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// 前順に並んだすべてのノード
    #[inline(always)]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline(always)]
    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[usize::from_u32(idx)]
    }

    /// 子ノードを検索します。
    #[inline(always)]
    pub fn child(&self, idx: u32, token: &str) -> Option<u32> {
        let edges = &self.node(idx).edges;
        edges
            .binary_search_by(|e| e.token.as_str().cmp(token))
            .ok()
            .map(|i| edges[i].child)
    }

    /// 完全一致するキーのノードを返します。
    pub fn find<I, S>(&self, tokens: I) -> Option<u32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .try_fold(0, |idx, token| self.child(idx, token.as_ref()))
    }

    /// 入力の先頭から辺をたどり、通過した終端ノードを浅い順に返すイテレータを取得します。
    ///
    /// `token`は入力のi番目のトークンを返す関数です。
    #[inline(always)]
    pub fn common_prefix_iterator<'a, F>(&'a self, len: usize, token: F) -> CommonPrefixIter<'a, F>
    where
        F: Fn(usize) -> &'a str,
    {
        CommonPrefixIter {
            trie: self,
            token,
            len,
            depth: 0,
            node: Some(0),
        }
    }

    /// 読み込んだトライの構造を検査します。
    ///
    /// # 引数
    ///
    /// * `columns` - リストごとの列の宣言(長さがソースリストの数になります)
    pub(crate) fn verify(&self, columns: &[&[Column]]) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(TextMarkerError::dictionary_format("trie has no root node", ""));
        }
        let num_nodes = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            for pair in node.edges.windows(2) {
                if pair[0].token >= pair[1].token {
                    return Err(TextMarkerError::dictionary_format(
                        "edges are not sorted",
                        format!("node {i}"),
                    ));
                }
            }
            for edge in &node.edges {
                let child = usize::from_u32(edge.child);
                if child <= i || child >= num_nodes {
                    return Err(TextMarkerError::dictionary_format(
                        "dangling child offset",
                        format!("node {i} -> {child}"),
                    ));
                }
            }
            let mut prev_list = None;
            for marker in &node.markers {
                let list = usize::from_u32(marker.list);
                let Some(&declared) = columns.get(list) else {
                    return Err(TextMarkerError::dictionary_format(
                        "marker refers to an unknown list",
                        format!("node {i}, list {list}"),
                    ));
                };
                if prev_list.is_some_and(|p| p >= list) {
                    return Err(TextMarkerError::dictionary_format(
                        "markers are not ordered by list",
                        format!("node {i}"),
                    ));
                }
                if marker.attributes.len() != declared.len() {
                    return Err(TextMarkerError::dictionary_format(
                        "attribute count mismatch",
                        format!("node {i}, list {list}"),
                    ));
                }
                for (value, column) in marker.attributes.iter().zip(declared) {
                    if value.kind() != column.kind {
                        return Err(TextMarkerError::dictionary_format(
                            "attribute kind mismatch",
                            format!(
                                "node {i}, list {list}, column {}: expected {}, found {}",
                                column.name,
                                column.kind.name(),
                                value.kind().name()
                            ),
                        ));
                    }
                }
                prev_list = Some(list);
            }
        }
        Ok(())
    }
}

/// 共通接頭辞検索のイテレータ
///
/// `(消費したトークン数, 終端ノード)`を返します。
pub struct CommonPrefixIter<'a, F> {
    trie: &'a Trie,
    token: F,
    len: usize,
    depth: usize,
    node: Option<u32>,
}

impl<'a, F> Iterator for CommonPrefixIter<'a, F>
where
    F: Fn(usize) -> &'a str,
{
    type Item = (usize, u32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.depth < self.len {
            let next = self.trie.child(self.node?, (self.token)(self.depth));
            self.node = next;
            let idx = next?;
            self.depth += 1;
            if self.trie.node(idx).is_terminal() {
                return Some((self.depth, idx));
            }
        }
        None
    }
}

#[derive(Default)]
struct BuildNode {
    children: BTreeMap<String, usize>,
    markers: Vec<Marker>,
}

/// トライを構築するビルダー
pub struct TrieBuilder {
    nodes: Vec<BuildNode>,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![BuildNode::default()],
        }
    }

    /// キーにマーカーを登録します。
    ///
    /// 同じリストのマーカーが既にある場合は置き換え、置き換えた場合は`true`を返します。
    /// 他のリストのマーカーには影響しません。
    pub fn insert<I, S>(&mut self, tokens: I, marker: Marker) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut idx = 0;
        for token in tokens {
            let next = self.nodes.len();
            let child = *self.nodes[idx].children.entry(token.into()).or_insert(next);
            if child == next {
                self.nodes.push(BuildNode::default());
            }
            idx = child;
        }
        let markers = &mut self.nodes[idx].markers;
        match markers.binary_search_by_key(&marker.list, |m| m.list) {
            Ok(i) => {
                markers[i] = marker;
                true
            }
            Err(i) => {
                markers.insert(i, marker);
                false
            }
        }
    }

    /// ノードを前順に並べ替えてトライを確定します。
    pub fn build(mut self) -> Result<Trie> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(self.nodes[idx].children.values().rev().copied());
        }

        let mut new_ids = vec![0; self.nodes.len()];
        for (new_id, &old_id) in order.iter().enumerate() {
            new_ids[old_id] = u32::try_from(new_id)?;
        }

        let mut nodes = Vec::with_capacity(order.len());
        for &old_id in &order {
            let node = std::mem::take(&mut self.nodes[old_id]);
            nodes.push(Node {
                edges: node
                    .children
                    .into_iter()
                    .map(|(token, child)| Edge {
                        token,
                        child: new_ids[child],
                    })
                    .collect(),
                markers: node.markers,
            });
        }
        Ok(Trie { nodes })
    }
}
