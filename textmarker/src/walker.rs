//! 素性グラフの走査
//!
//! 解決済みの[`FeaturePath`]を具象アノテーションに対して実行します。
//!
//! - 収集モード([`FeatureGraphWalker::collect`]): パスの終端に到達したアノテーションを
//!   重複なく正準順序で集めます。
//! - 述語モード([`FeatureGraphWalker::select`]): 終端の値がコールバックを満たす
//!   ルートアノテーションを選びます。
//!
//! 疎な素性グラフは正常な状態です。遅延束縛の失敗、未設定の参照、範囲外の添字は
//! その枝を静かに打ち切るだけで、エラーにはなりません。
//!
//! 走査は単純な再帰で、深さはパスの長さ+1で抑えられます。値レベルで循環する
//! グラフでもパスが有限なので停止します。

use std::collections::BTreeSet;

use crate::cas::{Annotation, AnnotationId, AnnotationStore, Value};
use crate::errors::{Result, TextMarkerError};
use crate::feature_path::{FeaturePath, FeaturePathSegment, COVERED_TEXT_SHORT};
use crate::type_system::{FeatureId, TypeId, TypeSystem};

/// 終端で観測された値
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeatureValueRef<'a> {
    /// アノテーションの被覆テキスト
    Text(&'a str),
    /// 素性値
    Value(&'a Value),
    /// 未設定の素性
    Null,
}

impl<'a> FeatureValueRef<'a> {
    /// 文字列として取得します。
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Value(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 整数として取得します。
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Value(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// 真偽値として取得します。
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Value(Value::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// 浮動小数点数として取得します。整数も変換されます。
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Value(Value::Double(d)) => Some(*d),
            Self::Value(Value::Integer(i)) => Some(f64::from(*i)),
            _ => None,
        }
    }
}

/// 走査モード
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkMode {
    Collect,
    Predicate,
}

/// 遅延束縛の結果
enum Binding {
    Feature(FeatureId),
    CoveredText,
}

/// 素性グラフを走査するウォーカー
///
/// コールスタック以外の状態を持たないため、文書ごとに作り直しても安価です。
/// 遅延束縛は走査のたびに現在のアノテーションの具象型に対して行われ、
/// キャッシュされません。
pub struct FeatureGraphWalker<'a, T, S>
where
    T: TypeSystem + ?Sized,
    S: AnnotationStore + ?Sized,
{
    ts: &'a T,
    store: &'a S,
}

impl<'a, T, S> FeatureGraphWalker<'a, T, S>
where
    T: TypeSystem + ?Sized,
    S: AnnotationStore + ?Sized,
{
    pub const fn new(ts: &'a T, store: &'a S) -> Self {
        Self { ts, store }
    }

    /// パスの終端のアノテーションを収集します。
    ///
    /// 結果は重複がなく、開始位置・終了位置・型の昇順に並びます。
    ///
    /// # エラー
    ///
    /// 非プリミティブな値域の素性がプリミティブ値を保持していた場合に
    /// [`TextMarkerError::WalkType`]を返します。
    pub fn collect<I>(&self, roots: I, path: &FeaturePath) -> Result<Vec<AnnotationId>>
    where
        I: IntoIterator<Item = AnnotationId>,
    {
        let mut result = BTreeSet::new();
        for root in roots {
            let Some(annotation) = self.store.annotation(root) else {
                continue;
            };
            self.walk(annotation, path.segments(), WalkMode::Collect, &mut |a, _| {
                result.insert(canonical_key(a));
                false
            })?;
        }
        Ok(result.into_iter().map(|(.., id)| id).collect())
    }

    /// 終端の値が述語を満たすルートを選びます。
    ///
    /// 述語には終端の値と、その値を保持するアノテーションが渡されます。
    /// パスの最後のアクセサは常に終端として扱われ、参照値であってもそのまま渡されます。
    ///
    /// # エラー
    ///
    /// [`collect`](Self::collect)と同じです。
    pub fn select<I, F>(&self, roots: I, path: &FeaturePath, mut predicate: F) -> Result<Vec<AnnotationId>>
    where
        I: IntoIterator<Item = AnnotationId>,
        F: FnMut(FeatureValueRef<'_>, &Annotation) -> bool,
    {
        let mut result = BTreeSet::new();
        for root in roots {
            let Some(annotation) = self.store.annotation(root) else {
                continue;
            };
            let satisfied = self.walk(
                annotation,
                path.segments(),
                WalkMode::Predicate,
                &mut |a, value| predicate(value, a),
            )?;
            if satisfied {
                result.insert(canonical_key(annotation));
            }
        }
        Ok(result.into_iter().map(|(.., id)| id).collect())
    }

    /// 1つのアノテーションから残りのチェーンをたどります。
    ///
    /// `visit`が`true`を返した時点で走査を打ち切り、`true`を返します。
    fn walk<V>(
        &self,
        annotation: &'a Annotation,
        chain: &[FeaturePathSegment],
        mode: WalkMode,
        visit: &mut V,
    ) -> Result<bool>
    where
        V: FnMut(&'a Annotation, FeatureValueRef<'a>) -> bool,
    {
        let Some((head, tail)) = chain.split_first() else {
            let text = self.store.covered_text(annotation);
            return Ok(visit(annotation, FeatureValueRef::Text(text)));
        };

        let (feature, index) = match head {
            FeaturePathSegment::CoveredText => {
                let text = self.store.covered_text(annotation);
                return Ok(visit(annotation, FeatureValueRef::Text(text)));
            }
            FeaturePathSegment::Named { feature, .. } => (*feature, None),
            FeaturePathSegment::Indexed { feature, index, .. } => (*feature, Some(*index)),
            FeaturePathSegment::Lazy { name, index } => match self.bind(annotation.type_id(), name) {
                None => return Ok(false),
                // Nothing may follow the covered text.
                Some(Binding::CoveredText) if index.is_none() && tail.is_empty() => {
                    let text = self.store.covered_text(annotation);
                    return Ok(visit(annotation, FeatureValueRef::Text(text)));
                }
                Some(Binding::CoveredText) => return Ok(false),
                Some(Binding::Feature(feature)) => (feature, *index),
            },
        };

        let range = self.ts.feature(feature).range();
        let value = self.store.value_of(annotation, feature);

        if range.is_primitive() || (mode == WalkMode::Predicate && tail.is_empty()) {
            let observed = match (value, index) {
                (Some(Value::Array(items)), Some(i)) => {
                    items.get(i).map_or(FeatureValueRef::Null, FeatureValueRef::Value)
                }
                (Some(v), _) => FeatureValueRef::Value(v),
                (None, _) => FeatureValueRef::Null,
            };
            return Ok(visit(annotation, observed));
        }

        match value {
            None => Ok(false),
            Some(Value::Ref(id)) => self.follow(*id, tail, mode, visit),
            Some(Value::Array(items)) => match index {
                Some(i) => match items.get(i).and_then(Value::as_ref_id) {
                    Some(id) => self.follow(id, tail, mode, visit),
                    None => Ok(false),
                },
                None => {
                    for id in items.iter().filter_map(Value::as_ref_id) {
                        if self.follow(id, tail, mode, visit)? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
            },
            Some(other) => Err(TextMarkerError::walk_type(
                self.ts.type_name(annotation.type_id()),
                self.ts.feature(feature).name(),
                other.kind_name(),
            )),
        }
    }

    #[inline(always)]
    fn follow<V>(
        &self,
        id: AnnotationId,
        tail: &[FeaturePathSegment],
        mode: WalkMode,
        visit: &mut V,
    ) -> Result<bool>
    where
        V: FnMut(&'a Annotation, FeatureValueRef<'a>) -> bool,
    {
        match self.store.annotation(id) {
            Some(next) => self.walk(next, tail, mode, visit),
            None => Ok(false),
        }
    }

    /// 遅延セグメントを具象型に対して束縛します。
    fn bind(&self, ty: TypeId, name: &str) -> Option<Binding> {
        match self.ts.feature_by_base_name(ty, name) {
            Some(feature) => Some(Binding::Feature(feature.id())),
            None if name == COVERED_TEXT_SHORT => Some(Binding::CoveredText),
            None => None,
        }
    }
}

#[inline(always)]
fn canonical_key(a: &Annotation) -> (usize, usize, TypeId, AnnotationId) {
    (a.begin(), a.end(), a.type_id(), a.id())
}
