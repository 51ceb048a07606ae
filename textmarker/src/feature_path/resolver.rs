//! 素性パスの解決
//!
//! 生のセグメント列を開始型から順にたどり、各セグメントを[`FeaturePathSegment`]に
//! 変換します。開始型が未知の場合や、配列の要素型が静的に決まらない場合は
//! [`FeaturePathSegment::Lazy`]を生成し、束縛を走査時まで遅延します。

use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::errors::{Result, TextMarkerError};
use crate::feature_path::{
    parse_path, FeaturePath, FeaturePathSegment, IndexedReference, COVERED_TEXT,
    COVERED_TEXT_SHORT,
};
use crate::type_system::{ElementKind, Range, TypeId, TypeSystem};

/// 解決中の「現在の型」
#[derive(Clone, Copy, Debug)]
enum Cursor {
    Known(TypeId),
    Unknown,
    /// 被覆テキストに到達した。以降のセグメントは無効。
    Text,
}

/// 型システムに対して素性パスを解決するリゾルバ
///
/// 解決は開始型と型システムに対する純関数です。キャッシュを渡した場合、
/// [`resolve_str`](Self::resolve_str)の結果は型システムの寿命の間共有されます。
pub struct FeaturePathResolver<'a, T>
where
    T: TypeSystem + ?Sized,
{
    ts: &'a T,
    cache: Option<&'a FeaturePathCache>,
}

impl<'a, T> FeaturePathResolver<'a, T>
where
    T: TypeSystem + ?Sized,
{
    /// キャッシュなしのリゾルバを作成します。
    pub const fn new(ts: &'a T) -> Self {
        Self { ts, cache: None }
    }

    /// キャッシュ付きのリゾルバを作成します。
    ///
    /// キャッシュは`ts`専用でなければなりません。
    pub const fn with_cache(ts: &'a T, cache: &'a FeaturePathCache) -> Self {
        Self {
            ts,
            cache: Some(cache),
        }
    }

    /// ドット区切りのパス文字列を解決します。
    ///
    /// キャッシュが設定されている場合は`(start, path)`をキーとして結果を共有します。
    /// 遅延束縛のセグメントは名前のみがキャッシュされ、束縛結果は保持されません。
    pub fn resolve_str(&self, start: Option<TypeId>, path: &str) -> Result<Arc<FeaturePath>> {
        if let Some(cache) = self.cache
            && let Some(hit) = cache.get(start, path)
        {
            return Ok(hit);
        }
        let resolved = Arc::new(self.resolve(start, &parse_path(path)?)?);
        match self.cache {
            Some(cache) => Ok(cache.insert(start, path, resolved)),
            None => Ok(resolved),
        }
    }

    /// 生のセグメント列を解決します。
    ///
    /// # 引数
    ///
    /// * `start` - 開始型。実行時まで決まらない場合は`None`
    /// * `raw` - `name`または`name[index]`形式のセグメント列
    ///
    /// # エラー
    ///
    /// 静的に既知の型に素性が存在しない場合、または被覆テキストの後に
    /// セグメントが続く場合に[`TextMarkerError::FeatureResolution`]を返します。
    pub fn resolve<S>(&self, start: Option<TypeId>, raw: &[S]) -> Result<FeaturePath>
    where
        S: AsRef<str>,
    {
        let mut cursor = start.map_or(Cursor::Unknown, Cursor::Known);
        let mut segments = Vec::with_capacity(raw.len());

        for each in raw {
            let each = each.as_ref();
            let reference = IndexedReference::parse(each)?;

            if let Cursor::Text = cursor {
                return Err(TextMarkerError::feature_resolution(
                    each,
                    None,
                    "covered text has no features",
                ));
            }

            let segment = if reference.name == COVERED_TEXT {
                Self::covered_text(each, reference)?
            } else {
                match cursor {
                    Cursor::Known(ty) => self.resolve_on(ty, each, reference)?,
                    _ => FeaturePathSegment::Lazy {
                        name: reference.name.to_string(),
                        index: reference.index,
                    },
                }
            };

            cursor = self.advance(&segment);
            segments.push(segment);
        }

        Ok(FeaturePath::new(start, segments))
    }

    fn covered_text(raw: &str, reference: IndexedReference) -> Result<FeaturePathSegment> {
        if reference.index.is_some() {
            return Err(TextMarkerError::feature_resolution(
                raw,
                None,
                "covered text cannot be indexed",
            ));
        }
        Ok(FeaturePathSegment::CoveredText)
    }

    fn resolve_on(
        &self,
        ty: TypeId,
        raw: &str,
        reference: IndexedReference,
    ) -> Result<FeaturePathSegment> {
        match self.ts.feature_by_base_name(ty, reference.name) {
            Some(feature) => Ok(match reference.index {
                Some(index) => FeaturePathSegment::Indexed {
                    name: reference.name.to_string(),
                    feature: feature.id(),
                    index,
                },
                None => FeaturePathSegment::Named {
                    name: reference.name.to_string(),
                    feature: feature.id(),
                },
            }),
            None if reference.name == COVERED_TEXT_SHORT => Self::covered_text(raw, reference),
            None => Err(TextMarkerError::feature_resolution(
                raw,
                Some(self.ts.type_name(ty)),
                "not able to access feature",
            )),
        }
    }

    fn advance(&self, segment: &FeaturePathSegment) -> Cursor {
        match segment {
            FeaturePathSegment::CoveredText => Cursor::Text,
            FeaturePathSegment::Lazy { .. } => Cursor::Unknown,
            FeaturePathSegment::Named { feature, .. } => match self.ts.feature(*feature).range() {
                Range::Structure(ty) => Cursor::Known(ty),
                _ => Cursor::Unknown,
            },
            FeaturePathSegment::Indexed { feature, .. } => match self.ts.feature(*feature).range() {
                Range::Structure(ty) | Range::Array(ElementKind::Structure(ty)) => Cursor::Known(ty),
                _ => Cursor::Unknown,
            },
        }
    }
}

/// 解決済み素性パスのキャッシュ
///
/// 1つの型システムの寿命に結び付けて使用します。読み込まれた型システムは不変なので、
/// 同じエントリが並行して二度計算されても結果は同一です。
#[derive(Default)]
pub struct FeaturePathCache {
    map: RwLock<HashMap<(Option<TypeId>, String), Arc<FeaturePath>>>,
}

impl FeaturePathCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, start: Option<TypeId>, path: &str) -> Option<Arc<FeaturePath>> {
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        map.get(&(start, path.to_string())).cloned()
    }

    fn insert(&self, start: Option<TypeId>, path: &str, resolved: Arc<FeaturePath>) -> Arc<FeaturePath> {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        map.entry((start, path.to_string()))
            .or_insert(resolved)
            .clone()
    }

    /// キャッシュされたパスの数を返します。
    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
