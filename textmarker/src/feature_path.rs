//! 素性パス
//!
//! ルールが参照する`a.b[2].c`のようなドット区切り・添字付きの素性パスを表現します。
//! 生のセグメント文字列は[`FeaturePathResolver`]によって型システムに対して解決され、
//! [`FeaturePathSegment`]の列になります。解決済みのパスは不変で、
//! [`FeatureGraphWalker`](crate::walker::FeatureGraphWalker)によって実行されます。

mod resolver;

use std::fmt;

use crate::errors::{Result, TextMarkerError};
use crate::type_system::{FeatureId, TypeId};

pub use crate::feature_path::resolver::{FeaturePathCache, FeaturePathResolver};

/// 被覆テキストを表す組み込みの疑似素性名
pub const COVERED_TEXT: &str = "coveredText";

/// 被覆テキストの短縮名
///
/// 型に同名の素性がない場合にのみ被覆テキストとして扱われます。
pub const COVERED_TEXT_SHORT: &str = "ct";

/// 解決済みの素性パスのセグメント
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FeaturePathSegment {
    /// 静的に解決された素性
    Named { name: String, feature: FeatureId },
    /// 静的に解決された添字付き素性
    Indexed {
        name: String,
        feature: FeatureId,
        index: usize,
    },
    /// 被覆テキスト。パスの終端です。
    CoveredText,
    /// 実行時に具象型に対して束縛される素性
    Lazy { name: String, index: Option<usize> },
}

impl FeaturePathSegment {
    /// セグメントの名前を返します。
    pub fn name(&self) -> &str {
        match self {
            Self::Named { name, .. } | Self::Indexed { name, .. } | Self::Lazy { name, .. } => name,
            Self::CoveredText => COVERED_TEXT,
        }
    }

    #[inline(always)]
    pub const fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy { .. })
    }
}

impl fmt::Display for FeaturePathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Indexed { name, index, .. }
            | Self::Lazy {
                name,
                index: Some(index),
            } => write!(f, "{name}[{index}]"),
            _ => f.write_str(self.name()),
        }
    }
}

/// 解決済みの素性パス
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeaturePath {
    start: Option<TypeId>,
    segments: Vec<FeaturePathSegment>,
}

impl FeaturePath {
    pub(crate) const fn new(start: Option<TypeId>, segments: Vec<FeaturePathSegment>) -> Self {
        Self { start, segments }
    }

    /// 解決時の開始型。未知の場合は`None`です。
    #[inline(always)]
    pub const fn start(&self) -> Option<TypeId> {
        self.start
    }

    #[inline(always)]
    pub fn segments(&self) -> &[FeaturePathSegment] {
        &self.segments
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 遅延束縛のセグメントを含むかどうかを返します。
    pub fn has_lazy(&self) -> bool {
        self.segments.iter().any(FeaturePathSegment::is_lazy)
    }
}

impl fmt::Display for FeaturePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i != 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// 添字付きの参照 `name[index]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexedReference<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

impl<'a> IndexedReference<'a> {
    /// 生のセグメントを解析します。
    ///
    /// # エラー
    ///
    /// 添字が閉じていない、または非負整数でない場合にエラーを返します。
    pub fn parse(raw: &'a str) -> Result<Self> {
        let raw = raw.trim();
        let Some(open) = raw.find('[') else {
            if raw.contains(']') {
                return Err(TextMarkerError::feature_resolution(raw, None, "unbalanced index"));
            }
            return Ok(Self { name: raw, index: None });
        };
        let Some(inner) = raw[open + 1..].strip_suffix(']') else {
            return Err(TextMarkerError::feature_resolution(raw, None, "unbalanced index"));
        };
        let index = inner.trim().parse::<usize>().map_err(|e| {
            TextMarkerError::feature_resolution(raw, None, format!("invalid index: {e}"))
        })?;
        let name = raw[..open].trim_end();
        if name.is_empty() {
            return Err(TextMarkerError::feature_resolution(raw, None, "empty feature name"));
        }
        Ok(Self {
            name,
            index: Some(index),
        })
    }
}

/// ドット区切りの素性パスを生のセグメントに分割します。
///
/// 空のセグメント(`a..b`など)はエラーです。
///
/// # 例
///
/// ```
/// use textmarker::feature_path::parse_path;
///
/// assert_eq!(vec!["a", "b[2]", "c"], parse_path("a.b[2].c")?);
/// # Ok::<(), textmarker::errors::TextMarkerError>(())
/// ```
pub fn parse_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(TextMarkerError::feature_resolution(
            path,
            None,
            "empty segment in feature path",
        ));
    }
    Ok(segments)
}
