//! 文書単位のアノテーションアリーナ
//!
//! [`Cas`]は1文書のテキストと、その文書に属するすべてのアノテーションを所有します。
//! 他のアノテーションを指す素性値は[`AnnotationId`]として保持されるため、
//! 値レベルで循環していても所有権の循環は発生しません。アリーナは文書の処理が
//! 終わると破棄されます。

use std::cmp::Ordering;
use std::ops::Range;

use hashbrown::HashMap;

use crate::errors::{Result, TextMarkerError};
use crate::type_system::{FeatureId, TypeId, TypeSystem};
use crate::utils::FromU32;

/// アリーナ内のアノテーションの識別子
///
/// 文書の処理中は一意かつ不変です。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(pub(crate) u32);

impl AnnotationId {
    #[inline(always)]
    pub fn index(self) -> usize {
        usize::from_u32(self.0)
    }
}

/// 素性値
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Integer(i32),
    Boolean(bool),
    Double(f64),
    /// 同じアリーナ内の別のアノテーションへの参照
    Ref(AnnotationId),
    /// 参照またはプリミティブ値の順序付き列
    Array(Vec<Value>),
}

impl Value {
    /// 値の種類の名前を返します。エラーメッセージで使用されます。
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::String(_) => "String",
            Self::Integer(_) => "Integer",
            Self::Boolean(_) => "Boolean",
            Self::Double(_) => "Double",
            Self::Ref(_) => "Reference",
            Self::Array(_) => "Array",
        }
    }

    /// 参照であれば参照先を返します。
    #[inline(always)]
    pub const fn as_ref_id(&self) -> Option<AnnotationId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

/// 1つのアノテーション
#[derive(Clone, Debug)]
pub struct Annotation {
    id: AnnotationId,
    begin: usize,
    end: usize,
    type_id: TypeId,
    values: HashMap<FeatureId, Value>,
}

impl Annotation {
    #[inline(always)]
    pub const fn id(&self) -> AnnotationId {
        self.id
    }

    /// 開始位置(バイト単位)
    #[inline(always)]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// 終了位置(バイト単位、排他的)
    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[inline(always)]
    pub const fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    /// 具象型
    #[inline(always)]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// 素性値を取得します。未設定の場合は`None`です。
    #[inline(always)]
    pub fn value(&self, feature: FeatureId) -> Option<&Value> {
        self.values.get(&feature)
    }

    /// 正準順序で比較します。
    ///
    /// 開始位置の昇順、終了位置の昇順、型の識別子の昇順で比較し、最後に
    /// アノテーションの識別子で比較します。識別子まで含めるため、異なる
    /// アノテーションが等しいと判定されることはありません。
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then(self.end.cmp(&other.end))
            .then(self.type_id.cmp(&other.type_id))
            .then(self.id.cmp(&other.id))
    }
}

/// アノテーションストアへの読み取りアクセス
///
/// 素性グラフの走査はこのトレイトを通してのみアノテーションを参照します。
pub trait AnnotationStore {
    /// 識別子からアノテーションを取得します。
    fn annotation(&self, id: AnnotationId) -> Option<&Annotation>;

    /// アノテーションが覆うテキストを返します。
    fn covered_text(&self, annotation: &Annotation) -> &str;

    /// 素性値を取得します。
    #[inline(always)]
    fn value_of<'a>(&'a self, annotation: &'a Annotation, feature: FeatureId) -> Option<&'a Value> {
        annotation.value(feature)
    }
}

/// 1文書分のテキストとアノテーションのアリーナ
#[derive(Clone, Debug, Default)]
pub struct Cas {
    text: String,
    annotations: Vec<Annotation>,
}

impl Cas {
    /// 文書テキストから空のアリーナを作成します。
    pub fn new<S>(text: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            text: text.into(),
            annotations: vec![],
        }
    }

    /// 文書テキスト
    #[inline(always)]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// アノテーションの数
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// 新しいアノテーションを追加します。
    ///
    /// # エラー
    ///
    /// 範囲がテキストの外にある場合、または文字境界にない場合にエラーを返します。
    pub fn add_annotation(&mut self, type_id: TypeId, begin: usize, end: usize) -> Result<AnnotationId> {
        if begin > end
            || end > self.text.len()
            || !self.text.is_char_boundary(begin)
            || !self.text.is_char_boundary(end)
        {
            return Err(TextMarkerError::invalid_argument(
                "begin/end",
                format!("span {begin}..{end} is not a valid span of the document"),
            ));
        }
        let id = AnnotationId(u32::try_from(self.annotations.len())?);
        self.annotations.push(Annotation {
            id,
            begin,
            end,
            type_id,
            values: HashMap::new(),
        });
        Ok(id)
    }

    /// 素性値を設定します。既存の値は置き換えられます。
    ///
    /// # エラー
    ///
    /// アノテーション、または値が参照しているアノテーションが存在しない場合にエラーを返します。
    pub fn set_value(&mut self, id: AnnotationId, feature: FeatureId, value: Value) -> Result<()> {
        if !self.references_exist(&value) {
            return Err(TextMarkerError::invalid_argument(
                "value",
                "references an annotation outside of this document",
            ));
        }
        let annotation = self
            .annotations
            .get_mut(id.index())
            .ok_or_else(|| TextMarkerError::invalid_argument("id", "unknown annotation"))?;
        annotation.values.insert(feature, value);
        Ok(())
    }

    fn references_exist(&self, value: &Value) -> bool {
        match value {
            Value::Ref(id) => id.index() < self.annotations.len(),
            Value::Array(values) => values.iter().all(|v| self.references_exist(v)),
            _ => true,
        }
    }

    /// すべてのアノテーションを挿入順に返します。
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// 型(およびその部分型)のアノテーションを正準順序で返します。
    pub fn select<T>(&self, ts: &T, ty: TypeId) -> Vec<AnnotationId>
    where
        T: TypeSystem + ?Sized,
    {
        let mut selected: Vec<&Annotation> = self
            .annotations
            .iter()
            .filter(|a| ts.subsumes(ty, a.type_id))
            .collect();
        selected.sort_by(|a, b| a.canonical_cmp(b));
        selected.into_iter().map(Annotation::id).collect()
    }
}

impl AnnotationStore for Cas {
    #[inline(always)]
    fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id.index())
    }

    #[inline(always)]
    fn covered_text(&self, annotation: &Annotation) -> &str {
        &self.text[annotation.range()]
    }
}
