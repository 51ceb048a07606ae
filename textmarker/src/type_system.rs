//! 型システム
//!
//! アノテーションの型階層と素性宣言を表現します。ルールエンジン本体は型システムを
//! [`TypeSystem`]トレイト経由で読み取り専用に参照します。[`StaticTypeSystem`]は
//! [`TypeSystemBuilder`]で構築される参照実装で、一度構築した後は不変です。

use hashbrown::HashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{Result, TextMarkerError};
use crate::utils::FromU32;

/// すべてのアノテーション型の根となる型の名前
pub const ANNOTATION_TYPE: &str = "uima.tcas.Annotation";

/// 型の識別子
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// 型システム内のインデックスを返します。
    #[inline(always)]
    pub fn index(self) -> usize {
        usize::from_u32(self.0)
    }
}

/// 素性の識別子
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub(crate) u32);

impl FeatureId {
    /// 型システム内のインデックスを返します。
    #[inline(always)]
    pub fn index(self) -> usize {
        usize::from_u32(self.0)
    }
}

/// プリミティブ値の種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug, Clone, Copy, PartialEq, Eq))]
#[repr(u8)]
pub enum PrimitiveKind {
    String,
    Integer,
    Boolean,
    Double,
}

impl PrimitiveKind {
    /// 型名(`String`, `uima.cas.Integer`など)から種類を取得します。
    ///
    /// 大文字小文字は区別しません。
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.rsplit('.').next().unwrap_or(name);
        match base.to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "integer" | "int" => Some(Self::Integer),
            "boolean" | "bool" => Some(Self::Boolean),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    /// 種類の名前を返します。
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::Double => "Double",
        }
    }
}

/// 配列要素の種類
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Primitive(PrimitiveKind),
    Structure(TypeId),
}

/// 素性の値域
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Range {
    /// プリミティブ値
    Primitive(PrimitiveKind),
    /// 別のアノテーションへの参照
    Structure(TypeId),
    /// 値または参照の配列
    Array(ElementKind),
}

impl Range {
    /// 値域がプリミティブかどうかを返します。
    #[inline(always)]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

/// 型に宣言された素性
#[derive(Clone, Debug)]
pub struct Feature {
    id: FeatureId,
    name: String,
    domain: TypeId,
    range: Range,
}

impl Feature {
    /// 素性の識別子
    #[inline(always)]
    pub const fn id(&self) -> FeatureId {
        self.id
    }

    /// 素性の基本名
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 素性を宣言した型
    #[inline(always)]
    pub const fn domain(&self) -> TypeId {
        self.domain
    }

    /// 宣言された値域
    #[inline(always)]
    pub const fn range(&self) -> Range {
        self.range
    }
}

/// 型システムへの読み取り専用アクセス
///
/// 型システムは読み込み後に不変であり、複数のワーカーから同期なしで参照されます。
pub trait TypeSystem {
    /// 名前から型を検索します。
    fn type_by_name(&self, name: &str) -> Option<TypeId>;

    /// 型の名前を返します。
    fn type_name(&self, ty: TypeId) -> &str;

    /// 親の型を返します。根の型では`None`です。
    fn parent(&self, ty: TypeId) -> Option<TypeId>;

    /// 型(およびその祖先)に宣言された素性を基本名で検索します。
    fn feature_by_base_name(&self, ty: TypeId, name: &str) -> Option<&Feature>;

    /// 識別子から素性を取得します。
    fn feature(&self, id: FeatureId) -> &Feature;

    /// `sub`が`sup`と同じ型、またはその子孫かどうかを返します。
    fn subsumes(&self, sup: TypeId, sub: TypeId) -> bool {
        let mut cur = Some(sub);
        while let Some(ty) = cur {
            if ty == sup {
                return true;
            }
            cur = self.parent(ty);
        }
        false
    }
}

struct TypeEntry {
    name: String,
    parent: Option<TypeId>,
    features: HashMap<String, FeatureId>,
}

/// 構築後に不変な型システム
pub struct StaticTypeSystem {
    types: Vec<TypeEntry>,
    features: Vec<Feature>,
    type_index: HashMap<String, TypeId>,
}

impl StaticTypeSystem {
    /// 型の数を返します。
    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    /// 根の型(`uima.tcas.Annotation`)を返します。
    pub const fn annotation_type(&self) -> TypeId {
        TypeId(0)
    }
}

impl TypeSystem for StaticTypeSystem {
    fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    fn type_name(&self, ty: TypeId) -> &str {
        &self.types[ty.index()].name
    }

    fn parent(&self, ty: TypeId) -> Option<TypeId> {
        self.types[ty.index()].parent
    }

    fn feature_by_base_name(&self, ty: TypeId, name: &str) -> Option<&Feature> {
        let mut cur = Some(ty);
        while let Some(t) = cur {
            let entry = &self.types[t.index()];
            if let Some(id) = entry.features.get(name) {
                return Some(&self.features[id.index()]);
            }
            cur = entry.parent;
        }
        None
    }

    fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.index()]
    }
}

/// [`StaticTypeSystem`]を構築するビルダー
///
/// 根の型`uima.tcas.Annotation`は自動的に作成されます。親は子より先に
/// 宣言されている必要があるため、型階層は常に木になります。
///
/// # 例
///
/// ```
/// use textmarker::type_system::{PrimitiveKind, Range, TypeSystem, TypeSystemBuilder, ANNOTATION_TYPE};
///
/// let mut b = TypeSystemBuilder::new();
/// let person = b.add_type("Person", ANNOTATION_TYPE)?;
/// b.add_feature(person, "age", Range::Primitive(PrimitiveKind::Integer))?;
/// let ts = b.build();
///
/// let person = ts.type_by_name("Person").unwrap();
/// assert!(ts.feature_by_base_name(person, "age").is_some());
/// # Ok::<(), textmarker::errors::TextMarkerError>(())
/// ```
pub struct TypeSystemBuilder {
    types: Vec<TypeEntry>,
    features: Vec<Feature>,
    type_index: HashMap<String, TypeId>,
}

impl Default for TypeSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeSystemBuilder {
    /// 根の型のみを持つビルダーを作成します。
    pub fn new() -> Self {
        let mut type_index = HashMap::new();
        type_index.insert(ANNOTATION_TYPE.to_string(), TypeId(0));
        Self {
            types: vec![TypeEntry {
                name: ANNOTATION_TYPE.to_string(),
                parent: None,
                features: HashMap::new(),
            }],
            features: vec![],
            type_index,
        }
    }

    /// 既に宣言された型を名前で検索します。
    pub fn type_by_name(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    /// 新しい型を宣言します。
    ///
    /// # エラー
    ///
    /// 同名の型が既に存在する場合、または親の型が未宣言の場合にエラーを返します。
    pub fn add_type(&mut self, name: &str, parent: &str) -> Result<TypeId> {
        if self.type_index.contains_key(name) {
            return Err(TextMarkerError::invalid_argument(
                "name",
                format!("type {name} is already declared"),
            ));
        }
        let parent = self.type_by_name(parent).ok_or_else(|| {
            TextMarkerError::invalid_argument("parent", format!("unknown parent type {parent}"))
        })?;
        let id = TypeId(u32::try_from(self.types.len())?);
        self.types.push(TypeEntry {
            name: name.to_string(),
            parent: Some(parent),
            features: HashMap::new(),
        });
        self.type_index.insert(name.to_string(), id);
        Ok(id)
    }

    /// 型に素性を宣言します。
    ///
    /// # エラー
    ///
    /// 型(またはその祖先)に同名の素性が既にある場合、または値域が未知の型を
    /// 参照している場合にエラーを返します。
    pub fn add_feature(&mut self, ty: TypeId, name: &str, range: Range) -> Result<FeatureId> {
        if ty.index() >= self.types.len() {
            return Err(TextMarkerError::invalid_argument("ty", "unknown type id"));
        }
        let referenced = match range {
            Range::Structure(t) | Range::Array(ElementKind::Structure(t)) => Some(t),
            _ => None,
        };
        if referenced.is_some_and(|t| t.index() >= self.types.len()) {
            return Err(TextMarkerError::invalid_argument("range", "unknown range type"));
        }
        let mut cur = Some(ty);
        while let Some(t) = cur {
            if self.types[t.index()].features.contains_key(name) {
                return Err(TextMarkerError::invalid_argument(
                    "name",
                    format!(
                        "feature {name} is already declared on {}",
                        self.types[t.index()].name
                    ),
                ));
            }
            cur = self.types[t.index()].parent;
        }
        let id = FeatureId(u32::try_from(self.features.len())?);
        self.features.push(Feature {
            id,
            name: name.to_string(),
            domain: ty,
            range,
        });
        self.types[ty.index()].features.insert(name.to_string(), id);
        Ok(id)
    }

    /// 型システムを確定します。
    pub fn build(self) -> StaticTypeSystem {
        StaticTypeSystem {
            types: self.types,
            features: self.features,
            type_index: self.type_index,
        }
    }
}
