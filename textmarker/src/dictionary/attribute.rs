//! 辞書エントリの属性値
//!
//! ソースリストの各列は素性名とプリミティブ型を宣言し、エントリは列ごとに
//! 1つのリテラル値を持ちます。値はビルド時に宣言された型として解析され、
//! バイナリ辞書にそのまま埋め込まれます。

use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

use crate::cas::Value;
use crate::type_system::PrimitiveKind;

/// ソースリストの属性列の宣言
#[derive(Clone, Debug, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: PrimitiveKind,
}

impl Column {
    pub fn new<S>(name: S, kind: PrimitiveKind) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// 型付きの属性値
#[derive(Clone, Debug, PartialEq, Archive, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Integer(i32),
    Boolean(bool),
    Double(f64),
}

impl AttributeValue {
    /// リテラルを宣言された型として解析します。
    ///
    /// 文字列以外は前後の空白を無視します。真偽値は大文字小文字を区別しません。
    /// 解析できない場合は`None`を返します。
    pub fn parse(literal: &str, kind: PrimitiveKind) -> Option<Self> {
        match kind {
            PrimitiveKind::String => Some(Self::String(literal.to_string())),
            PrimitiveKind::Integer => literal.trim().parse().ok().map(Self::Integer),
            PrimitiveKind::Double => literal.trim().parse().ok().map(Self::Double),
            PrimitiveKind::Boolean => {
                let literal = literal.trim();
                if literal.eq_ignore_ascii_case("true") {
                    Some(Self::Boolean(true))
                } else if literal.eq_ignore_ascii_case("false") {
                    Some(Self::Boolean(false))
                } else {
                    None
                }
            }
        }
    }

    /// 値の型
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Self::String(_) => PrimitiveKind::String,
            Self::Integer(_) => PrimitiveKind::Integer,
            Self::Boolean(_) => PrimitiveKind::Boolean,
            Self::Double(_) => PrimitiveKind::Double,
        }
    }

    /// アノテーションの素性値に変換します。
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::Integer(*i),
            Self::Boolean(b) => Value::Boolean(*b),
            Self::Double(d) => Value::Double(*d),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Double(d) => write!(f, "{d}"),
        }
    }
}
