use crate::dictionary::{Dictionary, DictionaryBuilder, DictionaryConfig, LexiconFormat, SourceList};
use crate::type_system::{
    PrimitiveKind, Range, StaticTypeSystem, TypeSystemBuilder, ANNOTATION_TYPE,
};

pub(crate) const DOCUMENT: &str = include_str!("resources/document.txt");

const TYPE1: &str = include_str!("resources/type1.txt");
const TYPE2: &str = include_str!("resources/type2.txt");
const TYPE3: &str = include_str!("resources/type3.txt");
const TYPE4: &str = include_str!("resources/type4.txt");
const TYPED: &str = include_str!("resources/typed.txt");

/// `Type1`から`Type4`と、素性`a`(String)、`b`(Boolean)、`c`(Integer)を持つ`Typed`
pub(crate) fn type_system() -> StaticTypeSystem {
    let mut b = TypeSystemBuilder::new();
    for name in ["Type1", "Type2", "Type3", "Type4"] {
        b.add_type(name, ANNOTATION_TYPE).unwrap();
    }
    let typed = b.add_type("Typed", ANNOTATION_TYPE).unwrap();
    b.add_feature(typed, "a", Range::Primitive(PrimitiveKind::String)).unwrap();
    b.add_feature(typed, "b", Range::Primitive(PrimitiveKind::Boolean)).unwrap();
    b.add_feature(typed, "c", Range::Primitive(PrimitiveKind::Integer)).unwrap();
    b.build()
}

pub(crate) fn typed_list() -> SourceList {
    SourceList::new("typed.txt", "Typed")
        .with_column("a", PrimitiveKind::String)
        .with_column("b", PrimitiveKind::Boolean)
        .with_column("c", PrimitiveKind::Integer)
}

/// 4つのリストを宣言順に持つ辞書
pub(crate) fn four_lists(config: DictionaryConfig) -> Dictionary {
    let mut builder = DictionaryBuilder::new(config);
    for (i, text) in [TYPE1, TYPE2, TYPE3, TYPE4].into_iter().enumerate() {
        let n = i + 1;
        builder
            .add_list(
                SourceList::new(format!("type{n}.txt"), format!("Type{n}")),
                &LexiconFormat::default(),
                text.as_bytes(),
            )
            .unwrap();
    }
    assert!(builder.diagnostics().is_empty());
    builder.build().unwrap()
}

pub(crate) fn typed_dictionary() -> Dictionary {
    let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
    builder
        .add_list(typed_list(), &LexiconFormat::default(), TYPED.as_bytes())
        .unwrap();
    assert!(builder.diagnostics().is_empty());
    builder.build().unwrap()
}
