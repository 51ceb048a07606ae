use crate::cas::{AnnotationId, AnnotationStore, Cas, Value};
use crate::errors::TextMarkerError;
use crate::feature_path::{FeaturePathCache, FeaturePathResolver};
use crate::type_system::{
    ElementKind, FeatureId, PrimitiveKind, Range, StaticTypeSystem, TypeId, TypeSystem,
    TypeSystemBuilder, ANNOTATION_TYPE,
};
use crate::walker::{FeatureGraphWalker, FeatureValueRef};

const TEXT: &str = "Marshall Schor: UIMA";

/// `Marshall Schor: UIMA`の上の小さなグラフ
///
/// - 4つの`Token`: `Marshall`(NNP) `Schor`(NNP) `:`(PUNCT) `UIMA`(NNP)。`next`で連結
/// - `Phrase`(`Marshall Schor`): `head`は`Schor`、`tokens`は`[Marshall, Schor]`
/// - `Phrase`(`UIMA`): `head`なし、`tokens`は`[UIMA, 1.5]`
/// - `Chunk`(`Schor: UIMA`): `label`は整数
struct Graph {
    ts: StaticTypeSystem,
    cas: Cas,
    token: TypeId,
    phrase: TypeId,
    tokens: Vec<AnnotationId>,
    phrases: Vec<AnnotationId>,
    chunk: AnnotationId,
    head: FeatureId,
}

fn graph() -> Graph {
    let mut b = TypeSystemBuilder::new();
    let token = b.add_type("Token", ANNOTATION_TYPE).unwrap();
    let pos = b
        .add_feature(token, "pos", Range::Primitive(PrimitiveKind::String))
        .unwrap();
    let next = b.add_feature(token, "next", Range::Structure(token)).unwrap();
    let phrase = b.add_type("Phrase", ANNOTATION_TYPE).unwrap();
    let head = b.add_feature(phrase, "head", Range::Structure(token)).unwrap();
    let members = b
        .add_feature(phrase, "tokens", Range::Array(ElementKind::Structure(token)))
        .unwrap();
    let phrase_label = b
        .add_feature(phrase, "label", Range::Primitive(PrimitiveKind::String))
        .unwrap();
    let chunk_ty = b.add_type("Chunk", ANNOTATION_TYPE).unwrap();
    let chunk_label = b
        .add_feature(chunk_ty, "label", Range::Primitive(PrimitiveKind::Integer))
        .unwrap();
    let ts = b.build();

    let mut cas = Cas::new(TEXT);
    let spans = [(0, 8, "NNP"), (9, 14, "NNP"), (14, 15, "PUNCT"), (16, 20, "NNP")];
    let mut tokens = vec![];
    for (begin, end, tag) in spans {
        let id = cas.add_annotation(token, begin, end).unwrap();
        cas.set_value(id, pos, Value::String(tag.to_string())).unwrap();
        tokens.push(id);
    }
    for pair in tokens.windows(2) {
        cas.set_value(pair[0], next, Value::Ref(pair[1])).unwrap();
    }

    let first = cas.add_annotation(phrase, 0, 14).unwrap();
    cas.set_value(first, head, Value::Ref(tokens[1])).unwrap();
    cas.set_value(
        first,
        members,
        Value::Array(vec![Value::Ref(tokens[0]), Value::Ref(tokens[1])]),
    )
    .unwrap();
    cas.set_value(first, phrase_label, Value::String("NP".to_string()))
        .unwrap();

    let second = cas.add_annotation(phrase, 16, 20).unwrap();
    cas.set_value(
        second,
        members,
        Value::Array(vec![Value::Ref(tokens[3]), Value::Double(1.5)]),
    )
    .unwrap();

    let chunk = cas.add_annotation(chunk_ty, 9, 20).unwrap();
    cas.set_value(chunk, chunk_label, Value::Integer(3)).unwrap();

    Graph {
        ts,
        cas,
        token,
        phrase,
        tokens,
        phrases: vec![first, second],
        chunk,
        head,
    }
}

/// 述語に渡された値を所有された形に変換します。
fn owned(value: FeatureValueRef<'_>) -> Option<Value> {
    match value {
        FeatureValueRef::Text(text) => Some(Value::String(text.to_string())),
        FeatureValueRef::Value(v) => Some(v.clone()),
        FeatureValueRef::Null => None,
    }
}

#[test]
fn test_collect_single_reference() {
    let g = graph();
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "head")
        .unwrap();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    // The second phrase has no head, which silently ends its branch.
    assert_eq!(
        vec![g.tokens[1]],
        walker.collect(g.phrases.clone(), &path).unwrap()
    );
}

#[test]
fn test_collect_fan_out() {
    let g = graph();
    let resolver = FeaturePathResolver::new(&g.ts);
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);

    // Non-reference elements are skipped.
    let path = resolver.resolve_str(Some(g.phrase), "tokens").unwrap();
    assert_eq!(
        vec![g.tokens[0], g.tokens[1], g.tokens[3]],
        walker.collect(g.phrases.clone(), &path).unwrap()
    );

    let path = resolver.resolve_str(Some(g.phrase), "tokens[1]").unwrap();
    assert_eq!(
        vec![g.tokens[1]],
        walker.collect(g.phrases.clone(), &path).unwrap()
    );

    let path = resolver.resolve_str(Some(g.phrase), "tokens[5]").unwrap();
    assert!(walker.collect(g.phrases.clone(), &path).unwrap().is_empty());
}

#[test]
fn test_collect_deduplicates() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "tokens.next")
        .unwrap();
    // A repeated root contributes its targets once.
    let roots = [g.phrases[0], g.phrases[0], g.phrases[1]];
    assert_eq!(
        vec![g.tokens[1], g.tokens[2]],
        walker.collect(roots, &path).unwrap()
    );
}

#[test]
fn test_predicate_over_fan_out() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "tokens.pos")
        .unwrap();
    let selected = walker
        .select(g.phrases.clone(), &path, |value, _| value.as_str() == Some("NNP"))
        .unwrap();
    assert_eq!(g.phrases, selected);

    let selected = walker
        .select(g.phrases.clone(), &path, |value, _| value.as_str() == Some("PUNCT"))
        .unwrap();
    assert!(selected.is_empty());
}

#[test]
fn test_predicate_covered_text() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "head.ct")
        .unwrap();
    let selected = walker
        .select(g.phrases.clone(), &path, |value, a| {
            assert_eq!(g.token, a.type_id());
            value == FeatureValueRef::Text("Schor")
        })
        .unwrap();
    assert_eq!(vec![g.phrases[0]], selected);
}

#[test]
fn test_predicate_last_accessor_is_terminal() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "head")
        .unwrap();
    let mut observed = vec![];
    walker
        .select(g.phrases.clone(), &path, |value, _| {
            observed.push(owned(value));
            false
        })
        .unwrap();
    assert_eq!(vec![Some(Value::Ref(g.tokens[1])), None], observed);
}

#[test]
fn test_lazy_rebinding() {
    let g = graph();
    let cache = FeaturePathCache::new();
    let resolver = FeaturePathResolver::with_cache(&g.ts, &cache);
    let path = resolver.resolve_str(None, "label").unwrap();
    assert!(path.has_lazy());

    // One resolved path binds `label` to a different feature per concrete type.
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let roots = [g.phrases[0], g.chunk, g.tokens[0]];
    let mut observed = vec![];
    let selected = walker
        .select(roots, &path, |value, a| {
            observed.push((g.ts.type_name(a.type_id()).to_string(), owned(value)));
            true
        })
        .unwrap();
    assert_eq!(
        vec![
            ("Phrase".to_string(), Some(Value::String("NP".to_string()))),
            ("Chunk".to_string(), Some(Value::Integer(3))),
        ],
        observed
    );
    // Tokens have no label, so their branch ends without a match.
    assert_eq!(vec![g.phrases[0], g.chunk], selected);

    let again = resolver.resolve_str(None, "label").unwrap();
    assert!(std::sync::Arc::ptr_eq(&path, &again));
    assert_eq!(1, cache.len());
}

#[test]
fn test_lazy_after_untyped_array() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "tokens.next.pos")
        .unwrap();
    assert!(path.has_lazy());
    let selected = walker
        .select([g.phrases[0]], &path, |value, _| value.as_str() == Some("PUNCT"))
        .unwrap();
    assert_eq!(vec![g.phrases[0]], selected);
}

#[test]
fn test_cycle_terminates() {
    let mut g = graph();
    let next = g.ts.feature_by_base_name(g.token, "next").unwrap().id();
    g.cas.set_value(g.tokens[3], next, Value::Ref(g.tokens[3])).unwrap();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.token), "next.next.next.next.next")
        .unwrap();
    assert_eq!(
        vec![g.tokens[3]],
        walker.collect(g.tokens.clone(), &path).unwrap()
    );
}

#[test]
fn test_walk_type_error() {
    let mut g = graph();
    g.cas.set_value(g.phrases[1], g.head, Value::Integer(7)).unwrap();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "head.pos")
        .unwrap();
    let result = walker.collect(g.phrases.clone(), &path);
    match result {
        Err(TextMarkerError::WalkType(e)) => {
            let msg = e.to_string();
            assert!(msg.contains("Integer"), "{msg}");
            assert!(msg.contains("Phrase:head"), "{msg}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_covered_text_of_roots() {
    let g = graph();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    let path = FeaturePathResolver::new(&g.ts)
        .resolve_str(Some(g.phrase), "coveredText")
        .unwrap();
    let texts: Vec<&str> = walker
        .collect(g.phrases.clone(), &path)
        .unwrap()
        .into_iter()
        .map(|id| g.cas.covered_text(g.cas.annotation(id).unwrap()))
        .collect();
    assert_eq!(vec!["Marshall Schor", "UIMA"], texts);
}

#[test]
fn test_lazy_covered_text_ends_chain() {
    let g = graph();
    let resolver = FeaturePathResolver::new(&g.ts);
    assert!(resolver.resolve_str(Some(g.token), "ct.pos").is_err());

    // Without a start type the same path binds `ct` per annotation, and the trailing
    // segment must end every branch.
    let path = resolver.resolve_str(None, "ct.pos").unwrap();
    let walker = FeatureGraphWalker::new(&g.ts, &g.cas);
    assert!(walker.collect(g.tokens.clone(), &path).unwrap().is_empty());
    let mut called = false;
    let selected = walker
        .select(g.tokens.clone(), &path, |_, _| {
            called = true;
            true
        })
        .unwrap();
    assert!(selected.is_empty());
    assert!(!called);

    let path = resolver.resolve_str(None, "ct").unwrap();
    let selected = walker
        .select(g.tokens.clone(), &path, |value, _| value == FeatureValueRef::Text("UIMA"))
        .unwrap();
    assert_eq!(vec![g.tokens[3]], selected);
}
