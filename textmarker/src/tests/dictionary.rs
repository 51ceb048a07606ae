use std::fs;
use std::io::Write;

use sha2::{Digest, Sha256};
use tempfile::{tempdir, NamedTempFile};

use crate::dictionary::{
    AttributeValue, Dictionary, DictionaryBuilder, DictionaryConfig, Header, LexiconFormat,
    FORMAT_VERSION, MODEL_MAGIC,
};
use crate::errors::TextMarkerError;
use crate::matcher::Matcher;
use crate::tests::fixtures::{four_lists, typed_dictionary, typed_list, DOCUMENT};

type Observed = Vec<(String, String, Vec<AttributeValue>)>;

fn observe(dict: Dictionary) -> Observed {
    let matcher = Matcher::new(dict);
    let mut worker = matcher.new_worker();
    worker.reset_document(DOCUMENT);
    worker.scan();
    worker
        .match_iter()
        .map(|m| {
            (
                m.surface().to_string(),
                m.type_name().to_string(),
                m.attributes().to_vec(),
            )
        })
        .collect()
}

fn to_bytes(dict: &Dictionary) -> Vec<u8> {
    let mut buf = vec![];
    dict.write(&mut buf).unwrap();
    buf
}

fn assert_format_error(bytes: &[u8]) {
    match Dictionary::from_bytes(bytes) {
        Err(TextMarkerError::DictionaryFormat(_)) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("a corrupted dictionary was loaded"),
    }
}

/// 正しいダイジェストを持つ任意の本体からコンテナを作ります。
fn forge(body: &[u8], flags: u8) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend_from_slice(MODEL_MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.push(flags);
    buf.extend_from_slice(&Sha256::digest(body));
    buf.resize(64, 0xFF);
    buf.extend_from_slice(body);
    buf
}

#[test]
fn test_round_trip() {
    for compress in [true, false] {
        let expected = observe(typed_dictionary());
        assert_eq!(3, expected.len());

        let mut file = NamedTempFile::new().unwrap();
        typed_dictionary()
            .with_compression(compress)
            .write(&mut file)
            .unwrap();
        file.flush().unwrap();

        let loaded = Dictionary::from_path(file.path()).unwrap();
        assert_eq!(compress, loaded.compress());
        assert_eq!(3, loaded.num_entries());
        assert_eq!(1, loaded.lists().len());
        assert_eq!(typed_list(), loaded.lists()[0]);
        let original = typed_dictionary();
        for key in [["Peter", "Kluegl"], ["Marshall", "Schor"], ["Joern", "Kottmann"]] {
            assert_eq!(1, loaded.lookup(key).len());
            assert_eq!(original.lookup(key), loaded.lookup(key));
        }
        assert!(loaded.lookup(["Peter"]).is_empty());
        assert_eq!(expected, observe(loaded));
    }
}

#[test]
fn test_round_trip_four_lists() {
    let dict = four_lists(DictionaryConfig::default());
    let num_nodes = dict.num_nodes();
    let expected = observe(four_lists(DictionaryConfig::default()));

    let loaded = Dictionary::read(to_bytes(&dict).as_slice()).unwrap();
    assert_eq!(num_nodes, loaded.num_nodes());
    assert_eq!(12, loaded.num_entries());

    let keys: &[&[&str]] = &[
        &["Peter"],
        &["Kluegl"],
        &["Peter", "Kluegl"],
        &["Peter", "Kluegl", ":", "Ruta"],
        &["Marshall", "Schor", ":", "UIMA"],
        &["Joern", "Kottmann", ":", "CAS", "Editor"],
    ];
    for key in keys {
        assert!(!dict.lookup(key.iter()).is_empty(), "{key:?}");
        assert_eq!(dict.lookup(key.iter()), loaded.lookup(key.iter()), "{key:?}");
    }
    // Prefixes of keys are inner nodes without markers.
    let prefixes: &[&[&str]] = &[
        &["Peter", "Kluegl", ":"],
        &["Joern", "Kottmann", ":", "CAS"],
        &["Marshall", "Schor", ":"],
        &["Ruta"],
        &[],
    ];
    for prefix in prefixes {
        assert!(dict.lookup(prefix.iter()).is_empty(), "{prefix:?}");
        assert!(loaded.lookup(prefix.iter()).is_empty(), "{prefix:?}");
    }
    assert_eq!(
        vec![0, 2, 3],
        loaded
            .lookup(["Peter"])
            .iter()
            .chain(loaded.lookup(["Peter", "Kluegl"]))
            .chain(loaded.lookup(["Peter", "Kluegl", ":", "Ruta"]))
            .map(|m| m.list)
            .collect::<Vec<_>>()
    );
    assert_eq!(expected, observe(loaded));
}

#[test]
fn test_round_trip_keeps_case_folding() {
    let config = DictionaryConfig {
        case_sensitive: false,
        compress: false,
    };
    let bytes = to_bytes(&four_lists(config));
    let loaded = Dictionary::from_bytes(&bytes).unwrap();
    assert!(!loaded.case_sensitive());
    assert_eq!(1, loaded.lookup(["JOERN", "kottmann"]).len());
}

#[test]
fn test_compression_flag() {
    let dict = four_lists(DictionaryConfig::default());
    let compressed = to_bytes(&dict);
    let plain = to_bytes(&dict.with_compression(false));
    assert!(Header::parse(&compressed).unwrap().compressed);
    assert!(!Header::parse(&plain).unwrap().compressed);
    assert_ne!(compressed[64..], plain[64..]);
}

#[test]
fn test_truncated() {
    for compress in [true, false] {
        let bytes = to_bytes(&typed_dictionary().with_compression(compress));
        assert_format_error(&bytes[..bytes.len() - 10]);
        assert_format_error(&bytes[..64]);
        assert_format_error(&bytes[..20]);
        assert_format_error(&[]);
    }
}

#[test]
fn test_corrupted_body() {
    let mut bytes = to_bytes(&typed_dictionary().with_compression(false));
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert_format_error(&bytes);
}

#[test]
fn test_bad_magic() {
    let mut bytes = to_bytes(&typed_dictionary());
    bytes[0] = b'X';
    assert_format_error(&bytes);
}

#[test]
fn test_unknown_flags() {
    let mut bytes = to_bytes(&typed_dictionary());
    bytes[16] |= 0b10;
    assert_format_error(&bytes);
}

#[test]
fn test_forged_body() {
    // The digest matches, but the body is neither an archive nor a zstd stream.
    let garbage = vec![0xA5; 256];
    assert_format_error(&forge(&garbage, 0));
    assert_format_error(&forge(&garbage, 1));
    assert_format_error(&forge(&[], 0));
}

#[test]
fn test_load_all() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.mtwl");
    let bad = dir.path().join("bad.mtwl");
    let missing = dir.path().join("missing.mtwl");
    fs::write(&good, to_bytes(&typed_dictionary())).unwrap();
    fs::write(&bad, b"TextMarkerMTWL").unwrap();

    let report = Dictionary::load_all([&good, &bad, &missing, &dir.path().to_path_buf()]);
    assert_eq!(1, report.loaded.len());
    assert_eq!(good, report.loaded[0].0);
    assert_eq!(3, report.failed.len());
    assert!(matches!(report.failed[0].1, TextMarkerError::DictionaryFormat(_)));
    assert!(matches!(report.failed[1].1, TextMarkerError::StdIo(_)));
    assert!(matches!(report.failed[2].1, TextMarkerError::PathIsDirectory(_)));
}

#[test]
fn test_attribute_mismatch_diagnostics() {
    let text = "Peter Kluegl;first;true;6\nMarshall Schor;second;maybe;7\nJoern Kottmann;third;true;8.5\n";
    let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
    builder
        .add_list(typed_list(), &LexiconFormat::default(), text.as_bytes())
        .unwrap();

    let lines: Vec<usize> = builder.diagnostics().iter().map(|d| d.line).collect();
    assert_eq!(vec![2, 3], lines);
    assert!(builder.diagnostics()[0].to_string().starts_with("typed.txt:2:"));

    let dict = builder.build().unwrap();
    assert_eq!(1, dict.num_entries());
    assert!(dict.lookup(["Marshall", "Schor"]).is_empty());
    assert!(dict.lookup(["Joern", "Kottmann"]).is_empty());
    assert_eq!(1, dict.lookup(["Peter", "Kluegl"]).len());
}

#[test]
fn test_latin1_source() {
    let format = LexiconFormat {
        encoding: "ISO-8859-1".parse().unwrap(),
        ..LexiconFormat::default()
    };
    let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
    builder
        .add_list(
            crate::dictionary::SourceList::new("latin1.txt", "Name"),
            &format,
            &b"J\xF6rn Kottmann\n"[..],
        )
        .unwrap();
    let dict = builder.build().unwrap();
    assert_eq!(1, dict.lookup(["Jörn", "Kottmann"]).len());
}
