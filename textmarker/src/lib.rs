//! # textmarker
//!
//! ルールベースのテキストアノテーションのための照合コアです。
//!
//! ## 概要
//!
//! このライブラリは、型付きのアノテーショングラフに対する素性パスの解決と走査、
//! およびトークン列をキーとする複数リストの辞書による最長一致を提供します。
//! 辞書はrkyvシリアライゼーションとzstd圧縮を用いたバイナリ形式で保存できます。
//!
//! ## 主な機能
//!
//! - **素性パスの解決**: `a.b[2].c`形式のパスを型システムに対して静的に解決し、
//!   型が決まらないセグメントは走査時まで束縛を遅延します
//! - **素性グラフの走査**: 参照、配列、被覆テキストをたどる収集モードと述語モード
//! - **複数リストの辞書**: 複数のソースリストを1つのトライに統合し、リストごとに
//!   独立した属性を保持します
//! - **最長一致**: 文書を1回走査して、リストごとまたは全体の最長一致を出力します
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use textmarker::dictionary::{DictionaryBuilder, DictionaryConfig, LexiconFormat, SourceList};
//! use textmarker::type_system::{PrimitiveKind, Range, TypeSystemBuilder, ANNOTATION_TYPE};
//! use textmarker::{Cas, FeatureGraphWalker, FeaturePathResolver, Matcher};
//!
//! let mut tsb = TypeSystemBuilder::new();
//! let person = tsb.add_type("Person", ANNOTATION_TYPE)?;
//! tsb.add_feature(person, "role", Range::Primitive(PrimitiveKind::String))?;
//! let ts = tsb.build();
//!
//! let mut builder = DictionaryBuilder::new(DictionaryConfig::default());
//! builder.add_list(
//!     SourceList::new("people.txt", "Person").with_column("role", PrimitiveKind::String),
//!     &LexiconFormat::default(),
//!     "Peter Kluegl;author\nMarshall Schor;committer\n".as_bytes(),
//! )?;
//! let matcher = Matcher::new(builder.build()?);
//!
//! let mut cas = Cas::new("Peter Kluegl: Ruta\nMarshall Schor: UIMA");
//! let mut worker = matcher.new_worker();
//! worker.reset_document(cas.text());
//! worker.scan();
//! let ids = worker.annotate(&mut cas, &ts)?;
//! assert_eq!(2, ids.len());
//!
//! let path = FeaturePathResolver::new(&ts).resolve_str(Some(person), "role")?;
//! let walker = FeatureGraphWalker::new(&ts, &cas);
//! let authors = walker.select(ids, &path, |value, _| value.as_str() == Some("author"))?;
//! assert_eq!(1, authors.len());
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// アノテーションのアリーナ
pub mod cas;

/// 辞書データ構造とビルダー
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 素性パスと解決
pub mod feature_path;

/// 辞書による最長一致
pub mod matcher;

/// 文書のトークン列表現
pub mod sentence;

/// 型システム
pub mod type_system;

/// 内部ユーティリティ関数
pub mod utils;

/// 素性グラフの走査
pub mod walker;


// Re-exports
pub use cas::{AnnotationId, AnnotationStore, Cas};
pub use dictionary::{Dictionary, DictionaryBuilder};
pub use feature_path::{FeaturePath, FeaturePathCache, FeaturePathResolver};
pub use matcher::{MatchScope, Matcher};
pub use type_system::{StaticTypeSystem, TypeSystem, TypeSystemBuilder};
pub use walker::FeatureGraphWalker;

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
