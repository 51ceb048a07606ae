//! エラー型の定義
//!
//! このモジュールは、textmarkerライブラリで使用されるすべてのエラー型を定義します。
//! 静的に検出できる設定ミス(未知の素性名、壊れた辞書ファイル)は読み込み時に
//! エラーとして報告され、実行時の疎な素性グラフはエラーになりません。

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// textmarker専用のResult型
///
/// エラー型としてデフォルトで[`TextMarkerError`]を使用します。
pub type Result<T, E = TextMarkerError> = std::result::Result<T, E>;

/// textmarkerのエラー型
#[derive(Debug, thiserror::Error)]
pub enum TextMarkerError {
    /// 無効な引数エラー
    #[error(transparent)]
    InvalidArgument(InvalidArgumentError),

    /// 無効なフォーマットエラー
    ///
    /// 辞書のソースファイル(リスト)全体を読めない場合に使用されます。
    #[error(transparent)]
    InvalidFormat(InvalidFormatError),

    /// 素性パスの解決エラー
    ///
    /// ルールの束縛時に発生し、そのルールの読み込みのみを中断します。
    #[error(transparent)]
    FeatureResolution(FeatureResolutionError),

    /// 素性グラフ走査中の型エラー
    ///
    /// 一回のマッチ試行のみを中断します。
    #[error(transparent)]
    WalkType(WalkTypeError),

    /// バイナリ辞書のフォーマットエラー
    ///
    /// その辞書リソースの読み込みのみを中断します。
    #[error(transparent)]
    DictionaryFormat(DictionaryFormatError),

    /// 整数変換エラー
    #[error(transparent)]
    TryFromInt(std::num::TryFromIntError),

    /// ディレクトリが指定されたエラー
    #[error("The path '{0}' is a directory, but a file was expected.")]
    PathIsDirectory(PathBuf),

    /// I/Oエラー
    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    /// rkyvシリアライゼーションエラー
    #[error(transparent)]
    Rkyv(#[from] rkyv::rancor::Error),
}

impl TextMarkerError {
    /// 無効な引数エラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - 引数の名前
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    /// 無効なフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `arg` - フォーマット名(ソースリストの名前など)
    /// * `msg` - エラーメッセージ
    pub(crate) fn invalid_format<N, S>(arg: N, msg: S) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        Self::InvalidFormat(InvalidFormatError {
            arg: arg.into(),
            msg: msg.into(),
        })
    }

    /// 素性パスの解決エラーを生成します
    ///
    /// # 引数
    ///
    /// * `feature` - 解決できなかったセグメント
    /// * `type_name` - 検査対象だった型の名前。型が存在しない場合は`None`
    /// * `msg` - エラーメッセージ
    pub(crate) fn feature_resolution<F, S>(feature: F, type_name: Option<&str>, msg: S) -> Self
    where
        F: Into<String>,
        S: Into<String>,
    {
        Self::FeatureResolution(FeatureResolutionError {
            feature: feature.into(),
            type_name: type_name.map(str::to_string),
            msg: msg.into(),
        })
    }

    /// 走査中の型エラーを生成します
    pub(crate) fn walk_type<S>(type_name: &str, feature: &str, value_kind: S) -> Self
    where
        S: Into<String>,
    {
        Self::WalkType(WalkTypeError {
            type_name: type_name.to_string(),
            feature: feature.to_string(),
            value_kind: value_kind.into(),
        })
    }

    /// バイナリ辞書のフォーマットエラーを生成します
    ///
    /// # 引数
    ///
    /// * `msg` - エラーメッセージ
    /// * `cause` - エラーの原因
    pub(crate) fn dictionary_format<S, M>(msg: S, cause: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Self::DictionaryFormat(DictionaryFormatError {
            msg: msg.into(),
            cause: cause.into(),
        })
    }
}

/// 引数が無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// 引数の名前
    pub(crate) arg: &'static str,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// 入力フォーマットが無効な場合に使用されるエラー
#[derive(Debug)]
pub struct InvalidFormatError {
    /// フォーマットの名前
    pub(crate) arg: String,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl fmt::Display for InvalidFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidFormatError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidFormatError {}

/// 素性パスを型システムに対して解決できない場合のエラー
///
/// 静的に既知の型に存在しない素性名、または`coveredText`の後に続くセグメントで発生します。
#[derive(Debug)]
pub struct FeatureResolutionError {
    /// 解決できなかったセグメント
    pub(crate) feature: String,

    /// 検査対象の型
    pub(crate) type_name: Option<String>,

    /// エラーメッセージ
    pub(crate) msg: String,
}

impl FeatureResolutionError {
    /// 解決できなかったセグメントを返します。
    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// 検査対象だった型の名前を返します。
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
}

impl fmt::Display for FeatureResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.type_name {
            Some(type_name) => write!(
                f,
                "FeatureResolutionError: {} of type {}: {}",
                self.feature, type_name, self.msg
            ),
            None => write!(f, "FeatureResolutionError: {}: {}", self.feature, self.msg),
        }
    }
}

impl Error for FeatureResolutionError {}

/// 解決済みのアクセサが、残りのチェーンがあるにもかかわらず
/// プリミティブでも参照でも配列でもない値に到達した場合のエラー
#[derive(Debug)]
pub struct WalkTypeError {
    /// 値を保持していたアノテーションの型
    pub(crate) type_name: String,

    /// アクセスした素性
    pub(crate) feature: String,

    /// 到達した値の種類
    pub(crate) value_kind: String,
}

impl fmt::Display for WalkTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "WalkTypeError: {} value of {}:{} is not supported in a feature path",
            self.value_kind, self.type_name, self.feature
        )
    }
}

impl Error for WalkTypeError {}

/// バイナリ辞書が壊れている、または切り詰められている場合のエラー
#[derive(Debug)]
pub struct DictionaryFormatError {
    /// エラーメッセージ
    pub(crate) msg: String,

    /// エラーの根本原因
    pub(crate) cause: String,
}

impl fmt::Display for DictionaryFormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cause.is_empty() {
            write!(f, "DictionaryFormatError: {}", self.msg)
        } else {
            write!(f, "DictionaryFormatError: {}: {}", self.msg, self.cause)
        }
    }
}

impl Error for DictionaryFormatError {}

impl From<std::num::TryFromIntError> for TextMarkerError {
    fn from(error: std::num::TryFromIntError) -> Self {
        Self::TryFromInt(error)
    }
}
