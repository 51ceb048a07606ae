//! ユーティリティ関数と型変換トレイトを提供するモジュール
//!
//! - `FromU32`: u32からの型変換トレイト
//! - 区切り文字付き行の解析と引用符処理

use csv_core::ReadFieldResult;

/// u32から他の型への変換を提供するトレイト
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// 区切り文字で区切られた1行を解析してフィールドのベクターに分割する
///
/// ダブルクォートで囲まれたフィールドや、フィールド内の区切り文字も正しく処理します。
/// 4096バイトを超えるフィールドは途中で分割されずに連結されます。
///
/// # 引数
///
/// * `row` - 解析する1行
/// * `delimiter` - フィールドの区切り文字(1バイト)
///
/// # 例
///
/// ```
/// # use textmarker::utils::parse_delimited_row;
/// let fields = parse_delimited_row("Peter Kluegl;first;true", b';');
/// assert_eq!(fields, vec!["Peter Kluegl", "first", "true"]);
///
/// let fields_with_quote = parse_delimited_row("\"Schor; Marshall\";UIMA", b';');
/// assert_eq!(fields_with_quote, vec!["Schor; Marshall", "UIMA"]);
/// ```
pub fn parse_delimited_row(row: &str, delimiter: u8) -> Vec<String> {
    let mut fields = vec![];
    let mut rdr = csv_core::ReaderBuilder::new().delimiter(delimiter).build();
    let mut bytes = row.as_bytes();
    let mut output = [0; 4096];
    let mut field = Vec::new();
    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        field.extend_from_slice(&output[..nout]);
        bytes = &bytes[nin..];
        match result {
            // An empty input on the next call tells the reader that the row ended.
            ReadFieldResult::InputEmpty | ReadFieldResult::OutputFull => continue,
            ReadFieldResult::Field { record_end } => {
                // The input is valid UTF-8 and csv_core only removes ASCII quotes.
                fields.push(String::from_utf8_lossy(&field).into_owned());
                field.clear();
                if record_end {
                    break;
                }
            }
            ReadFieldResult::End => break,
        }
    }
    fields
}

#[cfg(test)]
/// HashMapリテラルを簡潔に記述するためのマクロ
///
/// # 注意
///
/// このマクロはテスト時のみ利用可能です。
macro_rules! hashmap {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut h = hashbrown::HashMap::new();
            $(
                h.insert($k, $v);
            )*
            h
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        hashmap![$( $k => $v, )*]
    };
}

#[cfg(test)]
pub(crate) use hashmap;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimited_row() {
        assert_eq!(
            &["Joern Kottmann", "CAS Editor"],
            parse_delimited_row("Joern Kottmann;CAS Editor", b';').as_slice()
        );
    }

    #[test]
    fn test_parse_delimited_row_with_quote() {
        assert_eq!(
            &["Kluegl", "a;b"],
            parse_delimited_row("Kluegl;\"a;b\"", b';').as_slice()
        );
    }

    #[test]
    fn test_parse_delimited_row_trailing_empty() {
        assert_eq!(&["x", ""], parse_delimited_row("x,", b',').as_slice());
    }

    #[test]
    fn test_parse_delimited_row_single() {
        assert_eq!(&["Peter"], parse_delimited_row("Peter", b';').as_slice());
    }
}
