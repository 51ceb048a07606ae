//! 入力テキストのトークン列表現を提供するモジュール
//!
//! 辞書の照合はトークン単位で行われます。このモジュールは入力文字列を
//! シードトークンに分割し、各トークンのバイト位置と(大文字小文字を区別しない
//! 照合のための)正規化済みの表層形を保持します。
//!
//! 分割規則:
//! - 空白は読み飛ばします
//! - 連続する英字(`char::is_alphabetic`)は1トークンです
//! - 連続する数字(`char::is_numeric`)は1トークンです
//! - それ以外の文字(句読点・記号)は1文字で1トークンです

use std::ops::Range;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Alpha,
    Numeric,
    Other,
}

impl CharClass {
    #[inline(always)]
    fn of(c: char) -> Self {
        if c.is_whitespace() {
            Self::Space
        } else if c.is_alphabetic() {
            Self::Alpha
        } else if c.is_numeric() {
            Self::Numeric
        } else {
            Self::Other
        }
    }

    #[inline(always)]
    const fn groupable(self) -> bool {
        matches!(self, Self::Alpha | Self::Numeric)
    }
}

/// 入力テキストのトークン列
#[derive(Default, Clone, Debug)]
pub struct Sentence {
    input: String,
    spans: Vec<Range<usize>>,
    folded: Vec<String>,
}

impl Sentence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内部状態をクリアします
    #[inline(always)]
    pub fn clear(&mut self) {
        self.input.clear();
        self.spans.clear();
        self.folded.clear();
    }

    /// 入力文字列を設定します
    ///
    /// 既存の内部状態をクリアします。分割を行うには [`compile`](Self::compile)
    /// を呼び出す必要があります。
    pub fn set_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.clear();
        self.input.push_str(input.as_ref());
    }

    /// 入力文字列をトークンに分割します
    ///
    /// # 引数
    ///
    /// * `case_sensitive` - `false`の場合、各トークンの小文字化した表層形も計算します
    pub fn compile(&mut self, case_sensitive: bool) {
        self.spans.clear();
        self.folded.clear();
        tokenize_into(&self.input, &mut self.spans);
        if !case_sensitive {
            for span in &self.spans {
                self.folded.push(self.input[span.clone()].to_lowercase());
            }
        }
    }

    #[inline(always)]
    pub fn raw(&self) -> &str {
        &self.input
    }

    #[inline(always)]
    pub fn len_tokens(&self) -> usize {
        self.spans.len()
    }

    /// 照合に使うトークンの表層形
    #[inline(always)]
    pub fn token(&self, i: usize) -> &str {
        match self.folded.get(i) {
            Some(folded) => folded,
            None => &self.input[self.spans[i].clone()],
        }
    }

    /// トークン`[start, end)`が覆うバイト範囲
    #[inline(always)]
    pub fn byte_range(&self, start: usize, end: usize) -> Range<usize> {
        debug_assert!(start < end);
        self.spans[start].start..self.spans[end - 1].end
    }
}

/// 文字列をシードトークンのバイト範囲に分割します。
pub(crate) fn tokenize_into(input: &str, spans: &mut Vec<Range<usize>>) {
    let mut current: Option<(CharClass, usize)> = None;
    for (pos, c) in input.char_indices() {
        let class = CharClass::of(c);
        if let Some((cur, start)) = current {
            if cur == class && class.groupable() {
                continue;
            }
            spans.push(start..pos);
            current = None;
        }
        if class != CharClass::Space {
            current = Some((class, pos));
        }
    }
    if let Some((_, start)) = current {
        spans.push(start..input.len());
    }
}

/// 文字列をシードトークンの表層形に分割します。
///
/// # 例
///
/// ```
/// use textmarker::sentence::tokenize;
///
/// assert_eq!(vec!["Peter", "Kluegl", ":", "Ruta"], tokenize("Peter Kluegl: Ruta"));
/// ```
pub fn tokenize(input: &str) -> Vec<&str> {
    let mut spans = vec![];
    tokenize_into(input, &mut spans);
    spans.into_iter().map(|r| &input[r]).collect()
}
