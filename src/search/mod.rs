//! 正規表現検索と行選択
//!
//! 検索プロンプトでコンパイルしたパターンを保持し、繰り返し検索で
//! 再利用する。前方検索は選択範囲の終端から、後方検索は始端から。

use crate::buffer::TextBuffer;
use regex::Regex;

/// 前方検索が失敗したときのステータス
pub const NO_FORWARD_MATCH: &str = "No forward match.";
/// 後方検索が失敗したときのステータス
pub const NO_BACKWARD_MATCH: &str = "No backward match.";

/// 検索状態
///
/// 直近にコンパイルしたパターンを繰り返し検索のために保持する。
#[derive(Debug, Default)]
pub struct SearchState {
    pattern: Option<Regex>,
    forward: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self {
            pattern: None,
            forward: true,
        }
    }

    /// パターンをコンパイルして保持する
    ///
    /// コンパイルに失敗した場合は何も保持せずエラーを返す。
    pub fn compile(&mut self, pattern: &str, forward: bool) -> Result<(), regex::Error> {
        let re = Regex::new(pattern)?;
        self.pattern = Some(re);
        self.forward = forward;
        Ok(())
    }

    /// 保持しているパターンで検索する
    ///
    /// 成功時は `default_status`、失敗時は方向に応じたメッセージを返す。
    /// パターン未設定なら案内を返す。
    pub fn find(&self, buffer: &mut TextBuffer, default_status: &str) -> String {
        match &self.pattern {
            Some(re) => find(buffer, re, self.forward, default_status),
            None => "No pattern to find.".to_string(),
        }
    }

    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }
}

/// バッファを検索し、マッチへ選択を移動する
///
/// 前方検索は選択範囲の終端からバッファ末尾まで、後方検索は先頭から
/// 選択範囲の始端までを対象に、後方では最後のマッチを採用する。
/// マッチしなければ選択は動かさない。
pub fn find(buffer: &mut TextBuffer, re: &Regex, forward: bool, default_status: &str) -> String {
    let (sel_start, sel_end) = buffer.selection_range();

    if forward {
        let text = buffer.slice(sel_end, buffer.len_chars());
        match re.find(&text) {
            Some(m) => {
                let start = sel_end + text[..m.start()].chars().count();
                let end = sel_end + text[..m.end()].chars().count();
                buffer.set_marks(start, end);
                buffer.separate();
            }
            None => return NO_FORWARD_MATCH.to_string(),
        }
    } else {
        let text = buffer.slice(0, sel_start);
        match re.find_iter(&text).last() {
            Some(m) => {
                let start = text[..m.start()].chars().count();
                let end = text[..m.end()].chars().count();
                buffer.set_marks(start, end);
                buffer.separate();
            }
            None => return NO_BACKWARD_MATCH.to_string(),
        }
    }

    default_status.to_string()
}

/// 指定行を選択する
///
/// 行頭の空白を除いた最初の文字から、行の論理的な末尾までを選択する。
pub fn select_line(buffer: &mut TextBuffer, line: usize) {
    let line = line.max(1).min(buffer.line_count());
    let mut start = buffer.line_start(line);
    let end = buffer.line_end(line);

    let text = buffer.slice(start, end);
    for ch in text.chars() {
        if !ch.is_whitespace() {
            break;
        }
        start += 1;
    }

    buffer.set_marks(start, end);
}

/// 整数リテラルを解析する
///
/// 符号と `0x`/`0o`/`0b` プレフィックスを受け付ける。
pub fn parse_line_number(input: &str) -> Result<i64, String> {
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };

    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or(rest.strip_prefix("0X")) {
        (16, hex)
    } else if let Some(oct) = rest.strip_prefix("0o").or(rest.strip_prefix("0O")) {
        (8, oct)
    } else if let Some(bin) = rest.strip_prefix("0b").or(rest.strip_prefix("0B")) {
        (2, bin)
    } else {
        (10, rest)
    };

    match i64::from_str_radix(digits, radix) {
        Ok(value) if negative => Ok(-value),
        Ok(value) => Ok(value),
        Err(e) => Err(format!("invalid line number \"{input}\": {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LineEnding;

    fn buffer(text: &str) -> TextBuffer {
        TextBuffer::from_text(text.to_string(), LineEnding::Lf)
    }

    #[test]
    fn test_find_forward_from_cursor() {
        let mut buf = buffer("xxabcyy");
        let re = Regex::new("abc").unwrap();

        let status = find(&mut buf, &re, true, "title");
        assert_eq!(status, "title");
        assert_eq!(buf.selection_range(), (2, 5));

        // 以降にマッチが無ければ選択は変わらない
        let status = find(&mut buf, &re, true, "title");
        assert_eq!(status, NO_FORWARD_MATCH);
        assert_eq!(buf.selection_range(), (2, 5));
    }

    #[test]
    fn test_find_backward_takes_last_match() {
        let mut buf = buffer("ab ab ab");
        buf.set_cursor(buf.len_chars());
        let re = Regex::new("ab").unwrap();

        let status = find(&mut buf, &re, false, "title");
        assert_eq!(status, "title");
        assert_eq!(buf.selection_range(), (6, 8));

        let status = find(&mut buf, &re, false, "title");
        assert_eq!(status, "title");
        assert_eq!(buf.selection_range(), (3, 5));
    }

    #[test]
    fn test_find_backward_no_match() {
        let mut buf = buffer("hello");
        let re = Regex::new("h").unwrap();
        // カーソルが先頭なので後方には何もない
        let status = find(&mut buf, &re, false, "title");
        assert_eq!(status, NO_BACKWARD_MATCH);
        assert_eq!(buf.selection_range(), (0, 0));
    }

    #[test]
    fn test_find_multibyte_offsets() {
        let mut buf = buffer("あいabう");
        let re = Regex::new("ab").unwrap();
        find(&mut buf, &re, true, "t");
        assert_eq!(buf.selection_range(), (2, 4));
        assert_eq!(buf.selection_text(), "ab");
    }

    #[test]
    fn test_search_state_repeat() {
        let mut buf = buffer("one two one");
        let mut state = SearchState::new();
        state.compile("one", true).unwrap();

        assert_eq!(state.find(&mut buf, "t"), "t");
        assert_eq!(buf.selection_range(), (0, 3));
        assert_eq!(state.find(&mut buf, "t"), "t");
        assert_eq!(buf.selection_range(), (8, 11));
    }

    #[test]
    fn test_search_state_without_pattern() {
        let mut buf = buffer("abc");
        let state = SearchState::new();
        assert_eq!(state.find(&mut buf, "t"), "No pattern to find.");
    }

    #[test]
    fn test_invalid_pattern_keeps_none() {
        let mut state = SearchState::new();
        assert!(state.compile("(", true).is_err());
        assert!(!state.has_pattern());
    }

    #[test]
    fn test_select_line_skips_leading_whitespace() {
        let mut buf = buffer("first\n   indented line\nlast");
        select_line(&mut buf, 2);
        assert_eq!(buf.selection_text(), "indented line");
    }

    #[test]
    fn test_select_line_clamps() {
        let mut buf = buffer("only");
        select_line(&mut buf, 99);
        assert_eq!(buf.selection_text(), "only");
    }

    #[test]
    fn test_parse_line_number_forms() {
        assert_eq!(parse_line_number("42").unwrap(), 42);
        assert_eq!(parse_line_number("-7").unwrap(), -7);
        assert_eq!(parse_line_number("0x10").unwrap(), 16);
        assert_eq!(parse_line_number("0o17").unwrap(), 15);
        assert_eq!(parse_line_number("0b101").unwrap(), 5);
        assert!(parse_line_number("abc").is_err());
        assert!(parse_line_number("").is_err());
    }
}
