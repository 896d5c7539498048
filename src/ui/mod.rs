//! 画面描画
//!
//! テキスト領域と最下行のステータス行を描く。ステータス行は
//! プロンプトモード中はラベルと入力テキストに置き換わる。
//! グリフ配置やテーマは扱わない。

use ratatui::layout::{Constraint, Layout, Position};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

/// プロンプト表示の内容
#[derive(Debug)]
pub struct PromptView<'a> {
    pub label: &'a str,
    pub input: &'a str,
    /// 入力内のカーソル位置（文字単位）
    pub cursor: usize,
}

/// 1フレーム分の描画内容
#[derive(Debug)]
pub struct View<'a> {
    /// バッファ全文
    pub text: &'a str,
    /// 選択範囲（文字オフセット、バッファ順）
    pub selection: (usize, usize),
    /// 挿入位置（文字オフセット）
    pub cursor: usize,
    /// 表示する最初の行（1始まり）
    pub first_line: usize,
    pub tab_width: usize,
    pub status: &'a str,
    pub prompt: Option<PromptView<'a>>,
}

/// 画面全体を描画する
pub fn draw(frame: &mut Frame, view: &View) {
    let [text_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    let rows = text_area.height as usize;
    let mut lines = Vec::with_capacity(rows);
    let mut cursor_pos: Option<(u16, u16)> = None;

    let mut offset = 0usize;
    for (index, raw_line) in view.text.split('\n').enumerate() {
        let line_no = index + 1;
        let line_chars = raw_line.chars().count();
        if line_no >= view.first_line && line_no < view.first_line + rows {
            let row = (line_no - view.first_line) as u16;
            lines.push(render_line(raw_line, offset, view));
            if view.prompt.is_none() && view.cursor >= offset && view.cursor <= offset + line_chars
            {
                let col = display_width(raw_line, view.cursor - offset, view.tab_width);
                cursor_pos = Some((text_area.x + col as u16, text_area.y + row));
            }
        }
        offset += line_chars + 1;
    }

    frame.render_widget(Paragraph::new(lines), text_area);

    // ステータス行
    let status_style = Style::default().add_modifier(Modifier::REVERSED);
    match &view.prompt {
        Some(prompt) => {
            let line = Line::from(vec![
                Span::raw(prompt.label),
                Span::raw(prompt.input),
            ]);
            frame.render_widget(Paragraph::new(line).style(status_style), status_area);
            let col = display_width(prompt.label, prompt.label.chars().count(), 1)
                + display_width(prompt.input, prompt.cursor, 1);
            cursor_pos = Some((status_area.x + col as u16, status_area.y));
        }
        None => {
            let (line_no, col_no) = position_of(view.text, view.cursor);
            let right = format!("{},{}  {}", line_no, col_no, scroll_indicator(view, rows));
            let left_width = status_area.width as usize;
            let padding = left_width
                .saturating_sub(view.status.chars().count())
                .saturating_sub(right.chars().count());
            let line = Line::from(vec![
                Span::raw(view.status),
                Span::raw(" ".repeat(padding)),
                Span::raw(right),
            ]);
            frame.render_widget(Paragraph::new(line).style(status_style), status_area);
        }
    }

    if let Some((x, y)) = cursor_pos {
        frame.set_cursor_position(Position { x, y });
    }
}

/// 1行をタブ展開と選択ハイライト付きで組み立てる
fn render_line<'a>(raw_line: &'a str, line_offset: usize, view: &View<'a>) -> Line<'a> {
    let (sel_start, sel_end) = view.selection;
    let mut plain = String::new();
    let mut selected = String::new();
    let mut spans = Vec::new();
    let mut col = 0usize;

    let flush = |spans: &mut Vec<Span<'a>>, text: &mut String, highlight: bool| {
        if text.is_empty() {
            return;
        }
        let content = std::mem::take(text);
        if highlight {
            spans.push(Span::styled(
                content,
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        } else {
            spans.push(Span::raw(content));
        }
    };

    for (i, ch) in raw_line.chars().enumerate() {
        let in_selection = {
            let at = line_offset + i;
            at >= sel_start && at < sel_end
        };
        let target = if in_selection {
            flush(&mut spans, &mut plain, false);
            &mut selected
        } else {
            flush(&mut spans, &mut selected, true);
            &mut plain
        };
        if ch == '\t' {
            let next_stop = view.tab_width - col % view.tab_width;
            target.push_str(&" ".repeat(next_stop));
            col += next_stop;
        } else {
            target.push(ch);
            col += ch.width().unwrap_or(0);
        }
    }
    flush(&mut spans, &mut plain, false);
    flush(&mut spans, &mut selected, true);
    Line::from(spans)
}

/// 行内の文字位置までの表示幅を計算する
fn display_width(line: &str, char_col: usize, tab_width: usize) -> usize {
    let mut width = 0usize;
    for ch in line.chars().take(char_col) {
        if ch == '\t' {
            width += tab_width - width % tab_width;
        } else {
            width += ch.width().unwrap_or(0);
        }
    }
    width
}

/// 文字オフセットの (行, 桁) 表示位置（どちらも1始まりの行、0始まりの桁）
fn position_of(text: &str, cursor: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 0usize;
    for ch in text.chars().take(cursor) {
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// スクロール位置の表示（全体が収まるなら "All"）
fn scroll_indicator(view: &View, rows: usize) -> String {
    let total = view.text.split('\n').count();
    if total <= rows {
        "All".to_string()
    } else {
        let beyond = total - rows;
        let first = (view.first_line - 1).min(beyond);
        format!("{}%", first * 100 / beyond)
    }
}
