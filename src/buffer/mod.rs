//! テキストバッファ
//!
//! 編集対象のテキストと、選択範囲を表す2つのマーク（選択アンカーと
//! 挿入位置）を保持する。位置はすべて文字単位のオフセット。
//! Undo履歴は `separate` で区切られたグループ単位で巻き戻す。

/// 記録された行末スタイル
///
/// 読み込み時に検出し、保存時に復元する。バッファ内部は常に LF。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// 1回の編集操作
#[derive(Debug, Clone)]
enum Edit {
    Insert { at: usize, text: String },
    Delete { at: usize, text: String },
}

/// テキストバッファ本体
#[derive(Debug, Clone)]
pub struct TextBuffer {
    contents: String,
    /// 選択アンカー（文字オフセット）
    sel: usize,
    /// 挿入位置（文字オフセット）
    ins: usize,
    modified: bool,
    line_ending: LineEnding,
    undo_stack: Vec<Vec<Edit>>,
    redo_stack: Vec<Vec<Edit>>,
    /// 区切られていない編集グループ
    pending: Vec<Edit>,
}

impl TextBuffer {
    /// 空のバッファを作成
    pub fn new() -> Self {
        Self::from_text(String::new(), LineEnding::Lf)
    }

    /// テキストからバッファを作成
    pub fn from_text(contents: String, line_ending: LineEnding) -> Self {
        Self {
            contents,
            sel: 0,
            ins: 0,
            modified: false,
            line_ending,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.contents
    }

    pub fn len_chars(&self) -> usize {
        self.contents.chars().count()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, le: LineEnding) {
        self.line_ending = le;
    }

    fn char_to_byte(&self, at: usize) -> usize {
        self.contents
            .char_indices()
            .nth(at)
            .map(|(i, _)| i)
            .unwrap_or(self.contents.len())
    }

    /// バイトオフセットを文字オフセットへ変換
    pub fn byte_to_char(&self, byte: usize) -> usize {
        self.contents[..byte.min(self.contents.len())].chars().count()
    }

    /// 範囲のテキストを取得（文字オフセット、半開区間）
    pub fn slice(&self, start: usize, end: usize) -> String {
        let start_b = self.char_to_byte(start);
        let end_b = self.char_to_byte(end.max(start));
        self.contents[start_b..end_b].to_string()
    }

    /// テキストを挿入
    pub fn insert(&mut self, at: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = at.min(self.len_chars());
        let byte = self.char_to_byte(at);
        self.contents.insert_str(byte, text);
        self.pending.push(Edit::Insert {
            at,
            text: text.to_string(),
        });
        self.redo_stack.clear();
        self.modified = true;

        let inserted = text.chars().count();
        self.sel = Self::shift(self.sel, at, 0, inserted);
        self.ins = Self::shift(self.ins, at, 0, inserted);
    }

    /// 範囲を削除して削除したテキストを返す
    pub fn delete(&mut self, start: usize, end: usize) -> String {
        let (start, end) = order(start, end);
        let end = end.min(self.len_chars());
        if start >= end {
            return String::new();
        }
        let start_b = self.char_to_byte(start);
        let end_b = self.char_to_byte(end);
        let removed: String = self.contents[start_b..end_b].to_string();
        self.contents.replace_range(start_b..end_b, "");
        self.pending.push(Edit::Delete {
            at: start,
            text: removed.clone(),
        });
        self.redo_stack.clear();
        self.modified = true;

        let deleted = end - start;
        self.sel = Self::shift(self.sel, start, deleted, 0);
        self.ins = Self::shift(self.ins, start, deleted, 0);
        removed
    }

    fn shift(mark: usize, at: usize, deleted: usize, inserted: usize) -> usize {
        if mark < at {
            mark
        } else if mark < at + deleted {
            at
        } else {
            mark - deleted + inserted
        }
    }

    /// マークを設定
    pub fn set_marks(&mut self, sel: usize, ins: usize) {
        let len = self.len_chars();
        self.sel = sel.min(len);
        self.ins = ins.min(len);
    }

    /// 挿入位置のみ移動（選択解除）
    pub fn set_cursor(&mut self, at: usize) {
        let at = at.min(self.len_chars());
        self.sel = at;
        self.ins = at;
    }

    pub fn sel_mark(&self) -> usize {
        self.sel
    }

    pub fn ins_mark(&self) -> usize {
        self.ins
    }

    /// 選択範囲をバッファ順で返す
    pub fn selection_range(&self) -> (usize, usize) {
        order(self.sel, self.ins)
    }

    /// 選択中のテキストを返す
    pub fn selection_text(&self) -> String {
        let (start, end) = self.selection_range();
        self.slice(start, end)
    }

    /// 選択範囲を置換し、置換後のテキストを選択する
    pub fn replace_selection(&mut self, text: &str) {
        let (start, end) = self.selection_range();
        self.delete(start, end);
        self.insert(start, text);
        self.set_marks(start, start + text.chars().count());
    }

    /// 行数（1始まり。空バッファは1行）
    pub fn line_count(&self) -> usize {
        self.contents.matches('\n').count() + 1
    }

    /// 指定行の先頭の文字オフセット（1始まり、範囲外は端に丸める）
    pub fn line_start(&self, line: usize) -> usize {
        let line = line.max(1);
        let mut current = 1;
        for (offset, ch) in self.contents.chars().enumerate() {
            if current == line {
                return offset;
            }
            if ch == '\n' {
                current += 1;
                if current == line {
                    return offset + 1;
                }
            }
        }
        if current >= line {
            0
        } else {
            self.len_chars()
        }
    }

    /// 指定行の論理的な行末の文字オフセット（改行は含まない）
    pub fn line_end(&self, line: usize) -> usize {
        let start = self.line_start(line);
        let mut end = start;
        for ch in self.contents.chars().skip(start) {
            if ch == '\n' {
                break;
            }
            end += 1;
        }
        end
    }

    /// 文字オフセットを (行, 桁) へ変換（行は1始まり、桁は0始まり）
    pub fn line_col(&self, at: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 0;
        for ch in self.contents.chars().take(at) {
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    /// Undoの区切りを入れる
    pub fn separate(&mut self) {
        if !self.pending.is_empty() {
            let group = std::mem::take(&mut self.pending);
            self.undo_stack.push(group);
        }
    }

    /// 直前の編集グループを取り消す
    pub fn undo(&mut self) -> bool {
        self.separate();
        let Some(group) = self.undo_stack.pop() else {
            return false;
        };
        for edit in group.iter().rev() {
            match edit {
                Edit::Insert { at, text } => {
                    let count = text.chars().count();
                    let byte_start = self.char_to_byte(*at);
                    let byte_end = self.char_to_byte(*at + count);
                    self.contents.replace_range(byte_start..byte_end, "");
                    self.set_cursor(*at);
                }
                Edit::Delete { at, text } => {
                    let byte = self.char_to_byte(*at);
                    self.contents.insert_str(byte, text);
                    self.set_cursor(*at + text.chars().count());
                }
            }
        }
        self.redo_stack.push(group);
        self.modified = true;
        true
    }

    /// 取り消した編集グループをやり直す
    pub fn redo(&mut self) -> bool {
        let Some(group) = self.redo_stack.pop() else {
            return false;
        };
        for edit in group.iter() {
            match edit {
                Edit::Insert { at, text } => {
                    let byte = self.char_to_byte(*at);
                    self.contents.insert_str(byte, text);
                    self.set_cursor(*at + text.chars().count());
                }
                Edit::Delete { at, text } => {
                    let count = text.chars().count();
                    let byte_start = self.char_to_byte(*at);
                    let byte_end = self.char_to_byte(*at + count);
                    self.contents.replace_range(byte_start..byte_end, "");
                    self.set_cursor(*at);
                }
            }
        }
        self.undo_stack.push(group);
        self.modified = true;
        true
    }

    /// Undo履歴を破棄する
    pub fn reset_undo(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending.clear();
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn reset_modified(&mut self) {
        self.modified = false;
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// 2つのオフセットをバッファ順に並べる
pub fn order(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
