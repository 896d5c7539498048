//! モーダルコマンド入力
//!
//! プロンプト状態機械を実装する。Normal モードでは何も保持せず、
//! Prompt モード中はキー入力が1行の入力テキストを組み立てる。
//! Tab が補完、Up/Down が履歴ウォーク、Enter が送信、Escape が取消。
//! 送信後のアクション実行（検索・ファイル操作・ジョブ起動）は
//! 呼び出し側のディスパッチャが行う。

pub mod completion;
pub mod history;

pub use completion::{common_prefix, Completer};
pub use history::HistoryStore;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// プロンプトの種類
///
/// 閉じた列挙。表示ラベルは固定の文字列リテラルで、ユーザーとの
/// 互換性契約として変更しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    ChangeDir,
    FindForward,
    FindBackward,
    GoToLine,
    Open,
    OpenNew,
    Pipe,
    ReallyOpen,
    ReallyQuit,
    Run,
    SaveAs,
    KeywordLookup,
}

impl PromptKind {
    /// 表示用のプロンプトラベル
    pub fn label(&self) -> &'static str {
        match self {
            PromptKind::ChangeDir => "Change directory to: ",
            PromptKind::FindForward => "Find forward: ",
            PromptKind::FindBackward => "Find backward: ",
            PromptKind::GoToLine => "Go to line: ",
            PromptKind::Open => "Open: ",
            PromptKind::OpenNew => "Open in new window: ",
            PromptKind::Pipe => "Pipe selection through: ",
            PromptKind::ReallyOpen => "Really open (y/n)? ",
            PromptKind::ReallyQuit => "Really quit (y/n)? ",
            PromptKind::Run => "Run: ",
            PromptKind::SaveAs => "Save as: ",
            PromptKind::KeywordLookup => "Keyword lookup: ",
        }
    }

    /// 履歴のパーティションキー（ラベルの先頭トークン）
    pub fn history_key(&self) -> &'static str {
        self.label()
            .split_whitespace()
            .next()
            .unwrap_or_default()
    }
}

/// ミニバッファの動作モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Prompt(PromptKind),
}

/// キー処理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSignal {
    /// 入力継続
    Continue,
    /// Enterで送信された
    Submitted(PromptKind, String),
    /// Escapeで取り消された
    Cancelled,
}

/// モーダル入力の状態機械
#[derive(Debug)]
pub struct Minibuffer {
    mode: Mode,
    input: String,
    /// カーソル位置（文字単位）
    cursor: usize,
    history: HistoryStore,
    completer: Completer,
}

impl Minibuffer {
    pub fn new(completer: Completer) -> Self {
        Self {
            mode: Mode::Normal,
            input: String::new(),
            cursor: 0,
            history: HistoryStore::new(),
            completer,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// プロンプト入力がフォーカスを持っているか
    pub fn is_active(&self) -> bool {
        matches!(self.mode, Mode::Prompt(_))
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// プロンプトモードへ遷移する
    ///
    /// 既に同じ種類のプロンプトが開いている場合は何もしない。
    pub fn enter(&mut self, kind: PromptKind) {
        if self.mode == Mode::Prompt(kind) {
            return;
        }
        self.mode = Mode::Prompt(kind);
        self.input.clear();
        self.cursor = 0;
    }

    /// プロンプトを取り消して Normal へ戻る
    pub fn cancel(&mut self) {
        self.mode = Mode::Normal;
        self.input.clear();
        self.cursor = 0;
    }

    /// プロンプトモード中のキー入力を処理する
    pub fn handle_key(&mut self, key: KeyEvent) -> PromptSignal {
        let Mode::Prompt(kind) = self.mode else {
            return PromptSignal::Continue;
        };

        match key.code {
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.input);
                self.cursor = 0;
                self.mode = Mode::Normal;
                // 送信時点で履歴へ記録する。アクションが失敗しても
                // 入力は呼び出せるようにしておく。
                self.history.append(kind.history_key(), &text);
                PromptSignal::Submitted(kind, text)
            }
            KeyCode::Esc => {
                self.cancel();
                PromptSignal::Cancelled
            }
            KeyCode::Tab => {
                self.complete(kind);
                PromptSignal::Continue
            }
            KeyCode::Up => {
                let recalled = self.history.prev(kind.history_key(), &self.input);
                self.set_input(recalled);
                PromptSignal::Continue
            }
            KeyCode::Down => {
                let recalled = self.history.next(kind.history_key());
                self.set_input(recalled);
                PromptSignal::Continue
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                let byte = self.byte_at(self.cursor);
                self.input.insert(byte, ch);
                self.cursor += 1;
                PromptSignal::Continue
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let byte = self.byte_at(self.cursor - 1);
                    self.input.remove(byte);
                    self.cursor -= 1;
                }
                PromptSignal::Continue
            }
            KeyCode::Delete => {
                if self.cursor < self.input.chars().count() {
                    let byte = self.byte_at(self.cursor);
                    self.input.remove(byte);
                }
                PromptSignal::Continue
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                PromptSignal::Continue
            }
            KeyCode::Right => {
                if self.cursor < self.input.chars().count() {
                    self.cursor += 1;
                }
                PromptSignal::Continue
            }
            KeyCode::Home => {
                self.cursor = 0;
                PromptSignal::Continue
            }
            KeyCode::End => {
                self.cursor = self.input.chars().count();
                PromptSignal::Continue
            }
            _ => PromptSignal::Continue,
        }
    }

    /// プロンプト種別に応じた補完を適用する
    fn complete(&mut self, kind: PromptKind) {
        let completed = match kind {
            PromptKind::ChangeDir => self.completer.complete_path(&self.input, true),
            PromptKind::Open | PromptKind::OpenNew | PromptKind::SaveAs => {
                self.completer.complete_path(&self.input, false)
            }
            PromptKind::Run | PromptKind::Pipe => {
                self.completer.complete_command_line(&self.input)
            }
            _ => return,
        };
        self.set_input(completed);
    }

    fn set_input(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.input = text;
    }

    fn byte_at(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
