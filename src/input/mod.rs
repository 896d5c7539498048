//! キー入力の解釈
//!
//! Normal モードでのキーイベントをエディタのアクションへ対応付ける。
//! プロンプトモード中のキーはミニバッファが直接処理するため、
//! ここを通らない。

use crate::minibuffer::PromptKind;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// カーソル移動の方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    PageUp,
    PageDown,
    BufferStart,
    BufferEnd,
}

/// Normal モードのアクション
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// プロンプトを開く
    Prompt(PromptKind),
    /// 上書き保存（タイトルのパスへ）
    Save,
    /// 保持中のパターンで検索を繰り返す
    RepeatFind,
    /// キーワード検索を即時実行
    KeywordLookup,
    /// 終了（未保存なら確認を挟む）
    Quit,
    Undo,
    Redo,
    /// カーソル移動。`select` が真なら選択を延長する
    Move(Movement, bool),
    InsertChar(char),
    InsertNewline,
    InsertTab,
    DeleteBackward,
    DeleteForward,
}

/// キーマップ
#[derive(Debug, Default)]
pub struct KeyMap;

impl KeyMap {
    pub fn new() -> Self {
        Self
    }

    /// キーイベントをアクションへ変換する
    pub fn action_for(&self, key: KeyEvent) -> Option<Action> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        if ctrl {
            return match key.code {
                KeyCode::Char('d') => Some(Action::Prompt(PromptKind::ChangeDir)),
                KeyCode::Char('f') => Some(Action::Prompt(PromptKind::FindForward)),
                KeyCode::Char('r') => Some(Action::Prompt(PromptKind::FindBackward)),
                KeyCode::Char('l') => Some(Action::Prompt(PromptKind::GoToLine)),
                KeyCode::Char('o') => Some(Action::Prompt(PromptKind::Open)),
                KeyCode::Char('n') => Some(Action::Prompt(PromptKind::OpenNew)),
                KeyCode::Char('p') => Some(Action::Prompt(PromptKind::Pipe)),
                KeyCode::Char('e') => Some(Action::Prompt(PromptKind::Run)),
                KeyCode::Char('s') => Some(Action::Save),
                KeyCode::Char('g') => Some(Action::RepeatFind),
                KeyCode::Char('k') => Some(Action::KeywordLookup),
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Char('z') => Some(Action::Undo),
                KeyCode::Char('y') => Some(Action::Redo),
                KeyCode::Home => Some(Action::Move(Movement::BufferStart, shift)),
                KeyCode::End => Some(Action::Move(Movement::BufferEnd, shift)),
                _ => None,
            };
        }

        if alt {
            return match key.code {
                KeyCode::Char('s') => Some(Action::Prompt(PromptKind::SaveAs)),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Left => Some(Action::Move(Movement::Left, shift)),
            KeyCode::Right => Some(Action::Move(Movement::Right, shift)),
            KeyCode::Up => Some(Action::Move(Movement::Up, shift)),
            KeyCode::Down => Some(Action::Move(Movement::Down, shift)),
            KeyCode::Home => Some(Action::Move(Movement::LineStart, shift)),
            KeyCode::End => Some(Action::Move(Movement::LineEnd, shift)),
            KeyCode::PageUp => Some(Action::Move(Movement::PageUp, shift)),
            KeyCode::PageDown => Some(Action::Move(Movement::PageDown, shift)),
            KeyCode::Enter => Some(Action::InsertNewline),
            KeyCode::Tab => Some(Action::InsertTab),
            KeyCode::Backspace => Some(Action::DeleteBackward),
            KeyCode::Delete => Some(Action::DeleteForward),
            KeyCode::F(3) => Some(Action::RepeatFind),
            KeyCode::F(1) => Some(Action::KeywordLookup),
            KeyCode::Char(ch) => Some(Action::InsertChar(ch)),
            _ => None,
        }
    }
}
