//! コマンド履歴
//!
//! プロンプト種別ごとに独立した履歴を保持する。パーティションキーは
//! プロンプトラベルの先頭トークン。Up/Down での履歴ウォークは
//! カーソル位置で表現し、`cursor == None` が「ウォーク中でない」状態。

use std::collections::HashMap;

/// 1パーティション分の履歴
///
/// 不変条件: 空文字列は格納しない。同じ文字列が連続して並ぶことはない。
#[derive(Debug, Clone, Default)]
struct History {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl History {
    /// エントリを追加する
    ///
    /// 空文字列、および末尾と同じ文字列は追加しない。いずれの場合も
    /// ウォーク状態はリセットされる。
    fn append(&mut self, text: &str) {
        self.cursor = None;
        if text.is_empty() || self.entries.last().map(String::as_str) == Some(text) {
            return;
        }
        self.entries.push(text.to_string());
    }

    /// 1つ前のエントリを返す
    ///
    /// ウォーク開始時は編集中のテキストを仮エントリとして追加し、
    /// その直前を指す。前が無ければ入力をそのまま返す。
    fn prev(&mut self, in_progress: &str) -> String {
        match self.cursor {
            None => {
                let last = self.entries.len().checked_sub(1);
                self.append(in_progress);
                self.cursor = last;
            }
            Some(index) if index > 0 => {
                self.cursor = Some(index - 1);
            }
            Some(_) => {}
        }
        match self.cursor {
            Some(index) => self.entries[index].clone(),
            None => in_progress.to_string(),
        }
    }

    /// 1つ後のエントリを返す
    ///
    /// 末尾を越えたらウォークを終了し、空文字列（新規入力行）を返す。
    fn next(&mut self) -> String {
        let Some(index) = self.cursor else {
            return String::new();
        };
        if index + 1 >= self.entries.len() {
            self.cursor = None;
            return String::new();
        }
        self.cursor = Some(index + 1);
        self.entries[index + 1].clone()
    }
}

/// パーティションキーごとの履歴ストア
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    partitions: HashMap<String, History>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&mut self, key: &str) -> &mut History {
        self.partitions.entry(key.to_string()).or_default()
    }

    /// 送信されたテキストを履歴へ追加する
    ///
    /// アクションの成否に関わらず、送信時点で呼ばれる。
    pub fn append(&mut self, key: &str, text: &str) {
        self.partition(key).append(text);
    }

    /// 履歴を1つ遡る
    pub fn prev(&mut self, key: &str, in_progress: &str) -> String {
        self.partition(key).prev(in_progress)
    }

    /// 履歴を1つ進める
    pub fn next(&mut self, key: &str) -> String {
        self.partition(key).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_sequence() {
        let mut store = HistoryStore::new();
        store.append("Run:", "ls");
        store.append("Run:", "pwd");

        assert_eq!(store.prev("Run:", ""), "pwd");
        assert_eq!(store.prev("Run:", "pwd"), "ls");
        assert_eq!(store.next("Run:"), "pwd");
        assert_eq!(store.next("Run:"), "");
    }

    #[test]
    fn test_no_consecutive_duplicates() {
        let mut store = HistoryStore::new();
        store.append("Run:", "x");
        store.append("Run:", "x");

        assert_eq!(store.prev("Run:", ""), "x");
        assert_eq!(store.prev("Run:", "x"), "x");
    }

    #[test]
    fn test_prev_on_empty_history_returns_input() {
        let mut store = HistoryStore::new();
        assert_eq!(store.prev("Open:", "dra"), "dra");
    }

    #[test]
    fn test_in_progress_text_recoverable() {
        let mut store = HistoryStore::new();
        store.append("Run:", "ls");
        store.append("Run:", "pwd");

        assert_eq!(store.prev("Run:", "draft"), "pwd");
        assert_eq!(store.next("Run:"), "draft");
    }

    #[test]
    fn test_empty_string_never_stored() {
        let mut store = HistoryStore::new();
        store.append("Run:", "");
        assert_eq!(store.prev("Run:", "typed"), "typed");
    }

    #[test]
    fn test_partitions_are_independent() {
        let mut store = HistoryStore::new();
        store.append("Run:", "make");
        store.append("Find", "TODO");

        assert_eq!(store.prev("Find", ""), "TODO");
        assert_eq!(store.prev("Run:", ""), "make");
    }

    #[test]
    fn test_next_without_walking_is_empty() {
        let mut store = HistoryStore::new();
        store.append("Run:", "ls");
        assert_eq!(store.next("Run:"), "");
    }
}
