//! プレフィックス補完
//!
//! ファイルパスと実行コマンド名の最長共通プレフィックス補完。
//! 状態を持たず、ファイルシステムと PATH 環境変数のみを参照する。

use crate::file::{absolutize, is_dir, min_path};
use std::env;
use std::path::{Path, PathBuf};

/// 2つの文字列の最長共通プレフィックスを返す
pub fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// 補完エンジン
#[derive(Debug, Clone)]
pub struct Completer {
    /// 隠しファイルを候補に含めるか
    show_hidden: bool,
}

impl Completer {
    pub fn new(show_hidden: bool) -> Self {
        Self { show_hidden }
    }

    /// パスを補完する
    ///
    /// 親ディレクトリのエントリから最終セグメントをプレフィックスとして
    /// 絞り込み、共通プレフィックスまで延長する。候補が無ければ入力を
    /// そのまま返す。結果がディレクトリなら区切りを付加する。
    pub fn complete_path(&self, path: &str, dirs_only: bool) -> String {
        let abs = absolutize(path);
        let (dir, partial) = if path.is_empty() || path.ends_with('/') {
            (abs, String::new())
        } else {
            let partial = abs
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let dir = abs.parent().map(Path::to_path_buf).unwrap_or(abs);
            (dir, partial)
        };

        let Some(prefix) = self.match_entries(&dir, &partial, |name| {
            !dirs_only || is_dir(&dir.join(name))
        }) else {
            return path.to_string();
        };
        if prefix.is_empty() {
            return path.to_string();
        }

        let full = dir.join(&prefix);
        let full = full.to_string_lossy();
        if is_dir(Path::new(full.as_ref())) {
            format!("{}/", min_path(&full))
        } else {
            min_path(&full)
        }
    }

    /// コマンド名を PATH から補完する
    ///
    /// 全 PATH ディレクトリのエントリを走査し、マッチ全体の最長共通
    /// プレフィックスを返す。マッチが無ければ入力をそのまま返す。
    pub fn complete_command(&self, cmd: &str) -> String {
        let Some(path_var) = env::var_os("PATH") else {
            return cmd.to_string();
        };

        let mut prefix: Option<String> = None;
        for dir in env::split_paths(&path_var) {
            match self.fold_entries(&dir, cmd, prefix.take()) {
                Some(p) if p.is_empty() => return cmd.to_string(),
                p => prefix = p,
            }
        }

        match prefix {
            Some(p) if !p.is_empty() => p,
            _ => cmd.to_string(),
        }
    }

    /// コマンドライン全体の末尾トークンを補完する
    ///
    /// 先頭トークンはコマンド名として、以降のトークンはパスとして補完。
    pub fn complete_command_line(&self, line: &str) -> String {
        let token_start = line
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);

        if token_start == 0 {
            return self.complete_command(line);
        }

        let token = &line[token_start..];
        if token.is_empty() {
            return line.to_string();
        }
        format!(
            "{}{}",
            &line[..token_start],
            self.complete_path(token, false)
        )
    }

    /// ディレクトリのエントリをプレフィックスで絞り込み、
    /// 共通プレフィックスへ畳み込む
    fn match_entries<F: Fn(&str) -> bool>(
        &self,
        dir: &Path,
        partial: &str,
        keep: F,
    ) -> Option<String> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut prefix: Option<String> = None;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(partial) || !keep(&name) {
                continue;
            }
            if self.is_filtered_hidden(&name, partial) {
                continue;
            }
            prefix = Some(match prefix {
                None => name,
                Some(p) => {
                    let shared = common_prefix(&p, &name);
                    if shared.is_empty() {
                        return Some(String::new());
                    }
                    shared
                }
            });
        }
        prefix
    }

    /// 1ディレクトリ分のコマンド候補を既存プレフィックスへ畳み込む
    fn fold_entries(&self, dir: &PathBuf, cmd: &str, mut prefix: Option<String>) -> Option<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return prefix;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(cmd) {
                continue;
            }
            prefix = Some(match prefix {
                None => name,
                Some(p) => {
                    let shared = common_prefix(&p, &name);
                    if shared.is_empty() {
                        return Some(String::new());
                    }
                    shared
                }
            });
        }
        prefix
    }

    /// 隠しファイルの除外判定
    ///
    /// 明示的に `.` から入力している場合は除外しない。
    fn is_filtered_hidden(&self, name: &str, partial: &str) -> bool {
        !self.show_hidden && name.starts_with('.') && !partial.starts_with('.')
    }
}

impl Default for Completer {
    fn default() -> Self {
        Self::new(false)
    }
}
