//! エディタ設定
//!
//! タブ幅やキーワード検索プログラムなどの設定値を保持する。
//! 設定はグローバル状態ではなく、起動時に各コンポーネントへ
//! 明示的に渡される。優先順位はデフォルト ← 設定ファイル ← コマンドライン。

use crate::error::{Result, SumiError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// タブ幅のデフォルト値
const DEFAULT_TAB_WIDTH: usize = 8;

/// エディタ全体の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Tabキーでスペースを挿入するか
    pub expand_tabs: bool,
    /// タブ幅（カラム数）
    pub tab_width: usize,
    /// キーワード検索に使う外部プログラム
    pub keyword_program: Option<String>,
    /// 補完で隠しファイルを表示するか
    pub show_hidden_files: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            expand_tabs: false,
            tab_width: DEFAULT_TAB_WIDTH,
            keyword_program: None,
            show_hidden_files: false,
        }
    }
}

impl EditorConfig {
    /// 設定ファイルを読み込む
    ///
    /// ファイルが存在しなければデフォルト値を返す。壊れた設定ファイルは
    /// エラーとして報告する（黙って無視すると原因究明が難しい）。
    pub fn load() -> Result<Self> {
        let Some(path) = Self::config_path() else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    /// 指定したパスから設定を読み込む
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SumiError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| SumiError::Config(format!("{}: {}", path.display(), e)))
    }

    /// 設定ファイルのパス（`~/.config/sumi/config.json`）
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sumi").join("config.json"))
    }

    /// コマンドライン引数を適用する
    ///
    /// 戻り値は開くファイルのパス（あれば）。
    pub fn apply_args<I: Iterator<Item = String>>(&mut self, args: I) -> Result<Option<String>> {
        let mut file_arg = None;
        let mut iter = args.peekable();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--expandtab" => self.expand_tabs = true,
                "--tabstop" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| SumiError::Config("--tabstop requires a value".into()))?;
                    self.tab_width = value
                        .parse()
                        .map_err(|_| SumiError::Config(format!("invalid tab width: {value}")))?;
                }
                "--kwprog" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| SumiError::Config("--kwprog requires a value".into()))?;
                    self.keyword_program = Some(value);
                }
                "--hidden" => self.show_hidden_files = true,
                _ if arg.starts_with('-') => {
                    return Err(SumiError::Config(format!("unknown option: {arg}")));
                }
                _ => file_arg = Some(arg),
            }
        }

        self.clamp();
        Ok(file_arg)
    }

    /// 新しいエディタプロセスへ引き継ぐ引数列を生成する
    pub fn child_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.expand_tabs {
            args.push("--expandtab".to_string());
        }
        if self.tab_width != DEFAULT_TAB_WIDTH {
            args.push("--tabstop".to_string());
            args.push(self.tab_width.to_string());
        }
        if let Some(prog) = &self.keyword_program {
            args.push("--kwprog".to_string());
            args.push(prog.clone());
        }
        if self.show_hidden_files {
            args.push("--hidden".to_string());
        }
        args
    }

    /// 設定値を妥当な範囲に収める
    fn clamp(&mut self) {
        if self.tab_width < 1 {
            self.tab_width = 1;
        }
    }
}
