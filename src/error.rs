//! エラーハンドリング
//!
//! エディタ全体で使用する統一されたエラー型を定義する。
//! 同期的に検出した失敗はステータス行へ、バックグラウンドで検出した失敗は
//! ログへ送る（呼び出し元が既に居ないため）。

use thiserror::Error;

/// アプリケーション全体のエラー型
#[derive(Error, Debug)]
pub enum SumiError {
    /// ファイル操作エラー
    #[error(transparent)]
    File(#[from] FileError),

    /// 外部プロセス実行エラー
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// 端末・描画エラー
    #[error("terminal error during {operation}: {source}")]
    Terminal {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// 設定エラー
    #[error("config error: {0}")]
    Config(String),

    /// アプリケーション論理エラー
    #[error("{0}")]
    Application(String),
}

/// ファイル操作固有のエラー
#[derive(Error, Debug)]
pub enum FileError {
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 外部プロセス実行固有のエラー
///
/// いずれもジョブ開始前に同期的に検出されるもの。開始後の失敗は
/// イベント経由で届く。
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open pipe for \"{command}\"")]
    Pipe { command: String },
}

impl From<std::io::Error> for SumiError {
    fn from(error: std::io::Error) -> Self {
        SumiError::File(FileError::Io {
            path: String::new(),
            source: error,
        })
    }
}

/// パニックハンドラの設定
///
/// raw mode 中のパニックはスタックトレースごと画面を壊すため、
/// 端末を復旧してから出力する。
pub fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen
        );
        default_hook(panic_info);
    }));
}

/// プロジェクト標準のResult型
pub type Result<T> = std::result::Result<T, SumiError>;
