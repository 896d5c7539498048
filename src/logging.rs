//! 開発用ロギング
//!
//! TUI が端末を占有するため、診断出力はファイルへ書き出す。
//! バックグラウンドジョブ内の失敗（spawn 後の I/O エラーなど）は
//! ここへ記録されるだけで、ユーザーには表示されない。

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// デフォルトのログ出力先（`~/.sumi/sumi.log`）
fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".sumi").join("sumi.log"))
}

/// ロガーを初期化する
///
/// ログファイルが開けない環境（ホームディレクトリなし等）では
/// ロギングなしで続行する。エディタ本体の動作には影響しない。
pub fn init(level: log::LevelFilter) {
    let Some(path) = default_log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return;
        }
    }

    let Ok(file) = fern::log_file(&path) else {
        return;
    };

    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                timestamp_ms(),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(file)
        .apply();

    if result.is_ok() {
        log::info!("sumi {} started", env!("CARGO_PKG_VERSION"));
    }
}

fn timestamp_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_millis())
        .unwrap_or_default()
}
