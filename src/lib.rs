//! sumi - 非同期シェル連携を備えた軽量モーダルテキストエディタ
//!
//! モジュール構成はコマンドサブシステムを中心に層別する。

// コアモジュール
pub mod app;
pub mod config;
pub mod error;
pub mod logging;

// データ層
pub mod buffer;
pub mod file;

// ロジック層
pub mod input;
pub mod minibuffer;
pub mod search;

// 非同期実行
pub mod event;
pub mod exec;

// 表示層
pub mod ui;

// 公開API
pub use app::App;
pub use config::EditorConfig;
pub use error::{Result, SumiError};
