//! イベントブリッジ
//!
//! バックグラウンドスレッドから単一のUIスレッドへ結果を運ぶ経路。
//! ペイロードは型付きチャネルへムーブされるため、送信後から受信までの
//! 間にどのスレッドも参照を持たない。UIスレッドの唯一のブロック点は
//! `wait` である。
//!
//! 端末入力も専用スレッドで読み取り、同じチャネルへ流す。これにより
//! キー入力とジョブ完了が1本のFIFOで直列化される。ただし順序が保証
//! されるのは同一送信者の中だけで、別ジョブ同士のイベントは任意に
//! 交錯する。

pub mod pause;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// UIスレッドへ配送されるイベント
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// 端末からの入力イベント
    Input(crossterm::event::Event),
    /// ジョブのステータス通知
    Status(String),
    /// パイプジョブの出力本体
    PipeResult(String),
}

/// イベントの送信側
///
/// ジョブごとに clone してバックグラウンドスレッドへ渡す。
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<AppEvent>,
}

impl EventSender {
    /// イベントを送る
    ///
    /// 受信側が既に終了している場合は捨てる（シャットダウン中の
    /// ジョブ完了は届け先がない）。
    pub fn post(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("event dropped: consumer is gone");
        }
    }

    pub fn post_status(&self, status: String) {
        self.post(AppEvent::Status(status));
    }

    pub fn post_pipe_result(&self, output: String) {
        self.post(AppEvent::PipeResult(output));
    }
}

/// イベントブリッジ本体（受信側はUIスレッドが専有する）
#[derive(Debug)]
pub struct EventBridge {
    tx: Sender<AppEvent>,
    rx: Receiver<AppEvent>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// 次のイベントを待つ（ブロッキング）
    pub fn wait(&self) -> Option<AppEvent> {
        self.rx.recv().ok()
    }

    /// タイムアウト付きでイベントを待つ
    pub fn wait_timeout(&self, timeout: Duration) -> Option<AppEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 端末入力をブリッジへ転送するスレッドを起動する
    ///
    /// `crossterm::event::read` は中断できないため、このスレッドは
    /// プロセス終了時にそのまま破棄される。
    pub fn spawn_input_thread(&self) -> thread::JoinHandle<()> {
        let sender = self.sender();
        thread::spawn(move || loop {
            match crossterm::event::read() {
                Ok(event) => sender.post(AppEvent::Input(event)),
                Err(e) => {
                    log::error!("terminal input read failed: {e}");
                    break;
                }
            }
        })
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}
