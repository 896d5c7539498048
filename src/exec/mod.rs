//! 外部プロセスの非同期実行
//!
//! run / pipe / keyword-lookup の3種のジョブを背景スレッドで実行し、
//! 結果をイベントブリッジ経由でUIスレッドへ届ける。プロセス起動前に
//! 分かる失敗（spawn失敗）だけは呼び出し元へ同期的に返し、起動後の
//! 失敗はステータスイベントかログになる。
//!
//! ジョブごとのスレッド構成: 標準入力へ書くスレッド、標準出力を読む
//! スレッド、終了を待って結果を発行するスレッド。互いに共有するのは
//! プロセスハンドルだけで、結果はチャネルでのみ受け渡す。

use crate::error::{ExecError, Result};
use crate::event::EventSender;
use anyhow::Context;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

/// コマンドインタプリタの起動形
#[cfg(not(windows))]
const SHELL: (&str, &str) = ("/bin/sh", "-c");
#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/c");

/// ジョブ実行器
///
/// 起動したスレッドを保持し、シャットダウン時に待機するか
/// 放棄するかを選べるようにする。キャンセルは無い。
#[derive(Debug)]
pub struct JobRunner {
    sender: EventSender,
    jobs: Vec<JoinHandle<()>>,
    /// 新しいエディタプロセスへ引き継ぐ引数
    child_args: Vec<String>,
}

impl JobRunner {
    pub fn new(sender: EventSender, child_args: Vec<String>) -> Self {
        Self {
            sender,
            jobs: Vec::new(),
            child_args,
        }
    }

    /// コマンドラインをシェル経由で実行する
    ///
    /// 標準出力と標準エラーをまとめて捕捉し、終了時にステータス
    /// イベントを発行する。出力が空でなければ一時ファイルへ書き、
    /// それを開く新しいエディタセッションを起動してから削除する。
    pub fn run(&mut self, command_line: &str) -> Result<()> {
        let mut child = shell_command(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: command_line.to_string(),
                source,
            })?;

        let sender = self.sender.clone();
        let command = command_line.to_string();
        let child_args = self.child_args.clone();

        self.track(thread::spawn(move || {
            let output = collect_output(&mut child);
            let status = child.wait();
            report_exit_status(&sender, &command, status);

            if !output.is_empty() {
                if let Err(e) = open_in_new_session(&output, &child_args) {
                    log::error!("run output for \"{command}\": {e:#}");
                }
            }
        }));

        Ok(())
    }

    /// 選択テキストをコマンドの標準入力へ流し、出力を受け取る
    ///
    /// 終了時にステータスイベントを発行し、出力が空でなければ
    /// （末尾の改行を1つ除いて）PipeResult イベントを発行する。
    pub fn pipe(&mut self, command_line: &str, selection: String) -> Result<()> {
        let mut child = shell_command(command_line)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: command_line.to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ExecError::Pipe {
            command: command_line.to_string(),
        })?;

        let sender = self.sender.clone();
        let command = command_line.to_string();

        self.track(thread::spawn(move || {
            let writer = spawn_stdin_writer(stdin, selection);
            let output = collect_stdout(&mut child);

            report_exit_status(&sender, &command, child.wait());
            join_logged(writer, "stdin writer");

            if !output.is_empty() {
                sender.post_pipe_result(strip_trailing_newline(output));
            }
        }));

        Ok(())
    }

    /// キーワード検索プログラムを実行する
    ///
    /// カーソル位置（行・桁）を引数に、バッファ全文を標準入力へ渡す。
    /// 成功すれば出力を、失敗すればエラーをステータスイベントで届ける。
    pub fn keyword_lookup(
        &mut self,
        program: &str,
        buffer_snapshot: String,
        line: usize,
        col: usize,
    ) -> Result<()> {
        let mut child = Command::new(program)
            .arg(line.to_string())
            .arg(col.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: program.to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ExecError::Pipe {
            command: program.to_string(),
        })?;

        let sender = self.sender.clone();
        let program = program.to_string();

        self.track(thread::spawn(move || {
            let writer = spawn_stdin_writer(stdin, buffer_snapshot);
            let output = collect_stdout(&mut child);

            let status = child.wait();
            join_logged(writer, "stdin writer");

            match status {
                Ok(s) if s.success() => {
                    sender.post_status(strip_trailing_newline(output));
                }
                other => report_exit_status(&sender, &program, other),
            }
        }));

        Ok(())
    }

    /// 指定パスを開く新しいエディタプロセスを起動する
    ///
    /// 完了は待たない。起動の失敗のみ同期的に返す。
    pub fn new_instance(&self, path: &str) -> Result<()> {
        let exe = std::env::current_exe().map_err(|source| ExecError::Spawn {
            command: "new editor instance".to_string(),
            source,
        })?;
        Command::new(exe)
            .args(&self.child_args)
            .arg(path)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                command: path.to_string(),
                source,
            })?;
        Ok(())
    }

    /// 実行中のジョブ数
    pub fn active_jobs(&self) -> usize {
        self.jobs.iter().filter(|j| !j.is_finished()).count()
    }

    /// シャットダウン
    ///
    /// `wait` が真なら全ジョブの完了を待ち、偽なら放棄する。
    pub fn shutdown(&mut self, wait: bool) {
        for job in self.jobs.drain(..) {
            if wait {
                join_logged(job, "job");
            }
        }
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        // 終了済みのハンドルを掃除してから積む
        self.jobs.retain(|j| !j.is_finished());
        self.jobs.push(handle);
    }
}

fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new(SHELL.0);
    command.arg(SHELL.1).arg(command_line);
    command
}

/// 標準入力へ書き込んで閉じるスレッドを起動する
fn spawn_stdin_writer(
    mut stdin: std::process::ChildStdin,
    payload: String,
) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = stdin
            .write_all(payload.as_bytes())
            .context("writing job stdin")
        {
            log::error!("{e:#}");
        }
        // drop で閉じ、子プロセスへ EOF を伝える
    })
}

/// 標準出力を読み切るスレッドを起動し、結果を回収する
///
/// 読み取りエラーは空出力として扱い、ログにだけ残す。
fn collect_stdout(child: &mut Child) -> Vec<u8> {
    let Some(mut stdout) = child.stdout.take() else {
        return Vec::new();
    };
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = stdout.read_to_end(&mut buf).context("reading job stdout") {
            log::error!("{e:#}");
        }
        buf
    });
    reader.join().unwrap_or_default()
}

/// 標準出力と標準エラーをまとめて読み切る
fn collect_output(child: &mut Child) -> Vec<u8> {
    let stderr = child.stderr.take();
    let err_reader = stderr.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf).context("reading job stderr") {
                log::error!("{e:#}");
            }
            buf
        })
    });

    let mut output = collect_stdout(child);
    if let Some(reader) = err_reader {
        output.extend(reader.join().unwrap_or_default());
    }
    output
}

/// 終了ステータスをイベントとして報告する
fn report_exit_status(
    sender: &EventSender,
    command: &str,
    status: std::io::Result<ExitStatus>,
) {
    let message = match status {
        Ok(s) if s.success() => format!("Command \"{command}\" exited successfully."),
        Ok(s) => format!("Command \"{command}\" exited with error: {s}"),
        Err(e) => format!("Command \"{command}\" exited with error: {e}"),
    };
    sender.post_status(message);
}

/// 出力を一時ファイルへ書き、新しいエディタセッションで開く
///
/// セッションの起動を待ってから一時ファイルを削除する。削除の失敗は
/// 報告しない。
fn open_in_new_session(output: &[u8], child_args: &[String]) -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new().context("creating temp file")?;
    file.write_all(output).context("writing temp file")?;

    let exe = std::env::current_exe().context("locating editor executable")?;
    Command::new(exe)
        .args(child_args)
        .arg(file.path())
        .status()
        .context("launching editor session")?;
    // file の drop で一時ファイルは削除される
    Ok(())
}

fn strip_trailing_newline(mut output: Vec<u8>) -> String {
    if output.last() == Some(&b'\n') {
        output.pop();
    }
    String::from_utf8_lossy(&output).into_owned()
}

fn join_logged(handle: JoinHandle<()>, what: &str) {
    if handle.join().is_err() {
        log::error!("{what} thread panicked");
    }
}
