//! PATH 依存のコマンド補完テスト
//!
//! プロセス全体の PATH を書き換えるため、1つのテスト関数に集約する。

use std::env;
use std::fs;
use sumi::minibuffer::Completer;

#[test]
fn complete_command_over_controlled_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("echo"), "").unwrap();
    fs::write(dir.path().join("ed"), "").unwrap();

    env::set_var("PATH", dir.path());
    let completer = Completer::default();

    // echo と ed が曖昧なので入力のまま
    assert_eq!(completer.complete_command("e"), "e");
    // ec から先は echo しかない
    assert_eq!(completer.complete_command("ec"), "echo");
    // マッチなしは入力のまま
    assert_eq!(completer.complete_command("zz"), "zz");

    // ed を除けば e だけで echo まで延びる
    fs::remove_file(dir.path().join("ed")).unwrap();
    assert_eq!(completer.complete_command("e"), "echo");

    // 複数の PATH ディレクトリのエントリも1つに畳み込まれる
    let dir2 = tempfile::tempdir().unwrap();
    fs::write(dir2.path().join("echo-server"), "").unwrap();
    let joined = env::join_paths([dir.path(), dir2.path()]).unwrap();
    env::set_var("PATH", &joined);
    assert_eq!(completer.complete_command("e"), "echo");

    // コマンドラインの先頭トークンはコマンドとして補完される
    assert_eq!(completer.complete_command_line("echo-"), "echo-server");
}
