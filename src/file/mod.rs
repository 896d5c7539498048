//! ファイル・パス操作
//!
//! パスの展開（環境変数・ホームディレクトリ）、最短表記への変換、
//! ファイル全体の読み書きを提供する。バッファ内部の行末は常に LF で、
//! 読み込み時に検出したスタイルを保存時に復元する。

use crate::buffer::LineEnding;
use crate::error::{FileError, Result};
use std::env;
use std::path::{Component, Path, PathBuf};

/// 環境変数とホームディレクトリを展開する
///
/// 未定義の環境変数は入力のまま残す。`~/` はホームディレクトリに
/// 置き換える。
pub fn expand_vars(input: &str) -> String {
    let expanded =
        shellexpand::env_with_context_no_errors(input, |name| env::var(name).ok()).into_owned();
    match dirs::home_dir() {
        Some(home) => expanded.replace("~/", &format!("{}/", home.display())),
        None => expanded,
    }
}

/// パスを絶対パスへ変換して字句的に正規化する
pub fn absolutize(path: &str) -> PathBuf {
    let path = Path::new(path);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };
    clean(&joined)
}

/// `.` と `..` を字句的に解決する
fn clean(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(component.as_os_str());
                }
            }
            _ => result.push(component.as_os_str()),
        }
    }
    result
}

/// `base` から `target` への相対パスを計算する
fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let base_components: Vec<_> = base.components().collect();
    let target_components: Vec<_> = target.components().collect();

    let mut common = 0;
    for (a, b) in base_components.iter().zip(target_components.iter()) {
        if a == b {
            common += 1;
        } else {
            break;
        }
    }

    let mut result = PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &target_components[common..] {
        result.push(component.as_os_str());
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

/// パスの最短の妥当な表記を返す
///
/// 絶対パス・カレントディレクトリ相対・ホームディレクトリ相対（`~/`）の
/// うち、文字数が最も短いものを選ぶ。
pub fn min_path(path: &str) -> String {
    let abs = absolutize(path);
    let mut best = path.to_string();

    if let Ok(cwd) = env::current_dir() {
        let rel = relative_to(&clean(&cwd), &abs);
        let rel = rel.to_string_lossy();
        if rel.chars().count() < best.chars().count() {
            best = rel.into_owned();
        }
    }

    if let Some(home) = dirs::home_dir() {
        let rel = relative_to(&clean(&home), &abs);
        let rel = format!("~/{}", rel.display());
        if rel.chars().count() < best.chars().count() {
            best = rel;
        }
    }

    clean(Path::new(&best)).to_string_lossy().into_owned()
}

/// パスがディレクトリを指すか
pub fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// ファイル全体を読み込む
///
/// 行末スタイルを検出してバッファ用に LF へそろえ、末尾の改行を
/// 1つだけ取り除いて返す。
pub fn read_document(path: &str) -> Result<(String, LineEnding)> {
    let raw = std::fs::read_to_string(path).map_err(|source| FileError::Io {
        path: path.to_string(),
        source,
    })?;

    let ending = if raw.contains("\r\n") {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    };

    let mut text = match ending {
        LineEnding::CrLf => raw.replace("\r\n", "\n"),
        LineEnding::Lf => raw,
    };
    if text.ends_with('\n') {
        text.pop();
    }

    Ok((text, ending))
}

/// バッファ内容をファイルへ書き出す
///
/// 末尾に改行を1つ付け、記録された行末スタイルへ変換して書く。
pub fn write_document(path: &str, text: &str, ending: LineEnding) -> Result<()> {
    let mut contents = text.to_string();
    contents.push('\n');
    let contents = match ending {
        LineEnding::CrLf => contents.replace('\n', "\r\n"),
        LineEnding::Lf => contents,
    };
    std::fs::write(path, contents).map_err(|source| {
        FileError::Io {
            path: path.to_string(),
            source,
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_vars_env() {
        env::set_var("SUMI_TEST_DIR", "/opt/data");
        assert_eq!(expand_vars("$SUMI_TEST_DIR/file"), "/opt/data/file");
    }

    #[test]
    fn test_expand_vars_undefined_left_alone() {
        env::remove_var("SUMI_NO_SUCH_VAR");
        assert_eq!(expand_vars("$SUMI_NO_SUCH_VAR/x"), "$SUMI_NO_SUCH_VAR/x");
    }

    #[test]
    fn test_expand_vars_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = expand_vars("~/notes.txt");
            assert_eq!(expanded, format!("{}/notes.txt", home.display()));
        }
    }

    #[test]
    fn test_clean_resolves_dots() {
        assert_eq!(clean(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/home/user"), Path::new("/home/user/doc/a.txt")),
            PathBuf::from("doc/a.txt")
        );
        assert_eq!(
            relative_to(Path::new("/home/user/doc"), Path::new("/home/other")),
            PathBuf::from("../../other")
        );
        assert_eq!(
            relative_to(Path::new("/home/user"), Path::new("/home/user")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_min_path_prefers_relative() {
        let cwd = env::current_dir().unwrap();
        let deep = cwd.join("sub").join("file.txt");
        let minimal = min_path(&deep.to_string_lossy());
        assert_eq!(minimal, "sub/file.txt");
    }

    #[test]
    fn test_document_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let path_str = path.to_string_lossy().to_string();

        write_document(&path_str, "one\ntwo", LineEnding::Lf).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");

        let (text, ending) = read_document(&path_str).unwrap();
        assert_eq!(text, "one\ntwo");
        assert_eq!(ending, LineEnding::Lf);
    }

    #[test]
    fn test_crlf_detected_and_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dos.txt");
        let path_str = path.to_string_lossy().to_string();

        std::fs::write(&path, "one\r\ntwo\r\n").unwrap();
        let (text, ending) = read_document(&path_str).unwrap();
        assert_eq!(text, "one\ntwo");
        assert_eq!(ending, LineEnding::CrLf);

        write_document(&path_str, &text, ending).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\r\ntwo\r\n");
    }

    #[test]
    fn test_read_missing_file_is_error() {
        assert!(read_document("/nonexistent/sumi-missing.txt").is_err());
    }
}
