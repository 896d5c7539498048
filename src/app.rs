//! メインアプリケーション
//!
//! 全コンポーネントを束ね、単一のUIスレッドでイベントループを回す。
//! バッファ・プロンプト状態・履歴・補完はすべてこのスレッドだけが
//! 触るため、ロックは不要。ブロックするのはイベント待ちの1点のみで、
//! ジョブの完了もキー入力も同じブリッジから届く。

use crate::buffer::TextBuffer;
use crate::config::EditorConfig;
use crate::error::{Result, SumiError};
use crate::event::{AppEvent, EventBridge};
use crate::exec::JobRunner;
use crate::file;
use crate::input::{Action, KeyMap, Movement};
use crate::minibuffer::{Completer, Minibuffer, Mode, PromptKind, PromptSignal};
use crate::search::{self, SearchState};
use crate::ui::{self, PromptView, View};
use crossterm::event::{Event, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::stdout;

/// 引数なしで起動したときの仮タイトル
const UNTITLED: &str = "untitled";

/// メインアプリケーション
pub struct App {
    running: bool,
    config: EditorConfig,
    buffer: TextBuffer,
    /// 表示タイトル。保存先のパスを兼ねる
    title: String,
    /// まだ保存先が決まっていないか
    untitled: bool,
    status: String,
    minibuffer: Minibuffer,
    search: SearchState,
    bridge: EventBridge,
    runner: JobRunner,
    keymap: KeyMap,
    /// 表示する最初の行（1始まり）
    first_line: usize,
    /// 直近の描画で確保されたテキスト行数
    view_rows: usize,
}

impl App {
    /// アプリケーションを作成する
    ///
    /// ファイル引数があれば読み込み、読めなければ新規文書として扱う。
    pub fn new(config: EditorConfig, file_arg: Option<String>) -> Self {
        let bridge = EventBridge::new();
        let runner = JobRunner::new(bridge.sender(), config.child_args());
        let completer = Completer::new(config.show_hidden_files);

        let (buffer, title, untitled, status) = match file_arg {
            Some(arg) => {
                let expanded = file::expand_vars(&arg);
                let title = file::min_path(&expanded);
                match file::read_document(&expanded) {
                    Ok((text, ending)) => {
                        let status = format!("Opened \"{title}\".");
                        (TextBuffer::from_text(text, ending), title, false, status)
                    }
                    Err(_) => {
                        let status = format!("New file: \"{title}\".");
                        (TextBuffer::new(), title, false, status)
                    }
                }
            }
            None => (
                TextBuffer::new(),
                UNTITLED.to_string(),
                true,
                format!("New file: \"{UNTITLED}\"."),
            ),
        };

        Self {
            running: true,
            config,
            buffer,
            title,
            untitled,
            status,
            minibuffer: Minibuffer::new(completer),
            search: SearchState::new(),
            bridge,
            runner,
            keymap: KeyMap::new(),
            first_line: 1,
            view_rows: 24,
        }
    }

    /// 端末を初期化してイベントループを実行する
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().map_err(|source| SumiError::Terminal {
            operation: "enable raw mode",
            source,
        })?;
        execute!(stdout(), EnterAlternateScreen).map_err(|source| SumiError::Terminal {
            operation: "enter alternate screen",
            source,
        })?;
        let backend = CrosstermBackend::new(stdout());
        let mut terminal = Terminal::new(backend).map_err(|source| SumiError::Terminal {
            operation: "create terminal",
            source,
        })?;

        self.bridge.spawn_input_thread();
        let result = self.event_loop(&mut terminal);

        // ジョブは完了を待たず放棄する（結果の届け先がもう無い）
        self.runner.shutdown(false);
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen);
        result
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<()> {
        while self.running {
            terminal
                .draw(|frame| {
                    let rows = frame.area().height.saturating_sub(1) as usize;
                    self.view_rows = rows.max(1);
                    self.scroll_to_cursor();
                    ui::draw(frame, &self.build_view());
                })
                .map_err(|source| SumiError::Terminal {
                    operation: "draw",
                    source,
                })?;

            let Some(event) = self.bridge.wait() else {
                break;
            };
            self.apply_event(event);
        }
        Ok(())
    }

    /// ブリッジからイベントを1つ取り出して処理する
    ///
    /// 端末なしでイベントループを回すための入口。イベントを処理したら
    /// 真を返す。
    pub fn pump(&mut self, timeout: std::time::Duration) -> bool {
        match self.bridge.wait_timeout(timeout) {
            Some(event) => {
                self.apply_event(event);
                true
            }
            None => false,
        }
    }

    /// イベントを1つ処理する
    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(Event::Key(key)) => self.handle_key(key),
            AppEvent::Input(_) => {}
            AppEvent::Status(status) => {
                // プロンプト入力中のステータスは捨てる（キューもしない）
                if self.minibuffer.is_active() {
                    log::debug!("status suppressed: {status}");
                } else {
                    self.status = status;
                }
            }
            AppEvent::PipeResult(output) => self.splice_pipe_result(output),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if self.minibuffer.is_active() {
            match self.minibuffer.handle_key(key) {
                PromptSignal::Submitted(kind, text) => self.submit(kind, &text),
                PromptSignal::Cancelled => self.status = self.title.clone(),
                PromptSignal::Continue => {}
            }
            return;
        }

        if let Some(action) = self.keymap.action_for(key) {
            self.handle_action(action);
        }
    }

    /// Normal モードのアクションを実行する
    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Prompt(kind) => self.request_prompt(kind),
            Action::Save => self.save(),
            Action::RepeatFind => {
                self.status = self.search.find(&mut self.buffer, &self.title);
            }
            Action::KeywordLookup => self.submit(PromptKind::KeywordLookup, ""),
            Action::Quit => self.request_quit(),
            Action::Undo => {
                self.buffer.undo();
            }
            Action::Redo => {
                self.buffer.redo();
            }
            Action::Move(movement, select) => self.move_cursor(movement, select),
            Action::InsertChar(ch) => self.insert_text(&ch.to_string()),
            Action::InsertNewline => {
                self.insert_text("\n");
                self.buffer.separate();
            }
            Action::InsertTab => self.insert_tab(),
            Action::DeleteBackward => self.delete_backward(),
            Action::DeleteForward => self.delete_forward(),
        }
    }

    /// プロンプトを開く
    ///
    /// 未保存の変更がある状態での Open は確認プロンプトへ差し替える。
    pub fn request_prompt(&mut self, kind: PromptKind) {
        self.buffer.separate();
        match kind {
            PromptKind::Open if self.buffer.is_modified() => {
                self.minibuffer.enter(PromptKind::ReallyOpen);
            }
            _ => self.minibuffer.enter(kind),
        }
    }

    /// 終了を要求する（未保存なら確認を挟む）
    pub fn request_quit(&mut self) {
        if self.buffer.is_modified() {
            self.minibuffer.enter(PromptKind::ReallyQuit);
        } else {
            self.running = false;
        }
    }

    /// 送信された入力をプロンプト種別に応じて実行する
    pub fn submit(&mut self, kind: PromptKind, input: &str) {
        match kind {
            PromptKind::ChangeDir => self.change_dir(input),
            PromptKind::FindForward => self.find_with_pattern(input, true),
            PromptKind::FindBackward => self.find_with_pattern(input, false),
            PromptKind::GoToLine => self.go_to_line(input),
            PromptKind::Open => self.open(input),
            PromptKind::OpenNew => self.open_new(input),
            PromptKind::Pipe => self.pipe(input),
            PromptKind::Run => self.run_command(input),
            PromptKind::SaveAs => self.save_as(input),
            PromptKind::KeywordLookup => self.keyword_lookup(),
            PromptKind::ReallyOpen => {
                if input == "y" || input == "yes" {
                    self.minibuffer.enter(PromptKind::Open);
                } else {
                    self.status = self.title.clone();
                }
            }
            PromptKind::ReallyQuit => {
                if input == "y" || input == "yes" {
                    self.running = false;
                } else {
                    self.status = self.title.clone();
                }
            }
        }
    }

    fn change_dir(&mut self, input: &str) {
        let target = file::absolutize(&file::expand_vars(input));
        // タイトルは chdir 前に絶対化しておき、移動後に最短形へ戻す
        let title_abs = file::absolutize(&file::expand_vars(&self.title));
        match std::env::set_current_dir(&target) {
            Ok(()) => {
                self.status = format!("Working dir is \"{}\".", target.display());
                if !self.untitled {
                    self.title = file::min_path(&title_abs.to_string_lossy());
                }
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn find_with_pattern(&mut self, input: &str, forward: bool) {
        match self.search.compile(input, forward) {
            Ok(()) => {
                self.status = self.search.find(&mut self.buffer, &self.title);
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn go_to_line(&mut self, input: &str) {
        match search::parse_line_number(input) {
            Ok(n) => {
                self.status = self.title.clone();
                let line = if n < 1 { 1 } else { n as usize };
                search::select_line(&mut self.buffer, line);
            }
            Err(message) => self.status = message,
        }
    }

    fn open(&mut self, input: &str) {
        if input.is_empty() {
            self.status = self.title.clone();
            return;
        }
        let expanded = file::expand_vars(input);
        let title = file::min_path(&expanded);
        match file::read_document(&expanded) {
            Ok((text, ending)) => {
                self.buffer = TextBuffer::from_text(text, ending);
                self.status = format!("Opened \"{title}\".");
            }
            Err(e) => {
                log::info!("open {expanded}: {e}");
                self.buffer = TextBuffer::new();
                self.status = format!("New file: \"{title}\".");
            }
        }
        self.title = title;
        self.untitled = false;
        self.first_line = 1;
    }

    fn open_new(&mut self, input: &str) {
        let expanded = file::expand_vars(input);
        self.status = match self.runner.new_instance(&expanded) {
            Ok(()) => self.title.clone(),
            Err(e) => e.to_string(),
        };
    }

    fn pipe(&mut self, input: &str) {
        self.status = self.title.clone();
        if input.is_empty() {
            return;
        }
        let selection = self.buffer.selection_text();
        if let Err(e) = self.runner.pipe(input, selection) {
            self.status = e.to_string();
        }
    }

    fn run_command(&mut self, input: &str) {
        self.status = self.title.clone();
        if input.is_empty() {
            return;
        }
        if let Err(e) = self.runner.run(input) {
            self.status = e.to_string();
        }
    }

    fn keyword_lookup(&mut self) {
        self.status = self.title.clone();
        let Some(program) = self.config.keyword_program.clone() else {
            self.status = "No keyword program configured.".to_string();
            return;
        };
        let (line, col) = self.buffer.line_col(self.buffer.ins_mark());
        let snapshot = self.buffer.text().to_string();
        if let Err(e) = self.runner.keyword_lookup(&program, snapshot, line, col) {
            self.status = e.to_string();
        }
    }

    fn save(&mut self) {
        if self.untitled {
            self.minibuffer.enter(PromptKind::SaveAs);
            return;
        }
        let path = file::expand_vars(&self.title);
        match file::write_document(&path, self.buffer.text(), self.buffer.line_ending()) {
            Ok(()) => {
                self.status = format!("Saved \"{}\".", self.title);
                self.buffer.reset_modified();
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    fn save_as(&mut self, input: &str) {
        if input.is_empty() {
            self.status = self.title.clone();
            return;
        }
        let expanded = file::expand_vars(input);
        match file::write_document(&expanded, self.buffer.text(), self.buffer.line_ending()) {
            Ok(()) => {
                // タイトルの変更は保存が成功したときだけ
                self.title = file::min_path(&expanded);
                self.untitled = false;
                self.status = format!("Saved \"{}\".", self.title);
                self.buffer.reset_modified();
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    /// パイプ結果を受信時点の選択範囲へ差し込む
    ///
    /// ジョブ起動時の選択ではなく、届いた時点の選択を置き換える。
    fn splice_pipe_result(&mut self, output: String) {
        self.buffer.separate();
        self.buffer.replace_selection(&output);
        self.buffer.separate();
    }

    fn insert_text(&mut self, text: &str) {
        let (start, end) = self.buffer.selection_range();
        if start != end {
            self.buffer.delete(start, end);
        }
        self.buffer.insert(start, text);
        self.buffer.set_cursor(start + text.chars().count());
    }

    fn insert_tab(&mut self) {
        if self.config.expand_tabs {
            let (_, col) = self.buffer.line_col(self.buffer.ins_mark());
            let fill = self.config.tab_width - col % self.config.tab_width;
            self.insert_text(&" ".repeat(fill));
        } else {
            self.insert_text("\t");
        }
    }

    fn delete_backward(&mut self) {
        let (start, end) = self.buffer.selection_range();
        if start != end {
            self.buffer.delete(start, end);
        } else if start > 0 {
            self.buffer.delete(start - 1, start);
        }
    }

    fn delete_forward(&mut self) {
        let (start, end) = self.buffer.selection_range();
        if start != end {
            self.buffer.delete(start, end);
        } else {
            self.buffer.delete(start, start + 1);
        }
    }

    fn move_cursor(&mut self, movement: Movement, select: bool) {
        self.buffer.separate();
        let ins = self.buffer.ins_mark();
        let len = self.buffer.len_chars();
        let (line, col) = self.buffer.line_col(ins);

        let target = match movement {
            Movement::Left => ins.saturating_sub(1),
            Movement::Right => (ins + 1).min(len),
            Movement::Up => self.vertical_target(line, col, -1),
            Movement::Down => self.vertical_target(line, col, 1),
            Movement::LineStart => self.buffer.line_start(line),
            Movement::LineEnd => self.buffer.line_end(line),
            Movement::PageUp => self.vertical_target(line, col, -(self.view_rows as isize)),
            Movement::PageDown => self.vertical_target(line, col, self.view_rows as isize),
            Movement::BufferStart => 0,
            Movement::BufferEnd => len,
        };

        if select {
            self.buffer.set_marks(self.buffer.sel_mark(), target);
        } else {
            self.buffer.set_cursor(target);
        }
    }

    fn vertical_target(&self, line: usize, col: usize, delta: isize) -> usize {
        let last = self.buffer.line_count() as isize;
        let target_line = (line as isize + delta).clamp(1, last) as usize;
        let start = self.buffer.line_start(target_line);
        let end = self.buffer.line_end(target_line);
        (start + col).min(end)
    }

    fn scroll_to_cursor(&mut self) {
        let (line, _) = self.buffer.line_col(self.buffer.ins_mark());
        if line < self.first_line {
            self.first_line = line;
        } else if line >= self.first_line + self.view_rows {
            self.first_line = line + 1 - self.view_rows;
        }
    }

    fn build_view(&self) -> View<'_> {
        let prompt = match self.minibuffer.mode() {
            Mode::Prompt(kind) => Some(PromptView {
                label: kind.label(),
                input: self.minibuffer.input(),
                cursor: self.minibuffer.cursor(),
            }),
            Mode::Normal => None,
        };
        View {
            text: self.buffer.text(),
            selection: self.buffer.selection_range(),
            cursor: self.buffer.ins_mark(),
            first_line: self.first_line,
            tab_width: self.config.tab_width,
            status: &self.status,
            prompt,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn mode(&self) -> Mode {
        self.minibuffer.mode()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// テスト用にバッファへ直接アクセスする
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    /// 実行中のジョブ数
    pub fn active_jobs(&self) -> usize {
        self.runner.active_jobs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::LineEnding;

    fn app() -> App {
        App::new(EditorConfig::default(), None)
    }

    fn app_with_text(text: &str) -> App {
        let mut app = app();
        *app.buffer_mut() = TextBuffer::from_text(text.to_string(), LineEnding::Lf);
        app
    }

    #[test]
    fn test_new_without_file_is_untitled() {
        let app = app();
        assert_eq!(app.title(), "untitled");
        assert_eq!(app.status(), "New file: \"untitled\".");
        assert!(app.is_running());
    }

    #[test]
    fn test_find_forward_selects_match() {
        let mut app = app_with_text("xxabcyy");
        app.submit(PromptKind::FindForward, "abc");
        assert_eq!(app.buffer().selection_range(), (2, 5));
        assert_eq!(app.status(), app.title());

        // もうマッチしない場合は選択もステータスもそのまま動かさない
        app.submit(PromptKind::FindForward, "abc");
        assert_eq!(app.status(), "No forward match.");
        assert_eq!(app.buffer().selection_range(), (2, 5));
    }

    #[test]
    fn test_find_invalid_pattern_reports_error() {
        let mut app = app_with_text("abc");
        app.submit(PromptKind::FindForward, "(");
        assert!(app.status().contains("regex"));
        assert_eq!(app.buffer().selection_range(), (0, 0));
    }

    #[test]
    fn test_repeat_find_reuses_pattern() {
        let mut app = app_with_text("one two one");
        app.submit(PromptKind::FindForward, "one");
        assert_eq!(app.buffer().selection_range(), (0, 3));
        app.handle_action(Action::RepeatFind);
        assert_eq!(app.buffer().selection_range(), (8, 11));
    }

    #[test]
    fn test_go_to_line_selects_without_indent() {
        let mut app = app_with_text("first\n  second\nthird");
        app.submit(PromptKind::GoToLine, "2");
        assert_eq!(app.buffer().selection_text(), "second");
    }

    #[test]
    fn test_go_to_line_rejects_garbage() {
        let mut app = app_with_text("first");
        app.submit(PromptKind::GoToLine, "two");
        assert!(app.status().contains("invalid line number"));
        assert_eq!(app.buffer().selection_range(), (0, 0));
    }

    #[test]
    fn test_open_missing_file_starts_new_document() {
        let mut app = app();
        app.submit(PromptKind::Open, "/nonexistent/sumi-new-file.txt");
        assert!(app.status().starts_with("New file:"));
        assert_eq!(app.buffer().text(), "");
        assert!(!app.buffer().is_modified());
    }

    #[test]
    fn test_open_empty_input_keeps_document() {
        let mut app = app_with_text("keep me");
        app.submit(PromptKind::Open, "");
        assert_eq!(app.buffer().text(), "keep me");
        assert_eq!(app.status(), app.title());
    }

    #[test]
    fn test_open_reads_file_and_sets_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "contents\n").unwrap();

        let mut app = app();
        app.submit(PromptKind::Open, &path.to_string_lossy());
        assert_eq!(app.buffer().text(), "contents");
        assert!(app.status().starts_with("Opened"));
        assert!(app.title().ends_with("doc.txt"));
    }

    #[test]
    fn test_save_as_failure_keeps_title() {
        let mut app = app_with_text("data");
        let before = app.title().to_string();
        app.submit(PromptKind::SaveAs, "/nonexistent/dir/out.txt");
        assert_eq!(app.title(), before);
        assert_ne!(app.status(), app.title());
    }

    #[test]
    fn test_save_as_success_commits_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let mut app = app_with_text("data");
        app.buffer_mut().insert(0, "x");
        app.submit(PromptKind::SaveAs, &path.to_string_lossy());
        assert!(app.status().starts_with("Saved"));
        assert!(app.title().ends_with("out.txt"));
        assert!(!app.buffer().is_modified());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "xdata\n");
    }

    #[test]
    fn test_quit_with_clean_buffer_stops() {
        let mut app = app();
        app.request_quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_quit_with_modified_buffer_asks_first() {
        let mut app = app();
        app.buffer_mut().insert(0, "dirty");
        app.request_quit();
        assert!(app.is_running());
        assert_eq!(app.mode(), Mode::Prompt(PromptKind::ReallyQuit));

        app.submit(PromptKind::ReallyQuit, "n");
        assert!(app.is_running());
        assert_eq!(app.status(), app.title());

        app.request_quit();
        app.submit(PromptKind::ReallyQuit, "y");
        assert!(!app.is_running());
    }

    #[test]
    fn test_confirmation_is_case_sensitive() {
        let mut app = app();
        app.buffer_mut().insert(0, "dirty");
        app.request_quit();
        app.submit(PromptKind::ReallyQuit, "Y");
        assert!(app.is_running());
    }

    #[test]
    fn test_open_with_modified_buffer_asks_first() {
        let mut app = app();
        app.buffer_mut().insert(0, "dirty");
        app.request_prompt(PromptKind::Open);
        assert_eq!(app.mode(), Mode::Prompt(PromptKind::ReallyOpen));

        app.submit(PromptKind::ReallyOpen, "yes");
        assert_eq!(app.mode(), Mode::Prompt(PromptKind::Open));
    }

    #[test]
    fn test_pipe_result_replaces_current_selection() {
        let mut app = app_with_text("hello world");
        app.buffer_mut().set_marks(0, 5);
        app.apply_event(AppEvent::PipeResult("HELLO".to_string()));
        assert_eq!(app.buffer().text(), "HELLO world");
        assert_eq!(app.buffer().selection_text(), "HELLO");
    }

    #[test]
    fn test_status_suppressed_while_prompt_focused() {
        use crossterm::event::{KeyCode, KeyModifiers};

        let mut app = app();
        app.request_prompt(PromptKind::Run);
        let before = app.status().to_string();
        app.apply_event(AppEvent::Status("late job result".to_string()));
        assert_eq!(app.status(), before);

        // Escape でプロンプトを閉じれば以降のステータスは表示される
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        app.apply_event(AppEvent::Input(esc));
        app.apply_event(AppEvent::Status("visible now".to_string()));
        assert_eq!(app.status(), "visible now");
    }

    #[test]
    fn test_keyword_lookup_without_program() {
        let mut app = app();
        app.handle_action(Action::KeywordLookup);
        assert_eq!(app.status(), "No keyword program configured.");
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut app = app_with_text("abcdef");
        app.buffer_mut().set_marks(1, 4);
        app.handle_action(Action::InsertChar('X'));
        assert_eq!(app.buffer().text(), "aXef");
    }

    #[test]
    fn test_insert_tab_expansion() {
        let mut config = EditorConfig::default();
        config.expand_tabs = true;
        config.tab_width = 4;
        let mut app = App::new(config, None);
        app.handle_action(Action::InsertChar('a'));
        app.handle_action(Action::InsertTab);
        assert_eq!(app.buffer().text(), "a   ");
    }

    #[test]
    fn test_vertical_movement_clamps_column() {
        let mut app = app_with_text("long line here\nab\nlong line too");
        app.buffer_mut().set_cursor(10);
        app.handle_action(Action::Move(Movement::Down, false));
        // 短い行では行末へ丸められる
        assert_eq!(app.buffer().ins_mark(), app.buffer().line_end(2));
    }
}
