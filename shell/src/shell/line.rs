/// Line editor for the framebuffer console.
///
/// Supports:
/// - Printable ASCII input, inserted at the caret
/// - Backspace / Delete: remove before / under the caret
/// - Left / Right / Home / End: caret motion
/// - Up / Down: walk the history ring, Down past the newest clears
/// - Escape: clear the line
/// - Enter: submit
///
/// The field is redrawn from a fixed origin after every change and never
/// wraps: input stops at the last usable column of the row it started on.
use heapless::Vec;

use super::history::History;
use crate::config::LINE_MAX;
use crate::console::Console;
use crate::platform::{Key, Keyboard, PlatformError};

/// Fewer free columns than this after the prompt and input starts on the
/// next row instead.
const MIN_FIELD: usize = 16;

/// Result of feeding one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Pending,
    Committed,
}

pub struct LineEditor {
    buf: Vec<u8, LINE_MAX>,
    cursor: usize,
    /// Steps back from the newest history entry, while browsing.
    history_cursor: Option<usize>,
    origin: (usize, usize),
    limit: usize,
    /// Characters on screen after the last redraw.
    drawn: usize,
    caret: Option<(usize, usize)>,
}

impl LineEditor {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            cursor: 0,
            history_cursor: None,
            origin: (0, 0),
            limit: 0,
            drawn: 0,
            caret: None,
        }
    }

    /// Start a fresh line at the console cursor.
    pub fn begin<C: Console + ?Sized>(&mut self, console: &mut C) {
        self.buf.clear();
        self.cursor = 0;
        self.history_cursor = None;
        self.drawn = 0;
        self.caret = None;
        // Keep the last column free so the caret never forces a wrap.
        let cols = console.columns();
        if cols.saturating_sub(console.cursor().0 + 1) < MIN_FIELD.min(cols.saturating_sub(1)) {
            console.put_char(b'\n');
        }
        self.origin = console.cursor();
        let room = cols.saturating_sub(self.origin.0 + 1);
        self.limit = room.min(LINE_MAX);
        self.show_caret(console);
    }

    /// Current contents.
    pub fn line(&self) -> &str {
        core::str::from_utf8(&self.buf).unwrap_or("")
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn feed<C: Console + ?Sized>(&mut self, key: Key, console: &mut C, history: &History) -> Edit {
        match key {
            Key::Char(c) if (0x20..=0x7E).contains(&c) => {
                if self.buf.len() < self.limit && self.buf.push(c).is_ok() {
                    self.buf[self.cursor..].rotate_right(1);
                    self.cursor += 1;
                    self.history_cursor = None;
                    self.redraw(console);
                }
            }
            Key::Char(_) => {}
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_at(self.cursor);
                    self.redraw(console);
                }
            }
            Key::Delete => {
                if self.cursor < self.buf.len() {
                    self.remove_at(self.cursor);
                    self.redraw(console);
                }
            }
            Key::Left => self.move_to(self.cursor.saturating_sub(1), console),
            Key::Right => self.move_to((self.cursor + 1).min(self.buf.len()), console),
            Key::Home => self.move_to(0, console),
            Key::End => self.move_to(self.buf.len(), console),
            Key::Up => {
                let next = self.history_cursor.map_or(0, |i| i + 1);
                // Past the oldest entry: stay where we are.
                if let Some(entry) = history.recent(next) {
                    self.history_cursor = Some(next);
                    self.load(entry);
                    self.redraw(console);
                }
            }
            Key::Down => match self.history_cursor {
                None => {}
                Some(0) => {
                    self.history_cursor = None;
                    self.load("");
                    self.redraw(console);
                }
                Some(i) => {
                    self.history_cursor = Some(i - 1);
                    self.load(history.recent(i - 1).unwrap_or(""));
                    self.redraw(console);
                }
            },
            Key::Escape => {
                self.history_cursor = None;
                self.load("");
                self.redraw(console);
            }
            Key::Enter => {
                self.hide_caret(console);
                console.set_cursor(self.origin.0 + self.buf.len(), self.origin.1);
                console.put_char(b'\n');
                return Edit::Committed;
            }
        }
        Edit::Pending
    }

    /// Read keys until Enter and return the committed line.
    pub fn read_line<K, C>(&mut self, keyboard: &mut K, console: &mut C, history: &History) -> Result<&str, PlatformError>
    where
        K: Keyboard + ?Sized,
        C: Console + ?Sized,
    {
        self.begin(console);
        loop {
            let key = keyboard.read_key()?;
            if self.feed(key, console, history) == Edit::Committed {
                return Ok(self.line());
            }
        }
    }

    fn remove_at(&mut self, idx: usize) {
        self.buf[idx..].rotate_left(1);
        self.buf.pop();
    }

    fn load(&mut self, text: &str) {
        self.buf.clear();
        for &b in text.as_bytes().iter().take(self.limit) {
            let _ = self.buf.push(b);
        }
        self.cursor = self.buf.len();
    }

    fn move_to<C: Console + ?Sized>(&mut self, cursor: usize, console: &mut C) {
        if cursor != self.cursor {
            self.hide_caret(console);
            self.cursor = cursor;
            self.show_caret(console);
        }
    }

    fn redraw<C: Console + ?Sized>(&mut self, console: &mut C) {
        self.hide_caret(console);
        let (col, row) = self.origin;
        console.set_cursor(col, row);
        for &b in self.buf.iter() {
            console.put_char(b);
        }
        for _ in self.buf.len()..self.drawn {
            console.put_char(b' ');
        }
        self.drawn = self.buf.len();
        self.show_caret(console);
    }

    fn show_caret<C: Console + ?Sized>(&mut self, console: &mut C) {
        let cell = (self.origin.0 + self.cursor, self.origin.1);
        console.set_caret(cell.0, cell.1, true);
        self.caret = Some(cell);
    }

    fn hide_caret<C: Console + ?Sized>(&mut self, console: &mut C) {
        if let Some((col, row)) = self.caret.take() {
            console.set_caret(col, row, false);
        }
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConsole;

    fn type_keys(ed: &mut LineEditor, con: &mut MockConsole, h: &History, keys: &[Key]) {
        for &k in keys {
            ed.feed(k, con, h);
        }
    }

    fn chars(s: &str) -> std::vec::Vec<Key> {
        s.bytes().map(Key::Char).collect()
    }

    #[test]
    fn insert_in_the_middle() {
        let (mut con, h) = (MockConsole::new(80, 25), History::new());
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("ac"));
        type_keys(&mut ed, &mut con, &h, &[Key::Left, Key::Char(b'b')]);
        assert_eq!(ed.line(), "abc");
        assert_eq!(ed.cursor(), 2);
        assert_eq!(con.line(0), "abc");
        assert_eq!(con.caret, Some((2, 0)));
    }

    #[test]
    fn backspace_and_delete_redraw_tail() {
        let (mut con, h) = (MockConsole::new(80, 25), History::new());
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("hello"));
        type_keys(&mut ed, &mut con, &h, &[Key::Home, Key::Delete, Key::End, Key::Backspace]);
        assert_eq!(ed.line(), "ell");
        assert_eq!(con.line(0), "ell");
        type_keys(&mut ed, &mut con, &h, &[Key::Home, Key::Backspace]);
        assert_eq!(ed.line(), "ell");
    }

    #[test]
    fn cursor_clamped_to_line() {
        let (mut con, h) = (MockConsole::new(80, 25), History::new());
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &[Key::Left, Key::Char(b'x'), Key::Right, Key::Right]);
        assert_eq!(ed.cursor(), 1);
    }

    #[test]
    fn input_stops_at_row_end() {
        let (mut con, h) = (MockConsole::new(24, 4), History::new());
        con.put_str("p> ");
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("0123456789abcdefghijklmnop"));
        // 24 columns, origin 3, last column kept free.
        assert_eq!(ed.line(), "0123456789abcdefghij");
        assert_eq!(con.line(1), "");
    }

    #[test]
    fn prompt_at_row_end_moves_field_down() {
        let (mut con, h) = (MockConsole::new(20, 4), History::new());
        con.put_str("hatteros:/abcdefg> ");
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("cd /"));
        assert_eq!(ed.line(), "cd /");
        assert_eq!(con.line(0), "hatteros:/abcdefg>");
        assert_eq!(con.line(1), "cd /");
        assert_eq!(con.caret, Some((4, 1)));
    }

    #[test]
    fn history_walk_up_stops_at_oldest_down_clears() {
        let mut con = MockConsole::new(80, 25);
        let mut h = History::new();
        h.push("first");
        h.push("second");
        let mut ed = LineEditor::new();
        ed.begin(&mut con);

        ed.feed(Key::Up, &mut con, &h);
        assert_eq!(ed.line(), "second");
        ed.feed(Key::Up, &mut con, &h);
        assert_eq!(ed.line(), "first");
        ed.feed(Key::Up, &mut con, &h);
        assert_eq!(ed.line(), "first");
        assert_eq!(con.line(0), "first");

        ed.feed(Key::Down, &mut con, &h);
        assert_eq!(ed.line(), "second");
        ed.feed(Key::Down, &mut con, &h);
        assert_eq!(ed.line(), "");
        assert_eq!(con.line(0), "");
    }

    #[test]
    fn typing_leaves_history_browsing() {
        let mut con = MockConsole::new(80, 25);
        let mut h = History::new();
        h.push("ls");
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &[Key::Up, Key::Char(b'x'), Key::Down]);
        assert_eq!(ed.line(), "lsx");
    }

    #[test]
    fn escape_clears() {
        let (mut con, h) = (MockConsole::new(80, 25), History::new());
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("junk"));
        ed.feed(Key::Escape, &mut con, &h);
        assert_eq!(ed.line(), "");
        assert_eq!(con.line(0), "");
    }

    #[test]
    fn enter_hides_caret_and_moves_down() {
        let (mut con, h) = (MockConsole::new(80, 25), History::new());
        let mut ed = LineEditor::new();
        ed.begin(&mut con);
        type_keys(&mut ed, &mut con, &h, &chars("ok"));
        ed.feed(Key::Home, &mut con, &h);
        assert_eq!(ed.feed(Key::Enter, &mut con, &h), Edit::Committed);
        assert_eq!(con.caret, None);
        assert_eq!(con.cursor(), (0, 1));
        assert_eq!(ed.line(), "ok");
    }
}
