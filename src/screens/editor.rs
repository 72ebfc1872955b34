/// Multi-line text editor used for compose descriptors
///
/// Text is kept as lines split on `\n` only, so any `\r` stays attached to its
/// line and `text()` reproduces unedited input byte for byte.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::cell::Cell;

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEditor {
    lines: Vec<String>,
    row: usize,
    /// Cursor position in characters, not bytes
    col: usize,
    /// First visible line, adjusted while rendering
    scroll: Cell<usize>,
    modified: bool,
}

impl Default for TextEditor {
    fn default() -> Self {
        Self::from_text("")
    }
}

impl TextEditor {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(|l| l.to_string()).collect(),
            row: 0,
            col: 0,
            scroll: Cell::new(0),
            modified: false,
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn byte_index(&self, row: usize, col: usize) -> usize {
        self.lines[row]
            .char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(self.lines[row].len())
    }

    pub fn insert_char(&mut self, c: char) {
        let idx = self.byte_index(self.row, self.col);
        self.lines[self.row].insert(idx, c);
        self.col += 1;
        self.modified = true;
    }

    pub fn insert_newline(&mut self) {
        let idx = self.byte_index(self.row, self.col);
        let rest = self.lines[self.row].split_off(idx);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
        self.modified = true;
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let idx = self.byte_index(self.row, self.col - 1);
            self.lines[self.row].remove(idx);
            self.col -= 1;
            self.modified = true;
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&line);
            self.modified = true;
        }
    }

    pub fn delete(&mut self) {
        if self.col < self.line_len(self.row) {
            let idx = self.byte_index(self.row, self.col);
            self.lines[self.row].remove(idx);
            self.modified = true;
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
            self.modified = true;
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self, n: usize) {
        self.row = self.row.saturating_sub(n);
        self.col = self.col.min(self.line_len(self.row));
    }

    pub fn move_down(&mut self, n: usize) {
        self.row = (self.row + n).min(self.lines.len() - 1);
        self.col = self.col.min(self.line_len(self.row));
    }

    /// Apply an editing key; returns false for keys the editor does not handle
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        match key.code {
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Enter => self.insert_newline(),
            KeyCode::Tab => {
                // Compose files are indented with spaces
                self.insert_char(' ');
                self.insert_char(' ');
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_up(1),
            KeyCode::Down => self.move_down(1),
            KeyCode::PageUp => self.move_up(20),
            KeyCode::PageDown => self.move_down(20),
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = self.line_len(self.row),
            _ => return false,
        }
        true
    }

    /// Keep the cursor row inside a viewport of `height` lines
    fn scroll_for(&self, height: usize) -> usize {
        if height == 0 {
            return 0;
        }
        let scroll = self.scroll.get();
        if self.row < scroll {
            self.row
        } else if self.row >= scroll + height {
            self.row + 1 - height
        } else {
            scroll
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, title: &str, focused: bool) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = self.scroll_for(inner_height);
        self.scroll.set(scroll);
        let gutter = self.lines.len().to_string().len();

        let lines: Vec<Line> = self
            .lines
            .iter()
            .enumerate()
            .skip(scroll)
            .take(inner_height)
            .map(|(i, text)| {
                let number = Span::styled(
                    format!("{:>width$} ", i + 1, width = gutter),
                    Style::default().fg(Color::DarkGray),
                );
                let shown = text.trim_end_matches('\r').to_string();
                if focused && i == self.row {
                    Line::from(vec![number, Span::styled(shown, Style::default().bg(Color::Rgb(30, 30, 40)))])
                } else {
                    Line::from(vec![number, Span::raw(shown)])
                }
            })
            .collect();

        let marker = if self.modified { " [modified]" } else { "" };
        let border_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!("{}{}", title, marker)),
        );
        frame.render_widget(paragraph, area);

        if focused {
            let x = area.x + 1 + gutter as u16 + 1 + self.col as u16;
            let y = area.y + 1 + (self.row - scroll) as u16;
            if x < area.x + area.width.saturating_sub(1) && y < area.y + area.height.saturating_sub(1) {
                frame.set_cursor(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_unedited_text_is_identical() {
        for text in ["", "a", "services:\n  web:\n", "x\r\ny\r\n", "no newline at end", "\n\n"] {
            let editor = TextEditor::from_text(text);
            assert_eq!(editor.text(), text);
            assert!(!editor.is_modified());
        }
    }

    #[test]
    fn test_typing_and_newline() {
        let mut editor = TextEditor::default();
        for c in "web:".chars() {
            editor.handle_key(key(KeyCode::Char(c)));
        }
        editor.handle_key(key(KeyCode::Enter));
        editor.handle_key(key(KeyCode::Tab));
        for c in "image: nginx".chars() {
            editor.handle_key(key(KeyCode::Char(c)));
        }

        assert_eq!(editor.text(), "web:\n  image: nginx");
        assert_eq!(editor.cursor(), (1, 14));
        assert!(editor.is_modified());
    }

    #[test]
    fn test_backspace_joins_lines() {
        let mut editor = TextEditor::from_text("ab\ncd");
        editor.move_down(1);
        editor.backspace();

        assert_eq!(editor.text(), "abcd");
        assert_eq!(editor.cursor(), (0, 2));
    }

    #[test]
    fn test_delete_at_end_joins_next_line() {
        let mut editor = TextEditor::from_text("ab\ncd");
        editor.handle_key(key(KeyCode::End));
        editor.delete();
        assert_eq!(editor.text(), "abcd");
    }

    #[test]
    fn test_multibyte_characters() {
        let mut editor = TextEditor::from_text("café");
        editor.handle_key(key(KeyCode::End));
        editor.backspace();
        editor.insert_char('e');
        assert_eq!(editor.text(), "cafe");
    }

    #[test]
    fn test_cursor_clamps_to_shorter_lines() {
        let mut editor = TextEditor::from_text("long line\nab");
        editor.handle_key(key(KeyCode::End));
        editor.move_down(1);
        assert_eq!(editor.cursor(), (1, 2));
        editor.move_down(5);
        assert_eq!(editor.cursor(), (1, 2));
    }

    #[test]
    fn test_control_keys_are_not_consumed() {
        let mut editor = TextEditor::default();
        let handled = editor.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(!handled);
        assert_eq!(editor.text(), "");
    }
}
