//! Single-line text input

use unicode_width::UnicodeWidthStr;

/// Text field content and cursor (byte offset, always on a char boundary)
#[derive(Debug, Default, Clone)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Input pre-filled with `value`, cursor at the end
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn insert(&mut self, c: char) {
        self.value.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Insert pasted text; line breaks are dropped
    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars().filter(|c| !matches!(c, '\r' | '\n')) {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(len) = self.prev_char_len() {
            self.cursor -= len;
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        if let Some(len) = self.prev_char_len() {
            self.cursor -= len;
        }
    }

    pub fn right(&mut self) {
        if let Some(c) = self.value[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.len();
    }

    /// Display column of the cursor
    pub fn cursor_column(&self) -> usize {
        self.value[..self.cursor].width()
    }

    fn prev_char_len(&self) -> Option<usize> {
        self.value[..self.cursor].chars().last().map(char::len_utf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_multibyte() {
        let mut input = TextInput::new();
        for c in "Zürich".chars() {
            input.insert(c);
        }
        input.left();
        input.left();
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.value(), "Zrich");
        input.insert('u');
        assert_eq!(input.value(), "Zurich");
        input.delete();
        assert_eq!(input.value(), "Zuich");
    }

    #[test]
    fn test_paste_drops_newlines() {
        let mut input = TextInput::with_value("/home/");
        input.insert_str("me/Photos\n");
        assert_eq!(input.value(), "/home/me/Photos");
        assert_eq!(input.cursor_column(), 15);
    }

    #[test]
    fn test_cursor_bounds() {
        let mut input = TextInput::with_value("ab");
        input.right();
        input.delete();
        assert_eq!(input.value(), "ab");
        input.home();
        input.left();
        input.backspace();
        assert_eq!(input.value(), "ab");
        assert_eq!(input.cursor_column(), 0);
        input.end();
        assert_eq!(input.cursor_column(), 2);
    }
}
