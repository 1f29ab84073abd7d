/// Single-line text editor used by the form fields. The cursor counts
/// characters, not bytes, so descriptions with non-ASCII text edit safely.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineEdit {
    pub value: String,
    pub cursor: usize,
}

impl LineEdit {
    pub fn with(s: impl Into<String>) -> Self {
        let mut edit = Self::default();
        edit.set(s);
        edit
    }

    pub fn set(&mut self, s: impl Into<String>) {
        self.value = s.into();
        self.cursor = self.value.chars().count();
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map_or(self.value.len(), |(i, _)| i)
    }

    pub fn push(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_in_the_middle_of_multibyte_text() {
        let mut edit = LineEdit::with("café");
        edit.left();
        edit.push('x');
        assert_eq!(edit.value, "cafxé");
        edit.right();
        edit.backspace();
        assert_eq!(edit.value, "cafx");
        edit.home();
        edit.delete();
        assert_eq!(edit.value, "afx");
        assert_eq!(edit.cursor, 0);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut edit = LineEdit::default();
        edit.left();
        edit.backspace();
        edit.delete();
        edit.right();
        assert_eq!(edit.cursor, 0);
        edit.set("12");
        edit.end();
        edit.right();
        assert_eq!(edit.cursor, 2);
    }
}
