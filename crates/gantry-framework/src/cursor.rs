//! Forward-only scanner over a command's raw text.
//!
//! A [`Cursor`] owns the text being bound and a byte index that always lies
//! on a character boundary in `[0, len]`. Every consuming method either
//! succeeds and moves the index forward, or fails and leaves the index
//! exactly where it was.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut cursor = Cursor::new("add 1 [2 3]");
//! assert_eq!(cursor.next_word().as_deref(), Some("add"));
//! let mark = cursor.checkpoint();
//! assert!(!cursor.consume_literal("plus"));
//! assert_eq!(cursor.checkpoint(), mark);
//! ```

use regex::Regex;

/// A saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark(usize);

/// Stateful scanner with checkpoint/restore.
#[derive(Debug, Clone)]
pub struct Cursor {
    text: String,
    index: usize,
}

impl Cursor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index: 0,
        }
    }

    /// The full text, including consumed parts.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current byte index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn checkpoint(&self) -> Mark {
        Mark(self.index)
    }

    pub fn restore(&mut self, mark: Mark) {
        self.index = mark.0.min(self.text.len());
    }

    /// The unconsumed text.
    pub fn remaining(&self) -> &str {
        &self.text[self.index..]
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.text.len()
    }

    /// Whether any non-whitespace text remains.
    pub fn has_next(&self) -> bool {
        !self.remaining().trim_start().is_empty()
    }

    /// Returns up to `n` upcoming characters without consuming them.
    pub fn peek(&self, n: usize) -> &str {
        let rest = self.remaining();
        let end = rest
            .char_indices()
            .nth(n)
            .map_or(rest.len(), |(offset, _)| offset);
        &rest[..end]
    }

    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Whether the next non-whitespace character is `c`.
    pub fn is_next(&self, c: char) -> bool {
        self.remaining().trim_start().starts_with(c)
    }

    /// Advances by `n` characters.
    ///
    /// Returns false, without moving, when fewer than `n` characters remain.
    pub fn advance(&mut self, n: usize) -> bool {
        let peeked = self.peek(n);
        if peeked.chars().count() < n {
            return false;
        }
        self.index += peeked.len();
        true
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        self.index += rest.len() - rest.trim_start().len();
    }

    /// Consumes `literal` if the remaining text starts with it, ignoring case.
    pub fn consume_literal(&mut self, literal: &str) -> bool {
        let rest = self.remaining();
        let mut consumed = 0;
        let mut rest_chars = rest.chars();
        for expected in literal.chars() {
            match rest_chars.next() {
                Some(actual) if chars_eq_ignore_case(actual, expected) => {
                    consumed += actual.len_utf8();
                }
                _ => return false,
            }
        }
        self.index += consumed;
        true
    }

    /// Reads the next whitespace-delimited word, skipping leading whitespace.
    pub fn next_word(&mut self) -> Option<String> {
        let mark = self.checkpoint();
        self.skip_whitespace();
        let rest = self.remaining();
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if end == 0 {
            self.restore(mark);
            return None;
        }
        let word = rest[..end].to_string();
        self.index += end;
        Some(word)
    }

    /// Reads everything before `stop` and steps past it.
    pub fn next_until(&mut self, stop: char) -> Option<String> {
        let rest = self.remaining();
        let end = rest.find(stop)?;
        let taken = rest[..end].to_string();
        self.index += end + stop.len_utf8();
        Some(taken)
    }

    /// Reads the text between `open` and its matching `close`, allowing nesting.
    ///
    /// Leading whitespace is skipped. The delimiters are consumed but not
    /// returned.
    pub fn next_surrounded(&mut self, open: char, close: char) -> Option<String> {
        let mark = self.checkpoint();
        self.skip_whitespace();
        let rest = self.remaining();
        if !rest.starts_with(open) {
            self.restore(mark);
            return None;
        }

        let mut depth = 0usize;
        for (offset, c) in rest.char_indices() {
            if c == close && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    let inner = rest[open.len_utf8()..offset].to_string();
                    self.index += offset + close.len_utf8();
                    return Some(inner);
                }
            } else if c == open {
                depth += 1;
            }
        }

        self.restore(mark);
        None
    }

    /// Consumes the text matched by `pattern` at the current position.
    ///
    /// Leading whitespace is skipped. Matches that do not start at the
    /// current position are rejected.
    pub fn next_matching(&mut self, pattern: &Regex) -> Option<String> {
        let mark = self.checkpoint();
        self.skip_whitespace();
        match pattern.find(self.remaining()) {
            Some(found) if found.start() == 0 && !found.is_empty() => {
                let taken = found.as_str().to_string();
                self.index += found.end();
                Some(taken)
            }
            _ => {
                self.restore(mark);
                None
            }
        }
    }

    /// Consumes and returns the rest of the text, trimmed.
    pub fn take_remaining(&mut self) -> Option<String> {
        let rest = self.remaining().trim();
        if rest.is_empty() {
            return None;
        }
        let taken = rest.to_string();
        self.index = self.text.len();
        Some(taken)
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_checkpoint_is_noop() {
        let mut cursor = Cursor::new("one two");
        cursor.next_word();
        let mark = cursor.checkpoint();
        cursor.restore(mark);
        assert_eq!(cursor.index(), 3);
        assert_eq!(cursor.remaining(), " two");
    }

    #[test]
    fn test_restore_rewinds() {
        let mut cursor = Cursor::new("one two three");
        let mark = cursor.checkpoint();
        cursor.next_word();
        cursor.next_word();
        cursor.restore(mark);
        assert_eq!(cursor.remaining(), "one two three");
    }

    #[test]
    fn test_consume_literal_ignores_case() {
        let mut cursor = Cursor::new("PLUS 3");
        assert!(cursor.consume_literal("plus"));
        assert_eq!(cursor.index(), 4);
        assert_eq!(cursor.remaining(), " 3");
    }

    #[test]
    fn test_consume_literal_failure_leaves_index() {
        for (text, literal) in [("plum", "plus"), ("pl", "plus"), ("", "x"), ("über", "uber")] {
            let mut cursor = Cursor::new(text);
            assert!(!cursor.consume_literal(literal));
            assert_eq!(cursor.index(), 0);
        }
    }

    #[test]
    fn test_consume_literal_multibyte() {
        let mut cursor = Cursor::new("ÜBER alles");
        assert!(cursor.consume_literal("über"));
        assert_eq!(cursor.remaining(), " alles");
    }

    #[test]
    fn test_advance_past_end_is_noop() {
        let mut cursor = Cursor::new("ab");
        assert!(!cursor.advance(3));
        assert_eq!(cursor.index(), 0);
        assert!(cursor.advance(2));
        assert!(cursor.is_exhausted());
        assert!(!cursor.advance(1));
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn test_peek() {
        let cursor = Cursor::new("héllo");
        assert_eq!(cursor.peek(2), "hé");
        assert_eq!(cursor.peek(10), "héllo");
        assert_eq!(cursor.peek_char(), Some('h'));
    }

    #[test]
    fn test_has_next_ignores_whitespace() {
        let mut cursor = Cursor::new("word   ");
        assert!(cursor.has_next());
        cursor.next_word();
        assert!(!cursor.has_next());
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.next_word(), None);
    }

    #[test]
    fn test_next_surrounded_nested() {
        let mut cursor = Cursor::new("  [a [b c] d] rest");
        assert_eq!(cursor.next_surrounded('[', ']').as_deref(), Some("a [b c] d"));
        assert_eq!(cursor.remaining(), " rest");
    }

    #[test]
    fn test_next_surrounded_unclosed() {
        let mut cursor = Cursor::new("[a b");
        assert_eq!(cursor.next_surrounded('[', ']'), None);
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_next_until() {
        let mut cursor = Cursor::new("key=value");
        assert_eq!(cursor.next_until('=').as_deref(), Some("key"));
        assert_eq!(cursor.remaining(), "value");
        assert_eq!(cursor.next_until('='), None);
        assert_eq!(cursor.remaining(), "value");
    }

    #[test]
    fn test_next_matching_anchored() {
        let pattern = Regex::new(r"<@!?\d+>").unwrap();
        let mut cursor = Cursor::new(" hi <@12>");
        assert_eq!(cursor.next_matching(&pattern), None);
        assert_eq!(cursor.index(), 0);
        cursor.next_word();
        assert_eq!(cursor.next_matching(&pattern).as_deref(), Some("<@12>"));
    }

    #[test]
    fn test_take_remaining() {
        let mut cursor = Cursor::new("say  hello there  ");
        cursor.next_word();
        assert_eq!(cursor.take_remaining().as_deref(), Some("hello there"));
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.take_remaining(), None);
    }
}
