//! Source positions, the position-tracked output buffer, and the
//! forward-only offset-to-position converter.

use std::fmt;

/// A 1-based (line, column) coordinate within a piece of source text.
///
/// Ordering is lexicographic: first by line, then by column. Absent or
/// unknown positions are represented as `Option<Position>::None` throughout
/// the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The first character of a text: line 1, column 1.
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Append-only text accumulator that tracks its own cursor position.
///
/// Every newline pushed advances the line counter and resets the column;
/// any other character advances the column. The accumulated text is handed
/// off to the generated-language front end when code generation finishes.
#[derive(Debug)]
pub struct PositionBuffer {
    text: String,
    cursor: Position,
}

impl PositionBuffer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            cursor: Position::start(),
        }
    }

    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.cursor.line += 1;
                self.cursor.column = 1;
            } else {
                self.cursor.column += 1;
            }
        }
        self.text.push_str(text);
    }

    /// Cursor position after the most recent append; the position the next
    /// appended character will occupy.
    pub fn position(&self) -> Position {
        self.cursor
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl Default for PositionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts byte offsets in a fixed source text to positions.
///
/// The cursor only moves forward. Querying an offset behind the cursor is
/// handled correctly but rescans from the start of the text, so in-order
/// queries cost one pass over the source in total while out-of-order
/// queries pay for a fresh scan each time.
#[derive(Debug)]
pub struct PositionTracker<'a> {
    source: &'a str,
    offset: usize,
    cursor: Position,
}

impl<'a> PositionTracker<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            cursor: Position::start(),
        }
    }

    /// Position of the character at `offset`.
    pub fn position_at(&mut self, offset: usize) -> Position {
        if offset < self.offset {
            self.offset = 0;
            self.cursor = Position::start();
        }
        while self.offset < offset {
            let Some(ch) = self.source[self.offset..].chars().next() else {
                break;
            };
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.cursor.line += 1;
                self.cursor.column = 1;
            } else {
                self.cursor.column += 1;
            }
        }
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 9) < Position::new(2, 1));
        assert!(Position::new(3, 4) < Position::new(3, 5));
        assert_eq!(Position::new(2, 2), Position::new(2, 2));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(5, 12).to_string(), "5:12");
    }

    #[test]
    fn test_buffer_tracks_columns() {
        let mut buf = PositionBuffer::new();
        assert_eq!(buf.position(), Position::start());
        buf.push_str("abc");
        assert_eq!(buf.position(), Position::new(1, 4));
    }

    #[test]
    fn test_buffer_tracks_lines() {
        let mut buf = PositionBuffer::new();
        buf.push_str("ab\ncd\n");
        assert_eq!(buf.position(), Position::new(3, 1));
        buf.push_str("x");
        assert_eq!(buf.position(), Position::new(3, 2));
        assert_eq!(buf.as_str(), "ab\ncd\nx");
    }

    #[test]
    fn test_buffer_multiple_appends() {
        let mut buf = PositionBuffer::new();
        buf.push_str("one");
        buf.push_str("\n");
        buf.push_str("two");
        assert_eq!(buf.position(), Position::new(2, 4));
        assert_eq!(buf.into_string(), "one\ntwo");
    }

    #[test]
    fn test_tracker_in_order() {
        let mut tracker = PositionTracker::new("ab\ncde\nf");
        assert_eq!(tracker.position_at(0), Position::new(1, 1));
        assert_eq!(tracker.position_at(1), Position::new(1, 2));
        assert_eq!(tracker.position_at(3), Position::new(2, 1));
        assert_eq!(tracker.position_at(5), Position::new(2, 3));
        assert_eq!(tracker.position_at(7), Position::new(3, 1));
    }

    #[test]
    fn test_tracker_out_of_order_rescans() {
        let mut tracker = PositionTracker::new("ab\ncde");
        assert_eq!(tracker.position_at(5), Position::new(2, 3));
        // Backward query forces a rescan from the start but stays correct
        assert_eq!(tracker.position_at(1), Position::new(1, 2));
        assert_eq!(tracker.position_at(3), Position::new(2, 1));
    }

    #[test]
    fn test_tracker_past_end_clamps() {
        let mut tracker = PositionTracker::new("ab");
        assert_eq!(tracker.position_at(99), Position::new(1, 3));
    }

    #[test]
    fn test_tracker_multibyte() {
        let mut tracker = PositionTracker::new("é\nz");
        assert_eq!(tracker.position_at(2), Position::new(1, 2));
        assert_eq!(tracker.position_at(3), Position::new(2, 1));
    }
}
