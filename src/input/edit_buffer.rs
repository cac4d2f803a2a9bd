use std::ops::Range;

/// Text being edited plus the insertion point.
///
/// The point is a byte offset and always sits on a char boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    text: String,
    point: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let point = text.len();
        Self { text, point }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn point(&self) -> usize {
        self.point
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn at_end(&self) -> bool {
        self.point == self.text.len()
    }

    /// Move the point, snapping back to the previous char boundary.
    pub fn set_point(&mut self, point: usize) {
        let mut point = point.min(self.text.len());
        while !self.text.is_char_boundary(point) {
            point -= 1;
        }
        self.point = point;
    }

    /// Insert at the point and move the point past the insertion.
    pub fn insert(&mut self, s: &str) {
        self.text.insert_str(self.point, s);
        self.point += s.len();
    }

    pub fn insert_char(&mut self, ch: char) {
        self.text.insert(self.point, ch);
        self.point += ch.len_utf8();
    }

    /// Delete `range`, keeping the point on the same character when it lies
    /// after the range.
    pub fn delete(&mut self, range: Range<usize>) {
        let start = range.start.min(self.text.len());
        let end = range.end.clamp(start, self.text.len());
        self.text.replace_range(start..end, "");
        if self.point >= end {
            self.point -= end - start;
        } else if self.point > start {
            self.point = start;
        }
    }

    /// Offset of the character before the point.
    pub fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.point].char_indices().next_back().map(|(i, _)| i)
    }

    /// Offset just past the character after the point.
    pub fn next_boundary(&self) -> Option<usize> {
        self.text[self.point..]
            .chars()
            .next()
            .map(|c| self.point + c.len_utf8())
    }

    /// Replace the whole text, point at `point`.
    pub fn replace(&mut self, text: impl Into<String>, point: usize) {
        self.text = text.into();
        self.set_point(point);
    }

    /// Take the text out, leaving the buffer empty.
    pub fn take(&mut self) -> String {
        self.point = 0;
        std::mem::take(&mut self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_delete_track_point() {
        let mut buffer = EditBuffer::from_text("hello world");
        buffer.set_point(5);
        buffer.insert(",");
        assert_eq!(buffer.text(), "hello, world");
        assert_eq!(buffer.point(), 6);

        buffer.delete(0..2);
        assert_eq!(buffer.text(), "llo, world");
        assert_eq!(buffer.point(), 4);

        buffer.delete(2..8);
        assert_eq!(buffer.text(), "llld");
        assert_eq!(buffer.point(), 2);
    }

    #[test]
    fn test_point_stays_on_char_boundary() {
        let mut buffer = EditBuffer::from_text("aé");
        buffer.set_point(2);
        assert_eq!(buffer.point(), 1);
        assert_eq!(buffer.next_boundary(), Some(3));

        buffer.set_point(100);
        assert!(buffer.at_end());
        assert_eq!(buffer.prev_boundary(), Some(1));
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut buffer = EditBuffer::from_text("x = 1");
        assert_eq!(buffer.take(), "x = 1");
        assert!(buffer.is_empty());
        assert_eq!(buffer.point(), 0);
    }
}
