//! A data structure for tracking source positions, heavily adapted from
//! [codemap](https://crates.io/crates/codemap).

use core::fmt;

/// A range of text within a string.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Span {
    /// The position of the first byte of the span.
    pub start: usize,

    /// The position after the last byte of the span.
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// A 1-indexed line and column, plus the byte offset they were computed from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LineCol {
    /// The line number.
    pub line: usize,
    /// The column number, in characters.
    pub column: usize,
    /// The byte offset.
    pub offset: usize,
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A record of a source file’s lines.
#[derive(Clone)]
pub struct FileMap<'a> {
    /// The source file.
    source: &'a str,

    /// Byte positions of line beginnings.
    lines: Vec<usize>,
}

impl fmt::Debug for FileMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut limit = 100.min(self.source.len());
        while !self.source.is_char_boundary(limit) {
            limit += 1;
        }

        f.debug_struct("FileMap")
            .field(
                "source",
                &format!(
                    "{}{}",
                    &self.source[..limit],
                    if self.source.len() > limit { "…" } else { "" }
                ),
            )
            .finish()
    }
}

impl core::ops::Deref for FileMap<'_> {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.source
    }
}

impl<'a> FileMap<'a> {
    /// Creates a new file map for the given source.
    pub fn new(source: &'a str) -> Self {
        let lines = core::iter::once(0)
            .chain(memchr::memchr_iter(b'\n', source.as_bytes()).map(|pos| pos + 1))
            .collect();

        Self { source, lines }
    }

    /// Gets the line and column of a byte position.
    ///
    /// # Panics
    ///
    /// * If `pos` is not within this file's span
    /// * If `pos` points to a byte in the middle of a UTF-8 character
    pub fn find_line_col(&self, pos: usize) -> LineCol {
        let line = self.find_line(pos);
        let line_span = self.line_span(line);
        let column = self.source[line_span.start..pos].chars().count();
        LineCol {
            line: line + 1,
            column: column + 1,
            offset: pos,
        }
    }

    /// Gets the 0-indexed line number of a byte position.
    ///
    /// # Panics
    ///
    ///  * If `pos` is not within this file's span
    fn find_line(&self, pos: usize) -> usize {
        assert!(pos <= self.source.len());
        match self.lines.binary_search(&pos) {
            Ok(i) => i,
            Err(i) => i - 1,
        }
    }

    /// Gets the span representing a 0-indexed line, including its line
    /// terminator.
    fn line_span(&self, line: usize) -> Span {
        let start = self.lines.get(line).copied().unwrap_or(self.source.len());
        let end = self
            .lines
            .get(line + 1)
            .copied()
            .unwrap_or(self.source.len());
        Span { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col() {
        let map = FileMap::new("ab\ncdé\n\nf");
        assert_eq!(map.find_line_col(0).to_string(), "1:1");
        assert_eq!(map.find_line_col(2).to_string(), "1:3");
        assert_eq!(map.find_line_col(3).to_string(), "2:1");
        assert_eq!(map.find_line_col(7).to_string(), "2:4");
        assert_eq!(map.find_line_col(9).to_string(), "4:1");
        assert_eq!(map.find_line_col(10).to_string(), "4:2");
    }
}
