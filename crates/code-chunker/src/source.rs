use crate::error::{ChunkerError, Result};

/// Source text with a byte offset → line lookup table
pub(crate) struct SourceText<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { text, line_starts }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Text in `start..end`, or an error if the range is not on char boundaries
    pub fn slice(&self, start: usize, end: usize) -> Result<&'a str> {
        self.text
            .get(start..end)
            .ok_or(ChunkerError::InvalidBoundaries { start, end })
    }

    /// 1-based line containing byte `offset`
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(next) => next,
        }
    }

    /// 1-based inclusive line span of the non-empty byte range `start..end`
    pub fn line_span(&self, start: usize, end: usize) -> (usize, usize) {
        let last = end.saturating_sub(1).max(start);
        (self.line_of(start), self.line_of(last))
    }
}

/// Number of lines in `text`, ignoring a single trailing newline.
pub fn line_count(text: &str) -> usize {
    split_lines(text).len()
}

/// Lines of `text` split on `\n`; a trailing newline does not open a new line.
pub(crate) fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_offsets_to_lines() {
        let source = SourceText::new("ab\ncd\n\nef");
        assert_eq!(source.line_of(0), 1);
        assert_eq!(source.line_of(2), 1);
        assert_eq!(source.line_of(3), 2);
        assert_eq!(source.line_of(6), 3);
        assert_eq!(source.line_of(7), 4);
        assert_eq!(source.line_span(3, 7), (2, 3));
        assert_eq!(source.line_span(7, 9), (4, 4));
    }

    #[test]
    fn slicing_checks_char_boundaries() {
        let source = SourceText::new("é");
        assert!(source.slice(0, 1).is_err());
        assert_eq!(source.slice(0, 2).unwrap(), "é");
    }

    #[test]
    fn counts_lines() {
        assert_eq!(line_count(""), 0);
        assert_eq!(line_count("a"), 1);
        assert_eq!(line_count("a\n"), 1);
        assert_eq!(line_count("a\n\nb"), 3);
        assert_eq!(split_lines("a\r\nb\n"), vec!["a\r", "b"]);
    }
}
