//! Source text shared by every stage of the pipeline.
//!
//! The text is wrapped in an `Arc` so Asts, Issues and Programs built from
//! it can hold on to it without copying. Line starts are computed once so
//! diagnostics can map byte offsets to line and column.

use std::fmt;
use std::sync::Arc;

/// Expression text plus a description used when reporting diagnostics.
#[derive(Clone)]
pub struct SourceCode {
    text: Arc<String>,
    description: Arc<str>,
    line_offsets: Arc<[usize]>,
}

/// 1-based line, 0-based column counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl SourceCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self::with_description(code, "<input>")
    }

    pub fn with_description(code: impl Into<String>, description: impl Into<Arc<str>>) -> Self {
        let text = code.into();
        let line_offsets = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(index, _)| index + 1))
            .collect();
        SourceCode {
            text: Arc::new(text),
            description: description.into(),
            line_offsets,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Byte offsets at which each line starts.
    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    pub fn offset_location(&self, offset: usize) -> Option<Location> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return None;
        }
        let line_index = match self.line_offsets.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_offsets[line_index];
        Some(Location {
            line: line_index + 1,
            column: self.text[line_start..offset].chars().count(),
        })
    }

    /// Text of a 1-based line without its terminator.
    pub fn line(&self, line: usize) -> Option<&str> {
        let start = *self.line_offsets.get(line.checked_sub(1)?)?;
        let end = self
            .line_offsets
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        Some(self.text[start..end].trim_end_matches('\r'))
    }
}

impl From<&str> for SourceCode {
    fn from(code: &str) -> Self {
        SourceCode::new(code)
    }
}

impl From<String> for SourceCode {
    fn from(code: String) -> Self {
        SourceCode::new(code)
    }
}

impl fmt::Debug for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceCode({}, {} bytes)", self.description, self.text.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_location() {
        let source = SourceCode::new("a &&\n  bé || c");
        assert_eq!(source.offset_location(0), Some(Location { line: 1, column: 0 }));
        assert_eq!(source.offset_location(5), Some(Location { line: 2, column: 0 }));
        // "é" is two bytes wide but one column.
        assert_eq!(source.offset_location(10), Some(Location { line: 2, column: 4 }));
        assert_eq!(source.offset_location(100), None);
    }

    #[test]
    fn test_line() {
        let source = SourceCode::new("first\r\nsecond\nthird");
        assert_eq!(source.line(1), Some("first"));
        assert_eq!(source.line(2), Some("second"));
        assert_eq!(source.line(3), Some("third"));
        assert_eq!(source.line(0), None);
        assert_eq!(source.line(4), None);
    }

    #[test]
    fn test_source_is_send_sync() {
        fn is_send<T: Send>() {}
        fn is_sync<T: Sync>() {}
        is_send::<SourceCode>();
        is_sync::<SourceCode>();
    }
}
