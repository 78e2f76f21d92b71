//! Source position and span tracking for the SL front-end.
//!
//! A single SL program is one source file, but the map still keys
//! positions by a `FileId` the way a multi-file compiler would: it
//! costs nothing extra and keeps `probsl-diagnostics` able to print a
//! `file:line:col` header uniformly.

use std::collections::HashMap;
use std::fmt;

/// A 1-based line/column position, plus the byte offset it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

/// A contiguous range of source text within a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self {
            start,
            end,
            file_id,
        }
    }

    pub fn single_position(pos: SourcePosition, file_id: FileId) -> Self {
        Self {
            start: pos,
            end: SourcePosition::new(pos.line, pos.column + 1, pos.byte_offset + 1),
            file_id,
        }
    }

    /// Merge two spans from the same file into their enclosing span.
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot merge spans from different files"
        );

        let start = if self.start.byte_offset <= other.start.byte_offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.byte_offset >= other.end.byte_offset {
            self.end
        } else {
            other.end
        };

        SourceSpan::new(start, end, self.file_id)
    }
}

/// Identifies a source file registered with a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

impl FileId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// The text of a registered source file plus precomputed line starts.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// 1-based line lookup; `None` past the end of the file.
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_number - 1];
        let end = if line_number < self.line_starts.len() {
            self.line_starts[line_number]
        } else {
            self.content.len()
        };

        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };

        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        (line_index + 1, offset - line_start + 1)
    }

    pub fn offset_to_position(&self, offset: usize) -> SourcePosition {
        let (line, column) = self.offset_to_line_col(offset);
        SourcePosition::new(line, column, offset)
    }

    pub fn end_of_file_position(&self) -> SourcePosition {
        self.offset_to_position(self.content.len())
    }
}

/// Registers source files and answers position/line queries against them.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: HashMap<FileId, SourceFile>,
    next_id: usize,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: String, content: String) -> FileId {
        let file_id = FileId(self.next_id);
        self.next_id += 1;
        self.files.insert(file_id, SourceFile::new(name, content));
        file_id
    }

    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(&file_id)
    }

    pub fn get_line(&self, file_id: FileId, line_number: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line_number)
    }

    pub fn offset_to_position(&self, file_id: FileId, offset: usize) -> Option<SourcePosition> {
        self.get_file(file_id).map(|f| f.offset_to_position(offset))
    }

    pub fn span_from_offsets(
        &self,
        file_id: FileId,
        start: usize,
        end: usize,
    ) -> Option<SourceSpan> {
        let file = self.get_file(file_id)?;
        Some(SourceSpan::new(
            file.offset_to_position(start),
            file.offset_to_position(end),
            file_id,
        ))
    }
}

fn compute_line_starts(source: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    for (i, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push(i + 1);
        }
    }
    line_starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_lookup() {
        let mut map = SourceMap::new();
        let file = map.add_file("test.sl".into(), "line 1\nline 2\nline 3".into());

        assert_eq!(map.get_line(file, 1), Some("line 1"));
        assert_eq!(map.get_line(file, 3), Some("line 3"));
        assert_eq!(map.get_line(file, 4), None);
    }

    #[test]
    fn offset_to_line_col() {
        let mut map = SourceMap::new();
        let file = map.add_file("test.sl".into(), "hello\nworld\ntest".into());

        assert_eq!(map.offset_to_position(file, 0).unwrap().line, 1);
        assert_eq!(map.offset_to_position(file, 6).unwrap(), SourcePosition::new(2, 1, 6));
        assert_eq!(map.offset_to_position(file, 12).unwrap(), SourcePosition::new(3, 1, 12));
    }

    #[test]
    fn span_merge() {
        let file = FileId::new(0);
        let a = SourceSpan::new(SourcePosition::new(1, 1, 0), SourcePosition::new(1, 5, 4), file);
        let b = SourceSpan::new(SourcePosition::new(1, 3, 2), SourcePosition::new(1, 8, 7), file);

        let merged = a.merge(b);
        assert_eq!(merged.start.byte_offset, 0);
        assert_eq!(merged.end.byte_offset, 7);
    }
}
