//! Line reader for NDJSON files. Blank lines are skipped but still counted.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// A single line could not be turned into a JSON record.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json error: record is not an object")]
    NotAnObject,

    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// One non-blank line with its 1-based line number.
#[derive(Debug)]
pub struct RawLine {
    pub line: usize,
    pub text: std::result::Result<String, LineError>,
}

pub struct JsonlLines<R> {
    path: PathBuf,
    inner: std::io::Split<R>,
    line_no: usize,
}

impl JsonlLines<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(path, BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlLines<R> {
    pub fn new(path: &Path, reader: R) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: reader.split(b'\n'),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonlLines<R> {
    type Item = Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let bytes = match self.inner.next()? {
                Ok(bytes) => bytes,
                Err(e) => return Some(Err(Error::io(&self.path, e))),
            };
            self.line_no += 1;
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    return Some(Ok(RawLine {
                        line: self.line_no,
                        text: Err(LineError::InvalidUtf8),
                    }))
                }
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(Ok(RawLine {
                line: self.line_no,
                text: Ok(trimmed.to_string()),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(input: &[u8]) -> Vec<RawLine> {
        JsonlLines::new(Path::new("mem.jsonl"), Cursor::new(input.to_vec()))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn skips_blank_lines_but_counts_them() {
        let out = lines(b"{\"a\":1}\n\n   \n{\"b\":2}\r\n");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, 1);
        assert_eq!(out[1].line, 4);
        assert_eq!(out[1].text.as_deref().unwrap(), "{\"b\":2}");
    }

    #[test]
    fn last_line_without_newline_is_read() {
        let out = lines(b"{}\n{\"x\":true}");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].line, 2);
    }

    #[test]
    fn invalid_utf8_is_a_line_error() {
        let out = lines(b"{}\n\xff\xfe\n{}\n");
        assert_eq!(out.len(), 3);
        assert!(matches!(out[1].text, Err(LineError::InvalidUtf8)));
        assert_eq!(out[2].line, 3);
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let err = JsonlLines::open(Path::new("/nonexistent/definitely/missing.jsonl"));
        assert!(matches!(err, Err(Error::Io { .. })));
    }
}
