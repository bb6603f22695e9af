//! Line-delimited JSON output, one object per line.

use super::persist_atomically;
use crate::error::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Replace `path` with one JSON line per item. Returns the number of lines.
pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<usize> {
    persist_atomically(path, |w| {
        for item in items {
            serde_json::to_writer(&mut *w, item)?;
            w.write_all(b"\n").map_err(|e| Error::io(path, e))?;
        }
        Ok(())
    })?;
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let items = vec![json!({"a": 1}), json!({"b": [1, 2]})];

        assert_eq!(write_jsonl(&path, &items).unwrap(), 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"a\":1}\n{\"b\":[1,2]}\n");
    }

    #[test]
    fn empty_input_truncates_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "stale\n").unwrap();

        write_jsonl::<Value>(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
