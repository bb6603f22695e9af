//! Input discovery and line reading for newline-delimited JSON event files
//! produced by the on-chain and feed ingestion jobs.

mod reader;

pub use reader::{JsonlLines, LineError, RawLine};

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const INPUT_EXTENSION: &str = "jsonl";

/// Where a record came from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOrigin {
    pub file: PathBuf,
    /// 1-based, counting blank lines
    pub line: usize,
}

impl fmt::Display for RecordOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| self.file.to_string_lossy());
        write!(f, "{}:{}", name, self.line)
    }
}

/// `*.jsonl` files directly inside `dir`, sorted by name. A missing
/// directory yields nothing.
pub fn jsonl_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            Error::io(path, e.into())
        })?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == INPUT_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Inputs for a build run: each directory's files in turn, directories in
/// the order given.
pub fn gather_inputs(dirs: &[&Path]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for dir in dirs {
        inputs.extend(jsonl_files_in(dir)?);
    }
    Ok(inputs)
}

/// Expand user-supplied paths: directories become their `*.jsonl` files,
/// anything else is taken as a file.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(jsonl_files_in(path)?);
        } else {
            out.push(path.clone());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_jsonl_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jsonl", "a.jsonl", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.jsonl")).unwrap();

        let files = jsonl_files_in(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);
    }

    #[test]
    fn missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = jsonl_files_in(&dir.path().join("absent")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn gather_keeps_directory_order() {
        let ingest = tempfile::tempdir().unwrap();
        let fixtures = tempfile::tempdir().unwrap();
        std::fs::write(ingest.path().join("z.jsonl"), "").unwrap();
        std::fs::write(fixtures.path().join("a.jsonl"), "").unwrap();

        let inputs = gather_inputs(&[ingest.path(), fixtures.path()]).unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].ends_with("z.jsonl"));
        assert!(inputs[1].ends_with("a.jsonl"));
    }

    #[test]
    fn expand_mixes_files_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.jsonl"), "").unwrap();
        let explicit = PathBuf::from("explicit.jsonl");

        let out = expand_paths(&[explicit.clone(), dir.path().to_path_buf()]).unwrap();
        assert_eq!(out[0], explicit);
        assert!(out[1].ends_with("one.jsonl"));
    }

    #[test]
    fn origin_displays_file_name_and_line() {
        let origin = RecordOrigin {
            file: PathBuf::from("/data/fixtures/sample.jsonl"),
            line: 7,
        };
        assert_eq!(origin.to_string(), "sample.jsonl:7");
    }
}
