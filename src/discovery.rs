// src/discovery.rs
//! Finds C++ sources under the given paths and reads them into units.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analysis::SourceUnit;
use crate::error::{EngineError, Result};

/// Extensions treated as C++ sources or headers.
pub const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c", "h", "hpp", "hxx", "hh", "ipp", "tpp"];

/// Files larger than this are skipped.
pub const MAX_FILE_BYTES: u64 = 50_000;

const PRUNED_DIRS: &[&str] = &["build", "node_modules", "third_party", "vendor", "external", "deps", ".git", "out"];

#[must_use]
pub fn should_prune(dir_name: &str) -> bool {
    PRUNED_DIRS.contains(&dir_name) || dir_name.starts_with("cmake-build-")
}

#[must_use]
pub fn is_cpp_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CPP_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)))
}

/// Expands `roots` into a sorted, deduplicated list of C++ files.
/// A root that is a file is kept as given, whatever its extension.
///
/// # Errors
/// Returns an error if a root does not exist.
pub fn discover(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        let meta = fs::metadata(root).map_err(|source| EngineError::Io { source, path: root.clone() })?;
        if meta.is_file() {
            files.push(root.clone());
            continue;
        }
        files.extend(walk(root));
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !should_prune(&e.file_name().to_string_lossy()));

    let mut paths = Vec::new();
    let mut errors = 0usize;
    for item in walker {
        match item {
            Ok(entry) if entry.file_type().is_file() && is_cpp_source(entry.path()) => {
                paths.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                errors += 1;
                debug!(error = %e, "walk error");
            }
        }
    }
    if errors > 0 {
        warn!(root = %root.display(), errors, "encountered errors during file walk");
    }
    paths
}

/// Reads `files` into units. Oversized files are skipped; unreadable ones
/// are errors. Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
/// Returns an error if a file cannot be read.
pub fn load_units(files: &[PathBuf]) -> Result<Vec<SourceUnit>> {
    let mut units = Vec::with_capacity(files.len());
    for path in files {
        let meta = fs::metadata(path).map_err(|source| EngineError::Io { source, path: path.clone() })?;
        if meta.len() > MAX_FILE_BYTES {
            debug!(path = %path.display(), bytes = meta.len(), "skipping oversized file");
            continue;
        }
        let bytes = fs::read(path).map_err(|source| EngineError::Io { source, path: path.clone() })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        units.push(SourceUnit::new(display_name(path), text));
    }
    Ok(units)
}

/// Forward-slash path without a leading `./`.
#[must_use]
pub fn display_name(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.strip_prefix("./").map_or_else(|| s.clone(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, content).expect("write file");
    }

    #[test]
    fn walks_cpp_files_and_prunes_build_dirs() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        touch(root, "src/a.cpp", "int a;");
        touch(root, "src/a.hpp", "int b;");
        touch(root, "src/notes.txt", "hello");
        touch(root, "build/gen.cpp", "int c;");
        touch(root, "cmake-build-debug/x.cc", "int d;");
        touch(root, "third_party/lib.h", "int e;");

        let files = discover(&[root.to_path_buf()]).expect("discover");
        let names: Vec<String> = files
            .iter()
            .map(|p| display_name(p.strip_prefix(root).unwrap_or(p)))
            .collect();
        assert_eq!(names, vec!["src/a.cpp", "src/a.hpp"]);
    }

    #[test]
    fn explicit_file_is_kept() {
        let dir = tempfile::tempdir().expect("temp dir");
        touch(dir.path(), "snippet.inl", "int a;");
        let file = dir.path().join("snippet.inl");
        assert_eq!(discover(&[file.clone()]).expect("discover"), vec![file]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(matches!(discover(&[dir.path().join("nope")]), Err(EngineError::Io { .. })));
    }

    #[test]
    fn oversized_files_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        touch(dir.path(), "big.cpp", &"x".repeat(60_000));
        touch(dir.path(), "small.cpp", "int a;");
        let files = discover(&[dir.path().to_path_buf()]).expect("discover");
        let units = load_units(&files).expect("load");
        assert_eq!(units.len(), 1);
        assert!(units[0].file.ends_with("small.cpp"));
        assert_eq!(units[0].text, "int a;");
    }

    #[test]
    fn display_name_strips_dot_slash() {
        assert_eq!(display_name(Path::new("./src/a.cpp")), "src/a.cpp");
        assert_eq!(display_name(Path::new("src/b.h")), "src/b.h");
    }
}
