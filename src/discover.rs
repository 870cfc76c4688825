//! File discovery: turn a list of CLI paths into a sorted, deterministic list of test files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn has_test_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("t") | Some("md") => true,
        _ => false,
    }
}

/// Resolve one CLI argument into the test files it names: itself if it's a file, or every
/// `.t`/`.md` entry under it (recursively, depth-first, sorted) if it's a directory.
pub fn discover(path: &Path) -> io::Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path)?;
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    walk_dir(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for entry in entries {
        // A symlink is followed when it names a file, but never recursed into as a
        // directory: that would hand symlink-cycle detection to this walk instead of the
        // filesystem, which this tool does not attempt.
        let link_meta = fs::symlink_metadata(&entry)?;
        if link_meta.is_symlink() {
            if let Ok(target_meta) = fs::metadata(&entry) {
                if target_meta.is_file() && has_test_extension(&entry) {
                    out.push(entry);
                }
            }
            continue;
        }

        if link_meta.is_dir() {
            walk_dir(&entry, out)?;
        } else if link_meta.is_file() && has_test_extension(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

/// Resolve every CLI path argument, in order, flattening and re-sorting each directory's
/// contribution while preserving the relative order of distinct top-level arguments.
pub fn discover_all(paths: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(discover(path)?);
    }
    Ok(all)
}
