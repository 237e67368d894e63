//! Candidate discovery for upload.

use std::path::{Path, PathBuf};

use mediarelay_remote::TypeFilter;

/// A local file eligible for upload.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Scans `dir` (non-recursive) for files matching `filter`.
///
/// Candidates are returned sorted by name so batches process in a
/// stable order.
pub fn scan_candidates(dir: &Path, filter: &TypeFilter) -> std::io::Result<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if !filter.matches_name(&name) {
            continue;
        }

        candidates.push(Candidate {
            name,
            path: entry.path(),
            size: metadata.len(),
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_matching_files_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.png"), b"B").unwrap();
        std::fs::write(dir.path().join("a.png"), b"AA").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"T").unwrap();
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let candidates = scan_candidates(dir.path(), &TypeFilter::png()).unwrap();

        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(candidates[0].size, 2);
    }

    #[test]
    fn empty_dir_yields_no_candidates() {
        let dir = TempDir::new().unwrap();
        let candidates = scan_candidates(dir.path(), &TypeFilter::png()).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn nonexistent_dir_is_an_error() {
        let result = scan_candidates(Path::new("/nonexistent/dir"), &TypeFilter::png());
        assert!(result.is_err());
    }
}
