use anyhow::{anyhow, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
}

/// Lists the documents directly inside `dir` whose extension matches
/// `extension` (case-insensitive, without the leading dot).
///
/// Subdirectories are not descended into. The result is sorted so that
/// uploads happen in a stable order.
pub fn discover_documents(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    debug!("Looking for *.{} documents in {:?}", extension, dir);

    if !dir.is_dir() {
        return Err(anyhow!("Specified path is not a directory: {:?}", dir));
    }

    let extension = extension.trim_start_matches('.');
    let mut documents: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extension))
        .map(|e| e.into_path())
        .collect();
    documents.sort();

    if documents.is_empty() {
        warn!("No *.{} files found in {:?}", extension, dir);
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_discover_documents_top_level_only() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        File::create(root.join("b.pdf")).unwrap();
        File::create(root.join("a.PDF")).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        fs::create_dir(root.join("nested")).unwrap();
        File::create(root.join("nested/c.pdf")).unwrap();

        let docs = discover_documents(root, "pdf").unwrap();

        assert_eq!(docs, vec![root.join("a.PDF"), root.join("b.pdf")]);
    }

    #[test]
    fn test_discover_documents_accepts_dotted_extension() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("handbook.pdf")).unwrap();

        let docs = discover_documents(dir.path(), ".pdf").unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_discover_documents_skips_directories_named_like_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("folder.pdf")).unwrap();

        let docs = discover_documents(dir.path(), "pdf").unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_discover_documents_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(discover_documents(dir.path(), "pdf").unwrap().is_empty());
    }

    #[test]
    fn test_discover_documents_not_a_directory() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a_file.pdf");
        File::create(&file_path).unwrap();

        let result = discover_documents(&file_path, "pdf");
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }
}
