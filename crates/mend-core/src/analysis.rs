//! Repository structure analysis.
//!
//! A cheap pre-test walk of the cloned tree: counts test and source
//! files and detects the languages present. The result feeds logging and
//! the run's detection context only; runner selection happens separately
//! in the test execution provider.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use walkdir::WalkDir;

/// Summary of a repository's tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoStructure {
    pub has_tests: bool,
    pub test_files: Vec<String>,
    pub source_files: Vec<String>,
    pub languages: Vec<String>,
}

/// Walk the repository tree, skipping dot-directories and `node_modules`.
pub fn scan(root: &Path) -> RepoStructure {
    let mut structure = RepoStructure::default();
    let mut languages = BTreeSet::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.depth() > 0 && entry.file_type().is_dir()
            && (name.starts_with('.') || name == "node_modules"))
    });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();
        let name = entry.file_name().to_string_lossy();

        if name.contains("test") || name.contains("spec") || rel_path.contains("test") {
            structure.has_tests = true;
            structure.test_files.push(rel_path.clone());
        }

        let ext = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        match ext.as_str() {
            "js" | "ts" | "jsx" | "tsx" => {
                languages.insert("javascript".to_string());
                structure.source_files.push(rel_path);
            }
            "py" => {
                languages.insert("python".to_string());
                structure.source_files.push(rel_path);
            }
            "java" => {
                languages.insert("java".to_string());
                structure.source_files.push(rel_path);
            }
            _ => {}
        }
    }

    structure.languages = languages.into_iter().collect();
    info!(
        test_files = structure.test_files.len(),
        source_files = structure.source_files.len(),
        languages = ?structure.languages,
        "analyzed repository structure"
    );
    structure
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_detects_tests_and_languages() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/__tests__")).unwrap();
        std::fs::write(dir.path().join("src/app.ts"), "export {};").unwrap();
        std::fs::write(dir.path().join("src/__tests__/app.test.ts"), "test();").unwrap();
        std::fs::write(dir.path().join("util.py"), "x = 1").unwrap();

        let structure = scan(dir.path());
        assert!(structure.has_tests);
        assert_eq!(structure.test_files.len(), 1);
        assert_eq!(structure.source_files.len(), 3);
        assert_eq!(structure.languages, vec!["javascript", "python"]);
    }

    #[test]
    fn scan_skips_node_modules_and_dot_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), ";").unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config.js"), ";").unwrap();

        let structure = scan(dir.path());
        assert!(structure.source_files.is_empty());
        assert!(!structure.has_tests);
    }
}
