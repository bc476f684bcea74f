use anyhow::Result;
use std::path::{Path, PathBuf};

use datashape_core::Language;

/// Walks a directory tree collecting source files by extension.
pub struct FileDiscovery {
    root_path: PathBuf,
    supported_extensions: Vec<String>,
}

impl FileDiscovery {
    /// Directories never descended into.
    const SKIPPED_DIRS: &'static [&'static str] = &[".git", "node_modules", "vendor", "tmp", "log"];

    /// Create a new FileDiscovery covering every supported language
    pub fn new(root_path: PathBuf) -> Self {
        Self::for_languages(root_path, Language::SUPPORTED)
    }

    /// Create a new FileDiscovery restricted to the given languages
    pub fn for_languages(root_path: PathBuf, languages: &[Language]) -> Self {
        Self {
            root_path,
            supported_extensions: languages
                .iter()
                .flat_map(|language| language.extensions())
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Create a new FileDiscovery with custom extensions
    pub fn with_extensions(root_path: PathBuf, extensions: Vec<String>) -> Self {
        Self {
            root_path,
            supported_extensions: extensions,
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn supported_extensions(&self) -> &[String] {
        &self.supported_extensions
    }

    pub fn is_supported_extension(&self, ext: &str) -> bool {
        self.supported_extensions.contains(&ext.to_lowercase())
    }

    fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.is_supported_extension(&ext.to_string_lossy()))
    }

    /// All matching files under the root, sorted by path
    pub fn get_files(&self) -> Result<Vec<PathBuf>> {
        self.get_files_in_path(&self.root_path)
    }

    /// All matching files under `path`, sorted by path
    pub fn get_files_in_path(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            if self.is_supported_file(path) {
                return Ok(vec![path.to_path_buf()]);
            }
            return Ok(vec![]);
        }

        if !path.is_dir() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        let mut files = Vec::new();
        self.visit_dirs(path, &mut |p: &Path| {
            if self.is_supported_file(p) {
                files.push(p.to_path_buf());
            }
        })?;
        files.sort();

        Ok(files)
    }

    /// Recursively visit directories and call callback for each file
    pub fn visit_dirs<F>(&self, dir: &Path, cb: &mut F) -> std::io::Result<()>
    where
        F: FnMut(&Path),
    {
        if dir.is_dir() {
            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.is_dir() {
                    let skipped = path
                        .file_name()
                        .is_some_and(|name| Self::SKIPPED_DIRS.contains(&name.to_string_lossy().as_ref()));
                    if !skipped {
                        self.visit_dirs(&path, cb)?;
                    }
                } else {
                    cb(&path);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_new_covers_supported_languages() {
        let discovery = FileDiscovery::new(PathBuf::from("/tmp"));
        assert!(discovery.is_supported_extension("rb"));
        assert!(discovery.is_supported_extension("JS"));
        assert!(discovery.is_supported_extension("mjs"));
        assert!(!discovery.is_supported_extension("py"));
    }

    #[test]
    fn test_for_languages_restricts_extensions() {
        let discovery = FileDiscovery::for_languages(PathBuf::from("/tmp"), &[Language::Ruby]);
        assert!(discovery.is_supported_extension("rake"));
        assert!(!discovery.is_supported_extension("js"));
    }

    #[test]
    fn test_with_extensions_uses_custom() {
        let discovery = FileDiscovery::with_extensions(PathBuf::from("/tmp"), vec!["txt".to_string()]);
        assert!(discovery.is_supported_extension("txt"));
        assert!(!discovery.is_supported_extension("rb"));
    }

    #[test]
    fn test_get_files_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let temp_path = temp_dir.path();

        fs::create_dir(temp_path.join("app")).unwrap();
        fs::create_dir(temp_path.join("node_modules")).unwrap();
        File::create(temp_path.join("z_root.rb")).unwrap();
        File::create(temp_path.join("app/user.js")).unwrap();
        File::create(temp_path.join("notes.txt")).unwrap();
        File::create(temp_path.join("node_modules/lib.js")).unwrap();

        let discovery = FileDiscovery::new(temp_path.to_path_buf());
        let files = discovery.get_files().unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("app/user.js"));
        assert!(files[1].ends_with("z_root.rb"));
    }

    #[test]
    fn test_get_files_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("single.rb");
        File::create(&file_path).unwrap();

        let discovery = FileDiscovery::new(file_path.clone());
        let files = discovery.get_files().unwrap();

        assert_eq!(files, vec![file_path]);
    }

    #[test]
    fn test_missing_path_is_error() {
        let discovery = FileDiscovery::new(PathBuf::from("/definitely/not/here"));
        assert!(discovery.get_files().is_err());
    }
}
