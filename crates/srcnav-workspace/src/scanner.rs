//! Recursive discovery of indexable source files.

use crate::{NodeKind, SourceLanguage, WorkspaceProvider};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Directory names that never contain sources worth indexing.
pub const IGNORED_DIRECTORIES: &[&str] = &[
    "node_modules",
    "__pycache__",
    "build",
    "dist",
    "out",
    "target",
];

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A file the extractor can handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub rel_path: String,
    pub language: SourceLanguage,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.rel_path
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.rel_path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryScanner {
    extra_ignored: Vec<String>,
}

impl DirectoryScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip these directory names in addition to [`IGNORED_DIRECTORIES`].
    pub fn with_ignored_directories<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_ignored.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        IGNORED_DIRECTORIES.contains(&name) || self.extra_ignored.iter().any(|dir| dir == name)
    }

    /// Walk the provider's root and return every file with a supported
    /// language, in walk order.
    ///
    /// Only a failure to list the root itself is an error; unreadable
    /// sub-directories are skipped.
    pub fn scan(&self, provider: &dyn WorkspaceProvider) -> Result<Vec<SourceFile>, ScanError> {
        let entries = provider.read_dir("").map_err(|source| ScanError::Io {
            path: provider.root().to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        self.visit(provider, entries, &mut files);
        tracing::debug!(
            root = %provider.root().display(),
            files = files.len(),
            "scanned workspace"
        );
        Ok(files)
    }

    fn visit(
        &self,
        provider: &dyn WorkspaceProvider,
        entries: Vec<crate::DirEntryMeta>,
        files: &mut Vec<SourceFile>,
    ) {
        for entry in entries {
            if entry.is_hidden {
                continue;
            }
            match entry.kind {
                NodeKind::Folder => {
                    if self.is_ignored_dir(&entry.name) {
                        continue;
                    }
                    match provider.read_dir(&entry.rel_path) {
                        Ok(children) => self.visit(provider, children, files),
                        Err(err) => {
                            tracing::warn!(dir = %entry.rel_path, error = %err, "skipping unreadable directory");
                        }
                    }
                }
                NodeKind::File => {
                    if let Some(language) = SourceLanguage::from_path(&entry.name) {
                        files.push(SourceFile {
                            path: provider.root().join(&entry.rel_path),
                            rel_path: entry.rel_path,
                            language,
                        });
                    }
                }
                NodeKind::Other => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsWorkspaceProvider;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn rel_paths(files: &[SourceFile]) -> Vec<PathBuf> {
        files.iter().map(|f| PathBuf::from(&f.rel_path)).collect()
    }

    #[test]
    fn finds_supported_files_and_skips_the_rest() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/net")).unwrap();
        fs::write(root.join("src/main.c"), "int main(void) { return 0; }\n").unwrap();
        fs::write(root.join("src/net/sock.h"), "struct sock;\n").unwrap();
        fs::write(root.join("tool.py"), "def run():\n    pass\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        fs::write(root.join("Makefile"), "all:\n").unwrap();

        let files = DirectoryScanner::new()
            .scan(&FsWorkspaceProvider::new(root))
            .unwrap();

        assert_eq!(
            rel_paths(&files),
            vec![
                PathBuf::from("src/net/sock.h"),
                PathBuf::from("src/main.c"),
                PathBuf::from("tool.py"),
            ]
        );
        assert_eq!(files[0].language, SourceLanguage::C);
        assert_eq!(files[2].language, SourceLanguage::Python);
        assert_eq!(files[1].path, root.join("src/main.c"));
        assert_eq!(files[0].file_name(), "sock.h");
    }

    #[test]
    fn skips_hidden_and_ignored_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for sub in [".git", "node_modules", "__pycache__", "build", "vendor", "lib"] {
            fs::create_dir_all(root.join(sub)).unwrap();
            fs::write(root.join(sub).join("x.c"), "void x(void);\n").unwrap();
        }
        fs::write(root.join(".hidden.c"), "void h(void);\n").unwrap();

        let files = DirectoryScanner::new()
            .with_ignored_directories(["vendor"])
            .scan(&FsWorkspaceProvider::new(root))
            .unwrap();

        assert_eq!(rel_paths(&files), vec![PathBuf::from("lib/x.c")]);
    }

    #[test]
    fn order_is_stable_across_runs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for name in ["b.c", "a.c", "c.py"] {
            fs::write(root.join(name), "").unwrap();
        }
        fs::create_dir(root.join("inc")).unwrap();
        fs::write(root.join("inc/z.h"), "").unwrap();

        let scanner = DirectoryScanner::new();
        let provider = FsWorkspaceProvider::new(root);
        let first = scanner.scan(&provider).unwrap();
        let second = scanner.scan(&provider).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].rel_path, Path::new("inc/z.h").to_string_lossy());
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let provider = FsWorkspaceProvider::new(dir.path().join("missing"));
        let err = DirectoryScanner::new().scan(&provider).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_sources_are_scanned() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("real_a.c"), "int a(void);\n").unwrap();
        std::os::unix::fs::symlink(root.join("real_a.c"), root.join("link.c")).unwrap();

        let files = DirectoryScanner::new()
            .scan(&FsWorkspaceProvider::new(root))
            .unwrap();
        assert_eq!(
            rel_paths(&files),
            vec![PathBuf::from("link.c"), PathBuf::from("real_a.c")]
        );
    }
}
