//! Workspace file access and source discovery.
//!
//! Reading files and listing directories go through [`WorkspaceProvider`] so
//! the scanner can be driven by something other than the local filesystem.

mod language;
mod scanner;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use language::SourceLanguage;
pub use scanner::{DirectoryScanner, IGNORED_DIRECTORIES, ScanError, SourceFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
    Other,
}

#[derive(Debug, Clone)]
pub struct DirEntryMeta {
    pub name: String,
    pub rel_path: String,
    pub kind: NodeKind,
    pub is_hidden: bool,
}

/// Access to the files of one project root.
///
/// `read_dir` returns folders before files, each group ordered by name, so
/// that every walk over the same tree visits entries in the same order.
pub trait WorkspaceProvider {
    fn root(&self) -> &Path;
    fn read_dir(&self, rel: &str) -> io::Result<Vec<DirEntryMeta>>;
    fn read_to_string(&self, rel: &str) -> io::Result<String>;
}

pub struct FsWorkspaceProvider {
    root: PathBuf,
}

impl FsWorkspaceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl WorkspaceProvider for FsWorkspaceProvider {
    fn root(&self) -> &Path {
        &self.root
    }

    fn read_dir(&self, rel: &str) -> io::Result<Vec<DirEntryMeta>> {
        let path = self.root.join(rel);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let rel_path = Path::new(rel).join(&name).to_string_lossy().to_string();
            let file_type = entry.file_type()?;
            let kind = if file_type.is_dir() {
                NodeKind::Folder
            } else if file_type.is_file() {
                NodeKind::File
            } else if file_type.is_symlink() {
                symlink_kind(&entry.path())
            } else {
                NodeKind::Other
            };
            let is_hidden = name.starts_with('.');
            entries.push(DirEntryMeta {
                name,
                rel_path,
                kind,
                is_hidden,
            });
        }
        entries.sort_by(|a, b| {
            let a_is_dir = a.kind == NodeKind::Folder;
            let b_is_dir = b.kind == NodeKind::Folder;
            b_is_dir.cmp(&a_is_dir).then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    fn read_to_string(&self, rel: &str) -> io::Result<String> {
        fs::read_to_string(self.root.join(rel))
    }
}

/// Links to files are followed. Links to directories are not, so link
/// cycles stay out of the walk; dangling links are `Other`.
fn symlink_kind(path: &Path) -> NodeKind {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => NodeKind::File,
        _ => NodeKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_dir_lists_folders_first_then_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.c"), "").unwrap();
        fs::write(dir.path().join("a.c"), "").unwrap();
        fs::create_dir(dir.path().join("zdir")).unwrap();
        fs::write(dir.path().join(".hidden"), "").unwrap();

        let provider = FsWorkspaceProvider::new(dir.path());
        let entries = provider.read_dir("").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zdir", ".hidden", "a.c", "b.c"]);
        assert_eq!(entries[0].kind, NodeKind::Folder);
        assert!(entries[1].is_hidden);
    }

    #[test]
    fn rel_paths_are_joined_onto_parent() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.c"), "int main() {}\n").unwrap();

        let provider = FsWorkspaceProvider::new(dir.path());
        let entries = provider.read_dir("src").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(Path::new(&entries[0].rel_path), Path::new("src/main.c"));
        assert_eq!(
            provider.read_to_string(&entries[0].rel_path).unwrap(),
            "int main() {}\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_listed_but_directory_links_are_not() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("real_a.c"), "int a(void);\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path().join("real_a.c"), dir.path().join("link.c")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("loop")).unwrap();
        symlink(dir.path().join("missing.c"), dir.path().join("dangling.c")).unwrap();

        let provider = FsWorkspaceProvider::new(dir.path());
        let entries = provider.read_dir("").unwrap();
        let kind_of = |name: &str| entries.iter().find(|e| e.name == name).unwrap().kind;

        assert_eq!(kind_of("link.c"), NodeKind::File);
        assert_eq!(kind_of("real_a.c"), NodeKind::File);
        assert_eq!(kind_of("sub"), NodeKind::Folder);
        assert_eq!(kind_of("loop"), NodeKind::Other);
        assert_eq!(kind_of("dangling.c"), NodeKind::Other);
        assert_eq!(
            provider.read_to_string("link.c").unwrap(),
            "int a(void);\n"
        );
    }
}
