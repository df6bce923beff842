//! Build, load and lookup over one project's canonical symbol set.

use crate::cursor::symbol_at_offset;
use crate::{
    ExtractorRegistry, Result, SqliteSymbolStore, Symbol, SymbolIndex, SymbolStore, dedup,
};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use srcnav_workspace::{DirectoryScanner, FsWorkspaceProvider, SourceLanguage, WorkspaceProvider};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Scanning,
    Parsing,
    Saving,
    Complete,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Scanning => "scanning",
            BuildPhase::Parsing => "parsing",
            BuildPhase::Saving => "saving",
            BuildPhase::Complete => "complete",
        }
    }
}

/// One progress event of a full build.
///
/// `file` is only set while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgress {
    pub phase: BuildPhase,
    pub current: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl BuildProgress {
    fn new(phase: BuildPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
            file: None,
        }
    }
}

impl fmt::Display for BuildProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.phase.as_str(), self.current, self.total)?;
        if let Some(file) = &self.file {
            write!(f, " {file}")?;
        }
        Ok(())
    }
}

pub trait ProgressSink {
    fn report(&mut self, progress: BuildProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(BuildProgress),
{
    fn report(&mut self, progress: BuildProgress) {
        self(progress)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: BuildProgress) {}
}

/// Forwards events to another thread. A disconnected receiver is not an error.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub Sender<BuildProgress>);

impl ProgressSink for ChannelProgress {
    fn report(&mut self, progress: BuildProgress) {
        let _ = self.0.send(progress);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    /// Symbols produced by extraction before dedup.
    pub raw_symbols: usize,
    /// Size of the canonical set that was persisted.
    pub symbols: usize,
}

/// In-memory index plus the store it is persisted to.
pub struct IndexSession<S: SymbolStore = SqliteSymbolStore> {
    index: SymbolIndex,
    store: S,
    extractors: ExtractorRegistry,
    scanner: DirectoryScanner,
}

impl IndexSession {
    pub fn new() -> Self {
        Self::with_store(SqliteSymbolStore::new())
    }
}

impl Default for IndexSession {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SymbolStore> IndexSession<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            index: SymbolIndex::new(),
            store,
            extractors: ExtractorRegistry::default(),
            scanner: DirectoryScanner::new(),
        }
    }

    pub fn with_scanner(mut self, scanner: DirectoryScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn find_by_name(&self, name: &str) -> &[Symbol] {
        self.index.find_by_name(name)
    }

    pub fn get_all(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drops the in-memory index. The persisted store is left alone.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Definitions of the identifier at `byte_offset` in `content`.
    ///
    /// `path` only selects the language; files of unknown type resolve to
    /// nothing.
    pub fn definitions_at(&self, path: &Path, content: &str, byte_offset: usize) -> &[Symbol] {
        let Some(language) = SourceLanguage::from_path(path) else {
            return &[];
        };
        match symbol_at_offset(content, byte_offset, language) {
            Some(symbol) => self.find_by_name(&symbol.name),
            None => &[],
        }
    }

    /// Scan, extract, dedup and persist the project under `root`.
    pub fn build_full(
        &mut self,
        root: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<BuildSummary> {
        let provider = FsWorkspaceProvider::new(root);
        self.build_from_provider(&provider, progress)
    }

    /// Same as [`IndexSession::build_full`] over any workspace provider.
    ///
    /// The in-memory index is only replaced once the store has accepted the
    /// new set; on error the previous index stays in place.
    pub fn build_from_provider(
        &mut self,
        provider: &dyn WorkspaceProvider,
        progress: &mut dyn ProgressSink,
    ) -> Result<BuildSummary> {
        let root = provider.root();
        tracing::info!(root = %root.display(), "building symbol index");

        progress.report(BuildProgress::new(BuildPhase::Scanning, 0, 0));
        let files = self.scanner.scan(provider)?;
        let total = files.len();

        let mut summary = BuildSummary {
            files_scanned: total,
            ..BuildSummary::default()
        };
        let mut raw = Vec::new();

        for (i, file) in files.iter().enumerate() {
            progress.report(BuildProgress {
                file: Some(file.file_name().to_string()),
                ..BuildProgress::new(BuildPhase::Parsing, i + 1, total)
            });

            let Some(extractor) = self.extractors.get(file.language) else {
                tracing::debug!(file = %file.rel_path, "no extractor registered");
                summary.files_skipped += 1;
                continue;
            };
            let text = match provider.read_to_string(&file.rel_path) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(file = %file.rel_path, error = %err, "skipping unreadable file");
                    summary.files_skipped += 1;
                    continue;
                }
            };
            raw.extend(extractor.extract(&file.path, &text));
        }

        summary.raw_symbols = raw.len();
        let symbols = dedup(raw);
        summary.symbols = symbols.len();

        progress.report(BuildProgress::new(BuildPhase::Saving, 0, symbols.len()));
        self.persist(&symbols, root)?;
        self.index = SymbolIndex::from_symbols(symbols);

        progress.report(BuildProgress::new(BuildPhase::Complete, total, total));
        tracing::info!(
            files = summary.files_scanned,
            skipped = summary.files_skipped,
            symbols = summary.symbols,
            "symbol index built"
        );
        Ok(summary)
    }

    fn persist(&mut self, symbols: &[Symbol], root: &Path) -> Result<()> {
        let saved = self
            .store
            .open(root)
            .and_then(|()| self.store.save_symbols(symbols, root));
        self.store.close();
        saved?;
        Ok(())
    }

    /// Load a previous build of `root`. Returns `false` when none exists.
    pub fn load_persisted(&mut self, root: &Path) -> Result<bool> {
        if !self.store.exists(root) {
            return Ok(false);
        }
        let loaded = self
            .store
            .open(root)
            .and_then(|()| self.store.load(root));
        self.store.close();

        self.index = loaded?;
        tracing::info!(
            names = self.index.symbol_count(),
            definitions = self.index.definition_count(),
            "loaded persisted symbols"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StoreError, SymbolKind};
    use srcnav_workspace::{DirEntryMeta, NodeKind};
    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const LIST_H: &str = "\
#ifndef LIST_H
#define LIST_H

struct list_node {
    struct list_node *next;
};

typedef struct list_node list_node_t;

#endif
";

    const LIST_C: &str = "\
#include \"list.h\"

struct list_node {
    int unused;
};

static int list_len(struct list_node *head)
{
    int n = 0;
    return n;
}
";

    const TOOL_PY: &str = "\
class Runner:
    def run(self):
        return list_len()
";

    fn write_project(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/list.h"), LIST_H).unwrap();
        fs::write(root.join("src/list.c"), LIST_C).unwrap();
        fs::write(root.join("tool.py"), TOOL_PY).unwrap();
        fs::write(root.join("README.md"), "# list\n").unwrap();
        fs::write(root.join("node_modules/pkg/dep.c"), "int dep(void)\n{\n}\n").unwrap();
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: HashMap<PathBuf, Vec<Symbol>>,
        open: bool,
        fail_save: bool,
    }

    impl SymbolStore for MemoryStore {
        fn open(&mut self, _root: &Path) -> std::result::Result<(), StoreError> {
            self.open = true;
            Ok(())
        }

        fn exists(&self, root: &Path) -> bool {
            self.saved.contains_key(root)
        }

        fn load(&mut self, root: &Path) -> std::result::Result<SymbolIndex, StoreError> {
            let symbols = self.saved.get(root).cloned().unwrap_or_default();
            Ok(SymbolIndex::from_symbols(symbols))
        }

        fn save_symbols(
            &mut self,
            symbols: &[Symbol],
            root: &Path,
        ) -> std::result::Result<usize, StoreError> {
            if !self.open || self.fail_save {
                return Err(StoreError::NotOpen);
            }
            self.saved.insert(root.to_path_buf(), symbols.to_vec());
            Ok(symbols.len())
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    /// Two files, one of which cannot be read.
    struct FlakyProvider {
        root: PathBuf,
    }

    impl WorkspaceProvider for FlakyProvider {
        fn root(&self) -> &Path {
            &self.root
        }

        fn read_dir(&self, rel: &str) -> io::Result<Vec<DirEntryMeta>> {
            if !rel.is_empty() {
                return Ok(Vec::new());
            }
            Ok(["bad.c", "good.c"]
                .into_iter()
                .map(|name| DirEntryMeta {
                    name: name.to_string(),
                    rel_path: name.to_string(),
                    kind: NodeKind::File,
                    is_hidden: false,
                })
                .collect())
        }

        fn read_to_string(&self, rel: &str) -> io::Result<String> {
            match rel {
                "good.c" => Ok("int good(void)\n{\n}\n".to_string()),
                _ => Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            }
        }
    }

    #[test]
    fn build_full_indexes_and_persists() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_project(root);

        let mut events = Vec::new();
        let mut session = IndexSession::new();
        let summary = session
            .build_full(root, &mut |progress: BuildProgress| events.push(progress))
            .unwrap();

        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.files_skipped, 0);
        // every `struct list_node` mention matches; one per file survives
        assert_eq!(summary.raw_symbols, 9);
        assert_eq!(summary.symbols, 6);

        let nodes = session.find_by_name("list_node");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|s| s.kind == SymbolKind::Struct));
        assert_eq!(session.find_by_name("list_len")[0].line, 7);
        assert_eq!(session.find_by_name("Runner")[0].kind, SymbolKind::Class);
        assert!(session.find_by_name("dep").is_empty());
        assert!(session.store().exists(root));

        let phases: Vec<_> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                BuildPhase::Scanning,
                BuildPhase::Parsing,
                BuildPhase::Parsing,
                BuildPhase::Parsing,
                BuildPhase::Saving,
                BuildPhase::Complete,
            ]
        );
        let parsed: Vec<_> = events
            .iter()
            .filter(|e| e.phase == BuildPhase::Parsing)
            .map(|e| (e.current, e.total, e.file.clone().unwrap()))
            .collect();
        assert_eq!(
            parsed,
            vec![
                (1, 3, "list.c".to_string()),
                (2, 3, "list.h".to_string()),
                (3, 3, "tool.py".to_string()),
            ]
        );
    }

    #[test]
    fn load_persisted_restores_previous_build() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_project(root);

        let mut fresh = IndexSession::new();
        assert!(!fresh.load_persisted(root).unwrap());

        let mut builder = IndexSession::new();
        builder.build_full(root, &mut NoProgress).unwrap();

        assert!(fresh.load_persisted(root).unwrap());
        assert_eq!(fresh.get_all(), builder.get_all());

        fresh.clear();
        assert!(fresh.get_all().is_empty());
        assert!(fresh.store().exists(root));
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let provider = FlakyProvider {
            root: PathBuf::from("/virtual"),
        };
        let mut session = IndexSession::with_store(MemoryStore::default());
        let summary = session
            .build_from_provider(&provider, &mut NoProgress)
            .unwrap();

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(session.find_by_name("good").len(), 1);
        assert_eq!(session.store().saved[Path::new("/virtual")].len(), 1);
    }

    #[test]
    fn failed_save_keeps_previous_index() {
        let provider = FlakyProvider {
            root: PathBuf::from("/virtual"),
        };
        let mut session = IndexSession::with_store(MemoryStore::default());
        session.build_from_provider(&provider, &mut NoProgress).unwrap();

        session.store.fail_save = true;
        let err = session.build_from_provider(&provider, &mut NoProgress);
        assert!(matches!(err, Err(crate::SymbolError::Store(StoreError::NotOpen))));
        assert_eq!(session.find_by_name("good").len(), 1);
        assert!(!session.store().open);
    }

    #[test]
    fn languages_without_an_extractor_are_skipped() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_project(root);

        let mut extractors = ExtractorRegistry::empty();
        extractors.register(
            SourceLanguage::Python,
            Box::new(crate::PatternExtractor::for_language(SourceLanguage::Python)),
        );
        let mut session =
            IndexSession::with_store(MemoryStore::default()).with_extractors(extractors);
        let summary = session.build_full(root, &mut NoProgress).unwrap();

        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.files_skipped, 2);
        assert_eq!(session.find_by_name("Runner").len(), 1);
        assert!(session.find_by_name("list_len").is_empty());
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let dir = tempdir().unwrap();
        let mut session = IndexSession::with_store(MemoryStore::default());
        let err = session.build_full(&dir.path().join("absent"), &mut NoProgress);
        assert!(matches!(err, Err(crate::SymbolError::Scan(_))));
    }

    #[test]
    fn progress_flows_through_a_channel() {
        let provider = FlakyProvider {
            root: PathBuf::from("/virtual"),
        };
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut session = IndexSession::with_store(MemoryStore::default());
        session
            .build_from_provider(&provider, &mut ChannelProgress(tx))
            .unwrap();

        let last = rx.try_iter().last().unwrap();
        assert_eq!(last.phase, BuildPhase::Complete);
        assert_eq!((last.current, last.total), (2, 2));
        assert_eq!(last.to_string(), "complete 2/2");
    }

    #[test]
    fn definitions_at_resolves_identifier_under_cursor() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_project(root);
        let mut session = IndexSession::new();
        session.build_full(root, &mut NoProgress).unwrap();

        let offset = TOOL_PY.find("list_len").unwrap() + 3;
        let found = session.definitions_at(Path::new("tool.py"), TOOL_PY, offset);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].file_path, root.join("src/list.c"));

        let usage = "struct list_node *n;\n";
        let found = session.definitions_at(Path::new("use.c"), usage, 9);
        assert_eq!(found.len(), 2);

        assert!(session.definitions_at(Path::new("notes.txt"), usage, 9).is_empty());
    }
}
