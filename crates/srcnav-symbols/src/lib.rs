//! Symbol indexing for C/C++ and Python source trees
//!
//! Declarations are found by per-language pattern matching over raw text,
//! canonicalized by [`dedup`], persisted per project root in a SQLite file and
//! served by name for go-to-definition.
//!
//! # Example
//!
//! ```no_run
//! use srcnav_symbols::{BuildProgress, IndexSession, SymbolKind};
//! use std::path::Path;
//!
//! let mut session = IndexSession::new();
//! let root = Path::new("/path/to/project");
//! if !session.load_persisted(root).unwrap() {
//!     session
//!         .build_full(root, &mut |progress: BuildProgress| println!("{progress}"))
//!         .unwrap();
//! }
//!
//! for symbol in session.find_by_name("MyStruct") {
//!     assert_eq!(symbol.kind, SymbolKind::Struct);
//! }
//! ```

mod cursor;
mod dedup;
mod extract;
mod index;
mod position;
mod session;
mod store;
mod symbol;

pub use cursor::{CursorSymbol, symbol_at_offset};
pub use dedup::{INDEXED_KINDS, NAME_BLOCKLIST, dedup};
pub use extract::{ExtractorRegistry, PatternExtractor, SymbolExtractor};
pub use index::SymbolIndex;
pub use position::{LineIndex, Position, offset_to_position};
pub use session::{
    BuildPhase, BuildProgress, BuildSummary, ChannelProgress, IndexSession, NoProgress,
    ProgressSink,
};
pub use store::{SqliteSymbolStore, StoreError, SymbolStore};
pub use symbol::{ParseKindError, Symbol, SymbolKind};

/// Error type for symbol indexing operations
#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    #[error("Symbol store error: {0}")]
    Store(#[from] StoreError),

    #[error("Workspace scan failed: {0}")]
    Scan(#[from] srcnav_workspace::ScanError),
}

pub type Result<T> = std::result::Result<T, SymbolError>;
