use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// The only section of the defines file that is read.
pub const DEFINES_SECTION: &str = "CFLAGS_sort";

#[derive(Debug, Error)]
pub enum DefinesError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Macro name to optional value.
///
/// `Some(None)` from [`Defines::get`] is a macro defined without a value;
/// `None` means the macro is not defined at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defines {
    macros: BTreeMap<String, Option<String>>,
}

impl Defines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the defines file, failing on any I/O error.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DefinesError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DefinesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Read the defines file; a missing or unreadable file gives an empty mapping.
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::read(path) {
            Ok(defines) => defines,
            Err(DefinesError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable defines file");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Self {
        let mut macros = BTreeMap::new();
        let mut in_section = false;

        for raw_line in contents.lines() {
            let line = raw_line.trim();

            if let Some(section) = section_name(line) {
                in_section = section == DEFINES_SECTION;
                continue;
            }
            if !in_section {
                continue;
            }

            if let Some(captures) = DEFINE_FLAG.captures(line) {
                let name = captures[1].to_string();
                let value = captures.get(2).map(|value| value.as_str().to_string());
                macros.insert(name, value);
            }
        }

        Self { macros }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.macros.get(name).map(|value| value.as_deref())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.macros.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.macros
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }
}

impl<N: Into<String>> FromIterator<(N, Option<String>)> for Defines {
    fn from_iter<I: IntoIterator<Item = (N, Option<String>)>>(iter: I) -> Self {
        Self {
            macros: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

fn section_name(line: &str) -> Option<&str> {
    line.strip_prefix('[')?.strip_suffix(']')
}

static DEFINE_FLAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-D([A-Za-z_][A-Za-z0-9_]*)(?:=(.*))?$").expect("valid define pattern")
});
