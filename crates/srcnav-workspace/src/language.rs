use std::path::Path;

/// Languages the symbol extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceLanguage {
    C,
    Cpp,
    Python,
}

impl SourceLanguage {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "c" | "h" => Some(SourceLanguage::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" | "inl" => Some(SourceLanguage::Cpp),
            "py" => Some(SourceLanguage::Python),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceLanguage::C => "c",
            SourceLanguage::Cpp => "cpp",
            SourceLanguage::Python => "python",
        }
    }

    /// C and C++ share the declaration matchers, including `typedef`.
    pub fn is_c_family(&self) -> bool {
        matches!(self, SourceLanguage::C | SourceLanguage::Cpp)
    }
}
