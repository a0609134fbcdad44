use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// Language class of a scanned file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Language(#[schemars(with = "String")] Cow<'static, str>);

impl Language {
    pub const JAVASCRIPT: Language = Language(Cow::Borrowed("javascript"));
    pub const TYPESCRIPT: Language = Language(Cow::Borrowed("typescript"));
    pub const PYTHON: Language = Language(Cow::Borrowed("python"));
    pub const JAVA: Language = Language(Cow::Borrowed("java"));
    pub const KOTLIN: Language = Language(Cow::Borrowed("kotlin"));
    pub const GO: Language = Language(Cow::Borrowed("go"));
    pub const RUST: Language = Language(Cow::Borrowed("rust"));
    pub const RUBY: Language = Language(Cow::Borrowed("ruby"));
    pub const PHP: Language = Language(Cow::Borrowed("php"));
    pub const CSHARP: Language = Language(Cow::Borrowed("csharp"));
    pub const VUE: Language = Language(Cow::Borrowed("vue"));
    pub const JSON: Language = Language(Cow::Borrowed("json"));
    pub const YAML: Language = Language(Cow::Borrowed("yaml"));
    pub const TOML: Language = Language(Cow::Borrowed("toml"));
    pub const MARKDOWN: Language = Language(Cow::Borrowed("markdown"));
    pub const UNKNOWN: Language = Language(Cow::Borrowed("unknown"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Map a file extension to a Language.
    /// Returns `None` for extensions the scanner does not track.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JAVASCRIPT),
            "ts" | "tsx" | "mts" | "cts" => Some(Self::TYPESCRIPT),
            "py" => Some(Self::PYTHON),
            "java" => Some(Self::JAVA),
            "kt" | "kts" => Some(Self::KOTLIN),
            "go" => Some(Self::GO),
            "rs" => Some(Self::RUST),
            "rb" => Some(Self::RUBY),
            "php" => Some(Self::PHP),
            "cs" => Some(Self::CSHARP),
            "vue" | "svelte" => Some(Self::VUE),
            "json" => Some(Self::JSON),
            "yml" | "yaml" => Some(Self::YAML),
            "toml" => Some(Self::TOML),
            "md" | "mdx" => Some(Self::MARKDOWN),
            _ => None,
        }
    }

    /// Detect the language class from a path, including extension-less manifests.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        match name {
            "Dockerfile" | "Makefile" | "Gemfile" | "Procfile" | "Pipfile" | "pom.xml"
            | "build.gradle" | "build.gradle.kts" | "requirements.txt" | "go.mod" => {
                return Some(Self::UNKNOWN);
            }
            _ => {}
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether signature extraction is meaningful for this language.
    pub fn is_code(&self) -> bool {
        !matches!(
            self.as_str(),
            "json" | "yaml" | "toml" | "markdown" | "unknown"
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for Language {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
