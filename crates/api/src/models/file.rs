use super::architecture::Layer;
use super::language::Language;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Coarse role of a file inside the project, detected by the scanner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileRole {
    Source,
    Test,
    Config,
    Entry,
    Docs,
    Manifest,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Enum,
}

impl SignatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Function => "function",
            SignatureKind::Method => "method",
            SignatureKind::Class => "class",
            SignatureKind::Interface => "interface",
            SignatureKind::Type => "type",
            SignatureKind::Enum => "enum",
        }
    }
}

impl std::str::FromStr for SignatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "function" | "fn" => Ok(SignatureKind::Function),
            "method" => Ok(SignatureKind::Method),
            "class" | "struct" => Ok(SignatureKind::Class),
            "interface" | "trait" => Ok(SignatureKind::Interface),
            "type" => Ok(SignatureKind::Type),
            "enum" => Ok(SignatureKind::Enum),
            other => Err(format!("unknown signature kind '{}'", other)),
        }
    }
}

/// A function, class or type signature extracted from source text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub name: String,
    pub kind: SignatureKind,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub exported: bool,
    pub visibility: Visibility,
    /// 1-based source line
    pub line: usize,
}

impl Signature {
    pub fn new(name: impl Into<String>, kind: SignatureKind, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            return_type: None,
            is_async: false,
            exported: false,
            visibility: Visibility::Public,
            line,
        }
    }

    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn is_type_like(&self) -> bool {
        matches!(self.kind, SignatureKind::Class | SignatureKind::Interface)
    }
}

/// Normalized record for one scanned file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Root-relative path with `/` separators
    pub path: String,
    pub size: u64,
    pub language: Language,
    pub role: FileRole,
    #[serde(default)]
    pub layer: Option<Layer>,
    /// xxh3-64 of the raw bytes, hex encoded
    pub content_hash: String,
    /// UNIX timestamp (seconds)
    pub modified: u64,
    #[serde(default)]
    pub exports: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub signatures: Vec<Signature>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    /// Syntactic framework markers (`spring-controller`, `express-router`, ...)
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
}

impl FileRecord {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Containing directory, `""` for files at the project root.
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// File name without its (last) extension.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }
}

/// A file the scanner or extractor could not process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanIssue {
    pub path: String,
    pub kind: ScanIssueKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ScanIssueKind {
    Unreadable,
    NotUtf8,
    TooLarge,
    ExtractionFailed,
}
