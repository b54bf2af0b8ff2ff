use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A contiguous, token-budgeted slice of one source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    /// Deterministic id: `<filepath>:<start>-<end>:<hash prefix>`
    pub id: String,

    /// Source file path
    pub filepath: String,

    /// The chunk text
    pub content: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Position within the file's chunk sequence
    pub index: usize,

    /// Lowercase hex SHA-256 of `content`
    pub content_hash: String,

    /// Structural role of the chunk
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    pub metadata: ChunkMetadata,
}

impl CodeChunk {
    /// Create a new chunk; `id` and `content_hash` are derived from the inputs.
    #[must_use]
    pub fn new(
        filepath: impl Into<String>,
        start_line: usize,
        end_line: usize,
        content: String,
        chunk_type: ChunkType,
        metadata: ChunkMetadata,
    ) -> Self {
        let filepath = filepath.into();
        let content_hash = content_hash(&content);
        let id = chunk_id(&filepath, start_line, end_line, &content_hash);
        Self {
            id,
            filepath,
            content,
            start_line,
            end_line,
            index: 0,
            content_hash,
            chunk_type,
            metadata,
        }
    }

    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Get estimated token count
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.content)
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// Metadata about a code chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Programming language (grammar id or best-effort label)
    pub language: String,

    /// Declared function or method name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    /// Enclosing class for methods, own name for class-like chunks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// First source line of the node, trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ChunkMetadata {
    /// Create metadata with language only
    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    /// Builder: set function name
    #[must_use]
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Builder: set class name
    #[must_use]
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// Builder: set signature
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Type of code chunk based on semantic meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Standalone function
    Function,
    /// Function nested in a class, impl or trait
    Method,
    /// Class, struct or enum definition
    Class,
    /// Interface, trait or type alias
    Interface,
    /// Module-level code between declarations
    Block,
}

impl ChunkType {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Block => "block",
        }
    }
}

/// Estimate tokens from content: `ceil(chars / 4)`.
///
/// The budget defaults are tuned against this heuristic.
#[must_use]
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count().div_ceil(4)
}

/// Lowercase hex SHA-256 of the content.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn chunk_id(filepath: &str, start_line: usize, end_line: usize, hash: &str) -> String {
    let prefix = hash.get(..12).unwrap_or(hash);
    format!("{filepath}:{start_line}-{end_line}:{prefix}")
}
