//! # Context Code Chunker
//!
//! AST-aware splitting of source files into token-budgeted chunks for
//! retrieval and embedding.
//!
//! ## Pipeline
//!
//! ```text
//! (path, content)
//!     │
//!     ├──> Skip filter (size, extension, binary sniff)
//!     │
//!     ├──> Language detection → cached tree-sitter parser
//!     │
//!     ├──> Structural pass
//!     │    ├─> Chunkable declarations (functions, classes, interfaces)
//!     │    ├─> Gaps between them as blocks (when large enough)
//!     │    └─> Oversized regions split by a line window with overlap
//!     │
//!     ├──> Line-window fallback when there is no grammar or no structure
//!     │
//!     └──> Sort, merge small neighbours, re-index
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use context_code_chunker::{Chunker, ChunkingConfig};
//!
//! # async fn run() -> context_code_chunker::Result<()> {
//! let chunker = Chunker::new(ChunkingConfig::default())?;
//!
//! let code = "export function add(a: number, b: number) {\n  return a + b;\n}\n";
//! for chunk in chunker.chunk_file("src/math.ts", code, None).await {
//!     println!("{} [{}-{}] {:?}", chunk.id, chunk.start_line, chunk.end_line, chunk.chunk_type);
//! }
//! # Ok(())
//! # }
//! ```

mod ast_analyzer;
mod chunker;
mod config;
mod error;
mod filter;
mod language;
mod parser;
mod source;
mod strategy;
mod types;

pub use chunker::{Chunker, ChunkingStats};
pub use config::ChunkingConfig;
pub use error::{ChunkerError, Result};
pub use filter::{looks_binary, skip_reason, SkipReason, BINARY_SAMPLE_BYTES, MAX_FILE_BYTES};
pub use language::{language_label, Language};
pub use parser::{ParserProvider, ParserRuntime, SharedParser, TreeSitterProvider};
pub use source::line_count;
pub use types::{content_hash, estimate_tokens, ChunkMetadata, ChunkType, CodeChunk};

/// Re-export of the parser crate so callers can hand in pre-parsed trees
pub use tree_sitter;
