use crate::ast_analyzer::AstAnalyzer;
use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::filter;
use crate::language::{language_label, Language};
use crate::parser::{ParserProvider, ParserRuntime};
use crate::strategy::LineWindow;
use crate::types::{estimate_tokens, ChunkMetadata, ChunkType, CodeChunk};
use std::sync::Arc;
use tree_sitter::Tree;

/// Main chunker interface for processing code
pub struct Chunker {
    config: ChunkingConfig,
    runtime: ParserRuntime,
}

impl Chunker {
    /// Create a new chunker backed by the bundled tree-sitter grammars
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runtime: ParserRuntime::default(),
        })
    }

    /// Create a chunker that acquires parsers from `provider`
    pub fn with_provider(config: ChunkingConfig, provider: Arc<dyn ParserProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            runtime: ParserRuntime::new(provider),
        })
    }

    /// Chunk one file snapshot.
    ///
    /// Never fails: skipped files yield no chunks, and parse problems degrade
    /// to line-based chunking. Pass `tree` when the file was already parsed.
    pub async fn chunk_file(
        &self,
        file_path: &str,
        content: &str,
        tree: Option<&Tree>,
    ) -> Vec<CodeChunk> {
        if let Some(reason) = filter::skip_reason(file_path, content) {
            log::debug!("Skipping {file_path}: {reason:?}");
            return Vec::new();
        }
        if content.trim().is_empty() {
            return Vec::new();
        }

        let chunks = match self.runtime.detect_language(file_path) {
            Some(language) => match self.chunk_with_ast(file_path, content, language, tree).await {
                Ok(chunks) if !chunks.is_empty() => chunks,
                Ok(_) => {
                    log::debug!("No chunkable nodes in {file_path}, using line-based chunking");
                    self.chunk_by_lines(file_path, content)
                }
                Err(e) => {
                    log::warn!(
                        "AST chunking failed for {file_path} ({}), falling back to line-based: {e}",
                        language.as_str()
                    );
                    self.chunk_by_lines(file_path, content)
                }
            },
            None => self.chunk_by_lines(file_path, content),
        };

        self.post_process_chunks(chunks)
    }

    /// Chunk using AST analysis
    async fn chunk_with_ast(
        &self,
        file_path: &str,
        content: &str,
        language: Language,
        tree: Option<&Tree>,
    ) -> Result<Vec<CodeChunk>> {
        let parsed;
        let tree = match tree {
            Some(tree) => tree,
            None => {
                parsed = self.runtime.parse(language, content).await?;
                &parsed
            }
        };

        AstAnalyzer::new(&self.config, language, file_path, content).chunk(tree.root_node())
    }

    /// Token-window chunking over the whole file
    fn chunk_by_lines(&self, file_path: &str, content: &str) -> Vec<CodeChunk> {
        let language = language_label(file_path);
        LineWindow::new(&self.config)
            .split(content, 1)
            .into_iter()
            .map(|slice| {
                CodeChunk::new(
                    file_path,
                    slice.start_line,
                    slice.end_line,
                    slice.content,
                    ChunkType::Block,
                    ChunkMetadata::with_language(language),
                )
            })
            .collect()
    }

    /// Order, merge and re-index chunks
    fn post_process_chunks(&self, mut chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        chunks.sort_by_key(|chunk| chunk.start_line);

        let mut chunks = self.merge_small_adjacent_chunks(chunks);
        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = index;
        }
        chunks
    }

    fn merge_small_adjacent_chunks(&self, chunks: Vec<CodeChunk>) -> Vec<CodeChunk> {
        let min_tokens = self.config.min_chunk_tokens;
        let max_tokens = self.config.max_chunk_tokens;
        let max_lines = self.config.max_chunk_lines;

        let mut out: Vec<CodeChunk> = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if let Some(prev) = out.last_mut() {
                let same_file = prev.filepath == chunk.filepath;
                let both_small =
                    prev.estimated_tokens() < min_tokens && chunk.estimated_tokens() < min_tokens;
                let end_line = prev.end_line.max(chunk.end_line);
                let fits_lines = end_line - prev.start_line < max_lines;

                if same_file && both_small && fits_lines {
                    let content = format!("{}\n{}", prev.content, chunk.content);
                    if estimate_tokens(&content) <= max_tokens {
                        *prev = Self::merge_pair(prev, chunk, content);
                        continue;
                    }
                }
            }

            out.push(chunk);
        }

        out
    }

    fn merge_pair(prev: &CodeChunk, next: CodeChunk, content: String) -> CodeChunk {
        let chunk_type = if prev.chunk_type == next.chunk_type {
            prev.chunk_type
        } else {
            ChunkType::Block
        };

        // Degrade scalar metadata when it no longer describes a single symbol.
        let mut metadata = prev.metadata.clone();
        if metadata.function_name != next.metadata.function_name {
            metadata.function_name = None;
        }
        if metadata.class_name != next.metadata.class_name {
            metadata.class_name = None;
        }
        if metadata.signature != next.metadata.signature {
            metadata.signature = None;
        }

        CodeChunk::new(
            prev.filepath.clone(),
            prev.start_line,
            prev.end_line.max(next.end_line),
            content,
            chunk_type,
            metadata,
        )
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Get statistics about chunking
    #[must_use]
    pub fn stats(chunks: &[CodeChunk]) -> ChunkingStats {
        let tokens: Vec<usize> = chunks.iter().map(CodeChunk::estimated_tokens).collect();
        let total_tokens: usize = tokens.iter().sum();
        ChunkingStats {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(CodeChunk::line_count).sum(),
            total_tokens,
            avg_tokens_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_tokens / chunks.len()
            },
            min_tokens: tokens.iter().copied().min().unwrap_or(0),
            max_tokens: tokens.iter().copied().max().unwrap_or(0),
        }
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
            runtime: ParserRuntime::default(),
        }
    }
}

/// Statistics about chunking results
#[derive(Debug, Clone)]
pub struct ChunkingStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_tokens: usize,
    pub avg_tokens_per_chunk: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Tokens: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.total_lines,
            self.total_tokens,
            self.avg_tokens_per_chunk,
            self.min_tokens,
            self.max_tokens
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RUST_CODE: &str = r#"
use std::collections::HashMap;

/// Main function
fn main() {
    println!("Hello, world!");
}

struct Point {
    x: i32,
    y: i32,
}
"#;

    fn block(start: usize, end: usize, content: &str) -> CodeChunk {
        CodeChunk::new(
            "test.txt",
            start,
            end,
            content.to_string(),
            ChunkType::Block,
            ChunkMetadata::with_language("text"),
        )
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ChunkingConfig {
            min_chunk_tokens: 1_000,
            ..ChunkingConfig::default()
        };
        assert!(Chunker::new(config).is_err());
    }

    #[tokio::test]
    async fn test_chunk_file() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk_file("test.rs", RUST_CODE, None).await;
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.metadata.language == "rust"));
    }

    #[tokio::test]
    async fn test_chunking_stats() {
        let chunker = Chunker::default();
        let chunks = chunker.chunk_file("test.rs", RUST_CODE, None).await;
        let stats = Chunker::stats(&chunks);

        assert_eq!(stats.total_chunks, chunks.len());
        assert!(stats.total_tokens > 0);
        assert!(stats.avg_tokens_per_chunk > 0);
        assert!(stats.to_string().starts_with("Chunks: "));
    }

    #[test]
    fn post_process_merges_small_adjacent_chunks() {
        let chunker = Chunker::default();
        let out = chunker.post_process_chunks(vec![block(1, 1, "a"), block(2, 2, "b")]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_line, 1);
        assert_eq!(out[0].end_line, 2);
        assert_eq!(out[0].content, "a\nb");
        assert_eq!(out[0].index, 0);
        assert_eq!(out[0].content_hash, crate::types::content_hash("a\nb"));
    }

    #[test]
    fn post_process_keeps_chunks_at_or_above_min_tokens() {
        let chunker = Chunker::default();
        let big = "x".repeat(400); // exactly 100 tokens
        let out = chunker.post_process_chunks(vec![block(1, 1, "a"), block(2, 2, &big)]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].index, 0);
        assert_eq!(out[1].index, 1);
    }

    #[test]
    fn merge_respects_combined_budget() {
        let config = ChunkingConfig {
            max_chunk_tokens: 20,
            min_chunk_tokens: 15,
            overlap_tokens: 0,
            max_chunk_lines: 100,
        };
        let chunker = Chunker::new(config).unwrap();
        let piece = "y".repeat(48); // 12 tokens each, 25 merged
        let out = chunker.post_process_chunks(vec![block(1, 1, &piece), block(2, 2, &piece)]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn merge_degrades_mismatched_metadata() {
        let chunker = Chunker::default();
        let f = CodeChunk::new(
            "a.ts",
            1,
            1,
            "function f() {}".to_string(),
            ChunkType::Function,
            ChunkMetadata::with_language("typescript")
                .function_name("f")
                .signature("function f() {}"),
        );
        let c = CodeChunk::new(
            "a.ts",
            3,
            3,
            "class C {}".to_string(),
            ChunkType::Class,
            ChunkMetadata::with_language("typescript").class_name("C"),
        );
        let out = chunker.post_process_chunks(vec![f, c]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].chunk_type, ChunkType::Block);
        assert_eq!(out[0].metadata.function_name, None);
        assert_eq!(out[0].metadata.class_name, None);
        assert_eq!(out[0].metadata.language, "typescript");
        assert_eq!((out[0].start_line, out[0].end_line), (1, 3));
    }
}
