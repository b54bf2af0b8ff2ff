use async_trait::async_trait;
use context_code_chunker::{
    ChunkType, Chunker, ChunkerError, ChunkingConfig, CodeChunk, Language, ParserProvider,
    ParserRuntime, TreeSitterProvider, MAX_FILE_BYTES,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tree_sitter::Parser;

/// Slow provider that counts how many parsers it built
#[derive(Default)]
struct CountingProvider {
    built: AtomicUsize,
}

#[async_trait]
impl ParserProvider for CountingProvider {
    async fn acquire_parser(&self, language: Language) -> context_code_chunker::Result<Parser> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.built.fetch_add(1, Ordering::SeqCst);
        TreeSitterProvider.acquire_parser(language).await
    }
}

/// Provider whose grammars never load
struct BrokenProvider;

#[async_trait]
impl ParserProvider for BrokenProvider {
    async fn acquire_parser(&self, _language: Language) -> context_code_chunker::Result<Parser> {
        Err(ChunkerError::tree_sitter("grammar unavailable"))
    }
}

fn function(name: &str) -> String {
    format!(
        "function {name}(input: number): number {{\n  const scaled = input * 2 + 1;\n  const shifted = scaled - 3;\n  return shifted * shifted;\n}}"
    )
}

fn assert_indexed(chunks: &[CodeChunk]) {
    for (expected, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, expected);
    }
}

#[tokio::test]
async fn skipped_files_yield_no_chunks() {
    let chunker = Chunker::default();

    let huge = "a".repeat(2 * MAX_FILE_BYTES);
    assert!(chunker.chunk_file("big.ts", &huge, None).await.is_empty());
    assert!(chunker
        .chunk_file("blob.ts", "const a = 1;\0\0\0", None)
        .await
        .is_empty());
    assert!(chunker
        .chunk_file("data.xyz", "hello world", None)
        .await
        .is_empty());
    assert!(chunker.chunk_file("NOTES", "hello", None).await.is_empty());
    assert!(chunker.chunk_file("empty.ts", "  \n\n", None).await.is_empty());
}

#[tokio::test]
async fn conventional_extensionless_files_are_chunked() {
    let chunker = Chunker::default();
    let chunks = chunker
        .chunk_file("Dockerfile", "FROM rust:1.80\nRUN cargo build --release\n", None)
        .await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_type, ChunkType::Block);
    assert_eq!(chunks[0].metadata.language, "dockerfile");
    assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
}

#[tokio::test]
async fn small_adjacent_functions_merge_into_one_chunk() {
    let _ = env_logger::builder().is_test(true).try_init();
    let code = format!("{}\n\n{}\n", function("alpha"), function("beta"));
    let chunker = Chunker::default();
    let chunks = chunker.chunk_file("src/math.ts", &code, None).await;

    assert_eq!(chunks.len(), 1);
    let merged = &chunks[0];
    assert_eq!(merged.index, 0);
    assert_eq!(merged.chunk_type, ChunkType::Function);
    assert_eq!((merged.start_line, merged.end_line), (1, 11));
    assert!(merged.estimated_tokens() <= chunker.config().max_chunk_tokens);
    assert!(merged.content.contains("function alpha"));
    assert!(merged.content.contains("function beta"));
    // two different symbols: the name no longer applies
    assert_eq!(merged.metadata.function_name, None);
    assert_eq!(merged.metadata.language, "typescript");
}

#[tokio::test]
async fn rechunking_is_deterministic() {
    let code = format!("{}\n\n{}\n", function("alpha"), function("beta"));
    let chunker = Chunker::default();

    let first = chunker.chunk_file("src/math.ts", &code, None).await;
    let second = chunker.chunk_file("src/math.ts", &code, None).await;
    assert_eq!(first, second);
    assert!(first[0].id.starts_with("src/math.ts:1-11:"));
    assert_eq!(first[0].id.len(), "src/math.ts:1-11:".len() + 12);
}

#[tokio::test]
async fn chunks_respect_budgets() {
    let code: String = (0..20)
        .map(|i| {
            let body: String = (0..30).map(|j| format!("  total += step{j} * {i};\n")).collect();
            format!("export function task{i}(total: number) {{\n{body}  return total;\n}}\n\n")
        })
        .collect();
    let chunker = Chunker::default();
    let chunks = chunker.chunk_file("tasks.ts", &code, None).await;

    assert_eq!(chunks.len(), 20);
    assert_indexed(&chunks);
    for chunk in &chunks {
        assert!(chunk.estimated_tokens() <= 512, "{} too large", chunk.id);
        assert!(chunk.line_count() <= 100);
        assert_eq!(chunk.chunk_type, ChunkType::Function);
    }
    assert!(chunks.windows(2).all(|w| w[0].start_line < w[1].start_line));
}

#[tokio::test]
async fn line_fallback_covers_every_line() {
    let text: String = (0..400)
        .map(|i| format!("Paragraph {i} describes a part of the system in plain words.\n"))
        .collect();
    let chunker = Chunker::default();
    let chunks = chunker.chunk_file("docs/guide.md", &text, None).await;

    assert!(chunks.len() > 1);
    assert_indexed(&chunks);
    for line in 1..=400 {
        assert!(
            chunks.iter().any(|c| c.contains_line(line)),
            "line {line} not covered"
        );
    }
    assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Block));
    assert!(chunks.iter().all(|c| c.metadata.language == "markdown"));
    assert!(chunks.iter().all(|c| c.estimated_tokens() <= 512));
}

#[tokio::test]
async fn short_lines_do_not_multiply_line_windows() {
    let text = "x\n".repeat(2_000);
    let chunker = Chunker::default();
    let chunks = chunker.chunk_file("data.txt", &text, None).await;

    assert_indexed(&chunks);
    assert!(chunks.len() <= 45, "{} chunks", chunks.len());
    assert!(chunks.iter().all(|c| c.end_line - c.start_line < 100));
    let emitted: usize = chunks.iter().map(|c| c.end_line - c.start_line + 1).sum();
    assert!(emitted <= 2 * 2_000 + 100, "{emitted} lines emitted");
    for line in 1..=2_000 {
        assert!(chunks.iter().any(|c| c.contains_line(line)), "line {line} not covered");
    }
}

#[tokio::test]
async fn grammar_without_declarations_falls_back_to_lines() {
    let chunker = Chunker::default();
    let chunks = chunker
        .chunk_file("config.js", "module.exports = { a: 1 };\n", None)
        .await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_type, ChunkType::Block);
    assert_eq!(chunks[0].metadata.language, "javascript");
}

#[tokio::test]
async fn parser_failure_degrades_to_line_chunks() {
    let chunker =
        Chunker::with_provider(ChunkingConfig::default(), Arc::new(BrokenProvider)).unwrap();
    let code = function("alpha");
    let chunks = chunker.chunk_file("a.ts", &code, None).await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_type, ChunkType::Block);
    assert_eq!(chunks[0].metadata.language, "typescript");
    assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 5));
}

#[tokio::test]
async fn pre_parsed_tree_skips_parser_acquisition() {
    let code = function("alpha");
    let tree = ParserRuntime::default()
        .parse(Language::TypeScript, &code)
        .await
        .unwrap();

    let chunker =
        Chunker::with_provider(ChunkingConfig::default(), Arc::new(BrokenProvider)).unwrap();
    let chunks = chunker.chunk_file("a.ts", &code, Some(&tree)).await;

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_type, ChunkType::Function);
    assert_eq!(chunks[0].metadata.function_name.as_deref(), Some("alpha"));
}

#[tokio::test]
async fn concurrent_first_use_builds_one_parser() {
    let provider = Arc::new(CountingProvider::default());
    let chunker = Chunker::with_provider(ChunkingConfig::default(), provider.clone()).unwrap();
    let code = function("alpha");

    let (a, b, c, d) = tokio::join!(
        chunker.chunk_file("a.ts", &code, None),
        chunker.chunk_file("b.ts", &code, None),
        chunker.chunk_file("c.ts", &code, None),
        chunker.chunk_file("d.ts", &code, None),
    );

    assert_eq!(provider.built.load(Ordering::SeqCst), 1);
    for chunks in [a, b, c, d] {
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
    }

    chunker.chunk_file("x.py", "def f():\n    return 1\n", None).await;
    assert_eq!(provider.built.load(Ordering::SeqCst), 2);
}
