//! Parser acquisition shared by the chunker and the graph extractor.
//!
//! Grammar loading is treated as expensive, so every [`ParserRuntime`] keeps
//! one parser per language and coalesces concurrent first use onto a single
//! construction.

use crate::error::{ChunkerError, Result};
use crate::language::Language;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tree_sitter::{Parser, Tree};

/// Source of parsers for supported grammars
#[async_trait]
pub trait ParserProvider: Send + Sync {
    /// Map a file path to a grammar-backed language
    fn detect_language(&self, path: &str) -> Option<Language> {
        Some(Language::from_path(path)).filter(|language| language.supports_ast())
    }

    /// Build a parser for `language`. May be slow; callers cache the result.
    async fn acquire_parser(&self, language: Language) -> Result<Parser>;
}

/// Default provider backed by the bundled tree-sitter grammars
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterProvider;

#[async_trait]
impl ParserProvider for TreeSitterProvider {
    async fn acquire_parser(&self, language: Language) -> Result<Parser> {
        let ts_language = language.tree_sitter_language()?;
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(parser)
    }
}

/// A parser shared between callers of one runtime
pub type SharedParser = Arc<Mutex<Parser>>;

type ParserSlot = Arc<OnceCell<SharedParser>>;

/// Detect → acquire → parse, with a per-language memoized parser.
pub struct ParserRuntime {
    provider: Arc<dyn ParserProvider>,
    slots: Mutex<HashMap<Language, ParserSlot>>,
}

impl ParserRuntime {
    pub fn new(provider: Arc<dyn ParserProvider>) -> Self {
        Self {
            provider,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Map a file path to a grammar-backed language
    pub fn detect_language(&self, path: &str) -> Option<Language> {
        self.provider.detect_language(path)
    }

    /// Get the cached parser for `language`, constructing it at most once.
    ///
    /// A failed construction leaves the slot empty so a later call retries.
    pub async fn parser(&self, language: Language) -> Result<SharedParser> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(language).or_default().clone()
        };

        slot.get_or_try_init(|| async move {
            log::debug!("Constructing parser for {}", language.as_str());
            let parser = self.provider.acquire_parser(language).await?;
            Ok::<_, ChunkerError>(Arc::new(Mutex::new(parser)))
        })
        .await
        .cloned()
    }

    /// Parse `content` with the parser for `language`.
    pub async fn parse(&self, language: Language, content: &str) -> Result<Tree> {
        let parser = self.parser(language).await?;
        let mut parser = parser.lock().unwrap_or_else(PoisonError::into_inner);
        parser
            .parse(content, None)
            .ok_or_else(|| ChunkerError::parse("Failed to parse source code"))
    }
}

impl Default for ParserRuntime {
    fn default() -> Self {
        Self::new(Arc::new(TreeSitterProvider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_with_default_provider() {
        let runtime = ParserRuntime::default();
        let tree = runtime
            .parse(Language::TypeScript, "function f() { return 1; }")
            .await
            .unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[tokio::test]
    async fn parser_is_reused_per_language() {
        let runtime = ParserRuntime::default();
        let first = runtime.parser(Language::Rust).await.unwrap();
        let second = runtime.parser(Language::Rust).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = runtime.parser(Language::Python).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn unsupported_language_is_an_error() {
        let runtime = ParserRuntime::default();
        assert!(runtime.parser(Language::Go).await.is_err());
        assert_eq!(runtime.detect_language("main.go"), None);
        assert_eq!(runtime.detect_language("a.tsx"), Some(Language::Tsx));
    }
}
