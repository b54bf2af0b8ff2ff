use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Token and line budgets for chunking.
///
/// Every field has a default, so a partial document (TOML or JSON) only
/// overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingConfig {
    /// Maximum chunk size in estimated tokens (hard limit for split windows)
    pub max_chunk_tokens: usize,

    /// Gaps below this size are dropped, chunks below it are merge candidates
    pub min_chunk_tokens: usize,

    /// Token budget of the tail carried into the next split window
    pub overlap_tokens: usize,

    /// Maximum number of lines per chunk
    pub max_chunk_lines: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 512,
            min_chunk_tokens: 100,
            overlap_tokens: 50,
            max_chunk_lines: 100,
        }
    }
}

impl ChunkingConfig {
    /// Parse a (possibly partial) TOML document over the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| ChunkerError::invalid_config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_tokens == 0 {
            return Err(ChunkerError::invalid_config("maxChunkTokens must be > 0"));
        }

        if self.max_chunk_lines == 0 {
            return Err(ChunkerError::invalid_config("maxChunkLines must be > 0"));
        }

        if self.min_chunk_tokens > self.max_chunk_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "minChunkTokens ({}) cannot exceed maxChunkTokens ({})",
                self.min_chunk_tokens, self.max_chunk_tokens
            )));
        }

        if self.overlap_tokens >= self.max_chunk_tokens {
            return Err(ChunkerError::invalid_config(format!(
                "overlapTokens ({}) must be below maxChunkTokens ({})",
                self.overlap_tokens, self.max_chunk_tokens
            )));
        }

        Ok(())
    }
}
