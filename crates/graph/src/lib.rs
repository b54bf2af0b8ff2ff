//! # Context Graph
//!
//! Entities and typed relations extracted from source files, for code
//! search and navigation.
//!
//! ## Architecture
//!
//! ```text
//! (path, content, chunk id, tree?)
//!     │
//!     ├──> GraphExtractor (one pre-order walk per file)
//!     │      ├─ Module entity, always
//!     │      ├─ Functions, classes, interfaces, methods, type aliases
//!     │      ├─ CONTAINS / IMPORTS / EXPORTS
//!     │      └─ CALLS / EXTENDS / IMPLEMENTS (best-effort names)
//!     │
//!     └──> CodeGraph (petgraph)
//!            ├─ Per-file ingest and removal
//!            └─ Callers, callees, children, unresolved targets
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use context_graph::{GraphExtractor, RelationType};
//!
//! # async fn run() {
//! let extractor = GraphExtractor::default();
//! let result = extractor
//!     .extract("src/a.ts", "import { x } from './util';\n", None, None)
//!     .await;
//! assert_eq!(result.relations[0].relation_type, RelationType::Imports);
//! assert_eq!(result.relations[0].target_id, "src/util");
//! # }
//! ```

mod categories;
mod error;
mod extractor;
mod graph;
mod paths;
mod types;

pub use error::{GraphError, Result};
pub use extractor::{ExtractorConfig, GraphExtractor};
pub use graph::{CodeGraph, GraphNode};
pub use paths::{normalize_path, python_specifier, resolve_import};
pub use types::{EntityType, ExtractionResult, GraphEntity, GraphRelation, RelationType};
