use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::language::Language;
use crate::source::SourceText;
use crate::strategy::LineWindow;
use crate::types::{estimate_tokens, ChunkMetadata, ChunkType, CodeChunk};
use tree_sitter::Node;

/// How a node type takes part in chunking
#[derive(Debug, Clone, Copy)]
enum Chunkable {
    /// The node is a declaration of this type
    Declaration(ChunkType),
    /// The node wraps a declaration in this field (export, decorators)
    Wrapper(&'static str),
    /// `const name = () => ...` style binding of a function value
    FunctionBinding,
}

const ECMASCRIPT_CHUNKABLE: &[(&str, Chunkable)] = &[
    ("function_declaration", Chunkable::Declaration(ChunkType::Function)),
    ("generator_function_declaration", Chunkable::Declaration(ChunkType::Function)),
    ("class_declaration", Chunkable::Declaration(ChunkType::Class)),
    ("abstract_class_declaration", Chunkable::Declaration(ChunkType::Class)),
    ("enum_declaration", Chunkable::Declaration(ChunkType::Class)),
    ("interface_declaration", Chunkable::Declaration(ChunkType::Interface)),
    ("type_alias_declaration", Chunkable::Declaration(ChunkType::Interface)),
    ("lexical_declaration", Chunkable::FunctionBinding),
    ("variable_declaration", Chunkable::FunctionBinding),
    ("export_statement", Chunkable::Wrapper("declaration")),
];

const PYTHON_CHUNKABLE: &[(&str, Chunkable)] = &[
    ("function_definition", Chunkable::Declaration(ChunkType::Function)),
    ("class_definition", Chunkable::Declaration(ChunkType::Class)),
    ("decorated_definition", Chunkable::Wrapper("definition")),
];

const RUST_CHUNKABLE: &[(&str, Chunkable)] = &[
    ("function_item", Chunkable::Declaration(ChunkType::Function)),
    ("struct_item", Chunkable::Declaration(ChunkType::Class)),
    ("enum_item", Chunkable::Declaration(ChunkType::Class)),
    ("union_item", Chunkable::Declaration(ChunkType::Class)),
    ("trait_item", Chunkable::Declaration(ChunkType::Interface)),
    ("type_item", Chunkable::Declaration(ChunkType::Interface)),
];

const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

fn chunkable_table(language: Language) -> &'static [(&'static str, Chunkable)] {
    match language {
        Language::JavaScript | Language::TypeScript | Language::Tsx => ECMASCRIPT_CHUNKABLE,
        Language::Python => PYTHON_CHUNKABLE,
        Language::Rust => RUST_CHUNKABLE,
        _ => &[],
    }
}

fn lookup(language: Language, kind: &str) -> Option<Chunkable> {
    chunkable_table(language)
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, chunkable)| *chunkable)
}

/// A matched node: `node` is the chunked range, `decl` carries the name.
struct ChunkTarget<'t> {
    node: Node<'t>,
    decl: Node<'t>,
    chunk_type: ChunkType,
}

/// AST-based analyzer for semantic code chunking
pub(crate) struct AstAnalyzer<'a> {
    config: &'a ChunkingConfig,
    language: Language,
    file_path: &'a str,
    source: SourceText<'a>,
}

impl<'a> AstAnalyzer<'a> {
    pub fn new(
        config: &'a ChunkingConfig,
        language: Language,
        file_path: &'a str,
        content: &'a str,
    ) -> Self {
        Self {
            config,
            language,
            file_path,
            source: SourceText::new(content),
        }
    }

    /// Chunk the tree rooted at `root`.
    ///
    /// Returns no chunks when the tree has no chunkable node; the caller
    /// then falls back to line-based chunking.
    pub fn chunk(&self, root: Node) -> Result<Vec<CodeChunk>> {
        let mut targets = Vec::new();
        self.collect(root, &mut targets);
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        targets.sort_by_key(|target| target.node.start_byte());

        let mut chunks = Vec::new();
        let mut cursor = 0usize;
        for target in &targets {
            let start = target.node.start_byte();
            if start > cursor {
                self.emit_gap(cursor, start, &mut chunks)?;
            }
            self.emit_node(target, &mut chunks)?;
            cursor = cursor.max(target.node.end_byte());
        }
        if cursor < self.source.len() {
            self.emit_gap(cursor, self.source.len(), &mut chunks)?;
        }

        Ok(chunks)
    }

    /// Gather chunkable nodes without descending into a match.
    fn collect<'t>(&self, root: Node<'t>, targets: &mut Vec<ChunkTarget<'t>>) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                match self.match_chunkable(child) {
                    Some((decl, chunk_type)) => targets.push(ChunkTarget {
                        node: child,
                        decl,
                        chunk_type,
                    }),
                    None => stack.push(child),
                }
            }
        }
    }

    fn match_chunkable<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, ChunkType)> {
        match lookup(self.language, node.kind())? {
            Chunkable::Declaration(ChunkType::Function) => {
                let chunk_type = if self.enclosing_class_node(node).is_some() {
                    ChunkType::Method
                } else {
                    ChunkType::Function
                };
                Some((node, chunk_type))
            }
            Chunkable::Declaration(chunk_type) => Some((node, chunk_type)),
            Chunkable::Wrapper(field) => {
                let inner = node.child_by_field_name(field)?;
                self.match_chunkable(inner)
            }
            Chunkable::FunctionBinding => {
                function_declarator(node).map(|declarator| (declarator, ChunkType::Function))
            }
        }
    }

    /// Nearest ancestor that scopes methods (class, impl, trait).
    fn enclosing_class_node<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let mut current = node.parent();
        while let Some(ancestor) = current {
            let is_scope = match self.language {
                Language::JavaScript | Language::TypeScript | Language::Tsx => matches!(
                    ancestor.kind(),
                    "class_declaration" | "abstract_class_declaration" | "class" | "interface_declaration"
                ),
                Language::Python => ancestor.kind() == "class_definition",
                Language::Rust => matches!(ancestor.kind(), "impl_item" | "trait_item"),
                _ => false,
            };
            if is_scope {
                return Some(ancestor);
            }
            current = ancestor.parent();
        }
        None
    }

    fn enclosing_class_name(&self, node: Node) -> Option<String> {
        let scope = self.enclosing_class_node(node)?;
        if scope.kind() == "impl_item" {
            let target = scope.child_by_field_name("type")?;
            return self.node_text(base_type_node(target));
        }
        scope
            .child_by_field_name("name")
            .and_then(|name| self.node_text(name))
    }

    fn emit_gap(&self, start: usize, end: usize, chunks: &mut Vec<CodeChunk>) -> Result<()> {
        let text = self.source.slice(start, end)?;
        let trimmed = text.trim();
        if trimmed.is_empty() || estimate_tokens(trimmed) < self.config.min_chunk_tokens {
            return Ok(());
        }

        let trimmed_start = start + (text.len() - text.trim_start().len());
        let trimmed_end = trimmed_start + trimmed.len();
        self.emit_region(
            trimmed_start,
            trimmed_end,
            trimmed,
            ChunkType::Block,
            ChunkMetadata::with_language(self.language.as_str()),
            chunks,
        );
        Ok(())
    }

    fn emit_node(&self, target: &ChunkTarget, chunks: &mut Vec<CodeChunk>) -> Result<()> {
        let start = target.node.start_byte();
        let end = target.node.end_byte();
        let text = self.source.slice(start, end)?;
        if text.trim().is_empty() {
            return Ok(());
        }

        let metadata = self.metadata(target, text);
        self.emit_region(start, end, text, target.chunk_type, metadata, chunks);
        Ok(())
    }

    /// Emit `text` as one chunk, or as split windows when it is over budget.
    fn emit_region(
        &self,
        start: usize,
        end: usize,
        text: &str,
        chunk_type: ChunkType,
        metadata: ChunkMetadata,
        chunks: &mut Vec<CodeChunk>,
    ) {
        let (start_line, end_line) = self.source.line_span(start, end);
        let line_count = end_line - start_line + 1;

        if estimate_tokens(text) <= self.config.max_chunk_tokens
            && line_count <= self.config.max_chunk_lines
        {
            chunks.push(CodeChunk::new(
                self.file_path,
                start_line,
                end_line,
                text.to_string(),
                chunk_type,
                metadata,
            ));
            return;
        }

        for slice in LineWindow::new(self.config).split(text, start_line) {
            chunks.push(CodeChunk::new(
                self.file_path,
                slice.start_line,
                slice.end_line,
                slice.content,
                chunk_type,
                metadata.clone(),
            ));
        }
    }

    fn metadata(&self, target: &ChunkTarget, text: &str) -> ChunkMetadata {
        let mut metadata = ChunkMetadata::with_language(self.language.as_str());
        let name = target
            .decl
            .child_by_field_name("name")
            .and_then(|name| self.node_text(name));

        match target.chunk_type {
            ChunkType::Function => metadata.function_name = name,
            ChunkType::Method => {
                metadata.function_name = name;
                metadata.class_name = self.enclosing_class_name(target.decl);
            }
            ChunkType::Class | ChunkType::Interface => metadata.class_name = name,
            ChunkType::Block => {}
        }

        metadata.signature = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('@'))
            .map(str::to_string);

        metadata
    }

    fn node_text(&self, node: Node) -> Option<String> {
        self.source
            .slice(node.start_byte(), node.end_byte())
            .ok()
            .map(str::to_string)
    }
}

/// First declarator of a `const`/`let`/`var` statement, if bound to a function.
fn function_declarator(declaration: Node) -> Option<Node> {
    let mut cursor = declaration.walk();
    let declarator = declaration
        .named_children(&mut cursor)
        .find(|child| child.kind() == "variable_declarator")?;
    let value = declarator.child_by_field_name("value")?;
    FUNCTION_VALUES
        .contains(&value.kind())
        .then_some(declarator)
}

/// Strip generics and paths from a Rust impl target (`a::Foo<T>` → `Foo`).
fn base_type_node(node: Node) -> Node {
    match node.kind() {
        "generic_type" => node
            .child_by_field_name("type")
            .map_or(node, base_type_node),
        "scoped_type_identifier" => node.child_by_field_name("name").unwrap_or(node),
        _ => node,
    }
}
