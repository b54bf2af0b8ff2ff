use crate::categories::{
    call_kind, category, NodeCategory, FUNCTION_VALUES, MEMBER_CONTAINERS, MEMBER_SCOPES,
};
use crate::error::{GraphError, Result};
use crate::paths::{python_specifier, resolve_import};
use crate::types::{EntityType, ExtractionResult, GraphEntity, GraphRelation, RelationType};
use context_code_chunker::{line_count, looks_binary, Language, ParserProvider, ParserRuntime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tree_sitter::{Node, Tree};

/// Limits for one extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Nodes visited (traversal plus call scans) before giving up on a file
    pub max_traversal_nodes: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_traversal_nodes: 500_000,
        }
    }
}

/// Builds the entity/relation graph of one file
pub struct GraphExtractor {
    config: ExtractorConfig,
    runtime: ParserRuntime,
}

impl GraphExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            runtime: ParserRuntime::default(),
        }
    }

    pub fn with_provider(config: ExtractorConfig, provider: Arc<dyn ParserProvider>) -> Self {
        Self {
            config,
            runtime: ParserRuntime::new(provider),
        }
    }

    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract entities and relations from one file snapshot.
    ///
    /// Never fails: the result always starts with the file's module entity,
    /// and anything that goes wrong leaves only that entity.
    pub async fn extract(
        &self,
        file_path: &str,
        content: &str,
        chunk_id: Option<&str>,
        tree: Option<&Tree>,
    ) -> ExtractionResult {
        let module = module_entity(file_path, content, chunk_id);

        if content.trim().is_empty() {
            return ExtractionResult::module_only(module);
        }
        if looks_binary(content) {
            log::debug!("Binary content in {file_path}, extracting module only");
            return ExtractionResult::module_only(module);
        }
        let Some(language) = self.runtime.detect_language(file_path) else {
            return ExtractionResult::module_only(module);
        };

        match self.extract_tree(file_path, content, chunk_id, language, module.clone(), tree).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!(
                    "Graph extraction failed for {file_path} ({}): {e}",
                    language.as_str()
                );
                ExtractionResult::module_only(module)
            }
        }
    }

    async fn extract_tree(
        &self,
        file_path: &str,
        content: &str,
        chunk_id: Option<&str>,
        language: Language,
        module: GraphEntity,
        tree: Option<&Tree>,
    ) -> Result<ExtractionResult> {
        let parsed;
        let tree = match tree {
            Some(tree) => tree,
            None => {
                parsed = self.runtime.parse(language, content).await?;
                &parsed
            }
        };

        let root = tree.root_node();
        if root.child_count() == 0 {
            return Err(GraphError::EmptyTree);
        }

        let walker = Walker {
            language,
            file_path,
            source: content,
            chunk_id,
            limit: self.config.max_traversal_nodes,
            visited: 0,
            out: Collector::default(),
        };
        walker.run(root, module)
    }
}

impl Default for GraphExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

fn module_entity(file_path: &str, content: &str, chunk_id: Option<&str>) -> GraphEntity {
    let name = Path::new(file_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_path);
    GraphEntity {
        id: file_path.to_string(),
        name: name.to_string(),
        entity_type: EntityType::Module,
        file_path: file_path.to_string(),
        start_line: 1,
        end_line: line_count(content).max(1),
        signature: None,
        chunk_id: chunk_id.map(str::to_string),
    }
}

/// Ordered, de-duplicated output of one walk
#[derive(Default)]
struct Collector {
    entities: Vec<GraphEntity>,
    relations: Vec<GraphRelation>,
    entity_ids: HashSet<String>,
    relation_keys: HashSet<(String, String, RelationType)>,
}

impl Collector {
    fn entity(&mut self, entity: GraphEntity) {
        if self.entity_ids.insert(entity.id.clone()) {
            self.entities.push(entity);
        }
    }

    fn relation(&mut self, source: &str, target: &str, relation_type: RelationType) {
        let key = (source.to_string(), target.to_string(), relation_type);
        if self.relation_keys.insert(key) {
            self.relations
                .push(GraphRelation::new(source, target, relation_type));
        }
    }
}

enum Frame<'t> {
    Enter(Node<'t>),
    /// Emit `EXPORTS` for this name once the declaration's subtree is done
    Export(String),
}

enum Outcome {
    Descend,
    Skip,
}

struct Walker<'a> {
    language: Language,
    file_path: &'a str,
    source: &'a str,
    chunk_id: Option<&'a str>,
    limit: usize,
    visited: usize,
    out: Collector,
}

impl<'a> Walker<'a> {
    fn run(mut self, root: Node, module: GraphEntity) -> Result<ExtractionResult> {
        self.out.entity(module);

        let mut stack = vec![Frame::Enter(root)];
        while let Some(frame) = stack.pop() {
            let node = match frame {
                Frame::Export(name) => {
                    let target = self.symbol_id(&name);
                    self.out
                        .relation(self.file_path, &target, RelationType::Exports);
                    continue;
                }
                Frame::Enter(node) => node,
            };
            self.tick()?;

            let outcome = match category(self.language, node.kind()) {
                Some(category) => {
                    if let Some(name) = self.exported_name(category, node) {
                        stack.push(Frame::Export(name));
                    }
                    self.handle(category, node)?
                }
                None => Outcome::Descend,
            };

            if let Outcome::Descend = outcome {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                stack.extend(children.into_iter().rev().map(Frame::Enter));
            }
        }

        Ok(ExtractionResult {
            entities: self.out.entities,
            relations: self.out.relations,
        })
    }

    fn tick(&mut self) -> Result<()> {
        self.visited += 1;
        if self.visited > self.limit {
            return Err(GraphError::TraversalBudget { limit: self.limit });
        }
        Ok(())
    }

    fn handle(&mut self, category: NodeCategory, node: Node) -> Result<Outcome> {
        match category {
            NodeCategory::Import => {
                self.handle_import(node);
                Ok(Outcome::Skip)
            }
            NodeCategory::Function => self.handle_function(node),
            NodeCategory::FunctionBinding => self.handle_binding(node),
            NodeCategory::Class => self.handle_class(node),
            NodeCategory::Interface => self.handle_interface(node),
            NodeCategory::TypeAlias => {
                if let Some(name) = self.field_text(node, "name") {
                    let id = self.symbol_id(name);
                    self.declare(&id, name, EntityType::Type, node);
                    self.out.relation(self.file_path, &id, RelationType::Contains);
                }
                Ok(Outcome::Skip)
            }
            NodeCategory::Impl => self.handle_impl(node),
            NodeCategory::Export => Ok(Outcome::Descend),
        }
    }

    /// Name to export once `node` is done: ES export statements, and `pub`
    /// top-level Rust items.
    fn exported_name(&self, category: NodeCategory, node: Node) -> Option<String> {
        if category == NodeCategory::Export {
            return self.es_export_name(node);
        }

        if self.language != Language::Rust
            || matches!(category, NodeCategory::Import | NodeCategory::Impl)
            || node.parent().map(|parent| parent.kind()) != Some("source_file")
        {
            return None;
        }
        let mut cursor = node.walk();
        let is_pub = node
            .children(&mut cursor)
            .any(|child| child.kind() == "visibility_modifier" && self.text(child) == Some("pub"));
        if !is_pub {
            return None;
        }
        self.field_text(node, "name").map(str::to_string)
    }

    fn es_export_name(&self, node: Node) -> Option<String> {
        if let Some(declaration) = node.child_by_field_name("declaration") {
            let name = match declaration.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    let mut cursor = declaration.walk();
                    let first = declaration
                        .named_children(&mut cursor)
                        .find(|child| child.kind() == "variable_declarator")?;
                    first.child_by_field_name("name")?
                }
                _ => declaration.child_by_field_name("name")?,
            };
            return self.text(name).map(str::to_string);
        }

        // `export { a, b }`: only the first name is recorded
        let mut cursor = node.walk();
        let clause = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "export_clause")?;
        let mut cursor = clause.walk();
        let specifier = clause
            .named_children(&mut cursor)
            .find(|child| child.kind() == "export_specifier")?;
        self.field_text(specifier, "name").map(str::to_string)
    }

    fn handle_import(&mut self, node: Node) {
        let specifiers: Vec<String> = match self.language {
            Language::Python => self.python_import_specifiers(node),
            Language::Rust => node
                .child_by_field_name("argument")
                .and_then(|argument| self.rust_use_root(argument))
                .into_iter()
                .collect(),
            _ => node
                .child_by_field_name("source")
                .and_then(|source| self.text(source))
                .map(unquote)
                .filter(|specifier| !specifier.is_empty())
                .map(str::to_string)
                .into_iter()
                .collect(),
        };

        for specifier in specifiers {
            self.import(&specifier);
        }
    }

    fn import(&mut self, specifier: &str) {
        let target = resolve_import(self.file_path, specifier);
        if !crate::paths::is_relative(specifier) {
            self.out.entity(GraphEntity::external_module(&target));
        }
        self.out
            .relation(self.file_path, &target, RelationType::Imports);
    }

    fn python_import_specifiers(&self, node: Node) -> Vec<String> {
        if node.kind() == "import_from_statement" {
            return node
                .child_by_field_name("module_name")
                .and_then(|module| self.text(module))
                .map(|module| python_specifier(module.trim()))
                .into_iter()
                .collect();
        }

        // `import a.b, c as d`
        let mut cursor = node.walk();
        let names = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|name| match name.kind() {
                "aliased_import" => name.child_by_field_name("name"),
                _ => Some(name),
            })
            .filter_map(|name| self.text(name))
            .map(str::to_string)
            .collect();
        names
    }

    /// Leading path of a `use` tree: `std::io::{Read, Write}` → `std::io`.
    fn rust_use_root(&self, argument: Node) -> Option<String> {
        let path = match argument.kind() {
            "use_as_clause" | "scoped_use_list" => argument.child_by_field_name("path"),
            "use_wildcard" => argument.named_child(0),
            "use_list" => None,
            _ => Some(argument),
        }?;
        self.text(path).map(str::to_string)
    }

    fn handle_function(&mut self, node: Node) -> Result<Outcome> {
        // Members are extracted by their owner's handler.
        if self.is_member(node) {
            return Ok(Outcome::Descend);
        }
        let Some(name) = self.field_text(node, "name") else {
            return Ok(Outcome::Descend);
        };

        let id = self.symbol_id(name);
        self.declare(&id, name, EntityType::Function, node);
        self.out.relation(self.file_path, &id, RelationType::Contains);
        self.scan_calls(&id, body_of(node))?;
        Ok(Outcome::Descend)
    }

    fn handle_binding(&mut self, node: Node) -> Result<Outcome> {
        let mut cursor = node.walk();
        let declarators: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|child| child.kind() == "variable_declarator")
            .collect();

        for declarator in declarators {
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };
            if !FUNCTION_VALUES.contains(&value.kind()) {
                continue;
            }
            let Some(name) = self.field_text(declarator, "name") else {
                continue;
            };

            let id = self.symbol_id(name);
            self.declare(&id, name, EntityType::Function, node);
            self.out.relation(self.file_path, &id, RelationType::Contains);
            self.scan_calls(&id, body_of(value))?;
        }
        Ok(Outcome::Descend)
    }

    fn handle_class(&mut self, node: Node) -> Result<Outcome> {
        let Some(name) = self.field_text(node, "name") else {
            return Ok(Outcome::Descend);
        };
        let class_id = self.symbol_id(name);
        self.declare(&class_id, name, EntityType::Class, node);
        self.out
            .relation(self.file_path, &class_id, RelationType::Contains);

        match self.language {
            Language::Python => {
                if let Some(base) = node
                    .child_by_field_name("superclasses")
                    .and_then(first_positional_argument)
                    .map(|base| match base.kind() {
                        // `Base[int]`
                        "subscript" => base.child_by_field_name("value").unwrap_or(base),
                        _ => base,
                    })
                    .and_then(|base| self.text(base))
                {
                    self.out.relation(&class_id, base, RelationType::Extends);
                }
            }
            Language::Rust => {}
            _ => self.es_heritage(node, &class_id),
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let members: Vec<Node> = body.named_children(&mut cursor).collect();
            for member in members {
                if let Some(method) = self.method_node(member) {
                    self.method(&class_id, name, method)?;
                }
            }
        }
        Ok(Outcome::Descend)
    }

    fn es_heritage(&mut self, node: Node, class_id: &str) {
        let mut cursor = node.walk();
        let Some(heritage) = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "class_heritage")
        else {
            return;
        };

        let mut cursor = heritage.walk();
        let clauses: Vec<Node> = heritage.named_children(&mut cursor).collect();
        for clause in clauses {
            match clause.kind() {
                "extends_clause" => {
                    if let Some(base) = clause
                        .child_by_field_name("value")
                        .and_then(|value| self.text(value))
                    {
                        self.out.relation(class_id, base, RelationType::Extends);
                    }
                }
                "implements_clause" => {
                    let mut cursor = clause.walk();
                    let types: Vec<Node> = clause.named_children(&mut cursor).collect();
                    for ty in types {
                        if let Some(interface) = self.type_name(ty) {
                            self.out
                                .relation(class_id, interface, RelationType::Implements);
                        }
                    }
                }
                // JavaScript: `class A extends B` has the expression directly
                _ => {
                    if let Some(base) = self.text(clause) {
                        self.out.relation(class_id, base, RelationType::Extends);
                    }
                    break;
                }
            }
        }
    }

    fn handle_interface(&mut self, node: Node) -> Result<Outcome> {
        let Some(name) = self.field_text(node, "name") else {
            return Ok(Outcome::Descend);
        };
        let id = self.symbol_id(name);
        self.declare(&id, name, EntityType::Interface, node);
        self.out.relation(self.file_path, &id, RelationType::Contains);

        let list = if self.language == Language::Rust {
            node.child_by_field_name("bounds")
        } else {
            let mut cursor = node.walk();
            let clause = node
                .named_children(&mut cursor)
                .find(|child| child.kind() == "extends_type_clause");
            clause
        };
        let parents: Vec<Node> = list.map(named_children).unwrap_or_default();

        for parent in parents {
            if let Some(parent) = self.type_name(parent) {
                self.out.relation(&id, parent, RelationType::Extends);
            }
        }

        // Rust default methods; bodiless signatures declare nothing.
        if self.language == Language::Rust {
            let items = node
                .child_by_field_name("body")
                .map(named_children)
                .unwrap_or_default();
            for item in items {
                if item.kind() == "function_item" {
                    self.method(&id, name, item)?;
                }
            }
        }
        Ok(Outcome::Descend)
    }

    fn handle_impl(&mut self, node: Node) -> Result<Outcome> {
        let Some(type_name) = node
            .child_by_field_name("type")
            .and_then(|ty| self.type_name(ty))
        else {
            return Ok(Outcome::Descend);
        };
        let type_id = self.symbol_id(type_name);

        if let Some(trait_name) = node
            .child_by_field_name("trait")
            .and_then(|tr| self.type_name(tr))
        {
            self.out
                .relation(&type_id, trait_name, RelationType::Implements);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let items: Vec<Node> = body.named_children(&mut cursor).collect();
            for item in items {
                if item.kind() == "function_item" {
                    self.method(&type_id, type_name, item)?;
                }
            }
        }
        Ok(Outcome::Descend)
    }

    fn method_node<'t>(&self, member: Node<'t>) -> Option<Node<'t>> {
        match member.kind() {
            "method_definition" | "function_definition" => Some(member),
            "decorated_definition" => member
                .child_by_field_name("definition")
                .filter(|definition| definition.kind() == "function_definition"),
            _ => None,
        }
    }

    fn method(&mut self, owner_id: &str, owner_name: &str, node: Node) -> Result<()> {
        let Some(name) = self.field_text(node, "name") else {
            return Ok(());
        };
        let id = format!("{}#{owner_name}.{name}", self.file_path);
        self.declare(&id, name, EntityType::Method, node);
        self.out.relation(owner_id, &id, RelationType::Contains);
        self.scan_calls(&id, body_of(node))
    }

    /// `CALLS` from `caller` to every plainly-named callee under `scope`.
    /// Member and path calls (`a.b()`, `A::b()`) are not recorded.
    fn scan_calls(&mut self, caller: &str, scope: Node) -> Result<()> {
        let call = call_kind(self.language);
        let mut seen = HashSet::new();
        let mut stack = vec![scope];

        while let Some(node) = stack.pop() {
            self.tick()?;
            if node.kind() == call {
                let callee = node
                    .child_by_field_name("function")
                    .filter(|function| function.kind() == "identifier")
                    .and_then(|function| self.text(function));
                if let Some(callee) = callee {
                    if seen.insert(callee) {
                        self.out.relation(caller, callee, RelationType::Calls);
                    }
                }
            }

            let mut cursor = node.walk();
            let children: Vec<Node> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }

    fn is_member(&self, node: Node) -> bool {
        let mut current = node.parent();
        while let Some(parent) = current {
            if MEMBER_CONTAINERS.contains(&parent.kind()) {
                current = parent.parent();
                continue;
            }
            return MEMBER_SCOPES.contains(&parent.kind());
        }
        false
    }

    /// Base name of a type reference: generics, paths and references are unwrapped.
    fn type_name(&self, node: Node) -> Option<&'a str> {
        match node.kind() {
            "reference_type" | "pointer_type" => self.type_name(node.child_by_field_name("type")?),
            "generic_type" => {
                let base = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("type"))?;
                self.type_name(base)
            }
            "scoped_type_identifier" => self.field_text(node, "name"),
            "type_identifier" | "nested_type_identifier" | "identifier" | "member_expression" => {
                self.text(node)
            }
            _ => None,
        }
    }

    fn declare(&mut self, id: &str, name: &str, entity_type: EntityType, node: Node) {
        let signature = self.text(node).and_then(|text| {
            text.lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('@'))
                .map(str::to_string)
        });
        self.out.entity(GraphEntity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type,
            file_path: self.file_path.to_string(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            signature,
            chunk_id: self.chunk_id.map(str::to_string),
        });
    }

    fn symbol_id(&self, name: &str) -> String {
        format!("{}#{name}", self.file_path)
    }

    fn text(&self, node: Node) -> Option<&'a str> {
        self.source.get(node.start_byte()..node.end_byte())
    }

    fn field_text(&self, node: Node, field: &str) -> Option<&'a str> {
        node.child_by_field_name(field)
            .and_then(|child| self.text(child))
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

fn body_of(node: Node) -> Node {
    node.child_by_field_name("body").unwrap_or(node)
}

fn first_positional_argument(arguments: Node) -> Option<Node> {
    let mut cursor = arguments.walk();
    let first = arguments
        .named_children(&mut cursor)
        .find(|argument| !matches!(argument.kind(), "keyword_argument" | "comment"));
    first
}

fn unquote(literal: &str) -> &str {
    literal.trim_matches(|c| c == '"' || c == '\'' || c == '`')
}
