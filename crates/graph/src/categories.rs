//! Per-language dispatch tables from tree-sitter node kinds to the
//! extractor's handlers. Supporting another grammar means adding a table.

use context_code_chunker::Language;

/// What the extractor does with a node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeCategory {
    /// Import statement naming a module path
    Import,
    /// Named function declaration
    Function,
    /// `const f = () => ...` style bindings
    FunctionBinding,
    /// Class-like declaration (classes, structs, enums)
    Class,
    /// Interface or trait
    Interface,
    /// Type alias
    TypeAlias,
    /// Rust `impl` block contributing methods to a type
    Impl,
    /// ES export statement
    Export,
}

const ECMASCRIPT: &[(&str, NodeCategory)] = &[
    ("import_statement", NodeCategory::Import),
    ("function_declaration", NodeCategory::Function),
    ("generator_function_declaration", NodeCategory::Function),
    ("lexical_declaration", NodeCategory::FunctionBinding),
    ("variable_declaration", NodeCategory::FunctionBinding),
    ("class_declaration", NodeCategory::Class),
    ("abstract_class_declaration", NodeCategory::Class),
    ("enum_declaration", NodeCategory::Class),
    ("interface_declaration", NodeCategory::Interface),
    ("type_alias_declaration", NodeCategory::TypeAlias),
    ("export_statement", NodeCategory::Export),
];

const PYTHON: &[(&str, NodeCategory)] = &[
    ("import_statement", NodeCategory::Import),
    ("import_from_statement", NodeCategory::Import),
    ("function_definition", NodeCategory::Function),
    ("class_definition", NodeCategory::Class),
];

const RUST: &[(&str, NodeCategory)] = &[
    ("use_declaration", NodeCategory::Import),
    ("function_item", NodeCategory::Function),
    ("struct_item", NodeCategory::Class),
    ("enum_item", NodeCategory::Class),
    ("union_item", NodeCategory::Class),
    ("trait_item", NodeCategory::Interface),
    ("type_item", NodeCategory::TypeAlias),
    ("impl_item", NodeCategory::Impl),
];

fn table(language: Language) -> &'static [(&'static str, NodeCategory)] {
    match language {
        Language::JavaScript | Language::TypeScript | Language::Tsx => ECMASCRIPT,
        Language::Python => PYTHON,
        Language::Rust => RUST,
        _ => &[],
    }
}

pub(crate) fn category(language: Language, kind: &str) -> Option<NodeCategory> {
    table(language)
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, category)| *category)
}

/// Node kind of a call expression whose `function` field names the callee
pub(crate) fn call_kind(language: Language) -> &'static str {
    match language {
        Language::Python => "call",
        _ => "call_expression",
    }
}

/// Function values a binding may hold
pub(crate) const FUNCTION_VALUES: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "generator_function",
];

/// Ancestors whose function children are methods handled by the owner
pub(crate) const MEMBER_SCOPES: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "class_definition",
    "impl_item",
    "trait_item",
];

/// Nodes between a member function and its owner
pub(crate) const MEMBER_CONTAINERS: &[&str] = &[
    "class_body",
    "block",
    "decorated_definition",
    "declaration_list",
];
