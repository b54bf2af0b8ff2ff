//! Decides whether a file is worth chunking at all.
//!
//! Skips are not errors: a skipped file simply yields no chunks.

use std::path::Path;

/// Files larger than this are never chunked
pub const MAX_FILE_BYTES: usize = 1024 * 1024;

/// Bytes inspected by the binary heuristic
pub const BINARY_SAMPLE_BYTES: usize = 8 * 1024;

/// Conventional file names accepted without an extension (lowercased)
const EXTENSIONLESS_FILES: &[&str] = &[
    "makefile",
    "gnumakefile",
    "dockerfile",
    "containerfile",
    "jenkinsfile",
    "gemfile",
    "rakefile",
    "procfile",
    "brewfile",
    "podfile",
    "vagrantfile",
    "justfile",
    "cmakelists.txt",
    "license",
    "readme",
    "changelog",
    "authors",
    "codeowners",
    ".gitignore",
    ".gitattributes",
    ".dockerignore",
    ".editorconfig",
    ".env",
];

/// Known text/code extensions (lowercased)
const TEXT_EXTENSIONS: &[&str] = &[
    // systems
    "rs", "go", "c", "h", "cpp", "cc", "cxx", "hpp", "hh", "hxx", "zig", "nim",
    // jvm / .net
    "java", "kt", "kts", "scala", "sc", "groovy", "gradle", "cs", "fs", "vb",
    // scripting
    "py", "pyw", "pyi", "rb", "php", "pl", "pm", "lua", "r", "jl", "dart", "swift", "m", "mm",
    // web
    "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "vue", "svelte", "html", "htm",
    "css", "scss", "sass", "less",
    // functional
    "ex", "exs", "erl", "hrl", "hs", "ml", "mli", "clj", "cljs", "edn", "elm",
    // shell
    "sh", "bash", "zsh", "fish", "ps1", "psm1", "bat", "cmd",
    // data / config
    "json", "jsonc", "json5", "yaml", "yml", "toml", "xml", "xsd", "xsl", "ini", "cfg",
    "conf", "properties", "env", "csv", "tsv", "plist", "lock",
    // docs
    "md", "markdown", "mdx", "rst", "txt", "adoc", "tex",
    // schemas / build
    "sql", "graphql", "gql", "proto", "tf", "hcl", "cmake", "mk", "dockerfile", "svg",
];

/// Why a file was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge,
    NoExtension,
    UnknownExtension,
    Binary,
}

/// Return the reason to skip `path`, or `None` if it should be chunked.
pub fn skip_reason(path: &str, content: &str) -> Option<SkipReason> {
    if content.len() > MAX_FILE_BYTES {
        return Some(SkipReason::TooLarge);
    }

    let path = Path::new(path);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !EXTENSIONLESS_FILES.contains(&file_name.as_str()) {
        match path.extension().and_then(|ext| ext.to_str()) {
            None => return Some(SkipReason::NoExtension),
            Some(ext) => {
                let ext = ext.to_lowercase();
                if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
                    return Some(SkipReason::UnknownExtension);
                }
            }
        }
    }

    if looks_binary(content) {
        return Some(SkipReason::Binary);
    }

    None
}

/// Binary heuristic over the first [`BINARY_SAMPLE_BYTES`]: any NUL, or more
/// than 10% control characters other than tab, LF and CR.
pub fn looks_binary(content: &str) -> bool {
    let mut end = content.len().min(BINARY_SAMPLE_BYTES);
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &content[..end];

    let mut total = 0usize;
    let mut control = 0usize;
    for ch in sample.chars() {
        if ch == '\0' {
            return true;
        }
        total += 1;
        if ch.is_control() && !matches!(ch, '\t' | '\n' | '\r') {
            control += 1;
        }
    }

    total > 0 && control * 10 > total
}
