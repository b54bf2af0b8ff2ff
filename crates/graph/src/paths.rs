//! Import specifier resolution.
//!
//! Only relative specifiers are resolved, against the importing file's
//! directory. Everything else is kept as a best-effort module name.

/// Whether `specifier` points into the file tree rather than a package
pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

/// Resolve `specifier` as imported from `importer`.
///
/// `src/a.ts` + `./util` → `src/util`; `src/a.ts` + `../lib/x` → `lib/x`.
/// A leading `/` is joined onto the importer's directory like a path join.
pub fn resolve_import(importer: &str, specifier: &str) -> String {
    if !is_relative(specifier) {
        return specifier.to_string();
    }

    let dir = parent_dir(importer);
    let joined = if dir.is_empty() {
        specifier.trim_start_matches('/').to_string()
    } else {
        format!("{dir}/{specifier}")
    };
    normalize_path(&joined)
}

/// Turn a Python module reference into a path-like specifier.
///
/// `.mod` → `./mod`, `..a.b` → `../a/b`, `.` → `./`; absolute dotted names
/// are left alone.
pub fn python_specifier(module: &str) -> String {
    let rest = module.trim_start_matches('.');
    let dots = module.len() - rest.len();
    if dots == 0 {
        return module.to_string();
    }

    let prefix = if dots == 1 {
        "./".to_string()
    } else {
        "../".repeat(dots - 1)
    };
    format!("{prefix}{}", rest.replace('.', "/"))
}

fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Collapse `.` and `..` segments and duplicate separators.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}
