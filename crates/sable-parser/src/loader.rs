//! Module resolution: turns an entry file into a [`ModuleGraph`].
//!
//! Paths are plain `/`-separated strings. Loaders map them onto whatever storage
//! they wrap; the compiler only ever sees the normalized absolute form.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;

use tracing::debug;

use crate::ast::{File, ModuleGraph};
use crate::error::ParseError;
use crate::pest_parser::parse_file;

/// Source of module text.
pub trait SourceLoader: Send + Sync {
    fn read(&self, path: &str) -> Result<String, ParseError>;
    fn exists(&self, path: &str) -> bool;
}

/// In-memory files, used by tests and `eval`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, source: &str) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: &str, source: &str) {
        self.files.insert(normalize(path), source.to_string());
    }
}

impl SourceLoader for MemoryLoader {
    fn read(&self, path: &str) -> Result<String, ParseError> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| ParseError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(&normalize(path))
    }
}

/// Files under a root directory; `/` maps to the root.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(normalize(path).trim_start_matches('/'))
    }
}

impl SourceLoader for FsLoader {
    fn read(&self, path: &str) -> Result<String, ParseError> {
        let full = self.full_path(path);
        std::fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ParseError::NotFound(path.to_string()),
            _ => ParseError::Io {
                path: full.display().to_string(),
                message: e.to_string(),
            },
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }
}

impl ModuleGraph {
    /// Parses `entry` and, transitively, every file it imports.
    pub fn load(loader: &dyn SourceLoader, entry: &str) -> Result<ModuleGraph, ParseError> {
        let main_path = normalize(&with_extension(entry));
        let source = loader.read(&main_path)?;
        let main = parse_file(&main_path, &source)?;
        Self::load_with_main(loader, main)
    }

    /// Like [`ModuleGraph::load`] but with the main file given as text.
    pub fn load_source(
        loader: &dyn SourceLoader,
        path: &str,
        source: &str,
    ) -> Result<ModuleGraph, ParseError> {
        let main = parse_file(&normalize(&with_extension(path)), source)?;
        Self::load_with_main(loader, main)
    }

    fn load_with_main(loader: &dyn SourceLoader, mut main: File) -> Result<ModuleGraph, ParseError> {
        let mut modules: BTreeMap<String, File> = BTreeMap::new();
        let mut queue = VecDeque::new();

        resolve_imports(loader, &mut main)?;
        for import in &main.imports {
            queue.push_back(import.abs_path.clone());
        }

        while let Some(path) = queue.pop_front() {
            // a cycle back to main or a diamond dependency lands here
            if path == main.path || modules.contains_key(&path) {
                continue;
            }
            debug!(module = %path, "loading module");
            let source = loader.read(&path)?;
            let mut file = parse_file(&path, &source)?;
            resolve_imports(loader, &mut file)?;
            for import in &file.imports {
                queue.push_back(import.abs_path.clone());
            }
            modules.insert(path, file);
        }

        let mut global = std::mem::take(&mut main.global);
        for file in modules.values_mut() {
            global.append(&mut file.global);
        }

        Ok(ModuleGraph {
            main,
            modules,
            global,
        })
    }
}

fn resolve_imports(loader: &dyn SourceLoader, file: &mut File) -> Result<(), ParseError> {
    let dir = parent(&file.path);
    for import in &mut file.imports {
        import.abs_path = resolve(loader, &dir, &import.path)?;
    }
    Ok(())
}

/// Resolves an import path written in a file living in `dir`.
pub fn resolve(loader: &dyn SourceLoader, dir: &str, path: &str) -> Result<String, ParseError> {
    let path = with_extension(path);

    if path.starts_with('/') {
        return Ok(normalize(&path));
    }
    if path.starts_with("./") || path.starts_with("../") {
        return Ok(normalize(&format!("{}/{}", dir, path)));
    }

    let candidates = [
        format!("{}/{}", dir, path),
        format!("/{}", path),
        format!("/vendor/{}", path),
    ];
    candidates
        .iter()
        .map(|c| normalize(c))
        .find(|c| loader.exists(c))
        .ok_or_else(|| ParseError::NotFound(path.to_string()))
}

fn with_extension(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    if last.contains('.') {
        path.to_string()
    } else {
        format!("{}.ts", path)
    }
}

fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => String::new(),
        Some(i) => path[..i].to_string(),
    }
}

/// Makes `path` absolute and removes `.` and `..` segments.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("main.ts"), "/main.ts");
        assert_eq!(normalize("/a/./b/../c.ts"), "/a/c.ts");
        assert_eq!(normalize("../../x.ts"), "/x.ts");
    }

    #[test]
    fn test_resolve_relative_and_bare() {
        let loader = MemoryLoader::new()
            .with_file("/lib/util.ts", "")
            .with_file("/vendor/json.ts", "")
            .with_file("/app/helpers.ts", "");

        assert_eq!(resolve(&loader, "/app", "./helpers").unwrap(), "/app/helpers.ts");
        assert_eq!(resolve(&loader, "/app", "../lib/util").unwrap(), "/lib/util.ts");
        assert_eq!(resolve(&loader, "/app", "helpers").unwrap(), "/app/helpers.ts");
        assert_eq!(resolve(&loader, "/app", "lib/util").unwrap(), "/lib/util.ts");
        assert_eq!(resolve(&loader, "/app", "json").unwrap(), "/vendor/json.ts");
        assert!(matches!(
            resolve(&loader, "/app", "missing"),
            Err(ParseError::NotFound(_))
        ));
    }
}
