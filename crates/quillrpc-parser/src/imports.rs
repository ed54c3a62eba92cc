//! Import specs and on-disk package resolution.
//!
//! An import is either a `mod foo;` declaration or the package segment of a
//! `use` path. Resolution tries, in order: the importing package's directory,
//! its `vendor/` directory, then every entry of the configured search path.
//! The first existing directory (or lone `.rs` file) wins; an unresolvable
//! import is skipped, its symbols simply never reach the schema.

use std::path::{Path, PathBuf};

use syn::{Item, UseTree};
use tracing::debug;

/// Syntax the import came from; decides how the emitted file restates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `mod <name>;`
    Mod,
    /// `use ...::<name>[ as alias];`
    Use,
}

#[derive(Debug, Clone)]
pub struct Import {
    /// Local scope name: the alias if present, the package segment
    /// otherwise.
    pub name: String,

    /// Package segment used for filesystem lookup.
    pub path: String,

    /// Path up to and including the package segment, qualifiers kept
    /// (`["crate", "model"]` for `use crate::model::Point`).
    pub segments: Vec<String>,

    pub kind: ImportKind,
}

impl Import {
    /// Import line the generated sibling file needs to see this package.
    pub fn use_line(&self) -> String {
        match self.kind {
            ImportKind::Mod => format!("use super::{};", self.name),
            ImportKind::Use if self.name == self.path => {
                format!("use {};", self.segments.join("::"))
            }
            ImportKind::Use => {
                format!("use {} as {};", self.segments.join("::"), self.name)
            }
        }
    }

    /// Dedup key: same path under a different alias is a distinct import.
    pub fn dedup_key(&self) -> String {
        format!("{}|{}", self.segments.join("::"), self.name)
    }
}

/// Collect import specs from a parsed file.
pub fn collect_imports(file: &syn::File) -> Vec<Import> {
    let mut imports = Vec::new();

    for item in &file.items {
        match item {
            Item::Mod(module) if module.content.is_none() => {
                imports.push(Import {
                    name: module.ident.to_string(),
                    path: module.ident.to_string(),
                    segments: vec![module.ident.to_string()],
                    kind: ImportKind::Mod,
                });
            }
            Item::Use(use_item) => walk_use_tree(&use_item.tree, Vec::new(), &mut imports),
            _ => {}
        }
    }

    imports
}

/// The package a `use` names is its first path segment after the
/// `crate`/`self`/`super` qualifiers. Renames deeper in the tree alias items,
/// not packages, and are ignored.
fn walk_use_tree(tree: &UseTree, qualifiers: Vec<String>, out: &mut Vec<Import>) {
    match tree {
        UseTree::Path(path) => {
            let segment = path.ident.to_string();
            if matches!(segment.as_str(), "crate" | "self" | "super") {
                let mut qualifiers = qualifiers;
                qualifiers.push(segment);
                walk_use_tree(&path.tree, qualifiers, out);
            } else {
                let mut segments = qualifiers;
                segments.push(segment.clone());
                out.push(Import {
                    name: segment.clone(),
                    path: segment,
                    segments,
                    kind: ImportKind::Use,
                });
            }
        }
        UseTree::Name(name) => {
            let segment = name.ident.to_string();
            if matches!(segment.as_str(), "crate" | "self" | "super") {
                return;
            }
            let mut segments = qualifiers;
            segments.push(segment.clone());
            out.push(Import {
                name: segment.clone(),
                path: segment,
                segments,
                kind: ImportKind::Use,
            });
        }
        UseTree::Rename(rename) => {
            let segment = rename.ident.to_string();
            let mut segments = qualifiers;
            segments.push(segment.clone());
            out.push(Import {
                name: rename.rename.to_string(),
                path: segment,
                segments,
                kind: ImportKind::Use,
            });
        }
        UseTree::Group(group) => {
            for tree in &group.items {
                walk_use_tree(tree, qualifiers.clone(), out);
            }
        }
        UseTree::Glob(_) => {}
    }
}

/// Locate an import's package on disk. Returns a directory or a lone source
/// file.
pub fn resolve(import: &Import, base_dir: &Path, search_paths: &[PathBuf]) -> Option<PathBuf> {
    let mut roots: Vec<PathBuf> = vec![base_dir.to_path_buf(), base_dir.join("vendor")];
    roots.extend(search_paths.iter().cloned());

    for root in roots {
        let dir = root.join(&import.path);
        if dir.is_dir() {
            return Some(dir);
        }

        let file = root.join(format!("{}.rs", import.path));
        if file.is_file() {
            return Some(file);
        }
    }

    debug!(path = %import.path, "import not found, skipping");
    None
}

/// Source files making up the package at `location`, generated and test
/// files excluded, in name order.
pub fn package_files(location: &Path) -> std::io::Result<Vec<PathBuf>> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(location)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && included_source(path))
        .collect();
    files.sort();

    Ok(files)
}

fn included_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    name.ends_with(".rs")
        && !name.ends_with(crate::GENERATED_FILE_SUFFIX)
        && !name.ends_with("_test.rs")
}
