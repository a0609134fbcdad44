//! Scan exclusion rules: built-in directories, the map directory, user globs.

use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Directories never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "dist",
    "build",
    "coverage",
    "vendor",
    "__pycache__",
    ".venv",
    "venv",
    ".next",
    ".nuxt",
    ".idea",
    ".mapscope",
];

#[derive(Clone)]
pub struct ScanFilter {
    globs: GlobSet,
    map_dir: Option<PathBuf>,
}

impl ScanFilter {
    /// Compiles the user patterns; an invalid glob is an error, not silently skipped.
    pub fn new(patterns: &[String], map_dir: Option<PathBuf>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern.trim_start_matches("./"))?);
        }
        Ok(Self {
            globs: builder.build()?,
            map_dir: map_dir.map(|d| d.canonicalize().unwrap_or(d)),
        })
    }

    pub fn is_ignored_dir_name(name: &str) -> bool {
        IGNORED_DIRS.contains(&name)
    }

    /// `rel` is root-relative with `/` separators.
    pub fn is_excluded(&self, rel: &str) -> bool {
        self.globs.is_match(rel)
    }

    pub fn is_inside_map_dir(&self, abs: &Path) -> bool {
        self.map_dir.as_ref().is_some_and(|dir| abs.starts_with(dir))
    }

    /// Directory entries are pruned when their name is built-in, they hold the
    /// maps, or a user glob matches the directory itself.
    pub fn allows_dir(&self, abs: &Path, rel: &str) -> bool {
        let name = abs.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if Self::is_ignored_dir_name(name) || self.is_inside_map_dir(abs) {
            return false;
        }
        rel.is_empty() || !(self.is_excluded(rel) || self.is_excluded(&format!("{}/", rel)))
    }
}

/// Root-relative path with `/` separators, or `None` outside the root.
pub fn relative_path(root: &Path, abs: &Path) -> Option<String> {
    let rel = abs.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
