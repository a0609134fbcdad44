//! Maps raw import specifiers to project files.

use crate::extract::MOD_PREFIX;
use mapscope_api::{FileRecord, Language};
use std::collections::{BTreeSet, HashMap};

const JS_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "json"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Internal(Vec<String>),
    External { package: String },
}

/// A Go module declared by a `go.mod`, rooted at `dir` ("" for the project root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    pub path: String,
    pub dir: String,
}

pub struct ImportResolver {
    files: BTreeSet<String>,
    /// Class/file name → JVM source paths without extension
    jvm_by_name: HashMap<String, Vec<(String, String)>>,
    go_modules: Vec<GoModule>,
}

impl ImportResolver {
    pub fn new(records: &[FileRecord], go_modules: Vec<GoModule>) -> Self {
        let files: BTreeSet<String> = records.iter().map(|r| r.path.clone()).collect();
        let mut jvm_by_name: HashMap<String, Vec<(String, String)>> = HashMap::new();
        for record in records {
            if record.language == Language::JAVA || record.language == Language::KOTLIN {
                let without_ext = strip_extension(&record.path).to_string();
                jvm_by_name
                    .entry(record.stem().to_string())
                    .or_default()
                    .push((without_ext, record.path.clone()));
            }
        }
        let mut go_modules = go_modules;
        // longest module path first so nested modules win
        go_modules.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Self {
            files,
            jvm_by_name,
            go_modules,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn resolve(&self, source: &FileRecord, specifier: &str) -> Resolution {
        let lang = &source.language;
        let targets = if *lang == Language::JAVASCRIPT
            || *lang == Language::TYPESCRIPT
            || *lang == Language::VUE
        {
            self.resolve_js(source, specifier)
        } else if *lang == Language::PYTHON {
            self.resolve_python(source, specifier)
        } else if *lang == Language::JAVA || *lang == Language::KOTLIN {
            self.resolve_jvm(specifier)
        } else if *lang == Language::GO {
            self.resolve_go(specifier)
        } else if *lang == Language::RUST {
            self.resolve_rust(source, specifier)
        } else {
            Vec::new()
        };

        let targets: Vec<String> = targets.into_iter().filter(|t| *t != source.path).collect();
        if targets.is_empty() {
            Resolution::External {
                package: package_name(lang, specifier),
            }
        } else {
            Resolution::Internal(targets)
        }
    }

    fn first_existing(&self, candidates: impl IntoIterator<Item = String>) -> Vec<String> {
        candidates
            .into_iter()
            .find(|c| self.files.contains(c))
            .into_iter()
            .collect()
    }

    fn resolve_js(&self, source: &FileRecord, specifier: &str) -> Vec<String> {
        let base = if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            join(source.directory(), specifier)
        } else if let Some(rest) = specifier
            .strip_prefix("@/")
            .or_else(|| specifier.strip_prefix("~/"))
        {
            join("src", rest)
        } else {
            return Vec::new();
        };
        let Some(base) = base else {
            return Vec::new();
        };

        let mut candidates = vec![base.clone()];
        candidates.extend(JS_EXTENSIONS.iter().map(|ext| format!("{}.{}", base, ext)));
        candidates.extend(JS_EXTENSIONS.iter().map(|ext| format!("{}/index.{}", base, ext)));
        self.first_existing(candidates)
    }

    fn resolve_python(&self, source: &FileRecord, specifier: &str) -> Vec<String> {
        let dots = specifier.chars().take_while(|c| *c == '.').count();
        let rest = specifier[dots..].replace('.', "/");

        let bases: Vec<String> = if dots > 0 {
            let mut dir = Some(source.directory().to_string());
            for _ in 1..dots {
                dir = dir.and_then(|d| parent_dir(&d));
            }
            dir.into_iter().collect()
        } else {
            vec![String::new(), "src".to_string()]
        };

        for base in bases {
            let module = match (base.is_empty(), rest.is_empty()) {
                (true, _) => rest.clone(),
                (false, true) => base.clone(),
                (false, false) => format!("{}/{}", base, rest),
            };
            let candidates = if rest.is_empty() {
                vec![format!("{}/__init__.py", module)]
            } else {
                vec![format!("{}.py", module), format!("{}/__init__.py", module)]
            };
            let found = self.first_existing(candidates);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    fn resolve_jvm(&self, specifier: &str) -> Vec<String> {
        let trimmed = specifier.trim_end_matches(".*");
        let segments: Vec<&str> = trimmed.split('.').collect();
        // `a.b.Type` or, for static member imports, `a.b.Type.member`
        for take in [segments.len(), segments.len().saturating_sub(1)] {
            if take == 0 {
                continue;
            }
            let name = segments[take - 1];
            let suffix = segments[..take].join("/");
            if let Some(entries) = self.jvm_by_name.get(name) {
                let mut found: Vec<String> = entries
                    .iter()
                    .filter(|(stem, _)| *stem == suffix || stem.ends_with(&format!("/{}", suffix)))
                    .map(|(_, path)| path.clone())
                    .collect();
                if !found.is_empty() {
                    found.sort();
                    found.truncate(1);
                    return found;
                }
            }
        }
        Vec::new()
    }

    fn resolve_go(&self, specifier: &str) -> Vec<String> {
        for module in &self.go_modules {
            let rest = if specifier == module.path {
                ""
            } else if let Some(rest) = specifier.strip_prefix(&format!("{}/", module.path)) {
                rest
            } else {
                continue;
            };
            let dir = match (module.dir.is_empty(), rest.is_empty()) {
                (true, _) => rest.to_string(),
                (false, true) => module.dir.clone(),
                (false, false) => format!("{}/{}", module.dir, rest),
            };
            // a Go import names a package directory: depend on every non-test file in it
            return self
                .files
                .iter()
                .filter(|f| {
                    f.ends_with(".go")
                        && !f.ends_with("_test.go")
                        && f.rsplit_once('/').map(|(d, _)| d).unwrap_or("") == dir
                })
                .cloned()
                .collect();
        }
        Vec::new()
    }

    fn resolve_rust(&self, source: &FileRecord, specifier: &str) -> Vec<String> {
        let module_dir = rust_module_dir(&source.path);

        if let Some(name) = specifier.strip_prefix(MOD_PREFIX) {
            return self.first_existing([
                format!("{}/{}.rs", module_dir, name),
                format!("{}/{}/mod.rs", module_dir, name),
            ]);
        }

        let segments: Vec<&str> = specifier.split("::").collect();
        let (base, rest) = match segments.first().copied() {
            Some("crate") => match crate_src_dir(&source.path) {
                Some(src) => (src, &segments[1..]),
                None => return Vec::new(),
            },
            Some("self") => (module_dir, &segments[1..]),
            Some("super") => {
                let mut dir = Some(module_dir);
                let mut skip = 0;
                for seg in &segments {
                    if *seg != "super" {
                        break;
                    }
                    dir = dir.and_then(|d| parent_dir(&d));
                    skip += 1;
                }
                match dir {
                    Some(d) => (d, &segments[skip..]),
                    None => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        };

        // longest module prefix that exists as a file
        for take in (1..=rest.len()).rev() {
            let module = rest[..take].join("/");
            let prefix = if base.is_empty() {
                module
            } else {
                format!("{}/{}", base, module)
            };
            let found = self.first_existing([format!("{}.rs", prefix), format!("{}/mod.rs", prefix)]);
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }
}

/// Package an unresolved specifier belongs to.
pub fn package_name(language: &Language, specifier: &str) -> String {
    if *language == Language::PYTHON {
        return specifier
            .trim_start_matches('.')
            .split('.')
            .next()
            .unwrap_or(specifier)
            .to_string();
    }
    if *language == Language::JAVA || *language == Language::KOTLIN {
        let parts: Vec<&str> = specifier.split('.').collect();
        return parts[..parts.len().min(2)].join(".");
    }
    if *language == Language::RUST {
        return specifier.split("::").next().unwrap_or(specifier).to_string();
    }
    if *language == Language::GO {
        let parts: Vec<&str> = specifier.split('/').collect();
        let take = if parts.first().is_some_and(|p| p.contains('.')) { 3 } else { 1 };
        return parts[..parts.len().min(take)].join("/");
    }
    if specifier.starts_with('.') || specifier.starts_with('/') {
        return specifier.to_string();
    }
    let parts: Vec<&str> = specifier.split('/').collect();
    if specifier.starts_with('@') && parts.len() > 1 {
        format!("{}/{}", parts[0], parts[1])
    } else {
        parts[0].to_string()
    }
}

fn strip_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, _)) if !stem.ends_with('/') => stem,
        _ => path,
    }
}

fn parent_dir(dir: &str) -> Option<String> {
    if dir.is_empty() {
        return None;
    }
    Some(dir.rsplit_once('/').map(|(p, _)| p).unwrap_or("").to_string())
}

/// Joins a relative specifier onto `dir`, resolving `.` and `..`.
/// `None` when the path escapes the project root.
fn join(dir: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in relative.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Directory whose children are the submodules of the module defined by `path`.
fn rust_module_dir(path: &str) -> String {
    let (dir, name) = path.rsplit_once('/').unwrap_or(("", path));
    match name {
        "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
        _ => {
            let stem = name.trim_end_matches(".rs");
            if dir.is_empty() {
                stem.to_string()
            } else {
                format!("{}/{}", dir, stem)
            }
        }
    }
}

/// The innermost `src` directory above `path`.
fn crate_src_dir(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let idx = segments[..segments.len().saturating_sub(1)]
        .iter()
        .rposition(|s| *s == "src")?;
    Some(segments[..=idx].join("/"))
}
