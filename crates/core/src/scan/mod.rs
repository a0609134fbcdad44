//! Project file scanner.
//!
//! Walks the root with `ignore`, then reads, hashes and extracts every
//! eligible file on a bounded rayon pool. Per-file failures become
//! [`ScanIssue`]s; the scan itself only fails on setup errors.

pub mod filter;

use crate::architecture::detect_markers;
use crate::config::MapConfig;
use crate::error::{MapError, Result};
use crate::extract::ExtractorRegistry;
use filter::{relative_path, ScanFilter};
use ignore::WalkBuilder;
use mapscope_api::{FileRecord, FileRole, Language, ScanIssue, ScanIssueKind};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use xxhash_rust::xxh3::xxh3_64;

pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "composer.json",
    "Gemfile",
];

const ENTRY_STEMS: &[&str] = &["index", "main", "app", "server", "manage", "wsgi", "asgi", "lib"];
const ENTRY_DIRS: &[&str] = &["src", "app", "cmd", "bin", "server"];
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "specs", "e2e"];

/// Everything one scan pass produced.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// Sorted by path
    pub records: Vec<FileRecord>,
    pub issues: Vec<ScanIssue>,
    /// Paths whose content was (re)read and extracted
    pub changed: BTreeSet<String>,
    /// Paths known before but no longer present
    pub removed: BTreeSet<String>,
    pub reused: usize,
}

enum FileOutcome {
    Fresh(FileRecord, Option<ScanIssue>),
    Reused(FileRecord),
    Skipped(ScanIssue),
}

pub struct Scanner {
    root: PathBuf,
    filter: ScanFilter,
    max_file_size: u64,
    max_workers: usize,
    extractors: ExtractorRegistry,
}

impl Scanner {
    pub fn new(root: &Path, config: &MapConfig) -> Result<Self> {
        let map_dir = config.resolve_map_dir(root);
        Ok(Self {
            root: root.to_path_buf(),
            filter: ScanFilter::new(&config.ignore_patterns, Some(map_dir))?,
            max_file_size: config.max_file_size,
            max_workers: config.max_workers.max(1),
            extractors: ExtractorRegistry::default(),
        })
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    /// Scans every eligible file.
    pub fn scan(&self) -> Result<ScanOutput> {
        self.scan_with_previous(&[])
    }

    /// Rescans only files whose mtime and content hash differ from `previous`.
    pub fn scan_with_previous(&self, previous: &[FileRecord]) -> Result<ScanOutput> {
        let paths = self.collect_paths();
        let known: HashMap<&str, &FileRecord> =
            previous.iter().map(|r| (r.path.as_str(), r)).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| MapError::Internal(format!("failed to build scan pool: {}", e)))?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            paths
                .par_iter()
                .map(|(abs, rel)| self.scan_file(abs, rel, known.get(rel.as_str()).copied()))
                .collect()
        });

        let mut output = ScanOutput::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Fresh(record, issue) => {
                    output.changed.insert(record.path.clone());
                    output.records.push(record);
                    output.issues.extend(issue);
                }
                FileOutcome::Reused(record) => {
                    output.reused += 1;
                    output.records.push(record);
                }
                FileOutcome::Skipped(issue) => output.issues.push(issue),
            }
        }
        output.records.sort_by(|a, b| a.path.cmp(&b.path));
        output.issues.sort();

        let present: BTreeSet<&str> = output.records.iter().map(|r| r.path.as_str()).collect();
        output.removed = previous
            .iter()
            .filter(|r| !present.contains(r.path.as_str()))
            .map(|r| r.path.clone())
            .collect();

        tracing::debug!(
            "Scanned {} files ({} reused, {} removed, {} issues)",
            output.records.len(),
            output.reused,
            output.removed.len(),
            output.issues.len()
        );
        Ok(output)
    }

    /// Eligible files as `(absolute, root-relative)` pairs, sorted.
    pub fn collect_paths(&self) -> Vec<(PathBuf, String)> {
        let root = self.root.clone();
        let mut paths: Vec<(PathBuf, String)> = WalkBuilder::new(&self.root)
            .require_git(false)
            .filter_entry({
                let filter_root = root.clone();
                let dir_filter = self.filter.clone();
                move |entry| {
                    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                    if !is_dir || entry.depth() == 0 {
                        return true;
                    }
                    let rel = relative_path(&filter_root, entry.path()).unwrap_or_default();
                    dir_filter.allows_dir(entry.path(), &rel)
                }
            })
            .build()
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let path = entry.path();
                if !entry.file_type()?.is_file() || self.filter.is_inside_map_dir(path) {
                    return None;
                }
                let rel = relative_path(&root, path)?;
                if self.filter.is_excluded(&rel) || Language::from_path(path).is_none() {
                    return None;
                }
                Some((path.to_path_buf(), rel))
            })
            .collect();
        paths.sort_by(|a, b| a.1.cmp(&b.1));
        paths
    }

    fn scan_file(&self, abs: &Path, rel: &str, previous: Option<&FileRecord>) -> FileOutcome {
        let issue = |kind, message: String| ScanIssue {
            path: rel.to_string(),
            kind,
            message,
        };

        let metadata = match fs::metadata(abs) {
            Ok(m) => m,
            Err(e) => return FileOutcome::Skipped(issue(ScanIssueKind::Unreadable, e.to_string())),
        };
        let size = metadata.len();
        if size > self.max_file_size {
            return FileOutcome::Skipped(issue(
                ScanIssueKind::TooLarge,
                format!("{} bytes exceeds the {} byte limit", size, self.max_file_size),
            ));
        }
        let modified = unix_mtime(&metadata);

        if let Some(prev) = previous {
            if prev.modified == modified && prev.size == size {
                return FileOutcome::Reused(prev.clone());
            }
        }

        let bytes = match fs::read(abs) {
            Ok(b) => b,
            Err(e) => return FileOutcome::Skipped(issue(ScanIssueKind::Unreadable, e.to_string())),
        };
        let content_hash = hash_bytes(&bytes);

        // mtime moved but the content did not
        if let Some(prev) = previous {
            if prev.content_hash == content_hash {
                let mut record = prev.clone();
                record.modified = modified;
                return FileOutcome::Reused(record);
            }
        }

        let text = match String::from_utf8(bytes) {
            Ok(t) => t,
            Err(e) => return FileOutcome::Skipped(issue(ScanIssueKind::NotUtf8, e.to_string())),
        };

        let language = Language::from_path(abs).unwrap_or(Language::UNKNOWN);
        let mut record = FileRecord {
            path: rel.to_string(),
            size,
            role: detect_role(rel, &language),
            language,
            layer: None,
            content_hash,
            modified,
            exports: Vec::new(),
            imports: Vec::new(),
            signatures: Vec::new(),
            frameworks: Vec::new(),
            markers: Vec::new(),
            tables: Vec::new(),
        };

        let mut extraction_issue = None;
        if record.language.is_code() {
            let outcome = self.extractors.extract_signatures(&text, &record.language);
            if let Some(message) = outcome.issue {
                extraction_issue = Some(issue(ScanIssueKind::ExtractionFailed, message));
            }
            record.exports = outcome.extraction.exports;
            record.imports = outcome.extraction.imports;
            record.signatures = outcome.extraction.signatures;

            let found = detect_markers(&text, &record.language, &record.imports);
            record.frameworks = found.frameworks;
            record.markers = found.markers;
            record.tables = found.tables;
        }

        FileOutcome::Fresh(record, extraction_issue)
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

pub fn unix_mtime(metadata: &fs::Metadata) -> u64 {
    metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(std::time::Duration::ZERO)
        .as_secs()
}

/// Role from the path alone.
pub fn detect_role(rel: &str, language: &Language) -> FileRole {
    let (dir, name) = rel.rsplit_once('/').unwrap_or(("", rel));
    let segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    let lower = name.to_ascii_lowercase();
    let stem = name.split('.').next().unwrap_or(name);

    if MANIFEST_FILES.contains(&name) {
        return FileRole::Manifest;
    }
    if is_test_name(name, &lower) || segments.iter().any(|s| TEST_DIRS.contains(s)) {
        return FileRole::Test;
    }
    if *language == Language::MARKDOWN || segments.first() == Some(&"docs") {
        return FileRole::Docs;
    }
    if !language.is_code() || lower.contains(".config.") || lower.starts_with(".") {
        return FileRole::Config;
    }

    let shallow = segments.is_empty()
        || (segments.len() == 1 && ENTRY_DIRS.contains(&segments[0]))
        || (segments.first() == Some(&"cmd") && segments.len() == 2);
    if (shallow && ENTRY_STEMS.contains(&stem.to_ascii_lowercase().as_str()))
        || stem.ends_with("Application")
        || (segments.len() >= 2 && segments[segments.len() - 1] == "bin" && *language == Language::RUST)
    {
        return FileRole::Entry;
    }
    FileRole::Source
}

fn is_test_name(name: &str, lower: &str) -> bool {
    lower.contains(".test.")
        || lower.contains(".spec.")
        || lower.ends_with("_test.go")
        || lower.ends_with("_test.py")
        || (lower.starts_with("test_") && lower.ends_with(".py"))
        || name.ends_with("Test.java")
        || name.ends_with("Tests.java")
        || name.ends_with("Test.kt")
        || name.ends_with("Spec.kt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config_for(map_dir: &Path) -> MapConfig {
        MapConfig::default().with_map_dir(map_dir).with_max_workers(2)
    }

    #[test]
    fn test_detect_role() {
        assert_eq!(detect_role("package.json", &Language::JSON), FileRole::Manifest);
        assert_eq!(
            detect_role("src/user.test.js", &Language::JAVASCRIPT),
            FileRole::Test
        );
        assert_eq!(
            detect_role("tests/helpers.py", &Language::PYTHON),
            FileRole::Test
        );
        assert_eq!(detect_role("README.md", &Language::MARKDOWN), FileRole::Docs);
        assert_eq!(detect_role("src/index.ts", &Language::TYPESCRIPT), FileRole::Entry);
        assert_eq!(detect_role("cmd/api/main.go", &Language::GO), FileRole::Entry);
        assert_eq!(
            detect_role("vite.config.ts", &Language::TYPESCRIPT),
            FileRole::Config
        );
        assert_eq!(
            detect_role("src/services/index.ts", &Language::TYPESCRIPT),
            FileRole::Source
        );
        assert_eq!(
            detect_role("src/main/java/com/acme/ShopApplication.java", &Language::JAVA),
            FileRole::Entry
        );
    }

    #[test]
    fn test_scan_collects_sorted_records() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::create_dir_all(root.join("node_modules/lib")).unwrap();
        fs::write(
            root.join("src/routes/users.js"),
            "const c = require('../controllers/users');\nmodule.exports = { list };\nfunction list() {}\n",
        )
        .unwrap();
        fs::write(root.join("src/index.js"), "require('./routes/users');\n").unwrap();
        fs::write(root.join("node_modules/lib/index.js"), "x").unwrap();
        fs::write(root.join("image.png"), [0u8, 1, 2]).unwrap();

        let scanner = Scanner::new(&root, &config_for(&dir.path().join("maps"))).unwrap();
        let out = scanner.scan().unwrap();

        let paths: Vec<_> = out.records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["src/index.js", "src/routes/users.js"]);
        assert!(out.issues.is_empty());
        assert_eq!(out.changed.len(), 2);

        let users = &out.records[1];
        assert_eq!(users.imports, vec!["../controllers/users"]);
        assert_eq!(users.exports, vec!["list"]);
        assert_eq!(users.content_hash.len(), 16);
    }

    #[test]
    fn test_issues_do_not_abort() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("bad.js"), [0xffu8, 0xfe, 0x00]).unwrap();
        fs::write(root.join("big.js"), "x".repeat(64)).unwrap();
        fs::write(root.join("ok.js"), "export const a = 1;\n").unwrap();

        let mut config = config_for(&dir.path().join("maps"));
        config.max_file_size = 32;
        let out = Scanner::new(&root, &config).unwrap().scan().unwrap();

        assert_eq!(out.records.len(), 1);
        let kinds: Vec<_> = out.issues.iter().map(|i| (i.path.as_str(), i.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("bad.js", ScanIssueKind::NotUtf8),
                ("big.js", ScanIssueKind::TooLarge)
            ]
        );
    }

    #[test]
    fn test_previous_records_are_reused() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("a.js"), "export function a() {}\n").unwrap();
        fs::write(root.join("b.js"), "export function b() {}\n").unwrap();

        let scanner = Scanner::new(&root, &config_for(&dir.path().join("maps"))).unwrap();
        let first = scanner.scan().unwrap();

        fs::remove_file(root.join("b.js")).unwrap();
        fs::write(root.join("c.js"), "export function c() {}\n").unwrap();

        let second = scanner.scan_with_previous(&first.records).unwrap();
        assert_eq!(second.reused, 1);
        assert_eq!(second.changed.iter().collect::<Vec<_>>(), vec!["c.js"]);
        assert_eq!(second.removed.iter().collect::<Vec<_>>(), vec!["b.js"]);
    }

    #[test]
    fn test_user_globs_exclude_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("project");
        fs::create_dir_all(root.join("legacy")).unwrap();
        fs::write(root.join("legacy/old.js"), "x").unwrap();
        fs::write(root.join("new.js"), "x").unwrap();

        let config = config_for(&dir.path().join("maps"))
            .with_ignore_patterns(vec!["legacy/**".to_string()]);
        let out = Scanner::new(&root, &config).unwrap().scan().unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].path, "new.js");
    }
}
