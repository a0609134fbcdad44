//! Package manifests: npm dependency tables and package-manager detection.

use crate::graph::DependencyGraph;
use mapscope_api::{FileRecord, Language, PackageManifest};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const PACKAGE_JSON: &str = "package.json";

/// Manifest file name → package manager
const PACKAGE_MANAGERS: &[(&str, &str)] = &[
    ("package.json", "npm"),
    ("Cargo.toml", "cargo"),
    ("go.mod", "go modules"),
    ("pom.xml", "maven"),
    ("build.gradle", "gradle"),
    ("build.gradle.kts", "gradle"),
    ("requirements.txt", "pip"),
    ("pyproject.toml", "pip"),
    ("Pipfile", "pipenv"),
    ("composer.json", "composer"),
    ("Gemfile", "bundler"),
];

pub fn package_managers(records: &[FileRecord]) -> Vec<String> {
    let managers: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| {
            PACKAGE_MANAGERS
                .iter()
                .find(|(file, _)| *file == r.file_name())
                .map(|(_, manager)| *manager)
        })
        .collect();
    managers.into_iter().map(str::to_string).collect()
}

fn string_table(value: &Value, key: &str) -> BTreeMap<String, String> {
    value
        .get(key)
        .and_then(Value::as_object)
        .map(|table| {
            table
                .iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parses one `package.json`; `None` when the text is not a JSON object.
pub fn parse_package_json(path: &str, text: &str) -> Option<PackageManifest> {
    let value: Value = serde_json::from_str(text).ok()?;
    if !value.is_object() {
        return None;
    }
    let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    Some(PackageManifest {
        path: path.to_string(),
        name: field("name"),
        version: field("version"),
        dependencies: string_table(&value, "dependencies"),
        dev_dependencies: string_table(&value, "devDependencies"),
        scripts: string_table(&value, "scripts"),
        used_packages: BTreeMap::new(),
    })
}

/// Every readable `package.json`, with the number of files importing each
/// declared package from the manifest's subtree.
pub fn npm_manifests(
    root: &Path,
    records: &[FileRecord],
    graph: &DependencyGraph,
) -> Vec<PackageManifest> {
    let mut manifests = Vec::new();
    for record in records.iter().filter(|r| r.file_name() == PACKAGE_JSON) {
        let text = match std::fs::read_to_string(root.join(&record.path)) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", record.path, e);
                continue;
            }
        };
        let Some(mut manifest) = parse_package_json(&record.path, &text) else {
            tracing::debug!("Skipping malformed manifest {}", record.path);
            continue;
        };

        let scope = record.directory();
        let declared: BTreeSet<&String> = manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .collect();
        let mut used: BTreeMap<String, usize> = BTreeMap::new();
        for source in records.iter().filter(|r| {
            (r.language == Language::JAVASCRIPT
                || r.language == Language::TYPESCRIPT
                || r.language == Language::VUE)
                && (scope.is_empty() || r.path.starts_with(&format!("{}/", scope)))
        }) {
            let packages: BTreeSet<&str> = graph
                .external_of(&source.path)
                .iter()
                .map(|e| e.package.as_str())
                .collect();
            for package in packages {
                if declared.iter().any(|d| d.as_str() == package) {
                    *used.entry(package.to_string()).or_insert(0) += 1;
                }
            }
        }
        manifest.used_packages = used;
        manifests.push(manifest);
    }
    manifests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_package_json() {
        let text = r#"{
            "name": "shop",
            "version": "1.2.0",
            "dependencies": { "express": "^4.18.0" },
            "devDependencies": { "jest": "^29.0.0" },
            "scripts": { "test": "jest" }
        }"#;
        let manifest = parse_package_json("package.json", text).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("shop"));
        assert_eq!(manifest.dependencies.get("express").map(String::as_str), Some("^4.18.0"));
        assert_eq!(manifest.dev_dependencies.len(), 1);
        assert_eq!(manifest.scripts.get("test").map(String::as_str), Some("jest"));

        assert!(parse_package_json("package.json", "[1, 2]").is_none());
        assert!(parse_package_json("package.json", "{ nope").is_none());
    }
}
