//! Structural query catalog, answered from loaded artifacts.

use crate::error::{MapError, Result};
use crate::indexing::documents::framework_usage;
use crate::runtime::snapshot::{LoadedMaps, Slot};
use crate::store::ArtifactName;
use crate::util::module_of;
use mapscope_api::{
    DependencyOverview, FileDependencies, FileRecord, HubFile, Layer, ModuleInfo, QueryKind,
    QueryOptions, QueryResult, TableMapping,
};
use std::collections::BTreeMap;

pub const REGENERATE_HINT: &str = "run `refresh full` to regenerate the maps";
const OVERVIEW_TOP: usize = 10;

/// Either the answer, or the `Unavailable` result naming the artifact that failed.
type Answer = std::result::Result<QueryResult, QueryResult>;

pub struct QueryEngine<'a> {
    maps: &'a LoadedMaps,
}

fn need<'b, T>(slot: &'b Slot<T>, name: ArtifactName) -> std::result::Result<&'b T, QueryResult> {
    slot.as_ref().map_err(|reason| QueryResult::Unavailable {
        artifact: name.to_string(),
        reason: reason.clone(),
        suggestion: REGENERATE_HINT.to_string(),
    })
}

fn limited<T>(mut items: Vec<T>, options: &QueryOptions) -> Vec<T> {
    if let Some(limit) = options.limit {
        items.truncate(limit);
    }
    items
}

impl<'a> QueryEngine<'a> {
    pub fn new(maps: &'a LoadedMaps) -> Self {
        Self { maps }
    }

    pub fn execute(&self, kind: QueryKind, options: &QueryOptions) -> Result<QueryResult> {
        Ok(match self.dispatch(kind, options)? {
            Ok(result) | Err(result) => result,
        })
    }

    fn dispatch(&self, kind: QueryKind, options: &QueryOptions) -> Result<Answer> {
        let maps = self.maps;
        let answer = match kind {
            QueryKind::EntryPoints => need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| {
                QueryResult::EntryPoints {
                    entries: limited(q.entry_points.clone(), options),
                }
            }),
            QueryKind::Framework => need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| {
                QueryResult::Framework {
                    frameworks: q.frameworks.clone(),
                }
            }),
            QueryKind::Tests => {
                need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| QueryResult::Tests {
                    count: q.test_files.len(),
                    files: limited(q.test_files.clone(), options),
                })
            }
            QueryKind::Largest => {
                need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| QueryResult::Largest {
                    files: limited(q.largest.clone(), options),
                })
            }
            QueryKind::Recent => {
                need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| QueryResult::Recent {
                    files: limited(q.recent.clone(), options),
                })
            }
            QueryKind::Structure => need(&maps.tree, ArtifactName::Tree).map(|t| {
                QueryResult::Structure {
                    tree: t.tree.clone(),
                }
            }),
            QueryKind::Languages => need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| {
                QueryResult::Languages {
                    languages: q.languages.clone(),
                }
            }),
            QueryKind::Summary => need(&maps.summary, ArtifactName::Summary).map(|s| {
                QueryResult::Summary {
                    summary: s.summary.clone(),
                }
            }),
            QueryKind::BackendLayers => {
                need(&maps.backend_layers, ArtifactName::BackendLayers).map(|b| {
                    let mut layers = b.layers.files_by_layer();
                    if let Some(only) = options.layer {
                        layers.retain(|layer, _| *layer == only);
                    }
                    QueryResult::BackendLayers {
                        primary: b.patterns.primary.clone(),
                        candidates: b.patterns.candidates.clone(),
                        layers,
                    }
                })
            }
            QueryKind::Modules => need(&maps.metadata, ArtifactName::Metadata).map(|m| {
                QueryResult::Modules {
                    modules: modules(&m.files),
                }
            }),
            QueryKind::ModuleDeps => need(&maps.relationships, ArtifactName::Relationships).map(|r| {
                QueryResult::ModuleDeps {
                    dependencies: limited(r.module_dependencies.clone(), options),
                }
            }),
            QueryKind::Components => need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| {
                QueryResult::Components {
                    components: limited(q.components.clone(), options),
                }
            }),
            QueryKind::Database => need(&maps.metadata, ArtifactName::Metadata).map(|m| {
                QueryResult::Database {
                    frameworks: framework_usage(&m.files)
                        .into_iter()
                        .filter(|f| f.category == "database")
                        .collect(),
                    model_files: m
                        .files
                        .iter()
                        .filter(|r| matches!(r.layer, Some(Layer::Models | Layer::Entities)))
                        .map(|r| r.path.clone())
                        .collect(),
                    tables: table_mappings(&m.files),
                }
            }),
            QueryKind::DataFlow => need(&maps.data_flow, ArtifactName::DataFlow).map(|d| {
                let report = &d.report;
                QueryResult::DataFlow {
                    summary: report.summary.clone(),
                    common_patterns: report.common_patterns.clone(),
                    isolated_endpoints: report.isolated_endpoints.clone(),
                    flows: limited(report.chains.clone(), options),
                }
            }),
            QueryKind::TableMapping => need(&maps.metadata, ArtifactName::Metadata).map(|m| {
                QueryResult::TableMapping {
                    mappings: table_mappings(&m.files),
                }
            }),
            QueryKind::Dependencies => return self.dependencies(options),
            QueryKind::Issues => need(&maps.issues, ArtifactName::Issues).map(|i| {
                QueryResult::Issues {
                    violations: i.violations.clone(),
                    cycles: i.cycles.clone(),
                    scan_issues: i.scan_issues.clone(),
                    unresolved_imports: i.unresolved_imports,
                    ambiguous_pattern: i.ambiguous_pattern,
                }
            }),
            QueryKind::Relationships => {
                need(&maps.relationships, ArtifactName::Relationships).map(|r| {
                    QueryResult::Relationships {
                        hubs: r.hubs.clone(),
                        orphans: limited(r.orphans.clone(), options),
                        layer_edges: r.layer_edges.clone(),
                    }
                })
            }
            QueryKind::NpmDeps => need(&maps.npm_dependencies, ArtifactName::NpmDependencies).map(|n| {
                QueryResult::NpmDeps {
                    manifests: n.manifests.clone(),
                }
            }),
            QueryKind::Stack => need(&maps.quick_queries, ArtifactName::QuickQueries).map(|q| {
                QueryResult::Stack {
                    stack: q.stack.clone(),
                }
            }),
        };
        Ok(answer)
    }

    fn dependencies(&self, options: &QueryOptions) -> Result<Answer> {
        let forward = match need(&self.maps.dependencies_forward, ArtifactName::DependenciesForward) {
            Ok(f) => f,
            Err(unavailable) => return Ok(Err(unavailable)),
        };
        let reverse = match need(&self.maps.dependencies_reverse, ArtifactName::DependenciesReverse) {
            Ok(r) => r,
            Err(unavailable) => return Ok(Err(unavailable)),
        };

        if let Some(file) = &options.file {
            let file = file.trim_start_matches("./");
            let Some(imports) = forward.forward.get(file) else {
                return Err(MapError::NotFound(format!("'{}' is not part of the dependency graph", file)));
            };
            let mut external: Vec<String> = forward
                .external
                .iter()
                .filter(|e| e.source == file)
                .map(|e| e.specifier.clone())
                .collect();
            external.sort();
            external.dedup();
            return Ok(Ok(QueryResult::Dependencies {
                file: Some(FileDependencies {
                    file: file.to_string(),
                    imports: imports.clone(),
                    dependents: reverse.reverse.get(file).cloned().unwrap_or_default(),
                    external,
                }),
                overview: None,
            }));
        }

        let top = |adjacency: &BTreeMap<String, Vec<String>>| {
            let mut hubs: Vec<HubFile> = adjacency
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(path, v)| HubFile {
                    path: path.clone(),
                    count: v.len(),
                })
                .collect();
            hubs.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.path.cmp(&b.path)));
            hubs.truncate(options.limit.unwrap_or(OVERVIEW_TOP));
            hubs
        };
        Ok(Ok(QueryResult::Dependencies {
            file: None,
            overview: Some(DependencyOverview {
                files: forward.forward.len(),
                edges: forward.forward.values().map(Vec::len).sum(),
                external_references: forward.external.len(),
                most_imported: top(&reverse.reverse),
                most_dependencies: top(&forward.forward),
            }),
        }))
    }
}

fn modules(records: &[FileRecord]) -> Vec<ModuleInfo> {
    let mut modules: BTreeMap<&str, ModuleInfo> = BTreeMap::new();
    for record in records.iter().filter(|r| r.language.is_code()) {
        let name = module_of(&record.path);
        let info = modules.entry(name).or_insert_with(|| ModuleInfo {
            name: name.to_string(),
            files: 0,
            exports: 0,
            layers: BTreeMap::new(),
        });
        info.files += 1;
        info.exports += record.exports.len();
        if let Some(layer) = record.layer {
            *info.layers.entry(layer).or_insert(0) += 1;
        }
    }
    modules.into_values().collect()
}

fn table_mappings(records: &[FileRecord]) -> Vec<TableMapping> {
    let mut mappings: Vec<TableMapping> = records
        .iter()
        .flat_map(|r| {
            r.tables.iter().map(move |table| TableMapping {
                table: table.clone(),
                file: r.path.clone(),
                layer: r.layer,
            })
        })
        .collect();
    mappings.sort_by(|a, b| a.table.cmp(&b.table).then_with(|| a.file.cmp(&b.file)));
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::{Analysis, MapDocuments};
    use crate::architecture::ArchitectureReport;
    use crate::flow::FlowReport;
    use crate::graph::{DependencyGraph, ImportResolver};
    use mapscope_api::{FileRole, Language};
    use std::path::PathBuf;

    fn record(path: &str, imports: &[&str], tables: &[&str]) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            size: 10,
            language: Language::JAVASCRIPT,
            role: FileRole::Source,
            layer: None,
            content_hash: String::new(),
            modified: 0,
            exports: vec![],
            imports: imports.iter().map(|s| s.to_string()).collect(),
            signatures: vec![],
            frameworks: vec![],
            markers: vec![],
            tables: tables.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn maps() -> LoadedMaps {
        let mut records = vec![
            record("src/services/users.js", &["../models/user", "lodash"], &[]),
            record("src/models/user.js", &[], &["users"]),
        ];
        let architecture = ArchitectureReport::detect(&records);
        architecture.layers.annotate(&mut records);
        let resolver = ImportResolver::new(&records, vec![]);
        let graph = DependencyGraph::build(&records, &resolver);
        let analysis = Analysis {
            root: PathBuf::from("/nonexistent/shop"),
            records,
            issues: vec![],
            architecture,
            graph,
            flows: FlowReport::default(),
            violations: vec![],
            cycles: vec![],
        };
        LoadedMaps::from_documents(MapDocuments::build(&analysis, 0))
    }

    #[test]
    fn test_file_dependencies() {
        let maps = maps();
        let engine = QueryEngine::new(&maps);
        let result = engine
            .execute(QueryKind::Dependencies, &QueryOptions::for_file("src/models/user.js"))
            .unwrap();
        match result {
            QueryResult::Dependencies { file: Some(deps), .. } => {
                assert!(deps.imports.is_empty());
                assert_eq!(deps.dependents, vec!["src/services/users.js"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let missing = engine.execute(QueryKind::Dependencies, &QueryOptions::for_file("nope.js"));
        assert!(matches!(missing, Err(MapError::NotFound(_))));
    }

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let mut maps = maps();
        maps.issues = Err("decompression failed".to_string());
        let engine = QueryEngine::new(&maps);
        match engine.execute(QueryKind::Issues, &QueryOptions::default()).unwrap() {
            QueryResult::Unavailable { artifact, .. } => assert_eq!(artifact, "issues"),
            other => panic!("unexpected result: {:?}", other),
        }
        // other artifacts still answer
        assert!(matches!(
            engine.execute(QueryKind::TableMapping, &QueryOptions::default()).unwrap(),
            QueryResult::TableMapping { .. }
        ));
    }

    #[test]
    fn test_every_kind_answers() {
        let maps = maps();
        let engine = QueryEngine::new(&maps);
        for kind in QueryKind::ALL {
            let result = engine.execute(kind, &QueryOptions::default()).unwrap();
            assert!(!matches!(result, QueryResult::Unavailable { .. }), "{} unavailable", kind);
        }
    }

    #[test]
    fn test_table_mapping_and_modules() {
        let maps = maps();
        let engine = QueryEngine::new(&maps);
        match engine.execute(QueryKind::TableMapping, &QueryOptions::default()).unwrap() {
            QueryResult::TableMapping { mappings } => {
                assert_eq!(mappings.len(), 1);
                assert_eq!(mappings[0].table, "users");
                assert_eq!(mappings[0].layer, Some(Layer::Models));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match engine.execute(QueryKind::Modules, &QueryOptions::default()).unwrap() {
            QueryResult::Modules { modules } => {
                let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(names, vec!["models", "services"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
