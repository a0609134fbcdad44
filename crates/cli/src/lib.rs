mod generate;
mod query;
mod status;

use clap::{Parser, Subcommand};
use mapscope_api::{ApiError, Layer, QueryKind, SearchKind, SignatureKind};
use mapscope_core::{MapConfig, MapEngine};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "mapscope",
    version,
    about = "A compressed, queryable structural map of a software project",
    long_about = "Mapscope scans a project once, detects its architecture, import graph and \
                  request-to-storage data flows, and stores the results as compressed maps. \
                  Queries and searches are answered from the maps without rescanning."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the project and publish a fresh set of maps
    Generate {
        #[arg(value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
    },
    /// Bring the published maps up to date
    #[command(
        long_about = "Rescans only files whose size, mtime or content changed and patches the \
                      published maps. Use --full to discard them and regenerate from scratch."
    )]
    Refresh {
        #[arg(value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
        #[arg(long)]
        full: bool,
    },
    /// Answer one of the structural queries (entry-points, data-flow, issues, ...)
    Query {
        #[arg(value_name = "TYPE")]
        kind: QueryKind,
        #[arg(long, value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
        /// Restrict `dependencies` to one file
        #[arg(long)]
        file: Option<String>,
        /// Restrict `backend-layers` to one layer
        #[arg(long)]
        layer: Option<Layer>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Ranked search over files, exports, imports and signatures
    Search {
        #[arg(value_name = "TYPE")]
        kind: SearchKind,
        #[arg(value_name = "PATTERN", default_value = "")]
        pattern: String,
        #[arg(long, value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
        /// Match within an edit distance
        #[arg(long)]
        fuzzy: bool,
        #[arg(long)]
        max_distance: Option<usize>,
        /// Signature kind (function, method, class, interface, type, enum)
        #[arg(long = "kind")]
        signature_kind: Option<SignatureKind>,
        #[arg(long = "async")]
        is_async: bool,
        #[arg(long)]
        params: Option<usize>,
        #[arg(long)]
        returns: Option<String>,
        #[arg(long)]
        exported: bool,
        #[arg(long)]
        group: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Compression statistics of the published maps
    Stats {
        #[arg(value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
    },
    /// How far the published maps lag behind the file system
    Status {
        #[arg(value_name = "PROJECT_PATH")]
        path: Option<PathBuf>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = mapscope_core::logging::init_logging("cli", true);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Generate { path } => rt.block_on(generate::run(project_root(path), true)),
        Commands::Refresh { path, full } => rt.block_on(generate::run(project_root(path), full)),
        Commands::Query {
            kind,
            path,
            file,
            layer,
            limit,
        } => {
            let options = mapscope_api::QueryOptions { file, layer, limit };
            rt.block_on(query::run_query(project_root(path), kind, options))
        }
        Commands::Search {
            kind,
            pattern,
            path,
            fuzzy,
            max_distance,
            signature_kind,
            is_async,
            params,
            returns,
            exported,
            group,
            limit,
        } => {
            let mut request = mapscope_api::SearchRequest::new(kind, pattern);
            request.fuzzy = fuzzy || max_distance.is_some();
            request.max_distance = max_distance;
            request.group_by_directory = group;
            request.limit = limit;
            let criteria = mapscope_api::SignatureCriteria {
                kind: signature_kind,
                is_async: is_async.then_some(true),
                param_count: params,
                return_type: returns,
                visibility: None,
                exported: exported.then_some(true),
            };
            if criteria != mapscope_api::SignatureCriteria::default() {
                request = request.with_criteria(criteria);
            }
            rt.block_on(query::run_search(project_root(path), request))
        }
        Commands::Stats { path } => rt.block_on(status::run_stats(project_root(path))),
        Commands::Status { path } => rt.block_on(status::run_status(project_root(path))),
    }
}

fn project_root(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

pub(crate) async fn open_engine(root: &Path) -> Result<MapEngine, Box<dyn std::error::Error>> {
    let config = MapConfig::load(root)?;
    Ok(MapEngine::open(root, config).await?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Adds the error's hint, if any, to the message shown to the user.
pub(crate) fn with_hint(err: ApiError) -> Box<dyn std::error::Error> {
    match err.suggestion() {
        Some(hint) => format!("{} ({})", err, hint).into(),
        None => Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_with_criteria() {
        let cli = Cli::try_parse_from([
            "mapscope", "search", "signature", "fetch", "--fuzzy", "--kind", "function", "--async",
        ])
        .unwrap();
        match cli.command {
            Commands::Search {
                kind,
                pattern,
                fuzzy,
                signature_kind,
                is_async,
                ..
            } => {
                assert_eq!(kind, SearchKind::Signature);
                assert_eq!(pattern, "fetch");
                assert!(fuzzy && is_async);
                assert_eq!(signature_kind, Some(SignatureKind::Function));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_query_kind() {
        let cli = Cli::try_parse_from(["mapscope", "query", "data-flow", "--limit", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Query {
                kind: QueryKind::DataFlow,
                limit: Some(5),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["mapscope", "query", "nonsense"]).is_err());
    }
}
