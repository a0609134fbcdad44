mod common;

use common::{engine, shop_fixture, write};
use mapscope_api::{
    ApiError, Layer, PatternType, QueryKind, QueryOptions, QueryResult, QueryService, RefreshMode,
    StalenessLevel,
};
use mapscope_core::MapError;
use tempfile::tempdir;

#[tokio::test]
async fn test_generate_then_query() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());

    let report = engine.generate().await.unwrap();
    assert_eq!(report.files_scanned, 9);
    assert_eq!(report.primary_pattern, Some(PatternType::ServiceOriented));

    match engine.query(QueryKind::Summary, &QueryOptions::default()).await.unwrap() {
        QueryResult::Summary { summary } => assert_eq!(summary.total_files, 9),
        other => panic!("unexpected result: {:?}", other),
    }

    match engine.query(QueryKind::DataFlow, &QueryOptions::default()).await.unwrap() {
        QueryResult::DataFlow {
            flows,
            isolated_endpoints,
            ..
        } => {
            assert_eq!(flows.len(), 2);
            assert!(flows.iter().all(|f| f.depth == 4));
            assert_eq!(isolated_endpoints, vec!["src/routes/health.js"]);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let options = QueryOptions {
        layer: Some(Layer::Services),
        ..Default::default()
    };
    match engine.query(QueryKind::BackendLayers, &options).await.unwrap() {
        QueryResult::BackendLayers { layers, primary, .. } => {
            assert_eq!(
                primary.map(|p| p.pattern_type),
                Some(PatternType::ServiceOriented)
            );
            assert_eq!(layers.len(), 1);
            assert_eq!(layers[&Layer::Services].len(), 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }

    match engine
        .query(QueryKind::Dependencies, &QueryOptions::for_file("src/models/user.js"))
        .await
        .unwrap()
    {
        QueryResult::Dependencies { file: Some(deps), .. } => {
            assert_eq!(deps.dependents, vec!["src/services/users.js"]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_upward_import_is_a_violation() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    engine.generate().await.unwrap();

    match engine.query(QueryKind::Issues, &QueryOptions::default()).await.unwrap() {
        QueryResult::Issues { violations, .. } => assert!(violations.is_empty()),
        other => panic!("unexpected result: {:?}", other),
    }

    write(
        project.path(),
        "src/models/user.js",
        "const c = require('../controllers/users');\nmodule.exports = {};\n",
    );
    engine.refresh(RefreshMode::Incremental).await.unwrap();

    match engine.query(QueryKind::Issues, &QueryOptions::default()).await.unwrap() {
        QueryResult::Issues { violations, .. } => {
            assert_eq!(violations.len(), 1);
            let v = &violations[0];
            assert_eq!(v.file, "src/models/user.js");
            assert_eq!(v.target, "src/controllers/users.js");
            assert_eq!(v.source_layer, Layer::Models);
            assert_eq!(v.target_layer, Layer::Controllers);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_import_cycle_is_reported_and_tracing_terminates() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    write(project.path(), "src/routes/a.js", "const b = require('../services/b');\n");
    write(project.path(), "src/routes/c.js", "const b = require('../services/b');\n");
    write(project.path(), "src/services/b.js", "const d = require('./d');\n");
    write(project.path(), "src/services/d.js", "const b = require('./b');\n");
    let engine = engine(project.path(), maps.path());
    engine.generate().await.unwrap();

    match engine.query(QueryKind::Issues, &QueryOptions::default()).await.unwrap() {
        QueryResult::Issues { cycles, .. } => {
            assert_eq!(cycles.len(), 1);
            assert_eq!(cycles[0].files, vec!["src/services/b.js", "src/services/d.js"]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    match engine.query(QueryKind::DataFlow, &QueryOptions::default()).await.unwrap() {
        QueryResult::DataFlow { flows, .. } => {
            assert_eq!(flows.len(), 2);
            assert!(flows.iter().all(|f| f.depth == 3));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_incremental_refresh_matches_full_generation() {
    let project = tempdir().unwrap();
    shop_fixture(project.path());
    let incremental_maps = tempdir().unwrap();
    let incremental = engine(project.path(), incremental_maps.path());
    incremental.generate().await.unwrap();

    write(project.path(), "src/services/billing.js", "const m = require('../models/order');\n");
    write(
        project.path(),
        "src/controllers/orders.js",
        "const s = require('../services/orders');\nconst b = require('../services/billing');\n",
    );
    std::fs::remove_file(project.path().join("src/routes/health.js")).unwrap();

    let report = incremental.refresh(RefreshMode::Incremental).await.unwrap();
    assert_eq!(report.mode, RefreshMode::Incremental);
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_removed, 1);

    let full_maps = tempdir().unwrap();
    let full = engine(project.path(), full_maps.path());
    full.generate().await.unwrap();

    let kinds = [
        QueryKind::BackendLayers,
        QueryKind::DataFlow,
        QueryKind::Dependencies,
        QueryKind::Issues,
        QueryKind::Relationships,
        QueryKind::Modules,
        QueryKind::Structure,
    ];
    for kind in kinds {
        let a = incremental.query(kind, &QueryOptions::default()).await.unwrap();
        let b = full.query(kind, &QueryOptions::default()).await.unwrap();
        assert_eq!(a, b, "{} differs after incremental refresh", kind);
    }
}

#[tokio::test]
async fn test_staleness_tracks_added_files() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    engine.generate().await.unwrap();

    let fresh = engine.staleness().await.unwrap();
    assert_eq!(fresh.changed_files, 0);
    assert_eq!(fresh.level, StalenessLevel::Fresh);

    write(project.path(), "src/models/invoice.js", "module.exports = {};\n");
    let after = engine.staleness().await.unwrap();
    assert_eq!(after.added, vec!["src/models/invoice.js"]);
    assert!(after.score >= 7.0);
    assert!(!after.should_refresh());
}

#[tokio::test]
async fn test_queries_before_generate_fail_with_missing_maps() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());

    let err = engine
        .query(QueryKind::EntryPoints, &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MapError::ArtifactMissing { .. }));

    let api_err = QueryService::query(&engine, QueryKind::Summary, QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(api_err, ApiError::ArtifactMissing { .. }));
    assert!(api_err.suggestion().is_some());
}
