mod common;

use common::{engine, shop_fixture};
use mapscope_api::{
    HitCategory, MatchQuality, QueryKind, QueryOptions, QueryResult, SearchKind, SearchRequest,
    SearchResponse, SignatureCriteria, SignatureKind,
};
use mapscope_core::store::{ArtifactName, MapStore, GENERATIONS_DIR, MANIFEST_FILE};
use mapscope_core::{MapConfig, MapEngine, MapError};
use tempfile::tempdir;

fn results(response: SearchResponse) -> Vec<mapscope_api::RankedHit> {
    match response {
        SearchResponse::Results { items, .. } => items,
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_exact_and_fuzzy_search() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    engine.generate().await.unwrap();

    let exact = results(
        engine
            .search(&SearchRequest::new(SearchKind::Export, "getUserById"))
            .await
            .unwrap(),
    );
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].hit.path, "src/services/users.js");
    assert_eq!(exact[0].hit.quality, MatchQuality::Exact);
    assert!(exact[0].hit.signature.as_ref().is_some_and(|s| s.is_async));

    let fuzzy = results(
        engine
            .search(&SearchRequest::new(SearchKind::Export, "getUsrById").fuzzy(2))
            .await
            .unwrap(),
    );
    assert_eq!(fuzzy.len(), 1);
    assert_eq!(fuzzy[0].hit.quality, MatchQuality::Fuzzy);
    assert!(fuzzy[0].score < exact[0].score);

    let none = engine
        .search(&SearchRequest::new(SearchKind::Export, "getUsrById"))
        .await
        .unwrap();
    assert!(matches!(none, SearchResponse::NoResults { .. }));
}

#[tokio::test]
async fn test_signature_criteria_and_file_glob() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    engine.generate().await.unwrap();

    let criteria = SignatureCriteria {
        kind: Some(SignatureKind::Function),
        is_async: Some(true),
        ..Default::default()
    };
    let hits = results(
        engine
            .search(&SearchRequest::new(SearchKind::Signature, "").with_criteria(criteria))
            .await
            .unwrap(),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].hit.name, "getUserById");
    assert_eq!(hits[0].hit.category, HitCategory::Signature);

    let files = results(
        engine
            .search(&SearchRequest::new(SearchKind::File, "src/models/*.js"))
            .await
            .unwrap(),
    );
    let mut paths: Vec<&str> = files.iter().map(|h| h.hit.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["src/models/order.js", "src/models/user.js"]);
}

#[tokio::test]
async fn test_compression_stats() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    let report = engine.generate().await.unwrap();

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.generation, report.generation);
    assert_eq!(stats.artifacts.len(), ArtifactName::ALL.len());
    assert_eq!(
        stats.total_stored,
        stats.artifacts.iter().map(|a| a.stored_size).sum::<u64>()
    );
    assert!(stats.total_original > 0);
    assert!(stats.ratio < 100.0);
}

#[tokio::test]
async fn test_published_generation_survives_reopen() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let first = engine(project.path(), maps.path());
    first.generate().await.unwrap();
    let expected = first
        .query(QueryKind::DataFlow, &QueryOptions::default())
        .await
        .unwrap();

    let reopened = MapEngine::open(project.path(), MapConfig::default().with_map_dir(maps.path()))
        .await
        .unwrap();
    let actual = reopened
        .query(QueryKind::DataFlow, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_corrupt_artifact_only_breaks_its_queries() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let engine = engine(project.path(), maps.path());
    let report = engine.generate().await.unwrap();

    let artifact = maps
        .path()
        .join(GENERATIONS_DIR)
        .join(&report.generation)
        .join(ArtifactName::Issues.file_name());
    std::fs::write(&artifact, b"definitely not zstd").unwrap();

    let reopened = MapEngine::open(project.path(), MapConfig::default().with_map_dir(maps.path()))
        .await
        .unwrap();
    match reopened
        .query(QueryKind::Issues, &QueryOptions::default())
        .await
        .unwrap()
    {
        QueryResult::Unavailable {
            artifact,
            suggestion,
            ..
        } => {
            assert_eq!(artifact, "issues");
            assert!(suggestion.contains("refresh"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        reopened
            .query(QueryKind::Summary, &QueryOptions::default())
            .await
            .unwrap(),
        QueryResult::Summary { .. }
    ));
}

#[tokio::test]
async fn test_corrupt_manifest_does_not_block_regeneration() {
    let project = tempdir().unwrap();
    let maps = tempdir().unwrap();
    shop_fixture(project.path());
    let first = engine(project.path(), maps.path());
    let broken = first.generate().await.unwrap();

    std::fs::write(
        maps.path()
            .join(GENERATIONS_DIR)
            .join(&broken.generation)
            .join(MANIFEST_FILE),
        b"{ 1: nope",
    )
    .unwrap();

    let reopened = MapEngine::open(project.path(), MapConfig::default().with_map_dir(maps.path()))
        .await
        .unwrap();
    assert!(reopened.snapshot().await.is_empty());
    assert!(matches!(
        reopened
            .query(QueryKind::Summary, &QueryOptions::default())
            .await,
        Err(MapError::ArtifactMissing { .. })
    ));

    let report = reopened.generate().await.unwrap();
    assert_ne!(report.generation, broken.generation);
    assert!(matches!(
        reopened
            .query(QueryKind::Summary, &QueryOptions::default())
            .await
            .unwrap(),
        QueryResult::Summary { .. }
    ));
    assert_eq!(MapStore::new(maps.path()).generations(), vec![report.generation]);
}
