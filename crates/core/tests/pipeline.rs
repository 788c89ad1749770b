//! Job-level integration tests: real files on disk, in-memory store, full
//! analyze → store → transform → apply flow.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use asyncify_core::{
    run_analysis, run_sync_wrapper_analysis, run_transformation, AnalysisConfig, Error,
    InMemoryGraphStore, JobPhase, JobProgress, MethodId, ProgressCallback,
};
use asyncify_graph::GraphStore;

const DATA_CS: &str = "\
using System;

namespace Billing {
    public class Database {
        public int Query(string sql) {
            return 42;
        }
    }
}
";

const SERVICE_CS: &str = "\
using System;

namespace Billing {
    public class Service {
        private Database _db;

        public int Lookup(string key) {
            return _db.Query(key);
        }

        public void Refresh() {
            var count = _db.Query(\"all\");
            Log(count);
        }

        void Log(int value) { }
    }
}
";

fn write_project(dir: &Path) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    std::fs::write(dir.join("Data.cs"), DATA_CS).unwrap();
    std::fs::write(dir.join("Service.cs"), SERVICE_CS).unwrap();
}

fn config_for(dir: &Path) -> AnalysisConfig {
    let mut config = AnalysisConfig::new(dir);
    config.root_methods = vec!["Database.Query(string)".to_string()];
    config
}

fn not_cancelled() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

fn silent() -> ProgressCallback {
    Arc::new(|_| {})
}

#[tokio::test]
async fn analysis_floods_and_stores_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());

    let outcome = run_analysis(
        config_for(dir.path()),
        store.clone(),
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.stats.flooded, 3); // Query, Lookup, Refresh
    assert_eq!(outcome.stats.roots, 1);
    assert!(outcome.transformations.len() == 3);

    let graph = store.fetch(outcome.graph_id).await.unwrap();
    for id in [
        "Database.Query(string)",
        "Service.Lookup(string)",
        "Service.Refresh()",
    ] {
        assert!(
            graph.node(&MethodId::new(id)).unwrap().requires_async,
            "{id} should be flooded"
        );
    }
    assert!(!graph
        .node(&MethodId::new("Service.Log(int)"))
        .unwrap()
        .requires_async);
}

#[tokio::test]
async fn analysis_reports_progress_phases() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());

    let phases: Arc<Mutex<Vec<JobPhase>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = phases.clone();
    let progress: ProgressCallback = Arc::new(move |p: &JobProgress| {
        sink.lock().unwrap().push(p.phase);
    });

    run_analysis(config_for(dir.path()), store, progress, not_cancelled())
        .await
        .unwrap();

    let seen = phases.lock().unwrap();
    for phase in [
        JobPhase::Discovering,
        JobPhase::Parsing,
        JobPhase::Extracting,
        JobPhase::DetectingWrappers,
        JobPhase::Flooding,
        JobPhase::Storing,
    ] {
        assert!(seen.contains(&phase), "missing phase {phase}");
    }
}

#[tokio::test]
async fn sync_wrapper_analysis_floods_from_detected_wrappers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("Helper.cs"),
        "class AsyncHelper { public static int RunSync(Func<Task<int>> f) { return 0; } }",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("Caller.cs"),
        "class C { int Use() { return AsyncHelper.RunSync(() => Job()); } Task<int> Job() { return null; } }",
    )
    .unwrap();
    let store = Arc::new(InMemoryGraphStore::new());

    let outcome = run_sync_wrapper_analysis(
        AnalysisConfig::new(dir.path()),
        store.clone(),
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.wrappers.len(), 1);
    assert_eq!(
        outcome.wrappers[0].method,
        MethodId::new("AsyncHelper.RunSync(Func<Task<int>>)")
    );

    let graph = store.fetch(outcome.graph_id).await.unwrap();
    // The wrapper's caller floods: it must become async once the wrapper
    // call is unwrapped.
    assert!(graph.node(&MethodId::new("C.Use()")).unwrap().requires_async);
}

#[tokio::test]
async fn transformation_review_mode_leaves_disk_untouched() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());
    let config = config_for(dir.path());

    let analysis = run_analysis(config.clone(), store.clone(), silent(), not_cancelled())
        .await
        .unwrap();
    let outcome = run_transformation(
        config,
        store,
        Some(analysis.graph_id),
        false,
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.rewrites.len(), 2);
    assert!(outcome.failed_files.is_empty());
    // Review mode: the sources on disk are unchanged.
    assert_eq!(std::fs::read_to_string(dir.path().join("Data.cs")).unwrap(), DATA_CS);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Service.cs")).unwrap(),
        SERVICE_CS
    );
    // Every rewrite carries a reviewable diff.
    for rewrite in &outcome.rewrites {
        assert!(rewrite.unified_diff().contains("Task"));
    }
}

#[tokio::test]
async fn transformation_apply_mode_writes_expected_sources() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());
    let config = config_for(dir.path());

    let analysis = run_analysis(config.clone(), store.clone(), silent(), not_cancelled())
        .await
        .unwrap();
    let outcome = run_transformation(
        config.clone(),
        store.clone(),
        Some(analysis.graph_id),
        true,
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();
    assert!(outcome.applied);
    assert!(outcome.failed_files.is_empty());

    let data = std::fs::read_to_string(dir.path().join("Data.cs")).unwrap();
    assert!(data.starts_with("using System.Threading.Tasks;\n"));
    assert!(data.contains("public Task<int> Query(string sql) {"));
    assert!(data.contains("return Task.FromResult<int>(42);"));

    let service = std::fs::read_to_string(dir.path().join("Service.cs")).unwrap();
    assert!(service.contains("public Task<int> Lookup(string key) {"));
    assert!(service.contains("return _db.Query(key);"));
    assert!(service.contains("public async Task Refresh() {"));
    assert!(service.contains("var count = await _db.Query(\"all\");"));
    // The untouched helper keeps its exact shape.
    assert!(service.contains("void Log(int value) { }"));

    // Re-running the whole pipeline over the rewritten sources settles:
    // nothing changes the second time.
    let second_analysis = run_analysis(config.clone(), store.clone(), silent(), not_cancelled())
        .await
        .unwrap();
    let second = run_transformation(
        config,
        store,
        Some(second_analysis.graph_id),
        true,
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();
    assert!(second.rewrites.is_empty());
}

#[tokio::test]
async fn transformation_without_graph_id_uses_latest_project_graph() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());
    let config = config_for(dir.path());

    run_analysis(config.clone(), store.clone(), silent(), not_cancelled())
        .await
        .unwrap();
    let outcome =
        run_transformation(config, store, None, false, silent(), not_cancelled())
            .await
            .unwrap();
    assert_eq!(outcome.rewrites.len(), 2);
}

#[tokio::test]
async fn cancelled_job_reports_cancellation_not_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());

    let cancelled = Arc::new(AtomicBool::new(true));
    let result = run_analysis(config_for(dir.path()), store, silent(), cancelled).await;
    match result {
        Err(err) => assert!(err.is_cancellation(), "unexpected error: {err}"),
        Ok(_) => panic!("cancelled job should not succeed"),
    }
}

#[tokio::test]
async fn misspelled_root_is_surfaced_not_silently_ignored() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());

    let mut config = config_for(dir.path());
    config.root_methods.push("Database.Qurey(string)".to_string());
    let outcome = run_analysis(config, store, silent(), not_cancelled())
        .await
        .unwrap();
    assert_eq!(
        outcome.unknown_roots,
        vec![MethodId::new("Database.Qurey(string)")]
    );
    // The valid root still flooded everything it should.
    assert_eq!(outcome.stats.flooded, 3);
}

#[tokio::test]
async fn empty_project_produces_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryGraphStore::new());

    let outcome = run_analysis(
        AnalysisConfig::new(dir.path()),
        store,
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();
    assert_eq!(outcome.stats.methods, 0);
    assert_eq!(outcome.stats.edges, 0);
    assert!(outcome.transformations.is_empty());
}

#[tokio::test]
async fn unreadable_file_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    // Invalid UTF-8 gets skipped with a warning.
    std::fs::write(dir.path().join("Broken.cs"), [0xff, 0xfe, 0x00]).unwrap();
    let store = Arc::new(InMemoryGraphStore::new());

    let outcome = run_analysis(
        config_for(dir.path()),
        store,
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();
    // The two good files still analyzed.
    assert_eq!(outcome.stats.flooded, 3);
}

#[tokio::test]
async fn file_with_syntax_errors_is_dropped_from_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    std::fs::write(
        dir.path().join("Damaged.cs"),
        "class Damaged { void M( { Database missing brace }",
    )
    .unwrap();
    let store = Arc::new(InMemoryGraphStore::new());

    let outcome = run_analysis(
        config_for(dir.path()),
        store.clone(),
        silent(),
        not_cancelled(),
    )
    .await
    .unwrap();
    // The damaged file contributes no methods; the good files are intact.
    assert_eq!(outcome.stats.flooded, 3);
    let graph = store.fetch(outcome.graph_id).await.unwrap();
    assert!(graph
        .method_ids()
        .iter()
        .all(|id| !id.as_str().starts_with("Damaged.")));
}

#[tokio::test]
async fn graph_round_trips_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let store = Arc::new(InMemoryGraphStore::new());
    let config = config_for(dir.path());

    let outcome = run_analysis(config, store.clone(), silent(), not_cancelled())
        .await
        .unwrap();

    let graph = store.fetch(outcome.graph_id).await.unwrap();
    // After flooding, every edge awaits exactly when its callee is async.
    for edge in graph.edges_snapshot() {
        let callee = graph.node(&edge.callee).unwrap();
        assert_eq!(
            edge.requires_await,
            callee.is_async_declared || callee.requires_async
        );
    }
    // Callers of the root are discoverable through the store contract.
    let callers = store
        .find_callers(
            outcome.graph_id,
            &MethodId::new("Database.Query(string)"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(
        callers,
        vec![
            MethodId::new("Service.Lookup(string)"),
            MethodId::new("Service.Refresh()"),
        ]
    );
}

#[test]
fn error_kinds_render_useful_messages() {
    let err = Error::InvalidInput {
        path: "src/Broken.cs".into(),
        message: "source contains syntax errors".to_string(),
    };
    assert!(err.to_string().contains("src/Broken.cs"));
    assert!(err.to_string().contains("syntax errors"));
}
