//! The three job entry points: analysis, sync-wrapper analysis, and
//! transformation.
//!
//! CPU-bound pipeline stages run under `spawn_blocking`; the cancellation
//! flag is checked at every file boundary and flooding iteration, and a
//! cancelled job reports [`Error::Cancelled`] rather than failure. File
//! rewrites are only written to disk when the apply flag is set; a write
//! that fails is reported per file and the job finishes with partial
//! success (sources are expected to live under version control).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;

use asyncify_analysis::{
    detect_sync_wrappers, extract_graph, flood, ExtractOptions, SyncWrapperPattern,
    Transformation,
};
use asyncify_graph::{CallGraph, GraphId, GraphStats, GraphStore, MethodId};
use asyncify_rewrite::{rewrite_file, FileRewrite, RewritePlan};
use asyncify_syntax::{parse_source, Compilation, ParseOutcome, ParsedFile};

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::progress::{JobPhase, JobProgress, ProgressCallback};

/// Result of the analysis job.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub graph_id: GraphId,
    pub stats: GraphStats,
    pub transformations: Vec<Transformation>,
    /// Configured roots that do not name a method in the graph. Flooding
    /// skips them; they are surfaced here so a typo does not read as "the
    /// project needs no changes".
    pub unknown_roots: Vec<MethodId>,
}

/// Result of the sync-wrapper analysis job.
#[derive(Debug, Clone, Serialize)]
pub struct SyncWrapperAnalysisOutcome {
    pub graph_id: GraphId,
    pub wrappers: Vec<SyncWrapperPattern>,
    pub stats: GraphStats,
}

/// Result of the transformation job.
#[derive(Debug, Clone, Serialize)]
pub struct TransformationOutcome {
    /// Rewrites for every file that changed.
    pub rewrites: Vec<FileRewrite>,
    /// Files whose rewrite could not be written, with the reason.
    pub failed_files: Vec<(PathBuf, String)>,
    pub stats: GraphStats,
    pub applied: bool,
}

/// Analyze a project: build the call graph, flood from the configured
/// roots, store the graph, and return its id with the flooding decisions.
pub async fn run_analysis(
    config: AnalysisConfig,
    store: Arc<dyn GraphStore>,
    progress: ProgressCallback,
    cancel: Arc<AtomicBool>,
) -> Result<AnalysisOutcome> {
    let (graph, _, transformations) = {
        let config = config.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            analyze_project(&config, RootSource::Configured, &progress, &cancel)
        })
        .await??
    };

    let unknown_roots: Vec<MethodId> = config
        .root_methods
        .iter()
        .map(|s| MethodId::new(s.clone()))
        .filter(|id| !graph.contains(id))
        .collect();
    if !unknown_roots.is_empty() {
        tracing::warn!(count = unknown_roots.len(), "roots not found in the call graph");
    }

    let graph_id = store_graph(&config, &graph, &store, &progress).await?;
    Ok(AnalysisOutcome {
        graph_id,
        stats: graph.stats(),
        transformations,
        unknown_roots,
    })
}

/// Analyze a project using the detected sync wrappers as flooding roots,
/// and return the wrapper list alongside the stored flooded graph.
pub async fn run_sync_wrapper_analysis(
    config: AnalysisConfig,
    store: Arc<dyn GraphStore>,
    progress: ProgressCallback,
    cancel: Arc<AtomicBool>,
) -> Result<SyncWrapperAnalysisOutcome> {
    let (graph, wrappers, _) = {
        let config = config.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            analyze_project(&config, RootSource::SyncWrappers, &progress, &cancel)
        })
        .await??
    };

    let graph_id = store_graph(&config, &graph, &store, &progress).await?;
    Ok(SyncWrapperAnalysisOutcome {
        graph_id,
        wrappers,
        stats: graph.stats(),
    })
}

/// Rewrite a project against a previously stored graph. Writes to disk
/// only when `apply` is true; otherwise the rewrites (with diffs available
/// via [`FileRewrite::unified_diff`]) are returned for review.
pub async fn run_transformation(
    config: AnalysisConfig,
    store: Arc<dyn GraphStore>,
    graph_id: Option<GraphId>,
    apply: bool,
    progress: ProgressCallback,
    cancel: Arc<AtomicBool>,
) -> Result<TransformationOutcome> {
    let graph = match graph_id {
        Some(id) => store.fetch(id).await?,
        None => store.fetch_by_project(&config.project_name()).await?,
    };

    tokio::task::spawn_blocking(move || {
        transform_project(&config, &graph, apply, &progress, &cancel)
    })
    .await?
}

/// Where flooding roots come from.
enum RootSource {
    /// `root_methods` from the configuration.
    Configured,
    /// The sync wrappers the detector found.
    SyncWrappers,
}

type AnalyzedProject = (CallGraph, Vec<SyncWrapperPattern>, Vec<Transformation>);

fn analyze_project(
    config: &AnalysisConfig,
    root_source: RootSource,
    progress: &ProgressCallback,
    cancel: &AtomicBool,
) -> Result<AnalyzedProject> {
    let compilation = load_compilation(config, progress, cancel)?;

    let options = ExtractOptions {
        external_sync_wrappers: config
            .external_sync_wrappers
            .iter()
            .map(|s| MethodId::new(s.clone()))
            .collect(),
        capture_source: config.capture_source,
    };
    let total = compilation.files().len();
    let extract_progress = {
        let progress = progress.clone();
        move |path: &std::path::Path, done: usize, _total: usize| {
            let mut p = JobProgress::phase(JobPhase::Extracting);
            p.current_file = Some(path.to_path_buf());
            p.processed_count = done;
            p.total_count = total;
            progress(&p);
        }
    };
    let mut graph = extract_graph(&compilation, &options, cancel, &extract_progress)?;

    let wrappers = detect_sync_wrappers(&compilation, &graph);
    {
        let mut p = JobProgress::phase(JobPhase::DetectingWrappers);
        p.method_count = graph.method_count();
        p.sync_wrapper_count = wrappers.len();
        progress(&p);
    }

    graph.interface_mappings = config.interface_mappings.clone();

    let roots: Vec<MethodId> = match root_source {
        RootSource::Configured => config
            .root_methods
            .iter()
            .map(|s| MethodId::new(s.clone()))
            .collect(),
        // Detected wrappers plus any externally declared ones the
        // extraction pass flagged.
        RootSource::SyncWrappers => graph.sync_wrapper_methods().into_iter().collect(),
    };

    let method_count = graph.method_count();
    let sync_wrapper_count = wrappers.len();
    let flood_progress = {
        let progress = progress.clone();
        move |processed: usize, flooded: usize| {
            let mut p = JobProgress::phase(JobPhase::Flooding);
            p.method_count = method_count;
            p.methods_processed = processed;
            p.flooded_count = flooded;
            p.sync_wrapper_count = sync_wrapper_count;
            progress(&p);
        }
    };
    let transformations = flood(&mut graph, &roots, cancel, flood_progress)?;

    Ok((graph, wrappers, transformations))
}

fn transform_project(
    config: &AnalysisConfig,
    graph: &CallGraph,
    apply: bool,
    progress: &ProgressCallback,
    cancel: &AtomicBool,
) -> Result<TransformationOutcome> {
    let compilation = load_compilation(config, progress, cancel)?;
    let plan = RewritePlan::from_graph(graph);

    let total = compilation.files().len();
    let processed = AtomicUsize::new(0);
    let rewrites: Vec<FileRewrite> = compilation
        .files()
        .par_iter()
        .map(|file| -> Result<FileRewrite> {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let rewrite = rewrite_file(&compilation, file, &plan);
            let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
            let mut p = JobProgress::phase(JobPhase::Rewriting);
            p.current_file = Some(file.path.clone());
            p.processed_count = done;
            p.total_count = total;
            p.flooded_count = graph.flooded_methods.len();
            progress(&p);
            Ok(rewrite)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut changed: Vec<FileRewrite> = rewrites.into_iter().filter(|r| r.changed).collect();
    changed.sort_by(|a, b| a.path.cmp(&b.path));

    let mut failed_files = Vec::new();
    if apply {
        for (i, rewrite) in changed.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let mut p = JobProgress::phase(JobPhase::Writing);
            p.current_file = Some(rewrite.path.clone());
            p.processed_count = i + 1;
            p.total_count = changed.len();
            progress(&p);
            if let Err(source) = std::fs::write(&rewrite.path, &rewrite.new_text) {
                tracing::warn!(path = %rewrite.path.display(), error = %source, "failed to write rewrite");
                failed_files.push((rewrite.path.clone(), source.to_string()));
            }
        }
    }

    Ok(TransformationOutcome {
        rewrites: changed,
        failed_files,
        stats: graph.stats(),
        applied: apply,
    })
}

/// Discover and parse every C# source file of the project. A file that
/// cannot be read or whose parse tree contains syntax errors is skipped
/// and surfaced as an [`Error::InvalidInput`] warning; a project that
/// yields no analyzable sources at all is surfaced as
/// [`Error::CompilationFailure`] and produces an empty compilation (and,
/// downstream, an empty graph).
fn load_compilation(
    config: &AnalysisConfig,
    progress: &ProgressCallback,
    cancel: &AtomicBool,
) -> Result<Compilation> {
    let sources = discover_sources(config)?;
    {
        let mut p = JobProgress::phase(JobPhase::Discovering);
        p.total_count = sources.len();
        progress(&p);
    }

    let total = sources.len();
    let parsed_count = AtomicUsize::new(0);
    let files: Vec<Option<ParsedFile>> = sources
        .par_iter()
        .map(|path| -> Result<Option<ParsedFile>> {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let done = parsed_count.fetch_add(1, Ordering::Relaxed) + 1;
            let mut p = JobProgress::phase(JobPhase::Parsing);
            p.current_file = Some(path.clone());
            p.processed_count = done;
            p.total_count = total;
            progress(&p);

            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(source) => {
                    let warning = Error::InvalidInput {
                        path: path.clone(),
                        message: source.to_string(),
                    };
                    tracing::warn!(%warning, "skipping unreadable file");
                    return Ok(None);
                }
            };
            match parse_source(path.clone(), text) {
                Ok(file) if file.outcome == ParseOutcome::Partial => {
                    let warning = Error::InvalidInput {
                        path: path.clone(),
                        message: "source contains syntax errors".to_string(),
                    };
                    tracing::warn!(%warning, "skipping file");
                    Ok(None)
                }
                Ok(file) => Ok(Some(file)),
                Err(source) => {
                    let warning = Error::InvalidInput {
                        path: path.clone(),
                        message: source.to_string(),
                    };
                    tracing::warn!(%warning, "skipping unparseable file");
                    Ok(None)
                }
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let files: Vec<ParsedFile> = files.into_iter().flatten().collect();
    if files.is_empty() {
        let warning = Error::CompilationFailure(config.project_path.display().to_string());
        tracing::warn!(%warning, "continuing with an empty graph");
    }
    Ok(Compilation::new(files))
}

fn discover_sources(config: &AnalysisConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(&config.project_path);
    builder.hidden(false).follow_links(false).require_git(false);
    if !config.respect_gitignore {
        builder
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false);
    }
    if !config.exclude.is_empty() {
        let mut overrides = OverrideBuilder::new(&config.project_path);
        for pattern in &config.exclude {
            overrides
                .add(&format!("!{pattern}"))
                .map_err(|e| Error::Config(e.to_string()))?;
        }
        builder.overrides(overrides.build().map_err(|e| Error::Config(e.to_string()))?);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if entry.file_type().is_some_and(|ft| ft.is_file())
            && path.extension().is_some_and(|ext| ext == "cs")
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

async fn store_graph(
    config: &AnalysisConfig,
    graph: &CallGraph,
    store: &Arc<dyn GraphStore>,
    progress: &ProgressCallback,
) -> Result<GraphId> {
    let method_count = graph.method_count();
    let callback = progress.clone();
    let store_progress = move |_phase: &str, done: usize, total: usize| {
        let mut p = JobProgress::phase(JobPhase::Storing);
        p.processed_count = done;
        p.total_count = total;
        p.method_count = method_count;
        callback(&p);
    };
    Ok(store
        .store(&config.project_name(), graph, &store_progress)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_sources_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.cs"), "class B { }").unwrap();
        std::fs::write(dir.path().join("a.cs"), "class A { }").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not source").unwrap();
        let config = AnalysisConfig::new(dir.path());
        let files = discover_sources(&config).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.cs", "b.cs"]);
    }

    #[test]
    fn test_discover_sources_respects_excludes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("obj")).unwrap();
        std::fs::write(dir.path().join("keep.cs"), "class K { }").unwrap();
        std::fs::write(dir.path().join("obj/gen.cs"), "class G { }").unwrap();
        let mut config = AnalysisConfig::new(dir.path());
        config.exclude = vec!["obj/**".to_string()];
        let files = discover_sources(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.cs"));
    }
}
