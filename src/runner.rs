use crate::config::GraphConfig;
use crate::core::scanner::notify;
use crate::core::{ScanControl, ScanEvent, ScanOutcome, scan_repository};
use crate::utils::analysis::dependencies::extract_relationships;
use crate::utils::analysis::graph::CodeGraph;
use crate::utils::analysis::metrics::annotate;
use crate::utils::analysis::store::GraphStore;
use crate::utils::backends::BackendChain;
use crate::utils::integrations::cache::ParseCache;
use crate::utils::integrations::watch::{ChangeFilter, Debouncer, FileWatcher, WatchEvent};
use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Runs the whole pipeline: scan, extract relationships, annotate, assemble.
///
/// A cancelled or timed-out scan still yields a graph over the files parsed so far.
pub fn build_graph(
    config: &GraphConfig,
    control: &ScanControl,
    tx: &Option<Sender<ScanEvent>>,
) -> Result<CodeGraph> {
    config.validate()?;
    let chain = BackendChain::from_kinds(&config.backends, config.text_limits());
    log::debug!("Parser backends: {:?}", chain.names());

    let cache = config.cache.as_deref().map(ParseCache::load);
    let ScanOutcome { mut nodes, summary } =
        scan_repository(config, &chain, cache.as_ref(), control, tx)?;
    if let (Some(cache), Some(path)) = (&cache, &config.cache)
        && let Err(e) = cache.save(path)
    {
        log::warn!("Parse cache not saved: {:#}", e);
    }

    notify(tx, ScanEvent::Stage("Extracting relationships".to_string()));
    let edges = extract_relationships(&nodes);

    notify(tx, ScanEvent::Stage("Computing metrics".to_string()));
    annotate(&mut nodes, &edges);

    Ok(CodeGraph::assemble(nodes, edges, &summary))
}

fn summary_message(graph: &CodeGraph, config: &GraphConfig) -> String {
    let meta = graph.metadata();
    format!(
        "Graph written to {:?}: {} nodes, {} edges from {} files ({} skipped)",
        config.output, meta.node_count, meta.edge_count, meta.files_processed, meta.files_skipped
    )
}

/// Builds the graph and writes it to `config.output`.
pub fn run_scan(config: GraphConfig, tx: Option<Sender<ScanEvent>>) -> Result<CodeGraph> {
    let control = ScanControl::with_timeout(config.scan_timeout());
    let graph = build_graph(&config, &control, &tx)?;
    graph
        .save(&config.output)
        .with_context(|| format!("Failed to save graph to {:?}", config.output))?;
    notify(&tx, ScanEvent::Complete(summary_message(&graph, &config)));
    Ok(graph)
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Main entry point for `scan` in CLI mode.
///
/// The pipeline runs on a background thread; progress events are consumed here and
/// rendered as a progress bar on stderr.
pub fn run(config: GraphConfig) -> Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let config_clone = config.clone();
    std::thread::spawn(move || {
        if let Err(e) = run_scan(config_clone, Some(tx.clone())) {
            let _ = tx.send(ScanEvent::Error(format!("{:#}", e)));
        }
    });

    let bar = progress_bar(!config.verbose);
    let mut failure = None;
    for event in rx {
        match event {
            ScanEvent::StartScanning => bar.set_message("scanning"),
            ScanEvent::FilesFound(n) => bar.set_length(n as u64),
            ScanEvent::FileProcessed(_) => bar.inc(1),
            ScanEvent::FileSkipped(path, reason) => {
                bar.inc(1);
                log::debug!("Skipped {:?}: {}", path, reason);
            }
            ScanEvent::Cancelled(unvisited) => {
                bar.set_message(format!("stopped early, {} files not visited", unvisited));
            }
            ScanEvent::Stage(stage) => bar.set_message(stage),
            ScanEvent::Complete(msg) => {
                bar.finish_and_clear();
                println!("{}", msg);
            }
            ScanEvent::Error(e) => {
                bar.abandon();
                failure = Some(e);
            }
        }
    }

    match failure {
        Some(e) => anyhow::bail!(e),
        None => Ok(()),
    }
}

/// Rebuilds the graph, writes it and publishes it to `store`.
pub fn rebuild_into(config: &GraphConfig, store: &GraphStore) -> Result<Arc<CodeGraph>> {
    let control = ScanControl::with_timeout(config.scan_timeout());
    let graph = build_graph(config, &control, &None)?;
    graph
        .save(&config.output)
        .with_context(|| format!("Failed to save graph to {:?}", config.output))?;
    log::info!("{}", summary_message(&graph, config));
    store.publish(graph);
    Ok(store.snapshot())
}

/// Watches the root and rebuilds + republishes the graph whenever a candidate file changes.
pub fn watch(config: GraphConfig, store: &GraphStore) -> Result<()> {
    let root = config
        .path
        .canonicalize()
        .with_context(|| format!("Failed to find directory: {:?}", config.path))?;
    let watcher = FileWatcher::new(&root)?;
    let filter = ChangeFilter::new(&config);
    let mut debouncer = Debouncer::new(Duration::from_millis(500));

    rebuild_into(&config, store)?;
    log::info!("Watching {:?} for changes", root);

    loop {
        let Some(first) = watcher.next_event(Duration::from_secs(1)) else {
            debouncer.cleanup();
            continue;
        };

        let mut changed = 0;
        for event in std::iter::once(first).chain(watcher.pending_events()) {
            if let WatchEvent::Error(e) = &event {
                log::warn!("Watch error: {}", e);
                continue;
            }
            if let Some(path) = event.path()
                && filter.is_relevant(path)
                && debouncer.should_process(path)
            {
                log::debug!("Changed: {:?}", path);
                changed += 1;
            }
        }
        if changed == 0 {
            continue;
        }

        log::info!("{} files changed; rebuilding graph", changed);
        if let Err(e) = rebuild_into(&config, store) {
            log::error!("Rebuild failed, keeping previous graph: {:#}", e);
        }
    }
}
