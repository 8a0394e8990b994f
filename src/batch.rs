//! Batch classification of graph6 corpora.
//!
//! A corpus is a directory of files named `order{n}_chi{k}.txt`, one graph6
//! string per line. Each graph is checked end-to-end by one rayon worker;
//! outcomes flow over a channel to a single collector. A line that fails to
//! decode or a check that times out is recorded in the report and never stops
//! the run.

use crate::config::CriticalityMode;
use crate::critical::{ChromaticHint, CriticalityEngine, Verdict};
use crate::error::{BatchError, CriticalityError, GraphError};
use crate::forbidden::{is_h_free, Pattern};
use crate::graph::Graph;
use crate::graph6::{parse_graph6, to_graph6};
use crossbeam::channel::unbounded;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ============================================================================
// Corpus files
// ============================================================================

/// A corpus file and the order and chromatic number encoded in its name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CorpusFile {
    /// Number of vertices of every graph in the file.
    pub order: usize,
    /// Chromatic number of every graph in the file.
    pub chi: usize,
    /// Location on disk.
    pub path: PathBuf,
}

impl CorpusFile {
    /// Reads the file's graphs, tagging each with this file's chromatic number.
    ///
    /// # Errors
    /// Returns [`BatchError::Io`] if the file cannot be read.
    pub fn read_items(&self) -> Result<Vec<BatchItem>, BatchError> {
        let mut items = read_graph6_lines(&self.path)?;
        for item in &mut items {
            item.chi = Some(self.chi);
        }
        Ok(items)
    }
}

/// Standard corpus file name for graphs of order `n` and chromatic number `k`.
pub fn corpus_file_name(order: usize, chi: usize) -> String {
    format!("order{order}_chi{chi}.txt")
}

/// Parses `order{n}_chi{k}.txt` into `(n, k)`.
///
/// # Errors
/// Returns [`BatchError::BadFileName`] for any other name.
pub fn parse_corpus_name(name: &str) -> Result<(usize, usize), BatchError> {
    let bad = || BatchError::BadFileName { name: name.to_owned() };
    let stem = name.strip_suffix(".txt").ok_or_else(bad)?;
    let rest = stem.strip_prefix("order").ok_or_else(bad)?;
    let (order, chi) = rest.split_once("_chi").ok_or_else(bad)?;
    let order = order.parse().map_err(|_| bad())?;
    let chi = chi.parse().map_err(|_| bad())?;
    Ok((order, chi))
}

/// Lists the corpus files in `dir`, sorted by order then chromatic number.
///
/// Entries whose names do not match `order{n}_chi{k}.txt` are skipped.
///
/// # Errors
/// Returns [`BatchError::Io`] if the directory cannot be listed.
pub fn scan_corpus(dir: impl AsRef<Path>) -> Result<Vec<CorpusFile>, BatchError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| BatchError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BatchError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        match parse_corpus_name(&name) {
            Ok((order, chi)) => files.push(CorpusFile { order, chi, path }),
            Err(e) => debug!(file = %path.display(), "skipping: {e}"),
        }
    }
    files.sort();
    debug!(dir = %dir.display(), files = files.len(), "scanned corpus");
    Ok(files)
}

// ============================================================================
// Items
// ============================================================================

/// One graph awaiting classification.
#[derive(Clone, Debug)]
pub struct BatchItem {
    /// Where the graph came from, as `file:line`.
    pub origin: String,
    /// The graph6 text as read.
    pub encoding: String,
    /// Chromatic number supplied with the graph, if any.
    pub chi: Option<usize>,
    /// The decoded graph, or why decoding failed.
    pub graph: Result<Graph, GraphError>,
}

impl BatchItem {
    /// Decodes `encoding`; a decoding failure is kept in the item.
    pub fn from_graph6(origin: impl Into<String>, encoding: &str, chi: Option<usize>) -> Self {
        Self {
            origin: origin.into(),
            encoding: encoding.to_owned(),
            chi,
            graph: parse_graph6(encoding),
        }
    }

    /// Wraps an already-built graph.
    pub fn from_graph(origin: impl Into<String>, graph: Graph, chi: Option<usize>) -> Self {
        Self {
            origin: origin.into(),
            encoding: to_graph6(&graph),
            chi,
            graph: Ok(graph),
        }
    }
}

/// Reads one item per non-empty line of `path`, using the line's first whitespace token.
///
/// # Errors
/// Returns [`BatchError::Io`] if the file cannot be read. Undecodable lines are
/// returned as items carrying the decoding error.
pub fn read_graph6_lines(path: impl AsRef<Path>) -> Result<Vec<BatchItem>, BatchError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|e| BatchError::io(path, e))?;

    let mut items = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| BatchError::io(path, e))?;
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let item = BatchItem::from_graph6(format!("{}:{}", path.display(), idx + 1), token, None);
        if let Err(e) = &item.graph {
            warn!(origin = %item.origin, "undecodable graph6 line: {e}");
        }
        items.push(item);
    }
    debug!(file = %path.display(), graphs = items.len(), "read graph6 file");
    Ok(items)
}

// ============================================================================
// Report
// ============================================================================

/// A graph that was checked successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classified {
    /// Where the graph came from.
    pub origin: String,
    /// Its graph6 encoding.
    pub encoding: String,
    /// Number of vertices.
    pub order: usize,
    /// The verdict.
    pub verdict: Verdict,
}

/// A graph that could not be checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// Where the graph came from.
    pub origin: String,
    /// Its graph6 text as read.
    pub encoding: String,
    /// Why it failed.
    pub error: CriticalityError,
}

/// Results of one batch run, each list in input order.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    /// Graphs found critical.
    pub critical: Vec<Classified>,
    /// Graphs found not critical.
    pub not_critical: Vec<Classified>,
    /// Graphs that failed to decode or timed out.
    pub failed: Vec<Failure>,
    /// Graphs dropped before classification by the H-free filter.
    pub filtered: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of graphs classified or failed; filtered graphs are not counted.
    pub fn total(&self) -> usize {
        self.critical.len() + self.not_critical.len() + self.failed.len()
    }
}

type Outcome = Result<Classified, Failure>;

fn classify_item(engine: &CriticalityEngine, mode: CriticalityMode, item: BatchItem) -> Outcome {
    let BatchItem {
        origin,
        encoding,
        chi,
        graph,
    } = item;

    let result = graph.map_err(CriticalityError::from).and_then(|graph| {
        let verdict = match chi {
            Some(k) if engine.config().trust_corpus_chi => {
                engine.check(&graph, ChromaticHint::Known(k), mode)?
            }
            Some(k) => engine.check_against(&graph, k, mode)?,
            None => engine.check(&graph, ChromaticHint::Compute, mode)?,
        };
        Ok((graph.order(), verdict))
    });

    match result {
        Ok((order, verdict)) => Ok(Classified {
            origin,
            encoding,
            order,
            verdict,
        }),
        Err(error) => {
            warn!(%origin, "graph not classified: {error}");
            Err(Failure {
                origin,
                encoding,
                error,
            })
        }
    }
}

/// Keeps the items whose graph contains none of `patterns` as an induced subgraph.
///
/// Items that failed to decode are kept so the failure reaches the report.
/// Returns the survivors in input order and the number dropped.
pub fn retain_h_free(items: Vec<BatchItem>, patterns: &[Pattern]) -> (Vec<BatchItem>, usize) {
    if patterns.is_empty() {
        return (items, 0);
    }
    let before = items.len();
    let kept: Vec<BatchItem> = items
        .into_par_iter()
        .filter(|item| item.graph.as_ref().map_or(true, |g| is_h_free(g, patterns)))
        .collect();
    let dropped = before - kept.len();
    debug!(kept = kept.len(), dropped, "H-free filter applied");
    (kept, dropped)
}

/// Classifies `items` in parallel.
///
/// Each worker owns one graph's whole check and sends its outcome to a single
/// collector thread over an MPSC channel.
pub fn run_batch(items: Vec<BatchItem>, engine: &CriticalityEngine, mode: CriticalityMode) -> BatchReport {
    let started = Instant::now();
    let total = items.len();
    let (tx, rx) = unbounded::<(usize, Outcome)>();

    let mut outcomes = std::thread::scope(|s| {
        let collector = s.spawn(move || rx.into_iter().collect::<Vec<_>>());
        items
            .into_par_iter()
            .enumerate()
            .for_each_with(tx, |tx, (idx, item)| {
                let outcome = classify_item(engine, mode, item);
                if tx.send((idx, outcome)).is_err() {
                    warn!(idx, "collector gone, outcome dropped");
                }
            });
        collector
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    });
    outcomes.sort_unstable_by_key(|(idx, _)| *idx);

    let mut report = BatchReport::default();
    for (_, outcome) in outcomes {
        match outcome {
            Ok(c) if c.verdict.is_critical() => report.critical.push(c),
            Ok(c) => report.not_critical.push(c),
            Err(f) => report.failed.push(f),
        }
    }
    report.elapsed = started.elapsed();

    info!(
        total,
        %mode,
        critical = report.critical.len(),
        not_critical = report.not_critical.len(),
        failed = report.failed.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch finished"
    );
    report
}

// ============================================================================
// Output
// ============================================================================

fn write_lines<'a>(path: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<(), BatchError> {
    let file = fs::File::create(path).map_err(|e| BatchError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for line in lines {
        writeln!(w, "{line}").map_err(|e| BatchError::io(path, e))?;
    }
    w.flush().map_err(|e| BatchError::io(path, e))
}

fn write_group(dir: &Path, graphs: &[Classified]) -> Result<(), BatchError> {
    fs::create_dir_all(dir).map_err(|e| BatchError::io(dir, e))?;
    let mut groups: BTreeMap<(usize, usize), Vec<&str>> = BTreeMap::new();
    for c in graphs {
        groups
            .entry((c.order, c.verdict.k()))
            .or_default()
            .push(c.encoding.as_str());
    }
    for ((order, chi), lines) in groups {
        write_lines(&dir.join(corpus_file_name(order, chi)), lines)?;
    }
    Ok(())
}

/// Writes `critical/` and `not_critical/` corpus files plus `errors.txt` under `out_dir`.
///
/// Output files use the same `order{n}_chi{k}.txt` naming, so the output is a corpus itself.
///
/// # Errors
/// Returns [`BatchError::Io`] on any filesystem failure.
pub fn write_report(report: &BatchReport, out_dir: impl AsRef<Path>) -> Result<(), BatchError> {
    let out_dir = out_dir.as_ref();
    write_group(&out_dir.join("critical"), &report.critical)?;
    write_group(&out_dir.join("not_critical"), &report.not_critical)?;

    let errors: Vec<String> = report
        .failed
        .iter()
        .map(|f| format!("{}\t{}\t{}", f.origin, f.encoding, f.error))
        .collect();
    write_lines(&out_dir.join("errors.txt"), errors.iter().map(String::as_str))?;
    debug!(dir = %out_dir.display(), "report written");
    Ok(())
}

/// Scans `input_dir`, classifies every graph free of `forbidden` and writes the
/// report to `output_dir`.
///
/// # Errors
/// Returns [`BatchError`] for file-level failures only.
pub fn run_corpus(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    engine: &CriticalityEngine,
    mode: CriticalityMode,
    forbidden: &[Pattern],
) -> Result<BatchReport, BatchError> {
    let files = scan_corpus(input_dir)?;
    let mut items = Vec::new();
    for file in &files {
        items.extend(file.read_items()?);
    }
    let (items, filtered) = retain_h_free(items, forbidden);
    info!(
        files = files.len(),
        graphs = items.len(),
        filtered,
        "classifying corpus"
    );

    let mut report = run_batch(items, engine, mode);
    report.filtered = filtered;
    write_report(&report, output_dir)?;
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::construction;
    use crate::critical::Rejection;

    #[test]
    fn corpus_names() {
        assert_eq!(parse_corpus_name("order11_chi4.txt").unwrap(), (11, 4));
        assert_eq!(corpus_file_name(11, 4), "order11_chi4.txt");
        for bad in ["order11_chi4.g6", "graphs.txt", "orderX_chi4.txt", "order5chi3.txt", "order5_chi.txt"] {
            assert!(
                matches!(parse_corpus_name(bad), Err(BatchError::BadFileName { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn scan_skips_foreign_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["order7_chi4.txt", "order5_chi3.txt", "notes.md", "order5_chi2.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("order9_chi9.txt")).unwrap();
        let files = scan_corpus(dir.path()).unwrap();
        let keys: Vec<(usize, usize)> = files.iter().map(|f| (f.order, f.chi)).collect();
        assert_eq!(keys, vec![(5, 2), (5, 3), (7, 4)]);
    }

    #[test]
    fn scan_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            scan_corpus(dir.path().join("absent")),
            Err(BatchError::Io { .. })
        ));
    }

    #[test]
    fn bad_lines_become_item_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order5_chi3.txt");
        fs::write(&path, "Dhc extra tokens\n\n  \nnot-graph6!\nC~\n").unwrap();
        let items = read_graph6_lines(&path).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].encoding, "Dhc");
        assert!(items[0].graph.is_ok());
        assert!(items[1].graph.is_err());
        assert!(items[1].origin.ends_with(":4"));
        assert!(items[2].graph.is_ok());
    }

    #[test]
    fn batch_sorts_outcomes_and_keeps_going() {
        let items = vec![
            BatchItem::from_graph("a", construction::cycle(5).unwrap(), None),
            BatchItem::from_graph6("b", "!!", None),
            BatchItem::from_graph("c", construction::cycle(6).unwrap(), None),
            BatchItem::from_graph("d", construction::complete(4).unwrap(), Some(4)),
            BatchItem::from_graph("e", construction::wheel(6).unwrap(), None),
        ];
        let report = run_batch(items, &CriticalityEngine::default(), CriticalityMode::Vertex);
        assert_eq!(report.total(), 5);
        let origins: Vec<&str> = report.critical.iter().map(|c| c.origin.as_str()).collect();
        assert_eq!(origins, vec!["a", "d", "e"]);
        assert_eq!(report.not_critical.len(), 1);
        assert_eq!(report.not_critical[0].origin, "c");
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].error, CriticalityError::Graph(_)));
    }

    #[test]
    fn mislabelled_corpus_chi_is_not_critical() {
        // Default engine: chi is taken from the file name but still checked.
        let items = vec![
            BatchItem::from_graph6("order5_chi4.txt:1", "Dhc", Some(4)),
            BatchItem::from_graph6("order3_chi2.txt:1", "B?", Some(2)),
            BatchItem::from_graph6("order5_chi3.txt:1", "Dhc", Some(3)),
        ];
        let report = run_batch(items, &CriticalityEngine::default(), CriticalityMode::Vertex);
        let critical: Vec<&str> = report.critical.iter().map(|c| c.origin.as_str()).collect();
        assert_eq!(critical, vec!["order5_chi3.txt:1"]);
        assert_eq!(report.not_critical.len(), 2);
        assert!(report
            .not_critical
            .iter()
            .all(|c| matches!(c.verdict.reason(), Some(Rejection::ChromaticMismatch { .. }))));
    }

    #[test]
    fn h_free_filter_drops_matching_graphs() {
        let items = vec![
            BatchItem::from_graph("C5", construction::cycle(5).unwrap(), None),
            BatchItem::from_graph("C6", construction::cycle(6).unwrap(), None),
            BatchItem::from_graph("K4", construction::complete(4).unwrap(), None),
            BatchItem::from_graph6("bad", "broken", None),
        ];
        let patterns = [Pattern::path(5).unwrap(), Pattern::two_p2()];
        let (kept, dropped) = retain_h_free(items, &patterns);
        let origins: Vec<&str> = kept.iter().map(|i| i.origin.as_str()).collect();
        assert_eq!(origins, vec!["C5", "K4", "bad"]);
        assert_eq!(dropped, 1);

        let items = vec![BatchItem::from_graph("C6", construction::cycle(6).unwrap(), None)];
        assert_eq!(retain_h_free(items, &[]).0.len(), 1);
    }

    #[test]
    fn untrusted_corpus_chi_is_verified() {
        let engine = CriticalityEngine::new(EngineConfig {
            trust_corpus_chi: false,
            ..EngineConfig::default()
        })
        .unwrap();
        // C5 filed under chi = 4 is rejected once chi is recomputed.
        let items = vec![BatchItem::from_graph("x", construction::cycle(5).unwrap(), Some(4))];
        let report = run_batch(items, &engine, CriticalityMode::Vertex);
        assert_eq!(report.not_critical.len(), 1);
        assert_eq!(report.not_critical[0].verdict.k(), 4);
    }

    #[test]
    fn corpus_roundtrip_through_disk() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let grotzsch = construction::mycielskian(&construction::cycle(5).unwrap()).unwrap();
        fs::write(input.path().join("order5_chi3.txt"), "Dhc\n").unwrap();
        // C5 with a pendant vertex, and a triangle plus three isolated vertices.
        fs::write(input.path().join("order6_chi3.txt"), "Ehe?\nEw??\n").unwrap();
        fs::write(
            input.path().join("order11_chi4.txt"),
            format!("{grotzsch}\nbroken\n"),
        )
        .unwrap();

        let report = run_corpus(
            input.path(),
            output.path(),
            &CriticalityEngine::default(),
            CriticalityMode::Vertex,
            &[],
        )
        .unwrap();
        assert_eq!(report.total(), 5);
        assert_eq!(report.filtered, 0);
        assert_eq!(report.critical.len(), 2);
        assert_eq!(report.failed.len(), 1);

        let critical = fs::read_to_string(output.path().join("critical/order11_chi4.txt")).unwrap();
        assert_eq!(critical.trim(), to_graph6(&grotzsch));
        assert!(output.path().join("critical/order5_chi3.txt").is_file());
        let not_critical = fs::read_to_string(output.path().join("not_critical/order6_chi3.txt")).unwrap();
        assert_eq!(not_critical.lines().count(), 2);
        let errors = fs::read_to_string(output.path().join("errors.txt")).unwrap();
        assert!(errors.contains("broken"));
    }

    #[test]
    fn corpus_filter_skips_non_free_graphs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        // C5 and the chorded C5 (both P5-free), then C7 (contains P5).
        fs::write(input.path().join("order5_chi3.txt"), "Dhc\nDxc\n").unwrap();
        fs::write(input.path().join("order7_chi3.txt"), "FhCKG\n").unwrap();

        let patterns: Vec<Pattern> = vec!["P5".parse().unwrap()];
        let report = run_corpus(
            input.path(),
            output.path(),
            &CriticalityEngine::default(),
            CriticalityMode::Vertex,
            &patterns,
        )
        .unwrap();
        assert_eq!(report.filtered, 1);
        assert_eq!(report.total(), 2);
        assert_eq!(report.critical.len(), 1);
        assert!(!output.path().join("critical/order7_chi3.txt").exists());
        let critical = fs::read_to_string(output.path().join("critical/order5_chi3.txt")).unwrap();
        assert_eq!(critical.trim(), "Dhc");
    }
}
