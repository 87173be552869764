// src/analyzer.rs

use crate::attribution::{attribute_file, FileAttribution};
use crate::error::Result;
use crate::hunks::DiffParser;
use crate::model::*;
use crate::symbols::{count_lines, SymbolIndex};
use crate::tagger::SymbolExtractor;
use crate::vcs::History;
use indicatif::ProgressBar;
use rayon::prelude::*;
use regex::Regex;

/// What to analyse in each commit
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub diff_parser: DiffParser,
    /// Only paths matching at their start are looked at
    pub path_filter: Option<Regex>,
    /// Extensions (".c") whose files are attributed; empty means all
    pub extensions: Vec<String>,
}

impl AnalysisConfig {
    pub fn includes_path(&self, path: &str) -> bool {
        self.path_filter
            .as_ref()
            .map_or(true, |re| re.find(path).is_some_and(|m| m.start() == 0))
    }

    pub fn attributes(&self, path: &str) -> bool {
        self.extensions.is_empty() || self.extensions.contains(&file_extension(path))
    }
}

/// How a commit range is walked
#[derive(Debug, Clone, Default)]
pub struct RangeOptions {
    /// Leave out root commits
    pub skip_initial: bool,
    /// Only the first N commits of the range
    pub limit: Option<usize>,
    /// Keep every `CommitSummary`; otherwise only statistics survive
    pub keep_summaries: bool,
    pub show_progress: bool,
}

/// Everything learned from one commit range
#[derive(Debug, Default)]
pub struct RangeReport {
    pub statistics: RepositoryStatistics,
    pub summaries: Vec<CommitSummary>,
    pub failures: Vec<CommitFailure>,
    pub warnings: Vec<AnalysisWarning>,
    pub skipped_initial: usize,
}

impl RangeReport {
    /// Commits that failed outright or had files left unattributed
    pub fn incomplete_commits(&self) -> usize {
        let mut with_warnings: Vec<&str> = self.warnings.iter().map(|w| w.commit_id.as_str()).collect();
        with_warnings.dedup();
        self.failures.len() + with_warnings.len()
    }
}

/// One side of a file that still needs symbols
enum Side {
    NotNeeded,
    Content(Vec<u8>),
    Unavailable(String),
}

struct FileJob {
    edits: FileEdits,
    old: Side,
    new: Side,
}

pub fn short_id(commit_id: &str) -> &str {
    &commit_id[..commit_id.len().min(10)]
}

/// Attribute every changed line of `commit_id` against its first parent.
///
/// Files whose symbols cannot be obtained are left unattributed and reported
/// as warnings. Errors are returned only when the commit itself cannot be
/// read or its diff cannot be parsed.
pub fn analyze_commit<H, E>(
    history: &H,
    extractor: &E,
    commit_id: &str,
    config: &AnalysisConfig,
) -> Result<CommitSummary>
where
    H: History + ?Sized,
    E: SymbolExtractor + ?Sized,
{
    let parent_id = history.parent_of(commit_id)?;
    let timestamp = history.commit_time(commit_id)?;
    let diff = history.diff(commit_id, parent_id.as_deref())?;
    let files = config.diff_parser.parse(&diff)?;

    let mut summary = CommitSummary {
        commit_id: commit_id.to_string(),
        parent_id,
        timestamp,
        ..Default::default()
    };
    if summary.is_root() {
        log::info!("{} is a root commit, diffing against the empty tree", short_id(commit_id));
    }

    // Blob lookups stay on this thread; tagging and attribution run in parallel
    let mut jobs = Vec::new();
    for (path, edits) in files {
        if !config.includes_path(&path) {
            continue;
        }
        summary.touched_files.push(path.clone());
        if !config.attributes(&path) || edits.is_empty() {
            continue;
        }

        let old = if edits.removed.is_empty() {
            Side::NotNeeded
        } else {
            match summary.parent_id.as_deref() {
                Some(parent) => fetch(history, parent, edits.pre_image_path()),
                None => Side::Unavailable("removed lines in a commit without parent".to_string()),
            }
        };
        let new = if edits.added.is_empty() {
            Side::NotNeeded
        } else {
            fetch(history, commit_id, &edits.path)
        };
        jobs.push(FileJob { edits, old, new });
    }

    let results: Vec<(FileAttribution, Option<String>)> = jobs
        .into_par_iter()
        .map(|job| attribute_job(extractor, job))
        .collect();

    for (attribution, warning) in results {
        if let Some(message) = warning {
            log::warn!("{} {}: {}", short_id(commit_id), attribution.path, message);
            summary.warnings.push(AnalysisWarning {
                commit_id: commit_id.to_string(),
                file_path: attribution.path.clone(),
                message,
            });
        }
        summary.unattributed_edits += attribution.unattributed;
        for change in attribution.into_function_changes(commit_id) {
            let key = (change.file_path.clone(), change.function_name.clone());
            summary.function_changes.insert(key, change);
        }
    }

    Ok(summary)
}

fn fetch<H: History + ?Sized>(history: &H, commit_id: &str, path: &str) -> Side {
    match history.file_content(commit_id, path) {
        Ok(Some(content)) => Side::Content(content),
        Ok(None) => Side::Unavailable(format!("{} does not exist in {}", path, short_id(commit_id))),
        Err(e) => Side::Unavailable(e.to_string()),
    }
}

fn attribute_job<E: SymbolExtractor + ?Sized>(extractor: &E, job: FileJob) -> (FileAttribution, Option<String>) {
    let indexes = build_index(extractor, job.edits.pre_image_path(), &job.old)
        .and_then(|old| Ok((old, build_index(extractor, &job.edits.path, &job.new)?)));
    match indexes {
        Ok((old, new)) => {
            let attribution = attribute_file(&job.edits, &old, &new);
            log::debug!(
                "{}: {} of {} edits attributed ({} functions before, {} after)",
                attribution.path,
                attribution.attributed(),
                job.edits.edit_count(),
                old.intervals().len(),
                new.intervals().len()
            );
            (attribution, None)
        }
        Err(message) => (FileAttribution::unattributed(&job.edits), Some(message)),
    }
}

fn build_index<E: SymbolExtractor + ?Sized>(
    extractor: &E,
    path: &str,
    side: &Side,
) -> std::result::Result<SymbolIndex, String> {
    match side {
        Side::NotNeeded => Ok(SymbolIndex::empty(None)),
        Side::Unavailable(message) => Err(message.clone()),
        Side::Content(content) => {
            let symbols = extractor
                .extract_symbols(path, content)
                .map_err(|e| e.to_string())?;
            Ok(SymbolIndex::build(&symbols, Some(count_lines(content))))
        }
    }
}

/// Analyse `commits` in the given order and accumulate statistics.
///
/// A commit that cannot be analysed is recorded in `failures` and the walk
/// goes on.
pub fn analyze_range<H, E>(
    history: &H,
    extractor: &E,
    commits: &[CommitId],
    config: &AnalysisConfig,
    options: &RangeOptions,
) -> RangeReport
where
    H: History + ?Sized,
    E: SymbolExtractor + ?Sized,
{
    let commits = match options.limit {
        Some(n) => &commits[..n.min(commits.len())],
        None => commits,
    };

    let bar = if options.show_progress {
        ProgressBar::new(commits.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_message("Analyzing commits");

    let mut report = RangeReport::default();
    for commit_id in commits {
        if options.skip_initial {
            match history.parent_of(commit_id) {
                Ok(None) => {
                    log::info!("Skipping initial commit {}", short_id(commit_id));
                    report.skipped_initial += 1;
                    bar.inc(1);
                    continue;
                }
                Ok(Some(_)) => {}
                Err(error) => {
                    record_failure(&mut report, commit_id, error);
                    bar.inc(1);
                    continue;
                }
            }
        }

        match analyze_commit(history, extractor, commit_id, config) {
            Ok(summary) => {
                log::info!(
                    "{}: {} functions, {} unattributed lines",
                    short_id(commit_id),
                    summary.functions_touched(),
                    summary.unattributed_edits
                );
                report.statistics.record(&summary);
                report.warnings.extend(summary.warnings.iter().cloned());
                if options.keep_summaries {
                    report.summaries.push(summary);
                }
            }
            Err(error) => record_failure(&mut report, commit_id, error),
        }
        bar.inc(1);
    }
    bar.finish_with_message("Analysis complete");

    report
}

fn record_failure(report: &mut RangeReport, commit_id: &str, error: crate::error::AnalysisError) {
    log::warn!("Could not analyze commit {}: {}", short_id(commit_id), error);
    report.failures.push(CommitFailure {
        commit_id: commit_id.to_string(),
        error,
    });
}
