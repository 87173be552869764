// src/report.rs

use crate::analyzer::RangeReport;
use crate::cli::{PrintMode, Track};
use crate::error::Result;
use crate::model::{CommitSummary, FunctionChange};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub mode: PrintMode,
    pub with_hash: bool,
    pub only_added: bool,
}

/// Print the per-commit results in the selected mode
pub fn print_commits<W: Write>(out: &mut W, summaries: &[CommitSummary], options: &PrintOptions) -> io::Result<()> {
    match options.mode {
        PrintMode::Full => {
            for summary in summaries {
                write_full(out, summary)?;
            }
        }
        PrintMode::Simple => {
            for summary in summaries {
                write_simple(out, summary, options.only_added)?;
            }
        }
        PrintMode::OnlyFn => {
            let mut seen = HashSet::new();
            for change in summaries.iter().flat_map(|s| s.function_changes.values()) {
                if seen.insert(change.function_name.as_str()) {
                    writeln!(out, "{}", change.function_name)?;
                }
            }
        }
        PrintMode::Functions => {
            for summary in summaries {
                for change in summary.function_changes.values() {
                    if options.only_added && change.added_lines.is_empty() {
                        continue;
                    }
                    write!(out, "{},{}", change.file_path, change.function_name)?;
                    if options.with_hash {
                        write!(out, ",{}", change.commit_id)?;
                    }
                    writeln!(out)?;
                }
            }
        }
    }
    Ok(())
}

fn write_full<W: Write>(out: &mut W, summary: &CommitSummary) -> io::Result<()> {
    for change in summary.function_changes.values() {
        writeln!(out, "{}: In function {}", change.file_path, change.function_name)?;
        write_line_list(out, change, "added", "new", &change.added_lines)?;
        write_line_list(out, change, "removed", "old", &change.removed_lines)?;
    }
    if summary.function_changes.is_empty() {
        writeln!(out, "No relevant changes detected.")?;
    }
    writeln!(out)
}

fn write_line_list<W: Write>(
    out: &mut W,
    change: &FunctionChange,
    what: &str,
    side: &str,
    lines: &[u32],
) -> io::Result<()> {
    if lines.is_empty() {
        return Ok(());
    }
    let joined: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    writeln!(
        out,
        "Patch {} has {} lines ({} line indices): [{}]",
        change.commit_id,
        what,
        side,
        joined.join(" ")
    )
}

fn write_simple<W: Write>(out: &mut W, summary: &CommitSummary, only_added: bool) -> io::Result<()> {
    writeln!(out, "# Commit: {}", summary.commit_id)?;
    for change in summary.function_changes.values() {
        let mut lines: BTreeSet<u32> = change.added_lines.iter().copied().collect();
        if !only_added {
            lines.extend(change.removed_lines.iter().copied());
        }
        for line in lines {
            writeln!(out, "{},{},{}", change.file_path, change.function_name, line)?;
        }
    }
    Ok(())
}

/// Print the range statistics as text tables
pub fn write_summary<W: Write>(out: &mut W, report: &RangeReport) -> io::Result<()> {
    let stats = &report.statistics;
    if stats.is_empty() && report.failures.is_empty() {
        writeln!(out, "No commits analyzed.")?;
        return Ok(());
    }

    writeln!(out, "Information from changed files:")?;
    writeln!(out, "How many commits changed files of each extension:")?;
    for (ext, commits) in &stats.extension_counts {
        if ext == "none" {
            writeln!(
                out,
                "{} commits updated files with no extension (e.g. README, NEWS, etc.)",
                commits
            )?;
        } else {
            writeln!(out, "{} commits updated {} files", commits, ext)?;
        }
    }

    writeln!(out, "{}", "-".repeat(87))?;

    writeln!(out, "Information from function updates:")?;
    writeln!(out, "Commits that changed N functions:")?;
    for (functions, commits) in &stats.commits_by_function_count {
        let (noun, verb) = if *commits > 1 {
            ("commits", "update")
        } else {
            ("commit", "updates")
        };
        writeln!(out, "{} {} {} {} functions", commits, noun, verb, functions)?;
    }
    writeln!(out, "Commits seen: {}", stats.commits_processed())?;
    writeln!(out, "Lines outside any function: {}", stats.unattributed_edits)?;

    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        writeln!(out, "History spans from {} to {}.", format_time(first), format_time(last))?;
    }
    if report.skipped_initial > 0 {
        writeln!(out, "Skipped initial commits: {}", report.skipped_initial)?;
    }
    if !report.warnings.is_empty() {
        writeln!(out, "Files left unattributed: {}", report.warnings.len())?;
    }
    if !report.failures.is_empty() {
        writeln!(out, "Commits that could not be analyzed: {}", report.failures.len())?;
        for failure in &report.failures {
            writeln!(out, "  {}: {}", failure.commit_id, failure.error)?;
        }
    }
    Ok(())
}

fn format_time(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map_or_else(|| timestamp.to_string(), |t| t.to_rfc2822())
}

/// Per-commit value saved with `--save-json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TrackedChanges {
    Loc(usize),
    Diff(BTreeMap<String, Vec<u32>>),
}

/// Attributed added lines per commit; commits without any are left out
pub fn tracked_changes(summaries: &[CommitSummary], track: Track) -> BTreeMap<String, TrackedChanges> {
    let mut tracked = BTreeMap::new();
    for summary in summaries {
        let mut files: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        for change in summary.function_changes.values() {
            if change.added_lines.is_empty() {
                continue;
            }
            files
                .entry(change.file_path.clone())
                .or_default()
                .extend(&change.added_lines);
        }
        if files.is_empty() {
            continue;
        }
        let value = match track {
            Track::Loc => TrackedChanges::Loc(files.values().map(Vec::len).sum()),
            Track::Diff => {
                for lines in files.values_mut() {
                    lines.sort_unstable();
                }
                TrackedChanges::Diff(files)
            }
        };
        tracked.insert(summary.commit_id.clone(), value);
    }
    tracked
}

pub fn save_json(path: &Path, summaries: &[CommitSummary], track: Track) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &tracked_changes(summaries, track))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::model::{CommitFailure, RepositoryStatistics};

    fn change(commit: &str, file: &str, name: &str, added: &[u32], removed: &[u32]) -> FunctionChange {
        FunctionChange {
            commit_id: commit.to_string(),
            file_path: file.to_string(),
            function_name: name.to_string(),
            added_lines: added.to_vec(),
            removed_lines: removed.to_vec(),
        }
    }

    fn summary(commit: &str, changes: Vec<FunctionChange>) -> CommitSummary {
        let mut s = CommitSummary {
            commit_id: commit.to_string(),
            parent_id: Some("p".to_string()),
            ..Default::default()
        };
        for c in changes {
            s.function_changes
                .insert((c.file_path.clone(), c.function_name.clone()), c);
        }
        s
    }

    fn sample() -> Vec<CommitSummary> {
        vec![
            summary(
                "c1",
                vec![
                    change("c1", "a.c", "main", &[3, 4], &[3]),
                    change("c1", "b.c", "helper", &[], &[9]),
                ],
            ),
            summary("c2", vec![]),
            summary("c3", vec![change("c3", "a.c", "main", &[7], &[])]),
        ]
    }

    fn render(mode: PrintMode, with_hash: bool, only_added: bool) -> String {
        let mut out = Vec::new();
        let options = PrintOptions {
            mode,
            with_hash,
            only_added,
        };
        print_commits(&mut out, &sample(), &options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_full_mode() {
        let text = render(PrintMode::Full, false, false);
        let expected = "\
a.c: In function main
Patch c1 has added lines (new line indices): [3 4]
Patch c1 has removed lines (old line indices): [3]
b.c: In function helper
Patch c1 has removed lines (old line indices): [9]

No relevant changes detected.

a.c: In function main
Patch c3 has added lines (new line indices): [7]

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_simple_mode() {
        let text = render(PrintMode::Simple, false, false);
        assert!(text.starts_with("# Commit: c1\na.c,main,3\na.c,main,4\nb.c,helper,9\n# Commit: c2\n"));

        let added_only = render(PrintMode::Simple, false, true);
        assert!(!added_only.contains("helper"));
    }

    #[test]
    fn test_only_fn_mode_deduplicates() {
        assert_eq!(render(PrintMode::OnlyFn, false, false), "main\nhelper\n");
    }

    #[test]
    fn test_functions_mode() {
        assert_eq!(
            render(PrintMode::Functions, true, true),
            "a.c,main,c1\na.c,main,c3\n"
        );
        assert_eq!(
            render(PrintMode::Functions, false, false),
            "a.c,main\nb.c,helper\na.c,main\n"
        );
    }

    #[test]
    fn test_tracked_changes() {
        let diff = tracked_changes(&sample(), Track::Diff);
        assert_eq!(diff.len(), 2);
        assert_eq!(
            diff["c1"],
            TrackedChanges::Diff(BTreeMap::from([("a.c".to_string(), vec![3, 4])]))
        );
        let loc = tracked_changes(&sample(), Track::Loc);
        assert_eq!(loc["c1"], TrackedChanges::Loc(2));
        assert_eq!(
            serde_json::to_string(&loc).unwrap(),
            r#"{"c1":2,"c3":1}"#
        );
    }

    #[test]
    fn test_summary_tables() {
        let mut statistics = RepositoryStatistics::default();
        let mut first = summary("c1", vec![change("c1", "a.c", "main", &[1], &[])]);
        first.touched_files = vec!["a.c".to_string(), "README".to_string()];
        statistics.record(&first);
        statistics.record(&summary("c2", vec![change("c2", "a.c", "f", &[1], &[])]));

        let report = RangeReport {
            statistics,
            failures: vec![CommitFailure {
                commit_id: "bad".to_string(),
                error: AnalysisError::diff_parse("x.c", "truncated hunk"),
            }],
            skipped_initial: 1,
            ..Default::default()
        };
        let mut out = Vec::new();
        write_summary(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("1 commits updated .c files\n"));
        assert!(text.contains("1 commits updated files with no extension"));
        assert!(text.contains("2 commits update 1 functions\n"));
        assert!(text.contains("Commits seen: 2\n"));
        assert!(text.contains("Skipped initial commits: 1\n"));
        assert!(text.contains("  bad: malformed diff for x.c: truncated hunk\n"));
    }
}
