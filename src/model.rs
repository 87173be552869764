// src/model.rs

use crate::error::AnalysisError;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Full hex hash of a commit
pub type CommitId = String;

/// Identifies a function within one commit: (file path, function name)
pub type FunctionKey = (String, String);

/// Which side of the diff a changed line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditKind {
    /// Line number refers to the new file version
    Added,
    /// Line number refers to the old file version
    Removed,
}

/// A single changed line of a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    pub file_path: String,
    /// 1-based
    pub line_number: u32,
    pub kind: EditKind,
}

/// All line edits to one file in one diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEdits {
    /// Path in the new revision (old path for deleted files)
    pub path: String,
    /// Path in the old revision, if the file existed there
    pub old_path: Option<String>,
    /// New-file line numbers of added lines, ascending
    pub added: Vec<u32>,
    /// Old-file line numbers of removed lines, ascending
    pub removed: Vec<u32>,
}

impl FileEdits {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn edit_count(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    pub fn line_edits(&self) -> impl Iterator<Item = LineEdit> + '_ {
        let added = self.added.iter().map(move |&n| LineEdit {
            file_path: self.path.clone(),
            line_number: n,
            kind: EditKind::Added,
        });
        let removed = self.removed.iter().map(move |&n| LineEdit {
            file_path: self.pre_image_path().to_string(),
            line_number: n,
            kind: EditKind::Removed,
        });
        added.chain(removed)
    }

    /// Path to read the pre-image from
    pub fn pre_image_path(&self) -> &str {
        self.old_path.as_deref().unwrap_or(&self.path)
    }
}

/// The kinds of definition a tagger reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    Prototype,
    Macro,
    Other(String),
}

impl SymbolKind {
    pub fn from_tag_kind(kind: &str) -> Self {
        match kind {
            "function" | "func" | "subroutine" | "f" => SymbolKind::Function,
            "method" | "member" | "singletonMethod" | "m" => SymbolKind::Method,
            "prototype" | "p" => SymbolKind::Prototype,
            "macro" | "d" => SymbolKind::Macro,
            other => SymbolKind::Other(other.to_string()),
        }
    }

    /// Only function-like definitions own the lines that follow them
    pub fn is_function_like(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

/// A definition reported by the tagger. Only the start line is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub start_line: u32,
}

#[cfg(test)]
impl Symbol {
    pub fn function(name: &str, file_path: &str, start_line: u32) -> Self {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: file_path.to_string(),
            start_line,
        }
    }
}

/// The half-open line range `[start_line, end_line)` inferred for a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInterval {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl FunctionInterval {
    pub fn contains(&self, line: u32) -> bool {
        self.start_line <= line && line < self.end_line
    }
}

/// Lines of one function changed by one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionChange {
    pub commit_id: CommitId,
    pub file_path: String,
    pub function_name: String,
    pub added_lines: Vec<u32>,
    pub removed_lines: Vec<u32>,
}

/// Something that kept part of a commit from being attributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisWarning {
    pub commit_id: CommitId,
    pub file_path: String,
    pub message: String,
}

/// The attribution result for one commit
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
    pub commit_id: CommitId,
    pub parent_id: Option<CommitId>,
    /// Commit time, seconds since the epoch
    pub timestamp: i64,
    pub function_changes: BTreeMap<FunctionKey, FunctionChange>,
    pub unattributed_edits: usize,
    /// Every file the diff touched, sorted by path
    pub touched_files: Vec<String>,
    pub warnings: Vec<AnalysisWarning>,
}

impl CommitSummary {
    pub fn functions_touched(&self) -> usize {
        self.function_changes.len()
    }

    /// Distinct extensions of the touched files
    pub fn extensions(&self) -> BTreeSet<String> {
        self.touched_files.iter().map(|p| file_extension(p)).collect()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A commit that could not be analysed at all
#[derive(Debug)]
pub struct CommitFailure {
    pub commit_id: CommitId,
    pub error: AnalysisError,
}

/// Statistics accumulated over a commit range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryStatistics {
    /// Number of distinct functions touched -> number of commits
    pub commits_by_function_count: BTreeMap<usize, usize>,
    /// Extension (".c", or "none") -> number of commits touching it
    pub extension_counts: BTreeMap<String, usize>,
    pub ordered_commit_ids: Vec<CommitId>,
    pub unattributed_edits: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

impl RepositoryStatistics {
    pub fn record(&mut self, summary: &CommitSummary) {
        *self
            .commits_by_function_count
            .entry(summary.functions_touched())
            .or_insert(0) += 1;
        for ext in summary.extensions() {
            *self.extension_counts.entry(ext).or_insert(0) += 1;
        }
        self.ordered_commit_ids.push(summary.commit_id.clone());
        self.unattributed_edits += summary.unattributed_edits;

        let ts = summary.timestamp;
        self.first_timestamp = Some(self.first_timestamp.map_or(ts, |t| t.min(ts)));
        self.last_timestamp = Some(self.last_timestamp.map_or(ts, |t| t.max(ts)));
    }

    pub fn commits_processed(&self) -> usize {
        self.commits_by_function_count.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_commit_ids.is_empty()
    }
}

/// Extension of the file name including the dot, or "none"
pub fn file_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or_else(|| "none".to_string(), |e| format!(".{}", e))
}
