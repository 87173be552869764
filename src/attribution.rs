// src/attribution.rs

use crate::error::AnalysisError;
use crate::model::{CommitId, EditKind, FileEdits, FunctionChange, LineEdit};
use crate::symbols::{Attribution, SymbolIndex, Unattributed};
use std::collections::BTreeMap;

/// Lines of one function touched in one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedLines {
    pub added: Vec<u32>,
    pub removed: Vec<u32>,
}

/// The attribution of every edit in one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttribution {
    pub path: String,
    pub functions: BTreeMap<String, ChangedLines>,
    pub unattributed: usize,
}

impl FileAttribution {
    /// Every edit of the file left unattributed
    pub fn unattributed(edits: &FileEdits) -> Self {
        FileAttribution {
            path: edits.path.clone(),
            functions: BTreeMap::new(),
            unattributed: edits.edit_count(),
        }
    }

    pub fn attributed(&self) -> usize {
        self.functions
            .values()
            .map(|l| l.added.len() + l.removed.len())
            .sum()
    }

    pub fn into_function_changes(self, commit_id: &str) -> impl Iterator<Item = FunctionChange> + '_ {
        let path = self.path;
        self.functions
            .into_iter()
            .map(move |(name, lines)| FunctionChange {
                commit_id: CommitId::from(commit_id),
                file_path: path.clone(),
                function_name: name,
                added_lines: lines.added,
                removed_lines: lines.removed,
            })
    }
}

/// Attribute the edits of one file.
///
/// Added lines are looked up in the post-image index and removed lines in the
/// pre-image index; the two are never mixed.
pub fn attribute_file(edits: &FileEdits, old_index: &SymbolIndex, new_index: &SymbolIndex) -> FileAttribution {
    let mut result = FileAttribution {
        path: edits.path.clone(),
        ..Default::default()
    };

    for edit in edits.line_edits() {
        let index = match edit.kind {
            EditKind::Added => new_index,
            EditKind::Removed => old_index,
        };
        let Some(name) = attribute_line(&edit, index) else {
            result.unattributed += 1;
            continue;
        };
        let lines = result.functions.entry(name.to_string()).or_default();
        match edit.kind {
            EditKind::Added => lines.added.push(edit.line_number),
            EditKind::Removed => lines.removed.push(edit.line_number),
        }
    }

    result
}

fn attribute_line<'a>(edit: &LineEdit, index: &'a SymbolIndex) -> Option<&'a str> {
    let found = index.lookup(edit.line_number);
    if found == Attribution::Unattributed(Unattributed::PastEndOfFile) {
        let inconsistency = AnalysisError::AttributionInconsistency {
            file: edit.file_path.clone(),
            line: edit.line_number,
            line_count: index.line_count().unwrap_or(0),
        };
        log::debug!("{}", inconsistency);
    }
    found.function()
}
