// src/hunks.rs

use crate::error::{AnalysisError, Result};
use crate::model::FileEdits;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hardcoded hunk regex")
});

/// Turns unified diff text into per-file added/removed line numbers.
#[derive(Debug, Clone, Copy)]
pub struct DiffParser {
    /// Drop added/removed lines that are empty or whitespace only
    pub skip_blank_lines: bool,
}

impl Default for DiffParser {
    fn default() -> Self {
        DiffParser {
            skip_blank_lines: true,
        }
    }
}

/// One `diff --git` section
#[derive(Debug, Default)]
struct FileSection {
    label: String,
    old_path: Option<String>,
    new_path: Option<String>,
    binary: bool,
    saw_hunk: bool,
    added: Vec<u32>,
    removed: Vec<u32>,
}

impl FileSection {
    fn from_git_header(line: &str) -> Self {
        let paths = line.trim_start_matches("diff --git ");
        let (old, new) = match paths.rfind(" b/") {
            Some(idx) => (Some(&paths[..idx]), Some(&paths[idx + 1..])),
            None => (None, None),
        };
        FileSection {
            label: new.and_then(parse_path).unwrap_or_else(|| paths.to_string()),
            old_path: old.and_then(parse_path),
            new_path: new.and_then(parse_path),
            ..Default::default()
        }
    }

    fn into_edits(self) -> Option<FileEdits> {
        if self.binary || !self.saw_hunk {
            return None;
        }
        let path = self.new_path.clone().or_else(|| self.old_path.clone())?;
        let edits = FileEdits {
            path,
            old_path: self.old_path,
            added: self.added,
            removed: self.removed,
        };
        Some(edits)
    }
}

/// The hunk currently being read
#[derive(Debug)]
struct Hunk {
    header: String,
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl Hunk {
    fn is_complete(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

impl DiffParser {
    pub fn new(skip_blank_lines: bool) -> Self {
        DiffParser { skip_blank_lines }
    }

    /// Parse a whole commit diff. Binary files and files without hunks produce
    /// no entry. Context lines are dropped.
    pub fn parse(&self, diff: &str) -> Result<BTreeMap<String, FileEdits>> {
        let mut files: BTreeMap<String, FileEdits> = BTreeMap::new();
        let mut section: Option<FileSection> = None;
        let mut hunk: Option<Hunk> = None;

        let mut lines = diff.lines().peekable();
        while let Some(line) = lines.next() {
            // "\ No newline at end of file" belongs to the previous line
            if line.starts_with('\\') {
                continue;
            }

            if let Some(h) = hunk.as_mut() {
                if !h.is_complete() {
                    let sec = section
                        .as_mut()
                        .ok_or_else(|| AnalysisError::diff_parse("<unknown>", "hunk outside a file"))?;
                    self.consume_body_line(h, sec, line)?;
                    continue;
                }
            }

            if line.starts_with("diff --git ") {
                hunk = None;
                if let Some(done) = section.take() {
                    merge_into(&mut files, done);
                }
                section = Some(FileSection::from_git_header(line));
            } else if line.starts_with("@@") {
                let sec = section.get_or_insert_with(FileSection::default);
                hunk = Some(parse_hunk_header(line, &sec.label)?);
                sec.saw_hunk = true;
            } else if line.starts_with("--- ")
                && section.as_ref().map_or(true, |s| s.saw_hunk)
                && (hunk.is_none() || lines.peek().is_some_and(|next| next.starts_with("+++ ")))
            {
                // Plain unified diff without git headers
                hunk = None;
                if let Some(done) = section.take() {
                    merge_into(&mut files, done);
                }
                let mut sec = FileSection::default();
                read_header_line(&mut sec, line);
                section = Some(sec);
            } else if let (Some(h), Some(sec)) = (hunk.as_ref(), section.as_ref()) {
                // Body lines after the declared counts are used up
                match line.chars().next() {
                    Some('+') => return Err(too_many(sec, h, "added")),
                    Some('-') => return Err(too_many(sec, h, "removed")),
                    Some(' ') => return Err(too_many(sec, h, "context")),
                    _ => {}
                }
            } else if let Some(sec) = section.as_mut() {
                read_header_line(sec, line);
            }
        }

        if let Some(h) = hunk {
            if !h.is_complete() {
                let label = section.as_ref().map_or("<unknown>", |s| s.label.as_str());
                return Err(AnalysisError::diff_parse(
                    label,
                    format!(
                        "hunk '{}' ended with {} old and {} new lines missing",
                        h.header, h.old_remaining, h.new_remaining
                    ),
                ));
            }
        }
        if let Some(done) = section {
            merge_into(&mut files, done);
        }
        Ok(files)
    }

    fn consume_body_line(&self, hunk: &mut Hunk, section: &mut FileSection, line: &str) -> Result<()> {
        let (origin, content) = match line.chars().next() {
            Some(c @ ('+' | '-' | ' ')) => (c, &line[1..]),
            // Some tools strip the lone space of empty context lines
            None => (' ', ""),
            Some(_) => {
                return Err(AnalysisError::diff_parse(
                    section.label.clone(),
                    format!("unexpected line inside hunk '{}': {:?}", hunk.header, line),
                ))
            }
        };
        let keep = !(self.skip_blank_lines && content.trim().is_empty());

        match origin {
            '+' => {
                if hunk.new_remaining == 0 {
                    return Err(too_many(section, hunk, "added"));
                }
                if keep {
                    section.added.push(hunk.new_line);
                }
                hunk.new_line += 1;
                hunk.new_remaining -= 1;
            }
            '-' => {
                if hunk.old_remaining == 0 {
                    return Err(too_many(section, hunk, "removed"));
                }
                if keep {
                    section.removed.push(hunk.old_line);
                }
                hunk.old_line += 1;
                hunk.old_remaining -= 1;
            }
            _ => {
                if hunk.old_remaining == 0 || hunk.new_remaining == 0 {
                    return Err(too_many(section, hunk, "context"));
                }
                hunk.old_line += 1;
                hunk.new_line += 1;
                hunk.old_remaining -= 1;
                hunk.new_remaining -= 1;
            }
        }
        Ok(())
    }
}

fn too_many(section: &FileSection, hunk: &Hunk, what: &str) -> AnalysisError {
    AnalysisError::diff_parse(
        section.label.clone(),
        format!("more {} lines than hunk '{}' declares", what, hunk.header),
    )
}

fn read_header_line(section: &mut FileSection, line: &str) {
    if let Some(p) = line.strip_prefix("--- ") {
        section.old_path = parse_path(p);
    } else if let Some(p) = line.strip_prefix("+++ ") {
        section.new_path = parse_path(p);
        if let Some(path) = &section.new_path {
            section.label = path.clone();
        } else if let Some(path) = &section.old_path {
            section.label = path.clone();
        }
    } else if let Some(p) = line.strip_prefix("rename from ") {
        section.old_path = Some(unquote(p));
    } else if let Some(p) = line.strip_prefix("rename to ") {
        section.new_path = Some(unquote(p));
    } else if line.starts_with("new file mode") {
        section.old_path = None;
    } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
        section.binary = true;
    }
}

fn parse_hunk_header(line: &str, label: &str) -> Result<Hunk> {
    let caps = HUNK_HEADER
        .captures(line)
        .ok_or_else(|| AnalysisError::diff_parse(label, format!("malformed hunk header {:?}", line)))?;

    let number = |idx: usize, default: u32| -> Result<u32> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u32>().map_err(|e| {
                AnalysisError::diff_parse(label, format!("bad number in hunk header {:?}: {}", line, e))
            }),
            None => Ok(default),
        }
    };

    let old_start = number(1, 0)?;
    let old_count = number(2, 1)?;
    let new_start = number(3, 0)?;
    let new_count = number(4, 1)?;

    if (old_count > 0 && old_start == 0) || (new_count > 0 && new_start == 0) {
        return Err(AnalysisError::diff_parse(
            label,
            format!("hunk header {:?} starts a non-empty range at line 0", line),
        ));
    }

    Ok(Hunk {
        header: line.to_string(),
        old_line: old_start,
        new_line: new_start,
        old_remaining: old_count,
        new_remaining: new_count,
    })
}

/// Strip the `a/` or `b/` prefix, quoting and any trailing timestamp.
/// `/dev/null` means the side does not exist.
fn parse_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw);
    let path = unquote(raw);
    if path == "/dev/null" {
        return None;
    }
    let stripped = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(&path);
    Some(stripped.to_string())
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim_end();
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
        .to_string()
}

fn merge_into(files: &mut BTreeMap<String, FileEdits>, section: FileSection) {
    if let Some(edits) = section.into_edits() {
        match files.get_mut(&edits.path) {
            Some(existing) => {
                existing.added.extend(edits.added);
                existing.removed.extend(edits.removed);
                existing.added.sort_unstable();
                existing.removed.sort_unstable();
            }
            None => {
                files.insert(edits.path.clone(), edits);
            }
        }
    }
}
