// src/tagger.rs

use crate::error::{AnalysisError, Result};
use crate::model::{Symbol, SymbolKind};
use serde::Deserialize;
use std::env;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Turns the content of one file revision into its symbol list.
///
/// Implementations must be shareable between threads; extraction for the
/// files of one commit runs in parallel.
pub trait SymbolExtractor: Sync {
    fn extract_symbols(&self, path: &str, content: &[u8]) -> Result<Vec<Symbol>>;
}

/// Universal Ctags executables, in order of preference
const CANDIDATES: &[&str] = &["universalctags", "universal-ctags", "ctags"];

/// Runs Universal Ctags on a temporary copy of each blob.
#[derive(Debug, Clone)]
pub struct CtagsExtractor {
    program: PathBuf,
}

/// One line of `ctags --output-format=json`
#[derive(Debug, Deserialize)]
struct TagRecord {
    #[serde(rename = "_type")]
    record_type: String,
    #[serde(default)]
    name: String,
    line: Option<u32>,
    kind: Option<String>,
}

impl CtagsExtractor {
    /// Use `program` if given, otherwise the first ctags found on PATH
    pub fn locate(program: Option<&Path>) -> Result<Self> {
        if let Some(program) = program {
            if program.is_file() {
                return Ok(CtagsExtractor {
                    program: program.to_path_buf(),
                });
            }
            return Err(AnalysisError::TaggerNotFound {
                tried: program.display().to_string(),
            });
        }

        find_candidate(env::var_os("PATH"))
            .map(|program| CtagsExtractor { program })
            .ok_or_else(|| AnalysisError::TaggerNotFound {
                tried: CANDIDATES.join(", "),
            })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl SymbolExtractor for CtagsExtractor {
    fn extract_symbols(&self, path: &str, content: &[u8]) -> Result<Vec<Symbol>> {
        // ctags picks the language from the extension
        let suffix = Path::new(path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let mut file = tempfile::Builder::new()
            .prefix("fnblame-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(content)?;
        file.flush()?;

        let output = Command::new(&self.program)
            .args(["--fields=+ne", "--output-format=json", "-f", "-"])
            .arg(file.path())
            .output()
            .map_err(|e| {
                AnalysisError::extraction(path, format!("cannot run {}: {}", self.program.display(), e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(AnalysisError::extraction(
                path,
                format!("{} exited with {}: {}", self.program.display(), output.status, stderr.trim()),
            ));
        }
        if !stderr.trim().is_empty() {
            log::debug!("ctags on {}: {}", path, stderr.trim());
        }

        parse_ctags_json(&String::from_utf8_lossy(&output.stdout), path)
    }
}

/// Parse ctags JSON lines output into symbols for `file_path`
pub fn parse_ctags_json(output: &str, file_path: &str) -> Result<Vec<Symbol>> {
    let mut symbols = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let record: TagRecord = serde_json::from_str(line)
            .map_err(|e| AnalysisError::extraction(file_path, format!("bad ctags output {:?}: {}", line, e)))?;
        if record.record_type != "tag" || record.name.is_empty() {
            continue;
        }
        let Some(start_line) = record.line.filter(|&l| l > 0) else {
            log::debug!("ctags reported {} in {} without a line number", record.name, file_path);
            continue;
        };
        symbols.push(Symbol {
            name: record.name,
            kind: SymbolKind::from_tag_kind(record.kind.as_deref().unwrap_or("")),
            file_path: file_path.to_string(),
            start_line,
        });
    }
    Ok(symbols)
}

/// First of `CANDIDATES` found on `search_path`
fn find_candidate<P: AsRef<OsStr>>(search_path: Option<P>) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    CANDIDATES
        .iter()
        .find_map(|name| which::which_in(name, search_path.as_ref(), &cwd).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"_type": "ptag", "name": "JSON_OUTPUT_VERSION", "path": "0.0", "pattern": "in development"}
{"_type": "tag", "name": "helper", "path": "/tmp/fnblame-x.c", "pattern": "/^static int helper(void)$/", "line": 3, "kind": "function", "end": 6}
{"_type": "tag", "name": "MAX", "path": "/tmp/fnblame-x.c", "pattern": "/^#define MAX/", "line": 1, "kind": "macro"}

{"_type": "tag", "name": "main", "path": "/tmp/fnblame-x.c", "pattern": "/^int main(void)$/", "line": 8, "kind": "function", "end": 12}
"#;

    #[test]
    fn test_parse_ctags_json() {
        let symbols = parse_ctags_json(SAMPLE, "src/x.c").unwrap();
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols[0], Symbol::function("helper", "src/x.c", 3));
        assert_eq!(symbols[1].kind, SymbolKind::Macro);
        assert_eq!(symbols[2].start_line, 8);
    }

    #[test]
    fn test_unparseable_output_is_an_extraction_error() {
        let err = parse_ctags_json("!_TAG_FILE_FORMAT\t2\n", "x.c").unwrap_err();
        assert!(matches!(err, AnalysisError::SymbolExtraction { ref file, .. } if file == "x.c"));
    }

    #[test]
    fn test_missing_explicit_program() {
        let err = CtagsExtractor::locate(Some(Path::new("/nonexistent/ctags"))).unwrap_err();
        assert!(matches!(err, AnalysisError::TaggerNotFound { .. }));
        assert!(err.is_fatal_for_run());
    }

    #[cfg(unix)]
    fn fake_ctags(dir: &Path, script: &str) -> PathBuf {
        fake_program(dir, "ctags", script)
    }

    #[cfg(unix)]
    fn fake_program(dir: &Path, name: &str, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let program = dir.join(name);
        std::fs::write(&program, script).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        program
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_the_tagger_on_a_temporary_copy() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = "#!/bin/sh\n\
            for last; do :; done\n\
            case \"$last\" in *.c) ;; *) exit 3 ;; esac\n\
            echo '{\"_type\": \"tag\", \"name\": \"main\", \"line\": 2, \"kind\": \"function\"}'\n";
        let program = fake_ctags(dir.path(), script);
        let extractor = CtagsExtractor::locate(Some(&program)).unwrap();

        let symbols = extractor.extract_symbols("src/main.c", b"\nint main(void) {}\n").unwrap();
        assert_eq!(symbols, vec![Symbol::function("main", "src/main.c", 2)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_tagger() {
        let dir = tempfile::TempDir::new().unwrap();
        let program = fake_ctags(dir.path(), "#!/bin/sh\necho 'cannot parse' >&2\nexit 1\n");
        let extractor = CtagsExtractor::locate(Some(&program)).unwrap();

        let err = extractor.extract_symbols("a.c", b"int x;\n").unwrap_err();
        assert!(matches!(err, AnalysisError::SymbolExtraction { .. }));
        assert!(err.to_string().contains("cannot parse"));
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_prefers_universal_ctags() {
        let dir = tempfile::TempDir::new().unwrap();
        let plain = fake_program(dir.path(), "ctags", "#!/bin/sh\n");
        assert_eq!(find_candidate(Some(dir.path())), Some(plain));

        let universal = fake_program(dir.path(), "universal-ctags", "#!/bin/sh\n");
        assert_eq!(find_candidate(Some(dir.path())), Some(universal));

        let empty = tempfile::TempDir::new().unwrap();
        assert_eq!(find_candidate(Some(empty.path())), None);
    }
}
