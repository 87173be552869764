// src/symbols.rs

use crate::model::{FunctionInterval, Symbol};

/// Why a line has no enclosing function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unattributed {
    /// The file has no function-like symbols
    NoSymbols,
    /// The line precedes the first function
    BeforeFirstSymbol,
    /// The line number exceeds the file's length
    PastEndOfFile,
    /// Only reachable through degenerate intervals
    Uncovered,
}

/// Result of looking up one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution<'a> {
    Function(&'a str),
    Unattributed(Unattributed),
}

impl<'a> Attribution<'a> {
    pub fn function(&self) -> Option<&'a str> {
        match *self {
            Attribution::Function(name) => Some(name),
            Attribution::Unattributed(_) => None,
        }
    }
}

/// The function intervals of one file revision, sorted by start line.
///
/// A tagger only reports where a definition starts, so each interval runs up
/// to the next definition's start line, and the last one to the end of the
/// file. When several symbols share a start line the first listed owns the
/// range and the others are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolIndex {
    intervals: Vec<FunctionInterval>,
    line_count: Option<u32>,
}

impl SymbolIndex {
    pub fn empty(line_count: Option<u32>) -> Self {
        SymbolIndex {
            intervals: Vec::new(),
            line_count,
        }
    }

    pub fn build(symbols: &[Symbol], line_count: Option<u32>) -> Self {
        let mut functions: Vec<&Symbol> = symbols
            .iter()
            .filter(|s| s.kind.is_function_like())
            .collect();
        // Stable, so the first listed of equal start lines stays first
        functions.sort_by_key(|s| s.start_line);

        let sentinel = line_count.map_or(u32::MAX, |n| n.saturating_add(1));
        let mut intervals = Vec::with_capacity(functions.len());
        let mut next_start = sentinel;

        for (i, sym) in functions.iter().enumerate().rev() {
            let shares_start = i > 0 && functions[i - 1].start_line == sym.start_line;
            let end_line = if shares_start {
                sym.start_line
            } else {
                let end = next_start.max(sym.start_line);
                next_start = sym.start_line;
                end
            };
            intervals.push(FunctionInterval {
                name: sym.name.clone(),
                start_line: sym.start_line,
                end_line,
            });
        }
        intervals.reverse();

        SymbolIndex {
            intervals,
            line_count,
        }
    }

    pub fn intervals(&self) -> &[FunctionInterval] {
        &self.intervals
    }

    pub fn line_count(&self) -> Option<u32> {
        self.line_count
    }

    /// Find the function enclosing `line`, in O(log F).
    pub fn lookup(&self, line: u32) -> Attribution<'_> {
        if self.intervals.is_empty() {
            return Attribution::Unattributed(Unattributed::NoSymbols);
        }
        if self.line_count.is_some_and(|n| line > n) {
            return Attribution::Unattributed(Unattributed::PastEndOfFile);
        }

        let after = self.intervals.partition_point(|iv| iv.start_line <= line);
        if after == 0 {
            return Attribution::Unattributed(Unattributed::BeforeFirstSymbol);
        }
        let mut idx = after - 1;
        while idx > 0 && self.intervals[idx - 1].start_line == self.intervals[idx].start_line {
            idx -= 1;
        }

        let interval = &self.intervals[idx];
        if interval.contains(line) {
            Attribution::Function(&interval.name)
        } else {
            Attribution::Unattributed(Unattributed::Uncovered)
        }
    }
}

/// Number of lines in a blob; a final line without newline still counts
pub fn count_lines(content: &[u8]) -> u32 {
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    let trailing = usize::from(content.last().is_some_and(|&b| b != b'\n'));
    u32::try_from(newlines + trailing).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SymbolKind;

    fn index(starts: &[(&str, u32)], line_count: Option<u32>) -> SymbolIndex {
        let symbols: Vec<Symbol> = starts
            .iter()
            .map(|(name, line)| Symbol::function(name, "f.c", *line))
            .collect();
        SymbolIndex::build(&symbols, line_count)
    }

    #[test]
    fn test_line_inside_second_function() {
        let idx = index(&[("first", 10), ("second", 50)], Some(100));
        assert_eq!(idx.lookup(55), Attribution::Function("second"));
        assert_eq!(idx.lookup(49), Attribution::Function("first"));
        assert_eq!(idx.lookup(100), Attribution::Function("second"));
    }

    #[test]
    fn test_line_before_first_function() {
        let idx = index(&[("first", 10), ("second", 50)], Some(100));
        assert_eq!(
            idx.lookup(5),
            Attribution::Unattributed(Unattributed::BeforeFirstSymbol)
        );
    }

    #[test]
    fn test_no_symbols_means_nothing_attributed() {
        let idx = index(&[], Some(100));
        for line in [1, 50, 100] {
            assert_eq!(
                idx.lookup(line),
                Attribution::Unattributed(Unattributed::NoSymbols)
            );
        }
    }

    #[test]
    fn test_line_past_end_of_file() {
        let idx = index(&[("only", 1)], Some(20));
        assert_eq!(
            idx.lookup(21),
            Attribution::Unattributed(Unattributed::PastEndOfFile)
        );
        let unbounded = index(&[("only", 1)], None);
        assert_eq!(unbounded.lookup(1_000_000), Attribution::Function("only"));
    }

    #[test]
    fn test_unsorted_symbols_are_sorted() {
        let idx = index(&[("c", 30), ("a", 1), ("b", 10)], Some(40));
        let names: Vec<_> = idx.intervals().iter().map(|iv| iv.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(idx.lookup(15), Attribution::Function("b"));
    }

    #[test]
    fn test_shared_start_line_first_listed_wins() {
        let idx = index(&[("later", 40), ("outer", 10), ("inner", 10)], Some(60));
        let intervals = idx.intervals();
        assert_eq!(intervals[0].name, "outer");
        assert_eq!((intervals[0].start_line, intervals[0].end_line), (10, 40));
        assert_eq!(intervals[1].name, "inner");
        assert_eq!(intervals[1].start_line, intervals[1].end_line);
        assert_eq!(idx.lookup(10), Attribution::Function("outer"));
        assert_eq!(idx.lookup(39), Attribution::Function("outer"));
        assert_eq!(idx.lookup(40), Attribution::Function("later"));
    }

    #[test]
    fn test_non_function_kinds_are_ignored() {
        let mut symbols = vec![Symbol::function("f", "f.c", 10)];
        symbols.push(Symbol {
            name: "MAX".to_string(),
            kind: SymbolKind::Macro,
            file_path: "f.c".to_string(),
            start_line: 20,
        });
        symbols.push(Symbol {
            name: "g".to_string(),
            kind: SymbolKind::Prototype,
            file_path: "f.c".to_string(),
            start_line: 25,
        });
        let idx = SymbolIndex::build(&symbols, Some(30));
        assert_eq!(idx.intervals().len(), 1);
        assert_eq!(idx.lookup(22), Attribution::Function("f"));
    }

    #[test]
    fn test_intervals_are_disjoint_and_cover_the_file() {
        let layouts: &[&[(&str, u32)]] = &[
            &[("a", 1)],
            &[("a", 3), ("b", 3), ("c", 9), ("d", 12)],
            &[("z", 50), ("y", 2), ("x", 2), ("w", 49)],
        ];
        let line_count = 60;
        for layout in layouts {
            let idx = index(layout, Some(line_count));
            let intervals = idx.intervals();
            for pair in intervals.windows(2) {
                assert!(pair[0].end_line <= pair[1].start_line || pair[1].start_line == pair[1].end_line);
            }
            let first = intervals[0].start_line;
            for line in 1..=line_count {
                let hits = intervals.iter().filter(|iv| iv.contains(line)).count();
                if line < first {
                    assert_eq!(hits, 0);
                    assert!(idx.lookup(line).function().is_none());
                } else {
                    assert_eq!(hits, 1, "line {} in {:?}", line, layout);
                    assert!(idx.lookup(line).function().is_some());
                }
            }
        }
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"a\nb"), 2);
    }
}
