// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lists the functions touched by git commits", long_about = None)]
pub struct Args {
    /// Path to the git repository to analyze
    pub repo: PathBuf,

    /// Newest revision of the range
    #[arg(long, default_value = "HEAD")]
    pub revision: String,

    /// Look at the previous N commits, starting at the revision
    #[arg(short = 'n', long, value_name = "N", conflicts_with = "range")]
    pub range_int: Option<usize>,

    /// Look at the commits between the revision and INIT_HASH (inclusive)
    #[arg(short, long, value_name = "INIT_HASH")]
    pub range: Option<String>,

    /// Process commits from the oldest to the newest
    #[arg(long)]
    pub oldest_first: bool,

    /// Output format for per-commit results
    #[arg(long, value_enum, default_value_t = PrintMode::Full)]
    pub print_mode: PrintMode,

    /// Append the commit hash in --print-mode=functions
    #[arg(long)]
    pub with_hash: bool,

    /// Only report added lines in --print-mode=functions and simple
    #[arg(long)]
    pub only_added: bool,

    /// Print a summary of the whole range
    #[arg(short, long)]
    pub summary: bool,

    /// Save histograms of the whole range as PNG files
    #[arg(short, long)]
    pub plot: bool,

    /// Directory for the histogram images
    #[arg(long, default_value = "img")]
    pub plot_dir: PathBuf,

    /// Largest function count shown in the restricted histogram
    #[arg(long, default_value_t = 25)]
    pub plot_cap: usize,

    /// Width of the histogram images in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Height of the histogram images in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Skip the initial commit, which can be very large
    #[arg(short = 'i', long)]
    pub skip_initial: bool,

    /// Only process the first N commits of the range
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Write per-commit function updates as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub save_json: Option<PathBuf>,

    /// What to save with --save-json
    #[arg(long, value_enum, default_value_t = Track::Diff)]
    pub track: Track,

    /// Only analyze paths matching this regular expression (anchored at the start)
    #[arg(long, value_name = "REGEX")]
    pub path_filter: Option<String>,

    /// Only attribute files with these extensions, e.g. ".c,.h"
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Keep added and removed lines that are empty or whitespace only
    #[arg(long)]
    pub keep_blank_lines: bool,

    /// ctags executable (defaults to universalctags or ctags on PATH)
    #[arg(long)]
    pub ctags: Option<PathBuf>,

    /// Log progress messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Statistics modes look at the whole history by default
    pub fn wants_statistics(&self) -> bool {
        self.summary || self.plot
    }
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Functions with their added and removed line numbers
    Full,
    /// One `file,function,line` row per changed line
    Simple,
    /// Distinct function names only
    OnlyFn,
    /// One `file,function` row per changed function
    Functions,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Track {
    /// Number of attributed added lines per commit
    Loc,
    /// Attributed added lines per file per commit
    Diff,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["fnblame", "."]).unwrap();
        assert_eq!(args.revision, "HEAD");
        assert_eq!(args.print_mode, PrintMode::Full);
        assert_eq!(args.track, Track::Diff);
        assert!(!args.wants_statistics());
        assert!(args.extensions.is_empty());
    }

    #[test]
    fn test_statistics_flags() {
        let args = Args::try_parse_from([
            "fnblame",
            "repo",
            "-s",
            "-i",
            "-n",
            "10",
            "--print-mode",
            "only-fn",
            "--extensions",
            ".c,.h",
        ])
        .unwrap();
        assert!(args.wants_statistics());
        assert!(args.skip_initial);
        assert_eq!(args.range_int, Some(10));
        assert_eq!(args.print_mode, PrintMode::OnlyFn);
        assert_eq!(args.extensions, vec![".c", ".h"]);
    }

    #[test]
    fn test_range_bounds_conflict() {
        assert!(Args::try_parse_from(["fnblame", ".", "-n", "3", "-r", "abc"]).is_err());
    }
}
