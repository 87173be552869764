// src/main.rs

mod analyzer;
mod attribution;
mod cli;
mod error;
mod hunks;
mod model;
mod renderer;
mod report;
mod symbols;
mod tagger;
mod vcs;

use analyzer::{AnalysisConfig, RangeOptions};
use anyhow::Context;
use clap::Parser;
use cli::Args;
use hunks::DiffParser;
use regex::Regex;
use renderer::PlotOptions;
use report::PrintOptions;
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;
use tagger::CtagsExtractor;
use vcs::{GitHistory, History, RangeBound};

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    let start_time = Instant::now();

    match run(&args) {
        Ok(all_analyzed) => {
            log::info!("Total time: {:.2?}", start_time.elapsed());
            if all_analyzed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let fatal = e
                .downcast_ref::<error::AnalysisError>()
                .map_or(true, error::AnalysisError::is_fatal_for_run);
            ExitCode::from(if fatal { 2 } else { 1 })
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Returns whether every commit of the range could be analyzed
fn run(args: &Args) -> anyhow::Result<bool> {
    let history = GitHistory::open(&args.repo)?;
    log::info!("Analyzing repository at: {}", history.path().display());

    let extractor = CtagsExtractor::locate(args.ctags.as_deref())?;
    log::info!("Extracting symbols with {}", extractor.program().display());

    let start = history.resolve(&args.revision)?;
    let bound = range_bound(args, &history)?;
    let mut commits = history.commit_range(&start, &bound)?;
    if args.oldest_first {
        commits.reverse();
    }

    let config = analysis_config(args)?;
    let print_details = !args.wants_statistics();
    let options = RangeOptions {
        skip_initial: args.skip_initial,
        limit: args.limit,
        keep_summaries: print_details || args.save_json.is_some(),
        show_progress: !args.quiet,
    };

    let analysis_start = Instant::now();
    let report = analyzer::analyze_range(&history, &extractor, &commits, &config, &options);
    log::info!(
        "Analysis finished in {:.2?}. {} commits analyzed, {} failed.",
        analysis_start.elapsed(),
        report.statistics.commits_processed(),
        report.failures.len()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if print_details {
        let print_options = PrintOptions {
            mode: args.print_mode,
            with_hash: args.with_hash,
            only_added: args.only_added,
        };
        report::print_commits(&mut out, &report.summaries, &print_options)?;
    }
    if args.summary {
        report::write_summary(&mut out, &report)?;
    }
    out.flush()?;

    if args.plot {
        let dir = if args.skip_initial {
            args.plot_dir.join("skip")
        } else {
            args.plot_dir.clone()
        };
        let plot_options = PlotOptions {
            dir,
            width: args.width,
            height: args.height,
            cap: args.plot_cap,
        };
        renderer::render_plots(&report.statistics, &plot_options).context("cannot save plots")?;
    }

    if let Some(path) = &args.save_json {
        report::save_json(path, &report.summaries, args.track)
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    let incomplete = report.incomplete_commits();
    if incomplete > 0 {
        log::warn!("{} commits could not be fully analyzed", incomplete);
    }
    Ok(report.failures.is_empty())
}

fn range_bound(args: &Args, history: &GitHistory) -> error::Result<RangeBound> {
    if let Some(end) = &args.range {
        return Ok(RangeBound::Through(history.resolve(end)?));
    }
    if let Some(n) = args.range_int {
        return Ok(RangeBound::Count(n));
    }
    Ok(if args.wants_statistics() {
        RangeBound::Full
    } else {
        RangeBound::Count(1)
    })
}

fn analysis_config(args: &Args) -> anyhow::Result<AnalysisConfig> {
    let path_filter = args
        .path_filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --path-filter")?;
    let extensions = args
        .extensions
        .iter()
        .map(|ext| {
            if ext.starts_with('.') {
                ext.clone()
            } else {
                format!(".{}", ext)
            }
        })
        .collect();

    Ok(AnalysisConfig {
        diff_parser: DiffParser::new(!args.keep_blank_lines),
        path_filter,
        extensions,
    })
}
