//! CLI command definitions and handlers

use crate::analyzer::RepositoryAnalyzer;
use crate::config::AnalysisConfig;
use crate::models::RepositoryData;
use crate::progress::Progress;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Repopulse - repository health analysis
///
/// 100% LOCAL - analysis runs against your working copy and git history.
#[derive(Parser, Debug)]
#[command(name = "repopulse")]
#[command(
    version,
    about = "Repository health analysis — contribution, complexity, maintainability, and design-balance metrics from git history",
    long_about = "Repopulse scans a git repository's history and working tree and produces \
per-author contribution statistics, per-file complexity and maintainability metrics, \
dependency-coupling design indicators, and an overall project health score with \
recommendations.\n\n\
Run without a subcommand to analyze the current directory:\n  \
repopulse .",
    after_help = "\
Examples:
  repopulse .                          Analyze current directory
  repopulse analyze /path/to/repo      Analyze a specific repo
  repopulse analyze . --all-branches   Include every branch in history
  repopulse analyze . --workers 8      Use 8 analysis workers
  repopulse analyze . --quiet          No progress bar (CI logs)"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(global = true, default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: from config)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze repository health (default when no subcommand is given)
    Analyze {
        /// Scan all branches instead of only the default branch
        #[arg(long)]
        all_branches: bool,

        /// Disable the source-extension filter (analyze every tracked file)
        #[arg(long)]
        no_ext_filter: bool,

        /// Suppress the progress bar (cleaner for CI logs)
        #[arg(long)]
        quiet: bool,

        /// How many top contributors to list
        #[arg(long, default_value = "5")]
        top_authors: usize,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Analyze {
            all_branches,
            no_ext_filter,
            quiet,
            top_authors,
        }) => run_analyze(
            &cli.path,
            cli.workers,
            all_branches,
            no_ext_filter,
            quiet,
            top_authors,
        ),
        None => run_analyze(&cli.path, cli.workers, false, false, false, 5),
    }
}

fn run_analyze(
    path: &Path,
    workers: Option<usize>,
    all_branches: bool,
    no_ext_filter: bool,
    quiet: bool,
    top_authors: usize,
) -> Result<()> {
    let repo_root = path
        .canonicalize()
        .with_context(|| format!("cannot access {}", path.display()))?;

    let mut config = AnalysisConfig::load(&repo_root);
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if all_branches {
        config.default_branch_only = false;
    }
    if no_ext_filter {
        config.filter_by_extensions = false;
    }

    let analyzer = RepositoryAnalyzer::new(&repo_root, config);

    let data = if quiet {
        analyzer.analyze(&Progress::silent())?
    } else {
        let (progress, events) = Progress::channel(256);

        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {percent:>3}% {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
        );
        let drain = std::thread::spawn(move || {
            for event in events {
                bar.set_position((event.fraction * 100.0).round() as u64);
                bar.set_message(event.message);
            }
            bar.finish_and_clear();
        });

        let result = analyzer.analyze(&progress);
        drop(progress); // closes the channel so the drain thread exits
        let _ = drain.join();
        result?
    };

    print_summary(&data, top_authors);
    Ok(())
}

fn print_summary(data: &RepositoryData, top_authors: usize) {
    println!();
    println!(
        "{} {}  (branch: {})",
        style("Repository:").bold(),
        data.project_name,
        data.default_branch
    );
    println!(
        "  {} commits by {} authors across {} branches",
        data.total_commits,
        data.authors.len(),
        data.branches.len()
    );
    println!(
        "  {} files, {} lines ({} source / {} comment / {} blank)",
        data.total_files,
        data.total_lines,
        data.total_source_lines,
        data.total_comment_lines,
        data.total_blank_lines
    );
    if let (Some(first), Some(last)) = (data.first_commit, data.last_commit) {
        println!(
            "  history {} to {} ({} days, {} active)",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d"),
            data.age_days,
            data.active_days.len()
        );
    }

    let Some(health) = &data.health else {
        return;
    };

    println!();
    println!("{}", style("Health").bold());

    let score = health.code_quality_score;
    let styled_score = if score >= 80.0 {
        style(format!("{score:.1}")).green()
    } else if score >= 50.0 {
        style(format!("{score:.1}")).yellow()
    } else {
        style(format!("{score:.1}")).red()
    };
    println!("  Quality score:   {styled_score} / 100");
    println!("  Bus factor:      {}", health.bus_factor);
    println!(
        "  Complexity:      avg {:.1}, {} complex files",
        health.average_complexity, health.complex_files_count
    );
    println!(
        "  Maintainability: avg {:.1} ({} good / {} moderate / {} difficult / {} critical)",
        health.average_maintainability_index,
        health.good_files,
        health.moderate_files,
        health.difficult_files,
        health.critical_files
    );
    println!("  Large files:     {}", health.large_files_count);
    if !data.coupling.is_empty() {
        println!(
            "  Design balance:  avg distance {:.2} ({} main sequence / {} pain / {} useless)",
            health.average_distance,
            health.main_sequence_files,
            health.zone_of_pain_files,
            health.zone_of_uselessness_files
        );
    }

    let authors = data.authors_by_commits();
    if !authors.is_empty() {
        println!();
        println!("{}", style("Top contributors").bold());
        for (name, stats) in authors.into_iter().take(top_authors) {
            println!(
                "  {:>6} commits  +{:<7} -{:<7} {}",
                stats.total_commits, stats.lines_added, stats.lines_removed, name
            );
        }
    }

    if !health.recommendations.is_empty() {
        println!();
        println!("{}", style("Recommendations").bold());
        for recommendation in &health.recommendations {
            println!("  - {recommendation}");
        }
    }

    if !data.diagnostics.is_clean() {
        println!();
        println!(
            "{} {} malformed log records, {} unreadable files skipped",
            style("Note:").dim(),
            data.diagnostics.malformed_log_records,
            data.diagnostics.unreadable_files
        );
    }
}
