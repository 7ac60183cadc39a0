//! Repopulse - repository health analysis
//!
//! Scans a git repository's history and working tree and produces
//! per-author contribution metrics, per-file code-quality metrics
//! (size, Halstead complexity, cyclomatic complexity, maintainability),
//! dependency-coupling design indicators, and an aggregate project health
//! score with recommendations.
//!
//! The library entry point is [`analyzer::RepositoryAnalyzer`]; the `cli`
//! module is the thin presentation shell used by the binary.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod metrics;
pub mod models;
pub mod progress;
