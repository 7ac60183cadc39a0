//! Analysis configuration
//!
//! Loads per-repository configuration from a `repopulse.toml` file in the
//! repository root, merged over built-in defaults. The resulting snapshot
//! is passed by value into [`crate::analyzer::RepositoryAnalyzer`] and read
//! from there on; nothing in the engine consults global state.
//!
//! # Configuration Format
//!
//! ```toml
//! # repopulse.toml
//! workers = 8
//! default_branch_only = true
//! filter_by_extensions = true
//! allowed_extensions = [".rs", ".py", ".ts"]
//! command_timeout_secs = 300
//! large_file_loc = 500
//! complex_file_cc = 20
//! ```

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// Config file name looked up in the repository root.
pub const CONFIG_FILE: &str = "repopulse.toml";

/// Extensionless files still included when extension filtering is on.
pub const EXTENSIONLESS_INCLUDES: &[&str] =
    &["Makefile", "Dockerfile", "Rakefile", "Gemfile", "CMakeLists"];

/// Default extensions considered source code.
const DEFAULT_EXTENSIONS: &[&str] = &[
    // C/C++ family
    ".c", ".cc", ".cpp", ".cxx", ".h", ".hh", ".hpp", ".hxx",
    // Objective-C
    ".m", ".mm",
    // Swift
    ".swift",
    // CUDA / OpenCL
    ".cu", ".cuh", ".cl",
    // JVM languages
    ".java", ".scala", ".kt", ".kts",
    // Go
    ".go",
    // Rust
    ".rs",
    // Python
    ".py", ".pyi", ".pyx", ".pxd",
    // JavaScript/TypeScript
    ".js", ".mjs", ".cjs", ".jsx", ".ts", ".tsx", ".d.ts",
    // Ruby
    ".rb",
    // Shell
    ".sh",
    // Lua
    ".lua",
    // Protocol Buffers / Thrift
    ".proto", ".thrift",
    // Assembly
    ".asm", ".s",
    // R
    ".r",
];

/// Immutable configuration snapshot for one analysis run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lower-cased extension suffixes (with leading dot) to analyze.
    pub allowed_extensions: BTreeSet<String>,
    /// When false, every tracked file is analyzed.
    pub filter_by_extensions: bool,
    /// Worker threads for per-file analysis.
    pub workers: usize,
    /// Scan only the resolved default branch instead of `--all`.
    pub default_branch_only: bool,
    /// Timeout for general git queries, seconds.
    pub command_timeout_secs: u64,
    /// Timeout for the repository-validity check, seconds.
    pub validate_timeout_secs: u64,
    /// Physical-LOC threshold for the "large file" count.
    pub large_file_loc: usize,
    /// Cyclomatic-complexity threshold for the "complex file" count.
    pub complex_file_cc: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            filter_by_extensions: true,
            workers: default_workers(),
            default_branch_only: true,
            command_timeout_secs: 300,
            validate_timeout_secs: 5,
            large_file_loc: 500,
            complex_file_cc: 20,
        }
    }
}

/// Default worker count: bounded by 4 so a laptop-sized analysis never
/// saturates the machine, lower on small hosts.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
        .min(4)
}

impl AnalysisConfig {
    /// Load configuration for a repository: built-in defaults overlaid with
    /// `repopulse.toml` from the repository root when present. A malformed
    /// file is reported and ignored rather than failing the run.
    pub fn load(repo_root: &Path) -> Self {
        let path = repo_root.join(CONFIG_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };

        match toml::from_str::<Self>(&raw) {
            Ok(config) => {
                debug!("Loaded configuration from {}", path.display());
                config
            }
            Err(err) => {
                warn!("Ignoring malformed {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Whether a tracked path passes the extension filter.
    ///
    /// Hidden files are excluded, extensionless files are included only
    /// when on the allow-list, and everything else matches by lower-cased
    /// extension suffix (so multi-part extensions like `.d.ts` work).
    pub fn includes_file(&self, path: &str) -> bool {
        if !self.filter_by_extensions {
            return true;
        }

        let basename = path.rsplit('/').next().unwrap_or(path);
        if basename.starts_with('.') {
            return false;
        }

        if !basename.contains('.') {
            return EXTENSIONLESS_INCLUDES.contains(&basename);
        }

        let lowered = basename.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lowered.ends_with(ext.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = AnalysisConfig::default();
        assert!(config.filter_by_extensions);
        assert!(config.workers >= 1 && config.workers <= 4);
        assert_eq!(config.command_timeout_secs, 300);
        assert_eq!(config.validate_timeout_secs, 5);
        assert!(config.allowed_extensions.contains(".rs"));
    }

    #[test]
    fn test_extensionless_allow_list() {
        let config = AnalysisConfig::default();
        assert!(config.includes_file("Makefile"));
        assert!(config.includes_file("docker/Dockerfile"));
        assert!(!config.includes_file("LICENSE"));
    }

    #[test]
    fn test_dotfiles_are_excluded() {
        let config = AnalysisConfig::default();
        assert!(!config.includes_file(".env"));
        assert!(!config.includes_file("config/.gitignore"));
    }

    #[test]
    fn test_extension_matching() {
        let config = AnalysisConfig::default();
        assert!(config.includes_file("src/main.rs"));
        assert!(config.includes_file("types.d.ts"));
        assert!(config.includes_file("UPPER.PY"));
        assert!(!config.includes_file("image.png"));
    }

    #[test]
    fn test_filter_disabled_includes_everything() {
        let config = AnalysisConfig {
            filter_by_extensions: false,
            ..Default::default()
        };
        assert!(config.includes_file(".env"));
        assert!(config.includes_file("image.png"));
    }

    #[test]
    fn test_load_falls_back_on_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "workers = \"lots\"").unwrap();
        let config = AnalysisConfig::load(dir.path());
        assert_eq!(config.command_timeout_secs, 300);
    }

    #[test]
    fn test_load_overlays_file_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "workers = 2\nfilter_by_extensions = false\n",
        )
        .unwrap();
        let config = AnalysisConfig::load(dir.path());
        assert_eq!(config.workers, 2);
        assert!(!config.filter_by_extensions);
    }
}
