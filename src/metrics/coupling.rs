//! Coupling and design-balance analysis
//!
//! Two stages. The per-file stage is pure and parallel-safe: regex pattern
//! sets (per language) count classes, abstract types, interfaces, methods,
//! and attributes, and collect raw import/include targets from
//! comment-stripped source. The resolution stage is sequential: import
//! targets are matched against the repository's file set to build a
//! directed dependency graph, from which efferent/afferent coupling and the
//! Distance-from-Main-Sequence metrics are derived.
//!
//! This is heuristic token/pattern matching, not a resolver: an import that
//! cannot be matched to a repository file simply contributes no edge.

use crate::metrics::language::Language;
use crate::metrics::lexical;
use crate::models::{CouplingMetrics, DesignZone};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Raw object-oriented counts for one file, before graph resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OopCounts {
    pub classes: u32,
    pub abstract_classes: u32,
    pub interfaces: u32,
    pub methods: u32,
    pub attributes: u32,
    /// Deduplicated import/include targets, sorted for determinism.
    pub imports: Vec<String>,
}

/// Source-file extensions stripped from import targets before matching.
const STRIPPABLE_EXTENSIONS: &[&str] = &[
    "js", "mjs", "cjs", "jsx", "ts", "tsx", "py", "rb", "go", "rs", "h", "hh", "hpp", "hxx",
    "c", "cc", "cpp", "cxx", "java", "swift",
];

struct PatternSpec {
    imports: &'static [&'static str],
    classes: &'static [&'static str],
    abstract_classes: &'static [&'static str],
    interfaces: &'static [&'static str],
    methods: &'static [&'static str],
    attributes: &'static [&'static str],
    /// Interfaces/traits/protocols also count as abstract types.
    interfaces_are_abstract: bool,
    /// Count distinct captured attribute names instead of raw matches.
    distinct_attributes: bool,
}

const PYTHON_PATTERNS: PatternSpec = PatternSpec {
    imports: &[
        r"(?m)^\s*from\s+([\w.]+)\s+import",
        r"(?m)^\s*import\s+([\w.]+)",
    ],
    classes: &[r"(?m)^class\s+(\w+)"],
    abstract_classes: &[r"(?m)^class\s+\w+\s*\([^)]*\bABC\b[^)]*\)"],
    interfaces: &[],
    methods: &[r"(?m)^\s+def\s+(\w+)\s*\("],
    attributes: &[r"self\.(\w+)\s*="],
    interfaces_are_abstract: false,
    distinct_attributes: true,
};

const JAVA_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r"(?m)^\s*import\s+(?:static\s+)?([\w.]+)"],
    classes: &[r"\bclass\s+(\w+)", r"\benum\s+(\w+)"],
    abstract_classes: &[r"\babstract\s+(?:\w+\s+)*class\s+(\w+)"],
    interfaces: &[r"\binterface\s+(\w+)"],
    methods: &[r"(?m)\b(?:public|private|protected)\b[^;={}]*\([^)]*\)\s*\{"],
    attributes: &[r"(?m)^\s*(?:public|private|protected)\s+[\w<>\[\],\s]+\s+(\w+)\s*[=;]"],
    interfaces_are_abstract: true,
    distinct_attributes: false,
};

const JAVASCRIPT_PATTERNS: PatternSpec = PatternSpec {
    imports: &[
        r#"import\s+[^;]*?from\s+['"]([@\w./-]+)['"]"#,
        r#"\brequire\s*\(\s*['"]([@\w./-]+)['"]"#,
    ],
    classes: &[r"\bclass\s+(\w+)"],
    abstract_classes: &[],
    interfaces: &[],
    methods: &[r"\bfunction\s+(\w+)\s*\(", r"\b(\w+)\s*:\s*(?:async\s+)?\([^)]*\)\s*=>"],
    attributes: &[r"this\.(\w+)\s*="],
    interfaces_are_abstract: false,
    distinct_attributes: true,
};

const TYPESCRIPT_PATTERNS: PatternSpec = PatternSpec {
    imports: &[
        r#"import\s+[^;]*?from\s+['"]([@\w./-]+)['"]"#,
        r#"\brequire\s*\(\s*['"]([@\w./-]+)['"]"#,
    ],
    classes: &[r"\bclass\s+(\w+)"],
    abstract_classes: &[r"\babstract\s+class\s+(\w+)"],
    interfaces: &[r"\binterface\s+(\w+)"],
    methods: &[r"\bfunction\s+(\w+)\s*\(", r"\b(\w+)\s*:\s*(?:async\s+)?\([^)]*\)\s*=>"],
    attributes: &[r"this\.(\w+)\s*="],
    interfaces_are_abstract: true,
    distinct_attributes: true,
};

const C_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r#"#include\s*[<"]([\w./+-]+)[>"]"#],
    classes: &[r"\bstruct\s+(\w+)", r"\benum\s+(\w+)", r"\bunion\s+(\w+)"],
    abstract_classes: &[],
    interfaces: &[],
    methods: &[r"(?m)^\w[\w\s\*]*\s\*?(\w+)\s*\([^;)]*\)\s*\{"],
    attributes: &[],
    interfaces_are_abstract: false,
    distinct_attributes: false,
};

const CPP_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r#"#include\s*[<"]([\w./+-]+)[>"]"#],
    classes: &[r"\bclass\s+(\w+)", r"\bstruct\s+(\w+)"],
    abstract_classes: &[r"\bvirtual\b[^;{]*=\s*0\s*;"],
    interfaces: &[],
    methods: &[r"\b(\w+)\s*\([^;)]*\)\s*(?:const\s*)?\{"],
    attributes: &[],
    interfaces_are_abstract: false,
    distinct_attributes: false,
};

const GO_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r#"\bimport\s+"([\w./-]+)""#],
    classes: &[r"\btype\s+(\w+)\s+struct\b"],
    abstract_classes: &[],
    interfaces: &[r"\btype\s+(\w+)\s+interface\b"],
    methods: &[r"\bfunc\s*\([^)]*\)\s*(\w+)\s*\("],
    attributes: &[],
    interfaces_are_abstract: true,
    distinct_attributes: false,
};

const RUST_PATTERNS: PatternSpec = PatternSpec {
    imports: &[
        r"\buse\s+([\w:]+)",
        r"\bextern\s+crate\s+(\w+)",
        r"\bmod\s+(\w+)\s*;",
    ],
    classes: &[r"\bstruct\s+(\w+)", r"\benum\s+(\w+)"],
    abstract_classes: &[],
    interfaces: &[r"\btrait\s+(\w+)"],
    methods: &[r"\bfn\s+(\w+)\s*\("],
    attributes: &[],
    interfaces_are_abstract: true,
    distinct_attributes: false,
};

const SWIFT_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r"\bimport\s+(\w+)"],
    classes: &[r"\bclass\s+(\w+)", r"\bstruct\s+(\w+)"],
    abstract_classes: &[],
    interfaces: &[r"\bprotocol\s+(\w+)"],
    methods: &[r"\bfunc\s+(\w+)\s*\("],
    attributes: &[r"\b(?:var|let)\s+(\w+)\s*:"],
    interfaces_are_abstract: true,
    distinct_attributes: false,
};

const RUBY_PATTERNS: PatternSpec = PatternSpec {
    imports: &[r#"\brequire(?:_relative)?\s+['"]([\w./-]+)['"]"#],
    classes: &[r"(?m)^\s*class\s+(\w+)"],
    abstract_classes: &[],
    interfaces: &[r"(?m)^\s*module\s+(\w+)"],
    methods: &[r"(?m)^\s*def\s+(\w+)"],
    attributes: &[r"@(\w+)\s*="],
    interfaces_are_abstract: true,
    distinct_attributes: true,
};

fn pattern_spec(language: Language) -> Option<&'static PatternSpec> {
    match language {
        Language::Python => Some(&PYTHON_PATTERNS),
        Language::Java => Some(&JAVA_PATTERNS),
        Language::JavaScript => Some(&JAVASCRIPT_PATTERNS),
        Language::TypeScript => Some(&TYPESCRIPT_PATTERNS),
        Language::C => Some(&C_PATTERNS),
        Language::Cpp => Some(&CPP_PATTERNS),
        Language::Go => Some(&GO_PATTERNS),
        Language::Rust => Some(&RUST_PATTERNS),
        Language::Swift => Some(&SWIFT_PATTERNS),
        Language::Ruby => Some(&RUBY_PATTERNS),
        Language::Shell | Language::Other => None,
    }
}

struct CompiledPatterns {
    imports: Vec<Regex>,
    classes: Vec<Regex>,
    abstract_classes: Vec<Regex>,
    interfaces: Vec<Regex>,
    methods: Vec<Regex>,
    attributes: Vec<Regex>,
    interfaces_are_abstract: bool,
    distinct_attributes: bool,
}

impl CompiledPatterns {
    fn compile(spec: &PatternSpec) -> Self {
        let build = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect::<Vec<_>>()
        };
        Self {
            imports: build(spec.imports),
            classes: build(spec.classes),
            abstract_classes: build(spec.abstract_classes),
            interfaces: build(spec.interfaces),
            methods: build(spec.methods),
            attributes: build(spec.attributes),
            interfaces_are_abstract: spec.interfaces_are_abstract,
            distinct_attributes: spec.distinct_attributes,
        }
    }
}

/// Compiled per-language pattern sets. Built once per analysis run and
/// shared read-only across workers.
pub struct OopMatcher {
    compiled: FxHashMap<Language, CompiledPatterns>,
}

impl Default for OopMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl OopMatcher {
    pub fn new() -> Self {
        let languages = [
            Language::Python,
            Language::Java,
            Language::JavaScript,
            Language::TypeScript,
            Language::C,
            Language::Cpp,
            Language::Go,
            Language::Rust,
            Language::Swift,
            Language::Ruby,
        ];
        let compiled = languages
            .into_iter()
            .filter_map(|lang| pattern_spec(lang).map(|s| (lang, CompiledPatterns::compile(s))))
            .collect();
        Self { compiled }
    }

    /// Count OOP constructs and collect import targets for one file.
    /// Returns `None` for languages without a class/module concept, which
    /// keeps them out of the zone statistics entirely.
    pub fn scan(&self, text: &str, language: Language) -> Option<OopCounts> {
        let compiled = self.compiled.get(&language)?;
        let cleaned = lexical::strip_comments(text, language);

        let mut counts = OopCounts {
            classes: count_matches(&compiled.classes, &cleaned),
            abstract_classes: count_matches(&compiled.abstract_classes, &cleaned),
            interfaces: count_matches(&compiled.interfaces, &cleaned),
            methods: count_matches(&compiled.methods, &cleaned),
            ..OopCounts::default()
        };

        if compiled.interfaces_are_abstract {
            counts.abstract_classes += counts.interfaces;
        }

        counts.attributes = if compiled.distinct_attributes {
            distinct_captures(&compiled.attributes, &cleaned).len() as u32
        } else {
            count_matches(&compiled.attributes, &cleaned)
        };

        // Decorator-only abstract classes: no ABC base, but at least one
        // @abstractmethod means the file defines an abstract class.
        if language == Language::Python
            && counts.abstract_classes == 0
            && counts.classes > 0
            && cleaned.contains("@abstractmethod")
        {
            counts.abstract_classes = 1;
        }

        let mut imports = distinct_captures(&compiled.imports, &cleaned);
        if language == Language::Go {
            imports.extend(go_import_block_targets(&cleaned));
        }
        let mut imports: Vec<String> = imports.into_iter().collect();
        imports.sort();
        imports.dedup();
        counts.imports = imports;

        Some(counts)
    }
}

fn count_matches(patterns: &[Regex], text: &str) -> u32 {
    patterns
        .iter()
        .map(|re| re.find_iter(text).count() as u32)
        .sum()
}

fn distinct_captures(patterns: &[Regex], text: &str) -> FxHashSet<String> {
    let mut seen = FxHashSet::default();
    for re in patterns {
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                seen.insert(m.as_str().to_string());
            }
        }
    }
    seen
}

/// Grouped `import ( ... )` blocks get their quoted entries extracted with
/// a second pass; the single-line pattern cannot reach inside them.
fn go_import_block_targets(text: &str) -> FxHashSet<String> {
    static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
    static ENTRY_RE: OnceLock<Regex> = OnceLock::new();
    let block_re = BLOCK_RE.get_or_init(|| Regex::new(r"(?s)\bimport\s*\(([^)]*)\)").unwrap());
    let entry_re = ENTRY_RE.get_or_init(|| Regex::new(r#""([\w./-]+)""#).unwrap());

    let mut targets = FxHashSet::default();
    for block in block_re.captures_iter(text) {
        if let Some(body) = block.get(1) {
            for entry in entry_re.captures_iter(body.as_str()) {
                if let Some(m) = entry.get(1) {
                    targets.insert(m.as_str().to_string());
                }
            }
        }
    }
    targets
}

/// Derive instability, abstractness, distance, and zone from raw counts.
///
/// Instability is defined as 0 for an uncoupled file; abstractness is
/// clamped to 1 (interfaces count as abstract types but not as classes, so
/// the raw ratio can exceed the unit square).
pub fn derive_metrics(ce: u32, ca: u32, classes: u32, abstract_classes: u32) -> CouplingMetrics {
    let instability = if ce + ca == 0 {
        0.0
    } else {
        f64::from(ce) / f64::from(ce + ca)
    };
    let abstractness = (f64::from(abstract_classes) / f64::from(classes.max(1))).min(1.0);
    let distance = (abstractness + instability - 1.0).abs();

    CouplingMetrics {
        efferent: ce,
        afferent: ca,
        instability,
        abstractness,
        distance,
        zone: classify_zone(abstractness, instability, distance),
    }
}

/// Zone classification. The 0.2-0.4 band is reported but deliberately not
/// zoned; beyond it the pain/uselessness corners require the stable-concrete
/// and abstract-unstable extremes respectively.
pub fn classify_zone(abstractness: f64, instability: f64, distance: f64) -> DesignZone {
    if distance < 0.2 {
        DesignZone::MainSequence
    } else if distance <= 0.4 {
        DesignZone::Moderate
    } else if abstractness < 0.3 && instability < 0.3 {
        DesignZone::ZoneOfPain
    } else if abstractness > 0.7 && instability > 0.7 {
        DesignZone::ZoneOfUselessness
    } else {
        DesignZone::Unbalanced
    }
}

/// Resolve import targets against the repository's own files and compute
/// per-file coupling metrics from the resulting dependency graph.
pub fn resolve_graph(files: &BTreeMap<String, OopCounts>) -> BTreeMap<String, CouplingMetrics> {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let mut nodes: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    let mut stems: FxHashMap<String, Vec<&str>> = FxHashMap::default();

    for path in files.keys() {
        let node = graph.add_node(());
        nodes.insert(path.as_str(), node);
        stems
            .entry(file_stem(path).to_string())
            .or_default()
            .push(path.as_str());
    }

    for (path, counts) in files {
        let from = nodes[path.as_str()];
        for target in &counts.imports {
            let norm = normalize_target(target);
            if norm.is_empty() {
                continue;
            }

            let mut matched: Vec<&str> = files
                .keys()
                .map(|p| p.as_str())
                .filter(|p| *p != path.as_str() && suffix_matches(p, &norm))
                .collect();

            if matched.is_empty() && !norm.contains('/') {
                if let Some(candidates) = stems.get(norm.as_str()) {
                    matched = candidates
                        .iter()
                        .copied()
                        .filter(|p| *p != path.as_str())
                        .collect();
                }
            }

            for target_path in matched {
                graph.update_edge(from, nodes[target_path], ());
            }
        }
    }

    files
        .iter()
        .map(|(path, counts)| {
            let node = nodes[path.as_str()];
            let ce = graph.edges_directed(node, Direction::Outgoing).count() as u32;
            let ca = graph.edges_directed(node, Direction::Incoming).count() as u32;
            (
                path.clone(),
                derive_metrics(ce, ca, counts.classes, counts.abstract_classes),
            )
        })
        .collect()
}

/// Aggregate per-file coupling into package groups (one group per parent
/// directory, `.` for the repository root): Ce/Ca and type counts are
/// summed over the group's files, then the derived metrics are recomputed
/// from the sums.
pub fn package_metrics(
    counts: &BTreeMap<String, OopCounts>,
    resolved: &BTreeMap<String, CouplingMetrics>,
) -> BTreeMap<String, CouplingMetrics> {
    #[derive(Default)]
    struct Group {
        ce: u32,
        ca: u32,
        classes: u32,
        abstract_classes: u32,
    }

    let mut grouped: BTreeMap<String, Group> = BTreeMap::new();
    for (path, coupling) in resolved {
        let group = grouped.entry(parent_dir(path)).or_default();
        group.ce += coupling.efferent;
        group.ca += coupling.afferent;
        if let Some(file_counts) = counts.get(path) {
            group.classes += file_counts.classes;
            group.abstract_classes += file_counts.abstract_classes;
        }
    }

    grouped
        .into_iter()
        .map(|(dir, g)| (dir, derive_metrics(g.ce, g.ca, g.classes, g.abstract_classes)))
        .collect()
}

fn parent_dir(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_else(|| ".".to_string())
}

/// Normalize an import target into a path fragment: module separators
/// become slashes, relative prefixes and source extensions are dropped,
/// and Rust's crate-relative prefixes are stripped.
fn normalize_target(raw: &str) -> String {
    let mut t = raw.trim();
    loop {
        if let Some(rest) = t.strip_prefix("./") {
            t = rest;
        } else if let Some(rest) = t.strip_prefix("../") {
            t = rest;
        } else {
            break;
        }
    }

    let mut t = t.replace("::", "/");
    if let Some((base, ext)) = t.rsplit_once('.') {
        if STRIPPABLE_EXTENSIONS.contains(&ext) {
            t = base.to_string();
        }
    }
    if !t.contains('/') {
        t = t.replace('.', "/");
    }

    let mut segments: Vec<&str> = t.split('/').filter(|s| !s.is_empty()).collect();
    while matches!(segments.first(), Some(&"crate") | Some(&"super") | Some(&"self")) {
        segments.remove(0);
    }
    segments.join("/")
}

fn suffix_matches(path: &str, norm: &str) -> bool {
    let noext = strip_extension(path);
    noext == norm || noext.ends_with(&format!("/{norm}"))
}

/// Drop the extension of the final path segment only; dots in directory
/// names stay untouched.
fn strip_extension(path: &str) -> &str {
    match (path.rfind('.'), path.rfind('/')) {
        (Some(dot), Some(slash)) if dot > slash => &path[..dot],
        (Some(dot), None) => &path[..dot],
        _ => path,
    }
}

fn file_stem(path: &str) -> &str {
    let basename = path.rsplit('/').next().unwrap_or(path);
    basename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(basename)
}
