//! Per-language token classification tables
//!
//! A closed set of language descriptors drives the lexical scanner: comment
//! syntax, string forms, keyword sets, and the decision keywords counted
//! for cyclomatic complexity. Adding a language means adding a variant and
//! a table, nothing else.

use serde::Serialize;

/// Languages the lexical analyzer understands. `Other` is a generic
/// C-syntax fallback used for recognized-but-untabled extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    Go,
    Rust,
    Swift,
    Ruby,
    Shell,
    Other,
}

/// Static description of a language's lexical shape.
pub struct LanguageSpec {
    pub line_comment: &'static str,
    pub block_comment: Option<(&'static str, &'static str)>,
    /// Reserved words, classified as operators for Halstead counting.
    pub keywords: &'static [&'static str],
    /// Keywords that open a decision point (McCabe).
    pub decision_keywords: &'static [&'static str],
    /// Subset of decision keywords that are two-way branches.
    pub binary_decision_keywords: &'static [&'static str],
    /// Whether `?` is a ternary decision point.
    pub count_ternary: bool,
    /// Triple-quoted strings (Python).
    pub has_triple_strings: bool,
    /// Backtick template strings (JS/TS).
    pub has_template_strings: bool,
    /// When true, a single quote only opens a literal when the lookahead
    /// shows a short char literal (so Rust lifetimes and Go labels are not
    /// mistaken for strings).
    pub char_literal_only: bool,
    /// Whether the language has a class/type concept; languages without one
    /// are excluded from coupling zone counts instead of scoring zero.
    pub has_types: bool,
}

const PYTHON: LanguageSpec = LanguageSpec {
    line_comment: "#",
    block_comment: None,
    keywords: &[
        "class", "def", "import", "from", "as", "try", "except", "finally", "with", "async",
        "await", "yield", "lambda", "pass", "raise", "global", "nonlocal", "assert", "del",
        "True", "False", "None", "and", "or", "not", "in", "is", "if", "else", "elif", "for",
        "while", "return", "break", "continue",
    ],
    decision_keywords: &["if", "elif", "for", "while", "except", "with", "and", "or"],
    binary_decision_keywords: &["if", "elif", "and", "or"],
    count_ternary: false,
    has_triple_strings: true,
    has_template_strings: false,
    char_literal_only: false,
    has_types: true,
};

const JAVA: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "class", "interface", "enum", "abstract", "final", "static", "public", "private",
        "protected", "extends", "implements", "new", "this", "super", "void", "null", "true",
        "false", "import", "package", "throws", "throw", "try", "catch", "finally",
        "synchronized", "volatile", "transient", "native", "instanceof", "switch", "case",
        "default", "do", "if", "else", "for", "while", "return", "break", "continue",
    ],
    decision_keywords: &["if", "for", "while", "case", "catch"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const JAVASCRIPT: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "class", "function", "const", "let", "var", "import", "export", "from", "default",
        "extends", "new", "this", "super", "async", "await", "yield", "null", "undefined",
        "true", "false", "typeof", "instanceof", "delete", "in", "of", "switch", "case", "do",
        "try", "catch", "finally", "throw", "if", "else", "for", "while", "return", "break",
        "continue",
    ],
    decision_keywords: &["if", "for", "while", "case", "catch"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: true,
    char_literal_only: false,
    has_types: true,
};

const TYPESCRIPT: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "class", "function", "const", "let", "var", "import", "export", "from", "default",
        "extends", "implements", "interface", "type", "enum", "abstract", "new", "this",
        "super", "async", "await", "public", "private", "protected", "readonly", "static",
        "null", "undefined", "true", "false", "typeof", "instanceof", "in", "of", "switch",
        "case", "do", "try", "catch", "finally", "throw", "if", "else", "for", "while",
        "return", "break", "continue",
    ],
    decision_keywords: &["if", "for", "while", "case", "catch"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: true,
    char_literal_only: false,
    has_types: true,
};

const C_LANG: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "struct", "enum", "union", "typedef", "static", "const", "extern", "inline",
        "volatile", "register", "sizeof", "goto", "switch", "case", "default", "do", "void",
        "if", "else", "for", "while", "return", "break", "continue",
    ],
    decision_keywords: &["if", "for", "while", "case"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const CPP: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "class", "struct", "enum", "union", "namespace", "template", "virtual", "override",
        "final", "static", "const", "mutable", "public", "private", "protected", "friend",
        "inline", "extern", "new", "delete", "this", "nullptr", "true", "false", "sizeof",
        "typedef", "using", "typename", "explicit", "operator", "switch", "case", "default",
        "do", "try", "catch", "throw", "if", "else", "for", "while", "return", "break",
        "continue",
    ],
    decision_keywords: &["if", "for", "while", "case", "catch"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const GO: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "func", "type", "struct", "interface", "package", "import", "const", "var", "map",
        "chan", "go", "defer", "select", "case", "default", "range", "nil", "true", "false",
        "iota", "switch", "fallthrough", "if", "else", "for", "return", "break", "continue",
    ],
    decision_keywords: &["if", "for", "case", "select"],
    binary_decision_keywords: &["if"],
    count_ternary: false,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const RUST: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "fn", "struct", "enum", "trait", "impl", "mod", "use", "pub", "crate", "super",
        "self", "Self", "const", "static", "mut", "ref", "let", "match", "loop", "async",
        "await", "move", "dyn", "where", "unsafe", "extern", "in", "as", "type", "true",
        "false", "if", "else", "for", "while", "return", "break", "continue",
    ],
    decision_keywords: &["if", "for", "while", "loop", "match"],
    binary_decision_keywords: &["if"],
    count_ternary: false,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const SWIFT: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &[
        "class", "struct", "enum", "protocol", "extension", "func", "var", "let", "import",
        "public", "private", "internal", "fileprivate", "open", "static", "final", "override",
        "init", "deinit", "self", "Self", "nil", "true", "false", "guard", "switch", "case",
        "default", "do", "try", "catch", "throw", "if", "else", "for", "while", "return",
        "break", "continue", "in",
    ],
    decision_keywords: &["if", "guard", "for", "while", "case", "catch"],
    binary_decision_keywords: &["if", "guard"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: true,
};

const RUBY: LanguageSpec = LanguageSpec {
    line_comment: "#",
    block_comment: Some(("=begin", "=end")),
    keywords: &[
        "class", "module", "def", "end", "require", "require_relative", "include", "extend",
        "attr_accessor", "attr_reader", "attr_writer", "self", "nil", "true", "false", "and",
        "or", "not", "then", "do", "begin", "rescue", "ensure", "raise", "yield", "if",
        "else", "elsif", "unless", "for", "while", "until", "when", "case", "return",
        "break", "next",
    ],
    decision_keywords: &["if", "elsif", "unless", "for", "while", "until", "when", "rescue", "and", "or"],
    binary_decision_keywords: &["if", "elsif", "unless", "and", "or"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: false,
    has_types: true,
};

const SHELL: LanguageSpec = LanguageSpec {
    line_comment: "#",
    block_comment: None,
    keywords: &[
        "function", "local", "export", "readonly", "declare", "source", "exit", "shift",
        "then", "fi", "do", "done", "esac", "in", "if", "else", "elif", "for", "while",
        "until", "case", "return", "break", "continue",
    ],
    decision_keywords: &["if", "elif", "for", "while", "until", "case"],
    binary_decision_keywords: &["if", "elif"],
    count_ternary: false,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: false,
    has_types: false,
};

const OTHER: LanguageSpec = LanguageSpec {
    line_comment: "//",
    block_comment: Some(("/*", "*/")),
    keywords: &["if", "else", "for", "while", "return", "break", "continue", "switch", "case"],
    decision_keywords: &["if", "for", "while", "case"],
    binary_decision_keywords: &["if"],
    count_ternary: true,
    has_triple_strings: false,
    has_template_strings: false,
    char_literal_only: true,
    has_types: false,
};

impl Language {
    /// Classify a path by extension (or well-known extensionless name).
    /// Unrecognized files fall back to the generic C-syntax descriptor.
    pub fn from_path(path: &str) -> Language {
        let basename = path.rsplit('/').next().unwrap_or(path);
        match basename {
            "Makefile" | "Dockerfile" | "CMakeLists" => return Language::Shell,
            "Rakefile" | "Gemfile" => return Language::Ruby,
            _ => {}
        }

        let ext = basename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "py" | "pyi" | "pyx" | "pxd" => Language::Python,
            "java" | "scala" | "kt" | "kts" => Language::Java,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "c" | "h" => Language::C,
            "cc" | "cpp" | "cxx" | "hh" | "hpp" | "hxx" | "cu" | "cuh" | "cl" | "m" | "mm" => {
                Language::Cpp
            }
            "go" => Language::Go,
            "rs" => Language::Rust,
            "swift" => Language::Swift,
            "rb" => Language::Ruby,
            "sh" | "bash" => Language::Shell,
            _ => Language::Other,
        }
    }

    pub fn spec(&self) -> &'static LanguageSpec {
        match self {
            Language::Python => &PYTHON,
            Language::Java => &JAVA,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::C => &C_LANG,
            Language::Cpp => &CPP,
            Language::Go => &GO,
            Language::Rust => &RUST,
            Language::Swift => &SWIFT,
            Language::Ruby => &RUBY,
            Language::Shell => &SHELL,
            Language::Other => &OTHER,
        }
    }

    /// Whether the language participates in class/coupling analysis.
    pub fn has_types(&self) -> bool {
        self.spec().has_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_extensions() {
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("a/b/app.py"), Language::Python);
        assert_eq!(Language::from_path("Widget.TSX"), Language::TypeScript);
        assert_eq!(Language::from_path("native.h"), Language::C);
        assert_eq!(Language::from_path("native.hpp"), Language::Cpp);
        assert_eq!(Language::from_path("unknown.zig"), Language::Other);
    }

    #[test]
    fn test_from_path_extensionless_names() {
        assert_eq!(Language::from_path("Makefile"), Language::Shell);
        assert_eq!(Language::from_path("tools/Rakefile"), Language::Ruby);
    }

    #[test]
    fn test_shell_has_no_types() {
        assert!(!Language::Shell.has_types());
        assert!(Language::Rust.has_types());
    }
}
