//! Lexical metrics calculation
//!
//! A state-machine scanner classifies each physical line (blank, comment,
//! program) and produces a token stream with comments and string bodies
//! resolved, from which Halstead operator/operand counts and McCabe
//! decision counts are derived. Pure functions of file contents; binary or
//! unreadable inputs are handled by callers via [`CodeMetrics::invalid`].

use crate::metrics::language::{Language, LanguageSpec};
use crate::metrics::maintainability;
use crate::models::{CodeMetrics, ComplexityLevel};
use rustc_hash::FxHashSet;

/// Multi-character operators, longest first within each group.
const THREE_CHAR_OPS: &[&str] = &["<<=", ">>=", "===", "!==", "**=", "//=", "..=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "->", "=>", "::", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "??", "?.", "++", "--", "**", "..", ":=",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(String),
    Str(String),
    Op(String),
}

#[derive(Debug, Default)]
struct Scan {
    tokens: Vec<Token>,
    loc_physical: usize,
    loc_blank: usize,
    loc_comment: usize,
    loc_program: usize,
}

/// Compute the full lexical metric set for one file.
///
/// The result satisfies `loc_physical == loc_program + loc_comment +
/// loc_blank` by construction. Maintainability fields are filled in from
/// the computed LOC/volume/complexity values.
pub fn analyze_source(text: &str, language: Language) -> CodeMetrics {
    let spec = language.spec();
    let scan = scan(text, spec);

    let mut metrics = CodeMetrics {
        loc_physical: scan.loc_physical,
        loc_program: scan.loc_program,
        loc_comment: scan.loc_comment,
        loc_blank: scan.loc_blank,
        comment_ratio: scan.loc_comment as f64 / scan.loc_program.max(1) as f64,
        ..CodeMetrics::default()
    };

    apply_halstead(&mut metrics, &scan.tokens, spec);
    apply_mccabe(&mut metrics, &scan.tokens, spec);
    maintainability::apply(&mut metrics);
    metrics
}

/// Remove comments from source text, keeping string literals and newlines
/// in place. Used by the coupling analyzer, whose import patterns need to
/// see quoted module paths.
pub fn strip_comments(text: &str, language: Language) -> String {
    let spec = language.spec();
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    #[derive(PartialEq)]
    enum State {
        Normal,
        LineComment,
        BlockComment,
        Str(char),
    }

    let mut state = State::Normal;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            if state == State::LineComment {
                state = State::Normal;
            }
            out.push('\n');
            i += 1;
            continue;
        }

        match state {
            State::Normal => {
                if starts_with(&chars, i, spec.line_comment) {
                    state = State::LineComment;
                    i += spec.line_comment.len();
                } else if let Some((open, _)) = spec.block_comment {
                    if starts_with(&chars, i, open) {
                        state = State::BlockComment;
                        i += open.len();
                    } else if is_string_open(&chars, i, c, spec) {
                        state = State::Str(c);
                        out.push(c);
                        i += 1;
                    } else {
                        out.push(c);
                        i += 1;
                    }
                } else if is_string_open(&chars, i, c, spec) {
                    state = State::Str(c);
                    out.push(c);
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            State::LineComment => i += 1,
            State::BlockComment => {
                if let Some((_, close)) = spec.block_comment {
                    if starts_with(&chars, i, close) {
                        state = State::Normal;
                        i += close.len();
                        continue;
                    }
                }
                i += 1;
            }
            State::Str(delim) => {
                out.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    out.push(chars[i + 1]);
                    i += 2;
                } else {
                    if c == delim {
                        state = State::Normal;
                    }
                    i += 1;
                }
            }
        }
    }
    out
}

fn is_string_open(chars: &[char], i: usize, c: char, spec: &LanguageSpec) -> bool {
    match c {
        '"' => true,
        '`' => spec.has_template_strings,
        '\'' => {
            if !spec.char_literal_only {
                return true;
            }
            // Short lookahead: 'x' or an escape. Anything else (a Rust
            // lifetime, a Go label) is not a literal.
            matches!(chars.get(i + 1), Some('\\'))
                || matches!(chars.get(i + 2), Some('\''))
        }
        _ => false,
    }
}

fn starts_with(chars: &[char], i: usize, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    chars[i..]
        .iter()
        .zip(needle.chars())
        .filter(|(a, b)| **a == *b)
        .count()
        == needle.chars().count()
}

fn scan(text: &str, spec: &LanguageSpec) -> Scan {
    enum State {
        Normal,
        LineComment,
        BlockComment,
        /// delim char, closing length (1 or 3 for triple quotes).
        Str(char, usize),
    }

    let chars: Vec<char> = text.chars().collect();
    let mut scan = Scan::default();
    let mut state = State::Normal;
    let mut literal = String::new();

    let mut has_code = false;
    let mut has_comment = false;
    let mut since_newline = false;

    let finish_line = |scan: &mut Scan, has_code: &mut bool, has_comment: &mut bool| {
        scan.loc_physical += 1;
        if *has_code {
            scan.loc_program += 1;
        } else if *has_comment {
            scan.loc_comment += 1;
        } else {
            scan.loc_blank += 1;
        }
        *has_code = false;
        *has_comment = false;
    };

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            if matches!(state, State::LineComment) {
                state = State::Normal;
            }
            finish_line(&mut scan, &mut has_code, &mut has_comment);
            since_newline = false;
            i += 1;
            continue;
        }
        since_newline = true;

        match state {
            State::Normal => {
                if c.is_whitespace() {
                    i += 1;
                } else if starts_with(&chars, i, spec.line_comment) {
                    state = State::LineComment;
                    has_comment = true;
                    i += spec.line_comment.len();
                } else if spec
                    .block_comment
                    .is_some_and(|(open, _)| starts_with(&chars, i, open))
                {
                    let (open, _) = spec.block_comment.unwrap_or(("", ""));
                    state = State::BlockComment;
                    has_comment = true;
                    i += open.len();
                } else if is_string_open(&chars, i, c, spec) {
                    has_code = true;
                    literal.clear();
                    if spec.has_triple_strings
                        && c != '`'
                        && starts_with(&chars, i, &c.to_string().repeat(3))
                    {
                        state = State::Str(c, 3);
                        i += 3;
                    } else {
                        state = State::Str(c, 1);
                        i += 1;
                    }
                } else if c.is_alphabetic() || c == '_' {
                    has_code = true;
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    scan.tokens
                        .push(Token::Word(chars[start..i].iter().collect()));
                } else if c.is_ascii_digit() {
                    has_code = true;
                    let start = i;
                    while i < chars.len()
                        && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                    {
                        i += 1;
                    }
                    scan.tokens
                        .push(Token::Number(chars[start..i].iter().collect()));
                } else {
                    has_code = true;
                    let op = munch_operator(&chars, i);
                    i += op.chars().count();
                    scan.tokens.push(Token::Op(op));
                }
            }
            State::LineComment => i += 1,
            State::BlockComment => {
                if let Some((_, close)) = spec.block_comment {
                    if starts_with(&chars, i, close) {
                        state = State::Normal;
                        i += close.len();
                        continue;
                    }
                }
                if !c.is_whitespace() {
                    has_comment = true;
                }
                i += 1;
            }
            State::Str(delim, close_len) => {
                if c == '\\' && i + 1 < chars.len() {
                    literal.push(chars[i + 1]);
                    i += 2;
                } else if close_len == 3 && starts_with(&chars, i, &delim.to_string().repeat(3)) {
                    scan.tokens.push(Token::Str(std::mem::take(&mut literal)));
                    state = State::Normal;
                    i += 3;
                } else if close_len == 1 && c == delim {
                    scan.tokens.push(Token::Str(std::mem::take(&mut literal)));
                    state = State::Normal;
                    i += 1;
                } else {
                    if !c.is_whitespace() {
                        has_code = true;
                    }
                    literal.push(c);
                    i += 1;
                }
            }
        }
    }

    // Unterminated string at EOF still contributes an operand.
    if !literal.is_empty() {
        scan.tokens.push(Token::Str(literal));
    }

    if since_newline {
        finish_line(&mut scan, &mut has_code, &mut has_comment);
    }

    scan
}

fn munch_operator(chars: &[char], i: usize) -> String {
    for op in THREE_CHAR_OPS {
        if starts_with(chars, i, op) {
            return op.to_string();
        }
    }
    for op in TWO_CHAR_OPS {
        if starts_with(chars, i, op) {
            return op.to_string();
        }
    }
    chars[i].to_string()
}

fn apply_halstead(metrics: &mut CodeMetrics, tokens: &[Token], spec: &LanguageSpec) {
    let mut distinct_operators: FxHashSet<&str> = FxHashSet::default();
    let mut distinct_operands: FxHashSet<&str> = FxHashSet::default();
    let mut total_operators = 0usize;
    let mut total_operands = 0usize;

    for token in tokens {
        match token {
            Token::Word(w) if spec.keywords.contains(&w.as_str()) => {
                distinct_operators.insert(w);
                total_operators += 1;
            }
            Token::Op(o) => {
                distinct_operators.insert(o);
                total_operators += 1;
            }
            Token::Word(w) => {
                distinct_operands.insert(w);
                total_operands += 1;
            }
            Token::Number(x) | Token::Str(x) => {
                distinct_operands.insert(x);
                total_operands += 1;
            }
        }
    }

    let n1 = distinct_operators.len();
    let n2 = distinct_operands.len();
    metrics.distinct_operators = n1;
    metrics.distinct_operands = n2;
    metrics.total_operators = total_operators;
    metrics.total_operands = total_operands;

    let vocabulary = n1 + n2;
    metrics.volume = if vocabulary <= 1 {
        0.0
    } else {
        (total_operators + total_operands) as f64 * (vocabulary as f64).log2()
    };
    metrics.difficulty = (n1 as f64 / 2.0) * (total_operands as f64 / n2.max(1) as f64);
    metrics.effort = metrics.volume * metrics.difficulty;
    metrics.bugs = metrics.volume / 3000.0;
}

fn apply_mccabe(metrics: &mut CodeMetrics, tokens: &[Token], spec: &LanguageSpec) {
    let mut decisions = 0u32;
    let mut binary = 0u32;

    for token in tokens {
        match token {
            Token::Word(w) => {
                if spec.decision_keywords.contains(&w.as_str()) {
                    decisions += 1;
                }
                if spec.binary_decision_keywords.contains(&w.as_str()) {
                    binary += 1;
                }
            }
            Token::Op(o) => match o.as_str() {
                "&&" | "||" => {
                    decisions += 1;
                    binary += 1;
                }
                "?" if spec.count_ternary => {
                    decisions += 1;
                    binary += 1;
                }
                _ => {}
            },
            _ => {}
        }
    }

    metrics.cyclomatic_complexity = 1 + decisions;
    metrics.binary_decisions = binary;
    metrics.complexity_level = ComplexityLevel::from_complexity(metrics.cyclomatic_complexity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaintainabilityStatus;

    const RUST_SAMPLE: &str = r#"
// Frobnicates widgets.
fn frobnicate(x: i32) -> i32 {
    /* block
       comment */
    if x > 0 && x < 100 {
        x * 2
    } else {
        0
    }
}
"#;

    #[test]
    fn test_loc_identity_holds() {
        let m = analyze_source(RUST_SAMPLE, Language::Rust);
        assert_eq!(
            m.loc_physical,
            m.loc_program + m.loc_comment + m.loc_blank
        );
        assert_eq!(m.loc_physical, 11);
        assert_eq!(m.loc_blank, 1);
        assert_eq!(m.loc_comment, 3);
        assert_eq!(m.loc_program, 7);
    }

    #[test]
    fn test_mccabe_counts_decisions() {
        // if + && = 2 decisions on top of the base path.
        let m = analyze_source(RUST_SAMPLE, Language::Rust);
        assert_eq!(m.cyclomatic_complexity, 3);
        assert_eq!(m.binary_decisions, 2);
        assert_eq!(m.complexity_level, crate::models::ComplexityLevel::Simple);
    }

    #[test]
    fn test_python_comment_syntax() {
        let src = "# leading comment\nx = 1  # trailing does not make this a comment line\n\ndef f():\n    pass\n";
        let m = analyze_source(src, Language::Python);
        assert_eq!(m.loc_physical, 5);
        assert_eq!(m.loc_comment, 1);
        assert_eq!(m.loc_blank, 1);
        assert_eq!(m.loc_program, 3);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_code() {
        let src = "let s = \"// not a comment\";\n";
        let m = analyze_source(src, Language::Rust);
        assert_eq!(m.loc_comment, 0);
        assert_eq!(m.loc_program, 1);
    }

    #[test]
    fn test_single_token_volume_is_zero() {
        let m = analyze_source("x", Language::Rust);
        assert_eq!(m.volume, 0.0);
        assert_eq!(m.difficulty, 0.0);
        assert!(m.effort == 0.0 && m.bugs == 0.0);
        assert!(m.maintainability_index_raw.is_finite());
    }

    #[test]
    fn test_empty_source() {
        let m = analyze_source("", Language::Rust);
        assert_eq!(m.loc_physical, 0);
        assert_eq!(m.cyclomatic_complexity, 1);
        assert_eq!(m.volume, 0.0);
        assert!(m.is_valid);
    }

    #[test]
    fn test_halstead_totals_cover_distincts() {
        let m = analyze_source("a = a + a + b;", Language::JavaScript);
        assert!(m.total_operands >= m.distinct_operands);
        assert!(m.total_operators >= m.distinct_operators);
        assert_eq!(m.distinct_operands, 2);
        assert_eq!(m.total_operands, 4);
    }

    #[test]
    fn test_comment_ratio_uses_program_lines() {
        let src = "// one\n// two\nlet x = 1;\n";
        let m = analyze_source(src, Language::Rust);
        assert!((m.comment_ratio - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_comment_only_file_has_sane_ratio() {
        let m = analyze_source("// a\n// b\n", Language::Rust);
        assert_eq!(m.loc_program, 0);
        // Denominator is clamped to 1.
        assert!((m.comment_ratio - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ternary_counted_for_c_family() {
        let m = analyze_source("int y = x > 0 ? 1 : 0;", Language::C);
        assert_eq!(m.cyclomatic_complexity, 2);
        assert_eq!(m.binary_decisions, 1);
    }

    #[test]
    fn test_rust_lifetimes_are_not_strings() {
        let src = "fn first<'a>(v: &'a [u32]) -> &'a u32 {\n    &v[0]\n}\n";
        let m = analyze_source(src, Language::Rust);
        // If the lifetime quote opened a string the whole body would be
        // swallowed into one operand; the program-line count catches that.
        assert_eq!(m.loc_program, 3);
        assert!(m.distinct_operators >= 3);
    }

    #[test]
    fn test_triple_quoted_string_is_one_operand() {
        let src = "x = \"\"\"first\nsecond\n\"\"\"\n";
        let m = analyze_source(src, Language::Python);
        assert_eq!(m.loc_comment, 0);
        assert_eq!(m.loc_physical, 3);
        assert_eq!(m.total_operands, 2); // x + the literal
    }

    #[test]
    fn test_strip_comments_keeps_strings() {
        let src = "import x from \"./mod\"; // tail\n/* gone */ const y = 1;\n";
        let stripped = strip_comments(src, Language::JavaScript);
        assert!(stripped.contains("\"./mod\""));
        assert!(!stripped.contains("tail"));
        assert!(!stripped.contains("gone"));
        assert!(stripped.contains("const y = 1;"));
    }

    #[test]
    fn test_rescoring_is_deterministic() {
        let a = analyze_source(RUST_SAMPLE, Language::Rust);
        let b = analyze_source(RUST_SAMPLE, Language::Rust);
        assert_eq!(a, b);
        assert_eq!(a.maintainability_status, b.maintainability_status);
        assert_eq!(a.maintainability_status, MaintainabilityStatus::Good);
    }
}
