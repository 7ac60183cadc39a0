//! Static-analysis metrics: lexical (LOC, Halstead, McCabe),
//! maintainability, and coupling/design-balance.

pub mod coupling;
pub mod language;
pub mod lexical;
pub mod maintainability;

pub use language::Language;
