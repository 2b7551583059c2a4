//! Comment syntax and the directive grammar built on top of it.

mod cache;
mod keyword;
mod languages;
mod parse;

pub use cache::GrammarCache;
pub use keyword::Keyword;
pub use languages::{
    known_extensions, language_by_id, resolve_language, BlockComment, Language, GENERIC,
    LANGUAGES,
};
pub use parse::{parse_line, Directive, Grammar};
