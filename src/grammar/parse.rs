//! Directive grammar: one raw line in, at most one directive out.
//!
//! A line matches when it carries a comment (introduced by the language's
//! line marker, or a one-line block comment) and that comment mentions a
//! directive keyword. Comments following the `TITLE | BODY` shape also yield a
//! title and body, and `#token`s yield labels:
//!
//! - `x = 1  # TODO cache this` -> keywords only
//! - `# TODO Titled Issue! | body text #label` -> title, body, labels
//!
//! Parsing never fails: a line the grammar cannot make sense of is simply not
//! a directive.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use super::{Keyword, Language};

lazy_static! {
    /// Directive keywords as whole words, any case.
    static ref KEYWORD_PATTERN: Regex = Regex::new(r"(?i)\b(todo|fixme)\b").unwrap();

    /// Label candidates: `#` followed by a run of non-space characters.
    static ref LABEL_PATTERN: Regex = Regex::new(r"#([^\s#]+)").unwrap();

    /// A `#token` that is really a keyword occurrence, e.g. `#todo` or `#FIXME:`.
    static ref KEYWORD_TOKEN: Regex = Regex::new(r"(?i)^(todo|fixme)\b").unwrap();
}

/// A matched directive line, before it is located in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Keyword classes mentioned in the comment (never empty)
    pub keywords: BTreeSet<Keyword>,
    /// The line, reassembled from its code and comment segments
    pub line: String,
    pub title: Option<String>,
    pub body: Option<String>,
    /// `#labels`; `None` rather than empty when there are none
    pub labels: Option<BTreeSet<String>>,
}

/// Directive grammar for a single language.
///
/// Building a grammar only captures the language's comment syntax; parsing
/// is stateless, so one grammar can serve any number of threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    language: &'static Language,
    /// Delimiters that may open a comment, in priority order
    openers: Vec<(&'static str, Option<&'static str>)>,
}

impl Grammar {
    /// Build the grammar for a language.
    pub fn build(language: &'static Language) -> Self {
        let mut openers = vec![(language.line_comment, None)];
        if let Some(block) = language.block_comment {
            openers.push((block.start, Some(block.end)));
        }
        Self { language, openers }
    }

    /// The language this grammar was built for.
    pub fn language(&self) -> &'static Language {
        self.language
    }

    /// Parse one line of source text.
    pub fn parse_line(&self, line: &str) -> Option<Directive> {
        let span = self.split_comment(line)?;

        let keywords: BTreeSet<Keyword> = KEYWORD_PATTERN
            .find_iter(span.comment)
            .filter_map(|m| Keyword::parse(m.as_str()))
            .collect();
        if keywords.is_empty() {
            return None;
        }

        let (title, body) = match span.structured() {
            Some((title, body)) => (Some(title), Some(body)),
            None => (None, None),
        };

        let labels = match &body {
            Some(body) => extract_labels(body),
            None => extract_labels(span.content()),
        };

        Some(Directive {
            keywords,
            line: format!("{}{}", span.code, span.comment),
            title,
            body,
            labels,
        })
    }

    /// Split a line at the earliest comment opener.
    fn split_comment<'a>(&self, line: &'a str) -> Option<CommentSpan<'a>> {
        let mut best: Option<(usize, &'static str, Option<&'static str>)> = None;

        for &(opener, closer) in &self.openers {
            if opener.is_empty() {
                continue;
            }
            if let Some(pos) = line.find(opener) {
                // Ties go to the earlier opener in the list (the line marker)
                if best.map_or(true, |(best_pos, _, _)| pos < best_pos) {
                    best = Some((pos, opener, closer));
                }
            }
        }

        let (pos, opener, closer) = best?;
        Some(CommentSpan {
            code: &line[..pos],
            comment: &line[pos..],
            opener,
            closer,
        })
    }
}

/// Parse a line with a freshly built grammar.
///
/// Convenience for one-off parsing; scans should reuse a cached [`Grammar`].
pub fn parse_line(language: &'static Language, line: &str) -> Option<Directive> {
    Grammar::build(language).parse_line(line)
}

/// A line split into code and comment.
struct CommentSpan<'a> {
    code: &'a str,
    /// Comment text, starting with its opener
    comment: &'a str,
    opener: &'static str,
    /// Closing delimiter when the comment is a block comment
    closer: Option<&'static str>,
}

impl<'a> CommentSpan<'a> {
    /// Comment text without its delimiters.
    fn content(&self) -> &'a str {
        let mut text = self.comment[self.opener.len()..].trim_start_matches(self.opener);
        if let Some(end) = self.closer {
            let trimmed = text.trim_end();
            text = trimmed.strip_suffix(end).unwrap_or(text);
        }
        text
    }

    /// Split `TITLE | BODY` at the first pipe.
    fn structured(&self) -> Option<(String, String)> {
        let (head, tail) = self.comment.split_once('|')?;

        let title = head.trim_start_matches(self.opener).trim();
        if title.is_empty() {
            return None;
        }

        let mut body = tail.trim();
        if let Some(end) = self.closer {
            body = body.strip_suffix(end).unwrap_or(body).trim_end();
        }

        Some((title.to_string(), body.to_string()))
    }
}

/// Collect `#label` tokens, skipping keyword occurrences.
fn extract_labels(text: &str) -> Option<BTreeSet<String>> {
    let labels: BTreeSet<String> = LABEL_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|token| !KEYWORD_TOKEN.is_match(token))
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        None
    } else {
        Some(labels)
    }
}
