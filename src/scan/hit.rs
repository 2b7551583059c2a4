//! The hit model: one directive located in a file.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::grammar::{Directive, Keyword};
use crate::reconcile::fingerprint;
use crate::tracker::{IssuePayload, RepoIdentity};

use super::context::ContextWindow;

/// Width of each padded column in the one-line display.
const DISPLAY_COLUMN: usize = 16;

/// Reasons a hit cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidHit {
    #[error("a hit needs at least one keyword")]
    NoKeywords,
    #[error("trigger index {index} is outside {len} context lines")]
    TriggerOutOfRange { index: usize, len: usize },
    #[error("source lines are 1-based")]
    ZeroLine,
}

/// A directive found at a specific file and line.
///
/// Location, keywords and context are fixed at construction; the structured
/// fields stay public so fixtures can be built directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    source_file: String,
    source_line: usize,
    found_keywords: BTreeSet<Keyword>,
    context_lines: Vec<String>,
    trigger_index: usize,
    pub structured_title: Option<String>,
    pub structured_body: Option<String>,
    pub structured_labels: Option<BTreeSet<String>>,
}

impl Hit {
    /// Create a hit, checking its invariants.
    pub fn new(
        source_file: impl Into<String>,
        source_line: usize,
        found_keywords: BTreeSet<Keyword>,
        context_lines: Vec<String>,
        trigger_index: usize,
    ) -> Result<Self, InvalidHit> {
        if found_keywords.is_empty() {
            return Err(InvalidHit::NoKeywords);
        }
        if source_line == 0 {
            return Err(InvalidHit::ZeroLine);
        }
        if trigger_index >= context_lines.len() {
            return Err(InvalidHit::TriggerOutOfRange {
                index: trigger_index,
                len: context_lines.len(),
            });
        }

        Ok(Self {
            source_file: normalize_path(source_file.into()),
            source_line,
            found_keywords,
            context_lines,
            trigger_index,
            structured_title: None,
            structured_body: None,
            structured_labels: None,
        })
    }

    /// Locate a parsed directive. The reconstructed line is the only context
    /// until a window is attached.
    pub fn from_directive(
        source_file: impl Into<String>,
        source_line: usize,
        directive: Directive,
    ) -> Result<Self, InvalidHit> {
        let mut hit = Self::new(
            source_file,
            source_line,
            directive.keywords,
            vec![directive.line],
            0,
        )?;
        hit.structured_title = directive.title;
        hit.structured_body = directive.body;
        hit.structured_labels = directive.labels;
        Ok(hit)
    }

    /// Replace the context with a window around the trigger.
    pub(crate) fn attach_context(&mut self, window: ContextWindow) {
        if window.trigger_index < window.lines.len() {
            self.context_lines = window.lines;
            self.trigger_index = window.trigger_index;
        }
    }

    /// Path relative to the scan root, with forward slashes.
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn source_line(&self) -> usize {
        self.source_line
    }

    pub fn found_keywords(&self) -> &BTreeSet<Keyword> {
        &self.found_keywords
    }

    pub fn context_lines(&self) -> &[String] {
        &self.context_lines
    }

    pub fn trigger_index(&self) -> usize {
        self.trigger_index
    }

    pub fn triggering_line(&self) -> &str {
        &self.context_lines[self.trigger_index]
    }

    pub fn has_keyword(&self, keyword: Keyword) -> bool {
        self.found_keywords.contains(&keyword)
    }

    /// Keywords as shown to people, e.g. `TODO, FIXME`.
    pub fn keywords_label(&self) -> String {
        self.found_keywords
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn file_extension(&self) -> &str {
        Path::new(&self.source_file)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
    }

    /// Title generated from the keywords and the trigger line.
    pub fn generic_title(&self) -> String {
        format!("{} - {}", self.keywords_label(), self.triggering_line().trim())
    }

    /// The structured title if there is one, otherwise the generic title.
    pub fn title(&self) -> String {
        match &self.structured_title {
            Some(title) => title.clone(),
            None => self.generic_title(),
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.title())
    }

    /// Title-only identity, as used for deduplication.
    pub fn same_fingerprint(&self, other: &Hit) -> bool {
        self.title() == other.title()
    }

    /// First file line number covered by the context window.
    fn first_context_line(&self) -> usize {
        self.source_line.saturating_sub(self.trigger_index).max(1)
    }

    /// Context window as a fenced Markdown block with line numbers; the
    /// trigger is marked with `*`.
    pub fn numbered_context(&self) -> String {
        let first = self.first_context_line();
        let last = first + self.context_lines.len() - 1;
        let width = last.to_string().len() + 3;

        let mut block = format!("```{}\n", self.file_extension());
        for (offset, line) in self.context_lines.iter().enumerate() {
            let marker = if offset == self.trigger_index { "* " } else { "  " };
            let gutter = format!("{}{}:", marker, first + offset);
            block.push_str(&format!("{:>width$}\t{}\n", gutter, line, width = width));
        }
        block.push_str("```");
        block
    }

    /// Build the tracker payload for this hit.
    ///
    /// Only the heading is prose; the fenced context and the reference link
    /// are kept verbatim so code like `@Override` and paths like `@types/`
    /// survive.
    pub fn issue_payload(&self, identity: &RepoIdentity) -> IssuePayload {
        let heading = match &self.structured_body {
            Some(body) if !body.is_empty() => body.clone(),
            _ => self.to_string(),
        };
        let body = format!(
            "## {}\n\n{}\n\nReference: <a href=\"{}\">{}</a>",
            sanitize_mentions(&heading),
            self.numbered_context(),
            identity.blob_url(&self.source_file),
            self.source_file,
        );

        IssuePayload {
            title: self.title(),
            body,
            assignees: identity.actor.iter().cloned().collect(),
            labels: self
                .structured_labels
                .iter()
                .flatten()
                .cloned()
                .collect(),
        }
    }
}

impl std::fmt::Display for Hit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = format!("[{}]", self.keywords_label());
        let location = format!(" - {}:{}", self.source_file, self.source_line);
        let text = match &self.structured_title {
            Some(title) => title.as_str(),
            None => self.triggering_line().trim(),
        };
        write!(
            f,
            "{:<w$}{:<w$} - {}",
            keys,
            location,
            text,
            w = DISPLAY_COLUMN
        )
    }
}

/// Break `@mentions` so filed issues do not notify anyone.
pub fn sanitize_mentions(text: &str) -> String {
    text.replace('@', "@<!-- -->")
}

fn normalize_path(path: String) -> String {
    if path.contains('\\') {
        path.replace('\\', "/")
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{resolve_language, Grammar};

    fn keywords(list: &[Keyword]) -> BTreeSet<Keyword> {
        list.iter().copied().collect()
    }

    fn sample_hit() -> Hit {
        Hit::new(
            "src/app.py",
            11,
            keywords(&[Keyword::Todo]),
            vec![
                "def run():".to_string(),
                "    # TODO retry on failure".to_string(),
                "    fetch()".to_string(),
            ],
            1,
        )
        .unwrap()
    }

    fn identity() -> RepoIdentity {
        RepoIdentity::new("acme", "widgets", "main").with_actor("octocat")
    }

    #[test]
    fn test_new_checks_invariants() {
        let lines = vec!["# todo".to_string()];
        assert_eq!(
            Hit::new("a.py", 1, BTreeSet::new(), lines.clone(), 0),
            Err(InvalidHit::NoKeywords)
        );
        assert_eq!(
            Hit::new("a.py", 1, keywords(&[Keyword::Todo]), lines.clone(), 1),
            Err(InvalidHit::TriggerOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            Hit::new("a.py", 0, keywords(&[Keyword::Todo]), lines, 0),
            Err(InvalidHit::ZeroLine)
        );
    }

    #[test]
    fn test_windows_paths_are_normalized() {
        let hit = Hit::new(
            "src\\lib\\mod.rs",
            1,
            keywords(&[Keyword::Fixme]),
            vec!["// fixme".to_string()],
            0,
        )
        .unwrap();
        assert_eq!(hit.source_file(), "src/lib/mod.rs");
        assert_eq!(hit.file_extension(), "rs");
    }

    #[test]
    fn test_generic_title() {
        let hit = sample_hit();
        assert_eq!(hit.triggering_line(), "    # TODO retry on failure");
        assert_eq!(hit.generic_title(), "TODO - # TODO retry on failure");
        assert_eq!(hit.title(), hit.generic_title());
    }

    #[test]
    fn test_keywords_label_lists_both() {
        let hit = Hit::new(
            "a.c",
            3,
            keywords(&[Keyword::Fixme, Keyword::Todo]),
            vec!["// TODO: FIXME".to_string()],
            0,
        )
        .unwrap();
        assert_eq!(hit.keywords_label(), "TODO, FIXME");
    }

    #[test]
    fn test_structured_title_wins() {
        let mut hit = sample_hit();
        hit.structured_title = Some("Retry policy".to_string());
        assert_eq!(hit.title(), "Retry policy");
        assert_eq!(hit.fingerprint(), fingerprint("Retry policy"));
    }

    #[test]
    fn test_equality_is_total_but_fingerprint_is_title_only() {
        let a = sample_hit();
        let mut b = sample_hit();
        b.structured_labels = Some(["extra".to_string()].into_iter().collect());

        assert_ne!(a, b);
        assert!(a.same_fingerprint(&b));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_from_directive_keeps_structure() {
        let grammar = Grammar::build(resolve_language("py"));
        let directive = grammar
            .parse_line("# TODO Titled Issue! | body text #label")
            .unwrap();
        let hit = Hit::from_directive("x.py", 4, directive).unwrap();

        assert_eq!(hit.structured_title.as_deref(), Some("TODO Titled Issue!"));
        assert_eq!(hit.structured_body.as_deref(), Some("body text #label"));
        assert_eq!(hit.context_lines().len(), 1);
        assert_eq!(hit.trigger_index(), 0);
    }

    #[test]
    fn test_numbered_context_marks_trigger() {
        let hit = sample_hit();
        let block = hit.numbered_context();
        let lines: Vec<&str> = block.lines().collect();

        assert_eq!(lines[0], "```py");
        assert_eq!(lines[1], "  10:\tdef run():");
        assert_eq!(lines[2], "* 11:\t    # TODO retry on failure");
        assert_eq!(lines[3], "  12:\t    fetch()");
        assert_eq!(lines[4], "```");
    }

    #[test]
    fn test_numbered_context_pads_short_numbers() {
        let hit = Hit::new(
            "a.rs",
            9,
            keywords(&[Keyword::Todo]),
            vec!["// todo".to_string(), "x();".to_string()],
            0,
        )
        .unwrap();
        let block = hit.numbered_context();
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[1], " * 9:\t// todo");
        assert_eq!(lines[2], "  10:\tx();");
    }

    #[test]
    fn test_issue_payload() {
        let mut hit = sample_hit();
        hit.structured_labels = Some(["bug".to_string()].into_iter().collect());
        let payload = hit.issue_payload(&identity());

        assert_eq!(payload.title, "TODO - # TODO retry on failure");
        assert_eq!(payload.assignees, vec!["octocat".to_string()]);
        assert_eq!(payload.labels, vec!["bug".to_string()]);
        assert!(payload.body.starts_with("## [TODO]"));
        assert!(payload.body.contains("* 11:"));
        assert!(payload.body.ends_with(
            "Reference: <a href=\"https://github.com/acme/widgets/blob/main/src/app.py\">src/app.py</a>"
        ));
    }

    #[test]
    fn test_issue_payload_uses_structured_body_heading() {
        let mut hit = sample_hit();
        hit.structured_title = Some("Retry".to_string());
        hit.structured_body = Some("ask @ops first".to_string());
        let payload = hit.issue_payload(&identity());

        assert_eq!(payload.title, "Retry");
        assert!(payload.body.starts_with("## ask @<!-- -->ops first\n\n```py\n"));
    }

    #[test]
    fn test_issue_payload_keeps_code_and_paths_verbatim() {
        let hit = Hit::new(
            "src/@types/api.ts",
            2,
            keywords(&[Keyword::Todo]),
            vec!["@Injectable()".to_string(), "// TODO wire it @alice".to_string()],
            1,
        )
        .unwrap();
        let payload = hit.issue_payload(&identity());

        assert!(payload.body.contains("\t@Injectable()\n"));
        assert!(payload.body.contains("\t// TODO wire it @alice\n"));
        assert!(payload
            .body
            .contains("href=\"https://github.com/acme/widgets/blob/main/src/@types/api.ts\""));
        assert!(payload.body.contains(">src/@types/api.ts</a>"));

        // The heading is prose and must not ping anyone
        let heading = payload.body.lines().next().unwrap();
        assert!(heading.starts_with("## [TODO]"));
        assert!(heading.contains("@<!-- -->alice"));
    }

    #[test]
    fn test_display_pads_columns() {
        let hit = sample_hit();
        let shown = hit.to_string();
        assert!(shown.starts_with("[TODO]          "));
        assert!(shown.contains(" - src/app.py:11 - # TODO retry on failure"));

        let mut titled = sample_hit();
        titled.structured_title = Some("Retry".to_string());
        assert!(titled.to_string().ends_with(" - Retry"));
    }
}
