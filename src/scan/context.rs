//! Context window extraction around a trigger line.
//!
//! The window grows outward from the trigger until it hits a blank line or the
//! configured distance, whichever comes first, so a report shows the statement
//! or block the directive sits in without dragging in unrelated code.

use std::collections::VecDeque;

/// Default number of lines to look back and ahead.
pub const DEFAULT_CONTEXT_LIMIT: usize = 8;

/// A contiguous run of lines around a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Verbatim lines, oldest first
    pub lines: Vec<String>,
    /// Position of the trigger within `lines`
    pub trigger_index: usize,
}

impl ContextWindow {
    /// The trigger line itself.
    pub fn trigger(&self) -> &str {
        &self.lines[self.trigger_index]
    }
}

/// Collect the window around `source_line` (1-based).
///
/// Returns `None` if `source_line` does not address a line in `lines`.
pub fn extract_window<S: AsRef<str>>(
    lines: &[S],
    source_line: usize,
    limit: usize,
) -> Option<ContextWindow> {
    if source_line == 0 || source_line > lines.len() {
        return None;
    }
    let trigger = source_line - 1;

    let mut window: VecDeque<String> = VecDeque::new();
    window.push_back(lines[trigger].as_ref().to_string());

    // Backward: stop at the limit or the first blank line
    let mut looked_back = 0;
    let mut i = trigger;
    while looked_back < limit && i > 0 {
        i -= 1;
        let line = lines[i].as_ref();
        if is_blank(line) {
            break;
        }
        window.push_front(line.to_string());
        looked_back += 1;
    }
    let trigger_index = looked_back;

    // Forward: same rules, never past the end of the file
    let mut looked_ahead = 0;
    let mut j = trigger + 1;
    while looked_ahead < limit && j < lines.len() {
        let line = lines[j].as_ref();
        if is_blank(line) {
            break;
        }
        window.push_back(line.to_string());
        looked_ahead += 1;
        j += 1;
    }

    Some(ContextWindow {
        lines: window.into(),
        trigger_index,
    })
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
