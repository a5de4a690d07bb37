//! Template body scanner
//!
//! Splits raw template text into literal, code, and expression segments and
//! drives a language provider. The scanner owns no output: it only locates
//! delimiters, applies the line-trimming rule, and tags each segment with
//! its template position.

use crate::error::{Diagnostic, DiagnosticKind};
use crate::position::PositionTracker;
use crate::provider::LanguageProvider;
use crate::template::Template;
use crate::value::ArgumentDescriptor;

const OPEN: &str = "<%";
const CLOSE: &str = "%>";
const EXPR_MARKER: char = '=';

/// Mode of the block currently being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Expression,
}

/// Scan `template`, feeding segments to `provider`, and compile the result.
///
/// `start` is invoked before the first segment and `end` after the last. An
/// unterminated block aborts immediately with a diagnostic positioned at
/// the offending open delimiter; `end` is not called in that case.
pub fn scan<P: LanguageProvider + ?Sized>(
    template: &str,
    args: &[ArgumentDescriptor],
    provider: &mut P,
) -> Result<Template, Diagnostic> {
    let mut tracker = PositionTracker::new(template);
    provider.start(args);

    let mut cursor = 0;
    while let Some(found) = template[cursor..].find(OPEN) {
        let open = cursor + found;
        let mut content_start = open + OPEN.len();
        let mode = if template[content_start..].starts_with(EXPR_MARKER) {
            content_start += EXPR_MARKER.len_utf8();
            Mode::Expression
        } else {
            Mode::Code
        };

        let Some(found_close) = template[content_start..].find(CLOSE) else {
            return Err(Diagnostic::new(
                DiagnosticKind::UnterminatedBlock,
                format!("block opened with '{}' is never closed", OPEN),
                Some(tracker.position_at(open)),
            ));
        };
        let close = content_start + found_close;
        let mut resume = close + CLOSE.len();

        // A line holding nothing but a code block swallows its trailing
        // newline, so control-flow-only lines leave no blank line in the
        // output. Expression blocks keep theirs.
        if mode == Mode::Code && line_prefix_is_blank(template, open) {
            if let Some(end) = blank_line_suffix_end(template, resume) {
                resume = end;
            }
        }

        if open > cursor {
            provider.literal(&template[cursor..open], tracker.position_at(cursor));
        }
        let pos = tracker.position_at(content_start);
        let content = &template[content_start..close];
        match mode {
            Mode::Code => provider.code(content, pos),
            Mode::Expression => provider.expression(content, pos),
        }

        cursor = resume;
    }

    if cursor < template.len() {
        provider.literal(&template[cursor..], tracker.position_at(cursor));
    }

    provider.end()
}

/// True when every character between the previous newline and `at` is
/// whitespace.
fn line_prefix_is_blank(template: &str, at: usize) -> bool {
    template[..at]
        .chars()
        .rev()
        .take_while(|&ch| ch != '\n')
        .all(char::is_whitespace)
}

/// If everything from `from` to the next newline is whitespace, the offset
/// just past that newline (or end of input); otherwise `None`.
fn blank_line_suffix_end(template: &str, from: usize) -> Option<usize> {
    for (i, ch) in template[from..].char_indices() {
        if ch == '\n' {
            return Some(from + i + 1);
        }
        if !ch.is_whitespace() {
            return None;
        }
    }
    Some(template.len())
}
