//! The pluggable code-generation backend interface.

use crate::error::{Diagnostic, IdentifierError};
use crate::position::Position;
use crate::template::Template;
use crate::value::ArgumentDescriptor;

/// A code-generation backend for one target language.
///
/// The scanner drives a provider through `start`, a sequence of
/// `literal`/`code`/`expression` segments, and finally `end`, which hands
/// the accumulated generated source to the language's compiler and wraps
/// the result as a render unit. Implementations own a position buffer for
/// the generated source and a position transposer mapping it back to
/// template coordinates.
///
/// A provider instance serves one compilation pass at a time; `start`
/// resets any state left over from a previous pass.
pub trait LanguageProvider {
    /// Human-readable name of the target language.
    fn name(&self) -> &'static str;

    /// Begin a compilation pass: reset internal state and emit the preamble
    /// binding each positional argument to its declared identifier and type.
    /// No output side effects yet.
    fn start(&mut self, args: &[ArgumentDescriptor]);

    /// Emit code that, when executed, appends `text` verbatim to the render
    /// output. Characters meaningful to the generated language must be
    /// escaped so that rendering reproduces the literal exactly.
    fn literal(&mut self, text: &str, pos: Position);

    /// Record a position mapping at the current buffer position, then emit
    /// `snippet` into the generated source unmodified.
    fn code(&mut self, snippet: &str, pos: Position);

    /// Emit code that appends the evaluated result of `expr` to the render
    /// output, recording a position mapping at the expression itself.
    fn expression(&mut self, expr: &str, pos: Position);

    /// Compile the accumulated generated source into a render unit. On
    /// failure, the first non-warning diagnostic from the language's front
    /// end is translated back into template coordinates.
    fn end(&mut self) -> Result<Template, Diagnostic>;

    /// Validate an identifier against the target language's identifier
    /// grammar and reserved words.
    fn is_valid_identifier(&self, identifier: &str) -> Result<(), IdentifierError>;

    /// Strip the language's escape prefix from an identifier, if present.
    fn normalize_identifier<'a>(&self, identifier: &'a str) -> &'a str;
}
