//! The script-language backend
//!
//! One `LanguageProvider` implementation targeting the built-in script
//! language: the provider generates script source into a position-tracked
//! buffer, and `end` runs the script front end (lexer, parser, resolver)
//! over it. Compile errors come back positioned in generated source and are
//! translated into template coordinates through the position transposer;
//! successful compiles wrap the checked program and the tree-walking
//! evaluator as a render unit.

pub mod ast;
mod check;
mod grammar;
mod interp;
pub mod lexer;

pub use check::{ScriptDiagnostic, Severity};

use unicode_ident::{is_xid_continue, is_xid_start};

use crate::error::{Diagnostic, DiagnosticKind, IdentifierError};
use crate::position::{Position, PositionBuffer, PositionTracker};
use crate::provider::LanguageProvider;
use crate::template::Template;
use crate::transpose::PositionTransposer;
use crate::value::ArgumentDescriptor;

/// Keywords of the script language. Reserved as argument names unless
/// escaped with the `@` prefix.
pub(crate) const KEYWORDS: &[&str] = &[
    "let", "if", "else", "while", "for", "true", "false", "null",
];

/// Code-generation backend targeting the built-in script language.
#[derive(Debug, Default)]
pub struct ScriptProvider {
    buffer: PositionBuffer,
    transposer: PositionTransposer,
}

impl ScriptProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LanguageProvider for ScriptProvider {
    fn name(&self) -> &'static str {
        "script"
    }

    fn start(&mut self, args: &[ArgumentDescriptor]) {
        self.buffer = PositionBuffer::new();
        self.transposer = PositionTransposer::new();
        // Preamble: bind each positional argument to its declared
        // identifier, cast to the declared type. Raw identifiers go out
        // verbatim; the lexer strips any `@` escape prefix.
        for (index, arg) in args.iter().enumerate() {
            self.buffer.push_str(&format!(
                "let {} = {}(arg({}));\n",
                arg.identifier,
                arg.ty.cast_builtin(),
                index
            ));
        }
    }

    fn literal(&mut self, text: &str, _pos: Position) {
        self.buffer.push_str("emit(\"");
        self.buffer.push_str(&escape_literal(text));
        self.buffer.push_str("\");");
    }

    fn code(&mut self, snippet: &str, pos: Position) {
        self.transposer.add_mapping(self.buffer.position(), pos);
        self.buffer.push_str(snippet);
    }

    fn expression(&mut self, expr: &str, pos: Position) {
        self.buffer.push_str("emit(");
        self.transposer.add_mapping(self.buffer.position(), pos);
        self.buffer.push_str(expr);
        self.buffer.push_str(");");
    }

    fn end(&mut self) -> Result<Template, Diagnostic> {
        let source = std::mem::take(&mut self.buffer).into_string();
        let mut transposer = std::mem::take(&mut self.transposer);

        let program = match grammar::parse(&source) {
            Ok(program) => program,
            Err(diags) => return Err(translate_first(&source, diags, &mut transposer)),
        };

        let diags = check::check(&program);
        if diags.iter().any(ScriptDiagnostic::is_error) {
            return Err(translate_first(&source, diags, &mut transposer));
        }

        Ok(Template::new(move |values| interp::execute(&program, values)))
    }

    fn is_valid_identifier(&self, identifier: &str) -> Result<(), IdentifierError> {
        is_valid_identifier(identifier)
    }

    fn normalize_identifier<'a>(&self, identifier: &'a str) -> &'a str {
        identifier.strip_prefix('@').unwrap_or(identifier)
    }
}

/// Take the first non-warning diagnostic, convert its generated-source span
/// to a position, and translate that through the transposer into template
/// coordinates.
fn translate_first(
    source: &str,
    diags: Vec<ScriptDiagnostic>,
    transposer: &mut PositionTransposer,
) -> Diagnostic {
    let mut tracker = PositionTracker::new(source);
    match diags.into_iter().find(ScriptDiagnostic::is_error) {
        Some(diag) => {
            let generated = tracker.position_at(diag.span.start);
            Diagnostic::new(
                DiagnosticKind::CompilationFailure,
                diag.message,
                transposer.translate(Some(generated)),
            )
        }
        None => Diagnostic::new(
            DiagnosticKind::CompilationFailure,
            "generated source failed to compile",
            None,
        ),
    }
}

/// Escape a template literal for inclusion in a script string literal.
/// Lexing undoes exactly these escapes, so rendering reproduces the
/// original text.
fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Validate an argument identifier against the script identifier grammar.
///
/// A leading `@` escapes an otherwise-reserved word; past that, the first
/// character must be a letter or underscore and the rest XID-continue
/// characters (letters, combining marks, digits, connector punctuation).
pub(crate) fn is_valid_identifier(identifier: &str) -> Result<(), IdentifierError> {
    if identifier.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let (escaped, name) = match identifier.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, identifier),
    };
    if name.is_empty() {
        return Err(IdentifierError::EscapeOnly);
    }
    for (index, ch) in name.chars().enumerate() {
        if index == 0 {
            if !(ch == '_' || is_xid_start(ch)) {
                return Err(IdentifierError::IllegalStart);
            }
        } else if ch == ' ' {
            return Err(IdentifierError::Space);
        } else if !is_xid_continue(ch) {
            return Err(IdentifierError::IllegalChar(index));
        }
    }
    if !escaped && KEYWORDS.contains(&name) {
        return Err(IdentifierError::ReservedWord(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::TypeRef;

    #[test]
    fn test_escape_literal_round_trip() {
        use logos::Logos;

        let original = "a \"quoted\" \\ backslash\nnewline\ttab";
        let escaped = escape_literal(original);
        assert!(!escaped.contains('\n'));
        // Lex the escaped text back through a string literal
        let source = format!("\"{}\"", escaped);
        let tokens: Vec<_> = lexer::Token::lexer(&source).collect();
        assert_eq!(tokens, vec![Ok(lexer::Token::Str(original.to_string()))]);
    }

    #[test]
    fn test_valid_identifiers() {
        assert_eq!(is_valid_identifier("name"), Ok(()));
        assert_eq!(is_valid_identifier("_private"), Ok(()));
        assert_eq!(is_valid_identifier("x1"), Ok(()));
        assert_eq!(is_valid_identifier("größe"), Ok(()));
        assert_eq!(is_valid_identifier("snake_case"), Ok(()));
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(is_valid_identifier(""), Err(IdentifierError::Empty));
        assert_eq!(is_valid_identifier("@"), Err(IdentifierError::EscapeOnly));
        assert_eq!(
            is_valid_identifier("123abc"),
            Err(IdentifierError::IllegalStart)
        );
        assert_eq!(is_valid_identifier("a b"), Err(IdentifierError::Space));
        assert_eq!(
            is_valid_identifier("a-b"),
            Err(IdentifierError::IllegalChar(1))
        );
    }

    #[test]
    fn test_reserved_words_and_escape_prefix() {
        assert_eq!(
            is_valid_identifier("while"),
            Err(IdentifierError::ReservedWord("while".into()))
        );
        assert_eq!(is_valid_identifier("@while"), Ok(()));
        // The prefix only escapes; the rest must still be well-formed
        assert_eq!(
            is_valid_identifier("@1x"),
            Err(IdentifierError::IllegalStart)
        );
    }

    #[test]
    fn test_normalize_identifier() {
        let provider = ScriptProvider::new();
        assert_eq!(provider.normalize_identifier("@while"), "while");
        assert_eq!(provider.normalize_identifier("name"), "name");
    }

    #[test]
    fn test_preamble_binds_arguments_in_order() {
        let mut provider = ScriptProvider::new();
        provider.start(&[
            ArgumentDescriptor::new("name", TypeRef::String),
            ArgumentDescriptor::new("count", TypeRef::Int),
        ]);
        assert_eq!(
            provider.buffer.as_str(),
            "let name = as_string(arg(0));\nlet count = as_int(arg(1));\n"
        );
    }

    #[test]
    fn test_start_resets_previous_pass() {
        let mut provider = ScriptProvider::new();
        provider.start(&[ArgumentDescriptor::new("a", TypeRef::Int)]);
        provider.literal("x", Position::new(1, 1));
        provider.start(&[]);
        assert_eq!(provider.buffer.as_str(), "");
    }

    #[test]
    fn test_code_records_mapping_at_current_position() {
        let mut provider = ScriptProvider::new();
        provider.start(&[]);
        provider.literal("hi", Position::new(1, 1));
        let buffer_pos = provider.buffer.position();
        provider.code(" let x = 1; ", Position::new(4, 7));
        // The anchor points at the buffer position where the snippet begins
        assert_eq!(
            provider.transposer.translate(Some(buffer_pos)),
            Some(Position::new(4, 7))
        );
    }

    #[test]
    fn test_end_compiles_empty_program() {
        let mut provider = ScriptProvider::new();
        provider.start(&[]);
        let unit = provider.end().expect("should compile");
        assert_eq!(unit.invoke(&[]).unwrap(), "");
    }
}
