//! Dynamic Template - a template compilation engine
//!
//! Compiles source text mixing literal output with embedded `<% code %>`
//! and `<%= expression %>` blocks into reusable render units. Code blocks
//! and expressions are written in a small built-in script language that is
//! generated, checked, and interpreted entirely in-process; compile errors
//! in embedded code are mapped back to template coordinates through a
//! position transposer.
//!
//! # Example
//!
//! ```rust
//! use dynamic_template::{compile, ArgumentDescriptor, TypeRef, Value};
//!
//! let args = [ArgumentDescriptor::new("name", TypeRef::String)];
//! let unit = compile("Hello <%= name %>!", &args).unwrap();
//! assert_eq!(unit.invoke(&[Value::from("World")]).unwrap(), "Hello World!");
//! ```

pub mod argfile;
pub mod error;
pub mod position;
pub mod provider;
pub mod scanner;
pub mod script;
pub mod template;
pub mod transpose;
pub mod value;

pub use error::{Diagnostic, DiagnosticKind, IdentifierError, RenderError};
pub use position::Position;
pub use provider::LanguageProvider;
pub use script::ScriptProvider;
pub use template::Template;
pub use value::{ArgumentDescriptor, TypeRef, Value};

use thiserror::Error;

/// Errors that can occur during the one-shot [`render`] pipeline
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error during compilation
    #[error("compile error: {0}")]
    Compile(#[from] Diagnostic),
    /// Error while invoking the compiled render unit
    #[error("render error: {0}")]
    Runtime(#[from] RenderError),
}

/// Compile a template with the built-in script backend.
///
/// Argument identifiers are validated before anything else; the first
/// invalid one aborts the compile with an `InvalidIdentifier` diagnostic.
/// Callers that prefer to drop bad arguments instead can pre-filter via
/// [`LanguageProvider::is_valid_identifier`].
///
/// Compilation is a single synchronous pass; every call allocates fresh
/// scanner, buffer, and transposer state. The resulting [`Template`] is
/// immutable and safe to invoke concurrently; cache it keyed by template
/// source to avoid recompiling.
pub fn compile(template: &str, args: &[ArgumentDescriptor]) -> Result<Template, Diagnostic> {
    let mut provider = ScriptProvider::new();
    compile_with_provider(template, args, &mut provider)
}

/// Compile a template against a caller-selected backend.
pub fn compile_with_provider<P: LanguageProvider + ?Sized>(
    template: &str,
    args: &[ArgumentDescriptor],
    provider: &mut P,
) -> Result<Template, Diagnostic> {
    for arg in args {
        if let Err(reason) = provider.is_valid_identifier(&arg.identifier) {
            return Err(Diagnostic::new(
                DiagnosticKind::InvalidIdentifier,
                format!("argument '{}': {}", arg.identifier, reason),
                None,
            ));
        }
    }
    scanner::scan(template, args, provider)
}

/// Compile and invoke in one step.
///
/// Convenient for one-off renders; callers rendering the same template
/// repeatedly should [`compile`] once and reuse the render unit.
pub fn render(
    template: &str,
    args: &[ArgumentDescriptor],
    values: &[Value],
) -> Result<String, TemplateError> {
    let unit = compile(template, args)?;
    Ok(unit.invoke(values)?)
}
