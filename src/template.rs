//! The compiled render unit.

use std::fmt;

use crate::error::RenderError;
use crate::value::Value;

type RenderFn = dyn Fn(&[Value]) -> Result<String, RenderError> + Send + Sync;

/// A compiled template: an immutable callable that renders a string for an
/// argument vector.
///
/// Invocation is read-only over the compiled logic, so a render unit may be
/// invoked repeatedly and concurrently. Callers are expected to cache the
/// unit keyed by template source text rather than recompiling.
pub struct Template {
    render: Box<RenderFn>,
}

impl Template {
    /// Wrap the invokable entry point produced by a backend.
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&[Value]) -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self {
            render: Box::new(render),
        }
    }

    /// Render with argument values bound positionally, in declaration order.
    ///
    /// Faults raised by the generated logic propagate as-is; no template
    /// position translation happens at render time.
    pub fn invoke(&self, values: &[Value]) -> Result<String, RenderError> {
        (self.render)(values)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Template(..)")
    }
}
