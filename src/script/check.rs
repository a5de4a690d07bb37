//! Resolver pass over parsed programs
//!
//! Walks the AST resolving variable references against lexical scopes and
//! function calls against the builtin table. Errors block compilation;
//! warnings (unused bindings) are reported but ignored by the backend.

use crate::script::ast::{Expr, Program, Spanned, Stmt};
use crate::script::interp;
use crate::script::lexer::Span;

/// Severity of a script front-end diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A diagnostic produced by the script front end (lexer, parser, or
/// resolver), positioned in generated-source coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl ScriptDiagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Check name resolution and builtin arities over a parsed program.
///
/// Diagnostics come back ordered by generated-source position.
pub fn check(program: &Program) -> Vec<ScriptDiagnostic> {
    let mut checker = Checker::default();
    checker.scopes.push(Vec::new());
    for stmt in &program.statements {
        checker.stmt(stmt);
    }
    checker.pop_scope();
    checker.diags.sort_by_key(|d| d.span.start);
    checker.diags
}

struct Binding {
    name: String,
    span: Span,
    used: bool,
}

#[derive(Default)]
struct Checker {
    scopes: Vec<Vec<Binding>>,
    diags: Vec<ScriptDiagnostic>,
}

impl Checker {
    fn stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Let { name, value } => {
                // The initializer is resolved before the binding exists, so
                // `let x = x;` refers to an outer `x` or fails
                self.expr(value);
                self.declare(name);
            }
            Stmt::Assign { name, value } => {
                self.expr(value);
                if !self.is_declared(&name.node) {
                    self.diags.push(ScriptDiagnostic::error(
                        format!("cannot assign to undeclared variable '{}'", name.node),
                        name.span.clone(),
                    ));
                }
            }
            Stmt::Expr(e) => self.expr(e),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr(cond);
                self.block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.block(else_branch);
                }
            }
            Stmt::While { cond, body } => {
                self.expr(cond);
                self.block(body);
            }
        }
    }

    fn block(&mut self, stmts: &[Spanned<Stmt>]) {
        self.scopes.push(Vec::new());
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.pop_scope();
    }

    fn expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::Var(name) => {
                if !self.mark_used(name) {
                    self.diags.push(ScriptDiagnostic::error(
                        format!("unknown variable '{}'", name),
                        expr.span.clone(),
                    ));
                }
            }
            Expr::Call { name, args } => {
                match interp::builtin_arity(&name.node) {
                    None => self.diags.push(ScriptDiagnostic::error(
                        format!("unknown function '{}'", name.node),
                        name.span.clone(),
                    )),
                    Some(arity) if arity != args.len() => {
                        self.diags.push(ScriptDiagnostic::error(
                            format!(
                                "'{}' expects {} argument(s), found {}",
                                name.node,
                                arity,
                                args.len()
                            ),
                            name.span.clone(),
                        ))
                    }
                    Some(_) => {}
                }
                for arg in args {
                    self.expr(arg);
                }
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) => {}
        }
    }

    fn declare(&mut self, name: &Spanned<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Binding {
                name: name.node.clone(),
                span: name.span.clone(),
                used: false,
            });
        }
    }

    fn pop_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for binding in scope {
                if !binding.used {
                    self.diags.push(ScriptDiagnostic::warning(
                        format!("unused variable '{}'", binding.name),
                        binding.span,
                    ));
                }
            }
        }
    }

    /// Mark the innermost binding of `name` as read. Returns false when no
    /// binding is in scope.
    fn mark_used(&mut self, name: &str) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(binding) = scope.iter_mut().rev().find(|b| b.name == name) {
                binding.used = true;
                return true;
            }
        }
        false
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .rev()
            .any(|scope| scope.iter().any(|b| b.name == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::grammar::parse;

    fn diags_for(source: &str) -> Vec<ScriptDiagnostic> {
        check(&parse(source).expect("should parse"))
    }

    #[test]
    fn test_clean_program() {
        let diags = diags_for(r#"let x = 1; emit(x);"#);
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_unknown_variable() {
        let diags = diags_for("emit(missing);");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert!(diags[0].message.contains("unknown variable 'missing'"));
    }

    #[test]
    fn test_unknown_function() {
        let diags = diags_for("frobnicate(1);");
        assert!(diags[0].message.contains("unknown function 'frobnicate'"));
    }

    #[test]
    fn test_wrong_arity() {
        let diags = diags_for("emit(1, 2);");
        assert!(diags[0].is_error());
        assert!(diags[0].message.contains("expects 1 argument(s), found 2"));
    }

    #[test]
    fn test_assign_to_undeclared() {
        let diags = diags_for("x = 1;");
        assert!(diags[0].message.contains("cannot assign to undeclared"));
    }

    #[test]
    fn test_unused_binding_is_warning_only() {
        let diags = diags_for("let x = 1;");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].message.contains("unused variable 'x'"));
    }

    #[test]
    fn test_block_scoping() {
        // A binding declared inside a block is gone after it
        let diags = diags_for("if (true) { let x = 1; emit(x); } emit(x);");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("unknown variable 'x'"));
    }

    #[test]
    fn test_outer_binding_visible_in_block() {
        let diags = diags_for("let x = 1; if (true) { emit(x); }");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_shadowing_marks_innermost() {
        let diags = diags_for("let x = 1; if (true) { let x = 2; emit(x); } emit(x);");
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    }

    #[test]
    fn test_let_initializer_cannot_see_itself() {
        let diags = diags_for("let x = x;");
        assert!(diags
            .iter()
            .any(|d| d.is_error() && d.message.contains("unknown variable 'x'")));
    }

    #[test]
    fn test_diagnostics_sorted_by_position() {
        let diags = diags_for("emit(a); emit(b);");
        assert_eq!(diags.len(), 2);
        assert!(diags[0].span.start < diags[1].span.start);
    }
}
