//! Tree-walking evaluator for checked programs
//!
//! Executes a parsed script against an argument vector, accumulating render
//! output through the `emit` builtin. The evaluator is total: programs that
//! skipped the resolver still fail with a `RenderError` rather than a
//! panic.

use std::collections::HashMap;

use crate::error::RenderError;
use crate::script::ast::{BinaryOp, Expr, Program, Spanned, Stmt, UnaryOp};
use crate::value::Value;

/// Arity of a builtin function, or `None` for an unknown name. The resolver
/// checks calls against this table at compile time.
pub(crate) fn builtin_arity(name: &str) -> Option<usize> {
    match name {
        "emit" | "arg" | "as_string" | "as_int" | "as_float" | "as_bool" | "html_encode"
        | "html_attribute_encode" | "html_decode" | "url_encode" | "url_path_encode"
        | "url_decode" | "len" | "str" => Some(1),
        _ => None,
    }
}

/// Execute a program, producing the rendered output.
pub fn execute(program: &Program, args: &[Value]) -> Result<String, RenderError> {
    let mut interp = Interp {
        args,
        output: String::new(),
        scopes: vec![HashMap::new()],
    };
    for stmt in &program.statements {
        interp.exec(&stmt.node)?;
    }
    Ok(interp.output)
}

struct Interp<'a> {
    args: &'a [Value],
    output: String,
    scopes: Vec<HashMap<String, Value>>,
}

impl Interp<'_> {
    fn exec_block(&mut self, stmts: &[Spanned<Stmt>]) -> Result<(), RenderError> {
        self.scopes.push(HashMap::new());
        let result = stmts.iter().try_for_each(|s| self.exec(&s.node));
        self.scopes.pop();
        result
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<(), RenderError> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.eval(&value.node)?;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.node.clone(), value);
                }
                Ok(())
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(&value.node)?;
                for scope in self.scopes.iter_mut().rev() {
                    if let Some(slot) = scope.get_mut(&name.node) {
                        *slot = value;
                        return Ok(());
                    }
                }
                Err(RenderError::UnknownVariable(name.node.clone()))
            }
            Stmt::Expr(e) => {
                self.eval(&e.node)?;
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.condition(cond)? {
                    self.exec_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_block(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { cond, body } => {
                while self.condition(cond)? {
                    self.exec_block(body)?;
                }
                Ok(())
            }
        }
    }

    fn condition(&mut self, cond: &Spanned<Expr>) -> Result<bool, RenderError> {
        match self.eval(&cond.node)? {
            Value::Bool(b) => Ok(b),
            other => Err(RenderError::TypeMismatch {
                expected: "bool",
                found: other.type_name(),
            }),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, RenderError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Var(name) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(name))
                .cloned()
                .ok_or_else(|| RenderError::UnknownVariable(name.clone())),
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(&arg.node)?);
                }
                self.call(&name.node, values)
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(&operand.node)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
                    (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                    (UnaryOp::Neg, other) => Err(RenderError::TypeMismatch {
                        expected: "number",
                        found: other.type_name(),
                    }),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Not, other) => Err(RenderError::TypeMismatch {
                        expected: "bool",
                        found: other.type_name(),
                    }),
                }
            }
            Expr::Binary { op, lhs, rhs } => match op {
                // Short-circuiting: the right operand only evaluates when
                // the left doesn't decide the result
                BinaryOp::And => {
                    if self.condition(lhs)? {
                        Ok(Value::Bool(self.condition(rhs)?))
                    } else {
                        Ok(Value::Bool(false))
                    }
                }
                BinaryOp::Or => {
                    if self.condition(lhs)? {
                        Ok(Value::Bool(true))
                    } else {
                        Ok(Value::Bool(self.condition(rhs)?))
                    }
                }
                _ => {
                    let lhs = self.eval(&lhs.node)?;
                    let rhs = self.eval(&rhs.node)?;
                    binary_values(*op, lhs, rhs)
                }
            },
        }
    }

    fn call(&mut self, name: &str, values: Vec<Value>) -> Result<Value, RenderError> {
        let mut values = values;
        let value = match (values.len(), values.pop()) {
            (1, Some(v)) => v,
            (n, _) => {
                return Err(RenderError::WrongArity {
                    function: name.to_string(),
                    expected: 1,
                    found: n,
                })
            }
        };
        match name {
            "emit" => {
                self.output.push_str(&value.to_string());
                Ok(Value::Null)
            }
            "arg" => match value {
                Value::Int(i) => usize::try_from(i)
                    .ok()
                    .and_then(|index| self.args.get(index))
                    .cloned()
                    .ok_or(RenderError::ArgumentOutOfRange(i)),
                other => Err(RenderError::TypeMismatch {
                    expected: "int",
                    found: other.type_name(),
                }),
            },
            "as_string" => as_string(value),
            "as_int" => as_int(value),
            "as_float" => as_float(value),
            "as_bool" => as_bool(value),
            "html_encode" => with_str(value, |s| html_encode(s)),
            "html_attribute_encode" => with_str(value, |s| html_attribute_encode(s)),
            "html_decode" => with_str(value, |s| html_decode(s)),
            "url_encode" => with_str(value, |s| url_encode(s)),
            "url_path_encode" => with_str(value, |s| url_path_encode(s)),
            "url_decode" => with_str(value, |s| url_decode(s)),
            "len" => match value {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(RenderError::TypeMismatch {
                    expected: "string",
                    found: other.type_name(),
                }),
            },
            "str" => Ok(Value::Str(value.to_string())),
            _ => Err(RenderError::UnknownFunction(name.to_string())),
        }
    }
}

fn with_str(
    value: Value,
    f: impl FnOnce(&str) -> String,
) -> Result<Value, RenderError> {
    match value {
        Value::Str(s) => Ok(Value::Str(f(&s))),
        other => Err(RenderError::TypeMismatch {
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn bad_cast(value: &Value, target: &'static str) -> RenderError {
    RenderError::BadCast {
        value: format!("{} '{}'", value.type_name(), value),
        target,
    }
}

fn as_string(value: Value) -> Result<Value, RenderError> {
    match value {
        Value::Str(_) => Ok(value),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Ok(Value::Str(value.to_string())),
        Value::Null => Err(bad_cast(&value, "string")),
    }
}

fn as_int(value: Value) -> Result<Value, RenderError> {
    match value {
        Value::Int(_) => Ok(value),
        Value::Float(x) if x.fract() == 0.0 => Ok(Value::Int(x as i64)),
        Value::Str(ref s) => match s.trim().parse::<i64>() {
            Ok(n) => Ok(Value::Int(n)),
            Err(_) => Err(bad_cast(&value, "int")),
        },
        _ => Err(bad_cast(&value, "int")),
    }
}

fn as_float(value: Value) -> Result<Value, RenderError> {
    match value {
        Value::Float(_) => Ok(value),
        Value::Int(n) => Ok(Value::Float(n as f64)),
        Value::Str(ref s) => match s.trim().parse::<f64>() {
            Ok(x) => Ok(Value::Float(x)),
            Err(_) => Err(bad_cast(&value, "float")),
        },
        _ => Err(bad_cast(&value, "float")),
    }
}

fn as_bool(value: Value) -> Result<Value, RenderError> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Str(ref s) => match s.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(bad_cast(&value, "bool")),
        },
        _ => Err(bad_cast(&value, "bool")),
    }
}

fn binary_values(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RenderError> {
    match op {
        BinaryOp::Add => add(lhs, rhs),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            compare(op, lhs, rhs)
        }
        // Short-circuit forms are handled in eval; this path serves
        // unchecked programs only
        BinaryOp::And | BinaryOp::Or => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == BinaryOp::And {
                a && b
            } else {
                a || b
            })),
            (Value::Bool(_), other) | (other, _) => Err(RenderError::TypeMismatch {
                expected: "bool",
                found: other.type_name(),
            }),
        },
    }
}

/// `+` concatenates when either side is a string, otherwise adds.
fn add(lhs: Value, rhs: Value) -> Result<Value, RenderError> {
    if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) {
        return Ok(Value::Str(format!("{}{}", lhs, rhs)));
    }
    arithmetic(BinaryOp::Add, lhs, rhs)
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RenderError> {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::Int(a), Value::Float(b)) => Ok(float_arithmetic(op, *a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Ok(float_arithmetic(op, *a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(float_arithmetic(op, *a, *b)),
        _ => {
            let offender = if matches!(lhs, Value::Int(_) | Value::Float(_)) {
                &rhs
            } else {
                &lhs
            };
            Err(RenderError::TypeMismatch {
                expected: "number",
                found: offender.type_name(),
            })
        }
    }
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, RenderError> {
    Ok(Value::Int(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(RenderError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        _ => {
            if b == 0 {
                return Err(RenderError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
    }))
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    })
}

/// Equality promotes int/float pairs; values of different shapes are simply
/// unequal.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RenderError> {
    use std::cmp::Ordering;
    let ordering: Option<Ordering> = match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(RenderError::TypeMismatch {
                expected: "two numbers or two strings",
                found: lhs.type_name(),
            })
        }
    };
    // NaN comparisons are all false, matching float semantics
    let result = match ordering {
        None => false,
        Some(ordering) => match op {
            BinaryOp::Less => ordering.is_lt(),
            BinaryOp::LessEq => ordering.is_le(),
            BinaryOp::Greater => ordering.is_gt(),
            _ => ordering.is_ge(),
        },
    };
    Ok(Value::Bool(result))
}

fn html_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn html_attribute_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn html_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];
        // Entities are short; anything without a nearby ';' is literal text
        let Some(semi) = rest.find(';').filter(|&semi| semi <= 9) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix('#')
                .and_then(|digits| digits.parse::<u32>().ok())
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn url_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Path variant: keeps printable ASCII (including '/') intact and
/// percent-encodes spaces, controls, and non-ASCII bytes.
fn url_path_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        match b {
            b'!'..=b'~' if b != b'%' && b != b'"' && b != b'<' && b != b'>' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let pair = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(pair, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::grammar::parse;

    fn run(source: &str, args: &[Value]) -> Result<String, RenderError> {
        execute(&parse(source).expect("should parse"), args)
    }

    #[test]
    fn test_emit_literal() {
        assert_eq!(run(r#"emit("hi");"#, &[]).unwrap(), "hi");
    }

    #[test]
    fn test_arg_binding_and_cast() {
        let out = run(
            r#"let name = as_string(arg(0)); emit("Hello "); emit(name);"#,
            &[Value::from("World")],
        )
        .unwrap();
        assert_eq!(out, "Hello World");
    }

    #[test]
    fn test_if_else_branches() {
        let source = r#"let x = as_int(arg(0)); if (x > 0) { emit("pos"); } else { emit("neg"); }"#;
        assert_eq!(run(source, &[Value::Int(5)]).unwrap(), "pos");
        assert_eq!(run(source, &[Value::Int(-1)]).unwrap(), "neg");
    }

    #[test]
    fn test_while_loop() {
        let source = r#"let i = 0; while (i < 3) { emit(str(i)); i = i + 1; }"#;
        assert_eq!(run(source, &[]).unwrap(), "012");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run(r#"emit("n=" + 4);"#, &[]).unwrap(), "n=4");
        assert_eq!(run(r#"emit(1 + 2);"#, &[]).unwrap(), "3");
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(run("emit(1 + 0.5);", &[]).unwrap(), "1.5");
        assert_eq!(run("emit(7 / 2);", &[]).unwrap(), "3");
        assert_eq!(run("emit(7.0 / 2);", &[]).unwrap(), "3.5");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run("emit(1 / 0);", &[]), Err(RenderError::DivisionByZero));
        assert_eq!(run("emit(1 % 0);", &[]), Err(RenderError::DivisionByZero));
    }

    #[test]
    fn test_condition_must_be_bool() {
        let err = run("if (1) { emit(\"x\"); }", &[]).unwrap_err();
        assert_eq!(
            err,
            RenderError::TypeMismatch {
                expected: "bool",
                found: "int"
            }
        );
    }

    #[test]
    fn test_short_circuit_skips_rhs() {
        // The right side would fault if evaluated
        let source = "if (false && (1 / 0) == 1) { emit(\"a\"); } else { emit(\"b\"); }";
        assert_eq!(run(source, &[]).unwrap(), "b");
    }

    #[test]
    fn test_equality_promotes_numbers() {
        assert_eq!(run("if (1 == 1.0) { emit(\"y\"); }", &[]).unwrap(), "y");
        assert_eq!(
            run("if (\"a\" != 1) { emit(\"y\"); }", &[]).unwrap(),
            "y"
        );
    }

    #[test]
    fn test_arg_out_of_range() {
        assert_eq!(
            run("emit(arg(2));", &[Value::Int(1)]),
            Err(RenderError::ArgumentOutOfRange(2))
        );
    }

    #[test]
    fn test_bad_cast() {
        let err = run("emit(as_int(arg(0)));", &[Value::from("abc")]).unwrap_err();
        assert!(matches!(err, RenderError::BadCast { target: "int", .. }));
    }

    #[test]
    fn test_cast_parses_strings() {
        assert_eq!(
            run("emit(as_int(arg(0)) + 1);", &[Value::from("41")]).unwrap(),
            "42"
        );
        assert_eq!(
            run("if (as_bool(arg(0))) { emit(\"t\"); }", &[Value::from("true")]).unwrap(),
            "t"
        );
    }

    #[test]
    fn test_emit_null_renders_nothing() {
        assert_eq!(run("emit(null);", &[]).unwrap(), "");
    }

    #[test]
    fn test_len_and_str() {
        assert_eq!(run(r#"emit(len("héllo"));"#, &[]).unwrap(), "5");
        assert_eq!(run("emit(str(true));", &[]).unwrap(), "true");
    }

    #[test]
    fn test_html_encode() {
        assert_eq!(html_encode(r#"a < b & "c""#), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(html_attribute_encode(r#"<a href="x">"#), "&lt;a href=&quot;x&quot;>");
    }

    #[test]
    fn test_html_decode() {
        assert_eq!(html_decode("a &lt; b &amp; c"), "a < b & c");
        assert_eq!(html_decode("&#65;"), "A");
        // Double-encoded text decodes one layer only
        assert_eq!(html_decode("&amp;lt;"), "&lt;");
        // Bare ampersands survive
        assert_eq!(html_decode("a & b"), "a & b");
    }

    #[test]
    fn test_url_encode_decode() {
        assert_eq!(url_encode("a b&c"), "a+b%26c");
        assert_eq!(url_decode("a+b%26c"), "a b&c");
        assert_eq!(url_path_encode("a b/c"), "a%20b/c");
    }

    #[test]
    fn test_block_scope_shadowing() {
        let source = r#"
            let x = "outer";
            if (true) {
                let x = "inner";
                emit(x);
            }
            emit(x);
        "#;
        assert_eq!(run(source, &[]).unwrap(), "innerouter");
    }

    #[test]
    fn test_assignment_reaches_outer_scope() {
        let source = r#"
            let x = 1;
            if (true) {
                x = 2;
            }
            emit(x);
        "#;
        assert_eq!(run(source, &[]).unwrap(), "2");
    }
}
