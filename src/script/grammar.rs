//! Parser for the generated script language using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::Logos;

use crate::script::ast::*;
use crate::script::check::ScriptDiagnostic;
use crate::script::lexer::Token;

/// Parse generated script source into a program.
///
/// Lexing errors and parse errors are both reported as error-severity
/// diagnostics with spans in generated-source coordinates.
pub fn parse(source: &str) -> Result<Program, Vec<ScriptDiagnostic>> {
    let len = source.len();

    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, SimpleSpan::from(span))),
            Err(()) => {
                return Err(vec![ScriptDiagnostic::error(
                    format!("unexpected character '{}'", &source[span.clone()]),
                    span,
                )]);
            }
        }
    }

    // Turn the token list into a stream that chumsky can use
    let token_stream =
        Stream::from_iter(tokens.into_iter()).map((len..len).into(), |(t, s): (_, _)| (t, s));

    program_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(rich_to_diagnostic).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn rich_to_diagnostic(err: Rich<'_, Token>) -> ScriptDiagnostic {
    use chumsky::error::{RichPattern, RichReason};

    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => match found {
            Some(tok) => format!("unexpected {}", format_token(tok)),
            None => "unexpected end of generated source".to_string(),
        },
        RichReason::Custom(msg) => msg.to_string(),
    };

    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| match e {
            RichPattern::Token(tok) => Some(format_token(tok)),
            RichPattern::Label(label) => Some(label.to_string()),
            RichPattern::EndOfInput => Some("end of input".to_string()),
            RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
            RichPattern::Any => Some("any token".to_string()),
            RichPattern::SomethingElse => None,
        })
        .collect();

    let message = if expected.is_empty() {
        message
    } else {
        format!("{}; expected {}", message, expected.join(", "))
    };

    ScriptDiagnostic::error(message, err.span().into_range())
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string {:?}", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(x) => format!("number {}", x),
        Token::Let => "keyword 'let'".to_string(),
        Token::If => "keyword 'if'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::While => "keyword 'while'".to_string(),
        Token::For => "keyword 'for'".to_string(),
        Token::True => "keyword 'true'".to_string(),
        Token::False => "keyword 'false'".to_string(),
        Token::Null => "keyword 'null'".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::NotEq => "'!='".to_string(),
        Token::LessEq => "'<='".to_string(),
        Token::GreaterEq => "'>='".to_string(),
        Token::AndAnd => "'&&'".to_string(),
        Token::OrOr => "'||'".to_string(),
        Token::Less => "'<'".to_string(),
        Token::Greater => "'>'".to_string(),
        Token::Assign => "'='".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Semi => "';'".to_string(),
        other => format!("{:?}", other),
    }
}

/// Fold a parsed operator chain into a left-associative binary tree
fn fold_binary(
    (first, rest): (Spanned<Expr>, Vec<(BinaryOp, Spanned<Expr>)>),
) -> Spanned<Expr> {
    rest.into_iter().fold(first, |lhs, (op, rhs)| {
        let span = lhs.span.start..rhs.span.end;
        Spanned::new(
            Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    })
}

fn program_parser<'a, I>() -> impl Parser<'a, I, Program, extra::Err<Rich<'a, Token>>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    // Expression grammar, precedence-climbing from atoms up to `||`
    let expr = recursive(|expr| {
        let literal = select! {
            Token::Null => Expr::Null,
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Int(n) => Expr::Int(n),
            Token::Float(x) => Expr::Float(x),
            Token::Str(s) => Expr::Str(s),
        }
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())));

        let call = identifier
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map_with(|(name, args), e| {
                Spanned::new(Expr::Call { name, args }, span_range(&e.span()))
            });

        let variable = identifier
            .clone()
            .map(|id| Spanned::new(Expr::Var(id.node.clone()), id.span));

        let paren = expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        // Call before variable: both start with an identifier
        let atom = choice((literal, call, variable, paren)).boxed();

        let unary = recursive(|unary| {
            choice((
                just(Token::Minus).to(UnaryOp::Neg),
                just(Token::Bang).to(UnaryOp::Not),
            ))
            .map_with(|op, e| (op, span_range(&e.span())))
            .then(unary.clone())
            .map(|((op, op_span), operand): (_, Spanned<Expr>)| {
                let span = op_span.start..operand.span.end;
                Spanned::new(
                    Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            })
            .or(atom)
        });

        let product = unary
            .clone()
            .then(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                    just(Token::Percent).to(BinaryOp::Rem),
                ))
                .then(unary.clone())
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let sum = product
            .clone()
            .then(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product.clone())
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let comparison = sum
            .clone()
            .then(
                choice((
                    just(Token::LessEq).to(BinaryOp::LessEq),
                    just(Token::GreaterEq).to(BinaryOp::GreaterEq),
                    just(Token::Less).to(BinaryOp::Less),
                    just(Token::Greater).to(BinaryOp::Greater),
                ))
                .then(sum.clone())
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let equality = comparison
            .clone()
            .then(
                choice((
                    just(Token::EqEq).to(BinaryOp::Eq),
                    just(Token::NotEq).to(BinaryOp::NotEq),
                ))
                .then(comparison.clone())
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let conjunction = equality
            .clone()
            .then(
                just(Token::AndAnd)
                    .to(BinaryOp::And)
                    .then(equality.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        conjunction
            .clone()
            .then(
                just(Token::OrOr)
                    .to(BinaryOp::Or)
                    .then(conjunction.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed()
    });

    // Recursive statement parser
    let statement = recursive(|stmt| {
        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let let_stmt = just(Token::Let)
            .ignore_then(identifier.clone())
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|(name, value)| Stmt::Let { name, value });

        let assign_stmt = identifier
            .clone()
            .then_ignore(just(Token::Assign))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|(name, value)| Stmt::Assign { name, value });

        let expr_stmt = expr
            .clone()
            .then_ignore(just(Token::Semi))
            .map(Stmt::Expr);

        // `else if` nests the trailing `if` as a single-statement branch
        let if_stmt = recursive(|if_stmt| {
            just(Token::If)
                .ignore_then(
                    expr.clone()
                        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
                )
                .then(block.clone())
                .then(
                    just(Token::Else)
                        .ignore_then(choice((
                            if_stmt
                                .clone()
                                .map_with(|s, e| vec![Spanned::new(s, span_range(&e.span()))]),
                            block.clone(),
                        )))
                        .or_not(),
                )
                .map(|((cond, then_branch), else_branch)| Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                })
        });

        let while_stmt = just(Token::While)
            .ignore_then(
                expr.clone()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .then(block.clone())
            .map(|(cond, body)| Stmt::While { cond, body });

        // Assignment before expression statement: both start with an
        // identifier
        choice((let_stmt, if_stmt, while_stmt, assign_stmt, expr_stmt))
            .map_with(|s, e| Spanned::new(s, span_range(&e.span())))
            .boxed()
    });

    statement
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|statements| Program { statements })
}
