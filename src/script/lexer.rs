//! Lexer for the generated script language using logos

use logos::Logos;

/// Byte range in generated source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords; `for` is reserved but has no statement form yet
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Operators (longer patterns first)
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // Literals - identifiers must come after keywords. A leading `@` is the
    // escape prefix letting reserved words act as plain identifiers; it is
    // stripped here, so `@while` lexes as the identifier `while`.
    #[regex(r"@?[\p{L}_][\p{L}\p{M}\p{Nd}\p{Pc}]*", |lex| {
        let s = lex.slice();
        s.strip_prefix('@').unwrap_or(s).to_string()
    }, priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

/// Decode the escapes the code generator produces for string literals.
/// The escape set must round-trip with the generator's escaping exactly.
fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Token::lexer(input)
            .filter_map(|tok| tok.ok())
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("let if else while true false null"),
            vec![
                Token::Let,
                Token::If,
                Token::Else,
                Token::While,
                Token::True,
                Token::False,
                Token::Null,
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            lex("== != <= >= && || < > = !"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::LessEq,
                Token::GreaterEq,
                Token::AndAnd,
                Token::OrOr,
                Token::Less,
                Token::Greater,
                Token::Assign,
                Token::Bang,
            ]
        );
    }

    #[test]
    fn test_identifiers_and_keyword_split() {
        assert_eq!(
            lex("letter whiled x_1"),
            vec![
                Token::Ident("letter".into()),
                Token::Ident("whiled".into()),
                Token::Ident("x_1".into()),
            ]
        );
    }

    #[test]
    fn test_escape_prefix_stripped() {
        assert_eq!(lex("@while"), vec![Token::Ident("while".into())]);
        assert_eq!(lex("@name"), vec![Token::Ident("name".into())]);
        // Without the prefix the keyword wins
        assert_eq!(lex("while"), vec![Token::While]);
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(lex("größe"), vec![Token::Ident("größe".into())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 3.14"),
            vec![Token::Int(42), Token::Float(3.14)]
        );
    }

    #[test]
    fn test_string_escapes_round_trip() {
        assert_eq!(
            lex(r#""a\"b\\c\nd\te""#),
            vec![Token::Str("a\"b\\c\nd\te".into())]
        );
    }

    #[test]
    fn test_statement() {
        assert_eq!(
            lex(r#"emit("hi");"#),
            vec![
                Token::Ident("emit".into()),
                Token::ParenOpen,
                Token::Str("hi".into()),
                Token::ParenClose,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            lex("let // trailing\nx /* block */ ;"),
            vec![Token::Let, Token::Ident("x".into()), Token::Semi]
        );
    }

    #[test]
    fn test_invalid_character_is_error() {
        let results: Vec<_> = Token::lexer("let # x").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}
