//! # Lexer
//!
//! Splits script source into tokens with [Logos]. Whitespace and comments are
//! skipped, but each token remembers whether a line break preceded it so the
//! parser can end statements at line ends.
//!
//! [Logos]: https://docs.rs/logos

use std::ops::Range;

use logos::Logos;

use crate::error::SandboxError;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"([ \t\r\f]+|//[^\n]*)")]
pub enum TokenKind {
    #[token("\n")]
    Newline,

    /// Dropped by [`lex`]; counts as a line break when it spans one.
    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F]+")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("function")]
    Function,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("of")]
    Of,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("new")]
    New,
    #[token("typeof")]
    Typeof,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("=>")]
    Arrow,

    #[token("==")]
    EqEq,
    #[token("===")]
    EqEqEq,
    #[token("!=")]
    NotEq,
    #[token("!==")]
    NotEqEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("??")]
    QuestionQuestion,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    /// End of input, never produced by Logos.
    Eof,
}

impl TokenKind {
    /// Words that may still be used as property names after `.`.
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Let | Const
                | Var
                | Function
                | Return
                | If
                | Else
                | While
                | For
                | Of
                | Break
                | Continue
                | Throw
                | Try
                | Catch
                | Finally
                | New
                | Typeof
                | True
                | False
                | Null
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Range<usize>,
    /// A line break sits between this token and the previous one.
    pub newline_before: bool,
}

fn block_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Tokenizes `input`. Characters outside the grammar are a syntax error.
pub fn lex(input: &str) -> Result<Vec<Token<'_>>, SandboxError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);
    let mut newline_before = false;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(TokenKind::Newline) => newline_before = true,
            Ok(TokenKind::BlockComment) => {
                newline_before |= lexer.slice().contains('\n');
            }
            Ok(kind) => {
                tokens.push(Token {
                    kind,
                    text: lexer.slice(),
                    span,
                    newline_before,
                });
                newline_before = false;
            }
            Err(()) if lexer.slice() == "/*" => {
                return Err(SandboxError::syntax(format!(
                    "Unterminated comment at offset {}",
                    span.start
                )));
            }
            Err(()) => {
                return Err(SandboxError::syntax(format!(
                    "Unexpected character {:?} at offset {}",
                    lexer.slice(),
                    span.start
                )));
            }
        }
    }

    Ok(tokens)
}

/// Decodes the body of a quoted string token.
pub fn unescape(quoted: &str) -> String {
    let inner = quoted
        .get(1..quoted.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&hex),
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        lex(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty_input() {
        assert_eq!(kinds(""), vec![]);
    }

    #[test]
    fn keywords_are_not_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("let letter = typeof x"),
            vec![Let, Ident, Eq, Typeof, Ident]
        );
    }

    #[test]
    fn longest_operator_wins() {
        use TokenKind::*;
        assert_eq!(
            kinds("a === b !== c ** d => e ?? f"),
            vec![
                Ident, EqEqEq, Ident, NotEqEq, Ident, StarStar, Ident, Arrow, Ident,
                QuestionQuestion, Ident
            ]
        );
    }

    #[test]
    fn numbers() {
        use TokenKind::*;
        assert_eq!(kinds("1 2.5 .5 1e3 0xff"), vec![Number; 5]);
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("a // note\n/* block\n */ b"), vec![Ident, Ident]);
    }

    #[test]
    fn block_comments_span_lines() {
        use TokenKind::*;
        let src = "/**\n * header ** with stars\n */\nlet a = 1 /* x */ + 2;\n/*/ still a comment */";
        assert_eq!(kinds(src), vec![Let, Ident, Eq, Number, Plus, Number, Semicolon]);

        let tokens = lex("a /* one\ntwo */ b /* inline */ c").unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = lex("a /* never closed").unwrap_err();
        assert!(err.to_string().contains("Unterminated comment"), "{err}");
    }

    #[test]
    fn newline_is_recorded() {
        let tokens = lex("a\nb c").unwrap();
        let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn strings_unescape() {
        let tokens = lex(r#""a\"b" 'c\n'"#).unwrap();
        assert_eq!(unescape(tokens[0].text), "a\"b");
        assert_eq!(unescape(tokens[1].text), "c\n");
    }

    #[test]
    fn unknown_character_is_a_syntax_error() {
        let err = lex("a # b").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::SyntaxError);
    }
}
