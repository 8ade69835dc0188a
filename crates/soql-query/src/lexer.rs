//! SOQL lexer using logos

use logos::Logos;
use soql_core::{Error, Result};
use std::fmt;

/// Kinds of SOQL tokens
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// End of input, produced once after the last real token
    Eof,

    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    // Literals
    #[regex(r"[0-9][0-9.]*")]
    Number,

    #[regex(r"'([^']|'')*'")]
    String,

    // Keywords and identifiers share one kind; the parser tells them apart
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Keyword,

    // Symbols
    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftCurly,

    #[token("}")]
    RightCurly,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("?")]
    Question,

    // Operators
    #[token("+")]
    Add,

    #[token("-")]
    Sub,

    #[token("*")]
    Mul,

    #[token("/")]
    Div,

    #[token("%")]
    Mod,

    #[token("!")]
    Not,

    #[token("=")]
    #[token("==")]
    Equal,

    #[token("<>")]
    #[token("!=")]
    NotEqual,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("<=")]
    LessOrEqual,

    #[token(">=")]
    GreaterOrEqual,

    #[token("&&")]
    And,

    #[token("||")]
    Or,
}

impl TokenKind {
    /// Human readable description used in syntax errors
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of input",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Keyword => "identifier",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftCurly => "'{'",
            TokenKind::RightCurly => "'}'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Question => "'?'",
            TokenKind::Add => "'+'",
            TokenKind::Sub => "'-'",
            TokenKind::Mul => "'*'",
            TokenKind::Div => "'/'",
            TokenKind::Mod => "'%'",
            TokenKind::Not => "'!'",
            TokenKind::Equal => "'='",
            TokenKind::NotEqual => "'<>'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::LessOrEqual => "'<='",
            TokenKind::GreaterOrEqual => "'>='",
            TokenKind::And => "'&&'",
            TokenKind::Or => "'||'",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A token with its source text and byte position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text (string tokens keep their quotes and doubled quotes)
    pub text: String,
    /// Lowercase copy of `text` for keyword comparison
    pub lower: String,
    /// Byte offset of the first character in the source
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str, position: usize) -> Self {
        Self {
            kind,
            text: text.to_string(),
            lower: text.to_ascii_lowercase(),
            position,
        }
    }

    fn eof(position: usize) -> Self {
        Self::new(TokenKind::Eof, "", position)
    }

    /// Check if this token is the given keyword, ignoring case
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.lower == keyword
    }

    /// Unescaped contents of a string token
    pub fn string_value(&self) -> Option<String> {
        if self.kind != TokenKind::String || self.text.len() < 2 {
            return None;
        }
        let inner = &self.text[1..self.text.len() - 1];
        Some(inner.replace("''", "'"))
    }

    /// Description used in syntax errors
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

/// Streaming tokenizer with a single forward cursor
pub struct Lexer<'a> {
    source: &'a str,
    inner: logos::Lexer<'a, TokenKind>,
    skip_whitespace: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer that skips whitespace
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
            skip_whitespace: true,
            finished: false,
        }
    }

    /// Yield whitespace tokens instead of skipping them
    pub fn preserve_whitespace(mut self) -> Self {
        self.skip_whitespace = false;
        self
    }

    /// Produce the next token.
    ///
    /// # Panics
    ///
    /// Panics if called again after the end-of-input token was returned.
    pub fn next_token(&mut self) -> Result<Token> {
        assert!(!self.finished, "next_token called after end of input");

        loop {
            match self.inner.next() {
                None => {
                    self.finished = true;
                    return Ok(Token::eof(self.source.len()));
                }
                Some(Ok(TokenKind::Whitespace)) if self.skip_whitespace => continue,
                Some(Ok(kind)) => {
                    return Ok(Token::new(kind, self.inner.slice(), self.inner.span().start));
                }
                Some(Err(())) => {
                    let position = self.inner.span().start;
                    let character = self.source[position..].chars().next().unwrap_or('\0');
                    return Err(Error::Lex {
                        character,
                        position,
                    });
                }
            }
        }
    }

    /// Returns true once the end-of-input token has been produced
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Tokenize a SOQL string; the last token is always `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_query() {
        let tokens = kinds("select Name from Contact where Id = 1");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Keyword,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("a  <= 'x'").unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 3);
        assert_eq!(tokens[2].position, 6);
        assert_eq!(tokens[3].kind, TokenKind::Eof);
        assert_eq!(tokens[3].position, 9);
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("<> != && || <= >= =="),
            vec![
                TokenKind::NotEqual,
                TokenKind::NotEqual,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::LessOrEqual,
                TokenKind::GreaterOrEqual,
                TokenKind::Equal,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("< > = !"),
            vec![
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Equal,
                TokenKind::Not,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escaping() {
        let tokens = tokenize("'it''s'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "'it''s'");
        assert_eq!(tokens[0].string_value().as_deref(), Some("it's"));

        let empty = tokenize("''").unwrap();
        assert_eq!(empty[0].string_value().as_deref(), Some(""));
    }

    #[test]
    fn test_malformed_number_is_one_token() {
        let tokens = tokenize("1.2.3").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].text, "1.2.3");
    }

    #[test]
    fn test_keywords_keep_case() {
        let tokens = tokenize("SeLeCt").unwrap();
        assert_eq!(tokens[0].text, "SeLeCt");
        assert_eq!(tokens[0].lower, "select");
        assert!(tokens[0].is_keyword("select"));
    }

    #[test]
    fn test_invalid_character() {
        let err = tokenize("Name = #1").unwrap_err();
        assert_eq!(
            err,
            Error::Lex {
                character: '#',
                position: 7
            }
        );

        let err = tokenize("a & b").unwrap_err();
        assert!(matches!(err, Error::Lex { character: '&', .. }));

        let err = tokenize("Name = é").unwrap_err();
        assert!(matches!(err, Error::Lex { character: 'é', .. }));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("Name = 'abc").unwrap_err();
        assert!(matches!(err, Error::Lex { character: '\'', position: 7 }));
    }

    #[test]
    fn test_preserve_whitespace() {
        let mut lexer = Lexer::new("a b").preserve_whitespace();
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Keyword);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Whitespace);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Keyword);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert!(lexer.is_finished());
    }

    #[test]
    #[should_panic(expected = "after end of input")]
    fn test_read_past_eof_panics() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        let _ = lexer.next_token();
    }

    #[test]
    fn test_parameters() {
        assert_eq!(
            kinds("{0:S}"),
            vec![
                TokenKind::LeftCurly,
                TokenKind::Number,
                TokenKind::Colon,
                TokenKind::Keyword,
                TokenKind::RightCurly,
                TokenKind::Eof,
            ]
        );
    }
}
