use crate::{CompileError, CompileOptions};
use std::convert::TryFrom;
use std::fmt;
use std::io::{Bytes, Read};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum KeywordKind {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl KeywordKind {
    fn as_str(self) -> &'static str {
        match self {
            KeywordKind::Class => "class",
            KeywordKind::Constructor => "constructor",
            KeywordKind::Function => "function",
            KeywordKind::Method => "method",
            KeywordKind::Field => "field",
            KeywordKind::Static => "static",
            KeywordKind::Var => "var",
            KeywordKind::Int => "int",
            KeywordKind::Char => "char",
            KeywordKind::Boolean => "boolean",
            KeywordKind::Void => "void",
            KeywordKind::True => "true",
            KeywordKind::False => "false",
            KeywordKind::Null => "null",
            KeywordKind::This => "this",
            KeywordKind::Let => "let",
            KeywordKind::Do => "do",
            KeywordKind::If => "if",
            KeywordKind::Else => "else",
            KeywordKind::While => "while",
            KeywordKind::Return => "return",
        }
    }
}

impl TryFrom<&[u8]> for KeywordKind {
    type Error = ();

    fn try_from(word: &[u8]) -> Result<KeywordKind, ()> {
        Ok(match word {
            b"class" => KeywordKind::Class,
            b"constructor" => KeywordKind::Constructor,
            b"function" => KeywordKind::Function,
            b"method" => KeywordKind::Method,
            b"field" => KeywordKind::Field,
            b"static" => KeywordKind::Static,
            b"var" => KeywordKind::Var,
            b"int" => KeywordKind::Int,
            b"char" => KeywordKind::Char,
            b"boolean" => KeywordKind::Boolean,
            b"void" => KeywordKind::Void,
            b"true" => KeywordKind::True,
            b"false" => KeywordKind::False,
            b"null" => KeywordKind::Null,
            b"this" => KeywordKind::This,
            b"let" => KeywordKind::Let,
            b"do" => KeywordKind::Do,
            b"if" => KeywordKind::If,
            b"else" => KeywordKind::Else,
            b"while" => KeywordKind::While,
            b"return" => KeywordKind::Return,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum TokenKind {
    Keyword(KeywordKind),
    Symbol(u8),
    /// Digits as written; the range check happens at parse time.
    IntConst(String),
    StrConst(String),
    Identifier(String),
    EndOfFile,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => write!(f, "keyword `{}`", keyword),
            TokenKind::Symbol(b) => write!(f, "symbol `{}`", *b as char),
            TokenKind::IntConst(digits) => write!(f, "integer constant {}", digits),
            TokenKind::StrConst(_) => write!(f, "string constant"),
            TokenKind::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenKind::EndOfFile => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub(crate) fn expect_identifier(self) -> Result<String, CompileError> {
        match self.kind {
            TokenKind::Identifier(name) => Ok(name),
            kind => Err(CompileError::unexpected(self.line, "an identifier", kind)),
        }
    }

    pub(crate) fn expect_symbol(self) -> Result<(u8, usize), CompileError> {
        match self.kind {
            TokenKind::Symbol(b) => Ok((b, self.line)),
            kind => Err(CompileError::unexpected(self.line, "a symbol", kind)),
        }
    }

    pub(crate) fn expect_spec_symbol(self, expected: u8) -> Result<(), CompileError> {
        match self.kind {
            TokenKind::Symbol(b) if b == expected => Ok(()),
            kind => Err(CompileError::unexpected(
                self.line,
                format!("`{}`", expected as char),
                kind,
            )),
        }
    }

    pub(crate) fn expect_spec_keyword(self, expected: KeywordKind) -> Result<(), CompileError> {
        match self.kind {
            TokenKind::Keyword(keyword) if keyword == expected => Ok(()),
            kind => Err(CompileError::unexpected(
                self.line,
                format!("keyword `{}`", expected),
                kind,
            )),
        }
    }
}

/// Lazily turns a byte stream into tokens, stripping whitespace and the
/// three comment forms. One byte and one token of pushback, no further
/// lookahead.
pub struct Tokenizer<T: Read> {
    bytes: Bytes<T>,
    prev: Option<u8>,
    line: usize,
    prev_token: Option<Token>,
    shift_ops: bool,
}

impl<T: Read> Tokenizer<T> {
    pub fn new(reader: T) -> Self {
        Tokenizer::with_options(reader, CompileOptions::default())
    }

    pub fn with_options(reader: T, options: CompileOptions) -> Self {
        Tokenizer {
            bytes: reader.bytes(),
            prev: None,
            line: 1,
            prev_token: None,
            shift_ops: options.shift_ops,
        }
    }

    fn read(&mut self) -> Result<Option<u8>, CompileError> {
        if let Some(b) = self.prev.take() {
            return Ok(Some(b));
        }
        match self.bytes.next() {
            Some(r) => {
                let b = r?;
                if b == b'\n' {
                    self.line += 1;
                }
                Ok(Some(b))
            }
            None => Ok(None),
        }
    }

    fn unread(&mut self, b: u8) {
        if b == b'\n' {
            self.line -= 1;
        }
        self.prev = Some(b);
    }

    pub fn unread_token(&mut self, token: Token) {
        self.prev_token = Some(token);
    }

    pub fn advance(&mut self) -> Result<Token, CompileError> {
        if let Some(token) = self.prev_token.take() {
            return Ok(token);
        }
        loop {
            let b = match self.read()? {
                Some(b) => b,
                None => {
                    return Ok(Token {
                        kind: TokenKind::EndOfFile,
                        line: self.line,
                    })
                }
            };
            match b {
                b' ' | b'\x09'..=b'\x0d' => continue,
                b'/' => match self.read()? {
                    Some(b'/') => {
                        self.skip_line_comment()?;
                        continue;
                    }
                    Some(b'*') => {
                        // `/** ... */` doc comments are plain block comments
                        self.skip_block_comment()?;
                        continue;
                    }
                    Some(next) => {
                        self.unread(next);
                        return Ok(self.symbol(b'/'));
                    }
                    None => return Ok(self.symbol(b'/')),
                },
                b'"' => return self.string_constant(),
                b'0'..=b'9' => return self.integer_constant(b),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => return self.word(b),
                _ => return self.any_symbol(b),
            }
        }
    }

    fn skip_line_comment(&mut self) -> Result<(), CompileError> {
        while let Some(b) = self.read()? {
            if b == b'\n' {
                break;
            }
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), CompileError> {
        let start = self.line;
        loop {
            match self.read()? {
                Some(b'*') => match self.read()? {
                    Some(b'/') => return Ok(()),
                    Some(next) => self.unread(next),
                    None => return Err(CompileError::UnterminatedComment { line: start }),
                },
                Some(_) => {}
                None => return Err(CompileError::UnterminatedComment { line: start }),
            }
        }
    }

    fn string_constant(&mut self) -> Result<Token, CompileError> {
        let line = self.line;
        let mut result = vec![];
        while let Some(b) = self.read()? {
            match b {
                b'"' => {
                    return Ok(Token {
                        kind: TokenKind::StrConst(String::from_utf8(result)?),
                        line,
                    })
                }
                // a string constant may not span a newline
                b'\n' => break,
                _ => result.push(b),
            }
        }
        Err(CompileError::UnterminatedString { line })
    }

    fn integer_constant(&mut self, first: u8) -> Result<Token, CompileError> {
        let line = self.line;
        let mut digits = vec![first];
        while let Some(b) = self.read()? {
            match b {
                b'0'..=b'9' => digits.push(b),
                _ => {
                    self.unread(b);
                    break;
                }
            }
        }
        Ok(Token {
            kind: TokenKind::IntConst(String::from_utf8(digits)?),
            line,
        })
    }

    fn word(&mut self, first: u8) -> Result<Token, CompileError> {
        let line = self.line;
        let mut result = vec![first];
        while let Some(b) = self.read()? {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'0'..=b'9' => result.push(b),
                _ => {
                    self.unread(b);
                    break;
                }
            }
        }
        let kind = match KeywordKind::try_from(&result[..]) {
            Ok(keyword) => TokenKind::Keyword(keyword),
            Err(()) => TokenKind::Identifier(String::from_utf8(result)?),
        };
        Ok(Token { kind, line })
    }

    fn any_symbol(&mut self, b: u8) -> Result<Token, CompileError> {
        match b {
            b'{' | b'}' | b'(' | b')' | b'[' | b']' | b'.' | b',' | b';' | b'+' | b'-'
            | b'*' | b'/' | b'&' | b'|' | b'<' | b'>' | b'=' | b'~' => Ok(self.symbol(b)),
            b'^' | b'#' if self.shift_ops => Ok(self.symbol(b)),
            _ => Err(CompileError::UnexpectedChar {
                line: self.line,
                found: b as char,
            }),
        }
    }

    fn symbol(&self, b: u8) -> Token {
        Token {
            kind: TokenKind::Symbol(b),
            line: self.line,
        }
    }
}

#[cfg(test)]
fn kinds(source: &str) -> Vec<TokenKind> {
    let mut tokens = Tokenizer::new(source.as_bytes());
    let mut result = vec![];
    loop {
        let token = tokens.advance().unwrap();
        if token.kind == TokenKind::EndOfFile {
            break;
        }
        result.push(token.kind);
    }
    result
}

#[test]
fn test_let_statement_token_kinds() {
    assert_eq!(
        kinds("let x[1] = 2;"),
        vec![
            TokenKind::Keyword(KeywordKind::Let),
            TokenKind::Identifier("x".into()),
            TokenKind::Symbol(b'['),
            TokenKind::IntConst("1".into()),
            TokenKind::Symbol(b']'),
            TokenKind::Symbol(b'='),
            TokenKind::IntConst("2".into()),
            TokenKind::Symbol(b';'),
        ]
    );
}

#[test]
fn test_keyword_classification() {
    assert_eq!(KeywordKind::try_from(&b"class"[..]), Ok(KeywordKind::Class));
    assert_eq!(KeywordKind::try_from(&b"return"[..]), Ok(KeywordKind::Return));
    assert_eq!(KeywordKind::try_from(&b"classes"[..]), Err(()));
}

#[test]
fn test_comments_are_stripped() {
    let source = "// line comment\n\
                  class /* inline */ Foo { /** doc\n\
                  spanning lines */ }";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Keyword(KeywordKind::Class),
            TokenKind::Identifier("Foo".into()),
            TokenKind::Symbol(b'{'),
            TokenKind::Symbol(b'}'),
        ]
    );
}

#[test]
fn test_string_constant_without_quotes() {
    assert_eq!(
        kinds("\"hello world\""),
        vec![TokenKind::StrConst("hello world".into())]
    );
}

#[test]
fn test_token_lines() {
    let mut tokens = Tokenizer::new("class\n\nFoo".as_bytes());
    assert_eq!(tokens.advance().unwrap().line, 1);
    assert_eq!(tokens.advance().unwrap().line, 3);
}

#[test]
fn test_unterminated_string_reports_line() {
    let mut tokens = Tokenizer::new("let x =\n\"oops\n;".as_bytes());
    let err = loop {
        match tokens.advance() {
            Ok(_) => {}
            Err(err) => break err,
        }
    };
    assert!(matches!(err, CompileError::UnterminatedString { line: 2 }));
}

#[test]
fn test_unknown_character_is_fatal() {
    let mut tokens = Tokenizer::new("let %".as_bytes());
    tokens.advance().unwrap();
    let err = tokens.advance().unwrap_err();
    assert!(matches!(err, CompileError::UnexpectedChar { found: '%', .. }));
}

#[test]
fn test_shift_symbols_are_gated() {
    let mut tokens = Tokenizer::new("^".as_bytes());
    assert!(tokens.advance().is_err());

    let options = CompileOptions { shift_ops: true };
    let mut tokens = Tokenizer::with_options("^ #".as_bytes(), options);
    assert_eq!(tokens.advance().unwrap().kind, TokenKind::Symbol(b'^'));
    assert_eq!(tokens.advance().unwrap().kind, TokenKind::Symbol(b'#'));
}
