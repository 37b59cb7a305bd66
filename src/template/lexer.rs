//! Tokeniser for the inside of `{{ … }}` and `{% … %}` spans, ported
//! from the character-scanning in `libliquify/parse.c`/`token.c`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Dot,
    Pipe,
    Colon,
    Comma,
    EqEq,
    NotEq,
    VarEnd, // "}}"
    TagEnd, // "%}"
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier '{s}'"),
            Token::Str(s) => write!(f, "string \"{s}\""),
            Token::Dot => write!(f, "'.'"),
            Token::Pipe => write!(f, "'|'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::VarEnd => write!(f, "'}}}}'"),
            Token::TagEnd => write!(f, "'%}}'"),
        }
    }
}

/// Tracks cursor position in bytes plus 1-based line/column, advancing
/// the way `liquify_parse`'s main loop does: tabs widen by `TABSIZE`
/// (4), newline-family bytes advance the line and reset the column,
/// `\r` is swallowed silently.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pub pos: usize,
    pub line: usize,
    pub col: usize,
    closing: &'static str,
}

const TABSIZE: usize = 4;

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, pos: usize, line: usize, col: usize, closing: &'static str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos,
            line,
            col,
            closing,
        }
    }

    fn advance_position(&mut self, ch: u8) {
        match ch {
            b'\t' => self.col += TABSIZE,
            b'\n' | 0x0c | 0x0b => {
                self.line += 1;
                self.col = 1;
            }
            b'\r' => {}
            _ => self.col += 1,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        self.advance_position(ch);
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// True once the cursor sits at the closing marker (`}}` or `%}`)
    /// after skipping whitespace; does not consume it.
    pub fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.src[self.pos..].starts_with(self.closing)
    }

    pub fn consume_end(&mut self) -> Result<(), String> {
        self.skip_ws();
        if !self.src[self.pos..].starts_with(self.closing) {
            return Err(format!("expected '{}'", self.closing));
        }
        for _ in 0..self.closing.len() {
            self.bump();
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<Option<Token>, String> {
        self.skip_ws();
        if self.src[self.pos..].starts_with(self.closing) {
            return Ok(None);
        }
        let Some(ch) = self.peek() else {
            return Err("unexpected end of template".to_string());
        };
        match ch {
            b'.' => {
                self.bump();
                Ok(Some(Token::Dot))
            }
            b'|' => {
                self.bump();
                Ok(Some(Token::Pipe))
            }
            b':' => {
                self.bump();
                Ok(Some(Token::Colon))
            }
            b',' => {
                self.bump();
                Ok(Some(Token::Comma))
            }
            b'=' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Some(Token::EqEq))
                } else {
                    Err("expected '==', found bare '='".to_string())
                }
            }
            b'!' => {
                self.bump();
                if self.peek() == Some(b'=') {
                    self.bump();
                    Ok(Some(Token::NotEq))
                } else {
                    Err("expected '!=', found bare '!'".to_string())
                }
            }
            b'\'' | b'"' => self.lex_string(ch).map(Some),
            _ if is_ident_start(ch) => Ok(Some(self.lex_ident())),
            _ => Err(format!("unexpected character '{}'", ch as char)),
        }
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_continue(b)) {
            self.bump();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn lex_string(&mut self, quote: u8) -> Result<Token, String> {
        self.bump(); // opening quote
        let mut out = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err("unterminated string literal".to_string());
            };
            if ch == quote {
                break;
            }
            if ch == b'\\' {
                out.push(self.lex_escape(quote)?);
            } else {
                out.push(ch as char);
            }
        }
        Ok(Token::Str(out))
    }

    /// Double-quoted strings support C-style escapes; single-quoted
    /// strings only recognise `\\` and `\'` (spec §4.8).
    fn lex_escape(&mut self, quote: u8) -> Result<char, String> {
        let Some(ch) = self.bump() else {
            return Err("unterminated escape sequence".to_string());
        };
        if quote == b'\'' {
            return match ch {
                b'\\' => Ok('\\'),
                b'\'' => Ok('\''),
                other => Ok(other as char),
            };
        }
        match ch {
            b'a' => Ok('\x07'),
            b'b' => Ok('\x08'),
            b'f' => Ok('\x0c'),
            b'n' => Ok('\n'),
            b'r' => Ok('\r'),
            b't' => Ok('\t'),
            b'v' => Ok('\x0b'),
            b'x' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(b) if b.is_ascii_hexdigit() => {
                            value = value * 16 + (b as char).to_digit(16).unwrap();
                            self.bump();
                        }
                        _ => break,
                    }
                }
                Ok(char::from_u32(value).unwrap_or('\u{FFFD}'))
            }
            b'0'..=b'7' => {
                let mut value = (ch - b'0') as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(b @ b'0'..=b'7') => {
                            value = value * 8 + (b - b'0') as u32;
                            self.bump();
                        }
                        _ => break,
                    }
                }
                Ok(char::from_u32(value).unwrap_or('\u{FFFD}'))
            }
            other => Ok(other as char),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b == b'$' || b.is_ascii_alphabetic()
}

fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || b == b'-'
}
