//! Tokenizer for textual LLVM IR.

use std::iter::Peekable;
use std::str::Chars;

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `@name` or `@"quoted name"`.
    GlobalIdent(String),
    /// `%name`, `%"quoted"` or `%42`.
    LocalIdent(String),
    /// `!name` or `!42`; the payload may be empty for a bare `!`.
    MetadataIdent(String),
    /// `#42` attribute-group reference.
    AttrRef(u64),
    /// Bare word: keywords, opcodes, type names.
    Ident(String),
    /// `iN` integer type.
    IntType(u32),
    /// Decimal integer literal, possibly negative.
    Int(i128),
    /// Floating-point literal (decimal or hexadecimal form), kept as text.
    Float(String),
    /// `"..."` string with escapes resolved.
    Str(String),
    /// `c"..."` byte-string constant.
    CStr(Vec<u8>),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Less,
    Greater,
    Comma,
    Equals,
    Star,
    Colon,
    Ellipsis,
}

/// Tokens annotated with the 1-based source line they start on.
pub type Spanned = (usize, Token);

pub struct Lexer<'input> {
    chars: Peekable<Chars<'input>>,
    line: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == ';' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn is_ident_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$' | '-')
    }

    /// Scan the tail of a `%`/`@`/`!` prefixed identifier.
    fn scan_symbol_tail(&mut self) -> Result<String, String> {
        if self.chars.peek() == Some(&'"') {
            self.bump();
            return self.scan_string_body().map(|bytes| {
                String::from_utf8_lossy(&bytes).into_owned()
            });
        }
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if Self::is_ident_char(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(text)
    }

    /// Scan a quoted string body after the opening quote; resolves `\xx`
    /// hex escapes and `\\`.
    fn scan_string_body(&mut self) -> Result<Vec<u8>, String> {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(bytes),
                Some('\\') => {
                    let hi = self.bump().ok_or("unterminated escape")?;
                    if hi == '\\' {
                        bytes.push(b'\\');
                        continue;
                    }
                    let lo = self.bump().ok_or("unterminated escape")?;
                    let pair = [hi as u8, lo as u8];
                    let text = std::str::from_utf8(&pair).map_err(|_| "bad escape")?;
                    let value = u8::from_str_radix(text, 16)
                        .map_err(|_| format!("bad hex escape \\{}", text))?;
                    bytes.push(value);
                }
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn scan_number(&mut self, first: char) -> Result<Token, String> {
        let mut text = String::new();
        text.push(first);

        // hexadecimal float forms: 0x..., 0xK..., 0xL..., 0xM..., 0xH..., 0xR...
        if first == '0' && self.chars.peek() == Some(&'x') {
            text.push('x');
            self.bump();
            if let Some(&c) = self.chars.peek() {
                if matches!(c, 'K' | 'L' | 'M' | 'H' | 'R') {
                    text.push(c);
                    self.bump();
                }
            }
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return Ok(Token::Float(text));
        }

        let mut is_float = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else if c == '.' {
                // lookahead is single-char; `..` only occurs in `...`, which
                // never follows a digit in this grammar
                is_float = true;
                text.push(c);
                self.bump();
            } else if c == 'e' || c == 'E' {
                is_float = true;
                text.push(c);
                self.bump();
                if let Some(&sign) = self.chars.peek() {
                    if sign == '+' || sign == '-' {
                        text.push(sign);
                        self.bump();
                    }
                }
            } else {
                break;
            }
        }

        if is_float {
            Ok(Token::Float(text))
        } else {
            text.parse::<i128>()
                .map(Token::Int)
                .map_err(|_| format!("integer literal out of range: {}", text))
        }
    }

    fn scan_word(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(&c) = self.chars.peek() {
            if Self::is_ident_char(c) {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        // `iN` integer types
        if let Some(width) = text
            .strip_prefix('i')
            .and_then(|tail| tail.parse::<u32>().ok())
        {
            return Token::IntType(width);
        }
        Token::Ident(text)
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned, (usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        let line = self.line;
        let c = self.bump()?;

        let token = match c {
            '(' => Ok(Token::LParen),
            ')' => Ok(Token::RParen),
            '[' => Ok(Token::LBracket),
            ']' => Ok(Token::RBracket),
            '{' => Ok(Token::LBrace),
            '}' => Ok(Token::RBrace),
            '<' => Ok(Token::Less),
            '>' => Ok(Token::Greater),
            ',' => Ok(Token::Comma),
            '=' => Ok(Token::Equals),
            '*' => Ok(Token::Star),
            ':' => Ok(Token::Colon),
            '@' => self.scan_symbol_tail().map(Token::GlobalIdent),
            '%' => self.scan_symbol_tail().map(Token::LocalIdent),
            '!' => self.scan_symbol_tail().map(Token::MetadataIdent),
            '#' => {
                let tail = self.scan_symbol_tail();
                match tail {
                    Ok(text) => text
                        .parse::<u64>()
                        .map(Token::AttrRef)
                        .map_err(|_| format!("bad attribute reference #{}", text)),
                    Err(e) => Err(e),
                }
            }
            '"' => self
                .scan_string_body()
                .map(|bytes| Token::Str(String::from_utf8_lossy(&bytes).into_owned())),
            'c' if self.chars.peek() == Some(&'"') => {
                self.bump();
                self.scan_string_body().map(Token::CStr)
            }
            '.' => {
                if self.chars.peek() == Some(&'.') {
                    self.bump();
                    if self.bump() == Some('.') {
                        Ok(Token::Ellipsis)
                    } else {
                        Err("stray '..'".to_string())
                    }
                } else {
                    Err("stray '.'".to_string())
                }
            }
            '-' => match self.chars.peek() {
                Some(&d) if d.is_ascii_digit() => {
                    self.bump();
                    match self.scan_number(d) {
                        Ok(Token::Int(v)) => Ok(Token::Int(-v)),
                        Ok(Token::Float(text)) => Ok(Token::Float(format!("-{}", text))),
                        Ok(tok) => Ok(tok),
                        Err(e) => Err(e),
                    }
                }
                _ => Err("stray '-'".to_string()),
            },
            d if d.is_ascii_digit() => self.scan_number(d),
            a if a.is_ascii_alphabetic() || a == '_' || a == '$' => Ok(self.scan_word(a)),
            other => Err(format!("unexpected character '{}'", other)),
        };

        Some(token.map(|tok| (line, tok)).map_err(|msg| (line, msg)))
    }
}
