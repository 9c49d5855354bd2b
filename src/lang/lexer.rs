use crate::error::{ParseError, ParseResult};
use crate::lang::context::Context;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Id(String),
    Real(f64),
    Integer(u64),
    Str(String),

    OpenQasm,
    Include,
    Opaque,
    If,
    Barrier,
    Qreg,
    Creg,
    Gate,
    Measure,
    Reset,
    U,
    CX,
    Pi,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,

    Semicolon,
    Comma,
    EqEq,
    Arrow,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,

    Eof,
}

impl Token {
    fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "OPENQASM" => Token::OpenQasm,
            "include" => Token::Include,
            "opaque" => Token::Opaque,
            "if" => Token::If,
            "barrier" => Token::Barrier,
            "qreg" => Token::Qreg,
            "creg" => Token::Creg,
            "gate" => Token::Gate,
            "measure" => Token::Measure,
            "reset" => Token::Reset,
            "U" => Token::U,
            "CX" => Token::CX,
            "pi" => Token::Pi,
            "sin" => Token::Sin,
            "cos" => Token::Cos,
            "tan" => Token::Tan,
            "exp" => Token::Exp,
            "ln" => Token::Ln,
            "sqrt" => Token::Sqrt,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Id(name) => return write!(f, "identifier '{}'", name),
            Token::Real(v) => return write!(f, "real {}", v),
            Token::Integer(v) => return write!(f, "integer {}", v),
            Token::Str(s) => return write!(f, "string \"{}\"", s),
            Token::OpenQasm => "OPENQASM",
            Token::Include => "include",
            Token::Opaque => "opaque",
            Token::If => "if",
            Token::Barrier => "barrier",
            Token::Qreg => "qreg",
            Token::Creg => "creg",
            Token::Gate => "gate",
            Token::Measure => "measure",
            Token::Reset => "reset",
            Token::U => "U",
            Token::CX => "CX",
            Token::Pi => "pi",
            Token::Sin => "sin",
            Token::Cos => "cos",
            Token::Tan => "tan",
            Token::Exp => "exp",
            Token::Ln => "ln",
            Token::Sqrt => "sqrt",
            Token::Semicolon => ";",
            Token::Comma => ",",
            Token::EqEq => "==",
            Token::Arrow => "->",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Times => "*",
            Token::Divide => "/",
            Token::Caret => "^",
            Token::Eof => "end of file",
        };
        write!(f, "'{}'", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub context: Context,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    filename: Arc<str>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn context(&self) -> Context {
        Context::new(self.filename.clone(), self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, out: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
    }

    fn skip_line(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn number(&mut self, first: char, context: &Context) -> ParseResult<Token> {
        let mut text = String::from(first);
        self.take_while(&mut text, |c| c.is_ascii_digit());
        let mut real = first == '.';
        if !real && self.chars.peek() == Some(&'.') {
            real = true;
            text.push('.');
            self.bump();
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }
        if matches!(self.chars.peek(), Some('e') | Some('E')) {
            real = true;
            text.push('e');
            self.bump();
            if let Some(&sign) = self.chars.peek() {
                if sign == '+' || sign == '-' {
                    text.push(sign);
                    self.bump();
                }
            }
            self.take_while(&mut text, |c| c.is_ascii_digit());
        }
        if real {
            text.parse::<f64>()
                .map(Token::Real)
                .map_err(|_| ParseError::new(format!("malformed real literal {}", text), context))
        } else {
            text.parse::<u64>()
                .map(Token::Integer)
                .map_err(|_| ParseError::new(format!("integer literal {} is too large", text), context))
        }
    }

    fn next_token(&mut self) -> ParseResult<Option<Spanned>> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_line(),
                _ => break,
            }
        }

        let context = self.context();
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };

        let token = match c {
            ';' => Token::Semicolon,
            ',' => Token::Comma,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '+' => Token::Plus,
            '*' => Token::Times,
            '^' => Token::Caret,
            '-' if self.eat('>') => Token::Arrow,
            '-' => Token::Minus,
            '=' if self.eat('=') => Token::EqEq,
            '/' if self.eat('/') => {
                self.skip_line();
                return self.next_token();
            }
            '/' => Token::Divide,
            '"' => {
                let mut text = String::new();
                self.take_while(&mut text, |c| c != '"' && c != '\n');
                if !self.eat('"') {
                    return Err(ParseError::new("unterminated string literal", &context));
                }
                Token::Str(text)
            }
            c if c.is_ascii_digit() => self.number(c, &context)?,
            '.' if self.chars.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number('.', &context)?
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                self.take_while(&mut word, |c| c.is_ascii_alphanumeric() || c == '_');
                Token::keyword(&word).unwrap_or(Token::Id(word))
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", other),
                    &context,
                ))
            }
        };
        Ok(Some(Spanned { token, context }))
    }
}

/// Splits `source` into tokens, dropping whitespace and comments. The result
/// always ends with [`Token::Eof`].
pub fn tokenize(source: &str, filename: Arc<str>) -> ParseResult<Vec<Spanned>> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        filename,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Spanned {
        token: Token::Eof,
        context: lexer.context(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source, Arc::from("test.qasm"))
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn header_and_declarations() {
        assert_eq!(
            kinds("OPENQASM 2.0;\nqreg q[2];"),
            vec![
                Token::OpenQasm,
                Token::Real(2.0),
                Token::Semicolon,
                Token::Qreg,
                Token::Id("q".into()),
                Token::LBracket,
                Token::Integer(2),
                Token::RBracket,
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            kinds("// header\nmeasure # trailing\n-> /"),
            vec![Token::Measure, Token::Arrow, Token::Divide, Token::Eof]
        );
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("1e-3 .5 -pi^2 == 7"),
            vec![
                Token::Real(0.001),
                Token::Real(0.5),
                Token::Minus,
                Token::Pi,
                Token::Caret,
                Token::Integer(2),
                Token::EqEq,
                Token::Integer(7),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn positions_are_tracked() {
        let tokens = tokenize("qreg\n  q;", Arc::from("f")).unwrap();
        assert_eq!((tokens[1].context.line, tokens[1].context.column), (2, 3));
    }

    #[test]
    fn strings_and_errors() {
        assert_eq!(
            kinds("include \"qelib1.inc\";")[1],
            Token::Str("qelib1.inc".into())
        );
        assert!(tokenize("\"open", Arc::from("f")).is_err());
        assert!(tokenize("q @ r", Arc::from("f")).is_err());
    }
}
