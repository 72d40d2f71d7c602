//! Tokenizer for the sandbox expression language.

use astra_types::error::{AstraError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
}

/// Tokenize an expression source string.
///
/// Strings accept single or double quotes with `\\`, `\'`, `\"`, `\n`, and
/// `\t` escapes. Numbers are decimal with an optional fraction.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            },
            '0'..='9' => {
                let mut text = String::new();
                let mut seen_dot = false;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        chars.next();
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = text
                    .parse()
                    .map_err(|_| AstraError::Evaluation(format!("bad number literal: {text}")))?;
                tokens.push(Token::Number(value));
            },
            '\'' | '"' => {
                let quote = ch;
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == quote {
                        closed = true;
                        break;
                    }
                    if c == '\\' {
                        match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(other) => text.push(other),
                            None => break,
                        }
                    } else {
                        text.push(c);
                    }
                }
                if !closed {
                    return Err(AstraError::Evaluation("unterminated string".into()));
                }
                tokens.push(Token::Str(text));
            },
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match name.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(name),
                });
            },
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            },
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            },
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            },
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            },
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            },
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            },
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            },
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            },
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            },
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            },
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::EqEq);
                } else {
                    return Err(AstraError::Evaluation(
                        "assignment is not supported; use mem_set".into(),
                    ));
                }
            },
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            },
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            },
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            },
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    return Err(AstraError::Evaluation("unexpected character '&'".into()));
                }
            },
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    return Err(AstraError::Evaluation("unexpected character '|'".into()));
                }
            },
            other => {
                return Err(AstraError::Evaluation(format!(
                    "unexpected character '{other}'"
                )));
            },
        }
    }

    Ok(tokens)
}
