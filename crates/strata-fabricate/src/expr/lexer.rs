use super::ParseError;

/// Byte range of a token in the expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
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

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let kind = match c {
            b'0'..=b'9' => {
                let (kind, end) = lex_number(input, start)?;
                pos = end;
                kind
            }
            b'.' if bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let (kind, end) = lex_number(input, start)?;
                pos = end;
                kind
            }
            b'\'' | b'"' => {
                let (kind, end) = lex_string(input, start)?;
                pos = end;
                kind
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = pos + 1;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                pos = end;
                match &input[start..end] {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    ident => TokenKind::Ident(ident.to_string()),
                }
            }
            _ => {
                let next = bytes.get(pos + 1).copied();
                let (kind, width) = match (c, next) {
                    (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
                    (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
                    (b'<', Some(b'=')) => (TokenKind::Le, 2),
                    (b'>', Some(b'=')) => (TokenKind::Ge, 2),
                    (b'&', Some(b'&')) => (TokenKind::AndAnd, 2),
                    (b'|', Some(b'|')) => (TokenKind::OrOr, 2),
                    (b'&' | b'|', _) => {
                        let op = c as char;
                        return Err(ParseError::new(
                            input,
                            Span {
                                start: pos,
                                end: pos + 1,
                            },
                            format!(
                                "unexpected '{op}', logical operators are written '{op}{op}'"
                            ),
                        ));
                    }
                    (b'=', _) => (TokenKind::Assign, 1),
                    (b'!', _) => (TokenKind::Bang, 1),
                    (b'<', _) => (TokenKind::Lt, 1),
                    (b'>', _) => (TokenKind::Gt, 1),
                    (b'+', _) => (TokenKind::Plus, 1),
                    (b'-', _) => (TokenKind::Minus, 1),
                    (b'*', _) => (TokenKind::Star, 1),
                    (b'/', _) => (TokenKind::Slash, 1),
                    (b'%', _) => (TokenKind::Percent, 1),
                    (b'^', _) => (TokenKind::Caret, 1),
                    (b'(', _) => (TokenKind::LParen, 1),
                    (b')', _) => (TokenKind::RParen, 1),
                    (b'[', _) => (TokenKind::LBracket, 1),
                    (b']', _) => (TokenKind::RBracket, 1),
                    (b',', _) => (TokenKind::Comma, 1),
                    _ => {
                        let ch = input[pos..].chars().next().unwrap_or('?');
                        return Err(ParseError::new(
                            input,
                            Span {
                                start: pos,
                                end: pos + ch.len_utf8(),
                            },
                            format!("unexpected character '{ch}'"),
                        ));
                    }
                };
                pos += width;
                kind
            }
        };

        tokens.push(Token {
            kind,
            span: Span { start, end: pos },
        });
    }

    Ok(tokens)
}

fn lex_number(input: &str, start: usize) -> Result<(TokenKind, usize), ParseError> {
    let bytes = input.as_bytes();
    let mut end = start;
    let mut is_float = false;

    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        is_float = true;
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        if exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            is_float = true;
            end = exp_end;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }

    let text = &input[start..end];
    let span = Span { start, end };
    let kind = if is_float {
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| ParseError::new(input, span, format!("invalid number '{text}'")))?
    } else {
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| ParseError::new(input, span, format!("integer '{text}' is out of range")))?
    };
    Ok((kind, end))
}

fn lex_string(input: &str, start: usize) -> Result<(TokenKind, usize), ParseError> {
    let quote = input.as_bytes()[start] as char;
    let mut value = String::new();
    let mut chars = input[start + 1..].char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            ch if ch == quote => {
                let end = start + 1 + offset + ch.len_utf8();
                return Ok((TokenKind::Str(value), end));
            }
            ch => value.push(ch),
        }
    }

    Err(ParseError::new(
        input,
        Span {
            start,
            end: input.len(),
        },
        "unterminated string literal",
    ))
}
