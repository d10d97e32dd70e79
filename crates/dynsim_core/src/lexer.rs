use crate::error::FormatError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Equals,
    Apostrophe,
}

/// A token together with the byte offset where it starts in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Splits `input` into tokens. Both `.` and `,` are accepted as decimal
/// separators; any other unrecognised character is an error.
pub fn tokenize(input: &str) -> Result<Vec<Token>, FormatError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = offset;
            let mut literal = String::new();
            let mut seen_separator = false;
            while let Some(&(idx, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    literal.push(d);
                } else if (d == '.' || d == ',') && !seen_separator {
                    seen_separator = true;
                    literal.push('.');
                } else {
                    break;
                }
                end = idx + d.len_utf8();
                chars.next();
            }
            let value: f64 = literal
                .parse()
                .map_err(|_| FormatError::new("Malformed number", &input[offset..]))?;
            if !value.is_finite() {
                return Err(FormatError::new("Number out of range", &input[offset..end]));
            }
            tokens.push(Token {
                kind: TokenKind::Number(value),
                offset,
            });
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token {
                kind: TokenKind::Identifier(ident),
                offset,
            });
        } else {
            let kind = match c {
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '=' => TokenKind::Equals,
                '\'' => TokenKind::Apostrophe,
                _ => return Err(FormatError::new("Unrecognized character", &input[offset..])),
            };
            tokens.push(Token { kind, offset });
            chars.next();
        }
    }
    Ok(tokens)
}
