use super::parser::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    /// `**`, an alias for `^`
    StarStar,
    LParen,
    RParen,
    Comma,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Number(value) => format!("number `{value}`"),
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Plus => "`+`".to_string(),
            Token::Minus => "`-`".to_string(),
            Token::Star => "`*`".to_string(),
            Token::Slash => "`/`".to_string(),
            Token::Caret => "`^`".to_string(),
            Token::StarStar => "`**`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comma => "`,`".to_string(),
        }
    }
}

/// Split source text into tokens paired with their byte offsets
pub fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];
        let start = pos;
        let token = match ch {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                pos += 1;
                Token::StarStar
            }
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'^' => Token::Caret,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b',' => Token::Comma,
            b'0'..=b'9' | b'.' => {
                pos = scan_number(bytes, pos);
                let text = &source[start..pos];
                let invalid = || ParseError::InvalidNumber {
                    text: text.to_string(),
                    offset: start,
                };
                // Overflowing literals such as `1e400` parse as infinity
                let value = text
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(invalid)?;
                tokens.push((start, Token::Number(value)));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                tokens.push((start, Token::Ident(source[start..pos].to_string())));
                continue;
            }
            _ => {
                // Report the full (possibly multi-byte) character
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(ParseError::UnexpectedChar { ch, offset: start });
            }
        };
        pos += 1;
        tokens.push((start, token));
    }

    Ok(tokens)
}

/// Advance over `digits [. digits] [(e|E) [+|-] digits]`
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(_, token)| token)
            .collect()
    }

    #[test]
    fn test_tokenize_operators_and_power_alias() {
        assert_eq!(
            kinds("a**2 ^ b*c"),
            vec![
                Token::Ident("a".into()),
                Token::StarStar,
                Token::Number(2.0),
                Token::Caret,
                Token::Ident("b".into()),
                Token::Star,
                Token::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            kinds("1 2.5 .5 1e-3 2E+2"),
            vec![
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(0.5),
                Token::Number(0.001),
                Token::Number(200.0),
            ]
        );
    }

    #[test]
    fn test_exponent_without_digits_is_left_to_parser() {
        // `2e` lexes as the number 2 followed by the identifier `e`
        assert_eq!(kinds("2e"), vec![Token::Number(2.0), Token::Ident("e".into())]);
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        assert_eq!(
            tokenize("a % b"),
            Err(ParseError::UnexpectedChar { ch: '%', offset: 2 })
        );
    }

    #[test]
    fn test_tokenize_rejects_malformed_number() {
        assert!(matches!(
            tokenize("1.2.3"),
            Err(ParseError::InvalidNumber { offset: 0, .. })
        ));
    }

    #[test]
    fn test_tokenize_rejects_overflowing_literal() {
        assert_eq!(
            tokenize("2 * 1e400"),
            Err(ParseError::InvalidNumber {
                text: "1e400".to_string(),
                offset: 4
            })
        );
        // Underflow to zero is a finite value
        assert_eq!(kinds("1e-400"), vec![Token::Number(0.0)]);
    }

    #[test]
    fn test_offsets_are_byte_positions() {
        let tokens = tokenize("  x +1").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![2, 4, 5]);
    }
}
