use crate::assertion::types::AssertError;

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// 按长度降序排列，保证 `//`、`==` 这类双字符运算符优先匹配
const PUNCTUATION: &[&str] = &[
    "//", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "(", ")", "[", "]", ",", ".",
];

/// 把断言表达式切分为词法单元
pub fn tokenize(input: &str) -> Result<Vec<Token>, AssertError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let (token, next) = lex_number(&chars, pos)?;
            tokens.push(token);
            pos = next;
            continue;
        }

        if c == '\'' || c == '"' {
            let (text, next) = lex_string(&chars, pos)?;
            tokens.push(Token::Str(text));
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        let rest: String = chars[pos..chars.len().min(pos + 2)].iter().collect();
        match PUNCTUATION.iter().find(|p| rest.starts_with(**p)) {
            Some(&punct) => {
                tokens.push(Token::Punct(punct));
                pos += punct.len();
            }
            None => {
                return Err(AssertError::InvalidSyntax(format!(
                    "unexpected character '{}' at position {}",
                    c, pos
                )));
            }
        }
    }

    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(Token, usize), AssertError> {
    let mut pos = start;
    let mut is_float = false;

    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }

    // 小数点后必须跟数字，否则 `.` 留给属性访问
    if pos + 1 < chars.len() && chars[pos] == '.' && chars[pos + 1].is_ascii_digit() {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    if pos < chars.len() && (chars[pos] == 'e' || chars[pos] == 'E') {
        let mut lookahead = pos + 1;
        if lookahead < chars.len() && (chars[lookahead] == '+' || chars[lookahead] == '-') {
            lookahead += 1;
        }
        if lookahead < chars.len() && chars[lookahead].is_ascii_digit() {
            is_float = true;
            pos = lookahead;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text: String = chars[start..pos].iter().collect();
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| AssertError::InvalidSyntax(format!("invalid number: {}", text)))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| AssertError::InvalidSyntax(format!("integer too large: {}", text)))?,
        )
    };

    Ok((token, pos))
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), AssertError> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut text = String::new();

    while pos < chars.len() {
        match chars[pos] {
            c if c == quote => return Ok((text, pos + 1)),
            '\\' if pos + 1 < chars.len() => {
                let escaped = chars[pos + 1];
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    '\\' | '\'' | '"' => text.push(escaped),
                    other => {
                        text.push('\\');
                        text.push(other);
                    }
                }
                pos += 2;
            }
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }

    Err(AssertError::InvalidSyntax(
        "unterminated string literal".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_comparison() {
        let tokens = tokenize("response.code == 200").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("response".to_string()),
                Token::Punct("."),
                Token::Ident("code".to_string()),
                Token::Punct("=="),
                Token::Int(200),
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("1.5").unwrap(), vec![Token::Float(1.5)]);
        assert_eq!(tokenize("2e3").unwrap(), vec![Token::Float(2000.0)]);
        assert_eq!(tokenize("7 // 2").unwrap()[1], Token::Punct("//"));
    }

    #[test]
    fn test_tokenize_strings() {
        let tokens = tokenize(r#"'it\'s' "a\"b""#).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Str("it's".to_string()), Token::Str("a\"b".to_string())]
        );
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(matches!(
            tokenize("'open"),
            Err(AssertError::InvalidSyntax(_))
        ));
        assert!(matches!(
            tokenize("a ; b"),
            Err(AssertError::InvalidSyntax(_))
        ));
        assert!(tokenize("99999999999999999999").is_err());
    }
}
