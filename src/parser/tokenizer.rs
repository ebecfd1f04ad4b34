//! curl 命令的简易分词器
//!
//! 只识别「引号片段或非空白字符」组成的连续串，不实现 shell 语法（转义、变量展开、
//! 管道等都不处理）。对常见的浏览器「复制为 cURL」输出已经够用。

use regex::Regex;
use std::sync::OnceLock;

/// 把命令切分为 token，单引号和双引号片段不会被空白拆开
pub fn tokenize(command: &str) -> Vec<&str> {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_REGEX.get_or_init(|| Regex::new(r#"(?:'[^']*'|"[^"]*"|\S)+"#).unwrap());

    re.find_iter(command).map(|m| m.as_str()).collect()
}

/// 去掉包裹整个 token 的引号
///
/// 支持 `'...'`、`"..."` 以及 cmd 风格的 `^"...^"`，引号只出现在一侧时原样返回。
pub fn unquote(token: &str) -> &str {
    if token.len() >= 4
        && let Some(inner) = token
            .strip_prefix("^\"")
            .and_then(|rest| rest.strip_suffix("^\""))
    {
        return inner;
    }

    let bytes = token.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &token[1..token.len() - 1];
        }
    }

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_quoted_spans() {
        let tokens = tokenize(r#"curl -H 'Content-Type: application/json' -d "a b c" http://h"#);
        assert_eq!(
            tokens,
            vec![
                "curl",
                "-H",
                "'Content-Type: application/json'",
                "-d",
                "\"a b c\"",
                "http://h"
            ]
        );
    }

    #[test]
    fn test_tokenize_mixed_run() {
        // 引号片段与普通字符相连时属于同一个 token
        let tokens = tokenize(r#"--data=' x y ' next"#);
        assert_eq!(tokens, vec!["--data=' x y '", "next"]);
    }

    #[test]
    fn test_tokenize_unterminated_quote() {
        let tokens = tokenize("curl 'http://h/a b");
        assert_eq!(tokens, vec!["curl", "'http://h/a", "b"]);
    }

    #[test]
    fn test_tokenize_multiline() {
        let tokens = tokenize("curl 'http://h' \\\n  -H 'A: b'");
        assert_eq!(tokens, vec!["curl", "'http://h'", "\\", "-H", "'A: b'"]);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("^\"abc^\""), "abc");
        assert_eq!(unquote("''"), "");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("'abc\""), "'abc\"");
        assert_eq!(unquote("--data='x'"), "--data='x'");
        assert_eq!(unquote("plain"), "plain");
    }
}
