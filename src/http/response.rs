use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// curl -v 输出解析
///
/// curl 在 verbose 模式下把协议细节写到 stderr，响应头形如：
///
/// ```text
/// < HTTP/1.1 200 OK
/// < Content-Type: application/json
/// <
/// ```
///
/// body 则原样写到 stdout。
pub struct ResponseParser;

impl ResponseParser {
    /// 提取最后一个 HTTP 状态码
    ///
    /// 重定向或代理握手会产生多个状态行，取最后一个即最终响应。
    pub fn extract_status(stdout: &str, stderr: &str) -> Option<u16> {
        static STATUS_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = STATUS_REGEX.get_or_init(|| Regex::new(r"HTTP/\d(?:\.\d)?\s+(\d{3})").unwrap());

        let combined = format!("{}\n{}", stderr, stdout);
        re.captures_iter(&combined)
            .last()
            .and_then(|caps| caps[1].parse().ok())
    }

    /// 提取最后一个响应头块和响应 body
    pub fn parse_parts(stdout: &str, stderr: &str) -> (BTreeMap<String, String>, String) {
        let mut headers = BTreeMap::new();

        let lines: Vec<&str> = stderr.lines().collect();
        if let Some(start) = lines.iter().rposition(|line| line.starts_with("< HTTP/")) {
            for line in &lines[start + 1..] {
                // 第一个不以 "< " 开头的行（空行或其它）结束 header 块
                let Some(header_line) = line.strip_prefix("< ") else {
                    break;
                };
                if let Some((key, value)) = header_line.split_once(':') {
                    headers.insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }

        (headers, stdout.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REDIRECT_STDERR: &str = "*   Trying 127.0.0.1:8080...\r\n\
* Connected to localhost (127.0.0.1) port 8080\r\n\
> GET /old HTTP/1.1\r\n\
> Host: localhost:8080\r\n\
>\r\n\
< HTTP/1.1 301 Moved Permanently\r\n\
< Location: /new\r\n\
< Content-Length: 0\r\n\
< \r\n\
* Issue another request to this URL: 'http://localhost:8080/new'\r\n\
> GET /new HTTP/1.1\r\n\
> Host: localhost:8080\r\n\
>\r\n\
< HTTP/1.1 200 OK\r\n\
< Content-Type: application/json\r\n\
< X-Request-Id: abc:123\r\n\
< \r\n\
{ [15 bytes data]\r\n\
* Connection #0 to host localhost left intact\r\n";

    #[test]
    fn test_extract_status_last_wins() {
        assert_eq!(ResponseParser::extract_status("", REDIRECT_STDERR), Some(200));
    }

    #[test]
    fn test_extract_status_none() {
        assert_eq!(
            ResponseParser::extract_status("plain body", "curl: (7) Failed to connect"),
            None
        );
    }

    #[test]
    fn test_extract_status_http2() {
        let stderr = "> GET / HTTP/2\n> Host: example.com\n< HTTP/2 404\n< content-type: text/html\n";
        assert_eq!(ResponseParser::extract_status("", stderr), Some(404));
    }

    #[test]
    fn test_extract_status_stdout_after_stderr() {
        // stdout 排在 stderr 之后，body 中出现的状态行会覆盖 stderr 中的
        let stdout = "HTTP/1.0 503 Service Unavailable";
        assert_eq!(
            ResponseParser::extract_status(stdout, "< HTTP/1.1 200 OK"),
            Some(503)
        );
    }

    #[test]
    fn test_parse_parts_final_block() {
        let (headers, body) = ResponseParser::parse_parts("{\"ok\":true}", REDIRECT_STDERR);
        assert_eq!(body, "{\"ok\":true}");
        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert_eq!(headers.get("X-Request-Id"), Some(&"abc:123".to_string()));
        assert!(!headers.contains_key("Location"));
    }

    #[test]
    fn test_parse_parts_no_status_line() {
        let (headers, body) = ResponseParser::parse_parts("body", "curl: (6) Could not resolve host");
        assert!(headers.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_parse_parts_stops_at_first_non_header_line() {
        let stderr = "< HTTP/1.1 200 OK\n< A: 1\n* something else\n< B: 2\n";
        let (headers, _) = ResponseParser::parse_parts("", stderr);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("A"), Some(&"1".to_string()));
    }
}
