use crate::parser::tokenizer::{tokenize, unquote};
use crate::parser::types::ParsedRequest;
use std::collections::BTreeMap;

/// curl 命令解析器
///
/// 解析永远不会失败，无法识别的部分保持默认值（GET、空 URL、空 map）。
pub struct CurlParser;

impl CurlParser {
    pub fn parse(command: &str) -> ParsedRequest {
        let tokens = tokenize(command);

        let mut method = String::new();
        let mut url: Option<String> = None;
        let mut headers = BTreeMap::new();
        let mut body_parts: Vec<String> = Vec::new();

        for (index, token) in tokens.iter().enumerate() {
            let value = tokens.get(index + 1).map(|next| unquote(next));

            match (*token, value) {
                // HTTP Method
                ("-X" | "--request", Some(value)) => {
                    method = value.to_uppercase();
                }
                ("--url", Some(value)) => {
                    url = Some(value.to_string());
                }
                // Header
                ("-H" | "--header", Some(value)) => {
                    if let Some((key, value)) = value.split_once(':') {
                        headers.insert(key.trim().to_string(), value.trim().to_string());
                    }
                }
                // Data (body)，带 body 时一律视为 POST，即使显式写了 -X GET
                ("-d" | "--data" | "--data-raw" | "--data-binary", Some(value)) => {
                    body_parts.push(value.to_string());
                    method = "POST".to_string();
                }
                _ => {}
            }

            // URL (位置参数)：第一个不以 - 开头且包含 :// 的 token
            if url.is_none() && !token.starts_with('-') && token.contains("://") {
                url = Some(unquote(token).to_string());
            }
        }

        let url = url.unwrap_or_default();
        let params = Self::parse_query(&url);

        ParsedRequest {
            method: if method.is_empty() {
                ParsedRequest::DEFAULT_METHOD.to_string()
            } else {
                method
            },
            url,
            headers,
            body: body_parts.join("\n"),
            params,
        }
    }

    /// 解析 URL 中第一个 `?` 之后的查询参数
    fn parse_query(url: &str) -> BTreeMap<String, String> {
        let Some((_, query)) = url.split_once('?') else {
            return BTreeMap::new();
        };

        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect()
    }
}
