pub mod curl;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types
pub use curl::CurlParser;
pub use types::ParsedRequest;

/// 从 curl 命令字符串解析请求信息
pub fn parse_command(command: &str) -> ParsedRequest {
    CurlParser::parse(command)
}
