use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 从 curl 命令中解析出的请求信息
///
/// 只用于展示和记录，真正发出请求的仍然是 curl 本身。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRequest {
    /// HTTP 方法（大写），默认 GET
    pub method: String,

    /// 请求 URL，未识别时为空
    pub url: String,

    /// 请求头
    pub headers: BTreeMap<String, String>,

    /// 请求体，多个 -d 参数以换行拼接
    pub body: String,

    /// URL 查询参数（不做百分号解码）
    pub params: BTreeMap<String, String>,
}

impl ParsedRequest {
    pub const DEFAULT_METHOD: &'static str = "GET";

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

impl Default for ParsedRequest {
    fn default() -> Self {
        Self {
            method: Self::DEFAULT_METHOD.to_string(),
            url: String::new(),
            headers: BTreeMap::new(),
            body: String::new(),
            params: BTreeMap::new(),
        }
    }
}
