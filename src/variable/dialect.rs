use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 命令模板的 shell 方言
///
/// 只有两类：Windows cmd 风格（`^` 续行、`^"` 引号）和 POSIX 风格（`\` 续行、单引号）。
/// 无法判断时按 POSIX 处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellDialect {
    /// cmd 风格：`^` 续行，结构化值用 `^"..."^` 包裹
    Caret,
    /// bash 风格：`\` 续行，结构化值用单引号包裹
    #[default]
    LineContinuation,
}

impl ShellDialect {
    /// 根据模板文本推断方言
    pub fn classify(command: &str) -> Self {
        static CARET_REGEX: OnceLock<Regex> = OnceLock::new();
        static POSIX_REGEX: OnceLock<Regex> = OnceLock::new();

        let caret = CARET_REGEX.get_or_init(|| Regex::new(r#"\^(\s|$)|\^""#).unwrap());
        if caret.is_match(command) {
            return Self::Caret;
        }

        let posix = POSIX_REGEX.get_or_init(|| Regex::new(r"\\(\s|$)|'.*?'").unwrap());
        if posix.is_match(command) {
            return Self::LineContinuation;
        }

        Self::default()
    }

    /// 按方言包裹一段已序列化的 JSON 文本
    ///
    /// bash 风格不对内部的单引号做转义，JSON 中出现 `'` 会破坏引号配对。
    pub fn quote_structured(&self, json: &str) -> String {
        match self {
            Self::Caret => format!("^\"{}^\"", json.replace('"', "\\\"")),
            Self::LineContinuation => format!("'{}'", json),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caret => "cmd",
            Self::LineContinuation => "bash",
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
