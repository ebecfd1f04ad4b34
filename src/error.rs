use thiserror::Error;

#[derive(Error, Debug)]
pub enum RucurlError {
    #[error("模板错误: {0}")]
    TemplateError(String),

    #[error("执行错误: {0}")]
    ExecutionError(String),

    #[error("持久化错误: {0}")]
    PersistenceError(String),

    #[error("结果不存在: {0}")]
    RunNotFound(String),

    #[error("数据表错误: {0}")]
    TableError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("无效的输入: {0}")]
    InvalidInput(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV 读取错误: {0}")]
    CsvError(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

// Add conversion from anyhow::Error
impl From<anyhow::Error> for RucurlError {
    fn from(err: anyhow::Error) -> Self {
        RucurlError::Other(err.to_string())
    }
}

/// Result type for rucurl crate
pub type Result<T> = std::result::Result<T, RucurlError>;
